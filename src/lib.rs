pub mod api;
pub mod config;
pub mod db;
pub mod ordering;
pub mod storage;
pub mod utils;

pub use db::DbPool;

use config::Config;
use storage::FileStore;

pub struct AppState {
    pub config: Config,
    pub db: DbPool,
    pub files: FileStore,
}

impl AppState {
    pub fn new(config: Config, db: DbPool) -> Self {
        let files = FileStore::from_config(&config.uploads);
        Self { config, db, files }
    }
}
