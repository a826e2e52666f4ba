//! Database models split into domain-specific modules.

pub mod page;
pub mod page_content;
pub mod settings;
pub mod user;

pub use page::*;
pub use page_content::*;
pub use settings::*;
pub use user::*;
