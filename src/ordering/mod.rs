//! Ordered content lists.
//!
//! Keeps the `position` of the sections on a page as a dense `1..=N` sequence
//! and lets administrators reorder pages in the site menu by `display_order`.
//!
//! Every operation loads the whole scope (one page's sections, or every page),
//! works out the new ranks with the pure planners in [`plan`], and writes back
//! only the rows that changed, all inside a single transaction. Concurrent
//! editors are not serialised: two admins inserting into the same page at the
//! same moment can still end up with a duplicate position (last writer wins).

mod content;
mod pages;
pub mod plan;

pub use content::{delete_content, insert_content, move_content, NewContent};
pub use pages::{create_page, delete_page, move_page};

use serde::Serialize;
use thiserror::Error;

use crate::db::User;

#[derive(Debug, Error)]
pub enum OrderingError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Which way an item moves in its list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Result of a move. Moving the first item up or the last item down is not an
/// error, it simply leaves the list as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveOutcome {
    Moved,
    Unchanged,
}

impl MoveOutcome {
    pub fn moved(&self) -> bool {
        matches!(self, MoveOutcome::Moved)
    }
}

/// The identity an operation runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub username: String,
    pub is_admin: bool,
}

impl Actor {
    pub fn new(username: impl Into<String>, is_admin: bool) -> Self {
        Self {
            username: username.into(),
            is_admin,
        }
    }

    /// Fail with `Forbidden` unless this actor holds the admin capability
    pub fn require_admin(&self) -> Result<(), OrderingError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(OrderingError::Forbidden(
                "Admin privileges required".to_string(),
            ))
        }
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self::new(user.username.clone(), user.is_admin)
    }
}
