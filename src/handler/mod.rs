//! HTTP request handlers, one module per API resource.

pub mod analytics;
pub mod auth;
pub mod catalog;
pub mod extensions;
pub mod fines;
pub mod issues;
pub mod notifications;
pub mod reports;
pub mod reservations;
pub mod reviews;
pub mod settings;
pub mod suggestions;
pub mod users;

use redb::Database;

use crate::database::{get_record, TABLE_BOOKS, TABLE_USERS};
use crate::error::ApiError;
use crate::model::{Book, User};

/// Join helper: book title for display fields, empty when the book is gone.
pub(crate) fn book_title(db: &Database, book_id: u64) -> Result<String, ApiError> {
    Ok(get_record::<Book>(db, TABLE_BOOKS, book_id)?
        .map(|book| book.title)
        .unwrap_or_default())
}

/// Join helper: username for display fields.
pub(crate) fn username_of(db: &Database, user_id: u64) -> Result<String, ApiError> {
    Ok(get_record::<User>(db, TABLE_USERS, user_id)?
        .map(|user| user.username)
        .unwrap_or_default())
}
