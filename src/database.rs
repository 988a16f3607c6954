//! Database initialization, table definitions, and record helpers
//!
//! One redb table per entity, keyed by a `u64` id allocated from the
//! sequence table; values are JSON-serialized records. Session and reset
//! tokens are keyed by their opaque token string instead.

use std::sync::Arc;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ApiError;
use crate::model::{Role, Setting, User};
use crate::payment::PaymentProvider;

pub const TABLE_USERS: TableDefinition<u64, &str> = TableDefinition::new("users_v1");
pub const TABLE_AUTHORS: TableDefinition<u64, &str> = TableDefinition::new("authors_v1");
pub const TABLE_CATEGORIES: TableDefinition<u64, &str> = TableDefinition::new("categories_v1");
pub const TABLE_BOOKS: TableDefinition<u64, &str> = TableDefinition::new("books_v1");
pub const TABLE_ISSUES: TableDefinition<u64, &str> = TableDefinition::new("issues_v1");
pub const TABLE_RESERVATIONS: TableDefinition<u64, &str> = TableDefinition::new("reservations_v1");
pub const TABLE_EXTENSIONS: TableDefinition<u64, &str> = TableDefinition::new("extensions_v1");
pub const TABLE_FINES: TableDefinition<u64, &str> = TableDefinition::new("fines_v1");
pub const TABLE_FINE_PAYMENTS: TableDefinition<u64, &str> =
    TableDefinition::new("fine_payments_v1");
pub const TABLE_REVIEWS: TableDefinition<u64, &str> = TableDefinition::new("reviews_v1");
pub const TABLE_SUGGESTIONS: TableDefinition<u64, &str> = TableDefinition::new("suggestions_v1");
pub const TABLE_NOTIFICATIONS: TableDefinition<u64, &str> =
    TableDefinition::new("notifications_v1");
pub const TABLE_SETTINGS: TableDefinition<u64, &str> = TableDefinition::new("settings_v1");
pub const TABLE_AUDIT_LOG: TableDefinition<u64, &str> = TableDefinition::new("audit_log_v1");

/// Session token -> JSON [`crate::model::SessionRecord`].
pub const TABLE_SESSIONS: TableDefinition<&str, &str> = TableDefinition::new("sessions_v1");

/// Reset token -> JSON [`crate::model::ResetTokenRecord`].
pub const TABLE_RESET_TOKENS: TableDefinition<&str, &str> =
    TableDefinition::new("reset_tokens_v1");

/// Sequence name -> last allocated id.
pub const TABLE_SEQ: TableDefinition<&str, u64> = TableDefinition::new("sequences_v1");

const ALL_ENTITY_TABLES: [TableDefinition<u64, &str>; 14] = [
    TABLE_USERS,
    TABLE_AUTHORS,
    TABLE_CATEGORIES,
    TABLE_BOOKS,
    TABLE_ISSUES,
    TABLE_RESERVATIONS,
    TABLE_EXTENSIONS,
    TABLE_FINES,
    TABLE_FINE_PAYMENTS,
    TABLE_REVIEWS,
    TABLE_SUGGESTIONS,
    TABLE_NOTIFICATIONS,
    TABLE_SETTINGS,
    TABLE_AUDIT_LOG,
];

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe reference to the embedded database
    pub db: Arc<Database>,
    /// Swappable payment rail; the default is the simulated gateway.
    pub payment: Arc<dyn PaymentProvider>,
}

impl AppState {
    pub fn new(db: Database, payment: Arc<dyn PaymentProvider>) -> Self {
        Self { db: Arc::new(db), payment }
    }
}

/// Initializes the embedded database: creates every table and seeds the
/// default settings and owner account on first run.
pub fn init_db(db_path: &str) -> Result<Database, ApiError> {
    let db = Database::create(db_path).map_err(|e| ApiError::internal(e.to_string()))?;

    let write_txn = db.begin_write()?;
    {
        for table in ALL_ENTITY_TABLES {
            write_txn.open_table(table)?;
        }
        write_txn.open_table(TABLE_SESSIONS)?;
        write_txn.open_table(TABLE_RESET_TOKENS)?;
        write_txn.open_table(TABLE_SEQ)?;
    }
    write_txn.commit()?;

    seed_settings(&db)?;
    seed_owner(&db)?;

    Ok(db)
}

/// Default system constants, created only when missing so operator edits
/// survive restarts.
fn seed_settings(db: &Database) -> Result<(), ApiError> {
    let defaults = [
        ("return_period_days", "14", "int"),
        ("fine_per_day", "2.00", "float"),
        ("reservation_expiry_days", "3", "int"),
        ("currency_symbol", "$", "str"),
    ];

    let existing: Vec<Setting> = list_records(db, TABLE_SETTINGS)?;
    let write_txn = db.begin_write()?;
    {
        for (key, value, value_type) in defaults {
            if existing.iter().any(|s| s.key == key) {
                continue;
            }
            let id = next_id(&write_txn, "settings")?;
            let setting = Setting {
                id,
                key: key.to_string(),
                value: value.to_string(),
                value_type: value_type.to_string(),
                updated_at: Utc::now(),
            };
            put_record(&write_txn, TABLE_SETTINGS, id, &setting)?;
        }
    }
    write_txn.commit()?;
    Ok(())
}

/// Bootstrap owner account, created only when no owner exists yet.
/// Credentials come from `OWNER_USERNAME` / `OWNER_PASSWORD`.
fn seed_owner(db: &Database) -> Result<(), ApiError> {
    let users: Vec<User> = list_records(db, TABLE_USERS)?;
    if users.iter().any(|u| u.role == Role::Owner) {
        return Ok(());
    }

    let username = std::env::var("OWNER_USERNAME").unwrap_or_else(|_| "owner".to_string());
    let password = std::env::var("OWNER_PASSWORD").unwrap_or_else(|_| "owner12345".to_string());
    let password_hash = crate::auth::hash_password(&password)?;

    let write_txn = db.begin_write()?;
    {
        let id = next_id(&write_txn, "users")?;
        let owner = User {
            id,
            username,
            email: String::new(),
            password_hash,
            role: Role::Owner,
            roll_number: None,
            avatar: None,
            is_active: true,
            created_at: Utc::now(),
        };
        put_record(&write_txn, TABLE_USERS, id, &owner)?;
    }
    write_txn.commit()?;
    Ok(())
}

/// Allocates the next id in a named sequence. Must run inside the write
/// transaction that inserts the record, so ids are never burned on a
/// failed request.
pub fn next_id(txn: &WriteTransaction, sequence: &str) -> Result<u64, ApiError> {
    let mut table = txn.open_table(TABLE_SEQ)?;
    let next = table.get(sequence)?.map(|guard| guard.value()).unwrap_or(0) + 1;
    table.insert(sequence, next)?;
    Ok(next)
}

/// Serializes and stores a record under its id within a write transaction.
pub fn put_record<T: Serialize>(
    txn: &WriteTransaction,
    table: TableDefinition<u64, &str>,
    id: u64,
    record: &T,
) -> Result<(), ApiError> {
    let json = serde_json::to_string(record)?;
    let mut t = txn.open_table(table)?;
    t.insert(id, json.as_str())?;
    Ok(())
}

/// Reads a single record through a read transaction.
pub fn get_record<T: DeserializeOwned>(
    db: &Database,
    table: TableDefinition<u64, &str>,
    id: u64,
) -> Result<Option<T>, ApiError> {
    let read_txn = db.begin_read()?;
    let t = read_txn.open_table(table)?;
    match t.get(id)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    }
}

/// Reads a record inside an open write transaction, for check-then-act
/// sequences that must be atomic.
pub fn get_for_update<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: TableDefinition<u64, &str>,
    id: u64,
) -> Result<Option<T>, ApiError> {
    let t = txn.open_table(table)?;
    // Bound to a local so the access guard drops before the table does.
    let record = match t.get(id)? {
        Some(guard) => Some(serde_json::from_str(guard.value())?),
        None => None,
    };
    Ok(record)
}

/// Reads every record of a table in id order.
pub fn list_records<T: DeserializeOwned>(
    db: &Database,
    table: TableDefinition<u64, &str>,
) -> Result<Vec<T>, ApiError> {
    let read_txn = db.begin_read()?;
    let t = read_txn.open_table(table)?;
    let mut records = Vec::new();
    for entry in t.iter()? {
        let (_, value) = entry?;
        records.push(serde_json::from_str(value.value())?);
    }
    Ok(records)
}

/// Reads every record of a table inside an open write transaction.
pub fn list_for_update<T: DeserializeOwned>(
    txn: &WriteTransaction,
    table: TableDefinition<u64, &str>,
) -> Result<Vec<T>, ApiError> {
    let t = txn.open_table(table)?;
    let mut records = Vec::new();
    for entry in t.iter()? {
        let (_, value) = entry?;
        records.push(serde_json::from_str(value.value())?);
    }
    Ok(records)
}

pub fn delete_record(
    txn: &WriteTransaction,
    table: TableDefinition<u64, &str>,
    id: u64,
) -> Result<bool, ApiError> {
    let mut t = txn.open_table(table)?;
    let removed = t.remove(id)?.is_some();
    Ok(removed)
}

// Settings readers
// Typed accessors with defaults; backing values are strings.

pub fn setting_value(db: &Database, key: &str) -> Result<Option<String>, ApiError> {
    let settings: Vec<Setting> = list_records(db, TABLE_SETTINGS)?;
    Ok(settings.into_iter().find(|s| s.key == key).map(|s| s.value))
}

pub fn setting_i64(db: &Database, key: &str, default: i64) -> Result<i64, ApiError> {
    Ok(setting_value(db, key)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(default))
}

pub fn setting_decimal(db: &Database, key: &str, default: Decimal) -> Result<Decimal, ApiError> {
    Ok(setting_value(db, key)?
        .and_then(|v| v.parse().ok())
        .unwrap_or(default))
}
