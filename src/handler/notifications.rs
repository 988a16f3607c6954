//! Per-user notifications, created as a side effect of workflow
//! transitions and read/acknowledged by their owner.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use redb::Database;
use serde_json::json;

use crate::auth::CurrentUser;
use crate::database::{
    get_for_update, list_for_update, list_records, next_id, put_record, AppState,
    TABLE_NOTIFICATIONS,
};
use crate::error::ApiError;
use crate::model::{Notification, NotificationOut};

/// Creates a notification for `user_id`. Best-effort: a workflow
/// transition that already committed must not fail because the
/// notification insert did, so errors are logged and swallowed.
pub fn notify_user(db: &Database, user_id: u64, message: &str, category: &str) {
    let result = (|| -> Result<(), ApiError> {
        let write_txn = db.begin_write()?;
        {
            let id = next_id(&write_txn, "notifications")?;
            let notification = Notification {
                id,
                user_id,
                message: message.to_string(),
                category: category.to_string(),
                target_url: String::new(),
                read_at: None,
                created_at: Utc::now(),
            };
            put_record(&write_txn, TABLE_NOTIFICATIONS, id, &notification)?;
        }
        write_txn.commit()?;
        Ok(())
    })();

    if let Err(err) = result {
        tracing::warn!("failed to record notification for user {user_id}: {err}");
    }
}

/// The caller's own notifications, newest first.
pub async fn list_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<NotificationOut>>, ApiError> {
    let mut notifications: Vec<Notification> = list_records(&state.db, TABLE_NOTIFICATIONS)?
        .into_iter()
        .filter(|n: &Notification| n.user_id == user.0.id)
        .collect();
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    Ok(Json(notifications.iter().map(NotificationOut::from).collect()))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<NotificationOut>, ApiError> {
    let write_txn = state.db.begin_write()?;
    let notification = {
        let mut notification: Notification =
            get_for_update(&write_txn, TABLE_NOTIFICATIONS, id)?
                .ok_or_else(|| ApiError::not_found("Notification not found"))?;
        if notification.user_id != user.0.id {
            return Err(ApiError::not_found("Notification not found"));
        }

        if notification.read_at.is_none() {
            notification.read_at = Some(Utc::now());
            put_record(&write_txn, TABLE_NOTIFICATIONS, id, &notification)?;
        }
        notification
    };
    write_txn.commit()?;

    Ok(Json(NotificationOut::from(&notification)))
}

/// Idempotent: already-read notifications are left untouched.
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let now = Utc::now();
    let write_txn = state.db.begin_write()?;
    {
        let notifications: Vec<Notification> = list_for_update(&write_txn, TABLE_NOTIFICATIONS)?;
        for mut notification in notifications {
            if notification.user_id == user.0.id && notification.read_at.is_none() {
                notification.read_at = Some(now);
                put_record(&write_txn, TABLE_NOTIFICATIONS, notification.id, &notification)?;
            }
        }
    }
    write_txn.commit()?;

    Ok(Json(json!({ "status": "marked all as read" })))
}

pub async fn unread_count(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let notifications: Vec<Notification> = list_records(&state.db, TABLE_NOTIFICATIONS)?;
    let count = notifications
        .iter()
        .filter(|n| n.user_id == user.0.id && !n.is_read())
        .count();

    Ok(Json(json!({ "unread_count": count })))
}
