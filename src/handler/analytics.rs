//! Audit trail and dashboard aggregates.

use axum::{extract::State, http::HeaderMap, Json};
use chrono::{Duration, Utc};
use redb::Database;
use rust_decimal::Decimal;
use serde_json::json;

use crate::auth::{require_owner, CurrentUser};
use crate::database::{
    list_records, next_id, put_record, AppState, TABLE_AUDIT_LOG, TABLE_BOOKS, TABLE_FINES,
    TABLE_ISSUES, TABLE_RESERVATIONS, TABLE_SUGGESTIONS, TABLE_USERS,
};
use crate::error::ApiError;
use crate::handler::book_title;
use crate::model::{
    AuditLogEntry, Book, Fine, Issue, IssueStatus, Reservation, ReservationStatus, Role,
    Suggestion, SuggestionStatus, User,
};

/// Appends an audit row. Best-effort: a logging failure is reported to
/// the trace log but never fails the request that triggered it.
pub fn log_action(
    db: &Database,
    username: &str,
    action: &str,
    details: &str,
    headers: Option<&HeaderMap>,
) {
    let ip_address = headers.and_then(|h| {
        h.get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| raw.split(',').next())
            .map(|ip| ip.trim().to_string())
    });

    let result: Result<(), ApiError> = (|| {
        let write_txn = db.begin_write()?;
        {
            let id = next_id(&write_txn, "audit_log")?;
            let entry = AuditLogEntry {
                id,
                action: action.to_string(),
                username: username.to_string(),
                details: details.to_string(),
                ip_address,
                timestamp: Utc::now(),
            };
            put_record(&write_txn, TABLE_AUDIT_LOG, id, &entry)?;
        }
        write_txn.commit()?;
        Ok(())
    })();

    if let Err(err) = result {
        tracing::warn!(%err, action, "failed to write audit log entry");
    }
}

/// Headline counters for the dashboard cards. Admins and owners see the
/// global aggregates; students see only their own issues and fines.
pub async fn dashboard_stats(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let issues: Vec<Issue> = list_records(&state.db, TABLE_ISSUES)?;
    let fines: Vec<Fine> = list_records(&state.db, TABLE_FINES)?;
    let today = Utc::now().date_naive();

    if !user.0.is_admin() {
        return Ok(Json(student_stats(&state, &user.0, &issues, &fines, today)?));
    }

    let books: Vec<Book> = list_records(&state.db, TABLE_BOOKS)?;
    let users: Vec<User> = list_records(&state.db, TABLE_USERS)?;
    let reservations: Vec<Reservation> = list_records(&state.db, TABLE_RESERVATIONS)?;
    let suggestions: Vec<Suggestion> = list_records(&state.db, TABLE_SUGGESTIONS)?;

    let unpaid: Vec<&Fine> = fines.iter().filter(|f| !f.paid).collect();
    let unpaid_total: Decimal = unpaid.iter().map(|f| f.amount).sum();

    Ok(Json(json!({
        "total_titles": books.len(),
        "total_copies": books.iter().map(|b| b.quantity as u64).sum::<u64>(),
        "available_copies": books.iter().map(|b| b.available_count as u64).sum::<u64>(),
        "pending_requests": issues.iter().filter(|i| i.status == IssueStatus::Requested).count(),
        "active_issues": issues.iter().filter(|i| i.status == IssueStatus::Issued).count(),
        "overdue_issues": issues.iter().filter(|i| i.is_overdue(today)).count(),
        "active_reservations": reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Active)
            .count(),
        "total_students": users.iter().filter(|u| u.role == Role::Student).count(),
        "pending_suggestions": suggestions
            .iter()
            .filter(|s| s.status == SuggestionStatus::Pending)
            .count(),
        "unpaid_fines_count": unpaid.len(),
        "unpaid_fines_total": unpaid_total,
    })))
}

/// Student dashboard: counters over the caller's own issues plus the list
/// of books they currently hold.
fn student_stats(
    state: &AppState,
    user: &User,
    issues: &[Issue],
    fines: &[Fine],
    today: chrono::NaiveDate,
) -> Result<serde_json::Value, ApiError> {
    let mine: Vec<&Issue> = issues.iter().filter(|i| i.user_id == user.id).collect();
    let my_issue_ids: Vec<u64> = mine.iter().map(|i| i.id).collect();
    let fines_due: Decimal = fines
        .iter()
        .filter(|f| !f.paid && my_issue_ids.contains(&f.issue_id))
        .map(|f| f.amount)
        .sum();

    let mut current_issues = Vec::new();
    for issue in mine.iter().filter(|i| i.status == IssueStatus::Issued) {
        current_issues.push(json!({
            "id": issue.id,
            "book_title": book_title(&state.db, issue.book_id)?,
            "issue_date": issue.issue_date,
            "due_date": issue.due_date,
        }));
    }

    Ok(json!({
        "issued_books": mine.iter().filter(|i| i.status == IssueStatus::Issued).count(),
        "pending_requests": mine.iter().filter(|i| i.status == IssueStatus::Requested).count(),
        "overdue_count": mine.iter().filter(|i| i.is_overdue(today)).count(),
        "fines_due": fines_due,
        "current_issues": current_issues,
    }))
}

/// Last-7-days login/action counts for the activity chart, one bucket per
/// day keyed by weekday abbreviation.
pub async fn system_activity(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entries: Vec<AuditLogEntry> = list_records(&state.db, TABLE_AUDIT_LOG)?;
    let today = Utc::now().date_naive();

    let mut data = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let day = today - Duration::days(offset);
        let day_entries = entries.iter().filter(|e| e.timestamp.date_naive() == day);
        let (mut logins, mut actions) = (0u64, 0u64);
        for entry in day_entries {
            if entry.action == "LOGIN" {
                logins += 1;
            } else {
                actions += 1;
            }
        }
        data.push(json!({
            "name": day.format("%a").to_string(),
            "logins": logins,
            "actions": actions,
        }));
    }

    Ok(Json(json!(data)))
}

/// Full audit trail, newest first. Owner only.
pub async fn audit_logs(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<AuditLogEntry>>, ApiError> {
    require_owner(&user.0)?;

    let mut entries: Vec<AuditLogEntry> = list_records(&state.db, TABLE_AUDIT_LOG)?;
    entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(Json(entries))
}
