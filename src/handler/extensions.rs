//! Due-date extension requests: create (student), approve/reject (admin).
//!
//! `days_requested` is bounded to [1, 14] here regardless of any client
//! input constraint, and a request can only target an issue that is
//! currently out and owned by the requester.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use rust_decimal::Decimal;

use crate::auth::{require_admin, CurrentUser};
use crate::database::{
    get_for_update, list_for_update, list_records, next_id, put_record, setting_decimal,
    AppState, TABLE_EXTENSIONS, TABLE_ISSUES,
};
use crate::error::ApiError;
use crate::handler::issues::upsert_fine;
use crate::handler::notifications::notify_user;
use crate::handler::{book_title, username_of};
use crate::model::{
    CreateExtensionRequest, ExtensionOut, ExtensionRequest, ExtensionStatus, Issue,
};
use crate::policy;

fn extension_out(state: &AppState, req: ExtensionRequest) -> Result<ExtensionOut, ApiError> {
    let issue: Option<Issue> =
        crate::database::get_record(&state.db, TABLE_ISSUES, req.issue_id)?;
    let title = match &issue {
        Some(issue) => book_title(&state.db, issue.book_id)?,
        None => String::new(),
    };
    Ok(ExtensionOut {
        id: req.id,
        issue_id: req.issue_id,
        book_title: title,
        user_id: req.user_id,
        username: username_of(&state.db, req.user_id)?,
        days_requested: req.days_requested,
        reason: req.reason,
        status: req.status,
        processed_at: req.processed_at,
        created_at: req.created_at,
    })
}

pub async fn list_extensions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ExtensionOut>>, ApiError> {
    let requests: Vec<ExtensionRequest> = list_records(&state.db, TABLE_EXTENSIONS)?;
    let visible = requests
        .into_iter()
        .filter(|r| user.0.is_admin() || r.user_id == user.0.id);

    let mut out = Vec::new();
    for request in visible {
        out.push(extension_out(&state, request)?);
    }
    Ok(Json(out))
}

pub async fn create_extension(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateExtensionRequest>,
) -> Result<Response, ApiError> {
    policy::validate_extension_days(payload.days_requested)?;

    let write_txn = state.db.begin_write()?;
    let request = {
        let issue: Issue = get_for_update(&write_txn, TABLE_ISSUES, payload.issue_id)?
            .ok_or_else(|| ApiError::not_found("Issue not found"))?;
        // Students cannot file extensions against someone else's issue
        if !user.0.is_admin() && issue.user_id != user.0.id {
            return Err(ApiError::not_found("Issue not found"));
        }
        if !policy::can_extend(&issue) {
            return Err(ApiError::validation("Issue is not currently issued"));
        }

        let existing: Vec<ExtensionRequest> = list_for_update(&write_txn, TABLE_EXTENSIONS)?;
        if existing
            .iter()
            .any(|r| r.issue_id == issue.id && r.status == ExtensionStatus::Pending)
        {
            return Err(ApiError::conflict(
                "An extension request for this issue is already pending",
            ));
        }

        let id = next_id(&write_txn, "extensions")?;
        let request = ExtensionRequest {
            id,
            issue_id: issue.id,
            user_id: issue.user_id,
            days_requested: payload.days_requested,
            reason: payload.reason,
            status: ExtensionStatus::Pending,
            processed_by: None,
            processed_at: None,
            created_at: Utc::now(),
        };
        put_record(&write_txn, TABLE_EXTENSIONS, id, &request)?;
        request
    };
    write_txn.commit()?;

    Ok((StatusCode::CREATED, Json(extension_out(&state, request)?)).into_response())
}

/// PENDING -> APPROVED: pushes the issue's due date out by the requested
/// days and refreshes any fine against the new date.
pub async fn approve_extension(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<ExtensionOut>, ApiError> {
    require_admin(&user.0)?;

    let per_day = setting_decimal(&state.db, "fine_per_day", Decimal::new(200, 2))?;
    let today = Utc::now().date_naive();

    let write_txn = state.db.begin_write()?;
    let request = {
        let mut request: ExtensionRequest = get_for_update(&write_txn, TABLE_EXTENSIONS, id)?
            .ok_or_else(|| ApiError::not_found("Extension request not found"))?;
        if request.status != ExtensionStatus::Pending {
            return Err(ApiError::validation("Request not pending"));
        }

        let mut issue: Issue = get_for_update(&write_txn, TABLE_ISSUES, request.issue_id)?
            .ok_or_else(|| ApiError::not_found("Issue not found"))?;
        let base = issue.due_date.unwrap_or(today);
        issue.due_date = Some(base + chrono::Duration::days(request.days_requested as i64));
        issue.updated_at = Utc::now();
        put_record(&write_txn, TABLE_ISSUES, issue.id, &issue)?;

        // The extension may clear or shrink an accrued fine
        let amount = policy::compute_fine(issue.due_date, today, per_day);
        if amount > Decimal::ZERO {
            upsert_fine(&write_txn, issue.id, amount)?;
        }

        request.status = ExtensionStatus::Approved;
        request.processed_by = Some(user.0.id);
        request.processed_at = Some(Utc::now());
        put_record(&write_txn, TABLE_EXTENSIONS, request.id, &request)?;
        request
    };
    write_txn.commit()?;

    let out = extension_out(&state, request)?;
    notify_user(
        &state.db,
        out.user_id,
        &format!("Your extension for '{}' was approved.", out.book_title),
        "extension",
    );
    Ok(Json(out))
}

pub async fn reject_extension(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<ExtensionOut>, ApiError> {
    require_admin(&user.0)?;

    let write_txn = state.db.begin_write()?;
    let request = {
        let mut request: ExtensionRequest = get_for_update(&write_txn, TABLE_EXTENSIONS, id)?
            .ok_or_else(|| ApiError::not_found("Extension request not found"))?;
        if request.status != ExtensionStatus::Pending {
            return Err(ApiError::validation("Request not pending"));
        }

        request.status = ExtensionStatus::Rejected;
        request.processed_by = Some(user.0.id);
        request.processed_at = Some(Utc::now());
        put_record(&write_txn, TABLE_EXTENSIONS, request.id, &request)?;
        request
    };
    write_txn.commit()?;

    let out = extension_out(&state, request)?;
    notify_user(
        &state.db,
        out.user_id,
        &format!("Your extension for '{}' was rejected.", out.book_title),
        "extension",
    );
    Ok(Json(out))
}
