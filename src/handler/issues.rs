//! Issue lifecycle endpoints: request, approve, reject, return.
//!
//! Every transition runs inside a single write transaction so the status
//! check and the inventory adjustment are atomic; two admins racing to
//! approve the last copy serialize here and the loser gets a clean
//! validation error instead of driving `available_count` negative.

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
    setting_i64, AppState, TABLE_BOOKS, TABLE_FINES, TABLE_ISSUES,
};
use crate::error::ApiError;
use crate::handler::notifications::notify_user;
use crate::handler::{book_title, username_of};
use crate::model::{Book, CreateIssueRequest, Fine, Issue, IssueOut, IssueStatus};
use crate::policy;

fn issue_out(state: &AppState, issue: Issue) -> Result<IssueOut, ApiError> {
    let today = Utc::now().date_naive();
    Ok(IssueOut {
        id: issue.id,
        book_id: issue.book_id,
        book_title: book_title(&state.db, issue.book_id)?,
        user_id: issue.user_id,
        username: username_of(&state.db, issue.user_id)?,
        status: issue.status,
        issue_date: issue.issue_date,
        due_date: issue.due_date,
        return_date: issue.return_date,
        is_overdue: issue.is_overdue(today),
        created_at: issue.created_at,
    })
}

/// Admins see every issue; students see their own.
pub async fn list_issues(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<IssueOut>>, ApiError> {
    let issues: Vec<Issue> = list_records(&state.db, TABLE_ISSUES)?;
    let visible = issues
        .into_iter()
        .filter(|issue| user.0.is_admin() || issue.user_id == user.0.id);

    let mut out = Vec::new();
    for issue in visible {
        out.push(issue_out(&state, issue)?);
    }
    Ok(Json(out))
}

/// Students request a borrow; the record starts in REQUESTED. Requesting
/// an out-of-stock book is rejected; the client offers Reserve instead.
pub async fn create_issue(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateIssueRequest>,
) -> Result<Response, ApiError> {
    let now = Utc::now();
    let write_txn = state.db.begin_write()?;
    let issue = {
        let book: Book = get_for_update(&write_txn, TABLE_BOOKS, payload.book_id)?
            .ok_or_else(|| ApiError::not_found("Book not found"))?;
        if !policy::can_request(&book) {
            return Err(ApiError::validation("Book not available. Reserve it instead."));
        }

        let id = next_id(&write_txn, "issues")?;
        let issue = Issue {
            id,
            book_id: book.id,
            user_id: user.0.id,
            status: IssueStatus::Requested,
            issue_date: None,
            due_date: None,
            return_date: None,
            created_at: now,
            updated_at: now,
        };
        put_record(&write_txn, TABLE_ISSUES, id, &issue)?;
        issue
    };
    write_txn.commit()?;

    Ok((StatusCode::CREATED, Json(issue_out(&state, issue)?)).into_response())
}

pub async fn approve_issue(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<IssueOut>, ApiError> {
    require_admin(&user.0)?;

    let return_period = setting_i64(&state.db, "return_period_days", 14)?;
    let today = Utc::now().date_naive();

    let write_txn = state.db.begin_write()?;
    let issue = {
        let mut issue: Issue = get_for_update(&write_txn, TABLE_ISSUES, id)?
            .ok_or_else(|| ApiError::not_found("Issue not found"))?;
        let mut book: Book = get_for_update(&write_txn, TABLE_BOOKS, issue.book_id)?
            .ok_or_else(|| ApiError::not_found("Book not found"))?;

        policy::approve_issue(&mut issue, &mut book, today, return_period)?;
        issue.updated_at = Utc::now();

        put_record(&write_txn, TABLE_BOOKS, book.id, &book)?;
        put_record(&write_txn, TABLE_ISSUES, issue.id, &issue)?;
        issue
    };
    write_txn.commit()?;

    let title = book_title(&state.db, issue.book_id)?;
    notify_user(
        &state.db,
        issue.user_id,
        &format!("Your borrow request for '{}' was approved.", title),
        "issue",
    );

    issue_out(&state, issue).map(Json)
}

pub async fn reject_issue(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<IssueOut>, ApiError> {
    require_admin(&user.0)?;

    let write_txn = state.db.begin_write()?;
    let issue = {
        let mut issue: Issue = get_for_update(&write_txn, TABLE_ISSUES, id)?
            .ok_or_else(|| ApiError::not_found("Issue not found"))?;

        policy::reject_issue(&mut issue)?;
        issue.updated_at = Utc::now();

        put_record(&write_txn, TABLE_ISSUES, issue.id, &issue)?;
        issue
    };
    write_txn.commit()?;

    let title = book_title(&state.db, issue.book_id)?;
    notify_user(
        &state.db,
        issue.user_id,
        &format!("Your borrow request for '{}' was rejected.", title),
        "issue",
    );

    issue_out(&state, issue).map(Json)
}

/// ISSUED -> RETURNED. Credits the copy back and, when the return is past
/// due, creates (or refreshes) the fine at days late x fine_per_day.
pub async fn return_book(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<Json<IssueOut>, ApiError> {
    require_admin(&user.0)?;

    let per_day = setting_decimal(&state.db, "fine_per_day", Decimal::new(200, 2))?;
    let today = Utc::now().date_naive();

    let write_txn = state.db.begin_write()?;
    let (issue, fine_amount) = {
        let mut issue: Issue = get_for_update(&write_txn, TABLE_ISSUES, id)?
            .ok_or_else(|| ApiError::not_found("Issue not found"))?;
        let mut book: Book = get_for_update(&write_txn, TABLE_BOOKS, issue.book_id)?
            .ok_or_else(|| ApiError::not_found("Book not found"))?;

        policy::return_issue(&mut issue, &mut book, today)?;
        issue.updated_at = Utc::now();

        put_record(&write_txn, TABLE_BOOKS, book.id, &book)?;
        put_record(&write_txn, TABLE_ISSUES, issue.id, &issue)?;

        let amount = policy::compute_fine(issue.due_date, today, per_day);
        if amount > Decimal::ZERO {
            upsert_fine(&write_txn, issue.id, amount)?;
        }
        (issue, amount)
    };
    write_txn.commit()?;

    let title = book_title(&state.db, issue.book_id)?;
    let message = if fine_amount > Decimal::ZERO {
        format!("'{}' was returned late. A fine of {} has been applied.", title, fine_amount)
    } else {
        format!("'{}' was returned. Thank you!", title)
    };
    notify_user(&state.db, issue.user_id, &message, "issue");

    issue_out(&state, issue).map(Json)
}

/// One fine per issue: refresh the amount if a fine row already exists,
/// otherwise create it unpaid.
pub(crate) fn upsert_fine(
    write_txn: &redb::WriteTransaction,
    issue_id: u64,
    amount: Decimal,
) -> Result<(), ApiError> {
    let fines: Vec<Fine> = list_for_update(write_txn, TABLE_FINES)?;
    if let Some(mut fine) = fines.into_iter().find(|f| f.issue_id == issue_id) {
        fine.amount = amount;
        fine.paid = false;
        put_record(write_txn, TABLE_FINES, fine.id, &fine)?;
    } else {
        let id = next_id(write_txn, "fines")?;
        let fine = Fine { id, issue_id, amount, paid: false, created_at: Utc::now() };
        put_record(write_txn, TABLE_FINES, id, &fine)?;
    }
    Ok(())
}
