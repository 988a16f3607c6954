//! Book suggestions: students propose titles, admins move them through
//! PENDING -> APPROVED -> ADDED or PENDING -> REJECTED.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use crate::auth::{require_admin, CurrentUser};
use crate::database::{
    delete_record, get_for_update, list_records, next_id, put_record, AppState,
    TABLE_SUGGESTIONS,
};
use crate::error::ApiError;
use crate::handler::notifications::notify_user;
use crate::handler::username_of;
use crate::model::{
    PatchSuggestionRequest, Suggestion, SuggestionOut, SuggestionPayload, SuggestionStatus,
};

fn suggestion_out(state: &AppState, s: Suggestion) -> Result<SuggestionOut, ApiError> {
    Ok(SuggestionOut {
        id: s.id,
        title: s.title,
        author: s.author,
        category: s.category,
        reason: s.reason,
        status: s.status,
        admin_note: s.admin_note,
        created_by: s.created_by,
        created_by_username: username_of(&state.db, s.created_by)?,
        created_at: s.created_at,
    })
}

pub async fn list_suggestions(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<SuggestionOut>>, ApiError> {
    let suggestions: Vec<Suggestion> = list_records(&state.db, TABLE_SUGGESTIONS)?;
    let visible = suggestions
        .into_iter()
        .filter(|s| user.0.is_admin() || s.created_by == user.0.id);

    let mut out = Vec::new();
    for suggestion in visible {
        out.push(suggestion_out(&state, suggestion)?);
    }
    Ok(Json(out))
}

pub async fn create_suggestion(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<SuggestionPayload>,
) -> Result<Response, ApiError> {
    if payload.title.trim().is_empty() {
        return Err(ApiError::validation("Title is required"));
    }

    let now = Utc::now();
    let write_txn = state.db.begin_write()?;
    let suggestion = {
        let id = next_id(&write_txn, "suggestions")?;
        let suggestion = Suggestion {
            id,
            title: payload.title,
            author: payload.author,
            category: payload.category,
            reason: payload.reason,
            status: SuggestionStatus::Pending,
            admin_note: String::new(),
            created_by: user.0.id,
            created_at: now,
            updated_at: now,
        };
        put_record(&write_txn, TABLE_SUGGESTIONS, id, &suggestion)?;
        suggestion
    };
    write_txn.commit()?;

    Ok((StatusCode::CREATED, Json(suggestion_out(&state, suggestion)?)).into_response())
}

/// PUT: the author may rewrite a suggestion while it is still pending.
pub async fn update_suggestion(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
    Json(payload): Json<SuggestionPayload>,
) -> Result<Json<SuggestionOut>, ApiError> {
    let write_txn = state.db.begin_write()?;
    let suggestion = {
        let mut suggestion: Suggestion = get_for_update(&write_txn, TABLE_SUGGESTIONS, id)?
            .ok_or_else(|| ApiError::not_found("Suggestion not found"))?;

        if suggestion.created_by != user.0.id {
            return Err(ApiError::not_found("Suggestion not found"));
        }
        if suggestion.status != SuggestionStatus::Pending {
            return Err(ApiError::validation("Only pending suggestions can be edited"));
        }

        suggestion.title = payload.title;
        suggestion.author = payload.author;
        suggestion.category = payload.category;
        suggestion.reason = payload.reason;
        suggestion.updated_at = Utc::now();
        put_record(&write_txn, TABLE_SUGGESTIONS, id, &suggestion)?;
        suggestion
    };
    write_txn.commit()?;

    suggestion_out(&state, suggestion).map(Json)
}

fn status_transition_allowed(from: SuggestionStatus, to: SuggestionStatus) -> bool {
    matches!(
        (from, to),
        (SuggestionStatus::Pending, SuggestionStatus::Approved)
            | (SuggestionStatus::Pending, SuggestionStatus::Rejected)
            | (SuggestionStatus::Approved, SuggestionStatus::Added)
    )
}

/// PATCH: admin moderation. ADDED and REJECTED are terminal, so any
/// attempt to move a resolved suggestion fails.
pub async fn patch_suggestion(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
    Json(payload): Json<PatchSuggestionRequest>,
) -> Result<Json<SuggestionOut>, ApiError> {
    require_admin(&user.0)?;

    let write_txn = state.db.begin_write()?;
    let (suggestion, status_changed) = {
        let mut suggestion: Suggestion = get_for_update(&write_txn, TABLE_SUGGESTIONS, id)?
            .ok_or_else(|| ApiError::not_found("Suggestion not found"))?;

        let mut changed = None;
        if let Some(status) = payload.status {
            if status != suggestion.status {
                if !status_transition_allowed(suggestion.status, status) {
                    return Err(ApiError::validation("Invalid status transition"));
                }
                suggestion.status = status;
                changed = Some(status);
            }
        }
        if let Some(note) = payload.admin_note {
            suggestion.admin_note = note;
        }
        suggestion.updated_at = Utc::now();
        put_record(&write_txn, TABLE_SUGGESTIONS, id, &suggestion)?;
        (suggestion, changed)
    };
    write_txn.commit()?;

    if let Some(status) = status_changed {
        let verb = match status {
            SuggestionStatus::Approved => "approved",
            SuggestionStatus::Rejected => "rejected",
            SuggestionStatus::Added => "added to the library",
            SuggestionStatus::Pending => "updated",
        };
        notify_user(
            &state.db,
            suggestion.created_by,
            &format!("Your suggestion '{}' was {}.", suggestion.title, verb),
            "suggestion",
        );
    }

    suggestion_out(&state, suggestion).map(Json)
}

/// DELETE: the author may withdraw a pending suggestion; admins may
/// remove any.
pub async fn delete_suggestion(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let write_txn = state.db.begin_write()?;
    {
        let suggestion: Suggestion = get_for_update(&write_txn, TABLE_SUGGESTIONS, id)?
            .ok_or_else(|| ApiError::not_found("Suggestion not found"))?;

        if !user.0.is_admin() {
            if suggestion.created_by != user.0.id {
                return Err(ApiError::not_found("Suggestion not found"));
            }
            if suggestion.status != SuggestionStatus::Pending {
                return Err(ApiError::validation(
                    "Only pending suggestions can be withdrawn",
                ));
            }
        }
        delete_record(&write_txn, TABLE_SUGGESTIONS, id)?;
    }
    write_txn.commit()?;

    Ok(StatusCode::NO_CONTENT)
}
