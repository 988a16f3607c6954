//! Book reviews with moderation. One review per (user, book); moderators
//! flip status between PENDING/APPROVED/HIDDEN, authors may edit their
//! own text and rating.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use crate::auth::{require_admin, CurrentUser};
use crate::database::{
    get_for_update, get_record, list_for_update, list_records, next_id, put_record, AppState,
    TABLE_BOOKS, TABLE_REVIEWS,
};
use crate::error::ApiError;
use crate::handler::{book_title, username_of};
use crate::model::{
    Book, CreateReviewRequest, PatchReviewRequest, Review, ReviewListParams, ReviewOut,
    ReviewStatus,
};
use crate::policy;

fn review_out(state: &AppState, review: Review) -> Result<ReviewOut, ApiError> {
    Ok(ReviewOut {
        id: review.id,
        book_id: review.book_id,
        book_title: book_title(&state.db, review.book_id)?,
        user_id: review.user_id,
        username: username_of(&state.db, review.user_id)?,
        rating: review.rating,
        text: review.text,
        status: review.status,
        created_at: review.created_at,
    })
}

/// Moderators see everything; everyone else sees approved reviews plus
/// their own in any status.
pub async fn list_reviews(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ReviewListParams>,
) -> Result<Json<Vec<ReviewOut>>, ApiError> {
    let reviews: Vec<Review> = list_records(&state.db, TABLE_REVIEWS)?;
    let visible = reviews.into_iter().filter(|review| {
        if let Some(book_id) = params.book {
            if review.book_id != book_id {
                return false;
            }
        }
        user.0.is_admin()
            || review.status == ReviewStatus::Approved
            || review.user_id == user.0.id
    });

    let mut out = Vec::new();
    for review in visible {
        out.push(review_out(&state, review)?);
    }
    Ok(Json(out))
}

pub async fn create_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<Response, ApiError> {
    policy::validate_rating(payload.rating)?;

    if get_record::<Book>(&state.db, TABLE_BOOKS, payload.book_id)?.is_none() {
        return Err(ApiError::not_found("Book not found"));
    }

    let now = Utc::now();
    let write_txn = state.db.begin_write()?;
    let review = {
        let existing: Vec<Review> = list_for_update(&write_txn, TABLE_REVIEWS)?;
        if existing
            .iter()
            .any(|r| r.book_id == payload.book_id && r.user_id == user.0.id)
        {
            return Err(ApiError::conflict("You have already reviewed this book"));
        }

        let id = next_id(&write_txn, "reviews")?;
        let review = Review {
            id,
            book_id: payload.book_id,
            user_id: user.0.id,
            rating: payload.rating,
            text: payload.text,
            status: ReviewStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        put_record(&write_txn, TABLE_REVIEWS, id, &review)?;
        review
    };
    write_txn.commit()?;

    Ok((StatusCode::CREATED, Json(review_out(&state, review)?)).into_response())
}

fn status_transition_allowed(from: ReviewStatus, to: ReviewStatus) -> bool {
    matches!(
        (from, to),
        (ReviewStatus::Pending, ReviewStatus::Approved)
            | (ReviewStatus::Pending, ReviewStatus::Hidden)
            | (ReviewStatus::Approved, ReviewStatus::Hidden)
            | (ReviewStatus::Hidden, ReviewStatus::Approved)
    )
}

pub async fn patch_review(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
    Json(payload): Json<PatchReviewRequest>,
) -> Result<Json<ReviewOut>, ApiError> {
    let write_txn = state.db.begin_write()?;
    let review = {
        let mut review: Review = get_for_update(&write_txn, TABLE_REVIEWS, id)?
            .ok_or_else(|| ApiError::not_found("Review not found"))?;

        if let Some(status) = payload.status {
            require_admin(&user.0)?;
            if status != review.status {
                if !status_transition_allowed(review.status, status) {
                    return Err(ApiError::validation("Invalid status transition"));
                }
                review.status = status;
            }
        }

        if payload.rating.is_some() || payload.text.is_some() {
            if review.user_id != user.0.id {
                return Err(ApiError::forbidden("Only the author can edit a review"));
            }
            if let Some(rating) = payload.rating {
                policy::validate_rating(rating)?;
                review.rating = rating;
            }
            if let Some(text) = payload.text {
                review.text = text;
            }
        }

        review.updated_at = Utc::now();
        put_record(&write_txn, TABLE_REVIEWS, review.id, &review)?;
        review
    };
    write_txn.commit()?;

    review_out(&state, review).map(Json)
}
