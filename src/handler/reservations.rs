//! Reservation endpoints. A reservation can only be placed while the
//! book is fully checked out; cancelling is the only transition this
//! service drives.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use crate::auth::CurrentUser;
use crate::database::{
    get_for_update, list_for_update, list_records, next_id, put_record, AppState, TABLE_BOOKS,
    TABLE_RESERVATIONS,
};
use crate::error::ApiError;
use crate::handler::{book_title, username_of};
use crate::model::{
    Book, CreateReservationRequest, Reservation, ReservationOut, ReservationStatus,
};
use crate::policy;

fn reservation_out(state: &AppState, r: Reservation) -> Result<ReservationOut, ApiError> {
    Ok(ReservationOut {
        id: r.id,
        book_id: r.book_id,
        book_title: book_title(&state.db, r.book_id)?,
        user_id: r.user_id,
        username: username_of(&state.db, r.user_id)?,
        status: r.status,
        created_at: r.created_at,
    })
}

pub async fn list_reservations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<ReservationOut>>, ApiError> {
    let reservations: Vec<Reservation> = list_records(&state.db, TABLE_RESERVATIONS)?;
    let visible = reservations
        .into_iter()
        .filter(|r| user.0.is_admin() || r.user_id == user.0.id);

    let mut out = Vec::new();
    for reservation in visible {
        out.push(reservation_out(&state, reservation)?);
    }
    Ok(Json(out))
}

pub async fn create_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateReservationRequest>,
) -> Result<Response, ApiError> {
    let write_txn = state.db.begin_write()?;
    let reservation = {
        let book: Book = get_for_update(&write_txn, TABLE_BOOKS, payload.book_id)?
            .ok_or_else(|| ApiError::not_found("Book not found"))?;
        if !policy::can_reserve(&book) {
            return Err(ApiError::validation("Book is still available. Request it instead."));
        }

        let existing: Vec<Reservation> = list_for_update(&write_txn, TABLE_RESERVATIONS)?;
        if existing.iter().any(|r| {
            r.book_id == book.id
                && r.user_id == user.0.id
                && r.status == ReservationStatus::Active
        }) {
            return Err(ApiError::conflict(
                "You already have an active reservation for this book",
            ));
        }

        let id = next_id(&write_txn, "reservations")?;
        let reservation = Reservation {
            id,
            book_id: book.id,
            user_id: user.0.id,
            status: ReservationStatus::Active,
            created_at: Utc::now(),
        };
        put_record(&write_txn, TABLE_RESERVATIONS, id, &reservation)?;
        reservation
    };
    write_txn.commit()?;

    Ok((StatusCode::CREATED, Json(reservation_out(&state, reservation)?)).into_response())
}

/// DELETE cancels: the row is kept with status CANCELLED rather than
/// removed, so the history stays visible to admins.
pub async fn cancel_reservation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let write_txn = state.db.begin_write()?;
    {
        let mut reservation: Reservation =
            get_for_update(&write_txn, TABLE_RESERVATIONS, id)?
                .ok_or_else(|| ApiError::not_found("Reservation not found"))?;

        if !user.0.is_admin() && reservation.user_id != user.0.id {
            return Err(ApiError::not_found("Reservation not found"));
        }
        if reservation.status != ReservationStatus::Active {
            return Err(ApiError::validation("Reservation is not active"));
        }

        reservation.status = ReservationStatus::Cancelled;
        put_record(&write_txn, TABLE_RESERVATIONS, id, &reservation)?;
    }
    write_txn.commit()?;

    Ok(StatusCode::NO_CONTENT)
}
