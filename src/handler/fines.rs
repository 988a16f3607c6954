//! Fines (read-only) and fine payments through the payment provider.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use crate::auth::CurrentUser;
use crate::database::{
    get_for_update, get_record, list_records, next_id, put_record, AppState, TABLE_FINES,
    TABLE_FINE_PAYMENTS, TABLE_ISSUES,
};
use crate::error::ApiError;
use crate::handler::{book_title, username_of};
use crate::model::{
    CreatePaymentRequest, Fine, FineOut, FinePayment, Issue, PaymentStatus,
};
use crate::payment::CardDetails;

fn fine_out(state: &AppState, fine: Fine) -> Result<FineOut, ApiError> {
    let issue: Option<Issue> = get_record(&state.db, TABLE_ISSUES, fine.issue_id)?;
    let (title, username) = match &issue {
        Some(issue) => (
            book_title(&state.db, issue.book_id)?,
            username_of(&state.db, issue.user_id)?,
        ),
        None => (String::new(), String::new()),
    };
    Ok(FineOut {
        id: fine.id,
        issue_id: fine.issue_id,
        book_title: title,
        username,
        amount: fine.amount,
        paid: fine.paid,
        status: if fine.paid { "PAID" } else { "UNPAID" },
        created_at: fine.created_at,
    })
}

/// The user an issue (and thus a fine) belongs to.
fn fine_owner(state: &AppState, fine: &Fine) -> Result<Option<u64>, ApiError> {
    Ok(get_record::<Issue>(&state.db, TABLE_ISSUES, fine.issue_id)?.map(|i| i.user_id))
}

pub async fn list_fines(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<FineOut>>, ApiError> {
    let fines: Vec<Fine> = list_records(&state.db, TABLE_FINES)?;

    let mut out = Vec::new();
    for fine in fines {
        if !user.0.is_admin() && fine_owner(&state, &fine)? != Some(user.0.id) {
            continue;
        }
        out.push(fine_out(&state, fine)?);
    }
    Ok(Json(out))
}

pub async fn list_payments(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<FinePayment>>, ApiError> {
    let payments: Vec<FinePayment> = list_records(&state.db, TABLE_FINE_PAYMENTS)?;
    Ok(Json(
        payments
            .into_iter()
            .filter(|p| user.0.is_admin() || p.user_id == user.0.id)
            .collect(),
    ))
}

/// Settles a fine through the configured payment provider. The provider
/// validates the card and simulates processing; on success the payment is
/// recorded and the fine flipped to paid within one transaction.
pub async fn create_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreatePaymentRequest>,
) -> Result<Response, ApiError> {
    let fine: Fine = get_record(&state.db, TABLE_FINES, payload.fine_id)?
        .ok_or_else(|| ApiError::not_found("Fine not found"))?;

    if !user.0.is_admin() && fine_owner(&state, &fine)? != Some(user.0.id) {
        return Err(ApiError::not_found("Fine not found"));
    }
    if fine.paid {
        return Err(ApiError::conflict("Fine already paid"));
    }

    let card = CardDetails {
        card_number: payload.card_number,
        cvv: payload.cvv,
        expiry: payload.expiry,
    };
    let outcome = state.payment.process(fine.amount, card).await?;

    let write_txn = state.db.begin_write()?;
    let payment = {
        // Re-check under the write lock: another request may have paid it
        // while the gateway was processing.
        let mut fine: Fine = get_for_update(&write_txn, TABLE_FINES, payload.fine_id)?
            .ok_or_else(|| ApiError::not_found("Fine not found"))?;
        if fine.paid {
            return Err(ApiError::conflict("Fine already paid"));
        }

        let id = next_id(&write_txn, "fine_payments")?;
        let payment = FinePayment {
            id,
            fine_id: fine.id,
            user_id: user.0.id,
            amount: fine.amount,
            mode: payload.mode.unwrap_or_else(|| "Simulated".to_string()),
            reference: outcome.reference,
            status: outcome.status,
            created_at: Utc::now(),
        };
        put_record(&write_txn, TABLE_FINE_PAYMENTS, id, &payment)?;

        if payment.status == PaymentStatus::Paid {
            fine.paid = true;
            put_record(&write_txn, TABLE_FINES, fine.id, &fine)?;
        }
        payment
    };
    write_txn.commit()?;

    Ok((StatusCode::CREATED, Json(payment)).into_response())
}
