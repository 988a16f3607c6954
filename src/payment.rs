//! Payment provider abstraction for fine payments.
//!
//! The production system has no real gateway: fines are settled through a
//! simulated rail that validates card input by length only, waits a fixed
//! processing delay, and always succeeds. The trait exists so a real
//! gateway can be substituted without touching any call site.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use rand::{distr::Alphanumeric, Rng};
use rust_decimal::Decimal;

use crate::error::ApiError;
use crate::model::PaymentStatus;
use crate::policy;

/// Card fields as submitted by the client. The number may contain digit
/// groups separated by spaces or dashes.
#[derive(Debug, Clone)]
pub struct CardDetails {
    pub card_number: String,
    pub cvv: String,
    pub expiry: Option<String>,
}

/// Result of a charge attempt: a terminal status plus an opaque
/// gateway reference.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    pub status: PaymentStatus,
    pub reference: String,
}

type ChargeFuture = Pin<Box<dyn Future<Output = Result<PaymentOutcome, ApiError>> + Send>>;

pub trait PaymentProvider: Send + Sync {
    /// Attempts to charge `amount` against the given card. Validation
    /// failures surface as tagged errors; a completed charge returns an
    /// outcome with a reference string.
    fn process(&self, amount: Decimal, card: CardDetails) -> ChargeFuture;
}

/// Stand-in gateway: length-only card validation, a fixed delay in place
/// of a real authorization round-trip, then unconditional success.
pub struct SimulatedGateway {
    processing_delay: Duration,
}

impl SimulatedGateway {
    pub fn new(processing_delay: Duration) -> Self {
        Self { processing_delay }
    }

    /// Zero-delay variant for tests.
    pub fn instant() -> Self {
        Self { processing_delay: Duration::ZERO }
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        // Mirrors the UI's staged "processing" timer
        Self::new(Duration::from_millis(2500))
    }
}

impl PaymentProvider for SimulatedGateway {
    fn process(&self, _amount: Decimal, card: CardDetails) -> ChargeFuture {
        let delay = self.processing_delay;
        Box::pin(async move {
            policy::validate_card(&card.card_number, &card.cvv)?;

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let reference: String = rand::rng()
                .sample_iter(&Alphanumeric)
                .take(12)
                .map(char::from)
                .collect();

            Ok(PaymentOutcome {
                status: PaymentStatus::Paid,
                reference: format!("SIM-{}", reference.to_uppercase()),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn simulated_gateway_accepts_valid_card() {
        let gateway = SimulatedGateway::instant();
        let card = CardDetails {
            card_number: "4111 1111 1111 1111".to_string(),
            cvv: "123".to_string(),
            expiry: Some("12/27".to_string()),
        };

        let outcome = gateway.process("50.00".parse().unwrap(), card).await.unwrap();
        assert_eq!(outcome.status, PaymentStatus::Paid);
        assert!(outcome.reference.starts_with("SIM-"));
    }

    #[tokio::test]
    async fn simulated_gateway_rejects_short_pan() {
        let gateway = SimulatedGateway::instant();
        let card = CardDetails {
            card_number: "4111".to_string(),
            cvv: "123".to_string(),
            expiry: None,
        };

        let err = gateway.process("50.00".parse().unwrap(), card).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
