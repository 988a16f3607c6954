//! Pure domain rules for the issue/reservation/fine lifecycle.
//!
//! Everything here is free of HTTP and storage concerns: functions take
//! records, check a transition, and mutate the records in place or return
//! a tagged error. Handlers and tests share these rules, so the "is this
//! action allowed" logic lives in exactly one place.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::ApiError;
use crate::model::{Book, Issue, IssueStatus};

/// Longest extension a student may request, in days.
pub const MAX_EXTENSION_DAYS: u32 = 14;

/// A borrow request is only valid while at least one copy is on the shelf.
pub fn can_request(book: &Book) -> bool {
    book.available_count > 0
}

/// A reservation is only valid once the book is fully checked out.
/// Exactly one of `can_request` / `can_reserve` holds for any book.
pub fn can_reserve(book: &Book) -> bool {
    book.available_count == 0
}

/// Extensions apply only to issues that are currently out.
pub fn can_extend(issue: &Issue) -> bool {
    issue.status == IssueStatus::Issued
}

/// Server-side bound for `days_requested`; input widgets clamp to the
/// same range but are not a guarantee.
pub fn validate_extension_days(days: u32) -> Result<(), ApiError> {
    if days == 0 || days > MAX_EXTENSION_DAYS {
        return Err(ApiError::validation(format!(
            "days_requested must be between 1 and {}",
            MAX_EXTENSION_DAYS
        )));
    }
    Ok(())
}

pub fn validate_rating(rating: u8) -> Result<(), ApiError> {
    if !(1..=5).contains(&rating) {
        return Err(ApiError::validation("rating must be between 1 and 5"));
    }
    Ok(())
}

/// REQUESTED -> ISSUED. Verifies the request state and stock level, then
/// decrements `available_count` and stamps issue/due dates. The caller
/// must run this inside a single write transaction so the stock check and
/// decrement are atomic when two approvals race for the last copy.
pub fn approve_issue(
    issue: &mut Issue,
    book: &mut Book,
    today: NaiveDate,
    return_period_days: i64,
) -> Result<(), ApiError> {
    if issue.status != IssueStatus::Requested {
        return Err(ApiError::validation("Issue is not in requested state"));
    }
    if book.available_count == 0 {
        return Err(ApiError::validation("Book not available"));
    }
    book.available_count -= 1;
    issue.status = IssueStatus::Issued;
    issue.issue_date = Some(today);
    issue.due_date = Some(today + chrono::Duration::days(return_period_days));
    Ok(())
}

/// REQUESTED -> REJECTED. Terminal; no inventory change.
pub fn reject_issue(issue: &mut Issue) -> Result<(), ApiError> {
    if issue.status != IssueStatus::Requested {
        return Err(ApiError::validation("Issue is not in requested state"));
    }
    issue.status = IssueStatus::Rejected;
    Ok(())
}

/// ISSUED -> RETURNED. Increments `available_count`, refusing to exceed
/// `quantity` so a double return can never over-credit the shelf.
pub fn return_issue(issue: &mut Issue, book: &mut Book, today: NaiveDate) -> Result<(), ApiError> {
    if issue.status != IssueStatus::Issued {
        return Err(ApiError::validation("Book is not issued"));
    }
    if book.available_count >= book.quantity {
        return Err(ApiError::conflict("Inventory count out of sync for this book"));
    }
    book.available_count += 1;
    issue.status = IssueStatus::Returned;
    issue.return_date = Some(today);
    Ok(())
}

/// Fine owed for an issue: days past due x per-day rate, zero when on
/// time or when no due date was ever set.
pub fn compute_fine(due_date: Option<NaiveDate>, end_date: NaiveDate, per_day: Decimal) -> Decimal {
    let Some(due) = due_date else {
        return Decimal::ZERO;
    };
    let days_over = (end_date - due).num_days();
    if days_over > 0 {
        Decimal::from(days_over) * per_day
    } else {
        Decimal::ZERO
    }
}

/// Length-only card validation for the simulated gateway: at least 16
/// digits in the PAN (separators ignored) and at least 3 in the CVV.
/// Deliberately no Luhn check; this is a placeholder rail, not a real
/// payment integration.
pub fn validate_card(card_number: &str, cvv: &str) -> Result<(), ApiError> {
    let pan_digits = card_number.chars().filter(|c| c.is_ascii_digit()).count();
    if pan_digits < 16 || card_number.chars().any(|c| !c.is_ascii_digit() && c != ' ' && c != '-') {
        return Err(ApiError::validation("Card number must be at least 16 digits"));
    }
    if cvv.len() < 3 || !cvv.chars().all(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation("CVV must be at least 3 digits"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Book, Issue, IssueStatus};
    use chrono::{NaiveDate, Utc};

    fn book(quantity: u32, available: u32) -> Book {
        Book {
            id: 1,
            isbn: "978-0000000000".to_string(),
            title: "Test Book".to_string(),
            author_id: 1,
            category_id: None,
            quantity,
            available_count: available,
            description: String::new(),
            published_year: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn issue(status: IssueStatus) -> Issue {
        Issue {
            id: 1,
            book_id: 1,
            user_id: 1,
            status,
            issue_date: None,
            due_date: None,
            return_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn request_and_reserve_are_mutually_exclusive() {
        assert!(can_request(&book(2, 1)));
        assert!(!can_reserve(&book(2, 1)));

        assert!(!can_request(&book(2, 0)));
        assert!(can_reserve(&book(2, 0)));
    }

    #[test]
    fn approve_decrements_and_stamps_dates() {
        let mut b = book(1, 1);
        let mut i = issue(IssueStatus::Requested);
        let today = day(2026, 3, 1);

        approve_issue(&mut i, &mut b, today, 14).unwrap();

        assert_eq!(i.status, IssueStatus::Issued);
        assert_eq!(i.issue_date, Some(today));
        assert_eq!(i.due_date, Some(day(2026, 3, 15)));
        assert_eq!(b.available_count, 0);
    }

    #[test]
    fn approve_fails_when_out_of_stock() {
        let mut b = book(1, 0);
        let mut i = issue(IssueStatus::Requested);

        let err = approve_issue(&mut i, &mut b, day(2026, 3, 1), 14).unwrap_err();
        assert_eq!(err.detail, "Book not available");
        // State untouched on failure
        assert_eq!(i.status, IssueStatus::Requested);
        assert_eq!(b.available_count, 0);
    }

    #[test]
    fn approve_requires_requested_state() {
        let mut b = book(1, 1);
        for status in [IssueStatus::Issued, IssueStatus::Returned, IssueStatus::Rejected] {
            let mut i = issue(status);
            assert!(approve_issue(&mut i, &mut b, day(2026, 3, 1), 14).is_err());
            assert_eq!(b.available_count, 1);
        }
    }

    #[test]
    fn reject_is_terminal_and_leaves_inventory_alone() {
        let mut i = issue(IssueStatus::Requested);
        reject_issue(&mut i).unwrap();
        assert_eq!(i.status, IssueStatus::Rejected);

        // Rejected is terminal
        assert!(reject_issue(&mut i).is_err());
    }

    #[test]
    fn return_increments_exactly_once() {
        let mut b = book(1, 0);
        let mut i = issue(IssueStatus::Issued);
        let today = day(2026, 3, 20);

        return_issue(&mut i, &mut b, today).unwrap();
        assert_eq!(i.status, IssueStatus::Returned);
        assert_eq!(i.return_date, Some(today));
        assert_eq!(b.available_count, 1);

        // A second return is rejected and does not double-credit
        assert!(return_issue(&mut i, &mut b, today).is_err());
        assert_eq!(b.available_count, 1);
    }

    #[test]
    fn return_never_exceeds_quantity() {
        let mut b = book(1, 1);
        let mut i = issue(IssueStatus::Issued);
        assert!(return_issue(&mut i, &mut b, day(2026, 3, 20)).is_err());
        assert_eq!(b.available_count, 1);
    }

    #[test]
    fn extension_days_bounds() {
        assert!(validate_extension_days(0).is_err());
        assert!(validate_extension_days(1).is_ok());
        assert!(validate_extension_days(14).is_ok());
        assert!(validate_extension_days(15).is_err());
    }

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(6).is_err());
    }

    #[test]
    fn fine_is_days_late_times_rate() {
        let per_day: Decimal = "2.50".parse().unwrap();
        let due = Some(day(2026, 3, 10));

        assert_eq!(compute_fine(due, day(2026, 3, 10), per_day), Decimal::ZERO);
        assert_eq!(compute_fine(due, day(2026, 3, 8), per_day), Decimal::ZERO);
        assert_eq!(
            compute_fine(due, day(2026, 3, 14), per_day),
            "10.00".parse::<Decimal>().unwrap()
        );
        assert_eq!(compute_fine(None, day(2026, 3, 14), per_day), Decimal::ZERO);
    }

    #[test]
    fn card_validation_is_length_only() {
        assert!(validate_card("4111111111111111", "123").is_ok());
        // Grouped digits are accepted
        assert!(validate_card("4111 1111 1111 1111", "1234").is_ok());
        assert!(validate_card("4111-1111-1111-1111", "123").is_ok());

        assert!(validate_card("411111111111111", "123").is_err()); // 15 digits
        assert!(validate_card("4111111111111111", "12").is_err());
        assert!(validate_card("4111111111111111", "12a").is_err());
        assert!(validate_card("not-a-card-number", "123").is_err());
    }
}
