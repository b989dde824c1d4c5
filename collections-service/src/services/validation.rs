//! Pure validators for invoice inputs and status transitions.
//!
//! Everything here is side-effect free and runs before any persistence
//! call. Date rules return a named violation rather than a bare bool so
//! callers can surface the specific broken rule.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{ExpectedDateOrigin, InvoiceStatus};

/// Currencies the engine accepts.
pub const ALLOWED_CURRENCIES: &[&str] = &[
    "USD", "EUR", "GBP", "CHF", "SEK", "NOK", "DKK", "PLN", "CZK", "CAD", "AUD", "NZD", "JPY",
    "BRL", "MXN",
];

const MAX_INVOICE_NUMBER_LEN: usize = 50;

/// Largest accepted invoice amount: 999,999,999.99.
pub fn max_amount() -> Decimal {
    Decimal::new(99_999_999_999, 2)
}

/// Amount must be positive, at most `max_amount`, with at most two
/// fractional digits.
pub fn is_valid_amount(amount: Decimal) -> bool {
    amount > Decimal::ZERO && amount <= max_amount() && amount.normalize().scale() <= 2
}

pub fn normalize_currency(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Allow-list membership, case-insensitive.
pub fn is_valid_currency(code: &str) -> bool {
    let normalized = normalize_currency(code);
    ALLOWED_CURRENCIES.contains(&normalized.as_str())
}

/// A named date-rule violation; Display gives the human-readable reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DateRuleViolation {
    #[error("issue date must not be after due date")]
    IssueAfterDue,
    #[error("expected payment date must not be before issue date")]
    ExpectedBeforeIssue,
    #[error("expected payment date requires a date origin")]
    MissingOrigin,
    #[error("date origin requires an expected payment date")]
    OrphanOrigin,
}

pub fn validate_invoice_dates(
    issue_date: NaiveDate,
    due_date: NaiveDate,
    expected_payment_date: Option<NaiveDate>,
) -> Result<(), DateRuleViolation> {
    if issue_date > due_date {
        return Err(DateRuleViolation::IssueAfterDue);
    }
    if let Some(expected) = expected_payment_date {
        if expected < issue_date {
            return Err(DateRuleViolation::ExpectedBeforeIssue);
        }
    }
    Ok(())
}

/// Promise dates are day-granular and must not be in the past relative to
/// the caller-supplied reference day.
pub fn is_valid_promise_date(promise_date: NaiveDate, today: NaiveDate) -> bool {
    promise_date >= today
}

/// The origin is required exactly when an expected date is present.
pub fn validate_date_origin(
    expected_payment_date: Option<NaiveDate>,
    origin: Option<ExpectedDateOrigin>,
) -> Result<(), DateRuleViolation> {
    match (expected_payment_date, origin) {
        (Some(_), None) => Err(DateRuleViolation::MissingOrigin),
        (None, Some(_)) => Err(DateRuleViolation::OrphanOrigin),
        _ => Ok(()),
    }
}

/// Table lookup against the status edge set.
pub fn is_valid_status_transition(from: InvoiceStatus, to: InvoiceStatus) -> bool {
    from.can_transition_to(to)
}

/// Trim, uppercase, and collapse internal whitespace runs to a single
/// hyphen.
pub fn normalize_invoice_number(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .to_ascii_uppercase()
}

/// Valid after normalization: 1-50 chars from [A-Za-z0-9_-].
pub fn is_valid_invoice_number(number: &str) -> bool {
    !number.is_empty()
        && number.len() <= MAX_INVOICE_NUMBER_LEN
        && number
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn amount_bounds_and_scale() {
        assert!(is_valid_amount(dec("100.55")));
        assert!(is_valid_amount(dec("0.01")));
        assert!(is_valid_amount(dec("999999999.99")));
        assert!(is_valid_amount(dec("100.550"))); // trailing zero, still two digits
        assert!(!is_valid_amount(dec("100.555")));
        assert!(!is_valid_amount(dec("0")));
        assert!(!is_valid_amount(dec("-5")));
        assert!(!is_valid_amount(dec("1000000000.00")));
    }

    #[test]
    fn currency_allow_list_is_case_insensitive() {
        assert!(is_valid_currency("USD"));
        assert!(is_valid_currency("usd"));
        assert!(is_valid_currency(" eur "));
        assert!(!is_valid_currency("XXX"));
        assert!(!is_valid_currency(""));
    }

    #[test]
    fn issue_after_due_is_rejected() {
        let err = validate_invoice_dates(date(2026, 3, 10), date(2026, 3, 1), None).unwrap_err();
        assert_eq!(err, DateRuleViolation::IssueAfterDue);
    }

    #[test]
    fn expected_before_issue_is_rejected() {
        let err = validate_invoice_dates(
            date(2026, 3, 10),
            date(2026, 4, 10),
            Some(date(2026, 3, 1)),
        )
        .unwrap_err();
        assert_eq!(err, DateRuleViolation::ExpectedBeforeIssue);
        assert!(validate_invoice_dates(
            date(2026, 3, 10),
            date(2026, 4, 10),
            Some(date(2026, 3, 10)),
        )
        .is_ok());
    }

    #[test]
    fn date_origin_must_pair_with_expected_date() {
        let expected = Some(date(2026, 4, 1));
        let origin = Some(ExpectedDateOrigin::CustomerCommitment);
        assert!(validate_date_origin(None, None).is_ok());
        assert!(validate_date_origin(expected, origin).is_ok());
        assert_eq!(
            validate_date_origin(expected, None),
            Err(DateRuleViolation::MissingOrigin)
        );
        assert_eq!(
            validate_date_origin(None, origin),
            Err(DateRuleViolation::OrphanOrigin)
        );
    }

    #[test]
    fn promise_date_must_not_be_past() {
        let today = date(2026, 3, 10);
        assert!(!is_valid_promise_date(date(2026, 3, 9), today));
        assert!(is_valid_promise_date(today, today));
        assert!(is_valid_promise_date(date(2026, 3, 11), today));
    }

    #[test]
    fn transition_table_matches_the_edge_set() {
        use InvoiceStatus::*;
        let statuses = [Draft, Pending, PartiallyPaid, Overdue, Paid, Cancelled];
        let edges = [
            (Draft, Pending),
            (Draft, Paid),
            (Draft, Cancelled),
            (Pending, PartiallyPaid),
            (Pending, Paid),
            (Pending, Overdue),
            (Pending, Cancelled),
            (PartiallyPaid, Paid),
            (PartiallyPaid, Overdue),
            (PartiallyPaid, Cancelled),
            (Overdue, Paid),
            (Overdue, Cancelled),
            (Paid, Pending),
        ];
        for from in statuses {
            for to in statuses {
                let expected = edges.contains(&(from, to));
                assert_eq!(
                    is_valid_status_transition(from, to),
                    expected,
                    "({}, {})",
                    from.as_str(),
                    to.as_str()
                );
            }
        }
    }

    #[test]
    fn invoice_number_normalization() {
        assert_eq!(normalize_invoice_number("  inv 001  "), "INV-001");
        assert_eq!(normalize_invoice_number("inv\t00  1"), "INV-00-1");
        assert_eq!(normalize_invoice_number("fak_2026-17"), "FAK_2026-17");
    }

    #[test]
    fn invoice_number_format() {
        assert!(is_valid_invoice_number("INV-001"));
        assert!(is_valid_invoice_number("A"));
        assert!(!is_valid_invoice_number(""));
        assert!(!is_valid_invoice_number("INV#1"));
        assert!(!is_valid_invoice_number(&"X".repeat(51)));
    }
}
