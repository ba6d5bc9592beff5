use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::model::Transaction;

/// Pure gate applied to every record before any write.
///
/// A record is valid when name and email are non-empty, the amount is
/// positive and the transaction date carries a real value. The codec emits
/// `NaiveDateTime::default()` for a missing or empty date column, so the
/// default stands in for "no date".
pub fn is_valid(transaction: &Transaction) -> bool {
    !transaction.name.is_empty()
        && !transaction.email.is_empty()
        && transaction.amount > Decimal::ZERO
        && transaction.transaction_date != NaiveDateTime::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Transaction {
        Transaction {
            transaction_id: "T1".to_string(),
            name: "John Doe".to_string(),
            email: "john@example.com".to_string(),
            amount: Decimal::new(1000, 2),
            transaction_date: NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
            client_location: "40.7128, -74.0060".to_string(),
        }
    }

    #[test]
    fn accepts_complete_record() {
        assert!(is_valid(&sample()));
    }

    #[test]
    fn rejects_empty_name() {
        let mut transaction = sample();
        transaction.name.clear();
        assert!(!is_valid(&transaction));
    }

    #[test]
    fn rejects_empty_email() {
        let mut transaction = sample();
        transaction.email.clear();
        assert!(!is_valid(&transaction));
    }

    #[test]
    fn rejects_zero_amount() {
        let mut transaction = sample();
        transaction.amount = Decimal::ZERO;
        assert!(!is_valid(&transaction));
    }

    #[test]
    fn rejects_negative_amount() {
        let mut transaction = sample();
        transaction.amount = Decimal::new(-500, 2);
        assert!(!is_valid(&transaction));
    }

    #[test]
    fn rejects_missing_date() {
        let mut transaction = sample();
        transaction.transaction_date = NaiveDateTime::default();
        assert!(!is_valid(&transaction));
    }
}
