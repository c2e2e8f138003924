//! Month-end reminders
//!
//! Lists the investments and unpaid loans that still need a value or balance
//! entered for a month.

use serde::Serialize;

use crate::error::TrackerResult;
use crate::models::YearMonth;
use crate::storage::{InvestmentRepository, LoanRepository, Storage};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReminderItem {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReminderStatus {
    pub year: i32,
    pub month: u32,
    pub investments_missing: Vec<ReminderItem>,
    pub loans_missing: Vec<ReminderItem>,
    pub has_reminders: bool,
}

impl ReminderStatus {
    pub fn generate(storage: &Storage, month: YearMonth) -> TrackerResult<Self> {
        let conn = storage.connection()?;

        let investments = InvestmentRepository::new(&conn);
        let mut investments_missing = Vec::new();
        for id in investments.missing_value_ids(month.year, month.month)? {
            if let Some(investment) = investments.get(id)? {
                investments_missing.push(ReminderItem {
                    id,
                    name: investment.name,
                });
            }
        }

        let loans = LoanRepository::new(&conn);
        let mut loans_missing = Vec::new();
        for id in loans.missing_balance_ids(month.year, month.month)? {
            if let Some(loan) = loans.get(id)? {
                loans_missing.push(ReminderItem { id, name: loan.name });
            }
        }

        let has_reminders = !investments_missing.is_empty() || !loans_missing.is_empty();
        Ok(Self {
            year: month.year,
            month: month.month,
            investments_missing,
            loans_missing,
            has_reminders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvestmentInput, InvestmentValueInput, LoanInput, Money};
    use crate::services::{InvestmentService, LoanService};
    use crate::storage::test_support::create_test_storage;

    fn loan(name: &str) -> LoanInput {
        serde_json::from_value(serde_json::json!({
            "name": name,
            "initial_balance": 20000.0,
            "start_date": "2024-01-15",
            "loan_type": "loan",
        }))
        .unwrap()
    }

    #[test]
    fn test_reminders_follow_recorded_entries() {
        let (_temp_dir, storage) = create_test_storage();
        let march = YearMonth::new(2025, 3).unwrap();
        assert!(!ReminderStatus::generate(&storage, march).unwrap().has_reminders);

        let investments = InvestmentService::new(&storage);
        let tfsa = investments
            .create(InvestmentInput {
                name: "TFSA".into(),
                investment_type: "TFSA".into(),
                initial_value: Money::from_cents(100_000),
            })
            .unwrap();
        let car = LoanService::new(&storage).create(loan("Car loan")).unwrap();

        let status = ReminderStatus::generate(&storage, march).unwrap();
        assert!(status.has_reminders);
        assert_eq!(status.investments_missing[0].name, "TFSA");
        assert_eq!(status.loans_missing[0].id, car.id);

        investments
            .record_value(
                tfsa.id,
                InvestmentValueInput {
                    year: 2025,
                    month: 3,
                    value: Money::from_cents(101_000),
                },
            )
            .unwrap();
        LoanService::new(&storage).set_paid_off(car.id, true).unwrap();

        let status = ReminderStatus::generate(&storage, march).unwrap();
        assert!(!status.has_reminders);
    }
}
