//! Payment method service
//!
//! Display names are unique and are what expenses reference. Methods that
//! expenses still point at are deactivated rather than deleted. Credit cards
//! get a billing-cycle statement view.

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::error::{TrackerError, TrackerResult};
use crate::models::{Expense, Money, PaymentMethod, PaymentMethodInput, PaymentMethodType, YearMonth};
use crate::storage::{
    ExpenseQuery, ExpenseRepository, PaymentMethodRepository, RecurringRepository, Storage,
};

const MAX_NAME_LEN: usize = 50;

/// What happened to a method on delete
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// Still referenced by expenses, so only marked inactive
    Deactivated,
}

/// Current billing cycle of a credit card
#[derive(Debug, Clone, Serialize)]
pub struct CreditCardStatement {
    pub payment_method: PaymentMethod,
    pub cycle_start: NaiveDate,
    pub cycle_end: NaiveDate,
    pub cycle_total: Money,
    pub cycle_count: usize,
    pub expenses: Vec<Expense>,
    pub next_due_date: Option<NaiveDate>,
    pub available_credit: Option<Money>,
    pub utilization_percent: Option<f64>,
}

pub struct PaymentMethodService<'a> {
    storage: &'a Storage,
}

impl<'a> PaymentMethodService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn create(&self, input: PaymentMethodInput) -> TrackerResult<PaymentMethod> {
        let conn = self.storage.connection()?;
        let repo = PaymentMethodRepository::new(&conn);

        let mut method = validate(input, None)?;
        if repo.get_by_name(&method.display_name)?.is_some() {
            return Err(TrackerError::Duplicate {
                entity_type: "Payment method",
                identifier: method.display_name,
            });
        }
        method.id = repo.insert(&method)?;

        tracing::info!(id = method.id, name = %method.display_name, "Created payment method");
        Ok(method)
    }

    pub fn get(&self, id: i64) -> TrackerResult<PaymentMethod> {
        let conn = self.storage.connection()?;
        PaymentMethodRepository::new(&conn)
            .get(id)?
            .ok_or_else(|| TrackerError::payment_method_not_found(id))
    }

    pub fn list(&self, active_only: bool) -> TrackerResult<Vec<PaymentMethod>> {
        let conn = self.storage.connection()?;
        PaymentMethodRepository::new(&conn).list(active_only)
    }

    /// Update a method; a rename is carried onto expenses and recurring templates
    pub fn update(&self, id: i64, input: PaymentMethodInput) -> TrackerResult<PaymentMethod> {
        let mut conn = self.storage.connection()?;
        let tx = conn.transaction()?;
        let repo = PaymentMethodRepository::new(&tx);

        let existing = repo
            .get(id)?
            .ok_or_else(|| TrackerError::payment_method_not_found(id))?;
        let mut method = validate(input, Some(&existing))?;
        method.id = id;
        method.created_at = existing.created_at;

        if let Some(other) = repo.get_by_name(&method.display_name)? {
            if other.id != id {
                return Err(TrackerError::Duplicate {
                    entity_type: "Payment method",
                    identifier: method.display_name,
                });
            }
        }
        repo.update(&method)?;

        if method.display_name != existing.display_name {
            let renamed = ExpenseRepository::new(&tx)
                .rename_method(&existing.display_name, &method.display_name)?;
            let templates = RecurringRepository::new(&tx)
                .rename_method(&existing.display_name, &method.display_name)?;
            tracing::info!(
                from = %existing.display_name,
                to = %method.display_name,
                expenses = renamed,
                templates,
                "Renamed payment method"
            );
        }
        tx.commit()?;

        tracing::info!(id, "Updated payment method");
        Ok(method)
    }

    /// Delete, or deactivate when expenses reference the method
    pub fn delete(&self, id: i64) -> TrackerResult<DeleteOutcome> {
        let conn = self.storage.connection()?;
        let repo = PaymentMethodRepository::new(&conn);
        repo.get(id)?
            .ok_or_else(|| TrackerError::payment_method_not_found(id))?;

        let usage = repo.usage_count(id)?;
        if usage > 0 {
            repo.set_active(id, false)?;
            tracing::info!(id, usage, "Deactivated payment method in use");
            Ok(DeleteOutcome::Deactivated)
        } else {
            repo.delete(id)?;
            tracing::info!(id, "Deleted payment method");
            Ok(DeleteOutcome::Deleted)
        }
    }

    /// Statement for the billing cycle containing today
    pub fn statement(&self, id: i64) -> TrackerResult<CreditCardStatement> {
        self.statement_on(id, chrono::Local::now().date_naive())
    }

    /// Statement for the billing cycle containing `today`
    ///
    /// A cycle closes on the billing cycle day (the last day of the month
    /// when none is set) and the next one opens the day after.
    pub fn statement_on(&self, id: i64, today: NaiveDate) -> TrackerResult<CreditCardStatement> {
        let conn = self.storage.connection()?;
        let method = PaymentMethodRepository::new(&conn)
            .get(id)?
            .ok_or_else(|| TrackerError::payment_method_not_found(id))?;
        if !method.is_credit_card() {
            return Err(TrackerError::Validation(format!(
                "{} is not a credit card",
                method.display_name
            )));
        }

        let (cycle_start, cycle_end) = billing_cycle(method.billing_cycle_day, today);
        let query = ExpenseQuery {
            method: Some(method.display_name.clone()),
            ..ExpenseQuery::between(cycle_start, cycle_end)
        };
        let expenses = ExpenseRepository::new(&conn).list(&query)?;
        let cycle_total = expenses.iter().map(|e| e.amount).sum();

        let next_due_date = method.payment_due_day.map(|day| next_day_on_or_after(day, today));
        let available_credit = method.available_credit();
        let utilization_percent = method
            .credit_limit
            .filter(|limit| limit.is_positive())
            .map(|limit| method.current_balance.percent_of(limit));

        Ok(CreditCardStatement {
            cycle_start,
            cycle_end,
            cycle_total,
            cycle_count: expenses.len(),
            expenses,
            next_due_date,
            available_credit,
            utilization_percent,
            payment_method: method,
        })
    }
}

/// Inclusive window of the billing cycle containing `today`
pub fn billing_cycle(cycle_day: Option<u32>, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let month = YearMonth::of(today);
    let close = |m: YearMonth| match cycle_day {
        Some(day) => m.day(day),
        None => m.last_day(),
    };

    let this_close = close(month);
    if today <= this_close {
        (close(month.previous()) + Duration::days(1), this_close)
    } else {
        (this_close + Duration::days(1), close(month.next()))
    }
}

/// First date on or after `today` falling on `day` (clamped to short months)
fn next_day_on_or_after(day: u32, today: NaiveDate) -> NaiveDate {
    let month = YearMonth::of(today);
    let candidate = month.day(day);
    if candidate >= today {
        candidate
    } else {
        month.next().day(day)
    }
}

fn validate(
    input: PaymentMethodInput,
    existing: Option<&PaymentMethod>,
) -> TrackerResult<PaymentMethod> {
    let display_name = input.display_name.trim();
    if display_name.is_empty() {
        return Err(TrackerError::Validation("Display name is required".into()));
    }
    if display_name.chars().count() > MAX_NAME_LEN {
        return Err(TrackerError::Validation(format!(
            "Display name must be {} characters or fewer",
            MAX_NAME_LEN
        )));
    }
    let method_type = PaymentMethodType::parse_field("type", &input.method_type)?;
    let is_credit_card = method_type == PaymentMethodType::CreditCard;

    let has_credit_fields = input.credit_limit.is_some()
        || input.payment_due_day.is_some()
        || input.billing_cycle_day.is_some()
        || input.current_balance.map_or(false, |b| !b.is_zero());
    if !is_credit_card && has_credit_fields {
        return Err(TrackerError::Validation(
            "Credit limit, balance, due day and billing cycle day are only allowed for credit cards"
                .into(),
        ));
    }

    for (label, day) in [
        ("Payment due day", input.payment_due_day),
        ("Billing cycle day", input.billing_cycle_day),
    ] {
        if let Some(day) = day {
            if !(1..=31).contains(&day) {
                return Err(TrackerError::Validation(format!(
                    "{} must be between 1 and 31",
                    label
                )));
            }
        }
    }
    if input.credit_limit.map_or(false, |l| l.is_negative()) {
        return Err(TrackerError::Validation(
            "Credit limit cannot be negative".into(),
        ));
    }

    let current_balance = if is_credit_card {
        input
            .current_balance
            .or_else(|| existing.map(|e| e.current_balance))
            .unwrap_or_default()
    } else {
        Money::zero()
    };

    Ok(PaymentMethod {
        id: 0,
        display_name: display_name.to_string(),
        method_type,
        full_name: input.full_name.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        account_details: input
            .account_details
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()),
        credit_limit: input.credit_limit,
        current_balance,
        payment_due_day: input.payment_due_day,
        billing_cycle_day: input.billing_cycle_day,
        is_active: input
            .is_active
            .or_else(|| existing.map(|e| e.is_active))
            .unwrap_or(true),
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpenseCategory, ExpenseInput};
    use crate::services::ExpenseService;
    use crate::storage::test_support::create_test_storage;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn card(name: &str) -> PaymentMethodInput {
        PaymentMethodInput {
            display_name: name.into(),
            method_type: "credit_card".into(),
            full_name: Some("Rewards Mastercard".into()),
            account_details: None,
            credit_limit: Some(Money::from_cents(500_000)),
            current_balance: None,
            payment_due_day: Some(20),
            billing_cycle_day: Some(25),
            is_active: None,
        }
    }

    #[test]
    fn test_create_and_duplicate() {
        let (_temp_dir, storage) = create_test_storage();
        let service = PaymentMethodService::new(&storage);

        let method = service.create(card("Rewards MC")).unwrap();
        assert!(method.is_active);
        assert_eq!(service.list(false).unwrap().len(), 8);

        let err = service.create(card("rewards mc")).unwrap_err();
        assert!(matches!(err, TrackerError::Duplicate { .. }));
    }

    #[test]
    fn test_credit_fields_only_for_cards() {
        let (_temp_dir, storage) = create_test_storage();
        let service = PaymentMethodService::new(&storage);

        let mut input = card("Chequing");
        input.method_type = "debit".into();
        assert!(service.create(input).unwrap_err().is_validation());

        let mut input = card("Bad day");
        input.billing_cycle_day = Some(0);
        assert!(service.create(input).unwrap_err().is_validation());
    }

    #[test]
    fn test_rename_follows_expenses_and_delete_deactivates() {
        let (_temp_dir, storage) = create_test_storage();
        let service = PaymentMethodService::new(&storage);
        let method = service.create(card("Rewards MC")).unwrap();

        let expense = ExpenseService::new(&storage)
            .create(ExpenseInput::new(
                date("2025-03-02"),
                "Shell",
                Money::from_cents(6000),
                ExpenseCategory::Gas,
                "Rewards MC",
            ))
            .unwrap();

        service.update(method.id, card("Travel MC")).unwrap();
        let expense = ExpenseService::new(&storage).get(expense.id).unwrap();
        assert_eq!(expense.method, "Travel MC");

        let updated = service.get(method.id).unwrap();
        assert_eq!(updated.current_balance.cents(), 6000);

        assert_eq!(service.delete(method.id).unwrap(), DeleteOutcome::Deactivated);
        assert!(!service.get(method.id).unwrap().is_active);

        let unused = service.create(card("Spare")).unwrap();
        assert_eq!(service.delete(unused.id).unwrap(), DeleteOutcome::Deleted);
    }

    #[test]
    fn test_billing_cycle_windows() {
        assert_eq!(
            billing_cycle(Some(25), date("2025-03-10")),
            (date("2025-02-26"), date("2025-03-25"))
        );
        assert_eq!(
            billing_cycle(Some(25), date("2025-03-26")),
            (date("2025-03-26"), date("2025-04-25"))
        );
        assert_eq!(
            billing_cycle(Some(31), date("2025-02-15")),
            (date("2025-02-01"), date("2025-02-28"))
        );
        assert_eq!(
            billing_cycle(None, date("2025-04-30")),
            (date("2025-04-01"), date("2025-04-30"))
        );
    }

    #[test]
    fn test_statement() {
        let (_temp_dir, storage) = create_test_storage();
        let service = PaymentMethodService::new(&storage);
        let method = service.create(card("Rewards MC")).unwrap();
        let expenses = ExpenseService::new(&storage);
        for (day, cents) in [("2025-02-20", 1000), ("2025-03-01", 2000), ("2025-03-25", 3000)] {
            expenses
                .create(ExpenseInput::new(
                    date(day),
                    "Store",
                    Money::from_cents(cents),
                    ExpenseCategory::Other,
                    "Rewards MC",
                ))
                .unwrap();
        }

        let statement = service.statement_on(method.id, date("2025-03-10")).unwrap();
        assert_eq!(statement.cycle_count, 2);
        assert_eq!(statement.cycle_total.cents(), 5000);
        assert_eq!(statement.next_due_date, Some(date("2025-03-20")));
        assert_eq!(statement.available_credit.unwrap().cents(), 494_000);

        let cash = service.list(false).unwrap().into_iter().find(|m| m.display_name == "Cash").unwrap();
        assert!(service.statement_on(cash.id, date("2025-03-10")).unwrap_err().is_validation());
    }
}
