//! Loan and mortgage service
//!
//! Loans record a starting balance and a month-by-month history of remaining
//! balances and rates. Mortgages carry extra term fields and, when a property
//! value is known, an equity figure.

use chrono::Utc;
use serde::Serialize;

use crate::error::{TrackerError, TrackerResult};
use crate::models::{
    Loan, LoanBalance, LoanBalanceInput, LoanInput, LoanType, Money, PaymentFrequency, RateType,
    YearMonth,
};
use crate::storage::{LoanRepository, Storage};

/// Longest amortization accepted, in years
pub const MAX_AMORTIZATION_YEARS: u32 = 50;
/// Longest mortgage term accepted, in years
pub const MAX_TERM_YEARS: u32 = 10;

/// A loan with its history and derived figures
#[derive(Debug, Clone, Serialize)]
pub struct LoanDetail {
    #[serde(flatten)]
    pub loan: Loan,
    pub balances: Vec<LoanBalance>,
    pub current_balance: Money,
    pub current_rate: Option<f64>,
    pub total_paid_down: Money,
    pub average_monthly_paydown: Option<Money>,
    pub estimated_months_to_payoff: Option<u32>,
    /// Property value less balance, mortgages only
    pub equity: Option<Money>,
    pub equity_percent: Option<f64>,
}

impl LoanDetail {
    fn new(loan: Loan, balances: Vec<LoanBalance>) -> Self {
        let latest = balances.last();
        let current_balance = latest.map_or(loan.initial_balance, |b| b.remaining_balance);
        let current_rate = latest.map(|b| b.rate);
        let total_paid_down = loan.initial_balance - current_balance;

        let average_monthly_paydown = latest.and_then(|b| {
            let start = YearMonth::of(loan.start_date);
            let months = (b.year - start.year) * 12 + b.month as i32 - start.month as i32;
            if months > 0 && total_paid_down.is_positive() {
                Some(Money::from_cents(total_paid_down.cents() / months as i64))
            } else {
                None
            }
        });

        let estimated_months_to_payoff = average_monthly_paydown
            .filter(|avg| avg.is_positive())
            .map(|avg| {
                let remaining = current_balance.cents().max(0);
                ((remaining + avg.cents() - 1) / avg.cents()) as u32
            });

        let (equity, equity_percent) = match (loan.is_mortgage(), loan.estimated_property_value) {
            (true, Some(value)) => {
                let equity = value - current_balance;
                (Some(equity), Some(equity.percent_of(value)))
            }
            _ => (None, None),
        };

        Self {
            loan,
            balances,
            current_balance,
            current_rate,
            total_paid_down,
            average_monthly_paydown,
            estimated_months_to_payoff,
            equity,
            equity_percent,
        }
    }
}

pub struct LoanService<'a> {
    storage: &'a Storage,
}

impl<'a> LoanService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn create(&self, input: LoanInput) -> TrackerResult<Loan> {
        let mut loan = validate(input)?;
        let conn = self.storage.connection()?;
        loan.id = LoanRepository::new(&conn).insert(&loan)?;

        tracing::info!(id = loan.id, loan_type = %loan.loan_type, "Created loan");
        Ok(loan)
    }

    pub fn get(&self, id: i64) -> TrackerResult<LoanDetail> {
        let conn = self.storage.connection()?;
        let repo = LoanRepository::new(&conn);
        let loan = repo.get(id)?.ok_or_else(|| TrackerError::loan_not_found(id))?;
        let balances = repo.balances(id)?;
        Ok(LoanDetail::new(loan, balances))
    }

    /// Every loan with its derived figures
    pub fn list(&self) -> TrackerResult<Vec<LoanDetail>> {
        let conn = self.storage.connection()?;
        let repo = LoanRepository::new(&conn);
        repo.list()?
            .into_iter()
            .map(|loan| {
                let balances = repo.balances(loan.id)?;
                Ok(LoanDetail::new(loan, balances))
            })
            .collect()
    }

    pub fn update(&self, id: i64, input: LoanInput) -> TrackerResult<Loan> {
        let mut loan = validate(input)?;
        let conn = self.storage.connection()?;
        let repo = LoanRepository::new(&conn);
        let existing = repo.get(id)?.ok_or_else(|| TrackerError::loan_not_found(id))?;

        loan.id = id;
        loan.is_paid_off = existing.is_paid_off;
        loan.created_at = existing.created_at;
        repo.update(&loan)?;

        tracing::info!(id, "Updated loan");
        Ok(loan)
    }

    pub fn set_paid_off(&self, id: i64, paid_off: bool) -> TrackerResult<Loan> {
        let conn = self.storage.connection()?;
        let repo = LoanRepository::new(&conn);
        repo.get(id)?.ok_or_else(|| TrackerError::loan_not_found(id))?;
        repo.set_paid_off(id, paid_off)?;
        tracing::info!(id, paid_off, "Changed loan paid-off flag");
        repo.get(id)?.ok_or_else(|| TrackerError::loan_not_found(id))
    }

    pub fn delete(&self, id: i64) -> TrackerResult<()> {
        let conn = self.storage.connection()?;
        if !LoanRepository::new(&conn).delete(id)? {
            return Err(TrackerError::loan_not_found(id));
        }
        tracing::info!(id, "Deleted loan");
        Ok(())
    }

    /// Record the balance for a month, replacing any existing entry
    ///
    /// The paid-off flag follows the most recent entry: a zero balance marks
    /// the loan paid off.
    pub fn record_balance(&self, loan_id: i64, input: LoanBalanceInput) -> TrackerResult<LoanDetail> {
        YearMonth::new(input.year, input.month)?;
        if input.remaining_balance.is_negative() {
            return Err(TrackerError::Validation(
                "Remaining balance cannot be negative".into(),
            ));
        }
        if !input.rate.is_finite() || !(0.0..=100.0).contains(&input.rate) {
            return Err(TrackerError::Validation(
                "Rate must be between 0 and 100".into(),
            ));
        }

        let mut conn = self.storage.connection()?;
        let tx = conn.transaction()?;
        let repo = LoanRepository::new(&tx);
        repo.get(loan_id)?
            .ok_or_else(|| TrackerError::loan_not_found(loan_id))?;

        repo.upsert_balance(&LoanBalance {
            id: 0,
            loan_id,
            year: input.year,
            month: input.month,
            remaining_balance: input.remaining_balance,
            rate: input.rate,
        })?;
        sync_paid_off(&repo, loan_id)?;

        let loan = repo
            .get(loan_id)?
            .ok_or_else(|| TrackerError::loan_not_found(loan_id))?;
        let balances = repo.balances(loan_id)?;
        tx.commit()?;

        tracing::info!(
            loan_id,
            year = input.year,
            month = input.month,
            balance = %input.remaining_balance,
            "Recorded loan balance"
        );
        Ok(LoanDetail::new(loan, balances))
    }

    pub fn delete_balance(&self, loan_id: i64, balance_id: i64) -> TrackerResult<()> {
        let mut conn = self.storage.connection()?;
        let tx = conn.transaction()?;
        let repo = LoanRepository::new(&tx);
        if !repo.delete_balance(loan_id, balance_id)? {
            return Err(TrackerError::NotFound {
                entity_type: "Loan balance",
                identifier: balance_id.to_string(),
            });
        }
        sync_paid_off(&repo, loan_id)?;
        tx.commit()?;

        tracing::info!(loan_id, balance_id, "Deleted loan balance");
        Ok(())
    }
}

fn sync_paid_off(repo: &LoanRepository<'_>, loan_id: i64) -> TrackerResult<()> {
    if let Some(latest) = repo.balances(loan_id)?.last() {
        repo.set_paid_off(loan_id, latest.remaining_balance.is_zero())?;
    }
    Ok(())
}

fn validate(input: LoanInput) -> TrackerResult<Loan> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(TrackerError::Validation("Name is required".into()));
    }
    if input.initial_balance.is_negative() {
        return Err(TrackerError::Validation(
            "Initial balance cannot be negative".into(),
        ));
    }

    let loan_type = LoanType::parse_optional_field("loan_type", input.loan_type.as_deref())?
        .unwrap_or(LoanType::Loan);
    let rate_type = RateType::parse_optional_field("rate_type", input.rate_type.as_deref())?;
    let payment_frequency = PaymentFrequency::parse_optional_field(
        "payment_frequency",
        input.payment_frequency.as_deref(),
    )?;

    let has_mortgage_fields = input.amortization_period.is_some()
        || input.term_length.is_some()
        || input.renewal_date.is_some()
        || rate_type.is_some()
        || payment_frequency.is_some()
        || input.estimated_property_value.is_some();

    if loan_type != LoanType::Mortgage && has_mortgage_fields {
        return Err(TrackerError::Validation(
            "Mortgage fields are only allowed when loan_type is mortgage".into(),
        ));
    }

    if let Some(years) = input.amortization_period {
        if !(1..=MAX_AMORTIZATION_YEARS).contains(&years) {
            return Err(TrackerError::Validation(format!(
                "Amortization period must be between 1 and {} years",
                MAX_AMORTIZATION_YEARS
            )));
        }
    }
    if let Some(years) = input.term_length {
        if !(1..=MAX_TERM_YEARS).contains(&years) {
            return Err(TrackerError::Validation(format!(
                "Term length must be between 1 and {} years",
                MAX_TERM_YEARS
            )));
        }
        if input.amortization_period.map_or(false, |a| years > a) {
            return Err(TrackerError::Validation(
                "Term length cannot exceed the amortization period".into(),
            ));
        }
    }
    if let Some(renewal) = input.renewal_date {
        if renewal <= input.start_date {
            return Err(TrackerError::Validation(
                "Renewal date must be after the start date".into(),
            ));
        }
    }
    if input
        .estimated_property_value
        .map_or(false, |v| v.is_negative())
    {
        return Err(TrackerError::Validation(
            "Estimated property value cannot be negative".into(),
        ));
    }

    Ok(Loan {
        id: 0,
        name: name.to_string(),
        initial_balance: input.initial_balance,
        start_date: input.start_date,
        loan_type,
        notes: input.notes.trim().to_string(),
        is_paid_off: false,
        amortization_period: input.amortization_period,
        term_length: input.term_length,
        renewal_date: input.renewal_date,
        rate_type,
        payment_frequency,
        estimated_property_value: input.estimated_property_value,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::create_test_storage;

    fn car_loan() -> LoanInput {
        LoanInput {
            name: "Car loan".into(),
            initial_balance: Money::from_cents(2_000_000),
            start_date: "2025-01-15".parse().unwrap(),
            loan_type: None,
            notes: String::new(),
            amortization_period: None,
            term_length: None,
            renewal_date: None,
            rate_type: None,
            payment_frequency: None,
            estimated_property_value: None,
        }
    }

    fn mortgage() -> LoanInput {
        LoanInput {
            name: "House".into(),
            initial_balance: Money::from_cents(40_000_000),
            loan_type: Some("mortgage".into()),
            amortization_period: Some(25),
            term_length: Some(5),
            rate_type: Some("fixed".into()),
            payment_frequency: Some("bi-weekly".into()),
            estimated_property_value: Some(Money::from_cents(60_000_000)),
            ..car_loan()
        }
    }

    fn balance(year: i32, month: u32, cents: i64) -> LoanBalanceInput {
        LoanBalanceInput {
            year,
            month,
            remaining_balance: Money::from_cents(cents),
            rate: 5.5,
        }
    }

    #[test]
    fn test_detail_figures() {
        let (_temp_dir, storage) = create_test_storage();
        let service = LoanService::new(&storage);
        let loan = service.create(car_loan()).unwrap();
        assert_eq!(loan.loan_type, LoanType::Loan);

        service.record_balance(loan.id, balance(2025, 3, 1_900_000)).unwrap();
        let detail = service.record_balance(loan.id, balance(2025, 5, 1_800_000)).unwrap();

        assert_eq!(detail.current_balance.cents(), 1_800_000);
        assert_eq!(detail.total_paid_down.cents(), 200_000);
        assert_eq!(detail.average_monthly_paydown.unwrap().cents(), 50_000);
        assert_eq!(detail.estimated_months_to_payoff, Some(36));
        assert_eq!(detail.current_rate, Some(5.5));
        assert!(detail.equity.is_none());
    }

    #[test]
    fn test_balance_upsert_and_paid_off() {
        let (_temp_dir, storage) = create_test_storage();
        let service = LoanService::new(&storage);
        let loan = service.create(car_loan()).unwrap();

        service.record_balance(loan.id, balance(2025, 6, 100_000)).unwrap();
        let detail = service.record_balance(loan.id, balance(2025, 6, 0)).unwrap();
        assert_eq!(detail.balances.len(), 1);
        assert!(detail.loan.is_paid_off);

        let detail = service.record_balance(loan.id, balance(2025, 7, 5_000)).unwrap();
        assert!(!detail.loan.is_paid_off);

        let latest = detail.balances.last().unwrap().id;
        service.delete_balance(loan.id, latest).unwrap();
        assert!(service.get(loan.id).unwrap().loan.is_paid_off);
    }

    #[test]
    fn test_mortgage_validation_and_equity() {
        let (_temp_dir, storage) = create_test_storage();
        let service = LoanService::new(&storage);

        let house = service.create(mortgage()).unwrap();
        let detail = service.get(house.id).unwrap();
        assert_eq!(detail.equity.unwrap().cents(), 20_000_000);

        let mut bad = mortgage();
        bad.term_length = Some(30);
        assert!(service.create(bad).unwrap_err().is_validation());

        let mut bad = mortgage();
        bad.amortization_period = Some(3);
        bad.term_length = Some(5);
        assert!(service.create(bad).unwrap_err().is_validation());

        let mut bad = mortgage();
        bad.payment_frequency = Some("daily".into());
        assert!(service.create(bad).unwrap_err().is_validation());

        let mut bad = car_loan();
        bad.amortization_period = Some(25);
        assert!(service.create(bad).unwrap_err().is_validation());
    }
}
