//! Investment service

use chrono::Utc;
use serde::Serialize;

use crate::error::{TrackerError, TrackerResult};
use crate::models::{
    Investment, InvestmentInput, InvestmentType, InvestmentValue, InvestmentValueInput, Money,
    YearMonth,
};
use crate::storage::{InvestmentRepository, Storage};

/// An investment with its value history
#[derive(Debug, Clone, Serialize)]
pub struct InvestmentDetail {
    #[serde(flatten)]
    pub investment: Investment,
    pub values: Vec<InvestmentValue>,
    pub current_value: Money,
    pub change: Money,
    pub change_percent: f64,
}

impl InvestmentDetail {
    fn new(investment: Investment, values: Vec<InvestmentValue>) -> Self {
        let current_value = values
            .last()
            .map_or(investment.initial_value, |v| v.value);
        let change = current_value - investment.initial_value;
        let change_percent = change.percent_of(investment.initial_value);
        Self {
            investment,
            values,
            current_value,
            change,
            change_percent,
        }
    }
}

/// All investments with the portfolio total
#[derive(Debug, Clone, Serialize)]
pub struct Portfolio {
    pub investments: Vec<InvestmentDetail>,
    pub total_value: Money,
    pub total_initial: Money,
}

pub struct InvestmentService<'a> {
    storage: &'a Storage,
}

impl<'a> InvestmentService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn create(&self, input: InvestmentInput) -> TrackerResult<Investment> {
        let mut investment = validate(input)?;
        let conn = self.storage.connection()?;
        investment.id = InvestmentRepository::new(&conn).insert(&investment)?;

        tracing::info!(id = investment.id, "Created investment");
        Ok(investment)
    }

    pub fn get(&self, id: i64) -> TrackerResult<InvestmentDetail> {
        let conn = self.storage.connection()?;
        let repo = InvestmentRepository::new(&conn);
        let investment = repo
            .get(id)?
            .ok_or_else(|| TrackerError::investment_not_found(id))?;
        let values = repo.values(id)?;
        Ok(InvestmentDetail::new(investment, values))
    }

    pub fn portfolio(&self) -> TrackerResult<Portfolio> {
        let conn = self.storage.connection()?;
        let repo = InvestmentRepository::new(&conn);
        let investments = repo
            .list()?
            .into_iter()
            .map(|investment| {
                let values = repo.values(investment.id)?;
                Ok(InvestmentDetail::new(investment, values))
            })
            .collect::<TrackerResult<Vec<_>>>()?;

        let total_value = investments.iter().map(|i| i.current_value).sum();
        let total_initial = investments.iter().map(|i| i.investment.initial_value).sum();
        Ok(Portfolio {
            investments,
            total_value,
            total_initial,
        })
    }

    pub fn update(&self, id: i64, input: InvestmentInput) -> TrackerResult<Investment> {
        let mut investment = validate(input)?;
        let conn = self.storage.connection()?;
        let repo = InvestmentRepository::new(&conn);
        let existing = repo
            .get(id)?
            .ok_or_else(|| TrackerError::investment_not_found(id))?;

        investment.id = id;
        investment.created_at = existing.created_at;
        repo.update(&investment)?;

        tracing::info!(id, "Updated investment");
        Ok(investment)
    }

    pub fn delete(&self, id: i64) -> TrackerResult<()> {
        let conn = self.storage.connection()?;
        if !InvestmentRepository::new(&conn).delete(id)? {
            return Err(TrackerError::investment_not_found(id));
        }
        tracing::info!(id, "Deleted investment");
        Ok(())
    }

    /// Record the value for a month, replacing any existing entry
    pub fn record_value(
        &self,
        investment_id: i64,
        input: InvestmentValueInput,
    ) -> TrackerResult<InvestmentDetail> {
        YearMonth::new(input.year, input.month)?;
        if input.value.is_negative() {
            return Err(TrackerError::Validation("Value cannot be negative".into()));
        }

        let conn = self.storage.connection()?;
        let repo = InvestmentRepository::new(&conn);
        let investment = repo
            .get(investment_id)?
            .ok_or_else(|| TrackerError::investment_not_found(investment_id))?;

        repo.upsert_value(&InvestmentValue {
            id: 0,
            investment_id,
            year: input.year,
            month: input.month,
            value: input.value,
        })?;

        tracing::info!(
            investment_id,
            year = input.year,
            month = input.month,
            value = %input.value,
            "Recorded investment value"
        );
        let values = repo.values(investment_id)?;
        Ok(InvestmentDetail::new(investment, values))
    }

    pub fn delete_value(&self, investment_id: i64, value_id: i64) -> TrackerResult<()> {
        let conn = self.storage.connection()?;
        if !InvestmentRepository::new(&conn).delete_value(investment_id, value_id)? {
            return Err(TrackerError::NotFound {
                entity_type: "Investment value",
                identifier: value_id.to_string(),
            });
        }
        tracing::info!(investment_id, value_id, "Deleted investment value");
        Ok(())
    }
}

fn validate(input: InvestmentInput) -> TrackerResult<Investment> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(TrackerError::Validation("Name is required".into()));
    }
    if input.initial_value.is_negative() {
        return Err(TrackerError::Validation(
            "Initial value cannot be negative".into(),
        ));
    }
    let investment_type = InvestmentType::parse_field("type", &input.investment_type)?;

    Ok(Investment {
        id: 0,
        name: name.to_string(),
        investment_type,
        initial_value: input.initial_value,
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_support::create_test_storage;

    fn tfsa(cents: i64) -> InvestmentInput {
        InvestmentInput {
            name: "TFSA - index fund".into(),
            investment_type: "TFSA".into(),
            initial_value: Money::from_cents(cents),
        }
    }

    #[test]
    fn test_value_history_and_portfolio() {
        let (_temp_dir, storage) = create_test_storage();
        let service = InvestmentService::new(&storage);
        let investment = service.create(tfsa(1_000_000)).unwrap();

        service
            .record_value(
                investment.id,
                InvestmentValueInput {
                    year: 2025,
                    month: 1,
                    value: Money::from_cents(1_050_000),
                },
            )
            .unwrap();
        let detail = service
            .record_value(
                investment.id,
                InvestmentValueInput {
                    year: 2025,
                    month: 1,
                    value: Money::from_cents(1_100_000),
                },
            )
            .unwrap();
        assert_eq!(detail.values.len(), 1);
        assert_eq!(detail.change.cents(), 100_000);
        assert!((detail.change_percent - 10.0).abs() < 1e-9);

        service.create(tfsa(500_000)).unwrap();
        let portfolio = service.portfolio().unwrap();
        assert_eq!(portfolio.total_value.cents(), 1_600_000);
        assert_eq!(portfolio.total_initial.cents(), 1_500_000);
    }

    #[test]
    fn test_type_validation() {
        let (_temp_dir, storage) = create_test_storage();
        let service = InvestmentService::new(&storage);
        let mut input = tfsa(100);
        input.investment_type = "crypto".into();
        assert!(service.create(input).unwrap_err().is_validation());

        let mut input = tfsa(100);
        input.investment_type = "rrsp".into();
        assert_eq!(
            service.create(input).unwrap().investment_type,
            InvestmentType::Rrsp
        );
    }
}
