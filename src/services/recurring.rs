//! Recurring expense templates
//!
//! Templates describe an expense that repeats monthly. Generating a month
//! creates one ordinary expense per active template, at most once per month.

use chrono::Utc;
use serde::Serialize;

use crate::error::{TrackerError, TrackerResult};
use crate::models::{
    Expense, ExpenseCategory, ExpenseInput, RecurringExpense, RecurringInput, YearMonth,
};
use crate::services::expense::ExpenseService;
use crate::storage::{ExpenseRepository, PaymentMethodRepository, RecurringRepository, Storage};

/// Outcome of generating one month
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub year: i32,
    pub month: u32,
    pub created: Vec<Expense>,
    /// Templates that already had an expense in the month
    pub skipped: Vec<i64>,
    /// Templates that could not produce an expense, such as one whose
    /// payment method was deactivated
    pub failed: Vec<GenerationFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationFailure {
    pub id: i64,
    pub error: String,
}

pub struct RecurringService<'a> {
    storage: &'a Storage,
}

impl<'a> RecurringService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn create(&self, input: RecurringInput) -> TrackerResult<RecurringExpense> {
        let conn = self.storage.connection()?;
        let mut template = validate(input)?;
        check_method(&PaymentMethodRepository::new(&conn), &template.method)?;
        template.id = RecurringRepository::new(&conn).insert(&template)?;

        tracing::info!(id = template.id, place = %template.place, "Created recurring expense");
        Ok(template)
    }

    pub fn get(&self, id: i64) -> TrackerResult<RecurringExpense> {
        let conn = self.storage.connection()?;
        RecurringRepository::new(&conn)
            .get(id)?
            .ok_or_else(|| TrackerError::recurring_not_found(id))
    }

    pub fn list(&self) -> TrackerResult<Vec<RecurringExpense>> {
        let conn = self.storage.connection()?;
        RecurringRepository::new(&conn).list()
    }

    pub fn update(&self, id: i64, input: RecurringInput) -> TrackerResult<RecurringExpense> {
        let conn = self.storage.connection()?;
        let repo = RecurringRepository::new(&conn);
        let existing = repo
            .get(id)?
            .ok_or_else(|| TrackerError::recurring_not_found(id))?;

        let mut template = validate(input)?;
        check_method(&PaymentMethodRepository::new(&conn), &template.method)?;
        template.id = id;
        template.paused = existing.paused;
        template.created_at = existing.created_at;
        repo.update(&template)?;

        tracing::info!(id, "Updated recurring expense");
        Ok(template)
    }

    /// Pause or resume a template
    pub fn set_paused(&self, id: i64, paused: bool) -> TrackerResult<RecurringExpense> {
        let conn = self.storage.connection()?;
        let repo = RecurringRepository::new(&conn);
        let mut template = repo
            .get(id)?
            .ok_or_else(|| TrackerError::recurring_not_found(id))?;
        template.paused = paused;
        repo.update(&template)?;

        tracing::info!(id, paused, "Changed recurring expense state");
        Ok(template)
    }

    pub fn delete(&self, id: i64) -> TrackerResult<()> {
        let conn = self.storage.connection()?;
        if !RecurringRepository::new(&conn).delete(id)? {
            return Err(TrackerError::recurring_not_found(id));
        }
        tracing::info!(id, "Deleted recurring expense");
        Ok(())
    }

    /// Create this month's expenses from active templates
    ///
    /// Templates that already produced an expense in `month` are skipped, so
    /// running this twice is harmless. A template that fails validation is
    /// reported in `failed` and does not hold back the others.
    pub fn generate(&self, month: YearMonth) -> TrackerResult<GenerationResult> {
        let mut conn = self.storage.connection()?;
        let tx = conn.transaction()?;

        let templates = RecurringRepository::new(&tx).list()?;
        let expenses = ExpenseRepository::new(&tx);
        let mut created = Vec::new();
        let mut skipped = Vec::new();
        let mut failed = Vec::new();

        for template in templates.into_iter().filter(|t| t.applies_to(month)) {
            if expenses.exists_for_recurring(template.id, month)? {
                skipped.push(template.id);
                continue;
            }

            let mut input = ExpenseInput::new(
                month.day(template.day_of_month),
                template.place.clone(),
                template.amount,
                template.category,
                template.method.clone(),
            );
            input.notes = template.notes.clone();
            match ExpenseService::create_in(&tx, input, Some(template.id)) {
                Ok(expense) => created.push(expense),
                Err(e) if e.is_validation() => {
                    tracing::warn!(id = template.id, error = %e, "Recurring expense not generated");
                    failed.push(GenerationFailure {
                        id: template.id,
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
        tx.commit()?;

        tracing::info!(
            %month,
            created = created.len(),
            skipped = skipped.len(),
            failed = failed.len(),
            "Generated recurring expenses"
        );
        Ok(GenerationResult {
            year: month.year,
            month: month.month,
            created,
            skipped,
            failed,
        })
    }
}

fn check_method(repo: &PaymentMethodRepository<'_>, name: &str) -> TrackerResult<()> {
    match repo.get_by_name(name)? {
        Some(method) if method.is_active => Ok(()),
        Some(method) => Err(TrackerError::Validation(format!(
            "Payment method \"{}\" is inactive",
            method.display_name
        ))),
        None => Err(TrackerError::Validation(format!(
            "Invalid payment method \"{}\"",
            name.trim()
        ))),
    }
}

fn validate(input: RecurringInput) -> TrackerResult<RecurringExpense> {
    let place = input.place.trim();
    if place.is_empty() {
        return Err(TrackerError::Validation("Place is required".into()));
    }
    if !input.amount.is_positive() {
        return Err(TrackerError::Validation(
            "Amount must be greater than zero".into(),
        ));
    }
    let category =
        ExpenseCategory::parse_or_error(&input.category).map_err(TrackerError::Validation)?;
    if category.is_medical() {
        return Err(TrackerError::Validation(format!(
            "{} expenses cannot be recurring",
            ExpenseCategory::TaxMedical
        )));
    }
    if !(1..=31).contains(&input.day_of_month) {
        return Err(TrackerError::Validation(
            "Day of month must be between 1 and 31".into(),
        ));
    }

    let start_month = YearMonth::parse(&input.start_month)?;
    let end_month = match input.end_month.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => Some(YearMonth::parse(s)?),
        _ => None,
    };
    if end_month.map_or(false, |end| end < start_month) {
        return Err(TrackerError::Validation(
            "End month cannot be before the start month".into(),
        ));
    }

    Ok(RecurringExpense {
        id: 0,
        place: place.to_string(),
        amount: input.amount,
        notes: input.notes.trim().to_string(),
        category,
        method: input.method.trim().to_string(),
        day_of_month: input.day_of_month,
        start_month,
        end_month,
        paused: false,
        created_at: Utc::now(),
    })
}
