//! Expense service
//!
//! Validation and orchestration for expenses: category and payment method
//! checks, insurance fields on medical expenses, per-person allocations and
//! keeping credit card balances in step with the expenses charged to them.

use std::collections::HashSet;

use chrono::Utc;
use rusqlite::Connection;

use crate::error::{TrackerError, TrackerResult};
use crate::models::period::{validate_year, week_of_month};
use crate::models::{
    AllocationInput, ClaimStatus, Expense, ExpenseCategory, ExpenseFilter, ExpenseInput, Money,
    PaymentMethod, PersonAllocation, YearMonth,
};
use crate::storage::{
    remove_file_if_exists, ExpenseQuery, ExpenseRepository, InvoiceRepository,
    PaymentMethodRepository, PersonRepository, Storage,
};

/// Longest accepted place or notes text
pub const MAX_TEXT_LEN: usize = 200;

/// Service for expense management
pub struct ExpenseService<'a> {
    storage: &'a Storage,
}

impl<'a> ExpenseService<'a> {
    /// Create a new expense service
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    /// Create an expense
    pub fn create(&self, input: ExpenseInput) -> TrackerResult<Expense> {
        let mut conn = self.storage.connection()?;
        let tx = conn.transaction()?;
        let expense = Self::create_in(&tx, input, None)?;
        tx.commit()?;

        tracing::info!(
            id = expense.id,
            amount = %expense.amount,
            category = %expense.category,
            "Created expense"
        );
        Ok(expense)
    }

    /// Create an expense on an open connection or transaction
    ///
    /// Used by imports and recurring generation, which batch many inserts in
    /// one transaction.
    pub(crate) fn create_in(
        conn: &Connection,
        input: ExpenseInput,
        recurring_id: Option<i64>,
    ) -> TrackerResult<Expense> {
        let method = resolve_method(conn, &input.method, None)?;
        let (mut expense, people) = build_expense(conn, input, &method, None)?;
        expense.recurring_id = recurring_id;

        let repo = ExpenseRepository::new(conn);
        let id = repo.insert(&expense)?;
        if let Some(people) = &people {
            repo.set_people(id, people)?;
        }
        PaymentMethodRepository::new(conn).adjust_balance(method.id, expense.amount)?;

        repo.get(id)?.ok_or_else(|| TrackerError::expense_not_found(id))
    }

    /// Get an expense by id
    pub fn get(&self, id: i64) -> TrackerResult<Expense> {
        let conn = self.storage.connection()?;
        ExpenseRepository::new(&conn)
            .get(id)?
            .ok_or_else(|| TrackerError::expense_not_found(id))
    }

    /// List expenses matching the filter, oldest first
    pub fn list(&self, filter: &ExpenseFilter) -> TrackerResult<Vec<Expense>> {
        let query = query_from_filter(filter)?;
        let conn = self.storage.connection()?;
        let expenses = ExpenseRepository::new(&conn).list(&query)?;
        tracing::debug!(count = expenses.len(), "Listed expenses");
        Ok(expenses)
    }

    /// Replace an expense's fields
    ///
    /// `people: None` keeps the current allocations (rescaling a single-person
    /// allocation to the new amount); `Some(vec![])` clears them.
    pub fn update(&self, id: i64, input: ExpenseInput) -> TrackerResult<Expense> {
        let mut conn = self.storage.connection()?;
        let tx = conn.transaction()?;

        let repo = ExpenseRepository::new(&tx);
        let existing = repo
            .get(id)?
            .ok_or_else(|| TrackerError::expense_not_found(id))?;

        let method = resolve_method(&tx, &input.method, Some(&existing))?;
        let (mut expense, people) = build_expense(&tx, input, &method, Some(&existing))?;
        expense.id = id;
        expense.recurring_id = existing.recurring_id;
        expense.created_at = existing.created_at;

        repo.update(&expense)?;
        if let Some(people) = &people {
            repo.set_people(id, people)?;
        }

        let methods = PaymentMethodRepository::new(&tx);
        if let Some(old_method_id) = existing.payment_method_id {
            methods.adjust_balance(old_method_id, -existing.amount)?;
        }
        methods.adjust_balance(method.id, expense.amount)?;

        let updated = repo
            .get(id)?
            .ok_or_else(|| TrackerError::expense_not_found(id))?;
        tx.commit()?;

        tracing::info!(id, amount = %updated.amount, "Updated expense");
        Ok(updated)
    }

    /// Update only the insurance claim status
    pub fn update_claim_status(&self, id: i64, status: &str) -> TrackerResult<Expense> {
        let status = ClaimStatus::parse_field("claim_status", status)?;

        let conn = self.storage.connection()?;
        let repo = ExpenseRepository::new(&conn);
        let expense = repo
            .get(id)?
            .ok_or_else(|| TrackerError::expense_not_found(id))?;

        if !expense.category.is_medical() || !expense.insurance_eligible {
            return Err(TrackerError::Validation(
                "Claim status can only be set on insurance-eligible medical expenses".into(),
            ));
        }

        repo.update_claim_status(id, status, Utc::now())?;
        tracing::info!(id, status = %status, "Updated claim status");

        repo.get(id)?.ok_or_else(|| TrackerError::expense_not_found(id))
    }

    /// Delete an expense with its allocations and invoices
    pub fn delete(&self, id: i64) -> TrackerResult<()> {
        let invoice_paths = {
            let mut conn = self.storage.connection()?;
            let tx = conn.transaction()?;

            let repo = ExpenseRepository::new(&tx);
            let expense = repo
                .get(id)?
                .ok_or_else(|| TrackerError::expense_not_found(id))?;
            let invoices = InvoiceRepository::new(&tx).list_for_expense(id)?;

            repo.delete(id)?;
            if let Some(method_id) = expense.payment_method_id {
                PaymentMethodRepository::new(&tx).adjust_balance(method_id, -expense.amount)?;
            }
            tx.commit()?;

            invoices
                .into_iter()
                .map(|invoice| self.storage.paths().invoices_dir().join(invoice.file_path))
                .collect::<Vec<_>>()
        };

        for path in invoice_paths {
            if let Err(e) = remove_file_if_exists(&path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove invoice file");
            }
        }

        tracing::info!(id, "Deleted expense");
        Ok(())
    }
}

/// Translate request filters into a repository query
pub fn query_from_filter(filter: &ExpenseFilter) -> TrackerResult<ExpenseQuery> {
    let mut query = ExpenseQuery::default();

    match (filter.year, filter.month) {
        (Some(year), Some(month)) => {
            let month = YearMonth::new(year, month)?;
            query.start = Some(month.first_day());
            query.end = Some(month.last_day());
        }
        (Some(year), None) => {
            validate_year(year)?;
            let (start, end) = crate::models::period::year_bounds(year);
            query.start = Some(start);
            query.end = Some(end);
        }
        (None, Some(_)) => {
            return Err(TrackerError::Validation(
                "A month filter requires a year".into(),
            ))
        }
        (None, None) => {}
    }

    if let Some(category) = filter.category.as_deref().filter(|s| !s.trim().is_empty()) {
        let category =
            ExpenseCategory::parse_or_error(category).map_err(TrackerError::Validation)?;
        query.categories = vec![category];
    }
    query.method = filter.method.clone().filter(|m| !m.trim().is_empty());
    query.search = filter.search.clone();

    Ok(query)
}

/// Find the payment method an expense names
///
/// Inactive methods are refused unless the expense being updated already
/// uses that method.
fn resolve_method(
    conn: &Connection,
    name: &str,
    existing: Option<&Expense>,
) -> TrackerResult<PaymentMethod> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TrackerError::Validation("Payment method is required".into()));
    }

    let method = PaymentMethodRepository::new(conn)
        .get_by_name(name)?
        .ok_or_else(|| TrackerError::Validation(format!("Invalid payment method \"{}\"", name)))?;

    let unchanged = existing.map_or(false, |e| e.payment_method_id == Some(method.id));
    if !method.is_active && !unchanged {
        return Err(TrackerError::Validation(format!(
            "Payment method \"{}\" is inactive",
            method.display_name
        )));
    }

    Ok(method)
}

/// Validate an input and produce the expense row plus the allocations to store
///
/// The returned allocations are `None` when the stored ones should be left as they are.
fn build_expense(
    conn: &Connection,
    input: ExpenseInput,
    method: &PaymentMethod,
    existing: Option<&Expense>,
) -> TrackerResult<(Expense, Option<Vec<PersonAllocation>>)> {
    let category =
        ExpenseCategory::parse_or_error(&input.category).map_err(TrackerError::Validation)?;

    if !input.amount.is_positive() {
        return Err(TrackerError::Validation(
            "Amount must be greater than zero".into(),
        ));
    }

    let place = input.place.trim().to_string();
    let notes = input.notes.trim().to_string();
    if place.chars().count() > MAX_TEXT_LEN {
        return Err(TrackerError::Validation(format!(
            "Place must be {} characters or fewer",
            MAX_TEXT_LEN
        )));
    }
    if notes.chars().count() > MAX_TEXT_LEN {
        return Err(TrackerError::Validation(format!(
            "Notes must be {} characters or fewer",
            MAX_TEXT_LEN
        )));
    }

    let week = match input.week {
        Some(week) if (1..=5).contains(&week) => week,
        Some(week) => {
            return Err(TrackerError::Validation(format!(
                "Week must be between 1 and 5, got {}",
                week
            )))
        }
        None => week_of_month(input.date),
    };

    let (claim_status, original_cost) = insurance_fields(&input, category)?;

    let people = match input.people.as_deref() {
        Some(allocations) => Some(resolve_people(
            conn,
            category,
            input.amount,
            original_cost,
            allocations,
        )?),
        None => existing.and_then(|e| carry_people(e, category, input.amount)).transpose()?,
    };

    let now = Utc::now();
    let expense = Expense {
        id: 0,
        date: input.date,
        place,
        notes,
        amount: input.amount,
        category,
        week,
        method: method.display_name.clone(),
        payment_method_id: Some(method.id),
        insurance_eligible: input.insurance_eligible,
        claim_status,
        original_cost,
        recurring_id: None,
        people: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    Ok((expense, people))
}

fn insurance_fields(
    input: &ExpenseInput,
    category: ExpenseCategory,
) -> TrackerResult<(Option<ClaimStatus>, Option<Money>)> {
    let has_claim_status = input
        .claim_status
        .as_deref()
        .map_or(false, |s| !s.trim().is_empty());

    if !category.is_medical() {
        if input.insurance_eligible || has_claim_status || input.original_cost.is_some() {
            return Err(TrackerError::Validation(format!(
                "Insurance fields are only allowed for {} expenses",
                ExpenseCategory::TaxMedical
            )));
        }
        return Ok((None, None));
    }

    if !input.insurance_eligible {
        if has_claim_status || input.original_cost.is_some() {
            return Err(TrackerError::Validation(
                "Claim status and original cost require insurance_eligible".into(),
            ));
        }
        return Ok((None, None));
    }

    let status = match input.claim_status.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => ClaimStatus::parse_field("claim_status", s)?,
        _ => ClaimStatus::default(),
    };

    if let Some(original) = input.original_cost {
        if original < input.amount {
            return Err(TrackerError::Validation(
                "Original cost cannot be less than the amount paid".into(),
            ));
        }
    }

    Ok((Some(status), input.original_cost))
}

fn resolve_people(
    conn: &Connection,
    category: ExpenseCategory,
    amount: Money,
    original_cost: Option<Money>,
    inputs: &[AllocationInput],
) -> TrackerResult<Vec<PersonAllocation>> {
    if inputs.is_empty() {
        return Ok(Vec::new());
    }
    if !category.is_medical() {
        return Err(TrackerError::Validation(format!(
            "People can only be assigned to {} expenses",
            ExpenseCategory::TaxMedical
        )));
    }

    let people = PersonRepository::new(conn);
    let mut seen = HashSet::new();
    let mut allocations = Vec::with_capacity(inputs.len());

    for input in inputs {
        if !seen.insert(input.person_id) {
            return Err(TrackerError::Validation(format!(
                "Person {} is assigned more than once",
                input.person_id
            )));
        }
        let person = people
            .get(input.person_id)?
            .ok_or_else(|| TrackerError::person_not_found(input.person_id))?;

        let share = match (input.amount, inputs.len()) {
            (Some(share), _) => share,
            (None, 1) => amount,
            (None, _) => {
                return Err(TrackerError::Validation(
                    "Each person needs an amount when an expense is split".into(),
                ))
            }
        };
        if share.is_negative() {
            return Err(TrackerError::Validation(
                "Allocation amounts cannot be negative".into(),
            ));
        }

        let original_amount = match (input.original_amount, inputs.len()) {
            (Some(original), _) => Some(original),
            (None, 1) => original_cost,
            (None, _) => None,
        };

        allocations.push(PersonAllocation {
            person_id: person.id,
            name: person.name,
            amount: share,
            original_amount,
        });
    }

    let allocated: Money = allocations.iter().map(|a| a.amount).sum();
    if allocated != amount {
        return Err(TrackerError::Validation(format!(
            "Person allocations ({}) must add up to the expense amount ({})",
            allocated, amount
        )));
    }

    Ok(allocations)
}

/// Allocations to keep when an update leaves `people` out
fn carry_people(
    existing: &Expense,
    category: ExpenseCategory,
    amount: Money,
) -> Option<TrackerResult<Vec<PersonAllocation>>> {
    if existing.people.is_empty() {
        return None;
    }
    if !category.is_medical() {
        return Some(Ok(Vec::new()));
    }
    if existing.people.len() == 1 {
        let mut people = existing.people.clone();
        people[0].amount = amount;
        return Some(Ok(people));
    }
    if existing.allocated_total() != amount {
        return Some(Err(TrackerError::Validation(
            "Amount changed on a split expense; send the new per-person amounts".into(),
        )));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersonInput;
    use crate::services::PersonService;
    use crate::storage::test_support::create_test_storage;
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn medical(amount: i64) -> ExpenseInput {
        ExpenseInput::new(
            date("2025-04-09"),
            "Dr. Lee",
            Money::from_cents(amount),
            ExpenseCategory::TaxMedical,
            "Debit",
        )
    }

    #[test]
    fn test_create_derives_week_and_links_method() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ExpenseService::new(&storage);

        let expense = service.create(medical(5000)).unwrap();
        assert_eq!(expense.week, 2);
        assert_eq!(expense.method, "Debit");
        assert!(expense.payment_method_id.is_some());
        assert!(expense.claim_status.is_none());
    }

    #[test]
    fn test_create_rejects_invalid_input() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ExpenseService::new(&storage);

        let mut input = medical(5000);
        input.category = "Travel".into();
        let err = service.create(input).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("Invalid category \"Travel\""));

        let mut input = medical(0);
        input.amount = Money::zero();
        assert!(service.create(input).unwrap_err().is_validation());

        let mut input = medical(5000);
        input.method = "Bitcoin".into();
        assert!(service.create(input).unwrap_err().is_validation());

        let mut input = medical(5000);
        input.place = "x".repeat(MAX_TEXT_LEN + 1);
        assert!(service.create(input).unwrap_err().is_validation());
    }

    #[test]
    fn test_insurance_fields_only_on_medical() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ExpenseService::new(&storage);

        let mut input = ExpenseInput::new(
            date("2025-04-09"),
            "Red Cross",
            Money::from_cents(5000),
            ExpenseCategory::TaxDonation,
            "Cash",
        );
        input.insurance_eligible = true;
        assert!(service.create(input).unwrap_err().is_validation());

        let mut input = medical(2000);
        input.insurance_eligible = true;
        input.original_cost = Some(Money::from_cents(10000));
        let expense = service.create(input).unwrap();
        assert_eq!(expense.claim_status, Some(ClaimStatus::NotClaimed));

        let mut input = medical(2000);
        input.insurance_eligible = true;
        input.original_cost = Some(Money::from_cents(1000));
        assert!(service.create(input).unwrap_err().is_validation());
    }

    #[test]
    fn test_people_allocations() {
        let (_temp_dir, storage) = create_test_storage();
        let people = PersonService::new(&storage);
        let alex = people
            .create(PersonInput {
                name: "Alex".into(),
                date_of_birth: None,
            })
            .unwrap();
        let blair = people
            .create(PersonInput {
                name: "Blair".into(),
                date_of_birth: None,
            })
            .unwrap();
        let service = ExpenseService::new(&storage);

        let mut input = medical(5000);
        input.people = Some(vec![AllocationInput {
            person_id: alex.id,
            amount: None,
            original_amount: None,
        }]);
        let single = service.create(input).unwrap();
        assert_eq!(single.people.len(), 1);
        assert_eq!(single.people[0].amount.cents(), 5000);

        let mut input = medical(5000);
        input.people = Some(vec![
            AllocationInput {
                person_id: alex.id,
                amount: Some(Money::from_cents(3000)),
                original_amount: None,
            },
            AllocationInput {
                person_id: blair.id,
                amount: Some(Money::from_cents(1000)),
                original_amount: None,
            },
        ]);
        assert!(service.create(input).unwrap_err().is_validation());

        let mut input = medical(5000);
        input.people = Some(vec![
            AllocationInput {
                person_id: alex.id,
                amount: Some(Money::from_cents(2500)),
                original_amount: None,
            },
            AllocationInput {
                person_id: alex.id,
                amount: Some(Money::from_cents(2500)),
                original_amount: None,
            },
        ]);
        assert!(service.create(input).unwrap_err().is_validation());

        let mut input = medical(5000);
        input.people = Some(vec![AllocationInput {
            person_id: 999,
            amount: None,
            original_amount: None,
        }]);
        assert!(service.create(input).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_keeps_single_allocation_in_step() {
        let (_temp_dir, storage) = create_test_storage();
        let alex = PersonService::new(&storage)
            .create(PersonInput {
                name: "Alex".into(),
                date_of_birth: None,
            })
            .unwrap();
        let service = ExpenseService::new(&storage);

        let mut input = medical(5000);
        input.people = Some(vec![AllocationInput {
            person_id: alex.id,
            amount: None,
            original_amount: None,
        }]);
        let expense = service.create(input).unwrap();

        let updated = service.update(expense.id, medical(7500)).unwrap();
        assert_eq!(updated.people.len(), 1);
        assert_eq!(updated.people[0].amount.cents(), 7500);

        let mut clear = medical(7500);
        clear.people = Some(Vec::new());
        let cleared = service.update(expense.id, clear).unwrap();
        assert!(cleared.people.is_empty());
    }

    #[test]
    fn test_credit_card_balance_follows_expenses() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ExpenseService::new(&storage);
        let balance = || {
            let conn = storage.connection().unwrap();
            PaymentMethodRepository::new(&conn)
                .get_by_name("VISA")
                .unwrap()
                .unwrap()
                .current_balance
                .cents()
        };

        let mut input = medical(4000);
        input.method = "VISA".into();
        let expense = service.create(input).unwrap();
        assert_eq!(balance(), 4000);

        let mut input = medical(6000);
        input.method = "VISA".into();
        service.update(expense.id, input).unwrap();
        assert_eq!(balance(), 6000);

        service.update(expense.id, medical(6000)).unwrap();
        assert_eq!(balance(), 0);

        let mut input = medical(1500);
        input.method = "VISA".into();
        let second = service.create(input).unwrap();
        service.delete(second.id).unwrap();
        assert_eq!(balance(), 0);
    }

    #[test]
    fn test_claim_status_update() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ExpenseService::new(&storage);

        let plain = service.create(medical(1000)).unwrap();
        assert!(service
            .update_claim_status(plain.id, "paid")
            .unwrap_err()
            .is_validation());

        let mut input = medical(1000);
        input.insurance_eligible = true;
        let insured = service.create(input).unwrap();
        let updated = service.update_claim_status(insured.id, "in_progress").unwrap();
        assert_eq!(updated.claim_status, Some(ClaimStatus::InProgress));

        assert!(service
            .update_claim_status(insured.id, "lost")
            .unwrap_err()
            .is_validation());
        assert!(service.update_claim_status(999, "paid").unwrap_err().is_not_found());
    }

    #[test]
    fn test_list_filters() {
        let (_temp_dir, storage) = create_test_storage();
        let service = ExpenseService::new(&storage);
        service.create(medical(1000)).unwrap();
        service
            .create(ExpenseInput::new(
                date("2024-12-01"),
                "Costco",
                Money::from_cents(9000),
                ExpenseCategory::Groceries,
                "Cash",
            ))
            .unwrap();

        let filter = ExpenseFilter {
            year: Some(2025),
            ..Default::default()
        };
        assert_eq!(service.list(&filter).unwrap().len(), 1);

        let filter = ExpenseFilter {
            category: Some("Groceries".into()),
            ..Default::default()
        };
        assert_eq!(service.list(&filter).unwrap()[0].place, "Costco");

        let filter = ExpenseFilter {
            month: Some(3),
            ..Default::default()
        };
        assert!(service.list(&filter).unwrap_err().is_validation());
    }
}
