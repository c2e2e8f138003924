//! Expense repository
//!
//! Expenses and their person allocations. Allocations are always loaded in
//! one batched query per listing rather than per row.

use std::collections::HashMap;

use chrono::NaiveDate;
use rusqlite::types::ToSql;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

use super::sql::placeholders;
use crate::error::TrackerResult;
use crate::models::{ClaimStatus, Expense, ExpenseCategory, Money, PersonAllocation, YearMonth};

const COLUMNS: &str = "id, date, place, notes, amount, category, week, method, payment_method_id, \
                       insurance_eligible, claim_status, original_cost, recurring_id, created_at, updated_at";

/// Batch size for `IN (...)` lookups
const ID_CHUNK: usize = 500;

/// Filters applied when listing expenses; every field is optional
#[derive(Debug, Clone, Default)]
pub struct ExpenseQuery {
    /// Inclusive lower date bound
    pub start: Option<NaiveDate>,
    /// Inclusive upper date bound
    pub end: Option<NaiveDate>,
    /// Restrict to these categories (empty means all)
    pub categories: Vec<ExpenseCategory>,
    /// Payment method display name
    pub method: Option<String>,
    /// Exact place, ignoring case
    pub place: Option<String>,
    /// Substring of place or notes
    pub search: Option<String>,
    pub claim_status: Option<ClaimStatus>,
    pub insurance_eligible: Option<bool>,
}

impl ExpenseQuery {
    /// Every expense dated within `[start, end]`
    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }

    pub fn in_month(month: YearMonth) -> Self {
        Self::between(month.first_day(), month.last_day())
    }

    pub fn with_categories(mut self, categories: &[ExpenseCategory]) -> Self {
        self.categories = categories.to_vec();
        self
    }

    fn where_clause(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut clauses: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(start) = self.start {
            clauses.push("date >= ?".into());
            values.push(Box::new(start));
        }
        if let Some(end) = self.end {
            clauses.push("date <= ?".into());
            values.push(Box::new(end));
        }
        if !self.categories.is_empty() {
            clauses.push(format!("category IN ({})", placeholders(self.categories.len())));
            for category in &self.categories {
                values.push(Box::new(*category));
            }
        }
        if let Some(method) = &self.method {
            clauses.push("method = ? COLLATE NOCASE".into());
            values.push(Box::new(method.trim().to_string()));
        }
        if let Some(place) = &self.place {
            clauses.push("place = ? COLLATE NOCASE".into());
            values.push(Box::new(place.trim().to_string()));
        }
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            clauses.push("(place LIKE ? ESCAPE '\\' OR notes LIKE ? ESCAPE '\\')".into());
            let pattern = format!("%{}%", escape_like(search));
            values.push(Box::new(pattern.clone()));
            values.push(Box::new(pattern));
        }
        if let Some(status) = self.claim_status {
            clauses.push("claim_status = ?".into());
            values.push(Box::new(status));
        }
        if let Some(eligible) = self.insurance_eligible {
            clauses.push("insurance_eligible = ?".into());
            values.push(Box::new(eligible));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!("WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Repository for expenses and person allocations
pub struct ExpenseRepository<'c> {
    conn: &'c Connection,
}

impl<'c> ExpenseRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
        Ok(Expense {
            id: row.get(0)?,
            date: row.get(1)?,
            place: row.get(2)?,
            notes: row.get(3)?,
            amount: row.get(4)?,
            category: row.get(5)?,
            week: row.get(6)?,
            method: row.get(7)?,
            payment_method_id: row.get(8)?,
            insurance_eligible: row.get(9)?,
            claim_status: row.get(10)?,
            original_cost: row.get(11)?,
            recurring_id: row.get(12)?,
            people: Vec::new(),
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
        })
    }

    /// Get one expense with its allocations
    pub fn get(&self, id: i64) -> TrackerResult<Option<Expense>> {
        let sql = format!("SELECT {} FROM expenses WHERE id = ?1", COLUMNS);
        let expense = self
            .conn
            .query_row(&sql, params![id], Self::from_row)
            .optional()?;

        match expense {
            Some(mut expense) => {
                expense.people = self
                    .load_people(&[id])?
                    .remove(&id)
                    .unwrap_or_default();
                Ok(Some(expense))
            }
            None => Ok(None),
        }
    }

    /// List expenses ordered by date then id, with allocations attached
    pub fn list(&self, query: &ExpenseQuery) -> TrackerResult<Vec<Expense>> {
        let (where_clause, values) = query.where_clause();
        let sql = format!(
            "SELECT {} FROM expenses {} ORDER BY date, id",
            COLUMNS, where_clause
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut expenses = stmt
            .query_map(params_from_iter(values.iter()), Self::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let ids: Vec<i64> = expenses.iter().map(|e| e.id).collect();
        let mut people = self.load_people(&ids)?;
        for expense in &mut expenses {
            if let Some(allocations) = people.remove(&expense.id) {
                expense.people = allocations;
            }
        }
        Ok(expenses)
    }

    /// Sum of amounts per category for the query, largest first
    pub fn category_totals(&self, query: &ExpenseQuery) -> TrackerResult<Vec<(ExpenseCategory, Money)>> {
        let (where_clause, values) = query.where_clause();
        let sql = format!(
            "SELECT category, COALESCE(SUM(amount), 0) AS total FROM expenses {}
             GROUP BY category ORDER BY total DESC, category",
            where_clause
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let totals = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(totals)
    }

    pub fn insert(&self, expense: &Expense) -> TrackerResult<i64> {
        self.conn.execute(
            "INSERT INTO expenses (date, place, notes, amount, category, week, method,
                payment_method_id, insurance_eligible, claim_status, original_cost, recurring_id,
                created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                expense.date,
                expense.place,
                expense.notes,
                expense.amount,
                expense.category,
                expense.week,
                expense.method,
                expense.payment_method_id,
                expense.insurance_eligible,
                expense.claim_status,
                expense.original_cost,
                expense.recurring_id,
                expense.created_at,
                expense.updated_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn update(&self, expense: &Expense) -> TrackerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE expenses SET date = ?2, place = ?3, notes = ?4, amount = ?5, category = ?6,
                week = ?7, method = ?8, payment_method_id = ?9, insurance_eligible = ?10,
                claim_status = ?11, original_cost = ?12, updated_at = ?13
             WHERE id = ?1",
            params![
                expense.id,
                expense.date,
                expense.place,
                expense.notes,
                expense.amount,
                expense.category,
                expense.week,
                expense.method,
                expense.payment_method_id,
                expense.insurance_eligible,
                expense.claim_status,
                expense.original_cost,
                expense.updated_at,
            ],
        )?;
        Ok(changed > 0)
    }

    pub fn update_claim_status(
        &self,
        id: i64,
        status: ClaimStatus,
        updated_at: chrono::DateTime<chrono::Utc>,
    ) -> TrackerResult<bool> {
        let changed = self.conn.execute(
            "UPDATE expenses SET claim_status = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, status, updated_at],
        )?;
        Ok(changed > 0)
    }

    /// Delete an expense; allocations and invoice rows cascade
    pub fn delete(&self, id: i64) -> TrackerResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM expenses WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    /// Replace the allocations of an expense
    pub fn set_people(&self, expense_id: i64, people: &[PersonAllocation]) -> TrackerResult<()> {
        self.conn.execute(
            "DELETE FROM expense_people WHERE expense_id = ?1",
            params![expense_id],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO expense_people (expense_id, person_id, amount, original_amount)
             VALUES (?1, ?2, ?3, ?4)",
        )?;
        for allocation in people {
            stmt.execute(params![
                expense_id,
                allocation.person_id,
                allocation.amount,
                allocation.original_amount,
            ])?;
        }
        Ok(())
    }

    /// Allocations for the given expenses, keyed by expense id, ordered by person name
    pub fn load_people(&self, expense_ids: &[i64]) -> TrackerResult<HashMap<i64, Vec<PersonAllocation>>> {
        let mut by_expense: HashMap<i64, Vec<PersonAllocation>> = HashMap::new();

        for chunk in expense_ids.chunks(ID_CHUNK) {
            let sql = format!(
                "SELECT ep.expense_id, ep.person_id, p.name, ep.amount, ep.original_amount
                 FROM expense_people ep
                 JOIN people p ON p.id = ep.person_id
                 WHERE ep.expense_id IN ({})
                 ORDER BY p.name COLLATE NOCASE, p.id",
                placeholders(chunk.len())
            );
            let mut stmt = self.conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    PersonAllocation {
                        person_id: row.get(1)?,
                        name: row.get(2)?,
                        amount: row.get(3)?,
                        original_amount: row.get(4)?,
                    },
                ))
            })?;
            for row in rows {
                let (expense_id, allocation) = row?;
                by_expense.entry(expense_id).or_default().push(allocation);
            }
        }

        Ok(by_expense)
    }

    /// Whether a template already produced an expense in `month`
    pub fn exists_for_recurring(&self, recurring_id: i64, month: YearMonth) -> TrackerResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM expenses WHERE recurring_id = ?1 AND date BETWEEN ?2 AND ?3",
            params![recurring_id, month.first_day(), month.last_day()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Distinct non-empty places with their expense counts
    pub fn places(&self) -> TrackerResult<Vec<(String, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT place, COUNT(*) FROM expenses WHERE trim(place) <> ''
             GROUP BY place ORDER BY place COLLATE NOCASE, place",
        )?;
        let places = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(places)
    }

    /// Rewrite every expense whose place is one of `variants` to `canonical`
    pub fn rename_places(&self, variants: &[String], canonical: &str) -> TrackerResult<usize> {
        if variants.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "UPDATE expenses SET place = ? WHERE place IN ({}) AND place <> ?",
            placeholders(variants.len())
        );
        let mut values: Vec<&dyn ToSql> = Vec::with_capacity(variants.len() + 2);
        values.push(&canonical);
        for variant in variants {
            values.push(variant);
        }
        values.push(&canonical);
        Ok(self.conn.execute(&sql, params_from_iter(values))?)
    }

    /// Follow a payment method rename on existing expenses
    pub fn rename_method(&self, old: &str, new: &str) -> TrackerResult<usize> {
        Ok(self.conn.execute(
            "UPDATE expenses SET method = ?2 WHERE method = ?1 COLLATE NOCASE",
            params![old, new],
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Person;
    use crate::storage::test_support::create_test_storage;
    use crate::storage::PersonRepository;
    use chrono::Utc;

    fn expense(date: &str, place: &str, cents: i64, category: ExpenseCategory) -> Expense {
        let now = Utc::now();
        Expense {
            id: 0,
            date: date.parse().unwrap(),
            place: place.into(),
            notes: String::new(),
            amount: Money::from_cents(cents),
            category,
            week: 1,
            method: "Debit".into(),
            payment_method_id: None,
            insurance_eligible: false,
            claim_status: None,
            original_cost: None,
            recurring_id: None,
            people: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_and_filter() {
        let (_temp_dir, storage) = create_test_storage();
        let conn = storage.connection().unwrap();
        let repo = ExpenseRepository::new(&conn);

        repo.insert(&expense("2025-01-10", "Costco", 8000, ExpenseCategory::Groceries))
            .unwrap();
        repo.insert(&expense("2025-02-03", "Dr. Smith", 12000, ExpenseCategory::TaxMedical))
            .unwrap();
        repo.insert(&expense("2024-12-30", "Shell", 5000, ExpenseCategory::Gas))
            .unwrap();

        let (start, end) = crate::models::period::year_bounds(2025);
        let year = repo.list(&ExpenseQuery::between(start, end)).unwrap();
        assert_eq!(year.len(), 2);
        assert_eq!(year[0].place, "Costco");

        let medical = repo
            .list(&ExpenseQuery::between(start, end).with_categories(&[ExpenseCategory::TaxMedical]))
            .unwrap();
        assert_eq!(medical.len(), 1);

        let search = repo
            .list(&ExpenseQuery {
                search: Some("smith".into()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(search.len(), 1);
        assert_eq!(search[0].amount.cents(), 12000);
    }

    #[test]
    fn test_people_are_loaded_and_cascade() {
        let (_temp_dir, storage) = create_test_storage();
        let conn = storage.connection().unwrap();
        let repo = ExpenseRepository::new(&conn);
        let people = PersonRepository::new(&conn);

        let person_id = people
            .insert(&Person {
                id: 0,
                name: "Alex".into(),
                date_of_birth: None,
                created_at: Utc::now(),
            })
            .unwrap();
        let id = repo
            .insert(&expense("2025-03-01", "Pharmacy", 4000, ExpenseCategory::TaxMedical))
            .unwrap();
        repo.set_people(
            id,
            &[PersonAllocation {
                person_id,
                name: String::new(),
                amount: Money::from_cents(4000),
                original_amount: None,
            }],
        )
        .unwrap();

        let loaded = repo.get(id).unwrap().unwrap();
        assert_eq!(loaded.people.len(), 1);
        assert_eq!(loaded.people[0].name, "Alex");

        people.delete(person_id).unwrap();
        assert!(repo.get(id).unwrap().unwrap().people.is_empty());
    }

    #[test]
    fn test_rename_places() {
        let (_temp_dir, storage) = create_test_storage();
        let conn = storage.connection().unwrap();
        let repo = ExpenseRepository::new(&conn);

        repo.insert(&expense("2025-01-10", "costco", 100, ExpenseCategory::Groceries))
            .unwrap();
        repo.insert(&expense("2025-01-11", "Costco ", 100, ExpenseCategory::Groceries))
            .unwrap();
        repo.insert(&expense("2025-01-12", "Costco", 100, ExpenseCategory::Groceries))
            .unwrap();

        let updated = repo
            .rename_places(&["costco".into(), "Costco ".into(), "Costco".into()], "Costco")
            .unwrap();
        assert_eq!(updated, 2);
        assert_eq!(repo.places().unwrap(), vec![("Costco".to_string(), 3)]);
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
    }
}
