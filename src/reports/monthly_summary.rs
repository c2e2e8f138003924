//! Monthly Summary Report
//!
//! Where a month's money went: expenses by category, payment method and
//! week, set against that month's income and fixed expenses.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::display::{double_separator, format_change, money_column, separator};
use crate::error::TrackerResult;
use crate::models::{Money, YearMonth};
use crate::storage::{ExpenseQuery, ExpenseRepository, FixedExpenseRepository, IncomeRepository, Storage};

#[derive(Debug, Clone, Serialize)]
pub struct NamedTotal {
    pub name: String,
    pub total: Money,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub expense_total: Money,
    pub expense_count: usize,
    pub by_category: Vec<NamedTotal>,
    pub by_method: Vec<NamedTotal>,
    /// Totals for weeks 1..=5 of the month
    pub weekly_totals: [Money; 5],
    pub income_total: Money,
    pub fixed_total: Money,
    /// Income less expenses and fixed expenses
    pub net_balance: Money,
    pub previous_month_expense_total: Money,
}

impl MonthlySummary {
    pub fn generate(storage: &Storage, month: YearMonth) -> TrackerResult<Self> {
        let conn = storage.connection()?;
        let expenses = ExpenseRepository::new(&conn);
        let current = expenses.list(&ExpenseQuery::in_month(month))?;
        let previous_month_expense_total: Money = expenses
            .category_totals(&ExpenseQuery::in_month(month.previous()))?
            .iter()
            .map(|(_, total)| *total)
            .sum();
        let income_total = IncomeRepository::new(&conn).total_for_month(month)?;
        let fixed_total = FixedExpenseRepository::new(&conn).total_for_month(month)?;
        drop(conn);

        let mut by_category: BTreeMap<String, (Money, usize)> = BTreeMap::new();
        let mut by_method: BTreeMap<String, (Money, usize)> = BTreeMap::new();
        let mut weekly_totals = [Money::zero(); 5];
        for e in &current {
            let entry = by_category
                .entry(e.category.to_string())
                .or_insert((Money::zero(), 0));
            entry.0 += e.amount;
            entry.1 += 1;

            let entry = by_method.entry(e.method.clone()).or_insert((Money::zero(), 0));
            entry.0 += e.amount;
            entry.1 += 1;

            let week = usize::from(e.week.clamp(1, 5)) - 1;
            weekly_totals[week] += e.amount;
        }

        let expense_total: Money = current.iter().map(|e| e.amount).sum();
        Ok(Self {
            year: month.year,
            month: month.month,
            expense_total,
            expense_count: current.len(),
            by_category: sorted(by_category),
            by_method: sorted(by_method),
            weekly_totals,
            income_total,
            fixed_total,
            net_balance: income_total - expense_total - fixed_total,
            previous_month_expense_total,
        })
    }

    /// Format the summary for terminal display
    pub fn format_terminal(&self, symbol: &str) -> String {
        let money = |amount: Money| money_column(amount, symbol, 12);
        let mut output = String::new();

        output.push_str(&format!(
            "Monthly Summary: {}\n",
            YearMonth {
                year: self.year,
                month: self.month
            }
        ));
        output.push_str(&double_separator(56));
        output.push('\n');
        output.push_str(&format!("{:<32}{}\n", "Income", money(self.income_total)));
        output.push_str(&format!("{:<32}{}\n", "Fixed expenses", money(self.fixed_total)));
        output.push_str(&format!(
            "{:<32}{}  ({} vs last month)\n",
            "Expenses",
            money(self.expense_total),
            format_change(self.expense_total - self.previous_month_expense_total, symbol)
        ));
        output.push_str(&format!("{:<32}{}\n\n", "Net balance", money(self.net_balance)));

        for (title, rows) in [("By Category", &self.by_category), ("By Method", &self.by_method)] {
            output.push_str(title);
            output.push('\n');
            output.push_str(&separator(56));
            output.push('\n');
            for row in rows {
                output.push_str(&format!("  {:<30}{}{:>6}\n", row.name, money(row.total), row.count));
            }
            output.push('\n');
        }

        output.push_str("By Week\n");
        output.push_str(&separator(56));
        output.push('\n');
        for (i, total) in self.weekly_totals.iter().enumerate() {
            output.push_str(&format!("  Week {:<25}{}\n", i + 1, money(*total)));
        }
        output
    }
}

fn sorted(groups: BTreeMap<String, (Money, usize)>) -> Vec<NamedTotal> {
    let mut rows: Vec<NamedTotal> = groups
        .into_iter()
        .map(|(name, (total, count))| NamedTotal { name, total, count })
        .collect();
    rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExpenseCategory, ExpenseInput, FixedExpenseInput, IncomeInput};
    use crate::services::{ExpenseService, FixedExpenseService, IncomeService};
    use crate::storage::test_support::create_test_storage;

    fn add(storage: &Storage, on: &str, cents: i64, category: ExpenseCategory, method: &str) {
        ExpenseService::new(storage)
            .create(ExpenseInput::new(
                on.parse().unwrap(),
                "Somewhere",
                Money::from_cents(cents),
                category,
                method,
            ))
            .unwrap();
    }

    #[test]
    fn test_monthly_summary() {
        let (_temp_dir, storage) = create_test_storage();
        add(&storage, "2025-03-02", 5000, ExpenseCategory::Groceries, "Debit");
        add(&storage, "2025-03-09", 2500, ExpenseCategory::Gas, "VISA");
        add(&storage, "2025-03-30", 1500, ExpenseCategory::Groceries, "Debit");
        add(&storage, "2025-02-14", 4000, ExpenseCategory::DiningOut, "VISA");

        IncomeService::new(&storage)
            .create(IncomeInput {
                year: 2025,
                month: 3,
                name: "Paycheque".into(),
                amount: Money::from_cents(300000),
                category: Some("Salary".into()),
            })
            .unwrap();
        FixedExpenseService::new(&storage)
            .create(FixedExpenseInput {
                year: 2025,
                month: 3,
                name: "Rent".into(),
                amount: Money::from_cents(150000),
                category: "Housing".into(),
                payment_type: "Debit".into(),
                payment_due_day: Some(1),
                linked_loan_id: None,
            })
            .unwrap();

        let summary = MonthlySummary::generate(&storage, YearMonth::new(2025, 3).unwrap()).unwrap();
        assert_eq!(summary.expense_total.cents(), 9000);
        assert_eq!(summary.expense_count, 3);
        assert_eq!(summary.by_category[0].name, "Groceries");
        assert_eq!(summary.by_category[0].total.cents(), 6500);
        assert_eq!(summary.by_method[0].name, "Debit");
        assert_eq!(summary.weekly_totals[0].cents(), 5000);
        assert_eq!(summary.weekly_totals[1].cents(), 2500);
        assert_eq!(summary.weekly_totals[4].cents(), 1500);
        assert_eq!(summary.net_balance.cents(), 300000 - 9000 - 150000);
        assert_eq!(summary.previous_month_expense_total.cents(), 4000);

        let text = summary.format_terminal("$");
        assert!(text.contains("Monthly Summary: 2025-03"));
    }
}
