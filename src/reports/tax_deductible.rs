//! Tax-deductible expense report
//!
//! Collects a year's `Tax - Medical` and `Tax - Donation` expenses and reshapes
//! them for filing: totals, a month-by-month breakdown, grouping by provider,
//! recipient and household member, insurance claim progress, invoice coverage
//! and a comparison with the previous year.
//!
//! With a claim status filter only insurance-eligible medical expenses in that
//! status are reported. Donations never carry a claim, so they drop out.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::display::{
    double_separator, format_change, format_percentage, money_column, separator, truncate,
};
use crate::error::{TrackerError, TrackerResult};
use crate::models::period::{validate_year, year_bounds};
use crate::models::{ClaimStatus, Expense, ExpenseCategory, Money};
use crate::storage::{ExpenseQuery, ExpenseRepository, InvoiceRepository, PersonRepository, Storage};

/// Label used for expenses recorded without a place
const UNKNOWN_PLACE: &str = "(no place)";

/// An expense as it appears in the report
#[derive(Debug, Clone, Serialize)]
pub struct TaxExpense {
    #[serde(flatten)]
    pub expense: Expense,
    pub invoice_count: i64,
    pub has_invoice: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TaxExpenses {
    pub medical: Vec<TaxExpense>,
    pub donations: Vec<TaxExpense>,
}

/// Totals for one calendar month
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyTaxTotals {
    pub month: u32,
    pub medical: Money,
    pub donation: Money,
    pub total: Money,
}

/// Expenses grouped by place
#[derive(Debug, Clone, Serialize)]
pub struct PlaceTotal {
    pub place: String,
    pub total: Money,
    pub count: usize,
}

/// One person's share of one expense
#[derive(Debug, Clone, Serialize)]
pub struct AllocatedExpense {
    pub expense_id: i64,
    pub date: NaiveDate,
    pub place: String,
    /// Amount attributed to the person
    pub amount: Money,
    pub original_amount: Option<Money>,
    /// Amount of the whole expense
    pub expense_amount: Money,
    pub claim_status: Option<ClaimStatus>,
    pub invoice_count: i64,
}

/// Medical spending attributed to one person
#[derive(Debug, Clone, Serialize)]
pub struct PersonTaxSummary {
    pub person_id: i64,
    pub name: String,
    pub total: Money,
    pub count: usize,
    pub providers: Vec<PlaceTotal>,
    pub expenses: Vec<AllocatedExpense>,
}

/// Medical expenses nobody has been assigned to
#[derive(Debug, Clone, Default, Serialize)]
pub struct UnassignedSummary {
    pub count: usize,
    pub total: Money,
    pub expenses: Vec<TaxExpense>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimStatusTotals {
    pub status: ClaimStatus,
    pub count: usize,
    /// Out-of-pocket amount
    pub amount: Money,
    pub original_cost: Money,
}

/// Insurance claim progress across eligible medical expenses
#[derive(Debug, Clone, Serialize)]
pub struct InsuranceSummary {
    pub eligible_count: usize,
    pub original_cost_total: Money,
    pub out_of_pocket_total: Money,
    pub reimbursed_total: Money,
    pub by_status: Vec<ClaimStatusTotals>,
}

/// Which medical expenses have supporting documents
#[derive(Debug, Clone, Default, Serialize)]
pub struct InvoiceCoverage {
    pub with_invoices: usize,
    pub without_invoices: usize,
    /// Medical expenses still missing an invoice
    pub missing: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct YearOverYear {
    pub previous_year: i32,
    pub previous_medical_total: Money,
    pub previous_donation_total: Money,
    pub previous_total: Money,
    pub change: Money,
    /// Absent when the previous year had nothing to compare against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
}

/// The full report for one year
#[derive(Debug, Clone, Serialize)]
pub struct TaxDeductibleReport {
    pub year: i32,
    pub claim_status: Option<ClaimStatus>,
    pub medical_total: Money,
    pub donation_total: Money,
    pub total_deductible: Money,
    pub expenses: TaxExpenses,
    pub monthly_breakdown: Vec<MonthlyTaxTotals>,
    pub medical_by_provider: Vec<PlaceTotal>,
    pub donations_by_recipient: Vec<PlaceTotal>,
    pub by_person: Vec<PersonTaxSummary>,
    pub unassigned: UnassignedSummary,
    pub insurance: InsuranceSummary,
    pub invoices: InvoiceCoverage,
    pub year_over_year: YearOverYear,
}

impl TaxDeductibleReport {
    /// Generate the report for `year`, optionally restricted to one claim status
    pub fn generate(
        storage: &Storage,
        year: i32,
        claim_status: Option<&str>,
    ) -> TrackerResult<Self> {
        validate_year(year)?;
        let claim_status = ClaimStatus::parse_optional_field("claim_status", claim_status)?;

        let conn = storage.connection()?;
        let repo = ExpenseRepository::new(&conn);

        let (start, end) = year_bounds(year);
        let expenses = repo.list(&report_query(start, end, claim_status))?;
        let ids: Vec<i64> = expenses.iter().map(|e| e.id).collect();
        let invoice_counts = InvoiceRepository::new(&conn).counts_for_expenses(&ids)?;
        let people = PersonRepository::new(&conn).list()?;

        let (prev_start, prev_end) = year_bounds(year - 1);
        let previous = repo.category_totals(&report_query(prev_start, prev_end, claim_status))?;
        drop(conn);

        let expenses: Vec<TaxExpense> = expenses
            .into_iter()
            .map(|expense| {
                let invoice_count = invoice_counts.get(&expense.id).copied().unwrap_or(0);
                TaxExpense {
                    expense,
                    invoice_count,
                    has_invoice: invoice_count > 0,
                }
            })
            .collect();

        let (medical, donations): (Vec<TaxExpense>, Vec<TaxExpense>) = expenses
            .into_iter()
            .partition(|e| e.expense.category.is_medical());

        let medical_total: Money = medical.iter().map(|e| e.expense.amount).sum();
        let donation_total: Money = donations.iter().map(|e| e.expense.amount).sum();
        let total_deductible = medical_total + donation_total;

        let previous_total_for = |category: ExpenseCategory| {
            previous
                .iter()
                .find(|(c, _)| *c == category)
                .map_or(Money::zero(), |(_, total)| *total)
        };
        let previous_medical_total = previous_total_for(ExpenseCategory::TaxMedical);
        let previous_donation_total = previous_total_for(ExpenseCategory::TaxDonation);
        let previous_total = previous_medical_total + previous_donation_total;
        let change = total_deductible - previous_total;
        let year_over_year = YearOverYear {
            previous_year: year - 1,
            previous_medical_total,
            previous_donation_total,
            previous_total,
            change,
            change_percent: (!previous_total.is_zero()).then(|| change.percent_of(previous_total)),
        };

        let report = Self {
            year,
            claim_status,
            medical_total,
            donation_total,
            total_deductible,
            monthly_breakdown: monthly_breakdown(&medical, &donations),
            medical_by_provider: group_by_place(medical.iter().map(|e| &e.expense)),
            donations_by_recipient: group_by_place(donations.iter().map(|e| &e.expense)),
            by_person: by_person(&people, &medical),
            unassigned: unassigned(&medical),
            insurance: insurance(&medical),
            invoices: invoice_coverage(&medical),
            year_over_year,
            expenses: TaxExpenses { medical, donations },
        };

        tracing::debug!(
            year,
            medical = report.expenses.medical.len(),
            donations = report.expenses.donations.len(),
            "Generated tax-deductible report"
        );
        Ok(report)
    }

    /// Format the report for terminal display
    pub fn format_terminal(&self, symbol: &str) -> String {
        let money = |amount: Money| money_column(amount, symbol, 12);
        let mut output = String::new();

        output.push_str(&format!("Tax-Deductible Expenses: {}", self.year));
        if let Some(status) = self.claim_status {
            output.push_str(&format!(" (claim status: {})", status));
        }
        output.push('\n');
        output.push_str(&double_separator(72));
        output.push('\n');
        output.push_str(&format!("{:<30}{}\n", "Medical", money(self.medical_total)));
        output.push_str(&format!("{:<30}{}\n", "Donations", money(self.donation_total)));
        output.push_str(&format!(
            "{:<30}{}\n",
            "Total deductible",
            money(self.total_deductible)
        ));

        let yoy = &self.year_over_year;
        output.push_str(&format!(
            "{:<30}{}  {}",
            format!("Previous year ({})", yoy.previous_year),
            money(yoy.previous_total),
            format_change(yoy.change, symbol)
        ));
        if let Some(pct) = yoy.change_percent {
            output.push_str(&format!(" ({})", format_percentage(pct)));
        }
        output.push_str("\n\n");

        output.push_str("Monthly Breakdown\n");
        output.push_str(&separator(72));
        output.push('\n');
        output.push_str(&format!(
            "{:<10}{:>12}{:>12}{:>12}\n",
            "Month", "Medical", "Donation", "Total"
        ));
        for month in self.monthly_breakdown.iter().filter(|m| !m.total.is_zero()) {
            output.push_str(&format!(
                "{:<10}{}{}{}\n",
                month_name(month.month),
                money(month.medical),
                money(month.donation),
                money(month.total)
            ));
        }
        output.push('\n');

        for (title, groups) in [
            ("Medical by Provider", &self.medical_by_provider),
            ("Donations by Recipient", &self.donations_by_recipient),
        ] {
            if groups.is_empty() {
                continue;
            }
            output.push_str(title);
            output.push('\n');
            output.push_str(&separator(72));
            output.push('\n');
            for group in groups {
                output.push_str(&format!(
                    "  {:<40}{:>6}{}\n",
                    truncate(&group.place, 40),
                    group.count,
                    money(group.total)
                ));
            }
            output.push('\n');
        }

        if !self.by_person.is_empty() || self.unassigned.count > 0 {
            output.push_str("Medical by Person\n");
            output.push_str(&separator(72));
            output.push('\n');
            for person in &self.by_person {
                output.push_str(&format!(
                    "  {:<40}{:>6}{}\n",
                    truncate(&person.name, 40),
                    person.count,
                    money(person.total)
                ));
            }
            if self.unassigned.count > 0 {
                output.push_str(&format!(
                    "  {:<40}{:>6}{}\n",
                    "Unassigned",
                    self.unassigned.count,
                    money(self.unassigned.total)
                ));
            }
            output.push('\n');
        }

        let insurance = &self.insurance;
        if insurance.eligible_count > 0 {
            output.push_str("Insurance Claims\n");
            output.push_str(&separator(72));
            output.push('\n');
            for status in insurance.by_status.iter().filter(|s| s.count > 0) {
                output.push_str(&format!(
                    "  {:<40}{:>6}{}\n",
                    status.status.as_str(),
                    status.count,
                    money(status.amount)
                ));
            }
            output.push_str(&format!(
                "  {:<46}{}\n",
                "Reimbursed",
                money(insurance.reimbursed_total)
            ));
            output.push('\n');
        }

        output.push_str(&format!(
            "Invoices: {} medical expense(s) documented, {} missing\n",
            self.invoices.with_invoices, self.invoices.without_invoices
        ));
        output
    }

    /// Export every reported expense as CSV
    pub fn export_csv<W: Write>(&self, writer: W) -> TrackerResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record([
            "Date",
            "Place",
            "Category",
            "Amount",
            "Original Cost",
            "Claim Status",
            "People",
            "Invoices",
            "Notes",
        ])
        .map_err(export_error)?;

        let rows = self
            .expenses
            .medical
            .iter()
            .chain(self.expenses.donations.iter());
        for row in rows {
            let e = &row.expense;
            let people = e
                .people
                .iter()
                .map(|p| format!("{} ({:.2})", p.name, p.amount.to_f64()))
                .collect::<Vec<_>>()
                .join("; ");
            csv.write_record([
                e.date.to_string(),
                e.place.clone(),
                e.category.to_string(),
                format!("{:.2}", e.amount.to_f64()),
                e.original_cost
                    .map(|c| format!("{:.2}", c.to_f64()))
                    .unwrap_or_default(),
                e.claim_status.map(|s| s.to_string()).unwrap_or_default(),
                people,
                row.invoice_count.to_string(),
                e.notes.clone(),
            ])
            .map_err(export_error)?;
        }

        for (label, total) in [
            ("TOTAL MEDICAL", self.medical_total),
            ("TOTAL DONATIONS", self.donation_total),
            ("TOTAL DEDUCTIBLE", self.total_deductible),
        ] {
            let amount = format!("{:.2}", total.to_f64());
            csv.write_record(["", label, "", amount.as_str(), "", "", "", "", ""])
                .map_err(export_error)?;
        }

        csv.flush()
            .map_err(|e| TrackerError::Export(e.to_string()))?;
        Ok(())
    }
}

fn export_error(e: csv::Error) -> TrackerError {
    TrackerError::Export(e.to_string())
}

fn report_query(start: NaiveDate, end: NaiveDate, status: Option<ClaimStatus>) -> ExpenseQuery {
    match status {
        Some(status) => ExpenseQuery {
            claim_status: Some(status),
            insurance_eligible: Some(true),
            ..ExpenseQuery::between(start, end).with_categories(&[ExpenseCategory::TaxMedical])
        },
        None => ExpenseQuery::between(start, end).with_categories(&ExpenseCategory::TAX_DEDUCTIBLE),
    }
}

fn month_name(month: u32) -> &'static str {
    const NAMES: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    NAMES.get(month.saturating_sub(1) as usize).copied().unwrap_or("")
}

fn place_label(place: &str) -> String {
    let place = place.trim();
    if place.is_empty() {
        UNKNOWN_PLACE.to_string()
    } else {
        place.to_string()
    }
}

/// Always twelve entries, January first
fn monthly_breakdown(medical: &[TaxExpense], donations: &[TaxExpense]) -> Vec<MonthlyTaxTotals> {
    let mut months: Vec<MonthlyTaxTotals> = (1..=12)
        .map(|month| MonthlyTaxTotals {
            month,
            medical: Money::zero(),
            donation: Money::zero(),
            total: Money::zero(),
        })
        .collect();

    for e in medical {
        let entry = &mut months[e.expense.date.month0() as usize];
        entry.medical += e.expense.amount;
        entry.total += e.expense.amount;
    }
    for e in donations {
        let entry = &mut months[e.expense.date.month0() as usize];
        entry.donation += e.expense.amount;
        entry.total += e.expense.amount;
    }
    months
}

/// Group by place, largest total first, ties by name
fn group_by_place<'e>(expenses: impl Iterator<Item = &'e Expense>) -> Vec<PlaceTotal> {
    let mut by_place: BTreeMap<String, (Money, usize)> = BTreeMap::new();
    for e in expenses {
        let entry = by_place
            .entry(place_label(&e.place))
            .or_insert((Money::zero(), 0));
        entry.0 += e.amount;
        entry.1 += 1;
    }
    sorted_places(by_place)
}

fn sorted_places(by_place: BTreeMap<String, (Money, usize)>) -> Vec<PlaceTotal> {
    let mut groups: Vec<PlaceTotal> = by_place
        .into_iter()
        .map(|(place, (total, count))| PlaceTotal {
            place,
            total,
            count,
        })
        .collect();
    groups.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.place.cmp(&b.place)));
    groups
}

/// Per-person medical totals, in the people list's name order
fn by_person(people: &[crate::models::Person], medical: &[TaxExpense]) -> Vec<PersonTaxSummary> {
    let mut allocations: HashMap<i64, Vec<AllocatedExpense>> = HashMap::new();
    for row in medical {
        let e = &row.expense;
        for allocation in &e.people {
            allocations
                .entry(allocation.person_id)
                .or_default()
                .push(AllocatedExpense {
                    expense_id: e.id,
                    date: e.date,
                    place: e.place.clone(),
                    amount: allocation.amount,
                    original_amount: allocation.original_amount,
                    expense_amount: e.amount,
                    claim_status: e.claim_status,
                    invoice_count: row.invoice_count,
                });
        }
    }

    people
        .iter()
        .filter_map(|person| {
            let expenses = allocations.remove(&person.id)?;
            let mut providers: BTreeMap<String, (Money, usize)> = BTreeMap::new();
            for e in &expenses {
                let entry = providers
                    .entry(place_label(&e.place))
                    .or_insert((Money::zero(), 0));
                entry.0 += e.amount;
                entry.1 += 1;
            }
            Some(PersonTaxSummary {
                person_id: person.id,
                name: person.name.clone(),
                total: expenses.iter().map(|e| e.amount).sum(),
                count: expenses.len(),
                providers: sorted_places(providers),
                expenses,
            })
        })
        .collect()
}

fn unassigned(medical: &[TaxExpense]) -> UnassignedSummary {
    let expenses: Vec<TaxExpense> = medical
        .iter()
        .filter(|e| e.expense.is_unassigned_medical())
        .cloned()
        .collect();
    UnassignedSummary {
        count: expenses.len(),
        total: expenses.iter().map(|e| e.expense.amount).sum(),
        expenses,
    }
}

fn insurance(medical: &[TaxExpense]) -> InsuranceSummary {
    let mut by_status: Vec<ClaimStatusTotals> = ClaimStatus::ALL
        .iter()
        .map(|status| ClaimStatusTotals {
            status: *status,
            count: 0,
            amount: Money::zero(),
            original_cost: Money::zero(),
        })
        .collect();

    let mut summary = InsuranceSummary {
        eligible_count: 0,
        original_cost_total: Money::zero(),
        out_of_pocket_total: Money::zero(),
        reimbursed_total: Money::zero(),
        by_status: Vec::new(),
    };

    for e in medical.iter().map(|row| &row.expense).filter(|e| e.insurance_eligible) {
        let original = e.original_cost.unwrap_or(e.amount);
        summary.eligible_count += 1;
        summary.original_cost_total += original;
        summary.out_of_pocket_total += e.amount;
        summary.reimbursed_total += e.reimbursed_amount();

        let status = e.claim_status.unwrap_or_default();
        if let Some(entry) = by_status.iter_mut().find(|s| s.status == status) {
            entry.count += 1;
            entry.amount += e.amount;
            entry.original_cost += original;
        }
    }

    summary.by_status = by_status;
    summary
}

fn invoice_coverage(medical: &[TaxExpense]) -> InvoiceCoverage {
    let missing: Vec<i64> = medical
        .iter()
        .filter(|e| !e.has_invoice)
        .map(|e| e.expense.id)
        .collect();
    InvoiceCoverage {
        with_invoices: medical.len() - missing.len(),
        without_invoices: missing.len(),
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AllocationInput, ExpenseInput, PersonInput};
    use crate::services::{ExpenseService, InvoiceService, InvoiceUpload, PersonService};
    use crate::storage::test_support::create_test_storage;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn medical(on: &str, place: &str, cents: i64) -> ExpenseInput {
        ExpenseInput::new(
            date(on),
            place,
            Money::from_cents(cents),
            ExpenseCategory::TaxMedical,
            "VISA",
        )
    }

    fn donation(on: &str, place: &str, cents: i64) -> ExpenseInput {
        ExpenseInput::new(
            date(on),
            place,
            Money::from_cents(cents),
            ExpenseCategory::TaxDonation,
            "Debit",
        )
    }

    fn person(storage: &Storage, name: &str) -> i64 {
        PersonService::new(storage)
            .create(PersonInput {
                name: name.into(),
                date_of_birth: None,
            })
            .unwrap()
            .id
    }

    fn insured(mut input: ExpenseInput, status: &str, original: i64) -> ExpenseInput {
        input.insurance_eligible = true;
        input.claim_status = Some(status.into());
        input.original_cost = Some(Money::from_cents(original));
        input
    }

    #[test]
    fn test_totals_groups_and_breakdown() {
        let (_temp_dir, storage) = create_test_storage();
        let expenses = ExpenseService::new(&storage);

        expenses.create(medical("2025-01-10", "Dentist", 12000)).unwrap();
        expenses.create(medical("2025-03-02", "Pharmacy", 3000)).unwrap();
        expenses.create(medical("2025-03-20", "Dentist", 8000)).unwrap();
        expenses.create(donation("2025-12-01", "Food Bank", 5000)).unwrap();
        expenses
            .create(ExpenseInput::new(
                date("2025-03-05"),
                "Costco",
                Money::from_cents(9999),
                ExpenseCategory::Groceries,
                "Debit",
            ))
            .unwrap();
        expenses.create(medical("2024-06-01", "Dentist", 10000)).unwrap();

        let report = TaxDeductibleReport::generate(&storage, 2025, None).unwrap();
        assert_eq!(report.medical_total.cents(), 23000);
        assert_eq!(report.donation_total.cents(), 5000);
        assert_eq!(report.total_deductible.cents(), 28000);
        assert_eq!(report.expenses.medical.len(), 3);
        assert_eq!(report.expenses.donations.len(), 1);

        assert_eq!(report.monthly_breakdown.len(), 12);
        assert_eq!(report.monthly_breakdown[2].medical.cents(), 11000);
        assert_eq!(report.monthly_breakdown[11].donation.cents(), 5000);
        assert!(report.monthly_breakdown[1].total.is_zero());

        assert_eq!(report.medical_by_provider[0].place, "Dentist");
        assert_eq!(report.medical_by_provider[0].total.cents(), 20000);
        assert_eq!(report.medical_by_provider[0].count, 2);
        assert_eq!(report.donations_by_recipient[0].place, "Food Bank");

        assert_eq!(report.unassigned.count, 3);
        assert_eq!(report.invoices.without_invoices, 3);

        let yoy = &report.year_over_year;
        assert_eq!(yoy.previous_year, 2024);
        assert_eq!(yoy.previous_total.cents(), 10000);
        assert_eq!(yoy.change.cents(), 18000);
        assert!((yoy.change_percent.unwrap() - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_by_person_and_unassigned() {
        let (_temp_dir, storage) = create_test_storage();
        let expenses = ExpenseService::new(&storage);
        let sam = person(&storage, "Sam");
        let alex = person(&storage, "Alex");

        let mut split = medical("2025-02-01", "Physio", 10000);
        split.people = Some(vec![
            AllocationInput {
                person_id: sam,
                amount: Some(Money::from_cents(6000)),
                original_amount: None,
            },
            AllocationInput {
                person_id: alex,
                amount: Some(Money::from_cents(4000)),
                original_amount: None,
            },
        ]);
        expenses.create(split).unwrap();

        let mut single = medical("2025-02-15", "Optometrist", 2500);
        single.people = Some(vec![AllocationInput {
            person_id: sam,
            amount: None,
            original_amount: None,
        }]);
        expenses.create(single).unwrap();
        expenses.create(medical("2025-04-01", "Clinic", 700)).unwrap();

        let report = TaxDeductibleReport::generate(&storage, 2025, None).unwrap();
        let names: Vec<_> = report.by_person.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alex", "Sam"]);

        let sam_summary = &report.by_person[1];
        assert_eq!(sam_summary.total.cents(), 8500);
        assert_eq!(sam_summary.count, 2);
        assert_eq!(sam_summary.providers[0].place, "Physio");
        assert_eq!(sam_summary.expenses[0].expense_amount.cents(), 10000);

        assert_eq!(report.unassigned.count, 1);
        assert_eq!(report.unassigned.total.cents(), 700);
    }

    #[test]
    fn test_claim_status_filter_and_insurance() {
        let (_temp_dir, storage) = create_test_storage();
        let expenses = ExpenseService::new(&storage);

        expenses
            .create(insured(medical("2025-05-01", "Dentist", 2000), "paid", 10000))
            .unwrap();
        expenses
            .create(insured(medical("2025-05-09", "Clinic", 5000), "in_progress", 5000))
            .unwrap();
        expenses.create(medical("2025-05-10", "Pharmacy", 900)).unwrap();
        expenses.create(donation("2025-05-11", "Church", 2500)).unwrap();

        let report = TaxDeductibleReport::generate(&storage, 2025, None).unwrap();
        let insurance = &report.insurance;
        assert_eq!(insurance.eligible_count, 2);
        assert_eq!(insurance.original_cost_total.cents(), 15000);
        assert_eq!(insurance.out_of_pocket_total.cents(), 7000);
        assert_eq!(insurance.reimbursed_total.cents(), 8000);
        assert_eq!(insurance.by_status.len(), 4);

        let paid = TaxDeductibleReport::generate(&storage, 2025, Some("paid")).unwrap();
        assert_eq!(paid.claim_status, Some(ClaimStatus::Paid));
        assert_eq!(paid.expenses.medical.len(), 1);
        assert!(paid.expenses.donations.is_empty());
        assert_eq!(paid.total_deductible.cents(), 2000);

        let err = TaxDeductibleReport::generate(&storage, 2025, Some("pending")).unwrap_err();
        assert!(err.is_validation());
        let blank = TaxDeductibleReport::generate(&storage, 2025, Some("  ")).unwrap();
        assert_eq!(blank.expenses.medical.len(), 3);
    }

    #[test]
    fn test_year_bounds_and_empty_previous_year() {
        let (_temp_dir, storage) = create_test_storage();
        assert!(TaxDeductibleReport::generate(&storage, 1899, None)
            .unwrap_err()
            .is_validation());
        assert!(TaxDeductibleReport::generate(&storage, 10000, None)
            .unwrap_err()
            .is_validation());

        let report = TaxDeductibleReport::generate(&storage, 2025, None).unwrap();
        assert!(report.year_over_year.change_percent.is_none());
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["year_over_year"].get("change_percent").is_none());
        assert_eq!(json["monthly_breakdown"].as_array().unwrap().len(), 12);
    }

    #[test]
    fn test_invoice_counts() {
        let (_temp_dir, storage) = create_test_storage();
        let expense = ExpenseService::new(&storage)
            .create(medical("2025-07-01", "Dentist", 4000))
            .unwrap();
        ExpenseService::new(&storage)
            .create(medical("2025-07-02", "Clinic", 1000))
            .unwrap();

        InvoiceService::new(&storage, 1024 * 1024)
            .upload(InvoiceUpload {
                expense_id: expense.id,
                person_id: None,
                original_filename: "receipt.pdf".into(),
                content_type: Some("application/pdf".into()),
                bytes: b"%PDF-1.4 test".to_vec(),
            })
            .unwrap();

        let report = TaxDeductibleReport::generate(&storage, 2025, None).unwrap();
        assert_eq!(report.invoices.with_invoices, 1);
        assert_eq!(report.invoices.without_invoices, 1);
        let dentist = report
            .expenses
            .medical
            .iter()
            .find(|e| e.expense.id == expense.id)
            .unwrap();
        assert_eq!(dentist.invoice_count, 1);
        assert!(dentist.has_invoice);
    }

    #[test]
    fn test_terminal_and_csv_output() {
        let (_temp_dir, storage) = create_test_storage();
        ExpenseService::new(&storage)
            .create(medical("2025-01-10", "Dentist", 12000))
            .unwrap();
        let report = TaxDeductibleReport::generate(&storage, 2025, None).unwrap();

        let text = report.format_terminal("$");
        assert!(text.contains("Tax-Deductible Expenses: 2025"));
        assert!(text.contains("Dentist"));
        assert!(text.contains("$120.00"));

        let mut buffer = Vec::new();
        report.export_csv(&mut buffer).unwrap();
        let csv = String::from_utf8(buffer).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("Date,Place,Category,Amount"));
        assert!(lines.next().unwrap().starts_with("2025-01-10,Dentist,Tax - Medical,120.00"));
        assert!(csv.contains("TOTAL DEDUCTIBLE,,120.00"));
    }
}
