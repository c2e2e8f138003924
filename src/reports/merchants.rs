//! Merchant analytics
//!
//! Ranks places by spending over a period and breaks a single place down by
//! month, category and payment method.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::display::{double_separator, format_bar, format_percentage, money_column, separator, truncate};
use crate::error::{TrackerError, TrackerResult};
use crate::models::period::{validate_year, year_bounds};
use crate::models::{Expense, ExpenseCategory, Money, YearMonth};
use crate::storage::{ExpenseQuery, ExpenseRepository, Storage};

/// Default number of merchants returned by the ranking
pub const DEFAULT_LIMIT: usize = 10;

/// Time window the ranking covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MerchantPeriod {
    All,
    Year { year: i32 },
    Month { year: i32, month: u32 },
}

impl MerchantPeriod {
    /// Build a period from request parameters
    ///
    /// `year` and `month` default to the current ones when the period needs them.
    pub fn from_params(
        period: Option<&str>,
        year: Option<i32>,
        month: Option<u32>,
    ) -> TrackerResult<Self> {
        let today = YearMonth::current();
        match period.map(str::trim).unwrap_or("all") {
            "" | "all" => Ok(Self::All),
            "year" => {
                let year = year.unwrap_or(today.year);
                validate_year(year)?;
                Ok(Self::Year { year })
            }
            "month" => {
                let month = YearMonth::new(year.unwrap_or(today.year), month.unwrap_or(today.month))?;
                Ok(Self::Month {
                    year: month.year,
                    month: month.month,
                })
            }
            other => Err(TrackerError::Validation(format!(
                "Invalid period \"{}\" (must be one of: all, year, month)",
                other
            ))),
        }
    }

    fn query(&self) -> ExpenseQuery {
        match *self {
            Self::All => ExpenseQuery::default(),
            Self::Year { year } => {
                let (start, end) = year_bounds(year);
                ExpenseQuery::between(start, end)
            }
            Self::Month { year, month } => ExpenseQuery::in_month(YearMonth { year, month }),
        }
    }
}

impl fmt::Display for MerchantPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all time"),
            Self::Year { year } => write!(f, "{}", year),
            Self::Month { year, month } => write!(f, "{}", YearMonth { year: *year, month: *month }),
        }
    }
}

/// Ranking order; always descending, ties broken by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MerchantSort {
    #[default]
    Total,
    Visits,
    Average,
}

impl MerchantSort {
    pub fn parse(s: Option<&str>) -> TrackerResult<Self> {
        match s.map(str::trim).unwrap_or("") {
            "" | "total" => Ok(Self::Total),
            "visits" => Ok(Self::Visits),
            "average" => Ok(Self::Average),
            other => Err(TrackerError::Validation(format!(
                "Invalid sort \"{}\" (must be one of: total, visits, average)",
                other
            ))),
        }
    }
}

/// One place in the ranking
#[derive(Debug, Clone, Serialize)]
pub struct MerchantSummary {
    pub place: String,
    pub total: Money,
    pub visits: usize,
    pub average: Money,
    /// Share of all spending in the period
    pub percent_of_total: f64,
    pub first_visit: NaiveDate,
    pub last_visit: NaiveDate,
    pub primary_category: ExpenseCategory,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopMerchantsReport {
    pub period: MerchantPeriod,
    pub sort: MerchantSort,
    pub merchants: Vec<MerchantSummary>,
    /// Spending across every place in the period
    pub period_total: Money,
    pub merchant_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyTrend {
    pub year: i32,
    pub month: u32,
    pub total: Money,
    pub visits: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakdownEntry {
    pub name: String,
    pub total: Money,
    pub count: usize,
    pub percent: f64,
}

/// Everything recorded at one place
#[derive(Debug, Clone, Serialize)]
pub struct MerchantDetail {
    #[serde(flatten)]
    pub summary: MerchantSummary,
    pub monthly_trend: Vec<MonthlyTrend>,
    pub categories: Vec<BreakdownEntry>,
    pub methods: Vec<BreakdownEntry>,
    pub recent: Vec<Expense>,
}

impl TopMerchantsReport {
    pub fn generate(
        storage: &Storage,
        period: MerchantPeriod,
        sort: MerchantSort,
        limit: usize,
    ) -> TrackerResult<Self> {
        let expenses = {
            let conn = storage.connection()?;
            ExpenseRepository::new(&conn).list(&period.query())?
        };
        let period_total: Money = expenses.iter().map(|e| e.amount).sum();

        // Places group ignoring ASCII case, the same rule the detail lookup uses
        let mut by_place: HashMap<String, Vec<&Expense>> = HashMap::new();
        for e in expenses.iter().filter(|e| !e.place.trim().is_empty()) {
            by_place.entry(e.place.to_ascii_lowercase()).or_default().push(e);
        }
        let merchant_count = by_place.len();

        let mut merchants: Vec<MerchantSummary> = by_place
            .into_values()
            .filter_map(|rows| {
                let name = rows.last()?.place.clone();
                summarize(name, &rows, period_total)
            })
            .collect();
        sort_merchants(&mut merchants, sort);
        merchants.truncate(limit);

        tracing::debug!(%period, merchants = merchants.len(), "Generated merchant ranking");
        Ok(Self {
            period,
            sort,
            merchants,
            period_total,
            merchant_count,
        })
    }

    /// Format the ranking for terminal display
    pub fn format_terminal(&self, symbol: &str) -> String {
        let mut output = String::new();
        output.push_str(&format!("Top Merchants ({})\n", self.period));
        output.push_str(&double_separator(78));
        output.push('\n');
        output.push_str(&format!(
            "{:<28}{:>12}{:>8}{:>12}{:>8}  {}\n",
            "Place", "Total", "Visits", "Average", "Share", ""
        ));
        output.push_str(&separator(78));
        output.push('\n');

        let max = self
            .merchants
            .iter()
            .map(|m| m.total.to_f64())
            .fold(0.0, f64::max);
        for m in &self.merchants {
            output.push_str(&format!(
                "{:<28}{}{:>8}{}{:>8}  {}\n",
                truncate(&m.place, 27),
                money_column(m.total, symbol, 12),
                m.visits,
                money_column(m.average, symbol, 12),
                format_percentage(m.percent_of_total),
                format_bar(m.total.to_f64(), max, 8)
            ));
        }
        output.push_str(&separator(78));
        output.push('\n');
        output.push_str(&format!(
            "{:<28}{}  ({} places)\n",
            "Period total",
            money_column(self.period_total, symbol, 12),
            self.merchant_count
        ));
        output
    }
}

impl MerchantDetail {
    /// Number of most recent expenses included in the detail
    pub const RECENT: usize = 10;

    /// Detail for one place (matched ignoring case) across all time
    pub fn generate(storage: &Storage, place: &str) -> TrackerResult<Self> {
        let place = place.trim();
        if place.is_empty() {
            return Err(TrackerError::Validation("Place is required".into()));
        }

        let (expenses, period_total) = {
            let conn = storage.connection()?;
            let repo = ExpenseRepository::new(&conn);
            let expenses = repo.list(&ExpenseQuery {
                place: Some(place.to_string()),
                ..Default::default()
            })?;
            let period_total: Money = repo
                .category_totals(&ExpenseQuery::default())?
                .iter()
                .map(|(_, total)| *total)
                .sum();
            (expenses, period_total)
        };

        let rows: Vec<&Expense> = expenses.iter().collect();
        let name = expenses
            .last()
            .map_or_else(|| place.to_string(), |e| e.place.clone());
        let summary = summarize(name, &rows, period_total).ok_or_else(|| {
            TrackerError::NotFound {
                entity_type: "Merchant",
                identifier: place.to_string(),
            }
        })?;

        let mut trend: BTreeMap<YearMonth, (Money, usize)> = BTreeMap::new();
        for e in &expenses {
            let entry = trend.entry(e.month()).or_insert((Money::zero(), 0));
            entry.0 += e.amount;
            entry.1 += 1;
        }
        let monthly_trend = trend
            .into_iter()
            .map(|(month, (total, visits))| MonthlyTrend {
                year: month.year,
                month: month.month,
                total,
                visits,
            })
            .collect();

        let categories = breakdown(&expenses, summary.total, |e| e.category.to_string());
        let methods = breakdown(&expenses, summary.total, |e| e.method.clone());
        let recent = expenses.iter().rev().take(Self::RECENT).cloned().collect();

        Ok(Self {
            summary,
            monthly_trend,
            categories,
            methods,
            recent,
        })
    }
}

fn summarize(place: String, rows: &[&Expense], period_total: Money) -> Option<MerchantSummary> {
    let first_visit = rows.iter().map(|e| e.date).min()?;
    let last_visit = rows.iter().map(|e| e.date).max()?;
    let total: Money = rows.iter().map(|e| e.amount).sum();
    let visits = rows.len();

    let mut by_category: BTreeMap<ExpenseCategory, Money> = BTreeMap::new();
    for e in rows {
        *by_category.entry(e.category).or_default() += e.amount;
    }
    let primary_category = by_category
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(category, _)| *category)?;

    Some(MerchantSummary {
        place,
        total,
        visits,
        average: Money::from_cents((total.cents() as f64 / visits as f64).round() as i64),
        percent_of_total: total.percent_of(period_total),
        first_visit,
        last_visit,
        primary_category,
    })
}

fn sort_merchants(merchants: &mut [MerchantSummary], sort: MerchantSort) {
    merchants.sort_by(|a, b| {
        let primary = match sort {
            MerchantSort::Total => b.total.cmp(&a.total),
            MerchantSort::Visits => b.visits.cmp(&a.visits),
            MerchantSort::Average => b.average.cmp(&a.average),
        };
        primary.then_with(|| a.place.cmp(&b.place))
    });
}

fn breakdown(
    expenses: &[Expense],
    total: Money,
    key: impl Fn(&Expense) -> String,
) -> Vec<BreakdownEntry> {
    let mut groups: BTreeMap<String, (Money, usize)> = BTreeMap::new();
    for e in expenses {
        let entry = groups.entry(key(e)).or_insert((Money::zero(), 0));
        entry.0 += e.amount;
        entry.1 += 1;
    }
    let mut entries: Vec<BreakdownEntry> = groups
        .into_iter()
        .map(|(name, (amount, count))| BreakdownEntry {
            name,
            total: amount,
            count,
            percent: amount.percent_of(total),
        })
        .collect();
    entries.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExpenseInput;
    use crate::services::ExpenseService;
    use crate::storage::test_support::create_test_storage;

    fn add(storage: &Storage, on: &str, place: &str, cents: i64, category: ExpenseCategory) {
        ExpenseService::new(storage)
            .create(ExpenseInput::new(
                on.parse().unwrap(),
                place,
                Money::from_cents(cents),
                category,
                "Debit",
            ))
            .unwrap();
    }

    fn seed(storage: &Storage) {
        add(storage, "2025-01-03", "Costco", 20000, ExpenseCategory::Groceries);
        add(storage, "2025-02-03", "Costco", 10000, ExpenseCategory::Groceries);
        add(storage, "2025-02-10", "Shell", 6000, ExpenseCategory::Gas);
        add(storage, "2025-02-17", "Shell", 6000, ExpenseCategory::Gas);
        add(storage, "2025-02-24", "Shell", 6000, ExpenseCategory::Gas);
        add(storage, "2025-03-01", "Apple", 30000, ExpenseCategory::Entertainment);
        add(storage, "2024-12-20", "Zellers", 30000, ExpenseCategory::Other);
    }

    #[test]
    fn test_ranking_orders() {
        let (_temp_dir, storage) = create_test_storage();
        seed(&storage);
        let year = MerchantPeriod::Year { year: 2025 };

        let by_total = TopMerchantsReport::generate(&storage, year, MerchantSort::Total, 10).unwrap();
        let places: Vec<_> = by_total.merchants.iter().map(|m| m.place.as_str()).collect();
        assert_eq!(places, vec!["Apple", "Costco", "Shell"]);
        assert_eq!(by_total.period_total.cents(), 78000);

        let by_visits =
            TopMerchantsReport::generate(&storage, year, MerchantSort::Visits, 10).unwrap();
        assert_eq!(by_visits.merchants[0].place, "Shell");
        assert_eq!(by_visits.merchants[0].visits, 3);

        let by_average =
            TopMerchantsReport::generate(&storage, year, MerchantSort::Average, 2).unwrap();
        let places: Vec<_> = by_average.merchants.iter().map(|m| m.place.as_str()).collect();
        assert_eq!(places, vec!["Apple", "Costco"]);
    }

    #[test]
    fn test_ties_break_by_name_and_all_time() {
        let (_temp_dir, storage) = create_test_storage();
        seed(&storage);
        let report =
            TopMerchantsReport::generate(&storage, MerchantPeriod::All, MerchantSort::Total, 10)
                .unwrap();
        let places: Vec<_> = report.merchants.iter().map(|m| m.place.as_str()).collect();
        assert_eq!(places, vec!["Apple", "Costco", "Zellers", "Shell"]);

        for pair in report.merchants.windows(2) {
            assert!(pair[0].total >= pair[1].total);
        }
    }

    #[test]
    fn test_summary_fields() {
        let (_temp_dir, storage) = create_test_storage();
        seed(&storage);
        let month = MerchantPeriod::Month { year: 2025, month: 2 };
        let report = TopMerchantsReport::generate(&storage, month, MerchantSort::Total, 10).unwrap();

        let shell = &report.merchants[0];
        assert_eq!(shell.place, "Shell");
        assert_eq!(shell.average.cents(), 6000);
        assert_eq!(shell.primary_category, ExpenseCategory::Gas);
        assert_eq!(shell.first_visit, "2025-02-10".parse().unwrap());
        assert_eq!(shell.last_visit, "2025-02-24".parse().unwrap());
        assert!((shell.percent_of_total - 64.2857).abs() < 0.001);
    }

    #[test]
    fn test_detail() {
        let (_temp_dir, storage) = create_test_storage();
        seed(&storage);
        let detail = MerchantDetail::generate(&storage, "costco").unwrap();
        assert_eq!(detail.summary.place, "Costco");
        assert_eq!(detail.summary.total.cents(), 30000);
        assert_eq!(detail.monthly_trend.len(), 2);
        assert_eq!(detail.categories[0].name, "Groceries");
        assert_eq!(detail.methods[0].name, "Debit");
        assert_eq!(detail.recent[0].date, "2025-02-03".parse().unwrap());

        let err = MerchantDetail::generate(&storage, "Nowhere").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_ranking_merges_case_variants_like_detail() {
        let (_temp_dir, storage) = create_test_storage();
        seed(&storage);
        add(&storage, "2025-03-05", "costco", 5000, ExpenseCategory::Groceries);
        let year = MerchantPeriod::Year { year: 2025 };

        let report = TopMerchantsReport::generate(&storage, year, MerchantSort::Total, 10).unwrap();
        assert_eq!(report.merchant_count, 3);
        let costco = report
            .merchants
            .iter()
            .find(|m| m.place.eq_ignore_ascii_case("costco"))
            .unwrap();
        assert_eq!(costco.place, "costco");
        assert_eq!(costco.visits, 3);
        assert_eq!(costco.total.cents(), 35000);

        let detail = MerchantDetail::generate(&storage, "Costco").unwrap();
        assert_eq!(detail.summary.total, costco.total);
        assert_eq!(detail.summary.visits, costco.visits);
    }

    #[test]
    fn test_params() {
        assert_eq!(
            MerchantPeriod::from_params(Some("year"), Some(2024), None).unwrap(),
            MerchantPeriod::Year { year: 2024 }
        );
        assert_eq!(MerchantPeriod::from_params(None, None, None).unwrap(), MerchantPeriod::All);
        assert!(MerchantPeriod::from_params(Some("week"), None, None).is_err());
        assert!(MerchantPeriod::from_params(Some("month"), Some(2025), Some(13)).is_err());
        assert_eq!(MerchantSort::parse(Some("visits")).unwrap(), MerchantSort::Visits);
        assert!(MerchantSort::parse(Some("name")).is_err());
    }
}
