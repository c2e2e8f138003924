//! SQLite conversions for domain types
//!
//! Money is stored as INTEGER cents, enums as their wire strings, and months
//! as "YYYY-MM" text.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::models::{
    ClaimStatus, ExpenseCategory, IncomeCategory, InvestmentType, LoanType, Money,
    PaymentFrequency, PaymentMethodType, RateType, YearMonth,
};

impl ToSql for Money {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.cents()))
    }
}

impl FromSql for Money {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Money::from_cents)
    }
}

impl ToSql for YearMonth {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for YearMonth {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        YearMonth::parse(s).map_err(|e| FromSqlError::Other(e.to_string().into()))
    }
}

macro_rules! sql_text_enum {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    let s = value.as_str()?;
                    <$ty>::parse(s).ok_or_else(|| {
                        FromSqlError::Other(
                            format!("unexpected {} value '{}'", stringify!($ty), s).into(),
                        )
                    })
                }
            }
        )+
    };
}

sql_text_enum!(
    ExpenseCategory,
    ClaimStatus,
    IncomeCategory,
    InvestmentType,
    LoanType,
    RateType,
    PaymentFrequency,
    PaymentMethodType,
);

/// "?, ?, ?" for an IN list of `n` items
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_round_trip_through_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (amount INTEGER, category TEXT, month TEXT)")
            .unwrap();
        conn.execute(
            "INSERT INTO t VALUES (?1, ?2, ?3)",
            rusqlite::params![
                Money::from_cents(1234),
                ExpenseCategory::TaxMedical,
                YearMonth::new(2025, 4).unwrap()
            ],
        )
        .unwrap();

        let (amount, category, raw, month): (Money, ExpenseCategory, String, YearMonth) = conn
            .query_row("SELECT amount, category, category, month FROM t", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
            })
            .unwrap();
        assert_eq!(amount.cents(), 1234);
        assert_eq!(category, ExpenseCategory::TaxMedical);
        assert_eq!(raw, "Tax - Medical");
        assert_eq!(month.to_string(), "2025-04");
    }

    #[test]
    fn test_unknown_enum_value_is_an_error() {
        let conn = Connection::open_in_memory().unwrap();
        let result: rusqlite::Result<ClaimStatus> =
            conn.query_row("SELECT 'lost'", [], |r| r.get(0));
        assert!(result.is_err());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(0), "");
    }
}
