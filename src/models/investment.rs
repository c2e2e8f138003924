//! Investment accounts and their month-end values

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::Money;

string_enum! {
    pub enum InvestmentType {
        Tfsa => "TFSA",
        Rrsp => "RRSP",
        Other => "other",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Investment {
    pub id: i64,
    pub name: String,
    pub investment_type: InvestmentType,
    pub initial_value: Money,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvestmentInput {
    pub name: String,
    #[serde(rename = "type", alias = "investment_type")]
    pub investment_type: String,
    pub initial_value: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestmentValue {
    pub id: i64,
    pub investment_id: i64,
    pub year: i32,
    pub month: u32,
    pub value: Money,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvestmentValueInput {
    pub year: i32,
    pub month: u32,
    pub value: Money,
}
