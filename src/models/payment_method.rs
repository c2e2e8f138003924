//! Payment methods
//!
//! Expenses name their payment method by display name ("VISA", "Debit").
//! Credit cards additionally track a running balance and their billing cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::money::Money;

string_enum! {
    pub enum PaymentMethodType {
        Cash => "cash",
        Cheque => "cheque",
        Debit => "debit",
        CreditCard => "credit_card",
    }
}

/// Methods created on first start, matching the spreadsheet the tracker replaced
pub const DEFAULT_METHODS: [(&str, PaymentMethodType); 7] = [
    ("Cash", PaymentMethodType::Cash),
    ("Debit", PaymentMethodType::Debit),
    ("Cheque", PaymentMethodType::Cheque),
    ("CIBC MC", PaymentMethodType::CreditCard),
    ("PCF MC", PaymentMethodType::CreditCard),
    ("WS VISA", PaymentMethodType::CreditCard),
    ("VISA", PaymentMethodType::CreditCard),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: i64,
    pub display_name: String,
    #[serde(rename = "type")]
    pub method_type: PaymentMethodType,
    pub full_name: Option<String>,
    pub account_details: Option<String>,
    pub credit_limit: Option<Money>,
    /// Outstanding balance; only moves for credit cards
    pub current_balance: Money,
    pub payment_due_day: Option<u32>,
    pub billing_cycle_day: Option<u32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PaymentMethod {
    pub fn is_credit_card(&self) -> bool {
        self.method_type == PaymentMethodType::CreditCard
    }

    /// Remaining credit, when a limit is known
    pub fn available_credit(&self) -> Option<Money> {
        self.credit_limit.map(|limit| limit - self.current_balance)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentMethodInput {
    pub display_name: String,
    #[serde(rename = "type", alias = "method_type")]
    pub method_type: String,
    pub full_name: Option<String>,
    pub account_details: Option<String>,
    pub credit_limit: Option<Money>,
    pub current_balance: Option<Money>,
    pub payment_due_day: Option<u32>,
    pub billing_cycle_day: Option<u32>,
    pub is_active: Option<bool>,
}
