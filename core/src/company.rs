//! The company record — top of the ownership tree. A company's late fee
//! and wait period drive the check escalation ladder for every account
//! under it.

use crate::error::{AppError, AppResult};
use crate::types::CompanyId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WAIT_PERIOD_DAYS: i64 = 10;
pub const DEFAULT_LATE_FEE: Decimal = dec!(50.00);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    pub description: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub wait_period_days: i64,
    pub late_fee: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            description: String::new(),
            street: String::new(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
            wait_period_days: DEFAULT_WAIT_PERIOD_DAYS,
            late_fee: DEFAULT_LATE_FEE,
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("name", "company name is required"));
        }
        if self.wait_period_days < 1 {
            return Err(AppError::validation(
                "wait_period_days",
                "wait period must be at least one day",
            ));
        }
        if self.late_fee < Decimal::ZERO {
            return Err(AppError::validation("late_fee", "late fee cannot be negative"));
        }
        if !self.zip_code.is_empty() && !valid_zip(&self.zip_code) {
            return Err(AppError::validation("zip_code", "zip code must be five digits"));
        }
        Ok(())
    }
}

/// Five ASCII digits, nothing else. Extended ZIP+4 forms are not accepted.
pub(crate) fn valid_zip(zip: &str) -> bool {
    zip.len() == 5 && zip.bytes().all(|b| b.is_ascii_digit())
}
