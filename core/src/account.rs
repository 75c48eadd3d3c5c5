//! Payer account record. Accounts belong to a company (optionally, while
//! being set up) and own the checks written against them.

use crate::company::valid_zip;
use crate::error::{AppError, AppResult};
use crate::types::{AccountId, CompanyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub company_id: Option<CompanyId>,
    pub name: String,
    pub number: String,
    pub routing_number: String,
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(name: impl Into<String>, company_id: Option<CompanyId>) -> Self {
        Self {
            id: 0,
            company_id,
            name: name.into(),
            number: String::new(),
            routing_number: String::new(),
            street: String::new(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("name", "account name is required"));
        }
        if !self.number.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(AppError::validation(
                "number",
                "only alphanumeric characters are allowed",
            ));
        }
        // US ABA routing numbers are exactly nine digits.
        if !self.routing_number.is_empty()
            && !(self.routing_number.len() == 9
                && self.routing_number.bytes().all(|b| b.is_ascii_digit()))
        {
            return Err(AppError::validation(
                "routing_number",
                "routing number must be 9 digits",
            ));
        }
        if !self.zip_code.is_empty() && !valid_zip(&self.zip_code) {
            return Err(AppError::validation("zip_code", "zip code must be five digits"));
        }
        Ok(())
    }
}
