//! Identity and profile records.
//!
//! A `User` is the authentication-side identity (provisioned by the external
//! identity layer); its `Profile` is the 1:1 application-side attachment
//! carrying the supervisor flag, the paging preference, and the company the
//! user is scoped to. The store creates the profile in the same transaction
//! as the user and the schema cascades it away on user deletion.

use crate::error::{AppError, AppResult};
use crate::types::{CompanyId, ProfileId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_RECORDS_PER_PAGE: i64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub is_superuser: bool,
    pub date_joined: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: 0,
            username: username.into(),
            first_name: String::new(),
            last_name: String::new(),
            email: String::new(),
            is_superuser: false,
            date_joined: Utc::now(),
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.username.trim().is_empty() {
            return Err(AppError::validation("username", "username is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: ProfileId,
    pub user_id: UserId,
    /// None for an admin who is not simulating any company.
    pub company_id: Option<CompanyId>,
    pub is_supervisor: bool,
    pub records_per_page: i64,
}

impl Profile {
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: 0,
            user_id,
            company_id: None,
            is_supervisor: false,
            records_per_page: DEFAULT_RECORDS_PER_PAGE,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if !(1..=100).contains(&self.records_per_page) {
            return Err(AppError::validation(
                "records_per_page",
                "records per page must be between 1 and 100",
            ));
        }
        Ok(())
    }
}
