//! Role and simulation predicates.
//!
//! Pure functions over `(User, Profile)` values — the authorization layer
//! sits outside this crate and consumes these as its decision inputs.
//! "Simulation" is an admin temporarily scoping themselves to a company;
//! a simulating admin is treated like a regular company user for data
//! visibility.

use crate::types::{AccountId, CompanyId, UserId};
use crate::user::{Profile, User};

pub fn is_admin(user: &User) -> bool {
    user.is_superuser
}

pub fn is_supervisor(profile: &Profile) -> bool {
    profile.is_supervisor
}

pub fn supervisor_or_above(user: &User, profile: &Profile) -> bool {
    is_admin(user) || is_supervisor(profile)
}

pub fn is_simulating(user: &User, profile: &Profile) -> bool {
    is_admin(user) && profile.company_id.is_some()
}

pub fn admin_not_simulating(user: &User, profile: &Profile) -> bool {
    is_admin(user) && profile.company_id.is_none()
}

/// A company-scoped view of the data: everyone who is not an
/// unsimulated admin, including admins currently simulating.
pub fn regular_view(user: &User, profile: &Profile) -> bool {
    !is_admin(user) || is_simulating(user, profile)
}

/// Which checks a viewer may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckScope {
    /// Unsimulated admin: everything.
    All,
    /// Supervisor or simulating admin: checks entered by users of this
    /// company (None matches users with no company attached).
    Company(Option<CompanyId>),
    /// Regular user: own checks only.
    User(UserId),
    /// Drill-down from an account page.
    Account(AccountId),
}

/// Which accounts a viewer may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountScope {
    All,
    Company(Option<CompanyId>),
}

/// Which users a viewer may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserScope {
    All,
    Company(Option<CompanyId>),
}

pub fn check_scope(user: &User, profile: &Profile) -> CheckScope {
    if admin_not_simulating(user, profile) {
        CheckScope::All
    } else if supervisor_or_above(user, profile) {
        CheckScope::Company(profile.company_id)
    } else {
        CheckScope::User(user.id)
    }
}

pub fn account_scope(user: &User, profile: &Profile) -> AccountScope {
    if admin_not_simulating(user, profile) {
        AccountScope::All
    } else {
        AccountScope::Company(profile.company_id)
    }
}

pub fn user_scope(user: &User, profile: &Profile) -> UserScope {
    if admin_not_simulating(user, profile) {
        UserScope::All
    } else {
        UserScope::Company(profile.company_id)
    }
}
