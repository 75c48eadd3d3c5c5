//! Shared primitive types used across the crate.

/// Surrogate key of a company row.
pub type CompanyId = i64;

/// Surrogate key of a payer account row.
pub type AccountId = i64;

/// Surrogate key of an identity (user) row.
pub type UserId = i64;

/// Surrogate key of a profile row.
pub type ProfileId = i64;

/// Surrogate key of a check row.
pub type CheckId = i64;
