//! checkflow-core — domain and persistence for a bounced-check
//! collections desk.
//!
//! Companies define a late fee and a wait period; payer accounts under a
//! company accumulate checks; each unpaid check walks a three-letter
//! escalation ladder until paid off. The store is the only module that
//! talks to SQLite.

pub mod account;
pub mod check;
pub mod company;
pub mod error;
pub mod letters;
pub mod query;
pub mod report;
pub mod roles;
pub mod store;
pub mod types;
pub mod user;
