//! Referential integrity tests: cascades, the profile RESTRICT, and the
//! auto-provisioned profile.

use checkflow_core::account::Account;
use checkflow_core::check::Check;
use checkflow_core::company::Company;
use checkflow_core::error::AppError;
use checkflow_core::store::Store;
use checkflow_core::user::{User, DEFAULT_RECORDS_PER_PAGE};
use rust_decimal_macros::dec;

fn store() -> Store {
    let store = Store::in_memory().expect("open in-memory db");
    store.migrate().expect("migrate");
    store
}

/// Every inserted user gets a profile with the default paging preference.
#[test]
fn insert_user_provisions_a_profile() {
    let store = store();
    let user_id = store.insert_user(&User::new("fresh"), None).unwrap();
    let profile = store.profile_for_user(user_id).unwrap();
    assert_eq!(profile.user_id, user_id);
    assert_eq!(profile.company_id, None);
    assert!(!profile.is_supervisor);
    assert_eq!(profile.records_per_page, DEFAULT_RECORDS_PER_PAGE);
}

/// Deleting a company takes its accounts and their checks with it.
#[test]
fn company_delete_cascades_to_accounts_and_checks() {
    let store = store();
    let company_id = store.insert_company(&Company::new("Doomed Corp")).unwrap();
    let account_id = store
        .insert_account(&Account::new("Doomed Account", Some(company_id)))
        .unwrap();
    // The user lives outside the company so the RESTRICT does not fire.
    let user_id = store.insert_user(&User::new("outsider"), None).unwrap();
    let check_id = store
        .insert_check(&Check::new(account_id, user_id, 1, dec!(10.00)))
        .unwrap();

    store.delete_company(company_id).unwrap();

    assert!(matches!(
        store.get_account(account_id).unwrap_err(),
        AppError::NotFound { .. }
    ));
    assert!(matches!(
        store.get_check(check_id).unwrap_err(),
        AppError::NotFound { .. }
    ));
    // The user survives.
    assert!(store.get_user(user_id).is_ok());
}

/// A company with profiles still attached cannot be deleted; detaching the
/// profile clears the way.
#[test]
fn company_delete_blocked_by_attached_profile() {
    let store = store();
    let company_id = store.insert_company(&Company::new("Sticky Corp")).unwrap();
    let user_id = store
        .insert_user(&User::new("attached"), Some(company_id))
        .unwrap();

    let err = store.delete_company(company_id).unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "{err}");
    assert!(store.get_company(company_id).is_ok());

    store.delete_user(user_id).unwrap();
    store.delete_company(company_id).unwrap();
}

/// Deleting a user removes its profile and its checks.
#[test]
fn user_delete_cascades_to_profile_and_checks() {
    let store = store();
    let company_id = store.insert_company(&Company::new("Acme")).unwrap();
    let account_id = store
        .insert_account(&Account::new("Account", Some(company_id)))
        .unwrap();
    let user_id = store.insert_user(&User::new("leaver"), None).unwrap();
    let check_id = store
        .insert_check(&Check::new(account_id, user_id, 7, dec!(5.00)))
        .unwrap();

    store.delete_user(user_id).unwrap();

    assert!(matches!(
        store.profile_for_user(user_id).unwrap_err(),
        AppError::NotFound { .. }
    ));
    assert!(matches!(
        store.get_check(check_id).unwrap_err(),
        AppError::NotFound { .. }
    ));
    // The account the check hung off is untouched.
    assert!(store.get_account(account_id).is_ok());
}

/// Deleting an account removes its checks but not the entering user.
#[test]
fn account_delete_cascades_to_checks() {
    let store = store();
    let company_id = store.insert_company(&Company::new("Acme")).unwrap();
    let account_id = store
        .insert_account(&Account::new("Short-lived", Some(company_id)))
        .unwrap();
    let user_id = store.insert_user(&User::new("keeper"), Some(company_id)).unwrap();
    let check_id = store
        .insert_check(&Check::new(account_id, user_id, 9, dec!(1.00)))
        .unwrap();

    store.delete_account(account_id).unwrap();

    assert!(store.get_check(check_id).is_err());
    assert!(store.get_user(user_id).is_ok());
}

/// Inserting a check against a missing account or user fails up front.
#[test]
fn check_insert_verifies_foreign_rows() {
    let store = store();
    let company_id = store.insert_company(&Company::new("Acme")).unwrap();
    let account_id = store
        .insert_account(&Account::new("Account", Some(company_id)))
        .unwrap();
    let user_id = store.insert_user(&User::new("someone"), None).unwrap();

    assert!(matches!(
        store
            .insert_check(&Check::new(9999, user_id, 1, dec!(1.00)))
            .unwrap_err(),
        AppError::NotFound { .. }
    ));
    assert!(matches!(
        store
            .insert_check(&Check::new(account_id, 9999, 1, dec!(1.00)))
            .unwrap_err(),
        AppError::NotFound { .. }
    ));
}

/// Usernames are unique at the schema level.
#[test]
fn duplicate_username_is_rejected() {
    let store = store();
    store.insert_user(&User::new("taken"), None).unwrap();
    assert!(store.insert_user(&User::new("taken"), None).is_err());
    // The first row is still there and reachable by name.
    assert!(store.get_user_by_username("taken").unwrap().is_some());
}
