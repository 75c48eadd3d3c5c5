//! Letter generation integration tests: the escalation ladder driven
//! through the store, and the stamp-only-after-render contract.

use checkflow_core::account::Account;
use checkflow_core::check::{Check, CurrentLetter};
use checkflow_core::company::Company;
use checkflow_core::letters::{
    generate_letter, generate_letters_for_user, LetterContext, LetterRenderer, TextLetterRenderer,
};
use checkflow_core::store::Store;
use checkflow_core::user::User;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

fn store() -> Store {
    let store = Store::in_memory().expect("open in-memory db");
    store.migrate().expect("migrate");
    store
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

fn seed(store: &Store) -> (i64, i64, i64) {
    let mut company = Company::new("Acme Collections");
    company.street = "1 Recovery Rd".into();
    company.city = "Greenville".into();
    company.state = "SC".into();
    company.zip_code = "29614".into();
    let company_id = store.insert_company(&company).unwrap();
    let account_id = store
        .insert_account(&Account::new("Test Account", Some(company_id)))
        .unwrap();
    let mut user = User::new("collector");
    user.first_name = "Casey".into();
    user.last_name = "Ledger".into();
    let user_id = store.insert_user(&user, Some(company_id)).unwrap();
    (company_id, account_id, user_id)
}

/// Insert a check whose entry date lies `days` before the fixed test date.
fn insert_check_aged(store: &Store, account_id: i64, user_id: i64, days: i64) -> i64 {
    let mut check = Check::new(account_id, user_id, 3232, dec!(100.00));
    let created = today() - Duration::days(days);
    check.created_at = Utc.from_utc_datetime(&created.and_hms_opt(9, 0, 0).unwrap());
    store.insert_check(&check).unwrap()
}

struct FailingRenderer;

impl LetterRenderer for FailingRenderer {
    fn render(&self, _ctx: &LetterContext, _letter: CurrentLetter) -> anyhow::Result<String> {
        anyhow::bail!("printer on fire")
    }
}

/// A fresh unpaid check gets letter 1 immediately; the date is stamped and
/// a second run on the same day produces nothing.
#[test]
fn first_letter_generates_and_stamps() {
    let store = store();
    let (_, account_id, user_id) = seed(&store);
    let check_id = insert_check_aged(&store, account_id, user_id, 0);

    let letter = generate_letter(&store, &TextLetterRenderer, check_id, today())
        .unwrap()
        .expect("letter 1 is due");
    assert_eq!(letter.letter, CurrentLetter::Letter1);
    assert!(letter.body.contains("#3232"), "body: {}", letter.body);
    assert!(letter.body.contains("Casey Ledger"));

    let check = store.get_check(check_id).unwrap();
    assert_eq!(check.letter1_date, Some(today()));

    // Letter 2 is gated on the wait period, so nothing more today.
    let again = generate_letter(&store, &TextLetterRenderer, check_id, today()).unwrap();
    assert!(again.is_none());
}

/// The full ladder: letter 2 after one wait period, letter 3 after two.
#[test]
fn ladder_escalates_across_wait_periods() {
    let store = store();
    let (_, account_id, user_id) = seed(&store);
    let check_id = insert_check_aged(&store, account_id, user_id, 0);
    let entry = today();

    let first = generate_letter(&store, &TextLetterRenderer, check_id, entry)
        .unwrap()
        .unwrap();
    assert_eq!(first.letter, CurrentLetter::Letter1);

    // Default wait period is 10 days.
    let second = generate_letter(&store, &TextLetterRenderer, check_id, entry + Duration::days(10))
        .unwrap()
        .unwrap();
    assert_eq!(second.letter, CurrentLetter::Letter2);

    let third = generate_letter(&store, &TextLetterRenderer, check_id, entry + Duration::days(20))
        .unwrap()
        .unwrap();
    assert_eq!(third.letter, CurrentLetter::Letter3);
    assert!(third.body.contains("FINAL DEMAND"));

    // The ladder is exhausted.
    let done = generate_letter(&store, &TextLetterRenderer, check_id, entry + Duration::days(40))
        .unwrap();
    assert!(done.is_none());
}

/// A render failure surfaces the error and leaves the check unstamped, so
/// the letter can be retried.
#[test]
fn failed_render_does_not_stamp() {
    let store = store();
    let (_, account_id, user_id) = seed(&store);
    let check_id = insert_check_aged(&store, account_id, user_id, 0);

    let err = generate_letter(&store, &FailingRenderer, check_id, today());
    assert!(err.is_err());
    let check = store.get_check(check_id).unwrap();
    assert!(check.letter1_date.is_none(), "failed render must not stamp");

    // The retry with a working renderer succeeds.
    let retry = generate_letter(&store, &TextLetterRenderer, check_id, today()).unwrap();
    assert!(retry.is_some());
}

/// Paid checks generate nothing.
#[test]
fn paid_check_generates_nothing() {
    let store = store();
    let (_, account_id, user_id) = seed(&store);
    let check_id = insert_check_aged(&store, account_id, user_id, 30);
    store.pay_check(check_id, dec!(150.00)).unwrap();

    let letter = generate_letter(&store, &TextLetterRenderer, check_id, today()).unwrap();
    assert!(letter.is_none());
    let check = store.get_check(check_id).unwrap();
    assert!(check.letter1_date.is_none());
}

/// The batch run covers every due check of a user and skips checks whose
/// account has no company instead of failing the whole run.
#[test]
fn batch_run_covers_due_checks_and_skips_orphans() {
    let store = store();
    let (_, account_id, user_id) = seed(&store);
    let due_a = insert_check_aged(&store, account_id, user_id, 0);
    let due_b = insert_check_aged(&store, account_id, user_id, 3);
    let paid = insert_check_aged(&store, account_id, user_id, 5);
    store.pay_check(paid, dec!(150.00)).unwrap();

    let orphan_account = store.insert_account(&Account::new("Orphan", None)).unwrap();
    insert_check_aged(&store, orphan_account, user_id, 2);

    let letters = generate_letters_for_user(&store, &TextLetterRenderer, user_id, today()).unwrap();
    let mut ids: Vec<i64> = letters.iter().map(|l| l.check_id).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![due_a, due_b]);

    // Nothing left to do on an immediate second run.
    let rerun = generate_letters_for_user(&store, &TextLetterRenderer, user_id, today()).unwrap();
    assert!(rerun.is_empty());
}

/// Letter stamps land in the audit log.
#[test]
fn letter_stamps_are_audited() {
    let store = store();
    let (_, account_id, user_id) = seed(&store);
    let check_id = insert_check_aged(&store, account_id, user_id, 0);
    generate_letter(&store, &TextLetterRenderer, check_id, today())
        .unwrap()
        .unwrap();

    let entries = store.audit_entries("check", check_id).unwrap();
    assert!(entries.iter().any(|e| e.action == "letter"));
}
