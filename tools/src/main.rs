//! checkflow-admin: headless admin tool for the checkflow database.
//!
//! Usage:
//!   checkflow-admin --db checks.db init
//!   checkflow-admin --db checks.db seed
//!   checkflow-admin --db checks.db checks [--search TERM] [--page N] [--per N] [--sort KEY]
//!   checkflow-admin --db checks.db pay --check ID --amount 25.00
//!   checkflow-admin --db checks.db letters --user ID [--date YYYY-MM-DD]
//!   checkflow-admin --db checks.db report [--from YYYY-MM-DD] [--to YYYY-MM-DD]

use anyhow::{bail, Context, Result};
use checkflow_core::{
    account::Account,
    check::Check,
    company::Company,
    letters::{generate_letters_for_user, TextLetterRenderer},
    query::ListParams,
    report::DateRange,
    roles::CheckScope,
    store::Store,
    user::User,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = flag(&args, "--db").unwrap_or_else(|| "checkflow.db".to_string());
    const COMMANDS: &[&str] = &["init", "seed", "checks", "pay", "letters", "report"];
    let command = args
        .iter()
        .skip(1)
        .find(|a| COMMANDS.contains(&a.as_str()));

    let store = Store::open(&db)?;
    store.migrate()?;
    log::debug!("database ready at {db}");

    match command.map(String::as_str) {
        Some("init") => {
            println!("database '{db}' initialized");
        }
        Some("seed") => seed(&store)?,
        Some("checks") => list_checks(&store, &args)?,
        Some("pay") => pay(&store, &args)?,
        Some("letters") => letters(&store, &args)?,
        Some("report") => report(&store, &args)?,
        other => {
            bail!("unknown or missing command: {other:?} (expected init, seed, checks, pay, letters, report)");
        }
    }
    Ok(())
}

fn flag(args: &[String], name: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].clone())
}

fn date_flag(args: &[String], name: &str) -> Result<Option<NaiveDate>> {
    flag(args, name)
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .with_context(|| format!("{name} must be YYYY-MM-DD, got '{s}'"))
        })
        .transpose()
}

fn seed(store: &Store) -> Result<()> {
    let mut company = Company::new("Acme Collections");
    company.street = "1 Recovery Rd".into();
    company.city = "Greenville".into();
    company.state = "SC".into();
    company.zip_code = "29614".into();
    let company_id = store.insert_company(&company)?;

    let mut account = Account::new("Test Account", Some(company_id));
    account.number = "20937520912209".into();
    account.routing_number = "209375993".into();
    account.street = "123 Account Way".into();
    let account_id = store.insert_account(&account)?;

    let mut user = User::new("collector");
    user.first_name = "Casey".into();
    user.last_name = "Ledger".into();
    user.email = "collector@example.com".into();
    let user_id = store.insert_user(&user, Some(company_id))?;

    for (number, amount) in [(3232, "55.22"), (1234, "5233.22"), (7001, "100.00")] {
        let check = Check::new(account_id, user_id, number, Decimal::from_str(amount)?);
        store.insert_check(&check)?;
    }
    println!("seeded company {company_id}, account {account_id}, user {user_id}, 3 checks");
    Ok(())
}

fn list_checks(store: &Store, args: &[String]) -> Result<()> {
    let params = ListParams {
        search: flag(args, "--search"),
        sort: flag(args, "--sort"),
        per: flag(args, "--per").map(|v| v.parse()).transpose()?,
        page: flag(args, "--page").map(|v| v.parse()).transpose()?,
    };
    let page = store.list_checks(CheckScope::All, &params, 10)?;
    println!(
        "page {}/{} ({} checks total)",
        page.number, page.num_pages, page.total
    );
    for check in &page.items {
        println!("{}", serde_json::to_string(check)?);
    }
    Ok(())
}

fn pay(store: &Store, args: &[String]) -> Result<()> {
    let check_id: i64 = flag(args, "--check")
        .context("--check ID is required")?
        .parse()?;
    let amount = Decimal::from_str(&flag(args, "--amount").context("--amount is required")?)?;
    let outcome = store.pay_check(check_id, amount)?;
    println!("{}", serde_json::to_string(&outcome)?);
    Ok(())
}

fn letters(store: &Store, args: &[String]) -> Result<()> {
    let user_id: i64 = flag(args, "--user")
        .context("--user ID is required")?
        .parse()?;
    let today = date_flag(args, "--date")?.unwrap_or_else(|| Utc::now().date_naive());
    let generated = generate_letters_for_user(store, &TextLetterRenderer, user_id, today)?;
    if generated.is_empty() {
        println!("no letters to generate");
        return Ok(());
    }
    for letter in &generated {
        println!("--- check {} ---", letter.check_id);
        println!("{}", letter.body);
    }
    Ok(())
}

fn report(store: &Store, args: &[String]) -> Result<()> {
    let today = Utc::now().date_naive();
    let mut range = DateRange::last_week(today);
    if let Some(from) = date_flag(args, "--from")? {
        range.from = from;
    }
    if let Some(to) = date_flag(args, "--to")? {
        range.to = to;
    }
    let breakdown = store.paid_breakdown(CheckScope::All, range)?;
    let mut summary = serde_json::json!({
        "from": range.from,
        "to": range.to,
        "paid": breakdown.paid,
        "not_paid": breakdown.not_paid,
    });
    for letter in 1..=3u8 {
        let buckets = store.letter_counts(CheckScope::All, letter, range)?;
        summary[format!("letter{letter}")] = serde_json::to_value(&buckets)?;
    }
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
