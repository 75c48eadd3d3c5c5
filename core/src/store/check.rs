//! Check database queries: CRUD, scoped listings, payments, and
//! letter-date stamping.
//!
//! Payments persist through a conditional update keyed on the balance that
//! was read, so a concurrent payment cannot be silently overwritten; a lost
//! race reloads and retries once before surfacing a conflict.

use super::{bind_refs, decimal_col, BindValues, Store};
use crate::check::{Check, CurrentLetter, PayOutcome};
use crate::company::Company;
use crate::error::{AppError, AppResult};
use crate::letters::LetterContext;
use crate::query::{paginate, ListParams, Page, QuerySpec};
use crate::roles::CheckScope;
use crate::types::{CheckId, UserId};
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use rust_decimal::Decimal;

const LIST_SPEC: QuerySpec = QuerySpec {
    search_columns: &["a.name"],
    sort_keys: SORT_KEYS,
    default_sort: "-created_at",
};

/// Sublists (checks of one account, checks of one user) filter by nothing —
/// a search term passes through unapplied, matching the index pages they
/// back.
const SUBLIST_SPEC: QuerySpec = QuerySpec {
    search_columns: &[],
    sort_keys: SORT_KEYS,
    default_sort: "-created_at",
};

const SORT_KEYS: &[(&str, &str)] = &[
    ("created_at", "c.created_at"),
    ("number", "c.number"),
    ("amount", "CAST(c.amount AS REAL)"),
];

const CHECK_COLS: &str = "c.id, c.account_id, c.user_id, c.number, c.amount, c.amount_paid, \
                          c.paid, c.check_date, c.created_at, \
                          c.letter1_date, c.letter2_date, c.letter3_date";

const CHECK_BASE: &str = "FROM checks c \
                          JOIN accounts a ON a.id = c.account_id \
                          JOIN users u ON u.id = c.user_id \
                          JOIN profiles p ON p.user_id = u.id \
                          WHERE 1=1";

fn check_from_row(row: &Row<'_>) -> rusqlite::Result<Check> {
    Ok(Check {
        id: row.get(0)?,
        account_id: row.get(1)?,
        user_id: row.get(2)?,
        number: row.get(3)?,
        amount: decimal_col(row, 4)?,
        amount_paid: decimal_col(row, 5)?,
        paid: row.get(6)?,
        date: row.get(7)?,
        created_at: row.get(8)?,
        letter1_date: row.get(9)?,
        letter2_date: row.get(10)?,
        letter3_date: row.get(11)?,
    })
}

pub(crate) fn scope_clause(scope: CheckScope, binds: &mut BindValues) -> &'static str {
    match scope {
        CheckScope::All => "",
        CheckScope::Company(company_id) => {
            binds.push(Box::new(company_id));
            " AND p.company_id IS ?"
        }
        CheckScope::User(user_id) => {
            binds.push(Box::new(user_id));
            " AND c.user_id = ?"
        }
        CheckScope::Account(account_id) => {
            binds.push(Box::new(account_id));
            " AND c.account_id = ?"
        }
    }
}

impl Store {
    pub fn insert_check(&self, check: &Check) -> AppResult<CheckId> {
        check.validate()?;
        self.get_account(check.account_id)?;
        self.get_user(check.user_id)?;
        self.conn.execute(
            "INSERT INTO checks
                (account_id, user_id, number, amount, amount_paid, paid,
                 check_date, created_at, letter1_date, letter2_date, letter3_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                check.account_id,
                check.user_id,
                check.number,
                check.amount.to_string(),
                check.amount_paid.to_string(),
                check.paid,
                check.date,
                check.created_at,
                check.letter1_date,
                check.letter2_date,
                check.letter3_date,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.audit("check", id, "created", check)?;
        log::info!("check #{} created (id {id})", check.number);
        Ok(id)
    }

    pub fn get_check(&self, id: CheckId) -> AppResult<Check> {
        self.conn
            .query_row(
                &format!("SELECT {CHECK_COLS} FROM checks c WHERE c.id = ?1"),
                params![id],
                check_from_row,
            )
            .optional()?
            .ok_or(AppError::not_found("check", id))
    }

    /// Edit the check's face data. Payment state and letter dates are not
    /// touched here — `pay_check` and `stamp_letter` own those.
    pub fn update_check(&self, check: &Check) -> AppResult<()> {
        check.validate()?;
        let changed = self.conn.execute(
            "UPDATE checks SET number = ?1, amount = ?2, check_date = ?3 WHERE id = ?4",
            params![
                check.number,
                check.amount.to_string(),
                check.date,
                check.id
            ],
        )?;
        if changed == 0 {
            return Err(AppError::not_found("check", check.id));
        }
        self.audit("check", check.id, "updated", check)?;
        log::info!("check #{} updated", check.number);
        Ok(())
    }

    pub fn delete_check(&self, id: CheckId) -> AppResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM checks WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(AppError::not_found("check", id));
        }
        self.audit("check", id, "deleted", &serde_json::json!({ "id": id }))?;
        log::info!("check {id} deleted");
        Ok(())
    }

    /// The company whose late fee and wait period govern this check.
    /// A check on an account without a company cannot be collected on.
    pub fn company_for_check(&self, check_id: CheckId) -> AppResult<Company> {
        let check = self.get_check(check_id)?;
        let account = self.get_account(check.account_id)?;
        let company_id = account.company_id.ok_or_else(|| {
            AppError::Precondition(format!(
                "check {check_id}: account '{}' has no company",
                account.name
            ))
        })?;
        self.get_company(company_id)
    }

    pub fn amount_due(&self, check_id: CheckId) -> AppResult<Decimal> {
        let check = self.get_check(check_id)?;
        let company = self.company_for_check(check_id)?;
        Ok(check.amount_due(company.late_fee))
    }

    /// Apply a payment and persist it atomically. The update only lands if
    /// the stored balance still matches what was read; on a lost race the
    /// check is reloaded and the payment retried once.
    pub fn pay_check(&self, check_id: CheckId, amount: Decimal) -> AppResult<PayOutcome> {
        self.pay_check_with(check_id, amount, |_| {})
    }

    /// Payment loop with a hook invoked between the read and the
    /// conditional write; `pay_check` passes a no-op.
    fn pay_check_with(
        &self,
        check_id: CheckId,
        amount: Decimal,
        mut interleave: impl FnMut(&Self),
    ) -> AppResult<PayOutcome> {
        let company = self.company_for_check(check_id)?;
        for attempt in 0..2 {
            let mut check = self.get_check(check_id)?;
            let previous_paid = check.amount_paid;
            let outcome = check.pay(amount, company.late_fee)?;
            interleave(self);
            let changed = self.conn.execute(
                "UPDATE checks SET amount_paid = ?1, paid = ?2
                 WHERE id = ?3 AND amount_paid = ?4",
                params![
                    check.amount_paid.to_string(),
                    check.paid,
                    check_id,
                    previous_paid.to_string(),
                ],
            )?;
            if changed == 1 {
                self.audit(
                    "check",
                    check_id,
                    "payment",
                    &serde_json::json!({ "amount": amount, "outcome": outcome }),
                )?;
                log::info!(
                    "payment of {amount} applied to check #{} ({:?})",
                    check.number,
                    outcome
                );
                return Ok(outcome);
            }
            log::warn!("payment on check {check_id} lost a race (attempt {attempt}), reloading");
        }
        Err(AppError::Conflict(format!(
            "check {check_id} was modified concurrently while applying a payment"
        )))
    }

    /// Record that a letter was actually generated. Callers invoke this only
    /// after the renderer has succeeded; ladder-order violations are
    /// rejected before anything is written.
    pub fn stamp_letter(
        &self,
        check_id: CheckId,
        letter: CurrentLetter,
        today: NaiveDate,
    ) -> AppResult<()> {
        let mut check = self.get_check(check_id)?;
        check.advance_letter(letter, today)?;
        self.conn.execute(
            "UPDATE checks SET letter1_date = ?1, letter2_date = ?2, letter3_date = ?3
             WHERE id = ?4",
            params![
                check.letter1_date,
                check.letter2_date,
                check.letter3_date,
                check_id
            ],
        )?;
        self.audit(
            "check",
            check_id,
            "letter",
            &serde_json::json!({ "letter": letter, "date": today }),
        )?;
        log::info!(
            "letter {} stamped on check #{} for {today}",
            letter.number().unwrap_or(0),
            check.number
        );
        Ok(())
    }

    /// Everything needed to fill a letter template for one check.
    pub fn letter_context(&self, check_id: CheckId) -> AppResult<LetterContext> {
        let check = self.get_check(check_id)?;
        let account = self.get_account(check.account_id)?;
        let company = self.company_for_check(check_id)?;
        let user = self.get_user(check.user_id)?;
        Ok(LetterContext {
            check,
            account,
            company,
            user,
        })
    }

    /// All checks entered by one user, oldest first — the batch letter run.
    pub fn checks_for_user(&self, user_id: UserId) -> AppResult<Vec<Check>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CHECK_COLS} FROM checks c WHERE c.user_id = ?1 ORDER BY c.created_at ASC"
        ))?;
        let checks = stmt
            .query_map(params![user_id], check_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(checks)
    }

    /// Main check index: searches by account name within the viewer's scope.
    pub fn list_checks(
        &self,
        scope: CheckScope,
        params: &ListParams,
        viewer_per: i64,
    ) -> AppResult<Page<Check>> {
        self.list_checks_with(&LIST_SPEC, scope, params, viewer_per)
    }

    /// Drill-down listing of one account's checks.
    pub fn account_checks(
        &self,
        account_id: i64,
        params: &ListParams,
        viewer_per: i64,
    ) -> AppResult<Page<Check>> {
        self.get_account(account_id)?;
        self.list_checks_with(&SUBLIST_SPEC, CheckScope::Account(account_id), params, viewer_per)
    }

    /// Drill-down listing of one user's checks.
    pub fn user_checks(
        &self,
        user_id: UserId,
        params: &ListParams,
        viewer_per: i64,
    ) -> AppResult<Page<Check>> {
        self.get_user(user_id)?;
        self.list_checks_with(&SUBLIST_SPEC, CheckScope::User(user_id), params, viewer_per)
    }

    fn list_checks_with(
        &self,
        spec: &QuerySpec<'_>,
        scope: CheckScope,
        params: &ListParams,
        viewer_per: i64,
    ) -> AppResult<Page<Check>> {
        let mut binds: BindValues = Vec::new();
        let scoped = scope_clause(scope, &mut binds);

        let (filter, search_binds) = spec.filter_clause(params);
        binds.extend(
            search_binds
                .into_iter()
                .map(|b| Box::new(b) as Box<dyn rusqlite::types::ToSql>),
        );

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) {CHECK_BASE}{scoped}{filter}"),
            params_from_iter(bind_refs(&binds)),
            |row| row.get(0),
        )?;
        let paging = paginate(total, params, viewer_per);

        let sql = format!(
            "SELECT {CHECK_COLS} {CHECK_BASE}{scoped}{filter}{} LIMIT {} OFFSET {}",
            spec.order_clause(params),
            paging.per,
            paging.offset,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(bind_refs(&binds)), check_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            number: paging.page,
            num_pages: paging.num_pages,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Account;
    use crate::company::Company;
    use crate::user::User;
    use rust_decimal_macros::dec;

    fn seeded_store() -> (Store, CheckId) {
        let store = Store::in_memory().unwrap();
        store.migrate().unwrap();
        let company_id = store.insert_company(&Company::new("Acme")).unwrap();
        let account_id = store
            .insert_account(&Account::new("Account", Some(company_id)))
            .unwrap();
        let user_id = store.insert_user(&User::new("collector"), None).unwrap();
        let check_id = store
            .insert_check(&Check::new(account_id, user_id, 1, dec!(100.00)))
            .unwrap();
        (store, check_id)
    }

    fn overwrite_amount_paid(store: &Store, check_id: CheckId, value: &str) {
        store
            .conn
            .execute(
                "UPDATE checks SET amount_paid = ?1 WHERE id = ?2",
                params![value, check_id],
            )
            .unwrap();
    }

    /// A concurrent write between the read and the conditional update loses
    /// the first attempt; the reload picks up the new balance and the retry
    /// lands on top of it.
    #[test]
    fn lost_race_reloads_and_retries_once() {
        let (store, check_id) = seeded_store();
        let mut raced = false;
        let outcome = store
            .pay_check_with(check_id, dec!(20.00), |s| {
                if !raced {
                    raced = true;
                    overwrite_amount_paid(s, check_id, "10.00");
                }
            })
            .unwrap();
        assert_eq!(outcome, PayOutcome::Partial(dec!(20.00)));
        let check = store.get_check(check_id).unwrap();
        assert_eq!(check.amount_paid, dec!(30.00));
        assert!(!check.paid);
    }

    /// Losing the race on both attempts surfaces a conflict and applies
    /// nothing beyond what the concurrent writer stored.
    #[test]
    fn persistent_race_surfaces_conflict() {
        let (store, check_id) = seeded_store();
        let mut round = 0;
        let err = store
            .pay_check_with(check_id, dec!(20.00), |s| {
                round += 1;
                overwrite_amount_paid(s, check_id, &format!("{round}.25"));
            })
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)), "{err}");
        let check = store.get_check(check_id).unwrap();
        assert_eq!(check.amount_paid, dec!(2.25));
    }
}
