//! Reminder letter generation.
//!
//! The renderer is a collaborator behind a trait — PDF conversion or HTML
//! templating live outside this crate. The contract is narrow: render
//! success advances the check's letter ladder, render failure leaves the
//! check untouched and surfaces the error. Classifying which letter is due
//! never mutates anything.

use crate::account::Account;
use crate::check::{Check, CurrentLetter};
use crate::company::Company;
use crate::error::{AppError, AppResult};
use crate::store::Store;
use crate::types::{CheckId, UserId};
use crate::user::User;
use chrono::NaiveDate;

/// Everything a letter template needs: the check, its account, the company
/// whose policy drives the ladder, and the user collecting on it.
#[derive(Debug, Clone)]
pub struct LetterContext {
    pub check: Check,
    pub account: Account,
    pub company: Company,
    pub user: User,
}

pub trait LetterRenderer {
    fn render(&self, ctx: &LetterContext, letter: CurrentLetter) -> anyhow::Result<String>;
}

/// Plain-text renderer. The tone escalates: notice, demand, final demand
/// before referral.
pub struct TextLetterRenderer;

impl LetterRenderer for TextLetterRenderer {
    fn render(&self, ctx: &LetterContext, letter: CurrentLetter) -> anyhow::Result<String> {
        let number = letter
            .number()
            .ok_or_else(|| anyhow::anyhow!("no letter due for check {}", ctx.check.id))?;
        let due = ctx.check.amount_due(ctx.company.late_fee);
        let body = match number {
            1 => format!(
                "This is a courtesy notice that check #{} in the amount of ${} \
                 was returned unpaid. Please remit ${} (including the ${} \
                 returned-check fee) within {} days.",
                ctx.check.number,
                ctx.check.amount,
                due,
                ctx.company.late_fee,
                ctx.company.wait_period_days,
            ),
            2 => format!(
                "Our records show check #{} remains unpaid despite our earlier \
                 notice. Payment of ${} is now demanded within {} days to avoid \
                 further action.",
                ctx.check.number, due, ctx.company.wait_period_days,
            ),
            _ => format!(
                "FINAL DEMAND: check #{} is seriously past due. Unless payment \
                 of ${} is received within {} days this matter will be referred \
                 for collection.",
                ctx.check.number, due, ctx.company.wait_period_days,
            ),
        };
        Ok(format!(
            "{company}\n{street}\n{city}, {state} {zip}\n\n\
             To: {account}\n\n{body}\n\n{collector}\n{company}\n",
            company = ctx.company.name,
            street = ctx.company.street,
            city = ctx.company.city,
            state = ctx.company.state,
            zip = ctx.company.zip_code,
            account = ctx.account.name,
            body = body,
            collector = ctx.user.full_name(),
        ))
    }
}

/// A letter produced by a generation run.
#[derive(Debug, Clone)]
pub struct GeneratedLetter {
    pub check_id: CheckId,
    pub letter: CurrentLetter,
    pub body: String,
}

/// Generate the letter currently due for one check, if any. The letter date
/// is stamped only after the renderer succeeds; `Paid` and `NoAction`
/// classifications produce nothing and mutate nothing.
pub fn generate_letter(
    store: &Store,
    renderer: &dyn LetterRenderer,
    check_id: CheckId,
    today: NaiveDate,
) -> AppResult<Option<GeneratedLetter>> {
    let ctx = store.letter_context(check_id)?;
    let letter = ctx.check.current_letter(ctx.company.wait_period_days, today);
    if letter.number().is_none() {
        return Ok(None);
    }
    let body = renderer.render(&ctx, letter).map_err(AppError::Other)?;
    store.stamp_letter(check_id, letter, today)?;
    Ok(Some(GeneratedLetter {
        check_id,
        letter,
        body,
    }))
}

/// Generate every letter currently due across one user's checks — the
/// "print all my letters" run. Returns the letters in check-entry order;
/// an empty vec means nothing was due.
pub fn generate_letters_for_user(
    store: &Store,
    renderer: &dyn LetterRenderer,
    user_id: UserId,
    today: NaiveDate,
) -> AppResult<Vec<GeneratedLetter>> {
    let mut generated = Vec::new();
    for check in store.checks_for_user(user_id)? {
        // Checks on accounts without a company are skipped, not fatal:
        // the batch run covers whatever is collectible today.
        match generate_letter(store, renderer, check.id, today) {
            Ok(Some(letter)) => generated.push(letter),
            Ok(None) => {}
            Err(AppError::Precondition(reason)) => {
                log::warn!("skipping check {} in letter run: {reason}", check.id);
            }
            Err(other) => return Err(other),
        }
    }
    log::info!(
        "letter run for user {user_id}: {} letter(s) generated",
        generated.len()
    );
    Ok(generated)
}
