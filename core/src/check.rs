//! The check record and its escalation lifecycle.
//!
//! A check's state is derived, never stored: `paid` plus the set of stamped
//! letter dates, combined with the days elapsed since `created_at` and the
//! owning company's wait period, classify it onto the ladder
//! NotYetDue → Letter1 → Letter2 → Letter3 → Paid (with NoAction between
//! escalation boundaries).
//!
//! RULE: `current_letter` is a pure read. The only letter-date mutation is
//! `advance_letter`, and the only place `paid` flips to true is `pay`.

use crate::error::{AppError, AppResult};
use crate::types::{AccountId, CheckId, UserId};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Classification of a check against the escalation ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurrentLetter {
    Paid,
    Letter1,
    Letter2,
    Letter3,
    NoAction,
}

impl CurrentLetter {
    /// 1, 2 or 3 for the letter variants, None otherwise.
    pub fn number(self) -> Option<u8> {
        match self {
            CurrentLetter::Letter1 => Some(1),
            CurrentLetter::Letter2 => Some(2),
            CurrentLetter::Letter3 => Some(3),
            CurrentLetter::Paid | CurrentLetter::NoAction => None,
        }
    }
}

/// Result of applying a payment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayOutcome {
    FullyPaid,
    Partial(Decimal),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Check {
    pub id: CheckId,
    pub account_id: AccountId,
    pub user_id: UserId,
    pub number: i64,
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub paid: bool,
    /// Date written on the check itself, if known.
    pub date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub letter1_date: Option<NaiveDate>,
    pub letter2_date: Option<NaiveDate>,
    pub letter3_date: Option<NaiveDate>,
}

impl Check {
    pub fn new(account_id: AccountId, user_id: UserId, number: i64, amount: Decimal) -> Self {
        Self {
            id: 0,
            account_id,
            user_id,
            number,
            amount,
            amount_paid: Decimal::ZERO,
            paid: false,
            date: None,
            created_at: Utc::now(),
            letter1_date: None,
            letter2_date: None,
            letter3_date: None,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.amount < Decimal::ZERO {
            return Err(AppError::validation("amount", "amount cannot be negative"));
        }
        if self.amount_paid < Decimal::ZERO {
            return Err(AppError::validation(
                "amount_paid",
                "amount paid cannot be negative",
            ));
        }
        // Letter dates only ever appear in ladder order.
        if self.letter2_date.is_some() && self.letter1_date.is_none()
            || self.letter3_date.is_some() && self.letter2_date.is_none()
        {
            return Err(AppError::validation(
                "letter_dates",
                "letter dates are out of order",
            ));
        }
        Ok(())
    }

    /// Which letter is due right now. Pure: reads the check and the clock
    /// argument, mutates nothing.
    ///
    /// Letter 1 has no wait gate — it is due as soon as the check exists
    /// unpaid. Letters 2 and 3 wait out one and two wait periods from the
    /// check's entry date.
    pub fn current_letter(&self, wait_period_days: i64, today: NaiveDate) -> CurrentLetter {
        if self.paid {
            return CurrentLetter::Paid;
        }
        let delta = (today - self.created_at.date_naive()).num_days();
        if self.letter1_date.is_none() {
            CurrentLetter::Letter1
        } else if self.letter2_date.is_none() && delta >= wait_period_days {
            CurrentLetter::Letter2
        } else if self.letter3_date.is_none() && delta >= wait_period_days * 2 {
            CurrentLetter::Letter3
        } else {
            CurrentLetter::NoAction
        }
    }

    /// Stamp the date for a letter that was actually generated. Callers
    /// invoke this only after the renderer has succeeded. On any rejection
    /// the check is left exactly as it was.
    pub fn advance_letter(&mut self, letter: CurrentLetter, today: NaiveDate) -> AppResult<()> {
        let (ladder_ready, slot) = match letter {
            CurrentLetter::Letter1 => (true, &mut self.letter1_date),
            CurrentLetter::Letter2 => (self.letter1_date.is_some(), &mut self.letter2_date),
            CurrentLetter::Letter3 => (self.letter2_date.is_some(), &mut self.letter3_date),
            CurrentLetter::Paid | CurrentLetter::NoAction => {
                return Err(AppError::validation(
                    "letter",
                    "no letter is due for this check",
                ));
            }
        };
        // The stamp must land in ladder order.
        if !ladder_ready {
            return Err(AppError::validation("letter", "letter dates are out of order"));
        }
        if slot.is_some() {
            return Err(AppError::validation("letter", "letter was already generated"));
        }
        *slot = Some(today);
        Ok(())
    }

    /// Outstanding balance: company late fee plus face amount, less what has
    /// been paid so far.
    pub fn amount_due(&self, late_fee: Decimal) -> Decimal {
        late_fee + self.amount - self.amount_paid
    }

    /// Apply a payment. Rejects non-positive amounts and amounts that would
    /// overshoot the total due; flips `paid` exactly when the balance is
    /// cleared. This is the only code path that sets `paid`.
    pub fn pay(&mut self, amount: Decimal, late_fee: Decimal) -> AppResult<PayOutcome> {
        if amount <= Decimal::ZERO {
            return Err(AppError::validation(
                "amount",
                "payment amount must be positive",
            ));
        }
        if amount > self.amount_due(late_fee) {
            return Err(AppError::validation(
                "amount",
                format!("payment exceeds the {} due", self.amount_due(late_fee)),
            ));
        }
        self.amount_paid += amount;
        if self.amount_paid >= self.amount + late_fee {
            self.paid = true;
            Ok(PayOutcome::FullyPaid)
        } else {
            Ok(PayOutcome::Partial(amount))
        }
    }
}
