//! Reporting aggregate queries.

use super::check::scope_clause;
use super::{bind_refs, BindValues, Store};
use crate::error::{AppError, AppResult};
use crate::report::{DateRange, LetterBucket, PaidBreakdown};
use crate::roles::CheckScope;
use rusqlite::params_from_iter;

const CHECK_BASE: &str = "FROM checks c \
                          JOIN accounts a ON a.id = c.account_id \
                          JOIN users u ON u.id = c.user_id \
                          JOIN profiles p ON p.user_id = u.id \
                          WHERE 1=1";

impl Store {
    /// Paid vs unpaid counts over checks entered in the range, within the
    /// viewer's scope.
    pub fn paid_breakdown(&self, scope: CheckScope, range: DateRange) -> AppResult<PaidBreakdown> {
        let mut binds: BindValues = Vec::new();
        let scoped = scope_clause(scope, &mut binds);
        binds.push(Box::new(range.from));
        binds.push(Box::new(range.to));

        let sql = format!(
            "SELECT COUNT(*), COALESCE(SUM(c.paid), 0) {CHECK_BASE}{scoped} \
             AND date(c.created_at) BETWEEN ? AND ?"
        );
        let (total, paid): (i64, i64) =
            self.conn
                .query_row(&sql, params_from_iter(bind_refs(&binds)), |row| {
                    Ok((row.get(0)?, row.get(1)?))
                })?;
        Ok(PaidBreakdown {
            paid,
            not_paid: total - paid,
        })
    }

    /// Daily counts of letter-N stamps in the range, within the viewer's
    /// scope, ordered by date.
    pub fn letter_counts(
        &self,
        scope: CheckScope,
        letter: u8,
        range: DateRange,
    ) -> AppResult<Vec<LetterBucket>> {
        // The column comes from a match, never from the caller's string.
        let column = match letter {
            1 => "c.letter1_date",
            2 => "c.letter2_date",
            3 => "c.letter3_date",
            other => {
                return Err(AppError::Precondition(format!(
                    "no such letter: {other}"
                )))
            }
        };

        let mut binds: BindValues = Vec::new();
        let scoped = scope_clause(scope, &mut binds);
        binds.push(Box::new(range.from));
        binds.push(Box::new(range.to));

        let sql = format!(
            "SELECT {column}, COUNT(*) {CHECK_BASE}{scoped} \
             AND {column} IS NOT NULL AND {column} BETWEEN ? AND ? \
             GROUP BY {column} ORDER BY {column} ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let buckets = stmt
            .query_map(params_from_iter(bind_refs(&binds)), |row| {
                Ok(LetterBucket {
                    date: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(buckets)
    }
}
