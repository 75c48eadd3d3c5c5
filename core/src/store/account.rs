//! Account database queries.

use super::{bind_refs, BindValues, Store};
use crate::account::Account;
use crate::error::{AppError, AppResult};
use crate::query::{paginate, ListParams, Page, QuerySpec};
use crate::roles::AccountScope;
use crate::types::AccountId;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const LIST_SPEC: QuerySpec = QuerySpec {
    search_columns: &["name", "number", "routing_number", "street"],
    sort_keys: &[
        ("name", "name"),
        ("number", "number"),
        ("created_at", "created_at"),
    ],
    default_sort: "-created_at",
};

const ACCOUNT_COLS: &str = "id, company_id, name, number, routing_number, \
                            street, city, state, zip_code, created_at";

fn account_from_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get(0)?,
        company_id: row.get(1)?,
        name: row.get(2)?,
        number: row.get(3)?,
        routing_number: row.get(4)?,
        street: row.get(5)?,
        city: row.get(6)?,
        state: row.get(7)?,
        zip_code: row.get(8)?,
        created_at: row.get(9)?,
    })
}

impl Store {
    pub fn insert_account(&self, account: &Account) -> AppResult<AccountId> {
        account.validate()?;
        if let Some(company_id) = account.company_id {
            self.get_company(company_id)?;
        }
        self.conn.execute(
            "INSERT INTO accounts
                (company_id, name, number, routing_number,
                 street, city, state, zip_code, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                account.company_id,
                account.name,
                account.number,
                account.routing_number,
                account.street,
                account.city,
                account.state,
                account.zip_code,
                account.created_at,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.audit("account", id, "created", account)?;
        log::info!("account '{}' created (id {id})", account.name);
        Ok(id)
    }

    pub fn get_account(&self, id: AccountId) -> AppResult<Account> {
        self.conn
            .query_row(
                &format!("SELECT {ACCOUNT_COLS} FROM accounts WHERE id = ?1"),
                params![id],
                account_from_row,
            )
            .optional()?
            .ok_or(AppError::not_found("account", id))
    }

    pub fn update_account(&self, account: &Account) -> AppResult<()> {
        account.validate()?;
        let changed = self.conn.execute(
            "UPDATE accounts
             SET company_id = ?1, name = ?2, number = ?3, routing_number = ?4,
                 street = ?5, city = ?6, state = ?7, zip_code = ?8
             WHERE id = ?9",
            params![
                account.company_id,
                account.name,
                account.number,
                account.routing_number,
                account.street,
                account.city,
                account.state,
                account.zip_code,
                account.id,
            ],
        )?;
        if changed == 0 {
            return Err(AppError::not_found("account", account.id));
        }
        self.audit("account", account.id, "updated", account)?;
        log::info!("account '{}' updated", account.name);
        Ok(())
    }

    /// Deletes the account; its checks go with it via the cascade.
    pub fn delete_account(&self, id: AccountId) -> AppResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM accounts WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(AppError::not_found("account", id));
        }
        self.audit("account", id, "deleted", &serde_json::json!({ "id": id }))?;
        log::info!("account {id} deleted");
        Ok(())
    }

    pub fn list_accounts(
        &self,
        scope: AccountScope,
        params: &ListParams,
        viewer_per: i64,
    ) -> AppResult<Page<Account>> {
        let mut binds: BindValues = Vec::new();
        let scope_clause = match scope {
            AccountScope::All => "",
            AccountScope::Company(company_id) => {
                binds.push(Box::new(company_id));
                " AND company_id IS ?"
            }
        };

        let (filter, search_binds) = LIST_SPEC.filter_clause(params);
        binds.extend(
            search_binds
                .into_iter()
                .map(|b| Box::new(b) as Box<dyn rusqlite::types::ToSql>),
        );

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM accounts WHERE 1=1{scope_clause}{filter}"),
            params_from_iter(bind_refs(&binds)),
            |row| row.get(0),
        )?;
        let paging = paginate(total, params, viewer_per);

        let sql = format!(
            "SELECT {ACCOUNT_COLS} FROM accounts WHERE 1=1{scope_clause}{filter}{} \
             LIMIT {} OFFSET {}",
            LIST_SPEC.order_clause(params),
            paging.per,
            paging.offset,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(bind_refs(&binds)), account_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            number: paging.page,
            num_pages: paging.num_pages,
            total,
        })
    }
}
