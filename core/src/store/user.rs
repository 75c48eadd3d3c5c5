//! User and profile database queries.
//!
//! Every user row gets its profile row in the same transaction — the rest
//! of the crate may assume the 1:1 attachment always exists.

use super::{bind_refs, BindValues, Store};
use crate::error::{AppError, AppResult};
use crate::query::{paginate, ListParams, Page, QuerySpec};
use crate::roles::UserScope;
use crate::types::{CompanyId, ProfileId, UserId};
use crate::user::{Profile, User};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const LIST_SPEC: QuerySpec = QuerySpec {
    search_columns: &["u.first_name", "u.last_name", "u.email", "u.username"],
    sort_keys: &[
        ("username", "u.username"),
        ("date_joined", "u.date_joined"),
    ],
    default_sort: "-date_joined",
};

const USER_COLS: &str =
    "u.id, u.username, u.first_name, u.last_name, u.email, u.is_superuser, u.date_joined";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        email: row.get(4)?,
        is_superuser: row.get(5)?,
        date_joined: row.get(6)?,
    })
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        company_id: row.get(2)?,
        is_supervisor: row.get(3)?,
        records_per_page: row.get(4)?,
    })
}

impl Store {
    /// Insert a user and auto-provision its profile, optionally already
    /// attached to a company (the registration flow).
    pub fn insert_user(&self, user: &User, company_id: Option<CompanyId>) -> AppResult<UserId> {
        user.validate()?;
        if let Some(id) = company_id {
            self.get_company(id)?;
        }
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "INSERT INTO users
                (username, first_name, last_name, email, is_superuser, date_joined)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                user.username,
                user.first_name,
                user.last_name,
                user.email,
                user.is_superuser,
                user.date_joined,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO profiles (user_id, company_id) VALUES (?1, ?2)",
            params![id, company_id],
        )?;
        tx.commit()?;
        self.audit("user", id, "created", user)?;
        log::info!("user '{}' created (id {id})", user.username);
        Ok(id)
    }

    pub fn get_user(&self, id: UserId) -> AppResult<User> {
        self.conn
            .query_row(
                &format!("SELECT {USER_COLS} FROM users u WHERE u.id = ?1"),
                params![id],
                user_from_row,
            )
            .optional()?
            .ok_or(AppError::not_found("user", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {USER_COLS} FROM users u WHERE u.username = ?1"),
                params![username],
                user_from_row,
            )
            .optional()?)
    }

    pub fn update_user(&self, user: &User) -> AppResult<()> {
        user.validate()?;
        let changed = self.conn.execute(
            "UPDATE users
             SET username = ?1, first_name = ?2, last_name = ?3,
                 email = ?4, is_superuser = ?5
             WHERE id = ?6",
            params![
                user.username,
                user.first_name,
                user.last_name,
                user.email,
                user.is_superuser,
                user.id,
            ],
        )?;
        if changed == 0 {
            return Err(AppError::not_found("user", user.id));
        }
        self.audit("user", user.id, "updated", user)?;
        log::info!("user '{}' updated", user.username);
        Ok(())
    }

    /// Deletes the user; the profile and the user's checks cascade away.
    pub fn delete_user(&self, id: UserId) -> AppResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(AppError::not_found("user", id));
        }
        self.audit("user", id, "deleted", &serde_json::json!({ "id": id }))?;
        log::info!("user {id} deleted");
        Ok(())
    }

    pub fn profile_for_user(&self, user_id: UserId) -> AppResult<Profile> {
        self.conn
            .query_row(
                "SELECT id, user_id, company_id, is_supervisor, records_per_page
                 FROM profiles WHERE user_id = ?1",
                params![user_id],
                profile_from_row,
            )
            .optional()?
            .ok_or(AppError::not_found("profile", user_id))
    }

    pub fn update_profile(&self, profile: &Profile) -> AppResult<()> {
        profile.validate()?;
        let changed = self.conn.execute(
            "UPDATE profiles
             SET is_supervisor = ?1, records_per_page = ?2
             WHERE id = ?3",
            params![profile.is_supervisor, profile.records_per_page, profile.id],
        )?;
        if changed == 0 {
            return Err(AppError::not_found("profile", profile.id));
        }
        self.audit("profile", profile.id, "updated", profile)?;
        Ok(())
    }

    /// Attach the profile to a company — an admin starting a simulation.
    pub fn simulate(&self, profile_id: ProfileId, company_id: CompanyId) -> AppResult<()> {
        self.get_company(company_id)?;
        let changed = self.conn.execute(
            "UPDATE profiles SET company_id = ?1 WHERE id = ?2",
            params![company_id, profile_id],
        )?;
        if changed == 0 {
            return Err(AppError::not_found("profile", profile_id));
        }
        self.audit(
            "profile",
            profile_id,
            "simulate",
            &serde_json::json!({ "company_id": company_id }),
        )?;
        log::info!("profile {profile_id} now simulating company {company_id}");
        Ok(())
    }

    pub fn stop_simulate(&self, profile_id: ProfileId) -> AppResult<()> {
        let changed = self.conn.execute(
            "UPDATE profiles SET company_id = NULL WHERE id = ?1",
            params![profile_id],
        )?;
        if changed == 0 {
            return Err(AppError::not_found("profile", profile_id));
        }
        self.audit(
            "profile",
            profile_id,
            "stop_simulate",
            &serde_json::json!({}),
        )?;
        log::info!("profile {profile_id} stopped simulating");
        Ok(())
    }

    pub fn list_users(
        &self,
        scope: UserScope,
        params: &ListParams,
        viewer_per: i64,
    ) -> AppResult<Page<User>> {
        let mut binds: BindValues = Vec::new();
        let scope_clause = match scope {
            UserScope::All => "",
            UserScope::Company(company_id) => {
                binds.push(Box::new(company_id));
                " AND p.company_id IS ?"
            }
        };

        let (filter, search_binds) = LIST_SPEC.filter_clause(params);
        binds.extend(
            search_binds
                .into_iter()
                .map(|b| Box::new(b) as Box<dyn rusqlite::types::ToSql>),
        );

        let base = "FROM users u JOIN profiles p ON p.user_id = u.id WHERE 1=1";
        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) {base}{scope_clause}{filter}"),
            params_from_iter(bind_refs(&binds)),
            |row| row.get(0),
        )?;
        let paging = paginate(total, params, viewer_per);

        let sql = format!(
            "SELECT {USER_COLS} {base}{scope_clause}{filter}{} LIMIT {} OFFSET {}",
            LIST_SPEC.order_clause(params),
            paging.per,
            paging.offset,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(bind_refs(&binds)), user_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            number: paging.page,
            num_pages: paging.num_pages,
            total,
        })
    }
}
