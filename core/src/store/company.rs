//! Company database queries.

use super::{bind_refs, constraint_as_conflict, decimal_col, BindValues, Store};
use crate::company::Company;
use crate::error::{AppError, AppResult};
use crate::query::{paginate, ListParams, Page, QuerySpec};
use crate::types::CompanyId;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

const LIST_SPEC: QuerySpec = QuerySpec {
    search_columns: &["name"],
    sort_keys: &[("name", "name"), ("created_at", "created_at")],
    default_sort: "-created_at",
};

fn company_from_row(row: &Row<'_>) -> rusqlite::Result<Company> {
    Ok(Company {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        street: row.get(3)?,
        city: row.get(4)?,
        state: row.get(5)?,
        zip_code: row.get(6)?,
        wait_period_days: row.get(7)?,
        late_fee: decimal_col(row, 8)?,
        created_at: row.get(9)?,
    })
}

const COMPANY_COLS: &str =
    "id, name, description, street, city, state, zip_code, wait_period_days, late_fee, created_at";

impl Store {
    pub fn insert_company(&self, company: &Company) -> AppResult<CompanyId> {
        company.validate()?;
        self.conn.execute(
            "INSERT INTO companies
                (name, description, street, city, state, zip_code,
                 wait_period_days, late_fee, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                company.name,
                company.description,
                company.street,
                company.city,
                company.state,
                company.zip_code,
                company.wait_period_days,
                company.late_fee.to_string(),
                company.created_at,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.audit("company", id, "created", company)?;
        log::info!("company '{}' created (id {id})", company.name);
        Ok(id)
    }

    pub fn get_company(&self, id: CompanyId) -> AppResult<Company> {
        self.conn
            .query_row(
                &format!("SELECT {COMPANY_COLS} FROM companies WHERE id = ?1"),
                params![id],
                company_from_row,
            )
            .optional()?
            .ok_or(AppError::not_found("company", id))
    }

    pub fn update_company(&self, company: &Company) -> AppResult<()> {
        company.validate()?;
        let changed = self.conn.execute(
            "UPDATE companies
             SET name = ?1, description = ?2, street = ?3, city = ?4,
                 state = ?5, zip_code = ?6, wait_period_days = ?7, late_fee = ?8
             WHERE id = ?9",
            params![
                company.name,
                company.description,
                company.street,
                company.city,
                company.state,
                company.zip_code,
                company.wait_period_days,
                company.late_fee.to_string(),
                company.id,
            ],
        )?;
        if changed == 0 {
            return Err(AppError::not_found("company", company.id));
        }
        self.audit("company", company.id, "updated", company)?;
        log::info!("company '{}' updated", company.name);
        Ok(())
    }

    /// Deletes the company and, via the schema cascade, its accounts and
    /// their checks. Fails with a conflict while profiles still reference
    /// the company.
    pub fn delete_company(&self, id: CompanyId) -> AppResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM companies WHERE id = ?1", params![id])
            .map_err(|e| constraint_as_conflict(e, "company still has profiles attached"))?;
        if changed == 0 {
            return Err(AppError::not_found("company", id));
        }
        self.audit("company", id, "deleted", &serde_json::json!({ "id": id }))?;
        log::info!("company {id} deleted");
        Ok(())
    }

    pub fn list_companies(&self, params: &ListParams, viewer_per: i64) -> AppResult<Page<Company>> {
        let (filter, search_binds) = LIST_SPEC.filter_clause(params);
        let binds: BindValues = search_binds
            .into_iter()
            .map(|b| Box::new(b) as Box<dyn rusqlite::types::ToSql>)
            .collect();

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM companies WHERE 1=1{filter}"),
            params_from_iter(bind_refs(&binds)),
            |row| row.get(0),
        )?;
        let paging = paginate(total, params, viewer_per);

        let sql = format!(
            "SELECT {COMPANY_COLS} FROM companies WHERE 1=1{filter}{} LIMIT {} OFFSET {}",
            LIST_SPEC.order_clause(params),
            paging.per,
            paging.offset,
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let items = stmt
            .query_map(params_from_iter(bind_refs(&binds)), company_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            items,
            number: paging.page,
            num_pages: paging.num_pages,
            total,
        })
    }
}
