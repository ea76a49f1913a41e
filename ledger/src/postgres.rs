//! PostgreSQL-backed offramp store.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{error, info, instrument};
use uuid::Uuid;

use durian_common::{
    BankDetails, BusinessId, DurianError, OfframpRequest, OfframpRequestId, OfframpStatus, Result,
};

use crate::repository::OfframpRepository;

const SELECT_COLUMNS: &str = "id, business_id, amount_usdc, amount_thb, bank_name, \
     bank_account_number, bank_account_name, status, admin_notes, bank_transfer_ref, \
     fulfilled_at, fulfilled_by, created_at, updated_at";

/// Offramp store on a Postgres connection pool.
#[derive(Clone)]
pub struct PgOfframpRepository {
    pool: PgPool,
}

impl PgOfframpRepository {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run pending migrations.
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(db_error)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| DurianError::DatabaseError(format!("migration failed: {e}")))?;

        info!(max_connections, "Connected to offramp database");
        Ok(Self::new(pool))
    }

    /// Underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl OfframpRepository for PgOfframpRepository {
    async fn insert(&self, request: &OfframpRequest) -> Result<()> {
        sqlx::query(
            "INSERT INTO offramp_requests (id, business_id, amount_usdc, amount_thb, bank_name, \
             bank_account_number, bank_account_name, status, admin_notes, bank_transfer_ref, \
             fulfilled_at, fulfilled_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(*request.id.as_uuid())
        .bind(request.business_id.as_str())
        .bind(request.amount_usdc)
        .bind(request.amount_thb)
        .bind(request.bank.bank_name.as_deref())
        .bind(request.bank.bank_account_number.as_deref())
        .bind(request.bank.bank_account_name.as_deref())
        .bind(request.status.as_str())
        .bind(request.admin_notes.as_deref())
        .bind(request.bank_transfer_ref.as_deref())
        .bind(request.fulfilled_at)
        .bind(request.fulfilled_by.as_deref())
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    async fn get(&self, id: OfframpRequestId) -> Result<OfframpRequest> {
        let query = format!("SELECT {SELECT_COLUMNS} FROM offramp_requests WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?
            .ok_or(DurianError::OfframpNotFound(id))?;

        map_row(&row)
    }

    async fn list(&self, status: Option<OfframpStatus>) -> Result<Vec<OfframpRequest>> {
        let rows = match status {
            Some(status) => {
                let query = format!(
                    "SELECT {SELECT_COLUMNS} FROM offramp_requests WHERE status = $1 \
                     ORDER BY created_at DESC, id DESC"
                );
                sqlx::query(&query)
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let query = format!(
                    "SELECT {SELECT_COLUMNS} FROM offramp_requests ORDER BY created_at DESC, id DESC"
                );
                sqlx::query(&query).fetch_all(&self.pool).await
            }
        }
        .map_err(db_error)?;

        rows.iter().map(map_row).collect()
    }

    async fn count(&self, status: OfframpStatus) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM offramp_requests WHERE status = $1")
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(db_error)?;

        Ok(count.max(0) as u64)
    }

    async fn compare_and_swap(
        &self,
        expected: OfframpStatus,
        updated: &OfframpRequest,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE offramp_requests SET status = $3, admin_notes = $4, bank_transfer_ref = $5, \
             amount_thb = $6, fulfilled_at = $7, fulfilled_by = $8, updated_at = $9 \
             WHERE id = $1 AND status = $2",
        )
        .bind(*updated.id.as_uuid())
        .bind(expected.as_str())
        .bind(updated.status.as_str())
        .bind(updated.admin_notes.as_deref())
        .bind(updated.bank_transfer_ref.as_deref())
        .bind(updated.amount_thb)
        .bind(updated.fulfilled_at)
        .bind(updated.fulfilled_by.as_deref())
        .bind(updated.updated_at)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(DurianError::ConcurrentModification(updated.id));
        }
        Ok(())
    }
}

fn db_error(e: sqlx::Error) -> DurianError {
    error!(error = %e, "Offramp database query failed");
    DurianError::DatabaseError(e.to_string())
}

fn map_row(row: &PgRow) -> Result<OfframpRequest> {
    let status: String = row.try_get("status").map_err(db_error)?;
    let id: Uuid = row.try_get("id").map_err(db_error)?;
    let business_id: String = row.try_get("business_id").map_err(db_error)?;

    Ok(OfframpRequest {
        id: OfframpRequestId::from_uuid(id),
        business_id: BusinessId::new(business_id),
        amount_usdc: row.try_get("amount_usdc").map_err(db_error)?,
        amount_thb: row.try_get("amount_thb").map_err(db_error)?,
        bank: BankDetails {
            bank_name: row.try_get("bank_name").map_err(db_error)?,
            bank_account_number: row.try_get("bank_account_number").map_err(db_error)?,
            bank_account_name: row.try_get("bank_account_name").map_err(db_error)?,
        },
        status: status.parse()?,
        admin_notes: row.try_get("admin_notes").map_err(db_error)?,
        bank_transfer_ref: row.try_get("bank_transfer_ref").map_err(db_error)?,
        fulfilled_at: row.try_get("fulfilled_at").map_err(db_error)?,
        fulfilled_by: row.try_get("fulfilled_by").map_err(db_error)?,
        created_at: row.try_get("created_at").map_err(db_error)?,
        updated_at: row.try_get("updated_at").map_err(db_error)?,
    })
}
