//! Postgres-backed profile directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cloudledger_core::Handle;
use cloudledger_directory::{
    DirectoryError, NewProfile, ProfileChanges, ProfileDirectory, ProfileRecord, ProfileStatus,
};
use sqlx::{FromRow, PgPool};

/// Row type for profile queries.
#[derive(FromRow)]
struct ProfileRow {
    handle: String,
    email: Option<String>,
    company: Option<String>,
    department: Option<String>,
    role: Option<String>,
    status: String,
    verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProfileRow {
    fn try_into_record(self) -> Result<ProfileRecord, DirectoryError> {
        let raw_handle = self.handle.clone();
        let handle = Handle::new(self.handle).map_err(|e| DirectoryError::Corrupt {
            reason: format!("stored handle '{raw_handle}' is invalid: {e}"),
        })?;
        Ok(ProfileRecord::with_all_fields(
            handle,
            self.email,
            self.company,
            self.department,
            self.role,
            ProfileStatus::parse_lossy(&self.status),
            self.verified_at,
            self.created_at,
            self.updated_at,
        ))
    }
}

fn storage_error(err: sqlx::Error) -> DirectoryError {
    DirectoryError::Unavailable {
        reason: err.to_string(),
    }
}

const SELECT_COLUMNS: &str = "handle, email, company, department, role, status, verified_at, created_at, updated_at";

/// Postgres-backed [`ProfileDirectory`] implementation.
pub struct PgProfileDirectory {
    pool: PgPool,
}

impl PgProfileDirectory {
    /// Creates a directory over a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn write_record(&self, record: &ProfileRecord) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE profiles
            SET email = $2, company = $3, department = $4, role = $5,
                status = $6, verified_at = $7, updated_at = $8
            WHERE handle = $1
            "#,
        )
        .bind(record.handle().as_str())
        .bind(record.email())
        .bind(record.company())
        .bind(record.department())
        .bind(record.role())
        .bind(record.status().as_str())
        .bind(record.verified_at())
        .bind(record.updated_at())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl ProfileDirectory for PgProfileDirectory {
    async fn get(&self, handle: &Handle) -> Result<Option<ProfileRecord>, DirectoryError> {
        let row: Option<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM profiles WHERE handle = $1"
        ))
        .bind(handle.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        match row {
            Some(r) => Ok(Some(r.try_into_record()?)),
            None => Ok(None),
        }
    }

    async fn create(&self, new: NewProfile) -> Result<ProfileRecord, DirectoryError> {
        let record = ProfileRecord::pending(new);

        let result = sqlx::query(
            r#"
            INSERT INTO profiles (handle, email, company, department, role, status, verified_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.handle().as_str())
        .bind(record.email())
        .bind(record.company())
        .bind(record.department())
        .bind(record.role())
        .bind(record.status().as_str())
        .bind(record.verified_at())
        .bind(record.created_at())
        .bind(record.updated_at())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(record),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(DirectoryError::AlreadyExists {
                    handle: record.handle().clone(),
                })
            }
            Err(err) => Err(storage_error(err)),
        }
    }

    async fn update(
        &self,
        handle: &Handle,
        changes: ProfileChanges,
    ) -> Result<ProfileRecord, DirectoryError> {
        let mut record = self
            .get(handle)
            .await?
            .ok_or_else(|| DirectoryError::NotFound {
                handle: handle.clone(),
            })?;

        record.apply(&changes);
        self.write_record(&record).await.map_err(storage_error)?;
        Ok(record)
    }

    async fn list_by_role(&self, role: &str) -> Result<Vec<ProfileRecord>, DirectoryError> {
        let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM profiles WHERE LOWER(role) = LOWER($1) ORDER BY handle"
        ))
        .bind(role)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(ProfileRow::try_into_record).collect()
    }

    async fn list_by_company(&self, company: &str) -> Result<Vec<ProfileRecord>, DirectoryError> {
        let rows: Vec<ProfileRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM profiles WHERE company = $1 ORDER BY handle"
        ))
        .bind(company)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.into_iter().map(ProfileRow::try_into_record).collect()
    }

    async fn delete(&self, handle: &Handle) -> Result<(), DirectoryError> {
        sqlx::query("DELETE FROM profiles WHERE handle = $1")
            .bind(handle.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(())
    }
}
