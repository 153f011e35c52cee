//! SQL verification backdoor.
//!
//! A deliberate white-box escape hatch: some product state (pause details,
//! raw scan rows, notification fan-out rows) is not observable through any
//! API surface, so the suites read it straight from the database. Keep this
//! strictly read-only and strictly separate from the black-box actions -
//! nothing in here mutates the product.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::error::Result;

/// Raw scan row from `project_version_scan`.
#[derive(Debug, Clone)]
pub struct ScanRow {
    pub scan_id: i64,
    pub release_id: i64,
    pub status: String,
    /// Entitlement units this scan debited, if the ledger recorded any.
    pub entitlement_units: Option<i32>,
}

/// Pause bookkeeping from `project_scan_pause_detail`.
#[derive(Debug, Clone)]
pub struct PauseDetailRow {
    pub scan_id: i64,
    pub reason: String,
    pub created: Option<DateTime<Utc>>,
}

/// Read-only database oracle.
pub struct SqlOracle {
    pool: PgPool,
}

impl SqlOracle {
    /// Connect with a small pool; the oracle issues occasional point
    /// queries, never bulk work.
    ///
    /// # Errors
    ///
    /// Propagates connection failures.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    /// The scan row for a scan id, if the product has materialized it yet.
    ///
    /// # Errors
    ///
    /// Propagates query failures.
    pub async fn scan_row(&self, scan_id: u64) -> Result<Option<ScanRow>> {
        let row = sqlx::query(
            "SELECT scan_id, release_id, status, entitlement_units \
             FROM project_version_scan WHERE scan_id = $1",
        )
        .bind(scan_id as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(ScanRow {
                scan_id: r.try_get("scan_id")?,
                release_id: r.try_get("release_id")?,
                status: r.try_get("status")?,
                entitlement_units: r.try_get("entitlement_units")?,
            })
        })
        .transpose()
    }

    /// Pause detail rows for a scan, oldest first.
    ///
    /// # Errors
    ///
    /// Propagates query failures.
    pub async fn pause_details(&self, scan_id: u64) -> Result<Vec<PauseDetailRow>> {
        let rows = sqlx::query(
            "SELECT scan_id, reason, created \
             FROM project_scan_pause_detail WHERE scan_id = $1 ORDER BY created",
        )
        .bind(scan_id as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| {
                Ok(PauseDetailRow {
                    scan_id: r.try_get("scan_id")?,
                    reason: r.try_get("reason")?,
                    created: r.try_get("created")?,
                })
            })
            .collect()
    }

    /// How many notification rows exist for a recipient and trigger.
    ///
    /// # Errors
    ///
    /// Propagates query failures.
    pub async fn notification_count(&self, username: &str, trigger: &str) -> Result<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM user_notification \
             WHERE recipient = $1 AND trigger_type = $2",
        )
        .bind(username)
        .bind(trigger)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.try_get("n")?)
    }
}
