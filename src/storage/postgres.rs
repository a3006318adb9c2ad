//! # PostgreSQL Storage
//!
//! Each task hub maps to two tables in the connection's current schema:
//!
//! - `"<hub>instances"` - one row per instance (`instance_id`, `name`,
//!   `created_time`, `last_updated_time`, `runtime_status`, `input`,
//!   `output`, `custom_status`)
//! - `"<hub>history"` - the append-only history rows, columns as in
//!   [`RawHistoryEntity`]
//!
//! Tab template file names live in `dfm_tab_templates(name)`.
//!
//! Table names are dynamic, so queries are built at runtime with
//! [`sqlx::QueryBuilder`] and every value is bound.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, Postgres};
use sqlx::{FromRow, PgPool, QueryBuilder};
use std::time::Duration;
use tracing::{debug, info};

use super::{DurableStorage, HistoryQuery, InstancePage, InstanceQuery};
use crate::constants::{RuntimeStatus, HISTORY_TABLE_SUFFIX, INSTANCES_TABLE_SUFFIX};
use crate::error::{MonitorError, Result};
use crate::models::{OrchestrationStatus, RawHistoryEntity};
use crate::query_builder::Pagination;

const INSTANCE_COLUMNS: &str =
    "instance_id, name, created_time, last_updated_time, runtime_status, input, output, custom_status";

const HISTORY_COLUMNS: &str = "partition_key, event_type, name, timestamp, result, details, \
     event_id, task_scheduled_id, instance_id, parent_instance_id";

#[derive(Debug, FromRow)]
struct InstanceRow {
    instance_id: String,
    name: String,
    created_time: DateTime<Utc>,
    last_updated_time: DateTime<Utc>,
    runtime_status: String,
    input: Option<Value>,
    output: Option<Value>,
    custom_status: Option<Value>,
}

impl From<InstanceRow> for OrchestrationStatus {
    fn from(row: InstanceRow) -> Self {
        let runtime_status = row
            .runtime_status
            .parse()
            .unwrap_or(RuntimeStatus::Unknown);
        OrchestrationStatus {
            name: row.name,
            instance_id: row.instance_id,
            created_time: row.created_time,
            last_updated_time: row.last_updated_time,
            runtime_status,
            input: row.input,
            output: row.output,
            custom_status: row.custom_status,
            history: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(database_url)
            .await?;

        info!(max_connections, "Connected storage pool");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<bool> {
        let health: i32 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(health == 1)
    }
}

/// Quoted identifier for a hub table; Postgres folds unquoted names to
/// lowercase so hub tables are stored lowercase
fn table_ident(hub_name: &str, suffix: &str) -> String {
    format!(
        "\"{}{}\"",
        hub_name.to_ascii_lowercase().replace('"', "\"\""),
        suffix.to_ascii_lowercase()
    )
}

fn parse_offset(continuation_token: Option<String>) -> Result<u32> {
    match continuation_token {
        Some(token) => token
            .parse()
            .map_err(|_| MonitorError::BadRequest(format!("Invalid continuation token: {token}"))),
        None => Ok(0),
    }
}

#[async_trait]
impl DurableStorage for PostgresStorage {
    async fn list_instances_page(
        &self,
        hub_name: &str,
        query: &InstanceQuery,
        continuation_token: Option<String>,
    ) -> Result<InstancePage> {
        let offset = parse_offset(continuation_token)?;
        let page_size = u32::try_from(query.page_size.max(1)).unwrap_or(u32::MAX);

        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {INSTANCE_COLUMNS} FROM {} WHERE TRUE",
            table_ident(hub_name, INSTANCES_TABLE_SUFFIX)
        ));
        if let Some(from) = query.created_time_from {
            builder.push(" AND created_time >= ").push_bind(from);
        }
        if let Some(till) = query.created_time_till {
            builder.push(" AND created_time <= ").push_bind(till);
        }
        if let Some(statuses) = &query.runtime_statuses {
            let names: Vec<String> = statuses.iter().map(|s| s.as_str().to_string()).collect();
            builder.push(" AND runtime_status = ANY(").push_bind(names).push(")");
        }
        builder.push(" ORDER BY created_time, instance_id");
        // One extra row tells us whether another page exists
        builder.push(Pagination::limit_offset(page_size.saturating_add(1), offset).to_sql());

        let mut rows: Vec<InstanceRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        let has_more = rows.len() > page_size as usize;
        rows.truncate(page_size as usize);

        debug!(hub = %hub_name, offset, returned = rows.len(), has_more, "Fetched instance page");

        Ok(InstancePage {
            items: rows.into_iter().map(OrchestrationStatus::from).collect(),
            continuation_token: has_more.then(|| (offset + page_size).to_string()),
        })
    }

    async fn get_status(
        &self,
        hub_name: &str,
        instance_id: &str,
        show_history: bool,
    ) -> Result<Option<OrchestrationStatus>> {
        let sql = format!(
            "SELECT {INSTANCE_COLUMNS} FROM {} WHERE instance_id = $1",
            table_ident(hub_name, INSTANCES_TABLE_SUFFIX)
        );
        let row: Option<InstanceRow> = sqlx::query_as(&sql)
            .bind(instance_id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut status = OrchestrationStatus::from(row);

        if show_history {
            let rows = self
                .query_history(hub_name, &HistoryQuery::for_instance(instance_id))
                .await?;
            status.history = Some(rows.iter().map(RawHistoryEntity::to_runtime_json).collect());
        }

        Ok(Some(status))
    }

    async fn query_history(
        &self,
        hub_name: &str,
        query: &HistoryQuery,
    ) -> Result<Vec<RawHistoryEntity>> {
        let mut builder: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!(
            "SELECT {HISTORY_COLUMNS} FROM {} WHERE TRUE",
            table_ident(hub_name, HISTORY_TABLE_SUFFIX)
        ));
        if let Some(partition_key) = &query.partition_key {
            builder.push(" AND partition_key = ").push_bind(partition_key.clone());
        }
        if let Some(event_type) = &query.event_type {
            builder.push(" AND event_type = ").push_bind(event_type.clone());
        }
        if let Some(child) = &query.child_instance_id {
            builder.push(" AND instance_id = ").push_bind(child.clone());
        }
        if let Some(from) = query.timestamp_from {
            builder.push(" AND timestamp >= ").push_bind(from);
        }
        if let Some(till) = query.timestamp_till {
            builder.push(" AND timestamp <= ").push_bind(till);
        }
        if query.with_task_scheduled_id {
            builder.push(" AND task_scheduled_id IS NOT NULL");
        }
        builder.push(" ORDER BY timestamp, event_id NULLS FIRST");

        let rows = builder.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn list_table_names(&self) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT table_name::text FROM information_schema.tables WHERE table_schema = current_schema()",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    async fn list_template_blobs(&self) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM dfm_tab_templates ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }
}
