// Schema Inspector: reads the live OLTP catalog into an in-memory model.
// Read-only; a fresh snapshot is taken on every agent run.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use sqlx::{MySqlConnection, Row};
use tracing::{error, warn};

use crate::models::{ColumnInfo, SchemaAnalysis, TableInfo, TableStats, VIEW_PREFIX};

const COLUMNS_QUERY: &str = "\
    SELECT TABLE_NAME, COLUMN_NAME, DATA_TYPE, IS_NULLABLE, COLUMN_KEY, EXTRA \
    FROM INFORMATION_SCHEMA.COLUMNS \
    WHERE TABLE_SCHEMA = DATABASE() \
    ORDER BY TABLE_NAME, ORDINAL_POSITION";

#[derive(sqlx::FromRow)]
struct ColumnRow {
    #[sqlx(rename = "TABLE_NAME")]
    table_name: String,
    #[sqlx(rename = "COLUMN_NAME")]
    column_name: String,
    #[sqlx(rename = "DATA_TYPE")]
    data_type: String,
    #[sqlx(rename = "IS_NULLABLE")]
    is_nullable: String,
    #[sqlx(rename = "COLUMN_KEY")]
    column_key: String,
    #[sqlx(rename = "EXTRA")]
    extra: String,
}

/// Builds a full `SchemaAnalysis` for the active database. Metadata
/// failure produces an error-tagged empty model instead of propagating;
/// a failed row count for one table defaults to zero and does not abort
/// inspection of the remaining tables.
pub async fn inspect(conn: &mut MySqlConnection) -> SchemaAnalysis {
    let rows = match sqlx::query_as::<_, ColumnRow>(COLUMNS_QUERY)
        .fetch_all(&mut *conn)
        .await
    {
        Ok(rows) => rows,
        Err(e) => {
            error!("Schema analysis failed: {e}");
            return SchemaAnalysis::failed(e.to_string());
        }
    };

    let mut schema_info: BTreeMap<String, TableInfo> = BTreeMap::new();
    for row in rows {
        let table = schema_info.entry(row.table_name).or_default();
        if row.column_key == "PRI" {
            table.primary_keys.push(row.column_name.clone());
        }
        table.columns.push(ColumnInfo {
            name: row.column_name,
            data_type: row.data_type,
            nullable: row.is_nullable == "YES",
            key: row.column_key,
            extra: row.extra,
        });
    }

    let mut data_statistics: BTreeMap<String, TableStats> = BTreeMap::new();
    for table_name in schema_info.keys() {
        let row_count = match sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM {table_name}"
        ))
        .fetch_one(&mut *conn)
        .await
        {
            Ok(count) => count,
            Err(e) => {
                warn!("Row count failed for table {table_name}: {e}");
                0
            }
        };
        data_statistics.insert(table_name.clone(), TableStats { row_count });
    }

    let total_tables = schema_info.len();
    let total_columns = schema_info.values().map(|t| t.columns.len()).sum();

    SchemaAnalysis {
        schema_info,
        data_statistics,
        analysis_timestamp: Utc::now(),
        total_tables,
        total_columns,
        error: None,
    }
}

/// Names of already-materialized analytical views (`analytics_*`).
/// A listing failure degrades to an empty set; the run then treats
/// every required metric as missing.
pub async fn existing_analytics_views(conn: &mut MySqlConnection) -> BTreeSet<String> {
    let mut views = BTreeSet::new();
    match sqlx::query("SHOW TABLES").fetch_all(&mut *conn).await {
        Ok(rows) => {
            for row in rows {
                if let Ok(table_name) = row.try_get::<String, _>(0) {
                    if table_name.starts_with(VIEW_PREFIX) {
                        views.insert(table_name);
                    }
                }
            }
        }
        Err(e) => warn!("Could not check existing views: {e}"),
    }
    views
}
