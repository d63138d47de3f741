// Materialization and adaptive optimization: persists synthesized SQL as
// views, attempts HeatWave (RAPID secondary engine) placement, benchmarks,
// and re-toggles engine placement for views that benchmark poorly. Each
// step past view creation degrades gracefully instead of failing the run.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::Utc;
use sqlx::MySqlConnection;
use tracing::{error, warn};

use crate::models::{
    derive_view_name, BenchmarkResult, OptimizationOutcome, PerformanceRating, ViewCreation,
    ViewRegistry, ViewStatus,
};

/// A benchmark under half a second is taken as evidence the secondary
/// engine is serving the view.
const ACCELERATED_THRESHOLD_SECONDS: f64 = 0.5;

/// Drops and recreates the derived view for `metric_name`, then tries to
/// load it into HeatWave and benchmarks it. Only a failed CREATE VIEW is
/// fatal for the metric; acceleration and benchmark failures are recorded
/// and the view stays valid.
pub async fn materialize(
    conn: &mut MySqlConnection,
    metric_name: &str,
    view_sql: &str,
) -> ViewCreation {
    let view_name = derive_view_name(metric_name);

    if let Err(e) = sqlx::query(&format!("DROP VIEW IF EXISTS {view_name}"))
        .execute(&mut *conn)
        .await
    {
        warn!("Could not drop stale view {view_name}: {e}");
    }

    if let Err(e) = sqlx::query(&format!("CREATE VIEW {view_name} AS {view_sql}"))
        .execute(&mut *conn)
        .await
    {
        error!("Failed to create view for metric {metric_name}: {e}");
        return ViewCreation::failed(metric_name, e.to_string());
    }

    let heatwave_enabled = enable_acceleration(conn, &view_name).await;
    let performance = benchmark_view(conn, &view_name).await;

    ViewCreation {
        success: true,
        metric_name: metric_name.to_string(),
        view_name: Some(view_name),
        view_sql: Some(view_sql.to_string()),
        heatwave_enabled,
        performance: Some(performance),
        error: None,
        created_at: Utc::now(),
    }
}

async fn enable_acceleration(conn: &mut MySqlConnection, view_name: &str) -> bool {
    for statement in [
        format!("ALTER VIEW {view_name} SECONDARY_ENGINE=RAPID"),
        format!("ALTER VIEW {view_name} SECONDARY_LOAD"),
    ] {
        if let Err(e) = sqlx::query(&statement).execute(&mut *conn).await {
            warn!("Could not load view {view_name} into HeatWave: {e}");
            return false;
        }
    }
    true
}

/// Times a trivial count over the view and rates the latency.
pub async fn benchmark_view(conn: &mut MySqlConnection, view_name: &str) -> BenchmarkResult {
    let started = Instant::now();
    match sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {view_name}"))
        .fetch_one(&mut *conn)
        .await
    {
        Ok(row_count) => {
            let elapsed = started.elapsed().as_secs_f64();
            BenchmarkResult {
                execution_time_seconds: Some(elapsed),
                row_count,
                performance_rating: PerformanceRating::from_elapsed(elapsed),
                heatwave_accelerated: elapsed < ACCELERATED_THRESHOLD_SECONDS,
                error: None,
            }
        }
        Err(e) => BenchmarkResult::failed(e.to_string()),
    }
}

/// One-shot corrective pass over views that pre-existed this run: views
/// rating `NEEDS_OPTIMIZATION` get a single HeatWave unload/reload cycle
/// and a re-benchmark; a still-poor result is accepted as final.
pub async fn optimize_existing(
    conn: &mut MySqlConnection,
    registry: &ViewRegistry,
) -> BTreeMap<String, OptimizationOutcome> {
    let mut results = BTreeMap::new();

    for entry in registry.values() {
        if entry.status != ViewStatus::Existing {
            continue;
        }
        let view_name = entry.view_name.clone();
        let current = benchmark_view(conn, &view_name).await;

        let outcome = match current.performance_rating {
            PerformanceRating::NeedsOptimization => {
                match reload_secondary(conn, &view_name).await {
                    Ok(()) => {
                        let after = benchmark_view(conn, &view_name).await;
                        OptimizationOutcome::reloaded(current, after)
                    }
                    Err(e) => {
                        OptimizationOutcome::failed(format!("HeatWave optimization failed: {e}"))
                    }
                }
            }
            PerformanceRating::Error => {
                OptimizationOutcome::skipped("Benchmark failed, optimization skipped", current)
            }
            _ => OptimizationOutcome::skipped("Performance already optimal", current),
        };
        results.insert(view_name, outcome);
    }

    results
}

async fn reload_secondary(conn: &mut MySqlConnection, view_name: &str) -> Result<(), sqlx::Error> {
    sqlx::query(&format!("ALTER VIEW {view_name} SECONDARY_UNLOAD"))
        .execute(&mut *conn)
        .await?;
    sqlx::query(&format!("ALTER VIEW {view_name} SECONDARY_LOAD"))
        .execute(&mut *conn)
        .await?;
    Ok(())
}
