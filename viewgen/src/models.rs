use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Every generated view is named after its metric with this prefix.
pub const VIEW_PREFIX: &str = "analytics_";

pub fn derive_view_name(metric_name: &str) -> String {
    format!("{VIEW_PREFIX}{metric_name}")
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub nullable: bool,
    pub key: String,
    pub extra: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TableInfo {
    pub columns: Vec<ColumnInfo>,
    pub primary_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableStats {
    pub row_count: i64,
}

/// Snapshot of the OLTP schema taken at the start of one agent run.
/// Never partially populated: on introspection failure the maps are
/// empty and `error` is set, so downstream stages degrade to no-ops.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaAnalysis {
    pub schema_info: BTreeMap<String, TableInfo>,
    pub data_statistics: BTreeMap<String, TableStats>,
    pub analysis_timestamp: DateTime<Utc>,
    pub total_tables: usize,
    pub total_columns: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SchemaAnalysis {
    pub fn failed(error: String) -> Self {
        Self {
            schema_info: BTreeMap::new(),
            data_statistics: BTreeMap::new(),
            analysis_timestamp: Utc::now(),
            total_tables: 0,
            total_columns: 0,
            error: Some(error),
        }
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.schema_info.contains_key(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PerformanceRating {
    Excellent,
    Good,
    NeedsOptimization,
    Error,
}

impl PerformanceRating {
    pub fn from_elapsed(seconds: f64) -> Self {
        if seconds < 0.1 {
            PerformanceRating::Excellent
        } else if seconds < 1.0 {
            PerformanceRating::Good
        } else {
            PerformanceRating::NeedsOptimization
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkResult {
    pub execution_time_seconds: Option<f64>,
    pub row_count: i64,
    pub performance_rating: PerformanceRating,
    pub heatwave_accelerated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BenchmarkResult {
    pub fn failed(error: String) -> Self {
        Self {
            execution_time_seconds: None,
            row_count: 0,
            performance_rating: PerformanceRating::Error,
            heatwave_accelerated: false,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewStatus {
    Existing,
    Created,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewRegistryEntry {
    pub view_name: String,
    pub status: ViewStatus,
    pub heatwave_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<BenchmarkResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ViewRegistryEntry {
    pub fn existing(view_name: String) -> Self {
        Self {
            view_name,
            status: ViewStatus::Existing,
            heatwave_enabled: false,
            performance: None,
            created_at: None,
        }
    }

    pub fn from_creation(creation: &ViewCreation) -> Self {
        Self {
            view_name: creation
                .view_name
                .clone()
                .unwrap_or_else(|| derive_view_name(&creation.metric_name)),
            status: if creation.success {
                ViewStatus::Created
            } else {
                ViewStatus::Failed
            },
            heatwave_enabled: creation.heatwave_enabled,
            performance: creation.performance.clone(),
            created_at: Some(creation.created_at),
        }
    }
}

/// Rebuilt from the live database on every invocation; never cached
/// across runs.
pub type ViewRegistry = BTreeMap<String, ViewRegistryEntry>;

#[derive(Debug, Clone, Serialize)]
pub struct ViewCreation {
    pub success: bool,
    pub metric_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_sql: Option<String>,
    pub heatwave_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<BenchmarkResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ViewCreation {
    pub fn failed(metric_name: &str, error: String) -> Self {
        Self {
            success: false,
            metric_name: metric_name.to_string(),
            view_name: None,
            view_sql: None,
            heatwave_enabled: false,
            performance: None,
            error: Some(error),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OptimizationOutcome {
    pub optimized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before_performance: Option<BenchmarkResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after_performance: Option<BenchmarkResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_performance: Option<BenchmarkResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OptimizationOutcome {
    pub fn reloaded(before: BenchmarkResult, after: BenchmarkResult) -> Self {
        Self {
            optimized: true,
            reason: None,
            before_performance: Some(before),
            after_performance: Some(after),
            current_performance: None,
            error: None,
        }
    }

    pub fn skipped(reason: &str, current: BenchmarkResult) -> Self {
        Self {
            optimized: false,
            reason: Some(reason.to_string()),
            before_performance: None,
            after_performance: None,
            current_performance: Some(current),
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            optimized: false,
            reason: None,
            before_performance: None,
            after_performance: None,
            current_performance: None,
            error: Some(error),
        }
    }
}

// API request/response models
#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub required_metrics: Option<Vec<String>>,
}

/// Aggregate payload of one agent run, serialized into `AgentResult.data`.
#[derive(Debug, Serialize)]
pub struct GenerationData {
    pub created_views: Vec<ViewCreation>,
    pub optimization_results: BTreeMap<String, OptimizationOutcome>,
    pub data_analysis: SchemaAnalysis,
    pub view_registry: ViewRegistry,
    pub required_metrics: Vec<String>,
    pub missing_metrics: Vec<String>,
}

/// Standard result envelope shared by all decisioning agents.
#[derive(Debug, Serialize)]
pub struct AgentResult {
    pub agent_name: String,
    pub task_id: String,
    pub status: String,
    pub data: serde_json::Value,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub execution_time: f64,
    pub confidence_score: f64,
}

impl AgentResult {
    pub fn success(
        agent_name: &str,
        data: serde_json::Value,
        insights: Vec<String>,
        recommendations: Vec<String>,
        execution_time: f64,
    ) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            task_id: format!("{agent_name}_{}", Utc::now().timestamp()),
            status: "success".to_string(),
            data,
            insights,
            recommendations,
            timestamp: Utc::now(),
            execution_time,
            confidence_score: 0.95,
        }
    }

    pub fn error(agent_name: &str, error: String, execution_time: f64) -> Self {
        Self {
            agent_name: agent_name.to_string(),
            task_id: format!("{agent_name}_{}", Utc::now().timestamp()),
            status: "error".to_string(),
            data: serde_json::json!({ "error": error }),
            insights: vec![],
            recommendations: vec![],
            timestamp: Utc::now(),
            execution_time,
            confidence_score: 0.0,
        }
    }
}
