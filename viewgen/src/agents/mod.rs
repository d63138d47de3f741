pub mod catalog;
pub mod materializer;
pub mod schema_inspector;
pub mod synthesizer;
pub mod view_generator;

/// Metrics requested when the caller does not supply a list.
pub const DEFAULT_REQUIRED_METRICS: &[&str] = &[
    "revenue_trend",
    "cash_flow_analysis",
    "project_efficiency",
    "customer_health_score",
];
