// View Synthesizer: turns a metric definition plus a schema snapshot into
// a SQL view body. Pure; never touches the connection. `None` means "no
// matching table family", which callers treat as a skip, not a failure.
//
// Each category tries an ordered list of table-family candidates so a
// schema rename upstream only costs one entry here, not a rewrite.

use tracing::debug;

use crate::agents::catalog::{MetricCategory, MetricDefinition};
use crate::models::SchemaAnalysis;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FinancialSource {
    Transactions,
    LegacyMetrics,
}

const FINANCIAL_SOURCES: &[(&str, FinancialSource)] = &[
    ("financial_transactions_oltp", FinancialSource::Transactions),
    ("financial_metrics", FinancialSource::LegacyMetrics),
];

const PROJECT_TABLES: &[&str] = &["projects_oltp", "projects"];
const CUSTOMER_TABLES: &[&str] = &["customers_oltp", "customer_analytics"];

pub fn synthesize(definition: &MetricDefinition, schema: &SchemaAnalysis) -> Option<String> {
    debug!(
        "Generating SQL for {} ({:?}), {} tables available",
        definition.name, definition.category, schema.total_tables
    );

    match definition.category {
        MetricCategory::FinancialKpi => financial_kpi_sql(definition.name, schema),
        MetricCategory::OperationalMetric => operational_metric_sql(definition.name, schema),
        MetricCategory::CustomerInsight => customer_insight_sql(definition.name, schema),
        MetricCategory::TrendAnalysis => trend_analysis_sql(schema),
        MetricCategory::Generic => generic_sql(schema),
    }
}

fn first_present<'a>(schema: &SchemaAnalysis, candidates: &[&'a str]) -> Option<&'a str> {
    candidates.iter().copied().find(|t| schema.has_table(t))
}

fn financial_kpi_sql(metric_name: &str, schema: &SchemaAnalysis) -> Option<String> {
    let (_, source) = FINANCIAL_SOURCES
        .iter()
        .find(|(table, _)| schema.has_table(table))?;

    match (source, metric_name) {
        (FinancialSource::Transactions, "revenue_trend") => Some(
            "SELECT
                DATE_FORMAT(ft.transaction_date, '%Y-%m') as period,
                SUM(CASE WHEN ft.transaction_type = 'INVOICE' THEN ft.amount ELSE 0 END) as revenue,
                SUM(CASE WHEN ft.transaction_type = 'COST' THEN ft.amount ELSE 0 END) as costs,
                (SUM(CASE WHEN ft.transaction_type = 'INVOICE' THEN ft.amount ELSE 0 END) -
                 SUM(CASE WHEN ft.transaction_type = 'COST' THEN ft.amount ELSE 0 END)) as net_profit,
                COUNT(DISTINCT ft.project_id) as active_projects,
                COUNT(DISTINCT p.customer_id) as active_customers
            FROM financial_transactions_oltp ft
            LEFT JOIN projects_oltp p ON ft.project_id = p.project_id
            WHERE ft.transaction_date >= DATE_SUB(CURDATE(), INTERVAL 24 MONTH)
                AND ft.status = 'COMPLETED'
            GROUP BY DATE_FORMAT(ft.transaction_date, '%Y-%m')
            ORDER BY period DESC"
                .to_string(),
        ),
        (FinancialSource::Transactions, "cash_flow_analysis") => Some(
            "SELECT
                DATE_FORMAT(ft.transaction_date, '%Y-%m') as period,
                SUM(CASE WHEN ft.transaction_type = 'INVOICE' THEN ft.amount ELSE 0 END) as invoiced,
                SUM(CASE WHEN ft.transaction_type = 'PAYMENT' THEN ft.amount ELSE 0 END) as collected,
                (SUM(CASE WHEN ft.transaction_type = 'INVOICE' THEN ft.amount ELSE 0 END) -
                 SUM(CASE WHEN ft.transaction_type = 'PAYMENT' THEN ft.amount ELSE 0 END)) as outstanding_ar,
                CASE WHEN SUM(CASE WHEN ft.transaction_type = 'INVOICE' THEN ft.amount ELSE 0 END) > 0
                     THEN (SUM(CASE WHEN ft.transaction_type = 'PAYMENT' THEN ft.amount ELSE 0 END) /
                           SUM(CASE WHEN ft.transaction_type = 'INVOICE' THEN ft.amount ELSE 0 END) * 100)
                     ELSE 0 END as collection_rate,
                AVG(DATEDIFF(CURDATE(), ft.transaction_date)) as avg_days_outstanding
            FROM financial_transactions_oltp ft
            WHERE ft.transaction_date >= DATE_SUB(CURDATE(), INTERVAL 18 MONTH)
                AND ft.status = 'COMPLETED'
                AND ft.transaction_type IN ('INVOICE', 'PAYMENT')
            GROUP BY DATE_FORMAT(ft.transaction_date, '%Y-%m')
            ORDER BY period DESC"
                .to_string(),
        ),
        // The legacy pre-aggregated table only carries enough detail for
        // the revenue trend; cash flow needs transaction-level rows.
        (FinancialSource::LegacyMetrics, "revenue_trend") => Some(
            "SELECT
                DATE_FORMAT(fm.metric_date, '%Y-%m') as period,
                SUM(CASE WHEN fm.metric_type = 'REVENUE' THEN fm.metric_value ELSE 0 END) as revenue,
                SUM(CASE WHEN fm.metric_type = 'COST' THEN fm.metric_value ELSE 0 END) as costs,
                (SUM(CASE WHEN fm.metric_type = 'REVENUE' THEN fm.metric_value ELSE 0 END) -
                 SUM(CASE WHEN fm.metric_type = 'COST' THEN fm.metric_value ELSE 0 END)) as net_profit,
                COUNT(DISTINCT fm.project_id) as active_projects
            FROM financial_metrics fm
            WHERE fm.metric_date >= DATE_SUB(CURDATE(), INTERVAL 24 MONTH)
            GROUP BY DATE_FORMAT(fm.metric_date, '%Y-%m')
            ORDER BY period DESC"
                .to_string(),
        ),
        _ => None,
    }
}

fn operational_metric_sql(metric_name: &str, schema: &SchemaAnalysis) -> Option<String> {
    let table_name = first_present(schema, PROJECT_TABLES)?;

    match metric_name {
        "project_efficiency" => Some(format!(
            "SELECT
                p.project_type,
                p.status,
                COUNT(*) as project_count,
                AVG(CASE WHEN p.end_date IS NOT NULL
                         THEN DATEDIFF(p.end_date, p.start_date)
                         ELSE DATEDIFF(CURDATE(), p.start_date) END) as avg_duration_days,
                AVG(CASE WHEN p.budget_amount > 0
                         THEN (p.actual_cost / p.budget_amount * 100) END) as avg_budget_utilization_pct,
                SUM(p.budget_amount) as total_planned_value,
                SUM(p.actual_cost) as total_actual_cost,
                CASE WHEN SUM(p.budget_amount) > 0
                     THEN ((SUM(p.budget_amount) - SUM(p.actual_cost)) / SUM(p.budget_amount) * 100)
                     ELSE 0 END as cost_savings_pct
            FROM {table_name} p
            WHERE p.start_date >= DATE_SUB(CURDATE(), INTERVAL 24 MONTH)
            GROUP BY p.project_type, p.status
            ORDER BY project_count DESC"
        )),
        _ => None,
    }
}

fn customer_insight_sql(metric_name: &str, schema: &SchemaAnalysis) -> Option<String> {
    if metric_name != "customer_health_score" {
        return None;
    }

    let customers_table = first_present(schema, CUSTOMER_TABLES)?;
    let projects_table = first_present(schema, PROJECT_TABLES)?;

    Some(format!(
        "SELECT
            c.customer_id,
            c.customer_name,
            c.industry,
            COALESCE(c.annual_revenue, 0) as annual_revenue,
            COALESCE(c.credit_rating, 'UNKNOWN') as credit_rating,
            COUNT(p.project_id) as total_projects,
            COALESCE(SUM(p.budget_amount), 0) as total_project_value,
            AVG(CASE WHEN p.budget_amount > 0
                     THEN (p.actual_cost / p.budget_amount) END) as avg_cost_efficiency,
            MAX(p.start_date) as last_project_date,
            COALESCE(DATEDIFF(CURDATE(), MAX(p.start_date)), 9999) as days_since_last_project,
            CASE
                WHEN COUNT(p.project_id) >= 3 AND DATEDIFF(CURDATE(), MAX(p.start_date)) <= 90 THEN 'EXCELLENT'
                WHEN COUNT(p.project_id) >= 2 AND DATEDIFF(CURDATE(), MAX(p.start_date)) <= 180 THEN 'GOOD'
                WHEN COUNT(p.project_id) >= 1 AND DATEDIFF(CURDATE(), MAX(p.start_date)) <= 365 THEN 'FAIR'
                ELSE 'POOR'
            END as health_category,
            GREATEST(0, LEAST(100,
                100 -
                (GREATEST(0, DATEDIFF(CURDATE(), MAX(p.start_date)) - 90) * 0.1) -
                (CASE WHEN COUNT(p.project_id) = 0 THEN 50 ELSE 0 END)
            )) as health_score_numeric
        FROM {customers_table} c
        LEFT JOIN {projects_table} p ON c.customer_id = p.customer_id
        WHERE c.status = 'ACTIVE' OR c.status IS NULL
        GROUP BY c.customer_id, c.customer_name, c.industry, c.annual_revenue, c.credit_rating
        ORDER BY health_score_numeric DESC"
    ))
}

fn trend_analysis_sql(schema: &SchemaAnalysis) -> Option<String> {
    if !schema.has_table("financial_metrics") {
        return None;
    }

    Some(
        "SELECT
            DATE_FORMAT(fm.metric_date, '%Y-%m') as period,
            COUNT(DISTINCT fm.project_id) as active_projects,
            SUM(fm.metric_value) as total_value,
            AVG(fm.metric_value) as avg_value
        FROM financial_metrics fm
        WHERE fm.metric_date >= DATE_SUB(CURDATE(), INTERVAL 12 MONTH)
        GROUP BY DATE_FORMAT(fm.metric_date, '%Y-%m')
        ORDER BY period DESC"
            .to_string(),
    )
}

/// Last-resort fallback: a daily record count over the first table in the
/// schema. Kept for compatibility with the upstream catalog; a weak
/// default that assumes a `created_at` column and an arbitrary table.
fn generic_sql(schema: &SchemaAnalysis) -> Option<String> {
    let first_table = schema.schema_info.keys().next()?;

    Some(format!(
        "SELECT
            COUNT(*) as total_records,
            DATE(created_at) as date_created
        FROM {first_table}
        WHERE created_at >= DATE_SUB(CURDATE(), INTERVAL 30 DAY)
        GROUP BY DATE(created_at)
        ORDER BY date_created DESC"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::catalog::{MetricCatalog, Priority};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn schema_of(tables: &[&str]) -> SchemaAnalysis {
        let schema_info: BTreeMap<_, _> = tables
            .iter()
            .map(|t| (t.to_string(), Default::default()))
            .collect();
        SchemaAnalysis {
            total_tables: schema_info.len(),
            schema_info,
            data_statistics: BTreeMap::new(),
            analysis_timestamp: Utc::now(),
            total_columns: 0,
            error: None,
        }
    }

    fn generic_metric() -> MetricDefinition {
        MetricDefinition {
            name: "ad_hoc",
            category: MetricCategory::Generic,
            tables: &[],
            priority: Priority::Low,
            description: "",
        }
    }

    #[test]
    fn empty_schema_synthesizes_nothing_for_any_category() {
        let schema = schema_of(&[]);
        let catalog = MetricCatalog::builtin();
        for name in [
            "revenue_trend",
            "cash_flow_analysis",
            "project_efficiency",
            "customer_health_score",
            "business_trends",
        ] {
            let definition = catalog.get(name).unwrap();
            assert!(synthesize(definition, &schema).is_none(), "{name}");
        }
        assert!(synthesize(&generic_metric(), &schema).is_none());
    }

    #[test]
    fn revenue_trend_prefers_transactional_tables() {
        let catalog = MetricCatalog::builtin();
        let definition = catalog.get("revenue_trend").unwrap();
        let schema = schema_of(&["financial_metrics", "financial_transactions_oltp"]);
        let sql = synthesize(definition, &schema).unwrap();
        assert!(sql.contains("FROM financial_transactions_oltp"));
    }

    #[test]
    fn revenue_trend_falls_back_to_legacy_metrics_table() {
        let catalog = MetricCatalog::builtin();
        let definition = catalog.get("revenue_trend").unwrap();
        let schema = schema_of(&["financial_metrics"]);
        let sql = synthesize(definition, &schema).unwrap();
        assert!(sql.contains("FROM financial_metrics"));
        assert!(!sql.contains("financial_transactions_oltp"));
    }

    #[test]
    fn cash_flow_needs_transaction_level_rows() {
        let catalog = MetricCatalog::builtin();
        let definition = catalog.get("cash_flow_analysis").unwrap();
        assert!(synthesize(definition, &schema_of(&["financial_metrics"])).is_none());
        let sql = synthesize(definition, &schema_of(&["financial_transactions_oltp"])).unwrap();
        assert!(sql.contains("collection_rate"));
    }

    #[test]
    fn project_efficiency_tolerates_table_rename() {
        let catalog = MetricCatalog::builtin();
        let definition = catalog.get("project_efficiency").unwrap();

        let sql = synthesize(definition, &schema_of(&["projects_oltp"])).unwrap();
        assert!(sql.contains("FROM projects_oltp p"));

        let sql = synthesize(definition, &schema_of(&["projects"])).unwrap();
        assert!(sql.contains("FROM projects p"));

        let sql = synthesize(definition, &schema_of(&["projects", "projects_oltp"])).unwrap();
        assert!(sql.contains("FROM projects_oltp p"));
    }

    #[test]
    fn projects_only_schema_skips_financial_metric_but_builds_efficiency() {
        let catalog = MetricCatalog::builtin();
        let schema = schema_of(&["projects_oltp"]);

        let revenue = catalog.get("revenue_trend").unwrap();
        assert!(synthesize(revenue, &schema).is_none());

        let efficiency = catalog.get("project_efficiency").unwrap();
        let sql = synthesize(efficiency, &schema).unwrap();
        assert!(sql.contains("FROM projects_oltp p"));
    }

    #[test]
    fn customer_health_needs_both_table_families() {
        let catalog = MetricCatalog::builtin();
        let definition = catalog.get("customer_health_score").unwrap();

        assert!(synthesize(definition, &schema_of(&["customers_oltp"])).is_none());
        assert!(synthesize(definition, &schema_of(&["projects_oltp"])).is_none());

        let sql =
            synthesize(definition, &schema_of(&["customer_analytics", "projects"])).unwrap();
        assert!(sql.contains("FROM customer_analytics c"));
        assert!(sql.contains("JOIN projects p"));
        assert!(sql.contains("health_score_numeric"));
    }

    #[test]
    fn generic_fallback_picks_first_table() {
        let sql = synthesize(&generic_metric(), &schema_of(&["zeta_events", "alpha_log"])).unwrap();
        assert!(sql.contains("FROM alpha_log"));
    }
}
