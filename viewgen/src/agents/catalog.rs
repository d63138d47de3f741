// Metric catalog: the closed set of analytical requirements this agent
// knows how to materialize, plus gap resolution against existing views.

use serde::Serialize;
use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::models::{ViewRegistry, ViewRegistryEntry, ViewStatus, VIEW_PREFIX};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricCategory {
    FinancialKpi,
    OperationalMetric,
    CustomerInsight,
    TrendAnalysis,
    Generic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricDefinition {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub category: MetricCategory,
    pub tables: &'static [&'static str],
    pub priority: Priority,
    pub description: &'static str,
}

pub struct MetricCatalog {
    metrics: Vec<MetricDefinition>,
}

impl MetricCatalog {
    pub fn new(metrics: Vec<MetricDefinition>) -> Self {
        Self { metrics }
    }

    /// Predefined metric definitions. Loaded once at agent construction,
    /// never mutated.
    pub fn builtin() -> Self {
        Self::new(vec![
            MetricDefinition {
                name: "revenue_trend",
                category: MetricCategory::FinancialKpi,
                tables: &["financial_transactions_oltp", "projects_oltp"],
                priority: Priority::High,
                description: "Monthly revenue trends with profit margins and project activity",
            },
            MetricDefinition {
                name: "cash_flow_analysis",
                category: MetricCategory::FinancialKpi,
                tables: &["financial_transactions_oltp"],
                priority: Priority::High,
                description: "Cash flow analysis with AR and collection efficiency metrics",
            },
            MetricDefinition {
                name: "project_efficiency",
                category: MetricCategory::OperationalMetric,
                tables: &["projects_oltp"],
                priority: Priority::Medium,
                description: "Project efficiency and resource utilization metrics",
            },
            MetricDefinition {
                name: "customer_health_score",
                category: MetricCategory::CustomerInsight,
                tables: &["customers_oltp", "projects_oltp"],
                priority: Priority::High,
                description: "Customer health scores with risk assessment and engagement metrics",
            },
            MetricDefinition {
                name: "business_trends",
                category: MetricCategory::TrendAnalysis,
                tables: &["financial_metrics", "projects"],
                priority: Priority::Medium,
                description: "Business trend analysis with growth rates and seasonality patterns",
            },
        ])
    }

    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Determines which required metrics still need a view. Every
    /// already-materialized `analytics_*` view is recorded in the registry
    /// as `existing` first, requested or not, so the optimization pass
    /// later covers all of them. Required metrics with an existing view
    /// are skipped; names absent from the catalog are dropped (synthesis
    /// capability is bounded by the catalog). The remainder is ordered by
    /// priority, ties broken by catalog order.
    pub fn resolve_gaps(
        &self,
        required_metrics: &[String],
        existing_views: &BTreeSet<String>,
        registry: &mut ViewRegistry,
    ) -> Vec<&MetricDefinition> {
        for view_name in existing_views {
            if let Some(metric_name) = view_name.strip_prefix(VIEW_PREFIX) {
                registry.insert(
                    metric_name.to_string(),
                    ViewRegistryEntry::existing(view_name.clone()),
                );
            }
        }

        let mut missing: Vec<(usize, &MetricDefinition)> = Vec::new();

        for metric_name in required_metrics {
            if registry
                .get(metric_name)
                .is_some_and(|entry| entry.status == ViewStatus::Existing)
            {
                continue;
            }

            if let Some((index, definition)) = self
                .metrics
                .iter()
                .enumerate()
                .find(|(_, m)| m.name == metric_name)
            {
                if !missing.iter().any(|(_, m)| m.name == metric_name) {
                    missing.push((index, definition));
                }
            }
        }

        missing.sort_by_key(|(index, definition)| (Reverse(definition.priority.rank()), *index));
        missing.into_iter().map(|(_, definition)| definition).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog_with_priorities() -> MetricCatalog {
        MetricCatalog::new(vec![
            MetricDefinition {
                name: "slow_burn",
                category: MetricCategory::TrendAnalysis,
                tables: &[],
                priority: Priority::Low,
                description: "",
            },
            MetricDefinition {
                name: "urgent",
                category: MetricCategory::FinancialKpi,
                tables: &[],
                priority: Priority::High,
                description: "",
            },
            MetricDefinition {
                name: "steady",
                category: MetricCategory::OperationalMetric,
                tables: &[],
                priority: Priority::Medium,
                description: "",
            },
        ])
    }

    fn names(defs: &[&MetricDefinition]) -> Vec<&'static str> {
        defs.iter().map(|d| d.name).collect()
    }

    #[test]
    fn gaps_ordered_by_priority_descending() {
        let catalog = catalog_with_priorities();
        let required: Vec<String> = ["slow_burn", "urgent", "steady"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut registry = ViewRegistry::new();
        let missing = catalog.resolve_gaps(&required, &BTreeSet::new(), &mut registry);
        assert_eq!(names(&missing), vec!["urgent", "steady", "slow_burn"]);
    }

    #[test]
    fn priority_ties_follow_catalog_order() {
        let catalog = MetricCatalog::builtin();
        let required: Vec<String> = ["customer_health_score", "cash_flow_analysis", "revenue_trend"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut registry = ViewRegistry::new();
        let missing = catalog.resolve_gaps(&required, &BTreeSet::new(), &mut registry);
        // All three are high priority; catalog order decides.
        assert_eq!(
            names(&missing),
            vec!["revenue_trend", "cash_flow_analysis", "customer_health_score"]
        );
    }

    #[test]
    fn existing_view_marks_registry_and_skips_synthesis() {
        let catalog = MetricCatalog::builtin();
        let required = vec!["revenue_trend".to_string(), "project_efficiency".to_string()];
        let existing: BTreeSet<String> =
            ["analytics_revenue_trend".to_string()].into_iter().collect();
        let mut registry = ViewRegistry::new();
        let missing = catalog.resolve_gaps(&required, &existing, &mut registry);

        assert_eq!(names(&missing), vec!["project_efficiency"]);
        let entry = registry.get("revenue_trend").unwrap();
        assert_eq!(entry.status, ViewStatus::Existing);
        assert_eq!(entry.view_name, "analytics_revenue_trend");
    }

    #[test]
    fn unrequested_existing_views_still_enter_registry() {
        let catalog = MetricCatalog::builtin();
        let required = vec!["revenue_trend".to_string()];
        let existing: BTreeSet<String> = ["analytics_business_trends".to_string()]
            .into_iter()
            .collect();
        let mut registry = ViewRegistry::new();
        let missing = catalog.resolve_gaps(&required, &existing, &mut registry);

        // The unrequested view is still registered so the optimization
        // pass re-benchmarks it.
        assert_eq!(names(&missing), vec!["revenue_trend"]);
        let entry = registry.get("business_trends").unwrap();
        assert_eq!(entry.status, ViewStatus::Existing);
        assert_eq!(entry.view_name, "analytics_business_trends");
    }

    #[test]
    fn unknown_metrics_are_dropped() {
        let catalog = MetricCatalog::builtin();
        let required = vec!["quantum_flux".to_string(), "revenue_trend".to_string()];
        let mut registry = ViewRegistry::new();
        let missing = catalog.resolve_gaps(&required, &BTreeSet::new(), &mut registry);
        assert_eq!(names(&missing), vec!["revenue_trend"]);
        assert!(registry.is_empty());
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let catalog = MetricCatalog::builtin();
        let mut registry = ViewRegistry::new();
        let missing = catalog.resolve_gaps(&[], &BTreeSet::new(), &mut registry);
        assert!(missing.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn duplicate_requests_resolve_once() {
        let catalog = MetricCatalog::builtin();
        let required = vec!["revenue_trend".to_string(), "revenue_trend".to_string()];
        let mut registry = ViewRegistry::new();
        let missing = catalog.resolve_gaps(&required, &BTreeSet::new(), &mut registry);
        assert_eq!(names(&missing), vec!["revenue_trend"]);
    }
}
