use warp::{Rejection, Reply};

use crate::agents::view_generator::ViewGeneratorAgent;
use crate::config::Config;
use crate::error::ApiError;
use crate::models::GenerateRequest;
use tracing::info;

pub async fn handle_generate(
    request: GenerateRequest,
    config: Config,
) -> Result<impl Reply, Rejection> {
    if let Some(metrics) = &request.required_metrics {
        if let Some(bad) = metrics.iter().find(|m| !is_valid_metric_name(m)) {
            return Err(warp::reject::custom(ApiError::BadRequest(format!(
                "invalid metric name: {bad:?}"
            ))));
        }
    }

    info!("HeatWave View Generator agent function invoked");
    let agent = ViewGeneratorAgent::new(config.heatwave);
    let result = agent.execute(request).await;

    Ok(warp::reply::json(&result))
}

// Metric names flow into derived view identifiers, so the adapter only
// admits identifier-safe names.
fn is_valid_metric_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_must_be_identifier_safe() {
        assert!(is_valid_metric_name("revenue_trend"));
        assert!(is_valid_metric_name("kpi_2024"));
        assert!(!is_valid_metric_name(""));
        assert!(!is_valid_metric_name("Revenue"));
        assert!(!is_valid_metric_name("x; DROP TABLE y"));
    }
}
