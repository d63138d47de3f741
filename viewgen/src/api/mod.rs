use warp::{Filter, Rejection, Reply};

use crate::config::Config;

mod views;

pub fn routes(config: Config) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let api = warp::path("api").and(warp::path("v1"));

    api.and(warp::path("views"))
        .and(warp::path("generate"))
        .and(warp::post())
        .and(json_or_empty_body())
        .and(with_config(config))
        .and_then(views::handle_generate)
}

// The upstream orchestrator sometimes invokes the agent with no payload
// at all, which must behave like "{}".
fn json_or_empty_body(
) -> impl Filter<Extract = (crate::models::GenerateRequest,), Error = Rejection> + Clone {
    warp::body::json().or_else(|_| async {
        Ok::<_, Rejection>((crate::models::GenerateRequest::default(),))
    })
}

fn with_config(
    config: Config,
) -> impl Filter<Extract = (Config,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || config.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_body_defaults_to_empty_request() {
        let filter = json_or_empty_body();
        let request = warp::test::request()
            .method("POST")
            .filter(&filter)
            .await
            .unwrap();
        assert!(request.required_metrics.is_none());
    }

    #[tokio::test]
    async fn json_body_is_parsed() {
        let filter = json_or_empty_body();
        let request = warp::test::request()
            .method("POST")
            .json(&serde_json::json!({"required_metrics": ["revenue_trend"]}))
            .filter(&filter)
            .await
            .unwrap();
        assert_eq!(
            request.required_metrics,
            Some(vec!["revenue_trend".to_string()])
        );
    }
}
