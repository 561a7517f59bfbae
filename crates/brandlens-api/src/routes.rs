use crate::{auth, handlers, AppState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/v1/analyses", post(handlers::create_analysis))
        .route("/v1/analyses/latest", get(handlers::latest_analysis))
        .route(
            "/v1/competitor-analyses",
            post(handlers::create_competitor_analysis),
        )
        .route("/v1/usage", get(handlers::usage))
        .route("/v1/keys", get(handlers::list_keys))
        .route("/v1/keys/validate", post(handlers::validate_key))
        .route("/v1/cache/stats", get(handlers::cache_stats))
        .route("/v1/cache/cleanup", post(handlers::cleanup_cache))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_bearer,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use brandlens_core::{BrandLensConfig, Platform, UsageKind};
    use brandlens_providers::{
        GenerationConfig, LLMProvider, LLMResponse, LLMResult, Message, ProviderRegistry,
    };
    use brandlens_store::AnalysisStore;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct StaticProvider {
        platform: Platform,
        reply: String,
    }

    #[async_trait]
    impl LLMProvider for StaticProvider {
        async fn generate_chat(
            &self,
            _messages: &[Message],
            _config: &GenerationConfig,
        ) -> LLMResult<LLMResponse> {
            Ok(LLMResponse {
                content: self.reply.clone(),
                total_tokens: None,
                prompt_tokens: None,
                completion_tokens: None,
                finish_reason: Some("stop".to_string()),
                model: "static".to_string(),
            })
        }

        async fn is_available(&self) -> bool {
            true
        }

        fn platform(&self) -> Platform {
            self.platform
        }

        fn model_name(&self) -> &str {
            "static"
        }
    }

    fn test_state(registry: ProviderRegistry, auth_token: Option<&str>) -> AppState {
        let mut config = BrandLensConfig::default();
        config.api.auth_token = auth_token.map(str::to_string);
        let store = Arc::new(AnalysisStore::open_in_memory().unwrap());
        AppState::with_parts(config, registry, store).unwrap()
    }

    fn chatgpt_registry(reply: &str) -> ProviderRegistry {
        let mut registry = ProviderRegistry::empty();
        registry.insert(Arc::new(StaticProvider {
            platform: Platform::ChatGpt,
            reply: reply.to_string(),
        }));
        registry
    }

    fn get(path: &str, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(path);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_json(path: &str, bearer: &str, body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header("authorization", format!("Bearer {bearer}"))
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn acme_profile() -> Value {
        json!({
            "website_url": "https://acme.dev",
            "brand_name": "Acme",
            "industry": "software"
        })
    }

    #[tokio::test]
    async fn test_health_is_open() {
        let router = create_router(test_state(ProviderRegistry::empty(), None));
        let response = router.oneshot(get("/health", None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_v1_requires_bearer_token() {
        let router = create_router(test_state(ProviderRegistry::empty(), None));

        let response = router.clone().oneshot(get("/v1/usage", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router.oneshot(get("/v1/usage", Some("anything"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_configured_token_must_match() {
        let router = create_router(test_state(ProviderRegistry::empty(), Some("secret")));

        let response = router
            .clone()
            .oneshot(get("/v1/usage", Some("wrong")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = router.oneshot(get("/v1/usage", Some("secret"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_create_analysis_returns_rankings() {
        let router = create_router(test_state(chatgpt_registry("1. Acme"), None));

        let response = router
            .oneshot(post_json("/v1/analyses", "token", &acme_profile()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["brand_name"], "Acme");
        assert_eq!(body["overall_score"], 90);
        assert_eq!(body["rankings"].as_array().unwrap().len(), 1);
        assert_eq!(body["rankings"][0]["platform"], "chatgpt");
        assert!(body["analysis_id"].as_str().is_some());
    }

    #[tokio::test]
    async fn test_empty_registry_maps_to_bad_gateway() {
        let router = create_router(test_state(ProviderRegistry::empty(), None));

        let response = router
            .oneshot(post_json("/v1/analyses", "token", &acme_profile()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

        let body = json_body(response).await;
        assert_eq!(body["status"], 502);
        assert!(body["error"].as_str().unwrap().contains("providers"));
    }

    #[tokio::test]
    async fn test_blank_profile_maps_to_bad_request() {
        let router = create_router(test_state(chatgpt_registry("Acme"), None));
        let profile = json!({
            "website_url": "",
            "brand_name": "Acme",
            "industry": "software"
        });

        let response = router
            .oneshot(post_json("/v1/analyses", "token", &profile))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_usage_limit_maps_to_too_many_requests() {
        let state = test_state(chatgpt_registry("Acme"), None);
        for _ in 0..5 {
            state
                .store
                .track_usage(state.user_id(), UsageKind::Brand)
                .unwrap();
        }
        let router = create_router(state);

        let response = router
            .oneshot(post_json("/v1/analyses", "token", &acme_profile()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_latest_is_not_found_when_store_is_empty() {
        let router = create_router(test_state(ProviderRegistry::empty(), None));

        let response = router
            .oneshot(get("/v1/analyses/latest", Some("token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_latest_returns_stored_analysis() {
        let router = create_router(test_state(chatgpt_registry("1. Acme"), None));

        let response = router
            .clone()
            .oneshot(post_json("/v1/analyses", "token", &acme_profile()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = router
            .oneshot(get("/v1/analyses/latest", Some("token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["brand_name"], "Acme");
        assert_eq!(body["overall_score"], 90);
    }

    #[tokio::test]
    async fn test_usage_reports_counts_and_limit() {
        let state = test_state(ProviderRegistry::empty(), None);
        state
            .store
            .track_usage(state.user_id(), UsageKind::Brand)
            .unwrap();
        let router = create_router(state);

        let response = router.oneshot(get("/v1/usage", Some("token"))).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["usage"]["brand"], 1);
        assert_eq!(body["usage"]["total"], 1);
        assert_eq!(body["limit"], 5);
        assert_eq!(body["can_analyze"], true);
        assert_eq!(body["tier"], "free");
    }

    #[tokio::test]
    async fn test_keys_lists_all_platforms() {
        let mut config = BrandLensConfig::default();
        config.providers.openai.api_key = Some("sk-test-0000000000000000000".to_string());
        let store = Arc::new(AnalysisStore::open_in_memory().unwrap());
        let state = AppState::with_parts(config, ProviderRegistry::empty(), store).unwrap();
        let router = create_router(state);

        let response = router.oneshot(get("/v1/keys", Some("token"))).await.unwrap();
        let body = json_body(response).await;
        let platforms = body["platforms"].as_array().unwrap();
        assert_eq!(platforms.len(), 4);
        assert_eq!(platforms[0]["platform"], "chatgpt");
        assert_eq!(platforms[0]["configured"], true);
        assert_eq!(platforms[1]["configured"], false);
    }

    #[tokio::test]
    async fn test_validate_key_checks_format() {
        let router = create_router(test_state(ProviderRegistry::empty(), None));

        let request = json!({
            "platform": "perplexity",
            "api_key": "pplx-abcdefghijklmnopqrstuvwx"
        });
        let response = router
            .clone()
            .oneshot(post_json("/v1/keys/validate", "token", &request))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["valid"], true);

        let request = json!({"platform": "perplexity", "api_key": "sk-nope"});
        let response = router
            .oneshot(post_json("/v1/keys/validate", "token", &request))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["valid"], false);
    }

    #[tokio::test]
    async fn test_cache_stats_and_cleanup() {
        let router = create_router(test_state(ProviderRegistry::empty(), None));

        let response = router
            .clone()
            .oneshot(get("/v1/cache/stats", Some("token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["entries"], 0);

        let response = router
            .oneshot(post_json("/v1/cache/cleanup", "token", &json!({})))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["removed"], 0);
    }
}
