// API Integration Tests
//
// Purpose: Exercise every endpoint against an in-memory engine
// Run with: cargo test --features api --test api_integration_tests

#[cfg(feature = "api")]
mod api_tests {
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use crop_yield_engine::{
        create_router, AppState, FeatureSchema, FeatureVector, LookupTables, ScorerError,
        ServerConfig, SoilProfile, WeatherProfile, YieldEngine, YieldScorer,
    };
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt; // for oneshot

    /// log1p-scale score tracking rainfall
    struct RainScorer;

    impl YieldScorer for RainScorer {
        fn score(&self, features: &FeatureVector) -> Result<f64, ScorerError> {
            Ok(features.get("Total_Rainfall").unwrap_or(0.0) / 1000.0)
        }
    }

    /// Fails on every vector, as a corrupt model would
    struct BrokenScorer;

    impl YieldScorer for BrokenScorer {
        fn score(&self, _features: &FeatureVector) -> Result<f64, ScorerError> {
            Err(ScorerError::Model("tree 3 routes to a missing node".to_string()))
        }
    }

    /// Scores correctly but slowly
    struct SlowScorer;

    impl YieldScorer for SlowScorer {
        fn score(&self, features: &FeatureVector) -> Result<f64, ScorerError> {
            std::thread::sleep(Duration::from_millis(5));
            RainScorer.score(features)
        }
    }

    // Helper: Create test app over a small jawa barat table
    fn create_test_app() -> axum::Router {
        create_app_with(Arc::new(RainScorer), ServerConfig::default())
    }

    fn create_app_with(scorer: Arc<dyn YieldScorer>, config: ServerConfig) -> axum::Router {
        let tables = (1..=12).fold(
            LookupTables::default()
                .with_soil("Jawa Barat", SoilProfile { soil_ph: 6.1, clay_ratio: 35.0, sand_ratio: 25.0 })
                .with_duration("Padi", 110.0)
                .with_baseline("Padi", "jawa barat", 5.0),
            |tables, m| {
                let profile = WeatherProfile {
                    avg_temp: 27.0,
                    total_rainfall: 500.0 + 50.0 * m as f64,
                    avg_humidity: 80.0,
                    avg_soil_moisture: 30.0,
                };
                tables.with_weather("jawa barat", m, profile)
            },
        );

        let columns = ["Total_Rainfall", "Planting_Month", "Crop_Padi", "Province_jawa barat"];
        let schema = Arc::new(FeatureSchema::new(columns.iter().map(|s| s.to_string()).collect()).unwrap());

        let engine = YieldEngine::new(tables, schema, scorer);
        let state = AppState::from_engine(Arc::new(engine), config);
        create_router(state)
    }

    // Helper: Parse JSON response
    async fn json_response(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read response body");
        serde_json::from_slice(&body).expect("Failed to parse JSON")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    // =========================================================================
    // Section 1: Health and catalog
    // =========================================================================

    #[tokio::test]
    async fn test_health_check() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        assert_eq!(body["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn test_catalog_lists_crops_and_provinces() {
        let response = create_test_app()
            .oneshot(Request::builder().uri("/api/catalog").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        assert_eq!(body["crops"], json!(["Padi"]));
        assert_eq!(body["provinces"], json!(["jawa barat"]));
    }

    // =========================================================================
    // Section 2: Prediction
    // =========================================================================

    #[tokio::test]
    async fn test_predict_specific_date() {
        let request = post_json("/api/predict", json!({
            "crop": "padi",
            "province": "Jawa Barat",
            "date": "2030-06-15"
        }));
        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        assert_eq!(body["crop"], "Padi");
        assert_eq!(body["province"], "jawa barat");
        assert_eq!(body["planting_date"], "2030-06-15");
        assert_eq!(body["harvest_date"], "2030-10-03");
        assert_eq!(body["status"]["state"], "planned");

        // June rainfall 800 → log1p score 0.8
        let predicted = body["predicted_yield_tons_per_ha"].as_f64().unwrap();
        assert!((predicted - 0.8_f64.exp_m1()).abs() < 1e-9);

        assert_eq!(body["novelty"]["crop_unresolved"], false);
        assert_eq!(body["session"]["crop"], "padi");
    }

    #[tokio::test]
    async fn test_predict_uses_session_context() {
        let request = post_json("/api/predict", json!({
            "date": "2030-01-15",
            "session": { "crop": "Padi", "province": "jawa barat" }
        }));
        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        assert_eq!(body["crop"], "Padi");
        assert_eq!(body["session"]["province"], "jawa barat");
    }

    #[tokio::test]
    async fn test_predict_defaults_to_today() {
        let request = post_json("/api/predict", json!({ "crop": "Padi", "province": "jawa barat" }));
        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        let today = chrono::Local::now().date_naive().to_string();
        assert_eq!(body["planting_date"], today.as_str());
    }

    #[tokio::test]
    async fn test_predict_bad_date() {
        let request = post_json("/api/predict", json!({
            "crop": "Padi",
            "province": "jawa barat",
            "date": "next tuesday"
        }));
        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_response(response).await;
        assert!(body["error"].as_str().unwrap().contains("next tuesday"));
    }

    #[tokio::test]
    async fn test_predict_missing_context() {
        let request = post_json("/api/predict", json!({ "crop": "Padi" }));
        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_response(response).await;
        assert_eq!(body["missing"], json!(["province"]));
        assert_eq!(body["session"]["crop"], "Padi");
    }

    #[tokio::test]
    async fn test_predict_blank_session_field_is_missing() {
        let request = post_json("/api/predict", json!({
            "date": "2030-01-15",
            "session": { "crop": "", "province": "jawa barat" }
        }));
        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_response(response).await;
        assert_eq!(body["missing"], json!(["crop"]));
        assert_eq!(body["session"]["crop"], Value::Null);
        assert_eq!(body["session"]["province"], "jawa barat");
    }

    #[tokio::test]
    async fn test_predict_scorer_failure_is_internal_error() {
        let app = create_app_with(Arc::new(BrokenScorer), ServerConfig::default());
        let request = post_json("/api/predict", json!({
            "crop": "Padi",
            "province": "jawa barat",
            "date": "2030-06-15"
        }));
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json_response(response).await;
        assert!(body["error"].as_str().unwrap().contains("2030-06-15"));
    }

    #[tokio::test]
    async fn test_predict_unknown_inputs_flagged() {
        let request = post_json("/api/predict", json!({
            "crop": "Kopi",
            "province": "Papua",
            "date": "2030-03-01"
        }));
        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        assert_eq!(body["novelty"]["crop_unresolved"], true);
        assert_eq!(body["novelty"]["soil_defaulted"], true);
        assert_eq!(body["novelty"]["weather_defaulted"], true);
    }

    // =========================================================================
    // Section 3: Optimization
    // =========================================================================

    #[tokio::test]
    async fn test_optimize_recommends_wettest_anchor() {
        let request = post_json("/api/optimize", json!({ "crop": "Padi", "province": "jawa barat" }));
        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = json_response(response).await;
        assert_eq!(body["candidates_scored"], 365);

        // December holds the wettest stored month
        let best_date = body["best_date"].as_str().unwrap();
        assert!(best_date.ends_with("-12-15"), "unexpected best date {}", best_date);

        let best = body["best_yield_tons_per_ha"].as_f64().unwrap();
        assert!((best - 1.1_f64.exp_m1()).abs() < 1e-9);

        assert_eq!(body["baseline_yield_tons_per_ha"], 5.0);
        let uplift = body["uplift_pct"].as_f64().unwrap();
        assert!((uplift - (best - 5.0) / 5.0 * 100.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_optimize_blank_session_field_is_missing() {
        let request = post_json("/api/optimize", json!({
            "session": { "crop": "Padi", "province": "   " }
        }));
        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_response(response).await;
        assert_eq!(body["missing"], json!(["province"]));
    }

    #[tokio::test]
    async fn test_optimize_scorer_failure_is_internal_error() {
        let app = create_app_with(Arc::new(BrokenScorer), ServerConfig::default());
        let request = post_json("/api/optimize", json!({ "crop": "Padi", "province": "jawa barat" }));
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json_response(response).await;
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_optimize_timeout_is_gateway_timeout() {
        let config = ServerConfig {
            optimize_timeout: Duration::from_millis(1),
            ..ServerConfig::default()
        };
        let app = create_app_with(Arc::new(SlowScorer), config);
        let request = post_json("/api/optimize", json!({ "crop": "Padi", "province": "jawa barat" }));
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let body = json_response(response).await;
        assert!(body["error"].as_str().unwrap().contains("optimization exceeded"));
    }

    #[tokio::test]
    async fn test_optimize_missing_context() {
        let request = post_json("/api/optimize", json!({}));
        let response = create_test_app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_response(response).await;
        assert_eq!(body["missing"], json!(["crop", "province"]));
    }
}
