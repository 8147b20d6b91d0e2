#![cfg(feature = "inmem-store")]

use actix_web::{test, App};
use safai::assignment::AssignmentConfig;
use safai::auth::{create_jwt, Role};
use safai::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
use safai::repo::inmem::InMemRepo;
use safai::storage::FsImageStore;
use safai::{config, AppState};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

fn setup_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("SAFAI_DATA_DIR", tmp.path().to_str().unwrap());
}

fn limited_state() -> AppState {
    AppState {
        repo: Arc::new(InMemRepo::new()),
        image_store: Arc::new(FsImageStore::new()),
        assignment: AssignmentConfig::default(),
        rate_limiter: RateLimiterFacade::new(
            InMemoryRateLimiter::new(true),
            RateLimitConfig {
                complaint_limit: 1,
                complaint_window: Duration::from_secs(3600),
                recyclable_limit: 1,
                recyclable_window: Duration::from_secs(3600),
                image_limit: 1,
                image_window: Duration::from_secs(3600),
            },
        ),
    }
}

fn complaint_payload() -> serde_json::Value {
    serde_json::json!({
        "title": "Overflowing bin",
        "description": "Bin has been overflowing for 3 days near the park entrance",
        "priority": "high",
        "area": "bopal",
        "coordinates": {"lat": 23.01, "lng": 72.51},
        "location": "Park Street",
        "image_url": null
    })
}

#[actix_web::test]
#[serial]
async fn second_submission_in_window_is_limited() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(limited_state()))
            .configure(config),
    )
    .await;

    let token = create_jwt("citizen1", vec![Role::User]).unwrap();
    let req = test::TestRequest::post()
        .uri("/api/v1/complaints")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(complaint_payload())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);

    let req = test::TestRequest::post()
        .uri("/api/v1/complaints")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(complaint_payload())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 429);

    // a different subject is unaffected
    let other = create_jwt("citizen2", vec![Role::User]).unwrap();
    let req = test::TestRequest::post()
        .uri("/api/v1/complaints")
        .insert_header(("Authorization", format!("Bearer {}", other)))
        .set_json(complaint_payload())
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 201);
}
