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

fn setup_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("SAFAI_DATA_DIR", tmp.path().to_str().unwrap());
}

fn state() -> AppState {
    AppState {
        repo: Arc::new(InMemRepo::new()),
        image_store: Arc::new(FsImageStore::new()),
        assignment: AssignmentConfig::default(),
        rate_limiter: RateLimiterFacade::new(
            InMemoryRateLimiter::new(false),
            RateLimitConfig::from_env(),
        ),
    }
}

fn user_token() -> String {
    create_jwt("citizen1", vec![Role::User]).unwrap()
}

// Smallest valid PNG (1x1, RGBA)
fn png_bytes() -> Vec<u8> {
    vec![
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D',
        b'R', 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, b'I', b'D', b'A', b'T', 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, b'I',
        b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82,
    ]
}

fn multipart_body(boundary: &str, payload: &[u8]) -> Vec<u8> {
    let mut body: Vec<u8> = Vec::new();
    body.extend_from_slice(
        format!(
            "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.png\"\r\nContent-Type: application/octet-stream\r\n\r\n",
            boundary
        )
        .as_bytes(),
    );
    body.extend_from_slice(payload);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

#[actix_web::test]
#[serial]
async fn upload_is_idempotent_and_served_back() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let boundary = "BOUNDARYHASH";
    let body = multipart_body(boundary, &png_bytes());

    let req = test::TestRequest::post()
        .uri("/api/v1/images")
        .insert_header(("Authorization", format!("Bearer {}", user_token())))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(body.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let uploaded: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(uploaded["mime"], "image/png");
    assert_eq!(uploaded["duplicate"], false);
    let hash = uploaded["hash"].as_str().unwrap().to_string();
    assert_eq!(uploaded["url"], format!("/images/{hash}"));

    // same bytes again: 200 + duplicate flag
    let req = test::TestRequest::post()
        .uri("/api/v1/images")
        .insert_header(("Authorization", format!("Bearer {}", user_token())))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let dup: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(dup["duplicate"], true);

    // fetch it back with the right content type
    let req = test::TestRequest::get()
        .uri(&format!("/images/{}", hash))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let ct = resp.headers().get("content-type").unwrap().to_str().unwrap();
    assert_eq!(ct, "image/png");
}

#[actix_web::test]
#[serial]
async fn unsupported_media_type_rejected() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let boundary = "BOUNDARYTEXT";
    let body = multipart_body(boundary, b"just some plain text, not an image");

    let req = test::TestRequest::post()
        .uri("/api/v1/images")
        .insert_header(("Authorization", format!("Bearer {}", user_token())))
        .insert_header((
            "Content-Type",
            format!("multipart/form-data; boundary={}", boundary),
        ))
        .set_payload(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 415);
}

#[actix_web::test]
#[serial]
async fn missing_image_is_404() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::get()
        .uri("/images/0000000000000000000000000000000000000000000000000000000000000000")
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 404);
}
