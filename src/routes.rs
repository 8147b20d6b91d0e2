use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use futures_util::TryStreamExt as _;
use sha2::{Digest, Sha256};

use crate::assignment::{self, AssignmentConfig};
use crate::auth::{Auth, Claims, Role};
use crate::error::ApiError;
use crate::models::*;
use crate::rate_limit::RateLimiterFacade;
use crate::repo::{ComplaintRepo as _, RecyclableItemRepo as _, Repo, UserRepo as _};
use crate::storage::{ImageStore, ImageStoreError};
use crate::wizard;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/auth/login").route(web::get().to(idp_login)))
            .service(web::resource("/auth/callback").route(web::get().to(idp_callback)))
            .service(web::resource("/auth/refresh").route(web::post().to(refresh_token)))
            .service(web::resource("/auth/me").route(web::get().to(auth_me)))
            .service(
                web::resource("/complaints")
                    .route(web::get().to(list_complaints))
                    .route(web::post().to(create_complaint)),
            )
            .service(web::resource("/complaints/{id}").route(web::get().to(get_complaint)))
            .service(
                web::resource("/complaints/{id}/status")
                    .route(web::post().to(update_complaint_status)),
            )
            .service(
                web::resource("/recyclables")
                    .route(web::get().to(list_items))
                    .route(web::post().to(create_item)),
            )
            .service(web::resource("/recyclables/{id}").route(web::get().to(get_item)))
            .service(
                web::resource("/recyclables/{id}/status").route(web::post().to(update_item_status)),
            )
            .service(web::resource("/officer/dashboard").route(web::get().to(officer_dashboard)))
            .service(web::resource("/admin/overview").route(web::get().to(admin_overview)))
            .service(web::resource("/admin/users").route(web::get().to(admin_list_users)))
            .service(
                web::resource("/admin/users/{subject}/role").route(web::post().to(admin_set_role)),
            )
            .service(web::resource("/images").route(web::post().to(upload_image))),
    );
    // Public fetch route (no /api/v1 prefix so <img src="/images/{hash}"> works)
    cfg.route("/images/{hash}", web::get().to(get_image));
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub image_store: Arc<dyn ImageStore>,
    pub assignment: AssignmentConfig,
    pub rate_limiter: RateLimiterFacade,
}

/// Highest privilege wins when a token carries several roles.
fn primary_role(claims: &Claims) -> Role {
    if claims.is_admin() {
        Role::Admin
    } else if claims.is_officer() {
        Role::Officer
    } else {
        Role::User
    }
}

/// Resolved area for visibility checks; empty for non-officers so the
/// area clause never matches.
async fn caller_area(data: &AppState, claims: &Claims) -> String {
    if !claims.is_officer() {
        return String::new();
    }
    let user = data.repo.get_user(&claims.sub).await.ok();
    assignment::resolve_officer_area(user.as_ref(), &data.assignment)
}

// ---------------- complaints ----------------

#[utoipa::path(
    get,
    path = "/api/v1/complaints",
    responses(
        (status = 200, description = "Complaints visible to the caller", body = [Complaint]),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_complaints(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let role = primary_role(&auth.0);
    let area = caller_area(&data, &auth.0).await;
    let all = data.repo.list_complaints().await?;
    let visible = assignment::visible_for(all, role, &auth.0.sub, &area);
    Ok(HttpResponse::Ok().json(visible))
}

#[utoipa::path(
    post,
    path = "/api/v1/complaints",
    request_body = NewComplaint,
    responses(
        (status = 201, description = "Complaint filed", body = Complaint),
        (status = 422, description = "Validation failed (field-keyed errors)"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn create_complaint(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewComplaint>,
) -> Result<HttpResponse, ApiError> {
    if !data.rate_limiter.allow_complaint(&auth.0.sub) {
        return Ok(HttpResponse::TooManyRequests()
            .json(serde_json::json!({"error": "too many complaints, slow down"})));
    }
    let new = payload.into_inner();
    let errors = wizard::validate_new_complaint(&new);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    let complaint = data.repo.create_complaint(&auth.0.sub, new).await?;
    metrics::increment_counter!("safai_complaints_submitted_total");
    Ok(HttpResponse::Created().json(complaint))
}

#[utoipa::path(
    get,
    path = "/api/v1/complaints/{id}",
    params(("id" = Id, Path, description = "Complaint id")),
    responses(
        (status = 200, description = "Complaint", body = Complaint),
        (status = 404, description = "Not found or not visible to the caller")
    )
)]
pub async fn get_complaint(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let complaint = data.repo.get_complaint(path.into_inner()).await?;
    let role = primary_role(&auth.0);
    let area = caller_area(&data, &auth.0).await;
    // Invisible records 404 rather than 403: don't leak existence.
    if !assignment::can_view(&complaint, role, &auth.0.sub, &area) {
        return Err(ApiError::NotFound);
    }
    Ok(HttpResponse::Ok().json(complaint))
}

#[utoipa::path(
    post,
    path = "/api/v1/complaints/{id}/status",
    request_body = UpdateComplaintStatus,
    params(("id" = Id, Path, description = "Complaint id")),
    responses(
        (status = 200, description = "Status updated", body = Complaint),
        (status = 403, description = "Forbidden - officers and admins only"),
        (status = 404, description = "Complaint not found")
    )
)]
pub async fn update_complaint_status(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateComplaintStatus>,
) -> Result<HttpResponse, ApiError> {
    if !(auth.0.is_officer() || auth.0.is_admin()) {
        return Err(ApiError::Forbidden);
    }
    let complaint = data
        .repo
        .update_complaint_status(path.into_inner(), &auth.0.sub, payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(complaint))
}

// ---------------- recyclable items ----------------

#[utoipa::path(
    get,
    path = "/api/v1/recyclables",
    responses(
        (status = 200, description = "Recyclable requests visible to the caller", body = [RecyclableItem])
    )
)]
pub async fn list_items(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let role = primary_role(&auth.0);
    let area = caller_area(&data, &auth.0).await;
    let all = data.repo.list_items().await?;
    let visible = assignment::visible_for(all, role, &auth.0.sub, &area);
    Ok(HttpResponse::Ok().json(visible))
}

#[utoipa::path(
    post,
    path = "/api/v1/recyclables",
    request_body = NewRecyclableItem,
    responses(
        (status = 201, description = "Pickup request filed", body = RecyclableItem),
        (status = 422, description = "Validation failed (field-keyed errors)"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn create_item(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<NewRecyclableItem>,
) -> Result<HttpResponse, ApiError> {
    if !data.rate_limiter.allow_recyclable(&auth.0.sub) {
        return Ok(HttpResponse::TooManyRequests()
            .json(serde_json::json!({"error": "too many pickup requests, slow down"})));
    }
    let new = payload.into_inner();
    let mut errors = wizard::validate_new_item(&new);
    // Pickup crews need a photo; unlike complaints, a missing or failed
    // image is fatal here.
    if new.image_url.is_none() {
        errors.insert("images".into(), "At least one photo is required".into());
    }
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }
    if let Some(hash) = new
        .image_url
        .as_deref()
        .and_then(|url| url.strip_prefix("/images/"))
    {
        if hash.len() < 2 || data.image_store.load(hash).await.is_err() {
            log::warn!("recyclable submission references missing image {hash}");
            return Err(ApiError::BadRequest);
        }
    }
    let item = data.repo.create_item(&auth.0.sub, new).await?;
    metrics::increment_counter!("safai_recyclables_submitted_total");
    Ok(HttpResponse::Created().json(item))
}

pub async fn get_item(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
) -> Result<HttpResponse, ApiError> {
    let item = data.repo.get_item(path.into_inner()).await?;
    let role = primary_role(&auth.0);
    let area = caller_area(&data, &auth.0).await;
    if !assignment::can_view(&item, role, &auth.0.sub, &area) {
        return Err(ApiError::NotFound);
    }
    Ok(HttpResponse::Ok().json(item))
}

#[utoipa::path(
    post,
    path = "/api/v1/recyclables/{id}/status",
    request_body = UpdateItemStatus,
    params(("id" = Id, Path, description = "Recyclable item id")),
    responses(
        (status = 200, description = "Status updated", body = RecyclableItem),
        (status = 403, description = "Forbidden - officers and admins only"),
        (status = 404, description = "Item not found")
    )
)]
pub async fn update_item_status(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<Id>,
    payload: web::Json<UpdateItemStatus>,
) -> Result<HttpResponse, ApiError> {
    if !(auth.0.is_officer() || auth.0.is_admin()) {
        return Err(ApiError::Forbidden);
    }
    let item = data
        .repo
        .update_item_status(path.into_inner(), &auth.0.sub, payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(item))
}

// ---------------- officer dashboard ----------------

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct OfficerStats {
    pub assigned: usize,
    pub resolved: usize,
    pub pending: usize,
    pub critical: usize,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct AssignedComplaint {
    pub complaint: Complaint,
    pub due_by: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct OfficerDashboard {
    pub officer_area: String,
    pub claimed_now: usize,
    pub stats: OfficerStats,
    pub assigned: Vec<AssignedComplaint>,
    pub area_complaints: Vec<Complaint>,
}

#[utoipa::path(
    get,
    path = "/api/v1/officer/dashboard",
    responses(
        (status = 200, description = "Officer dashboard; claims unassigned work as a side effect", body = OfficerDashboard),
        (status = 403, description = "Forbidden - officers only")
    )
)]
pub async fn officer_dashboard(
    auth: Auth,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    if !auth.0.is_officer() {
        return Err(ApiError::Forbidden);
    }
    let subject = auth.0.sub.as_str();
    let user = data.repo.get_user(subject).await.ok();
    let officer_area = assignment::resolve_officer_area(user.as_ref(), &data.assignment);

    let claimed =
        assignment::auto_claim(data.repo.as_ref(), subject, &officer_area, &data.assignment)
            .await?;

    // Re-read after claiming so the stats reflect the new assignments.
    let all = data.repo.list_complaints().await?;

    let mine: Vec<&Complaint> = all
        .iter()
        .filter(|c| c.assigned_to.as_deref() == Some(subject))
        .collect();
    let stats = OfficerStats {
        assigned: mine.len(),
        resolved: all
            .iter()
            .filter(|c| {
                c.status == ComplaintStatus::Resolved && c.resolved_by.as_deref() == Some(subject)
            })
            .count(),
        pending: mine
            .iter()
            .filter(|c| {
                matches!(
                    c.status,
                    ComplaintStatus::Pending | ComplaintStatus::InProgress
                )
            })
            .count(),
        critical: mine
            .iter()
            .filter(|c| c.priority == Priority::Critical)
            .count(),
    };

    let assigned = mine
        .iter()
        .map(|c| AssignedComplaint {
            complaint: (*c).clone(),
            due_by: c.due_by(),
        })
        .collect();

    let area_complaints = all
        .iter()
        .filter(|c| {
            c.status != ComplaintStatus::Resolved
                && c.assigned_to.as_deref() != Some(subject)
                && assignment::area_matches(&c.area, &officer_area)
        })
        .cloned()
        .collect();

    Ok(HttpResponse::Ok().json(OfficerDashboard {
        officer_area,
        claimed_now: claimed.len(),
        stats,
        assigned,
        area_complaints,
    }))
}

// ---------------- admin ----------------

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ActivityEntry {
    pub action: String,
    pub detail: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct AdminOverview {
    pub total_users: usize,
    pub active_officers: usize,
    pub open_complaints: usize,
    pub critical_cases: usize,
    pub recent_activity: Vec<ActivityEntry>,
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/overview",
    responses(
        (status = 200, description = "Aggregate statistics", body = AdminOverview),
        (status = 403, description = "Forbidden - admins only")
    )
)]
pub async fn admin_overview(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    if !auth.0.is_admin() {
        return Err(ApiError::Forbidden);
    }
    let users = data.repo.list_users().await?;
    let complaints = data.repo.list_complaints().await?;

    let first_name_of = |subject: &str| -> String {
        users
            .iter()
            .find(|u| u.subject_id == subject)
            .and_then(|u| u.first_name.clone())
            .unwrap_or_else(|| "an officer".into())
    };

    let mut recent_activity = Vec::new();
    let mut resolved: Vec<&Complaint> = complaints
        .iter()
        .filter(|c| c.status == ComplaintStatus::Resolved && c.resolved_by.is_some())
        .collect();
    resolved.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    for c in resolved.iter().take(2) {
        let resolver = c.resolved_by.as_deref().unwrap_or_default();
        recent_activity.push(ActivityEntry {
            action: "Complaint Resolved".into(),
            detail: format!("'{}' resolved by {}", c.title, first_name_of(resolver)),
            at: c.updated_at,
        });
    }
    let mut assigned: Vec<&Complaint> = complaints
        .iter()
        .filter(|c| c.status == ComplaintStatus::InProgress && c.assigned_to.is_some())
        .collect();
    assigned.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    for c in assigned.iter().take(2) {
        let officer = c.assigned_to.as_deref().unwrap_or_default();
        recent_activity.push(ActivityEntry {
            action: "Complaint Assigned".into(),
            detail: format!("'{}' assigned to {}", c.title, first_name_of(officer)),
            at: c.updated_at,
        });
    }

    Ok(HttpResponse::Ok().json(AdminOverview {
        total_users: users.len(),
        active_officers: users.iter().filter(|u| u.role == Role::Officer).count(),
        open_complaints: complaints
            .iter()
            .filter(|c| c.status != ComplaintStatus::Resolved)
            .count(),
        critical_cases: complaints
            .iter()
            .filter(|c| c.priority == Priority::Critical)
            .count(),
        recent_activity,
    }))
}

pub async fn admin_list_users(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    if !auth.0.is_admin() {
        return Err(ApiError::Forbidden);
    }
    let users = data.repo.list_users().await?;
    Ok(HttpResponse::Ok().json(users))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/users/{subject}/role",
    request_body = UpdateUser,
    params(("subject" = String, Path, description = "Identity-provider subject id")),
    responses(
        (status = 200, description = "Role/area updated", body = User),
        (status = 403, description = "Forbidden - admins only"),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn admin_set_role(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<UpdateUser>,
) -> Result<HttpResponse, ApiError> {
    if !auth.0.is_admin() {
        return Err(ApiError::Forbidden);
    }
    let user = data
        .repo
        .update_user(&path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

// ---------------- identity provider ----------------

pub async fn idp_login() -> Result<HttpResponse, ApiError> {
    // Graceful degradation: 503 JSON when the IdP isn't configured.
    let client_id = match std::env::var("IDP_CLIENT_ID") {
        Ok(v) => v,
        Err(_) => {
            return Ok(HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "error": "idp_not_configured",
                "message": "Set IDP_CLIENT_ID / IDP_CLIENT_SECRET to enable login"
            })));
        }
    };
    let authorize_url = std::env::var("IDP_AUTHORIZE_URL")
        .unwrap_or_else(|_| "https://idp.example.com/oauth/authorize".to_string());
    let redirect_uri = std::env::var("IDP_REDIRECT_URI")
        .unwrap_or_else(|_| "http://localhost:8080/api/v1/auth/callback".to_string());

    let auth_url = format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20profile%20email",
        authorize_url,
        client_id,
        urlencoding::encode(&redirect_uri)
    );

    Ok(HttpResponse::Found()
        .insert_header(("Location", auth_url))
        .finish())
}

#[derive(serde::Deserialize)]
pub struct IdpCallback {
    code: String,
}

#[derive(serde::Deserialize)]
struct IdpTokenResponse {
    access_token: String,
}

/// Userinfo claims we consume from the provider. The `role` the provider
/// may carry in public metadata is deliberately ignored.
#[derive(serde::Deserialize)]
struct IdpUser {
    sub: String,
    email: Option<String>,
    given_name: Option<String>,
    family_name: Option<String>,
    picture: Option<String>,
}

pub async fn idp_callback(
    query: web::Query<IdpCallback>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    use actix_web::http::header;

    let client_id = match std::env::var("IDP_CLIENT_ID") {
        Ok(v) => v,
        Err(_) => {
            return Ok(HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "error": "idp_not_configured",
                "stage": "client_id"
            })));
        }
    };
    let client_secret = match std::env::var("IDP_CLIENT_SECRET") {
        Ok(v) => v,
        Err(_) => {
            return Ok(HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "error": "idp_not_configured",
                "stage": "client_secret"
            })));
        }
    };
    let token_url = std::env::var("IDP_TOKEN_URL")
        .unwrap_or_else(|_| "https://idp.example.com/oauth/token".to_string());
    let userinfo_url = std::env::var("IDP_USERINFO_URL")
        .unwrap_or_else(|_| "https://idp.example.com/oauth/userinfo".to_string());
    let redirect_uri = std::env::var("IDP_REDIRECT_URI")
        .unwrap_or_else(|_| "http://localhost:8080/api/v1/auth/callback".to_string());

    // Exchange code for token
    let client = reqwest::Client::new();
    let token_response = client
        .post(&token_url)
        .form(&[
            ("client_id", &client_id),
            ("client_secret", &client_secret),
            ("grant_type", &"authorization_code".to_string()),
            ("code", &query.code),
            ("redirect_uri", &redirect_uri),
        ])
        .send()
        .await
        .map_err(|_| ApiError::Internal)?
        .json::<IdpTokenResponse>()
        .await
        .map_err(|_| ApiError::Internal)?;

    // Fetch the profile
    let profile = client
        .get(&userinfo_url)
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", token_response.access_token),
        )
        .send()
        .await
        .map_err(|_| ApiError::Internal)?
        .json::<IdpUser>()
        .await
        .map_err(|_| ApiError::Internal)?;

    // Upsert the profile; the stored role is the only role source.
    let user = data
        .repo
        .upsert_user(NewUser {
            subject_id: profile.sub.clone(),
            email: profile.email,
            first_name: profile.given_name,
            last_name: profile.family_name,
            avatar_url: profile.picture,
        })
        .await?;

    let jwt = crate::auth::create_jwt(&profile.sub, vec![user.role]).map_err(|_| ApiError::Internal)?;

    let frontend_url =
        std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());

    Ok(HttpResponse::Found()
        .insert_header(("Location", format!("{}/?token={}", frontend_url, jwt)))
        .finish())
}

pub async fn refresh_token(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    // Re-read the stored role so demotions take effect at refresh time.
    let roles = match data.repo.get_user(&auth.0.sub).await {
        Ok(user) => vec![user.role],
        Err(_) => auth.0.roles.clone(),
    };
    let jwt = crate::auth::create_jwt(&auth.0.sub, roles).map_err(|_| ApiError::Internal)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "token": jwt })))
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct MeResponse {
    pub subject_id: String,
    pub name: String,
    pub email: Option<String>,
    pub role: String,
    pub area: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    responses(
        (status = 200, description = "Current user info", body = MeResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn auth_me(auth: Auth, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let role = primary_role(&auth.0);
    let user = data.repo.get_user(&auth.0.sub).await.ok();
    let name = user
        .as_ref()
        .map(|u| {
            format!(
                "{} {}",
                u.first_name.as_deref().unwrap_or_default(),
                u.last_name.as_deref().unwrap_or_default()
            )
            .trim()
            .to_string()
        })
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| auth.0.sub.clone());
    let area = if role == Role::Officer {
        Some(assignment::resolve_officer_area(
            user.as_ref(),
            &data.assignment,
        ))
    } else {
        user.as_ref().and_then(|u| u.area.clone())
    };
    let me = MeResponse {
        subject_id: auth.0.sub.clone(),
        name,
        email: user.and_then(|u| u.email),
        role: role.as_str().to_string(),
        area,
    };
    Ok(HttpResponse::Ok().json(me))
}

// ---------------- images ----------------

#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ImageUploadResponse {
    pub hash: String,
    pub mime: String,
    pub size: usize,
    pub url: String,
    pub duplicate: bool, // true when upload was a duplicate (idempotent)
}

const IMAGE_SIZE_LIMIT: usize = 10 * 1024 * 1024; // 10 MB

const ALLOWED_MIME: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

#[utoipa::path(
    post,
    path = "/api/v1/images",
    responses(
        (status = 201, description = "Image stored (new)", body = ImageUploadResponse),
        (status = 200, description = "Image already existed (idempotent)", body = ImageUploadResponse),
        (status = 415, description = "Unsupported media type"),
        (status = 413, description = "Payload too large"),
        (status = 429, description = "Rate limited")
    )
)]
pub async fn upload_image(
    auth: Auth,
    data: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    use actix_web::http::StatusCode;
    if !data.rate_limiter.allow_image(&auth.0.sub) {
        return Ok(HttpResponse::TooManyRequests()
            .json(serde_json::json!({"error": "too many uploads, slow down"})));
    }
    let mut bytes: Vec<u8> = Vec::new();
    while let Some(field) = payload.try_next().await.map_err(|e| {
        log::error!("multipart error: {e}");
        ApiError::Internal
    })? {
        if let Some(name) = field.content_disposition().get_name() {
            if name != "file" {
                continue;
            }
        } else {
            continue;
        }
        let mut field_stream = field;
        let mut hasher = Sha256::new();
        while let Some(chunk) = field_stream.try_next().await.map_err(|e| {
            log::error!("stream read error: {e}");
            ApiError::Internal
        })? {
            if bytes.len() + chunk.len() > IMAGE_SIZE_LIMIT {
                return Ok(HttpResponse::build(StatusCode::PAYLOAD_TOO_LARGE).finish());
            }
            hasher.update(&chunk);
            bytes.extend_from_slice(&chunk);
        }
        let hash = format!("{:x}", hasher.finalize());
        let mime = infer::get(&bytes)
            .map(|t| t.mime_type().to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        if !ALLOWED_MIME.contains(&mime.as_str()) {
            return Ok(HttpResponse::UnsupportedMediaType().finish());
        }
        let (status_code, duplicate_flag) = match data.image_store.save(&hash, &mime, &bytes).await
        {
            Ok(()) => (StatusCode::CREATED, false),
            Err(ImageStoreError::Duplicate) => (StatusCode::OK, true),
            Err(e) => {
                log::error!("image_store save error: {e}");
                return Err(ApiError::Internal);
            }
        };
        let resp = ImageUploadResponse {
            url: format!("/images/{hash}"),
            hash,
            mime,
            size: bytes.len(),
            duplicate: duplicate_flag,
        };
        return Ok(HttpResponse::build(status_code).json(resp));
    }
    Ok(HttpResponse::BadRequest().finish())
}

/// Serve a stored image by hash.
pub async fn get_image(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let hash = path.into_inner();
    if hash.len() < 2 {
        return Err(ApiError::NotFound);
    }
    match data.image_store.load(&hash).await {
        Ok((bytes, mime)) => Ok(HttpResponse::Ok()
            .insert_header(("Content-Type", mime))
            .body(bytes)),
        Err(ImageStoreError::NotFound) => Err(ApiError::NotFound),
        Err(e) => {
            log::error!("image_store load error: {e}");
            Err(ApiError::Internal)
        }
    }
}
