use crate::infra::StubState;
use axum::extract::{DefaultBodyLimit, Multipart, Path};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

const UPLOAD_LIMIT: usize = 25 * 1024 * 1024;
const REQUIRED_TEXT: [&str; 3] = ["property_id", "full_name", "phone_number"];
const REQUIRED_FILES: [&str; 3] = ["deed", "id", "selfie"];

type Reply = (StatusCode, Json<Value>);

#[derive(Debug, Deserialize)]
pub(crate) struct CredentialsBody {
    #[serde(default)]
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignUpBody {
    #[serde(default)]
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) email: String,
    #[serde(default)]
    pub(crate) phone: String,
    #[serde(default)]
    pub(crate) password: String,
}

/// Endpoints the client talks to, backed by in-memory data.
pub(crate) fn stub_router(state: StubState) -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/signin", post(sign_in))
        .route("/signup/user-info", post(sign_up))
        .route("/identity/:provider/me", get(identity_profile))
        .route("/google-signin", post(google_sign_in))
        .route("/facebook-signin", post(facebook_sign_in))
        .route("/delete-post/:id", delete(delete_post))
        .route("/property/verify", post(verify_property))
        .layer(DefaultBodyLimit::max(UPLOAD_LIMIT))
        .layer(Extension(state))
}

pub(crate) async fn healthcheck() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<StubState>) -> Reply {
    if state.readiness.load(std::sync::atomic::Ordering::Relaxed) {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "initializing" })),
        )
    }
}

pub(crate) async fn sign_in(
    Extension(state): Extension<StubState>,
    Json(body): Json<CredentialsBody>,
) -> Reply {
    let data = state.data();
    match data.account(&body.email) {
        Some(account) if !body.password.is_empty() && account.password == body.password => {
            (
                StatusCode::OK,
                Json(json!({ "success": true, "user": account.user })),
            )
        }
        _ => (
            StatusCode::OK,
            Json(json!({
                "success": false,
                "message": "Your Password or Username is wrong"
            })),
        ),
    }
}

pub(crate) async fn sign_up(
    Extension(state): Extension<StubState>,
    Json(body): Json<SignUpBody>,
) -> Reply {
    let blank: Vec<&str> = [
        ("name", &body.name),
        ("email", &body.email),
        ("phone", &body.phone),
        ("password", &body.password),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(name, _)| name)
    .collect();
    if !blank.is_empty() {
        return rejection(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Missing: {}", blank.join(", ")),
        );
    }

    let mut data = state.data();
    if data.account(&body.email).is_some() {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "error", "error": "Email already registered" })),
        );
    }
    let user = data.register(&body.name, &body.email, &body.phone, &body.password);
    info!(email = %body.email, "stub account created");
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "user": user })),
    )
}

/// Stand-in for a provider's "who am I" endpoint.
pub(crate) async fn identity_profile(Path(provider): Path<String>, headers: HeaderMap) -> Reply {
    if provider != "google" && provider != "facebook" {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown provider" })),
        );
    }
    let Some(token) = bearer_token(&headers) else {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "missing bearer token" })),
        );
    };
    (
        StatusCode::OK,
        Json(json!({
            "id": format!("{provider}-{token}"),
            "email": format!("{token}@{provider}.example"),
            "name": format!("{provider} user"),
        })),
    )
}

pub(crate) async fn google_sign_in(
    Extension(state): Extension<StubState>,
    Json(body): Json<Value>,
) -> Reply {
    exchange(&state, "google", &body)
}

pub(crate) async fn facebook_sign_in(
    Extension(state): Extension<StubState>,
    Json(body): Json<Value>,
) -> Reply {
    exchange(&state, "facebook", &body)
}

fn exchange(state: &StubState, provider: &str, body: &Value) -> Reply {
    let profile = &body["profile"];
    let (Some(profile_id), Some(email)) = (
        profile.get("id").and_then(Value::as_str),
        profile.get("email").and_then(Value::as_str),
    ) else {
        return rejection(StatusCode::OK, "profile is incomplete".to_string());
    };

    let mut data = state.data();
    let user = match data.account(email) {
        Some(account) => account.user.clone(),
        None => {
            let name = profile
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(email);
            data.register(name, email, "", "")
        }
    };
    info!(provider, profile_id, "stub identity exchange");
    (
        StatusCode::OK,
        Json(json!({
            "message": "success",
            "data": { "user": user, "provider": provider, "profile_id": profile_id }
        })),
    )
}

pub(crate) async fn delete_post(
    Extension(state): Extension<StubState>,
    Path(id): Path<String>,
) -> Reply {
    if state.data().listings.remove(&id) {
        info!(listing = %id, "stub listing deleted");
        (StatusCode::OK, Json(json!({ "success": true })))
    } else {
        rejection(StatusCode::NOT_FOUND, "Listing not found".to_string())
    }
}

pub(crate) async fn verify_property(
    Extension(state): Extension<StubState>,
    mut multipart: Multipart,
) -> Reply {
    let mut text: HashMap<String, String> = HashMap::new();
    let mut files: BTreeMap<String, Value> = BTreeMap::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return rejection(StatusCode::BAD_REQUEST, err.body_text()),
        };
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        match file_name {
            Some(file_name) => match field.bytes().await {
                Ok(bytes) => {
                    files.insert(
                        name,
                        json!({
                            "file_name": file_name,
                            "content_type": content_type,
                            "bytes": bytes.len(),
                        }),
                    );
                }
                Err(err) => return rejection(StatusCode::BAD_REQUEST, err.body_text()),
            },
            None => match field.text().await {
                Ok(value) => {
                    text.insert(name, value);
                }
                Err(err) => return rejection(StatusCode::BAD_REQUEST, err.body_text()),
            },
        }
    }

    let missing: Vec<&str> = REQUIRED_TEXT
        .into_iter()
        .filter(|name| text.get(*name).map_or(true, |value| value.trim().is_empty()))
        .chain(
            REQUIRED_FILES
                .into_iter()
                .filter(|name| !files.contains_key(*name)),
        )
        .collect();
    if !missing.is_empty() {
        return rejection(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Missing: {}", missing.join(", ")),
        );
    }

    let property_id = text.remove("property_id").unwrap_or_default();
    info!(%property_id, "stub verification received");
    state.data().verifications.push(json!({
        "property_id": property_id,
        "full_name": text.remove("full_name"),
        "phone_number": text.remove("phone_number"),
        "documents": files,
        "received_at": Utc::now().to_rfc3339(),
    }));
    (
        StatusCode::OK,
        Json(json!({ "success": true, "message": "Documents received" })),
    )
}

fn rejection(status: StatusCode, message: String) -> Reply {
    (
        status,
        Json(json!({ "success": false, "message": message })),
    )
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
