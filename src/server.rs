//!
//! vetdesk HTTP server
//! -------------------
//! Axum surface for the auth core. Mounts the credential routes (login,
//! registration, logout, password reset) and the middleware layers the CRUD
//! routers compose per route: `authenticate` resolves the caller into a
//! `Principal` attached to request extensions, `require_role` gates on a
//! role with the admin override.
//!
//! Responsibilities:
//! - Login/registration/reset endpoints issuing session tokens.
//! - Dual transport on issuance: token in the JSON body for native clients,
//!   HttpOnly cookie for browsers.
//! - Admin-only user listing as the reference role-gated route.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use chrono::Utc;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::identity::{authorize, Principal, Role, SessionResolver, TOKEN_COOKIE};
use crate::password;
use crate::store::{MemoryUserStore, UserRecord, UserStore};
use crate::token::TokenCodec;
use crate::validate::{FieldRule, Schema};

/// Reset tokens live for one hour.
const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Delivery seam for password-reset tokens. The mail transport is an
/// external collaborator; tests register a capturing implementation.
pub trait ResetNotifier: Send + Sync {
    fn deliver(&self, email: &str, token: &str);
}

/// Shared server state injected into all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub codec: Arc<TokenCodec>,
    pub resolver: Arc<SessionResolver>,
    pub users: Arc<dyn UserStore>,
    pub notifier: Option<Arc<dyn ResetNotifier>>,
}

impl AppState {
    pub fn new(config: AppConfig, users: Arc<dyn UserStore>) -> Self {
        let codec = Arc::new(TokenCodec::new(&config));
        let resolver = Arc::new(SessionResolver::new(codec.clone(), users.clone()));
        Self {
            config: Arc::new(config),
            codec,
            resolver,
            users,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ResetNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

/// Start the vetdesk HTTP server with an in-process user store.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
    let state = AppState::new(config.clone(), users);
    let app = build_router(state);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Mount all routes. Protected routes sit behind `authenticate`; the user
/// listing additionally demands the admin role.
pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/users", get(list_users))
        .route_layer(middleware::from_fn(|req: Request, next: Next| {
            require_role(Role::Admin, req, next)
        }));

    let protected = Router::new()
        .route("/me", get(me))
        .route("/logout", post(logout))
        .merge(admin_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/health", get(health))
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/password/forgot", post(forgot_password))
        .route("/password/reset", post(reset_password))
        .merge(protected)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

/// Resolve the caller and attach the `Principal` to request extensions.
/// Every authentication failure terminates here; business handlers never
/// see an unauthenticated request.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = state.resolver.resolve(req.headers()).await?;
    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Gate a route on `required`. Compose after `authenticate`:
///
/// ```ignore
/// router.route_layer(middleware::from_fn(|req, next| {
///     require_role(Role::Vet, req, next)
/// }))
/// ```
pub async fn require_role(
    required: Role,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    authorize(req.extensions().get::<Principal>(), required)?;
    Ok(next.run(req).await)
}

// ---------------------------------------------------------------------------
// Body schemas
// ---------------------------------------------------------------------------

static LOGIN_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("username", FieldRule::string().min_len(1))
        .field("password", FieldRule::string().min_len(1))
        .deny_unknown()
});

static REGISTER_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field(
            "username",
            FieldRule::string()
                .min_len(3)
                .max_len(40)
                .pattern(r"^[A-Za-z0-9_.-]+$"),
        )
        .field("email", FieldRule::string().pattern(r"^\S+@\S+\.\S+$"))
        .field("password", FieldRule::string().min_len(8))
        .field("role", FieldRule::string().optional().one_of(&["vet", "receptionist"]))
        .field("last_name", FieldRule::string().optional().max_len(80))
        .field(
            "phone",
            FieldRule::string().optional().pattern(r"^\+?[0-9 ()-]{7,20}$"),
        )
        .field("specialty", FieldRule::string().optional().max_len(80))
        .deny_unknown()
});

static FORGOT_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("username", FieldRule::string().min_len(1))
        .deny_unknown()
});

static RESET_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("token", FieldRule::string().min_len(1))
        .field("password", FieldRule::string().min_len(8))
        .deny_unknown()
});

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    username: String,
    email: String,
    password: String,
    role: Option<Role>,
    last_name: Option<String>,
    phone: Option<String>,
    specialty: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForgotPayload {
    username: String,
}

#[derive(Debug, Deserialize)]
struct ResetPayload {
    token: String,
    password: String,
}

async fn health() -> &'static str {
    "vetdesk ok"
}

async fn login(State(state): State<AppState>, Json(body): Json<Value>) -> AppResult<Response> {
    LOGIN_SCHEMA.validate(&body).map_err(AppError::Validation)?;
    let payload: LoginPayload =
        serde_json::from_value(body).map_err(|e| AppError::Validation(vec![e.to_string()]))?;

    let user = state
        .users
        .find_by_username(&payload.username)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Invalid username or password".to_string()))?;

    // Argon2 verification is CPU-heavy on purpose; keep it off the runtime
    // threads.
    let hash = user.password_hash.clone();
    let secret = payload.password.clone();
    let ok = tokio::task::spawn_blocking(move || password::verify_password(&hash, &secret))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !ok || !user.active {
        return Err(AppError::Unauthenticated(
            "Invalid username or password".to_string(),
        ));
    }

    let token = state.codec.issue(&user.id)?;
    info!(user = %user.username, "login");
    Ok(session_response(StatusCode::OK, &token, &user))
}

async fn register(State(state): State<AppState>, Json(body): Json<Value>) -> AppResult<Response> {
    REGISTER_SCHEMA.validate(&body).map_err(AppError::Validation)?;
    let payload: RegisterPayload =
        serde_json::from_value(body).map_err(|e| AppError::Validation(vec![e.to_string()]))?;

    // The first account bootstraps the administrator; the role field only
    // offers domain roles, so admin is never client-assignable afterwards.
    let role = if state.users.is_empty().await? {
        Role::Admin
    } else {
        payload.role.unwrap_or(Role::Receptionist)
    };

    let pw = payload.password.clone();
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&pw))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let mut record = UserRecord::new(&payload.username, &payload.email, &hash, role);
    record.last_name = payload.last_name;
    record.phone = payload.phone;
    record.specialty = payload.specialty;

    let created = state.users.insert(record).await?;
    let token = state.codec.issue(&created.id)?;
    info!(user = %created.username, role = %created.role, "user registered");
    Ok(session_response(StatusCode::CREATED, &token, &created))
}

async fn logout() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, clear_session_cookie());
    (StatusCode::OK, headers, Json(json!({"status": "ok"}))).into_response()
}

async fn me(Extension(principal): Extension<Principal>) -> Json<Principal> {
    Json(principal)
}

async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<Principal>>> {
    let users = state.users.list_all().await?;
    Ok(Json(users.iter().map(Principal::from).collect()))
}

async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<Json<Value>> {
    FORGOT_SCHEMA.validate(&body).map_err(AppError::Validation)?;
    let payload: ForgotPayload =
        serde_json::from_value(body).map_err(|e| AppError::Validation(vec![e.to_string()]))?;

    // Respond identically whether or not the account exists.
    if let Some(user) = state.users.find_by_username(&payload.username).await? {
        if user.active {
            let token = random_token();
            let expires = Utc::now() + chrono::Duration::hours(RESET_TOKEN_TTL_HOURS);
            state.users.set_reset_token(&user.id, &token, expires).await?;
            if let Some(notifier) = &state.notifier {
                notifier.deliver(&user.email, &token);
            }
            info!(user = %user.username, "password reset requested");
        }
    }
    Ok(Json(json!({"status": "ok"})))
}

async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> AppResult<Response> {
    RESET_SCHEMA.validate(&body).map_err(AppError::Validation)?;
    let payload: ResetPayload =
        serde_json::from_value(body).map_err(|e| AppError::Validation(vec![e.to_string()]))?;

    let rejected = || AppError::Unauthenticated("Invalid or expired reset token".to_string());
    let user = state
        .users
        .find_by_reset_token(&payload.token)
        .await?
        .ok_or_else(rejected)?;
    let expired = user
        .reset_expires
        .map(|t| t < Utc::now())
        .unwrap_or(true);
    if expired || !user.active {
        return Err(rejected());
    }

    let pw = payload.password.clone();
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&pw))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .map_err(|e| AppError::Internal(e.to_string()))?;

    state.users.update_password(&user.id, &hash).await?;
    state.users.clear_reset_token(&user.id).await?;

    let token = state.codec.issue(&user.id)?;
    info!(user = %user.username, "password reset completed");
    Ok(session_response(StatusCode::OK, &token, &user))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Token + safe projection in the body for native clients, HttpOnly cookie
/// for browsers.
fn session_response(status: StatusCode, token: &str, user: &UserRecord) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, session_cookie(token));
    (
        status,
        headers,
        Json(json!({"token": token, "user": Principal::from(user)})),
    )
        .into_response()
}

fn session_cookie(token: &str) -> HeaderValue {
    // Secure, HttpOnly cookie scoped to path / with SameSite=Strict
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; Secure; SameSite=Strict; Path=/",
        TOKEN_COOKIE, token
    ))
    .unwrap()
}

fn clear_session_cookie() -> HeaderValue {
    HeaderValue::from_str(&format!(
        "{}=deleted; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; Secure; SameSite=Strict; Path=/",
        TOKEN_COOKIE
    ))
    .unwrap()
}

/// 256-bit random token, hex encoded.
fn random_token() -> String {
    let mut bytes = [0u8; 32];
    let _ = getrandom::getrandom(&mut bytes);
    let mut out = String::with_capacity(64);
    use std::fmt::Write as _;
    for b in &bytes {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
