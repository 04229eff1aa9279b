/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskcamp_api::{app::AppState, config::Config};
/// use taskcamp_shared::gateway::{mail::LogMailer, storage::InMemoryStorage};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(
///     pool,
///     config,
///     Arc::new(InMemoryStorage::new()),
///     Arc::new(LogMailer),
/// );
/// let app = taskcamp_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use taskcamp_shared::auth::jwt;
use taskcamp_shared::gateway::{mail::MailGateway, storage::StorageGateway};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use uuid::Uuid;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Uses Arc internally for cheap cloning.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// File storage backend for attachments
    pub storage: Arc<dyn StorageGateway>,

    /// Mail backend for verification and reset emails
    pub mailer: Arc<dyn MailGateway>,
}

impl AppState {
    /// Creates new application state
    pub fn new(
        db: PgPool,
        config: Config,
        storage: Arc<dyn StorageGateway>,
        mailer: Arc<dyn MailGateway>,
    ) -> Self {
        Self {
            db,
            config: Arc::new(config),
            storage,
            mailer,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Authenticated caller, injected into request extensions by the JWT layer
#[derive(Debug, Clone, Copy)]
pub struct AuthContext {
    /// The authenticated user's ID
    pub user_id: Uuid,
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// The router is organized as follows:
/// ```text
/// /
/// ├── /health                               # Health check (public)
/// ├── /v1/
/// │   ├── /auth/                            # Authentication
/// │   │   ├── POST /register                # (public)
/// │   │   ├── GET  /verify-email/:token     # (public)
/// │   │   ├── POST /resend-verification     # (public)
/// │   │   ├── POST /login                   # (public)
/// │   │   ├── POST /refresh                 # (public)
/// │   │   ├── POST /forgot-password         # (public)
/// │   │   ├── POST /reset-password/:token   # (public)
/// │   │   ├── POST /logout                  # (JWT)
/// │   │   ├── POST /change-password         # (JWT)
/// │   │   └── GET  /me                      # (JWT)
/// │   └── /projects/                        # Everything below requires JWT;
/// │       │                                 # per-project role checks happen
/// │       │                                 # inside the handlers
/// │       ├── CRUD on projects, members, tasks,
/// │       ├── task attachments, subtasks, and notes
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
/// 4. Authentication (per-subtree JWT layer)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes reachable without a token
    let public_auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/verify-email/:token", get(routes::auth::verify_email))
        .route(
            "/resend-verification",
            post(routes::auth::resend_verification),
        )
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh))
        .route("/forgot-password", post(routes::auth::forgot_password))
        .route("/reset-password/:token", post(routes::auth::reset_password));

    // Auth routes that act on the logged-in user
    let protected_auth_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/change-password", post(routes::auth::change_password))
        .route("/me", get(routes::auth::me))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Project routes: JWT required for everything; role checks per handler
    let project_routes = Router::new()
        .route("/", get(routes::projects::list_projects))
        .route("/", post(routes::projects::create_project))
        .route("/:project_id", get(routes::projects::get_project))
        .route("/:project_id", put(routes::projects::update_project))
        .route("/:project_id", delete(routes::projects::delete_project))
        .route("/:project_id/leave", post(routes::projects::leave_project))
        .route("/:project_id/members", get(routes::members::list_members))
        .route("/:project_id/members", post(routes::members::add_member))
        .route(
            "/:project_id/members/:user_id",
            put(routes::members::update_member_role),
        )
        .route(
            "/:project_id/members/:user_id",
            delete(routes::members::remove_member),
        )
        .route("/:project_id/tasks", get(routes::tasks::list_tasks))
        .route("/:project_id/tasks", post(routes::tasks::create_task))
        .route("/:project_id/tasks/:task_id", get(routes::tasks::get_task))
        .route(
            "/:project_id/tasks/:task_id",
            put(routes::tasks::update_task),
        )
        .route(
            "/:project_id/tasks/:task_id",
            delete(routes::tasks::delete_task),
        )
        .route(
            "/:project_id/tasks/:task_id/attachments",
            post(routes::tasks::add_attachments),
        )
        .route(
            "/:project_id/tasks/:task_id/attachments/:file_id",
            delete(routes::tasks::delete_attachment),
        )
        .route(
            "/:project_id/tasks/:task_id/subtasks",
            get(routes::subtasks::list_subtasks),
        )
        .route(
            "/:project_id/tasks/:task_id/subtasks",
            post(routes::subtasks::create_subtask),
        )
        .route(
            "/:project_id/tasks/:task_id/subtasks/:subtask_id",
            put(routes::subtasks::update_subtask),
        )
        .route(
            "/:project_id/tasks/:task_id/subtasks/:subtask_id/status",
            patch(routes::subtasks::update_subtask_status),
        )
        .route(
            "/:project_id/tasks/:task_id/subtasks/:subtask_id",
            delete(routes::subtasks::delete_subtask),
        )
        .route("/:project_id/notes", get(routes::notes::list_notes))
        .route("/:project_id/notes", post(routes::notes::create_note))
        .route(
            "/:project_id/notes/:note_id",
            get(routes::notes::get_note),
        )
        .route(
            "/:project_id/notes/:note_id",
            put(routes::notes::update_note),
        )
        .route(
            "/:project_id/notes/:note_id",
            delete(routes::notes::delete_note),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Build complete v1 API
    let v1_routes = Router::new()
        .nest("/auth", public_auth_routes.merge(protected_auth_routes))
        .nest("/projects", project_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.is_empty() {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the access token from the Authorization header,
/// then injects [`AuthContext`] into request extensions.
async fn jwt_auth_layer(
    state: axum::extract::State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, crate::error::ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            crate::error::ApiError::Unauthorized("Missing authorization header".to_string())
        })?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| crate::error::ApiError::BadRequest("Expected Bearer token".to_string()))?;

    let claims = jwt::validate_access_token(token, state.jwt_secret())?;

    req.extensions_mut().insert(AuthContext {
        user_id: claims.sub,
    });

    Ok(next.run(req).await)
}
