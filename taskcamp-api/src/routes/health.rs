/// Health check endpoint
///
/// `GET /health` answers without authentication and reports whether the
/// process is up and can reach PostgreSQL. Load balancers and deploy
/// scripts poll it.
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected"
/// }
/// ```
///
/// `status` degrades to `"degraded"` when the database probe fails; the
/// endpoint itself still returns 200 so the probe distinguishes "server
/// down" from "database down".

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: "healthy" or "degraded"
    pub status: String,

    /// Application version
    pub version: String,

    /// Database probe result: "connected" or "disconnected"
    pub database: String,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let database_ok = sqlx::query("SELECT 1").fetch_one(&state.db).await.is_ok();

    let (status, database) = if database_ok {
        ("healthy", "connected")
    } else {
        ("degraded", "disconnected")
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serializes() {
        let response = HealthResponse {
            status: "healthy".to_string(),
            version: "0.1.0".to_string(),
            database: "connected".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"], "connected");
    }
}
