//! HIE integration engine entry point.
//!
//! Boots the workflow engine and exposes its HTTP surface:
//! - `POST /notify`: DSUB notification sink for the broker
//! - `GET /patient`: patient demographics lookup against the PDQ endpoint
//! - `POST /definitions`: deploy workflow definitions and open subscriptions
//!
//! Configuration is read once from the environment at startup; handlers never
//! touch `std::env`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use hie_engine::{Engine, EngineConfig};
use hie_pdq::{QueryOutcome, ServerVariant};
use hie_types::Subscription;

#[derive(Clone)]
struct AppState {
    engine: Arc<Engine>,
}

/// Environment variables:
/// - `HIE_ADDR`: listen address (default: "0.0.0.0:8080")
/// - `HIE_BROKER_URL`: DSUB broker endpoint
/// - `HIE_CONSUMER_URL`: address the broker should deliver notifications to
/// - `HIE_PDQ_URL`: patient demographics endpoint
/// - `HIE_PDQ_SERVER`: "pdqv3", "pixv3" or "pixm" (default: "pixm")
/// - `HIE_STORE_URL`: persistence service base URL
/// - `HIE_REG_OID`: regional assigning authority OID
/// - `HIE_NHS_OID`: national assigning authority OID (defaulted when unset)
/// - `HIE_DEFINITIONS_DIR`: directory scanned for workflow definitions
/// - `HIE_PATIENT_CACHE`: demographics cache TTL in seconds (cache off when unset)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("hie=info".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr: SocketAddr = std::env::var("HIE_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()?;

    let pdq_server: ServerVariant = std::env::var("HIE_PDQ_SERVER")
        .unwrap_or_else(|_| "pixm".into())
        .parse()?;
    let cache_ttl = match std::env::var("HIE_PATIENT_CACHE") {
        Ok(secs) => Some(Duration::from_secs(secs.parse()?)),
        Err(_) => None,
    };

    let config = EngineConfig::new(
        std::env::var("HIE_BROKER_URL").unwrap_or_default(),
        std::env::var("HIE_CONSUMER_URL").unwrap_or_default(),
        std::env::var("HIE_PDQ_URL").unwrap_or_default(),
        pdq_server,
        std::env::var("HIE_STORE_URL").unwrap_or_default(),
        std::env::var("HIE_REG_OID").unwrap_or_default(),
        std::env::var("HIE_NHS_OID").unwrap_or_default(),
        PathBuf::from(
            std::env::var("HIE_DEFINITIONS_DIR").unwrap_or_else(|_| "/definitions".into()),
        ),
        cache_ttl,
    )?;
    let engine = Arc::new(Engine::new(config)?);

    tracing::info!("++ Starting HIE engine on {}", addr);

    let app = Router::new()
        .route("/notify", post(notify))
        .route("/patient", get(patient))
        .route("/definitions", post(register_definitions))
        .layer(CorsLayer::permissive())
        .with_state(AppState { engine });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Notification sink for the DSUB broker.
///
/// The broker expects a SOAP acknowledgement whether or not the message could
/// be correlated, so a fixed ack body is returned on every handled message.
/// Only an unparseable envelope yields an error status.
async fn notify(
    State(state): State<AppState>,
    body: String,
) -> Result<([(header::HeaderName, &'static str); 1], &'static str), (StatusCode, String)> {
    match state.engine.handle_notification(&body).await {
        Ok(()) => Ok((
            [(header::CONTENT_TYPE, "application/soap+xml")],
            Engine::ack(),
        )),
        Err(e) => {
            tracing::error!("notification rejected: {e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[derive(Deserialize)]
struct PatientParams {
    /// Local (MRN) id and its issuing-authority OID.
    #[serde(default)]
    pid: String,
    #[serde(default)]
    pidoid: String,
    #[serde(default)]
    nhs: String,
    #[serde(default)]
    reg: String,
    /// Per-request identity-server override.
    #[serde(default)]
    server: Option<String>,
    /// `cache=false` bypasses the result cache for this lookup.
    #[serde(default)]
    cache: Option<bool>,
}

/// Demographics lookup. Identifier precedence is MRN, then national id, then
/// regional id; a request with none of them is a bad request.
async fn patient(
    State(state): State<AppState>,
    Query(params): Query<PatientParams>,
) -> Result<Json<QueryOutcome>, (StatusCode, String)> {
    let server = match params.server.as_deref() {
        Some(name) => Some(
            name.parse::<ServerVariant>()
                .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
        ),
        None => None,
    };
    let fresh = !params.cache.unwrap_or(true);
    match state
        .engine
        .find_patient(&params.pid, &params.pidoid, &params.nhs, &params.reg, server, fresh)
        .await
    {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            tracing::error!("patient lookup failed: {e}");
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
    }
}

/// Deploys every pending workflow definition and reports the subscriptions
/// opened for them.
async fn register_definitions(
    State(state): State<AppState>,
) -> Result<Json<Vec<Subscription>>, (StatusCode, String)> {
    match state.engine.register_definitions().await {
        Ok(subscriptions) => Ok(Json(subscriptions)),
        Err(e) => {
            tracing::error!("definition registration failed: {e}");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
