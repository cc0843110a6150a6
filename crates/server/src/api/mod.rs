//! HTTP surface of the gateway.
//!
//! This module is organized into submodules:
//! - `demo` - demo redirect (`/`) and callback echo (`/callback`)
//! - `health` - health check endpoint (/healthz)
//! - `openapi` - OpenAPI/Utoipa configuration
//!
//! Everything not routed here falls back to the issuer collaborator.

pub mod demo;
pub mod health;
pub mod openapi;

pub use demo::DEMO_TAG;
pub use health::MISC_TAG;

use axum::extract::Request;
use axum::response::Response;
use axum::{Extension, Router, middleware};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

use crate::AppResources;
use crate::cors::{self, CorsPolicy};
use crate::issuer::IssuerHandle;

/// Assemble the gateway router.
///
/// Branch order matches the request contract: the CORS middleware answers
/// every `OPTIONS` preflight first, the demo and health routes match their
/// exact paths, and everything else falls through to the issuer. The
/// middleware also overwrites the three CORS headers on every response,
/// including the issuer's.
pub fn app(resources: AppResources, issuer: IssuerHandle, policy: CorsPolicy) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .routes(routes!(demo::authorize_redirect))
        .routes(routes!(demo::callback))
        .routes(routes!(health::health))
        .split_for_parts();

    router
        .merge(Redoc::with_url("/api-docs", api))
        .fallback(delegate)
        .layer(Extension(resources))
        .layer(Extension(issuer))
        .layer(middleware::from_fn_with_state(policy, cors::enforce))
        .layer(TraceLayer::new_for_http())
}

/// Forward anything the gateway does not own (authorize, token, provider
/// paths) verbatim to the issuer collaborator.
async fn delegate(Extension(issuer): Extension<IssuerHandle>, request: Request) -> Response {
    issuer.handle(request).await
}

/// Starts the web server with all configured routes.
#[tracing::instrument(skip(resources, issuer, policy))]
pub async fn start_webserver(
    resources: AppResources,
    issuer: IssuerHandle,
    policy: CorsPolicy,
) -> color_eyre::Result<()> {
    let router = app(resources, issuer, policy);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!(addr = "0.0.0.0:8080", "Gateway listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .map_err(|e| color_eyre::Report::msg(format!("Failed to start server: {e}")))?;

    Ok(())
}
