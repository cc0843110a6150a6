//! Demo-only routes around the authorize flow.
//!
//! `/` bounces the browser into the issuer's authorize endpoint with a
//! placeholder client id; `/callback` echoes whatever query parameters came
//! back. Both match on path alone, whatever the method. Neither performs a
//! real code exchange - a relying party would call the issuer's token
//! endpoint with the code instead.

use std::collections::BTreeMap;

use axum::extract::Query;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde_json::json;
use url::Url;

use crate::AppResources;

/// Tag for OpenAPI documentation.
pub const DEMO_TAG: &str = "Demo";

/// Scheme + authority of the request as seen by the client. The gateway
/// never terminates TLS itself, so the scheme comes from `X-Forwarded-Proto`
/// set by the edge, defaulting to https.
fn request_origin(headers: &HeaderMap) -> String {
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("https");
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    format!("{scheme}://{host}")
}

/// Demo entry point: redirect into the issuer's authorize endpoint.
#[tracing::instrument(skip(resources, headers, params))]
#[utoipa::path(
    method(get, post, put, delete, patch, head),
    path = "/",
    tag = DEMO_TAG,
    operation_id = "Demo Authorize Redirect",
    summary = "Redirect into the authorization code flow",
    description = "Builds an authorize URL on the request's own origin with `redirect_uri=<origin>/callback`, \
                   the configured demo client id and `response_type=code`, preserving any incoming query \
                   parameters. Demo scaffolding only: the client id is a placeholder.",
    responses(
        (status = 302, description = "Redirect to the issuer's authorize endpoint"),
        (status = 400, description = "The request origin could not be determined")
    )
)]
pub async fn authorize_redirect(
    Extension(resources): Extension<AppResources>,
    headers: HeaderMap,
    Query(params): Query<BTreeMap<String, String>>,
) -> Response {
    let origin = request_origin(&headers);
    let mut target = match Url::parse(&origin) {
        Ok(url) => url,
        Err(e) => {
            tracing::error!(origin = %origin, error = %e, "Unusable request origin");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };
    target.set_path("/authorize");
    {
        let mut query = target.query_pairs_mut();
        for (key, value) in &params {
            // The three flow parameters are always ours, whatever came in.
            if !matches!(key.as_str(), "redirect_uri" | "client_id" | "response_type") {
                query.append_pair(key, value);
            }
        }
        query.append_pair("redirect_uri", &format!("{origin}/callback"));
        query.append_pair("client_id", &resources.config.demo.client_id);
        query.append_pair("response_type", "code");
    }

    (
        StatusCode::FOUND,
        [(header::LOCATION, target.to_string())],
    )
        .into_response()
}

/// Demo landing spot for the authorization redirect.
#[tracing::instrument(skip(params))]
#[utoipa::path(
    method(get, post, put, delete, patch, head),
    path = "/callback",
    tag = DEMO_TAG,
    operation_id = "Demo Callback Echo",
    summary = "Echo the authorization callback parameters",
    description = "Returns the query parameters the issuer redirected back with, typically `code` and `state`. \
                   Does not validate or exchange the authorization code.",
    responses(
        (status = 200, description = "Callback parameters as JSON", content_type = "application/json")
    )
)]
pub async fn callback(Query(params): Query<BTreeMap<String, String>>) -> impl IntoResponse {
    Json(json!({
        "message": "OAuth flow complete!",
        "params": params,
    }))
}
