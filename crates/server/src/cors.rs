//! Fixed CORS policy stamped onto every gateway response.
//!
//! The policy is immutable process-wide configuration: built once at startup
//! from [`CorsConfig`] and cloned into the middleware. Preflights terminate
//! here; every other response (including whatever the issuer produced) gets
//! the three headers overwritten on the way out.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::{ConfigError, CorsConfig};

#[derive(Clone, Debug)]
pub struct CorsPolicy {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            allow_origin: parse_header_value("allow_origin", &config.allow_origin)?,
            allow_methods: parse_header_value("allow_methods", &config.allow_methods)?,
            allow_headers: parse_header_value("allow_headers", &config.allow_headers)?,
        })
    }

    /// Overwrite the three CORS headers, leaving everything else untouched.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            self.allow_origin.clone(),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            self.allow_methods.clone(),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            self.allow_headers.clone(),
        );
    }
}

fn parse_header_value(name: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|_| {
        ConfigError::Validation(format!("cors.{name} is not a valid header value: {value}"))
    })
}

/// CORS middleware for the whole router.
///
/// `OPTIONS` requests are terminal: 204, no body, policy headers only. All
/// other requests run the inner service first and have the policy headers
/// overwritten on the response afterwards.
pub async fn enforce(
    State(policy): State<CorsPolicy>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        policy.apply(response.headers_mut());
        return response;
    }

    let mut response = next.run(request).await;
    policy.apply(response.headers_mut());
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_deployment_values() {
        let policy = CorsPolicy::from_config(&CorsConfig::default()).expect("policy");
        let mut headers = HeaderMap::new();
        policy.apply(&mut headers);
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://safemore.pl"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
            "GET, POST, OPTIONS"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
            "Content-Type, Authorization"
        );
    }

    #[test]
    fn apply_overwrites_existing_values() {
        let policy = CorsPolicy::from_config(&CorsConfig::default()).expect("policy");
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("https://issuer.invalid"),
        );
        headers.insert("x-other", HeaderValue::from_static("kept"));
        policy.apply(&mut headers);
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://safemore.pl"
        );
        assert_eq!(headers.get("x-other").unwrap(), "kept");
    }

    #[test]
    fn rejects_unrepresentable_header_values() {
        let config = CorsConfig {
            allow_origin: "https://safemore.pl\n".to_string(),
            ..CorsConfig::default()
        };
        assert!(CorsPolicy::from_config(&config).is_err());
    }
}
