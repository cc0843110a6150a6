//! The external issuer collaborator.
//!
//! The entire OAuth/OIDC issuance flow - authorize, token exchange, code
//! storage, login UI - lives in an external component the gateway consumes
//! through the one-operation [`Issuer`] trait. [`HttpIssuer`] is the shipped
//! integration: it forwards requests verbatim to an upstream issuer service,
//! except for the two callback paths the upstream invokes on the gateway
//! (subject minting on login success, one-time code delivery), which the
//! integration answers itself from its [`IssuerOptions`].

use std::sync::Arc;

use async_trait::async_trait;
use axum::Json;
use axum::body::Body;
use axum::http::{HeaderValue, Method, Request, Response, StatusCode, Uri, header};
use axum::response::IntoResponse;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use rustls::{ClientConfig, RootCertStore};
use rustls_pki_types::ServerName;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use url::Url;

use crate::config::{ConfigError, IssuerConfig, ThemeConfig};
use crate::delivery::CodeSender;
use crate::error::ProvisionError;
use crate::provision::SubjectMinter;

/// Invoked by the upstream issuer after password verification succeeds.
pub const SUCCESS_CALLBACK_PATH: &str = "/provision/success";
/// Invoked by the upstream issuer whenever a one-time code is generated.
pub const CODE_CALLBACK_PATH: &str = "/provision/code";

/// One-operation contract of the issuer collaborator.
///
/// Failures inside the issuer surface as whatever response it chooses; the
/// gateway performs no translation beyond the CORS overwrite applied by the
/// router layer.
#[async_trait]
pub trait Issuer: Send + Sync {
    async fn handle(&self, request: Request<Body>) -> Response<Body>;
}

/// Shared handle used by the router fallback.
pub type IssuerHandle = Arc<dyn Issuer>;

/// UI copy overrides for the issuer's password provider.
#[derive(Clone, Debug)]
pub struct UiCopy {
    pub input_code: String,
}

impl Default for UiCopy {
    fn default() -> Self {
        Self {
            input_code: "Code (check service logs)".to_string(),
        }
    }
}

/// Configuration contract consumed by issuer integrations.
///
/// The subject schema is fixed (`user { id }`, see
/// [`crate::provision::Subject`]); the rest parameterizes the password
/// provider and its UI. The shipped [`HttpIssuer`] answers the upstream's
/// success and code callbacks from these options; theme and copy are
/// rendered by the upstream's own login UI.
#[derive(Clone)]
pub struct IssuerOptions {
    pub theme: ThemeConfig,
    pub copy: UiCopy,
    /// Invoked by the password provider with `(email, code)`.
    pub code_sender: Arc<dyn CodeSender>,
    /// Success callback: mints the subject after password verification.
    pub success: SubjectMinter,
}

impl IssuerOptions {
    pub fn new(theme: ThemeConfig, code_sender: Arc<dyn CodeSender>, success: SubjectMinter) -> Self {
        Self {
            theme,
            copy: UiCopy::default(),
            code_sender,
            success,
        }
    }
}

#[derive(Debug, Error)]
enum ForwardError {
    #[error("Failed to connect to issuer: {0}")]
    Connect(std::io::Error),
    #[error("TLS error: {0}")]
    Tls(std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),
    #[error("Invalid forwarded request: {0}")]
    Request(#[from] axum::http::Error),
    #[error("Failed to read request body: {0}")]
    RequestBody(axum::Error),
}

/// Upstream issuer reachable over HTTP, dialed per request.
///
/// The callback paths are answered locally and never forwarded; the edge in
/// front of the gateway must keep them reachable only from the issuer
/// network.
pub struct HttpIssuer {
    host: String,
    port: u16,
    host_header: HeaderValue,
    tls: Option<(TlsConnector, ServerName<'static>)>,
    options: IssuerOptions,
}

/// Payload of [`SUCCESS_CALLBACK_PATH`].
#[derive(Debug, Deserialize)]
struct SuccessCallback {
    email: String,
}

/// Payload of [`CODE_CALLBACK_PATH`].
#[derive(Debug, Deserialize)]
struct CodeCallback {
    email: String,
    code: String,
}

async fn read_json<T: serde::de::DeserializeOwned>(
    request: Request<Body>,
) -> Result<T, Response<Body>> {
    let bytes = match request.into_body().collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return Err(StatusCode::BAD_REQUEST.into_response()),
    };
    serde_json::from_slice(&bytes).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Invalid callback payload: {e}"),
        )
            .into_response()
    })
}

impl HttpIssuer {
    pub fn from_config(config: &IssuerConfig, options: IssuerOptions) -> Result<Self, ConfigError> {
        let url = Url::parse(&config.upstream_url).map_err(|e| {
            ConfigError::Validation(format!(
                "issuer.upstream_url is not a valid URL ({}): {e}",
                config.upstream_url
            ))
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| {
                ConfigError::Validation("issuer.upstream_url is missing a host".into())
            })?
            .to_string();
        let port = url.port_or_known_default().ok_or_else(|| {
            ConfigError::Validation(format!(
                "issuer.upstream_url must use http or https, got {}",
                url.scheme()
            ))
        })?;

        let tls = match url.scheme() {
            "http" => None,
            "https" => {
                let mut roots = RootCertStore::empty();
                roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
                let tls_config = ClientConfig::builder()
                    .with_root_certificates(roots)
                    .with_no_client_auth();
                let server_name = ServerName::try_from(host.clone()).map_err(|_| {
                    ConfigError::Validation(format!("Invalid issuer host name: {host}"))
                })?;
                Some((TlsConnector::from(Arc::new(tls_config)), server_name))
            }
            other => {
                return Err(ConfigError::Validation(format!(
                    "issuer.upstream_url must use http or https, got {other}"
                )));
            }
        };

        let authority = if port == 80 || port == 443 {
            host.clone()
        } else {
            format!("{host}:{port}")
        };
        let host_header = HeaderValue::from_str(&authority).map_err(|_| {
            ConfigError::Validation(format!("Invalid issuer host name: {authority}"))
        })?;

        Ok(Self {
            host,
            port,
            host_header,
            tls,
            options,
        })
    }

    /// Success callback: provision a user for the verified email and return
    /// the subject the issuer embeds into its tokens.
    async fn mint_subject(&self, request: Request<Body>) -> Response<Body> {
        let callback: SuccessCallback = match read_json(request).await {
            Ok(callback) => callback,
            Err(response) => return response,
        };
        match self.options.success.mint(&callback.email).await {
            Ok(subject) => Json(json!({ "type": "user", "properties": subject })).into_response(),
            Err(e @ ProvisionError::NoRow { .. }) => {
                tracing::warn!(error = %e, "Subject minting yielded no user");
                (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()).into_response()
            }
            Err(e) => {
                tracing::error!(error = %e, "Subject minting failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }

    /// Code callback: hand the one-time code to the configured channel.
    async fn deliver_code(&self, request: Request<Body>) -> Response<Body> {
        let callback: CodeCallback = match read_json(request).await {
            Ok(callback) => callback,
            Err(response) => return response,
        };
        match self
            .options
            .code_sender
            .send_code(&callback.email, &callback.code)
            .await
        {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(e) => {
                tracing::error!(error = %e, "Code delivery failed");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }

    async fn forward(&self, request: Request<Body>) -> Result<Response<Body>, ForwardError> {
        let (mut parts, body) = request.into_parts();
        let bytes = body
            .collect()
            .await
            .map_err(ForwardError::RequestBody)?
            .to_bytes();

        // Keep path + query, swap the authority for the upstream's. The
        // body was collected, so a chunked transfer-encoding no longer holds.
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());
        parts.uri = Uri::try_from(path_and_query).map_err(axum::http::Error::from)?;
        parts.headers.insert(header::HOST, self.host_header.clone());
        parts.headers.remove(header::TRANSFER_ENCODING);
        let upstream_request = Request::from_parts(parts, Full::new(bytes));

        let stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(ForwardError::Connect)?;

        match &self.tls {
            Some((connector, server_name)) => {
                let tls_stream = connector
                    .connect(server_name.clone(), stream)
                    .await
                    .map_err(ForwardError::Tls)?;
                send_request(TokioIo::new(tls_stream), upstream_request).await
            }
            None => send_request(TokioIo::new(stream), upstream_request).await,
        }
    }
}

async fn send_request<T>(
    io: T,
    request: Request<Full<Bytes>>,
) -> Result<Response<Body>, ForwardError>
where
    T: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;
    tokio::task::spawn(async move {
        if let Err(err) = conn.await {
            tracing::error!("Issuer connection failed: {err:#?}");
        }
    });

    let response = sender.send_request(request).await?;
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await?.to_bytes();
    Ok(Response::from_parts(parts, Body::from(bytes)))
}

#[async_trait]
impl Issuer for HttpIssuer {
    async fn handle(&self, request: Request<Body>) -> Response<Body> {
        if request.method() == Method::POST && request.uri().path() == SUCCESS_CALLBACK_PATH {
            return self.mint_subject(request).await;
        }
        if request.method() == Method::POST && request.uri().path() == CODE_CALLBACK_PATH {
            return self.deliver_code(request).await;
        }

        let method = request.method().clone();
        let path = request.uri().path().to_string();
        match self.forward(request).await {
            Ok(response) => {
                tracing::debug!(%method, path = %path, status = %response.status(), "Delegated to issuer");
                response
            }
            Err(e) => {
                tracing::error!(%method, path = %path, error = %e, "Issuer delegation failed");
                StatusCode::BAD_GATEWAY.into_response()
            }
        }
    }
}
