//! OpenAPI/Utoipa configuration.

use crate::api::{demo::DEMO_TAG, health::MISC_TAG};
use utoipa::OpenApi;

/// OpenAPI documentation configuration.
///
/// Only the routes the gateway owns are documented here; everything the
/// issuer serves (authorize, token, provider paths) is delegated and
/// documented by the issuer itself.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "safemore-auth Gateway API",
        version = "1.0.0",
        description = "CORS fronting and demo routes around an external OIDC-style issuer."
    ),
    tags(
        (name = DEMO_TAG, description = "Demo authorization flow endpoints"),
        (name = MISC_TAG, description = "Miscellaneous endpoints")
    )
)]
pub struct ApiDoc;
