//! OIDC-style authorization gateway for safemore.pl.
//!
//! The gateway fronts an external OpenID-Connect issuer. It answers CORS
//! preflights, serves two demo routes (`/` and `/callback`), provisions a
//! user record for every successfully authenticated email, and delegates
//! everything else (authorize, token, provider paths) verbatim to the
//! issuer collaborator. The issuance flow itself - code storage, token
//! signing, login UI - is the issuer's business, not ours.

use std::sync::Arc;

use crate::config::AppConfig;

pub mod api;
pub mod config;
pub mod cors;
pub mod delivery;
pub mod entity;
pub mod error;
pub mod issuer;
pub mod provision;

/// Shared handles available to every request handler. The database handle is
/// not here: it belongs to the user store behind the issuer integration.
#[derive(Clone)]
pub struct AppResources {
    pub config: Arc<AppConfig>,
}
