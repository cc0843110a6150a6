//! Database entities owned by the gateway.

pub mod user;
