use thiserror::Error;

/// Failure to ensure a durable user record for an authenticated email.
///
/// `NoRow` is the one error the gateway raises itself: the upsert statement
/// yielded no row, so no subject can be minted and the issuer must abort the
/// login. Everything else is the store's error, propagated untranslated.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Unable to process user: {email}")]
    NoRow { email: String },
    #[error("User store error: {0}")]
    Store(#[from] sea_orm::DbErr),
}

/// Failure to hand a one-time login code to the notification channel.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("smtp configuration missing for code_delivery = smtp")]
    MissingSmtpConfig,
    #[error("Invalid mailbox address: {0}")]
    Address(#[from] lettre::address::AddressError),
    #[error("Failed to build message: {0}")]
    Message(#[from] lettre::error::Error),
    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}
