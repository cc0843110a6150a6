//! User provisioning: the success callback handed to the issuer.
//!
//! After the issuer verifies a password login it asks the gateway for a
//! [`Subject`] for the authenticated email. Provisioning is one atomic
//! upsert against the relational store: insert a new row, or return the
//! existing one when the unique email is already taken. Concurrent logins
//! with the same email are resolved by the uniqueness constraint, not by
//! any in-process coordination.

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue::Set, DatabaseConnection, DbErr, EntityTrait};
use serde::Serialize;
use time::OffsetDateTime;

use crate::entity::user;
use crate::error::ProvisionError;

/// Identity payload returned to a relying party after successful
/// authentication. Request-scoped; never persisted by the gateway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Subject {
    pub id: String,
}

/// Upsert-by-email contract against the relational store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the stable id for the user with this email, or `None` when
    /// the statement yielded no row.
    async fn upsert_by_email(&self, email: &str) -> Result<Option<String>, DbErr>;
}

/// sea-orm implementation of [`UserStore`].
#[derive(Clone)]
pub struct SeaOrmUserStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmUserStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for SeaOrmUserStore {
    async fn upsert_by_email(&self, email: &str) -> Result<Option<String>, DbErr> {
        let candidate = user::ActiveModel {
            id: Set(uuid::Uuid::new_v4().to_string()),
            email: Set(email.to_string()),
            created_at: Set(OffsetDateTime::now_utc()),
        };

        // INSERT .. ON CONFLICT (email) DO UPDATE SET email = excluded.email
        // RETURNING *. The no-op update makes the conflict path yield the
        // pre-existing row (with its original id) instead of erroring.
        let result = user::Entity::insert(candidate)
            .on_conflict(
                OnConflict::column(user::Column::Email)
                    .update_column(user::Column::Email)
                    .to_owned(),
            )
            .exec_with_returning(self.db.as_ref())
            .await;

        match result {
            Ok(model) => Ok(Some(model.id)),
            Err(DbErr::RecordNotInserted) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Success callback capability: `mint(email) -> Subject`.
///
/// Constructed with an explicit store handle rather than captured ambient
/// state, and handed to the issuer integration as part of
/// [`crate::issuer::IssuerOptions`].
#[derive(Clone)]
pub struct SubjectMinter {
    store: Arc<dyn UserStore>,
}

impl SubjectMinter {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }

    /// Ensure a durable user record exists for `email` and wrap its id into
    /// the subject shape the issuer expects.
    #[tracing::instrument(skip(self))]
    pub async fn mint(&self, email: &str) -> Result<Subject, ProvisionError> {
        let id = self
            .store
            .upsert_by_email(email)
            .await?
            .ok_or_else(|| ProvisionError::NoRow {
                email: email.to_string(),
            })?;
        tracing::info!(user_id = %id, email = email, "Found or created user");
        Ok(Subject { id })
    }
}
