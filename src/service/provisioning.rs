//! Account provisioning
//!
//! Reconciles an OAuth principal with the account store on login. First
//! login for an email creates a directory user at the identity provider
//! and one account record; every later login finds the directory user and
//! leaves the store untouched.

use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

use crate::auth::directory::DirectoryClient;
use crate::auth::session::Principal;
use crate::data::{AccountRecord, Database, EntityId};
use crate::error::AppError;

/// Account provisioning service
pub struct ProvisioningService {
    db: Arc<Database>,
    directory: Arc<DirectoryClient>,
}

impl ProvisioningService {
    /// Create new provisioning service
    pub fn new(db: Arc<Database>, directory: Arc<DirectoryClient>) -> Self {
        Self { db, directory }
    }

    /// Reconcile a principal with the directory and the account store.
    ///
    /// The caller must not mark the session authenticated unless this
    /// returns Ok. Every failure is terminal for the login attempt; there
    /// are no retries here.
    ///
    /// A directory user whose account record went missing (for example a
    /// create-user that succeeded while the record insert failed) is
    /// healed on the next login: the record insert runs on both branches
    /// and is a no-op whenever the row already exists.
    ///
    /// # Errors
    /// `AppError::Provisioning` for directory lookup/create failures and
    /// for record-insert failures. An unclassified lookup error is never
    /// treated as "user not found".
    pub async fn provision(&self, principal: &Principal) -> Result<(), AppError> {
        let lookup = self
            .directory
            .find_user(&principal.email)
            .await
            .map_err(|e| AppError::Provisioning(format!("identity lookup failed: {e}")))?;

        match lookup {
            Some(user) => {
                tracing::debug!(
                    email = %principal.email,
                    uid = %user.uid,
                    "Directory user exists, provisioning is a no-op"
                );
            }
            None => {
                let placeholder = generate_placeholder_password();
                let user = self
                    .directory
                    .create_user(&principal.email, &placeholder)
                    .await
                    .map_err(|e| {
                        AppError::Provisioning(format!("directory user creation failed: {e}"))
                    })?;

                tracing::info!(
                    email = %principal.email,
                    uid = %user.uid,
                    "Directory user created"
                );
            }
        }

        self.ensure_account_record(principal).await
    }

    /// Insert the principal's account record unless its email already has
    /// one. Losing the insert race to a concurrent login is success.
    async fn ensure_account_record(&self, principal: &Principal) -> Result<(), AppError> {
        let now = chrono::Utc::now();
        let record = AccountRecord {
            id: EntityId::new().0,
            email: principal.email.clone(),
            username: principal.given_name.clone(),
            display_name: principal.given_name.clone(),
            description: String::new(),
            thumb_url: principal.picture.clone(),
            locale: principal.locale.clone(),
            created_at: now,
            updated_at: now,
        };

        let inserted = self
            .db
            .insert_account_if_absent(&record)
            .await
            .map_err(|e| AppError::Provisioning(format!("account record insert failed: {e}")))?;

        if inserted {
            tracing::info!(
                email = %record.email,
                username = %record.username,
                "Account record created"
            );
        }

        Ok(())
    }
}

/// Random placeholder credential for directory user creation.
///
/// Login is always via OAuth; nothing ever reads this value back.
fn generate_placeholder_password() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
