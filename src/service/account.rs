//! Account service
//!
//! Read-side operations over the account store. There is no update or
//! delete surface; records are written once by provisioning.

use std::sync::Arc;

use crate::data::{AccountRecord, Database};
use crate::error::AppError;

/// Account service
pub struct AccountService {
    db: Arc<Database>,
}

impl AccountService {
    /// Create new account service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// List every account record
    pub async fn list_accounts(&self) -> Result<Vec<AccountRecord>, AppError> {
        self.db.list_accounts().await
    }

    /// Fetch an account by the principal's email join key
    ///
    /// # Returns
    /// None when the email has no record; callers decide whether that is
    /// a not-found response or an unpersonalized page.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<AccountRecord>, AppError> {
        self.db.get_account_by_email(email).await
    }

    /// Fetch an account by its public username
    pub async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<AccountRecord>, AppError> {
        self.db.get_account_by_username(username).await
    }
}
