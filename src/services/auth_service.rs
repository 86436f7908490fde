//! Authentication service - registration, login and token checks.

use async_trait::async_trait;
use std::sync::Arc;

use super::token_service::{Claims, TokenResponse, TokenService};
use super::validation::validate_new_account;
use crate::domain::{Account, AccountDraft, NewAccount, Password, Role};
use crate::errors::{AppError, AppResult};
use crate::infra::TransactionManager;

/// Authentication service trait for dependency injection.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Register a new member account
    async fn register(&self, input: NewAccount) -> AppResult<Account>;

    /// Login and return JWT token
    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse>;

    /// Verify JWT token and extract claims
    fn verify_token(&self, token: &str) -> AppResult<Claims>;
}

/// Concrete implementation of AuthService.
pub struct Authenticator {
    manager: Arc<dyn TransactionManager>,
    tokens: TokenService,
}

impl Authenticator {
    pub fn new(manager: Arc<dyn TransactionManager>, tokens: TokenService) -> Self {
        Self { manager, tokens }
    }
}

#[async_trait]
impl AuthService for Authenticator {
    async fn register(&self, input: NewAccount) -> AppResult<Account> {
        validate_new_account(&input)?;

        let accounts = self.manager.accounts();
        if accounts.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::duplicate("email"));
        }

        let password_hash = Password::new(&input.password)?.into_string();
        let account = accounts
            .create(AccountDraft {
                name: input.name,
                email: input.email,
                password_hash,
                role: Role::Member,
            })
            .await?;

        tracing::info!(account_id = account.id, "Account registered");
        Ok(account)
    }

    async fn login(&self, email: String, password: String) -> AppResult<TokenResponse> {
        let account = self.manager.accounts().find_by_email(&email).await?;

        // Verify against a dummy hash for unknown emails so timing does not
        // reveal which addresses exist
        let stored = match &account {
            Some(account) => Password::from_hash(account.password_hash.as_str()),
            None => Password::dummy(),
        };
        let password_valid = stored.verify(&password);

        match account {
            Some(account) if password_valid => self.tokens.issue(&account),
            _ => Err(AppError::InvalidCredentials),
        }
    }

    fn verify_token(&self, token: &str) -> AppResult<Claims> {
        self.tokens.verify(token)
    }
}
