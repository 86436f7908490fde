//! Account domain entity and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::Order;
use crate::config::{ROLE_ADMIN, ROLE_MEMBER};

/// Account roles enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    /// Check if this role has admin privileges
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Check if this role satisfies a required role
    pub fn satisfies(&self, required: Role) -> bool {
        match self {
            Role::Admin => true,
            Role::Member => required == Role::Member,
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self {
        match s {
            ROLE_ADMIN => Role::Admin,
            _ => Role::Member,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Admin => write!(f, "{}", ROLE_ADMIN),
            Role::Member => write!(f, "{}", ROLE_MEMBER),
        }
    }
}

/// Account domain entity.
///
/// This is the snapshot stored in the cache as well, so it serializes the
/// credential hash; HTTP responses go through [`AccountResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Check if account has admin role
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Registration input before hashing.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Row to insert; id and creation time come from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountDraft {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Partial profile update as requested by a client.
#[derive(Debug, Clone, Default)]
pub struct UpdateAccount {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

/// Column changes handed to the repository (password already hashed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub role: Option<Role>,
}

impl AccountChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
    }

    /// Apply the changes to an in-memory copy.
    pub fn apply_to(&self, account: &mut Account) {
        if let Some(name) = &self.name {
            account.name = name.clone();
        }
        if let Some(email) = &self.email {
            account.email = email.clone();
        }
        if let Some(hash) = &self.password_hash {
            account.password_hash = hash.clone();
        }
        if let Some(role) = self.role {
            account.role = role;
        }
    }
}

/// Account response (safe to return to client)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            email: account.email,
            role: account.role.to_string(),
            created_at: account.created_at,
        }
    }
}

/// An account together with the orders it owns.
#[derive(Debug, Clone)]
pub struct AccountWithOrders {
    pub account: Account,
    pub orders: Vec<Order>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy() {
        assert!(Role::Admin.satisfies(Role::Admin));
        assert!(Role::Admin.satisfies(Role::Member));
        assert!(Role::Member.satisfies(Role::Member));
        assert!(!Role::Member.satisfies(Role::Admin));
    }

    #[test]
    fn test_role_round_trips_through_strings() {
        assert_eq!(Role::from("admin"), Role::Admin);
        assert_eq!(Role::from("member"), Role::Member);
        // Unknown values fall back to the least privileged role
        assert_eq!(Role::from("root"), Role::Member);
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn test_response_drops_password_hash() {
        let account = Account {
            id: 1,
            name: "Ann".to_string(),
            email: "ann@x.io".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: Role::Member,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(AccountResponse::from(account)).unwrap();
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "member");
    }

    #[test]
    fn test_changes_apply_only_present_fields() {
        let mut account = Account {
            id: 3,
            name: "Old".to_string(),
            email: "old@x.io".to_string(),
            password_hash: "h".to_string(),
            role: Role::Member,
            created_at: Utc::now(),
        };
        let changes = AccountChanges {
            name: Some("New".to_string()),
            ..Default::default()
        };

        changes.apply_to(&mut account);
        assert_eq!(account.name, "New");
        assert_eq!(account.email, "old@x.io");
        assert!(!changes.is_empty());
        assert!(AccountChanges::default().is_empty());
    }
}
