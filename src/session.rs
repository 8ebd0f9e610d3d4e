use std::fmt;
use std::sync::Arc;

use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::model::Role;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: u64,
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

/// The acting user, passed explicitly to every gateway call and to the
/// screens that need the actor's identity.
#[derive(Clone)]
pub struct Session {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,

    token: Arc<str>,
}

impl Session {
    pub fn new(
        user_id: u64,
        username: impl Into<String>,
        role: Role,
        employee_id: Option<u64>,
        token: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            role,
            employee_id,
            token: token.into(),
        }
    }

    /// Reads the actor out of an access token.
    ///
    /// The signature is not checked here; the remote service verifies every
    /// request. Expiry, token type and role id still are.
    pub fn from_access_token(token: &str) -> Result<Self, GatewayError> {
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();

        let data = decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
            .map_err(|e| GatewayError::Auth(format!("Invalid token: {e}")))?;

        if data.claims.token_type != TokenType::Access {
            return Err(GatewayError::Auth("Not an access token".to_string()));
        }

        let role = Role::from_id(data.claims.role)
            .ok_or_else(|| GatewayError::Auth("Invalid role".to_string()))?;

        Ok(Self {
            user_id: data.claims.user_id,
            username: data.claims.sub,
            role,
            employee_id: data.claims.employee_id,
            token: token.into(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Employee record of the actor, required by self-service screens.
    pub fn require_employee(&self) -> Result<u64, GatewayError> {
        self.employee_id
            .ok_or_else(|| GatewayError::Auth("No employee profile".to_string()))
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("employee_id", &self.employee_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
