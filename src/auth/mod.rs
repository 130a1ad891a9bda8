pub mod jwt;
pub mod password;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

/// Ordered from least to most privileged so role checks can compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    User,
    Manager,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "User" => Some(Role::User),
            "Manager" => Some(Role::Manager),
            "Admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Manager => "Manager",
            Role::Admin => "Admin",
        }
    }

    pub const ALL: [Role; 3] = [Role::User, Role::Manager, Role::Admin];
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: uuid::Uuid,
    pub email: String,
    pub role: String,
}

impl AuthenticatedUser {
    /// All role-gated handlers funnel through this single check.
    pub fn require_role(&self, minimum: Role) -> Result<(), AppError> {
        let held = Role::parse(&self.role).unwrap_or(Role::User);
        if held >= minimum {
            Ok(())
        } else {
            Err(AppError::forbidden(format!(
                "{} role required",
                minimum.as_str()
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::unauthorized())?;

        let claims = state
            .jwt
            .verify_token(bearer.token())
            .map_err(|_| AppError::unauthorized())?;

        Ok(AuthenticatedUser {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_with_role(role: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: uuid::Uuid::new_v4(),
            email: "tech@example.com".to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn admin_satisfies_every_level() {
        let admin = user_with_role("Admin");
        assert!(admin.require_role(Role::User).is_ok());
        assert!(admin.require_role(Role::Manager).is_ok());
        assert!(admin.require_role(Role::Admin).is_ok());
    }

    #[test]
    fn manager_cannot_act_as_admin() {
        let manager = user_with_role("Manager");
        assert!(manager.require_role(Role::Manager).is_ok());
        assert!(manager.require_role(Role::Admin).is_err());
    }

    #[test]
    fn unknown_role_is_treated_as_least_privileged() {
        let odd = user_with_role("Superuser");
        assert!(odd.require_role(Role::User).is_ok());
        assert!(odd.require_role(Role::Manager).is_err());
    }
}
