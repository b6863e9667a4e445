//! User model, roles and JWT claims

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::error::AppError;

/// Usernames: letters, digits, dot, dash, underscore
pub static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid username regex"));

/// User role
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// Stored as VARCHAR
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub role: Role,
    /// Bumped on logout; tokens carrying an older version are rejected
    #[serde(skip_serializing)]
    pub token_version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// User query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct UserQuery {
    /// Search in username, first or last name
    pub name: Option<String>,
    pub role: Option<Role>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Registration request (public)
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(
        length(min = 3, max = 64, message = "Username must be 3-64 characters"),
        regex(path = *USERNAME_RE, message = "Username may only contain letters, digits, '.', '-' and '_'")
    )]
    pub username: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Update user request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUser {
    #[validate(
        length(min = 3, max = 64, message = "Username must be 3-64 characters"),
        regex(path = *USERNAME_RE, message = "Username may only contain letters, digits, '.', '-' and '_'")
    )]
    pub username: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Current password (required to change password, unless admin)
    pub current_password: Option<String>,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: Option<String>,
}

/// Update role request (admin only)
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRole {
    pub role: Role,
}

/// JWT Claims for authenticated users
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaims {
    pub sub: String,
    pub user_id: i32,
    pub role: Role,
    pub token_version: i32,
    pub exp: i64,
    pub iat: i64,
}

impl UserClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// Check if user is admin
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Require admin privileges
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Authorization("Administrator privileges required".to_string()))
        }
    }

    /// Allow access to a resource owned by `owner_id` for its owner or an admin
    pub fn require_owner_or_admin(&self, owner_id: i32) -> Result<(), AppError> {
        if self.is_admin() || self.user_id == owner_id {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "You can only access your own resources".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(user_id: i32, role: Role) -> UserClaims {
        let now = Utc::now().timestamp();
        UserClaims {
            sub: "reader".to_string(),
            user_id,
            role,
            token_version: 3,
            exp: now + 3600,
            iat: now,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let original = claims(7, Role::Member);
        let token = original.create_token("secret").unwrap();
        let decoded = UserClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.user_id, 7);
        assert_eq!(decoded.role, Role::Member);
        assert_eq!(decoded.token_version, 3);
    }

    #[test]
    fn test_default_role_is_member() {
        assert_eq!(Role::default(), Role::Member);
    }

    #[test]
    fn test_token_wrong_secret() {
        let token = claims(7, Role::Member).create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "other").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let mut expired = claims(7, Role::Member);
        expired.exp = Utc::now().timestamp() - 3600;
        let token = expired.create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "secret").is_err());
    }

    #[test]
    fn test_owner_or_admin() {
        let member = claims(7, Role::Member);
        assert!(member.require_owner_or_admin(7).is_ok());
        assert!(matches!(
            member.require_owner_or_admin(8),
            Err(AppError::Authorization(_))
        ));
        assert!(member.require_admin().is_err());

        let admin = claims(1, Role::Admin);
        assert!(admin.require_owner_or_admin(8).is_ok());
        assert!(admin.require_admin().is_ok());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("ADMIN".parse::<Role>().unwrap(), Role::Admin);
        assert!("librarian".parse::<Role>().is_err());
    }

    #[test]
    fn test_register_validation() {
        let bad = RegisterUser {
            username: "a b".to_string(),
            email: "nope".to_string(),
            password: "short".to_string(),
            first_name: None,
            last_name: None,
        };
        let errors = bad.validate().unwrap_err();
        let fields = errors.field_errors();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }
}
