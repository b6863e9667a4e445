//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::user::{RegisterUser, Role, UpdateUser, User, UserClaims, UserQuery},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt_secret
    }

    /// Register a new member account
    pub async fn register(&self, user: RegisterUser) -> AppResult<User> {
        user.validate()?;

        if self.repository.users.username_exists(&user.username, None).await? {
            return Err(AppError::Conflict("Username already exists".to_string()));
        }
        if self.repository.users.email_exists(&user.email, None).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let hash = hash_password(&user.password)?;
        let created = self.repository.users.create(&user, &hash, Role::Member).await?;
        tracing::info!(user_id = created.id, username = %created.username, "User registered");
        Ok(created)
    }

    /// Create the configured bootstrap administrator if there is no admin yet
    pub async fn ensure_admin(&self) -> AppResult<Option<User>> {
        let Some(admin) = self.config.bootstrap_admin.clone() else {
            return Ok(None);
        };
        if self.repository.users.count_admins().await? > 0 {
            return Ok(None);
        }

        let request = RegisterUser {
            username: admin.username,
            email: admin.email,
            password: admin.password,
            first_name: None,
            last_name: None,
        };
        request.validate()?;

        let hash = hash_password(&request.password)?;
        let created = self.repository.users.create(&request, &hash, Role::Admin).await?;
        tracing::info!(user_id = created.id, username = %created.username, "Bootstrap administrator created");
        Ok(Some(created))
    }

    /// Authenticate by username or email and return a JWT token
    pub async fn authenticate(&self, login: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_login(login)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid login or password".to_string()))?;

        if !verify_password(&user, password)? {
            tracing::warn!(user_id = user.id, "Failed login attempt");
            return Err(AppError::Authentication("Invalid login or password".to_string()));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    /// Create JWT token for a user
    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            token_version: user.token_version,
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Reject tokens issued before the user's last logout (or for deleted users)
    pub async fn verify_session(&self, claims: &UserClaims) -> AppResult<()> {
        match self.repository.users.token_version(claims.user_id).await? {
            Some(version) if version == claims.token_version => Ok(()),
            Some(_) => Err(AppError::Authentication("Session has been logged out".to_string())),
            None => Err(AppError::Authentication("User no longer exists".to_string())),
        }
    }

    /// Invalidate every token of a user
    pub async fn logout(&self, user_id: i32) -> AppResult<()> {
        self.repository.users.bump_token_version(user_id).await?;
        tracing::info!(user_id, "User logged out");
        Ok(())
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Search users
    pub async fn search_users(&self, query: &UserQuery) -> AppResult<(Vec<User>, i64)> {
        self.repository.users.search(query).await
    }

    /// Update a user's profile. Changing the password requires the current
    /// one, except for admins editing another account.
    pub async fn update_user(&self, claims: &UserClaims, id: i32, user: UpdateUser) -> AppResult<User> {
        user.validate()?;
        let existing = self.repository.users.get_by_id(id).await?;

        if let Some(ref username) = user.username {
            if self.repository.users.username_exists(username, Some(id)).await? {
                return Err(AppError::Conflict("Username already exists".to_string()));
            }
        }
        if let Some(ref email) = user.email {
            if self.repository.users.email_exists(email, Some(id)).await? {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }

        let password = match user.new_password {
            Some(ref new_password) => {
                let editing_other = claims.is_admin() && claims.user_id != id;
                if !editing_other {
                    let current = user.current_password.as_deref().ok_or_else(|| {
                        AppError::Validation("Current password required to change password".to_string())
                    })?;
                    if !verify_password(&existing, current)? {
                        return Err(AppError::Authentication("Current password is incorrect".to_string()));
                    }
                }
                Some(hash_password(new_password)?)
            }
            None => None,
        };

        self.repository.users.update(id, &user, password).await
    }

    /// Change a user's role (admin only). The last admin cannot be demoted.
    pub async fn update_role(&self, id: i32, role: Role) -> AppResult<User> {
        let existing = self.repository.users.get_by_id(id).await?;

        if existing.role == Role::Admin
            && role != Role::Admin
            && self.repository.users.count_admins().await? <= 1
        {
            return Err(AppError::BusinessRule("Cannot demote the last administrator".to_string()));
        }

        let updated = self.repository.users.update_role(id, role).await?;
        // Outstanding tokens still carry the old role
        self.repository.users.bump_token_version(id).await?;
        tracing::info!(user_id = id, role = %role, "User role changed");
        Ok(updated)
    }

    /// Delete a user; their unclaimed reservations are released
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        let existing = self.repository.users.get_by_id(id).await?;
        if existing.role == Role::Admin && self.repository.users.count_admins().await? <= 1 {
            return Err(AppError::BusinessRule("Cannot delete the last administrator".to_string()));
        }
        self.repository.users.delete(id).await?;
        tracing::info!(user_id = id, "User deleted");
        Ok(())
    }
}

/// Verify a password against the stored argon2 hash
fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}
