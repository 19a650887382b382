//! Credentials and bearer tokens.
//!
//! Passwords are stored as bcrypt hashes. Tokens are HS256 JWTs whose
//! subject is the username; they carry an expiry and nothing else.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    config::Config,
    data::{
        model::{User, UserChanges, UserUpdate},
        repository::UserRepository,
    },
    error::{AppError, AppResult},
};

pub const MIN_PASSWORD_LEN: usize = 8;

pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> AppResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::Validation(
            "value is not a valid email address".to_string(),
        ));
    }
    Ok(())
}

// Both run on the blocking pool, off the async workers.
pub async fn hash_password(password: &str, cost: u32) -> AppResult<String> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hashed)
}

/// `false` for a wrong password or a malformed hash.
pub async fn verify_password(password: &str, hashed: &str) -> AppResult<bool> {
    let (password, hashed) = (password.to_owned(), hashed.to_owned());
    let matches =
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed).unwrap_or(false))
            .await?;
    Ok(matches)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Serialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

/// Issues and checks signed, time-limited bearer tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self, username: &str) -> AppResult<Token> {
        let claims = Claims {
            sub: username.to_string(),
            exp: (Utc::now() + self.ttl).timestamp() as usize,
        };
        let access_token = encode(&Header::default(), &claims, &self.encoding)?;
        Ok(Token {
            access_token,
            token_type: "bearer".to_string(),
        })
    }

    /// Returns the subject of a valid token.
    pub fn verify(&self, token: &str) -> AppResult<String> {
        let mut validation = Validation::default();
        validation.leeway = 0;
        let data =
            decode::<Claims>(token, &self.decoding, &validation).map_err(|_| AppError::InvalidToken)?;
        Ok(data.claims.sub)
    }
}

/// Registration, login and token resolution over the user store.
#[derive(Clone)]
pub struct AuthService {
    pub users: UserRepository,
    pub tokens: TokenIssuer,
    pub bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: UserRepository, config: &Config) -> Self {
        Self {
            users,
            tokens: TokenIssuer::new(&config.secret_key, config.access_token_expire_minutes),
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    pub async fn register(&self, username: &str, email: &str, password: &str) -> AppResult<User> {
        if username.trim().is_empty() {
            return Err(AppError::Validation("Username must not be empty".to_string()));
        }
        validate_email(email)?;
        validate_password(password)?;

        let hashed = hash_password(password, self.bcrypt_cost).await?;
        let user = self.users.create(username, email, &hashed).await?;
        info!(user_id = user.id, username = %user.username, "registered user");
        Ok(user)
    }

    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<Token> {
        if let Some(user) = self.users.find_by_username(username).await? {
            if verify_password(password, &user.hashed_password).await? {
                info!(user_id = user.id, "issued access token");
                return self.tokens.issue(&user.username);
            }
        }
        warn!(username, "failed login attempt");
        Err(AppError::InvalidCredentials)
    }

    /// The active user a bearer token belongs to.
    pub async fn resolve(&self, token: &str) -> AppResult<User> {
        let username = self.tokens.verify(token)?;
        let user = self
            .users
            .find_by_username(&username)
            .await?
            .ok_or(AppError::UserNotFound)?;
        if !user.is_active {
            return Err(AppError::InactiveUser);
        }
        Ok(user)
    }

    /// Validates a user update payload and hashes any new password.
    pub async fn prepare_changes(&self, update: UserUpdate) -> AppResult<UserChanges> {
        if let Some(email) = &update.email {
            validate_email(email)?;
        }
        if let Some(username) = &update.username {
            if username.trim().is_empty() {
                return Err(AppError::Validation("Username must not be empty".to_string()));
            }
        }
        let hashed_password = match update.password {
            Some(password) => {
                validate_password(&password)?;
                Some(hash_password(&password, self.bcrypt_cost).await?)
            }
            None => None,
        };
        Ok(UserChanges {
            username: update.username,
            email: update.email,
            hashed_password,
        })
    }
}
