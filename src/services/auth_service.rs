use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::OsRng;
use secrecy::{ExposeSecret, SecretString};

use crate::{
    config::{AdminConfig, AdminPassword},
    dto::auth::{Claims, LoginRequest, LoginResponse},
    error::{AppError, AppResult},
};

pub const ADMIN_ROLE: &str = "admin";

/// Identity carried by a verified admin token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminPrincipal {
    pub email: String,
}

/// Single-account admin gate: checks the configured credential pair and
/// issues and verifies signed, time-limited bearer tokens.
pub struct AdminGate {
    email: String,
    password_hash: String,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl std::fmt::Debug for AdminGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminGate")
            .field("email", &self.email)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl AdminGate {
    pub fn new(config: &AdminConfig) -> anyhow::Result<Self> {
        let password_hash = match &config.password {
            AdminPassword::Hash(hash) => {
                PasswordHash::new(hash)
                    .map_err(|e| anyhow::anyhow!("ADMIN_PASSWORD_HASH is not a valid PHC string: {e}"))?;
                hash.clone()
            }
            AdminPassword::Plain(plain) => hash_password(plain.expose_secret())?,
        };
        if config.token_ttl_secs <= 0 {
            anyhow::bail!("admin token TTL must be positive");
        }

        let secret = config.jwt_secret.expose_secret().as_bytes();
        Ok(Self {
            email: config.email.clone(),
            password_hash,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl: Duration::seconds(config.token_ttl_secs),
        })
    }

    pub fn login(&self, payload: LoginRequest) -> AppResult<LoginResponse> {
        let LoginRequest { email, password } = payload;
        let password = SecretString::from(password);

        // Always run the hash check so a wrong email costs the same as a
        // wrong password.
        let password_ok = self.verify_password(&password)?;
        if email != self.email || !password_ok {
            return Err(AppError::InvalidCredentials);
        }

        let now = Utc::now();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;
        let token = self.issue(&email, ADMIN_ROLE, now, expires_at)?;

        Ok(LoginResponse {
            token,
            token_type: "Bearer",
            expires_at,
        })
    }

    /// Validates signature and expiry, then requires the admin role.
    pub fn verify(&self, token: &str) -> AppResult<AdminPrincipal> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        if decoded.claims.role != ADMIN_ROLE {
            return Err(AppError::Forbidden);
        }

        Ok(AdminPrincipal {
            email: decoded.claims.sub,
        })
    }

    /// Signs a token with arbitrary claims. Login only ever issues the
    /// admin role.
    pub fn issue(
        &self,
        subject: &str,
        role: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> AppResult<String> {
        let claims = Claims {
            sub: subject.to_string(),
            role: role.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
    }

    fn verify_password(&self, password: &SecretString) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&self.password_hash)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;

        Ok(Argon2::default()
            .verify_password(password.expose_secret().as_bytes(), &parsed_hash)
            .is_ok())
    }
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();
    Ok(hash)
}
