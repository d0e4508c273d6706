//! JWT token generation and validation
//! Short-lived access tokens plus device-bound refresh tokens

use crate::{config::AppConfig, error::AppError};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Token type claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

/// JWT claims shared by both token kinds.
///
/// Identity fields are optional on the way in so that a token signed with
/// the right key but missing them is reported as a bad payload rather than
/// a decoding failure.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// Subject (user ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,

    /// Login, access tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,

    /// Device (session) ID, refresh tokens only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<TokenType>,

    /// Issued at
    pub iat: i64,

    /// Expiration
    pub exp: i64,

    /// JWT ID (unique token identifier)
    #[serde(default)]
    pub jti: String,
}

/// Verified access token identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessClaims {
    pub user_id: Uuid,
    pub login: String,
}

/// Verification failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
}

/// Issued token pair
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// JWT service
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_exp_secs: u64,
    refresh_token_exp_secs: u64,
}

impl JwtService {
    /// Create JWT service from config
    pub fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        Self::new(
            config.security.jwt_secret.expose_secret(),
            config.security.access_token_exp_secs,
            config.security.refresh_token_exp_secs,
        )
    }

    pub fn new(
        secret: &str,
        access_token_exp_secs: u64,
        refresh_token_exp_secs: u64,
    ) -> Result<Self, AppError> {
        // Ensure secret is at least 32 bytes for HS256
        if secret.len() < 32 {
            return Err(AppError::Config("JWT secret too short (min 32 chars)".to_string()));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // TTLs are seconds long, the default 60s leeway would swallow them
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_token_exp_secs,
            refresh_token_exp_secs,
        })
    }

    /// Refresh token lifetime in seconds
    pub fn refresh_ttl_secs(&self) -> u64 {
        self.refresh_token_exp_secs
    }

    pub fn access_ttl_secs(&self) -> u64 {
        self.access_token_exp_secs
    }

    /// Generate access token
    pub fn issue_access(&self, user_id: &Uuid, login: &str) -> Result<String, AppError> {
        let claims = self.claims(
            TokenType::Access,
            user_id,
            Some(login.to_string()),
            None,
            self.access_token_exp_secs,
        );
        self.encode(&claims)
    }

    /// Generate refresh token bound to a device session
    pub fn issue_refresh(&self, user_id: &Uuid, device_id: &str) -> Result<String, AppError> {
        let claims = self.claims(
            TokenType::Refresh,
            user_id,
            None,
            Some(device_id.to_string()),
            self.refresh_token_exp_secs,
        );
        self.encode(&claims)
    }

    /// Generate token pair
    pub fn issue_pair(
        &self,
        user_id: &Uuid,
        login: &str,
        device_id: &str,
    ) -> Result<TokenPair, AppError> {
        Ok(TokenPair {
            access_token: self.issue_access(user_id, login)?,
            refresh_token: self.issue_refresh(user_id, device_id)?,
        })
    }

    /// Check signature, then expiry
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => {
                    tracing::debug!("Token expired");
                    TokenError::Expired
                }
                _ => {
                    tracing::debug!("Token validation failed: {:?}", e);
                    TokenError::Invalid
                }
            })
    }

    /// Validate access token specifically
    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let claims = self.verify(token)?;

        if claims.token_type != Some(TokenType::Access) {
            tracing::debug!("Token type mismatch: expected access, got {:?}", claims.token_type);
            return Err(TokenError::Invalid);
        }

        let user_id = claims
            .user_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or(TokenError::Invalid)?;

        Ok(AccessClaims {
            user_id,
            login: claims.login.unwrap_or_default(),
        })
    }

    fn claims(
        &self,
        token_type: TokenType,
        user_id: &Uuid,
        login: Option<String>,
        device_id: Option<String>,
        ttl_secs: u64,
    ) -> Claims {
        let now = Utc::now();
        let expiration = now + Duration::seconds(ttl_secs as i64);

        Claims {
            user_id: Some(user_id.to_string()),
            login,
            device_id,
            token_type: Some(token_type),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            jti: Uuid::new_v4().to_string(),
        }
    }

    fn encode(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::default(), claims, &self.encoding_key).map_err(|e| {
            tracing::error!("Failed to encode token: {:?}", e);
            AppError::Internal(format!("Failed to encode token: {}", e))
        })
    }
}
