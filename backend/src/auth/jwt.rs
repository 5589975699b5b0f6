use chrono::{DateTime, Duration, Utc};
use helpdesk_shared::{Role, User};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};

/// Session lifetime
pub const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Subject (user ID)
    pub email: String,
    pub name: String,
    pub role: Role,
    pub sid: String, // Session ID, revoked on sign-out
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
}

#[derive(Debug)]
pub struct TokenResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

pub fn create_jwt(
    user: &User,
    session_id: &str,
    secret: &str,
    ttl: Duration,
) -> Result<TokenResponse, jsonwebtoken::errors::Error> {
    let issued_at = Utc::now();
    let expires_at = issued_at + ttl;

    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        name: user.name.clone(),
        role: user.role,
        sid: session_id.to_string(),
        exp: expires_at.timestamp(),
        iat: issued_at.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(TokenResponse { token, expires_at })
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<TokenData<Claims>, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
}
