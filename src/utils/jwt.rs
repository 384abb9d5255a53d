// src/utils/jwt.rs

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError};

/// JWT Claims structure for login sessions.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - Stores the User ID (as string).
    pub sub: String,
    /// User's role (e.g., 'user', 'admin').
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    /// The user id carried in `sub`; 0 if malformed (cannot match a real row).
    pub fn user_id(&self) -> i64 {
        self.sub.parse::<i64>().unwrap_or(0)
    }
}

/// Claims for shuffle-mapping tokens handed out with practice questions
/// and exam papers. The mapping is never persisted server-side: the client
/// returns the token with its submission and grading stays stateless.
#[derive(Debug, Deserialize, Serialize)]
pub struct MappingClaims {
    /// User the presentation was generated for.
    pub sub: String,
    /// question id -> (display id -> canonical option id)
    pub questions: HashMap<i64, HashMap<String, String>>,
    pub exp: usize,
}

fn expiry_from_now(seconds: u64) -> Result<usize, AppError> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize;
    Ok(now + seconds as usize)
}

/// Signs a new session JWT for the user.
pub fn sign_jwt(
    id: i64,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: id.to_string(),
        role: role.to_owned(),
        exp: expiry_from_now(expiration_seconds)?,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a session JWT.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Signs a shuffle-mapping token covering one or more question presentations.
pub fn sign_mapping_token(
    user_id: i64,
    questions: HashMap<i64, HashMap<String, String>>,
    secret: &str,
    ttl_seconds: u64,
) -> Result<String, AppError> {
    let claims = MappingClaims {
        sub: user_id.to_string(),
        questions,
        exp: expiry_from_now(ttl_seconds)?,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies a shuffle-mapping token and checks it was issued to `user_id`.
pub fn verify_mapping_token(
    token: &str,
    user_id: i64,
    secret: &str,
) -> Result<MappingClaims, AppError> {
    let token_data = decode::<MappingClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::BadRequest("Invalid or expired mapping token".to_string()))?;

    if token_data.claims.sub != user_id.to_string() {
        return Err(AppError::BadRequest(
            "Mapping token was issued to a different user".to_string(),
        ));
    }

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Intercepts requests, validates the 'Authorization: Bearer <token>' header.
/// If valid, injects `Claims` into the request extensions for handlers to use.
/// If invalid, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    match verify_jwt(token, &config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Checks if the injected `Claims` has 'admin' role.
/// If not, returns 403 Forbidden.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if claims.role != "admin" {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_token_roundtrip() {
        let token = sign_jwt(42, "user", "secret", 60).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();
        assert_eq!(claims.user_id(), 42);
        assert_eq!(claims.role, "user");
    }

    #[test]
    fn session_token_rejects_wrong_secret() {
        let token = sign_jwt(42, "user", "secret", 60).unwrap();
        assert!(verify_jwt(&token, "other").is_err());
    }

    #[test]
    fn mapping_token_bound_to_user() {
        let mut questions = HashMap::new();
        questions.insert(7, HashMap::from([("A".to_string(), "b".to_string())]));

        let token = sign_mapping_token(1, questions, "secret", 60).unwrap();
        let claims = verify_mapping_token(&token, 1, "secret").unwrap();
        assert_eq!(claims.questions[&7]["A"], "b");

        assert!(verify_mapping_token(&token, 2, "secret").is_err());
    }
}
