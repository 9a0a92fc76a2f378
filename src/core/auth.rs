use crate::core::{AppError, AppState};
use crate::entities::{Chat, IdType, User};
use crate::repositories::Read;
use axum::extract::{Path, State};
use axum::{body::Body, extract::Request, http, http::Response, middleware::Next};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Name of the cookie set on login, accepted as an alternative to the header
pub const TOKEN_COOKIE: &str = "token";

// struct che codifica il contenuto del token jwt
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
    pub id: IdType,
    pub username: String,
}

#[instrument(skip(secret), fields(username = %username, id = %id))]
pub fn encode_jwt(username: String, id: IdType, secret: &str) -> Result<String, AppError> {
    debug!("Encoding JWT token for user");
    let now = Utc::now();
    let expire: chrono::TimeDelta = Duration::hours(24);
    let exp: usize = (now + expire).timestamp() as usize;
    let iat: usize = now.timestamp() as usize;
    let claim = Claims {
        iat,
        exp,
        username,
        id,
    };

    encode(
        &Header::default(),
        &claim,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map(|token| {
        info!("JWT token encoded successfully");
        token
    })
    .map_err(|e| {
        error!("Failed to encode JWT token: {:?}", e);
        AppError::internal_server_error("Error in encoding jwt token")
    })
}

#[instrument(skip(jwt_token, secret))]
pub fn decode_jwt(jwt_token: &str, secret: &str) -> Result<TokenData<Claims>, AppError> {
    debug!("Decoding JWT token");
    decode::<Claims>(
        jwt_token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| {
        debug!("JWT token decoded successfully for user: {}", data.claims.username);
        data
    })
    .map_err(|e| {
        warn!("Failed to decode JWT token: {:?}", e);
        AppError::unauthorized("Unable to decode token")
    })
}

/// Pulls the raw token out of `Authorization: Bearer` or, failing that,
/// out of the login cookie.
fn extract_token(req: &Request) -> Result<Option<String>, AppError> {
    if let Some(header) = req.headers().get(http::header::AUTHORIZATION) {
        let header = header.to_str().map_err(|_| {
            warn!("Invalid authorization header format");
            AppError::forbidden("Empty header is not allowed")
        })?;
        let mut parts = header.split_whitespace();
        return match (parts.next(), parts.next()) {
            (Some(bearer), Some(token)) if bearer.eq_ignore_ascii_case("bearer") => {
                Ok(Some(token.to_string()))
            }
            _ => {
                warn!("Malformed authorization header");
                Err(AppError::unauthorized("Malformed authorization header"))
            }
        };
    }

    let cookie_token = req
        .headers()
        .get_all(http::header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == TOKEN_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string());

    Ok(cookie_token)
}

#[instrument(skip(state, req, next))]
pub async fn authentication_middleware(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    debug!("Running authentication middleware");
    let token = match extract_token(&req)? {
        Some(token) => token,
        None => {
            warn!("Missing authorization header");
            return Err(AppError::forbidden("Please add the JWT token to the header"));
        }
    };

    let token_data = decode_jwt(&token, &state.jwt_secret)?;

    // Fetch the user details from the database
    let current_user = match state.user.read(&token_data.claims.id).await? {
        Some(user) if user.username == token_data.claims.username => {
            debug!("User authenticated: {}", user.username);
            user
        }
        _ => {
            warn!("User not found in database: {}", token_data.claims.username);
            return Err(AppError::unauthorized("You are not an authorized user"));
        }
    };
    req.extensions_mut().insert(current_user);
    Ok(next.run(req).await)
}

/// Middleware che verifica che l'utente corrente sia uno dei due partecipanti
/// della chat nel path. Inserisce la `Chat` nell'Extension per gli handler.
#[instrument(skip(state, req, next))]
pub async fn chat_participant_middleware(
    State(state): State<Arc<AppState>>,
    Path(chat_id): Path<IdType>,
    mut req: Request,
    next: Next,
) -> Result<Response<Body>, AppError> {
    let current_user = req
        .extensions()
        .get::<User>()
        .ok_or_else(|| {
            warn!("User not found in request extensions");
            AppError::unauthorized("User not authenticated")
        })?
        .clone();

    let chat: Chat = state.chat.read(&chat_id).await?.ok_or_else(|| {
        warn!(chat_id, "Chat not found");
        AppError::not_found("Chat not found")
    })?;

    if !chat.has_participant(current_user.user_id) {
        warn!(
            "User {} is not a participant of chat {}",
            current_user.user_id, chat_id
        );
        return Err(AppError::forbidden("Access denied"));
    }

    debug!("User {} verified as participant of chat {}", current_user.user_id, chat_id);
    req.extensions_mut().insert(chat);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_roundtrip_keeps_identity() {
        let token = encode_jwt("alice".to_string(), 7, "secret").expect("encode");
        let data = decode_jwt(&token, "secret").expect("decode");
        assert_eq!(data.claims.id, 7);
        assert_eq!(data.claims.username, "alice");
    }

    #[test]
    fn jwt_with_wrong_secret_is_rejected() {
        let token = encode_jwt("alice".to_string(), 7, "secret").expect("encode");
        let err = decode_jwt(&token, "another").unwrap_err();
        assert_eq!(err.status(), http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn token_is_read_from_cookie_when_header_is_missing() {
        let req = Request::builder()
            .header(http::header::COOKIE, "theme=dark; token=abc.def.ghi")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&req).unwrap(), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn malformed_header_is_unauthorized() {
        let req = Request::builder()
            .header(http::header::AUTHORIZATION, "Bearer")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            extract_token(&req).unwrap_err().status(),
            http::StatusCode::UNAUTHORIZED
        );
    }
}
