// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth connection routes.
//!
//! The signed-in user starts at `/auth/strava`; their email travels through
//! Strava inside an HMAC-signed `state` parameter and comes back to the
//! callback, which links the account and kicks off the first sync.

use axum::{
    extract::{Extension, Query, State},
    response::Redirect,
    routing::get,
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_jwt, AuthUser};
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

const OAUTH_SCOPE: &str = "read,activity:read_all";

/// Routes reachable without a session.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/strava/callback", get(auth_callback))
}

/// Routes that need the session of the user being connected.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/auth/strava", get(auth_start))
}

/// Start OAuth flow - redirect to Strava authorization.
async fn auth_start(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Redirect> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let oauth_state = sign_state(&user.email, timestamp, &state.config.oauth_state_key)?;

    let auth_url = format!(
        "{}/authorize?client_id={}&redirect_uri={}&response_type=code&approval_prompt=auto&scope={}&state={}",
        state.config.strava_oauth_url,
        state.config.strava_client_id,
        urlencoding::encode(&state.config.strava_redirect_uri),
        OAUTH_SCOPE,
        oauth_state
    );

    tracing::info!(email = %user.email, "Starting OAuth flow, redirecting to Strava");

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens, link the account, start a sync.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let frontend_url = &state.config.frontend_url;
    let fail = |reason: &str| Redirect::temporary(&format!("{}/callback?error={}", frontend_url, reason));

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Strava");
        return fail("strava_connection_failed");
    }

    let Some(email) = params
        .state
        .as_deref()
        .and_then(|s| verify_and_decode_state(s, &state.config.oauth_state_key))
    else {
        tracing::warn!("Invalid or tampered OAuth state parameter");
        return fail("invalid_state");
    };

    let Some(code) = params.code else {
        return fail("no_code");
    };

    tracing::info!(email = %email, "Exchanging authorization code for tokens");

    let user = match state.tokens.connect(&email, &code).await {
        Ok(user) => user,
        Err(e) => {
            tracing::error!(email = %email, error = %e, "Strava connection failed");
            return fail("connection_failed");
        }
    };

    // Initial sync runs in the background; the redirect does not wait for it.
    let sync_state = state.clone();
    let sync_user = user.clone();
    tokio::spawn(async move {
        match sync_state.sync.sync(&sync_user).await {
            Ok(result) => tracing::info!(
                email = %sync_user.email,
                inserted = result.inserted,
                updated = result.updated,
                "Initial sync finished"
            ),
            Err(e) => tracing::warn!(email = %sync_user.email, error = %e, "Initial sync failed"),
        }
    });

    match create_jwt(&user.email, &state.config.jwt_signing_key) {
        Ok(jwt) => Redirect::temporary(&format!("{}/callback?token={}", frontend_url, jwt)),
        Err(e) => {
            tracing::error!(error = %e, "JWT creation failed");
            fail("session_failed")
        }
    }
}

/// Encode `value|timestamp_hex|signature_hex` as URL-safe base64.
fn sign_state(value: &str, timestamp: u128, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", value, timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify HMAC signature and decode the value carried in the OAuth state parameter.
fn verify_and_decode_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    // Split from the right: the signed value itself must not be split.
    let mut parts = state_str.rsplitn(3, '|');
    let signature_hex = parts.next()?;
    let timestamp_hex = parts.next()?;
    let value = parts.next()?;

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(format!("{}|{}", value, timestamp_hex).as_bytes());

    let signature = hex::decode(signature_hex).ok()?;
    if mac.verify_slice(&signature).is_err() {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    Some(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_and_decode_state_success() {
        let secret = b"secret_key";
        let encoded = sign_state("runner@example.com", 1234567890, secret).unwrap();

        let result = verify_and_decode_state(&encoded, secret);
        assert_eq!(result, Some("runner@example.com".to_string()));
    }

    #[test]
    fn test_verify_and_decode_state_invalid_signature() {
        let payload = format!("{}|{:x}", "runner@example.com", 1234567890u128);
        let state_data = format!("{}|{}", payload, "invalid_signature");
        let encoded_state = URL_SAFE_NO_PAD.encode(state_data.as_bytes());

        let result = verify_and_decode_state(&encoded_state, b"secret_key");
        assert_eq!(result, None);
    }

    #[test]
    fn test_verify_and_decode_state_wrong_secret() {
        let encoded = sign_state("runner@example.com", 1234567890, b"secret_key").unwrap();

        let result = verify_and_decode_state(&encoded, b"wrong_key");
        assert_eq!(result, None);
    }

    #[test]
    fn test_verify_and_decode_state_tampered_value() {
        let secret = b"secret_key";
        let encoded = sign_state("runner@example.com", 1234567890, secret).unwrap();
        let decoded = String::from_utf8(URL_SAFE_NO_PAD.decode(&encoded).unwrap()).unwrap();
        let tampered = URL_SAFE_NO_PAD.encode(decoded.replace("runner", "intruder"));

        assert_eq!(verify_and_decode_state(&tampered, secret), None);
    }

    #[test]
    fn test_verify_and_decode_state_malformed() {
        let secret = b"secret_key";
        let encoded_state = URL_SAFE_NO_PAD.encode("invalid|format");
        let result = verify_and_decode_state(&encoded_state, secret);
        assert_eq!(result, None);
    }
}
