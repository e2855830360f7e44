//! Bearer-token authentication
//!
//! The identity provider custodies player keys and issues ES256 access
//! tokens. Verification is two steps: check the token signature and claims
//! locally, then fetch the user's linked accounts from the provider's REST
//! API. The first wallet-typed account becomes the request's caller address.
//! Everything sits behind [`TokenVerifier`] so tests substitute a stub.

use async_trait::async_trait;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use ethers::types::Address;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::api::AppState;
use crate::error::ApiError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing or malformed Authorization header")]
    MissingToken,

    #[error("token verification failed: {0}")]
    InvalidToken(String),

    #[error("no wallet linked to this account")]
    NoLinkedWallet,

    #[error("identity provider request failed: {0}")]
    Provider(String),
}

/// A wallet account linked to the verified user
#[derive(Debug, Clone, Deserialize)]
pub struct LinkedWallet {
    pub address: String,
    pub chain_type: String,
}

/// Outcome of a successful token verification
#[derive(Debug, Clone)]
pub struct VerifiedUser {
    pub user_id: String,
    pub wallets: Vec<LinkedWallet>,
}

/// Token-verification capability; any provider matching this contract works
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedUser, AuthError>;
}

/// The authenticated caller, attached to request extensions by the gate
#[derive(Debug, Clone)]
pub struct AuthedPlayer {
    pub user_id: String,
    pub wallet_address: Address,
}

/// Privy-backed verifier
pub struct PrivyVerifier {
    http: reqwest::Client,
    app_id: String,
    app_secret: String,
    decoding_key: DecodingKey,
}

#[derive(Deserialize)]
struct AccessTokenClaims {
    sub: String,
}

#[derive(Deserialize)]
struct UserResponse {
    linked_accounts: Vec<LinkedAccount>,
}

#[derive(Deserialize)]
struct LinkedAccount {
    #[serde(rename = "type")]
    kind: String,
    address: Option<String>,
    chain_type: Option<String>,
}

impl PrivyVerifier {
    pub fn new(
        app_id: String,
        app_secret: String,
        verification_key_pem: &str,
    ) -> Result<PrivyVerifier, AuthError> {
        let decoding_key = DecodingKey::from_ec_pem(verification_key_pem.as_bytes())
            .map_err(|e| AuthError::Provider(format!("bad verification key: {e}")))?;

        Ok(PrivyVerifier {
            http: reqwest::Client::new(),
            app_id,
            app_secret,
            decoding_key,
        })
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::ES256);
        validation.set_issuer(&["privy.io"]);
        validation.set_audience(&[&self.app_id]);
        validation
    }
}

#[async_trait]
impl TokenVerifier for PrivyVerifier {
    async fn verify(&self, token: &str) -> Result<VerifiedUser, AuthError> {
        let data = decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation())
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        let user_id = data.claims.sub;

        let url = format!("https://auth.privy.io/api/v1/users/{user_id}");
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.app_id, Some(&self.app_secret))
            .header("privy-app-id", &self.app_id)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthError::Provider(format!(
                "user lookup returned {}",
                response.status()
            )));
        }

        let user: UserResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let wallets = user
            .linked_accounts
            .into_iter()
            .filter(|account| account.kind == "wallet")
            .filter_map(|account| {
                Some(LinkedWallet {
                    address: account.address?,
                    chain_type: account.chain_type.unwrap_or_default(),
                })
            })
            .collect();

        Ok(VerifiedUser { user_id, wallets })
    }
}

/// Middleware gate for the authenticated endpoints
pub async fn require_wallet(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(request.headers()).ok_or(AuthError::MissingToken)?;
    let user = state.verifier.verify(token).await?;

    let wallet = user.wallets.first().ok_or(AuthError::NoLinkedWallet)?;
    let wallet_address: Address = wallet
        .address
        .parse()
        .map_err(|_| AuthError::Provider("malformed linked wallet address".into()))?;

    debug!(user_id = %user.user_id, caller = %wallet_address, "request authenticated");
    request.extensions_mut().insert(AuthedPlayer {
        user_id: user.user_id,
        wallet_address,
    });
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, value.parse().expect("header value"));
        headers
    }

    #[test]
    fn bearer_token_extraction() {
        assert_eq!(
            bearer_token(&headers_with("Bearer abc.def.ghi")),
            Some("abc.def.ghi")
        );
        assert_eq!(bearer_token(&headers_with("Basic abc")), None);
        assert_eq!(bearer_token(&headers_with("bearer abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn linked_accounts_parse_and_filter() {
        let raw = r#"{
            "linked_accounts": [
                {"type": "email", "address": "p@example.com"},
                {"type": "wallet", "address": "0x00000000000000000000000000000000000000aa", "chain_type": "ethereum"},
                {"type": "wallet", "address": "0x00000000000000000000000000000000000000bb", "chain_type": "ethereum"}
            ]
        }"#;
        let user: UserResponse = serde_json::from_str(raw).expect("parses");
        let wallets: Vec<LinkedAccount> = user
            .linked_accounts
            .into_iter()
            .filter(|a| a.kind == "wallet")
            .collect();

        assert_eq!(wallets.len(), 2);
        assert_eq!(
            wallets[0].address.as_deref(),
            Some("0x00000000000000000000000000000000000000aa"),
            "first wallet account wins"
        );
    }
}
