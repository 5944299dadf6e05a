//! Authenticated engine session.
//!
//! Obtains a bearer token through the SSO password grant, persists it in a
//! [`TokenStore`] and revalidates it against the API before reuse:
//!
//! 1. Build the HTTP client (fetching the engine CA when needed)
//! 2. Load the cached token, in memory or from the store
//! 3. Probe the API root with it
//! 4. On any failure, request a new token and persist it

use crate::error::{OvirtError, OvirtResult};
use crate::token_store::TokenStore;
use crate::transport;
use crate::types::{engine_str, ConnectionConfig, ExpiryScheme, Token};
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

pub const TOKEN_PATH: &str = "ovirt-engine/sso/oauth/token";
pub const TOKEN_SCOPE: &str = "ovirt-app-api";

/// Latest instant representable as Unix nanoseconds (year 2262).
pub fn never_expires() -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(i64::MAX)
}

/// Token endpoint response. Numbers may arrive as strings.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
    #[serde(default, with = "engine_str::opt_u64")]
    exp: Option<u64>,
    #[serde(default, with = "engine_str::opt_u64")]
    expires_in: Option<u64>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Turn the expiry number returned by the engine into an instant.
pub fn expiry_from(scheme: ExpiryScheme, value: Option<u64>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(value) = value else {
        log::warn!("token response carries no expiry; relying on the liveness probe");
        return never_expires();
    };
    let value = i64::try_from(value).unwrap_or(i64::MAX);

    match scheme {
        ExpiryScheme::AbsoluteNanos => DateTime::from_timestamp_nanos(value),
        ExpiryScheme::RelativeSeconds => chrono::Duration::try_seconds(value)
            .and_then(|d| now.checked_add_signed(d))
            .map(|t| t.min(never_expires()))
            .unwrap_or_else(never_expires),
    }
}

/// Session state for one engine.
pub struct OvirtSession {
    config: ConnectionConfig,
    base_url: Url,
    http: Option<Client>,
    token: Option<Token>,
    store: Arc<dyn TokenStore>,
}

impl OvirtSession {
    /// Validate the config. No network traffic happens here.
    pub fn new(config: ConnectionConfig, store: Arc<dyn TokenStore>) -> OvirtResult<Self> {
        let base_url = transport::parse_base_url(&config.url)?;
        Ok(Self {
            config,
            base_url,
            http: None,
            token: None,
            store,
        })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn token(&self) -> Option<&Token> {
        self.token.as_ref()
    }

    /// Bearer value of the current token, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.value.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.as_ref().map(Token::is_usable).unwrap_or(false)
    }

    /// The HTTP client, built on first use.
    pub async fn http_client(&mut self) -> OvirtResult<Client> {
        if let Some(ref client) = self.http {
            return Ok(client.clone());
        }
        let client = transport::build_http_client(&self.config, &self.base_url).await?;
        self.http = Some(client.clone());
        Ok(client)
    }

    /// Make sure the session holds a token the engine accepts.
    pub async fn ensure_authenticated(&mut self) -> OvirtResult<()> {
        let client = self.http_client().await?;

        let cached = match self.token.take() {
            Some(t) => Some(t),
            None => match self.store.load().await {
                Ok(t) => t,
                Err(e) => {
                    log::warn!("ignoring cached token: {e}");
                    None
                }
            },
        };

        if let Some(token) = cached.filter(Token::is_usable) {
            if self.probe(&client, &token).await {
                log::debug!("reusing cached engine token");
                self.token = Some(token);
                return Ok(());
            }
            log::info!("cached engine token rejected, re-authenticating");
        }

        let token = self.password_grant(&client).await?;
        if let Err(e) = self.store.save(&token).await {
            log::warn!("failed to persist engine token: {e}");
        }
        self.token = Some(token);
        Ok(())
    }

    /// Drop the token from memory and from the store.
    pub async fn invalidate(&mut self) {
        self.token = None;
        if let Err(e) = self.store.clear().await {
            log::warn!("failed to remove cached engine token: {e}");
        }
    }

    async fn probe(&self, client: &Client, token: &Token) -> bool {
        let result = client
            .get(self.base_url.clone())
            .bearer_auth(&token.value)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await;
        match result {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                log::debug!("token probe failed: {e}");
                false
            }
        }
    }

    async fn password_grant(&self, client: &Client) -> OvirtResult<Token> {
        let endpoint = format!("{}/{TOKEN_PATH}", transport::origin(&self.base_url));
        log::debug!("requesting engine token for {}", self.config.username);

        let resp = client
            .post(&endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[
                ("grant_type", "password"),
                ("scope", TOKEN_SCOPE),
                ("username", self.config.username.as_str()),
                ("password", self.config.password.as_str()),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(OvirtError::auth(format!(
                "Token request failed (HTTP {status}): {body}"
            )));
        }

        let parsed: TokenResponse = resp
            .json()
            .await
            .map_err(|e| OvirtError::auth(format!("Failed to parse token response: {e}")))?;
        if parsed.access_token.is_empty() {
            return Err(OvirtError::auth("Token response carries no access_token"));
        }

        let value = match self.config.expiry_scheme {
            ExpiryScheme::AbsoluteNanos => parsed.exp.or(parsed.expires_in),
            ExpiryScheme::RelativeSeconds => parsed.expires_in.or(parsed.exp),
        };

        Ok(Token {
            value: parsed.access_token,
            expiry: expiry_from(self.config.expiry_scheme, value, Utc::now()),
            token_type: parsed.token_type.unwrap_or_else(|| "Bearer".to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token_store::MemoryTokenStore;
    use chrono::{Datelike, TimeZone};

    #[test]
    fn sentinel_nanos_is_far_future() {
        let now = Utc::now();
        let t = expiry_from(ExpiryScheme::AbsoluteNanos, Some(i64::MAX as u64), now);
        assert_eq!(t.year(), 2262);
        assert!(t > now);
    }

    #[test]
    fn absolute_nanos() {
        let t = expiry_from(ExpiryScheme::AbsoluteNanos, Some(1_700_000_000_000_000_000), Utc::now());
        assert_eq!(t, Utc.timestamp_opt(1_700_000_000, 0).unwrap());
    }

    #[test]
    fn relative_seconds() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let t = expiry_from(ExpiryScheme::RelativeSeconds, Some(3600), now);
        assert_eq!(t, now + chrono::Duration::hours(1));
    }

    #[test]
    fn relative_seconds_saturates() {
        let t = expiry_from(ExpiryScheme::RelativeSeconds, Some(u64::MAX), Utc::now());
        assert_eq!(t, never_expires());
    }

    #[test]
    fn missing_expiry_never_expires() {
        assert_eq!(expiry_from(ExpiryScheme::AbsoluteNanos, None, Utc::now()), never_expires());
    }

    #[test]
    fn token_response_accepts_string_exp() {
        let r: TokenResponse = serde_json::from_str(
            r#"{"access_token":"abc","exp":"9223372036854775807","token_type":"Bearer"}"#,
        )
        .unwrap();
        assert_eq!(r.exp, Some(i64::MAX as u64));

        let r: TokenResponse =
            serde_json::from_str(r#"{"access_token":"abc","expires_in":3600}"#).unwrap();
        assert_eq!(r.expires_in, Some(3600));
        assert_eq!(r.exp, None);
    }

    #[test]
    fn new_session_rejects_bad_url() {
        let cfg = ConnectionConfig { url: "not a url".into(), ..Default::default() };
        let err = OvirtSession::new(cfg, Arc::new(MemoryTokenStore::new())).err().unwrap();
        assert_eq!(err.kind, crate::error::OvirtErrorKind::Config);
    }

    #[tokio::test]
    async fn invalidate_clears_store() {
        let store = Arc::new(MemoryTokenStore::with_token(Token {
            value: "abc".into(),
            expiry: never_expires(),
            token_type: "Bearer".into(),
        }));
        let cfg = ConnectionConfig {
            url: "https://engine.lab/ovirt-engine/api".into(),
            ..Default::default()
        };
        let mut session = OvirtSession::new(cfg, store.clone()).unwrap();
        session.invalidate().await;
        assert!(session.token().is_none());
        assert!(store.current().await.is_none());
    }
}
