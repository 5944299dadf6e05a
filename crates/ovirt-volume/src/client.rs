//! REST client bound to an authenticated session.

use crate::error::{OvirtError, OvirtResult};
use crate::session::OvirtSession;
use bytes::Bytes;
use reqwest::{header, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handle to a session; the client is its only writer.
pub type SessionHandle = Arc<Mutex<OvirtSession>>;

/// Sends JSON requests relative to the engine API base URL.
///
/// Does not authenticate on its own; callers run
/// [`ResourceClient::ensure_authenticated`] first. A 401 clears the cached
/// token and re-authenticates once, but the failed call is not replayed.
#[derive(Clone)]
pub struct ResourceClient {
    session: SessionHandle,
}

impl ResourceClient {
    pub fn new(session: OvirtSession) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }

    pub fn from_handle(session: SessionHandle) -> Self {
        Self { session }
    }

    pub fn session(&self) -> SessionHandle {
        self.session.clone()
    }

    pub async fn ensure_authenticated(&self) -> OvirtResult<()> {
        self.session.lock().await.ensure_authenticated().await
    }

    pub async fn get(&self, path: &str) -> OvirtResult<Bytes> {
        self.execute(Method::GET, path, None).await
    }

    pub async fn post(&self, path: &str, body: Vec<u8>) -> OvirtResult<Bytes> {
        self.execute(Method::POST, path, Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> OvirtResult<Bytes> {
        self.execute(Method::DELETE, path, None).await
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> OvirtResult<T> {
        let body = self.get(path).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> OvirtResult<T> {
        let payload = serde_json::to_vec(body)?;
        let resp = self.post(path, payload).await?;
        Ok(serde_json::from_slice(&resp)?)
    }

    async fn execute(&self, method: Method, path: &str, body: Option<Vec<u8>>) -> OvirtResult<Bytes> {
        let mut session = self.session.lock().await;
        let client = session.http_client().await?;
        let url = session.base_url().join(path)?;

        log::debug!("{method} {url}");
        let mut req = client
            .request(method.clone(), url)
            .header(header::ACCEPT, "application/json")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = session.bearer() {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.body(body);
        }

        let resp = req.send().await?;
        let status = resp.status();

        match status {
            StatusCode::NOT_FOUND => return Err(OvirtError::not_found(path)),
            StatusCode::UNAUTHORIZED => {
                log::warn!("{method} {path} was rejected with 401, re-authenticating");
                session.invalidate().await;
                if let Err(e) = session.ensure_authenticated().await {
                    log::error!("re-authentication failed: {e}");
                }
                return Err(OvirtError::unauthorized(format!("{method} {path}: {status}")));
            }
            _ => {}
        }

        let failed = if method == Method::GET {
            status.as_u16() > 200
        } else {
            status.as_u16() >= 300
        };
        if failed {
            let text = resp.text().await.unwrap_or_default();
            log::debug!("{method} {path} failed: {status} {text}");
            return Err(OvirtError::api(status.as_u16(), format!("{method} {path}: {status}")));
        }

        Ok(resp.bytes().await?)
    }
}
