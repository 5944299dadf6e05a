//! HTTP transport bootstrap: engine URL, trust configuration, client.

use crate::error::{OvirtError, OvirtResult};
use crate::types::ConnectionConfig;
use reqwest::{Certificate, Client};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

pub const CA_RESOURCE_PATH: &str =
    "ovirt-engine/services/pki-resource?resource=ca-certificate&format=X509-PEM-CA";

/// Parse the configured API base URL.
pub fn parse_base_url(raw: &str) -> OvirtResult<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(OvirtError::config("Engine URL is empty"));
    }
    // Url::join drops the last segment unless the path ends with '/'
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&normalized)?;
    if url.host_str().is_none() {
        return Err(OvirtError::config(format!("Engine URL {raw} has no host")));
    }
    Ok(url)
}

/// `scheme://host[:port]` of the engine.
pub fn origin(base: &Url) -> String {
    base.origin().ascii_serialization()
}

/// Plain-HTTP endpoint publishing the engine CA. The engine serves it on
/// port 80 behind a default HTTPS port and on 8080 otherwise.
pub fn ca_endpoint(base: &Url) -> OvirtResult<Url> {
    let host = base
        .host_str()
        .ok_or_else(|| OvirtError::config("Engine URL has no host"))?;
    let port = match base.port() {
        None | Some(443) => 80,
        Some(_) => 8080,
    };
    Ok(Url::parse(&format!("http://{host}:{port}/{CA_RESOURCE_PATH}"))?)
}

/// Download the engine CA from `endpoint` and write it to `dest`.
pub async fn fetch_engine_ca(endpoint: &Url, dest: &Path, timeout: Duration) -> OvirtResult<PathBuf> {
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| OvirtError::connection(format!("Failed to build HTTP client: {e}")))?;

    log::debug!("fetching engine CA from {endpoint}");
    let resp = client.get(endpoint.clone()).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(OvirtError::config(format!(
            "Failed to fetch engine CA from {endpoint}: {status}"
        )));
    }
    let pem = resp.bytes().await?;
    tokio::fs::write(dest, &pem).await.map_err(|e| {
        OvirtError::io(format!("Cannot write engine CA to {}: {e}", dest.display()))
    })?;
    Ok(dest.to_path_buf())
}

fn load_ca_bundle(path: &Path) -> OvirtResult<Vec<Certificate>> {
    let pem = std::fs::read(path).map_err(|e| {
        OvirtError::config(format!("Cannot read CA file {}: {e}", path.display()))
    })?;
    let certs = Certificate::from_pem_bundle(&pem).map_err(|e| {
        OvirtError::config(format!("Invalid CA file {}: {e}", path.display()))
    })?;
    if certs.is_empty() {
        return Err(OvirtError::config(format!(
            "CA file {} contains no certificates",
            path.display()
        )));
    }
    Ok(certs)
}

/// Build the API client for `config`, fetching the engine CA when
/// verification is on and no CA file is configured.
pub async fn build_http_client(config: &ConnectionConfig, base: &Url) -> OvirtResult<Client> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let builder = Client::builder().timeout(timeout);

    let builder = if config.insecure || base.scheme() == "http" {
        builder.danger_accept_invalid_certs(true)
    } else {
        let ca_path = match config.ca_file() {
            Some(p) => p.to_path_buf(),
            None => fetch_engine_ca(&ca_endpoint(base)?, &config.ca_cache_path, timeout).await?,
        };
        load_ca_bundle(&ca_path)?
            .into_iter()
            .fold(builder.tls_built_in_root_certs(false), |b, cert| {
                b.add_root_certificate(cert)
            })
    };

    builder
        .build()
        .map_err(|e| OvirtError::auth(format!("Failed to build HTTP client: {e}")))
}
