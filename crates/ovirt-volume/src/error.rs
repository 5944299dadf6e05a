//! Error types for the oVirt volume crate.

use std::fmt;

/// Categorised error kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OvirtErrorKind {
    /// Bad engine URL, unreadable CA file or driver configuration
    Config,
    /// Token fetch rejected or TLS setup failed
    Auth,
    /// The engine answered 401; the session was re-authenticated but the call failed
    Unauthorized,
    /// Resource not found (404) at the given API path
    NotFound { path: String },
    /// HTTP / API error with status code
    ApiError(u16),
    /// Engine unreachable
    ConnectionError,
    /// Request deadline exceeded
    Timeout,
    /// JSON parse / deserialization error
    ParseError,
    /// Local filesystem error (token store, CA cache, device links)
    Io,
    /// Disk interface without a known guest device naming
    UnsupportedDeviceType,
    /// No VM carries the requested node name
    NodeNotFound,
    /// No disk carries the requested volume name
    DiskNotFound,
    /// No storage domain carries the requested name
    StorageDomainNotFound,
    /// No attachment on the VM matches the device id
    AttachmentNotFound,
    /// Attachment stayed inactive after the polling budget
    AttachmentNotActive,
    /// Generic
    Other,
}

/// Crate error type carrying a kind + human-readable message.
#[derive(Debug, Clone)]
pub struct OvirtError {
    pub kind: OvirtErrorKind,
    pub message: String,
}

impl OvirtError {
    pub fn new(kind: OvirtErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, message: msg.into() }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::Config, msg)
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::Auth, msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::Unauthorized, msg)
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        let path = path.into();
        let message = format!("No resource at {path}");
        Self::new(OvirtErrorKind::NotFound { path }, message)
    }

    pub fn api(status: u16, msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::ApiError(status), msg)
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::ConnectionError, msg)
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::Timeout, msg)
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::ParseError, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::Io, msg)
    }

    pub fn unsupported_device(interface: &str) -> Self {
        Self::new(
            OvirtErrorKind::UnsupportedDeviceType,
            format!("device type '{interface}' is unsupported"),
        )
    }

    pub fn node_not_found(node: &str) -> Self {
        Self::new(OvirtErrorKind::NodeNotFound, format!("VM {node} doesn't exist"))
    }

    pub fn disk_not_found(name: &str) -> Self {
        Self::new(
            OvirtErrorKind::DiskNotFound,
            format!("Disk by name {name} does not exist"),
        )
    }

    pub fn storage_domain_not_found(name: &str) -> Self {
        Self::new(
            OvirtErrorKind::StorageDomainNotFound,
            format!("Storage domain {name} does not exist"),
        )
    }

    pub fn attachment_not_found(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::AttachmentNotFound, msg)
    }

    pub fn attachment_not_active(msg: impl Into<String>) -> Self {
        Self::new(OvirtErrorKind::AttachmentNotActive, msg)
    }

    /// Whether this is the distinguished 404 outcome.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, OvirtErrorKind::NotFound { .. })
    }

    /// The API path that answered 404, if any.
    pub fn not_found_path(&self) -> Option<&str> {
        match &self.kind {
            OvirtErrorKind::NotFound { path } => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for OvirtError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            OvirtErrorKind::NotFound { .. } => write!(f, "[NotFound] {}", self.message),
            kind => write!(f, "[{:?}] {}", kind, self.message),
        }
    }
}

impl std::error::Error for OvirtError {}

impl From<OvirtError> for String {
    fn from(e: OvirtError) -> String {
        e.to_string()
    }
}

impl From<reqwest::Error> for OvirtError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("HTTP timeout: {e}"))
        } else if e.is_connect() {
            Self::connection(format!("Connection failed: {e}"))
        } else {
            Self::new(OvirtErrorKind::Other, format!("HTTP error: {e}"))
        }
    }
}

impl From<serde_json::Error> for OvirtError {
    fn from(e: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {e}"))
    }
}

impl From<std::io::Error> for OvirtError {
    fn from(e: std::io::Error) -> Self {
        Self::io(format!("I/O error: {e}"))
    }
}

impl From<url::ParseError> for OvirtError {
    fn from(e: url::ParseError) -> Self {
        Self::config(format!("Invalid engine URL: {e}"))
    }
}

/// Convenience alias.
pub type OvirtResult<T> = Result<T, OvirtError>;
