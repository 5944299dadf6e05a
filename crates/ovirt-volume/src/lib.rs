//! # oVirt Volume – engine sessions and disk attachments
//!
//! Exposes oVirt engine disks as attachable block volumes for the VMs that
//! make up a cluster.
//!
//! ## Modules
//!
//! - **types** — Connection config, tokens, VMs, disks, attachments, volume options
//! - **error** — Crate-specific error types
//! - **transport** — Engine URL handling, CA bootstrap, HTTP client construction
//! - **token_store** — Token persistence (file and in-memory)
//! - **session** — Password-grant authentication with cached token revalidation
//! - **client** — REST client with 404 / 401 classification
//! - **api** — `OvirtApi` capability trait
//! - **engine** — `OvirtApi` over the REST client
//! - **simulated** — In-memory `OvirtApi` for tests and offline use
//! - **device** — Guest `/dev/disk/by-id` naming
//! - **provisioning** — Disk format defaults per storage type
//! - **retry** — Bounded polling
//! - **reconciler** — Attach / detach / wait-for-attach
//! - **volume** — Unattached disk create / delete
//! - **service** — Aggregate façade

pub mod types;
pub mod error;
pub mod transport;
pub mod token_store;
pub mod session;
pub mod client;
pub mod api;
pub mod engine;
pub mod simulated;
pub mod device;
pub mod provisioning;
pub mod retry;
pub mod reconciler;
pub mod volume;
pub mod service;

pub use api::OvirtApi;
pub use client::ResourceClient;
pub use error::{OvirtError, OvirtErrorKind, OvirtResult};
pub use service::OvirtVolumeService;
pub use types::{ConnectionConfig, ExpiryScheme, VolumeSpec};
