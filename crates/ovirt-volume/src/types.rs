//! Shared types for oVirt volume management.

use crate::error::{OvirtError, OvirtResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Connection / Config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How the `exp` / `expires_in` number returned by the token endpoint is read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ExpiryScheme {
    /// Absolute Unix timestamp in nanoseconds (the engine sends `Long.MAX_VALUE`)
    #[default]
    AbsoluteNanos,
    /// Seconds from the moment the token was received
    RelativeSeconds,
}

/// Connection details for an oVirt engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    /// API base URL (e.g. "https://engine.lab.local/ovirt-engine/api")
    pub url: String,
    /// Username (e.g. "admin@internal")
    pub username: String,
    /// Password
    pub password: String,
    /// Skip TLS certificate verification
    #[serde(default)]
    pub insecure: bool,
    /// PEM CA bundle; fetched from the engine when absent
    #[serde(default, alias = "cafile")]
    pub ca_file: Option<PathBuf>,
    /// Where a fetched engine CA is written
    #[serde(default = "default_ca_cache_path")]
    pub ca_cache_path: PathBuf,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub expiry_scheme: ExpiryScheme,
}

fn default_timeout() -> u64 { 30 }
fn default_ca_cache_path() -> PathBuf { PathBuf::from("ovirt.ca") }

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            username: String::new(),
            password: String::new(),
            insecure: false,
            ca_file: None,
            ca_cache_path: default_ca_cache_path(),
            timeout_secs: default_timeout(),
            expiry_scheme: ExpiryScheme::default(),
        }
    }
}

impl ConnectionConfig {
    /// Configured CA file, treating an empty path as unset.
    pub fn ca_file(&self) -> Option<&Path> {
        self.ca_file
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Token
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Bearer token obtained through the password grant.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    #[serde(rename = "access_token")]
    pub value: String,
    #[serde(rename = "expires_at")]
    pub expiry: DateTime<Utc>,
    #[serde(rename = "token_type", default)]
    pub token_type: String,
}

impl Token {
    /// A token with an empty value is never usable.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        !self.value.is_empty() && now < self.expiry
    }

    pub fn is_usable(&self) -> bool {
        self.is_usable_at(Utc::now())
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("expiry", &self.expiry)
            .field("token_type", &self.token_type)
            .finish()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Engine JSON encoding
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The engine encodes booleans and sizes as JSON strings (`"true"`,
/// `"1073741824"`). These adapters accept either form and emit strings.
pub(crate) mod engine_str {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flexible {
        Bool(bool),
        Num(u64),
        Str(String),
    }

    fn to_bool<E: serde::de::Error>(v: Flexible) -> Result<bool, E> {
        match v {
            Flexible::Bool(b) => Ok(b),
            Flexible::Num(n) => Ok(n != 0),
            Flexible::Str(s) => s
                .trim()
                .parse::<bool>()
                .map_err(|_| E::custom(format!("invalid boolean '{s}'"))),
        }
    }

    fn to_u64<E: serde::de::Error>(v: Flexible) -> Result<u64, E> {
        match v {
            Flexible::Num(n) => Ok(n),
            Flexible::Str(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| E::custom(format!("invalid number '{s}'"))),
            Flexible::Bool(b) => Err(E::custom(format!("expected number, got {b}"))),
        }
    }

    pub mod flag {
        use super::*;

        pub fn serialize<S: Serializer>(v: &bool, s: S) -> Result<S::Ok, S::Error> {
            s.serialize_str(if *v { "true" } else { "false" })
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
            to_bool(Flexible::deserialize(d)?)
        }
    }

    pub mod opt_flag {
        use super::*;

        pub fn serialize<S: Serializer>(v: &Option<bool>, s: S) -> Result<S::Ok, S::Error> {
            match v {
                Some(b) => super::flag::serialize(b, s),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<bool>, D::Error> {
            Option::<Flexible>::deserialize(d)?.map(to_bool).transpose()
        }
    }

    pub mod opt_u64 {
        use super::*;

        pub fn serialize<S: Serializer>(v: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
            match v {
                Some(n) => s.serialize_str(&n.to_string()),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
            Option::<Flexible>::deserialize(d)?.map(to_u64).transpose()
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  VM Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// VM as returned by `GET vms?search=name=<name>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Vm {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fqdn: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub nics: Nics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Nics {
    #[serde(default)]
    pub nic: Vec<Nic>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Nic {
    #[serde(default)]
    pub interface: String,
    #[serde(default, with = "engine_str::opt_flag")]
    pub linked: Option<bool>,
    #[serde(default)]
    pub reported_devices: ReportedDevices,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportedDevices {
    #[serde(default)]
    pub reported_device: Vec<ReportedDevice>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportedDevice {
    #[serde(default)]
    pub ips: Ips,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ips {
    #[serde(default)]
    pub ip: Vec<Ip>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ip {
    #[serde(default)]
    pub address: String,
    /// "v4" or "v6"
    #[serde(default)]
    pub version: String,
}

impl Vm {
    /// All guest-reported IP addresses across NICs and devices.
    pub fn addresses(&self) -> Vec<&str> {
        self.nics
            .nic
            .iter()
            .flat_map(|n| n.reported_devices.reported_device.iter())
            .flat_map(|d| d.ips.ip.iter())
            .map(|ip| ip.address.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct VmList {
    #[serde(default)]
    pub vm: Vec<Vm>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Disk Types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DiskFormat {
    Raw,
    Cow,
}

impl fmt::Display for DiskFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskFormat::Raw => write!(f, "raw"),
            DiskFormat::Cow => write!(f, "cow"),
        }
    }
}

/// Disk as carried by `disks` and nested in attachments.
///
/// Every field is optional on the wire: an attachment that references an
/// existing disk posts only its id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Disk {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "engine_str::opt_u64")]
    pub provisioned_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "engine_str::opt_u64")]
    pub actual_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<DiskFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "engine_str::opt_flag")]
    pub sparse: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "engine_str::opt_flag")]
    pub read_only: Option<bool>,
    #[serde(default, skip_serializing_if = "StorageDomains::is_empty")]
    pub storage_domains: StorageDomains,
}

impl Disk {
    /// Reference to an existing disk by id.
    pub fn reference(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Default::default() }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DiskList {
    #[serde(default)]
    pub disk: Vec<Disk>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Storage Domains
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageDomains {
    #[serde(default)]
    pub storage_domain: Vec<StorageDomain>,
}

impl StorageDomains {
    pub fn named(name: &str) -> Self {
        Self {
            storage_domain: vec![StorageDomain { name: name.to_string(), storage: None }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.storage_domain.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageDomain {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageDetails {
    /// "iscsi", "fc", "nfs", "glusterfs", "localfs", ...
    #[serde(rename = "type", default)]
    pub storage_type: String,
}

impl StorageDomain {
    pub fn storage_type(&self) -> &str {
        self.storage
            .as_ref()
            .map(|s| s.storage_type.as_str())
            .unwrap_or("")
    }
}

/// Block-backed domains (iSCSI, FC) get `cow` disks when thin provisioned.
pub fn is_block_storage_type(storage_type: &str) -> bool {
    matches!(storage_type.to_ascii_lowercase().as_str(), "iscsi" | "fc")
}

/// Search result; some engine versions wrap the list in `storage_domains`.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct StorageDomainList {
    #[serde(default)]
    pub storage_domain: Vec<StorageDomain>,
    #[serde(default)]
    pub storage_domains: StorageDomains,
}

impl StorageDomainList {
    pub fn into_domains(self) -> impl Iterator<Item = StorageDomain> {
        self.storage_domain
            .into_iter()
            .chain(self.storage_domains.storage_domain)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Disk Attachments
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Guest-visible bus of an attached disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DiskInterface {
    Virtio,
    VirtioScsi,
    VirtioIscsi,
    Ide,
    Sata,
    SpaprVscsi,
    Other(String),
}

impl DiskInterface {
    pub fn as_str(&self) -> &str {
        match self {
            DiskInterface::Virtio => "virtio",
            DiskInterface::VirtioScsi => "virtio_scsi",
            DiskInterface::VirtioIscsi => "virtio_iscsi",
            DiskInterface::Ide => "ide",
            DiskInterface::Sata => "sata",
            DiskInterface::SpaprVscsi => "spapr_vscsi",
            DiskInterface::Other(s) => s,
        }
    }
}

impl Default for DiskInterface {
    fn default() -> Self { Self::VirtioScsi }
}

impl From<&str> for DiskInterface {
    fn from(s: &str) -> Self {
        match s {
            "virtio" => DiskInterface::Virtio,
            "virtio_scsi" => DiskInterface::VirtioScsi,
            "virtio_iscsi" => DiskInterface::VirtioIscsi,
            "ide" => DiskInterface::Ide,
            "sata" => DiskInterface::Sata,
            "spapr_vscsi" => DiskInterface::SpaprVscsi,
            other => DiskInterface::Other(other.to_string()),
        }
    }
}

impl From<String> for DiskInterface {
    fn from(s: String) -> Self {
        DiskInterface::from(s.as_str())
    }
}

impl From<DiskInterface> for String {
    fn from(i: DiskInterface) -> String {
        i.as_str().to_string()
    }
}

impl fmt::Display for DiskInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binding of a disk to a VM. `active` turns true asynchronously.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiskAttachment {
    /// Equal to the disk id in this API
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<DiskInterface>,
    #[serde(default, with = "engine_str::flag")]
    pub active: bool,
    #[serde(default, with = "engine_str::flag")]
    pub read_only: bool,
    #[serde(default, with = "engine_str::flag")]
    pub bootable: bool,
    #[serde(default, with = "engine_str::flag")]
    pub pass_discard: bool,
    #[serde(default)]
    pub disk: Disk,
}

impl DiskAttachment {
    /// Id of the attached disk, falling back to the attachment id.
    pub fn disk_id(&self) -> &str {
        if self.disk.id.is_empty() {
            &self.id
        } else {
            &self.disk.id
        }
    }

    pub fn interface_str(&self) -> &str {
        self.interface.as_ref().map(|i| i.as_str()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct DiskAttachmentList {
    #[serde(default)]
    pub disk_attachment: Vec<DiskAttachment>,
}

/// Observed lifecycle of a volume on a VM; never stored, only derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttachmentState {
    /// No disk with the volume name exists
    Absent,
    /// The disk exists but has no attachment on the VM
    Unattached,
    /// Attachment exists, `active = false`
    Attaching,
    /// Attachment exists, `active = true`
    Active,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Volume spec (callout JSON options)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Size used when a volume is created on attach without an explicit size.
pub const DEFAULT_VOLUME_SIZE_BYTES: u64 = 1 << 30;

/// Volume options passed by the host plugin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VolumeSpec {
    #[serde(rename = "ovirtVolumeName", alias = "oVirtVolumeName", default)]
    pub volume_name: String,
    #[serde(rename = "ovirtStorageDomain", alias = "oVirtStorageDomain", default)]
    pub storage_domain: String,
    /// Human size such as "1G" or "512Mi"
    #[serde(rename = "ovirtVolumeSize", alias = "size", default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(rename = "ovirtDiskInterface", default, skip_serializing_if = "Option::is_none")]
    pub interface: Option<DiskInterface>,
    #[serde(
        rename = "ovirtDiskThinProvisioning",
        default,
        skip_serializing_if = "Option::is_none",
        with = "engine_str::opt_flag"
    )]
    pub thin_provisioning: Option<bool>,
    #[serde(rename = "kubernetes.io/fsType", default, skip_serializing_if = "Option::is_none")]
    pub fs_type: Option<String>,
    /// "rw" or "ro"
    #[serde(rename = "kubernetes.io/readwrite", default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
}

impl VolumeSpec {
    pub fn new(volume_name: &str, storage_domain: &str) -> Self {
        Self {
            volume_name: volume_name.to_string(),
            storage_domain: storage_domain.to_string(),
            ..Default::default()
        }
    }

    pub fn from_json(json: &str) -> OvirtResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| OvirtError::parse(format!("Invalid volume options: {e}")))
    }

    /// Engine-side disk name for this volume.
    pub fn engine_disk_name(&self) -> String {
        to_engine_disk_name(&self.volume_name)
    }

    pub fn is_read_only(&self) -> bool {
        self.mode.as_deref().map(str::trim) == Some("ro")
    }

    pub fn size_bytes(&self) -> OvirtResult<u64> {
        match self.size.as_deref().map(str::trim) {
            None | Some("") => Ok(DEFAULT_VOLUME_SIZE_BYTES),
            Some(s) => parse_size(s),
        }
    }
}

/// Host plugins use `~` where the engine expects `_` in disk names.
pub fn to_engine_disk_name(name: &str) -> String {
    name.replace('~', "_")
}

/// Parse "1G", "512Mi", "10GB" or a plain byte count. Units are binary.
pub fn parse_size(input: &str) -> OvirtResult<u64> {
    let s = input.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits
        .parse()
        .map_err(|_| OvirtError::parse(format!("Invalid size '{input}'")))?;

    let shift = match unit.trim().to_ascii_uppercase().as_str() {
        "" | "B" => 0,
        "K" | "KB" | "KI" | "KIB" => 10,
        "M" | "MB" | "MI" | "MIB" => 20,
        "G" | "GB" | "GI" | "GIB" => 30,
        "T" | "TB" | "TI" | "TIB" => 40,
        "P" | "PB" | "PI" | "PIB" => 50,
        _ => return Err(OvirtError::parse(format!("Invalid size unit in '{input}'"))),
    };

    value
        .checked_mul(1u64 << shift)
        .ok_or_else(|| OvirtError::parse(format!("Size '{input}' overflows")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_accepts_string_booleans() {
        let json = r#"{
            "id": "d69b93df-7e96-11e8-b3fa-001a4a160100",
            "interface": "virtio_scsi",
            "active": "false",
            "read_only": "false",
            "bootable": "false",
            "pass_discard": "true",
            "disk": { "id": "d69b93df-7e96-11e8-b3fa-001a4a160100" }
        }"#;
        let a: DiskAttachment = serde_json::from_str(json).unwrap();
        assert!(!a.active);
        assert!(a.pass_discard);
        assert_eq!(a.interface, Some(DiskInterface::VirtioScsi));
        assert_eq!(a.disk_id(), "d69b93df-7e96-11e8-b3fa-001a4a160100");
    }

    #[test]
    fn attachment_accepts_native_booleans() {
        let a: DiskAttachment =
            serde_json::from_str(r#"{"id":"x","active":true,"interface":"virtio"}"#).unwrap();
        assert!(a.active);
        assert_eq!(a.disk_id(), "x");
    }

    #[test]
    fn disk_reference_serializes_only_id() {
        let v = serde_json::to_value(Disk::reference("abc")).unwrap();
        assert_eq!(v, serde_json::json!({ "id": "abc" }));
    }

    #[test]
    fn disk_sizes_are_strings_on_the_wire() {
        let disk = Disk {
            name: "pvc-1".into(),
            provisioned_size: Some(1073741824),
            format: Some(DiskFormat::Cow),
            sparse: Some(true),
            storage_domains: StorageDomains::named("data1"),
            ..Default::default()
        };
        let v = serde_json::to_value(&disk).unwrap();
        assert_eq!(v["provisioned_size"], "1073741824");
        assert_eq!(v["sparse"], "true");
        assert_eq!(v["format"], "cow");
        assert_eq!(v["storage_domains"]["storage_domain"][0]["name"], "data1");
    }

    #[test]
    fn disk_parses_create_response() {
        let json = r#"{
            "id": "0138c56c-1937-461b-98e1-a1c5c82ae082",
            "name": "pvc-d69b93df-7e96-11e8-b3fa-001a4a160100",
            "actual_size": "0",
            "provisioned_size": "1073741824",
            "status": "locked",
            "format": "cow",
            "storage_domains": { "storage_domain": [{"name": "iscidomain"}] }
        }"#;
        let d: Disk = serde_json::from_str(json).unwrap();
        assert_eq!(d.provisioned_size, Some(1073741824));
        assert_eq!(d.format, Some(DiskFormat::Cow));
        assert_eq!(d.storage_domains.storage_domain[0].name, "iscidomain");
    }

    #[test]
    fn empty_search_result_is_empty_list() {
        let l: DiskList = serde_json::from_str("{}").unwrap();
        assert!(l.disk.is_empty());
        let v: VmList = serde_json::from_str("{}").unwrap();
        assert!(v.vm.is_empty());
    }

    #[test]
    fn unknown_interface_round_trips() {
        let i: DiskInterface = serde_json::from_str("\"nvme\"").unwrap();
        assert_eq!(i, DiskInterface::Other("nvme".into()));
        assert_eq!(serde_json::to_string(&i).unwrap(), "\"nvme\"");
    }

    #[test]
    fn vm_addresses_flatten_reported_devices() {
        let json = r#"{
            "id": "vm-1", "name": "host1", "fqdn": "host1.lab", "status": "up",
            "nics": { "nic": [ { "interface": "virtio", "reported_devices": { "reported_device": [
                { "ips": { "ip": [ {"address": "10.0.0.5", "version": "v4"}, {"address": "fe80::1", "version": "v6"} ] } }
            ] } } ] }
        }"#;
        let vm: Vm = serde_json::from_str(json).unwrap();
        assert_eq!(vm.addresses(), vec!["10.0.0.5", "fe80::1"]);
    }

    #[test]
    fn volume_spec_from_callout_options() {
        let json = r#"{
            "kubernetes.io/fsType": "ext4",
            "kubernetes.io/readwrite": "ro",
            "ovirtStorageDomain": "data1",
            "ovirtVolumeName": "pvc~0001",
            "size": "1G"
        }"#;
        let spec = VolumeSpec::from_json(json).unwrap();
        assert_eq!(spec.engine_disk_name(), "pvc_0001");
        assert!(spec.is_read_only());
        assert_eq!(spec.size_bytes().unwrap(), 1 << 30);
        assert_eq!(spec.storage_domain, "data1");
    }

    #[test]
    fn volume_spec_defaults_size() {
        let spec = VolumeSpec::new("vol1", "data1");
        assert_eq!(spec.size_bytes().unwrap(), DEFAULT_VOLUME_SIZE_BYTES);
        assert!(!spec.is_read_only());
    }

    #[test]
    fn parse_size_units() {
        assert_eq!(parse_size("1073741824").unwrap(), 1073741824);
        assert_eq!(parse_size("512M").unwrap(), 512 << 20);
        assert_eq!(parse_size("2Gi").unwrap(), 2 << 30);
        assert_eq!(parse_size("10GB").unwrap(), 10 << 30);
        assert!(parse_size("12X").is_err());
        assert!(parse_size("G").is_err());
    }

    #[test]
    fn token_usability() {
        let now = Utc::now();
        let t = Token {
            value: "abc".into(),
            expiry: now + chrono::Duration::seconds(60),
            token_type: "Bearer".into(),
        };
        assert!(t.is_usable_at(now));
        assert!(!t.is_usable_at(now + chrono::Duration::seconds(61)));

        let empty = Token { value: String::new(), ..t.clone() };
        assert!(!empty.is_usable_at(now));
        assert!(!format!("{t:?}").contains("abc"));
    }

    #[test]
    fn empty_ca_file_is_unset() {
        let cfg = ConnectionConfig {
            ca_file: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(cfg.ca_file().is_none());
    }

    #[test]
    fn storage_domain_search_shapes() {
        let flat: StorageDomainList =
            serde_json::from_str(r#"{"storage_domain":[{"name":"data1"}]}"#).unwrap();
        assert_eq!(flat.into_domains().next().unwrap().name, "data1");
        let wrapped: StorageDomainList = serde_json::from_str(
            r#"{"storage_domains":{"storage_domain":[{"name":"data2","storage":{"type":"nfs"}}]}}"#,
        )
        .unwrap();
        let sd = wrapped.into_domains().next().unwrap();
        assert_eq!(sd.storage_type(), "nfs");
    }

    #[test]
    fn storage_domain_block_backing() {
        let sd: StorageDomain =
            serde_json::from_str(r#"{"name":"data1","storage":{"type":"iscsi"}}"#).unwrap();
        assert!(is_block_storage_type(sd.storage_type()));
        assert!(is_block_storage_type("FC"));
        assert!(!is_block_storage_type("nfs"));
    }
}
