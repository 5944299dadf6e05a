//! Callout result printed on stdout.

use ovirt_volume::OvirtError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum FlexStatus {
    Success,
    Failure,
    #[serde(rename = "Not supported")]
    NotSupported,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Capabilities {
    pub attach: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FlexResponse {
    pub status: FlexStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Capabilities>,
}

impl FlexResponse {
    fn with_status(status: FlexStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            device: None,
            volume_name: None,
            attached: None,
            capabilities: None,
        }
    }

    pub fn success() -> Self {
        Self::with_status(FlexStatus::Success, "")
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::with_status(FlexStatus::Failure, message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::with_status(FlexStatus::NotSupported, message)
    }

    pub fn device(path: String) -> Self {
        Self { device: Some(path), ..Self::success() }
    }

    pub fn volume_name(name: String) -> Self {
        Self { volume_name: Some(name), ..Self::success() }
    }

    pub fn attached(attached: bool) -> Self {
        Self { attached: Some(attached), ..Self::success() }
    }

    pub fn initialized() -> Self {
        Self {
            capabilities: Some(Capabilities { attach: true }),
            ..Self::success()
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == FlexStatus::Success
    }

    pub fn to_json(&self) -> String {
        // Only strings, bools and options: serialization cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"status":"Failure","message":"response serialization failed"}"#.to_string()
        })
    }
}

impl From<OvirtError> for FlexResponse {
    fn from(e: OvirtError) -> Self {
        FlexResponse::failure(e.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(r: &FlexResponse) -> serde_json::Value {
        serde_json::from_str(&r.to_json()).unwrap()
    }

    #[test]
    fn init_reports_attach_capability() {
        assert_eq!(
            value(&FlexResponse::initialized()),
            json!({"status": "Success", "message": "", "capabilities": {"attach": true}})
        );
    }

    #[test]
    fn attach_reports_device() {
        let r = FlexResponse::device("/dev/disk/by-id/virtio-0138c56c-1937-46".into());
        assert_eq!(
            value(&r),
            json!({"status": "Success", "message": "", "device": "/dev/disk/by-id/virtio-0138c56c-1937-46"})
        );
    }

    #[test]
    fn camel_case_volume_name() {
        let v = value(&FlexResponse::volume_name("pvc-1".into()));
        assert_eq!(v["volumeName"], "pvc-1");
    }

    #[test]
    fn not_supported_status_text() {
        let v = value(&FlexResponse::not_supported("mountdevice"));
        assert_eq!(v["status"], "Not supported");
    }

    #[test]
    fn error_becomes_failure() {
        let r: FlexResponse = OvirtError::node_not_found("host9").into();
        assert_eq!(r.status, FlexStatus::Failure);
        assert_eq!(r.message, "VM host9 doesn't exist");
        assert_eq!(value(&r)["attached"], serde_json::Value::Null);
    }
}
