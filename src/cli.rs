//! Callout command line.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "ovirt-flexdriver", version, about = "oVirt disk attach/detach driver")]
pub struct Cli {
    /// Driver config file (defaults to ovirt-flexdriver.conf next to the binary)
    #[arg(long, env = crate::config::CONFIG_ENV, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Authenticate and report driver capabilities
    Init,
    /// Create the volume if needed and attach it to a node
    Attach {
        /// Volume options as JSON
        json_options: String,
        node_name: String,
    },
    /// Detach a volume from a node
    Detach {
        volume_name: String,
        node_name: String,
    },
    /// Wait for an attached device to become active on this host
    #[command(name = "waitforattach")]
    WaitForAttach {
        device_path: String,
        json_options: Option<String>,
    },
    /// Report whether a volume is attached to a node
    #[command(name = "isattached")]
    IsAttached {
        json_options: String,
        node_name: String,
    },
    /// Report the device path of a volume on this host
    #[command(name = "getvolumename")]
    GetVolumeName { json_options: String },
    #[command(name = "mountdevice")]
    MountDevice {
        mount_dir: String,
        device_path: String,
        json_options: Option<String>,
    },
    #[command(name = "unmountdevice")]
    UnmountDevice { mount_dir: String },
    /// Create an unattached disk (no-op when it exists)
    #[command(name = "create-volume")]
    CreateVolume {
        name: String,
        storage_domain: String,
        /// Size such as 1G or 512M
        size: String,
        #[arg(long)]
        thick: bool,
        #[arg(long)]
        read_only: bool,
    },
    /// Delete a disk by id (no-op when it is gone)
    #[command(name = "delete-volume")]
    DeleteVolume { disk_id: String },
}

impl Command {
    /// Commands answered without talking to the engine.
    pub fn is_local(&self) -> bool {
        matches!(self, Command::MountDevice { .. } | Command::UnmountDevice { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_callout_argv() {
        let cli = Cli::try_parse_from([
            "ovirt-flexdriver",
            "attach",
            r#"{"ovirtVolumeName":"vol1"}"#,
            "host1",
        ])
        .unwrap();
        match cli.command {
            Command::Attach { json_options, node_name } => {
                assert!(json_options.contains("vol1"));
                assert_eq!(node_name, "host1");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn waitforattach_options_are_optional() {
        let cli = Cli::try_parse_from(["ovirt-flexdriver", "waitforattach", "/dev/disk/by-id/virtio-x"])
            .unwrap();
        assert!(matches!(cli.command, Command::WaitForAttach { json_options: None, .. }));
    }

    #[test]
    fn unknown_callout_is_invalid_subcommand() {
        let err = Cli::try_parse_from(["ovirt-flexdriver", "mount", "/mnt"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidSubcommand);
    }

    #[test]
    fn mount_callouts_are_local() {
        let cli = Cli::try_parse_from(["ovirt-flexdriver", "unmountdevice", "/mnt/x"]).unwrap();
        assert!(cli.command.is_local());
    }
}
