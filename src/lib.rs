pub mod cli;
pub mod config;
pub mod response;

use clap::Parser;
use cli::{Cli, Command};
use config::DriverConfig;
use ovirt_volume::token_store::FileTokenStore;
use ovirt_volume::types::parse_size;
use ovirt_volume::volume::DiskRequest;
use ovirt_volume::{OvirtApi, OvirtResult, OvirtVolumeService, ResourceClient, VolumeSpec};
use response::{FlexResponse, FlexStatus};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Stderr only: stdout carries the callout JSON.
pub fn init_logging() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init();
}

/// Run one callout against `service`.
pub async fn handle<A: OvirtApi>(
  service: &OvirtVolumeService<A>,
  command: &Command,
) -> OvirtResult<FlexResponse> {
  let response = match command {
    Command::Init => {
      service.api().ensure_authenticated().await?;
      FlexResponse::initialized()
    }
    Command::Attach { json_options, node_name } => {
      let spec = VolumeSpec::from_json(json_options)?;
      FlexResponse::device(service.attach(&spec, node_name).await?)
    }
    Command::Detach { volume_name, node_name } => {
      service.detach(volume_name, node_name).await?;
      FlexResponse::success()
    }
    Command::WaitForAttach { device_path, .. } => {
      FlexResponse::device(service.wait_for_attach(device_path).await?)
    }
    Command::IsAttached { json_options, node_name } => {
      let spec = VolumeSpec::from_json(json_options)?;
      FlexResponse::attached(service.is_attached(&spec, node_name).await?)
    }
    Command::GetVolumeName { json_options } => {
      let spec = VolumeSpec::from_json(json_options)?;
      FlexResponse::volume_name(service.volume_name(&spec).await?)
    }
    Command::CreateVolume { name, storage_domain, size, thick, read_only } => {
      let req = DiskRequest {
        thin: !thick,
        read_only: *read_only,
        ..DiskRequest::new(name, storage_domain, parse_size(size)?)
      };
      let disk = service.create_volume(&req).await?;
      FlexResponse::volume_name(disk.id)
    }
    Command::DeleteVolume { disk_id } => {
      service.delete_volume(disk_id).await?;
      FlexResponse::success()
    }
    Command::MountDevice { .. } | Command::UnmountDevice { .. } => {
      FlexResponse::not_supported("mount is handled by the host")
    }
  };
  Ok(response)
}

async fn dispatch(cli: Cli) -> FlexResponse {
  if cli.command.is_local() {
    return FlexResponse::not_supported("mount is handled by the host");
  }

  let path = cli.config.unwrap_or_else(config::default_config_path);
  let cfg = match DriverConfig::load(&path) {
    Ok(cfg) => cfg,
    Err(e) => return e.into(),
  };
  let store = Arc::new(FileTokenStore::new(&cfg.token_store_path));
  let service = match OvirtVolumeService::<ResourceClient>::connect(cfg.connection(), store, &cfg.vm_name) {
    Ok(s) => s,
    Err(e) => return e.into(),
  };

  match handle(&service, &cli.command).await {
    Ok(r) => r,
    Err(e) => {
      tracing::error!("{:?} failed: {e}", cli.command);
      e.into()
    }
  }
}

/// Parse argv, run the callout and print its result. Returns the exit code.
pub fn run() -> i32 {
  init_logging();

  let cli = match Cli::try_parse() {
    Ok(cli) => cli,
    Err(e) => match e.kind() {
      clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => e.exit(),
      clap::error::ErrorKind::InvalidSubcommand => {
        println!("{}", FlexResponse::not_supported(e.to_string().trim()).to_json());
        return 0;
      }
      _ => {
        println!("{}", FlexResponse::failure(e.to_string().trim()).to_json());
        return 1;
      }
    },
  };

  let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
    Ok(rt) => rt,
    Err(e) => {
      println!("{}", FlexResponse::failure(format!("Failed to start runtime: {e}")).to_json());
      return 1;
    }
  };

  let response = runtime.block_on(dispatch(cli));
  println!("{}", response.to_json());
  if response.status == FlexStatus::Failure {
    1
  } else {
    0
  }
}
