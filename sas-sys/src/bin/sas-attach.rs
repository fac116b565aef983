// SPDX-License-Identifier: GPL-3.0-only

//! Attach, detach or resize a SAS volume on this host
//!
//! Low level operations require root privileges.
//!
//! ```text
//! sas-attach attach --wwn 600c0ff000546067369fe36201000000 --lun 1
//! sas-attach -vv attach --target-wwn 600c0ff000546067369fe36201000000 --detach
//! sas-attach attach --wwid 3600c0ff000546067369fe36201000000 --persist /var/lib/sas/vol.json
//! sas-attach detach --from-file /var/lib/sas/vol.json
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use sas_sys::probe::OsProbe;
use sas_sys::{Connector, HostLayout, SasHost, SysError, persist};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Debug, Parser)]
#[command(name = "sas-attach")]
#[command(about = "Discover, attach and detach SAS block devices")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML file overriding the well-known host directories
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Find the device for a volume
    Attach(AttachArgs),

    /// Remove a device (and every multipath member) from the host
    Detach {
        /// Device path, e.g. /dev/dm-1 or /dev/disk/by-id/wwn-0x...
        #[arg(required_unless_present = "from_file", conflicts_with = "from_file")]
        device: Option<String>,

        /// Detach the device recorded in a persisted connector
        #[arg(long)]
        from_file: Option<PathBuf>,
    },

    /// Resize the multipath map behind a device
    #[cfg(feature = "multipath-tools")]
    Resize { device: String },
}

#[derive(Debug, Args)]
struct AttachArgs {
    /// Target WWN, looked up by path together with --lun (repeatable)
    #[arg(long = "wwn", conflicts_with_all = ["target_wwn", "wwids"])]
    wwns: Vec<String>,

    /// LUN paired with --wwn
    #[arg(long, default_value = sas_types::DEFAULT_LUN)]
    lun: String,

    /// Single WWN looked up by id
    #[arg(long, conflicts_with = "wwids")]
    target_wwn: Option<String>,

    /// WWID looked up by id (repeatable)
    #[arg(long = "wwid")]
    wwids: Vec<String>,

    #[arg(long, default_value = "")]
    volume_name: String,

    /// Write the resulting connector to this file
    #[arg(long)]
    persist: Option<PathBuf>,

    /// Detach again right after a successful attach
    #[arg(long)]
    detach: bool,

    /// Print the connector as JSON instead of the device path
    #[arg(long)]
    json: bool,
}

impl AttachArgs {
    fn connector(&self) -> Result<Connector> {
        let connector = if !self.wwns.is_empty() {
            Connector::with_target_wwns(&self.volume_name, self.wwns.clone(), &self.lun)
        } else if let Some(wwn) = &self.target_wwn {
            Connector::with_target_wwn(&self.volume_name, wwn)
        } else if !self.wwids.is_empty() {
            Connector::with_wwids(&self.volume_name, self.wwids.clone())
        } else {
            bail!("one of --wwn, --target-wwn or --wwid is required");
        };
        Ok(connector)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_logging(cli.verbose, cli.log_file.as_deref())?;

    run(cli).inspect_err(|error| {
        if let Some(cause) = error.downcast_ref::<SysError>() {
            let kind = cause.kind();
            tracing::error!(kind = ?kind, code = kind.code(), "{error:#}");
        }
    })
}

fn run(cli: Cli) -> Result<()> {
    let layout = match &cli.config {
        Some(path) => HostLayout::load(path)?,
        None => HostLayout::default(),
    };

    if unsafe { libc::geteuid() } != 0 {
        tracing::error!("sas-attach must run as root");
        bail!("low level SAS operations require root privileges");
    }

    let host = SasHost::with_layout(OsProbe, layout);

    match cli.command {
        Commands::Attach(args) => run_attach(&host, &args),
        Commands::Detach { device, from_file } => {
            let device = match (device, from_file) {
                (Some(device), _) => device,
                (None, Some(path)) => {
                    let connector = persist::load(&path)?;
                    if !connector.is_attached() {
                        bail!("connector in {} has no device path", path.display());
                    }
                    connector.device_path
                }
                (None, None) => bail!("a device or --from-file is required"),
            };
            host.detach(&device)
                .with_context(|| format!("SAS detach failure for {device}"))?;
            tracing::info!(device = %device, "SAS detach success");
            Ok(())
        }
        #[cfg(feature = "multipath-tools")]
        Commands::Resize { device } => {
            let tool = sas_sys::MultipathTool::new(host.layout())?;
            tracing::debug!(binary = %tool.binary_path().display(), "using multipathd");
            tool.resize_map(&device)?;
            tracing::info!(device = %device, "multipath resize success");
            Ok(())
        }
    }
}

fn run_attach(host: &SasHost<OsProbe>, args: &AttachArgs) -> Result<()> {
    let mut connector = args.connector()?;
    tracing::info!(
        mode = connector.identifiers().mode(),
        identifiers = ?connector.identifiers().values(),
        "sas attach"
    );

    let device = host
        .attach(&mut connector)
        .context("SAS attach failure")?;
    tracing::info!(device = %device, multipath = connector.multipath, "SAS attach success");

    if let Some(path) = &args.persist {
        persist::save(&connector, path)?;
        tracing::info!(path = %path.display(), "connector persisted");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&connector)?);
    } else {
        println!("{device}");
    }

    if args.detach {
        host.detach(&device)
            .with_context(|| format!("SAS detach failure for {device}"))?;
        tracing::info!(device = %device, "SAS detach success");
    }

    Ok(())
}

fn init_logging(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sas_sys={level},sas_attach={level},warn")));

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let Some(log_file) = log_file else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    };

    let dir = log_file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .with_context(|| format!("invalid log file path: {}", log_file.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create log directory failed: {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(Some(guard))
}
