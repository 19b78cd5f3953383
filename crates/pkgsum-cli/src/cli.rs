use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use pkgsum_core::config;
use pkgsum_core::inventory::FsInventory;
use pkgsum_core::{InventoryState, PackageRegistry};

/// Top-level CLI for the pkgsum package inventory.
#[derive(Debug, Parser)]
#[command(name = "pkgsum")]
#[command(about = "pkgsum: installed-package inventory with on-demand SHA-256 checksums", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// List installed packages.
    List {
        /// Manifest root directory (overrides the configured one).
        #[arg(long)]
        root: Option<PathBuf>,
    },

    /// Compute and print the SHA-256 checksum of one package's installer.
    Checksum {
        /// Package identifier.
        package: String,

        /// Manifest root directory (overrides the configured one).
        #[arg(long)]
        root: Option<PathBuf>,

        /// Give up waiting for the checksum after this many seconds.
        #[arg(long, default_value_t = 60)]
        timeout_secs: u64,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::List { root } => list(resolve_root(root, &cfg)?).await,
            CliCommand::Checksum {
                package,
                root,
                timeout_secs,
            } => checksum(resolve_root(root, &cfg)?, &package, timeout_secs).await,
        }
    }
}

fn resolve_root(flag: Option<PathBuf>, cfg: &config::PkgsumConfig) -> Result<PathBuf> {
    flag.or_else(|| cfg.manifest_root.clone()).context(
        "no manifest root configured (pass --root or set manifest_root in config.toml)",
    )
}

async fn load_registry(root: PathBuf) -> Result<PackageRegistry<FsInventory>> {
    let registry = PackageRegistry::new(FsInventory::new(root));
    registry.load_all().await?;
    Ok(registry)
}

async fn list(root: PathBuf) -> Result<()> {
    let registry = load_registry(root).await?;
    let state = registry.current();
    let snapshot = match state.snapshot() {
        Some(snapshot) => snapshot,
        None => bail!("inventory not loaded"),
    };

    for record in snapshot.sorted_by_name() {
        println!(
            "{:<40} {:<16} {:<64} {}",
            record.package_id,
            record.version_name,
            record.checksum.as_deref().unwrap_or("-"),
            record.display_name,
        );
    }
    tracing::info!(packages = snapshot.len(), "listed inventory");
    Ok(())
}

async fn checksum(root: PathBuf, package: &str, timeout_secs: u64) -> Result<()> {
    let registry = load_registry(root).await?;
    if registry
        .current()
        .snapshot()
        .and_then(|s| s.get(package).cloned())
        .is_none()
    {
        bail!("package not found: {package}");
    }

    let mut sub = registry.subscribe();
    registry.ensure_checksum(package);

    let has_digest = |state: &InventoryState| {
        state
            .snapshot()
            .and_then(|s| s.get(package))
            .map(|r| r.checksum.is_some())
            .unwrap_or(false)
    };
    let state = tokio::time::timeout(
        Duration::from_secs(timeout_secs),
        sub.wait_for(has_digest),
    )
    .await
    .with_context(|| format!("checksum unavailable for {package} (timed out after {timeout_secs}s)"))?
    .context("registry closed before the checksum arrived")?;

    let digest = state
        .snapshot()
        .and_then(|s| s.get(package))
        .and_then(|r| r.checksum.clone())
        .context("checksum missing from final state")?;
    println!("{digest}  {package}");
    Ok(())
}
