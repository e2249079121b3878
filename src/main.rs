// src/main.rs

use anyhow::Result;
use clap::Parser;
use envpack::{BuildSpec, FpmPackager, Pipeline, VirtualenvInstaller};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "envpack")]
#[command(author, version, about = "Build a relocatable Python environment and package it", long_about = None)]
struct Cli {
    /// Requirements manifest (one dependency specifier per line)
    manifest: PathBuf,

    /// Package name (default: manifest basename without extension)
    #[arg(short, long)]
    name: Option<String>,

    /// Absolute path the environment will occupy once installed
    /// (default: /home/<name>)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Target artifact format handed to fpm
    #[arg(short = 't', long, default_value = "deb")]
    package_type: String,

    /// Staging directory for the build tree
    #[arg(short, long, default_value = "build")]
    build_dir: PathBuf,

    /// Remove a pre-existing build directory instead of failing
    #[arg(short, long)]
    force: bool,

    /// Keep the build tree on disk after packaging
    #[arg(short, long)]
    keep: bool,

    /// Substring pattern selecting manifest lines to install before the
    /// full manifest (repeatable; replaces the default set)
    #[arg(long = "pre-install-pattern", value_name = "PATTERN")]
    pre_install_patterns: Vec<String>,

    /// Skip relinking entries under the environment's local/ directory
    #[arg(long)]
    no_relink_local: bool,

    /// Timeout in seconds for each external tool invocation
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,

    /// Extra argument passed through to fpm (repeatable)
    #[arg(long = "fpm-arg", value_name = "ARG", allow_hyphen_values = true)]
    extra_packager_args: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut spec = BuildSpec::new(cli.manifest, cli.name, cli.root);
    spec.package_type = cli.package_type;
    spec.build_dir = cli.build_dir;
    spec.force = cli.force;
    spec.keep = cli.keep;
    spec.relink_local = !cli.no_relink_local;
    spec.extra_packager_args = cli.extra_packager_args;
    if !cli.pre_install_patterns.is_empty() {
        spec.pre_install_patterns = cli.pre_install_patterns;
    }

    let timeout = cli.timeout.map(Duration::from_secs);
    let installer = match timeout {
        Some(t) => VirtualenvInstaller::new().with_timeout(t),
        None => VirtualenvInstaller::new(),
    };
    let packager = match timeout {
        Some(t) => FpmPackager::new().with_timeout(t),
        None => FpmPackager::new(),
    };

    info!(
        "building package '{}' from {}",
        spec.package_name,
        spec.manifest_path.display()
    );

    Pipeline::new(&installer, &packager).run(&spec)?;

    println!(
        "packaged '{}' as {} (install root {})",
        spec.package_name,
        spec.package_type,
        spec.install_root.display()
    );
    Ok(())
}
