// src/environment.rs

//! Isolated environment construction
//!
//! Builds the runtime tree the rest of the pipeline operates on: an
//! isolated Python environment created at `build_dir + install_root` and
//! populated from a line-oriented requirements manifest.
//!
//! Dependency resolution itself is an external collaborator behind the
//! [`Installer`] trait; the builder owns only the ordering contract.
//! Native-toolchain-sensitive packages (anything matching a pre-install
//! pattern) are installed in a first pass before the full manifest,
//! because a package whose setup step imports one of them will fail
//! non-deterministically if it happens to be listed first in the manifest.
//! This is a correctness requirement, not an optimization.

use crate::error::{Error, Result};
use crate::process::run_tool;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// A dependency-installed runtime rooted at a build-time absolute path
///
/// Immediately after creation every path-sensitive artifact inside it
/// references this build-time root, which is wrong for the final machine;
/// the relocation stage fixes that up.
#[derive(Debug, Clone)]
pub struct Environment {
    root: PathBuf,
}

impl Environment {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Build-time absolute root of the environment
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Executable directory (`<root>/bin`)
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// Library directory scanned for path-hint files
    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    /// Platform-specific auxiliary directory some installers populate with
    /// absolute-path-bearing entries
    pub fn local_dir(&self) -> PathBuf {
        self.root.join("local")
    }
}

/// External dependency installer for an environment
///
/// Implemented by [`VirtualenvInstaller`] for real runs; tests substitute
/// a recording double to observe invocation ordering.
pub trait Installer {
    /// Create an empty isolated environment at `env_root`
    fn create_env(&self, env_root: &Path) -> Result<()>;

    /// Install explicit package specifiers into the environment
    fn install_packages(&self, env_root: &Path, specs: &[String]) -> Result<()>;

    /// Install everything listed in a requirements manifest
    fn install_requirements(&self, env_root: &Path, manifest: &Path) -> Result<()>;
}

/// Installer backed by the `virtualenv` tool and the environment's own pip
#[derive(Debug, Default)]
pub struct VirtualenvInstaller {
    timeout: Option<Duration>,
}

impl VirtualenvInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound each external tool invocation; no timeout by default
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    fn pip(&self, env_root: &Path) -> String {
        env_root.join("bin").join("pip").to_string_lossy().into_owned()
    }

    fn check(&self, tool: &str, args: &[String]) -> Result<()> {
        let output = run_tool(tool, args, self.timeout)?;
        if output.success() {
            Ok(())
        } else {
            Err(Error::InstallationFailed(format!(
                "'{}' exited with code {}:\n{}",
                tool,
                output.code,
                output.combined()
            )))
        }
    }
}

impl Installer for VirtualenvInstaller {
    fn create_env(&self, env_root: &Path) -> Result<()> {
        self.check("virtualenv", &[env_root.to_string_lossy().into_owned()])
    }

    fn install_packages(&self, env_root: &Path, specs: &[String]) -> Result<()> {
        let mut args = vec!["install".to_string()];
        args.extend(specs.iter().cloned());
        self.check(&self.pip(env_root), &args)
    }

    fn install_requirements(&self, env_root: &Path, manifest: &Path) -> Result<()> {
        self.check(
            &self.pip(env_root),
            &[
                "install".to_string(),
                "--requirement".to_string(),
                manifest.to_string_lossy().into_owned(),
            ],
        )
    }
}

/// Builds an [`Environment`] from a requirements manifest
pub struct EnvironmentBuilder<'a> {
    installer: &'a dyn Installer,
    pre_install_patterns: &'a [String],
}

impl<'a> EnvironmentBuilder<'a> {
    pub fn new(installer: &'a dyn Installer, pre_install_patterns: &'a [String]) -> Self {
        Self {
            installer,
            pre_install_patterns,
        }
    }

    /// Create the environment at `env_root` and install the manifest
    ///
    /// Fails with [`Error::AlreadyExists`] if `env_root` is already
    /// present; installer failures propagate as
    /// [`Error::InstallationFailed`] and leave the partial tree on disk
    /// for inspection.
    pub fn build(&self, manifest: &Path, env_root: &Path) -> Result<Environment> {
        if env_root.exists() {
            return Err(Error::AlreadyExists(env_root.to_path_buf()));
        }
        fs::create_dir_all(env_root)?;

        info!("creating environment in {}", env_root.display());
        self.installer.create_env(env_root)?;

        let pre_install = self.pre_install_lines(manifest)?;
        if !pre_install.is_empty() {
            info!(
                "pre-installing build-time dependencies: {}",
                pre_install.join(", ")
            );
            self.installer.install_packages(env_root, &pre_install)?;
        }

        info!("installing requirements from {}", manifest.display());
        self.installer.install_requirements(env_root, manifest)?;

        Ok(Environment::new(env_root))
    }

    /// Manifest lines matching a native-toolchain-sensitive pattern
    ///
    /// Comment and blank lines are skipped, matching pip's manifest
    /// syntax; matching is plain substring, case-sensitive.
    fn pre_install_lines(&self, manifest: &Path) -> Result<Vec<String>> {
        let file = fs::File::open(manifest)?;
        let mut matches = Vec::new();

        for line in BufReader::new(file).lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if self.pre_install_patterns.iter().any(|p| line.contains(p)) {
                debug!("pre-install match: {}", line);
                matches.push(line.to_string());
            }
        }

        Ok(matches)
    }
}
