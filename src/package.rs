// src/package.rs

//! Packaging adapter
//!
//! Hands the finished build tree to the external packaging tool. The tool
//! is opaque: it gets a directory, a package name and a target format, and
//! leaves one artifact file in the working directory. Packaging is treated
//! as deterministic and re-runnable, so there is no retry here; a failure
//! means the caller fixes the condition and reruns the pipeline.

use crate::error::{Error, Result};
use crate::process::run_tool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// External artifact producer for a finished build tree
///
/// Implemented by [`FpmPackager`] for real runs; tests substitute a
/// recording double.
pub trait Packager {
    /// Package `content_path` (relative to `build_tree`) into an artifact
    /// of `package_type` named `package_name`
    fn package(
        &self,
        build_tree: &Path,
        package_name: &str,
        package_type: &str,
        content_path: &Path,
        extra_args: &[String],
    ) -> Result<()>;
}

/// Packager backed by the `fpm` tool
#[derive(Debug, Default)]
pub struct FpmPackager {
    timeout: Option<Duration>,
}

impl FpmPackager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound the fpm invocation; no timeout by default
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Packager for FpmPackager {
    fn package(
        &self,
        build_tree: &Path,
        package_name: &str,
        package_type: &str,
        content_path: &Path,
        extra_args: &[String],
    ) -> Result<()> {
        let mut args = vec![
            "-s".to_string(),
            "dir".to_string(),
            "-t".to_string(),
            package_type.to_string(),
            "-C".to_string(),
            build_tree.to_string_lossy().into_owned(),
            "-n".to_string(),
            package_name.to_string(),
        ];
        args.extend(extra_args.iter().cloned());
        args.push(content_path.to_string_lossy().into_owned());

        info!("packaging {} as {}", package_name, package_type);
        let output = run_tool("fpm", &args, self.timeout)?;

        if output.success() {
            Ok(())
        } else {
            Err(Error::PackagingFailed {
                code: output.code,
                output: output.combined(),
            })
        }
    }
}
