// src/pipeline.rs

//! Pipeline orchestration
//!
//! Runs the four stages in order over one exclusive build tree:
//! environment construction, relocation, hook generation, packaging.
//! Each stage is a total function of the previous stage's output
//! directory; there is no feedback loop and no retry. On failure the
//! build tree stays on disk for inspection; on success it is removed
//! unless the spec asks to keep it.
//!
//! All paths are threaded explicitly; the process working directory is
//! never changed.

use crate::environment::{EnvironmentBuilder, Installer};
use crate::error::{Error, Result};
use crate::hooks::HookGenerator;
use crate::package::Packager;
use crate::relocate::Relocator;
use crate::spec::BuildSpec;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One full build-relocate-hook-package run
pub struct Pipeline<'a> {
    installer: &'a dyn Installer,
    packager: &'a dyn Packager,
}

impl<'a> Pipeline<'a> {
    pub fn new(installer: &'a dyn Installer, packager: &'a dyn Packager) -> Self {
        Self {
            installer,
            packager,
        }
    }

    /// Execute the pipeline described by `spec`
    ///
    /// Fails with [`Error::AlreadyExists`] before any filesystem mutation
    /// if the build tree pre-exists and `force` is not set.
    pub fn run(&self, spec: &BuildSpec) -> Result<()> {
        let build_dir = absolute(&spec.build_dir)?;

        if build_dir.exists() {
            if !spec.force {
                return Err(Error::AlreadyExists(build_dir));
            }
            info!("removing previous build tree at {}", build_dir.display());
            fs::remove_dir_all(&build_dir)?;
        }

        let env_dir = build_dir.join(spec.install_root_relative());

        let builder = EnvironmentBuilder::new(self.installer, &spec.pre_install_patterns);
        let env = builder.build(&spec.manifest_path, &env_dir)?;

        let relocator = if spec.relink_local {
            Relocator::new()
        } else {
            Relocator::new().without_local_relink()
        };
        relocator.relocate(&env, env.root(), &spec.install_root)?;

        let hook_dir = build_dir.join(crate::spec::HOOK_DIR);
        HookGenerator::new(&spec.excluded_hook_prefixes).generate(
            &env,
            &hook_dir,
            &spec.install_root,
        )?;

        // package everything under the build tree: the content path must
        // cover the hook links in usr/local/bin, not just the environment
        self.packager.package(
            &build_dir,
            &spec.package_name,
            &spec.package_type,
            Path::new("."),
            &spec.extra_packager_args,
        )?;

        if spec.keep {
            info!("keeping build tree at {}", build_dir.display());
        } else if let Err(e) = fs::remove_dir_all(&build_dir) {
            // the artifact is already produced; a leftover tree is only noise
            warn!("failed to clean up {}: {}", build_dir.display(), e);
        }

        Ok(())
    }
}

fn absolute(path: &std::path::Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
