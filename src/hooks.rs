// src/hooks.rs

//! Entry-point hook generation
//!
//! Exposes an environment's user-facing executables at a conventional
//! system location (`usr/local/bin` inside the build tree) as symlinks
//! targeting the *final* install location, so a shell on the target
//! machine finds them without touching PATH. Bootstrap and internal
//! tooling (pip, the interpreter, activation helpers) stays unexposed.

use crate::environment::Environment;
use crate::error::{Error, Result};
use std::fs;
use std::os::unix::fs as unix_fs;
use std::path::Path;
use tracing::{debug, info};

/// Generates entry-point hook symlinks for an environment
pub struct HookGenerator<'a> {
    /// Case-sensitive name prefixes to exclude
    excluded_prefixes: &'a [String],
}

impl<'a> HookGenerator<'a> {
    pub fn new(excluded_prefixes: &'a [String]) -> Self {
        Self { excluded_prefixes }
    }

    /// Populate `hook_dir` with links into `install_root/bin`
    ///
    /// Creates `hook_dir` if absent. Re-running against an already-hooked
    /// directory replaces existing links rather than failing.
    pub fn generate(
        &self,
        env: &Environment,
        hook_dir: &Path,
        install_root: &Path,
    ) -> Result<()> {
        fs::create_dir_all(hook_dir)
            .map_err(|e| hook_err(hook_dir, &e))?;

        let entries = fs::read_dir(env.bin_dir())
            .map_err(|e| hook_err(&env.bin_dir(), &e))?;

        for entry in entries {
            let entry = entry.map_err(|e| hook_err(&env.bin_dir(), &e))?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if self.is_excluded(&name_str) {
                debug!("skipping internal executable {}", name_str);
                continue;
            }

            let target = install_root.join("bin").join(&name);
            let link = hook_dir.join(&name);

            // idempotent re-run: drop any previous link first
            if fs::symlink_metadata(&link).is_ok() {
                fs::remove_file(&link).map_err(|e| hook_err(&link, &e))?;
            }
            unix_fs::symlink(&target, &link).map_err(|e| hook_err(&link, &e))?;
            info!("hooked {} -> {}", link.display(), target.display());
        }

        Ok(())
    }

    fn is_excluded(&self, name: &str) -> bool {
        self.excluded_prefixes.iter().any(|p| name.starts_with(p))
    }
}

fn hook_err(path: &Path, err: &dyn std::fmt::Display) -> Error {
    Error::HookGeneration(format!("{}: {}", path.display(), err))
}
