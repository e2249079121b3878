// src/relocate.rs

//! Environment relocation
//!
//! Walks a freshly built environment and removes every reference to its
//! build-time absolute location, substituting the install root the tree
//! will occupy on the target machine. Three independent passes, each
//! confined to its own region of the tree:
//!
//! - executable directory: interpreter directives in `bin/*`
//! - library tree: `.pth` path-hint files under `lib/`
//! - auxiliary directory: entries under `local/` replaced with symlinks
//!   into the final install location
//!
//! The passes share no files, so they run as parallel tasks with no
//! synchronization beyond the final join. Relocation is best-effort:
//! a failed rewrite is logged and collected but never stops a pass, so a
//! partial relocation leaves the maximum diagnostic trail; the stage as a
//! whole fails if any item failed.

use crate::environment::Environment;
use crate::error::{Error, Result, RewriteFailure};
use crate::rewrite;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Relocates environments from their build-time prefix to their final
/// install root
#[derive(Debug, Clone)]
pub struct Relocator {
    relink_local: bool,
}

impl Relocator {
    pub fn new() -> Self {
        Self { relink_local: true }
    }

    /// Skip the `local/` relink pass
    ///
    /// The pass reproduces a quirk of some installers and is not needed
    /// on every target platform.
    pub fn without_local_relink(mut self) -> Self {
        self.relink_local = false;
        self
    }

    /// Rewrite every path-sensitive artifact in `env`
    ///
    /// `build_prefix` is the environment's build-time absolute root;
    /// `final_prefix` is the root it will occupy once installed.
    pub fn relocate(&self, env: &Environment, build_prefix: &Path, final_prefix: &Path) -> Result<()> {
        let old = build_prefix.to_string_lossy();
        let new = final_prefix.to_string_lossy();

        info!(
            "relocating {} -> {}",
            build_prefix.display(),
            final_prefix.display()
        );

        let (mut failures, (hint_failures, local_failures)) = rayon::join(
            || self.rewrite_executables(env, &old, &new),
            || {
                rayon::join(
                    || self.rewrite_path_hints(env, &old, &new),
                    || self.relink_local_entries(env, final_prefix),
                )
            },
        );
        failures.extend(hint_failures);
        failures.extend(local_failures);

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::Relocation(failures))
        }
    }

    /// Pass 1: interpreter directives in the executable directory
    fn rewrite_executables(&self, env: &Environment, old: &str, new: &str) -> Vec<RewriteFailure> {
        let pattern = env.bin_dir().join("*").to_string_lossy().into_owned();
        let mut failures = Vec::new();

        let Ok(entries) = glob::glob(&pattern) else {
            return failures;
        };
        for entry in entries.flatten() {
            // symlinks in bin/ (python -> python2.7) resolve to binaries
            // whose first line is no directive; they fall through unchanged
            if !entry.is_file() {
                continue;
            }
            debug!("checking {}", entry.display());
            if let Err(e) = rewrite::rewrite_shebang(&entry, old, new) {
                record_failure(&mut failures, &entry, e);
            }
        }
        failures
    }

    /// Pass 2: path-hint files under the library tree
    fn rewrite_path_hints(&self, env: &Environment, old: &str, new: &str) -> Vec<RewriteFailure> {
        let mut failures = Vec::new();

        for entry in WalkDir::new(env.lib_dir())
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "pth"))
        {
            let path = entry.path();
            if let Err(e) = rewrite::rewrite_path_hints(path, old, new) {
                record_failure(&mut failures, path, e);
            }
        }
        failures
    }

    /// Pass 3: replace auxiliary-directory entries with final-path symlinks
    fn relink_local_entries(&self, env: &Environment, final_prefix: &Path) -> Vec<RewriteFailure> {
        let mut failures = Vec::new();
        if !self.relink_local {
            return failures;
        }

        let local = env.local_dir();
        let Ok(entries) = fs::read_dir(&local) else {
            // no local/ directory on this platform's installer
            return failures;
        };

        // local/<name> mirrors a top-level environment directory, so the
        // installed link must point at <final_prefix>/<name>, not back
        // into local/ (which would be a self-loop once installed)
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let target = final_prefix.join(entry.file_name());
            if let Err(e) = rewrite::replace_with_symlink(&path, &target) {
                record_failure(&mut failures, &path, e);
            }
        }
        failures
    }
}

impl Default for Relocator {
    fn default() -> Self {
        Self::new()
    }
}

fn record_failure(failures: &mut Vec<RewriteFailure>, path: &Path, err: Error) {
    warn!("relocation failure at {}: {}", path.display(), err);
    failures.push(RewriteFailure {
        path: path.to_path_buf(),
        reason: err.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs as unix_fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Lay out a plausible venv under `root`
    fn fake_env(root: &Path) -> Environment {
        let bin = root.join("bin");
        let site = root.join("lib/python2.7/site-packages");
        fs::create_dir_all(&bin).unwrap();
        fs::create_dir_all(&site).unwrap();

        let script = bin.join("flask");
        fs::write(
            &script,
            format!("#!{}/bin/python\nimport flask\n", root.display()),
        )
        .unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        fs::write(bin.join("activate"), "# shell helper, no shebang\n").unwrap();

        fs::write(
            site.join("extras.pth"),
            format!("{}/lib/python2.7/site-packages/extras\n", root.display()),
        )
        .unwrap();

        let local = root.join("local");
        fs::create_dir_all(&local).unwrap();
        unix_fs::symlink(root.join("bin"), local.join("bin")).unwrap();

        Environment::new(root)
    }

    #[test]
    fn relocates_all_three_artifact_kinds() {
        let dir = TempDir::new().unwrap();
        let env_root = dir.path().join("home/demo");
        let env = fake_env(&env_root);

        Relocator::new()
            .relocate(&env, &env_root, Path::new("/home/demo"))
            .unwrap();

        let shebang = fs::read_to_string(env_root.join("bin/flask")).unwrap();
        assert!(shebang.starts_with("#!/home/demo/bin/python\n"));

        let pth = fs::read_to_string(
            env_root.join("lib/python2.7/site-packages/extras.pth"),
        )
        .unwrap();
        assert_eq!(pth, "/home/demo/lib/python2.7/site-packages/extras\n");

        let link = fs::read_link(env_root.join("local/bin")).unwrap();
        assert_eq!(link, Path::new("/home/demo/bin"));
    }

    #[test]
    fn relinked_local_entry_never_points_at_its_own_installed_path() {
        let dir = TempDir::new().unwrap();
        let env_root = dir.path().join("home/demo");
        let env = fake_env(&env_root);

        Relocator::new()
            .relocate(&env, &env_root, Path::new("/home/demo"))
            .unwrap();

        // once installed, the link lives at /home/demo/local/bin; a target
        // equal to that path would resolve to itself (ELOOP)
        let target = fs::read_link(env_root.join("local/bin")).unwrap();
        assert_ne!(target, Path::new("/home/demo/local/bin"));
        assert_eq!(target, Path::new("/home/demo/bin"));
    }

    #[test]
    fn relocation_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let env_root = dir.path().join("home/demo");
        let env = fake_env(&env_root);

        let relocator = Relocator::new();
        relocator
            .relocate(&env, &env_root, Path::new("/home/demo"))
            .unwrap();
        let shebang_once = fs::read(env_root.join("bin/flask")).unwrap();

        relocator
            .relocate(&env, &env_root, Path::new("/home/demo"))
            .unwrap();
        assert_eq!(fs::read(env_root.join("bin/flask")).unwrap(), shebang_once);
    }

    #[test]
    fn local_relink_can_be_disabled() {
        let dir = TempDir::new().unwrap();
        let env_root = dir.path().join("home/demo");
        let env = fake_env(&env_root);

        Relocator::new()
            .without_local_relink()
            .relocate(&env, &env_root, Path::new("/home/demo"))
            .unwrap();

        // still pointing into the build tree
        let link = fs::read_link(env_root.join("local/bin")).unwrap();
        assert_eq!(link, env_root.join("bin"));
    }

    #[test]
    fn failed_rewrite_is_collected_and_other_passes_still_complete() {
        let dir = TempDir::new().unwrap();
        let env_root = dir.path().join("home/demo");
        let env = fake_env(&env_root);

        // a path-hint file that cannot be read as text fails its rewrite
        let bad_pth = env_root.join("lib/python2.7/site-packages/broken.pth");
        let mut bytes = format!("{}/lib\n", env_root.display()).into_bytes();
        bytes.extend_from_slice(&[0xff, 0xfe]);
        fs::write(&bad_pth, bytes).unwrap();

        let err = Relocator::new()
            .relocate(&env, &env_root, Path::new("/home/demo"))
            .unwrap_err();

        // the aggregate names exactly the failing path
        let Error::Relocation(failures) = err else {
            panic!("expected an aggregate relocation error");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path, bad_pth);

        // the other passes ran to completion despite the failure
        let shebang = fs::read_to_string(env_root.join("bin/flask")).unwrap();
        assert!(shebang.starts_with("#!/home/demo/bin/python\n"));
        let link = fs::read_link(env_root.join("local/bin")).unwrap();
        assert_eq!(link, Path::new("/home/demo/bin"));

        // the healthy path-hint file in the same pass was still rewritten
        let pth = fs::read_to_string(
            env_root.join("lib/python2.7/site-packages/extras.pth"),
        )
        .unwrap();
        assert_eq!(pth, "/home/demo/lib/python2.7/site-packages/extras\n");
    }

    #[test]
    fn missing_local_dir_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let env_root = dir.path().join("home/demo");
        let env = fake_env(&env_root);
        fs::remove_file(env_root.join("local/bin")).unwrap();
        fs::remove_dir(env_root.join("local")).unwrap();

        Relocator::new()
            .relocate(&env, &env_root, Path::new("/home/demo"))
            .unwrap();
    }
}
