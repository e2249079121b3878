// tests/common/mod.rs

//! Shared test doubles and helpers for integration tests.
//!
//! The fakes stand in for the external collaborators (virtualenv/pip and
//! fpm) and record every invocation so tests can assert on ordering and
//! arguments without running real tools.

use envpack::{Installer, Packager, Result};
use std::fs;
use std::os::unix::fs as unix_fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// One recorded installer invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallerCall {
    Create(PathBuf),
    Packages(Vec<String>),
    Requirements(PathBuf),
}

/// Installer double that lays out a plausible virtualenv and records calls
#[derive(Default)]
pub struct FakeInstaller {
    pub calls: Mutex<Vec<InstallerCall>>,
}

impl FakeInstaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<InstallerCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Installer for FakeInstaller {
    fn create_env(&self, env_root: &Path) -> Result<()> {
        let bin = env_root.join("bin");
        fs::create_dir_all(&bin)?;

        // user-facing script with a build-time shebang
        write_executable(
            &bin.join("flask"),
            &format!("#!{}/bin/python\nimport flask\n", env_root.display()),
        )?;
        // internal tooling, excluded from hook generation
        write_executable(
            &bin.join("pip"),
            &format!("#!{}/bin/python\nimport pip\n", env_root.display()),
        )?;
        write_executable(&bin.join("python"), "\x7fELF not a script\n")?;
        fs::write(bin.join("activate"), "# shell helper, no shebang\n")?;

        // path-hint file carrying the build-time prefix
        let site = env_root.join("lib/python2.7/site-packages");
        fs::create_dir_all(&site)?;
        fs::write(
            site.join("extras.pth"),
            format!("{}/lib/python2.7/site-packages/extras\n", env_root.display()),
        )?;

        // installer quirk: absolute-path entry under local/
        let local = env_root.join("local");
        fs::create_dir_all(&local)?;
        unix_fs::symlink(env_root.join("bin"), local.join("bin"))?;

        self.calls
            .lock()
            .unwrap()
            .push(InstallerCall::Create(env_root.to_path_buf()));
        Ok(())
    }

    fn install_packages(&self, _env_root: &Path, specs: &[String]) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(InstallerCall::Packages(specs.to_vec()));
        Ok(())
    }

    fn install_requirements(&self, _env_root: &Path, manifest: &Path) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(InstallerCall::Requirements(manifest.to_path_buf()));
        Ok(())
    }
}

/// One recorded packager invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackagerCall {
    pub build_tree: PathBuf,
    pub package_name: String,
    pub package_type: String,
    pub content_path: PathBuf,
    pub extra_args: Vec<String>,
}

/// Packager double that records its single invocation
#[derive(Default)]
pub struct FakePackager {
    pub calls: Mutex<Vec<PackagerCall>>,
}

impl FakePackager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<PackagerCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl Packager for FakePackager {
    fn package(
        &self,
        build_tree: &Path,
        package_name: &str,
        package_type: &str,
        content_path: &Path,
        extra_args: &[String],
    ) -> Result<()> {
        self.calls.lock().unwrap().push(PackagerCall {
            build_tree: build_tree.to_path_buf(),
            package_name: package_name.to_string(),
            package_type: package_type.to_string(),
            content_path: content_path.to_path_buf(),
            extra_args: extra_args.to_vec(),
        });
        Ok(())
    }
}

/// Write a requirements manifest under `dir` and return its path
pub fn write_manifest(dir: &Path, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

fn write_executable(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, content)?;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}
