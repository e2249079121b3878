// src/spec.rs

//! Build specification and staging-tree layout
//!
//! A [`BuildSpec`] is the immutable input to one pipeline run: which
//! manifest to install, where the environment will live once installed,
//! and how to package the result. The derived path helpers define the
//! staging-tree shape the packager ingests:
//!
//! ```text
//! <build_dir>/<install_root>/bin/*        relocated environment
//! <build_dir>/<install_root>/local/*      relinked installer quirk entries
//! <build_dir>/usr/local/bin/*             entry-point hook symlinks
//! ```

use std::path::{Path, PathBuf};

/// Native-toolchain-sensitive package name fragments installed in a first
/// pass, before the full manifest. Packages whose build step imports one
/// of these must find it already installed.
pub const DEFAULT_PRE_INSTALL_PATTERNS: &[&str] = &["numpy", "scipy", "cython"];

/// Executable-name prefixes excluded from entry-point hook generation:
/// the installer tool, the interpreter itself, and activation helpers.
pub const DEFAULT_EXCLUDED_HOOK_PREFIXES: &[&str] = &["pip", "easy_install", "python", "activate"];

/// Conventional system location for entry-point hooks, relative to the
/// build tree root.
pub const HOOK_DIR: &str = "usr/local/bin";

/// Immutable input describing one packaging run
#[derive(Debug, Clone)]
pub struct BuildSpec {
    /// Line-oriented dependency manifest (pip requirements file)
    pub manifest_path: PathBuf,
    /// Artifact name; defaults to the manifest basename without extension
    pub package_name: String,
    /// Absolute path the environment will occupy once installed
    pub install_root: PathBuf,
    /// Target artifact format handed to the packager (e.g. "deb")
    pub package_type: String,
    /// Free-form extra flags appended to the packager invocation
    pub extra_packager_args: Vec<String>,
    /// Staging directory for this run; exclusive to one pipeline invocation
    pub build_dir: PathBuf,
    /// Remove a pre-existing build directory instead of failing
    pub force: bool,
    /// Leave the build tree on disk after packaging
    pub keep: bool,
    /// Substring patterns selecting manifest lines for the pre-install pass
    pub pre_install_patterns: Vec<String>,
    /// Name prefixes excluded from hook generation
    pub excluded_hook_prefixes: Vec<String>,
    /// Replace entries under the environment's `local/` directory with
    /// symlinks into the final install location (installer quirk workaround)
    pub relink_local: bool,
}

impl BuildSpec {
    /// Create a spec with defaults derived from the manifest path
    ///
    /// The package name falls back to the manifest basename without its
    /// extension, and the install root to `/home/<name>`.
    pub fn new(
        manifest_path: impl Into<PathBuf>,
        package_name: Option<String>,
        install_root: Option<PathBuf>,
    ) -> Self {
        let manifest_path = manifest_path.into();
        let package_name = package_name.unwrap_or_else(|| {
            manifest_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "environment".to_string())
        });
        let install_root =
            install_root.unwrap_or_else(|| Path::new("/home").join(&package_name));

        Self {
            manifest_path,
            package_name,
            install_root,
            package_type: "deb".to_string(),
            extra_packager_args: Vec::new(),
            build_dir: PathBuf::from("build"),
            force: false,
            keep: false,
            pre_install_patterns: DEFAULT_PRE_INSTALL_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            excluded_hook_prefixes: DEFAULT_EXCLUDED_HOOK_PREFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            relink_local: true,
        }
    }

    /// The install root as a path relative to the build tree root
    pub fn install_root_relative(&self) -> PathBuf {
        rootless(&self.install_root)
    }

    /// Build-time location of the environment: `build_dir + install_root`
    pub fn env_dir(&self) -> PathBuf {
        self.build_dir.join(self.install_root_relative())
    }

    /// Location of the entry-point hook directory inside the build tree
    pub fn hook_dir(&self) -> PathBuf {
        self.build_dir.join(HOOK_DIR)
    }
}

/// Strip the leading root component so an absolute path can be joined
/// under the build tree
fn rootless(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, std::path::Component::RootDir))
        .collect()
}
