// src/lib.rs

//! envpack
//!
//! Turns a pip requirements manifest into a self-contained, relocatable
//! Python environment and packages it as an installable artifact (deb by
//! default) via the external `fpm` tool.
//!
//! # Architecture
//!
//! A four-stage pipeline over one exclusive build tree:
//!
//! - **Environment Builder**: virtualenv creation plus a two-pass install
//!   that puts native-toolchain-sensitive packages first
//! - **Relocator**: rewrites shebangs, `.pth` path hints, and stray
//!   `local/` entries from the build-time prefix to the install root
//! - **Hook Generator**: symlinks user-facing executables into
//!   `usr/local/bin` inside the tree
//! - **Packager Adapter**: invokes fpm over the finished tree
//!
//! External collaborators (virtualenv/pip, fpm) sit behind the
//! [`Installer`] and [`Packager`] traits.

pub mod environment;
mod error;
pub mod hooks;
pub mod package;
pub mod pipeline;
pub mod process;
pub mod relocate;
pub mod rewrite;
pub mod spec;

pub use environment::{Environment, EnvironmentBuilder, Installer, VirtualenvInstaller};
pub use error::{Error, Result, RewriteFailure};
pub use hooks::HookGenerator;
pub use package::{FpmPackager, Packager};
pub use pipeline::Pipeline;
pub use relocate::Relocator;
pub use rewrite::{relink, replace_with_symlink, rewrite_path_hints, rewrite_shebang, Rewrite};
pub use spec::{
    BuildSpec, DEFAULT_EXCLUDED_HOOK_PREFIXES, DEFAULT_PRE_INSTALL_PATTERNS, HOOK_DIR,
};
