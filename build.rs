// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("envpack")
        .version(env!("CARGO_PKG_VERSION"))
        .author("envpack Contributors")
        .about("Build a relocatable Python environment and package it")
        .arg(
            Arg::new("manifest")
                .required(true)
                .help("Requirements manifest (one dependency specifier per line)"),
        )
        .arg(
            Arg::new("name")
                .short('n')
                .long("name")
                .help("Package name (default: manifest basename without extension)"),
        )
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .help("Absolute path the environment will occupy once installed"),
        )
        .arg(
            Arg::new("package_type")
                .short('t')
                .long("package-type")
                .default_value("deb")
                .help("Target artifact format handed to fpm"),
        )
        .arg(
            Arg::new("build_dir")
                .short('b')
                .long("build-dir")
                .default_value("build")
                .help("Staging directory for the build tree"),
        )
        .arg(
            Arg::new("force")
                .short('f')
                .long("force")
                .action(ArgAction::SetTrue)
                .help("Remove a pre-existing build directory instead of failing"),
        )
        .arg(
            Arg::new("keep")
                .short('k')
                .long("keep")
                .action(ArgAction::SetTrue)
                .help("Keep the build tree on disk after packaging"),
        )
        .arg(
            Arg::new("pre_install_patterns")
                .long("pre-install-pattern")
                .value_name("PATTERN")
                .action(ArgAction::Append)
                .help("Manifest substring installed before the full manifest (repeatable)"),
        )
        .arg(
            Arg::new("no_relink_local")
                .long("no-relink-local")
                .action(ArgAction::SetTrue)
                .help("Skip relinking entries under the environment's local/ directory"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .value_name("SECONDS")
                .help("Timeout for each external tool invocation"),
        )
        .arg(
            Arg::new("extra_packager_args")
                .long("fpm-arg")
                .value_name("ARG")
                .action(ArgAction::Append)
                .help("Extra argument passed through to fpm (repeatable)"),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("envpack.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
        return;
    }

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
