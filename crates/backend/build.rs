use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Копирует config.toml из корня workspace в target/<profile>,
/// где его ищет `shared::config::load_config`.
fn main() {
    println!("cargo:rerun-if-changed=../../config.toml");
    println!("cargo:rerun-if-changed=build.rs");

    let Some(target_dir) = profile_dir() else {
        println!("cargo:warning=Could not locate target profile directory, config.toml not copied");
        return;
    };

    let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config.toml");
    if !source.exists() {
        println!(
            "cargo:warning=config.toml not found at {:?}, the embedded default will be used",
            source
        );
        return;
    }

    let dest = target_dir.join("config.toml");
    if let Err(e) = fs::copy(&source, &dest) {
        panic!("Failed to copy config.toml to {:?}: {}", dest, e);
    }
}

/// OUT_DIR выглядит как target/<profile>/build/backend-xxx/out
fn profile_dir() -> Option<PathBuf> {
    let out_dir = PathBuf::from(env::var("OUT_DIR").ok()?);
    let profile = env::var("PROFILE").ok()?;
    out_dir
        .ancestors()
        .find(|p| p.ends_with(&profile))
        .map(Path::to_path_buf)
}
