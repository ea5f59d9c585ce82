use std::{
    fs,
    path::{Path, PathBuf},
};

use alloy_core::hex::ToHexExt;
use evlog::{compile, Artifacts, CompileOptions, Diagnostics};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
    config::EvlogConfig,
    source::{self, SourceError},
};

pub const SOURCE_EXTENSION: &str = "toml";

#[derive(Debug, Error)]
pub enum UnitError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Compile(#[from] Diagnostics),
    #[error("Invalid ABI: {0}")]
    Abi(#[from] serde_json::Error),
}

/// A source file together with the name its artifacts are written under.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub path: PathBuf,
    pub name: String,
}

impl Unit {
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, name }
    }

    /// Compiles the unit and writes `<name>.abi.json` plus one
    /// `<name>.<function>.bin` file per function into `out`.
    pub fn build(&self, options: &CompileOptions, out: &Path) -> Result<Artifacts, UnitError> {
        let unit = source::load(&self.path)?;
        let artifacts = compile(&unit, options)?;

        fs::create_dir_all(out)?;
        let abi_path = out.join(format!("{}.abi.json", self.name));
        fs::write(&abi_path, serde_json::to_string_pretty(&artifacts.abi())?)?;
        debug!("Wrote {}", abi_path.display());

        for function in &artifacts.functions {
            let bin_path = out.join(format!("{}.{}.bin", self.name, function.name));
            fs::write(&bin_path, function.bytecode.encode_hex())?;
            debug!("Wrote {}", bin_path.display());
        }

        Ok(artifacts)
    }
}

/// Collects every source unit under the configured source directories,
/// skipping excluded paths.
pub fn find_units(config: &EvlogConfig, project_root: &Path) -> Vec<Unit> {
    let mut units = Vec::new();

    for src in config.get_src_paths(project_root) {
        let pattern = src.join("**").join(format!("*.{SOURCE_EXTENSION}"));
        let entries = match glob::glob(&pattern.to_string_lossy()) {
            Ok(entries) => entries,
            Err(e) => {
                error!("Invalid source pattern {}: {}", pattern.display(), e);
                continue;
            }
        };

        for entry in entries {
            match entry {
                Ok(path) if config.should_exclude(&path) => {
                    debug!("Excluding {}", path.display());
                }
                Ok(path) => units.push(Unit::new(path)),
                Err(e) => error!("Error reading source path: {}", e),
            }
        }
    }

    units.sort_by(|a, b| a.path.cmp(&b.path));
    info!("Found {} source units", units.len());
    units
}
