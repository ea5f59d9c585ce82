use eyre::Result;
use evlog::{emit::LogLayout, CompileOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "evlog.toml";

/// Configuration for event/log compilation
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EvlogConfig {
    /// Directories searched for source units
    #[serde(default = "default_src_dirs")]
    pub src: Vec<String>,

    /// Output directory for ABI files and bytecode
    #[serde(default = "default_out_dir")]
    pub out: String,

    /// Exclude patterns (glob patterns)
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Working-memory offset where log data buffers are assembled
    #[serde(default = "default_scratch_offset")]
    pub scratch_offset: u64,

    /// Terminate every compiled function with `STOP`
    #[serde(default = "default_emit_stop")]
    pub emit_stop: bool,
}

impl Default for EvlogConfig {
    fn default() -> Self {
        Self {
            src: default_src_dirs(),
            out: default_out_dir(),
            exclude: vec![],
            scratch_offset: default_scratch_offset(),
            emit_stop: default_emit_stop(),
        }
    }
}

impl EvlogConfig {
    /// Load configuration from the closest evlog.toml file, together with the
    /// project root it applies to.
    pub fn load() -> Result<(Self, PathBuf)> {
        match Self::find_config_file()? {
            Some(path) => {
                let root = project_root_of(&path)?;
                Ok((Self::load_from_path(path)?, root))
            }
            // No config file found, use defaults
            None => Ok((Self::default(), std::env::current_dir()?)),
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: EvlogConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Find evlog.toml in current directory or parent directories
    fn find_config_file() -> Result<Option<PathBuf>> {
        let current_dir = std::env::current_dir()?;
        let mut dir = current_dir.as_path();

        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Ok(Some(config_path));
            }

            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }

        Ok(None)
    }

    /// Get all source directories as absolute paths
    pub fn get_src_paths(&self, project_root: &Path) -> Vec<PathBuf> {
        self.src
            .iter()
            .map(|dir| resolve(project_root, dir))
            .filter(|path| path.exists())
            .collect()
    }

    /// Get output directory as absolute path
    pub fn get_out_path(&self, project_root: &Path) -> PathBuf {
        resolve(project_root, &self.out)
    }

    /// Check if a path should be excluded based on exclude patterns
    pub fn should_exclude(&self, path: &Path) -> bool {
        self.exclude.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|glob| glob.matches_path(path))
                .unwrap_or(false)
        })
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            layout: LogLayout {
                scratch_offset: self.scratch_offset,
            },
            emit_stop: self.emit_stop,
        }
    }
}

/// Directory holding a configuration file.
pub fn project_root_of(config_path: &Path) -> Result<PathBuf> {
    match config_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.to_path_buf()),
        _ => Ok(std::env::current_dir()?),
    }
}

fn resolve(project_root: &Path, dir: &str) -> PathBuf {
    if Path::new(dir).is_absolute() {
        PathBuf::from(dir)
    } else {
        project_root.join(dir)
    }
}

// Default functions for serde
fn default_src_dirs() -> Vec<String> {
    vec!["src".to_string()]
}

fn default_out_dir() -> String {
    "out".to_string()
}

fn default_scratch_offset() -> u64 {
    evlog::emit::DEFAULT_SCRATCH_OFFSET
}

fn default_emit_stop() -> bool {
    true
}
