use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::navigation::window::WindowConfig;
use crate::provenance::session::BuildOptions;

const DEFAULT_CHUNK_SIZE: usize = 50;
const DEFAULT_TELEPORT_CHUNKS: usize = 2;
const DEFAULT_PALETTE_SIZE: usize = 12;
const DEFAULT_LCS_LINE_LIMIT: usize = 2000;
const DEFAULT_MAX_PARALLEL_FILES: usize = 30;
const DEFAULT_SCROLL_THROTTLE_HZ: u32 = 60;

/// Centralized configuration for the application
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    chunk_size: usize,
    teleport_chunks: usize,
    palette_size: usize,
    lcs_line_limit: usize,
    max_parallel_files: usize,
    scroll_throttle_hz: u32,
    log_path: Option<PathBuf>,
}

/// On-disk configuration, every field optional
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub teleport_chunks: Option<usize>,
    #[serde(default)]
    pub palette_size: Option<usize>,
    #[serde(default)]
    pub lcs_line_limit: Option<usize>,
    #[serde(default)]
    pub max_parallel_files: Option<usize>,
    #[serde(default)]
    pub scroll_throttle_hz: Option<u32>,
    #[serde(default)]
    pub log_path: Option<String>,
}

/// `TRANSCRIPT_BLAME_*` environment overrides, read with envy
#[derive(Debug, Default, Deserialize)]
pub struct EnvConfig {
    #[serde(default)]
    pub chunk_size: Option<usize>,
    #[serde(default)]
    pub teleport_chunks: Option<usize>,
    #[serde(default)]
    pub palette_size: Option<usize>,
    #[serde(default)]
    pub lcs_line_limit: Option<usize>,
    #[serde(default)]
    pub max_parallel_files: Option<usize>,
    #[serde(default)]
    pub scroll_throttle_hz: Option<u32>,
    #[serde(default)]
    pub log_path: Option<String>,
}

pub const ENV_PREFIX: &str = "TRANSCRIPT_BLAME_";

static CONFIG: OnceLock<Config> = OnceLock::new();

impl Default for Config {
    fn default() -> Self {
        Config {
            chunk_size: DEFAULT_CHUNK_SIZE,
            teleport_chunks: DEFAULT_TELEPORT_CHUNKS,
            palette_size: DEFAULT_PALETTE_SIZE,
            lcs_line_limit: DEFAULT_LCS_LINE_LIMIT,
            max_parallel_files: DEFAULT_MAX_PARALLEL_FILES,
            scroll_throttle_hz: DEFAULT_SCROLL_THROTTLE_HZ,
            log_path: None,
        }
    }
}

impl Config {
    /// Initialize the global configuration exactly once.
    /// Safe to call multiple times; subsequent calls are no-ops.
    pub fn init() {
        let _ = CONFIG.get_or_init(build_config);
    }

    /// Access the global configuration. Lazily initializes if not already initialized.
    pub fn get() -> &'static Config {
        CONFIG.get_or_init(build_config)
    }

    /// Merge defaults, file config and environment overrides (env wins).
    /// Zero values are rejected with a warning and fall back to the default.
    pub fn from_sources(file_cfg: Option<FileConfig>, env_cfg: Option<EnvConfig>) -> Config {
        let file_cfg = file_cfg.unwrap_or_default();
        let env_cfg = env_cfg.unwrap_or_default();
        let defaults = Config::default();

        let log_path = env_cfg
            .log_path
            .or(file_cfg.log_path)
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);

        Config {
            chunk_size: positive(
                "chunk_size",
                env_cfg.chunk_size.or(file_cfg.chunk_size),
                defaults.chunk_size,
            ),
            teleport_chunks: positive(
                "teleport_chunks",
                env_cfg.teleport_chunks.or(file_cfg.teleport_chunks),
                defaults.teleport_chunks,
            ),
            palette_size: positive(
                "palette_size",
                env_cfg.palette_size.or(file_cfg.palette_size),
                defaults.palette_size,
            ),
            lcs_line_limit: positive(
                "lcs_line_limit",
                env_cfg.lcs_line_limit.or(file_cfg.lcs_line_limit),
                defaults.lcs_line_limit,
            ),
            max_parallel_files: positive(
                "max_parallel_files",
                env_cfg.max_parallel_files.or(file_cfg.max_parallel_files),
                defaults.max_parallel_files,
            ),
            scroll_throttle_hz: positive(
                "scroll_throttle_hz",
                env_cfg.scroll_throttle_hz.or(file_cfg.scroll_throttle_hz),
                defaults.scroll_throttle_hz,
            ),
            log_path,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn teleport_chunks(&self) -> usize {
        self.teleport_chunks
    }

    pub fn palette_size(&self) -> usize {
        self.palette_size
    }

    pub fn lcs_line_limit(&self) -> usize {
        self.lcs_line_limit
    }

    pub fn max_parallel_files(&self) -> usize {
        self.max_parallel_files
    }

    pub fn scroll_throttle_hz(&self) -> u32 {
        self.scroll_throttle_hz
    }

    /// Where observability envelopes are appended, if configured.
    pub fn log_path(&self) -> Option<&PathBuf> {
        self.log_path.as_ref()
    }

    pub fn window_config(&self) -> WindowConfig {
        WindowConfig {
            chunk_size: self.chunk_size,
            teleport_chunks: self.teleport_chunks,
            scroll_throttle_hz: self.scroll_throttle_hz,
        }
    }

    pub fn build_options(&self) -> BuildOptions {
        BuildOptions {
            palette_size: self.palette_size,
            lcs_line_limit: self.lcs_line_limit,
            max_parallel_files: self.max_parallel_files,
            ..BuildOptions::default()
        }
    }
}

fn positive<T>(name: &str, value: Option<T>, default: T) -> T
where
    T: PartialEq + Default + Copy + std::fmt::Display,
{
    match value {
        Some(v) if v == T::default() => {
            eprintln!(
                "Warning: '{}' must be greater than zero, using default {}",
                name, default
            );
            default
        }
        Some(v) => v,
        None => default,
    }
}

fn build_config() -> Config {
    let env_cfg = match envy::prefixed(ENV_PREFIX).from_env::<EnvConfig>() {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!("Warning: ignoring invalid {}* environment: {}", ENV_PREFIX, e);
            None
        }
    };
    Config::from_sources(load_file_config(), env_cfg)
}

fn load_file_config() -> Option<FileConfig> {
    let path = config_file_path()?;
    let data = fs::read(&path).ok()?;
    match serde_json::from_slice::<FileConfig>(&data) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            eprintln!("Warning: invalid config file {}: {}", path.display(), e);
            None
        }
    }
}

pub fn config_file_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".transcript-blame").join("config.json"))
}
