//! Configuration for silscope tooling and the HTTP server.
//!
//! This crate parses the TOML-based `~/.silscope/config.toml` (and
//! project-specific `.silscope/config.toml` variants) so the server and the
//! CLI agree on which toolchain to run, how long each stage may take and how
//! many compiler processes the host may run at once.

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dirs::home_dir;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, ConfigError>;

/// Environment variable overriding `server.bind`.
pub const SERVER_ADDR_ENV: &str = "SILSCOPE_SERVER_ADDR";

/// Application configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct SilscopeConfig {
    /// External executables and the module name used for library parsing.
    pub toolchain: ToolchainConfig,

    /// Timeouts, concurrency ceiling and size caps.
    pub limits: LimitsConfig,

    /// Scratch workspace placement.
    pub workspace: WorkspaceConfig,

    /// HTTP server settings.
    pub server: ServerConfig,
}

/// External collaborators invoked per stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Compiler driver. Bare names are looked up on `PATH` once at startup.
    pub compiler: PathBuf,

    /// Demangler filter executable.
    pub demangler: PathBuf,

    /// Extra arguments for the demangler (e.g. `--simplified`).
    pub demangler_args: Vec<String>,

    /// Module name passed with `-parse-as-library`.
    pub module_name: String,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from("swiftc"),
            demangler: PathBuf::from("swift-demangle"),
            demangler_args: Vec::new(),
            module_name: "SILInspector".to_string(),
        }
    }
}

/// Resource limits applied to every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Wall-clock budget for one compiler invocation.
    pub stage_timeout_secs: u64,

    /// Wall-clock budget for one demangler invocation.
    pub demangle_timeout_secs: u64,

    /// Process-wide ceiling on concurrently running compiler processes.
    pub max_concurrent_invocations: usize,

    /// Cap on captured output per invocation.
    pub max_output_bytes: usize,

    /// Cap on submitted source size.
    pub max_source_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            stage_timeout_secs: 30,
            demangle_timeout_secs: 10,
            max_concurrent_invocations: 4,
            max_output_bytes: 1024 * 1024,
            max_source_bytes: 256 * 1024,
        }
    }
}

impl LimitsConfig {
    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    pub fn demangle_timeout(&self) -> Duration {
        Duration::from_secs(self.demangle_timeout_secs)
    }
}

/// Scratch workspace settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Parent directory for per-request scratch directories. The system
    /// temp directory is used when unset.
    pub scratch_root: Option<PathBuf>,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
        }
    }
}

impl ServerConfig {
    /// Listen address, honoring [`SERVER_ADDR_ENV`] over the file value.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let raw = env::var(SERVER_ADDR_ENV).unwrap_or_else(|_| self.bind.clone());
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid(format!("server.bind '{raw}': {e}")))
    }
}

impl SilscopeConfig {
    /// Loads configuration from the given path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_toml(&contents)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config = toml::from_str::<SilscopeConfig>(contents).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Returns the default configuration path (`$HOME/.silscope/config.toml`).
    pub fn default_path() -> Result<PathBuf> {
        let home = home_dir().ok_or(ConfigError::HomeDirMissing)?;
        Ok(home.join(".silscope").join("config.toml"))
    }

    /// Load configuration for the current working directory, falling back to
    /// the global config and then to built-in defaults when no file exists.
    pub fn load_scoped() -> Result<Self> {
        if let Some(path) = project_config_path() {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Ok(path) if path.exists() => Self::from_file(path),
            Ok(_) | Err(ConfigError::HomeDirMissing) => Ok(Self::default()),
            Err(other) => Err(other),
        }
    }

    /// Load from an explicit path when given, otherwise [`Self::load_scoped`].
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => Self::load_scoped(),
        }
    }

    /// Reject values that would make the service unusable.
    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        if limits.stage_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "limits.stage_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if limits.demangle_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "limits.demangle_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if limits.max_concurrent_invocations == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_concurrent_invocations must be at least 1".to_string(),
            ));
        }
        if limits.max_output_bytes == 0 || limits.max_source_bytes == 0 {
            return Err(ConfigError::Invalid(
                "limits.max_output_bytes and limits.max_source_bytes must be non-zero".to_string(),
            ));
        }
        if self.toolchain.module_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "toolchain.module_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn project_config_path() -> Option<PathBuf> {
    let cwd = env::current_dir().ok()?;
    find_project_config(&cwd)
}

fn find_project_config(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|ancestor| ancestor.join(".silscope").join("config.toml"))
        .find(|candidate| candidate.exists())
}

/// Resolve a bare executable name against `PATH`.
///
/// Paths with more than one component are returned unchanged, as is a bare
/// name that cannot be found (launching it will then report the failure).
pub fn resolve_executable(program: &Path) -> PathBuf {
    if program.components().count() != 1 || program.is_absolute() {
        return program.to_path_buf();
    }
    env::var_os("PATH")
        .and_then(|paths| {
            env::split_paths(&paths)
                .map(|dir| dir.join(program))
                .find(|candidate| candidate.is_file())
        })
        .unwrap_or_else(|| program.to_path_buf())
}

/// Errors that can occur while loading silscope configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO failure when reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Unable to determine home directory for default config path")]
    HomeDirMissing,
}
