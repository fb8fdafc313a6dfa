//! Build target resolution
//!
//! Maps a [`BuildConfig`] to the canonical directory name that keys a staged
//! build, e.g. `platform-linux-arch-x64-node-18.19`. Platform and
//! architecture identifiers use Node.js naming (`process.platform`,
//! `process.arch`) so the names match what the addon loader looks up at
//! runtime.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::error::{hints, PrebuildError};

/// Directory under the tool root that holds every staged target
pub const DEFAULT_OUTPUT_DIR: &str = "prebuilt-modules";

/// Runtime family the addon is compiled against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RuntimeKind {
    #[default]
    Node,
    Electron,
}

impl RuntimeKind {
    /// Token used in the target directory name
    pub fn token(&self) -> &'static str {
        match self {
            RuntimeKind::Node => "node",
            RuntimeKind::Electron => "electron",
        }
    }

    pub fn is_electron(&self) -> bool {
        matches!(self, RuntimeKind::Electron)
    }
}

impl fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Immutable description of the binary being produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    /// Runtime family (node or electron)
    pub runtime_kind: RuntimeKind,
    /// Full runtime version as given, e.g. `18.19.0`
    pub runtime_version: String,
    /// OS identifier in Node naming, e.g. `linux`, `darwin`, `win32`
    pub platform: String,
    /// CPU identifier in Node naming, e.g. `x64`, `arm64`
    pub architecture: String,
}

impl BuildConfig {
    /// Resolve a config from optional user overrides.
    ///
    /// The platform always comes from the host. The runtime version is only
    /// detected (via `detect_version`) when no override is given.
    pub fn resolve<F>(
        target: Option<&str>,
        arch: Option<&str>,
        electron: bool,
        detect_version: F,
    ) -> Result<Self>
    where
        F: FnOnce() -> Result<String>,
    {
        let runtime_version = match target {
            Some(v) => v.to_string(),
            None => detect_version()?,
        };

        let config = Self {
            runtime_kind: if electron {
                RuntimeKind::Electron
            } else {
                RuntimeKind::Node
            },
            runtime_version,
            platform: host_platform().to_string(),
            architecture: arch.map(str::to_string).unwrap_or_else(|| host_arch().to_string()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that every part of the target directory name stays inside one
    /// path component.
    ///
    /// Platform and architecture must be non-empty identifiers. The version
    /// is only checked for separators; odd but harmless versions still
    /// degrade to a best-effort `major.minor`.
    pub fn validate(&self) -> Result<()> {
        validate_identifier("platform", &self.platform)?;
        validate_identifier("architecture", &self.architecture)?;

        let major_minor = self.major_minor();
        if has_separator(&major_minor) {
            return Err(invalid_target("runtime version", &self.runtime_version).into());
        }
        Ok(())
    }

    /// `major.minor` part of the runtime version
    pub fn major_minor(&self) -> String {
        major_minor(&self.runtime_version)
    }

    /// Canonical target directory name for this config
    pub fn target_dir_name(&self) -> String {
        target_dir_name(self)
    }
}

/// JSON-friendly view printed before the build starts
#[derive(Debug, Serialize)]
pub struct BuildSummary<'a> {
    pub target: &'a str,
    pub platform: &'a str,
    pub arch: &'a str,
    pub electron: bool,
}

impl<'a> From<&'a BuildConfig> for BuildSummary<'a> {
    fn from(config: &'a BuildConfig) -> Self {
        Self {
            target: &config.runtime_version,
            platform: &config.platform,
            arch: &config.architecture,
            electron: config.runtime_kind.is_electron(),
        }
    }
}

/// First two `.`-separated components of a version string.
///
/// Shorter versions are returned as-is, never padded, so `"18"` stays `"18"`.
pub fn major_minor(version: &str) -> String {
    version.split('.').take(2).collect::<Vec<_>>().join(".")
}

/// Compute `platform-<platform>-arch-<arch>-<kind>-<major.minor>`
pub fn target_dir_name(config: &BuildConfig) -> String {
    [
        format!("platform-{}", config.platform),
        format!("arch-{}", config.architecture),
        format!("{}-{}", config.runtime_kind.token(), config.major_minor()),
    ]
    .join("-")
}

fn has_separator(value: &str) -> bool {
    value.contains(['/', '\\', '\0'])
}

fn validate_identifier(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() || value == "." || value == ".." || has_separator(value) {
        return Err(invalid_target(what, value).into());
    }
    Ok(())
}

fn invalid_target(what: &str, value: &str) -> PrebuildError {
    PrebuildError::config_error_with_hint(
        format!("Invalid {} '{}' for the target directory name", what, value),
        None,
        hints::invalid_target(),
    )
}

/// Host OS identifier in Node.js `process.platform` naming
pub fn host_platform() -> &'static str {
    node_platform_name(std::env::consts::OS)
}

/// Host CPU identifier in Node.js `process.arch` naming
pub fn host_arch() -> &'static str {
    node_arch_name(std::env::consts::ARCH)
}

fn node_platform_name(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        "windows" => "win32",
        "solaris" | "illumos" => "sunos",
        other => other,
    }
}

fn node_arch_name(arch: &str) -> &str {
    match arch {
        "x86_64" => "x64",
        "x86" => "ia32",
        "aarch64" => "arm64",
        "loongarch64" => "loong64",
        "powerpc" => "ppc",
        "powerpc64" => "ppc64",
        other => other,
    }
}

/// Resolved on-disk locations for one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingLayout {
    /// `<tool_root>/<output_dir>`
    pub root: PathBuf,
    /// `<root>/<target_dir_name>`
    pub target_dir: PathBuf,
}

impl StagingLayout {
    pub fn new(tool_root: &Path, output_dir: &str, config: &BuildConfig) -> Self {
        let root = tool_root.join(output_dir);
        let target_dir = root.join(config.target_dir_name());
        Self { root, target_dir }
    }

    /// Staged copy location for a module
    pub fn module_dir(&self, module: &str) -> PathBuf {
        self.target_dir.join(module)
    }
}
