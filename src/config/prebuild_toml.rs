//! prebuild.toml configuration parsing
//!
//! The file is optional; every key has a default that reproduces the stock
//! setup (two modules under `node_modules/`, staged into `prebuilt-modules/`).
//!
//! ```toml
//! [prebuild]
//! modules = ["pi-spi", "microtime"]
//! modules_dir = "node_modules"
//! output_dir = "prebuilt-modules"
//! node = "node"
//! node_gyp = "node_modules/node-gyp/bin/node-gyp"
//! electron_dist_url = "https://atom.io/download/electron"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::build::target::DEFAULT_OUTPUT_DIR;

/// Default name of the configuration file at the tool root
pub const CONFIG_FILE_NAME: &str = "prebuild.toml";

/// Modules rebuilt when no configuration overrides them
pub const DEFAULT_MODULES: &[&str] = &["pi-spi", "microtime"];

/// Header download location for Electron builds
pub const DEFAULT_ELECTRON_DIST_URL: &str = "https://atom.io/download/electron";

/// Root configuration from prebuild.toml
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrebuildConfig {
    #[serde(default)]
    pub prebuild: PrebuildSection,
}

/// The `[prebuild]` section
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PrebuildSection {
    /// Ordered module list; build and staging order
    pub modules: Vec<String>,

    /// Directory holding module sources, relative to the tool root
    pub modules_dir: PathBuf,

    /// Staging root name, relative to the tool root
    pub output_dir: String,

    /// Runtime executable used to launch node-gyp
    pub node: String,

    /// node-gyp entry script, relative to the tool root unless absolute
    pub node_gyp: PathBuf,

    /// Passed as `--dist-url` when targeting Electron
    pub electron_dist_url: String,
}

impl Default for PrebuildSection {
    fn default() -> Self {
        Self {
            modules: DEFAULT_MODULES.iter().map(|m| m.to_string()).collect(),
            modules_dir: PathBuf::from("node_modules"),
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
            node: "node".to_string(),
            node_gyp: Path::new("node_modules").join("node-gyp").join("bin").join("node-gyp"),
            electron_dist_url: DEFAULT_ELECTRON_DIST_URL.to_string(),
        }
    }
}

impl PrebuildConfig {
    /// Load configuration from a path, falling back to defaults if it is absent
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration from {}", path.display()))?;

        Self::parse(&content)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse prebuild.toml")?;
        config.prebuild.validate()?;
        Ok(config)
    }
}

impl PrebuildSection {
    /// Check module names and required strings
    pub fn validate(&self) -> Result<()> {
        if self.modules.is_empty() {
            bail!("`modules` must list at least one module");
        }
        for module in &self.modules {
            validate_module_name(module)?;
        }
        if self.output_dir.trim().is_empty() {
            bail!("`output_dir` must not be empty");
        }
        if self.node.trim().is_empty() {
            bail!("`node` must not be empty");
        }
        Ok(())
    }

    /// Absolute node-gyp script location
    pub fn node_gyp_path(&self, tool_root: &Path) -> PathBuf {
        tool_root.join(&self.node_gyp)
    }
}

/// Module names become directory names under the staging dir, so they must
/// stay a single path component. Scoped names (`@scope/name`) are allowed.
fn validate_module_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Module names must not be empty");
    }

    let parts: Vec<&str> = name.split('/').collect();
    let scoped = parts.len() == 2 && parts[0].starts_with('@') && parts[0].len() > 1;
    if parts.len() > 1 && !scoped {
        bail!("Invalid module name '{}': only '@scope/name' may contain '/'", name);
    }
    if name.contains('\\') || parts.iter().any(|p| p.is_empty() || *p == "." || *p == "..") {
        bail!("Invalid module name '{}'", name);
    }
    Ok(())
}
