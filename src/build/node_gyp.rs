//! node-gyp invocation
//!
//! Produces the `node <node-gyp> rebuild ...` command for one module. The
//! full runtime version is passed through; only the staging directory name
//! uses the truncated `major.minor` form.

use std::path::{Path, PathBuf};

use crate::build::target::BuildConfig;
use crate::exec::CommandSpec;

/// External native-module builder
#[derive(Debug, Clone)]
pub struct NodeGyp {
    /// Runtime executable that runs the node-gyp script
    pub node: String,
    /// node-gyp entry script
    pub script: PathBuf,
    /// Header distribution URL used for Electron targets
    pub electron_dist_url: String,
}

impl NodeGyp {
    pub fn new(node: impl Into<String>, script: impl Into<PathBuf>, electron_dist_url: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            script: script.into(),
            electron_dist_url: electron_dist_url.into(),
        }
    }

    /// Command that rebuilds the module in `module_dir` for `config`
    pub fn rebuild_command(&self, config: &BuildConfig, module_dir: &Path) -> CommandSpec {
        let mut spec = CommandSpec::new(&self.node)
            .arg(self.script.to_string_lossy())
            .arg("rebuild")
            .arg(format!("--target={}", config.runtime_version))
            .arg(format!("--arch={}", config.architecture));

        if config.runtime_kind.is_electron() {
            spec = spec.arg(format!("--dist-url={}", self.electron_dist_url));
        }

        spec.current_dir(module_dir)
    }
}
