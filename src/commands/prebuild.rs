//! Prebuild command implementation

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::build::{
    ArtifactStager, BuildConfig, BuildSummary, NodeGyp, StageReport, StageState, StagingLayout,
};
use crate::config::{PrebuildConfig, CONFIG_FILE_NAME};
use crate::error::{hints, PrebuildError};
use crate::exec::StreamingRunner;
use crate::utils::paths::resolve_tool_root;
use crate::utils::terminal::{print_detail, print_info, print_success};
use crate::utils::tools::{node_version, require_node_gyp, require_tool};

/// Rebuild native modules for one runtime target and stage the results
#[derive(Args, Debug)]
pub struct PrebuildCommand {
    /// Runtime version to build against (default: version of the host `node`)
    #[arg(long)]
    pub target: Option<String>,

    /// CPU architecture, in Node naming (default: host architecture)
    #[arg(long)]
    pub arch: Option<String>,

    /// Build against Electron headers instead of Node
    #[arg(long)]
    pub electron: bool,

    /// Tool root holding node_modules/ and prebuilt-modules/ (default: current directory)
    #[arg(long, env = "PREBUILD_ROOT")]
    pub root: Option<PathBuf>,

    /// Configuration file (default: <root>/prebuild.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl PrebuildCommand {
    /// Execute the prebuild command
    pub fn execute(self, verbose: bool) -> Result<()> {
        let tool_root = resolve_tool_root(self.root.as_deref())?;

        // An explicit --config must exist; only the implicit one is optional.
        let (config_path, loaded) = match &self.config {
            Some(path) => (path.clone(), PrebuildConfig::load_from_path(path)),
            None => {
                let path = tool_root.join(CONFIG_FILE_NAME);
                let loaded = PrebuildConfig::load_or_default(&path);
                (path, loaded)
            }
        };
        let settings = loaded
            .map_err(|e| {
                PrebuildError::config_error_with_hint(
                    format!("Could not load {}", config_path.display()),
                    Some(e),
                    hints::invalid_prebuild_toml(),
                )
            })?
            .prebuild;

        let node = require_tool(&settings.node, "rebuilding native modules")?;
        if verbose {
            print_detail(&format!("{}: {}", node.name, node.path.display()));
        }

        let build_config = BuildConfig::resolve(
            self.target.as_deref(),
            self.arch.as_deref(),
            self.electron,
            || node_version(&node.path),
        )?;

        let summary = serde_json::to_string(&BuildSummary::from(&build_config))
            .context("Failed to serialize build configuration")?;
        print_info(&format!("Building for {}", summary));
        print_info(&format!(
            "Target version dir \"{}\"",
            build_config.target_dir_name()
        ));

        let node_gyp_script = settings.node_gyp_path(&tool_root);
        require_node_gyp(&node_gyp_script)?;

        let builder = NodeGyp::new(
            node.path.to_string_lossy().into_owned(),
            node_gyp_script,
            settings.electron_dist_url.clone(),
        );
        let layout = StagingLayout::new(&tool_root, &settings.output_dir, &build_config);
        let mut stager = ArtifactStager::new(
            StreamingRunner,
            builder,
            layout,
            tool_root.join(&settings.modules_dir),
        )
        .verbose(verbose);

        let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
        let result = runtime.block_on(stager.run(&build_config, &settings.modules));
        if verbose {
            if let StageState::Failed(index) = stager.state() {
                print_detail(&format!(
                    "Stopped at module {} of {} ({})",
                    index + 1,
                    settings.modules.len(),
                    settings.modules[index]
                ));
            }
        }
        let report = result?;

        print_report(&report, verbose);
        Ok(())
    }
}

fn print_report(report: &StageReport, verbose: bool) {
    print_success(&format!(
        "{} module(s) staged in {}",
        report.modules.len(),
        report.target_dir.display()
    ));
    if verbose {
        for module in &report.modules {
            print_detail(&format!(
                "{}: {} file(s), built in {:.2}s → {}",
                module.name,
                module.files,
                module.build_time.as_secs_f64(),
                module.path.display()
            ));
        }
    }
}
