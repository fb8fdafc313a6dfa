//! Tool detection and runtime version probing

use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{bail, Context, Result};
use which::which;

use crate::error::{hints, PrebuildError};

/// Tool detection result
#[derive(Debug, Clone)]
pub struct ToolInfo {
    /// Tool name as configured
    pub name: String,
    /// Path to the tool executable
    pub path: PathBuf,
}

/// Check if a tool exists (on PATH, or as an explicit path)
///
/// The returned path is absolute, so it stays valid when a command later runs
/// in another working directory.
pub fn check_tool(tool_name: &str) -> Option<ToolInfo> {
    let path = which(tool_name).ok()?;
    let path = if path.is_relative() {
        std::env::current_dir().ok()?.join(path)
    } else {
        path
    };
    Some(ToolInfo {
        name: tool_name.to_string(),
        path,
    })
}

/// Require a tool to exist, return error with hint if missing
pub fn require_tool(tool_name: &str, required_for: &str) -> Result<ToolInfo> {
    match check_tool(tool_name) {
        Some(info) => Ok(info),
        None => Err(PrebuildError::missing_tool(tool_name, required_for, get_tool_hint(tool_name)).into()),
    }
}

/// Require the node-gyp entry script to be present
pub fn require_node_gyp(script: &Path) -> Result<()> {
    if script.is_file() {
        return Ok(());
    }
    Err(PrebuildError::missing_tool(
        script.display().to_string(),
        "rebuilding native modules",
        hints::node_gyp(),
    )
    .into())
}

/// Get installation hint for a tool
fn get_tool_hint(tool_name: &str) -> &'static str {
    let file_name = Path::new(tool_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(tool_name);
    match file_name {
        "node" | "nodejs" => hints::node(),
        _ => "Install this tool and ensure it's in your PATH",
    }
}

/// Version of the Node runtime behind `node`, without the leading `v`
pub fn node_version(node: &Path) -> Result<String> {
    let output = Command::new(node)
        .arg("--version")
        .output()
        .with_context(|| format!("Failed to execute {} --version", node.display()))?;

    if !output.status.success() {
        bail!(
            "{} --version exited with code {:?}",
            node.display(),
            output.status.code()
        );
    }

    parse_node_version(&String::from_utf8_lossy(&output.stdout))
        .with_context(|| format!("Unexpected output from {} --version", node.display()))
}

fn parse_node_version(output: &str) -> Result<String> {
    let line = output.lines().next().unwrap_or("").trim();
    let version = line.strip_prefix('v').unwrap_or(line);
    if version.is_empty() {
        bail!("empty version string");
    }
    Ok(version.to_string())
}
