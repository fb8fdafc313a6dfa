//! Error types and helpers for user-friendly error messages
//!
//! Build failures carry the external tool's exit code so `main` can mirror it
//! as the process exit status. Everything else exits with 1.

use thiserror::Error;

/// Custom error types with helpful context and suggestions
#[derive(Error, Debug)]
pub enum PrebuildError {
    /// Configuration file errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        hint: Option<String>,
    },

    /// Tool/executable not found or misconfigured
    #[error("Missing tool: {tool}")]
    MissingTool {
        tool: String,
        required_for: String,
        hint: String,
    },

    /// External build tool exited with a failure status
    #[error("Command \"{command}\" failed with exit code {exit_code}")]
    BuildFailed {
        module: String,
        command: String,
        exit_code: i32,
    },

    /// Removing or copying a staged module failed
    #[error("Failed to stage module '{module}': {message}")]
    Staging {
        module: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

impl PrebuildError {
    /// Create a configuration error with source and hint
    pub fn config_error_with_hint(
        message: impl Into<String>,
        source: Option<anyhow::Error>,
        hint: impl Into<String>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source,
            hint: Some(hint.into()),
        }
    }

    /// Create a missing tool error
    pub fn missing_tool(
        tool: impl Into<String>,
        required_for: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        Self::MissingTool {
            tool: tool.into(),
            required_for: required_for.into(),
            hint: hint.into(),
        }
    }

    /// Create a build failure error
    pub fn build_failed(
        module: impl Into<String>,
        command: impl Into<String>,
        exit_code: i32,
    ) -> Self {
        Self::BuildFailed {
            module: module.into(),
            command: command.into(),
            exit_code,
        }
    }

    /// Create a staging error wrapping the underlying I/O failure
    pub fn staging(module: impl Into<String>, message: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Staging {
            module: module.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Process exit code this error should terminate with
    pub fn exit_code(&self) -> i32 {
        match self {
            PrebuildError::BuildFailed { exit_code, .. } => *exit_code,
            _ => 1,
        }
    }

    /// Display error with formatting and hints
    pub fn display_with_hints(&self) {
        use console::style;

        eprintln!("\n{} {}", style("ERROR:").red().bold(), self);

        match self {
            PrebuildError::Config { hint, source, .. } => {
                if let Some(src) = source {
                    eprintln!("  caused by: {:#}", src);
                }
                if let Some(h) = hint {
                    eprintln!("\n{} {}", style("HINT:").yellow().bold(), h);
                }
            }
            PrebuildError::MissingTool {
                required_for, hint, ..
            } => {
                eprintln!("  required for: {}", required_for);
                eprintln!("\n{} {}", style("HINT:").yellow().bold(), hint);
            }
            PrebuildError::BuildFailed { module, .. } => {
                eprintln!(
                    "\n{} Module '{}' was not staged; remaining modules were skipped.",
                    style("NOTE:").cyan().bold(),
                    module
                );
            }
            PrebuildError::Staging { source, .. } => {
                if let Some(src) = source {
                    eprintln!("  caused by: {:#}", src);
                }
            }
        }

        eprintln!();
    }
}

/// Common error hints
pub mod hints {
    /// Get hint for missing Node.js
    pub fn node() -> &'static str {
        "Install Node.js from https://nodejs.org/ or use your package manager:\n\
         • macOS: brew install node\n\
         • Ubuntu: sudo apt install nodejs\n\
         • Windows: winget install OpenJS.NodeJS\n\
         \n\
         Or point `node` in prebuild.toml at an existing executable."
    }

    /// Get hint for missing node-gyp script
    pub fn node_gyp() -> &'static str {
        "node-gyp was not found at the configured path.\n\
         • Run: npm install --save-dev node-gyp\n\
         • Or set `node_gyp` in prebuild.toml"
    }

    /// Get hint for invalid prebuild.toml
    pub fn invalid_prebuild_toml() -> &'static str {
        "prebuild.toml is invalid. Common issues:\n\
         • Keys must live under the [prebuild] section\n\
         • `modules` must be a non-empty array of package names\n\
         • Module names may not contain path separators or '..'"
    }

    /// Get hint for an unusable --arch / --target value
    pub fn invalid_target() -> &'static str {
        "Target values become part of a directory name.\n\
         • --arch must be a single identifier such as x64, arm64 or ia32\n\
         • --target must not contain '/' or '\\'"
    }

    /// Get hint for a module directory that does not exist
    pub fn module_not_installed() -> &'static str {
        "The module source directory does not exist.\n\
         • Run: npm install\n\
         • Or check `modules_dir` in prebuild.toml"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_failed_message_names_command_and_code() {
        let err = PrebuildError::build_failed("microtime", "node node-gyp rebuild", 7);
        assert_eq!(
            err.to_string(),
            "Command \"node node-gyp rebuild\" failed with exit code 7"
        );
        assert_eq!(err.exit_code(), 7);
    }

    #[test]
    fn test_non_build_errors_exit_with_one() {
        let err = PrebuildError::config_error_with_hint("bad", None, hints::invalid_prebuild_toml());
        assert_eq!(err.exit_code(), 1);

        let err = PrebuildError::missing_tool("node", "building modules", hints::node());
        assert_eq!(err.exit_code(), 1);
        assert_eq!(err.to_string(), "Missing tool: node");
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let err: anyhow::Error = PrebuildError::build_failed("pi-spi", "node x", 2).into();
        let err = err.context("while prebuilding");
        let found = err.chain().find_map(|e| e.downcast_ref::<PrebuildError>());
        assert_eq!(found.map(PrebuildError::exit_code), Some(2));
    }
}
