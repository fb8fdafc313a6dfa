//! CLI argument parsing using clap derive macros

use anyhow::Result;
use clap::Parser;

use crate::commands::prebuild::PrebuildCommand;
use crate::utils::terminal::disable_colors;

/// Rebuild native Node.js addons for a runtime target and stage them
/// under prebuilt-modules/<target>/<module>.
#[derive(Parser, Debug)]
#[command(name = "prebuild-modules")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(flatten)]
    pub prebuild: PrebuildCommand,
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        if self.no_color {
            disable_colors();
        }

        self.prebuild.execute(self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_all_flags() {
        let cli = Cli::try_parse_from([
            "prebuild-modules",
            "--target",
            "27.0.1",
            "--arch",
            "arm64",
            "--electron",
            "--root",
            "/tool",
            "-v",
        ])
        .unwrap();

        assert!(cli.verbose);
        assert_eq!(cli.prebuild.target.as_deref(), Some("27.0.1"));
        assert_eq!(cli.prebuild.arch.as_deref(), Some("arm64"));
        assert!(cli.prebuild.electron);
        assert_eq!(cli.prebuild.root, Some(std::path::PathBuf::from("/tool")));
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["prebuild-modules", "--root", "/tool"]).unwrap();
        assert!(cli.prebuild.target.is_none());
        assert!(cli.prebuild.arch.is_none());
        assert!(!cli.prebuild.electron);
        assert!(!cli.no_color);
    }

    #[test]
    fn test_equals_syntax() {
        let cli = Cli::try_parse_from(["prebuild-modules", "--target=18.19.0", "--arch=x64"]).unwrap();
        assert_eq!(cli.prebuild.target.as_deref(), Some("18.19.0"));
        assert_eq!(cli.prebuild.arch.as_deref(), Some("x64"));
    }
}
