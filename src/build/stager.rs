//! Artifact staging
//!
//! Drives one build-then-replace cycle per module, strictly in list order.
//! A staged module is only removed after its rebuild succeeded, so a failed
//! build leaves the previous staged copy untouched. The first failure ends
//! the run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use crate::build::node_gyp::NodeGyp;
use crate::build::target::{BuildConfig, StagingLayout};
use crate::error::{hints, PrebuildError};
use crate::exec::ProcessRunner;
use crate::utils::paths::{copy_tree, ensure_dir, remove_path};
use crate::utils::terminal::{print_detail, print_info, print_success};

/// Progress of a staging run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    NotStarted,
    EnsuringDir,
    /// Building the module at this index
    Building(usize),
    /// Replacing the staged copy of the module at this index
    Staging(usize),
    Done,
    /// Run aborted while handling the module at this index
    Failed(usize),
}

/// One module copied into the target directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedModule {
    pub name: String,
    pub path: PathBuf,
    pub files: u64,
    pub build_time: Duration,
}

/// Outcome of a successful run
#[derive(Debug, Clone)]
pub struct StageReport {
    pub target_dir: PathBuf,
    pub modules: Vec<StagedModule>,
}

/// Builds modules with node-gyp and stages their trees under one target
pub struct ArtifactStager<R> {
    runner: R,
    builder: NodeGyp,
    layout: StagingLayout,
    /// Directory containing one source directory per module
    sources_dir: PathBuf,
    /// Name printed in per-module notices
    output_label: String,
    verbose: bool,
    state: StageState,
}

impl<R: ProcessRunner> ArtifactStager<R> {
    pub fn new(runner: R, builder: NodeGyp, layout: StagingLayout, sources_dir: PathBuf) -> Self {
        let output_label = layout
            .root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| layout.root.display().to_string());

        Self {
            runner,
            builder,
            layout,
            sources_dir,
            output_label,
            verbose: false,
            state: StageState::NotStarted,
        }
    }

    /// Echo commands and timings
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Where the last run got to
    pub fn state(&self) -> StageState {
        self.state
    }

    #[cfg(test)]
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Create the staging root and target directory if needed
    pub fn ensure_dirs(&mut self) -> Result<()> {
        self.state = StageState::EnsuringDir;
        ensure_dir(&self.layout.root)?;
        ensure_dir(&self.layout.target_dir)
    }

    /// Build and stage every module in order, stopping at the first failure
    pub async fn run(&mut self, config: &BuildConfig, modules: &[String]) -> Result<StageReport> {
        self.ensure_dirs()?;

        let mut staged = Vec::with_capacity(modules.len());
        for (index, module) in modules.iter().enumerate() {
            let build_time = match self.build_module(index, config, module).await {
                Ok(elapsed) => elapsed,
                Err(e) => {
                    self.state = StageState::Failed(index);
                    return Err(e);
                }
            };

            match self.stage_module(index, module) {
                Ok(files) => staged.push(StagedModule {
                    name: module.clone(),
                    path: self.layout.module_dir(module),
                    files,
                    build_time,
                }),
                Err(e) => {
                    self.state = StageState::Failed(index);
                    return Err(e);
                }
            }
        }

        self.state = StageState::Done;
        Ok(StageReport {
            target_dir: self.layout.target_dir.clone(),
            modules: staged,
        })
    }

    async fn build_module(&mut self, index: usize, config: &BuildConfig, module: &str) -> Result<Duration> {
        self.state = StageState::Building(index);

        let source = self.source_dir(module);
        if !source.is_dir() {
            return Err(PrebuildError::config_error_with_hint(
                format!("Module '{}' not found at {}", module, source.display()),
                None,
                hints::module_not_installed(),
            )
            .into());
        }

        let spec = self.builder.rebuild_command(config, &source);
        if self.verbose {
            print_detail(&format!("$ {}", spec));
            print_detail(&format!("cwd: {}", source.display()));
        }

        let result = self
            .runner
            .run(&spec)
            .await
            .with_context(|| format!("Failed to run build for module '{}'", module))?;

        if !result.success {
            return Err(PrebuildError::build_failed(module, spec.to_string(), result.exit_code).into());
        }

        print_info(&format!("Module {} rebuilt", module));
        if self.verbose {
            print_detail(&format!("took {:.2}s", result.duration.as_secs_f64()));
        }
        Ok(result.duration)
    }

    fn stage_module(&mut self, index: usize, module: &str) -> Result<u64> {
        self.state = StageState::Staging(index);

        let source = self.source_dir(module);
        let dest = self.layout.module_dir(module);

        remove_path(&dest).map_err(|e| PrebuildError::staging(module, "could not remove previous copy", e))?;
        if let Some(parent) = dest.parent() {
            ensure_dir(parent).map_err(|e| PrebuildError::staging(module, "could not create parent directory", e))?;
        }
        let files = copy_tree(&source, &dest)
            .map_err(|e| PrebuildError::staging(module, "could not copy build output", e))?;

        print_success(&format!("Module {} copied to {}", module, self.output_label));
        Ok(files)
    }

    fn source_dir(&self, module: &str) -> PathBuf {
        module_path(&self.sources_dir, module)
    }
}

/// Join a possibly scoped (`@scope/name`) module name onto `base`
fn module_path(base: &Path, module: &str) -> PathBuf {
    module.split('/').fold(base.to_path_buf(), |path, part| path.join(part))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use crate::build::target::{RuntimeKind, DEFAULT_OUTPUT_DIR};
    use crate::exec::subprocess::{CommandResult, CommandSpec};

    /// Records invocations; modules absent from `exit_codes` succeed and
    /// write a fresh build artifact into their source tree.
    #[derive(Default)]
    struct FakeRunner {
        exit_codes: HashMap<String, i32>,
        calls: Mutex<Vec<CommandSpec>>,
    }

    impl FakeRunner {
        fn failing(module: &str, code: i32) -> Self {
            let mut runner = Self::default();
            runner.exit_codes.insert(module.to_string(), code);
            runner
        }

        fn built_modules(&self) -> Vec<String> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|spec| {
                    spec.cwd
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .unwrap()
                        .to_string_lossy()
                        .into_owned()
                })
                .collect()
        }
    }

    impl ProcessRunner for FakeRunner {
        async fn run(&self, spec: &CommandSpec) -> Result<CommandResult> {
            self.calls.lock().unwrap().push(spec.clone());
            let cwd = spec.cwd.clone().unwrap();
            let module = cwd.file_name().unwrap().to_string_lossy().into_owned();
            let code = self.exit_codes.get(&module).copied().unwrap_or(0);
            if code == 0 {
                let out = cwd.join("build").join("Release");
                std::fs::create_dir_all(&out).unwrap();
                std::fs::write(out.join("addon.node"), "fresh").unwrap();
            }
            Ok(CommandResult::from_code(code))
        }
    }

    fn config() -> BuildConfig {
        BuildConfig {
            runtime_kind: RuntimeKind::Node,
            runtime_version: "18.19.0".to_string(),
            platform: "linux".to_string(),
            architecture: "x64".to_string(),
        }
    }

    fn modules(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    struct Fixture {
        _temp: tempfile::TempDir,
        root: PathBuf,
    }

    impl Fixture {
        fn new(names: &[&str]) -> Self {
            let temp = tempfile::tempdir().unwrap();
            let root = temp.path().to_path_buf();
            for name in names {
                let dir = root.join("node_modules").join(name);
                std::fs::create_dir_all(&dir).unwrap();
                std::fs::write(dir.join("package.json"), format!("{{\"name\":\"{}\"}}", name)).unwrap();
            }
            Self { _temp: temp, root }
        }

        fn stager(&self, runner: FakeRunner) -> ArtifactStager<FakeRunner> {
            let layout = StagingLayout::new(&self.root, DEFAULT_OUTPUT_DIR, &config());
            let builder = NodeGyp::new("node", self.root.join("node-gyp"), "https://example.test");
            ArtifactStager::new(runner, builder, layout, self.root.join("node_modules"))
        }

        fn target_dir(&self) -> PathBuf {
            self.root
                .join("prebuilt-modules")
                .join("platform-linux-arch-x64-node-18.19")
        }

        fn staged_entries(&self) -> Vec<String> {
            let mut names: Vec<String> = std::fs::read_dir(self.target_dir())
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }
    }

    #[tokio::test]
    async fn test_all_modules_staged_in_order() {
        let fx = Fixture::new(&["moduleA", "moduleB"]);
        let mut stager = fx.stager(FakeRunner::default());

        let report = stager.run(&config(), &modules(&["moduleA", "moduleB"])).await.unwrap();

        assert_eq!(stager.state(), StageState::Done);
        assert_eq!(stager.runner().built_modules(), vec!["moduleA", "moduleB"]);
        assert_eq!(fx.staged_entries(), vec!["moduleA", "moduleB"]);
        assert_eq!(report.modules.len(), 2);
        assert_eq!(report.modules[0].files, 2);
        assert_eq!(
            std::fs::read_to_string(fx.target_dir().join("moduleB/build/Release/addon.node")).unwrap(),
            "fresh"
        );
    }

    #[tokio::test]
    async fn test_first_failure_aborts_run() {
        let fx = Fixture::new(&["moduleA", "moduleB"]);
        let mut stager = fx.stager(FakeRunner::failing("moduleA", 1));

        let err = stager.run(&config(), &modules(&["moduleA", "moduleB"])).await.unwrap_err();

        let err = err.downcast::<PrebuildError>().unwrap();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("rebuild --target=18.19.0 --arch=x64"));
        assert_eq!(stager.state(), StageState::Failed(0));
        assert_eq!(stager.runner().built_modules(), vec!["moduleA"]);
        assert!(fx.staged_entries().is_empty());
    }

    #[tokio::test]
    async fn test_failure_mid_list_keeps_earlier_modules() {
        let fx = Fixture::new(&["a", "b", "c"]);
        let mut stager = fx.stager(FakeRunner::failing("b", 5));

        let err = stager.run(&config(), &modules(&["a", "b", "c"])).await.unwrap_err();

        assert_eq!(err.downcast_ref::<PrebuildError>().map(PrebuildError::exit_code), Some(5));
        assert_eq!(stager.state(), StageState::Failed(1));
        assert_eq!(stager.runner().built_modules(), vec!["a", "b"]);
        assert_eq!(fx.staged_entries(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_rebuild_replaces_previous_copy_entirely() {
        let fx = Fixture::new(&["moduleA"]);
        let stale = fx.target_dir().join("moduleA");
        std::fs::create_dir_all(stale.join("old")).unwrap();
        std::fs::write(stale.join("old/stale.node"), "stale").unwrap();

        let mut stager = fx.stager(FakeRunner::default());
        stager.run(&config(), &modules(&["moduleA"])).await.unwrap();

        let staged = fx.target_dir().join("moduleA");
        assert!(!staged.join("old").exists());
        assert!(staged.join("package.json").is_file());
        assert!(staged.join("build/Release/addon.node").is_file());
    }

    #[tokio::test]
    async fn test_failed_build_keeps_previous_copy() {
        let fx = Fixture::new(&["moduleA"]);
        let previous = fx.target_dir().join("moduleA");
        std::fs::create_dir_all(&previous).unwrap();
        std::fs::write(previous.join("addon.node"), "previous").unwrap();

        let mut stager = fx.stager(FakeRunner::failing("moduleA", 2));
        assert!(stager.run(&config(), &modules(&["moduleA"])).await.is_err());

        assert_eq!(std::fs::read_to_string(previous.join("addon.node")).unwrap(), "previous");
    }

    #[tokio::test]
    async fn test_missing_module_source_fails_before_building() {
        let fx = Fixture::new(&[]);
        let mut stager = fx.stager(FakeRunner::default());

        let err = stager.run(&config(), &modules(&["ghost"])).await.unwrap_err();

        assert!(err.to_string().contains("Module 'ghost' not found"));
        assert!(stager.runner().built_modules().is_empty());
        assert_eq!(stager.state(), StageState::Failed(0));
    }

    #[test]
    fn test_ensure_dirs_is_idempotent() {
        let fx = Fixture::new(&[]);
        let mut stager = fx.stager(FakeRunner::default());

        stager.ensure_dirs().unwrap();
        std::fs::write(fx.target_dir().join("marker"), "m").unwrap();
        stager.ensure_dirs().unwrap();

        assert_eq!(fx.staged_entries(), vec!["marker"]);
        assert_eq!(stager.state(), StageState::EnsuringDir);
    }

    #[tokio::test]
    async fn test_scoped_module_staged_under_scope() {
        let fx = Fixture::new(&["@scope/addon"]);
        let mut stager = fx.stager(FakeRunner::default());

        stager.run(&config(), &modules(&["@scope/addon"])).await.unwrap();

        assert!(fx.target_dir().join("@scope/addon/package.json").is_file());
    }
}
