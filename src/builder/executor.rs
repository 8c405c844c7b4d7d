//! Build plan execution.
//!
//! Two policies apply to subprocesses:
//! - strict: a non-zero exit aborts the whole run with [`StageError::CommandFailed`];
//! - lenient: the exit code is handed back and the caller decides.
//!
//! Only the Visual Studio generator search and the Makefiles warm-up pass are
//! lenient.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::plan::{BuildPlan, BuildStep, ConfigureStrategy, MakefilesPlan};
use crate::util::fs::remove_file_if_exists;
use crate::util::process::{CommandRunner, CommandSpec, RunOutcome};
use crate::util::shell::{format_duration, Shell, Status};
use crate::util::StageError;

/// Run a command and fail on a non-zero exit code.
pub fn run_strict(runner: &mut dyn CommandRunner, cmd: &CommandSpec) -> Result<RunOutcome> {
    let outcome = runner.run(cmd)?;
    if !outcome.success() {
        return Err(StageError::CommandFailed {
            command: cmd.display_command(),
            code: outcome.code,
            stderr: outcome.stderr,
        }
        .into());
    }
    Ok(outcome)
}

/// Run a command and return its exit code whatever it is.
pub fn run_lenient(runner: &mut dyn CommandRunner, cmd: &CommandSpec) -> Result<i32> {
    let outcome = runner.run(cmd)?;
    if !outcome.success() {
        tracing::debug!(
            "`{}` exited with {} (tolerated)",
            cmd.display_command(),
            outcome.code
        );
    }
    Ok(outcome.code)
}

/// Executes a [`BuildPlan`].
pub struct PlanExecutor<'a> {
    runner: &'a mut dyn CommandRunner,
    shell: &'a Shell,
    /// `CMakeCache.txt` in the build tree, cleared between generator attempts
    cmake_cache: PathBuf,
}

impl<'a> PlanExecutor<'a> {
    pub fn new(runner: &'a mut dyn CommandRunner, shell: &'a Shell, build_dir: &Path) -> Self {
        PlanExecutor {
            runner,
            shell,
            cmake_cache: build_dir.join("CMakeCache.txt"),
        }
    }

    /// Configure and build. Returns the folder holding the built library.
    pub fn execute(&mut self, plan: &BuildPlan) -> Result<PathBuf> {
        match &plan.strategy {
            ConfigureStrategy::Direct { configure, build } => {
                self.shell.status(Status::Configuring, configure.display_command());
                run_strict(self.runner, configure)?;
                self.build(build)
            }
            ConfigureStrategy::Makefiles(mk) => self.makefiles(mk),
            ConfigureStrategy::VisualStudio {
                attempts,
                build,
                fallback,
            } => {
                for attempt in attempts {
                    self.shell
                        .status(Status::Configuring, format!("trying '{}'", attempt.generator));
                    self.clear_cmake_cache()?;

                    if run_lenient(self.runner, &attempt.configure)? == 0 {
                        tracing::info!(
                            "Successfully created build files for '{}'",
                            attempt.generator
                        );
                        return self.build(build);
                    }
                }

                let tried = attempts.iter().map(|a| a.generator.clone()).collect();
                let exhausted = StageError::GeneratorsExhausted { tried };
                self.shell.warn(format!(
                    "{}; attempting with {}",
                    exhausted, fallback.toolchain.name
                ));
                self.clear_cmake_cache()?;
                self.makefiles(fallback)
            }
        }
    }

    fn makefiles(&mut self, mk: &MakefilesPlan) -> Result<PathBuf> {
        self.shell.status(
            Status::Configuring,
            format!("with {} ({})", mk.toolchain.name, mk.toolchain.generator),
        );
        run_lenient(self.runner, &mk.warmup)?;
        run_strict(self.runner, &mk.configure)?;
        self.build(&mk.build)
    }

    fn build(&mut self, step: &BuildStep) -> Result<PathBuf> {
        let spinner = self
            .shell
            .spinner(Status::Building, step.command.display_command());
        run_strict(self.runner, &step.command)?;
        let elapsed = spinner.finish();
        tracing::info!("build finished in {}", format_duration(elapsed));
        Ok(step.lib_dir.clone())
    }

    fn clear_cmake_cache(&self) -> Result<()> {
        if remove_file_if_exists(&self.cmake_cache)? {
            tracing::debug!("removed stale {}", self.cmake_cache.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::plan::{BuildSettings, Toggles};
    use crate::builder::toolchain::{WindowsToolchain, DEFAULT_VS_GENERATORS};
    use crate::core::{HostOs, HostPlatform, PackageLayout};
    use crate::test_support::MockRunner;
    use crate::util::shell::{ColorChoice, Verbosity};
    use tempfile::TempDir;

    fn quiet() -> Shell {
        Shell::new(Verbosity::Quiet, ColorChoice::Never)
    }

    fn plan_for(os: HostOs, toolchain: WindowsToolchain, layout: &PackageLayout) -> BuildPlan {
        plan_with_gpu(os, toolchain, false, layout)
    }

    fn plan_with_gpu(
        os: HostOs,
        toolchain: WindowsToolchain,
        use_gpu: bool,
        layout: &PackageLayout,
    ) -> BuildPlan {
        let settings = BuildSettings {
            target: "_demo".to_string(),
            toggles: Toggles {
                use_gpu,
                windows_toolchain: toolchain,
            },
            jobs: 2,
            defines: Vec::new(),
            vs_generators: DEFAULT_VS_GENERATORS.iter().map(|s| s.to_string()).collect(),
        };
        BuildPlan::new(
            &settings,
            &HostPlatform::new(os, "x86_64", 64),
            layout,
            Path::new("cmake"),
        )
    }

    fn layout(tmp: &TempDir) -> PackageLayout {
        PackageLayout::new(tmp.path(), &tmp.path().join("install"), "", ".so")
    }

    #[test]
    fn test_strict_failure_is_command_failed() {
        let mut runner = MockRunner::new();
        runner.fail_program("make", 2);

        let err = run_strict(&mut runner, &CommandSpec::new("make").arg("all")).unwrap_err();
        match err.downcast_ref::<StageError>() {
            Some(StageError::CommandFailed { command, code, .. }) => {
                assert_eq!(command, "make all");
                assert_eq!(*code, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_lenient_returns_code() {
        let mut runner = MockRunner::new();
        runner.fail_program("cmake", 1);

        assert_eq!(run_lenient(&mut runner, &CommandSpec::new("cmake")).unwrap(), 1);
    }

    #[test]
    fn test_direct_configure_failure_skips_build() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(&tmp);
        let plan = plan_for(HostOs::Linux, WindowsToolchain::Msvc, &layout);

        let mut runner = MockRunner::new();
        runner.fail_program("cmake", 1);
        let shell = quiet();

        let result = PlanExecutor::new(&mut runner, &shell, &layout.build_dir).execute(&plan);

        assert!(result.is_err());
        assert_eq!(runner.calls().len(), 1);
        assert!(runner.calls()[0].starts_with("cmake"));
    }

    #[test]
    fn test_direct_plan_runs_configure_then_build() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(&tmp);
        let plan = plan_for(HostOs::Linux, WindowsToolchain::Msvc, &layout);

        let mut runner = MockRunner::new();
        let shell = quiet();
        let lib_dir = PlanExecutor::new(&mut runner, &shell, &layout.build_dir)
            .execute(&plan)
            .unwrap();

        assert_eq!(lib_dir, layout.source_dir);
        assert_eq!(runner.calls(), ["cmake ..", "make _demo -j2"]);
    }

    #[test]
    fn test_visual_studio_stops_at_first_success() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(&tmp);
        let plan = plan_for(HostOs::Windows, WindowsToolchain::Msvc, &layout);

        let mut runner = MockRunner::new();
        runner.fail_on("Visual Studio 17 2022", 1);
        let shell = quiet();

        let lib_dir = PlanExecutor::new(&mut runner, &shell, &layout.build_dir)
            .execute(&plan)
            .unwrap();

        assert_eq!(lib_dir, layout.source_dir.join("Release"));
        assert_eq!(
            runner.calls(),
            [
                "cmake -G \"Visual Studio 17 2022\" -A x64 ..",
                "cmake -G \"Visual Studio 16 2019\" -A x64 ..",
                "cmake --build . --target _demo --config Release",
            ]
        );
    }

    #[test]
    fn test_visual_studio_clears_stale_cache_between_attempts() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(&tmp);
        std::fs::create_dir_all(&layout.build_dir).unwrap();
        std::fs::write(layout.cmake_cache(), "CMAKE_GENERATOR:INTERNAL=Ninja").unwrap();

        let plan = plan_for(HostOs::Windows, WindowsToolchain::Msvc, &layout);
        let mut runner = MockRunner::new();
        let shell = quiet();

        PlanExecutor::new(&mut runner, &shell, &layout.build_dir)
            .execute(&plan)
            .unwrap();

        assert!(!layout.cmake_cache().exists());
    }

    #[test]
    fn test_visual_studio_falls_back_to_mingw() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(&tmp);
        let plan = plan_for(HostOs::Windows, WindowsToolchain::Msvc, &layout);

        let mut runner = MockRunner::new();
        runner.fail_on("Visual Studio", 1);
        let shell = quiet();

        let lib_dir = PlanExecutor::new(&mut runner, &shell, &layout.build_dir)
            .execute(&plan)
            .unwrap();

        assert_eq!(lib_dir, layout.source_dir);
        let calls = runner.calls();
        assert_eq!(calls.len(), DEFAULT_VS_GENERATORS.len() + 3);
        for (call, generator) in calls.iter().zip(DEFAULT_VS_GENERATORS) {
            assert!(call.contains(generator));
        }
        let tail = &calls[DEFAULT_VS_GENERATORS.len()..];
        assert_eq!(
            tail,
            [
                "cmake -G \"MinGW Makefiles\" ..",
                "cmake -G \"MinGW Makefiles\" ..",
                "mingw32-make.exe _demo -j2",
            ]
        );
    }

    #[test]
    fn test_gpu_flag_reaches_every_configure_run() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(&tmp);
        let plan = plan_with_gpu(HostOs::Windows, WindowsToolchain::Msvc, true, &layout);

        let mut runner = MockRunner::new();
        runner.fail_on("Visual Studio", 1);
        let shell = quiet();

        PlanExecutor::new(&mut runner, &shell, &layout.build_dir)
            .execute(&plan)
            .unwrap();

        let configures: Vec<&String> = runner
            .calls()
            .iter()
            .filter(|c| c.starts_with("cmake -DUSE_GPU=ON"))
            .collect();
        // Every generator, then warm-up and strict MinGW configure
        assert_eq!(configures.len(), DEFAULT_VS_GENERATORS.len() + 2);
        assert_eq!(
            runner.calls().last().map(String::as_str),
            Some("mingw32-make.exe _demo -j2")
        );
    }

    #[test]
    fn test_fallback_strict_configure_aborts() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(&tmp);
        let plan = plan_for(HostOs::Windows, WindowsToolchain::Msvc, &layout);

        let mut runner = MockRunner::new();
        runner.fail_on("-G", 1);
        let shell = quiet();

        let err = PlanExecutor::new(&mut runner, &shell, &layout.build_dir)
            .execute(&plan)
            .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<StageError>(),
            Some(StageError::CommandFailed { .. })
        ));
        // Generators, warm-up, strict configure; never the build
        assert_eq!(runner.calls().len(), DEFAULT_VS_GENERATORS.len() + 2);
        assert!(!runner.calls().iter().any(|c| c.starts_with("mingw32-make")));
    }

    #[test]
    fn test_makefiles_warmup_failure_is_tolerated() {
        let tmp = TempDir::new().unwrap();
        let layout = layout(&tmp);
        let plan = plan_for(HostOs::Windows, WindowsToolchain::Msys2, &layout);

        let mut runner = MockRunner::new();
        runner.fail_times("MSYS Makefiles", 1, 1);
        let shell = quiet();

        PlanExecutor::new(&mut runner, &shell, &layout.build_dir)
            .execute(&plan)
            .unwrap();

        assert_eq!(
            runner.calls(),
            [
                "cmake -G \"MSYS Makefiles\" ..",
                "cmake -G \"MSYS Makefiles\" ..",
                "make.exe _demo -j2",
            ]
        );
    }
}
