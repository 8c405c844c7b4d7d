//! `libstage install` command

use std::time::Instant;

use anyhow::Result;

use crate::cli::InstallArgs;
use libstage::core::HostPlatform;
use libstage::ops::{install, preflight, InstallOptions, InstallPlan};
use libstage::util::config::load_for_package;
use libstage::util::shell::{format_duration, Shell, Status};
use libstage::util::{StageError, SystemRunner};

pub fn execute(args: InstallArgs, shell: &Shell) -> Result<()> {
    let start = Instant::now();
    let use_gpu = args.use_gpu();

    let package_source = args.package_source.ok_or(StageError::MissingVariable {
        what: "package source directory",
        flag: "--source",
        var: "R_PACKAGE_SOURCE",
    })?;
    let package_dir = args.package_dir.ok_or(StageError::MissingVariable {
        what: "package install directory",
        flag: "--package-dir",
        var: "R_PACKAGE_DIR",
    })?;

    let config = load_for_package(&package_source);
    let options = InstallOptions {
        package_source,
        package_dir,
        arch: args.arch,
        shlib_ext: args.shlib_ext,
        target: args.target,
        library: args.library,
        use_gpu,
        windows_toolchain: args.windows_toolchain,
        jobs: args.jobs,
        precompiled: args.precompiled,
        keep_build_dir: args.keep_build_dir,
        cmake: None,
    };

    let plan = InstallPlan::resolve(&options, &config, HostPlatform::detect())?;

    if args.plan {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    preflight(&plan, shell)?;

    let mut runner = SystemRunner::new(shell.is_verbose());
    let report = install(&plan, &mut runner, shell)?;

    shell.status(
        Status::Finished,
        format!(
            "{} in {}",
            report.artifact.display(),
            format_duration(start.elapsed())
        ),
    );

    Ok(())
}
