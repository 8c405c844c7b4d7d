//! `libstage doctor` command

use anyhow::Result;

use crate::cli::DoctorArgs;
use libstage::ops::{doctor, format_report, DoctorOptions};

pub fn execute(args: DoctorArgs, verbose: bool) -> Result<()> {
    let options = DoctorOptions {
        package_source: args.package_source,
        windows_toolchain: args.windows_toolchain,
    };

    let report = doctor(&options)?;
    print!("{}", format_report(&report, verbose));

    if !report.all_required_passed() {
        std::process::exit(1);
    }

    Ok(())
}
