/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io;
use std::process::ExitCode;

use anyhow::{Context, anyhow};
use clap::{Arg, ArgMatches, Command, value_parser};
use clap_complete::Shell;

const COMMAND_VERSION: &str = "version";
const COMMAND_COMPLETION: &str = "completion";

fn build_cli_args() -> Command {
    geosnap::add_args(Command::new(geosnap::build::PKG_NAME))
        .args_conflicts_with_subcommands(true)
        .subcommand(Command::new(COMMAND_VERSION).override_help("Show version"))
        .subcommand(
            Command::new(COMMAND_COMPLETION).arg(
                Arg::new("target")
                    .value_name("SHELL")
                    .required(true)
                    .num_args(1)
                    .value_parser(value_parser!(Shell)),
            ),
        )
}

fn main() -> anyhow::Result<ExitCode> {
    let args = build_cli_args().get_matches();

    if let Some((subcommand, sub_args)) = args.subcommand() {
        match subcommand {
            COMMAND_VERSION => geosnap::build::print_version(),
            COMMAND_COMPLETION => generate_completion(sub_args),
            cmd => return Err(anyhow!("invalid subcommand {cmd}")),
        }
        return Ok(ExitCode::SUCCESS);
    }

    let proc_args = geosnap::parse_args(&args)?;
    let _log_guard = geosnap::logger::setup(proc_args.verbose_level)
        .context("failed to setup logger")?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .thread_name("geosnap-main")
        .enable_all()
        .build()
        .context("failed to start main runtime")?;
    rt.block_on(geosnap::run(proc_args))
}

fn generate_completion(args: &ArgMatches) {
    if let Some(target) = args.get_one::<Shell>("target") {
        let mut app = build_cli_args();
        let bin_name = app.get_name().to_string();
        clap_complete::generate(*target, &mut app, bin_name, &mut io::stdout());
    }
}
