// Copyright 2024-2025 mbp-hotkeyd contributors
//
// SPDX-License-Identifier: GPL-3.0-only

use clap::Parser;
use log::LevelFilter;
use std::process;

use mbp_hotkeyd::{config::Config, daemon::Daemon, logging};

/// Hotkey and backlight handler daemon for MacBook and MacBook Pro laptops
#[derive(Parser)]
#[command(name = "mbp-hotkeyd", version, about, long_about = None)]
struct Args {
    /// Set the verbosity of daemon logs to 'off' [default is 'info']
    #[arg(long, short, group = "verbosity")]
    quiet: bool,

    /// Set the verbosity of daemon logs to 'debug' [default is 'info']
    #[arg(long, short, group = "verbosity")]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.quiet {
        LevelFilter::Off
    } else if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    if let Err(why) = logging::setup(level) {
        eprintln!("failed to set up logging: {}", why);
        process::exit(1);
    }

    log::info!("mbp-hotkeyd {}", env!("CARGO_PKG_VERSION"));

    let config = match Config::load() {
        Ok(config) => config,
        Err(why) => {
            log::error!("failed to load configuration: {:#}", why);
            process::exit(1);
        }
    };

    // Startup failures (unrecognized machine, missing privilege, no
    // backlight, no event sources) exit 1; runtime failures exit 2.
    let mut daemon = match Daemon::new(&config) {
        Ok(daemon) => daemon,
        Err(why) => {
            log::error!("{}", why);
            process::exit(1);
        }
    };

    if let Err(why) = daemon.run() {
        log::error!("{}", why);
        process::exit(2);
    }

    log::info!("exiting");
}
