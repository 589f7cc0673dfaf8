mod alloc;
mod args;

use clap::Parser;
use log::{info, LevelFilter};
use snafu::ErrorCompat;

use crate::alloc::{RunMode, RunSettings};
use crate::args::Args;

fn main() {
    let args = Args::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if args.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    info!("args: {:?}", args);

    let settings = RunSettings::from(&args);
    let mode = if args.reset {
        RunMode::Reset {
            committee_id: args.reset_committee.clone(),
        }
    } else {
        RunMode::Allocate
    };

    if let Err(e) = alloc::run_event(&settings, &mode) {
        eprintln!("An error occured: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(e.as_ref()) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
