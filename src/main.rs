mod args;
mod tally;

use clap::Parser;
use log::{debug, info};
use snafu::ErrorCompat;

use crate::args::Args;

fn init_logging(args: &Args) {
    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }
}

fn main() {
    let args = Args::parse();
    init_logging(&args);
    debug!("args: {:?}", args);

    if args.config.is_none() && args.input.is_empty() {
        info!("Please provide a configuration file (--config) or an input file (--input) to begin the analysis");
        println!("{}", tally::expected_format());
        return;
    }

    let res = tally::config_from_args(&args).and_then(|(config, root_path)| {
        tally::run_report(&config, &root_path, args.out.clone(), args.reference.clone())
    });

    if let Err(e) = res {
        eprintln!("An error occured {}", e);
        let mut source = std::error::Error::source(&*e);
        while let Some(s) = source {
            eprintln!("  caused by: {}", s);
            source = s.source();
        }
        if let Some(bt) = ErrorCompat::backtrace(&*e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
