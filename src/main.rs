//! Runs a producer/consumer workload against a `BlockingQueue` and reports whether every item
//! made it through exactly once and in order

#[macro_use]
extern crate log;

extern crate blockq;
extern crate colored;
extern crate env_logger;

use std::env;
use std::process;
use blockq::{workload, Config};

fn init_log() {
    use log::{Level, LevelFilter};
    use colored::Colorize;
    use std::io::Write;
    let mut log_builder = env_logger::Builder::new();
    log_builder.filter(Some("blockq"), LevelFilter::Debug);
    if let Ok(s) = env::var("RUST_LOG") {
        log_builder.parse_filters(&s);
    }
    log_builder.format(|buf, rec| {
        let level_str = match rec.level() {
            Level::Trace => "[TRACE]".dimmed(),
            Level::Debug => "[DEBUG]".white().bold(),
            Level::Info => "[INFO]".cyan(),
            Level::Warn => "[WARN]".yellow(),
            Level::Error => "[ERROR]".red(),
        };
        writeln!(buf,
                 "{:7} {:20} - {}",
                 level_str,
                 rec.module_path().unwrap_or(""),
                 rec.args())
    });
    log_builder.init();
}

fn main() {
    init_log();

    let config = match env::args().nth(1) {
        Some(path) => {
            Config::from_file(&path).unwrap_or_else(|err| {
                error!("error loading config file {}: {}", path, err);
                process::exit(2)
            })
        }
        None => {
            info!("no config file given, using defaults");
            Config::default()
        }
    };
    debug!("config: {:?}", config);

    match workload::run(&config) {
        Ok(report) => {
            info!("{}", report);
            if !report.is_consistent() {
                error!("items were lost, duplicated or reordered");
                process::exit(1);
            }
        }
        Err(err) => {
            error!("workload failed: {}", err);
            process::exit(1);
        }
    }
}
