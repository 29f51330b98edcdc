use crate::error::Result;
use clap::ValueEnum;
use log::LevelFilter;
use std::io::Write;

/// Diagnostic verbosity. Report lines are not affected; they go to the report sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

/// Initializes `env_logger` on stderr.
///
/// `RUST_LOG` is read first; `level` then overrides it for this crate.
/// Uses `try_init`, so calling it twice returns an error instead of panicking.
pub fn init_logger(level: LevelFilter) -> Result<()> {
    let mut builder = env_logger::Builder::from_default_env();

    builder.filter_level(level);
    builder.filter_module("reqwest", LevelFilter::Warn);
    builder.filter_module("hyper", LevelFilter::Warn);
    builder.filter_module("hyper_util", LevelFilter::Warn);
    builder.filter_module("speedprobe", level);

    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] {}: {}",
            record.level(),
            record.target(),
            record.args()
        )
    });

    builder.try_init()?;
    Ok(())
}
