//! Terminal logger setup for the binaries and the tests

use log::LevelFilter;
use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

/// Install the global terminal logger at `level`
pub fn init(level: LevelFilter) -> anyhow::Result<()> {
    CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )])?;
    Ok(())
}

/// Initializes a terminal logger for tests.
///
/// This no-ops if another test already installed a logger.
pub fn initialize_for_tests() {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = init(level);
}
