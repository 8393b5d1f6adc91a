// Logging setup for diagnostics. The user-facing report lives in `ui`.

use std::io;

use tracing::Level;

use crate::error::LoggingError;

/// Map `-v` occurrences to a level: warn by default, then info, then debug.
pub fn level_for(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. Diagnostics go to stderr so they never
/// mix with the report on stdout.
pub fn setup_logging(verbosity: u8, json: bool) -> Result<(), LoggingError> {
    let builder = tracing_subscriber::fmt()
        .with_max_level(level_for(verbosity))
        .with_target(false)
        .with_writer(io::stderr);

    let result = if json {
        builder.json().flatten_event(true).try_init()
    } else {
        builder.compact().try_init()
    };

    result.map_err(|e| LoggingError::Error(format!("Failed to setup logging with error: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_for() {
        assert_eq!(level_for(0), Level::WARN);
        assert_eq!(level_for(1), Level::INFO);
        assert_eq!(level_for(2), Level::DEBUG);
        assert_eq!(level_for(9), Level::TRACE);
    }
}
