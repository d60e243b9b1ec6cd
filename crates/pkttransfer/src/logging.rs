use clap::ValueEnum;
use tracing::level_filters::LevelFilter;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// One compact line per event.
    #[default]
    Text,
    /// One JSON object per event, fields at the top level.
    Json,
}

/// How much of the transfer machinery reaches stderr.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    /// Only problems. Keeps stderr quiet while frames flow.
    #[default]
    Warn,
    /// Instance setup, teardown and run summaries.
    Info,
    /// Every frame queued, sent and received.
    Debug,
    /// Dropped frames and raw bus chunks.
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Install the stderr subscriber. A second call is a no-op.
///
/// stdout carries command output (including raw wire bytes), so events
/// never go there.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level.as_filter())
        .with_ansi(false)
        .with_target(false);

    let _ = match format {
        LogFormat::Text => builder.compact().try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_filters() {
        assert_eq!(LogLevel::Error.as_filter(), LevelFilter::ERROR);
        assert_eq!(LogLevel::Trace.as_filter(), LevelFilter::TRACE);
    }

    #[test]
    fn per_frame_events_are_quiet_by_default() {
        let filter = LogLevel::default().as_filter();
        assert!(filter < LevelFilter::DEBUG);
        assert!(filter < LevelFilter::INFO);
        assert_eq!(LogFormat::default(), LogFormat::Text);
    }
}
