//! Tracing subscriber setup: console formatter, file layer, and initialisation.
use std::fs;
use std::path::Path;
use std::sync::Mutex;

/// Target used for stage headers.
pub const STAGE_TARGET: &str = "substitute::stage";

/// Extracts the `message` field and any other fields from a [`tracing::Event`].
#[derive(Default)]
struct MessageExtractor {
    message: String,
    fields: Vec<String>,
}

impl tracing::field::Visit for MessageExtractor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={value:?}", field.name()));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={value}", field.name()));
        }
    }
}

impl MessageExtractor {
    fn line(&self) -> String {
        if self.fields.is_empty() {
            self.message.clone()
        } else {
            format!("{} ({})", self.message, self.fields.join(", "))
        }
    }
}

/// A [`tracing_subscriber::fmt::FormatEvent`] that emits substitute-style
/// console output.
struct ConsoleFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let level = *metadata.level();
        let target = metadata.target();

        let mut extractor = MessageExtractor::default();
        event.record(&mut extractor);
        let msg = extractor.line();

        match level {
            tracing::Level::ERROR => writeln!(writer, "\x1b[31mERROR\x1b[0m {msg}"),
            tracing::Level::WARN => writeln!(writer, "\x1b[33mWARN\x1b[0m  {msg}"),
            tracing::Level::INFO if target == STAGE_TARGET => {
                writeln!(writer, "\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m")
            }
            tracing::Level::INFO => writeln!(writer, "  {msg}"),
            _ => writeln!(writer, "  \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Console output goes to stderr (the wrapped program owns stdout) at `INFO`,
/// or `DEBUG` when `verbose` is set; the `SUBSTITUTE_LOG` environment
/// variable (`EnvFilter` syntax) overrides that.  When `log_file` is given,
/// every event at `DEBUG` and above is also appended there with timestamps
/// and without ANSI codes.  Must be called once at program startup, before
/// any logging.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened.
pub fn init_subscriber(verbose: bool, log_file: Option<&Path>) -> std::io::Result<()> {
    use tracing_subscriber::{
        EnvFilter, Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let console_filter = EnvFilter::builder()
        .with_default_directive(console_level.into())
        .with_env_var("SUBSTITUTE_LOG")
        .from_env_lossy();

    let console_layer = fmt::layer()
        .event_format(ConsoleFormatter)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file_layer = match log_file {
        Some(path) => {
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt as _;

    #[test]
    fn file_layer_receives_debug_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        let file = fs::File::create(&path).unwrap();
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        );

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(path = "conf.json", "restoring from backup");
        });

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("restoring from backup"));
        assert!(written.contains("conf.json"));
    }

    #[test]
    fn extractor_appends_fields_after_message() {
        let extractor = MessageExtractor {
            message: "created empty target".to_string(),
            fields: vec!["path=a/b".to_string()],
        };
        assert_eq!(extractor.line(), "created empty target (path=a/b)");
    }
}
