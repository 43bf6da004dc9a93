use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Map the `--verbosity` flag onto a level: -1 silent, 0 normal, 1 debug.
pub fn verbosity_filter(verbosity: i8) -> LevelFilter {
    match verbosity {
        i8::MIN..=-1 => LevelFilter::OFF,
        0 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    }
}

/// Terminates the process on the first error-level event.
///
/// Installed after the fmt layer so the error line is written before the
/// exit. In-flight workers are not joined.
pub struct StopOnError;

impl<S: Subscriber> Layer<S> for StopOnError {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::ERROR {
            eprintln!("The --exit option is enabled, exiting.");
            std::process::exit(1);
        }
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `verbosity`; the stop-on-error layer sees every event regardless.
pub fn init(verbosity: i8, stop_on_error: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_filter(verbosity).into())
        .from_env_lossy();

    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(fmt)
        .with(stop_on_error.then_some(StopOnError))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_filter() {
        assert_eq!(verbosity_filter(-1), LevelFilter::OFF);
        assert_eq!(verbosity_filter(0), LevelFilter::INFO);
        assert_eq!(verbosity_filter(1), LevelFilter::DEBUG);
    }
}
