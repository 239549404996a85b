use std::str::FromStr;

use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    Layer, filter::FilterFn, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Emits an event inside a span that names the operation producing it.
///
/// Span fields record the state the operation worked on:
///
/// ```ignore
/// log!(Level::DEBUG, "build" { recipients = 3 }, "Built message");
/// ```
#[macro_export]
macro_rules! log {
    ($level:expr, $span:literal { $($field:ident = $value:expr),* $(,)? }, $($msg:expr),+) => {{
        let span = $crate::tracing::span!(target: "missive", $level, $span $(, $field = $value)*);
        let _enter = span.enter();

        $crate::tracing::event!(target: "missive", $level, $($msg),+)
    }};
}

/// Crate-internal logging, `TRACE` unless a level is given.
///
/// Without a span the event lands in a span named `missive`.
#[macro_export]
macro_rules! internal {
    (level = $level:ident, span = $span:literal { $($fields:tt)* }, $($msg:expr),+) => {
        $crate::log!($crate::tracing::Level::$level, $span { $($fields)* }, $($msg),+)
    };

    (level = $level:ident, span = $span:literal, $($msg:expr),+) => {
        $crate::log!($crate::tracing::Level::$level, $span {}, $($msg),+)
    };

    (level = $level:ident, $($msg:expr),+) => {
        $crate::log!($crate::tracing::Level::$level, "missive" {}, $($msg),+)
    };

    ($($msg:expr),+) => {
        $crate::internal!(level = TRACE, $($msg),+)
    };
}

/// Installs the global subscriber.
///
/// The level comes from `LOG_LEVEL`, falling back to `TRACE` in debug builds
/// and `INFO` otherwise. Only events targeting this crate are emitted.
pub fn init() {
    let default = if cfg!(debug_assertions) {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    let level = std::env::var("LOG_LEVEL").map_or(default, |level| {
        LevelFilter::from_str(level.as_str()).unwrap_or_else(|_| {
            eprintln!("Invalid log level specified {level}, defaulting to {default}");
            default
        })
    });

    tracing_subscriber::Registry::default()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_file(false)
                .with_line_number(false)
                .compact()
                .with_ansi(true)
                .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
                .with_filter(level)
                .with_filter(FilterFn::new(|metadata| {
                    metadata.target().starts_with("missive")
                })),
        )
        .init();
}
