#![forbid(unsafe_code)]

//! Stderr tracing of renderer activity, selected by environment variable.
//!
//! `RTREE_DEBUG_TRACE` names the topics to print, comma separated:
//!
//! ```bash
//! RTREE_DEBUG_TRACE=pass,rollback cargo test -p rtree-runtime
//! RTREE_DEBUG_TRACE=all cargo test -p rtree-runtime   # also `1` or `true`
//! ```
//!
//! Topics are read once. With nothing selected, a call site is a single
//! flag test against a static.
//!
//! ```ignore
//! debug_trace!(PASS, "root={} edits={}", root, edits);
//! ```

use std::sync::LazyLock;
use std::time::Instant;

use bitflags::bitflags;

bitflags! {
    /// Renderer activity that can be traced.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TraceTopics: u8 {
        /// One line per finished render pass.
        const PASS     = 0b0001;
        /// Event dispatch to a component.
        const DISPATCH = 0b0010;
        /// Aborted passes and the state they restore.
        const ROLLBACK = 0b0100;
        /// Component disposal.
        const DISPOSE  = 0b1000;
    }
}

/// Parse a topic list such as `"pass,dispose"`.
///
/// `1`, `true` and `all` select everything. Unknown names are skipped.
pub fn parse_topics(value: &str) -> TraceTopics {
    let value = value.trim();
    if value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("all") {
        return TraceTopics::all();
    }
    value
        .split(',')
        .filter_map(|name| TraceTopics::from_name(&name.trim().to_ascii_uppercase()))
        .collect()
}

static TOPICS: LazyLock<TraceTopics> = LazyLock::new(|| {
    std::env::var("RTREE_DEBUG_TRACE")
        .map(|v| parse_topics(&v))
        .unwrap_or_default()
});

static START_TIME: LazyLock<Instant> = LazyLock::new(Instant::now);

/// Whether `topic` was selected.
#[inline]
pub fn enabled(topic: TraceTopics) -> bool {
    TOPICS.intersects(topic)
}

/// Milliseconds since the first trace call.
#[inline]
pub fn elapsed_ms() -> u64 {
    START_TIME.elapsed().as_millis() as u64
}

/// Print a timestamped message for `topic` to stderr when it is selected.
#[macro_export]
macro_rules! debug_trace {
    ($topic:ident, $($arg:tt)*) => {
        if $crate::debug_trace::enabled($crate::debug_trace::TraceTopics::$topic) {
            eprintln!(
                "[RTREE {:>8}ms {:<8}] {}",
                $crate::debug_trace::elapsed_ms(),
                stringify!($topic),
                format_args!($($arg)*)
            );
        }
    };
}
