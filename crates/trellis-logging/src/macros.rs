//! ---
//! trellis_section: "03-persistence-logging"
//! trellis_subsection: "module"
//! trellis_type: "source"
//! trellis_scope: "code"
//! trellis_description: "Structured logging adapters and sinks."
//! trellis_version: "v0.0.0-prealpha"
//! trellis_owner: "tbd"
//! ---

/// Emit an informational log enriched with management-node context.
#[macro_export]
macro_rules! trellis_info {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::INFO,
            node = ctx.node.unwrap_or(""),
            mode = ctx.mode.unwrap_or(""),
            iteration = ctx.iteration.unwrap_or_default(),
            phase = ctx.phase.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::INFO,
            node = ctx.node.unwrap_or(""),
            mode = ctx.mode.unwrap_or(""),
            iteration = ctx.iteration.unwrap_or_default(),
            phase = ctx.phase.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a debug log enriched with management-node context.
#[macro_export]
macro_rules! trellis_debug {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::DEBUG,
            node = ctx.node.unwrap_or(""),
            mode = ctx.mode.unwrap_or(""),
            iteration = ctx.iteration.unwrap_or_default(),
            phase = ctx.phase.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::DEBUG,
            node = ctx.node.unwrap_or(""),
            mode = ctx.mode.unwrap_or(""),
            iteration = ctx.iteration.unwrap_or_default(),
            phase = ctx.phase.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a trace log enriched with management-node context.
#[macro_export]
macro_rules! trellis_trace {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::TRACE,
            node = ctx.node.unwrap_or(""),
            mode = ctx.mode.unwrap_or(""),
            iteration = ctx.iteration.unwrap_or_default(),
            phase = ctx.phase.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::TRACE,
            node = ctx.node.unwrap_or(""),
            mode = ctx.mode.unwrap_or(""),
            iteration = ctx.iteration.unwrap_or_default(),
            phase = ctx.phase.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit a warning log enriched with management-node context.
#[macro_export]
macro_rules! trellis_warn {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::WARN,
            node = ctx.node.unwrap_or(""),
            mode = ctx.mode.unwrap_or(""),
            iteration = ctx.iteration.unwrap_or_default(),
            phase = ctx.phase.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::WARN,
            node = ctx.node.unwrap_or(""),
            mode = ctx.mode.unwrap_or(""),
            iteration = ctx.iteration.unwrap_or_default(),
            phase = ctx.phase.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}

/// Emit an error log enriched with management-node context.
#[macro_export]
macro_rules! trellis_error {
    (context = $ctx:expr, $($arg:tt)+) => {{
        let ctx = &$ctx;
        tracing::event!(
            tracing::Level::ERROR,
            node = ctx.node.unwrap_or(""),
            mode = ctx.mode.unwrap_or(""),
            iteration = ctx.iteration.unwrap_or_default(),
            phase = ctx.phase.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
    ($($arg:tt)+) => {{
        let ctx = &$crate::LogContext::default();
        tracing::event!(
            tracing::Level::ERROR,
            node = ctx.node.unwrap_or(""),
            mode = ctx.mode.unwrap_or(""),
            iteration = ctx.iteration.unwrap_or_default(),
            phase = ctx.phase.unwrap_or_default(),
            message = %format_args!($($arg)+)
        );
    }};
}
