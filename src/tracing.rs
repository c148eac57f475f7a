//! Simulation aware log output.
//!
//! The runtime wraps every dispatched event in a span named `sim`
//! that carries the current simulation time. [`SimFormat`] prints
//! that time in front of each message instead of the wall clock.

use nu_ansi_term::{Color, Style};
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    filter::Directive,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

/// The log level that will be used if `RUST_LOG` is not defined.
pub const FALLBACK_LOG_LEVEL: Level = Level::INFO;

/// The name of the span entered around each event.
pub const SIM_SPAN: &str = "sim";

/// Create a new tracing subscriber with a sim formatter.
///
/// # Panics
///
/// Panics when subscriber initilization fails.
pub fn init() {
    try_init().expect("failed to install the tracing subscriber");
}

/// Like [`init`], but fails if a global subscriber is already set.
///
/// # Errors
///
/// Returns an error if a global default subscriber was already installed.
pub fn try_init() -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::fmt()
        .event_format(SimFormat::new())
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(Directive::from(FALLBACK_LOG_LEVEL))
                .from_env_lossy(),
        )
        .finish()
        .try_init()
}

/// A formatter that includes simulation specific information into the tracing messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimFormat;

impl SimFormat {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

macro_rules! maybe_ansi {
    ($style:ident, $ansi:ident, $writer:ident: $($t:tt)*) => {
        MaybeAnsi(format!($($t)*), $style, $ansi).write(&mut $writer)
    };
}

impl<S, N> FormatEvent<S, N> for SimFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        let ansi = writer.has_ansi_escapes();

        let dimmed = Style::new().dimmed();
        let bold = Style::new().bold();

        // the innermost sim span holds the current time
        let time = ctx.event_scope().and_then(|scope| {
            scope
                .filter(|span| span.metadata().name() == SIM_SPAN)
                .find_map(|span| {
                    let ext = span.extensions();
                    let fields = ext.get::<FormattedFields<N>>()?;
                    let time = fields.fields.trim_start_matches("t=").to_string();
                    Some(time)
                })
        });
        match time {
            Some(time) => maybe_ansi!(dimmed, ansi, writer: "[ {time} ] ")?,
            None => maybe_ansi!(dimmed, ansi, writer: "[ setup ] ")?,
        }

        let style = match *meta.level() {
            Level::TRACE => Style::new().fg(Color::Cyan),
            Level::DEBUG => Style::new().fg(Color::Purple),
            Level::INFO => Style::new().fg(Color::Green),
            Level::WARN => Style::new().fg(Color::Yellow),
            Level::ERROR => Style::new().fg(Color::Red),
        };
        maybe_ansi!(style, ansi, writer: "{} ", meta.level().as_str())?;

        if let Some(scope) = ctx.event_scope() {
            let mut seen = false;
            for span in scope
                .from_root()
                .filter(|span| span.metadata().name() != SIM_SPAN)
            {
                maybe_ansi!(bold, ansi, writer: "{}", span.metadata().name())?;
                seen = true;
                let ext = span.extensions();
                if let Some(fields) = &ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        maybe_ansi!(bold, ansi, writer: "{{")?;
                        write!(writer, "{fields}")?;
                        maybe_ansi!(bold, ansi, writer: "}}")?;
                    }
                }
                maybe_ansi!(dimmed, ansi, writer: ":")?;
            }

            if seen {
                writer.write_char(' ')?;
            }
        }

        maybe_ansi!(dimmed, ansi, writer: "{}: ", meta.target())?;

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

struct MaybeAnsi(String, Style, bool);

impl MaybeAnsi {
    fn write(self, writer: &mut Writer<'_>) -> std::fmt::Result {
        if self.2 {
            write!(writer, "{}", self.1.prefix())?;
            write!(writer, "{}", self.0)?;
            write!(writer, "{}", self.1.suffix())
        } else {
            write!(writer, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        io,
        sync::{Arc, Mutex},
    };
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Buffer {
        type Writer = Buffer;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn prefixes_simulation_time() {
        let buffer = Buffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .event_format(SimFormat::new())
            .with_writer(buffer.clone())
            .with_max_level(Level::TRACE)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("before");
            let _guard = tracing::trace_span!("sim", t = %crate::time::SimTime::from(2.5)).entered();
            let _inner = tracing::debug_span!("station", name = "desk").entered();
            tracing::debug!(entity = 3, "served");
        });

        let output = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("[ setup ] INFO "), "{}", lines[0]);
        assert!(lines[1].starts_with("[ 2.5s ] DEBUG station{"), "{}", lines[1]);
        assert!(lines[1].ends_with("served entity=3"), "{}", lines[1]);
    }
}
