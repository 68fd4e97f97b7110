// Copyright (c) The suitetree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Log output for hosts embedding suitetree.
//!
//! suitetree reports its decisions (dropped requests, faults, run summaries) through `tracing`.
//! [`Color::init_logging`] installs a subscriber that prints those events to stderr.

use crate::errors::LogInitError;
use owo_colors::{OwoColorize, Style, style};
use std::{fmt, sync::Once};
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
    level_filters::LevelFilter,
};
use tracing_subscriber::{
    Layer,
    filter::Targets,
    fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter, format},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

/// The environment variable read to configure log levels, in `Targets` syntax.
///
/// For example, `SUITETREE_LOG=suitetree_runner=debug`. Defaults to `info`.
pub const LOG_ENV: &str = "SUITETREE_LOG";

/// Target for log events printed without a level prefix.
pub const NO_HEADING_TARGET: &str = "suitetree_runner::no_heading";

/// Whether to produce colored output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub enum Color {
    /// Colorize if stderr supports it.
    #[default]
    Auto,
    /// Always colorize.
    Always,
    /// Never colorize.
    Never,
}

static INIT_LOGGER: Once = Once::new();

impl Color {
    /// Installs the global log subscriber.
    ///
    /// Only the first call in a process has any effect; later calls return `Ok(())`.
    pub fn init_logging(self) -> Result<(), LogInitError> {
        let mut result = Ok(());
        INIT_LOGGER.call_once(|| {
            result = self.install(std::io::stderr);
        });
        result
    }

    /// Returns true if output to `stream` should be colorized.
    pub fn should_colorize(self, stream: supports_color::Stream) -> bool {
        match self {
            Color::Auto => supports_color::on_cached(stream).is_some(),
            Color::Always => true,
            Color::Never => false,
        }
    }

    fn install<W>(self, writer: W) -> Result<(), LogInitError>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let targets = targets_from_env()?;
        tracing_subscriber::registry()
            .with(self.layer(writer).with_filter(targets))
            .try_init()
            .map_err(LogInitError::AlreadyInstalled)
    }

    fn layer<S, W>(self, writer: W) -> impl Layer<S>
    where
        S: Subscriber + for<'a> LookupSpan<'a>,
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let mut styles = LogStyles::default();
        if self.should_colorize(supports_color::Stream::Stderr) {
            styles.colorize();
        }
        tracing_subscriber::fmt::layer()
            .event_format(SimpleFormatter { styles })
            .with_writer(writer)
    }
}

fn targets_from_env() -> Result<Targets, LogInitError> {
    let Some(value) = std::env::var_os(LOG_ENV) else {
        return Ok(Targets::new().with_default(LevelFilter::INFO));
    };
    let value = value
        .into_string()
        .map_err(|_| LogInitError::NotUnicode { var: LOG_ENV })?;
    if value.is_empty() {
        return Ok(Targets::new().with_default(LevelFilter::INFO));
    }
    value
        .parse()
        .map_err(|error| LogInitError::InvalidTargets {
            var: LOG_ENV,
            value,
            error,
        })
}

struct SimpleFormatter {
    styles: LogStyles,
}

impl<S, N> FormatEvent<S, N> for SimpleFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        if metadata.target() != NO_HEADING_TARGET {
            let (label, style) = match *metadata.level() {
                Level::ERROR => ("error", self.styles.error),
                Level::WARN => ("warning", self.styles.warning),
                Level::INFO => ("info", self.styles.info),
                Level::DEBUG => ("debug", self.styles.debug),
                Level::TRACE => ("trace", self.styles.trace),
            };
            write!(writer, "{}: ", label.style(style))?;
        }

        let mut visitor = MessageVisitor {
            writer: &mut writer,
            error: None,
        };
        event.record(&mut visitor);
        if let Some(error) = visitor.error {
            return Err(error);
        }

        writeln!(writer)
    }
}

static MESSAGE_FIELD: &str = "message";

struct MessageVisitor<'writer, 'a> {
    writer: &'a mut format::Writer<'writer>,
    error: Option<fmt::Error>,
}

impl Visit for MessageVisitor<'_, '_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == MESSAGE_FIELD
            && let Err(error) = write!(self.writer, "{value:?}")
        {
            self.error = Some(error);
        }
    }
}

#[derive(Debug, Default)]
struct LogStyles {
    error: Style,
    warning: Style,
    info: Style,
    debug: Style,
    trace: Style,
}

impl LogStyles {
    fn colorize(&mut self) {
        self.error = style().red().bold();
        self.warning = style().yellow().bold();
        self.info = style().bold();
        self.debug = style().bold();
        self.trace = style().dimmed();
    }
}
