/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::io::{self, IsTerminal, Write};
use std::sync::Arc;

use anstyle::{AnsiColor, Style};
use chrono::Local;
use chrono::format::Numeric::*;
use chrono::format::{Fixed, Item, Pad};
use flume::Receiver;
use slog::Level;

mod async_log;
pub use async_log::{AsyncLogConfig, AsyncLogFormatter, AsyncLogger, LogSnapshot, LogStats};
use async_log::LogDrop;

mod format;
pub use format::StdLogFormatter;

const LOCAL_TIME_FORMAT: &[Item<'static>] = &[
    Item::Numeric(Year, Pad::Zero),
    Item::Literal("-"),
    Item::Numeric(Month, Pad::Zero),
    Item::Literal("-"),
    Item::Numeric(Day, Pad::Zero),
    Item::Literal(" "),
    Item::Numeric(Hour, Pad::Zero),
    Item::Literal(":"),
    Item::Numeric(Minute, Pad::Zero),
    Item::Literal(":"),
    Item::Numeric(Second, Pad::Zero),
    Item::Fixed(Fixed::Nanosecond6),
];

pub struct StdLogValue {
    level: Level,
    message: String,
    kv_pairs: Vec<(String, String)>,
    location: Option<String>,
}

/// Styles of the parts of a log line, all empty for plain output.
#[derive(Default)]
struct LineStyle {
    colored: bool,
    key: Style,
    message: Style,
    location: Style,
}

impl LineStyle {
    fn console() -> Self {
        LineStyle {
            colored: true,
            key: Style::new().bold(),
            message: Style::new().bold(),
            location: Style::new().italic(),
        }
    }

    fn level(&self, level: Level) -> Style {
        if !self.colored {
            return Style::new();
        }
        let color = match level {
            Level::Critical => AnsiColor::Magenta,
            Level::Error => AnsiColor::Red,
            Level::Warning => AnsiColor::Yellow,
            Level::Info => AnsiColor::Green,
            Level::Debug => AnsiColor::Cyan,
            Level::Trace => AnsiColor::Blue,
        };
        Style::new().fg_color(Some(color.into()))
    }

    fn write_line<IO: Write>(&self, io: &mut IO, v: StdLogValue) -> io::Result<()> {
        let time = Local::now().format_with_items(LOCAL_TIME_FORMAT.iter());
        let level = self.level(v.level);
        write!(io, "{time} {level}{}{level:#}", v.level)?;

        let key = self.key;
        for (k, v) in &v.kv_pairs {
            if self.colored {
                write!(io, " {key}{k}{key:#}={v},")?;
            } else {
                write!(io, " {k}: {v},")?;
            }
        }

        let message = if v.message.is_empty() {
            "()"
        } else {
            v.message.as_str()
        };
        let style = self.message;
        write!(io, " {style}{message}{style:#}")?;

        if let Some(location) = &v.location {
            let style = self.location;
            write!(io, " <{style}{location}{style:#}>")?;
        }
        writeln!(io)
    }
}

/// Create a slog drain writing to stderr, or stdout if `use_stdout` is set.
///
/// Colored output is used when the target is a terminal.
pub fn new_async_logger(
    async_conf: &AsyncLogConfig,
    append_code_position: bool,
    use_stdout: bool,
) -> AsyncLogger<StdLogValue, StdLogFormatter> {
    let (sender, receiver) = flume::bounded::<StdLogValue>(async_conf.channel_capacity);
    let stats = Arc::new(LogStats::default());

    let io_thread = AsyncIoThread {
        receiver,
        stats: stats.clone(),
    };
    let _detached_thread = std::thread::Builder::new()
        .name(async_conf.thread_name.clone())
        .spawn(move || {
            if use_stdout {
                let stdout = io::stdout();
                let style = line_style(stdout.is_terminal());
                io_thread.run(stdout, &style);
            } else {
                let stderr = io::stderr();
                let style = line_style(stderr.is_terminal());
                io_thread.run(stderr, &style);
            }
        });

    AsyncLogger::new(sender, StdLogFormatter::new(append_code_position), stats)
}

fn line_style(is_terminal: bool) -> LineStyle {
    if is_terminal {
        LineStyle::console()
    } else {
        LineStyle::default()
    }
}

struct AsyncIoThread {
    receiver: Receiver<StdLogValue>,
    stats: Arc<LogStats>,
}

impl AsyncIoThread {
    /// Write lines until all senders are gone, flushing after each burst.
    fn run<IO: Write>(&self, mut io: IO, style: &LineStyle) {
        let mut buf: Vec<u8> = Vec::with_capacity(1024);
        while let Ok(v) = self.receiver.recv() {
            self.write_value(&mut io, &mut buf, style, v);
            for v in self.receiver.drain() {
                self.write_value(&mut io, &mut buf, style, v);
            }
            let _ = io.flush();
        }
    }

    fn write_value<IO: Write>(
        &self,
        io: &mut IO,
        buf: &mut Vec<u8>,
        style: &LineStyle,
        v: StdLogValue,
    ) {
        buf.clear();
        if style.write_line(buf, v).is_err() {
            return;
        }
        match io.write_all(buf) {
            Ok(_) => self.stats.add_passed(buf.len()),
            Err(_) => self.stats.add_dropped(LogDrop::PeerUnreachable),
        }
    }
}
