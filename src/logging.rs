//! Global tracing setup. Formatted lines can be mirrored to an in-page log viewer.

use std::io::Write;
use std::str::FromStr;

use tokio::sync::broadcast;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::MakeWriter;

use crate::core::config::LogConfig;

/// Fan-out of formatted log lines. Hosts subscribe to feed a log panel.
#[derive(Clone, Debug)]
pub struct LogMirror {
    lines: broadcast::Sender<String>,
}

impl LogMirror {
    pub fn new(capacity: usize) -> Self {
        let (lines, _) = broadcast::channel(capacity.max(1));
        Self { lines }
    }

    /// Lines logged after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.lines.subscribe()
    }

    fn publish(&self, buf: &[u8]) {
        for line in String::from_utf8_lossy(buf).lines() {
            let line = line.trim_end();
            if !line.is_empty() {
                // No viewer attached is fine.
                let _ = self.lines.send(line.to_string());
            }
        }
    }
}

/// Hands the fmt layer one writer per event, each feeding the mirror and optionally stdout.
#[derive(Clone)]
struct MirrorMakeWriter {
    mirror: LogMirror,
    stdout: bool,
}

impl<'a> MakeWriter<'a> for MirrorMakeWriter {
    type Writer = EventWriter;

    fn make_writer(&'a self) -> Self::Writer {
        EventWriter {
            mirror: self.mirror.clone(),
            stdout: self.stdout,
            buf: Vec::new(),
        }
    }
}

/// Collects one event and publishes it whole when dropped.
struct EventWriter {
    mirror: LogMirror,
    stdout: bool,
    buf: Vec<u8>,
}

impl Write for EventWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(buf);
        if self.stdout {
            std::io::stdout().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if self.stdout {
            std::io::stdout().flush()?;
        }
        Ok(())
    }
}

impl Drop for EventWriter {
    fn drop(&mut self) {
        if !self.buf.is_empty() {
            self.mirror.publish(&self.buf);
        }
    }
}

/// `trace|debug|info|warn|error`, case-insensitive. Anything else is `info`.
pub fn parse_level(level: &str) -> Level {
    Level::from_str(level.trim()).unwrap_or(Level::INFO)
}

/// Installs the global subscriber described by `[logging]` and returns its mirror.
///
/// Only the first install in a process takes effect; later mirrors stay silent.
pub fn init(config: &LogConfig) -> LogMirror {
    let mirror = LogMirror::new(config.mirror_capacity);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(&config.level))
        .with_writer(MirrorMakeWriter {
            mirror: mirror.clone(),
            stdout: config.stdout,
        })
        .with_ansi(false)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Tracing subscriber already installed; log mirror inactive");
    }
    mirror
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer(mirror: &LogMirror) -> EventWriter {
        MirrorMakeWriter {
            mirror: mirror.clone(),
            stdout: false,
        }
        .make_writer()
    }

    #[test]
    fn event_is_published_once_as_lines() {
        let mirror = LogMirror::new(8);
        let mut rx = mirror.subscribe();
        {
            let mut w = writer(&mirror);
            w.write_all(b"INFO flowdash: loaded ").unwrap();
            w.write_all(b"runs\n").unwrap();
            assert!(rx.try_recv().is_err());
        }
        assert_eq!(rx.try_recv().unwrap(), "INFO flowdash: loaded runs");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn multi_line_events_split_and_blank_lines_dropped() {
        let mirror = LogMirror::new(8);
        let mut rx = mirror.subscribe();
        mirror.publish(b"first\n\nsecond  \n");
        assert_eq!(rx.try_recv().unwrap(), "first");
        assert_eq!(rx.try_recv().unwrap(), "second");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn writing_without_viewer_succeeds() {
        let mirror = LogMirror::new(1);
        let mut w = writer(&mirror);
        assert_eq!(w.write(b"nobody listens").unwrap(), 14);
    }

    #[test]
    fn levels_parse_leniently() {
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level(" warn "), Level::WARN);
        assert_eq!(parse_level("loud"), Level::INFO);
    }
}
