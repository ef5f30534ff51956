//! Line framing for the record stream on stdout
//!
//! Text lines are `<code>|<payload>`:
//! ```text
//! 1|/home/me/project/src/new.rs
//! 2|/home/me/project/build
//! 3|watch on /home/me/project dropped events, a rescan is needed
//! ```
//! JSON lines carry the same data as `{"type":1,"path":"..."}` or
//! `{"type":3,"message":"..."}`.

use clap::ValueEnum;
use serde::Serialize;
use std::borrow::Cow;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use treewatch_core::{Record, Sink};

/// Output framing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    /// `<code>|<payload>` per line
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Serialize)]
struct WireRecord<'a> {
    #[serde(rename = "type")]
    code: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'a str>,
}

/// Render one record as a single line, without the trailing newline
pub fn frame(record: &Record, format: Format) -> String {
    match format {
        Format::Text => {
            let payload = match record {
                Record::Event(event) => event.path.to_string_lossy(),
                Record::Log(message) => Cow::Borrowed(message.as_str()),
            };
            // One record per line, whatever the payload holds
            let payload = payload.replace(['\r', '\n'], " ");
            format!("{}|{}", record.code(), payload)
        }
        Format::Json => {
            let wire = match record {
                Record::Event(event) => WireRecord {
                    code: record.code(),
                    path: Some(event.path.to_string_lossy()),
                    message: None,
                },
                Record::Log(message) => WireRecord {
                    code: record.code(),
                    path: None,
                    message: Some(message),
                },
            };
            // Only strings and integers: serialization cannot fail
            serde_json::to_string(&wire).unwrap_or_default()
        }
    }
}

/// Sink that hands records to the stdout writer task
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Record>,
}

impl Sink for ChannelSink {
    fn deliver(&self, record: Record) {
        // Writer gone means we are shutting down
        let _ = self.tx.send(record);
    }
}

pub fn channel() -> (ChannelSink, mpsc::UnboundedReceiver<Record>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelSink { tx }, rx)
}

/// Write records to `out` until every sender is dropped
///
/// Flushes once per burst of ready records rather than per line.
pub async fn write_records<W>(
    mut rx: mpsc::UnboundedReceiver<Record>,
    mut out: W,
    format: Format,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(record) = rx.recv().await {
        let mut buf = String::new();
        push_line(&mut buf, &record, format);
        while let Ok(record) = rx.try_recv() {
            push_line(&mut buf, &record, format);
        }
        out.write_all(buf.as_bytes()).await?;
        out.flush().await?;
    }
    Ok(())
}

fn push_line(buf: &mut String, record: &Record, format: Format) {
    buf.push_str(&frame(record, format));
    buf.push('\n');
}
