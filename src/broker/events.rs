use reqwest::Response;

use super::error::BrokerError;
use super::types::{EventData, StreamEvent};

/// Incremental parser for the broker's event-stream grammar.
///
/// Fed one line at a time; emits an event when a blank line closes at least
/// one buffered `data:` line. Pure state machine, no I/O.
#[derive(Default)]
struct EventParser {
    event_type: Option<String>,
    data_lines: Vec<String>,
}

impl EventParser {
    fn feed(&mut self, line: &str) -> Option<StreamEvent> {
        if line.is_empty() {
            return self.flush();
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(value) = strip_prefix_ignore_case(line, "event:") {
            self.event_type = Some(value.trim().to_string());
        } else if let Some(value) = strip_prefix_ignore_case(line, "data:") {
            // Exactly one leading space is part of the field syntax.
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.data_lines.push(value.to_string());
        }
        None
    }

    fn flush(&mut self) -> Option<StreamEvent> {
        let event_type = self.event_type.take();
        if self.data_lines.is_empty() {
            return None;
        }
        let raw = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(StreamEvent {
            event_type: event_type.unwrap_or_else(|| "message".to_string()),
            data: parse_data(&raw),
        })
    }
}

// Malformed or non-object data never kills the stream; the verbatim text is
// kept under a "raw" key instead.
fn parse_data(raw: &str) -> EventData {
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => {
            let mut map = EventData::new();
            map.insert(
                "raw".to_string(),
                serde_json::Value::String(raw.to_string()),
            );
            map
        }
    }
}

fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let n = prefix.len();
    if line.len() >= n && line.as_bytes()[..n].eq_ignore_ascii_case(prefix.as_bytes()) {
        Some(&line[n..])
    } else {
        None
    }
}

/// Lazy reader over a job's live event stream.
///
/// Events are parsed on demand from the open HTTP response; nothing is
/// buffered beyond the current chunk. Dropping the stream closes the
/// connection, which is how a caller abandons a job mid-flight.
pub struct EventStream {
    response: Response,
    buffer: Vec<u8>,
    parser: EventParser,
    done: bool,
}

impl EventStream {
    pub(crate) fn new(response: Response) -> Self {
        Self {
            response,
            buffer: Vec::new(),
            parser: EventParser::default(),
            done: false,
        }
    }

    /// The next event, or `Ok(None)` once the broker closes the stream.
    ///
    /// A transport failure mid-read surfaces as
    /// [`Network`](BrokerError::Network); the parser itself never fails.
    pub async fn next_event(&mut self) -> Result<Option<StreamEvent>, BrokerError> {
        loop {
            while let Some(line) = self.take_line() {
                if let Some(event) = self.parser.feed(&line) {
                    return Ok(Some(event));
                }
            }
            if self.done {
                return Ok(None);
            }
            match self.response.chunk().await? {
                Some(chunk) => self.buffer.extend_from_slice(&chunk),
                None => {
                    // A partial line or unterminated event at end of stream
                    // is discarded.
                    self.done = true;
                    return Ok(None);
                }
            }
        }
    }

    // Pop one complete line off the buffer, tolerating a trailing '\r'.
    fn take_line(&mut self) -> Option<String> {
        let pos = self.buffer.iter().position(|&b| b == b'\n')?;
        let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Some(String::from_utf8_lossy(&line).into_owned())
    }
}
