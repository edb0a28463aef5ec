use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;

use super::DecodedFrame;
use super::event::StreamEvent;

const DEFAULT_EVENT_KIND: &str = "message";

/// Counters for frames the decoder dropped instead of yielding. Dropping is
/// deliberate (one bad line must never end the turn) but has to stay
/// observable, so the transport hands these out alongside the event channel.
#[derive(Debug, Default)]
pub struct StreamDiagnostics {
    malformed_frames: AtomicU64,
    unknown_kinds: AtomicU64,
    invalid_payloads: AtomicU64,
}

impl StreamDiagnostics {
    pub fn malformed_frames(&self) -> u64 {
        self.malformed_frames.load(Ordering::Relaxed)
    }

    pub fn unknown_kinds(&self) -> u64 {
        self.unknown_kinds.load(Ordering::Relaxed)
    }

    pub fn invalid_payloads(&self) -> u64 {
        self.invalid_payloads.load(Ordering::Relaxed)
    }

    pub fn total_dropped(&self) -> u64 {
        self.malformed_frames() + self.unknown_kinds() + self.invalid_payloads()
    }

    fn note_malformed(&self) {
        self.malformed_frames.fetch_add(1, Ordering::Relaxed);
    }

    fn note_unknown_kind(&self) {
        self.unknown_kinds.fetch_add(1, Ordering::Relaxed);
    }

    fn note_invalid_payload(&self) {
        self.invalid_payloads.fetch_add(1, Ordering::Relaxed);
    }
}

/// Incremental decoder for the `event:`/`data:` line protocol.
///
/// Feed it byte chunks exactly as they arrive off the socket; chunk
/// boundaries carry no meaning. Bytes after the final `\n` of the stream are
/// never flushed, so a truncated last line is dropped rather than guessed at.
pub struct FrameDecoder {
    pending: Vec<u8>,
    current_kind: String,
    diagnostics: Arc<StreamDiagnostics>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_diagnostics(Arc::new(StreamDiagnostics::default()))
    }

    pub fn with_diagnostics(diagnostics: Arc<StreamDiagnostics>) -> Self {
        Self {
            pending: Vec::new(),
            current_kind: DEFAULT_EVENT_KIND.to_string(),
            diagnostics,
        }
    }

    pub fn diagnostics(&self) -> Arc<StreamDiagnostics> {
        Arc::clone(&self.diagnostics)
    }

    /// Consume one chunk, yielding every event it completes, in order.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.pending.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line[..newline]);
            self.handle_line(line.trim(), &mut events);
        }
        events
    }

    fn handle_line(&mut self, line: &str, events: &mut Vec<StreamEvent>) {
        if line.is_empty() {
            // Blank line is the dispatch boundary; the named event resets.
            self.current_kind = DEFAULT_EVENT_KIND.to_string();
            return;
        }

        if let Some(name) = line.strip_prefix("event:") {
            self.current_kind = name.trim().to_string();
            return;
        }

        let Some(data) = line.strip_prefix("data:") else {
            // Comment lines, `id:`, `retry:` and the like carry no payload.
            return;
        };

        let value: Value = match serde_json::from_str(data.trim_start()) {
            Ok(value) => value,
            Err(_) => {
                self.diagnostics.note_malformed();
                return;
            }
        };
        if !value.is_object() {
            self.diagnostics.note_malformed();
            return;
        }

        // The payload may name its own kind; a `data:`-only stream has no
        // `event:` lines at all.
        let kind = value
            .get("event")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| self.current_kind.clone());

        match StreamEvent::from_wire(&kind, value) {
            DecodedFrame::Event(event) => events.push(event),
            DecodedFrame::UnknownKind => self.diagnostics.note_unknown_kind(),
            DecodedFrame::InvalidPayload => self.diagnostics.note_invalid_payload(),
        }
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::event::{StreamEvent, TokenPayload};

    fn decode_all(input: &[u8]) -> Vec<StreamEvent> {
        let mut decoder = FrameDecoder::new();
        decoder.push_bytes(input)
    }

    fn token(content: &str) -> StreamEvent {
        StreamEvent::Token(TokenPayload {
            content: content.to_string(),
        })
    }

    const SAMPLE: &[u8] = b"event: token\n\
data: {\"content\":\"Hel\"}\n\
\n\
event: token\n\
data: {\"content\":\"lo\"}\n\
\n\
event: done\n\
data: {\"message\":{\"role\":\"assistant\",\"content\":\"Hello\"}}\n\
\n";

    #[test]
    fn decodes_a_full_stream_in_one_chunk() {
        let events = decode_all(SAMPLE);

        assert_eq!(events.len(), 3);
        assert_eq!(events[0], token("Hel"));
        assert_eq!(events[1], token("lo"));
        assert!(matches!(&events[2], StreamEvent::Done(done)
            if done.fallback_text() == Some("Hello")));
    }

    #[test]
    fn chunk_boundaries_do_not_change_the_event_sequence() {
        let expected = decode_all(SAMPLE);

        for split in 0..=SAMPLE.len() {
            let mut decoder = FrameDecoder::new();
            let mut events = decoder.push_bytes(&SAMPLE[..split]);
            events.extend(decoder.push_bytes(&SAMPLE[split..]));
            assert_eq!(events, expected, "split at byte {}", split);
        }
    }

    #[test]
    fn byte_at_a_time_delivery_matches_whole_chunk() {
        let expected = decode_all(SAMPLE);

        let mut decoder = FrameDecoder::new();
        let mut events = Vec::new();
        for byte in SAMPLE {
            events.extend(decoder.push_bytes(&[*byte]));
        }
        assert_eq!(events, expected);
    }

    #[test]
    fn multibyte_content_survives_a_mid_character_split() {
        let frame = "event: token\ndata: {\"content\":\"héllo\"}\n\n".as_bytes();
        let expected = decode_all(frame);
        assert_eq!(expected, vec![token("héllo")]);

        for split in 0..=frame.len() {
            let mut decoder = FrameDecoder::new();
            let mut events = decoder.push_bytes(&frame[..split]);
            events.extend(decoder.push_bytes(&frame[split..]));
            assert_eq!(events, expected, "split at byte {}", split);
        }
    }

    #[test]
    fn malformed_json_is_dropped_and_counted() {
        let input = b"event: token\n\
data: {\"content\":\"a\"}\n\
\n\
event: token\n\
data: {\"content\":\"oops\n\
\n\
event: token\n\
data: {\"content\":\"b\"}\n\
\n";
        let mut decoder = FrameDecoder::new();
        let events = decoder.push_bytes(input);

        assert_eq!(events, vec![token("a"), token("b")]);
        assert_eq!(decoder.diagnostics().malformed_frames(), 1);
    }

    #[test]
    fn non_object_data_counts_as_malformed() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push_bytes(b"event: token\ndata: \"just a string\"\n\n");

        assert!(events.is_empty());
        assert_eq!(decoder.diagnostics().malformed_frames(), 1);
    }

    #[test]
    fn unknown_event_kinds_are_tolerated_and_counted() {
        let input = b"event: heartbeat\n\
data: {}\n\
\n\
event: token\n\
data: {\"content\":\"x\"}\n\
\n";
        let mut decoder = FrameDecoder::new();
        let events = decoder.push_bytes(input);

        assert_eq!(events, vec![token("x")]);
        assert_eq!(decoder.diagnostics().unknown_kinds(), 1);
    }

    #[test]
    fn known_kind_with_wrong_shape_is_quarantined() {
        let mut decoder = FrameDecoder::new();
        let events = decoder.push_bytes(b"event: tool_call\ndata: {\"tool_name\":\"x\"}\n\n");

        assert!(events.is_empty());
        assert_eq!(decoder.diagnostics().invalid_payloads(), 1);
    }

    #[test]
    fn blank_line_resets_the_named_event() {
        // After the dispatch boundary the kind falls back to "message",
        // which no payload claims here, so the second frame is dropped.
        let input = b"event: token\n\
data: {\"content\":\"a\"}\n\
\n\
data: {\"content\":\"b\"}\n\
\n";
        let mut decoder = FrameDecoder::new();
        let events = decoder.push_bytes(input);

        assert_eq!(events, vec![token("a")]);
        assert_eq!(decoder.diagnostics().unknown_kinds(), 1);
    }

    #[test]
    fn payload_event_field_names_the_kind_without_an_event_line() {
        let events =
            decode_all(b"data: {\"event\":\"token\",\"content\":\"inline\"}\n\n");

        assert_eq!(events, vec![token("inline")]);
    }

    #[test]
    fn carriage_returns_are_trimmed() {
        let events = decode_all(b"event: token\r\ndata: {\"content\":\"crlf\"}\r\n\r\n");

        assert_eq!(events, vec![token("crlf")]);
    }

    #[test]
    fn dangling_unterminated_line_is_never_flushed() {
        let mut decoder = FrameDecoder::new();
        let mut events = decoder.push_bytes(b"event: token\ndata: {\"content\":\"a\"}\n\n");
        events.extend(decoder.push_bytes(b"event: token\ndata: {\"content\":\"b\"}"));

        // No trailing newline ever arrives for the second frame.
        assert_eq!(events, vec![token("a")]);
    }
}
