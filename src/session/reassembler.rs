//! Reassembly of streamed assistant replies
//!
//! The relay delivers long assistant replies as chunk frames sharing a
//! `stream_id`. The reassembler owns the map from open stream ids to the
//! history message currently accumulating their content. The map lives
//! for one connection session: any close or reconnect clears it, so a
//! partial message can never leak across sessions.

use crate::core::types::{ChatHistory, Role};
use crate::relay::protocol::{RelayEvent, StreamFrame};
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct StreamReassembler {
    /// stream_id -> id of the message still open for appends
    open: HashMap<String, u64>,
}

impl StreamReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one connection event
    pub fn handle_event(&mut self, history: &mut ChatHistory, event: &RelayEvent) {
        match event {
            RelayEvent::Opened => {}
            RelayEvent::Frame(raw) => self.handle_frame(history, raw),
            RelayEvent::Error(reason) => {
                tracing::warn!(reason, "relay connection error, dropping open streams");
                self.reset();
            }
            RelayEvent::Closed => self.reset(),
        }
    }

    /// Process one inbound frame
    ///
    /// Unparseable payloads are appended verbatim as assistant text; the
    /// session never silently discards inbound data.
    pub fn handle_frame(&mut self, history: &mut ChatHistory, raw: &str) {
        let frame: StreamFrame = match serde_json::from_str(raw) {
            Ok(frame) => frame,
            Err(_) => {
                history.push(Role::Assistant, raw);
                return;
            }
        };

        let role = match frame.role.as_str() {
            "user" => Role::User,
            _ => Role::Assistant,
        };

        match (frame.stream, frame.stream_id) {
            (true, Some(stream_id)) => {
                match self.open.get(&stream_id) {
                    Some(&message_id) => {
                        // Stale entries only happen if history was replaced
                        // under us; fall back to a fresh message then.
                        if !history.append_content(message_id, &frame.content) {
                            let id = history.push(role, frame.content.clone());
                            self.open.insert(stream_id.clone(), id);
                        }
                    }
                    None => {
                        let id = history.push(role, frame.content.clone());
                        self.open.insert(stream_id.clone(), id);
                    }
                }
                if frame.done {
                    self.open.remove(&stream_id);
                }
            }
            // Stream flag without an id (or neither): standalone message
            _ => {
                history.push(role, frame.content);
            }
        }
    }

    /// Number of streams still open for appends
    pub fn open_streams(&self) -> usize {
        self.open.len()
    }

    /// Drop all open buffers (connection close or reconnect)
    pub fn reset(&mut self) {
        self.open.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(stream_id: &str, content: &str, done: bool) -> String {
        serde_json::json!({
            "role": "assistant",
            "content": content,
            "stream": true,
            "stream_id": stream_id,
            "done": done,
        })
        .to_string()
    }

    #[test]
    fn test_chunks_accumulate_into_one_message() {
        let mut history = ChatHistory::new();
        let mut reassembler = StreamReassembler::new();

        reassembler.handle_frame(&mut history, &chunk("s1", "Hello", false));
        reassembler.handle_frame(&mut history, &chunk("s1", " world", false));
        reassembler.handle_frame(&mut history, &chunk("s1", "", true));

        assert_eq!(history.len(), 1);
        assert_eq!(history.messages()[0].content, "Hello world");
        assert_eq!(reassembler.open_streams(), 0);
    }

    #[test]
    fn test_interleaved_streams_stay_separate() {
        let mut history = ChatHistory::new();
        let mut reassembler = StreamReassembler::new();

        reassembler.handle_frame(&mut history, &chunk("a", "first", false));
        reassembler.handle_frame(&mut history, &chunk("b", "second", false));
        reassembler.handle_frame(&mut history, &chunk("a", " part", true));

        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0].content, "first part");
        assert_eq!(history.messages()[1].content, "second");
        assert_eq!(reassembler.open_streams(), 1);
    }

    #[test]
    fn test_standalone_message() {
        let mut history = ChatHistory::new();
        let mut reassembler = StreamReassembler::new();

        reassembler.handle_frame(
            &mut history,
            r#"{"role": "assistant", "content": "done already"}"#,
        );

        assert_eq!(history.len(), 1);
        assert_eq!(history.messages()[0].content, "done already");
        assert_eq!(reassembler.open_streams(), 0);
    }

    #[test]
    fn test_unparseable_payload_kept_verbatim() {
        let mut history = ChatHistory::new();
        let mut reassembler = StreamReassembler::new();

        reassembler.handle_frame(&mut history, "plain text from the relay");

        assert_eq!(history.len(), 1);
        assert_eq!(history.messages()[0].role, Role::Assistant);
        assert_eq!(history.messages()[0].content, "plain text from the relay");
    }

    #[test]
    fn test_close_clears_open_buffers() {
        let mut history = ChatHistory::new();
        let mut reassembler = StreamReassembler::new();

        reassembler.handle_frame(&mut history, &chunk("s1", "partial", false));
        assert_eq!(reassembler.open_streams(), 1);

        reassembler.handle_event(&mut history, &RelayEvent::Closed);
        assert_eq!(reassembler.open_streams(), 0);

        // A later chunk with the same id starts a new message
        reassembler.handle_frame(&mut history, &chunk("s1", "fresh", false));
        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[1].content, "fresh");
    }

    #[test]
    fn test_completed_stream_not_reopened() {
        let mut history = ChatHistory::new();
        let mut reassembler = StreamReassembler::new();

        reassembler.handle_frame(&mut history, &chunk("s1", "full reply", true));
        reassembler.handle_frame(&mut history, &chunk("s1", "late chunk", false));

        // The late chunk opens a new message instead of mutating the old one
        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0].content, "full reply");
        assert_eq!(history.messages()[1].content, "late chunk");
    }
}
