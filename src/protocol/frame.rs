//! Newline-delimited frame reassembly.
//!
//! The transport may deliver several frames in one chunk, or split a frame
//! across chunks. [`FrameAssembler`] buffers input and yields every complete
//! `\n`-terminated frame, decoded. After each [`feed`](FrameAssembler::feed)
//! the buffer holds at most one unterminated trailing fragment.

// ============================================================================
// Imports
// ============================================================================

use tracing::{trace, warn};

use super::message::Message;

// ============================================================================
// Constants
// ============================================================================

/// Frame delimiter.
pub const DELIMITER: char = '\n';

// ============================================================================
// FrameAssembler
// ============================================================================

/// Accumulates raw text and extracts decoded frames.
#[derive(Debug, Default)]
pub struct FrameAssembler {
    /// Unterminated trailing fragment.
    buffer: String,
    /// Frames that failed to decode since creation.
    decode_failures: u64,
}

impl FrameAssembler {
    /// Creates an empty assembler.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: String::new(),
            decode_failures: 0,
        }
    }

    /// Appends a chunk and returns every message completed by it.
    ///
    /// Frames that fail to decode are logged and skipped; the frames after
    /// them are still extracted. Blank frames are ignored.
    pub fn feed(&mut self, chunk: &str) -> Vec<Message> {
        self.buffer.push_str(chunk);

        let Some(end) = self.buffer.rfind(DELIMITER) else {
            return Vec::new();
        };

        let complete: String = self.buffer.drain(..=end).collect();
        let mut messages = Vec::new();

        for frame in complete.split(DELIMITER) {
            let frame = frame.trim_end_matches('\r');
            if frame.trim().is_empty() {
                continue;
            }

            match Message::decode(frame) {
                Ok(message) => {
                    trace!(kind = message.tag(), "Frame decoded");
                    messages.push(message);
                }
                Err(e) => {
                    self.decode_failures += 1;
                    warn!(error = %e, "Skipping undecodable frame");
                }
            }
        }

        messages
    }

    /// Returns the buffered partial fragment.
    #[inline]
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Returns the number of frames skipped because they failed to decode.
    #[inline]
    #[must_use]
    pub const fn decode_failures(&self) -> u64 {
        self.decode_failures
    }

    /// Drops any buffered fragment.
    ///
    /// Called when the transport closes; a fragment never continues on a new
    /// connection.
    pub fn reset(&mut self) {
        if !self.buffer.is_empty() {
            trace!(len = self.buffer.len(), "Discarding partial frame");
        }
        self.buffer.clear();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    use crate::protocol::ResponseKind;

    #[test]
    fn test_single_complete_frame() {
        let mut assembler = FrameAssembler::new();
        let messages = assembler.feed("{\"MGP\":{\"MGPID\":1}}\n");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind(), Some(ResponseKind::ParameterValue));
        assert!(assembler.pending().is_empty());
    }

    #[test]
    fn test_partial_frame_is_retained() {
        let mut assembler = FrameAssembler::new();
        assert!(assembler.feed("{\"MGP\":{\"MG").is_empty());
        assert_eq!(assembler.pending(), "{\"MGP\":{\"MG");

        let messages = assembler.feed("PID\":1}}\n{\"MLOG\"");
        assert_eq!(messages.len(), 1);
        assert_eq!(assembler.pending(), "{\"MLOG\"");

        let messages = assembler.feed(":\"1\"}\n");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].tag(), "MLOG");
        assert!(assembler.pending().is_empty());
    }

    #[test]
    fn test_multiple_frames_in_one_chunk() {
        let mut assembler = FrameAssembler::new();
        let messages = assembler.feed("{\"MGP\":{}}\n{\"MGPM\":{}}\n{\"MLOG\":\"1\"}\n");
        let tags: Vec<&str> = messages.iter().map(Message::tag).collect();
        assert_eq!(tags, vec!["MGP", "MGPM", "MLOG"]);
    }

    #[test]
    fn test_decode_failure_does_not_abort_extraction() {
        let mut assembler = FrameAssembler::new();
        let messages = assembler.feed("{\"MGP\":{}}\n{broken\n{\"MLOG\":\"1\"}\n{\"MSP\"");
        let tags: Vec<&str> = messages.iter().map(Message::tag).collect();
        assert_eq!(tags, vec!["MGP", "MLOG"]);
        assert_eq!(assembler.decode_failures(), 1);
        assert_eq!(assembler.pending(), "{\"MSP\"");
    }

    #[test]
    fn test_blank_and_crlf_frames() {
        let mut assembler = FrameAssembler::new();
        let messages = assembler.feed("\n\r\n{\"MGP\":{}}\r\n  \n");
        assert_eq!(messages.len(), 1);
        assert_eq!(assembler.decode_failures(), 0);
    }

    #[test]
    fn test_reset_discards_fragment() {
        let mut assembler = FrameAssembler::new();
        assembler.feed("{\"MGP\"");
        assembler.reset();
        assert!(assembler.pending().is_empty());

        let messages = assembler.feed("{\"MLOG\":\"1\"}\n");
        assert_eq!(messages.len(), 1);
    }

    fn frame_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u32..500).prop_map(|id| format!("{{\"MGP\":{{\"MGPID\":{id},\"ParamVal\":\"v{id}\"}}}}")),
            "[a-z]{1,8}".prop_map(|name| format!("{{\"MGPG\":\"{name}\",\"Values\":[]}}")),
            Just("{\"MLOG\":\"1\"}".to_string()),
            Just("{garbage".to_string()),
        ]
    }

    proptest! {
        #[test]
        fn prop_reassembly_is_chunk_boundary_independent(
            frames in prop::collection::vec(frame_strategy(), 0..20),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
        ) {
            let stream: String = frames.iter().map(|f| format!("{f}\n")).collect();

            let mut whole = FrameAssembler::new();
            let expected = whole.feed(&stream);

            let mut points: Vec<usize> = cuts.iter().map(|i| i.index(stream.len() + 1)).collect();
            points.sort_unstable();
            points.dedup();

            let mut chunked = FrameAssembler::new();
            let mut actual = Vec::new();
            let mut start = 0;
            for point in points.into_iter().chain(std::iter::once(stream.len())) {
                actual.extend(chunked.feed(&stream[start..point]));
                start = point;
            }

            prop_assert_eq!(actual, expected);
            prop_assert_eq!(chunked.decode_failures(), whole.decode_failures());
            prop_assert!(chunked.pending().is_empty());
        }
    }
}
