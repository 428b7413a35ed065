/// Boundary between two frames on the wire
pub const FRAME_SEPARATOR: &str = "\n\n";

pub const DATA_EVENT: &str = "data";
pub const END_EVENT: &str = "end";

const EVENT_FIELD: &str = "event:";
const DATA_FIELD: &str = "data:";

/// Event type and raw payload of a single frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedEvent {
    pub event_type: String,
    pub payload: String,
}

impl ParsedEvent {
    pub fn is_data(&self) -> bool {
        self.event_type == DATA_EVENT
    }

    pub fn is_end(&self) -> bool {
        self.event_type == END_EVENT
    }
}

/// Parse one frame. The last `event:` and `data:` lines win; other lines are ignored.
pub fn parse_frame(frame: &str) -> ParsedEvent {
    let mut event = ParsedEvent::default();
    for line in frame.split('\n') {
        if let Some(value) = line.strip_prefix(EVENT_FIELD) {
            event.event_type = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix(DATA_FIELD) {
            event.payload = value.trim().to_string();
        }
    }
    event
}

/// Incremental splitter that holds back an incomplete trailing frame across reads.
///
/// Bytes are decoded as UTF-8 as they arrive. A character split across two chunks is
/// kept until its remaining bytes show up; invalid sequences become U+FFFD.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    buffer: String,
    undecoded: Vec<u8>,
}

impl FrameSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append raw bytes and return every frame they complete.
    pub fn push_bytes(&mut self, chunk: &[u8]) -> Vec<String> {
        let text = self.decode(chunk);
        self.push_str(&text)
    }

    /// Append text and return every frame it completes.
    ///
    /// Frames that are empty or whitespace-only are dropped.
    pub fn push_str(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let mut frames = Vec::new();
        let mut consumed = 0;
        while let Some(offset) = self.buffer[consumed..].find(FRAME_SEPARATOR) {
            let frame = &self.buffer[consumed..consumed + offset];
            if !frame.trim().is_empty() {
                frames.push(frame.to_string());
            }
            consumed += offset + FRAME_SEPARATOR.len();
        }
        self.buffer.drain(..consumed);

        frames
    }

    /// Text received after the last complete frame
    pub fn remainder(&self) -> &str {
        &self.buffer
    }

    /// Take the unterminated remainder, flushing any undecoded bytes.
    pub fn take_remainder(&mut self) -> String {
        if !self.undecoded.is_empty() {
            let tail = String::from_utf8_lossy(&self.undecoded).into_owned();
            self.buffer.push_str(&tail);
            self.undecoded.clear();
        }
        std::mem::take(&mut self.buffer)
    }

    fn decode(&mut self, chunk: &[u8]) -> String {
        self.undecoded.extend_from_slice(chunk);

        let mut text = String::new();
        loop {
            match std::str::from_utf8(&self.undecoded) {
                Ok(valid) => {
                    text.push_str(valid);
                    self.undecoded.clear();
                    break;
                }
                Err(err) => {
                    let valid_up_to = err.valid_up_to();
                    text.push_str(&String::from_utf8_lossy(&self.undecoded[..valid_up_to]));
                    match err.error_len() {
                        // Incomplete character at the end: wait for the next chunk
                        None => {
                            self.undecoded.drain(..valid_up_to);
                            break;
                        }
                        Some(invalid_len) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            self.undecoded.drain(..valid_up_to + invalid_len);
                        }
                    }
                }
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STREAM: &str = "event: data\ndata: {\"messages\": []}\n\nevent: data\ndata: {\"model\": {\"messages\": [{\"type\": \"ai\", \"content\": \"hi\"}]}}\n\n\n\nevent: end\n\nevent: da";

    fn split_whole(text: &str) -> Vec<String> {
        FrameSplitter::new().push_str(text)
    }

    fn split_at(text: &str, cuts: &[usize]) -> Vec<String> {
        let mut splitter = FrameSplitter::new();
        let mut frames = Vec::new();
        let mut start = 0;
        for &cut in cuts.iter().chain(std::iter::once(&text.len())) {
            frames.extend(splitter.push_str(&text[start..cut]));
            start = cut;
        }
        frames
    }

    #[test]
    fn test_incremental_split_matches_whole_split() {
        let expected = split_whole(STREAM);
        assert_eq!(expected.len(), 3);

        for cut in 0..=STREAM.len() {
            assert_eq!(split_at(STREAM, &[cut]), expected, "single cut at {}", cut);
        }
        for first in (0..STREAM.len()).step_by(7) {
            for second in first..STREAM.len() {
                assert_eq!(split_at(STREAM, &[first, second]), expected);
            }
        }
    }

    #[test]
    fn test_byte_by_byte_split() {
        let mut splitter = FrameSplitter::new();
        let mut frames = Vec::new();
        for byte in STREAM.as_bytes() {
            frames.extend(splitter.push_bytes(std::slice::from_ref(byte)));
        }
        assert_eq!(frames, split_whole(STREAM));
        assert_eq!(splitter.remainder(), "event: da");
    }

    #[test]
    fn test_incomplete_frame_is_held_back() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push_str("event: data\ndata: {\"a\"").is_empty());
        assert_eq!(splitter.remainder(), "event: data\ndata: {\"a\"");

        let frames = splitter.push_str(": 1}\n\n");
        assert_eq!(frames, vec!["event: data\ndata: {\"a\": 1}".to_string()]);
        assert_eq!(splitter.remainder(), "");
    }

    #[test]
    fn test_empty_and_separator_only_chunks() {
        let mut splitter = FrameSplitter::new();
        assert!(splitter.push_str("").is_empty());
        assert!(splitter.push_str("\n\n\n\n").is_empty());
        assert!(splitter.push_bytes(b"").is_empty());
        assert_eq!(splitter.remainder(), "");
    }

    #[test]
    fn test_multibyte_character_split_across_chunks() {
        let text = "event: data\ndata: {\"content\": \"分析\"}\n\n";
        let bytes = text.as_bytes();
        let split = text.find('分').unwrap() + 1;

        let mut splitter = FrameSplitter::new();
        assert!(splitter.push_bytes(&bytes[..split]).is_empty());
        let frames = splitter.push_bytes(&bytes[split..]);
        assert_eq!(frames, vec![text.trim_end().to_string()]);
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut splitter = FrameSplitter::new();
        let frames = splitter.push_bytes(b"data: a\xffb\n\n");
        assert_eq!(frames, vec!["data: a\u{FFFD}b".to_string()]);
    }

    #[test]
    fn test_take_remainder_flushes_partial_character() {
        let mut splitter = FrameSplitter::new();
        splitter.push_bytes(b"data: x\xe5");
        assert_eq!(splitter.take_remainder(), "data: x\u{FFFD}");
        assert_eq!(splitter.remainder(), "");
    }

    #[test]
    fn test_parse_frame() {
        let event = parse_frame("event: data\ndata:   {\"messages\": []}  ");
        assert!(event.is_data());
        assert_eq!(event.payload, "{\"messages\": []}");
    }

    #[test]
    fn test_parse_frame_without_data_line() {
        let event = parse_frame("event: end");
        assert!(event.is_end());
        assert_eq!(event.payload, "");

        let event = parse_frame(": keep-alive\nid: 4");
        assert_eq!(event, ParsedEvent::default());
    }

    #[test]
    fn test_parse_frame_last_field_wins() {
        let event = parse_frame("event: end\nevent: data\ndata: 1\nretry: 10\ndata: 2");
        assert_eq!(event.event_type, "data");
        assert_eq!(event.payload, "2");
    }
}
