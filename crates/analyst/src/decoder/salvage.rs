/// Re-tokenize text left in the buffer after the transport closed.
///
/// The leftover has no trailing frame separator, and may hold several frames whose
/// separators were mangled. Every line starting with `event:` opens a new frame, which
/// then runs up to the next such line or the end of the text. Leading whitespace on each
/// line is dropped so the frames feed straight into [`parse_frame`](super::parse_frame).
pub fn salvage_frames(leftover: &str) -> Vec<String> {
    let mut frames: Vec<Vec<&str>> = Vec::new();

    for line in leftover.split('\n') {
        let line = line.trim_start();
        if line.is_empty() {
            continue;
        }
        match frames.last_mut() {
            Some(frame) if !line.starts_with("event:") => frame.push(line),
            _ => frames.push(vec![line]),
        }
    }

    frames.into_iter().map(|lines| lines.join("\n")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::parse_frame;

    #[test]
    fn test_single_unterminated_frame() {
        let leftover = "event: data\ndata: {\"messages\":[{\"type\":\"ai\",\"content\":\"final\"}]}";
        let frames = salvage_frames(leftover);
        assert_eq!(frames.len(), 1);

        let event = parse_frame(&frames[0]);
        assert!(event.is_data());
        assert_eq!(
            event.payload,
            "{\"messages\":[{\"type\":\"ai\",\"content\":\"final\"}]}"
        );
    }

    #[test]
    fn test_frames_split_on_event_lines() {
        let leftover = "event: data\n  data: {\"a\": 1}\n\n\nevent: data\ndata: {\"a\": 2}\nevent: end\n";
        let events: Vec<_> = salvage_frames(leftover)
            .iter()
            .map(|frame| parse_frame(frame))
            .collect();

        assert_eq!(events.len(), 3);
        assert_eq!(events[0].payload, "{\"a\": 1}");
        assert_eq!(events[1].payload, "{\"a\": 2}");
        assert!(events[2].is_end());
    }

    #[test]
    fn test_leftover_without_event_lines() {
        let frames = salvage_frames("data: {\"a\": 1}");
        assert_eq!(parse_frame(&frames[0]).event_type, "");

        assert!(salvage_frames("  \n \n").is_empty());
    }
}
