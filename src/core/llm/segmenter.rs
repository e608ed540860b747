//! Sentence segmentation of streamed model output.
//!
//! Deltas are appended to a rolling buffer. Whenever the buffer contains
//! terminal punctuation followed by whitespace, everything up to and
//! including that whitespace becomes a segment. Requiring the whitespace
//! makes the output independent of how the text was split into deltas.

use std::sync::LazyLock;

use regex::Regex;

/// Terminal punctuation followed by whitespace.
static SENTENCE_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+\s+").expect("valid sentence boundary regex"));

/// Segments at or below this many characters are not spoken.
pub const MIN_SEGMENT_CHARS: usize = 3;

/// Splits streamed text into speakable sentences.
#[derive(Debug, Default)]
pub struct SentenceSegmenter {
    buffer: String,
}

impl SentenceSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and return any completed sentences.
    ///
    /// Completed fragments of [`MIN_SEGMENT_CHARS`] characters or fewer are
    /// consumed without being returned.
    pub fn push(&mut self, delta: &str) -> Vec<String> {
        self.buffer.push_str(delta);

        let mut segments = Vec::new();
        while let Some(boundary) = SENTENCE_BOUNDARY.find(&self.buffer) {
            let end = boundary.end();
            if let Some(segment) = speakable(&self.buffer[..end]) {
                segments.push(segment);
            }
            self.buffer.drain(..end);
        }
        segments
    }

    /// Flush the remainder once the stream has ended.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        speakable(&rest)
    }
}

fn speakable(segment: &str) -> Option<String> {
    let segment = segment.trim();
    (segment.chars().count() > MIN_SEGMENT_CHARS).then(|| segment.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment_all(deltas: &[&str]) -> Vec<String> {
        let mut segmenter = SentenceSegmenter::new();
        let mut out = Vec::new();
        for delta in deltas {
            out.extend(segmenter.push(delta));
        }
        out.extend(segmenter.finish());
        out
    }

    #[test]
    fn test_emits_sentences_as_they_complete() {
        let mut segmenter = SentenceSegmenter::new();
        assert!(segmenter.push("Sure, I can").is_empty());
        assert!(segmenter.push(" help.").is_empty());
        assert_eq!(segmenter.push(" What day"), vec!["Sure, I can help."]);
        assert!(segmenter.push(" works?").is_empty());
        assert_eq!(segmenter.finish().as_deref(), Some("What day works?"));
    }

    #[test]
    fn test_short_fragments_are_consumed() {
        assert_eq!(
            segment_all(&["Ok. ", "No! ", "That is booked. ", "Hm."]),
            vec!["That is booked."]
        );
    }

    #[test]
    fn test_repeated_punctuation() {
        assert_eq!(
            segment_all(&["Really?! ", "Great... ", "See you then"]),
            vec!["Really?!", "Great...", "See you then"]
        );
    }

    #[test]
    fn test_output_is_independent_of_chunking() {
        let text = "Hello there! I can book that for Tuesday. Does 3 PM work? Ok. Great, talk soon";
        let expected = segment_all(&[text]);
        assert_eq!(
            expected,
            vec![
                "Hello there!",
                "I can book that for Tuesday.",
                "Does 3 PM work?",
                "Great, talk soon"
            ]
        );

        for split in 0..=text.len() {
            let (a, b) = text.split_at(split);
            assert_eq!(segment_all(&[a, b]), expected, "split at {split}");
        }

        let chars: Vec<String> = text.chars().map(String::from).collect();
        let deltas: Vec<&str> = chars.iter().map(String::as_str).collect();
        assert_eq!(segment_all(&deltas), expected);
    }

    #[test]
    fn test_finish_on_empty_buffer() {
        let mut segmenter = SentenceSegmenter::new();
        assert_eq!(segmenter.finish(), None);
        segmenter.push("Done. ");
        assert_eq!(segmenter.finish(), None);
    }
}
