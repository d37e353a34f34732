//! Narrative segmentation.
//!
//! Splits raw text into reading units, estimates how long each unit takes
//! to read aloud, and marks quoted or emphasized spans within each unit.
//! Segmentation is a pure function of its input.

use serde::{Deserialize, Serialize};

/// How text is divided into segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationStrategy {
    /// One segment per sentence
    Sentence,
    /// One segment per paragraph; overlong paragraphs become sentence groups
    #[default]
    Paragraph,
    /// Paragraphs when the text has blank lines, sentence groups otherwise
    Adaptive,
}

/// Tunables for [`TextSegmenter`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Reading rate used for duration estimates
    pub words_per_minute: f64,
    /// Paragraphs longer than this many characters are split by sentence
    pub max_chunk_chars: usize,
    /// Words longer than this many characters are emphasized
    pub emphasis_min_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            words_per_minute: 200.0,
            max_chunk_chars: 500,
            emphasis_min_chars: 10,
        }
    }
}

/// Kind of highlighted span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightKind {
    /// Text between straight double quotes
    Quote,
    /// A long word
    Emphasis,
}

impl HighlightKind {
    /// Lowercase label
    pub fn as_str(&self) -> &'static str {
        match self {
            HighlightKind::Quote => "quote",
            HighlightKind::Emphasis => "emphasis",
        }
    }
}

/// A span of interest inside a segment.
///
/// `start_pos`/`end_pos` are byte offsets into the parent segment's text and
/// always fall on character boundaries. For quotes the span includes the
/// quote marks while `text` holds only the quoted words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub text: String,
    pub start_pos: usize,
    pub end_pos: usize,
    pub kind: HighlightKind,
}

/// A time-bounded chunk of narrative text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Position in the segment list
    pub id: usize,
    pub text: String,
    /// Seconds from the start of the narrative
    pub start_time: f64,
    pub end_time: f64,
    /// Estimated reading time in seconds
    pub duration: f64,
    pub highlights: Vec<Highlight>,
    pub word_count: usize,
}

impl Segment {
    /// Reading-time offset of each highlight, in highlight order.
    ///
    /// A highlight is placed proportionally to where it starts within the
    /// segment text.
    pub fn highlight_timestamps(&self) -> Vec<f64> {
        let len = self.text.len().max(1) as f64;
        self.highlights
            .iter()
            .map(|h| self.start_time + (h.start_pos as f64 / len) * self.duration)
            .collect()
    }
}

/// Output of a segmentation pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    pub segments: Vec<Segment>,
    /// Sum of all segment durations, in seconds
    pub total_duration: f64,
}

/// Splits narrative text into segments
pub trait Segmenter: Send + Sync {
    /// Segment `text` using `strategy`
    fn process(&self, text: &str, strategy: SegmentationStrategy) -> SegmentationResult;
}

/// Punctuation-and-blank-line segmenter with word-rate duration estimates
#[derive(Debug, Clone, Default)]
pub struct TextSegmenter {
    config: SegmenterConfig,
}

impl TextSegmenter {
    /// Create a segmenter with the given tunables
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    /// Current tunables
    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    fn units(&self, text: &str, strategy: SegmentationStrategy) -> Vec<String> {
        match strategy {
            SegmentationStrategy::Sentence => split_sentences(text)
                .into_iter()
                .map(str::to_string)
                .collect(),
            SegmentationStrategy::Paragraph => self.paragraph_units(text),
            SegmentationStrategy::Adaptive => {
                let paragraphs = split_paragraphs(text);
                if paragraphs.len() > 1 {
                    self.paragraph_units(text)
                } else {
                    group_sentences(text, self.config.max_chunk_chars)
                }
            }
        }
    }

    fn paragraph_units(&self, text: &str) -> Vec<String> {
        let mut units = Vec::new();
        for paragraph in split_paragraphs(text) {
            if paragraph.chars().count() > self.config.max_chunk_chars {
                units.extend(group_sentences(&paragraph, self.config.max_chunk_chars));
            } else {
                units.push(paragraph);
            }
        }
        units
    }

    fn estimate_duration(&self, word_count: usize) -> f64 {
        if self.config.words_per_minute <= 0.0 {
            return 0.0;
        }
        word_count as f64 / self.config.words_per_minute * 60.0
    }
}

impl Segmenter for TextSegmenter {
    fn process(&self, text: &str, strategy: SegmentationStrategy) -> SegmentationResult {
        let mut segments = Vec::new();
        let mut cumulative = 0.0;

        for (id, unit) in self.units(text, strategy).into_iter().enumerate() {
            let word_count = unit.split_whitespace().count();
            let duration = self.estimate_duration(word_count);
            let highlights = extract_highlights(&unit, self.config.emphasis_min_chars);

            for h in &highlights {
                debug_assert!(
                    h.start_pos <= h.end_pos
                        && h.end_pos <= unit.len()
                        && unit.is_char_boundary(h.start_pos)
                        && unit.is_char_boundary(h.end_pos),
                    "highlight {:?} outside segment text of {} bytes",
                    h,
                    unit.len()
                );
            }

            segments.push(Segment {
                id,
                start_time: cumulative,
                end_time: cumulative + duration,
                duration,
                highlights,
                word_count,
                text: unit,
            });
            cumulative += duration;
        }

        SegmentationResult {
            segments,
            total_duration: cumulative,
        }
    }
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

fn is_closer(c: char) -> bool {
    matches!(c, '"' | '\'' | ')' | '\u{201d}' | '\u{2019}')
}

/// Split at runs of `.!?` (plus trailing closing quotes) that are followed
/// by whitespace or the end of the text. Punctuation stays with its sentence.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if is_terminator(next) || is_closer(next) {
                end = j + next.len_utf8();
                chars.next();
            } else {
                break;
            }
        }
        let at_boundary = chars.peek().map_or(true, |&(_, next)| next.is_whitespace());
        if at_boundary {
            let sentence = text[start..end].trim();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            start = end;
        }
    }

    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

/// Split at blank lines, dropping paragraphs that are only whitespace
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n").trim().to_string());
    }

    paragraphs.retain(|p| !p.is_empty());
    paragraphs
}

/// Pack consecutive sentences into groups of at most `max_chars`
/// characters. A single sentence longer than the limit forms its own group.
pub fn group_sentences(text: &str, max_chars: usize) -> Vec<String> {
    let mut groups = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for sentence in split_sentences(text) {
        let sentence_chars = sentence.chars().count();
        if !current.is_empty() && current_chars + 1 + sentence_chars > max_chars {
            groups.push(std::mem::take(&mut current));
            current_chars = 0;
        }
        if !current.is_empty() {
            current.push(' ');
            current_chars += 1;
        }
        current.push_str(sentence);
        current_chars += sentence_chars;
    }
    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

/// Find quoted spans and long words.
///
/// Every quoted span and every qualifying word yields one highlight placed
/// at the first occurrence of its text in the segment.
pub fn extract_highlights(text: &str, emphasis_min_chars: usize) -> Vec<Highlight> {
    let mut highlights = Vec::new();

    let mut cursor = 0;
    while let Some(open_rel) = text[cursor..].find('"') {
        let open = cursor + open_rel;
        let inner_start = open + 1;
        let Some(close_rel) = text[inner_start..].find('"') else {
            break;
        };
        let close = inner_start + close_rel;
        if close == inner_start {
            // `""` holds nothing; the second mark may open the next quote
            cursor = inner_start;
            continue;
        }

        let quoted = &text[open..close + 1];
        let start = text.find(quoted).unwrap_or(open);
        highlights.push(Highlight {
            text: text[inner_start..close].to_string(),
            start_pos: start,
            end_pos: start + quoted.len(),
            kind: HighlightKind::Quote,
        });
        cursor = close + 1;
    }

    for word in text.split_whitespace() {
        if word.chars().count() > emphasis_min_chars {
            if let Some(start) = text.find(word) {
                highlights.push(Highlight {
                    text: word.to_string(),
                    start_pos: start,
                    end_pos: start + word.len(),
                    kind: HighlightKind::Emphasis,
                });
            }
        }
    }

    highlights
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> TextSegmenter {
        TextSegmenter::default()
    }

    #[test]
    fn test_empty_text_has_no_segments() {
        let result = segmenter().process("", SegmentationStrategy::Paragraph);
        assert!(result.segments.is_empty());
        assert_eq!(result.total_duration, 0.0);

        let result = segmenter().process("   \n\n  ", SegmentationStrategy::Sentence);
        assert!(result.segments.is_empty());
    }

    #[test]
    fn test_sentence_split_keeps_punctuation() {
        let sentences = split_sentences("It was late. Was it? Yes!  Pi is 3.14 today");
        assert_eq!(sentences, vec!["It was late.", "Was it?", "Yes!", "Pi is 3.14 today"]);
    }

    #[test]
    fn test_sentence_split_with_closing_quote() {
        let sentences = split_sentences("She said \"Run!\" Then silence.");
        assert_eq!(sentences, vec!["She said \"Run!\"", "Then silence."]);
    }

    #[test]
    fn test_paragraph_split() {
        let text = "First line\nstill first.\n\n  \n\nSecond paragraph.\r\n\r\nThird.";
        let paragraphs = split_paragraphs(text);
        assert_eq!(
            paragraphs,
            vec!["First line\nstill first.", "Second paragraph.", "Third."]
        );
    }

    #[test]
    fn test_durations_and_timing() {
        // 200 words per minute: 10 words take 3 seconds
        let text = "one two three four five six seven eight nine ten.\n\none two three four five.";
        let result = segmenter().process(text, SegmentationStrategy::Paragraph);
        assert_eq!(result.segments.len(), 2);

        let first = &result.segments[0];
        assert_eq!(first.word_count, 10);
        assert!((first.duration - 3.0).abs() < 1e-9);
        assert_eq!(first.start_time, 0.0);

        let second = &result.segments[1];
        assert_eq!(second.id, 1);
        assert!((second.start_time - 3.0).abs() < 1e-9);
        assert!((second.duration - 1.5).abs() < 1e-9);
        assert!((result.total_duration - 4.5).abs() < 1e-9);

        let sum: f64 = result.segments.iter().map(|s| s.duration).sum();
        assert!((sum - result.total_duration).abs() < 1e-9);
    }

    #[test]
    fn test_times_are_monotonic() {
        let text = "A b c. D e f g! H? I j k l m n.";
        let result = segmenter().process(text, SegmentationStrategy::Sentence);
        assert_eq!(result.segments.len(), 4);
        for pair in result.segments.windows(2) {
            assert!(pair[0].end_time <= pair[1].start_time + 1e-12);
            assert!(pair[0].start_time <= pair[1].start_time);
        }
    }

    #[test]
    fn test_long_paragraph_is_split_by_sentence() {
        let segmenter = TextSegmenter::new(SegmenterConfig {
            max_chunk_chars: 30,
            ..Default::default()
        });
        let text = "Short paragraph.\n\nThis sentence is long enough. So is this second one. Tiny.";
        let result = segmenter.process(text, SegmentationStrategy::Paragraph);
        let texts: Vec<&str> = result.segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Short paragraph.",
                "This sentence is long enough.",
                "So is this second one. Tiny.",
            ]
        );
    }

    #[test]
    fn test_adaptive_strategy() {
        let single = "One. Two. Three.";
        let result = segmenter().process(single, SegmentationStrategy::Adaptive);
        assert_eq!(result.segments.len(), 1);
        assert_eq!(result.segments[0].text, "One. Two. Three.");

        let multi = "One.\n\nTwo.";
        let result = segmenter().process(multi, SegmentationStrategy::Adaptive);
        assert_eq!(result.segments.len(), 2);
    }

    #[test]
    fn test_quote_highlights() {
        let text = r#"The "tranquility" of this moment. She whispered "stay" softly."#;
        let highlights = extract_highlights(text, 10);
        let quotes: Vec<&Highlight> = highlights
            .iter()
            .filter(|h| h.kind == HighlightKind::Quote)
            .collect();
        assert_eq!(quotes.len(), 2);
        assert_eq!(quotes[0].text, "tranquility");
        assert_eq!(&text[quotes[0].start_pos..quotes[0].end_pos], "\"tranquility\"");
        assert_eq!(quotes[1].text, "stay");
        assert_eq!(&text[quotes[1].start_pos..quotes[1].end_pos], "\"stay\"");
    }

    #[test]
    fn test_empty_quotes_are_skipped() {
        let highlights = extract_highlights(r#"An "" then "word" here"#, 10);
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].text, " then ");
    }

    #[test]
    fn test_emphasis_highlights_use_first_occurrence() {
        let text = "extraordinary things and extraordinary people";
        let highlights = extract_highlights(text, 10);
        assert_eq!(highlights.len(), 2);
        assert!(highlights.iter().all(|h| h.kind == HighlightKind::Emphasis));
        assert!(highlights.iter().all(|h| h.start_pos == 0 && h.end_pos == 13));
    }

    #[test]
    fn test_emphasis_counts_characters_not_bytes() {
        // the second word is nine characters but eighteen bytes
        let highlights = extract_highlights("ééééééééééé-no ééééééééé", 10);
        assert_eq!(highlights.len(), 1);
        assert_eq!(highlights[0].text, "ééééééééééé-no");
    }

    #[test]
    fn test_highlight_timestamps() {
        let text = "word word word \"quote\" end";
        let result = segmenter().process(text, SegmentationStrategy::Sentence);
        let segment = &result.segments[0];
        let stamps = segment.highlight_timestamps();
        assert_eq!(stamps.len(), 1);
        let expected = segment.highlights[0].start_pos as f64 / text.len() as f64 * segment.duration;
        assert!((stamps[0] - expected).abs() < 1e-9);
        assert!(stamps[0] >= segment.start_time && stamps[0] <= segment.end_time);
    }
}
