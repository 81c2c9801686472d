/// Corpus layout detection and top-level span splitting.
///
/// Layouts are tried in order: a JSON array, one object per line, and finally
/// objects run together with `}` `{` boundaries (optionally multi-line).
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

/// `}` followed, after optional whitespace, by `{`.
static OBJECT_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\}\s*\{").expect("valid boundary regex"));

/// Same, tolerating one comma (interior of a broken array).
static ARRAY_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\}\s*,?\s*\{").expect("valid array boundary regex"));

/// How the corpus was laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusLayout {
    /// Nothing but whitespace.
    Empty,
    /// A single well-formed JSON array.
    Array,
    /// Starts like an array but does not parse as one.
    BrokenArray,
    /// Every non-blank line is a complete JSON document.
    Lines,
    /// Objects concatenated with or without whitespace between them.
    Concatenated,
}

/// Candidate record text before parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawChunk {
    /// 1-indexed.
    pub position: usize,
    pub content: String,
}

/// A top-level record-shaped span.
#[derive(Debug, Clone)]
pub enum Span {
    /// Already parsed while detecting the layout.
    Parsed { position: usize, value: Value },
    /// Needs parsing (and possibly repair).
    Raw(RawChunk),
}

impl Span {
    #[must_use]
    pub fn position(&self) -> usize {
        match self {
            Self::Parsed { position, .. } => *position,
            Self::Raw(chunk) => chunk.position,
        }
    }
}

/// Detect the corpus layout and split it into spans.
pub fn split_corpus(text: &str) -> (CorpusLayout, Vec<Span>) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return (CorpusLayout::Empty, Vec::new());
    }

    if trimmed.starts_with('[') {
        return match serde_json::from_str::<Vec<Value>>(trimmed) {
            Ok(values) => (CorpusLayout::Array, parsed_spans(values)),
            Err(e) => {
                warn!("corpus looks like a JSON array but does not parse ({e}); splitting its interior");
                let interior = trimmed.trim_start_matches('[');
                let interior = interior.strip_suffix(']').unwrap_or(interior);
                (
                    CorpusLayout::BrokenArray,
                    raw_spans(split_objects(interior, &ARRAY_BOUNDARY)),
                )
            }
        };
    }

    if let Some(values) = parse_lines(trimmed) {
        return (CorpusLayout::Lines, parsed_spans(values));
    }

    (
        CorpusLayout::Concatenated,
        raw_spans(split_objects(trimmed, &OBJECT_BOUNDARY)),
    )
}

/// Parse every non-blank line as its own document; `None` if any line fails.
fn parse_lines(text: &str) -> Option<Vec<Value>> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if !lines.iter().all(|l| l.starts_with('{') && l.ends_with('}')) {
        return None;
    }

    lines
        .par_iter()
        .map(|l| serde_json::from_str::<Value>(l).ok())
        .collect()
}

/// Split on `boundary` and re-attach the consumed braces so every piece is
/// `{...}`-bounded.
pub fn split_objects(text: &str, boundary: &Regex) -> Vec<String> {
    boundary
        .split(text)
        .map(|piece| {
            let piece = piece.trim();
            let mut out = String::with_capacity(piece.len() + 2);
            if !piece.starts_with('{') {
                out.push('{');
            }
            out.push_str(piece);
            if !piece.ends_with('}') {
                out.push('}');
            }
            out
        })
        .collect()
}

fn parsed_spans(values: Vec<Value>) -> Vec<Span> {
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| Span::Parsed {
            position: i + 1,
            value,
        })
        .collect()
}

fn raw_spans(pieces: Vec<String>) -> Vec<Span> {
    pieces
        .into_iter()
        .enumerate()
        .map(|(i, content)| {
            Span::Raw(RawChunk {
                position: i + 1,
                content,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_reattaches_braces() {
        let pieces = split_objects(r#"{"a":1}{"b":2}  {"c":3}"#, &OBJECT_BOUNDARY);
        assert_eq!(pieces, vec![r#"{"a":1}"#, r#"{"b":2}"#, r#"{"c":3}"#]);
    }

    #[test]
    fn test_split_across_newlines() {
        let pieces = split_objects("{\n\"a\": 1\n}\n\n{\n\"b\": 2\n}", &OBJECT_BOUNDARY);
        assert_eq!(pieces.len(), 2);
        assert!(pieces[0].starts_with('{') && pieces[0].ends_with('}'));
        assert!(pieces[1].starts_with('{') && pieces[1].ends_with('}'));
    }

    #[test]
    fn test_array_boundary_tolerates_comma() {
        let pieces = split_objects(r#"{"a":1} , {"b":2}"#, &ARRAY_BOUNDARY);
        assert_eq!(pieces.len(), 2);
        let plain = split_objects(r#"{"a":1} , {"b":2}"#, &OBJECT_BOUNDARY);
        assert_eq!(plain.len(), 1);
    }

    #[test]
    fn test_empty_layout() {
        let (layout, spans) = split_corpus(" \n\t ");
        assert_eq!(layout, CorpusLayout::Empty);
        assert!(spans.is_empty());
    }

    #[test]
    fn test_array_layout() {
        let (layout, spans) = split_corpus(r#" [{"a":1}, {"b":2}] "#);
        assert_eq!(layout, CorpusLayout::Array);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].position(), 2);
    }

    #[test]
    fn test_broken_array_falls_back_to_splitting() {
        let (layout, spans) = split_corpus(r#"[{"a":1}, {"b":"x"y"}, {"c":3}]"#);
        assert_eq!(layout, CorpusLayout::BrokenArray);
        assert_eq!(spans.len(), 3);
        assert!(spans.iter().all(|s| matches!(s, Span::Raw(_))));
    }

    #[test]
    fn test_lines_layout() {
        let (layout, spans) = split_corpus("{\"a\":1}\n\n{\"b\":2}\n");
        assert_eq!(layout, CorpusLayout::Lines);
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn test_single_line_concatenation_is_not_lines() {
        let (layout, spans) = split_corpus(r#"{"a":1}{"b":2}"#);
        assert_eq!(layout, CorpusLayout::Concatenated);
        assert_eq!(spans.len(), 2);
    }

    #[test]
    fn test_corrupt_line_falls_back_to_concatenated() {
        let (layout, spans) = split_corpus("{\"a\":1}\n{\"b\":\"x\"y\"}\n{\"c\":3}");
        assert_eq!(layout, CorpusLayout::Concatenated);
        assert_eq!(spans.len(), 3);
    }
}
