//! Text canonicalisation and readability metrics.
//!
//! Every analysis cycle runs on a normalized snapshot, so normalisation is
//! deliberately conservative: it only reshapes whitespace and punctuation
//! glyphs, never word content, and is idempotent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

static LINE_ENDINGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r\n?").expect("static regex"));
static TRAILING_WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t]+\n").expect("static regex"));
static SENTENCE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").expect("static regex"));

/// Canonicalise line endings, whitespace, and quote glyphs.
///
/// Rules, in order: line-ending variants collapse to `\n`; non-breaking
/// spaces become ordinary spaces; trailing whitespace before a line break is
/// removed; curly quotes are straightened.
pub fn normalize(text: &str) -> String {
    let unified = LINE_ENDINGS.replace_all(text, "\n");
    let unified = unified.replace('\u{00A0}', " ");
    let trimmed = TRAILING_WHITESPACE.replace_all(&unified, "\n");
    trimmed
        .chars()
        .map(|ch| match ch {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Summary statistics for a buffer snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMetrics {
    pub word_count: usize,
    pub char_count: usize,
    pub reading_minutes: u32,
    pub readability_score: u32,
}

/// Word count, character count, estimated reading time, and a
/// Flesch-Reading-Ease approximation.
pub fn compute_metrics(text: &str) -> TextMetrics {
    let word_count = text.split_whitespace().count();
    let reading_minutes = ((word_count as f64 / 200.0).round() as u32).max(1);
    TextMetrics {
        word_count,
        char_count: text.chars().count(),
        reading_minutes,
        readability_score: flesch_reading_ease(text),
    }
}

/// Flesch-Reading-Ease approximation, clamped to `[0, 100]`.
///
/// Sentences are terminal-punctuation runs (minimum one); syllables are
/// vowel-group clusters per ASCII-alphabetic word, with one trailing silent
/// `e` stripped and a minimum of one syllable per word.
pub fn flesch_reading_ease(text: &str) -> u32 {
    let sentences = SENTENCE_BREAKS.find_iter(text).count().max(1);
    let words = text.split_whitespace().count().max(1);
    let syllables: usize = text
        .unicode_words()
        .filter(|word| word.chars().all(|ch| ch.is_ascii_alphabetic()))
        .map(|word| syllable_count(&word.to_lowercase()))
        .sum();

    let score = 206.835
        - 1.015 * (words as f64 / sentences as f64)
        - 84.6 * (syllables as f64 / words as f64);
    score.clamp(0.0, 100.0).round() as u32
}

fn syllable_count(word: &str) -> usize {
    let stem = word.strip_suffix('e').unwrap_or(word);
    let mut clusters = 0;
    let mut in_cluster = false;
    for ch in stem.chars() {
        if matches!(ch, 'a' | 'e' | 'i' | 'o' | 'u' | 'y') {
            if !in_cluster {
                clusters += 1;
                in_cluster = true;
            }
        } else {
            in_cluster = false;
        }
    }
    clusters.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_line_endings() {
        assert_eq!(normalize("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[test]
    fn replaces_non_breaking_spaces() {
        assert_eq!(normalize("a\u{00A0}b"), "a b");
    }

    #[test]
    fn strips_trailing_whitespace_before_breaks() {
        assert_eq!(normalize("a  \t\nb"), "a\nb");
    }

    #[test]
    fn straightens_curly_quotes() {
        assert_eq!(normalize("\u{201C}hi\u{201D} \u{2018}there\u{2019}"), "\"hi\" 'there'");
    }

    #[test]
    fn normalize_is_idempotent() {
        let samples = [
            "plain text",
            "a\r\nb\u{00A0}c  \nd",
            "\u{201C}curly\u{201D} and \u{2019}curlier\u{2018}",
            "",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn counts_words_as_whitespace_runs() {
        assert_eq!(compute_metrics("one  two\nthree").word_count, 3);
        assert_eq!(compute_metrics("").word_count, 0);
    }

    #[test]
    fn reading_time_has_a_floor_of_one_minute() {
        assert_eq!(compute_metrics("short note").reading_minutes, 1);
    }

    #[test]
    fn syllables_collapse_vowel_clusters() {
        assert_eq!(syllable_count("queue"), 1);
        assert_eq!(syllable_count("reading"), 2);
        assert_eq!(syllable_count("the"), 1);
    }

    #[test]
    fn readability_is_clamped() {
        // Short simple text pushes the raw score above 100.
        assert_eq!(flesch_reading_ease("Go now."), 100);
    }

    #[test]
    fn readability_of_a_plain_sentence() {
        let score = flesch_reading_ease("The quick brown fox jumps over the lazy dog.");
        assert_eq!(score, 94);
    }
}
