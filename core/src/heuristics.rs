//! Local pattern heuristics.
//!
//! Each detector is a pure scan over one normalized snapshot; detectors are
//! independent and never observe each other's output. Spans are byte offsets
//! into that snapshot.

use std::collections::HashMap;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::suggestion::{Category, Severity, Suggestion, SuggestionSet};
use crate::RewriteMode;

/// Tables consumed by the detector set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Source-spelling to target-spelling word pairs, matched whole-word and
    /// case-insensitively. The replacement is always the target as written
    /// here; the original capitalisation is not preserved.
    pub regional_spellings: Vec<(String, String)>,
    /// Upper bound on passive-voice flags per analysis.
    pub passive_voice_cap: usize,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            regional_spellings: vec![
                ("color".into(), "colour".into()),
                ("organize".into(), "organise".into()),
                ("analyze".into(), "analyse".into()),
                ("favor".into(), "favour".into()),
                ("center".into(), "centre".into()),
            ],
            passive_voice_cap: 12,
        }
    }
}

static MULTI_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\S\r\n]{2,}").expect("static regex"));

static OXFORD_LIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[A-Za-z]{2,}(?:, [A-Za-z]{2,})+ and [A-Za-z]{2,}\b").expect("static regex")
});

static PASSIVE_VOICE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:is|was|were|been|being|are|be)\s+\w+ed\b").expect("static regex")
});

/// Compiled heuristic detectors, reusable across analysis cycles.
pub struct DetectorSet {
    spelling_matcher: Option<Regex>,
    spelling_targets: HashMap<String, String>,
    passive_cap: usize,
}

impl DetectorSet {
    pub fn new(config: &HeuristicConfig) -> anyhow::Result<Self> {
        let mut spelling_targets = HashMap::new();
        for (source, target) in &config.regional_spellings {
            spelling_targets.insert(source.to_lowercase(), target.clone());
        }

        let spelling_matcher = if config.regional_spellings.is_empty() {
            None
        } else {
            let alternation = config
                .regional_spellings
                .iter()
                .map(|(source, _)| regex::escape(source))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"(?i)\b(?:{alternation})\b");
            let matcher = Regex::new(&pattern)
                .map_err(|e| anyhow::anyhow!("invalid regional spelling table: {e}"))?;
            Some(matcher)
        };

        Ok(Self {
            spelling_matcher,
            spelling_targets,
            passive_cap: config.passive_voice_cap,
        })
    }

    /// Run every detector against one snapshot and concatenate the results.
    pub fn detect(&self, text: &str) -> SuggestionSet {
        let mut set = SuggestionSet::default();
        self.detect_repeated_words(text, &mut set.grammar);
        self.detect_multi_spaces(text, &mut set.grammar);
        self.detect_regional_spelling(text, &mut set.grammar);
        self.detect_oxford_comma(text, &mut set.clarity);
        self.detect_passive_voice(text, &mut set.tone);
        set
    }

    /// Two identical whole words separated only by whitespace. A matched
    /// pair is consumed, so a triple yields one suggestion.
    fn detect_repeated_words(&self, text: &str, out: &mut Vec<Suggestion>) {
        let mut prev: Option<(usize, &str)> = None;
        for (start, segment) in text.split_word_bound_indices() {
            if segment.chars().all(char::is_whitespace) {
                continue;
            }
            if !segment.chars().any(char::is_alphanumeric) {
                prev = None;
                continue;
            }
            if let Some((prev_start, prev_word)) = prev {
                let prev_end = prev_start + prev_word.len();
                let gap = &text[prev_end..start];
                if !gap.is_empty()
                    && gap.chars().all(char::is_whitespace)
                    && segment.eq_ignore_ascii_case(prev_word)
                {
                    out.push(Suggestion {
                        id: format!("repeat-{prev_start}"),
                        category: Category::Grammar,
                        severity: Severity::Medium,
                        message: format!("Repeated word: \"{prev_word} {segment}\""),
                        span: (prev_start, start + segment.len()),
                        replacement: Some(prev_word.to_string()),
                    });
                    prev = None;
                    continue;
                }
            }
            prev = Some((start, segment));
        }
    }

    /// Runs of two or more horizontal whitespace characters.
    fn detect_multi_spaces(&self, text: &str, out: &mut Vec<Suggestion>) {
        for mat in MULTI_SPACE.find_iter(text) {
            out.push(Suggestion {
                id: format!("space-{}", mat.start()),
                category: Category::Grammar,
                severity: Severity::Low,
                message: "Multiple spaces detected".into(),
                span: (mat.start(), mat.end()),
                replacement: Some(" ".into()),
            });
        }
    }

    fn detect_regional_spelling(&self, text: &str, out: &mut Vec<Suggestion>) {
        let Some(matcher) = &self.spelling_matcher else {
            return;
        };
        for mat in matcher.find_iter(text) {
            let lowered = mat.as_str().to_lowercase();
            let Some(target) = self.spelling_targets.get(&lowered) else {
                continue;
            };
            out.push(Suggestion {
                id: format!("spelling-{}-{lowered}", mat.start()),
                category: Category::Grammar,
                severity: Severity::Low,
                message: format!("Prefer \"{target}\" over \"{}\"", mat.as_str()),
                span: (mat.start(), mat.end()),
                replacement: Some(target.clone()),
            });
        }
    }

    /// Comma-separated runs ending in `and <item>` without a comma before
    /// the `and`. Lists that already carry one are skipped.
    fn detect_oxford_comma(&self, text: &str, out: &mut Vec<Suggestion>) {
        for mat in OXFORD_LIST.find_iter(text) {
            let span_text = mat.as_str();
            if span_text.contains(", and") {
                continue;
            }
            out.push(Suggestion {
                id: format!("oxford-{}", mat.start()),
                category: Category::Clarity,
                severity: Severity::Low,
                message: "Consider an Oxford comma before \"and\"".into(),
                span: (mat.start(), mat.end()),
                replacement: Some(span_text.replacen(" and", ", and", 1)),
            });
        }
    }

    /// Be-verb followed by a past-participle-shaped word. Flag-only, capped
    /// to bound output size on long documents.
    fn detect_passive_voice(&self, text: &str, out: &mut Vec<Suggestion>) {
        for mat in PASSIVE_VOICE.find_iter(text).take(self.passive_cap) {
            out.push(Suggestion {
                id: format!("passive-{}", mat.start()),
                category: Category::Tone,
                severity: Severity::Low,
                message: format!("Possible passive voice: \"{}\"", mat.as_str()),
                span: (mat.start(), mat.end()),
                replacement: None,
            });
        }
    }
}

struct RewriteTable {
    matcher: AhoCorasick,
    replacements: &'static [&'static str],
}

impl RewriteTable {
    fn new(patterns: &[&str], replacements: &'static [&'static str]) -> Self {
        Self {
            matcher: AhoCorasickBuilder::new()
                .ascii_case_insensitive(true)
                .build(patterns),
            replacements,
        }
    }
}

static SIMPLIFY_TABLE: Lazy<RewriteTable> = Lazy::new(|| {
    RewriteTable::new(
        &["utilise", "approximately", "subsequently", "commence"],
        &["use", "about", "then", "start"],
    )
});

static FORMAL_TABLE: Lazy<RewriteTable> = Lazy::new(|| {
    RewriteTable::new(
        &["very", "really", "quite", "sort of", "kind of", "got", "help", "fix"],
        &["", "", "", "", "", "received", "assist", "resolve"],
    )
});

static FRIENDLY_TABLE: Lazy<RewriteTable> = Lazy::new(|| {
    RewriteTable::new(
        &["however", "therefore", "nevertheless"],
        &["but", "so", "still"],
    )
});

/// Deterministic rewrite fallback: mode-specific whole-word substitutions,
/// used when remote rewriting is disabled or fails.
pub fn local_rewrite(text: &str, mode: RewriteMode) -> String {
    let table = match mode {
        RewriteMode::Simplify => &*SIMPLIFY_TABLE,
        RewriteMode::Formal => &*FORMAL_TABLE,
        RewriteMode::Friendly => &*FRIENDLY_TABLE,
    };
    substitute_words(text, table)
}

fn substitute_words(text: &str, table: &RewriteTable) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for mat in table.matcher.find_iter(text.as_bytes()) {
        let (start, end) = (mat.start(), mat.end());
        let boundary_before = start == 0
            || !text[..start]
                .chars()
                .next_back()
                .is_some_and(char::is_alphanumeric);
        let boundary_after = end == text.len()
            || !text[end..].chars().next().is_some_and(char::is_alphanumeric);
        if !(boundary_before && boundary_after) {
            continue;
        }
        out.push_str(&text[last..start]);
        out.push_str(table.replacements[mat.pattern()]);
        last = end;
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detectors() -> DetectorSet {
        DetectorSet::new(&HeuristicConfig::default()).unwrap()
    }

    #[test]
    fn repeated_word_pair_is_consumed() {
        let set = detectors().detect("and and and");
        let repeats: Vec<_> = set
            .grammar
            .iter()
            .filter(|s| s.id.starts_with("repeat-"))
            .collect();
        assert_eq!(repeats.len(), 1);
        assert_eq!(repeats[0].span, (0, 7));
    }

    #[test]
    fn repeated_word_is_case_insensitive() {
        let set = detectors().detect("And and duplicated words.");
        let repeat = set
            .grammar
            .iter()
            .find(|s| s.id.starts_with("repeat-"))
            .expect("repeat suggestion");
        assert_eq!(repeat.span, (0, 7));
        assert_eq!(repeat.replacement.as_deref(), Some("And"));
    }

    #[test]
    fn punctuation_breaks_repeated_pairs() {
        let set = detectors().detect("stop. Stop the noise");
        assert!(!set.grammar.iter().any(|s| s.id.starts_with("repeat-")));
    }

    #[test]
    fn multi_space_skips_line_breaks() {
        let set = detectors().detect("a\n\nb  c");
        let spaces: Vec<_> = set
            .grammar
            .iter()
            .filter(|s| s.id.starts_with("space-"))
            .collect();
        assert_eq!(spaces.len(), 1);
        assert_eq!(spaces[0].span, (4, 6));
    }

    #[test]
    fn regional_spelling_lowercases_replacement() {
        let set = detectors().detect("Color me surprised");
        let spelling = set
            .grammar
            .iter()
            .find(|s| s.id.starts_with("spelling-"))
            .expect("spelling suggestion");
        assert_eq!(spelling.replacement.as_deref(), Some("colour"));
        assert_eq!(spelling.span, (0, 5));
    }

    #[test]
    fn regional_spelling_requires_whole_words() {
        let set = detectors().detect("colores and centered");
        assert!(!set.grammar.iter().any(|s| s.id.starts_with("spelling-")));
    }

    #[test]
    fn oxford_comma_suggested_for_unpunctuated_lists() {
        let set = detectors().detect("We invited product, design and operations to the workshop.");
        assert_eq!(set.clarity.len(), 1);
        assert_eq!(set.clarity[0].span, (11, 41));
        assert_eq!(
            set.clarity[0].replacement.as_deref(),
            Some("product, design, and operations")
        );
    }

    #[test]
    fn oxford_comma_skips_lists_that_already_have_one() {
        let set = detectors().detect("The colours, flavours, and textures are vibrant.");
        assert!(set.clarity.is_empty());
    }

    #[test]
    fn passive_voice_is_flag_only() {
        let set = detectors().detect("It was considered and then it was decided.");
        assert_eq!(set.tone.len(), 2);
        assert!(set.tone.iter().all(|s| s.replacement.is_none()));
    }

    #[test]
    fn passive_voice_is_capped() {
        let text = "it is tested. ".repeat(20);
        let set = detectors().detect(&text);
        assert_eq!(set.tone.len(), 12);
    }

    #[test]
    fn simplify_table_substitutes_whole_words() {
        assert_eq!(
            local_rewrite("We utilise approximately ten", RewriteMode::Simplify),
            "We use about ten"
        );
    }

    #[test]
    fn formal_table_drops_intensifiers() {
        assert_eq!(
            local_rewrite("I got very good help", RewriteMode::Formal),
            "I received  good assist"
        );
    }

    #[test]
    fn friendly_table_softens_connectors() {
        assert_eq!(
            local_rewrite("However it works", RewriteMode::Friendly),
            "but it works"
        );
    }

    #[test]
    fn substitution_respects_word_boundaries() {
        assert_eq!(
            local_rewrite("gotten fixtures", RewriteMode::Formal),
            "gotten fixtures"
        );
    }
}
