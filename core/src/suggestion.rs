//! The suggestion data model shared by the heuristic detectors, the remote
//! analyzer client, and the patch engine.

use serde::{Deserialize, Serialize};

/// Suggestion category identifiers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Grammar,
    Clarity,
    Tone,
    Rewrite,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Category::Grammar => "grammar",
            Category::Clarity => "clarity",
            Category::Tone => "tone",
            Category::Rewrite => "rewrite",
        };
        f.write_str(name)
    }
}

/// Display ordering and colouring only; never consulted by merge or patch
/// logic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        f.write_str(name)
    }
}

/// One unit of feedback against a specific buffer snapshot.
///
/// `span` is a half-open byte range into the snapshot that produced the
/// suggestion. A suggestion without a `replacement` is flag-only and must be
/// resolved manually. Suggestions are immutable once created; each analysis
/// cycle produces an entirely new set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub category: Category,
    pub severity: Severity,
    pub message: String,
    pub span: (usize, usize),
    pub replacement: Option<String>,
}

impl Suggestion {
    /// `0 <= start <= end <= snapshot.len()`, both ends on char boundaries.
    pub fn span_valid(&self, snapshot: &str) -> bool {
        let (start, end) = self.span;
        start <= end
            && end <= snapshot.len()
            && snapshot.is_char_boundary(start)
            && snapshot.is_char_boundary(end)
    }

    /// Render a display preview against the current source text.
    ///
    /// Pure: takes the text explicitly and assumes no other suggestion has
    /// been applied. Falls back to the message when the span no longer fits
    /// the buffer.
    pub fn preview(&self, source: &str) -> String {
        if !self.span_valid(source) {
            return self.message.clone();
        }
        let (start, end) = self.span;
        match &self.replacement {
            Some(replacement) => format!("{} → {}", &source[start..end], replacement),
            None => {
                let from = snap_back(source, start.saturating_sub(40));
                let to = snap_forward(source, (end + 40).min(source.len()));
                source[from..to].trim().to_string()
            }
        }
    }
}

fn snap_back(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

fn snap_forward(text: &str, mut idx: usize) -> usize {
    while !text.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

/// The per-category suggestion lists produced by one analysis cycle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionSet {
    pub grammar: Vec<Suggestion>,
    pub clarity: Vec<Suggestion>,
    pub tone: Vec<Suggestion>,
    pub rewrite: Vec<Suggestion>,
}

impl SuggestionSet {
    /// Append `other` per category. Callers pass heuristic results first and
    /// merge remote results on top; no deduplication or overlap resolution
    /// happens here.
    pub fn merge(&mut self, other: SuggestionSet) {
        self.grammar.extend(other.grammar);
        self.clarity.extend(other.clarity);
        self.tone.extend(other.tone);
        self.rewrite.extend(other.rewrite);
    }

    /// Grammar, clarity, and tone suggestions that carry an automatic fix.
    pub fn fixable(&self) -> Vec<&Suggestion> {
        self.grammar
            .iter()
            .chain(&self.clarity)
            .chain(&self.tone)
            .filter(|suggestion| suggestion.replacement.is_some())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Suggestion> {
        self.grammar
            .iter()
            .chain(&self.clarity)
            .chain(&self.tone)
            .chain(&self.rewrite)
    }

    pub fn len(&self) -> usize {
        self.grammar.len() + self.clarity.len() + self.tone.len() + self.rewrite.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Prior buffer snapshots, most-recent-last.
///
/// Pushing a snapshot identical to the top is skipped so no-op edits never
/// pollute history. Popping restores the prior buffer and does not re-push
/// the discarded one.
#[derive(Debug, Clone, Default)]
pub struct UndoStack {
    snapshots: Vec<String>,
}

impl UndoStack {
    pub fn push(&mut self, snapshot: String) {
        if self.snapshots.last().is_some_and(|last| *last == snapshot) {
            return;
        }
        self.snapshots.push(snapshot);
    }

    pub fn pop(&mut self) -> Option<String> {
        self.snapshots.pop()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
