//! Patch application.
//!
//! Single patches splice one replacement over its span. Bulk application
//! sorts candidates by start descending and splices right to left: earlier
//! edits sit at higher offsets, so the spans of not-yet-applied edits stay
//! valid against the original buffer for the whole pass. Overlapping spans
//! within one bulk set are not detected; only splices that would overrun
//! the buffer or split a UTF-8 character are skipped.

use crate::error::EditError;
use crate::suggestion::{Suggestion, SuggestionSet};

/// Result of applying a single suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    pub text: String,
    /// Post-patch selection range covering the inserted replacement.
    pub cursor: (usize, usize),
}

/// Apply one suggestion's replacement over its span.
pub fn apply_one(text: &str, suggestion: &Suggestion) -> Result<PatchOutcome, EditError> {
    let Some(replacement) = &suggestion.replacement else {
        return Err(EditError::NoAutomaticFix);
    };
    if !suggestion.span_valid(text) {
        return Err(EditError::InvalidSpan);
    }

    let (start, end) = suggestion.span;
    let mut updated = String::with_capacity(text.len() - (end - start) + replacement.len());
    updated.push_str(&text[..start]);
    updated.push_str(replacement);
    updated.push_str(&text[end..]);

    Ok(PatchOutcome {
        text: updated,
        cursor: (start, start + replacement.len()),
    })
}

/// Apply every fixable grammar/clarity/tone suggestion in one rewrite.
/// Returns the new buffer and the number of candidate fixes.
pub fn apply_all(text: &str, suggestions: &SuggestionSet) -> Result<(String, usize), EditError> {
    let mut fixable = suggestions.fixable();
    if fixable.is_empty() {
        return Err(EditError::NothingToApply);
    }
    fixable.sort_by(|a, b| b.span.0.cmp(&a.span.0));

    let mut updated = text.to_string();
    for suggestion in &fixable {
        let (start, end) = suggestion.span;
        let replacement = suggestion.replacement.as_deref().unwrap_or_default();
        if start > end
            || end > updated.len()
            || !updated.is_char_boundary(start)
            || !updated.is_char_boundary(end)
        {
            continue;
        }
        updated.replace_range(start..end, replacement);
    }

    Ok((updated, fixable.len()))
}
