//! ClearDraft core suggestion engine.
//! Generates writing suggestions from local pattern heuristics and an
//! optional remote analyzer, reconciles them against a single mutable text
//! buffer, and applies chosen edits without corrupting unrelated offsets.

use serde::{Deserialize, Serialize};

pub mod error;
mod heuristics;
mod patch;
mod remote;
mod session;
mod suggestion;
mod text;

pub use error::{EditError, RemoteAnalysisError};
pub use heuristics::{local_rewrite, DetectorSet, HeuristicConfig};
pub use patch::{apply_all, apply_one, PatchOutcome};
pub use remote::{
    default_models, ApiStatus, ModelInfo, RemoteClient, RemoteConfig, PROXY_TOKEN_HEADER,
};
pub use session::{AnalysisOutcome, RewriteOutcome, Session};
pub use suggestion::{Category, Severity, Suggestion, SuggestionSet, UndoStack};
pub use text::{compute_metrics, flesch_reading_ease, normalize, TextMetrics};

/// Rewrite registers offered by both the remote analyzer and the local
/// fallback tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewriteMode {
    Simplify,
    Formal,
    Friendly,
}

impl RewriteMode {
    /// The instruction sent to the remote analyzer for this register.
    pub fn instruction(self) -> &'static str {
        match self {
            RewriteMode::Simplify => {
                "Rewrite to be clearer and simpler without losing meaning. \
                 Short sentences; plain British English."
            }
            RewriteMode::Formal => {
                "Rewrite in a formal, professional register suitable for a \
                 business report in British English."
            }
            RewriteMode::Friendly => {
                "Rewrite to sound warm and friendly while staying concise in \
                 British English."
            }
        }
    }
}

impl std::fmt::Display for RewriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RewriteMode::Simplify => "simplify",
            RewriteMode::Formal => "formal",
            RewriteMode::Friendly => "friendly",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for RewriteMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "simplify" => Ok(RewriteMode::Simplify),
            "formal" => Ok(RewriteMode::Formal),
            "friendly" => Ok(RewriteMode::Friendly),
            other => Err(format!(
                "unknown rewrite mode `{other}` (expected simplify, formal, or friendly)"
            )),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Quiet period between a text change and the triggered analysis.
    pub debounce_ms: u64,
    pub heuristics: HeuristicConfig,
    pub remote: RemoteConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debounce_ms: 160,
            heuristics: HeuristicConfig::default(),
            remote: RemoteConfig::default(),
        }
    }
}
