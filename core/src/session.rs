//! Analysis orchestrator.
//!
//! The `Session` owns the single mutable text buffer and the undo history;
//! every other component only ever sees immutable snapshots. Analysis is
//! debounced through an abortable timer task, and each run carries a
//! monotonically increasing token: only the run holding the highest issued
//! token may commit its suggestion set, so a slow remote response from an
//! older run can never overwrite a newer run's results.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::EditError;
use crate::heuristics::{self, DetectorSet};
use crate::patch;
use crate::remote::RemoteClient;
use crate::suggestion::{Suggestion, SuggestionSet, UndoStack};
use crate::text::{self, TextMetrics};
use crate::{Config, RewriteMode};

#[derive(Debug, Default)]
struct SessionState {
    buffer: String,
    undo: UndoStack,
    suggestions: SuggestionSet,
}

/// Result of one analysis cycle.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisOutcome {
    pub run: u64,
    /// False when a newer run was issued while this one was in flight; the
    /// suggestions were discarded, not displayed.
    pub committed: bool,
    pub suggestions: SuggestionSet,
    pub metrics: TextMetrics,
    /// User-visible note when remote analysis was skipped or failed; local
    /// heuristics are still included.
    pub remote_error: Option<String>,
}

/// Result of a rewrite request.
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    pub text: String,
    /// False when the deterministic local substitution tables produced the
    /// result (remote disabled, unconfigured, or failed).
    pub used_remote: bool,
}

/// Cheaply clonable handle owning the buffer, undo stack, and displayed
/// suggestion set. Requires a tokio runtime for scheduling and remote calls.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    run_counter: Arc<AtomicU64>,
    detectors: Arc<DetectorSet>,
    remote: Arc<RemoteClient>,
    remote_enabled: bool,
    debounce: Duration,
    committed: Arc<watch::Sender<SuggestionSet>>,
    pending: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Session {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let detectors = DetectorSet::new(&config.heuristics)?;
        let remote = RemoteClient::new(&config.remote)?;
        let (committed, _) = watch::channel(SuggestionSet::default());
        Ok(Self {
            state: Arc::new(Mutex::new(SessionState::default())),
            run_counter: Arc::new(AtomicU64::new(0)),
            detectors: Arc::new(detectors),
            remote: Arc::new(remote),
            remote_enabled: config.remote.enabled,
            debounce: Duration::from_millis(config.debounce_ms),
            committed: Arc::new(committed),
            pending: Arc::new(Mutex::new(None)),
        })
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn text(&self) -> String {
        self.state().buffer.clone()
    }

    pub fn metrics(&self) -> TextMetrics {
        text::compute_metrics(&self.state().buffer)
    }

    /// The currently displayed suggestion set.
    pub fn suggestions(&self) -> SuggestionSet {
        self.state().suggestions.clone()
    }

    /// Observe committed suggestion sets as they replace the displayed one.
    pub fn subscribe(&self) -> watch::Receiver<SuggestionSet> {
        self.committed.subscribe()
    }

    pub fn undo_depth(&self) -> usize {
        self.state().undo.len()
    }

    /// Replace the buffer. With `push_undo`, the prior buffer is recorded;
    /// replacing with identical text is a no-op either way.
    pub fn replace_text(&self, value: &str, push_undo: bool) {
        let mut state = self.state();
        if state.buffer == value {
            return;
        }
        let prior = std::mem::replace(&mut state.buffer, value.to_string());
        if push_undo {
            state.undo.push(prior);
        }
    }

    /// Restore the previous buffer snapshot. The discarded buffer is not
    /// re-pushed; there is no redo.
    pub fn undo(&self) -> Result<(), EditError> {
        let mut state = self.state();
        let Some(previous) = state.undo.pop() else {
            return Err(EditError::NothingToUndo);
        };
        state.buffer = previous;
        Ok(())
    }

    /// Empty the buffer and drop the displayed suggestions. The cleared
    /// buffer is undoable.
    pub fn clear(&self) {
        {
            let mut state = self.state();
            if state.buffer.is_empty() {
                return;
            }
            let prior = std::mem::take(&mut state.buffer);
            state.undo.push(prior);
            state.suggestions = SuggestionSet::default();
        }
        self.committed.send_replace(SuggestionSet::default());
    }

    /// Apply one suggestion's fix, record undo, and re-trigger analysis.
    /// Returns the post-patch cursor range for re-selection.
    pub fn apply_suggestion(&self, suggestion: &Suggestion) -> Result<(usize, usize), EditError> {
        let cursor = {
            let mut state = self.state();
            let outcome = patch::apply_one(&state.buffer, suggestion)?;
            let prior = std::mem::replace(&mut state.buffer, outcome.text);
            state.undo.push(prior);
            outcome.cursor
        };
        self.schedule_analysis();
        Ok(cursor)
    }

    /// Apply every fixable displayed suggestion in one undoable rewrite.
    pub fn apply_all(&self) -> Result<usize, EditError> {
        let count = {
            let mut state = self.state();
            let (updated, count) = patch::apply_all(&state.buffer, &state.suggestions)?;
            if updated != state.buffer {
                let prior = std::mem::replace(&mut state.buffer, updated);
                state.undo.push(prior);
            }
            count
        };
        self.schedule_analysis();
        Ok(count)
    }

    /// Debounced trigger: abort any pending timer and start a fresh one.
    pub fn schedule_analysis(&self) {
        let session = self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(session.debounce).await;
            session.analyze().await;
        });
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.replace(task) {
            previous.abort();
        }
    }

    /// Run one full analysis cycle against the current buffer.
    ///
    /// Normalisation happens first; when it changes the buffer, that change
    /// is itself pushed onto the undo history. Heuristics always run
    /// synchronously on the snapshot; the remote analyzer is consulted when
    /// enabled and a token is configured, and its failure keeps the local
    /// results. The result is committed only if no newer run was issued in
    /// the meantime.
    pub async fn analyze(&self) -> AnalysisOutcome {
        let (snapshot, run, prior_rewrites) = {
            let mut state = self.state();
            let normalized = text::normalize(&state.buffer);
            if normalized != state.buffer {
                let prior = std::mem::replace(&mut state.buffer, normalized);
                state.undo.push(prior);
            }
            let run = self.begin_run();
            (
                state.buffer.clone(),
                run,
                state.suggestions.rewrite.clone(),
            )
        };

        let mut suggestions = self.detectors.detect(&snapshot);
        suggestions.rewrite = prior_rewrites;

        let mut remote_error = None;
        if self.remote_enabled {
            if self.remote.has_token() {
                match self.remote.analyze(&snapshot).await {
                    Ok(remote) => suggestions.merge(remote),
                    Err(err) => {
                        tracing::warn!(error = %err, "remote analysis failed; keeping local suggestions");
                        remote_error = Some(format!("remote analysis failed: {err}"));
                    }
                }
            } else {
                remote_error = Some("proxy token required for remote analysis".into());
            }
        }

        let committed = self.commit(run, &suggestions);
        AnalysisOutcome {
            run,
            committed,
            suggestions,
            metrics: text::compute_metrics(&snapshot),
            remote_error,
        }
    }

    /// Rewrite the buffer in the requested register. Remote when enabled
    /// and configured; deterministic local substitutions otherwise or on
    /// failure. The result replaces the buffer as an undoable edit and
    /// re-triggers analysis.
    pub async fn rewrite(&self, mode: RewriteMode) -> Result<RewriteOutcome, EditError> {
        let trimmed = self.state().buffer.trim().to_string();
        if trimmed.is_empty() {
            return Err(EditError::NothingToRewrite);
        }

        let mut rewritten = None;
        if self.remote_enabled && self.remote.has_token() {
            match self.remote.rewrite(&trimmed, mode).await {
                Ok(output) => rewritten = Some(output),
                Err(err) => {
                    tracing::warn!(error = %err, "remote rewrite failed; using local substitutions");
                }
            }
        }

        let used_remote = rewritten.is_some();
        let output = rewritten.unwrap_or_else(|| heuristics::local_rewrite(&trimmed, mode));
        self.replace_text(&output, true);
        self.schedule_analysis();
        Ok(RewriteOutcome {
            text: output,
            used_remote,
        })
    }

    fn begin_run(&self) -> u64 {
        self.run_counter.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Commit a run's suggestions to the displayed state only while its
    /// token is still the highest issued.
    fn commit(&self, run: u64, suggestions: &SuggestionSet) -> bool {
        let mut state = self.state();
        if run != self.run_counter.load(Ordering::SeqCst) {
            return false;
        }
        state.suggestions = suggestions.clone();
        self.committed.send_replace(suggestions.clone());
        true
    }
}
