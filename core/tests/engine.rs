use cdraft_core::{
    apply_all, apply_one, compute_metrics, local_rewrite, normalize, Category, Config,
    DetectorSet, EditError, HeuristicConfig, RewriteMode, Session, Severity, Suggestion,
    SuggestionSet, UndoStack,
};

fn detectors() -> DetectorSet {
    DetectorSet::new(&HeuristicConfig::default()).unwrap()
}

fn detect(text: &str) -> SuggestionSet {
    detectors().detect(text)
}

fn assert_spans_valid(set: &SuggestionSet, snapshot: &str) {
    for suggestion in set.iter() {
        assert!(
            suggestion.span_valid(snapshot),
            "span {:?} of `{}` is invalid for a snapshot of {} bytes",
            suggestion.span,
            suggestion.id,
            snapshot.len()
        );
    }
}

const DEMO_TEXT: &str = "I literally  think this is basically a good idea, however it was considered and then it was decided.\n\
The colours, flavours, and textures are vibrant, delicious and memorable.\n\
We invited product, design and operations to the workshop.\n\
This is not only clear but also  clear.  There  are multiple   spaces. And and duplicated words.\n\
American spelling: color organize analyze.";

#[test]
fn normalize_is_idempotent() {
    let samples = [
        DEMO_TEXT,
        "mixed\r\nline\rendings",
        "curly \u{201C}quotes\u{201D} and\u{00A0}spaces  \nhere",
        "",
    ];
    for sample in samples {
        let once = normalize(sample);
        assert_eq!(normalize(&once), once);
    }
}

#[test]
fn normalize_applies_all_four_rules() {
    let input = "one\r\ntwo\u{00A0}three  \nfour \u{201C}five\u{2019}";
    assert_eq!(normalize(input), "one\ntwo three\nfour \"five'");
}

#[test]
fn every_detector_span_is_valid_on_the_demo_text() {
    let snapshot = normalize(DEMO_TEXT);
    let set = detect(&snapshot);
    assert!(!set.is_empty());
    assert_spans_valid(&set, &snapshot);
}

#[test]
fn repeated_word_scenario() {
    let set = detect("this is is fine");
    let repeat = set
        .grammar
        .iter()
        .find(|s| s.id.starts_with("repeat-"))
        .expect("repeated-word suggestion");
    assert_eq!(repeat.category, Category::Grammar);
    assert_eq!(repeat.severity, Severity::Medium);
    assert_eq!(repeat.span, (5, 10));
    assert_eq!(repeat.replacement.as_deref(), Some("is"));

    let outcome = apply_one("this is is fine", repeat).unwrap();
    assert_eq!(outcome.text, "this is fine");
}

#[test]
fn multi_space_collapse_scenario() {
    let set = detect("a  b");
    let space = set
        .grammar
        .iter()
        .find(|s| s.id.starts_with("space-"))
        .expect("multi-space suggestion");
    assert_eq!(space.span, (1, 3));

    let outcome = apply_one("a  b", space).unwrap();
    assert_eq!(outcome.text, "a b");
    assert_eq!(outcome.cursor, (1, 2));
}

#[test]
fn bulk_apply_with_shifting_lengths() {
    let text = "color and organize";
    let set = detect(text);
    let spans: Vec<_> = set.grammar.iter().map(|s| s.span).collect();
    assert!(spans.contains(&(0, 5)));
    assert!(spans.contains(&(10, 18)));

    let (updated, count) = apply_all(text, &set).unwrap();
    assert_eq!(updated, "colour and organise");
    assert_eq!(count, 2);
}

#[test]
fn oxford_comma_scenario() {
    let text = "We invited product, design and operations to the workshop.";
    let set = detect(text);
    assert_eq!(set.clarity.len(), 1);

    let outcome = apply_one(text, &set.clarity[0]).unwrap();
    assert_eq!(
        outcome.text,
        "We invited product, design, and operations to the workshop."
    );
}

#[test]
fn passive_voice_is_flag_only_and_rejects_apply() {
    let set = detect("It was considered and then it was decided.");
    assert_eq!(set.tone.len(), 2);
    let err = apply_one("It was considered and then it was decided.", &set.tone[0]);
    assert_eq!(err.unwrap_err(), EditError::NoAutomaticFix);
}

#[test]
fn disjoint_patches_are_order_independent() {
    let text = "ab123cd4567ef";
    let first = Suggestion {
        id: "a".into(),
        category: Category::Grammar,
        severity: Severity::Low,
        message: "first".into(),
        span: (2, 5),
        replacement: Some("X".into()),
    };
    let second = Suggestion {
        id: "b".into(),
        category: Category::Grammar,
        severity: Severity::Low,
        message: "second".into(),
        span: (10, 12),
        replacement: Some("Y".into()),
    };

    let forward = SuggestionSet {
        grammar: vec![first.clone(), second.clone()],
        ..SuggestionSet::default()
    };
    let backward = SuggestionSet {
        grammar: vec![second, first],
        ..SuggestionSet::default()
    };

    let (from_forward, _) = apply_all(text, &forward).unwrap();
    let (from_backward, _) = apply_all(text, &backward).unwrap();
    assert_eq!(from_forward, from_backward);

    // Equal to replacing the two disjoint substrings independently.
    let mut expected = text.to_string();
    expected.replace_range(10..12, "Y");
    expected.replace_range(2..5, "X");
    assert_eq!(from_forward, expected);
}

#[test]
fn undo_stack_skips_consecutive_duplicates() {
    let mut undo = UndoStack::default();
    undo.push("draft one".into());
    undo.push("draft one".into());
    assert_eq!(undo.len(), 1);
    assert_eq!(undo.pop().as_deref(), Some("draft one"));
    assert!(undo.pop().is_none());
}

#[test]
fn metrics_scenario() {
    let metrics = compute_metrics("The quick brown fox jumps over the lazy dog.");
    assert_eq!(metrics.word_count, 9);
    assert_eq!(metrics.char_count, 44);
    assert_eq!(metrics.reading_minutes, 1);
    assert_eq!(metrics.readability_score, 94);
}

#[test]
fn local_rewrite_tables_cover_each_mode() {
    assert_eq!(
        local_rewrite("We utilise approximately ten", RewriteMode::Simplify),
        "We use about ten"
    );
    assert_eq!(
        local_rewrite("however we commence subsequently", RewriteMode::Friendly),
        "but we commence subsequently"
    );
}

#[tokio::test]
async fn analysis_cycle_commits_against_the_session() {
    let session = Session::new(&Config::default()).unwrap();
    session.replace_text("this is is fine", false);

    let outcome = session.analyze().await;
    assert!(outcome.committed);
    assert!(outcome.remote_error.is_none());
    assert_eq!(outcome.suggestions.grammar.len(), 1);
    assert_eq!(session.suggestions().grammar.len(), 1);
    assert_spans_valid(&outcome.suggestions, &session.text());
}

#[tokio::test]
async fn apply_all_then_undo_round_trips() {
    let session = Session::new(&Config::default()).unwrap();
    session.replace_text("color and organize", false);
    session.analyze().await;

    let applied = session.apply_all().unwrap();
    assert_eq!(applied, 2);
    assert_eq!(session.text(), "colour and organise");

    session.undo().unwrap();
    assert_eq!(session.text(), "color and organize");
    assert_eq!(session.undo().unwrap_err(), EditError::NothingToUndo);
}

#[tokio::test]
async fn apply_single_suggestion_reselects_the_patch() {
    let session = Session::new(&Config::default()).unwrap();
    session.replace_text("a  b", false);
    let outcome = session.analyze().await;

    let cursor = session
        .apply_suggestion(&outcome.suggestions.grammar[0])
        .unwrap();
    assert_eq!(session.text(), "a b");
    assert_eq!(cursor, (1, 2));
}

#[tokio::test]
async fn rewrite_falls_back_to_local_tables_when_remote_is_disabled() {
    let session = Session::new(&Config::default()).unwrap();
    session.replace_text("We utilise approximately ten", false);

    let outcome = session.rewrite(RewriteMode::Simplify).await.unwrap();
    assert!(!outcome.used_remote);
    assert_eq!(outcome.text, "We use about ten");
    assert_eq!(session.text(), "We use about ten");

    session.undo().unwrap();
    assert_eq!(session.text(), "We utilise approximately ten");
}

#[tokio::test]
async fn subscribers_see_committed_sets() {
    let session = Session::new(&Config::default()).unwrap();
    let mut receiver = session.subscribe();

    session.replace_text("color", false);
    session.analyze().await;

    receiver.changed().await.unwrap();
    assert_eq!(receiver.borrow().grammar.len(), 1);
}
