use chathub_core::service::{PositionFrequencyScorer, Scorer, SearchEngine};
use chathub_core::storage::{MemoryBackend, Storage};
use chathub_core::types::{CallContext, SearchRequest};
use chathub_core::ConversationStore;

fn cx() -> CallContext {
    CallContext::background()
}

fn store_with(docs: &[(&str, &str)]) -> ConversationStore {
    let store = ConversationStore::new(Storage::new(Box::new(MemoryBackend::new()), "conversations"));
    for (path, content) in docs {
        store.storage().save(&cx(), path, content.as_bytes()).unwrap();
    }
    store
}

fn doc(title: &str, body: &str) -> String {
    format!("---\ntitle: {title}\ndate: 2026-01-10T00:00:00Z\nsource: claude\n---\n\n{body}")
}

#[test]
fn matches_are_case_insensitive_and_carry_title_and_snippet() {
    let store = store_with(&[
        ("conversations/claude/a.md", &doc("Borrowing", "We talked about the Borrow Checker today.")),
        ("conversations/claude/b.md", &doc("Other", "Nothing relevant.")),
    ]);

    let found = store.search(&cx(), &SearchRequest::new("borrow checker")).unwrap();

    assert_eq!(found.total, 1);
    let hit = &found.results[0];
    assert_eq!(hit.path, "conversations/claude/a.md");
    assert_eq!(hit.title, "Borrowing");
    assert_eq!(hit.snippet, "We talked about the Borrow Checker today.");
    assert!((0.0..=1.0).contains(&hit.score));
}

#[test]
fn search_stops_at_limit_in_listing_order() {
    let docs: Vec<(String, String)> = (0..6)
        .map(|i| (format!("conversations/claude/{i}.md"), doc(&format!("t{i}"), "needle")))
        .collect();
    let refs: Vec<(&str, &str)> = docs.iter().map(|(p, c)| (p.as_str(), c.as_str())).collect();
    let store = store_with(&refs);

    let mut request = SearchRequest::new("needle");
    request.limit = Some(3);
    let found = store.search(&cx(), &request).unwrap();

    let paths: Vec<&str> = found.results.iter().map(|hit| hit.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["conversations/claude/0.md", "conversations/claude/1.md", "conversations/claude/2.md"]
    );
    // Total is the number returned, not the number of matching documents.
    assert_eq!(found.total, 3);
}

#[test]
fn results_are_not_reranked_by_score() {
    let store = store_with(&[
        ("conversations/claude/a.md", "filler filler filler filler needle"),
        ("conversations/claude/b.md", "needle needle needle"),
    ]);

    let found = store.search(&cx(), &SearchRequest::new("needle")).unwrap();

    assert_eq!(found.results[0].path, "conversations/claude/a.md");
    assert!(found.results[0].score < found.results[1].score);
}

#[test]
fn header_occurrences_count_towards_score() {
    let with_title = doc("rust", "rust");
    let without_title = doc("other", "rust");
    let store = store_with(&[
        ("conversations/claude/a.md", &with_title),
        ("conversations/claude/b.md", &without_title),
    ]);

    let found = store.search(&cx(), &SearchRequest::new("rust")).unwrap();
    assert_eq!(found.total, 2);

    let scorer = PositionFrequencyScorer;
    let expected = scorer.score_value(&scorer.score(&with_title.to_lowercase(), "rust").unwrap());
    assert!((found.results[0].score - expected).abs() < 1e-12);
    assert!(found.results[0].score > found.results[1].score);
    // Snippet comes from the body even when the first hit is in the header.
    assert_eq!(found.results[0].snippet, "rust");
}

#[test]
fn header_only_match_still_returns_body_snippet() {
    let store = store_with(&[("conversations/claude/a.md", &doc("Lifetimes", "Body text only."))]);

    let found = store.search(&cx(), &SearchRequest::new("lifetimes")).unwrap();
    assert_eq!(found.total, 1);
    assert_eq!(found.results[0].snippet, "Body text only.");
}

#[test]
fn position_component_prefers_early_matches() {
    let scorer = PositionFrequencyScorer;
    let content = "target at the start, then a lot of other words, and target again";
    let early = scorer.score(content, "target").unwrap();
    let late = scorer.score(&content[1..], "target").unwrap();

    assert_eq!(early.first_match, 0);
    assert!(early.position_component() > late.position_component());
    for details in [early, late] {
        let value = scorer.score_value(&details);
        assert!((0.0..=1.0).contains(&value));
    }
}

#[test]
fn source_filter_and_broken_documents() {
    let store = store_with(&[
        ("conversations/claude/a.md", "needle in claude"),
        ("conversations/claude/broken.md", "---\nneedle but never closed"),
        ("conversations/claude/binary.md", "needle"),
        ("conversations/gemini/b.md", "needle in gemini"),
    ]);
    store
        .storage()
        .save(&cx(), "conversations/claude/binary.md", &[b'n', 0xff, 0xfe])
        .unwrap();

    let mut request = SearchRequest::new("needle");
    request.source = Some("claude".into());
    let found = store.search(&cx(), &request).unwrap();

    let paths: Vec<&str> = found.results.iter().map(|hit| hit.path.as_str()).collect();
    assert_eq!(paths, vec!["conversations/claude/a.md"]);
    assert_eq!(found.results[0].title, "");
}

#[test]
fn empty_query_finds_nothing() {
    let store = store_with(&[("conversations/claude/a.md", "anything")]);
    let found = store.search(&cx(), &SearchRequest::new("")).unwrap();
    assert!(found.results.is_empty());
    assert_eq!(found.total, 0);
}

#[test]
fn whitespace_query_is_a_plain_substring() {
    let store = store_with(&[
        ("conversations/claude/a.md", "two  spaces here"),
        ("conversations/claude/b.md", "single spaces only"),
    ]);

    let found = store.search(&cx(), &SearchRequest::new("  ")).unwrap();

    let paths: Vec<&str> = found.results.iter().map(|hit| hit.path.as_str()).collect();
    assert_eq!(paths, vec!["conversations/claude/a.md"]);
    assert_eq!(found.results[0].snippet, "two spaces here");
}

#[test]
fn cancelled_search_fails_instead_of_skipping() {
    let store = store_with(&[("conversations/claude/a.md", "needle")]);
    let cancelled = CallContext::background();
    cancelled.cancel();

    let err = store.search(&cancelled, &SearchRequest::new("needle")).unwrap_err();
    assert!(err.is_interrupted());
}

#[test]
fn custom_context_width() {
    let storage = Storage::new(Box::new(MemoryBackend::new()), "conversations");
    let body = format!("{} needle {}", "a".repeat(50), "b".repeat(50));
    storage.save(&cx(), "conversations/codex/x.md", body.as_bytes()).unwrap();

    let engine = SearchEngine::new(PositionFrequencyScorer).with_context_chars(3);
    let found = engine.search(&storage, &cx(), &SearchRequest::new("needle")).unwrap();

    assert_eq!(found.results[0].snippet, "...aa needle bb...");
}
