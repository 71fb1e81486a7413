use std::collections::BTreeMap;

use chathub_core::types::{
    AppendOutcome, ConversationSummary, ConversationView, DeleteOutcome, ListPage, SaveOutcome,
    SearchHit, SearchResults,
};
use serde_json::{json, Value};

fn key_order(json_str: &str, keys: &[&str]) {
    let positions: Vec<usize> = keys
        .iter()
        .map(|key| {
            json_str
                .find(&format!("\"{key}\":"))
                .unwrap_or_else(|| panic!("missing key {key} in {json_str}"))
        })
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "keys out of order in {json_str}");
}

#[test]
fn golden_save_outcome() {
    let outcome = SaveOutcome {
        path: "conversations/claude/2026-01-10_chat.md".into(),
        conversation_id: "conv_1".into(),
    };

    let value = serde_json::to_value(&outcome).unwrap();
    assert_eq!(
        value,
        json!({
            "path": "conversations/claude/2026-01-10_chat.md",
            "conversation_id": "conv_1",
        })
    );
    key_order(&serde_json::to_string(&outcome).unwrap(), &["path", "conversation_id"]);
}

#[test]
fn golden_conversation_view() {
    let mut metadata = BTreeMap::new();
    metadata.insert("conversation_id".to_string(), "conv_1".to_string());
    metadata.insert("author".to_string(), "claude".to_string());

    let view = ConversationView {
        path: "conversations/claude/2026-01-10_chat.md".into(),
        content: "---\ntitle: Chat\n---\n\nbody".into(),
        version: "sha256:abc".into(),
        title: "Chat".into(),
        date: "2026-01-10T14:30:00Z".into(),
        source: "claude".into(),
        tags: vec!["rust".into()],
        description: "body".into(),
        metadata,
    };

    let json_str = serde_json::to_string(&view).unwrap();
    key_order(
        &json_str,
        &["path", "content", "version", "title", "date", "source", "tags", "description", "metadata"],
    );

    // Metadata keys are sorted.
    let parsed: Value = serde_json::from_str(&json_str).unwrap();
    let meta: Vec<&String> = parsed["metadata"].as_object().unwrap().keys().collect();
    assert_eq!(meta, vec!["author", "conversation_id"]);
}

#[test]
fn golden_view_without_header_omits_empty_fields() {
    let view = ConversationView {
        path: "c/x.md".into(),
        content: "plain".into(),
        version: "sha256:abc".into(),
        title: String::new(),
        date: String::new(),
        source: String::new(),
        tags: Vec::new(),
        description: String::new(),
        metadata: BTreeMap::new(),
    };

    let value = serde_json::to_value(&view).unwrap();
    let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
    for absent in ["tags", "description", "metadata"] {
        assert!(!keys.iter().any(|k| k.as_str() == absent), "{absent} should be omitted");
    }
    assert_eq!(value["title"], "");
}

#[test]
fn golden_list_page() {
    let page = ListPage {
        conversations: vec![ConversationSummary {
            path: "conversations/claude/2026-01-10_chat.md".into(),
            title: "Chat".into(),
            date: "2026-01-10".into(),
            source: "claude".into(),
            tags: vec![],
            description: String::new(),
        }],
        total: 7,
        has_more: true,
    };

    let json_str = serde_json::to_string(&page).unwrap();
    key_order(&json_str, &["conversations", "total", "has_more"]);
    key_order(&json_str, &["path", "title", "date", "source"]);

    let back: ListPage = serde_json::from_str(&json_str).unwrap();
    assert_eq!(back, page);
}

#[test]
fn golden_search_results() {
    let results = SearchResults {
        results: vec![SearchHit {
            path: "conversations/codex/2026-01-10_x.md".into(),
            title: "X".into(),
            snippet: "...needle...".into(),
            score: 0.55,
        }],
        total: 1,
    };

    let json_str = serde_json::to_string(&results).unwrap();
    key_order(&json_str, &["results", "total"]);
    key_order(&json_str, &["path", "title", "snippet", "score"]);

    let value: Value = serde_json::from_str(&json_str).unwrap();
    assert_eq!(value["results"][0]["score"], json!(0.55));
}

#[test]
fn golden_append_and_delete() {
    let counted = AppendOutcome { path: "c/a.md".into(), message_count: Some(3) };
    assert_eq!(
        serde_json::to_value(&counted).unwrap(),
        json!({ "path": "c/a.md", "message_count": 3 })
    );

    let uncounted = AppendOutcome { path: "c/a.md".into(), message_count: None };
    assert_eq!(serde_json::to_value(&uncounted).unwrap(), json!({ "path": "c/a.md" }));

    let deleted = DeleteOutcome { deleted: false, message: "conversation not found: c/a.md".into() };
    assert_eq!(
        serde_json::to_value(&deleted).unwrap(),
        json!({ "deleted": false, "message": "conversation not found: c/a.md" })
    );
}
