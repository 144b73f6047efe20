//! Adapter session tests.
//!
//! Covers adapter activation, turn deduplication, settling and the
//! streaming driver.

use footprint_core::{ProviderKind, Role, TrackTokensPayload};
use futures::channel::mpsc as fmpsc;
use futures::stream;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::element::RenderedElement;
use crate::error::IngestError;
use crate::session::{AdapterSession, Observation, SessionOptions, SessionStats};

const CLAUDE_URL: &str = "https://claude.ai/chat/3f1c";
const CHATGPT_URL: &str = "https://chatgpt.com/c/77aa";
const GEMINI_URL: &str = "https://gemini.google.com/app/91b2";

fn session_at(url: &str) -> AdapterSession {
    let mut session = AdapterSession::new(SessionOptions::default());
    session.navigate(url).unwrap();
    session
}

fn claude_turn(author: bool, text: &str) -> RenderedElement {
    RenderedElement::new("div")
        .with_attr("data-is-author", if author { "true" } else { "false" })
        .with_text(text)
}

fn chatgpt_reply(start: u32, end: u32, text: &str) -> RenderedElement {
    RenderedElement::new("p")
        .with_attr("data-start", start.to_string())
        .with_attr("data-end", end.to_string())
        .with_text(text)
}

// ============================================================================
// Activation
// ============================================================================

#[test]
fn test_unknown_host_activates_nothing() {
    let mut session = session_at("https://example.com/chat");

    assert!(session.adapter().is_none());
    assert_eq!(session.provider_label(), "Unknown");
    assert!(session.process_element(0, &claude_turn(true, "hello there")).is_none());
    assert!(session.process_draft("hello there", None).is_none());
}

#[test]
fn test_disabled_adapter_does_not_activate() {
    let mut options = SessionOptions::default();
    options.enabled.remove(&ProviderKind::Claude);
    let mut session = AdapterSession::new(options);
    session.navigate(CLAUDE_URL).unwrap();

    assert!(session.adapter().is_none());
}

#[test]
fn test_settle_override_applies() {
    let mut options = SessionOptions::default();
    options
        .settle_overrides
        .insert(ProviderKind::Claude, Duration::from_millis(250));
    let mut session = AdapterSession::new(options);

    session.navigate(CLAUDE_URL).unwrap();
    assert_eq!(session.settle_timeout(), Duration::from_millis(250));

    session.navigate(CHATGPT_URL).unwrap();
    assert_eq!(session.settle_timeout(), Duration::from_secs(1));
}

#[test]
fn test_bad_url_leaves_session_inactive() {
    let mut session = session_at(CLAUDE_URL);
    assert!(session.navigate("not a url").is_err());
    assert!(session.adapter().is_none());
}

// ============================================================================
// Extraction and Dedupe
// ============================================================================

#[test]
fn test_same_turn_twice_submits_once() {
    let mut session = session_at(CLAUDE_URL);
    let turn = claude_turn(false, "The quick brown fox jumps over the lazy dog");

    let first = session.process_element(0, &turn).unwrap();
    assert!(session.process_element(0, &turn).is_none());

    assert_eq!(first.tokens, 12);
    assert_eq!(first.provider, "Claude");
    assert_eq!(first.message_type, Role::Assistant);
    assert_eq!(first.message_preview, "The quick brown fox jumps over the lazy dog");
    assert_eq!(
        first.turn_key.as_deref(),
        Some("claude:/chat/3f1c:assistant-0-The-quick-brown-fox-")
    );
    assert_eq!(session.processed_count(), 1);
}

#[test]
fn test_streaming_turn_waits_until_settled() {
    let mut session = session_at(CLAUDE_URL);
    let streaming = claude_turn(false, "Partial ans").with_attr("data-is-streaming", "true");

    assert!(session.process_element(1, &streaming).is_none());
    assert_eq!(session.processed_count(), 0);

    let done = claude_turn(false, "Partial answer, now complete.");
    assert!(session.process_element(1, &done).is_some());
}

#[test]
fn test_short_text_ignored() {
    let mut session = session_at(CLAUDE_URL);
    assert!(session.process_element(0, &claude_turn(true, "  o\n\t ")).is_none());
    assert!(session.process_element(0, &claude_turn(true, "okay")).is_some());
}

#[test]
fn test_page_snapshot_extracts_each_turn_once() {
    let mut session = session_at(CHATGPT_URL);
    let page = RenderedElement::new("main")
        .with_child(
            RenderedElement::new("div")
                .with_class("user-message-bubble-color")
                .with_child(
                    RenderedElement::new("div")
                        .with_class("whitespace-pre-wrap")
                        .with_text("Explain ownership"),
                ),
        )
        .with_child(chatgpt_reply(0, 30, "Ownership is a set of rules."))
        .with_child(chatgpt_reply(31, 70, "Each value has one owner."));

    let payloads = session.process_page(&page);
    let roles: Vec<_> = payloads.iter().map(|p| p.message_type).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::Assistant]);
    assert_eq!(
        payloads[1].turn_key.as_deref(),
        Some("chatgpt:/c/77aa:assistant-0-30")
    );

    assert!(session.process_page(&page).is_empty());
}

#[test]
fn test_drafts_only_counted_where_user_turns_are_invisible() {
    let mut chatgpt = session_at(CHATGPT_URL);
    assert!(chatgpt.process_draft("What is a borrow checker?", None).is_none());

    let mut gemini = session_at(GEMINI_URL);
    let draft = gemini.process_draft("What is a borrow checker?", None).unwrap();
    assert_eq!(draft.message_type, Role::User);
    assert_eq!(draft.provider, "Gemini");
    // quick estimate: ceil(5 * 1.3)
    assert_eq!(draft.tokens, 7);

    assert!(gemini.process_draft("What is a borrow checker?", Some(0)).is_none());
    assert!(gemini.process_draft("What is a borrow checker?", None).is_some());
}

#[test]
fn test_navigation_starts_a_new_conversation() {
    let mut session = session_at(CLAUDE_URL);
    let turn = claude_turn(true, "hello again");
    assert!(session.process_element(0, &turn).is_some());

    session.navigate("https://claude.ai/chat/other").unwrap();
    let payload = session.process_element(0, &turn).unwrap();
    assert_eq!(
        payload.turn_key.as_deref(),
        Some("claude:/chat/other:user-0-hello-again")
    );
}

#[test]
fn test_request_observation() {
    let session = AdapterSession::new(SessionOptions::default());
    let body = serde_json::json!({"messages": [{"content": "hi there"}], "max_tokens": 10});

    let payload = session
        .process_request("https://api.openai.com/v1/chat/completions", Some(&body))
        .unwrap()
        .unwrap();
    assert_eq!(payload.provider, "OpenAI");
    assert_eq!(payload.tokens, 13);
    assert!(payload.timestamp.is_some());

    assert!(session.process_request("https://example.com/api", None).unwrap().is_none());
}

// ============================================================================
// Streaming
// ============================================================================

fn fast_session() -> AdapterSession {
    AdapterSession::new(SessionOptions::default().with_uniform_settle(Duration::from_millis(20)))
}

async fn drain(mut rx: mpsc::Receiver<TrackTokensPayload>) -> Vec<TrackTokensPayload> {
    let mut out = Vec::new();
    while let Some(p) = rx.recv().await {
        out.push(p);
    }
    out
}

#[tokio::test]
async fn test_run_keeps_latest_rendering() {
    let observations = vec![
        Ok(Observation::Navigate {
            url: CLAUDE_URL.to_string(),
        }),
        Ok(Observation::Element {
            index: 0,
            element: claude_turn(false, "Streaming so").with_attr("data-is-streaming", "true"),
        }),
        Ok(Observation::Element {
            index: 0,
            element: claude_turn(false, "Streaming so far and now finished"),
        }),
    ];
    let (tx, rx) = mpsc::channel(8);

    let stats = fast_session().run(stream::iter(observations), tx).await.unwrap();
    let payloads = drain(rx).await;

    assert_eq!(stats, SessionStats { emitted: 1, invalid: 0 });
    assert_eq!(payloads.len(), 1);
    assert_eq!(payloads[0].message_preview, "Streaming so far and now finished");
}

#[tokio::test]
async fn test_run_emits_after_settle_timeout() {
    let (obs_tx, obs_rx) = fmpsc::unbounded();
    let (tx, mut rx) = mpsc::channel(8);
    let task = tokio::spawn(fast_session().run(obs_rx, tx));

    obs_tx
        .unbounded_send(Ok(Observation::Navigate {
            url: CLAUDE_URL.to_string(),
        }))
        .unwrap();
    obs_tx
        .unbounded_send(Ok(Observation::Element {
            index: 0,
            element: claude_turn(true, "How do lifetimes work?"),
        }))
        .unwrap();

    // The feed is still open, so this payload comes from the settle timer.
    let payload = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(payload.message_type, Role::User);

    drop(obs_tx);
    let stats = task.await.unwrap().unwrap();
    assert_eq!(stats.emitted, 1);
}

#[tokio::test]
async fn test_run_skips_invalid_entries() {
    let bad_line = serde_json::from_str::<Observation>("{").unwrap_err();
    let observations = vec![
        Ok(Observation::Navigate {
            url: GEMINI_URL.to_string(),
        }),
        Err(IngestError::InvalidObservation {
            line: 2,
            source: bad_line,
        }),
        Ok(Observation::Navigate {
            url: "::".to_string(),
        }),
        Ok(Observation::Draft {
            text: "ignored, no adapter after bad navigation".to_string(),
            index: None,
        }),
        Ok(Observation::Request {
            url: "https://api.anthropic.com/v1/complete".to_string(),
            body: None,
        }),
    ];
    let (tx, rx) = mpsc::channel(8);

    let stats = fast_session().run(stream::iter(observations), tx).await.unwrap();
    let payloads = drain(rx).await;

    assert_eq!(stats, SessionStats { emitted: 1, invalid: 2 });
    assert_eq!(payloads[0].provider, "Anthropic");
    assert_eq!(payloads[0].tokens, 100);
}

#[tokio::test]
async fn test_run_fails_when_queue_closes() {
    let observations = vec![Ok(Observation::Request {
        url: "https://api.openai.com/v1/chat/completions".to_string(),
        body: None,
    })];
    let (tx, rx) = mpsc::channel(1);
    drop(rx);

    let err = fast_session()
        .run(stream::iter(observations), tx)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::QueueClosed));
}
