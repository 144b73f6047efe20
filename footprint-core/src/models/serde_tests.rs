//! Serde tests for core types.
//!
//! These pin the JSON shapes shared with the persisted store and the
//! command protocol.

use chrono::NaiveDate;

use crate::{ApiProvider, DailyLedger, ImpactLevel, ProviderKind, Role, TokenCount, TrackTokensPayload};

// ============================================================================
// ProviderKind
// ============================================================================

#[test]
fn test_provider_kind_serde_roundtrip_all_variants() {
    for kind in ProviderKind::all() {
        let json = serde_json::to_string(kind).unwrap();
        let deserialized: ProviderKind = serde_json::from_str(&json).unwrap();
        assert_eq!(*kind, deserialized, "Round-trip failed for {:?}", kind);
    }
}

#[test]
fn test_provider_kind_deserialize_lowercase() {
    let test_cases = vec![
        (r#""chatgpt""#, ProviderKind::ChatGpt),
        (r#""claude""#, ProviderKind::Claude),
        (r#""gemini""#, ProviderKind::Gemini),
        (r#""bard""#, ProviderKind::Bard),
    ];

    for (json, expected) in test_cases {
        let result: ProviderKind = serde_json::from_str(json).unwrap();
        assert_eq!(result, expected, "Failed for {}", json);
    }
}

#[test]
fn test_provider_kind_invalid_deserialize() {
    let result: Result<ProviderKind, _> = serde_json::from_str(r#""copilot""#);
    assert!(result.is_err());
}

#[test]
fn test_api_provider_serializes_display_casing() {
    assert_eq!(serde_json::to_string(&ApiProvider::OpenAI).unwrap(), r#""OpenAI""#);
}

// ============================================================================
// Turn Types
// ============================================================================

#[test]
fn test_role_lowercase() {
    assert_eq!(serde_json::to_string(&Role::User).unwrap(), r#""user""#);
    assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), r#""assistant""#);
}

#[test]
fn test_token_count_is_transparent() {
    assert_eq!(serde_json::to_string(&TokenCount::new(42)).unwrap(), "42");
    let parsed: TokenCount = serde_json::from_str("7").unwrap();
    assert_eq!(parsed.get(), 7);
}

#[test]
fn test_token_count_rejects_negative_json() {
    let result: Result<TokenCount, _> = serde_json::from_str("-4");
    assert!(result.is_err());
}

#[test]
fn test_payload_skips_missing_turn_key() {
    let payload = TrackTokensPayload::new(TokenCount::new(9), "Claude", Role::Assistant);
    let json = serde_json::to_value(&payload).unwrap();
    assert!(json.get("turnKey").is_none());
    assert_eq!(json["messageType"], "assistant");
}

#[test]
fn test_payload_negative_tokens_parse_but_fail_validation() {
    let payload: TrackTokensPayload =
        serde_json::from_str(r#"{"tokens": -12, "messageType": "user"}"#).unwrap();
    assert!(payload.token_count().is_err());
}

// ============================================================================
// Ledger
// ============================================================================

#[test]
fn test_ledger_roundtrip() {
    let mut ledger = DailyLedger::new(NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
    ledger.apply(TokenCount::new(333), Role::User);

    let json = serde_json::to_string(&ledger).unwrap();
    let back: DailyLedger = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ledger);
}

#[test]
fn test_impact_level_lowercase() {
    assert_eq!(serde_json::to_string(&ImpactLevel::Medium).unwrap(), r#""medium""#);
}
