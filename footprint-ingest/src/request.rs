//! Network request observation.
//!
//! Requests to a known model API host are counted as one user query each.
//! The token count is estimated from the request body: the prompt text that
//! was sent plus the completion budget the caller asked for.

use footprint_core::{
    ApiProvider, EstimationMode, Role, TokenCount, TrackTokensPayload, estimate_quick,
};
use serde_json::Value;
use url::Url;

use crate::error::IngestError;

/// Completion budget assumed when the request does not name one.
pub const DEFAULT_COMPLETION_TOKENS: u64 = 150;

/// Estimate used when a request carries no body at all.
pub const BODYLESS_REQUEST_TOKENS: u64 = 100;

/// Resolves the API provider of a request URL.
///
/// Returns `Ok(None)` for hosts that are not tracked.
///
/// # Errors
///
/// Returns an error if the URL does not parse or has no host.
pub fn provider_for_url(url: &str) -> Result<Option<ApiProvider>, IngestError> {
    let parsed = Url::parse(url)?;
    let host = parsed
        .host_str()
        .ok_or_else(|| IngestError::MissingHost(url.to_string()))?;
    Ok(ApiProvider::from_hostname(host))
}

/// Estimates the tokens a request will consume.
pub fn estimate_request_tokens(provider: ApiProvider, body: Option<&Value>) -> TokenCount {
    let Some(body) = body else {
        return TokenCount::new(BODYLESS_REQUEST_TOKENS);
    };

    let total = match provider {
        ApiProvider::OpenAI => messages_tokens(body)
            .saturating_add(text_tokens(&body["prompt"]))
            .saturating_add(budget(body, "max_tokens")),
        ApiProvider::Anthropic => messages_tokens(body)
            .saturating_add(text_tokens(&body["prompt"]))
            .saturating_add(budget(body, "max_tokens_to_sample")),
        ApiProvider::Cohere => text_tokens(&body["message"])
            .saturating_add(text_tokens(&body["prompt"]))
            .saturating_add(budget(body, "max_tokens")),
        ApiProvider::Together | ApiProvider::Replicate => estimate_quick(&body.to_string())
            .get()
            .saturating_add(DEFAULT_COMPLETION_TOKENS),
    };

    TokenCount::new(total.max(1))
}

/// Builds the payload for an observed request, or `None` for untracked hosts.
///
/// # Errors
///
/// Returns an error if the URL does not parse or has no host.
pub fn observe_request(
    url: &str,
    body: Option<&Value>,
) -> Result<Option<TrackTokensPayload>, IngestError> {
    let Some(provider) = provider_for_url(url)? else {
        tracing::trace!(url, "ignoring request to untracked host");
        return Ok(None);
    };

    let tokens = estimate_request_tokens(provider, body);
    tracing::debug!(provider = %provider, tokens = tokens.get(), "observed API request");
    Ok(Some(TrackTokensPayload::new(
        tokens,
        provider.display_name(),
        Role::User,
    )))
}

fn text_tokens(value: &Value) -> u64 {
    EstimationMode::Quick.estimate_json(value).get()
}

fn messages_tokens(body: &Value) -> u64 {
    body["messages"].as_array().map_or(0, |messages| {
        messages
            .iter()
            .fold(0, |sum: u64, m| sum.saturating_add(text_tokens(&m["content"])))
    })
}

/// Requested completion budget; a missing or zero budget means the default.
fn budget(body: &Value, field: &str) -> u64 {
    body[field]
        .as_u64()
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_COMPLETION_TOKENS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_for_url() {
        assert_eq!(
            provider_for_url("https://api.openai.com/v1/chat/completions").unwrap(),
            Some(ApiProvider::OpenAI)
        );
        assert_eq!(provider_for_url("https://example.com/v1").unwrap(), None);
        assert!(provider_for_url("not a url").is_err());
    }

    #[test]
    fn test_openai_messages_and_budget() {
        let body = json!({
            "messages": [
                {"role": "system", "content": "You are helpful"},
                {"role": "user", "content": "Hello there"},
                {"role": "user", "content": [{"type": "image"}]}
            ],
            "max_tokens": 50
        });
        // ceil(3*1.3)=4, ceil(2*1.3)=3, array content counts 0
        assert_eq!(estimate_request_tokens(ApiProvider::OpenAI, Some(&body)).get(), 57);
    }

    #[test]
    fn test_anthropic_default_budget() {
        let body = json!({"prompt": "\n\nHuman: hi\n\nAssistant:"});
        // 3 words -> 4, plus default 150
        assert_eq!(estimate_request_tokens(ApiProvider::Anthropic, Some(&body)).get(), 154);
    }

    #[test]
    fn test_cohere_message() {
        let body = json!({"message": "one two", "max_tokens": 10});
        assert_eq!(estimate_request_tokens(ApiProvider::Cohere, Some(&body)).get(), 13);
    }

    #[test]
    fn test_generic_body_and_missing_body() {
        let body = json!({"input": "a b"});
        let serialized_words = estimate_quick(&body.to_string()).get();
        assert_eq!(
            estimate_request_tokens(ApiProvider::Replicate, Some(&body)).get(),
            serialized_words + 150
        );
        assert_eq!(estimate_request_tokens(ApiProvider::Together, None).get(), 100);
    }

    #[test]
    fn test_zero_budget_uses_default() {
        let body = json!({"prompt": "hello there", "max_tokens": 0});
        assert_eq!(estimate_request_tokens(ApiProvider::OpenAI, Some(&body)).get(), 153);
    }

    #[test]
    fn test_huge_budget_saturates() {
        let body = json!({"prompt": "hello there", "max_tokens": u64::MAX});
        assert_eq!(
            estimate_request_tokens(ApiProvider::OpenAI, Some(&body)).get(),
            u64::MAX
        );
        let payload = observe_request("https://api.openai.com/v1/completions", Some(&body))
            .unwrap()
            .unwrap();
        assert_eq!(payload.tokens, i64::MAX);

        let body = json!({"message": "hi", "max_tokens": u64::MAX - 1});
        assert_eq!(
            estimate_request_tokens(ApiProvider::Cohere, Some(&body)).get(),
            u64::MAX
        );
    }

    #[test]
    fn test_non_string_prompt_counts_zero() {
        let body = json!({"prompt": {"text": "ignored"}, "max_tokens": 7});
        assert_eq!(estimate_request_tokens(ApiProvider::OpenAI, Some(&body)).get(), 7);
    }

    #[test]
    fn test_observe_request_counts_user_query() {
        let payload = observe_request("https://api.cohere.ai/v1/chat", None)
            .unwrap()
            .unwrap();
        assert_eq!(payload.provider, "Cohere");
        assert_eq!(payload.message_type, Role::User);
        assert_eq!(payload.tokens, 100);

        assert!(observe_request("https://example.org/", None).unwrap().is_none());
    }
}
