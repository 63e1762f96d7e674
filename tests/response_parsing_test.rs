//! Integration tests for chat-completion response parsing with realistic
//! provider payloads.

use gitscribe::ProviderError;
use gitscribe::llm::{Usage, parse_completion};

#[test]
fn test_openai_payload() {
    let body = r#"{
      "id": "chatcmpl-AbC123",
      "object": "chat.completion",
      "created": 1730000000,
      "model": "gpt-4o-2024-08-06",
      "choices": [
        {
          "index": 0,
          "message": {
            "role": "assistant",
            "content": "```\nfeat(auth): cache exchanged access tokens\n\nReuse the token until it expires.\n```",
            "refusal": null
          },
          "logprobs": null,
          "finish_reason": "stop"
        }
      ],
      "usage": {"prompt_tokens": 812, "completion_tokens": 24, "total_tokens": 836},
      "system_fingerprint": "fp_123"
    }"#;

    let completion = parse_completion(body).unwrap();
    assert_eq!(
        completion.message,
        "feat(auth): cache exchanged access tokens\n\nReuse the token until it expires."
    );
    assert_eq!(
        completion.usage,
        Some(Usage {
            input_tokens: 812,
            output_tokens: 24
        })
    );
}

#[test]
fn test_copilot_payload_with_filter_results() {
    let body = r#"{
      "choices": [
        {
          "content_filter_results": {"hate": {"filtered": false, "severity": "safe"}},
          "finish_reason": "stop",
          "index": 0,
          "message": {"content": "fix(git): pass --no-ext-diff", "role": "assistant"}
        }
      ],
      "created": 1730000000,
      "id": "chatcmpl-xyz",
      "model": "gpt-4o-2024-11-20",
      "prompt_filter_results": [{"content_filter_results": {}, "prompt_index": 0}],
      "usage": {"completion_tokens": 9, "prompt_tokens": 400, "total_tokens": 409}
    }"#;

    let completion = parse_completion(body).unwrap();
    assert_eq!(completion.message, "fix(git): pass --no-ext-diff");
    assert_eq!(completion.usage.unwrap().output_tokens, 9);
}

#[test]
fn test_legacy_text_completion_payload() {
    let body = r#"{"object": "text_completion", "choices": [{"text": "\n\nchore: bump deps\n", "index": 0}]}"#;

    let completion = parse_completion(body).unwrap();
    assert_eq!(completion.message, "chore: bump deps");
    assert!(completion.usage.is_none());
}

#[test]
fn test_result_payload_with_alternate_usage_names() {
    let body = r#"{"result": [{"content": "`docs: fix typo`"}], "usage": {"input_tokens": 50, "output_tokens": 5}}"#;

    let completion = parse_completion(body).unwrap();
    assert_eq!(completion.message, "docs: fix typo");
    assert_eq!(
        completion.usage,
        Some(Usage {
            input_tokens: 50,
            output_tokens: 5
        })
    );
}

#[test]
fn test_openai_error_payload() {
    let body = r#"{
      "error": {
        "message": "The model `gpt-9` does not exist or you do not have access to it.",
        "type": "invalid_request_error",
        "param": null,
        "code": "model_not_found"
      }
    }"#;

    let err = parse_completion(body).unwrap_err();
    assert!(matches!(err, ProviderError::Api(_)));
    assert_eq!(
        err.to_string(),
        "The model `gpt-9` does not exist or you do not have access to it."
    );
}

#[test]
fn test_empty_choices_is_unexpected_format() {
    let err = parse_completion(r#"{"choices": []}"#).unwrap_err();
    assert_eq!(err.to_string(), "unexpected response format");
}

#[test]
fn test_gateway_html_is_unexpected_format() {
    let err = parse_completion("<html><body>504 Gateway Time-out</body></html>").unwrap_err();
    assert!(matches!(err, ProviderError::UnexpectedFormat));
}
