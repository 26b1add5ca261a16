use std::ops::ControlFlow;

use omnillm::config::StreamConfig;
use omnillm::stream::drive_byte_stream;
use omnillm::{
    ChunkSink, FinishReason, PartCollector, ProviderKind, StreamOptions, StreamPart,
    StreamPipeline,
};
use serde_json::json;

fn sse(records: &[(Option<&str>, serde_json::Value)]) -> Vec<u8> {
    let mut out = String::new();
    for (event, data) in records {
        if let Some(event) = event {
            out.push_str("event: ");
            out.push_str(event);
            out.push('\n');
        }
        out.push_str("data: ");
        out.push_str(&data.to_string());
        out.push_str("\n\n");
    }
    out.into_bytes()
}

fn run(provider: ProviderKind, chunks: &[&[u8]]) -> PartCollector {
    let mut pipeline = StreamPipeline::new(provider, StreamOptions::default(), PartCollector::new());
    for chunk in chunks {
        if pipeline.on_chunk(chunk).is_break() {
            break;
        }
    }
    pipeline.on_complete();
    pipeline.into_consumer()
}

fn anthropic_body() -> Vec<u8> {
    sse(&[
        (
            Some("message_start"),
            json!({"message": {"id": "msg_1", "model": "claude-x"}}),
        ),
        (
            Some("content_block_start"),
            json!({"index": 0, "content_block": {"type": "text"}}),
        ),
        (
            Some("content_block_delta"),
            json!({"index": 0, "delta": {"type": "text_delta", "text": "Bonjour ☀️"}}),
        ),
        (Some("content_block_stop"), json!({"index": 0})),
        (
            Some("message_delta"),
            json!({"delta": {"stop_reason": "end_turn"}, "usage": {"output_tokens": 4}}),
        ),
        (Some("message_stop"), json!({"type": "message_stop"})),
    ])
}

fn openai_tool_body() -> Vec<u8> {
    let mut body = sse(&[
        (
            None,
            json!({"id": "c1", "model": "gpt-x", "choices": [{"index": 0, "delta": {"tool_calls": [{"index": 0, "function": {"name": "get_weather"}}]}}]}),
        ),
        (
            None,
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [{"index": 0, "function": {"arguments": "{\"c"}}]}}]}),
        ),
        (
            None,
            json!({"choices": [{"index": 0, "delta": {"tool_calls": [{"index": 0, "function": {"arguments": "ity\":\"NYC\"}"}}]}}]}),
        ),
        (
            None,
            json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
        ),
    ]);
    body.extend_from_slice(b"data: [DONE]\n\n");
    body
}

#[test]
fn test_anthropic_text_scenario_order() {
    let collector = run(ProviderKind::Anthropic, &[&anthropic_body()]);
    assert_eq!(
        collector.labels(),
        vec![
            "stream-start",
            "response-metadata",
            "text-start",
            "text-delta",
            "text-end",
            "finish"
        ]
    );
    assert_eq!(
        collector.parts[1],
        StreamPart::ResponseMetadata {
            id: Some("msg_1".into()),
            model: Some("claude-x".into()),
        }
    );
    assert_eq!(collector.parts[2], StreamPart::TextStart { id: "0".into() });
    assert_eq!(collector.parts[4], StreamPart::TextEnd { id: "0".into() });
    assert_eq!(collector.text(), "Bonjour ☀️");
    assert!(matches!(
        collector.parts.last(),
        Some(StreamPart::Finish { reason: FinishReason::Stop, usage }) if usage.output.total == Some(4)
    ));
}

#[test]
fn test_openai_tool_scenario_emits_one_tool_call() {
    let collector = run(ProviderKind::OpenAi, &[&openai_tool_body()]);
    let calls: Vec<_> = collector
        .parts
        .iter()
        .filter(|part| matches!(part, StreamPart::ToolCall { .. }))
        .collect();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0],
        &StreamPart::ToolCall {
            id: "call_0".into(),
            name: "get_weather".into(),
            input: json!({"city": "NYC"}),
        }
    );
    assert!(matches!(
        collector.parts.last(),
        Some(StreamPart::Finish {
            reason: FinishReason::ToolCalls,
            ..
        })
    ));
}

#[test]
fn test_output_is_independent_of_chunk_boundaries() {
    for (provider, body) in [
        (ProviderKind::Anthropic, anthropic_body()),
        (ProviderKind::OpenAi, openai_tool_body()),
    ] {
        let whole = run(provider, &[&body]).parts;
        for split in 0..=body.len() {
            let parts = run(provider, &[&body[..split], &body[split..]]).parts;
            assert_eq!(parts, whole, "{provider} split at {split}");
        }
        let bytewise: Vec<&[u8]> = body.chunks(1).collect();
        assert_eq!(run(provider, &bytewise).parts, whole, "{provider} bytewise");
    }
}

#[test]
fn test_crlf_framing_matches_lf_framing() {
    let body = anthropic_body();
    let crlf = String::from_utf8(body.clone())
        .unwrap()
        .replace('\n', "\r\n")
        .into_bytes();
    assert_eq!(
        run(ProviderKind::Anthropic, &[&crlf]).parts,
        run(ProviderKind::Anthropic, &[&body]).parts
    );
}

#[test]
fn test_unterminated_final_record_is_discarded() {
    let mut body = anthropic_body();
    body.extend_from_slice(b"event: content_block_start\ndata: {\"index\":1,\"content_block\":{\"type\":\"text\"}}");
    let collector = run(ProviderKind::Anthropic, &[&body]);
    assert_eq!(collector.labels().iter().filter(|l| **l == "text-start").count(), 1);
    assert_eq!(collector.completions, 1);
    assert!(collector.error.is_none());
}

#[test]
fn test_cancellation_stops_delivery() {
    let body = anthropic_body();
    let mut pipeline = StreamPipeline::new(
        ProviderKind::Anthropic,
        StreamOptions::default(),
        PartCollector::cancel_after(3),
    );
    assert_eq!(pipeline.on_chunk(&body), ControlFlow::Break(()));
    pipeline.on_complete();
    assert!(pipeline.is_terminated());

    let collector = pipeline.into_consumer();
    assert_eq!(
        collector.labels(),
        vec!["stream-start", "response-metadata", "text-start"]
    );
    assert_eq!(collector.completions, 1);
    assert_eq!(collector.error.as_deref(), Some("Stream cancelled by consumer"));
}

#[test]
fn test_raw_chunks_from_config() {
    let config = StreamConfig {
        include_raw_chunks: true,
        ..StreamConfig::default()
    };
    let body = anthropic_body();
    let mut pipeline =
        StreamPipeline::new(ProviderKind::Anthropic, (&config).into(), PartCollector::new());
    let _ = pipeline.on_chunk(&body);
    pipeline.on_complete();
    let collector = pipeline.into_consumer();
    assert_eq!(collector.labels().iter().filter(|l| **l == "raw").count(), 6);
    assert_eq!(collector.labels()[1], "raw");
}

#[test]
fn test_buffer_cap_from_config_terminates_stream() {
    let config = StreamConfig {
        max_buffer_bytes: Some(64),
        ..StreamConfig::default()
    };
    let mut pipeline =
        StreamPipeline::new(ProviderKind::OpenAi, (&config).into(), PartCollector::new());
    let line = vec![b'x'; 70];
    assert!(pipeline.on_chunk(&line).is_break());
    let collector = pipeline.into_consumer();
    assert_eq!(collector.labels(), vec!["stream-start"]);
    assert!(collector.error.unwrap().starts_with("SSE buffer limit exceeded"));
}

#[tokio::test]
async fn test_drive_byte_stream_mid_stream_error_has_no_finish() {
    let body = openai_tool_body();
    let (head, _) = body.split_at(body.len() / 2);
    let source = futures_util::stream::iter(vec![
        Ok(bytes::Bytes::copy_from_slice(head)),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
    ]);
    let mut pipeline =
        StreamPipeline::new(ProviderKind::OpenAi, StreamOptions::default(), PartCollector::new());
    drive_byte_stream(source, &mut pipeline).await;

    let collector = pipeline.into_consumer();
    let labels = collector.labels();
    assert!(labels.contains(&"tool-input-start"));
    assert!(!labels.contains(&"tool-input-end"));
    assert!(!labels.contains(&"finish"));
    assert_eq!(collector.completions, 1);
    assert_eq!(collector.error.as_deref(), Some("Transport error: reset"));
}
