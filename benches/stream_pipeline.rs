use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::ops::ControlFlow;

use omnillm::stream::{StreamConsumer, StreamPipeline};
use omnillm::{ChunkSink, ProviderKind, SdkError, SseFramer, StreamOptions, StreamPart};

/// Consumer that only counts parts, so the bench measures the pipeline.
#[derive(Default)]
struct CountingConsumer {
    parts: usize,
}

impl StreamConsumer for CountingConsumer {
    fn on_part(&mut self, _part: &StreamPart) -> ControlFlow<()> {
        self.parts += 1;
        ControlFlow::Continue(())
    }

    fn on_complete(&mut self, _error: Option<&SdkError>) {}
}

fn openai_text_body(deltas: usize) -> Vec<u8> {
    let mut body = String::new();
    for idx in 0..deltas {
        body.push_str("data: {\"id\":\"chatcmpl-bench\",\"model\":\"gpt-x\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"token ");
        body.push_str(&idx.to_string());
        body.push_str("\"}}]}\n\n");
    }
    body.push_str("data: {\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n");
    body.push_str("data: [DONE]\n\n");
    body.into_bytes()
}

fn anthropic_tool_body(fragments: usize) -> Vec<u8> {
    let mut body = String::from(
        "event: message_start\ndata: {\"message\":{\"id\":\"msg_bench\",\"model\":\"claude-x\"}}\n\n\
event: content_block_start\ndata: {\"index\":0,\"content_block\":{\"type\":\"tool_use\",\"id\":\"toolu_1\",\"name\":\"lookup\",\"input\":{}}}\n\n\
event: content_block_delta\ndata: {\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"items\\\":[\"}}\n\n",
    );
    for idx in 0..fragments {
        body.push_str("event: content_block_delta\ndata: {\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"");
        body.push_str(&idx.to_string());
        body.push_str(",\"}}\n\n");
    }
    body.push_str("event: content_block_delta\ndata: {\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"0]}\"}}\n\n");
    body.push_str("event: content_block_stop\ndata: {\"index\":0}\n\n");
    body.push_str("event: message_delta\ndata: {\"delta\":{\"stop_reason\":\"tool_use\"}}\n\n");
    body.into_bytes()
}

fn run_pipeline(provider: ProviderKind, body: &[u8], chunk_size: usize) -> usize {
    let mut pipeline =
        StreamPipeline::new(provider, StreamOptions::default(), CountingConsumer::default());
    for chunk in body.chunks(chunk_size) {
        let _ = pipeline.on_chunk(chunk);
    }
    pipeline.on_complete();
    pipeline.into_consumer().parts
}

fn bench_sse_framer(c: &mut Criterion) {
    let body = openai_text_body(512);
    let mut group = c.benchmark_group("sse_framer");
    group.throughput(Throughput::Bytes(body.len() as u64));
    for chunk_size in [16usize, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(chunk_size),
            &chunk_size,
            |b, &chunk_size| {
                b.iter(|| {
                    let mut framer = SseFramer::new();
                    let mut records = 0usize;
                    for chunk in body.chunks(chunk_size) {
                        let _ = framer.feed(black_box(chunk), |_| records += 1);
                    }
                    records
                });
            },
        );
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let openai = openai_text_body(512);
    let anthropic = anthropic_tool_body(512);

    let mut group = c.benchmark_group("stream_pipeline");
    group.throughput(Throughput::Bytes(openai.len() as u64));
    group.bench_function("openai_text_512", |b| {
        b.iter(|| run_pipeline(ProviderKind::OpenAi, black_box(&openai), 1024));
    });
    group.throughput(Throughput::Bytes(anthropic.len() as u64));
    group.bench_function("anthropic_tool_512", |b| {
        b.iter(|| run_pipeline(ProviderKind::Anthropic, black_box(&anthropic), 1024));
    });
    group.finish();
}

criterion_group!(benches, bench_sse_framer, bench_pipeline);
criterion_main!(benches);
