//! Stream decoding tests, plus a live round trip against a real endpoint.
//!
//! The live test needs `LLM_BASE_URL` and `LLM_MODEL` in the environment.
//!
//! Run with: `cargo test -p clinisim-llm --test client -- --ignored`

use std::time::Duration;

use clinisim_llm::client::{
    ChatBackend, ChatMessage, CompletionRequest, OpenAiCompatClient, forward_deltas,
};
use clinisim_llm::error::LlmError;
use clinisim_llm::sse::SseDecoder;
use tokio::sync::mpsc;

#[test]
fn decoder_joins_frames_split_across_chunks() {
    let mut decoder = SseDecoder::new();
    assert!(decoder.push(b"data: {\"a\"").is_empty());
    assert!(decoder.has_remaining());

    let frames = decoder.push(b": 1}\n\ndata: [DONE]\n\n");
    assert_eq!(frames.len(), 2);
    assert_eq!(frames[0].data, "{\"a\": 1}");
    assert!(frames[1].is_done());
    assert!(!decoder.has_remaining());
}

#[test]
fn decoder_ignores_comments_and_other_fields() {
    let mut decoder = SseDecoder::new();
    let frames = decoder.push(b": keep-alive\nevent: message\r\ndata:{\"b\":2}\r\n\r\n");
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].data, "{\"b\":2}");
}

#[test]
fn decoder_keeps_characters_split_across_chunks() {
    let line = "data: {\"c\":\"发烧\"}\n".as_bytes();
    // Cut one byte into the three-byte encoding of 发.
    let cut = line.iter().position(|&b| b >= 0x80).unwrap() + 1;

    let mut decoder = SseDecoder::new();
    assert!(decoder.push(&line[..cut]).is_empty());
    let frames = decoder.push(&line[cut..]);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].data, "{\"c\":\"发烧\"}");
    assert!(!frames[0].data.contains('\u{FFFD}'));
}

/// Run `forward_deltas` over the given chunks and collect what it emits.
async fn pump(chunks: Vec<Vec<u8>>) -> Vec<Result<String, LlmError>> {
    let (tx, mut rx) = mpsc::channel(16);
    let body = futures::stream::iter(chunks.into_iter().map(Ok::<_, LlmError>));
    forward_deltas(body, tx).await;
    let mut items = Vec::new();
    while let Some(item) = rx.recv().await {
        items.push(item);
    }
    items
}

fn delta(text: &str) -> String {
    format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{text}\"}}}}]}}\n\n")
}

#[tokio::test]
async fn deltas_stop_cleanly_at_done() {
    let first = delta("头痛");
    let bytes = format!("{first}data: [DONE]\n\n").into_bytes();
    let cut = first.find('痛').unwrap() + 1;
    let items = pump(vec![bytes[..cut].to_vec(), bytes[cut..].to_vec()]).await;

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_deref().unwrap(), "头痛");
}

#[tokio::test]
async fn in_band_error_object_fails_the_stream() {
    let items = pump(vec![
        delta("I feel").into_bytes(),
        b"data: {\"error\":{\"message\":\"overloaded\",\"type\":\"server_error\"}}\n\n".to_vec(),
        b"data: [DONE]\n\n".to_vec(),
    ])
    .await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_deref().unwrap(), "I feel");
    assert!(matches!(&items[1], Err(LlmError::Malformed(msg)) if msg.contains("overloaded")));
}

#[tokio::test]
async fn body_ending_without_done_fails_the_stream() {
    let items = pump(vec![delta("The pain started").into_bytes()]).await;

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_deref().unwrap(), "The pain started");
    assert!(items[1].is_err());
}

fn live_client() -> OpenAiCompatClient {
    let base = std::env::var("LLM_BASE_URL").expect("LLM_BASE_URL");
    let model = std::env::var("LLM_MODEL").expect("LLM_MODEL");
    OpenAiCompatClient::new(
        &base,
        model,
        std::env::var("LLM_API_KEY").ok(),
        Duration::from_secs(60),
    )
    .unwrap()
}

#[tokio::test]
#[ignore]
async fn live_stream_yields_content() {
    let client = live_client();
    let request = CompletionRequest {
        messages: vec![ChatMessage::user("Say hello in three words.")],
        temperature: 0.7,
        max_tokens: 32,
        json_object: false,
    };

    let mut rx = client.stream(&request).await.unwrap();
    let mut reply = String::new();
    while let Some(delta) = rx.recv().await {
        reply.push_str(&delta.unwrap());
    }
    println!("reply: {reply}");
    assert!(!reply.is_empty());
}
