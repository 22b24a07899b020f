//! The network half of one exchange: a spawned task issues the single
//! request and reports progress over an unbounded channel. Exactly one
//! exchange is in flight at a time; the id only guards events that arrive
//! after their exchange was finalized.

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tracing::debug;

use crate::api::{extract_output_text, ChatRequest, ResponseDocument};
use crate::utils::url::join_url;

#[derive(Clone, Debug)]
pub enum ExchangeEvent {
    /// Text resolved from one streamed line.
    Delta(String),
    /// Whole-document response resolved to its final text.
    Completed(String),
    /// The exchange failed; the payload is log-only detail.
    Failed(String),
    /// Always the last event, success or failure.
    End,
}

pub struct ExchangeParams {
    pub client: reqwest::Client,
    pub base_url: String,
    pub request: ChatRequest,
    pub exchange_id: u64,
}

#[derive(Clone)]
pub struct ExchangeService {
    tx: mpsc::UnboundedSender<(ExchangeEvent, u64)>,
}

impl ExchangeService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(ExchangeEvent, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Fire off the request task. There is no cancellation and no timeout;
    /// the request is awaited to natural completion.
    pub fn spawn_exchange(&self, params: ExchangeParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let exchange_id = params.exchange_id;
            run_exchange(params, &tx).await;
            let _ = tx.send((ExchangeEvent::End, exchange_id));
        });
    }

}

async fn run_exchange(params: ExchangeParams, tx: &mpsc::UnboundedSender<(ExchangeEvent, u64)>) {
    let ExchangeParams {
        client,
        base_url,
        request,
        exchange_id,
    } = params;

    let url = join_url(&base_url, "api/chat");
    debug!("sending exchange {exchange_id} to {url}");

    match client.post(url).json(&request).send().await {
        Ok(response) if response.status().is_success() => {
            if is_event_stream(&response) {
                consume_stream(response, tx, exchange_id).await;
            } else {
                consume_document(response, tx, exchange_id).await;
            }
        }
        Ok(response) => {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            let _ = tx.send((
                ExchangeEvent::Failed(format!("relay returned {status}: {body}")),
                exchange_id,
            ));
        }
        Err(e) => {
            let _ = tx.send((
                ExchangeEvent::Failed(format!("request error: {e}")),
                exchange_id,
            ));
        }
    }
}

fn is_event_stream(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("text/event-stream"))
        .unwrap_or(false)
}

/// Consume a streamed body chunk by chunk, emitting one `Delta` per complete
/// line. Bytes after the last newline are carried across chunks and flushed
/// as a final line when the stream ends.
async fn consume_stream(
    response: reqwest::Response,
    tx: &mpsc::UnboundedSender<(ExchangeEvent, u64)>,
    exchange_id: u64,
) {
    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                buffer.extend_from_slice(&bytes);
                for line in split_complete_lines(&mut buffer) {
                    if let Some(text) = stream_line_text(&line) {
                        let _ = tx.send((ExchangeEvent::Delta(text), exchange_id));
                    }
                }
            }
            Err(e) => {
                let _ = tx.send((
                    ExchangeEvent::Failed(format!("stream read error: {e}")),
                    exchange_id,
                ));
                return;
            }
        }
    }

    if !buffer.is_empty() {
        let tail = String::from_utf8_lossy(&buffer).into_owned();
        if let Some(text) = stream_line_text(&tail) {
            let _ = tx.send((ExchangeEvent::Delta(text), exchange_id));
        }
    }
}

async fn consume_document(
    response: reqwest::Response,
    tx: &mpsc::UnboundedSender<(ExchangeEvent, u64)>,
    exchange_id: u64,
) {
    match response.json::<ResponseDocument>().await {
        Ok(doc) => {
            let _ = tx.send((
                ExchangeEvent::Completed(extract_output_text(&doc)),
                exchange_id,
            ));
        }
        Err(e) => {
            let _ = tx.send((
                ExchangeEvent::Failed(format!("malformed response body: {e}")),
                exchange_id,
            ));
        }
    }
}

/// Drain every complete newline-terminated line from the buffer, leaving any
/// trailing partial line in place.
fn split_complete_lines(buffer: &mut Vec<u8>) -> Vec<String> {
    let mut lines = Vec::new();
    while let Some(newline_pos) = memchr(b'\n', buffer) {
        let line = String::from_utf8_lossy(&buffer[..newline_pos]).into_owned();
        buffer.drain(..=newline_pos);
        lines.push(line);
    }
    lines
}

/// Opportunistic line parse: a JSON object's `response` string field wins; a
/// JSON value without one contributes nothing; anything that is not JSON is
/// taken verbatim.
fn stream_line_text(line: &str) -> Option<String> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(line) {
        Ok(value) => value
            .get("response")
            .and_then(|v| v.as_str())
            .map(str::to_owned),
        Err(_) => Some(line.to_string()),
    }
}
