//! Line reader turning an SSE body into completion chunks
//!
//! Framing is done one line at a time with `read_until` rather than through
//! an event parser: the time spent in each read is added to the latency of
//! the next chunk emitted, so reads and chunks must stay in lockstep.

use std::time::{Duration, Instant};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

use super::ChunkStream;
use crate::error::ClientError;
use crate::types::CompletionChunk;
use crate::utils::CancelHandle;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Spawn the producer task for an open streaming body.
///
/// `connect_latency` is the time to response headers; it seeds the total
/// latency reported on the terminal chunk.
pub fn spawn_chunk_stream<R>(reader: R, connect_latency: Duration, cancel: CancelHandle) -> ChunkStream
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, stream) = ChunkStream::channel();

    tokio::spawn(async move {
        let mut reader = reader;
        pump(&mut reader, &tx, connect_latency, &cancel).await;
        // Body first, then the channel.
        drop(reader);
        drop(tx);
    });

    stream
}

/// What the producer does after one line.
enum Step {
    Continue,
    Stop,
}

async fn pump<R>(
    reader: &mut R,
    tx: &mpsc::Sender<CompletionChunk>,
    connect_latency: Duration,
    cancel: &CancelHandle,
) where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let mut pending = Duration::ZERO;
    let mut total = connect_latency;
    let mut index: usize = 0;

    loop {
        line.clear();
        let started = Instant::now();
        let read = match cancel.run(reader.read_until(b'\n', &mut line)).await {
            Ok(read) => read,
            Err(cancelled) => {
                let _ = tx.send(CompletionChunk::from_error(cancelled)).await;
                return;
            }
        };
        pending += started.elapsed();

        match read {
            Ok(0) => return,
            Ok(_) => {}
            Err(err) => {
                let error = ClientError::Stream(format!("failed to read response line: {err}"));
                let _ = tx.send(CompletionChunk::from_error(error)).await;
                return;
            }
        }

        let step = match parse_line(&line, index) {
            Line::Skip => Step::Continue,
            Line::Done => Step::Stop,
            Line::Failed(error) => {
                let _ = tx.send(CompletionChunk::from_error(error)).await;
                Step::Stop
            }
            Line::Chunk(chunk) => {
                let mut chunk = *chunk;
                chunk.chunk_latency = pending;
                total += pending;
                pending = Duration::ZERO;
                if chunk.finish_reason().is_some() {
                    chunk.is_last_chunk = true;
                    chunk.total_latency = total;
                }
                index += 1;
                if tx.send(chunk).await.is_err() {
                    tracing::debug!(
                        target: "mistral_client::stream",
                        "stream consumer went away, closing body"
                    );
                    Step::Stop
                } else {
                    Step::Continue
                }
            }
        };

        if let Step::Stop = step {
            return;
        }
    }
}

enum Line {
    Skip,
    Done,
    Chunk(Box<CompletionChunk>),
    Failed(ClientError),
}

fn parse_line(raw: &[u8], index: usize) -> Line {
    let text = String::from_utf8_lossy(raw);
    let Some(payload) = text.trim_end_matches(['\r', '\n']).strip_prefix(DATA_PREFIX) else {
        return Line::Skip;
    };
    let payload = payload.trim();

    if payload == DONE_SENTINEL {
        return Line::Done;
    }

    match serde_json::from_str::<CompletionChunk>(payload) {
        Ok(chunk) => Line::Chunk(Box::new(chunk)),
        Err(err) => Line::Failed(ClientError::Stream(format!(
            "failed to unmarshal response chunk {index} '{payload}': {err}"
        ))),
    }
}
