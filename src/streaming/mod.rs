//! Streaming chat completions
//!
//! The API streams server-sent events: `data: <json>` lines, one completion
//! chunk each, ended by `data: [DONE]`. A spawned task reads the body line by
//! line and hands typed chunks to the consumer through a capacity-1 channel,
//! so a slow consumer applies backpressure all the way to the socket.

mod reader;

pub use reader::spawn_chunk_stream;

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use crate::types::CompletionChunk;

/// Receiving end of a chat completion stream.
///
/// Ends when the server sends `[DONE]`, when the body ends, or right after an
/// error chunk.
#[derive(Debug)]
pub struct ChunkStream {
    rx: mpsc::Receiver<CompletionChunk>,
}

impl ChunkStream {
    /// Live channel with the single-slot handoff used by producers.
    pub(crate) fn channel() -> (mpsc::Sender<CompletionChunk>, Self) {
        let (tx, rx) = mpsc::channel(1);
        (tx, Self { rx })
    }

    /// A finished stream that replays `chunks` in order.
    pub fn from_chunks(chunks: Vec<CompletionChunk>) -> Self {
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            // Capacity covers every chunk and the receiver is alive.
            let _ = tx.try_send(chunk);
        }
        Self { rx }
    }

    /// Next chunk, or `None` once the producer has closed the stream.
    pub async fn recv(&mut self) -> Option<CompletionChunk> {
        self.rx.recv().await
    }
}

impl Stream for ChunkStream {
    type Item = CompletionChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
