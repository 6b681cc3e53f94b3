use futures::stream::Stream;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Incremental parser for a `text/event-stream` body.
///
/// Bytes are buffered until a blank line closes an event, so multi-byte
/// characters split across network chunks survive intact.
#[derive(Default)]
pub struct SseParser {
    buffer: Vec<u8>,
}

/// One parsed server-sent event.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event_type: Option<String>,
    pub data: String,
}

impl SseEvent {
    /// The OpenAI end-of-stream sentinel.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes and drain every event completed so far.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();

        while let Some((end, sep_len)) = find_boundary(&self.buffer) {
            let block: Vec<u8> = self.buffer.drain(..end + sep_len).take(end).collect();
            let block = String::from_utf8_lossy(&block);

            let mut event_type = None;
            let mut data_lines = Vec::new();
            for line in block.lines() {
                let line = line.trim_end_matches('\r');
                if let Some(val) = line.strip_prefix("event:") {
                    event_type = Some(val.trim_start().to_string());
                } else if let Some(val) = line.strip_prefix("data:") {
                    data_lines.push(val.strip_prefix(' ').unwrap_or(val).to_string());
                }
            }

            if !data_lines.is_empty() {
                events.push(SseEvent {
                    event_type,
                    data: data_lines.join("\n"),
                });
            }
        }

        events
    }
}

/// Position and length of the first blank-line separator (`\n\n` or `\r\n\r\n`).
fn find_boundary(buf: &[u8]) -> Option<(usize, usize)> {
    let lf = buf.windows(2).position(|w| w == b"\n\n").map(|p| (p, 2));
    let crlf = buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| (p, 4));
    match (lf, crlf) {
        (Some(a), Some(b)) => Some(if a.0 <= b.0 { a } else { b }),
        (a, b) => a.or(b),
    }
}

/// A stream of SSE events over a byte stream.
pub struct SseStream<S> {
    inner: S,
    parser: SseParser,
    pending: VecDeque<SseEvent>,
}

impl<S> SseStream<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            parser: SseParser::new(),
            pending: VecDeque::new(),
        }
    }
}

impl<S, B, E> Stream for SseStream<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    type Item = SseEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(event) = this.pending.pop_front() {
                return Poll::Ready(Some(event));
            }

            match Pin::new(&mut this.inner).poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => {
                    this.pending.extend(this.parser.feed(bytes.as_ref()));
                }
                Poll::Ready(Some(Err(_))) | Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
