//! Body capture that leaves the stream intact
//!
//! A body is read frame by frame until it ends, fails, or passes the capture
//! limit. The frames already read are replayed to the next consumer, followed
//! by the unread remainder or by the original error. Handlers and clients see
//! the same data, trailers and errors as they would without auditing, so a
//! length-limit error still turns into the handler's own 413.

use axum::body::{Body, Bytes};
use http_body::{Body as HttpBody, Frame, SizeHint};
use http_body_util::BodyExt;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What was captured from a body
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Captured {
    /// The whole body
    Complete(Bytes),
    /// The first `limit` bytes of a longer body
    Truncated(Bytes),
    /// Reading failed; message of the underlying error
    Failed(String),
}

/// Read at most `limit` bytes of `body` for the audit trail
///
/// Returns the capture and a body that yields exactly what `body` would have.
pub(crate) async fn capture(mut body: Body, limit: usize) -> (Captured, Body) {
    let mut frames = VecDeque::new();
    let mut preview = Vec::new();
    let mut seen = 0usize;

    loop {
        if seen > limit {
            let replay = Replay {
                frames,
                tail: Tail::Rest(body),
            };
            return (Captured::Truncated(Bytes::from(preview)), Body::new(replay));
        }

        match body.frame().await {
            None => {
                let replay = Replay {
                    frames,
                    tail: Tail::Done,
                };
                return (Captured::Complete(Bytes::from(preview)), Body::new(replay));
            }
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    seen += data.len();
                    let room = limit.saturating_sub(preview.len());
                    preview.extend_from_slice(&data[..data.len().min(room)]);
                }
                frames.push_back(frame);
            }
            Some(Err(e)) => {
                let message = e.to_string();
                // Unwrap once; `Body::new` adds the layer back
                let replay = Replay {
                    frames,
                    tail: Tail::Failed(Some(e.into_inner())),
                };
                return (Captured::Failed(message), Body::new(replay));
            }
        }
    }
}

struct Replay {
    frames: VecDeque<Frame<Bytes>>,
    tail: Tail,
}

enum Tail {
    Done,
    Rest(Body),
    Failed(Option<BoxError>),
}

impl Replay {
    fn buffered_len(&self) -> u64 {
        self.frames
            .iter()
            .filter_map(Frame::data_ref)
            .map(|data| data.len() as u64)
            .sum()
    }
}

impl HttpBody for Replay {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, BoxError>>> {
        let this = &mut *self;

        if let Some(frame) = this.frames.pop_front() {
            return Poll::Ready(Some(Ok(frame)));
        }

        match &mut this.tail {
            Tail::Done => Poll::Ready(None),
            Tail::Failed(error) => Poll::Ready(error.take().map(Err)),
            Tail::Rest(body) => Pin::new(body)
                .poll_frame(cx)
                .map(|frame| frame.map(|result| result.map_err(axum::Error::into_inner))),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.frames.is_empty()
            && match &self.tail {
                Tail::Done => true,
                Tail::Rest(body) => body.is_end_stream(),
                Tail::Failed(error) => error.is_none(),
            }
    }

    fn size_hint(&self) -> SizeHint {
        let buffered = self.buffered_len();
        match &self.tail {
            Tail::Done => SizeHint::with_exact(buffered),
            Tail::Rest(body) => {
                let rest = body.size_hint();
                let mut hint = SizeHint::new();
                hint.set_lower(rest.lower() + buffered);
                if let Some(upper) = rest.upper() {
                    hint.set_upper(upper + buffered);
                }
                hint
            }
            Tail::Failed(_) => {
                let mut hint = SizeHint::new();
                hint.set_lower(buffered);
                hint
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use futures::stream;

    fn chunked(chunks: &[&'static [u8]]) -> Body {
        let items: Vec<Result<Bytes, std::io::Error>> =
            chunks.iter().map(|c| Ok(Bytes::from_static(c))).collect();
        Body::from_stream(stream::iter(items))
    }

    #[tokio::test]
    async fn test_complete_body_is_replayed() {
        let (captured, body) = capture(chunked(&[b"{\"qty\":", b"3}"]), 1024).await;

        assert_eq!(captured, Captured::Complete(Bytes::from_static(b"{\"qty\":3}")));
        let replayed = to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&replayed[..], b"{\"qty\":3}");
    }

    #[tokio::test]
    async fn test_long_body_is_truncated_but_passed_whole() {
        let (captured, body) = capture(chunked(&[b"0123456789", b"abcdef", b"ghij"]), 12).await;

        assert_eq!(captured, Captured::Truncated(Bytes::from_static(b"0123456789ab")));
        let replayed = to_bytes(body, usize::MAX).await.unwrap();
        assert_eq!(&replayed[..], b"0123456789abcdefghij");
    }

    #[tokio::test]
    async fn test_body_exactly_at_limit_is_complete() {
        let (captured, _) = capture(chunked(&[b"abcd"]), 4).await;
        assert_eq!(captured, Captured::Complete(Bytes::from_static(b"abcd")));
    }

    #[tokio::test]
    async fn test_read_error_is_replayed_after_data() {
        let items: Vec<Result<Bytes, std::io::Error>> = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("connection reset")),
        ];
        let (captured, mut body) = capture(Body::from_stream(stream::iter(items)), 1024).await;

        let Captured::Failed(message) = captured else {
            panic!("expected a failed capture");
        };
        assert!(message.contains("connection reset"));

        let first = body.frame().await.unwrap().unwrap();
        assert_eq!(first.into_data().unwrap(), Bytes::from_static(b"partial"));
        let error = body.frame().await.unwrap().unwrap_err();
        assert!(error.to_string().contains("connection reset"));
        assert!(body.frame().await.is_none());
    }
}
