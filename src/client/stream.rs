use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::conversations::Conversation;
use crate::protocol::{ErrorPayload, FrameDecoder, StreamDiagnostics, StreamEvent};

use super::error::ClientError;

/// One live streaming turn: the event channel plus the decoder's drop
/// counters. The sequence is finite and not restartable.
pub struct StreamHandle {
    pub events: mpsc::UnboundedReceiver<StreamEvent>,
    pub diagnostics: Arc<StreamDiagnostics>,
}

/// Spawn the transport task: send the request, feed response bytes through
/// the decoder, forward events. A failed send or a non-2xx status becomes
/// exactly one synthesized `error` event; the body is never read in that
/// case. The cancellation token is honored at every await.
pub(super) fn spawn_stream(
    builder: reqwest::RequestBuilder,
    cancel: CancellationToken,
) -> StreamHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let diagnostics = Arc::new(StreamDiagnostics::default());
    let decoder_diagnostics = Arc::clone(&diagnostics);

    tokio::spawn(async move {
        let response = tokio::select! {
            _ = cancel.cancelled() => return,
            response = builder.send() => response,
        };

        let response = match response {
            Ok(response) => response,
            Err(error) => {
                send_error(&tx, ClientError::from(error).user_message());
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            send_error(
                &tx,
                ClientError::from_status(status.as_u16(), body).user_message(),
            );
            return;
        }

        let mut decoder = FrameDecoder::with_diagnostics(decoder_diagnostics);
        let mut body = response.bytes_stream();

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return,
                chunk = body.next() => chunk,
            };
            match chunk {
                Some(Ok(bytes)) => {
                    for event in decoder.push_bytes(&bytes) {
                        if tx.send(event).is_err() {
                            return; // consumer went away
                        }
                    }
                }
                Some(Err(error)) => {
                    send_error(&tx, ClientError::from(error).user_message());
                    return;
                }
                None => return,
            }
        }
    });

    StreamHandle {
        events: rx,
        diagnostics,
    }
}

fn send_error(tx: &mpsc::UnboundedSender<StreamEvent>, message: String) {
    let _ = tx.send(StreamEvent::Error(ErrorPayload {
        error: Some(message),
    }));
}

/// Consume a stream into the conversation, handing each event to `observe`
/// before it is applied. Returns when the channel closes; a close without a
/// terminal event (cancellation, server hangup) discards the open turn.
pub async fn drive_turn<F>(
    conversation: &mut Conversation,
    handle: &mut StreamHandle,
    mut observe: F,
) where
    F: FnMut(&StreamEvent),
{
    while let Some(event) = handle.events.recv().await {
        observe(&event);
        conversation.apply(event);
    }
    if conversation.is_streaming() {
        conversation.reset_turn();
    }
}
