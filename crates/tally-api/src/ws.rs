//! The push channel — WebSocket fan-out of accepted transitions.
//!
//! Each connection gets its own hub subscription and a forwarder task that
//! drains the subscription's channel into the socket. The ingest path never
//! touches the socket directly, so a slow client can only stall itself.

use std::sync::Arc;

use axum::{
  extract::{
    Query, State,
    ws::{Message, WebSocket, WebSocketUpgrade},
  },
  response::Response,
};
use futures_util::{SinkExt as _, StreamExt as _};
use serde::Deserialize;
use tally_core::{resolver::AttributeResolver, stage::Stage, store::ScanStore};
use tally_engine::Engine;

#[derive(Debug, Deserialize)]
pub struct WsParams {
  /// Restrict pushes to transitions touching one stage; absent means all.
  pub stage: Option<Stage>,
}

/// `GET /ws[?stage=<STAGE>]`
pub async fn upgrade<S, R>(
  ws: WebSocketUpgrade,
  State(engine): State<Arc<Engine<S, R>>>,
  Query(params): Query<WsParams>,
) -> Response
where
  S: ScanStore + 'static,
  R: AttributeResolver + 'static,
{
  ws.on_upgrade(move |socket| handle_socket(socket, engine, params.stage))
}

async fn handle_socket<S, R>(
  socket: WebSocket,
  engine: Arc<Engine<S, R>>,
  filter: Option<Stage>,
) where
  S: ScanStore + 'static,
  R: AttributeResolver + 'static,
{
  let (mut sender, mut receiver) = socket.split();
  let (subscription, mut rx) = engine.subscribe(filter);

  // Forward hub notifications to the socket as JSON text frames.
  let forwarder = tokio::spawn(async move {
    while let Some(notification) = rx.recv().await {
      let text = match serde_json::to_string(&notification) {
        Ok(text) => text,
        Err(e) => {
          tracing::error!(error = %e, "failed to serialize notification");
          continue;
        }
      };
      if sender.send(Message::Text(text.into())).await.is_err() {
        break;
      }
    }
  });

  // The client sends nothing beyond liveness pings, which the protocol
  // layer answers for us. Anything else is ignored until close.
  while let Some(msg) = receiver.next().await {
    match msg {
      Ok(Message::Close(_)) | Err(_) => break,
      Ok(_) => {}
    }
  }

  // Transport closed: remove the subscription before returning so the
  // notifier never attempts delivery to this connection again.
  engine.unsubscribe(subscription);
  forwarder.abort();
}
