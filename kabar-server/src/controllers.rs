use axum::extract::rejection::JsonRejection;
use axum::extract::ws::{Message as WsFrame, WebSocket};
use axum::{extract::Extension, extract::WebSocketUpgrade, http::StatusCode, response::IntoResponse, Json};
use futures_util::{SinkExt, StreamExt};
use kabar_core::{
    EventAck, InboundEvent, Jid, ReceiveMessagesResponse, SendMessageRequest, SendMessageResponse,
    WsMessage,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::ingest::IngestError;
use crate::registry::Subscription;
use crate::{health_with_pool, AppState};

/// Handler per GET /health
pub async fn health(Extension(state): Extension<Arc<AppState>>) -> StatusCode {
    health_with_pool(&state.pool).await
}

/// Handler per POST /send-message
///
/// Prima l'invio sulla rete, poi la copia speculare nello storico: un invio
/// rifiutato dalla rete non compare mai come inviato.
pub async fn send_message(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        tracing::debug!(error = %e, "rejected send-message payload");
        ApiError::bad_request("Invalid request payload")
    })?;

    let recipient = Jid::for_recipient(&req.recipient)
        .map_err(|e| ApiError::bad_request(format!("Invalid recipient JID: {e}")))?;

    let receipt = state
        .client
        .send_text(&recipient, &req.message)
        .await
        .map_err(|e| {
            tracing::error!(recipient = %recipient, error = %e, "send failed");
            ApiError::internal(format!("Failed to send message: {e}"))
        })?;

    // il messaggio è già partito: un errore dello store viene solo segnalato
    let recorded = match state.pipeline.record_local_send(req.message).await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(recipient = %recipient, error = %e, "message sent but not recorded in history");
            false
        }
    };

    Ok(Json(SendMessageResponse {
        message: "Message sent successfully".to_string(),
        response: receipt,
        recorded,
    }))
}

/// Handler per GET /receive-message: storico completo, oppure il marcatore di storico vuoto.
pub async fn receive_message(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<ReceiveMessagesResponse>, ApiError> {
    let history = state.history.history().await.map_err(|e| {
        tracing::error!(error = %e, "failed to read history");
        ApiError::internal("Failed to fetch messages from database")
    })?;
    Ok(Json(ReceiveMessagesResponse::from_history(history)))
}

/// Handler per POST /events: callback del client di messaggistica esterno.
/// Le riconsegne dello stesso evento sono assorbite dal commit idempotente.
pub async fn ingest_event(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<InboundEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<EventAck>), ApiError> {
    let Json(event) = payload.map_err(|e| {
        tracing::debug!(error = %e, "rejected inbound event");
        ApiError::bad_request("Invalid event payload")
    })?;

    let (status, message) = state.pipeline.ingest_event(event).await.map_err(|e| match e {
        IngestError::Store(_) => ApiError::internal("Failed to persist message"),
        IngestError::Timestamp(_) => ApiError::bad_request("Event timestamp out of range"),
    })?;

    Ok((StatusCode::ACCEPTED, Json(EventAck { status, message })))
}

/// Handler per /ws
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    // Registra la sessione: da qui in poi riceve ogni messaggio pubblicato.
    // Lo storico non viene inviato automaticamente, il client lo chiede a /receive-message.
    let Subscription { id, mut rx } = state.registry.add();
    tracing::info!(subscriber = %id, "websocket connected");

    /* socket.split() divide il WebSocket in due metà indipendenti:
        sender (Sink) per scrivere verso il client,
        receiver (Stream) per leggere dal client. */
    let (mut sender, mut receiver) = socket.split();
    let write_timeout = state.ws_write_timeout;
    let timeout_ms = u64::try_from(write_timeout.as_millis()).unwrap_or(u64::MAX);

    // Task: coda del subscriber -> websocket, ogni write limitata da un timeout
    let mut forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let frame = match serde_json::to_string(&WsMessage::Message((*msg).clone())) {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::error!(subscriber = %id, error = %e, "failed to encode frame");
                    continue;
                }
            };
            match tokio::time::timeout(write_timeout, sender.send(WsFrame::Text(frame))).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(subscriber = %id, error = %e, "websocket write failed");
                    break;
                }
                Err(_) => {
                    tracing::warn!(subscriber = %id, timeout_ms, "websocket write timed out");
                    break;
                }
            }
        }
    });

    // I frame inviati dal client vengono letti e scartati fino alla chiusura
    let read_loop = async {
        while let Some(frame) = receiver.next().await {
            match frame {
                Ok(WsFrame::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(subscriber = %id, error = %e, "websocket read error");
                    break;
                }
            }
        }
    };

    tokio::select! {
        _ = read_loop => {}
        _ = &mut forward_task => {}
    }

    // cleanup
    state.registry.remove(id);
    forward_task.abort();
    tracing::info!(subscriber = %id, "websocket disconnected");
}
