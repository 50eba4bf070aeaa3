//! WebSocket translation stream

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::state::AppState;
use crate::api::types::{FrameMessage, FrameResponse, StreamError};
use crate::domain::DomainError;
use crate::infrastructure::extractor::decode_frame;

pub async fn gesture_stream(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// One frame in, one response out, strictly in receipt order
async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let guard = state.connections.register();
    info!(connection_id = %guard.id(), "Translation stream opened");

    while let Some(message) = socket.recv().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(connection_id = %guard.id(), error = %e, "Translation stream receive failed");
                break;
            }
        };

        let reply = match process_message(&state, text.as_str()).await {
            Ok(response) => encode(&response),
            Err(error) => encode(&error),
        };

        let Some(reply) = reply else {
            continue;
        };

        if socket.send(Message::Text(reply.into())).await.is_err() {
            debug!(connection_id = %guard.id(), "Client went away while sending");
            break;
        }
    }

    info!(connection_id = %guard.id(), "Translation stream closed");
}

async fn process_message(state: &AppState, text: &str) -> Result<FrameResponse, StreamError> {
    let message: FrameMessage = serde_json::from_str(text)
        .map_err(|e| StreamError::new(format!("Invalid message: {}", e)))?;

    let frame = message
        .frame
        .ok_or_else(|| StreamError::new("No frame data received"))?;

    let bytes = decode_frame(&frame).map_err(frame_error)?;

    let result = state
        .recognition
        .predict_frame(bytes)
        .await
        .map_err(frame_error)?;

    Ok(result.into())
}

fn frame_error(error: DomainError) -> StreamError {
    match error {
        DomainError::Validation { message } | DomainError::Extraction { message } => {
            StreamError::new(message)
        }
        DomainError::Timeout { elapsed_ms } => {
            StreamError::new(format!("Frame processing timed out after {}ms", elapsed_ms))
        }
        other => {
            warn!(error = %other, "Frame prediction failed");
            StreamError::new(format!("Prediction failed: {}", other))
        }
    }
}

fn encode<T: Serialize>(value: &T) -> Option<String> {
    match serde_json::to_string(value) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(error = %e, "Failed to encode stream response");
            None
        }
    }
}
