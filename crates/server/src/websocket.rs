//! Telephony media-stream WebSocket
//!
//! Carries the carrier's framed audio into the per-session `TurnController`
//! and streams synthesized replies back out. The event protocol is the
//! carrier-standard one: `connected`, `start` (stream id plus media
//! format), `media` (base64 payload), `stop`.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::IntoResponse,
};
use base64::Engine;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use driver_assist_agent::{TurnController, TurnPhase, VoiceEvent};
use driver_assist_core::{AudioClip, Language};

use crate::state::AppState;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub async fn media_stream_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_media_stream(socket, state))
}

async fn handle_media_stream(mut socket: WebSocket, state: AppState) {
    let mut controller: Option<TurnController> = None;
    let mut events: Option<broadcast::Receiver<VoiceEvent>> = None;
    let mut sample_rate = state.settings.turn.sample_rate;
    let mut tick = tokio::time::interval(POLL_INTERVAL);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            message = socket.recv() => {
                let Some(Ok(message)) = message else {
                    tracing::info!("media stream disconnected");
                    break;
                };
                let Message::Text(text) = message else {
                    continue;
                };
                let Ok(frame) = serde_json::from_str::<serde_json::Value>(&text) else {
                    tracing::warn!("unparseable media-stream frame");
                    continue;
                };

                match frame.get("event").and_then(|e| e.as_str()) {
                    Some("connected") => {
                        tracing::info!("media stream connected");
                    }
                    Some("start") => {
                        let conversation_id = frame
                            .get("streamSid")
                            .and_then(|s| s.as_str())
                            .map(String::from)
                            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
                        let language = frame
                            .get("start")
                            .and_then(|s| s.get("language"))
                            .and_then(|l| l.as_str())
                            .and_then(Language::parse)
                            .unwrap_or_default();
                        if let Some(rate) = frame
                            .get("start")
                            .and_then(|s| s.get("sampleRate"))
                            .and_then(|r| r.as_u64())
                        {
                            sample_rate = rate as u32;
                        }

                        tracing::info!(session_id = %conversation_id, %language, sample_rate, "media stream started");

                        let mut config = state.controller_config(language);
                        config.sample_rate = sample_rate;
                        let mut ctl = TurnController::new(
                            conversation_id,
                            config,
                            state.orchestrator.clone(),
                            state.recognizer.clone(),
                            state.synthesizer.clone(),
                            state.prompts.clone(),
                            Instant::now(),
                        );
                        let mut rx = ctl.subscribe();
                        if let Err(e) = ctl.start(Instant::now()).await {
                            tracing::error!(error = %e, "voice loop failed to start");
                            break;
                        }
                        // greeting audio is already waiting in the channel
                        forward_pending(&mut socket, &mut rx).await;
                        controller = Some(ctl);
                        events = Some(rx);
                    }
                    Some("media") => {
                        let Some(ctl) = controller.as_mut() else {
                            continue;
                        };
                        let Some(payload) = frame
                            .get("media")
                            .and_then(|m| m.get("payload"))
                            .and_then(|p| p.as_str())
                        else {
                            continue;
                        };
                        match base64::engine::general_purpose::STANDARD.decode(payload) {
                            Ok(pcm) => {
                                let clip = AudioClip::from_pcm16(&pcm, sample_rate);
                                ctl.push_chunk(&clip.samples, Instant::now());
                            }
                            Err(_) => tracing::warn!("media payload is not valid base64"),
                        }
                    }
                    Some("stop") => {
                        tracing::info!("media stream stopped");
                        break;
                    }
                    _ => {}
                }
            }

            _ = tick.tick() => {
                let Some(ctl) = controller.as_mut() else {
                    continue;
                };
                if let Err(e) = ctl.poll(Instant::now()).await {
                    tracing::error!(error = %e, "voice loop poll failed");
                }
                if let Some(rx) = events.as_mut() {
                    forward_pending(&mut socket, rx).await;
                }
                if ctl.phase() == TurnPhase::Terminal {
                    break;
                }
            }
        }
    }

    // hangup, stop or transport error: nothing more can arrive for this
    // session, so cancel whatever is still in flight (idempotent)
    if let Some(ctl) = controller.as_ref() {
        if ctl.phase() != TurnPhase::Terminal {
            state.orchestrator.cancel(ctl.conversation_id()).await;
        }
    }
}

/// Push any queued controller events out as media frames
async fn forward_pending(socket: &mut WebSocket, rx: &mut broadcast::Receiver<VoiceEvent>) {
    while let Ok(event) = rx.try_recv() {
        let audio = match &event {
            VoiceEvent::Greeting { audio, .. } => Some(audio.clone()),
            VoiceEvent::Reply { audio, .. } => audio.clone(),
            VoiceEvent::Transcript { .. } => None,
            VoiceEvent::Ended { reason } => {
                let frame = serde_json::json!({ "event": "stop", "reason": reason });
                let _ = socket.send(Message::Text(frame.to_string())).await;
                continue;
            }
        };

        let Some(audio) = audio.filter(|clip| !clip.is_empty()) else {
            continue;
        };
        let frame = serde_json::json!({
            "event": "media",
            "media": {
                "payload": base64::engine::general_purpose::STANDARD.encode(audio.to_pcm16()),
            }
        });
        if socket.send(Message::Text(frame.to_string())).await.is_err() {
            return;
        }
    }
}
