//! Turn controller scenarios: the real-time audio loop over mock adapters

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast::Receiver;

use common::{harness, voiced_clip, CountingRecognizer, Harness, ScriptedUnderstander};
use driver_assist_adapters::{ScriptedRecognizer, SilentSynthesizer};
use driver_assist_agent::{TurnController, TurnControllerConfig, TurnPhase, VoiceEvent};
use driver_assist_config::{Backpressure, PromptCatalog};
use driver_assist_core::{IntentType, NluResult, Recognizer, SessionStore};

fn controller(
    h: &Harness,
    recognizer: Arc<dyn Recognizer>,
    config: TurnControllerConfig,
    now: Instant,
) -> TurnController {
    TurnController::new(
        "conv-1",
        config,
        h.orchestrator.clone(),
        recognizer,
        Arc::new(SilentSynthesizer::new()),
        Arc::new(PromptCatalog::builtin()),
        now,
    )
}

fn drain(rx: &mut Receiver<VoiceEvent>) -> Vec<VoiceEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

const SILENCE: Duration = Duration::from_millis(1500);

#[tokio::test]
async fn test_start_greets_then_listens() {
    let h = harness(Arc::new(ScriptedUnderstander::new([])));
    let t0 = Instant::now();
    let mut ctl = controller(
        &h,
        Arc::new(ScriptedRecognizer::new()),
        TurnControllerConfig::default(),
        t0,
    );
    let mut rx = ctl.subscribe();

    ctl.start(t0).await.unwrap();
    assert_eq!(ctl.phase(), TurnPhase::Listening);

    let events = drain(&mut rx);
    assert!(matches!(events[0], VoiceEvent::Greeting { .. }));
}

#[tokio::test]
async fn test_silence_window_emits_proactive_prompt() {
    let h = harness(Arc::new(ScriptedUnderstander::new([])));
    let t0 = Instant::now();
    let mut ctl = controller(
        &h,
        Arc::new(ScriptedRecognizer::new()),
        TurnControllerConfig::default(),
        t0,
    );
    let mut rx = ctl.subscribe();
    ctl.start(t0).await.unwrap();
    drain(&mut rx);

    // just short of the window: nothing happens
    ctl.poll(t0 + SILENCE - Duration::from_millis(1)).await.unwrap();
    assert!(drain(&mut rx).is_empty());

    // exactly at the window: proactive prompt, still listening
    ctl.poll(t0 + SILENCE).await.unwrap();
    let events = drain(&mut rx);
    match &events[0] {
        VoiceEvent::Reply { proactive, .. } => assert!(proactive),
        other => panic!("expected proactive reply, got {other:?}"),
    }
    assert_eq!(ctl.phase(), TurnPhase::Listening);
}

#[tokio::test]
async fn test_four_silences_terminate_with_distinct_prompts() {
    let h = harness(Arc::new(ScriptedUnderstander::new([])));
    let t0 = Instant::now();
    let mut ctl = controller(
        &h,
        Arc::new(ScriptedRecognizer::new()),
        TurnControllerConfig::default(),
        t0,
    );
    let mut rx = ctl.subscribe();
    ctl.start(t0).await.unwrap();
    drain(&mut rx);

    let mut prompts = Vec::new();
    let mut now = t0;
    for _ in 0..3 {
        now += SILENCE;
        ctl.poll(now).await.unwrap();
        for event in drain(&mut rx) {
            if let VoiceEvent::Reply { text, proactive, .. } = event {
                assert!(proactive);
                prompts.push(text);
            }
        }
        assert_eq!(ctl.phase(), TurnPhase::Listening);
    }
    assert_eq!(prompts.len(), 3);
    assert_ne!(prompts[0], prompts[1]);
    assert_ne!(prompts[1], prompts[2]);
    assert_ne!(prompts[0], prompts[2]);

    // fourth silence: farewell and terminal escalation
    now += SILENCE;
    ctl.poll(now).await.unwrap();
    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        VoiceEvent::Reply { proactive: false, .. }
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, VoiceEvent::Ended { reason } if reason == "escalated")));
    assert_eq!(ctl.phase(), TurnPhase::Terminal);
    assert_eq!(h.handoff.last_reason().as_deref(), Some("no response"));
}

#[tokio::test]
async fn test_utterance_flows_through_recognizer_to_dialogue() {
    let understander = Arc::new(ScriptedUnderstander::new([
        NluResult::new(IntentType::FindNearestStation, 0.9),
        NluResult::new(IntentType::Unknown, 0.4).with_entity("location", "Noida"),
    ]));
    let h = harness(understander);
    let recognizer = Arc::new(ScriptedRecognizer::with_script(["find station", "Noida"]));

    let t0 = Instant::now();
    let mut ctl = controller(
        &h,
        recognizer,
        TurnControllerConfig::default(),
        t0,
    );
    let mut rx = ctl.subscribe();
    ctl.start(t0).await.unwrap();
    drain(&mut rx);

    // first utterance
    let spoke = t0 + Duration::from_millis(200);
    ctl.push_chunk(&voiced_clip(0.5), spoke);
    ctl.poll(spoke + SILENCE).await.unwrap();

    let events = drain(&mut rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, VoiceEvent::Transcript { text } if text == "find station")));
    assert!(events.iter().any(
        |e| matches!(e, VoiceEvent::Reply { text, .. } if text == "Which area are you in?")
    ));
    assert_eq!(ctl.phase(), TurnPhase::Listening);

    // second utterance completes the intent and ends the call
    let spoke2 = spoke + SILENCE + Duration::from_millis(300);
    ctl.push_chunk(&voiced_clip(0.5), spoke2);
    ctl.poll(spoke2 + SILENCE).await.unwrap();

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        VoiceEvent::Reply { text, .. }
            if text == "The nearest station is Station Noida at Main Road, Noida."
    )));
    // a normal completion says goodbye before the line drops
    assert!(events.iter().any(|e| matches!(
        e,
        VoiceEvent::Reply { text, .. } if text == "Thanks for calling. Drive safe!"
    )));
    assert!(events
        .iter()
        .any(|e| matches!(e, VoiceEvent::Ended { reason } if reason == "completed")));
    assert_eq!(ctl.phase(), TurnPhase::Terminal);
}

#[tokio::test]
async fn test_recognizer_never_sees_silence() {
    let h = harness(Arc::new(ScriptedUnderstander::new([])));
    let recognizer = Arc::new(CountingRecognizer::new(ScriptedRecognizer::new()));

    let t0 = Instant::now();
    let mut ctl = controller(
        &h,
        recognizer.clone(),
        TurnControllerConfig::default(),
        t0,
    );
    ctl.start(t0).await.unwrap();

    // a chunk of pure silence, then the window elapses
    ctl.push_chunk(&common::silent_clip(0.5), t0 + Duration::from_millis(100));
    ctl.poll(t0 + SILENCE).await.unwrap();

    // the silence path went through the proactive prompt, not recognition
    assert_eq!(recognizer.call_count(), 0);
    assert_eq!(ctl.phase(), TurnPhase::Listening);
}

#[tokio::test]
async fn test_empty_transcript_takes_the_no_speech_path() {
    let h = harness(Arc::new(ScriptedUnderstander::new([])));
    let recognizer = Arc::new(ScriptedRecognizer::with_script([""]));

    let t0 = Instant::now();
    let mut ctl = controller(
        &h,
        recognizer,
        TurnControllerConfig::default(),
        t0,
    );
    let mut rx = ctl.subscribe();
    ctl.start(t0).await.unwrap();
    drain(&mut rx);

    let spoke = t0 + Duration::from_millis(200);
    ctl.push_chunk(&voiced_clip(0.5), spoke);
    ctl.poll(spoke + SILENCE).await.unwrap();

    let events = drain(&mut rx);
    // no transcript event; the reply is a proactive prompt
    assert!(!events
        .iter()
        .any(|e| matches!(e, VoiceEvent::Transcript { .. })));
    match &events[0] {
        VoiceEvent::Reply { proactive, .. } => assert!(proactive),
        other => panic!("expected proactive reply, got {other:?}"),
    }
    assert_eq!(h.store.get("conv-1").await.unwrap().no_response_count, 1);
}

#[tokio::test]
async fn test_chunks_outside_listening_are_dropped_and_counted() {
    let h = harness(Arc::new(ScriptedUnderstander::new([])));
    let t0 = Instant::now();
    let mut ctl = controller(
        &h,
        Arc::new(ScriptedRecognizer::new()),
        TurnControllerConfig::default(),
        t0,
    );

    // before start: Idle drops
    ctl.push_chunk(&voiced_clip(0.1), t0);
    assert_eq!(ctl.dropped_chunks(), 1);

    ctl.start(t0).await.unwrap();

    // drive to terminal via four silences
    let mut now = t0;
    for _ in 0..4 {
        now += SILENCE;
        ctl.poll(now).await.unwrap();
    }
    assert_eq!(ctl.phase(), TurnPhase::Terminal);

    ctl.push_chunk(&voiced_clip(0.1), now);
    ctl.push_chunk(&voiced_clip(0.1), now);
    assert_eq!(ctl.dropped_chunks(), 3);

    // the pre-start drop was folded into the session at the first turn
    assert_eq!(h.store.get("conv-1").await.unwrap().dropped_chunks, 1);
}

#[tokio::test]
async fn test_queue_policy_bounds_held_chunks() {
    let h = harness(Arc::new(ScriptedUnderstander::new([])));
    let config = TurnControllerConfig {
        backpressure: Backpressure::Queue { max_chunks: 1 },
        ..TurnControllerConfig::default()
    };
    let t0 = Instant::now();
    let mut ctl = controller(&h, Arc::new(ScriptedRecognizer::new()), config, t0);

    // Idle is not a held phase: still dropped
    ctl.push_chunk(&voiced_clip(0.1), t0);
    assert_eq!(ctl.dropped_chunks(), 1);
}

#[tokio::test]
async fn test_double_start_is_an_error() {
    let h = harness(Arc::new(ScriptedUnderstander::new([])));
    let t0 = Instant::now();
    let mut ctl = controller(
        &h,
        Arc::new(ScriptedRecognizer::new()),
        TurnControllerConfig::default(),
        t0,
    );

    ctl.start(t0).await.unwrap();
    assert!(ctl.start(t0).await.is_err());
}

#[tokio::test]
async fn test_gateway_clip_of_silence_prompts() {
    let h = harness(Arc::new(ScriptedUnderstander::new([])));
    let gateway = common::gateway(&h, Arc::new(ScriptedRecognizer::new()));

    let clip = driver_assist_core::AudioClip::new(common::silent_clip(0.5), 16000);
    let out = gateway
        .process_clip("conv-1", &clip.to_pcm16(), driver_assist_core::Language::En)
        .await
        .unwrap();

    assert!(out.proactive_prompt);
    assert!(out.transcribed_text.is_none());
    assert!(out.audio.is_none());
    assert!(!out.should_end);
}

#[tokio::test]
async fn test_gateway_clip_of_speech_runs_a_turn() {
    let understander = Arc::new(ScriptedUnderstander::new([NluResult::new(
        IntentType::GetSwapHistory,
        0.85,
    )
    .with_entity("date_range", "yesterday")]));
    let h = harness(understander);
    let gateway = common::gateway(
        &h,
        Arc::new(ScriptedRecognizer::with_script(["swap history yesterday"])),
    );

    let clip = driver_assist_core::AudioClip::new(voiced_clip(0.5), 16000);
    let out = gateway
        .process_clip("conv-1", &clip.to_pcm16(), driver_assist_core::Language::En)
        .await
        .unwrap();

    assert_eq!(out.transcribed_text.as_deref(), Some("swap history yesterday"));
    assert!(out.response_text.contains("2026-01-22 14:30"));
    assert!(out.should_end);
    assert!(!out.proactive_prompt);
}
