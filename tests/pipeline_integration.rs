//! End-to-end tests over the public API, using the mock seams in
//! `voice_typing::testing` instead of real devices.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use voice_typing::audio::{AudioChunk, AudioInputSource};
use voice_typing::config::AppConfig;
use voice_typing::output::{OutputActionTarget, OutputType};
use voice_typing::pipeline::{AudioPipelineCoordinator, RecognitionCallback};
use voice_typing::recognize::{RecognitionResult, VoiceRecognitionSource};
use voice_typing::state::VoiceTypingState;
use voice_typing::testing::{MockAudioInputSource, MockOutputTarget, MockRecognitionSource};
use voice_typing::VoiceTypingApp;

fn collecting_callback() -> (RecognitionCallback, Arc<Mutex<Vec<String>>>) {
    let texts: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&texts);
    let callback: RecognitionCallback = Arc::new(move |result: Option<RecognitionResult>| {
        if let Some(result) = result {
            sink.lock().unwrap().push(result.text);
        }
    });
    (callback, texts)
}

#[tokio::test]
async fn coordinator_preserves_chunk_order_end_to_end() {
    let input = Arc::new(MockAudioInputSource::new());
    let source = Arc::new(MockRecognitionSource::new());
    let (callback, _texts) = collecting_callback();

    let mut config = AppConfig::default();
    config.pipeline.buffer_size = 2;

    let mut coordinator = AudioPipelineCoordinator::new(
        Arc::clone(&input) as Arc<dyn AudioInputSource>,
        Arc::clone(&source) as Arc<dyn VoiceRecognitionSource>,
        callback,
        &config,
    );
    assert!(coordinator.initialize(&config).await);
    assert!(coordinator.start_pipeline().await);

    for i in 0..5u8 {
        input.emit_chunk(AudioChunk::new(vec![i]));
    }
    tokio::time::sleep(Duration::from_millis(500)).await;
    coordinator.stop_pipeline().await;

    let received = source.received_chunks();
    assert_eq!(received.len(), 5);
    for (i, chunk) in received.iter().enumerate() {
        assert_eq!(chunk.as_bytes(), &[i as u8]);
    }
}

#[tokio::test]
async fn scripted_results_come_out_in_order() {
    let input = Arc::new(MockAudioInputSource::new());
    let source = Arc::new(MockRecognitionSource::new());
    source.queue_result(RecognitionResult::new("first", 1.0, true));
    source.queue_result(RecognitionResult::new("second", 1.0, true));
    let (callback, texts) = collecting_callback();

    let mut config = AppConfig::default();
    config.pipeline.buffer_size = 1;

    let mut coordinator = AudioPipelineCoordinator::new(
        Arc::clone(&input) as Arc<dyn AudioInputSource>,
        source,
        callback,
        &config,
    );
    assert!(coordinator.initialize(&config).await);
    assert!(coordinator.start_pipeline().await);

    input.emit_chunk(AudioChunk::new(vec![1]));
    input.emit_chunk(AudioChunk::new(vec![2]));
    tokio::time::sleep(Duration::from_millis(500)).await;
    coordinator.stop_pipeline().await;

    assert_eq!(*texts.lock().unwrap(), vec!["first", "second"]);
}

fn app_with_mocks(
    config: AppConfig,
) -> (
    VoiceTypingApp,
    Arc<MockAudioInputSource>,
    Arc<MockRecognitionSource>,
    Arc<MockOutputTarget>,
) {
    let input = Arc::new(MockAudioInputSource::new());
    let source = Arc::new(MockRecognitionSource::new());
    let app = VoiceTypingApp::new(
        config,
        Arc::clone(&input) as Arc<dyn AudioInputSource>,
        Arc::clone(&source) as Arc<dyn VoiceRecognitionSource>,
    );
    let target = Arc::new(MockOutputTarget::new(OutputType::Callback));
    app.dispatcher()
        .add_target(Arc::clone(&target) as Arc<dyn OutputActionTarget>);
    (app, input, source, target)
}

#[tokio::test]
async fn full_session_types_recognized_text() {
    let mut config = AppConfig::default();
    config.pipeline.buffer_size = 2;
    let (mut app, input, source, target) = app_with_mocks(config);
    assert!(app.initialize().await);
    source.queue_result(RecognitionResult::new("hello world", 0.9, true));

    app.handle_toggle();
    assert_eq!(
        app.state_manager().get_current_state(),
        VoiceTypingState::Listening
    );
    app.tick().await;

    input.emit_chunk(AudioChunk::new(vec![1, 2]));
    input.emit_chunk(AudioChunk::new(vec![3, 4]));
    tokio::time::sleep(Duration::from_millis(500)).await;

    let deliveries = target.deliveries();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].0, "hello world");
    assert_eq!(deliveries[0].1.confidence, Some(0.9));
    assert!(deliveries[0].1.timestamp.is_some());

    // Finish the session; reconciliation stops the pipeline once idle.
    app.handle_toggle();
    assert_eq!(
        app.state_manager().get_current_state(),
        VoiceTypingState::FinishListening
    );
    assert!(app
        .state_manager()
        .set_state(VoiceTypingState::Idle, None));
    app.tick().await;
    app.shutdown().await;
}

#[tokio::test]
async fn silence_auto_disables_listening() {
    let mut config = AppConfig::default();
    config.pipeline.buffer_size = 2;
    // Zero timeout: the first silent recognition pass trips the check.
    config.pipeline.inactivity_timeout_secs = 0;
    let (mut app, _input, _source, _target) = app_with_mocks(config);
    assert!(app.initialize().await);

    app.handle_toggle();
    app.tick().await;

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(
        app.state_manager().get_current_state(),
        VoiceTypingState::Idle
    );
    assert_eq!(
        app.state_manager()
            .get_state_metadata()
            .get("source")
            .map(String::as_str),
        Some("inactivity_timeout")
    );

    app.tick().await;
    app.shutdown().await;
}

#[tokio::test]
async fn fan_out_reaches_every_registered_target() {
    let mut config = AppConfig::default();
    config.pipeline.buffer_size = 1;
    let (mut app, input, source, first) = app_with_mocks(config);
    let second = Arc::new(MockOutputTarget::new(OutputType::File));
    app.dispatcher()
        .add_target(Arc::clone(&second) as Arc<dyn OutputActionTarget>);

    assert!(app.initialize().await);
    source.queue_result(RecognitionResult::new("both targets", 1.0, true));

    app.handle_toggle();
    app.tick().await;
    input.emit_chunk(AudioChunk::new(vec![5, 6]));
    tokio::time::sleep(Duration::from_millis(500)).await;
    app.shutdown().await;

    assert_eq!(first.delivery_count(), 1);
    assert_eq!(second.delivery_count(), 1);
    assert_eq!(first.deliveries()[0].0, "both targets");
}

#[tokio::test]
async fn state_history_records_the_session() {
    let config = AppConfig::default();
    let (mut app, _input, _source, _target) = app_with_mocks(config);
    assert!(app.initialize().await);

    app.handle_toggle();
    app.handle_toggle();
    assert!(app
        .state_manager()
        .set_state(VoiceTypingState::Idle, None));

    let history = app.state_manager().get_state_history(None);
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].to_state, VoiceTypingState::Listening);
    assert_eq!(history[1].to_state, VoiceTypingState::FinishListening);
    assert_eq!(history[2].to_state, VoiceTypingState::Idle);
    assert_eq!(
        history[0].metadata.get("source").map(String::as_str),
        Some("hotkey")
    );

    app.shutdown().await;
}
