//! Binary entry point: load config, wire the components, run the
//! supervisor until Ctrl-C.

use std::sync::Arc;

use anyhow::Result;

use voice_typing::audio::CpalAudioInput;
use voice_typing::config::{AppConfig, AppPaths};
use voice_typing::hotkey::{parse_key, HotkeyListener};
use voice_typing::output::{
    ClipboardOutputTarget, FileOutputTarget, KeyboardOutputTarget, OutputActionTarget,
};
use voice_typing::recognize::create_recognition_source;
use voice_typing::VoiceTypingApp;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let paths = AppPaths::new();
    let mut config = AppConfig::load(&paths)?;
    if config.recognition.model_path.is_none() {
        config.recognition.model_path = Some(paths.models_dir.join("ggml-base.en.bin"));
    }

    let input = Arc::new(CpalAudioInput::new());
    let source = create_recognition_source(&config.recognition.backend);

    let mut app = VoiceTypingApp::new(config, input, source);

    register_output_targets(&app);

    // Log every transition; the metadata carries who triggered it.
    app.state_manager()
        .register_state_listener(Arc::new(|transition| {
            log::info!(
                "state: {} -> {} ({:?})",
                transition.from_state,
                transition.to_state,
                transition.metadata
            );
        }));

    if !app.initialize().await {
        anyhow::bail!("pipeline failed to initialize; check model path and audio device");
    }

    let hotkey = start_hotkey_listener(&app);
    app.run(hotkey).await
}

fn register_output_targets(app: &VoiceTypingApp) {
    let output_config = app.config().output.clone();
    for name in &output_config.targets {
        let target: Arc<dyn OutputActionTarget> = match name.as_str() {
            "keyboard" => Arc::new(KeyboardOutputTarget::new()),
            "clipboard" => Arc::new(ClipboardOutputTarget::new()),
            "file" => Arc::new(FileOutputTarget::new()),
            other => {
                log::warn!("output: unknown target {other:?}, skipping");
                continue;
            }
        };
        if !target.initialize(&output_config) {
            log::warn!("output: target {name:?} failed to initialize, skipping");
            continue;
        }
        if !app.dispatcher().add_target(target) {
            log::warn!("output: target {name:?} refused registration");
        }
    }
    if app.dispatcher().target_count() == 0 {
        log::warn!("output: no targets registered, recognized text will go nowhere");
    }
}

fn start_hotkey_listener(app: &VoiceTypingApp) -> Option<HotkeyListener> {
    let configured = &app.config().hotkey.key;
    let key = match parse_key(configured) {
        Some(key) => key,
        None => {
            log::warn!("hotkey: unknown key {configured:?}, falling back to F9");
            rdev::Key::F9
        }
    };
    log::info!("hotkey: listening for {configured}");
    HotkeyListener::start(key)
}
