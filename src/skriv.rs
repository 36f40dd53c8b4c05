use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::thread;

use anyhow::{Context, Result, bail};
use arboard::Clipboard;
use clap::Parser;
use parking_lot::RwLock;
use skriv::capture::CaptureController;
use skriv::cli::Cli;
use skriv::event::AppEvent;
use skriv::hotkey::{Activation, Chord, HotkeyDispatcher};
use skriv::worker::Pipeline;
use skriv::{
    APP_NAME_PRETTY, Config, ConfigManager, DEFAULT_LOG_LEVEL, Job, State, StateMachine, VERSION,
    feedback, icon, scanner,
};
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoop, EventLoopBuilder};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tray_icon::menu::{
    AboutMetadataBuilder, CheckMenuItem, Menu, MenuEvent, MenuItem, PredefinedMenuItem,
};
use tray_icon::{TrayIconBuilder, TrayIconEvent};

fn main() -> Result<()> {
    // Initialize the logger
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("SKRIV_LOG")
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL)),
        )
        .init();

    let cli = Cli::parse();

    // Load config; a missing file is fatal and leaves a template behind.
    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_config_file(path),
        None => ConfigManager::new()?,
    };
    let mut config = config_manager.load()?;
    cli.apply(&mut config);

    std::fs::create_dir_all(config.output_dir()).with_context(|| {
        format!(
            "failed to create output dir {}",
            config.output_dir().display()
        )
    })?;

    let (state, state_rx) = StateMachine::new();
    let state = Arc::new(state);
    let config = Arc::new(RwLock::new(config));
    let pipeline = Arc::new(Pipeline::new(config.clone(), state.clone())?);

    if cli.is_batch() {
        return run_batch(&cli, &config, &pipeline, state_rx);
    }
    run_interactive(&cli, config_manager, config, state, pipeline, state_rx)
}

/// One-shot mode: transcribe the positional inputs in order and exit.
fn run_batch(
    cli: &Cli,
    config: &RwLock<Config>,
    pipeline: &Pipeline,
    state_rx: Receiver<State>,
) -> Result<()> {
    feedback::spawn_state_logger(state_rx);

    let (model, language, fragment) = {
        let cfg = config.read();
        (cfg.model, cfg.language.clone(), cfg.fragment_mode)
    };

    let mut sources = Vec::new();
    for input in &cli.inputs {
        if input.is_file() {
            sources.push(input.clone());
        } else {
            warn!(input = %input.display(), "skipping missing input");
        }
    }
    if sources.is_empty() {
        bail!("no usable input files");
    }

    let jobs = Job::batch(sources, model, language, fragment);
    let count = jobs.len();
    for job in jobs {
        pipeline.submit(job)?;
    }
    pipeline.drain();
    info!(jobs = count, "batch finished");
    Ok(())
}

/// Resident mode: global hotkeys, optional tray indicator, runs until quit.
fn run_interactive(
    cli: &Cli,
    config_manager: ConfigManager,
    config: Arc<RwLock<Config>>,
    state: Arc<StateMachine>,
    pipeline: Arc<Pipeline>,
    state_rx: Receiver<State>,
) -> Result<()> {
    let (primary, fragment_chord) = {
        let cfg = config.read();
        (
            Chord::parse(&cfg.hotkey_primary).context("invalid hotkey_primary")?,
            Chord::parse(&cfg.hotkey_fragment).context("invalid hotkey_fragment")?,
        )
    };
    let (activation_tx, activation_rx) = std::sync::mpsc::channel();
    HotkeyDispatcher::new(primary, fragment_chord, activation_tx).spawn()?;

    let mut capture = CaptureController::new(state.clone(), config.clone(), pipeline.clone());

    if cli.no_tray {
        feedback::spawn_state_logger(state_rx);
        info!("{} ready", APP_NAME_PRETTY);
        for activation in activation_rx {
            handle_activation(activation, &state, &config, &pipeline, &mut capture);
        }
        bail!("hotkey hook terminated");
    }

    let mut clipboard = Clipboard::new()?;

    // Create the tray menu
    let tray_menu = Menu::new();
    let item_quit = MenuItem::new("Quit", true, None);
    let item_copy_config = MenuItem::new("Copy config path", true, None);
    let item_fragment =
        CheckMenuItem::new("Fragment mode", true, config.read().fragment_mode, None);
    let item_scanner = CheckMenuItem::new("File scanner", true, config.read().file_scanner, None);
    tray_menu.append_items(&[
        // the name of the app
        &MenuItem::new(APP_NAME_PRETTY, false, None),
        &PredefinedMenuItem::separator(),
        &PredefinedMenuItem::about(
            None,
            Some(
                AboutMetadataBuilder::new()
                    .version(Some(VERSION.to_owned()))
                    .build(),
            ),
        ),
        &item_copy_config,
        &PredefinedMenuItem::separator(),
        &item_fragment,
        &item_scanner,
        &PredefinedMenuItem::separator(),
        &item_quit,
    ])?;

    let mut icon_tray = None;

    let menu_channel = MenuEvent::receiver();
    let tray_channel = TrayIconEvent::receiver();

    let event_loop: EventLoop<AppEvent> = EventLoopBuilder::with_user_event().build();
    feedback::spawn_state_forwarder(state_rx, event_loop.create_proxy());
    feedback::spawn_activation_forwarder(activation_rx, event_loop.create_proxy());

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;

        if let Event::NewEvents(StartCause::Init) = event {
            // We create the icon once the event loop is actually running
            // to prevent issues like https://github.com/tauri-apps/tray-icon/issues/90
            icon_tray.replace(
                TrayIconBuilder::new()
                    .with_menu(Box::new(tray_menu.clone()))
                    .with_tooltip("skriv - speech to text")
                    .with_icon(icon::for_state(State::Idle))
                    .build()
                    .unwrap(),
            );
            info!("{} ready", APP_NAME_PRETTY);
        }

        if let Ok(event) = menu_channel.try_recv() {
            if event.id == item_quit.id() {
                // Finish what is in flight before exiting.
                if state.current().is_recording() {
                    state.request_stop();
                }
                capture.join();
                pipeline.drain();
                icon_tray.take();
                *control_flow = ControlFlow::Exit;
            } else if event.id == item_copy_config.id() {
                if let Err(e) =
                    clipboard.set_text(config_manager.config_path().to_string_lossy().into_owned())
                {
                    error!("Failed to copy config path to clipboard: {}", e);
                }
            } else if event.id == item_fragment.id() {
                let enabled = item_fragment.is_checked();
                config.write().fragment_mode = enabled;
                info!(enabled, "fragment mode toggled");
            } else if event.id == item_scanner.id() {
                let enabled = item_scanner.is_checked();
                config.write().file_scanner = enabled;
                info!(enabled, "file scanner toggled");
            }
        }

        #[expect(clippy::redundant_pattern_matching)]
        if let Ok(_) = tray_channel.try_recv() {
            // Handle tray icon events
        }

        // Handle user provided events
        if let Event::UserEvent(event) = event {
            match event {
                AppEvent::StateChanged(next) => {
                    icon_tray
                        .as_ref()
                        .map(|tray| tray.set_icon(Some(icon::for_state(next))));
                }
                AppEvent::Activation(activation) => {
                    handle_activation(activation, &state, &config, &pipeline, &mut capture);
                }
            }
        }
    });
}

/// Dispatches one fired chord against the current state.
fn handle_activation(
    activation: Activation,
    state: &Arc<StateMachine>,
    config: &Arc<RwLock<Config>>,
    pipeline: &Arc<Pipeline>,
    capture: &mut CaptureController,
) {
    let fragment = activation == Activation::Fragment || config.read().fragment_mode;

    match state.current() {
        State::Recording => {
            state.request_stop();
        }
        State::Waiting => {
            debug!("activation ignored while a prompt is pending");
        }
        State::Idle | State::Processing => {
            // Scanner mode only intercepts from Idle; while the worker is
            // busy an activation always means a new recording.
            if config.read().file_scanner && state.current().is_idle() {
                let candidates = scanner::scan_clipboard();
                if !candidates.is_empty() && state.begin_waiting() {
                    spawn_scanner_prompt(
                        candidates,
                        fragment,
                        state.clone(),
                        config.clone(),
                        pipeline.clone(),
                    );
                    return;
                }
            }
            if state.begin_recording() {
                capture.start_session(fragment);
            }
        }
    }
}

/// The confirmation prompt reads stdin, so it runs off the event loop; the
/// Waiting state keeps other activations out until it resolves.
fn spawn_scanner_prompt(
    candidates: Vec<std::path::PathBuf>,
    fragment: bool,
    state: Arc<StateMachine>,
    config: Arc<RwLock<Config>>,
    pipeline: Arc<Pipeline>,
) {
    thread::spawn(move || {
        let (model, language) = {
            let cfg = config.read();
            (cfg.model, cfg.language.clone())
        };

        let accepted = match scanner::confirm_batch(&candidates) {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("scanner prompt failed: {}", e);
                false
            }
        };

        let mut enqueued = false;
        if accepted {
            for job in Job::batch(candidates, model, language, fragment) {
                match pipeline.submit(job) {
                    Ok(()) => enqueued = true,
                    Err(e) => error!("failed to enqueue batch job: {:#}", e),
                }
            }
        } else {
            info!("batch declined");
        }
        state.resolve_waiting(enqueued);
    });
}
