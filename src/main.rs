mod app;
mod draw;
mod keys;
mod state;
mod ui;

use crate::app::App;
use crate::state::app_settings::AppSettings;
use crate::state::cache::{FileStore, ViewCache};
use crate::state::engine::MatchEngine;
use crate::state::messages::{NetworkRequest, NetworkResponse, UiEvent};
use crate::state::network::{LoadingState, NetworkWorker};
use cricket_api::MergedView;
use cricket_api::client::CricketApi;
use crossterm::event::{self as crossterm_event, Event};
use crossterm::{cursor, execute, terminal};
use log::{error, info};
use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;
use std::{io, panic};
use tokio::sync::{Mutex, mpsc, watch};
use tui::{Terminal, backend::CrosstermBackend};

/// How often the input thread checks whether the UI loop has gone away.
const INPUT_POLL: Duration = Duration::from_millis(250);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if handle_cli_args() {
        return Ok(());
    }

    better_panic::install();

    let settings = AppSettings::load();

    let backend = CrosstermBackend::new(io::stdout());
    let terminal = Terminal::new(backend)?;

    setup_panic_hook();
    setup_terminal()?;

    tui_logger::init_logger(settings.log_level)?;
    tui_logger::set_default_level(settings.log_level);

    let engine = MatchEngine::new(
        CricketApi::new(settings.endpoints.clone()),
        ViewCache::new(FileStore::new(&settings.cache_dir)),
        settings.engine,
    );
    info!("cache dir {}", settings.cache_dir.display());

    let app = Arc::new(Mutex::new(App::new(settings)));

    let (ui_event_tx, ui_event_rx) = mpsc::channel::<UiEvent>(100);
    let (network_req_tx, network_req_rx) = mpsc::channel::<NetworkRequest>(100);
    let (network_resp_tx, network_resp_rx) = mpsc::channel::<NetworkResponse>(100);

    // Input handler thread
    let input_handler = tokio::task::spawn_blocking(move || input_handler_task(ui_event_tx));

    // Network thread for on-demand requests
    let network_worker = NetworkWorker::new(engine.clone(), network_req_rx, network_resp_tx);
    let network_task = tokio::spawn(network_worker.run());

    // Live and heavy pollers; the cached view is published before the first fetch
    let view_rx = engine.subscribe();
    engine.start().await;

    main_ui_loop(terminal, app, &engine, ui_event_rx, view_rx, network_req_tx, network_resp_rx).await;

    engine.stop().await;
    network_task.abort();
    let _ = input_handler.await;

    cleanup_terminal()?;
    Ok(())
}

fn handle_cli_args() -> bool {
    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        return false;
    };

    match arg.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            true
        }
        "-V" | "--version" => {
            println!("crictui {}", env!("CARGO_PKG_VERSION"));
            true
        }
        _ => {
            eprintln!("Unknown argument: {arg}\n\n{}", usage_text());
            std::process::exit(2);
        }
    }
}

fn usage_text() -> &'static str {
    "crictui - live cricket scores terminal UI

Usage:
  crictui
  crictui --help
  crictui --version

Environment:
  CRICTUI_FEED_URL         Match feed endpoint
  CRICTUI_SCORECARD_URL    Scorecard endpoint
  CRICTUI_CLIENT_ID        Feed client id
  CRICTUI_PROXY_URL        CORS relay; requests are sent as <relay>?url=<target>
  CRICTUI_PROXY_NOCACHE    Ask the relay to bypass its cache (1/true)
  CRICTUI_LIVE_POLL_SECS   Live refresh while matches are in progress (default 15)
  CRICTUI_IDLE_POLL_SECS   Live refresh when nothing is in progress (default 120)
  CRICTUI_HEAVY_POLL_SECS  Upcoming/results refresh (default 300)
  CRICTUI_RESULTS_DAYS     Days per results window (default 30)
  CRICTUI_UPCOMING_DAYS    Days of upcoming fixtures (default 14)
  CRICTUI_CACHE_DIR        Cache directory (default $XDG_CACHE_HOME/crictui)
  CRICTUI_LOG              Log level: error, warn, info, debug, trace (default error)"
}

async fn main_ui_loop(
    mut terminal: Terminal<CrosstermBackend<Stdout>>,
    app: Arc<Mutex<App>>,
    engine: &MatchEngine,
    mut ui_events: mpsc::Receiver<UiEvent>,
    mut views: watch::Receiver<Arc<MergedView>>,
    network_requests: mpsc::Sender<NetworkRequest>,
    mut network_responses: mpsc::Receiver<NetworkResponse>,
) {
    let mut loading = LoadingState::default();

    {
        let mut guard = app.lock().await;
        guard.on_view_published(views.borrow_and_update().clone());
        draw::draw(&mut terminal, &mut guard, loading);
    }

    loop {
        tokio::select! {
            Some(ui_event) = ui_events.recv() => {
                let (should_quit, should_redraw) =
                    handle_ui_event(ui_event, &app, engine, &network_requests).await;
                if should_quit {
                    break;
                }
                if should_redraw && !loading.is_loading {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Some(response) = network_responses.recv() => {
                let should_redraw = handle_network_response(response, &app, &mut loading).await;
                if should_redraw {
                    let mut app_guard = app.lock().await;
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            Ok(()) = views.changed() => {
                let view = views.borrow_and_update().clone();
                let mut app_guard = app.lock().await;
                app_guard.on_view_published(view);
                if !loading.is_loading {
                    draw::draw(&mut terminal, &mut app_guard, loading);
                }
            }

            else => break,
        }
    }
}

/// Returns `(quit, redraw)`.
async fn handle_ui_event(
    ui_event: UiEvent,
    app: &Arc<Mutex<App>>,
    engine: &MatchEngine,
    network_requests: &mpsc::Sender<NetworkRequest>,
) -> (bool, bool) {
    match ui_event {
        UiEvent::KeyPressed(key_event) => {
            let quit = keys::handle_key_bindings(key_event, app, engine, network_requests).await;
            (quit, true)
        }
        UiEvent::Resize => (false, true),
        UiEvent::FocusGained => {
            engine.resume();
            (false, false)
        }
    }
}

async fn handle_network_response(
    response: NetworkResponse,
    app: &Arc<Mutex<App>>,
    loading: &mut LoadingState,
) -> bool {
    match response {
        NetworkResponse::LoadingStateChanged { loading_state } => {
            *loading = loading_state;
            return true;
        }
        NetworkResponse::HistoryExtended { completed } => {
            let mut guard = app.lock().await;
            guard.on_history_extended(completed);
        }
        NetworkResponse::ScorecardLoaded { scorecard } => {
            let mut guard = app.lock().await;
            guard.on_scorecard_loaded(scorecard);
        }
        NetworkResponse::Error { message } => {
            error!("Network error: {message}");
            let mut guard = app.lock().await;
            guard.on_error(message);
        }
    }
    !loading.is_loading
}

fn input_handler_task(ui_events: mpsc::Sender<UiEvent>) {
    while !ui_events.is_closed() {
        match crossterm_event::poll(INPUT_POLL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                error!("terminal input error: {e}");
                break;
            }
        }

        if let Ok(event) = crossterm_event::read() {
            let ui_event = match event {
                Event::Key(key_event) => Some(UiEvent::KeyPressed(key_event)),
                Event::Resize(_, _) => Some(UiEvent::Resize),
                Event::FocusGained => Some(UiEvent::FocusGained),
                _ => None,
            };

            if let Some(ui_event) = ui_event
                && ui_events.blocking_send(ui_event).is_err()
            {
                break;
            }
        }
    }
}

fn setup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, cursor::Hide)?;
    execute!(stdout, terminal::EnterAlternateScreen)?;
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
    execute!(stdout, crossterm_event::EnableFocusChange)?;
    terminal::enable_raw_mode()
}

pub fn cleanup_terminal() -> io::Result<()> {
    let mut stdout = io::stdout();
    execute!(stdout, crossterm_event::DisableFocusChange)?;
    execute!(stdout, cursor::MoveTo(0, 0))?;
    execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
    execute!(stdout, terminal::LeaveAlternateScreen)?;
    execute!(stdout, cursor::Show)?;
    terminal::disable_raw_mode()
}

fn setup_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        let _ = cleanup_terminal();
        better_panic::Settings::auto().create_panic_handler()(panic_info);
    }));
}
