use std::env;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc;

use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::info;

use crate::coordinator::Coordinator;
use crate::mpris::ControlCmd;
use crate::view::{PlayerView, ViewKind, ViewOptions};

mod event_loop;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();
    startup::init_logging(&settings.logging);

    let source = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    let tracks = startup::load_playlist(&source, &settings.library)?;

    let volume = settings.audio.initial_volume;
    let output = startup::open_output(volume);
    let coordinator = Rc::new(Coordinator::new(output, settings.probe.clone()));
    coordinator.set_volume(volume);

    let options = ViewOptions::from_settings(&settings);
    let mut views = vec![PlayerView::mount(
        Rc::clone(&coordinator),
        ViewKind::Full,
        options.clone(),
        Some(tracks),
    )];
    if settings.ui.mini_player {
        views.push(PlayerView::mount(Rc::clone(&coordinator), ViewKind::Mini, options, None));
    }

    let (control_tx, control_rx) = mpsc::channel::<ControlCmd>();
    let mpris = Rc::new(crate::mpris::spawn_mpris(control_tx));
    mpris.sync_from(&coordinator);
    let mpris_id = coordinator.add_observer(&mpris);
    info!(views = views.len(), "player started");

    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut state = event_loop::EventLoopState::new(views);
    let run_result = event_loop::run(&mut terminal, &settings, &coordinator, &control_rx, &mut state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    coordinator.remove_observer(mpris_id);
    drop(state);
    info!("player stopped");

    run_result
}
