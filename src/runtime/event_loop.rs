use std::rc::Rc;
use std::sync::mpsc;
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseButton, MouseEventKind};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::debug;

use crate::config;
use crate::coordinator::Coordinator;
use crate::mpris::ControlCmd;
use crate::view::PlayerView;

/// How often the coordinator's time-update pulse runs.
const TICK: Duration = Duration::from_millis(50);

/// Mounted views, in drawing order (the last one is drawn on top), and which
/// of them receives key presses.
pub struct EventLoopState {
    views: Vec<Rc<PlayerView>>,
    focus: usize,
}

impl EventLoopState {
    pub fn new(views: Vec<Rc<PlayerView>>) -> Self {
        Self { views, focus: 0 }
    }

    pub fn focused(&self) -> Option<&Rc<PlayerView>> {
        self.views.get(self.focus)
    }

    pub fn cycle_focus(&mut self) {
        if !self.views.is_empty() {
            self.focus = (self.focus + 1) % self.views.len();
        }
    }

    /// Route a left click to the top-most view under the cursor and focus it.
    pub fn click(&mut self, col: u16, row: u16) -> bool {
        for (i, view) in self.views.iter().enumerate().rev() {
            if view.handle_click(col, row) {
                self.focus = i;
                return true;
            }
        }
        false
    }
}

/// Main terminal event loop: pulses the coordinator, draws every view and
/// routes input. Returns `Ok(())` once quitting was requested and playback
/// has been faded out.
pub fn run(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    coordinator: &Coordinator,
    control_rx: &mpsc::Receiver<ControlCmd>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    let fade_out = Duration::from_millis(settings.audio.quit_fade_out_ms);
    let mut last_tick = Instant::now();

    loop {
        if last_tick.elapsed() >= TICK {
            coordinator.tick();
            last_tick = Instant::now();
        }

        while let Ok(cmd) = control_rx.try_recv() {
            debug!(?cmd, "media key command");
            if cmd.apply(coordinator) {
                coordinator.shutdown(fade_out);
                return Ok(());
            }
        }

        terminal.draw(|f| {
            let area = f.area();
            for (i, view) in state.views.iter().enumerate() {
                view.render(f, area, i == state.focus);
            }
        })?;

        let timeout = TICK.saturating_sub(last_tick.elapsed());
        if !event::poll(timeout)? {
            continue;
        }
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') => {
                    coordinator.shutdown(fade_out);
                    return Ok(());
                }
                KeyCode::Tab => state.cycle_focus(),
                _ => {
                    if let Some(view) = state.focused() {
                        view.handle_key(key);
                    }
                }
            },
            Event::Mouse(mouse) => {
                if let MouseEventKind::Down(MouseButton::Left) = mouse.kind {
                    state.click(mouse.column, mouse.row);
                }
            }
            _ => {}
        }
    }
}
