//! Player views: terminal surfaces that render the coordinator's state and
//! forward user gestures to it.
//!
//! Any number of views can be mounted on the same coordinator. Each keeps its
//! own projection ([`ViewModel`]) updated from coordinator events, so views
//! never talk to each other and never touch the audio output.

mod input;
mod model;
mod render;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crossterm::event::KeyEvent;
use ratatui::{Frame, layout::Rect};
use tracing::debug;

use crate::config::Settings;
use crate::coordinator::{Coordinator, ObserverId, PlayerEvent, PlayerObserver};
use crate::library::Track;

pub use input::{Gesture, gesture_for_key};
pub use model::{Line, ViewModel};
pub use render::HitAreas;

/// Layout variant of a player view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// Whole-screen player with the grouped playlist.
    Full,
    /// Small now-playing overlay in the bottom-right corner.
    Mini,
}

/// Per-view presentation settings.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub header_text: String,
    pub category_order: Vec<String>,
    /// Fraction of the track skipped by one seek gesture.
    pub seek_step: f64,
    /// Volume change of one volume gesture.
    pub volume_step: f32,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl ViewOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            header_text: settings.ui.header_text.clone(),
            category_order: settings.ui.category_order.clone(),
            seek_step: f64::from(settings.controls.seek_step_percent) / 100.0,
            volume_step: f32::from(settings.controls.volume_step_percent) / 100.0,
        }
    }
}

/// A mounted player view.
pub struct PlayerView {
    kind: ViewKind,
    coordinator: Rc<Coordinator>,
    options: ViewOptions,
    model: RefCell<ViewModel>,
    hit: RefCell<HitAreas>,
    id: Cell<Option<ObserverId>>,
}

impl PlayerView {
    /// Register a new view with `coordinator`.
    ///
    /// The view starts from the coordinator's current state. If no playlist
    /// is set yet and `initial` is given, the view hands it to the coordinator;
    /// when several views race to do so, the first one wins and the others
    /// pick it up from the resulting `PlaylistReady` event.
    pub fn mount(
        coordinator: Rc<Coordinator>,
        kind: ViewKind,
        options: ViewOptions,
        initial: Option<Vec<Track>>,
    ) -> Rc<Self> {
        let model = ViewModel::from_coordinator(&coordinator, options.category_order.clone());
        let view = Rc::new(Self {
            kind,
            coordinator: Rc::clone(&coordinator),
            options,
            model: RefCell::new(model),
            hit: RefCell::new(HitAreas::default()),
            id: Cell::new(None),
        });

        let id = coordinator.add_observer(&view);
        view.id.set(Some(id));
        debug!(?kind, "view mounted");

        if let Some(tracks) = initial {
            if !coordinator.has_playlist() {
                coordinator.initialize(tracks);
            }
        }
        view
    }

    /// Deregister from the coordinator. Playback is unaffected, and calling
    /// this more than once is harmless.
    pub fn unmount(&self) {
        if let Some(id) = self.id.take() {
            self.coordinator.remove_observer(id);
            debug!(kind = ?self.kind, "view unmounted");
        }
    }

    /// Snapshot of the view's projection.
    pub fn model(&self) -> ViewModel {
        self.model.borrow().clone()
    }

    /// Screen regions recorded by the last [`render`](Self::render).
    pub fn hit_areas(&self) -> HitAreas {
        self.hit.borrow().clone()
    }

    /// Draw the view. The full view fills `area`; the mini view floats in its
    /// bottom-right corner.
    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let model = self.model.borrow();
        let hit = match self.kind {
            ViewKind::Full => {
                render::draw_full(frame, area, &model, &self.options.header_text, focused)
            }
            ViewKind::Mini => {
                let corner = render::corner_rect(44, 4, area);
                render::draw_mini(frame, corner, &model, focused)
            }
        };
        *self.hit.borrow_mut() = hit;
    }

    /// Handle a key press. Returns whether the key meant something to the view.
    pub fn handle_key(&self, key: KeyEvent) -> bool {
        match gesture_for_key(key) {
            Some(gesture) => {
                self.apply_gesture(gesture);
                true
            }
            None => false,
        }
    }

    /// Handle a left click at terminal cell (`col`, `row`), using the areas
    /// of the last render. Returns whether the click landed on the view.
    pub fn handle_click(&self, col: u16, row: u16) -> bool {
        let hit = self.hit.borrow().clone();

        if input::hits(hit.progress, col, row) {
            let fraction = f64::from(col - hit.progress.x) / f64::from(hit.progress.width.max(1));
            self.coordinator.seek(fraction);
            return true;
        }

        if input::hits(hit.list, col, row) {
            let line = hit.list_offset + usize::from(row - hit.list.y);
            if let Some(Line::Track(index)) = hit.lines.get(line).copied() {
                self.model.borrow_mut().cursor = index;
                self.coordinator.select_track(index);
            }
            return true;
        }

        false
    }

    /// Translate a gesture into coordinator calls.
    pub fn apply_gesture(&self, gesture: Gesture) {
        let c = &self.coordinator;
        match gesture {
            Gesture::CursorDown => self.model.borrow_mut().move_cursor(1),
            Gesture::CursorUp => self.model.borrow_mut().move_cursor(-1),
            Gesture::PlayCursor => {
                let (cursor, current, has_tracks) = {
                    let m = self.model.borrow();
                    (m.cursor, m.current, !m.tracks.is_empty())
                };
                if !has_tracks {
                    return;
                }
                if current == Some(cursor) {
                    c.toggle_play_pause();
                } else {
                    c.select_track(cursor);
                    if !c.state().is_playing {
                        c.toggle_play_pause();
                    }
                }
            }
            Gesture::TogglePlay => c.toggle_play_pause(),
            Gesture::Next => c.advance(),
            Gesture::Previous => c.retreat(),
            Gesture::SeekForward | Gesture::SeekBackward => {
                let Some(progress) = self.model.borrow().progress() else {
                    return;
                };
                let step = match gesture {
                    Gesture::SeekForward => self.options.seek_step,
                    _ => -self.options.seek_step,
                };
                c.seek(progress + step);
            }
            Gesture::VolumeUp => c.set_volume(c.state().volume + self.options.volume_step),
            Gesture::VolumeDown => c.set_volume(c.state().volume - self.options.volume_step),
        }
    }
}

impl PlayerObserver for PlayerView {
    fn on_event(&self, event: &PlayerEvent) {
        self.model.borrow_mut().apply(event);
    }
}

impl Drop for PlayerView {
    fn drop(&mut self) {
        self.unmount();
    }
}
