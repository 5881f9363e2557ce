//! The playback coordinator: one shared source of truth for what is playing.
//!
//! A single `Coordinator` owns the audio output, the playlist and the
//! playback state. Player surfaces never touch the output; they call the
//! coordinator's operations and render from the events it pushes back.
//! Everything here runs on one thread. Background work (duration probing)
//! only reports back through a channel that [`Coordinator::tick`] drains.

mod events;
mod observers;
pub mod probe;

use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::audio::AudioOutput;
use crate::config::ProbeSettings;
use crate::library::Track;

pub use events::{PlaybackSnapshot, PlayerEvent};
pub use observers::{ObserverId, PlayerObserver};

use observers::{Dispatch, ObserverRegistry, RegistryChange};
use probe::{ProbeFn, ProbeHandle, ProbeOutcome};

/// Playlist, playback state and the output they drive.
struct Inner {
    /// `None` until `initialize` runs.
    playlist: Option<Vec<Track>>,
    current: Option<usize>,
    is_playing: bool,
    position: Duration,
    volume: f32,
    output: Box<dyn AudioOutput>,
}

impl Inner {
    fn len(&self) -> usize {
        self.playlist.as_ref().map_or(0, Vec::len)
    }

    fn track(&self, index: usize) -> Option<&Track> {
        self.playlist.as_ref().and_then(|p| p.get(index))
    }

    fn current_duration(&self) -> Option<Duration> {
        self.current
            .and_then(|i| self.track(i))
            .and_then(|t| t.duration)
    }

    /// Record a newly learned duration. Returns the event to publish, if any.
    fn learn_duration(&mut self, index: usize, duration: Duration) -> Option<PlayerEvent> {
        let track = self.playlist.as_mut()?.get_mut(index)?;
        if track.duration == Some(duration) {
            return None;
        }
        track.duration = Some(duration);
        Some(PlayerEvent::MetadataLoaded { index, duration })
    }

    fn select(&mut self, index: usize) -> Vec<PlayerEvent> {
        let Some(path) = self.track(index).map(|t| t.path.clone()) else {
            debug!(index, len = self.len(), "ignoring selection outside the playlist");
            return Vec::new();
        };

        self.current = Some(index);
        self.position = Duration::ZERO;

        let mut trailing = Vec::new();
        match self.output.load(&path) {
            Ok(Some(total)) => {
                if self.track(index).and_then(|t| t.duration).is_none() {
                    trailing.extend(self.learn_duration(index, total));
                }
            }
            Ok(None) => {}
            Err(e) => warn!(index, error = %e, "failed to load track"),
        }

        if self.is_playing {
            if let Err(e) = self.output.play() {
                warn!(index, error = %e, "failed to continue playback on the new track");
                self.is_playing = false;
                trailing.push(PlayerEvent::PlayStateChanged { is_playing: false });
            }
        }

        let Some(track) = self.track(index).cloned() else {
            return trailing;
        };
        debug!(index, title = %track.title, "track selected");

        let mut events = vec![PlayerEvent::TrackChanged { index, track }];
        events.append(&mut trailing);
        events
    }

    fn toggle_play_pause(&mut self) -> Vec<PlayerEvent> {
        if self.len() == 0 {
            return Vec::new();
        }

        let mut events = Vec::new();
        let index = match self.current {
            Some(i) => i,
            None => {
                events.extend(self.select(0));
                0
            }
        };

        if self.is_playing {
            self.output.pause();
            self.is_playing = false;
        } else {
            // A finished track restarts from the top, like pressing play at the end.
            if self.output.is_finished() {
                events.extend(self.select(index));
            }
            if let Err(e) = self.output.play() {
                warn!(index, error = %e, "playback did not start");
                return events;
            }
            self.is_playing = true;
        }

        debug!(is_playing = self.is_playing, "play state toggled");
        events.push(PlayerEvent::PlayStateChanged {
            is_playing: self.is_playing,
        });
        events
    }

    fn advance(&mut self) -> Vec<PlayerEvent> {
        let Some(current) = self.current else {
            return Vec::new();
        };

        if current + 1 < self.len() {
            return self.select(current + 1);
        }

        // End of the playlist: no wrap-around.
        if self.is_playing {
            self.output.pause();
        }
        self.is_playing = false;
        debug!(index = current, "reached the end of the playlist");
        vec![PlayerEvent::PlayStateChanged { is_playing: false }]
    }

    fn retreat(&mut self) -> Vec<PlayerEvent> {
        match self.current {
            Some(current) if current > 0 => self.select(current - 1),
            _ => Vec::new(),
        }
    }

    fn seek(&mut self, fraction: f64) -> Vec<PlayerEvent> {
        if fraction.is_nan() || self.current.is_none() {
            return Vec::new();
        }
        let Some(duration) = self.current_duration() else {
            debug!("ignoring seek on a track with unknown duration");
            return Vec::new();
        };

        let target = duration.mul_f64(fraction.clamp(0.0, 1.0));
        if let Err(e) = self.output.seek(target) {
            warn!(error = %e, "seek failed");
            return Vec::new();
        }
        self.position = target;
        vec![PlayerEvent::PositionUpdated {
            position: target,
            duration: Some(duration),
        }]
    }

    fn set_volume(&mut self, fraction: f32) -> Vec<PlayerEvent> {
        if fraction.is_nan() {
            return Vec::new();
        }
        let volume = fraction.clamp(0.0, 1.0);
        self.output.set_volume(volume);
        self.volume = volume;
        vec![PlayerEvent::VolumeChanged { volume }]
    }

    fn tick(&mut self) -> Vec<PlayerEvent> {
        if !self.is_playing {
            return Vec::new();
        }
        if self.output.is_finished() {
            debug!(index = ?self.current, "track finished");
            return self.advance();
        }

        self.position = self.output.position();
        vec![PlayerEvent::PositionUpdated {
            position: self.position,
            duration: self.current_duration(),
        }]
    }

    fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            current_index: self.current,
            is_playing: self.is_playing,
            position: self.position,
            volume: self.volume,
        }
    }
}

/// Process-wide playback coordinator.
///
/// Construct one at startup, wrap it in an `Rc` and hand it to every player
/// surface.
pub struct Coordinator {
    inner: RefCell<Inner>,
    observers: RefCell<ObserverRegistry>,
    dispatch: RefCell<Dispatch>,
    next_observer: Cell<u64>,
    probe_settings: ProbeSettings,
    probe_fn: ProbeFn,
    probes: RefCell<Option<ProbeHandle>>,
}

impl Coordinator {
    pub fn new(mut output: Box<dyn AudioOutput>, probe_settings: ProbeSettings) -> Self {
        let volume = 1.0;
        output.set_volume(volume);
        Self {
            inner: RefCell::new(Inner {
                playlist: None,
                current: None,
                is_playing: false,
                position: Duration::ZERO,
                volume,
                output,
            }),
            observers: RefCell::new(ObserverRegistry::default()),
            dispatch: RefCell::new(Dispatch::default()),
            next_observer: Cell::new(0),
            probe_settings,
            probe_fn: Arc::new(probe::read_duration),
            probes: RefCell::new(None),
        }
    }

    /// Replace the function used to read durations in the background.
    pub fn with_probe_fn(mut self, probe_fn: ProbeFn) -> Self {
        self.probe_fn = probe_fn;
        self
    }

    /// Set the playlist. Only the first call has any effect; it returns
    /// whether this call was the one that set it.
    pub fn initialize(&self, playlist: Vec<Track>) -> bool {
        let jobs: Vec<(usize, PathBuf)> = {
            let mut inner = self.inner.borrow_mut();
            if inner.playlist.is_some() {
                debug!("playlist already initialized; ignoring");
                return false;
            }
            let jobs = playlist
                .iter()
                .enumerate()
                .filter(|(_, t)| t.duration.is_none())
                .map(|(i, t)| (i, t.path.clone()))
                .collect();
            inner.playlist = Some(playlist);
            jobs
        };

        let tracks = self.playlist();
        info!(tracks = tracks.len(), unknown_durations = jobs.len(), "playlist ready");

        if self.probe_settings.enabled && !jobs.is_empty() {
            let handle = probe::spawn(jobs, &self.probe_settings, Arc::clone(&self.probe_fn));
            *self.probes.borrow_mut() = Some(handle);
        }

        self.publish(vec![PlayerEvent::PlaylistReady { tracks }]);
        true
    }

    pub fn has_playlist(&self) -> bool {
        self.inner.borrow().playlist.is_some()
    }

    /// Copy of the playlist with every duration learned so far.
    pub fn playlist(&self) -> Vec<Track> {
        self.inner.borrow().playlist.clone().unwrap_or_default()
    }

    pub fn track(&self, index: usize) -> Option<Track> {
        self.inner.borrow().track(index).cloned()
    }

    pub fn state(&self) -> PlaybackSnapshot {
        self.inner.borrow().snapshot()
    }

    /// Select and load the track at `index`. Out-of-range indices are ignored.
    /// Selection keeps the current play/pause state.
    pub fn select_track(&self, index: usize) {
        let events = self.inner.borrow_mut().select(index);
        self.publish(events);
    }

    /// Flip between playing and paused, selecting the first track if nothing
    /// is selected yet. Does nothing on an empty playlist.
    pub fn toggle_play_pause(&self) {
        let events = self.inner.borrow_mut().toggle_play_pause();
        self.publish(events);
    }

    /// Move to the next track, or stop at the end of the playlist.
    pub fn advance(&self) {
        let events = self.inner.borrow_mut().advance();
        self.publish(events);
    }

    /// Move to the previous track; nothing happens on the first one.
    pub fn retreat(&self) {
        let events = self.inner.borrow_mut().retreat();
        self.publish(events);
    }

    /// Jump to `fraction` (clamped to `[0, 1]`) of the current track.
    /// Ignored while the track's duration is unknown.
    pub fn seek(&self, fraction: f64) {
        let events = self.inner.borrow_mut().seek(fraction);
        self.publish(events);
    }

    pub fn set_volume(&self, fraction: f32) {
        let events = self.inner.borrow_mut().set_volume(fraction);
        self.publish(events);
    }

    /// Time-update pulse, called periodically by the event loop.
    ///
    /// Applies finished duration probes, publishes progress while playing and
    /// advances when the current track has ended.
    pub fn tick(&self) {
        let mut events = self.apply_probe_outcomes();
        events.extend(self.inner.borrow_mut().tick());
        self.publish(events);
    }

    /// Fade out and stop playback, and cancel any pending probes.
    pub fn shutdown(&self, fade_out: Duration) {
        self.probes.borrow_mut().take();
        let was_playing = {
            let mut inner = self.inner.borrow_mut();
            inner.output.fade_out(fade_out);
            std::mem::replace(&mut inner.is_playing, false)
        };
        if was_playing {
            self.publish(vec![PlayerEvent::PlayStateChanged { is_playing: false }]);
        }
    }

    /// Register `observer`. It is held weakly; deregister it with
    /// [`remove_observer`](Self::remove_observer) when the surface goes away.
    pub fn add_observer<O: PlayerObserver + 'static>(&self, observer: &Rc<O>) -> ObserverId {
        let id = ObserverId(self.next_observer.get());
        self.next_observer.set(id.0 + 1);

        let weak: Weak<dyn PlayerObserver> = Rc::downgrade(observer) as Weak<dyn PlayerObserver>;
        let mut dispatch = self.dispatch.borrow_mut();
        if dispatch.delivering {
            dispatch.deferred.push(RegistryChange::Add(id, weak));
        } else {
            self.observers.borrow_mut().insert(id, weak);
        }
        debug!(observer = id.0, "observer registered");
        id
    }

    /// Deregister `id`. Removing an unknown or already removed id is a no-op.
    pub fn remove_observer(&self, id: ObserverId) {
        let mut dispatch = self.dispatch.borrow_mut();
        if dispatch.delivering {
            dispatch.deferred.push(RegistryChange::Remove(id));
        } else if self.observers.borrow_mut().remove(id) {
            debug!(observer = id.0, "observer removed");
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.borrow().len()
    }

    fn apply_probe_outcomes(&self) -> Vec<PlayerEvent> {
        let (outcomes, finished) = match self.probes.borrow().as_ref() {
            Some(handle) => handle.drain(),
            None => return Vec::new(),
        };
        if finished {
            info!("duration probing complete");
            self.probes.borrow_mut().take();
        }

        let mut inner = self.inner.borrow_mut();
        outcomes
            .into_iter()
            .filter_map(|ProbeOutcome { index, duration }| match duration {
                Some(d) => inner.learn_duration(index, d),
                None => {
                    debug!(index, "duration stays unknown");
                    None
                }
            })
            .collect()
    }

    /// Queue `events` and deliver them unless a delivery is already running,
    /// in which case that delivery picks them up.
    fn publish(&self, events: Vec<PlayerEvent>) {
        if events.is_empty() {
            return;
        }
        {
            let mut dispatch = self.dispatch.borrow_mut();
            dispatch.queue.extend(events);
            if dispatch.delivering {
                return;
            }
            dispatch.delivering = true;
        }

        loop {
            let Some(event) = self.dispatch.borrow_mut().queue.pop_front() else {
                break;
            };
            let targets = self.observers.borrow_mut().live();
            for (id, observer) in targets {
                if self.dispatch.borrow().is_leaving(id) {
                    continue;
                }
                observer.on_event(&event);
            }
            self.apply_deferred();
        }

        self.dispatch.borrow_mut().delivering = false;
    }

    fn apply_deferred(&self) {
        let changes = std::mem::take(&mut self.dispatch.borrow_mut().deferred);
        let mut observers = self.observers.borrow_mut();
        for change in changes {
            match change {
                RegistryChange::Add(id, weak) => observers.insert(id, weak),
                RegistryChange::Remove(id) => {
                    observers.remove(id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests;
