//! What a player view shows, kept in sync from coordinator events.

use std::time::Duration;

use crate::coordinator::{Coordinator, PlayerEvent};
use crate::library::{CategoryGroup, Track, group_by_category};

/// One line of the grouped playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    Category(usize),
    Track(usize),
}

/// Projection of the coordinator state owned by one view.
#[derive(Debug, Clone)]
pub struct ViewModel {
    pub tracks: Vec<Track>,
    pub groups: Vec<CategoryGroup>,
    pub current: Option<usize>,
    pub is_playing: bool,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub volume: f32,
    /// Highlighted playlist index; moves with the keyboard and follows the
    /// playing track.
    pub cursor: usize,
    category_order: Vec<String>,
}

impl ViewModel {
    pub fn new(category_order: Vec<String>) -> Self {
        Self {
            tracks: Vec::new(),
            groups: Vec::new(),
            current: None,
            is_playing: false,
            position: Duration::ZERO,
            duration: None,
            volume: 1.0,
            cursor: 0,
            category_order,
        }
    }

    /// Seed from whatever the coordinator already knows, for views mounted
    /// after playback started.
    pub fn from_coordinator(coordinator: &Coordinator, category_order: Vec<String>) -> Self {
        let mut model = Self::new(category_order);
        model.set_tracks(coordinator.playlist());

        let state = coordinator.state();
        model.current = state.current_index;
        model.is_playing = state.is_playing;
        model.position = state.position;
        model.volume = state.volume;
        if let Some(i) = state.current_index {
            model.cursor = i;
            model.duration = model.tracks.get(i).and_then(|t| t.duration);
        }
        model
    }

    fn set_tracks(&mut self, tracks: Vec<Track>) {
        self.groups = group_by_category(&tracks, &self.category_order);
        self.tracks = tracks;
        self.cursor = self.cursor.min(self.tracks.len().saturating_sub(1));
    }

    pub fn apply(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::PlaylistReady { tracks } => self.set_tracks(tracks.clone()),
            PlayerEvent::TrackChanged { index, track } => {
                if let Some(row) = self.tracks.get_mut(*index) {
                    *row = track.clone();
                }
                self.current = Some(*index);
                self.cursor = *index;
                self.position = Duration::ZERO;
                self.duration = track.duration;
            }
            PlayerEvent::PlayStateChanged { is_playing } => self.is_playing = *is_playing,
            PlayerEvent::PositionUpdated { position, duration } => {
                self.position = *position;
                if duration.is_some() {
                    self.duration = *duration;
                }
            }
            PlayerEvent::MetadataLoaded { index, duration } => {
                if let Some(row) = self.tracks.get_mut(*index) {
                    row.duration = Some(*duration);
                }
                if self.current == Some(*index) {
                    self.duration = Some(*duration);
                }
            }
            PlayerEvent::VolumeChanged { volume } => self.volume = *volume,
        }
    }

    /// Lines in display order: each category header followed by its tracks.
    pub fn lines(&self) -> Vec<Line> {
        let mut lines = Vec::with_capacity(self.tracks.len() + self.groups.len());
        for (g, group) in self.groups.iter().enumerate() {
            lines.push(Line::Category(g));
            lines.extend(group.indices.iter().map(|&i| Line::Track(i)));
        }
        lines
    }

    /// Track indices in display order.
    pub fn display_order(&self) -> Vec<usize> {
        self.groups
            .iter()
            .flat_map(|g| g.indices.iter().copied())
            .collect()
    }

    /// Move the cursor by `delta` rows in display order, stopping at the ends.
    pub fn move_cursor(&mut self, delta: isize) {
        let order = self.display_order();
        if order.is_empty() {
            return;
        }
        let pos = order.iter().position(|&i| i == self.cursor).unwrap_or(0);
        let target = pos
            .saturating_add_signed(delta)
            .min(order.len() - 1);
        self.cursor = order[target];
    }

    /// Fraction of the current track played so far, when its length is known.
    pub fn progress(&self) -> Option<f64> {
        let total = self.duration?.as_secs_f64();
        if total <= 0.0 {
            return None;
        }
        Some((self.position.as_secs_f64() / total).clamp(0.0, 1.0))
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }
}
