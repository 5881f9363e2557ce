//! MPRIS2 surface so desktop media keys and `playerctl` can see and drive
//! the player.
//!
//! The D-Bus side runs on its own thread and only reads a shared snapshot.
//! [`MprisHandle`] is registered with the coordinator like any view and keeps
//! that snapshot current; commands coming in over the bus are sent back to
//! the event loop as [`ControlCmd`]s.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc::Sender};
use std::time::Duration;

use async_io::{Timer, block_on};
use tracing::{debug, warn};
use zbus::{Connection, interface};
use zvariant::{ObjectPath, OwnedValue, Value};

use crate::coordinator::{Coordinator, PlayerEvent, PlayerObserver};

const BUS_NAME: &str = "org.mpris.MediaPlayer2.playdeck";
const OBJECT_PATH: &str = "/org/mpris/MediaPlayer2";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControlCmd {
    Quit,
    Play,
    Pause,
    PlayPause,
    Stop,
    Next,
    Prev,
}

impl ControlCmd {
    /// Carry out the command on `coordinator`. Returns `true` for `Quit`.
    pub fn apply(self, coordinator: &Coordinator) -> bool {
        let playing = coordinator.state().is_playing;
        match self {
            ControlCmd::Quit => return true,
            ControlCmd::Play if !playing => coordinator.toggle_play_pause(),
            ControlCmd::Pause if playing => coordinator.toggle_play_pause(),
            ControlCmd::Play | ControlCmd::Pause => {}
            ControlCmd::PlayPause => coordinator.toggle_play_pause(),
            // Pause and reload the current track from the top. The coordinator
            // has no separate stopped state, so the bus then reports `Paused`.
            ControlCmd::Stop => {
                if playing {
                    coordinator.toggle_play_pause();
                }
                if let Some(index) = coordinator.state().current_index {
                    coordinator.select_track(index);
                }
            }
            ControlCmd::Next => coordinator.advance(),
            ControlCmd::Prev => coordinator.retreat(),
        }
        false
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum Status {
    #[default]
    Stopped,
    Playing,
    Paused,
}

impl Status {
    fn as_str(self) -> &'static str {
        match self {
            Status::Stopped => "Stopped",
            Status::Playing => "Playing",
            Status::Paused => "Paused",
        }
    }
}

#[derive(Debug, Default)]
struct SharedState {
    status: Status,
    index: Option<usize>,
    title: Option<String>,
    category: Option<String>,
    length: Option<Duration>,
    position: Duration,
    volume: f64,
}

impl SharedState {
    fn apply(&mut self, event: &PlayerEvent) {
        match event {
            PlayerEvent::PlaylistReady { .. } => {}
            PlayerEvent::TrackChanged { index, track } => {
                self.index = Some(*index);
                self.title = Some(track.title.clone());
                self.category = Some(track.category.clone());
                self.length = track.duration;
                self.position = Duration::ZERO;
                if self.status == Status::Stopped {
                    self.status = Status::Paused;
                }
            }
            PlayerEvent::PlayStateChanged { is_playing } => {
                self.status = match (*is_playing, self.index) {
                    (true, _) => Status::Playing,
                    (false, Some(_)) => Status::Paused,
                    (false, None) => Status::Stopped,
                };
            }
            PlayerEvent::PositionUpdated { position, duration } => {
                self.position = *position;
                if duration.is_some() {
                    self.length = *duration;
                }
            }
            PlayerEvent::MetadataLoaded { index, duration } => {
                if self.index == Some(*index) {
                    self.length = Some(*duration);
                }
            }
            PlayerEvent::VolumeChanged { volume } => self.volume = f64::from(*volume),
        }
    }
}

/// Coordinator-side end of the MPRIS service.
pub struct MprisHandle {
    state: Arc<Mutex<SharedState>>,
}

impl MprisHandle {
    /// Copy the coordinator's current state, for a handle registered after
    /// playback started.
    pub fn sync_from(&self, coordinator: &Coordinator) {
        let snapshot = coordinator.state();
        let Ok(mut s) = self.state.lock() else {
            return;
        };
        s.volume = f64::from(snapshot.volume);
        s.position = snapshot.position;
        if let Some(index) = snapshot.current_index {
            if let Some(track) = coordinator.track(index) {
                s.apply(&PlayerEvent::TrackChanged { index, track });
            }
        }
        s.apply(&PlayerEvent::PlayStateChanged {
            is_playing: snapshot.is_playing,
        });
    }
}

impl PlayerObserver for MprisHandle {
    fn on_event(&self, event: &PlayerEvent) {
        if let Ok(mut s) = self.state.lock() {
            s.apply(event);
        }
    }
}

struct RootIface {
    tx: Sender<ControlCmd>,
}

#[interface(name = "org.mpris.MediaPlayer2")]
impl RootIface {
    fn raise(&self) {}

    fn quit(&self) {
        let _ = self.tx.send(ControlCmd::Quit);
    }

    #[zbus(property)]
    fn can_quit(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_raise(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn has_track_list(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn identity(&self) -> &str {
        "playdeck"
    }

    #[zbus(property)]
    fn supported_uri_schemes(&self) -> Vec<String> {
        vec![]
    }

    #[zbus(property)]
    fn supported_mime_types(&self) -> Vec<String> {
        vec![]
    }
}

struct PlayerIface {
    tx: Sender<ControlCmd>,
    state: Arc<Mutex<SharedState>>,
}

fn owned(value: Value<'_>) -> Option<OwnedValue> {
    OwnedValue::try_from(value).ok()
}

#[interface(name = "org.mpris.MediaPlayer2.Player")]
impl PlayerIface {
    fn next(&self) {
        let _ = self.tx.send(ControlCmd::Next);
    }

    fn previous(&self) {
        let _ = self.tx.send(ControlCmd::Prev);
    }

    fn play(&self) {
        let _ = self.tx.send(ControlCmd::Play);
    }

    fn pause(&self) {
        let _ = self.tx.send(ControlCmd::Pause);
    }

    fn play_pause(&self) {
        let _ = self.tx.send(ControlCmd::PlayPause);
    }

    fn stop(&self) {
        let _ = self.tx.send(ControlCmd::Stop);
    }

    #[zbus(property)]
    fn playback_status(&self) -> &str {
        match self.state.lock() {
            Ok(s) => s.status.as_str(),
            Err(_) => Status::Stopped.as_str(),
        }
    }

    /// Microseconds into the current track.
    #[zbus(property)]
    fn position(&self) -> i64 {
        self.state
            .lock()
            .map(|s| i64::try_from(s.position.as_micros()).unwrap_or(i64::MAX))
            .unwrap_or(0)
    }

    #[zbus(property)]
    fn volume(&self) -> f64 {
        self.state.lock().map(|s| s.volume).unwrap_or(0.0)
    }

    #[zbus(property)]
    fn can_control(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_play(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_pause(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_seek(&self) -> bool {
        false
    }

    #[zbus(property)]
    fn can_go_next(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn can_go_previous(&self) -> bool {
        true
    }

    #[zbus(property)]
    fn metadata(&self) -> HashMap<String, OwnedValue> {
        let mut map = HashMap::new();
        let Ok(s) = self.state.lock() else {
            return map;
        };

        if let Some(index) = s.index {
            let id = format!("{OBJECT_PATH}/track/{index}");
            if let Some(v) = ObjectPath::try_from(id).ok().and_then(|p| owned(Value::from(p))) {
                map.insert("mpris:trackid".to_string(), v);
            }
        }
        if let Some(v) = owned(Value::from(s.title.clone().unwrap_or_default())) {
            map.insert("xesam:title".to_string(), v);
        }
        if let Some(category) = s.category.clone() {
            if let Some(v) = owned(Value::from(vec![category])) {
                map.insert("xesam:genre".to_string(), v);
            }
        }
        if let Some(length) = s.length {
            let micros = i64::try_from(length.as_micros()).unwrap_or(i64::MAX);
            if let Some(v) = owned(Value::from(micros)) {
                map.insert("mpris:length".to_string(), v);
            }
        }
        map
    }
}

/// Start the MPRIS service on a background thread. Bus failures are logged
/// and leave the returned handle working, just unseen.
pub fn spawn_mpris(tx: Sender<ControlCmd>) -> MprisHandle {
    let state = Arc::new(Mutex::new(SharedState {
        volume: 1.0,
        ..SharedState::default()
    }));

    let state_for_thread = state.clone();
    let spawned = std::thread::Builder::new()
        .name("mpris".into())
        .spawn(move || {
            block_on(async move {
                let connection = match Connection::session().await {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(error = %e, "MPRIS: failed to connect to session bus");
                        return;
                    }
                };

                if let Err(e) = connection.request_name(BUS_NAME).await {
                    warn!(error = %e, "MPRIS: failed to acquire name");
                    return;
                }

                let object_server = connection.object_server();

                if let Err(e) = object_server.at(OBJECT_PATH, RootIface { tx: tx.clone() }).await {
                    warn!(error = %e, "MPRIS: failed to register root iface");
                    return;
                }

                if let Err(e) = object_server
                    .at(
                        OBJECT_PATH,
                        PlayerIface {
                            tx,
                            state: state_for_thread,
                        },
                    )
                    .await
                {
                    warn!(error = %e, "MPRIS: failed to register player iface");
                    return;
                }
                debug!(name = BUS_NAME, "MPRIS service registered");

                // Keep the service alive.
                loop {
                    Timer::after(Duration::from_secs(3600)).await;
                }
            });
        });
    if let Err(e) = spawned {
        warn!(error = %e, "MPRIS: failed to start service thread");
    }

    MprisHandle { state }
}
