use super::*;
use crate::error::OutputError;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;

#[derive(Default)]
struct FakeState {
    loaded: Option<PathBuf>,
    playing: bool,
    finished: bool,
    volume: f32,
    position: Duration,
    seeks: Vec<Duration>,
    broken: HashSet<PathBuf>,
    reported_total: Option<Duration>,
}

/// Output double that records what the coordinator asked of it.
#[derive(Clone, Default)]
struct FakeOutput(Rc<RefCell<FakeState>>);

impl FakeOutput {
    fn finish_track(&self) {
        self.0.borrow_mut().finished = true;
    }
}

impl AudioOutput for FakeOutput {
    fn load(&mut self, path: &Path) -> Result<Option<Duration>, OutputError> {
        let mut s = self.0.borrow_mut();
        s.playing = false;
        s.finished = false;
        s.position = Duration::ZERO;
        if s.broken.contains(path) {
            s.loaded = None;
            return Err(OutputError::Decode {
                path: path.to_path_buf(),
                reason: "broken".to_string(),
            });
        }
        s.loaded = Some(path.to_path_buf());
        Ok(s.reported_total)
    }

    fn play(&mut self) -> Result<(), OutputError> {
        let mut s = self.0.borrow_mut();
        if s.loaded.is_none() {
            return Err(OutputError::NothingLoaded);
        }
        s.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.0.borrow_mut().playing = false;
    }

    fn stop(&mut self) {
        let mut s = self.0.borrow_mut();
        s.loaded = None;
        s.playing = false;
    }

    fn seek(&mut self, position: Duration) -> Result<(), OutputError> {
        let mut s = self.0.borrow_mut();
        s.seeks.push(position);
        s.position = position;
        Ok(())
    }

    fn set_volume(&mut self, volume: f32) {
        self.0.borrow_mut().volume = volume;
    }

    fn position(&self) -> Duration {
        self.0.borrow().position
    }

    fn is_finished(&self) -> bool {
        self.0.borrow().finished
    }
}

#[derive(Default)]
struct Recorder {
    events: RefCell<Vec<PlayerEvent>>,
}

impl Recorder {
    fn take(&self) -> Vec<PlayerEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl PlayerObserver for Recorder {
    fn on_event(&self, event: &PlayerEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

fn no_probing() -> ProbeSettings {
    ProbeSettings {
        enabled: false,
        ..ProbeSettings::default()
    }
}

fn track(name: &str) -> Track {
    let mut t = Track::new(name, format!("/music/{name}.mp3"), "Demo");
    t.duration = Some(Duration::from_secs(200));
    t
}

fn tracks(names: &[&str]) -> Vec<Track> {
    names.iter().map(|n| track(n)).collect()
}

fn setup(names: &[&str]) -> (Coordinator, FakeOutput, Rc<Recorder>) {
    let output = FakeOutput::default();
    let coordinator = Coordinator::new(Box::new(output.clone()), no_probing());
    coordinator.initialize(tracks(names));
    let recorder = Rc::new(Recorder::default());
    coordinator.add_observer(&recorder);
    (coordinator, output, recorder)
}

#[test]
fn select_track_sets_index_without_changing_play_state() {
    let (c, output, rec) = setup(&["a", "b", "c"]);

    c.select_track(2);
    let s = c.state();
    assert_eq!(s.current_index, Some(2));
    assert!(!s.is_playing);
    assert!(!output.0.borrow().playing);
    assert_eq!(
        output.0.borrow().loaded.as_deref(),
        Some(Path::new("/music/c.mp3"))
    );
    assert!(matches!(
        rec.take().as_slice(),
        [PlayerEvent::TrackChanged { index: 2, .. }]
    ));

    c.toggle_play_pause();
    c.select_track(0);
    let s = c.state();
    assert_eq!(s.current_index, Some(0));
    assert!(s.is_playing);
    assert!(output.0.borrow().playing);
}

#[test]
fn select_track_out_of_range_changes_nothing() {
    let (c, _output, rec) = setup(&["a", "b"]);
    c.select_track(1);
    rec.take();
    let before = c.state();

    c.select_track(2);
    c.select_track(usize::MAX);

    assert_eq!(c.state(), before);
    assert!(rec.take().is_empty());
}

#[test]
fn toggle_twice_restores_play_state() {
    let (c, _output, _rec) = setup(&["a", "b"]);
    c.select_track(1);
    let original = c.state().is_playing;

    c.toggle_play_pause();
    assert_ne!(c.state().is_playing, original);
    c.toggle_play_pause();
    assert_eq!(c.state().is_playing, original);
}

#[test]
fn toggle_without_selection_starts_the_first_track() {
    let (c, output, rec) = setup(&["a", "b"]);

    c.toggle_play_pause();

    let s = c.state();
    assert_eq!(s.current_index, Some(0));
    assert!(s.is_playing);
    assert!(output.0.borrow().playing);
    let events = rec.take();
    assert!(matches!(
        events.as_slice(),
        [
            PlayerEvent::TrackChanged { index: 0, .. },
            PlayerEvent::PlayStateChanged { is_playing: true }
        ]
    ));
}

#[test]
fn toggle_on_empty_playlist_is_a_no_op() {
    let (c, _output, rec) = setup(&[]);
    let before = c.state();

    c.toggle_play_pause();

    assert_eq!(c.state(), before);
    assert!(rec.take().is_empty());
}

#[test]
fn transport_before_initialize_is_a_no_op() {
    let c = Coordinator::new(Box::new(FakeOutput::default()), no_probing());
    let rec = Rc::new(Recorder::default());
    c.add_observer(&rec);

    c.toggle_play_pause();
    c.select_track(0);
    c.advance();
    c.retreat();
    c.seek(0.5);

    assert_eq!(c.state().current_index, None);
    assert!(!c.state().is_playing);
    assert!(rec.take().is_empty());
}

#[test]
fn advance_at_last_track_stops_and_keeps_index() {
    let (c, output, rec) = setup(&["a", "b"]);
    c.select_track(1);
    c.toggle_play_pause();
    rec.take();

    c.advance();

    let s = c.state();
    assert_eq!(s.current_index, Some(1));
    assert!(!s.is_playing);
    assert!(!output.0.borrow().playing);
    assert_eq!(
        rec.take(),
        vec![PlayerEvent::PlayStateChanged { is_playing: false }]
    );
}

#[test]
fn retreat_at_first_track_is_a_no_op() {
    let (c, _output, rec) = setup(&["a", "b"]);
    c.select_track(0);
    rec.take();
    let before = c.state();

    c.retreat();

    assert_eq!(c.state(), before);
    assert!(rec.take().is_empty());
}

#[test]
fn retreat_moves_to_previous_track() {
    let (c, _output, _rec) = setup(&["a", "b", "c"]);
    c.select_track(2);
    c.retreat();
    assert_eq!(c.state().current_index, Some(1));
}

#[test]
fn set_volume_clamps_to_unit_range() {
    let (c, output, rec) = setup(&["a"]);

    c.set_volume(-0.5);
    assert_eq!(c.state().volume, 0.0);
    assert_eq!(output.0.borrow().volume, 0.0);

    c.set_volume(1.5);
    assert_eq!(c.state().volume, 1.0);
    assert_eq!(output.0.borrow().volume, 1.0);

    c.set_volume(0.25);
    assert_eq!(c.state().volume, 0.25);

    c.set_volume(f32::NAN);
    assert_eq!(c.state().volume, 0.25);

    assert_eq!(
        rec.take(),
        vec![
            PlayerEvent::VolumeChanged { volume: 0.0 },
            PlayerEvent::VolumeChanged { volume: 1.0 },
            PlayerEvent::VolumeChanged { volume: 0.25 },
        ]
    );
}

#[test]
fn seek_clamps_fraction_of_known_duration() {
    let (c, output, rec) = setup(&["a"]);
    c.select_track(0);
    rec.take();

    c.seek(0.5);
    c.seek(2.0);
    c.seek(-1.0);

    assert_eq!(
        output.0.borrow().seeks,
        vec![
            Duration::from_secs(100),
            Duration::from_secs(200),
            Duration::ZERO
        ]
    );
    assert_eq!(c.state().position, Duration::ZERO);
    assert_eq!(rec.take().len(), 3);
}

#[test]
fn seek_with_unknown_duration_is_ignored() {
    let output = FakeOutput::default();
    let c = Coordinator::new(Box::new(output.clone()), no_probing());
    c.initialize(vec![Track::new("x", "/music/x.mp3", "Demo")]);
    c.select_track(0);

    c.seek(0.5);

    assert!(output.0.borrow().seeks.is_empty());
    assert_eq!(c.state().position, Duration::ZERO);
}

#[test]
fn initialize_only_takes_effect_once() {
    let (c, _output, rec) = setup(&["a", "b"]);

    assert!(!c.initialize(tracks(&["x", "y", "z"])));

    assert_eq!(c.playlist().len(), 2);
    assert_eq!(c.playlist()[0].title, "a");
    assert!(rec.take().is_empty());
}

#[test]
fn playlist_scenario_advances_and_stops_at_the_end() {
    let (c, output, _rec) = setup(&["A", "B", "C"]);

    c.select_track(0);
    c.toggle_play_pause();
    assert!(c.state().is_playing);

    output.finish_track();
    c.tick();
    assert_eq!(c.state().current_index, Some(1));
    assert!(c.state().is_playing);
    assert!(output.0.borrow().playing);

    output.finish_track();
    c.tick();
    assert_eq!(c.state().current_index, Some(2));
    assert!(c.state().is_playing);

    output.finish_track();
    c.tick();
    let s = c.state();
    assert_eq!(s.current_index, Some(2));
    assert!(!s.is_playing);

    // Nothing more happens once stopped.
    c.tick();
    assert_eq!(c.state().current_index, Some(2));
}

#[test]
fn play_after_the_end_restarts_the_track() {
    let (c, output, rec) = setup(&["A"]);
    c.toggle_play_pause();
    output.finish_track();
    c.tick();
    assert!(!c.state().is_playing);
    rec.take();

    c.toggle_play_pause();

    assert!(c.state().is_playing);
    assert!(!output.0.borrow().finished);
    assert!(matches!(
        rec.take().as_slice(),
        [
            PlayerEvent::TrackChanged { index: 0, .. },
            PlayerEvent::PlayStateChanged { is_playing: true }
        ]
    ));
}

#[test]
fn tick_publishes_position_only_while_playing() {
    let (c, output, rec) = setup(&["A"]);
    c.select_track(0);
    rec.take();

    c.tick();
    assert!(rec.take().is_empty());

    c.toggle_play_pause();
    rec.take();
    output.0.borrow_mut().position = Duration::from_secs(42);
    c.tick();

    assert_eq!(c.state().position, Duration::from_secs(42));
    assert_eq!(
        rec.take(),
        vec![PlayerEvent::PositionUpdated {
            position: Duration::from_secs(42),
            duration: Some(Duration::from_secs(200)),
        }]
    );
}

#[test]
fn load_failure_keeps_selection_and_play_stays_off() {
    let output = FakeOutput::default();
    output
        .0
        .borrow_mut()
        .broken
        .insert(PathBuf::from("/music/bad.mp3"));
    let c = Coordinator::new(Box::new(output.clone()), no_probing());
    c.initialize(tracks(&["bad", "good"]));
    let rec = Rc::new(Recorder::default());
    c.add_observer(&rec);

    c.select_track(0);
    assert_eq!(c.state().current_index, Some(0));
    rec.take();

    c.toggle_play_pause();
    assert!(!c.state().is_playing);
    assert!(rec.take().is_empty());

    // The next healthy track still plays.
    c.select_track(1);
    c.toggle_play_pause();
    assert!(c.state().is_playing);
}

#[test]
fn switching_to_a_broken_track_while_playing_stops() {
    let output = FakeOutput::default();
    output
        .0
        .borrow_mut()
        .broken
        .insert(PathBuf::from("/music/bad.mp3"));
    let c = Coordinator::new(Box::new(output.clone()), no_probing());
    c.initialize(tracks(&["good", "bad"]));
    let rec = Rc::new(Recorder::default());
    c.add_observer(&rec);
    c.toggle_play_pause();
    rec.take();

    c.advance();

    assert_eq!(c.state().current_index, Some(1));
    assert!(!c.state().is_playing);
    assert!(matches!(
        rec.take().as_slice(),
        [
            PlayerEvent::TrackChanged { index: 1, .. },
            PlayerEvent::PlayStateChanged { is_playing: false }
        ]
    ));
}

#[test]
fn decoder_reported_duration_fills_unknown_duration() {
    let output = FakeOutput::default();
    output.0.borrow_mut().reported_total = Some(Duration::from_secs(90));
    let c = Coordinator::new(Box::new(output.clone()), no_probing());
    c.initialize(vec![Track::new("x", "/music/x.mp3", "Demo")]);
    let rec = Rc::new(Recorder::default());
    c.add_observer(&rec);

    c.select_track(0);

    assert_eq!(c.track(0).unwrap().duration, Some(Duration::from_secs(90)));
    let events = rec.take();
    assert!(matches!(
        events.as_slice(),
        [
            PlayerEvent::TrackChanged { index: 0, track },
            PlayerEvent::MetadataLoaded { index: 0, .. }
        ] if track.duration == Some(Duration::from_secs(90))
    ));
}

#[derive(Default)]
struct Tagged {
    name: &'static str,
    log: Rc<RefCell<Vec<(&'static str, PlayerEvent)>>>,
}

impl PlayerObserver for Tagged {
    fn on_event(&self, event: &PlayerEvent) {
        self.log.borrow_mut().push((self.name, event.clone()));
    }
}

#[test]
fn events_reach_observers_in_registration_order() {
    let (c, _output, _rec) = setup(&["a", "b"]);
    let log = Rc::new(RefCell::new(Vec::new()));
    let first = Rc::new(Tagged {
        name: "first",
        log: log.clone(),
    });
    let second = Rc::new(Tagged {
        name: "second",
        log: log.clone(),
    });
    c.add_observer(&first);
    c.add_observer(&second);

    c.select_track(1);

    let names: Vec<&str> = log.borrow().iter().map(|(n, _)| *n).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn remove_observer_is_idempotent() {
    let (c, _output, rec) = setup(&["a"]);
    let other = Rc::new(Recorder::default());
    let id = c.add_observer(&other);
    assert_eq!(c.observer_count(), 2);

    c.remove_observer(id);
    c.remove_observer(id);
    assert_eq!(c.observer_count(), 1);

    c.select_track(0);
    assert!(other.take().is_empty());
    assert_eq!(rec.take().len(), 1);
}

#[test]
fn dropped_observers_are_skipped() {
    let (c, _output, _rec) = setup(&["a"]);
    {
        let temporary = Rc::new(Recorder::default());
        c.add_observer(&temporary);
        assert_eq!(c.observer_count(), 2);
    }
    assert_eq!(c.observer_count(), 1);
    c.select_track(0);
}

/// Calls back into the coordinator from inside its callback.
struct Reentrant {
    coordinator: Rc<Coordinator>,
    seen: RefCell<Vec<PlayerEvent>>,
}

impl PlayerObserver for Reentrant {
    fn on_event(&self, event: &PlayerEvent) {
        self.seen.borrow_mut().push(event.clone());
        if let PlayerEvent::TrackChanged { index: 0, .. } = event {
            self.coordinator.select_track(1);
        }
    }
}

#[test]
fn events_emitted_during_delivery_are_queued_not_nested() {
    let coordinator = Rc::new(Coordinator::new(
        Box::new(FakeOutput::default()),
        no_probing(),
    ));
    coordinator.initialize(tracks(&["a", "b"]));
    let reentrant = Rc::new(Reentrant {
        coordinator: coordinator.clone(),
        seen: RefCell::new(Vec::new()),
    });
    let tail = Rc::new(Recorder::default());
    coordinator.add_observer(&reentrant);
    coordinator.add_observer(&tail);

    coordinator.select_track(0);

    // The tail observer sees track 0 before track 1 even though track 1 was
    // selected while track 0 was still being delivered.
    let indices: Vec<usize> = tail
        .take()
        .into_iter()
        .filter_map(|e| match e {
            PlayerEvent::TrackChanged { index, .. } => Some(index),
            _ => None,
        })
        .collect();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(coordinator.state().current_index, Some(1));
    assert_eq!(reentrant.seen.borrow().len(), 2);
}

/// Deregisters itself on the first event it receives.
struct OneShot {
    coordinator: Rc<Coordinator>,
    id: Cell<Option<ObserverId>>,
    count: Cell<usize>,
}

impl PlayerObserver for OneShot {
    fn on_event(&self, _event: &PlayerEvent) {
        self.count.set(self.count.get() + 1);
        if let Some(id) = self.id.take() {
            self.coordinator.remove_observer(id);
        }
    }
}

#[test]
fn removal_during_delivery_is_deferred_and_honored() {
    let coordinator = Rc::new(Coordinator::new(
        Box::new(FakeOutput::default()),
        no_probing(),
    ));
    coordinator.initialize(tracks(&["a", "b"]));
    let one_shot = Rc::new(OneShot {
        coordinator: coordinator.clone(),
        id: Cell::new(None),
        count: Cell::new(0),
    });
    let id = coordinator.add_observer(&one_shot);
    one_shot.id.set(Some(id));

    // Two events from one operation: TrackChanged then PlayStateChanged.
    coordinator.toggle_play_pause();
    coordinator.advance();

    assert_eq!(one_shot.count.get(), 1);
    assert_eq!(coordinator.observer_count(), 0);
}

fn wait_for(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

#[test]
fn probing_fills_unknown_durations_through_tick() {
    let settings = ProbeSettings {
        enabled: true,
        timeout_ms: 1_000,
        batch_size: 2,
        batch_pause_ms: 1,
    };
    let probe_fn: ProbeFn = Arc::new(|path: &Path| {
        let secs = path.file_stem()?.to_str()?.len() as u64 * 60;
        Some(Duration::from_secs(secs))
    });
    let c = Coordinator::new(Box::new(FakeOutput::default()), settings).with_probe_fn(probe_fn);
    let rec = Rc::new(Recorder::default());
    c.add_observer(&rec);

    let mut known = track("known");
    known.duration = Some(Duration::from_secs(7));
    c.initialize(vec![
        Track::new("a", "/music/a.mp3", "Demo"),
        known,
        Track::new("bbb", "/music/bbb.mp3", "Demo"),
    ]);

    assert!(wait_for(|| {
        c.tick();
        c.playlist().iter().all(|t| t.duration.is_some())
    }));

    let p = c.playlist();
    assert_eq!(p[0].duration, Some(Duration::from_secs(60)));
    assert_eq!(p[1].duration, Some(Duration::from_secs(7)));
    assert_eq!(p[2].duration, Some(Duration::from_secs(180)));

    let loaded: Vec<usize> = rec
        .take()
        .into_iter()
        .filter_map(|e| match e {
            PlayerEvent::MetadataLoaded { index, .. } => Some(index),
            _ => None,
        })
        .collect();
    let mut sorted = loaded.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![0, 2]);
}

#[test]
fn slow_probes_leave_duration_unknown() {
    let settings = ProbeSettings {
        enabled: true,
        timeout_ms: 50,
        batch_size: 5,
        batch_pause_ms: 1,
    };
    let probe_fn: ProbeFn = Arc::new(|path: &Path| {
        if path.ends_with("slow.mp3") {
            thread::sleep(Duration::from_millis(500));
        }
        Some(Duration::from_secs(30))
    });
    let c = Coordinator::new(Box::new(FakeOutput::default()), settings).with_probe_fn(probe_fn);
    c.initialize(vec![
        Track::new("slow", "/music/slow.mp3", "Demo"),
        Track::new("fast", "/music/fast.mp3", "Demo"),
    ]);

    assert!(wait_for(|| {
        c.tick();
        c.playlist()[1].duration.is_some()
    }));
    thread::sleep(Duration::from_millis(700));
    c.tick();

    assert_eq!(c.playlist()[0].duration, None);
    assert_eq!(c.playlist()[1].duration, Some(Duration::from_secs(30)));
}

#[test]
fn shutdown_stops_playback_and_notifies() {
    let (c, output, rec) = setup(&["a"]);
    c.toggle_play_pause();
    rec.take();

    c.shutdown(Duration::ZERO);

    assert!(!c.state().is_playing);
    assert!(output.0.borrow().loaded.is_none());
    assert_eq!(
        rec.take(),
        vec![PlayerEvent::PlayStateChanged { is_playing: false }]
    );
}
