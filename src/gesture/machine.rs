//! Core gesture state machine
//!
//! Holding the trigger (back) button opens a chord. While it is held the
//! wheel steps the volume and a middle click flips between fine and
//! coarse steps. Any chord activity swallows the eventual trigger release
//! so the OS never sees a stray "back" click.

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::audio::{AudioEndpoint, AudioError, AudioSlot, EndpointProvider};
use crate::events::GestureEvent;
use crate::keys::{KeyReplay, VolumeKey};

use super::pointer::{Decision, PointerEvent, ScrollDirection, StepMode};
use super::step::next_fine_level;

/// Entry point the hook dispatches raw pointer events into
pub trait GestureHandler {
    /// Classify one event, performing any side effect it triggers
    fn handle_event(&mut self, event: PointerEvent) -> Decision;

    /// Drop held resources after a fault at the dispatch boundary
    fn recover(&mut self);
}

/// Chord bookkeeping carried between events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChordState {
    /// Trigger button is down
    pub secondary_held: bool,
    /// Wheel steps are fine (direct gain writes) rather than coarse (keys)
    pub step_is_fine: bool,
    /// The next trigger release must be swallowed
    pub suppress_next_secondary_up: bool,
}

impl ChordState {
    pub fn new(initial_step: StepMode) -> Self {
        Self {
            secondary_held: false,
            step_is_fine: initial_step.is_fine(),
            suppress_next_secondary_up: false,
        }
    }

    pub fn step_mode(&self) -> StepMode {
        StepMode::from_fine(self.step_is_fine)
    }
}

/// The gesture state machine
///
/// Owns the chord state and the audio slot. It is driven from a single
/// thread and never blocks.
pub struct GestureMachine<P: EndpointProvider, K: KeyReplay> {
    chord: ChordState,
    audio: AudioSlot<P>,
    keys: K,
    event_tx: broadcast::Sender<GestureEvent>,
}

impl<P: EndpointProvider, K: KeyReplay> GestureMachine<P, K> {
    /// Create a new gesture machine
    pub fn new(
        provider: P,
        keys: K,
        initial_step: StepMode,
        event_tx: broadcast::Sender<GestureEvent>,
    ) -> Self {
        info!(mode = %initial_step, "gesture machine ready");
        Self {
            chord: ChordState::new(initial_step),
            audio: AudioSlot::new(provider),
            keys,
            event_tx,
        }
    }

    #[cfg(test)]
    pub fn chord(&self) -> ChordState {
        self.chord
    }

    #[cfg(test)]
    pub fn audio_open(&self) -> bool {
        self.audio.is_open()
    }

    fn on_secondary_down(&mut self) -> Decision {
        if !self.chord.secondary_held {
            self.chord.secondary_held = true;
            debug!("trigger pressed, chord open");
        }
        // The trigger press is never forwarded, even for a lone click
        Decision::Suppress
    }

    fn on_secondary_up(&mut self) -> Decision {
        self.chord.secondary_held = false;

        if self.chord.suppress_next_secondary_up {
            self.chord.suppress_next_secondary_up = false;
            debug!("chord ended, swallowing trigger release");
            self.emit(GestureEvent::ChordEnded);
            self.release_audio();
            Decision::Suppress
        } else {
            Decision::PassThrough
        }
    }

    fn on_middle_down(&mut self) -> Decision {
        if self.chord.secondary_held {
            Decision::Suppress
        } else {
            Decision::PassThrough
        }
    }

    fn on_middle_up(&mut self) -> Decision {
        if !self.chord.secondary_held {
            return Decision::PassThrough;
        }

        self.chord.step_is_fine = !self.chord.step_is_fine;
        self.chord.suppress_next_secondary_up = true;

        let mode = self.chord.step_mode();
        info!(%mode, "step mode toggled");
        self.emit(GestureEvent::StepModeToggled { mode });

        Decision::Suppress
    }

    fn on_wheel(&mut self, delta: i32) -> Decision {
        if !self.chord.secondary_held {
            return Decision::PassThrough;
        }

        self.chord.suppress_next_secondary_up = true;

        if let Some(direction) = ScrollDirection::from_delta(delta) {
            if self.chord.step_is_fine {
                self.fine_step(direction);
            } else {
                self.coarse_step(direction);
            }
        }

        Decision::Suppress
    }

    fn fine_step(&mut self, direction: ScrollDirection) {
        match self.try_fine_step(direction) {
            Ok((from, to)) => {
                debug!(?direction, from, to, "fine volume step");
                self.emit(GestureEvent::VolumeSet { direction, from, to });
            }
            Err(e) => {
                warn!(?direction, error = %e, "fine volume step failed");
                self.emit(GestureEvent::VolumeStepFailed {
                    direction,
                    reason: e.to_string(),
                });
                self.release_audio();
            }
        }
    }

    fn try_fine_step(&mut self, direction: ScrollDirection) -> Result<(f32, f32), AudioError> {
        let endpoint = self.audio.ensure_open()?;

        // Unreadable counts as a failure so the handle is dropped and reopened
        let current = endpoint.volume().ok_or(AudioError::Unreadable)?;

        let level = next_fine_level(current, direction);
        endpoint.set_volume(level)?;

        Ok((current, level))
    }

    fn coarse_step(&mut self, direction: ScrollDirection) {
        match self.keys.press_and_release(VolumeKey::from(direction)) {
            Ok(()) => {
                debug!(?direction, "coarse volume step");
                self.emit(GestureEvent::VolumeKeySent { direction });
            }
            Err(e) => {
                warn!(?direction, error = %e, "volume key replay failed");
                self.release_audio();
            }
        }
    }

    fn release_audio(&mut self) {
        if self.audio.release() {
            self.emit(GestureEvent::AudioReleased);
        }
    }

    fn emit(&self, event: GestureEvent) {
        // No subscribers is fine; the hook must never wait on the receiver
        let _ = self.event_tx.send(event);
    }
}

impl<P: EndpointProvider, K: KeyReplay> GestureHandler for GestureMachine<P, K> {
    fn handle_event(&mut self, event: PointerEvent) -> Decision {
        match event {
            PointerEvent::SecondaryButtonDown => self.on_secondary_down(),
            PointerEvent::SecondaryButtonUp => self.on_secondary_up(),
            PointerEvent::MiddleButtonDown => self.on_middle_down(),
            PointerEvent::MiddleButtonUp => self.on_middle_up(),
            PointerEvent::WheelScroll { delta } => self.on_wheel(delta),
        }
    }

    fn recover(&mut self) {
        self.release_audio();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::keys::KeyReplayError;

    #[derive(Debug, Default)]
    struct AudioLog {
        level: Option<f32>,
        fail_open: bool,
        fail_set: bool,
        /// The next this many opened endpoints cannot report their level
        unreadable_opens: u32,
        opened: u32,
        live: u32,
        reads: u32,
        writes: Vec<f32>,
    }

    struct MockEndpoint {
        log: Rc<RefCell<AudioLog>>,
        readable: bool,
    }

    impl AudioEndpoint for MockEndpoint {
        fn volume(&self) -> Option<f32> {
            let mut log = self.log.borrow_mut();
            log.reads += 1;
            if self.readable {
                log.level
            } else {
                None
            }
        }

        fn set_volume(&self, level: f32) -> Result<(), AudioError> {
            let mut log = self.log.borrow_mut();
            if log.fail_set {
                return Err(AudioError::Rejected(level));
            }
            log.writes.push(level);
            log.level = Some(level);
            Ok(())
        }
    }

    impl Drop for MockEndpoint {
        fn drop(&mut self) {
            self.log.borrow_mut().live -= 1;
        }
    }

    struct MockProvider(Rc<RefCell<AudioLog>>);

    impl EndpointProvider for MockProvider {
        type Endpoint = MockEndpoint;

        fn open(&self) -> Result<MockEndpoint, AudioError> {
            let mut log = self.0.borrow_mut();
            if log.fail_open {
                return Err(AudioError::NoDefaultEndpoint);
            }
            log.opened += 1;
            log.live += 1;
            let readable = log.unreadable_opens == 0;
            log.unreadable_opens = log.unreadable_opens.saturating_sub(1);
            Ok(MockEndpoint {
                log: Rc::clone(&self.0),
                readable,
            })
        }
    }

    #[derive(Default)]
    struct KeyLog {
        sent: Vec<VolumeKey>,
        fail: bool,
    }

    struct MockKeys(Rc<RefCell<KeyLog>>);

    impl KeyReplay for MockKeys {
        fn press_and_release(&self, key: VolumeKey) -> Result<(), KeyReplayError> {
            let mut log = self.0.borrow_mut();
            if log.fail {
                return Err(KeyReplayError::Partial {
                    sent: 0,
                    expected: 2,
                });
            }
            log.sent.push(key);
            Ok(())
        }
    }

    struct Harness {
        machine: GestureMachine<MockProvider, MockKeys>,
        audio: Rc<RefCell<AudioLog>>,
        keys: Rc<RefCell<KeyLog>>,
        events: broadcast::Receiver<GestureEvent>,
    }

    impl Harness {
        fn send(&mut self, event: PointerEvent) -> Decision {
            self.machine.handle_event(event)
        }

        fn drain_events(&mut self) -> Vec<GestureEvent> {
            let mut out = Vec::new();
            while let Ok(event) = self.events.try_recv() {
                out.push(event);
            }
            out
        }
    }

    fn create_machine(initial_step: StepMode, level: Option<f32>) -> Harness {
        let audio = Rc::new(RefCell::new(AudioLog {
            level,
            ..Default::default()
        }));
        let keys = Rc::new(RefCell::new(KeyLog::default()));
        let (tx, rx) = broadcast::channel(64);
        let machine = GestureMachine::new(
            MockProvider(Rc::clone(&audio)),
            MockKeys(Rc::clone(&keys)),
            initial_step,
            tx,
        );
        Harness {
            machine,
            audio,
            keys,
            events: rx,
        }
    }

    const UP: PointerEvent = PointerEvent::WheelScroll { delta: 120 };
    const DOWN: PointerEvent = PointerEvent::WheelScroll { delta: -120 };

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_initial_state() {
        let h = create_machine(StepMode::Fine, Some(0.5));
        let chord = h.machine.chord();
        assert!(!chord.secondary_held);
        assert!(chord.step_is_fine);
        assert!(!chord.suppress_next_secondary_up);
        assert!(!h.machine.audio_open());
    }

    #[test]
    fn test_secondary_down_is_always_suppressed() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        assert_eq!(h.send(PointerEvent::SecondaryButtonDown), Decision::Suppress);
        assert!(h.machine.chord().secondary_held);

        // A repeated down while already held changes nothing
        assert_eq!(h.send(PointerEvent::SecondaryButtonDown), Decision::Suppress);
        assert!(h.machine.chord().secondary_held);
    }

    #[test]
    fn test_solitary_trigger_click_press_is_swallowed() {
        // The press of a lone click never reaches the OS, only its release does
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        assert_eq!(h.send(PointerEvent::SecondaryButtonDown), Decision::Suppress);
        assert_eq!(h.send(PointerEvent::SecondaryButtonUp), Decision::PassThrough);
        assert!(!h.machine.chord().secondary_held);
        assert!(h.drain_events().is_empty());
    }

    #[test]
    fn test_release_after_scroll_is_suppressed() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        h.send(PointerEvent::SecondaryButtonDown);
        assert_eq!(h.send(UP), Decision::Suppress);
        assert!(h.machine.chord().suppress_next_secondary_up);
        assert_eq!(h.send(PointerEvent::SecondaryButtonUp), Decision::Suppress);
    }

    #[test]
    fn test_release_after_toggle_is_suppressed() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        h.send(PointerEvent::SecondaryButtonDown);
        assert_eq!(h.send(PointerEvent::MiddleButtonDown), Decision::Suppress);
        assert_eq!(h.send(PointerEvent::MiddleButtonUp), Decision::Suppress);
        assert_eq!(h.send(PointerEvent::SecondaryButtonUp), Decision::Suppress);
    }

    #[test]
    fn test_suppression_is_cleared_exactly_once() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        h.send(PointerEvent::SecondaryButtonDown);
        h.send(UP);
        assert_eq!(h.send(PointerEvent::SecondaryButtonUp), Decision::Suppress);

        // The next plain click behaves normally again
        h.send(PointerEvent::SecondaryButtonDown);
        assert_eq!(h.send(PointerEvent::SecondaryButtonUp), Decision::PassThrough);
    }

    #[test]
    fn test_chord_symmetry() {
        let sequences: Vec<Vec<PointerEvent>> = vec![
            vec![],
            vec![UP],
            vec![DOWN, DOWN, UP],
            vec![PointerEvent::MiddleButtonDown, PointerEvent::MiddleButtonUp],
            vec![
                UP,
                PointerEvent::MiddleButtonDown,
                PointerEvent::MiddleButtonUp,
                DOWN,
                PointerEvent::MiddleButtonDown,
                PointerEvent::MiddleButtonUp,
            ],
        ];

        for inner in sequences {
            let mut h = create_machine(StepMode::Fine, Some(0.5));
            h.send(PointerEvent::SecondaryButtonDown);
            for event in &inner {
                h.send(*event);
            }
            h.send(PointerEvent::SecondaryButtonUp);

            let chord = h.machine.chord();
            assert!(!chord.secondary_held, "held after {inner:?}");
            assert!(!chord.suppress_next_secondary_up, "armed after {inner:?}");
        }
    }

    #[test]
    fn test_toggle_parity() {
        for pairs in 0..5 {
            let mut h = create_machine(StepMode::Fine, Some(0.5));
            h.send(PointerEvent::SecondaryButtonDown);
            for _ in 0..pairs {
                h.send(PointerEvent::MiddleButtonDown);
                h.send(PointerEvent::MiddleButtonUp);
            }
            h.send(PointerEvent::SecondaryButtonUp);

            let expected_fine = pairs % 2 == 0;
            assert_eq!(h.machine.chord().step_is_fine, expected_fine, "pairs = {pairs}");
        }
    }

    #[test]
    fn test_step_mode_persists_across_chords() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        h.send(PointerEvent::SecondaryButtonDown);
        h.send(PointerEvent::MiddleButtonDown);
        h.send(PointerEvent::MiddleButtonUp);
        h.send(PointerEvent::SecondaryButtonUp);
        assert_eq!(h.machine.chord().step_mode(), StepMode::Coarse);

        h.send(PointerEvent::SecondaryButtonDown);
        h.send(UP);
        h.send(PointerEvent::SecondaryButtonUp);

        assert_eq!(h.keys.borrow().sent, vec![VolumeKey::VolumeUp]);
        assert!(h.audio.borrow().writes.is_empty());
    }

    #[test]
    fn test_middle_click_without_chord_passes_through() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        assert_eq!(h.send(PointerEvent::MiddleButtonDown), Decision::PassThrough);
        assert_eq!(h.send(PointerEvent::MiddleButtonUp), Decision::PassThrough);
        assert!(h.machine.chord().step_is_fine);
    }

    #[test]
    fn test_no_chord_no_effect() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        assert_eq!(h.send(UP), Decision::PassThrough);
        assert_eq!(h.send(DOWN), Decision::PassThrough);

        let audio = h.audio.borrow();
        assert_eq!(audio.opened, 0);
        assert_eq!(audio.reads, 0);
        assert!(h.keys.borrow().sent.is_empty());
        assert!(!h.machine.chord().suppress_next_secondary_up);
    }

    #[test]
    fn test_no_chord_no_effect_in_coarse_mode() {
        let mut h = create_machine(StepMode::Coarse, Some(0.5));
        assert_eq!(h.send(UP), Decision::PassThrough);
        assert!(h.keys.borrow().sent.is_empty());
    }

    #[test]
    fn test_fine_step_writes_rounded_level() {
        let mut h = create_machine(StepMode::Fine, Some(0.233));
        h.send(PointerEvent::SecondaryButtonDown);
        h.send(UP);

        let writes = h.audio.borrow().writes.clone();
        assert_eq!(writes.len(), 1);
        assert_close(writes[0], 0.24);
    }

    #[test]
    fn test_fine_step_snaps_to_rails() {
        let mut h = create_machine(StepMode::Fine, Some(0.99));
        h.send(PointerEvent::SecondaryButtonDown);
        h.send(UP);
        assert_eq!(h.audio.borrow().writes, vec![1.0]);

        let mut h = create_machine(StepMode::Fine, Some(0.005));
        h.send(PointerEvent::SecondaryButtonDown);
        h.send(DOWN);
        assert_eq!(h.audio.borrow().writes, vec![0.0]);
    }

    #[test]
    fn test_fine_step_reads_level_fresh_each_tick() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        h.send(PointerEvent::SecondaryButtonDown);
        h.send(UP);

        // Something else moved the volume between ticks
        h.audio.borrow_mut().level = Some(0.2);
        h.send(UP);

        let writes = h.audio.borrow().writes.clone();
        assert_close(writes[0], 0.51);
        assert_close(writes[1], 0.21);
    }

    #[test]
    fn test_handle_opened_lazily_and_reused_within_chord() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        h.send(PointerEvent::SecondaryButtonDown);
        assert!(!h.machine.audio_open());

        h.send(UP);
        h.send(UP);
        h.send(DOWN);
        assert!(h.machine.audio_open());
        assert_eq!(h.audio.borrow().opened, 1);
    }

    #[test]
    fn test_chord_end_releases_handle() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        h.send(PointerEvent::SecondaryButtonDown);
        h.send(UP);
        h.send(PointerEvent::SecondaryButtonUp);

        assert!(!h.machine.audio_open());
        assert_eq!(h.audio.borrow().live, 0);

        let events = h.drain_events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], GestureEvent::VolumeSet { .. }));
        assert_eq!(events[1], GestureEvent::ChordEnded);
        assert_eq!(events[2], GestureEvent::AudioReleased);
    }

    #[test]
    fn test_handle_reopened_after_release() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        for _ in 0..2 {
            h.send(PointerEvent::SecondaryButtonDown);
            h.send(UP);
            h.send(PointerEvent::SecondaryButtonUp);
        }
        assert_eq!(h.audio.borrow().opened, 2);
        assert_eq!(h.audio.borrow().live, 0);
    }

    #[test]
    fn test_coarse_step_replays_volume_keys() {
        let mut h = create_machine(StepMode::Coarse, Some(0.5));
        h.send(PointerEvent::SecondaryButtonDown);
        assert_eq!(h.send(UP), Decision::Suppress);
        assert_eq!(h.send(DOWN), Decision::Suppress);

        assert_eq!(
            h.keys.borrow().sent,
            vec![VolumeKey::VolumeUp, VolumeKey::VolumeDown]
        );
        assert_eq!(h.audio.borrow().opened, 0);
    }

    #[test]
    fn test_zero_delta_in_chord_is_suppressed_without_effect() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        h.send(PointerEvent::SecondaryButtonDown);
        assert_eq!(
            h.send(PointerEvent::WheelScroll { delta: 0 }),
            Decision::Suppress
        );
        assert_eq!(h.audio.borrow().opened, 0);
        assert!(h.machine.chord().suppress_next_secondary_up);
    }

    #[test]
    fn test_unreadable_volume_is_a_noop() {
        let mut h = create_machine(StepMode::Fine, None);
        h.send(PointerEvent::SecondaryButtonDown);
        assert_eq!(h.send(UP), Decision::Suppress);
        assert!(h.audio.borrow().writes.is_empty());
        assert!(!h.machine.audio_open());
        assert_eq!(h.audio.borrow().live, 0);

        let events = h.drain_events();
        assert!(matches!(events[0], GestureEvent::VolumeStepFailed { .. }));
        assert_eq!(events[1], GestureEvent::AudioReleased);
    }

    #[test]
    fn test_unreadable_endpoint_is_reopened_on_next_tick() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        h.audio.borrow_mut().unreadable_opens = 1;

        h.send(PointerEvent::SecondaryButtonDown);
        assert_eq!(h.send(UP), Decision::Suppress);
        assert!(h.audio.borrow().writes.is_empty());
        assert!(!h.machine.audio_open());

        // Same chord: the next tick opens a fresh endpoint and writes
        assert_eq!(h.send(UP), Decision::Suppress);
        assert_eq!(h.audio.borrow().opened, 2);
        let writes = h.audio.borrow().writes.clone();
        assert_eq!(writes.len(), 1);
        assert_close(writes[0], 0.51);

        for _ in 0..3 {
            h.send(UP);
        }
        assert_eq!(h.audio.borrow().opened, 2);
        assert_eq!(h.audio.borrow().writes.len(), 4);
        assert!(h.machine.audio_open());
    }

    #[test]
    fn test_open_failure_is_not_fatal() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        h.audio.borrow_mut().fail_open = true;
        h.send(PointerEvent::SecondaryButtonDown);
        assert_eq!(h.send(UP), Decision::Suppress);
        assert!(!h.machine.audio_open());

        // Once the device shows up again the next tick works
        h.audio.borrow_mut().fail_open = false;
        h.send(UP);
        assert_eq!(h.audio.borrow().writes.len(), 1);
    }

    #[test]
    fn test_setter_failure_releases_handle_and_keeps_classifying() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        h.audio.borrow_mut().fail_set = true;

        h.send(PointerEvent::SecondaryButtonDown);
        assert_eq!(h.send(UP), Decision::Suppress);
        assert!(!h.machine.audio_open());
        assert_eq!(h.audio.borrow().live, 0);

        // Subsequent events are still classified correctly
        assert_eq!(h.send(PointerEvent::MiddleButtonDown), Decision::Suppress);
        assert_eq!(h.send(PointerEvent::MiddleButtonUp), Decision::Suppress);
        assert_eq!(h.send(PointerEvent::SecondaryButtonUp), Decision::Suppress);
        assert!(!h.machine.audio_open());

        let events = h.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GestureEvent::VolumeStepFailed { .. })));
    }

    #[test]
    fn test_key_replay_failure_is_contained() {
        let mut h = create_machine(StepMode::Coarse, Some(0.5));
        h.keys.borrow_mut().fail = true;
        h.send(PointerEvent::SecondaryButtonDown);
        assert_eq!(h.send(UP), Decision::Suppress);
        assert_eq!(h.send(PointerEvent::SecondaryButtonUp), Decision::Suppress);
    }

    #[test]
    fn test_recover_releases_handle() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        h.send(PointerEvent::SecondaryButtonDown);
        h.send(UP);
        assert!(h.machine.audio_open());

        h.machine.recover();
        assert!(!h.machine.audio_open());
        assert_eq!(h.audio.borrow().live, 0);

        // Recovering again is harmless
        h.machine.recover();
        assert_eq!(h.audio.borrow().live, 0);
    }

    #[test]
    fn test_drop_releases_handle() {
        let mut h = create_machine(StepMode::Fine, Some(0.5));
        h.send(PointerEvent::SecondaryButtonDown);
        h.send(UP);

        let audio = Rc::clone(&h.audio);
        drop(h);
        assert_eq!(audio.borrow().live, 0);
    }
}
