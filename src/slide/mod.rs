//! Slide correction for characters standing on moving or rotating grids.
//!
//! [`SlideCorrector`] is owned by whatever drives the simulation. The driver
//! calls [`SlideCorrector::start`] once, [`SlideCorrector::tick`] every
//! simulation step and [`SlideCorrector::shutdown`] at teardown; the
//! corrector never schedules anything on its own.

pub mod clock;
pub mod constants;
pub mod diagnostics;
pub mod events;
pub mod host;
pub mod math;
pub mod movement;
pub mod panic_reporting;
pub mod support;
pub mod tracker;

use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

use crate::config::{GateMode, SlideConfig};
use diagnostics::DiagnosticSample;
use events::{EntityEvent, EntityNotifier, EntityQueue};
use host::{CharacterHost, HostError};
use math::slide_correction;
use panic_reporting::log_character_panic;
use tracker::{EntityId, EntityInfo, EntityTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Tracking and correcting; `tracked` characters found at startup.
    Active { tracked: usize },
    /// Host is not authoritative; ticks do nothing.
    Passive,
}

/// What happened to the tracked characters during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub examined: usize,
    pub corrected: usize,
    /// Not eligible this tick (unsupported, too slow, or nothing to correct).
    pub gated: usize,
    /// No physics body.
    pub skipped: usize,
    /// Host error or panic while processing.
    pub failed: usize,
}

#[derive(Debug, Error)]
pub enum SlideError {
    #[error("slide corrector already started")]
    AlreadyStarted,

    #[error("slide corrector was shut down")]
    Stopped,
}

enum CharacterOutcome {
    Corrected,
    Gated,
    NoPhysics,
}

pub struct SlideCorrector {
    config: SlideConfig,
    tracker: EntityTracker,
    queue: EntityQueue,
    lifecycle: Lifecycle,
}

impl SlideCorrector {
    pub fn new(config: SlideConfig) -> Self {
        Self {
            config,
            tracker: EntityTracker::new(),
            queue: EntityQueue::new(),
            lifecycle: Lifecycle::Idle,
        }
    }

    pub fn config(&self) -> &SlideConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn tracked(&self) -> Vec<EntityId> {
        self.tracker.snapshot()
    }

    pub fn is_tracked(&self, id: EntityId) -> bool {
        self.tracker.contains(id)
    }

    pub fn is_supported(&self, id: EntityId) -> bool {
        self.tracker.support(id).map(|s| s.supported).unwrap_or(false)
    }

    /// Sender for hosts that report entity changes from other threads.
    pub fn notifier(&self) -> EntityNotifier {
        self.queue.notifier()
    }

    /// Registers with the host and picks up every existing character.
    pub fn start<H: CharacterHost>(&mut self, host: &mut H) -> Result<StartOutcome, SlideError> {
        match self.lifecycle {
            Lifecycle::Running => return Err(SlideError::AlreadyStarted),
            Lifecycle::Stopped => return Err(SlideError::Stopped),
            Lifecycle::Idle => {}
        }

        if !host.is_authority() {
            // Passive correctors never tick, so nothing would drain the queue.
            self.queue.close();
            tracing::info!("not the authoritative simulation; slide correction disabled");
            return Ok(StartOutcome::Passive);
        }

        if self.queue.is_closed() {
            self.queue = EntityQueue::new();
        }

        // Subscribe before the scan so nothing added in between is missed.
        host.subscribe(self.queue.notifier());
        let entities = host.entities();
        self.tracker.bulk_register_existing(&entities);
        self.lifecycle = Lifecycle::Running;

        let tracked = self.tracker.len();
        tracing::info!(tracked, "slide corrector setup complete");
        Ok(StartOutcome::Active { tracked })
    }

    /// Unregisters from the host and forgets every character. Idempotent.
    pub fn shutdown<H: CharacterHost>(&mut self, host: &mut H) {
        if self.lifecycle == Lifecycle::Stopped {
            return;
        }
        if self.lifecycle == Lifecycle::Running {
            host.unsubscribe();
        }

        self.queue.close();
        self.tracker.clear();
        self.lifecycle = Lifecycle::Stopped;
        tracing::info!("slide corrector shut down");
    }

    pub fn on_entity_added(&mut self, entity: &EntityInfo) -> bool {
        if self.lifecycle == Lifecycle::Stopped {
            return false;
        }
        self.tracker.on_entity_added(entity)
    }

    pub fn on_entity_removed(&mut self, id: EntityId) -> bool {
        self.tracker.on_entity_removed(id)
    }

    pub fn bulk_register_existing(&mut self, entities: &[EntityInfo]) -> usize {
        if self.lifecycle == Lifecycle::Stopped {
            return 0;
        }
        self.tracker.bulk_register_existing(entities)
    }

    /// Runs one simulation step for every tracked character.
    ///
    /// A failure on one character is logged and never stops the others.
    pub fn tick<H: CharacterHost>(&mut self, host: &mut H, dt: f64) -> TickReport {
        let mut report = TickReport::default();
        if self.lifecycle != Lifecycle::Running {
            return report;
        }

        self.apply_pending_events();

        for id in self.tracker.snapshot() {
            report.examined += 1;
            let result =
                panic::catch_unwind(AssertUnwindSafe(|| self.process_character(host, id, dt)));
            match result {
                Ok(Ok(CharacterOutcome::Corrected)) => report.corrected += 1,
                Ok(Ok(CharacterOutcome::Gated)) => report.gated += 1,
                Ok(Ok(CharacterOutcome::NoPhysics)) => report.skipped += 1,
                Ok(Err(e)) => {
                    tracing::warn!(
                        entity = %id,
                        error = %e,
                        "slide correction failed; character skipped this tick"
                    );
                    report.failed += 1;
                }
                Err(payload) => {
                    log_character_panic(id, &*payload);
                    report.failed += 1;
                }
            }
        }

        report
    }

    fn apply_pending_events(&mut self) {
        for event in self.queue.drain() {
            match event {
                EntityEvent::Added(entity) => {
                    self.tracker.on_entity_added(&entity);
                }
                EntityEvent::Removed(id) => {
                    self.tracker.on_entity_removed(id);
                }
            }
        }
    }

    fn process_character<H: CharacterHost>(
        &mut self,
        host: &mut H,
        id: EntityId,
        dt: f64,
    ) -> Result<CharacterOutcome, HostError> {
        let Some(sample) = host.sample(id)? else {
            return Ok(CharacterOutcome::NoPhysics);
        };

        // Support state advances every tick, whichever gate is active.
        let supported = match self.tracker.support_mut(id) {
            Some(state) => state.observe(sample.movement, sample.support_normal, self.config.normal_epsilon),
            None => false,
        };
        let eligible = match self.config.gate() {
            GateMode::SupportTracking => supported,
            GateMode::AirborneOnly => !sample.movement.is_airborne(),
        };

        if self.config.diagnostics {
            let diag = DiagnosticSample::new(&sample, supported);
            tracing::debug!(entity = %id, "\n{}", diag);
        }

        let speed = sample.linear_velocity.norm();
        let ang_speed = sample.angular_velocity.norm();
        if !eligible
            || speed <= self.config.min_linear_speed()
            || ang_speed <= self.config.min_angular_speed()
        {
            return Ok(CharacterOutcome::Gated);
        }

        let correction = slide_correction(&sample.slide_input(), dt, self.config.gains());
        if correction.iter().all(|c| *c == 0.0) {
            return Ok(CharacterOutcome::Gated);
        }

        let position = host.position(id)?;
        host.set_position(id, position + correction)?;
        Ok(CharacterOutcome::Corrected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide::host::CharacterSample;
    use crate::slide::movement::MovementState;
    use nalgebra::Vector3;
    use std::collections::HashMap;

    /// Single-threaded in-memory host.
    #[derive(Default)]
    struct MemoryHost {
        authority: bool,
        entities: Vec<EntityInfo>,
        samples: HashMap<EntityId, CharacterSample>,
        positions: HashMap<EntityId, Vector3<f64>>,
        notifier: Option<EntityNotifier>,
    }

    impl MemoryHost {
        fn new() -> Self {
            Self {
                authority: true,
                ..Default::default()
            }
        }

        fn add_character(&mut self, id: u64, sample: CharacterSample) -> EntityId {
            let id = EntityId(id);
            self.entities.push(EntityInfo::character(id));
            self.samples.insert(id, sample);
            self.positions.insert(id, Vector3::zeros());
            if let Some(n) = &self.notifier {
                n.added(EntityInfo::character(id));
            }
            id
        }
    }

    impl CharacterHost for MemoryHost {
        fn is_authority(&self) -> bool {
            self.authority
        }

        fn entities(&self) -> Vec<EntityInfo> {
            self.entities.clone()
        }

        fn subscribe(&mut self, notifier: EntityNotifier) {
            self.notifier = Some(notifier);
        }

        fn unsubscribe(&mut self) {
            self.notifier = None;
        }

        fn sample(&self, id: EntityId) -> Result<Option<CharacterSample>, HostError> {
            Ok(self.samples.get(&id).copied())
        }

        fn position(&self, id: EntityId) -> Result<Vector3<f64>, HostError> {
            self.positions
                .get(&id)
                .copied()
                .ok_or(HostError::UnknownEntity(id))
        }

        fn set_position(&mut self, id: EntityId, position: Vector3<f64>) -> Result<(), HostError> {
            self.positions.insert(id, position);
            Ok(())
        }
    }

    fn spinning_floor(movement: MovementState) -> CharacterSample {
        CharacterSample {
            linear_velocity: Vector3::new(0.0, 0.0, -2.5),
            angular_velocity: Vector3::new(0.0, 0.5, 0.0),
            support_normal: Vector3::new(0.0, 1.0, 0.0),
            movement,
        }
    }

    #[test]
    fn test_start_registers_existing_characters() {
        let mut host = MemoryHost::new();
        host.add_character(1, spinning_floor(MovementState::Standing));
        host.entities.push(EntityInfo {
            id: EntityId(2),
            kind: tracker::EntityKind::Grid,
        });

        let mut corrector = SlideCorrector::new(SlideConfig::default());
        let outcome = corrector.start(&mut host).unwrap();
        assert_eq!(outcome, StartOutcome::Active { tracked: 1 });
        assert_eq!(corrector.tracked(), vec![EntityId(1)]);
        assert!(host.notifier.is_some());
        assert!(matches!(corrector.start(&mut host), Err(SlideError::AlreadyStarted)));
    }

    #[test]
    fn test_passive_when_not_authority() {
        let mut host = MemoryHost::new();
        host.authority = false;
        let id = host.add_character(1, spinning_floor(MovementState::Standing));

        let mut corrector = SlideCorrector::new(SlideConfig::default());
        assert_eq!(corrector.start(&mut host).unwrap(), StartOutcome::Passive);
        assert_eq!(corrector.lifecycle(), Lifecycle::Idle);
        assert_eq!(corrector.tick(&mut host, 1.0 / 60.0), TickReport::default());
        assert_eq!(host.positions[&id], Vector3::zeros());
    }

    #[test]
    fn test_tick_corrects_supported_character() {
        let mut host = MemoryHost::new();
        let id = host.add_character(1, spinning_floor(MovementState::Standing));
        let mut corrector = SlideCorrector::new(SlideConfig::default());
        corrector.start(&mut host).unwrap();

        let report = corrector.tick(&mut host, 1.0 / 60.0);
        assert_eq!(report.corrected, 1);
        assert!(corrector.is_supported(id));
        // Pulled toward the rotation axis
        assert!(host.positions[&id].x < 0.0);
    }

    #[test]
    fn test_falling_character_is_not_corrected() {
        let mut host = MemoryHost::new();
        let id = host.add_character(1, spinning_floor(MovementState::Falling));
        let mut corrector = SlideCorrector::new(SlideConfig::default());
        corrector.start(&mut host).unwrap();

        let report = corrector.tick(&mut host, 1.0 / 60.0);
        assert_eq!(report.gated, 1);
        assert_eq!(host.positions[&id], Vector3::zeros());
    }

    #[test]
    fn test_legacy_gate_ignores_support_tracking() {
        let mut host = MemoryHost::new();
        // Zero support normal never changes, so support tracking would gate it
        let mut sample = spinning_floor(MovementState::Walking);
        sample.support_normal = Vector3::zeros();
        let id = host.add_character(1, sample);

        let mut corrector = SlideCorrector::new(SlideConfig::for_profile(crate::config::Profile::Legacy));
        corrector.start(&mut host).unwrap();
        let report = corrector.tick(&mut host, 1.0 / 60.0);
        assert_eq!(report.corrected, 1);
        assert!(!corrector.is_supported(id));
    }

    #[test]
    fn test_notifications_apply_on_next_tick() {
        let mut host = MemoryHost::new();
        let mut corrector = SlideCorrector::new(SlideConfig::default());
        corrector.start(&mut host).unwrap();
        assert!(corrector.tracked().is_empty());

        let id = host.add_character(9, spinning_floor(MovementState::Standing));
        assert!(!corrector.is_tracked(id));
        let report = corrector.tick(&mut host, 1.0 / 60.0);
        assert_eq!(report.examined, 1);
        assert!(corrector.is_tracked(id));

        host.notifier.as_ref().unwrap().removed(id);
        let report = corrector.tick(&mut host, 1.0 / 60.0);
        assert_eq!(report.examined, 0);
    }

    #[test]
    fn test_shutdown_clears_and_unsubscribes() {
        let mut host = MemoryHost::new();
        host.add_character(1, spinning_floor(MovementState::Standing));
        let mut corrector = SlideCorrector::new(SlideConfig::default());
        corrector.start(&mut host).unwrap();

        corrector.shutdown(&mut host);
        assert!(host.notifier.is_none());
        assert!(corrector.tracked().is_empty());
        assert_eq!(corrector.lifecycle(), Lifecycle::Stopped);
        assert!(!corrector.on_entity_added(&EntityInfo::character(EntityId(5))));
        assert!(matches!(corrector.start(&mut host), Err(SlideError::Stopped)));

        corrector.shutdown(&mut host);
        assert_eq!(corrector.lifecycle(), Lifecycle::Stopped);
    }

    #[test]
    fn test_notifications_after_shutdown_are_dropped() {
        let mut host = MemoryHost::new();
        let mut corrector = SlideCorrector::new(SlideConfig::default());
        corrector.start(&mut host).unwrap();
        let notifier = corrector.notifier();

        corrector.shutdown(&mut host);
        for i in 0..10_000 {
            notifier.added(EntityInfo::character(EntityId(i)));
        }
        for _ in 0..10 {
            corrector.tick(&mut host, 1.0 / 60.0);
        }
        assert_eq!(corrector.queue.pending(), 0);
        assert!(corrector.tracked().is_empty());
    }

    #[test]
    fn test_passive_corrector_does_not_queue() {
        let mut host = MemoryHost::new();
        host.authority = false;
        let mut corrector = SlideCorrector::new(SlideConfig::default());
        let notifier = corrector.notifier();
        assert_eq!(corrector.start(&mut host).unwrap(), StartOutcome::Passive);

        notifier.added(EntityInfo::character(EntityId(1)));
        assert_eq!(corrector.queue.pending(), 0);

        // Becoming authoritative later reopens the queue for the new subscription
        host.authority = true;
        assert_eq!(
            corrector.start(&mut host).unwrap(),
            StartOutcome::Active { tracked: 0 }
        );
        let id = host.add_character(3, spinning_floor(MovementState::Standing));
        assert_eq!(corrector.queue.pending(), 1);
        corrector.tick(&mut host, 1.0 / 60.0);
        assert!(corrector.is_tracked(id));
    }

    #[test]
    fn test_tick_with_diagnostics_enabled() {
        let mut host = MemoryHost::new();
        let id = host.add_character(1, spinning_floor(MovementState::Standing));
        let mut config = SlideConfig::default();
        config.diagnostics = true;
        let mut corrector = SlideCorrector::new(config);
        corrector.start(&mut host).unwrap();

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let report = tracing::subscriber::with_default(subscriber, || {
            corrector.tick(&mut host, 1.0 / 60.0)
        });
        assert_eq!(report.corrected, 1);
        assert!(corrector.is_supported(id));
        assert!(host.positions[&id].x < 0.0);
    }
}
