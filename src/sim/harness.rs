//! Host-side driver loop: corrector tick, then world step, for N ticks.

use serde::Serialize;

use super::constants as consts;
use super::scenario::Scenario;
use crate::config::{SlideConfig, TimestepConfig};
use crate::slide::clock::TickClock;
use crate::slide::tracker::EntityId;
use crate::slide::{SlideCorrector, StartOutcome, TickReport};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CharacterDrift {
    pub id: EntityId,
    pub start_radius: f32,
    pub end_radius: f32,
    /// end_radius - start_radius
    pub drift: f32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub ticks: u32,
    pub corrected: bool,
    pub passive: bool,
    pub characters: Vec<CharacterDrift>,
    pub totals: TickReport,
}

fn radius(pos: [f32; 3]) -> f32 {
    (pos[0] * pos[0] + pos[2] * pos[2]).sqrt()
}

fn accumulate(totals: &mut TickReport, tick: TickReport) {
    totals.examined += tick.examined;
    totals.corrected += tick.corrected;
    totals.gated += tick.gated;
    totals.skipped += tick.skipped;
    totals.failed += tick.failed;
}

/// Clock for a run that is not paced in real time.
///
/// Wall-clock deltas between back-to-back steps are microseconds, so a
/// measured timestep is replaced by the step the world actually takes.
pub fn headless_clock(config: &SlideConfig) -> TickClock {
    match config.timestep() {
        TimestepConfig::Fixed { .. } => config.clock(),
        TimestepConfig::Measured => TickClock::fixed(consts::TIMESTEP as f64),
    }
}

/// Runs `scenario` for `ticks` steps. `config = None` disables correction.
pub fn run(scenario: &Scenario, config: Option<SlideConfig>, ticks: u32, authority: bool) -> RunReport {
    let mut built = scenario.build();
    built.world.set_authority(authority);

    let start_radii: Vec<(EntityId, f32)> = built
        .characters
        .iter()
        .filter_map(|&id| built.world.character_position(id).map(|p| (id, radius(p))))
        .collect();

    let mut report = RunReport {
        ticks,
        corrected: config.is_some(),
        ..Default::default()
    };

    let mut corrector = config.map(|config| {
        let clock = headless_clock(&config);
        (SlideCorrector::new(config), clock)
    });

    if let Some((corrector, _)) = corrector.as_mut() {
        match corrector.start(&mut built.world) {
            Ok(StartOutcome::Passive) => report.passive = true,
            Ok(StartOutcome::Active { .. }) => {}
            Err(e) => tracing::warn!(error = %e, "corrector failed to start"),
        }
    }

    for _ in 0..ticks {
        if let Some((corrector, clock)) = corrector.as_mut() {
            let dt = clock.next_dt();
            let tick = corrector.tick(&mut built.world, dt);
            accumulate(&mut report.totals, tick);
        }
        built.world.step(consts::TIMESTEP);
    }

    if let Some((corrector, _)) = corrector.as_mut() {
        corrector.shutdown(&mut built.world);
    }

    report.characters = start_radii
        .into_iter()
        .filter_map(|(id, start_radius)| {
            let end_radius = radius(built.world.character_position(id)?);
            Some(CharacterDrift {
                id,
                start_radius,
                end_radius,
                drift: end_radius - start_radius,
            })
        })
        .collect();

    tracing::debug!(ticks, corrected = report.corrected, "simulation finished");
    report
}
