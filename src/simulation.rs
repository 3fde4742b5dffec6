use ::rand as external_rand;
use external_rand::Rng;
use glam::Vec2;
use serde::Serialize;

use crate::config::SimulationConfig;
use crate::growth::{grow, random_direction, GrowthParams};
use crate::spawn::Colony;
use crate::types::{Occupant, RenderSegment, ResourceId, TipId};

// Simulation state - contains all mutable state data
pub struct SimulationState {
    pub colony: Colony,
    pub palette_index: usize,
    pub frame_index: u64,
    // Accumulated simulation (time-scaled) seconds
    pub elapsed: f32,
}

impl SimulationState {
    pub fn new(config: &SimulationConfig) -> Self {
        Self {
            colony: Colony::new(
                config.domain(),
                config.partition(),
                config.branch_window_period,
            ),
            palette_index: 0,
            frame_index: 0,
            elapsed: 0.0,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ColonyStats {
    pub active_tips: usize,
    pub frozen_tips: usize,
    pub resources: usize,
    pub indexed_points: usize,
    pub frame_index: u64,
    pub elapsed: f32,
}

// Simulation - contains state, config, and control flags
pub struct Simulation {
    pub state: SimulationState,
    pub config: SimulationConfig,
    params: GrowthParams,
    pub paused: bool,
    pub gradients_visible: bool,
    pub help_popup_visible: bool,
    pub take_screenshot: bool,
    pub speed_multiplier: f32,
    pub speed_accumulator: f32,
}

// Implement Deref for convenience - allows sim.colony instead of sim.state.colony
impl std::ops::Deref for Simulation {
    type Target = SimulationState;
    fn deref(&self) -> &Self::Target {
        &self.state
    }
}

impl std::ops::DerefMut for Simulation {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.state
    }
}

impl Simulation {
    pub fn with_config<R: Rng>(rng: &mut R, config: SimulationConfig) -> Self {
        let mut sim = Self {
            state: SimulationState::new(&config),
            params: GrowthParams::from(&config),
            config,
            paused: false,
            gradients_visible: false,
            help_popup_visible: false,
            take_screenshot: false,
            speed_multiplier: 1.0,
            speed_accumulator: 0.0,
        };
        sim.seed_initial_tips(rng);
        sim
    }

    fn seed_initial_tips<R: Rng>(&mut self, rng: &mut R) {
        let center = self.config.domain_center();
        for _ in 0..self.config.initial_tip_count {
            self.spawn_tip_at(rng, center);
        }
    }

    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }
    pub fn toggle_gradients(&mut self) {
        self.gradients_visible = !self.gradients_visible;
    }
    pub fn toggle_help_popup(&mut self) {
        self.help_popup_visible = !self.help_popup_visible;
    }
    pub fn increase_speed(&mut self) {
        self.speed_multiplier = (self.speed_multiplier * 1.5).min(10.0);
    }
    pub fn decrease_speed(&mut self) {
        self.speed_multiplier = (self.speed_multiplier / 1.5).max(0.1);
    }
    pub fn reset_speed(&mut self) {
        self.speed_multiplier = 1.0;
    }

    pub fn reset<R: Rng>(&mut self, rng: &mut R) {
        self.state.colony.clear();
        self.state.palette_index = 0;
        self.state.frame_index = 0;
        self.state.elapsed = 0.0;
        self.seed_initial_tips(rng);
        log::info!("Simulation reset");
    }

    /// Spawns a tip with a random heading and the next palette colour.
    pub fn spawn_tip_at<R: Rng>(&mut self, rng: &mut R, position: Vec2) -> TipId {
        let palette = &self.config.palette;
        let color = palette[self.state.palette_index % palette.len()];
        self.state.palette_index = (self.state.palette_index + 1) % palette.len();
        let direction = random_direction(rng);
        let id = self
            .state
            .colony
            .insert_tip(position, direction, color, None);
        log::debug!("Spawned tip {} at ({:.1}, {:.1})", id, position.x, position.y);
        id
    }

    pub fn spawn_resource_at(&mut self, position: Vec2) -> ResourceId {
        let id = self.state.colony.insert_resource(position);
        log::debug!(
            "Spawned resource {} at ({:.1}, {:.1})",
            id,
            position.x,
            position.y
        );
        id
    }

    /// Runs one growth tick for a frame that lasted `frame_dt` wall seconds.
    pub fn step<R: Rng>(&mut self, rng: &mut R, frame_dt: f32) {
        let dt = frame_dt * self.config.time_scale;
        self.state.frame_index = self.state.frame_index.wrapping_add(1);
        self.state.elapsed += dt;

        let colony = &mut self.state.colony;
        let resources = colony.resource_positions();
        let outcome = grow(
            &mut colony.tips,
            &resources,
            &colony.index,
            dt,
            &self.params,
            rng,
        );
        log::trace!(
            "frame {}: {} spawns, {} branched, {} extended, {} blocked, {} out of bounds",
            self.state.frame_index,
            outcome.spawns.len(),
            outcome.branched,
            outcome.extended,
            outcome.blocked,
            outcome.out_of_bounds
        );
        colony.apply(outcome);
    }

    /// Steps according to pause state and speed multiplier. Fractional
    /// speeds accumulate across frames.
    pub fn advance<R: Rng>(&mut self, rng: &mut R, frame_dt: f32) -> usize {
        if self.paused {
            return 0;
        }
        self.speed_accumulator += self.speed_multiplier;
        let steps = self.speed_accumulator.floor() as usize;
        self.speed_accumulator -= steps as f32;
        for _ in 0..steps {
            self.step(rng, frame_dt);
        }
        steps
    }

    pub fn stats(&self) -> ColonyStats {
        let colony = &self.state.colony;
        let active_tips = colony.active_count();
        ColonyStats {
            active_tips,
            frozen_tips: colony.tips.len() - active_tips,
            resources: colony.resources.len(),
            indexed_points: colony.index.len(),
            frame_index: self.state.frame_index,
            elapsed: self.state.elapsed,
        }
    }

    /// Index entries the spatial index returns for a box query around
    /// `position`, in index order.
    pub fn occupants_near(&self, position: Vec2, radius: f32) -> Vec<(Vec2, Occupant)> {
        let mut found = Vec::new();
        self.state
            .colony
            .index
            .for_each_neighbour(position, radius, |point, occupant| {
                found.push((point, *occupant))
            });
        found
    }

    /// Render data for every tip, active or frozen, in store order.
    pub fn segments(&self) -> impl Iterator<Item = RenderSegment> + '_ {
        let scale = self.config.thickness_scale;
        self.state.colony.tips.iter().map(move |t| t.segment(scale))
    }
}
