// Per-tick growth pass over every active tip.
//
// Each active tip ages, extends, rerolls its branch window, samples the
// repulsion and resource fields at its head and then either keeps growing,
// forks into two new tips, continues as one new tip, or dies. Nothing is
// created or deactivated here: the decisions are collected into a
// `GrowthOutcome` so every tip in the pass sees the same index snapshot.

use ::rand as external_rand;
use external_rand::Rng;
use glam::Vec2;

use crate::config::SimulationConfig;
use crate::field::{resource_pull, sample_tips, FieldParams};
use crate::hypha::Tip;
use crate::point_bin::PointBin;
use crate::types::{Occupant, Rgba, TipId};

/// Below this length the accumulated gradient is considered degenerate.
const MIN_GRADIENT_LEN: f32 = 1e-8;

/// Largest share of the parent direction mixed into a side branch.
const MAX_BRANCH_MOMENTUM: f32 = 0.5;

/// Growth constants consumed by [`grow`].
#[derive(Clone, Copy, Debug)]
pub struct GrowthParams {
    pub length_per_age: f32,
    pub branch_window_period: f32,
    pub branch_probability: f32,
    pub branch_threshold: f32,
    pub min_age: f32,
    pub growth_momentum: f32,
    pub random_growth: f32,
    pub neighbour_radius: f32,
    pub boundary_margin: f32,
    pub domain: Vec2,
    pub field: FieldParams,
}

impl From<&SimulationConfig> for GrowthParams {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            length_per_age: config.length_per_age,
            branch_window_period: config.branch_window_period,
            branch_probability: config.branch_probability,
            branch_threshold: config.branch_threshold,
            min_age: config.min_age,
            growth_momentum: config.growth_momentum,
            random_growth: config.random_growth,
            neighbour_radius: config.neighbour_radius,
            boundary_margin: config.boundary_margin,
            domain: config.domain(),
            field: FieldParams {
                scale_1: config.repulsion_scale_1,
                scale_2: config.repulsion_scale_2,
                resource_pull_scale: config.resource_pull_scale,
            },
        }
    }
}

impl Default for GrowthParams {
    fn default() -> Self {
        Self::from(&SimulationConfig::default())
    }
}

/// Request to create a tip once the pass is over.
#[derive(Clone, Copy, Debug)]
pub struct Spawn {
    pub position: Vec2,
    pub direction: Vec2,
    pub color: Rgba,
    pub parent: TipId,
}

/// What happened to one tip during a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Growing,
    Extended,
    Branched,
    Blocked,
    OutOfBounds,
}

/// Deferred side effects of one pass.
#[derive(Debug, Default)]
pub struct GrowthOutcome {
    pub spawns: Vec<Spawn>,
    pub dead_ends: Vec<TipId>,
    pub extended: usize,
    pub branched: usize,
    pub blocked: usize,
    pub out_of_bounds: usize,
}

impl GrowthOutcome {
    fn record(&mut self, transition: Transition) {
        match transition {
            Transition::Growing => {}
            Transition::Extended => self.extended += 1,
            Transition::Branched => self.branched += 1,
            Transition::Blocked => self.blocked += 1,
            Transition::OutOfBounds => self.out_of_bounds += 1,
        }
    }
}

/// Uniformly distributed unit vector.
pub fn random_direction<R: Rng>(rng: &mut R) -> Vec2 {
    Vec2::from_angle(rng.gen_range(0.0..std::f32::consts::TAU))
}

/// Runs one growth pass. `dt` is simulation time (already time-scaled).
///
/// Tips are visited in store order and the random generator is consumed in
/// that order, so a seeded generator replays the same pass.
pub fn grow<R: Rng>(
    tips: &mut [Tip],
    resources: &[Vec2],
    bin: &PointBin<Occupant>,
    dt: f32,
    params: &GrowthParams,
    rng: &mut R,
) -> GrowthOutcome {
    let mut outcome = GrowthOutcome::default();
    for (id, tip) in tips.iter_mut().enumerate() {
        if !tip.active {
            continue;
        }
        let transition = step_tip(id, tip, resources, bin, dt, params, rng, &mut outcome.spawns);
        if transition != Transition::Growing {
            outcome.dead_ends.push(id);
        }
        outcome.record(transition);
    }
    outcome
}

/// State transition of a single active tip. Spawns are appended to `spawns`.
#[allow(clippy::too_many_arguments)]
pub fn step_tip<R: Rng>(
    id: TipId,
    tip: &mut Tip,
    resources: &[Vec2],
    bin: &PointBin<Occupant>,
    dt: f32,
    params: &GrowthParams,
    rng: &mut R,
    spawns: &mut Vec<Spawn>,
) -> Transition {
    tip.age += dt;
    tip.length += dt * params.length_per_age;
    tip.branch_timer += dt;

    // Reroll: armed windows start negative and count up into (0, 1)
    if tip.branch_timer > params.branch_window_period {
        if rng.gen::<f32>() < params.branch_probability {
            tip.branch_timer = -rng.gen::<f32>();
        } else {
            tip.branch_timer = 1.0;
        }
    }

    let head = tip.head();
    let field = sample_tips(bin, head, params.neighbour_radius, id, &params.field);
    let gradient = field.gradient - resource_pull(head, resources, &params.field);

    if near_boundary(head, params) {
        return Transition::OutOfBounds;
    }

    let (steer, alignment) = if gradient.length() > MIN_GRADIENT_LEN {
        let steer = -gradient.normalize();
        (steer, steer.dot(tip.direction))
    } else {
        (random_direction(rng), 1.0)
    };
    tip.gradient = steer;

    // Turning back means the way ahead is blocked
    if alignment < 0.0 {
        return Transition::Blocked;
    }

    if tip.branch_armed() && field.density < params.branch_threshold {
        spawns.push(Spawn {
            position: head,
            direction: tip.direction,
            color: tip.color,
            parent: id,
        });
        let d = tip.direction;
        let orth = if rng.gen::<f32>() > 0.5 {
            Vec2::new(-d.y, d.x)
        } else {
            Vec2::new(d.y, -d.x)
        };
        let momentum = rng.gen::<f32>() * MAX_BRANCH_MOMENTUM;
        spawns.push(Spawn {
            position: head,
            direction: (d * momentum + orth * (1.0 - momentum)).normalize(),
            color: tip.color,
            parent: id,
        });
        return Transition::Branched;
    }

    if tip.age > params.min_age {
        let blended = tip.direction * params.growth_momentum + steer * (1.0 - params.growth_momentum);
        let noisy =
            random_direction(rng) * params.random_growth + blended * (1.0 - params.random_growth);
        spawns.push(Spawn {
            position: head,
            direction: noisy.try_normalize().unwrap_or(tip.direction),
            color: tip.color,
            parent: id,
        });
        return Transition::Extended;
    }

    Transition::Growing
}

fn near_boundary(p: Vec2, params: &GrowthParams) -> bool {
    let m = params.boundary_margin;
    p.x > params.domain.x - m || p.x < m || p.y > params.domain.y - m || p.y < m
}
