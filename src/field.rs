// Repulsion and attraction fields used to steer tips.
//
// Both fields are built from the inverse-power kernel `(d²)^k` with
// `d² = |p - q|²`. The analytic gradient with respect to the evaluation
// point `p` is `2·k·(d²)^(k-1)·(p - q)`; for negative `k` it points from
// `p` toward `q`. Callers flip the sign of the accumulated gradient when
// turning it into a steering direction.

use glam::Vec2;

use crate::point_bin::PointBin;
use crate::types::{Occupant, TipId};

/// Squared distances below this are treated as coincident and skipped.
pub const COINCIDENT_DIST_SQ: f32 = 1e-10;

#[derive(Clone, Copy, Debug)]
pub struct FieldParams {
    pub scale_1: f32,
    pub scale_2: f32,
    pub resource_pull_scale: f32,
}

impl Default for FieldParams {
    fn default() -> Self {
        Self {
            scale_1: 1.0,
            scale_2: 4.0,
            resource_pull_scale: 1024.0,
        }
    }
}

/// Accumulated field value at one point.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FieldSample {
    pub gradient: Vec2,
    pub density: f32,
}

/// Gradient of `(d²)^exp` at `eval_point` for a source at `source`.
fn kernel_gradient(eval_point: Vec2, source: Vec2, dist_sq: f32, exp: f32) -> Vec2 {
    let s = exp * dist_sq.powf(exp - 1.0);
    (eval_point - source) * (2.0 * s)
}

/// Contribution of one neighbour; zero for coincident points.
pub fn eval_fields(eval_point: Vec2, neighbour: Vec2, params: &FieldParams) -> FieldSample {
    let dist_sq = eval_point.distance_squared(neighbour);
    if dist_sq < COINCIDENT_DIST_SQ {
        return FieldSample::default();
    }
    let gradient = kernel_gradient(eval_point, neighbour, dist_sq, -1.0) * params.scale_1
        + kernel_gradient(eval_point, neighbour, dist_sq, -2.0) * params.scale_2;
    FieldSample {
        gradient,
        density: 1.0 / dist_sq.sqrt(),
    }
}

/// Sums the tip fields of `neighbours` at `eval_point`, skipping `exclude`.
pub fn density_and_gradient<I>(
    eval_point: Vec2,
    neighbours: I,
    exclude: TipId,
    params: &FieldParams,
) -> FieldSample
where
    I: IntoIterator<Item = (Vec2, TipId)>,
{
    neighbours
        .into_iter()
        .filter(|&(_, id)| id != exclude)
        .fold(FieldSample::default(), |mut acc, (point, _)| {
            let sample = eval_fields(eval_point, point, params);
            acc.gradient += sample.gradient;
            acc.density += sample.density;
            acc
        })
}

/// Tip field at `eval_point` from every tip the index returns for `radius`.
/// Resource entries in the index are ignored here.
pub fn sample_tips(
    bin: &PointBin<Occupant>,
    eval_point: Vec2,
    radius: f32,
    exclude: TipId,
    params: &FieldParams,
) -> FieldSample {
    let tips = bin
        .neighbours(eval_point, radius)
        .filter_map(|(point, occupant)| match *occupant {
            Occupant::Tip(id) => Some((point, id)),
            Occupant::Resource(_) => None,
        });
    density_and_gradient(eval_point, tips, exclude, params)
}

/// Resource term, to be subtracted from the tip gradient. After the caller's
/// sign flip this steers toward resources.
pub fn resource_pull(eval_point: Vec2, resources: &[Vec2], params: &FieldParams) -> Vec2 {
    resources
        .iter()
        .filter_map(|&r| {
            let dist_sq = eval_point.distance_squared(r);
            (dist_sq >= COINCIDENT_DIST_SQ).then(|| {
                kernel_gradient(eval_point, r, dist_sq, -1.0) * params.resource_pull_scale
            })
        })
        .fold(Vec2::ZERO, |acc, g| acc + g)
}
