// Tip store and the commit step for a growth pass.
//
// Every tip enters the store through `Colony::insert_tip`, which also indexes
// it, so the store and the spatial index cannot drift apart.

use glam::{UVec2, Vec2};

use crate::growth::GrowthOutcome;
use crate::hypha::Tip;
use crate::point_bin::PointBin;
use crate::types::{Occupant, Resource, ResourceId, Rgba, TipId};

pub struct Colony {
    pub tips: Vec<Tip>,
    pub resources: Vec<Resource>,
    pub index: PointBin<Occupant>,
    branch_window_period: f32,
}

impl Colony {
    pub fn new(domain: Vec2, partition: UVec2, branch_window_period: f32) -> Self {
        Self {
            tips: Vec::new(),
            resources: Vec::new(),
            index: PointBin::new(domain, partition),
            branch_window_period,
        }
    }

    /// Creates an active tip and indexes it at `position`.
    pub fn insert_tip(
        &mut self,
        position: Vec2,
        direction: Vec2,
        color: Rgba,
        parent: Option<TipId>,
    ) -> TipId {
        let id = self.tips.len();
        self.tips.push(Tip::new(
            position,
            direction,
            color,
            self.branch_window_period,
            parent,
        ));
        self.index.add(position, Occupant::Tip(id));
        id
    }

    pub fn insert_resource(&mut self, position: Vec2) -> ResourceId {
        let id = self.resources.len();
        self.resources.push(Resource { position });
        self.index.add(position, Occupant::Resource(id));
        id
    }

    pub fn resource_positions(&self) -> Vec<Vec2> {
        self.resources.iter().map(|r| r.position).collect()
    }

    pub fn active_count(&self) -> usize {
        self.tips.iter().filter(|t| t.active).count()
    }

    /// Commits a growth pass: creates the requested tips, then freezes the
    /// dead ends. Returns the ids of the new tips in spawn order.
    pub fn apply(&mut self, outcome: GrowthOutcome) -> Vec<TipId> {
        let mut created = Vec::with_capacity(outcome.spawns.len());
        for spawn in outcome.spawns {
            created.push(self.insert_tip(
                spawn.position,
                spawn.direction,
                spawn.color,
                Some(spawn.parent),
            ));
        }
        for id in outcome.dead_ends {
            self.tips[id].active = false;
        }
        created
    }

    pub fn clear(&mut self) {
        self.tips.clear();
        self.resources.clear();
        self.index.clear();
    }
}
