//! Shared fixtures: a marker matcher, a tank delegate, and line catalogs.

#![allow(dead_code, clippy::unwrap_used)]

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use keystone_pattern::{Matcher, PatternCatalog, Probe, Template};
use keystone_structure::{Actor, FunctionalDelegate, StructureWorld, VoxelGrid, WorldRole};
use keystone_types::{CellMarker, ContentDescriptor, GridCoordinate, StructureKind, Verdict};
use serde_json::{Value, json};

/// Tests every cell of a template against the grid, with the probed node at
/// the master offset.
///
/// `A` must be air, `O` anything but the probed node's content, `*`
/// anything at all; every other marker must match the probed node's
/// content. The first unloaded cell makes the verdict `NotLoaded`.
pub struct MarkerMatcher;

impl Matcher for MarkerMatcher {
    fn test(&self, template: &Template, probe: &Probe<'_>) -> Verdict {
        let Some(origin) = template.origin_for(probe.position) else {
            return Verdict::Invalid;
        };
        let own = probe.grid.content_at(probe.position);
        for (offset, marker) in template.cells() {
            let Some(at) = origin.checked_add(offset) else {
                return Verdict::Invalid;
            };
            if !probe.grid.region_loaded(at) {
                return Verdict::NotLoaded;
            }
            let content = probe.grid.content_at(at);
            let ok = match marker {
                CellMarker::ANYTHING => true,
                CellMarker::AIR => content.is_air(),
                CellMarker::OTHER => content != own,
                _ => content == own,
            };
            if !ok {
                return Verdict::Invalid;
            }
        }
        Verdict::Valid
    }
}

/// Kind used by every fixture catalog.
pub fn tank_kind() -> StructureKind {
    StructureKind::from("tank")
}

/// Two templates: a three-long line mastered in the middle, and a
/// two-long line mastered at its first cell.
pub fn line_catalog() -> Arc<PatternCatalog> {
    let templates = vec![
        Template::from_layers("line3", &[&["OBBBO"]], GridCoordinate::new(2, 0, 0)).unwrap(),
        Template::from_layers("line2", &[&["OBBO"]], GridCoordinate::new(1, 0, 0)).unwrap(),
    ];
    Arc::new(PatternCatalog::new(tank_kind(), templates, Arc::new(MarkerMatcher)).unwrap())
}

/// Hook counters shared with a [`Tank`] after it moves into the world.
#[derive(Debug, Default, Clone)]
pub struct TankProbe {
    /// `evict_contents` calls.
    pub evictions: Rc<Cell<u32>>,
    /// `on_master_reset` calls.
    pub resets: Rc<Cell<u32>>,
    /// `evaluate` calls.
    pub ticks: Rc<Cell<u32>>,
}

/// A tank that counts its hooks and holds a fluid level.
#[derive(Debug, Default)]
pub struct Tank {
    /// Stored fluid, replicated and persisted.
    pub fluid: u32,
    /// Hook counters.
    pub probe: TankProbe,
}

impl FunctionalDelegate for Tank {
    fn evaluate(&mut self, _ctx: &keystone_structure::DelegateContext<'_>) {
        self.probe.ticks.set(self.probe.ticks.get().saturating_add(1));
    }

    fn write_durable(&self) -> Value {
        json!({ "fluid": self.fluid })
    }

    fn read_durable(&mut self, data: &Value) {
        self.fluid = data
            .get("fluid")
            .and_then(Value::as_u64)
            .and_then(|f| u32::try_from(f).ok())
            .unwrap_or_default();
    }

    fn encode_replica(&self) -> Vec<u8> {
        self.fluid.to_le_bytes().to_vec()
    }

    fn decode_replica(&mut self, bytes: &[u8]) {
        if let Ok(raw) = <[u8; 4]>::try_from(bytes) {
            self.fluid = u32::from_le_bytes(raw);
        }
    }

    fn handle_interaction(&mut self, _actor: &Actor) -> bool {
        self.fluid = self.fluid.saturating_add(1);
        true
    }

    fn evict_contents(&mut self) {
        self.probe.evictions.set(self.probe.evictions.get().saturating_add(1));
    }

    fn on_master_reset(&mut self) {
        self.probe.resets.set(self.probe.resets.get().saturating_add(1));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Content of every tank node.
pub fn tank_block() -> ContentDescriptor {
    ContentDescriptor::block("tank_wall")
}

/// Place a tank node at `position`, returning its hook counters.
pub fn place_tank(world: &mut StructureWorld<VoxelGrid>, position: GridCoordinate) -> TankProbe {
    let tank = Tank::default();
    let probe = tank.probe.clone();
    world
        .place_structure_node(position, tank_block(), line_catalog(), Box::new(tank))
        .unwrap();
    probe
}

/// A line of tank nodes along x starting at `start`.
pub fn line(start: GridCoordinate, length: i32) -> Vec<GridCoordinate> {
    (0..length)
        .map(|dx| start.checked_add(GridCoordinate::new(dx, 0, 0)).unwrap())
        .collect()
}

/// A world of the given role with a tank at each position.
pub fn world_with(role: WorldRole, positions: &[GridCoordinate]) -> StructureWorld<VoxelGrid> {
    let mut world = StructureWorld::new(VoxelGrid::new(), role);
    for &position in positions {
        place_tank(&mut world, position);
    }
    world
}
