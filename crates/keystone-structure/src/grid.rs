//! The node adapter contract and an arena grid that implements it.
//!
//! Engines are owned by the nodes of the grid. Everything that crosses
//! from one node to another goes through a coordinate lookup here, so a
//! removed node simply stops resolving instead of leaving a dangling link.

use std::collections::{BTreeMap, BTreeSet};

use keystone_pattern::GridView;
use keystone_types::{ContentDescriptor, Direction, GridCoordinate};

use crate::engine::StructureEngine;

/// Edge length, in cells, of the square column regions that load and unload
/// together.
pub const REGION_SIZE: i32 = 16;

/// Coordinate-keyed access to nodes and their engines.
pub trait NodeAdapter: GridView {
    /// Whether a node exists at `position`.
    fn contains_node(&self, position: GridCoordinate) -> bool;

    /// The engine owned by the node at `position`.
    fn engine(&self, position: GridCoordinate) -> Option<&StructureEngine>;

    /// The engine owned by the node at `position`, mutably.
    fn engine_mut(&mut self, position: GridCoordinate) -> Option<&mut StructureEngine>;

    /// Coordinates of every node that owns an engine, in a stable order.
    fn engine_positions(&self) -> Vec<GridCoordinate>;

    /// The adjacent node in `direction`, if one exists and its region is
    /// loaded.
    fn neighbor(&self, position: GridCoordinate, direction: Direction) -> Option<GridCoordinate> {
        let next = position.neighbor(direction)?;
        (self.region_loaded(next) && self.contains_node(next)).then_some(next)
    }
}

/// One addressable cell of the grid.
#[derive(Debug)]
pub struct Node {
    /// What occupies the cell.
    pub content: ContentDescriptor,
    /// The structure engine, for nodes that can join structures.
    pub engine: Option<StructureEngine>,
}

/// Region key: the column of [`REGION_SIZE`]-wide cells containing a
/// coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegionKey {
    /// Region index along x.
    pub x: i32,
    /// Region index along z.
    pub z: i32,
}

impl RegionKey {
    /// The region containing `position`.
    pub const fn of(position: GridCoordinate) -> Self {
        Self {
            x: position.x.div_euclid(REGION_SIZE),
            z: position.z.div_euclid(REGION_SIZE),
        }
    }
}

/// Arena grid: nodes keyed by coordinate, plus the set of unloaded regions.
///
/// Cells with no node read as air. Every region is loaded unless
/// explicitly unloaded.
#[derive(Debug, Default)]
pub struct VoxelGrid {
    nodes: BTreeMap<GridCoordinate, Node>,
    unloaded: BTreeSet<RegionKey>,
}

impl VoxelGrid {
    /// An empty, fully loaded grid.
    pub const fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            unloaded: BTreeSet::new(),
        }
    }

    /// Insert a node. Returns the node it replaced, if any.
    pub fn insert(&mut self, position: GridCoordinate, node: Node) -> Option<Node> {
        self.nodes.insert(position, node)
    }

    /// Remove and return the node at `position`.
    pub fn remove(&mut self, position: GridCoordinate) -> Option<Node> {
        self.nodes.remove(&position)
    }

    /// Replace the content of an existing node. Returns `false` when there
    /// is no node.
    pub fn set_content(&mut self, position: GridCoordinate, content: ContentDescriptor) -> bool {
        match self.nodes.get_mut(&position) {
            Some(node) => {
                node.content = content;
                true
            }
            None => false,
        }
    }

    /// Mark the region containing `position` loaded or unloaded.
    pub fn set_region_loaded(&mut self, position: GridCoordinate, loaded: bool) {
        let key = RegionKey::of(position);
        if loaded {
            self.unloaded.remove(&key);
        } else {
            self.unloaded.insert(key);
        }
    }
}

impl GridView for VoxelGrid {
    fn content_at(&self, position: GridCoordinate) -> ContentDescriptor {
        self.nodes
            .get(&position)
            .map(|node| node.content.clone())
            .unwrap_or_default()
    }

    fn region_loaded(&self, position: GridCoordinate) -> bool {
        !self.unloaded.contains(&RegionKey::of(position))
    }
}

impl NodeAdapter for VoxelGrid {
    fn contains_node(&self, position: GridCoordinate) -> bool {
        self.nodes.contains_key(&position)
    }

    fn engine(&self, position: GridCoordinate) -> Option<&StructureEngine> {
        self.nodes.get(&position)?.engine.as_ref()
    }

    fn engine_mut(&mut self, position: GridCoordinate) -> Option<&mut StructureEngine> {
        self.nodes.get_mut(&position)?.engine.as_mut()
    }

    fn engine_positions(&self) -> Vec<GridCoordinate> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.engine.is_some())
            .map(|(&position, _)| position)
            .collect()
    }
}
