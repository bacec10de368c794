//! Election, assembly, and teardown on an authoritative world.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

mod common;

use common::{Tank, line, place_tank, tank_kind, world_with};
use keystone_structure::{Actor, StructureEvent, StructureWorld, WorldRole};
use keystone_types::{CellMarker, GridCoordinate, StructureState};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;

fn assert_master_implies_valid(world: &StructureWorld) {
    for position in world.engine_positions() {
        let engine = world.engine(position).unwrap();
        assert_eq!(
            engine.master_position().is_some(),
            engine.state() == StructureState::Valid,
            "{position}: master {:?} with state {:?}",
            engine.master_position(),
            engine.state()
        );
    }
}

#[test]
fn three_node_line_elects_middle_master() {
    let nodes = line(GridCoordinate::ORIGIN, 3);
    let mut world = world_with(WorldRole::Authoritative, &nodes);

    // The far end is recruited before its turn comes.
    assert_eq!(world.evaluate_all(), 2);

    let middle = nodes[1];
    let master = world.engine(middle).unwrap();
    assert!(master.is_valid_master());
    assert_eq!(master.pattern_index(), 0);
    assert_eq!(world.current_components(middle).len(), 3);

    for end in [nodes[0], nodes[2]] {
        let engine = world.engine(end).unwrap();
        assert_eq!(engine.state(), StructureState::Valid);
        assert!(!engine.is_master());
        assert_eq!(world.resolve_master(end), Some(middle));
        assert_eq!(world.current_components(end), world.current_components(middle));
        assert_eq!(world.pattern_marker_at(end), CellMarker::BLOCK);
    }
    assert_master_implies_valid(&world);
}

#[test]
fn two_node_line_uses_second_template() {
    let nodes = line(GridCoordinate::new(10, 4, -3), 2);
    let mut world = world_with(WorldRole::Authoritative, &nodes);
    world.evaluate_all();

    let master = world.engine(nodes[0]).unwrap();
    assert!(master.is_valid_master());
    assert_eq!(master.pattern_index(), 1);
    assert_eq!(world.resolve_master(nodes[1]), Some(nodes[0]));
}

#[test]
fn evaluation_runs_only_when_untested() {
    let nodes = line(GridCoordinate::ORIGIN, 3);
    let mut world = world_with(WorldRole::Authoritative, &nodes);
    world.evaluate_all();

    for &node in &nodes {
        assert_eq!(world.evaluate(node), None);
    }
    assert_eq!(world.evaluate_all(), 0);
}

#[test]
fn formed_event_is_published_once() {
    let nodes = line(GridCoordinate::ORIGIN, 3);
    let mut world = world_with(WorldRole::Authoritative, &nodes);
    world.evaluate_all();

    let events = world.drain_events();
    assert_eq!(
        events,
        vec![StructureEvent::Formed {
            master: nodes[1],
            kind: tank_kind(),
            template_index: 0,
            components: 3,
        }]
    );
    world.evaluate_all();
    assert!(world.drain_events().is_empty());
}

#[test]
fn removing_master_invalidates_members() {
    let nodes = line(GridCoordinate::ORIGIN, 3);
    let mut world = StructureWorld::authoritative();
    let probes: Vec<_> = nodes.iter().map(|&n| place_tank(&mut world, n)).collect();
    world.evaluate_all();

    let removed = world.remove_node(nodes[1]).unwrap().unwrap();
    assert!(removed.is_destroyed());
    assert!(!removed.is_valid_master());
    assert_eq!(probes[1].resets.get(), 1);

    for end in [nodes[0], nodes[2]] {
        assert_eq!(world.current_state(end), Some(StructureState::Untested));
        assert_eq!(world.resolve_master(end), None);
        assert!(world.current_components(end).is_empty());
        assert!(!world.is_structure_valid(end));
    }

    world.evaluate_all();
    for (end, probe) in [(nodes[0], &probes[0]), (nodes[2], &probes[2])] {
        let engine = world.engine(end).unwrap();
        assert_eq!(engine.state(), StructureState::Invalid);
        assert!(engine.placement().is_none());
        assert!(probe.evictions.get() >= 1);
        assert_eq!(world.pattern_marker_at(end), CellMarker::OTHER);
    }
    assert_master_implies_valid(&world);
}

#[test]
fn growing_the_line_reforms_the_structure() {
    let mut world = world_with(WorldRole::Authoritative, &line(GridCoordinate::ORIGIN, 2));
    world.evaluate_all();
    assert_eq!(world.pattern_index(GridCoordinate::ORIGIN), 1);

    place_tank(&mut world, GridCoordinate::new(2, 0, 0));
    world.evaluate_all();

    let middle = GridCoordinate::new(1, 0, 0);
    assert!(world.engine(middle).unwrap().is_valid_master());
    assert_eq!(world.resolve_master(GridCoordinate::ORIGIN), Some(middle));
    assert!(!world.engine(GridCoordinate::ORIGIN).unwrap().is_master());
    assert_eq!(world.current_components(GridCoordinate::ORIGIN).len(), 3);
    assert_master_implies_valid(&world);
}

#[test]
fn shuffled_evaluation_order_converges() {
    let nodes = line(GridCoordinate::new(-7, 2, 5), 3);
    for seed in 0..16 {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut order = nodes.clone();
        order.shuffle(&mut rng);

        let mut world = StructureWorld::authoritative();
        for &node in &order {
            place_tank(&mut world, node);
        }
        order.shuffle(&mut rng);
        for &node in &order {
            world.evaluate(node);
        }

        for &node in &nodes {
            assert_eq!(
                world.resolve_master(node),
                Some(nodes[1]),
                "seed {seed}: {node} did not converge"
            );
        }
        assert_eq!(world.drain_events().len(), 1, "seed {seed}");
    }
}

#[test]
fn unloaded_region_defers_until_retried() {
    // The line straddles the region boundary at x = 16.
    let nodes = line(GridCoordinate::new(14, 0, 0), 3);
    let middle = nodes[1];
    let mut world = world_with(WorldRole::Authoritative, &nodes);
    world.grid_mut().set_region_loaded(nodes[2], false);

    world.evaluate_all();
    assert_eq!(world.current_state(middle), Some(StructureState::Unknown));
    assert!(world.engine(middle).unwrap().placement().is_none());

    world.grid_mut().set_region_loaded(nodes[2], true);
    assert!(world.retry_unknown() >= 1);
    world.evaluate_all();

    assert!(world.engine(middle).unwrap().is_valid_master());
    assert_eq!(world.current_components(middle).len(), 3);
}

#[test]
fn capability_and_interaction_reach_the_master() {
    let nodes = line(GridCoordinate::ORIGIN, 3);
    let mut world = world_with(WorldRole::Authoritative, &nodes);
    world.evaluate_all();

    let actor = Actor::new("player-1");
    assert!(world.interact(nodes[0], &actor));
    assert!(world.interact(nodes[2], &actor));
    assert_eq!(world.capability::<Tank>(nodes[0]).unwrap().fluid, 2);
    assert_eq!(world.capability::<Tank>(nodes[1]).unwrap().fluid, 2);

    world.capability_mut::<Tank>(nodes[2]).unwrap().fluid = 40;
    assert_eq!(world.capability::<Tank>(nodes[1]).unwrap().fluid, 40);
    assert!(world.capability::<String>(nodes[1]).is_none());
}

#[test]
fn queries_fail_soft_without_a_structure() {
    let lone = GridCoordinate::new(3, 3, 3);
    let mut world = world_with(WorldRole::Authoritative, &[lone]);
    world.evaluate_all();

    assert_eq!(world.current_state(lone), Some(StructureState::Invalid));
    assert!(world.capability::<Tank>(lone).is_none());
    assert!(!world.interact(lone, &Actor::new("player-1")));
    assert!(world.current_components(lone).is_empty());
    assert_eq!(world.pattern_index(lone), -1);
    assert_eq!(world.current_state(GridCoordinate::ORIGIN), None);
}

#[test]
fn delegates_run_on_valid_masters_only() {
    let nodes = line(GridCoordinate::ORIGIN, 3);
    let mut world = StructureWorld::authoritative();
    let probes: Vec<_> = nodes.iter().map(|&n| place_tank(&mut world, n)).collect();
    world.evaluate_all();

    assert_eq!(world.run_delegates(1), 1);
    assert_eq!(probes[1].ticks.get(), 1);
    assert_eq!(probes[0].ticks.get(), 0);
}

#[test]
fn summary_reports_master_and_template() {
    let nodes = line(GridCoordinate::ORIGIN, 3);
    let mut world = world_with(WorldRole::Authoritative, &nodes);
    world.evaluate_all();

    let summary = world.summary(nodes[2]).unwrap();
    assert_eq!(summary.state, StructureState::Valid);
    assert!(!summary.is_master);
    assert_eq!(summary.master, Some(nodes[1]));
    assert_eq!(summary.template_index, 0);
}
