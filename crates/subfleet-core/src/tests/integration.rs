//! End-to-end tests of the round loop, fire control and the activation gate.

use glam::IVec2;

use crate::command::{Command, Direction};
use crate::config::SimulationConfig;
use crate::entity::EntityId;
use crate::error::InvalidCommand;
use crate::events::SimEvent;
use crate::fire_control;
use crate::gate::{ActivationGate, Denial};
use crate::simulation::{RoundState, RunOutcome, Simulation};
use crate::stream::ScriptedSource;

use super::helpers::{
    count_events, fleet_at, fleet_with_scripts, is_active, position_of, recorded_simulation,
    test_date, AcceptProof,
};

// =============================================================================
// Reference scenarios
// =============================================================================

#[test]
fn head_to_head_collision_destroys_both() {
    let source = ScriptedSource::new()
        .with_script("A", vec![Command::forward(5)])
        .with_script("B", vec![Command::forward(5)]);
    let (mut sim, sink) = recorded_simulation(&source, SimulationConfig::default());

    let report = sim.step_round().expect("one round runs");
    assert_eq!(report.collisions.len(), 1);
    let collision = &report.collisions[0];
    assert_eq!(
        collision.ids(),
        (&EntityId::new("A"), &EntityId::new("B"))
    );
    assert_eq!(collision.position(), IVec2::new(5, 0));
    assert!(!is_active(&sim, "A"));
    assert!(!is_active(&sim, "B"));
    assert!(report.is_final());

    let events = sink.take_events();
    assert_eq!(
        count_events(&events, |e| matches!(e, SimEvent::CollisionDetected { .. })),
        1
    );
}

#[test]
fn three_way_pile_up_destroys_everyone() {
    let source = ScriptedSource::new()
        .with_script("A", vec![Command::forward(2), Command::forward(1)])
        .with_script("B", vec![Command::forward(2), Command::down(1)])
        .with_script("C", vec![Command::forward(2), Command::up(1)]);
    let mut sim = Simulation::from_source(&source, SimulationConfig::default());

    let report = sim.step_round().expect("round runs");
    assert_eq!(report.collisions.len(), 3);
    assert_eq!(report.active, 0);
    assert!(report.is_final());

    let summary = sim.run();
    assert_eq!(summary.rounds, 1);
    for id in ["A", "B", "C"] {
        assert_eq!(position_of(&sim, id), IVec2::new(2, 0));
        assert_eq!(sim.fleet().get(id).unwrap().history().len(), 1);
    }
}

#[test]
fn target_directly_above_blocks_up_lane_only() {
    let sim = Simulation::new(
        fleet_at(&[("S", 10, 10), ("T", 10, 5)]),
        SimulationConfig::default(),
    );
    let report = sim.fire_control("S").unwrap();
    assert!(!report.is_safe(Direction::Up));
    assert_eq!(
        report.lane(Direction::Up).nearest_position(),
        Some(IVec2::new(10, 5))
    );
    assert!(report.is_safe(Direction::Down));
    assert_eq!(report.lane(Direction::Down).nearest_position(), None);
    assert!(report.is_safe(Direction::Forward));
    assert_eq!(report.lane(Direction::Forward).nearest_position(), None);
}

#[test]
fn gate_denies_unsafe_lane_despite_valid_credentials() {
    let sim = Simulation::new(
        fleet_at(&[("S", 0, 0), ("T", 7, 0)]),
        SimulationConfig::default(),
    );
    let gate = ActivationGate::new(AcceptProof("good"));
    let decision = sim
        .request_activation(&gate, "S", "good", test_date())
        .unwrap();
    assert!(decision.credential_passed());
    assert!(!decision.allowed());
    assert_eq!(decision.unsafe_directions(), vec![Direction::Forward]);
}

#[test]
fn malformed_line_is_skipped_and_valid_command_applied() {
    let source = ScriptedSource::new().with_items(
        "A",
        vec![
            Err(InvalidCommand::Malformed("forward five".into())),
            Ok(Command::down(3)),
        ],
    );
    let (mut sim, sink) = recorded_simulation(&source, SimulationConfig::default());

    let summary = sim.run();
    assert_eq!(summary.rounds, 1);
    assert_eq!(summary.outcome, RunOutcome::Completed);
    assert_eq!(position_of(&sim, "A"), IVec2::new(0, 3));
    assert_eq!(sim.fleet().get("A").unwrap().skipped_total(), 1);

    let events = sink.take_events();
    assert_eq!(
        count_events(&events, |e| matches!(e, SimEvent::CommandRejected { .. })),
        1
    );
    assert_eq!(
        count_events(&events, |e| matches!(e, SimEvent::MovementApplied { .. })),
        1
    );
}

// =============================================================================
// Full runs
// =============================================================================

#[test]
fn activation_allowed_with_clear_lanes_and_valid_proof() {
    let source = ScriptedSource::new()
        .with_script("A", vec![Command::forward(3), Command::up(2)])
        .with_script("B", vec![Command::down(4)]);
    let (mut sim, sink) = recorded_simulation(&source, SimulationConfig::default());
    sim.run();
    sink.clear();

    let gate = ActivationGate::new(AcceptProof("ok"));
    let decision = sim.request_activation(&gate, "A", "ok", test_date()).unwrap();
    assert!(decision.allowed());

    let denied = sim
        .request_activation(&gate, "A", "wrong", test_date())
        .unwrap();
    assert!(!denied.allowed());
    assert!(!denied.credential_passed());

    let events = sink.take_events();
    assert_eq!(
        count_events(&events, |e| matches!(
            e,
            SimEvent::ActivationDecided { allowed: true, .. }
        )),
        1
    );
    assert_eq!(
        count_events(&events, |e| matches!(e, SimEvent::FireControlComputed { .. })),
        2
    );
}

#[test]
fn destroyed_submarine_cannot_activate() {
    let source = ScriptedSource::new()
        .with_script("A", vec![Command::up(1)])
        .with_script("B", vec![Command::up(1)]);
    let mut sim = Simulation::from_source(&source, SimulationConfig::default());
    sim.run();
    let gate = ActivationGate::new(AcceptProof("ok"));
    let decision = sim.request_activation(&gate, "A", "ok", test_date()).unwrap();
    assert_eq!(decision.denials, vec![Denial::TargetDestroyed]);
}

#[test]
fn wrecks_do_not_block_fire_control() {
    let source = ScriptedSource::new()
        .with_script("A", vec![Command::forward(4)])
        .with_script("B", vec![Command::forward(4)])
        .with_script("S", vec![Command::forward(1)]);
    let mut sim = Simulation::from_source(&source, SimulationConfig::default());
    sim.run();
    let report = sim.fire_control("S").unwrap();
    assert!(report.all_clear());
}

#[test]
fn fire_control_on_intermediate_snapshot() {
    let source = ScriptedSource::new()
        .with_script("S", vec![Command::forward(1), Command::down(10)])
        .with_script("T", vec![Command::forward(6), Command::up(0)]);
    let mut sim = Simulation::from_source(&source, SimulationConfig::default());

    sim.step_round();
    let after_one = sim.snapshot();
    sim.run();

    let early = fire_control::scan(&after_one, "S").unwrap();
    assert!(!early.is_safe(Direction::Forward));
    let late = sim.fire_control("S").unwrap();
    assert!(late.all_clear());
}

#[test]
fn missing_stream_never_moves() {
    let source = ScriptedSource::new()
        .with_missing("ghost")
        .with_script("A", vec![Command::down(1); 2]);
    let mut sim = Simulation::from_source(&source, SimulationConfig::default());
    let summary = sim.run();
    assert_eq!(summary.rounds, 2);
    assert_eq!(position_of(&sim, "ghost"), IVec2::ZERO);
    assert!(summary.survivors.contains(&EntityId::new("ghost")));
}

#[test]
fn exhausted_submarine_stays_active_and_can_still_be_hit() {
    let fleet = fleet_with_scripts(vec![
        ("sitter", IVec2::new(3, 0), vec![]),
        ("mover", IVec2::ZERO, vec![Command::forward(1), Command::forward(2)]),
    ]);
    let mut sim = Simulation::new(fleet, SimulationConfig::default());
    let first = sim.step_round().unwrap();
    assert_eq!(first.moved, 1);
    assert!(sim.fleet().get("sitter").unwrap().is_exhausted());
    assert!(is_active(&sim, "sitter"));

    let second = sim.step_round().unwrap();
    assert_eq!(second.collisions.len(), 1);
    assert!(!is_active(&sim, "sitter"));
    assert_eq!(second.state, RoundState::Terminated);
}

#[test]
fn out_of_bounds_command_is_rejected_not_fatal() {
    let fleet = fleet_with_scripts(vec![(
        "edge",
        IVec2::new(i32::MAX, 0),
        vec![Command::forward(1), Command::down(1)],
    )]);
    let sink = std::sync::Arc::new(crate::events::RecordingSink::new());
    let mut sim = Simulation::new(fleet, SimulationConfig::default()).with_sink(sink.clone());
    let summary = sim.run();
    assert_eq!(summary.rounds, 2);
    assert_eq!(position_of(&sim, "edge"), IVec2::new(i32::MAX, 1));
    let events = sink.take_events();
    assert_eq!(
        count_events(&events, |e| matches!(e, SimEvent::CommandRejected { round: 1, .. })),
        1
    );
}
