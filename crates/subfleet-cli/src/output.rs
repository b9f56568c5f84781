//! Plain-text and JSON rendering of run results.

use std::fmt::Write;

use glam::IVec2;
use serde::Serialize;
use subfleet_core::analysis::DistanceExtremes;
use subfleet_core::{ActivationDecision, FireControlReport, RunSummary, SubmarineSnapshot};
use subfleet_data::SensorSummary;

/// Everything the `run` command reports.
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// Run summary from the core
    pub summary: RunSummary,
    /// Nearest and farthest surviving pair
    pub distances: Option<DistanceExtremes>,
    /// Sensor statistics per entity
    pub sensors: Vec<SensorSummary>,
    /// Fire-control report per survivor
    pub fire_control: Vec<FireControlReport>,
}

fn position(p: IVec2) -> String {
    format!("({}, {})", p.x, p.y)
}

fn state_line(s: &SubmarineSnapshot) -> String {
    let status = match (s.active, s.exhausted) {
        (false, _) => "destroyed",
        (true, true) => "idle",
        (true, false) => "active",
    };
    format!(
        "{:<16} {:>14}  {:<9}  {} moves",
        s.id,
        position(s.position),
        status,
        s.moves
    )
}

/// Renders one fire-control report as a single line.
#[must_use]
pub fn fire_control_line(report: &FireControlReport) -> String {
    let who = report
        .shooter
        .as_ref()
        .map_or_else(|| "-".to_string(), ToString::to_string);
    let lanes: Vec<String> = report
        .lanes
        .iter()
        .map(|lane| match &lane.nearest {
            None => format!("{} clear", lane.direction),
            Some(s) => format!(
                "{} blocked by {} at {} ({} away)",
                lane.direction,
                s.id,
                position(s.position),
                s.distance
            ),
        })
        .collect();
    format!("{who}: {}", lanes.join(" | "))
}

/// Renders the `run` report as text.
#[must_use]
pub fn render_run(report: &RunReport) -> String {
    let mut out = String::new();
    let summary = &report.summary;

    let _ = writeln!(
        out,
        "rounds: {}  survivors: {}/{}  outcome: {:?}",
        summary.rounds,
        summary.survivors.len(),
        summary.final_state.len(),
        summary.outcome
    );

    let _ = writeln!(out, "\nfinal state:");
    for s in &summary.final_state {
        let _ = writeln!(out, "  {}", state_line(s));
    }

    let _ = writeln!(out, "\ncollisions: {}", summary.collisions.len());
    for c in &summary.collisions {
        let _ = writeln!(out, "  {c}");
    }

    if let Some(d) = &report.distances {
        let _ = writeln!(
            out,
            "\nnearest pair:  {} - {} ({:.2})",
            d.nearest.a, d.nearest.b, d.nearest.distance
        );
        let _ = writeln!(
            out,
            "farthest pair: {} - {} ({:.2})",
            d.farthest.a, d.farthest.b, d.farthest.distance
        );
    }

    if !report.sensors.is_empty() {
        let _ = writeln!(out, "\nsensors:");
        for s in &report.sensors {
            let _ = writeln!(
                out,
                "  {}: rounds={} errors={} max={} unique={}",
                s.entity, s.rounds_read, s.total_errors, s.max_errors, s.unique_patterns
            );
            for p in &s.top_patterns {
                let _ = writeln!(out, "    {}x {}", p.count, p.pattern);
            }
        }
    }

    if !report.fire_control.is_empty() {
        let _ = writeln!(out, "\nfire control:");
        for r in &report.fire_control {
            let _ = writeln!(out, "  {}", fire_control_line(r));
        }
    }
    out
}

/// Renders an activation decision as text.
#[must_use]
pub fn render_decision(decision: &ActivationDecision) -> String {
    let mut out = String::new();
    let verdict = if decision.allowed() { "ALLOWED" } else { "DENIED" };
    let _ = writeln!(out, "activation {verdict} for {} on {}", decision.target, decision.date);
    let _ = writeln!(out, "  {}", fire_control_line(&decision.report));
    for denial in &decision.denials {
        let _ = writeln!(out, "  - {denial}");
    }
    out
}
