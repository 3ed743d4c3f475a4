// timing.rs — Mermaid Gantt timing chart of a cell's pipeline
//
// Shows, for a run that holds reset for `reset_cycles` cycles and then
// drives `events` input triples on consecutive cycles, when each event is
// driven, when it sits in the capture registers and when its outputs are
// valid. The axis unit is one clock cycle.
//
// Preconditions: none.
// Postconditions: returns a complete Mermaid Gantt chart.
// Failure modes: none (pure string formatting).
// Side effects: none.

use std::fmt::Write;

use crate::cell::{CellKind, LATENCY};

/// Emit the pipeline schedule of a run as a Mermaid Gantt chart string.
pub fn emit_timing_chart(kind: CellKind, reset_cycles: u64, events: u64) -> String {
    let mut buf = String::new();
    writeln!(buf, "gantt").unwrap();
    writeln!(buf, "    title {} cell pipeline (latency {})", kind, LATENCY).unwrap();
    writeln!(buf, "    dateFormat x").unwrap();
    writeln!(buf, "    axisFormat %Q").unwrap();

    if reset_cycles > 0 {
        writeln!(buf).unwrap();
        writeln!(buf, "    section reset").unwrap();
        writeln!(buf, "    reset asserted :rst, 0, {}", reset_cycles).unwrap();
        // Outputs stay zero until the first event has drained.
        writeln!(
            buf,
            "    outputs zero :rst_out, 1, {}",
            reset_cycles + LATENCY
        )
        .unwrap();
    }

    let outputs = kind
        .output_ports()
        .iter()
        .map(|p| p.name())
        .collect::<Vec<_>>()
        .join(" ");

    for event in 0..events {
        let t = reset_cycles + event;
        writeln!(buf).unwrap();
        writeln!(buf, "    section event {}", event).unwrap();
        writeln!(buf, "    drive nw ne s :ev{}_drive, {}, {}", event, t, t + 1).unwrap();
        writeln!(buf, "    capture a b c :ev{}_capture, {}, {}", event, t + 1, t + 2).unwrap();
        writeln!(
            buf,
            "    output valid {} :ev{}_valid, {}, {}",
            outputs,
            event,
            t + LATENCY,
            t + LATENCY + 1
        )
        .unwrap();
    }

    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Parse a task line like "    drive nw ne s :ev0_drive, 1, 2" into (label, id, start, end).
    fn parse_task_line(line: &str) -> Option<(String, String, u64, u64)> {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed == "gantt"
            || trimmed.starts_with("title ")
            || trimmed.starts_with("dateFormat ")
            || trimmed.starts_with("axisFormat ")
            || trimmed.starts_with("section ")
        {
            return None;
        }
        let colon_pos = trimmed.find(':')?;
        let label = trimmed[..colon_pos].trim().to_string();
        let parts: Vec<&str> = trimmed[colon_pos + 1..].split(',').map(|s| s.trim()).collect();
        if parts.len() != 3 {
            return None;
        }
        Some((
            label,
            parts[0].to_string(),
            parts[1].parse().ok()?,
            parts[2].parse().ok()?,
        ))
    }

    #[test]
    fn header_lines() {
        let chart = emit_timing_chart(CellKind::Edge, 1, 2);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines[0], "gantt");
        assert!(lines.iter().any(|l| l.trim() == "dateFormat x"));
        assert!(lines.iter().any(|l| l.trim() == "axisFormat %Q"));
    }

    #[test]
    fn one_section_per_event_plus_reset() {
        let chart = emit_timing_chart(CellKind::Interior, 2, 3);
        let sections: Vec<&str> = chart
            .lines()
            .filter(|l| l.trim().starts_with("section "))
            .map(|l| l.trim())
            .collect();
        assert_eq!(
            sections,
            vec!["section reset", "section event 0", "section event 1", "section event 2"]
        );
    }

    #[test]
    fn outputs_valid_latency_after_drive() {
        let chart = emit_timing_chart(CellKind::Edge, 1, 4);
        let tasks: Vec<_> = chart.lines().filter_map(parse_task_line).collect();
        for event in 0..4u64 {
            let drive = tasks
                .iter()
                .find(|t| t.1 == format!("ev{event}_drive"))
                .unwrap();
            let valid = tasks
                .iter()
                .find(|t| t.1 == format!("ev{event}_valid"))
                .unwrap();
            assert_eq!(drive.2, 1 + event);
            assert_eq!(valid.2, drive.2 + LATENCY);
            assert_eq!(valid.3 - valid.2, 1);
        }
    }

    #[test]
    fn labels_name_the_kind_outputs() {
        let edge = emit_timing_chart(CellKind::Edge, 0, 1);
        assert!(edge.contains("output valid se sw n :ev0_valid, 2, 3"));
        let interior = emit_timing_chart(CellKind::Interior, 0, 1);
        assert!(interior.contains("output valid sw n :ev0_valid, 2, 3"));
        assert!(!interior.contains("section reset"));
    }
}
