// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! CLI output reporter with colored formatting

use crate::detector::Detector;
use crate::error::GeometryError;
use crate::io::{Overlap, WriteSummary};
use crate::render::SceneGraph;
use colored::*;
use std::path::PathBuf;
use std::time::Duration;

/// CLI reporter for formatted output
pub struct Reporter;

fn rule() -> ColoredString {
    "━".repeat(80).bright_black()
}

impl Reporter {
    /// Summary of a loaded detector
    pub fn report_detector(detector: &Detector, duration: Duration) {
        println!("\n{}", rule());
        println!(
            "{} {} {}",
            "Detector:".bold(),
            detector.name().cyan(),
            format!("({})", detector.variation).bright_black()
        );
        println!("{}", rule());
        Self::print_count("Volumes", detector.len());
        Self::print_count("Sensitive detectors", detector.sensitivities().len());
        Self::print_count("Materials", detector.materials().len());
        let top = detector.iter().filter(|v| v.is_root_child()).count();
        Self::print_count("Placed in root", top);
        println!(
            "  {} {}",
            "Loaded in:".bright_black(),
            Self::format_duration(duration).yellow()
        );
        println!("{}", rule());
    }

    /// Outcome of `check`: hierarchy problems plus record validation
    pub fn report_check(detector: &Detector, problems: &[GeometryError]) -> bool {
        println!("\n{}", rule());
        println!("{} {}", "Checked:".bold(), detector.name().cyan());
        println!("{}", rule());
        if problems.is_empty() {
            println!(
                "{} {}",
                "✅".green(),
                format!("{} volumes, no problems found", detector.len()).green().bold()
            );
        } else {
            println!(
                "{} {}",
                "❌".red(),
                format!("{} problems found", problems.len()).red().bold()
            );
            for problem in problems {
                println!("  {} {}", "•".red(), problem);
            }
        }
        println!("{}", rule());
        problems.is_empty()
    }

    pub fn report_files(title: &str, files: &[PathBuf]) {
        println!("{} {}", "✅".green(), title.green());
        for file in files {
            println!("  {} {}", "→".bright_black(), file.display().to_string().cyan());
        }
    }

    pub fn report_database(detector: &Detector, summary: &WriteSummary, duration: Duration) {
        println!("\n{}", rule());
        println!(
            "{} {} {}",
            "Database:".bold(),
            detector.geometry_table().cyan(),
            format!("(variation {}, id {})", detector.variation, summary.table_id).bright_black()
        );
        println!("{}", rule());
        Self::print_count("Volumes", summary.volumes);
        Self::print_count("Hits", summary.hits);
        Self::print_count("Bank rows", summary.bank_rows);
        Self::print_count("Materials", summary.materials);
        println!(
            "  {} {}",
            "Time:".bright_black(),
            Self::format_duration(duration).yellow()
        );
        println!("{}", rule());
    }

    pub fn report_scene(scene: &SceneGraph, duration: Duration) {
        println!("\n{}", rule());
        println!("{} {}", "Scene:".bold(), scene.name.cyan());
        println!("{}", rule());
        Self::print_count("Media", scene.media.len());
        Self::print_count("Shapes", scene.shapes.len());
        Self::print_count("Volumes", scene.volumes.len());
        Self::print_count("Placements", scene.node_count());
        println!(
            "  {} {}",
            "Built in:".bright_black(),
            Self::format_duration(duration).yellow()
        );
        println!("{}", rule());
    }

    pub fn report_overlaps(overlaps: &[Overlap]) {
        println!("\n{}", rule());
        println!("{} {}", "Overlaps found:".bold(), overlaps.len().to_string().cyan());
        println!("{}", rule());
        for (i, overlap) in overlaps.iter().enumerate() {
            let [x, y, z] = overlap.position;
            println!(
                "  {:>4} {} {} {}",
                (i + 1).to_string().bright_black(),
                overlap.volume.as_deref().unwrap_or("?").yellow(),
                overlap
                    .neighbour
                    .as_deref()
                    .map(|n| format!("with {}", n))
                    .unwrap_or_default(),
                format!("at ({:.3}, {:.3}, {:.3}) mm", x, y, z).bright_black()
            );
        }
        println!("{}", rule());
    }

    /// Report error
    pub fn report_error(message: &str) {
        eprintln!("\n{} {}", "❌ Error:".red().bold(), message);
    }

    /// Report warning
    pub fn report_warning(message: &str) {
        println!("\n{} {}", "⚠️  Warning:".yellow().bold(), message);
    }

    /// Report info
    pub fn report_info(message: &str) {
        println!("{} {}", "ℹ️".bright_blue(), message);
    }

    pub fn success(message: &str) {
        println!("{} {}", "✅".green(), message.green());
    }

    fn print_count(name: &str, count: usize) {
        println!(
            "  {} {}",
            format!("{}:", name).bright_black(),
            count.to_string().cyan()
        );
    }

    /// Format duration for display
    pub fn format_duration(duration: Duration) -> String {
        let micros = duration.as_micros();

        if micros < 1_000 {
            format!("{}µs", micros)
        } else if micros < 1_000_000 {
            format!("{:.2}ms", micros as f64 / 1_000.0)
        } else {
            format!("{:.2}s", micros as f64 / 1_000_000.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(
            Reporter::format_duration(Duration::from_micros(500)),
            "500µs"
        );
        assert_eq!(
            Reporter::format_duration(Duration::from_millis(5)),
            "5.00ms"
        );
        assert_eq!(Reporter::format_duration(Duration::from_secs(2)), "2.00s");
    }

    #[test]
    fn test_check_result() {
        let mut det = Detector::new("check");
        det.quick_add_cube([0.0; 3], 1.0).unwrap();
        assert!(Reporter::report_check(&det, &[]));
        let problems = vec![GeometryError::VolumeNotFound("x".into())];
        assert!(!Reporter::report_check(&det, &problems));
    }
}
