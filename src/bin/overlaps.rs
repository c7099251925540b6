// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! detgeom-overlaps: mark the overlaps reported in a GEMC log

use anyhow::{Context, Result};
use clap::Parser;
use detgeom::cli::{init_logging, load_inputs, Reporter};
use detgeom::io::{make_overlap_detector, parse_overlap_log_file, text};
use detgeom::{render_detector, EngineConfig};
use std::path::PathBuf;

/// Color given to context geometry so the markers stand out
const CONTEXT_COLOR: &str = "cccccc9";

#[derive(Parser)]
#[command(name = "detgeom-overlaps")]
#[command(
    about = "Parse a GEMC log for overlapping volumes and build a geometry table with a marker at each overlap"
)]
struct Cli {
    /// GEMC log file to parse
    input: PathBuf,

    /// Half size of the overlap marker in mm
    #[arg(short = 'S', long, default_value = "10")]
    size: f64,

    /// Marker color
    #[arg(short, long, default_value = "ff0000")]
    color: String,

    /// Write the overlaps as JSON
    #[arg(short, long)]
    json: Option<PathBuf>,

    /// Write the marker geometry table with this file name
    #[arg(short, long)]
    outfile: Option<PathBuf>,

    /// Geometry tables or gcards shown in light grey around the markers
    #[arg(short, long, num_args = 1..)]
    geometry: Vec<PathBuf>,

    /// Directory prepended to every -g entry
    #[arg(short = 'G', long)]
    geo_dir: Option<PathBuf>,

    /// Write the scene graph of markers plus context as JSON
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Verbose output, repeat for more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = EngineConfig::load()?;

    Reporter::report_info(&format!("Parsing {}", cli.input.display()));
    let overlaps = parse_overlap_log_file(&cli.input)?;
    Reporter::report_overlaps(&overlaps);

    if let Some(path) = &cli.json {
        let json = serde_json::to_string_pretty(&overlaps)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write overlaps: {:?}", path))?;
        Reporter::success(&format!("Overlaps written to {}", path.display()));
    }

    let mut detector = make_overlap_detector(&overlaps, &cli.color, cli.size)?;

    if let Some(path) = &cli.outfile {
        let dir = path.parent().map(PathBuf::from).unwrap_or_default();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Output file needs a file name")?;
        let written = text::write_geometry(&detector, &dir, Some(name))?;
        Reporter::success(&format!("Marker geometry written to {}", written.display()));
    }

    if !cli.geometry.is_empty() {
        let inputs: Vec<PathBuf> = cli
            .geometry
            .iter()
            .map(|g| match &cli.geo_dir {
                Some(dir) => dir.join(g),
                None => g.clone(),
            })
            .collect();
        for context in load_inputs(&inputs, &config)? {
            let before = detector.len();
            for volume in context.iter() {
                let volume = volume.clone().with_color(CONTEXT_COLOR);
                if let Err(e) = detector.add(volume) {
                    log::warn!("{}", e);
                }
            }
            for material in context.materials() {
                detector.add_material(material.clone());
            }
            log::info!(
                "Added {} with {} volumes",
                context.name(),
                detector.len() - before
            );
        }
    }

    if let Some(path) = &cli.scene {
        let scene = render_detector(&detector, &config)?;
        scene.save_json(path)?;
        Reporter::success(&format!("Scene written to {}", path.display()));
    }

    Ok(())
}
