// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! detgeom CLI

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use detgeom::cli::{init_logging, load_inputs, Reporter};
use detgeom::io::{sql, GeometryDatabase};
use detgeom::{render_detector, Detector, EngineConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "detgeom")]
#[command(about = "GEMC detector geometry tables: inspect, convert, store and build", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./detgeom.toml when present)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose output, repeat for more
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the scene of one or more detectors and print its tree
    Show {
        /// Geometry tables, gcards or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Volume to start building from
        #[arg(short, long, default_value = "root")]
        mother: String,

        /// Write the scene graph as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rewrite detectors as GEMC text tables
    Convert {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        out: PathBuf,

        /// Variation written into the file names
        #[arg(long)]
        variation: Option<String>,
    },

    /// Print the MySQL script that creates and fills a detector's tables
    Sql {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output SQL file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Store detectors in the SQLite geometry database
    DbWrite {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Database file
        #[arg(short, long)]
        database: Option<PathBuf>,

        /// Table id; 0 picks the next free id
        #[arg(long)]
        id: Option<i64>,
    },

    /// Read a detector back from the SQLite geometry database
    DbRead {
        /// Detector name
        name: String,

        #[arg(short, long)]
        database: Option<PathBuf>,

        #[arg(long)]
        variation: Option<String>,

        #[arg(long)]
        id: Option<i64>,

        /// Directory to write the text tables to
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Validate volumes and the mother hierarchy
    Check {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Dump parsed detectors as JSON
    Parse {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match &cli.config {
        Some(path) => {
            let mut config = EngineConfig::from_file(path)?;
            config.apply_overrides(|key| std::env::var(key).ok());
            config
        }
        None => EngineConfig::load()?,
    };

    match cli.command {
        Commands::Show { inputs, mother, output } => {
            show_command(&inputs, &mother, output.as_deref(), &config)?
        }
        Commands::Convert { inputs, out, variation } => {
            convert_command(&inputs, &out, variation, &config)?
        }
        Commands::Sql { inputs, output } => sql_command(&inputs, output.as_deref(), &config)?,
        Commands::DbWrite { inputs, database, id } => {
            db_write_command(&inputs, database, id, cli.verbose > 0, &config)?
        }
        Commands::DbRead { name, database, variation, id, out } => {
            db_read_command(&name, database, variation, id, out.as_deref(), &config)?
        }
        Commands::Check { inputs } => {
            if !check_command(&inputs, &config)? {
                std::process::exit(1);
            }
        }
        Commands::Parse { inputs, output } => parse_command(&inputs, output.as_deref(), &config)?,
        Commands::Version => {
            println!("detgeom v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

fn load(inputs: &[PathBuf], config: &EngineConfig) -> Result<Vec<Detector>> {
    let start = Instant::now();
    let detectors = load_inputs(inputs, config)?;
    if detectors.is_empty() {
        Reporter::report_error("No detectors found in the given inputs");
        std::process::exit(1);
    }
    let elapsed = start.elapsed();
    for detector in &detectors {
        log::info!("Loaded {} with {} volumes", detector.name(), detector.len());
        if log::log_enabled!(log::Level::Info) {
            Reporter::report_detector(detector, elapsed);
        }
    }
    Ok(detectors)
}

fn show_command(
    inputs: &[PathBuf],
    mother: &str,
    output: Option<&Path>,
    config: &EngineConfig,
) -> Result<()> {
    use detgeom::{GeometryRenderer, SceneBackend};

    let detectors = load(inputs, config)?;
    let start = Instant::now();
    let name = detectors
        .iter()
        .map(|d| d.name())
        .collect::<Vec<_>>()
        .join("+");
    let mut renderer = GeometryRenderer::with_config(SceneBackend::new(name), config);
    for detector in &detectors {
        renderer
            .build_volumes(detector, mother)
            .with_context(|| format!("Failed to build {}", detector.name()))?;
    }
    let scene = renderer.finish()?.into_graph();
    Reporter::report_scene(&scene, start.elapsed());
    println!("{}", scene);

    if let Some(path) = output {
        scene.save_json(path)?;
        Reporter::success(&format!("Scene written to {}", path.display()));
    }
    Ok(())
}

fn convert_command(
    inputs: &[PathBuf],
    out: &Path,
    variation: Option<String>,
    config: &EngineConfig,
) -> Result<()> {
    std::fs::create_dir_all(out)
        .with_context(|| format!("Failed to create output directory: {:?}", out))?;
    for mut detector in load(inputs, config)? {
        if let Some(variation) = &variation {
            detector.variation = variation.clone();
        }
        let files = detgeom::write_all(&detector, out, config.extended_materials)?;
        Reporter::report_files(&format!("Wrote {}", detector.name()), &files);
    }
    Ok(())
}

fn sql_command(inputs: &[PathBuf], output: Option<&Path>, config: &EngineConfig) -> Result<()> {
    let script: String = load(inputs, config)?
        .iter()
        .map(sql::detector_script)
        .collect::<Vec<_>>()
        .join("\n");
    match output {
        Some(path) => {
            std::fs::write(path, script)
                .with_context(|| format!("Failed to write SQL script: {:?}", path))?;
            Reporter::success(&format!("SQL written to {}", path.display()));
        }
        None => println!("{}", script),
    }
    Ok(())
}

fn db_write_command(
    inputs: &[PathBuf],
    database: Option<PathBuf>,
    id: Option<i64>,
    verbose: bool,
    config: &EngineConfig,
) -> Result<()> {
    let path = database.unwrap_or_else(|| config.database.clone());
    let mut db = GeometryDatabase::open(&path)
        .with_context(|| format!("Failed to open database: {:?}", path))?;

    for mut detector in load(inputs, config)? {
        if let Some(id) = id {
            detector.table_id = id;
        }
        let start = Instant::now();
        let progress = if verbose {
            let pb = ProgressBar::new(detector.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                    .context("Invalid progress template")?
                    .progress_chars("#>-"),
            );
            Some(pb)
        } else {
            None
        };

        let summary = db.write_detector_with(&detector, |volume| {
            if let Some(pb) = &progress {
                pb.set_message(volume.name.clone());
                pb.inc(1);
            }
        })?;
        if let Some(pb) = progress {
            pb.finish_with_message("done");
        }
        Reporter::report_database(&detector, &summary, start.elapsed());
    }
    Ok(())
}

fn db_read_command(
    name: &str,
    database: Option<PathBuf>,
    variation: Option<String>,
    id: Option<i64>,
    out: Option<&Path>,
    config: &EngineConfig,
) -> Result<()> {
    let path = database.unwrap_or_else(|| config.database.clone());
    if !path.exists() {
        Reporter::report_error(&format!("Database not found: {}", path.display()));
        std::process::exit(1);
    }
    let db = GeometryDatabase::open(&path)?;
    let variation = variation.unwrap_or_else(|| config.variation.clone());
    let id = match id {
        Some(id) => id,
        None => db
            .latest_id(&format!("{}__geometry", name), &variation)?
            .unwrap_or(config.table_id),
    };

    let start = Instant::now();
    let detector = db.read_detector(name, &variation, id)?;
    Reporter::report_detector(&detector, start.elapsed());

    match out {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let files = detgeom::write_all(&detector, dir, config.extended_materials)?;
            Reporter::report_files(&format!("Wrote {}", detector.name()), &files);
        }
        None => print!("{}", detgeom::io::text::format_geometry(&detector)),
    }
    Ok(())
}

fn check_command(inputs: &[PathBuf], config: &EngineConfig) -> Result<bool> {
    let mut all_good = true;
    for detector in load(inputs, config)? {
        let mut problems: Vec<_> = detector
            .iter()
            .filter_map(|volume| volume.validate().err())
            .collect();
        problems.extend(detector.check_hierarchy());
        if let Err(e) = render_detector(&detector, config) {
            problems.push(e);
        }
        all_good &= Reporter::report_check(&detector, &problems);
    }
    Ok(all_good)
}

fn parse_command(inputs: &[PathBuf], output: Option<&Path>, config: &EngineConfig) -> Result<()> {
    let detectors = load(inputs, config)?;
    let json = serde_json::to_string_pretty(&detectors)?;

    if let Some(path) = output {
        std::fs::write(path, json)?;
        Reporter::report_info(&format!("Detectors written to: {}", path.display()));
    } else {
        println!("{}", json);
    }
    Ok(())
}
