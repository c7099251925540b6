// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! GEMC gcard steering files

use super::importer::import_geometry_file;
use super::text::geometry_file_name;
use crate::config::EngineConfig;
use crate::detector::{Detector, DEFAULT_VARIATION};
use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::path::Path;

/// One `<detector .../>` entry of a gcard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GcardDetector {
    /// Detector name, possibly with a path relative to the gcard
    pub name: String,
    pub factory: String,
    pub variation: String,
}

impl GcardDetector {
    pub fn is_text(&self) -> bool {
        self.factory.eq_ignore_ascii_case("TEXT")
    }
}

fn detector_entry(element: &BytesStart) -> Result<GcardDetector> {
    let mut entry = GcardDetector {
        name: String::new(),
        factory: String::new(),
        variation: DEFAULT_VARIATION.to_string(),
    };
    for attr in element.attributes() {
        let attr = attr.context("Malformed attribute in gcard")?;
        let value = attr
            .unescape_value()
            .context("Malformed attribute value in gcard")?
            .into_owned();
        match attr.key.as_ref() {
            b"name" => entry.name = value,
            b"factory" => entry.factory = value,
            b"variation" => entry.variation = value,
            _ => {}
        }
    }
    Ok(entry)
}

/// List the detectors named in a gcard
pub fn parse_gcard(source: &str) -> Result<Vec<GcardDetector>> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(true);

    let mut detectors = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"detector" => {
                let entry = detector_entry(&e)?;
                if entry.name.is_empty() {
                    log::warn!("gcard detector entry without a name skipped");
                } else {
                    detectors.push(entry);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Malformed gcard at position {}", reader.buffer_position())
                })
            }
        }
    }
    Ok(detectors)
}

/// Load every TEXT factory detector of a gcard. Table files are looked up
/// relative to the gcard's directory.
pub fn load_gcard(path: impl AsRef<Path>, config: &EngineConfig) -> Result<Vec<Detector>> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read gcard: {:?}", path))?;
    let entries =
        parse_gcard(&source).with_context(|| format!("Failed to parse gcard: {:?}", path))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut detectors = Vec::new();
    for entry in entries {
        if !entry.is_text() {
            log::warn!(
                "Detector {} uses the {} factory, only TEXT is supported; skipped",
                entry.name,
                entry.factory
            );
            continue;
        }
        let file = dir.join(geometry_file_name(&entry.name, &entry.variation));
        log::info!("Loading {} ({}) from {:?}", entry.name, entry.variation, file);
        detectors.push(import_geometry_file(&file, config)?);
    }
    Ok(detectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GCARD: &str = r#"<gcard>
    <!-- target and beamline -->
    <detector name="target" factory="TEXT" variation="lh2"/>
    <detector name="experiments/clas12/ftof/ftof" factory="CAD"/>
    <detector name="hodo" factory="TEXT">
        <existence name="hodo_light" exist="no"/>
    </detector>
    <option name="BEAM_P" value="e-, 11*GeV, 0*deg, 0*deg"/>
</gcard>"#;

    #[test]
    fn test_parse_gcard() {
        let entries = parse_gcard(GCARD).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].variation, "lh2");
        assert!(!entries[1].is_text());
        assert_eq!(entries[2].variation, "original");
        assert!(entries[2].is_text());
    }

    #[test]
    fn test_malformed_gcard() {
        assert!(parse_gcard("<gcard><detector name=\"a\" factory=TEXT/></gcard>").is_err());
    }
}
