// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! SQLite store for GEMC geometry tables.
//!
//! The table layout follows the GEMC MySQL tables (`<det>__geometry`,
//! `<det>__hit`, `<det>__bank`, ...) so a detector written here can be read
//! back with the same variation and id keys.

use super::text::volume_from_fields;
use crate::detector::Detector;
use crate::error::GeometryError;
use crate::geometry::{parse_components, Material, SensitiveDetector, Volume};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during database operations.
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// SQLite error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row could not be turned back into a volume
    #[error("Invalid geometry data: {0}")]
    Geometry(#[from] GeometryError),

    /// Table names are pasted into SQL and must be plain identifiers
    #[error("Invalid table name '{0}'")]
    InvalidTable(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DatabaseError>;

/// What [`GeometryDatabase::write_detector`] stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteSummary {
    pub table_id: i64,
    pub volumes: usize,
    pub hits: usize,
    pub bank_rows: usize,
    pub materials: usize,
}

fn check_table(table: &str) -> DbResult<()> {
    let valid = !table.is_empty() && table.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(DatabaseError::InvalidTable(table.to_string()))
    }
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    check_table(table)?;
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        params![table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn has_column(conn: &Connection, table: &str, column: &str) -> DbResult<bool> {
    check_table(table)?;
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{}\")", table))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

fn latest_id(conn: &Connection, table: &str, variation: &str) -> DbResult<Option<i64>> {
    if !table_exists(conn, table)? {
        log::debug!("Table not found: {}", table);
        return Ok(None);
    }
    let max: Option<i64> = conn.query_row(
        &format!("SELECT MAX(id) FROM \"{}\" WHERE variation = ?1", table),
        params![variation],
        |row| row.get(0),
    )?;
    Ok(Some(max.unwrap_or(0)))
}

fn clean_table(conn: &Connection, table: &str, variation: &str, id: i64) -> DbResult<usize> {
    if !table_exists(conn, table)? {
        return Ok(0);
    }
    let removed = if !has_column(conn, table, "variation")? {
        conn.execute(&format!("DELETE FROM \"{}\"", table), [])?
    } else if table.ends_with("__hit") || table.ends_with("__bank") {
        conn.execute(
            &format!("DELETE FROM \"{}\" WHERE variation = ?1", table),
            params![variation],
        )?
    } else {
        conn.execute(
            &format!("DELETE FROM \"{}\" WHERE variation = ?1 AND id = ?2", table),
            params![variation, id],
        )?
    };
    log::debug!("Removed {} rows from {}", removed, table);
    Ok(removed)
}

fn timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// SQLite backed store of detector tables
pub struct GeometryDatabase {
    conn: Connection,
}

impl GeometryDatabase {
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn table_exists(&self, table: &str) -> DbResult<bool> {
        table_exists(&self.conn, table)
    }

    /// Highest id stored for `variation`, `None` when the table is missing
    pub fn latest_id(&self, table: &str, variation: &str) -> DbResult<Option<i64>> {
        latest_id(&self.conn, table, variation)
    }

    /// Delete the rows of one variation. Hit and bank tables are keyed on the
    /// variation only; other tables on variation and id.
    pub fn clean_table(&self, table: &str, variation: &str, id: i64) -> DbResult<usize> {
        clean_table(&self.conn, table, variation, id)
    }

    /// Create the tables of a detector. An existing geometry table is kept.
    pub fn create_tables(&self, detector: &Detector) -> DbResult<()> {
        create_tables(&self.conn, detector)
    }

    pub fn write_detector(&mut self, detector: &Detector) -> DbResult<WriteSummary> {
        self.write_detector_with(detector, |_| {})
    }

    /// Store a detector, calling `progress` after each volume.
    ///
    /// A table id of 0 or less is replaced by the latest id of the variation
    /// plus one. Old rows of the same variation and id are removed first and
    /// everything runs in one transaction.
    pub fn write_detector_with(
        &mut self,
        detector: &Detector,
        mut progress: impl FnMut(&Volume),
    ) -> DbResult<WriteSummary> {
        let tx = self.conn.transaction()?;
        create_tables(&tx, detector)?;

        let geometry = detector.geometry_table();
        let gemc2 = detector.gemc_version >= 2;
        let variation = detector.variation.as_str();
        let mut summary = WriteSummary {
            table_id: detector.table_id,
            ..WriteSummary::default()
        };
        if gemc2 && summary.table_id <= 0 {
            summary.table_id = latest_id(&tx, &geometry, variation)?.unwrap_or(0) + 1;
        }
        let id = summary.table_id;
        let now = timestamp();

        clean_table(&tx, &geometry, variation, id)?;
        log::info!(
            "Writing geometry table {} with variation={} and id={}",
            geometry,
            variation,
            id
        );
        for v in detector.iter() {
            let position = v.position.to_string();
            let rotation = v.rotation_text();
            let shape = v.shape.to_string();
            let dimensions = v.dimensions.to_string();
            let base = params![
                v.name, v.mother, v.description, position, rotation, v.color, shape, dimensions,
                v.material, v.magfield, v.ncopy, v.pmany, v.exist, v.visible, v.style,
                v.sensitivity, v.hit_type, v.identity, now
            ];
            if gemc2 {
                let mut all = base.to_vec();
                all.push(&variation);
                all.push(&id);
                tx.execute(
                    &format!(
                        "INSERT INTO \"{}\" VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,\
                         ?16,?17,?18,0,100000,?19,?20,?21)",
                        geometry
                    ),
                    all.as_slice(),
                )?;
            } else {
                tx.execute(
                    &format!(
                        "INSERT INTO \"{}\" VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,\
                         ?16,?17,?18,0,100000,?19)",
                        geometry
                    ),
                    base,
                )?;
            }
            summary.volumes += 1;
            progress(v);
        }

        if gemc2 {
            let hit = detector.hit_table();
            let bank = detector.bank_table();
            clean_table(&tx, &hit, variation, id)?;
            clean_table(&tx, &bank, variation, id)?;
            for sd in detector.sensitivities() {
                tx.execute(
                    &format!(
                        "INSERT INTO \"{}\" VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
                        hit
                    ),
                    params![
                        sd.name,
                        sd.description,
                        sd.identifiers,
                        sd.signal_threshold,
                        sd.time_window,
                        sd.prod_threshold,
                        sd.max_step,
                        sd.rise_time,
                        sd.fall_time,
                        sd.mv_to_mev.trim().parse::<f64>().unwrap_or(0.0),
                        sd.pedestal.trim().parse::<f64>().unwrap_or(0.0),
                        sd.delay,
                        now,
                        variation
                    ],
                )?;
                summary.hits += 1;
                for row in sd.bank_rows() {
                    tx.execute(
                        &format!("INSERT INTO \"{}\" VALUES (?1,?2,?3,?4,?5,?6,?7)", bank),
                        params![sd.name, row.name, row.comment, row.id, row.kind.to_string(), now, variation],
                    )?;
                    summary.bank_rows += 1;
                }
            }

            let materials = detector.materials_table();
            clean_table(&tx, &materials, variation, id)?;
            for m in detector.materials() {
                tx.execute(
                    &format!(
                        "INSERT INTO \"{}\" VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)",
                        materials
                    ),
                    params![
                        m.name,
                        m.description,
                        m.density,
                        m.components.len() as i64,
                        m.component_text(),
                        m.photon_energy,
                        m.index_of_refraction,
                        m.absorption_length,
                        m.reflectivity,
                        m.efficiency,
                        now,
                        variation,
                        id
                    ],
                )?;
                summary.materials += 1;
            }
        }

        tx.commit()?;
        Ok(summary)
    }

    /// Read geometry rows into `detector`. GEMC 1 tables (no `variation`
    /// column) ignore `variation` and `id`.
    pub fn read_geometry(
        &self,
        table: &str,
        variation: &str,
        id: i64,
        detector: &mut Detector,
    ) -> DbResult<usize> {
        if !self.table_exists(table)? {
            return Err(DatabaseError::TableNotFound(table.to_string()));
        }
        let gemc2 = has_column(&self.conn, table, "variation")?;
        if !gemc2 {
            log::info!("Note: GEMC version 1 table found. Variation and id ignored");
        }

        let mut sql = format!(
            "SELECT name, mother, description, pos, rot, col, type, dimensions, material, magfield, \
             ncopy, pMany, exist, visible, style, sensitivity, hitType, identity FROM \"{}\"",
            table
        );
        if gemc2 {
            sql.push_str(" WHERE variation = ?1 AND id = ?2");
        }
        sql.push_str(" ORDER BY rowid");

        let mut stmt = self.conn.prepare(&sql)?;
        let to_fields = |row: &rusqlite::Row| -> rusqlite::Result<Vec<String>> {
            let mut fields = Vec::with_capacity(18);
            for i in 0..18 {
                let value = match row.get_ref(i)? {
                    rusqlite::types::ValueRef::Null => String::new(),
                    rusqlite::types::ValueRef::Integer(v) => v.to_string(),
                    rusqlite::types::ValueRef::Real(v) => v.to_string(),
                    rusqlite::types::ValueRef::Text(t) | rusqlite::types::ValueRef::Blob(t) => {
                        String::from_utf8_lossy(t).into_owned()
                    }
                };
                fields.push(value);
            }
            Ok(fields)
        };
        let rows: Vec<Vec<String>> = if gemc2 {
            stmt.query_map(params![variation, id], to_fields)?
                .collect::<Result<_, _>>()?
        } else {
            stmt.query_map([], to_fields)?.collect::<Result<_, _>>()?
        };

        let policy = detector.units.clone();
        for (i, row) in rows.iter().enumerate() {
            let fields: Vec<&str> = row.iter().map(|f| f.trim()).collect();
            let volume = volume_from_fields(&fields, i + 1, &policy)?;
            if let Err(e) = volume.validate() {
                log::warn!("Validation problem in {} row {}: {}", table, i + 1, e);
            }
            detector.add(volume)?;
        }
        Ok(rows.len())
    }

    /// Read a detector's geometry, hits, banks and materials
    pub fn read_detector(&self, name: &str, variation: &str, id: i64) -> DbResult<Detector> {
        let mut detector = Detector::new(name)
            .with_variation(variation)
            .with_table_id(id);
        let geometry = detector.geometry_table();
        if !has_column(&self.conn, &geometry, "variation").unwrap_or(false) {
            detector.gemc_version = 1;
        }
        self.read_geometry(&geometry, variation, id, &mut detector)?;

        if self.table_exists(&detector.hit_table())? {
            for sd in self.read_sensitivities(&detector, variation)? {
                detector.add_sensitivity(sd);
            }
        }
        if self.table_exists(&detector.materials_table())? {
            for m in self.read_materials(&detector.materials_table(), variation, id)? {
                detector.add_material(m);
            }
        }
        Ok(detector)
    }

    fn read_sensitivities(&self, detector: &Detector, variation: &str) -> DbResult<Vec<SensitiveDetector>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name, description, identifiers, signalThreshold, timeWindow, prodThreshold, \
             maxStep, riseTime, fallTime, mvToMeV, pedestal, delay FROM \"{}\" WHERE variation = ?1 \
             ORDER BY rowid",
            detector.hit_table()
        ))?;
        let hits = stmt
            .query_map(params![variation], |row| {
                let mut sd = SensitiveDetector::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    0,
                );
                sd.signal_threshold = row.get(3)?;
                sd.time_window = row.get(4)?;
                sd.prod_threshold = row.get(5)?;
                sd.max_step = row.get(6)?;
                sd.rise_time = row.get(7)?;
                sd.fall_time = row.get(8)?;
                sd.mv_to_mev = row.get::<_, f64>(9)?.to_string();
                sd.pedestal = row.get::<_, f64>(10)?.to_string();
                sd.delay = row.get(11)?;
                Ok(sd)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let bank = detector.bank_table();
        if !self.table_exists(&bank)? {
            return Ok(hits);
        }
        let mut out = Vec::with_capacity(hits.len());
        for hit in hits {
            let bank_id: Option<i64> = self
                .conn
                .query_row(
                    &format!(
                        "SELECT num FROM \"{}\" WHERE bankname = ?1 AND name = 'bankid' AND variation = ?2",
                        bank
                    ),
                    params![hit.name, variation],
                    |row| row.get(0),
                )
                .optional()?;
            let mut sd = SensitiveDetector::new(
                hit.name.clone(),
                hit.description.clone(),
                hit.identifiers.clone(),
                bank_id.unwrap_or(0),
            );
            sd.signal_threshold = hit.signal_threshold;
            sd.time_window = hit.time_window;
            sd.prod_threshold = hit.prod_threshold;
            sd.max_step = hit.max_step;
            sd.rise_time = hit.rise_time;
            sd.fall_time = hit.fall_time;
            sd.mv_to_mev = hit.mv_to_mev;
            sd.pedestal = hit.pedestal;
            sd.delay = hit.delay;

            let mut stmt = self.conn.prepare(&format!(
                "SELECT name, description, num, type FROM \"{}\" \
                 WHERE bankname = ?1 AND variation = ?2 AND name != 'bankid' ORDER BY rowid",
                bank
            ))?;
            let rows = stmt
                .query_map(params![sd.name, variation], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;
            for (name, comment, num, kind) in rows {
                sd.add_bank_row(name, comment, num, &kind)?;
            }
            out.push(sd);
        }
        Ok(out)
    }

    fn read_materials(&self, table: &str, variation: &str, id: i64) -> DbResult<Vec<Material>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name, description, density, components, photonEnergy, indexOfRefraction, \
             absorptionLength, reflectivity, efficiency FROM \"{}\" WHERE variation = ?1 AND id = ?2 \
             ORDER BY rowid",
            table
        ))?;
        let rows = stmt
            .query_map(params![variation, id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, String>(3)?,
                    [
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                        row.get::<_, String>(8)?,
                    ],
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut materials = Vec::with_capacity(rows.len());
        for (name, description, density, components, optical) in rows {
            let mut m = Material::new(name, description, density, parse_components(&components)?);
            let [photon, index, absorption, reflectivity, efficiency] = optical;
            m.photon_energy = photon;
            m.index_of_refraction = index;
            m.absorption_length = absorption;
            m.reflectivity = reflectivity;
            m.efficiency = efficiency;
            materials.push(m);
        }
        Ok(materials)
    }
}

fn create_tables(conn: &Connection, detector: &Detector) -> DbResult<()> {
    let geometry = detector.geometry_table();
    check_table(&geometry)?;
    if table_exists(conn, &geometry)? {
        log::debug!("Geometry table {} already exists, no need to create", geometry);
    } else {
        let keys = if detector.gemc_version >= 2 {
            ", variation TEXT DEFAULT 'original', id INTEGER DEFAULT 0, UNIQUE (variation, id, name)"
        } else {
            ", UNIQUE (name)"
        };
        conn.execute_batch(&format!(
            "CREATE TABLE \"{}\" (name TEXT, mother TEXT, description TEXT, pos TEXT, rot TEXT, \
             col TEXT, type TEXT, dimensions TEXT, material TEXT, magfield TEXT, ncopy INTEGER, \
             pMany INTEGER, exist INTEGER, visible INTEGER, style INTEGER, sensitivity TEXT, \
             hitType TEXT, identity TEXT, rmin INTEGER, rmax INTEGER, time TEXT{});",
            geometry, keys
        ))?;
        log::info!("Created geometry table {}", geometry);
    }
    if detector.gemc_version < 2 {
        return Ok(());
    }

    let parameters = detector.parameters_table();
    let hit = detector.hit_table();
    let bank = detector.bank_table();
    let materials = detector.materials_table();
    for table in [&parameters, &hit, &bank, &materials] {
        check_table(table)?;
    }
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS \"{parameters}\" (name TEXT, value REAL, units TEXT, \
         description TEXT, author TEXT, author_email TEXT, pdf_drawing_link TEXT, \
         drawing_varname TEXT, drawing_authors TEXT, drawing_date TEXT, upload_date TEXT, \
         variation TEXT, rmin INTEGER, rmax INTEGER, id INTEGER, PRIMARY KEY (variation, id, name));
         CREATE TABLE IF NOT EXISTS \"{hit}\" (name TEXT, description TEXT, identifiers TEXT, \
         signalThreshold TEXT, timeWindow TEXT, prodThreshold TEXT, maxStep TEXT, riseTime TEXT, \
         fallTime TEXT, mvToMeV REAL, pedestal REAL, delay TEXT, time TEXT, variation TEXT, \
         PRIMARY KEY (variation, name));
         CREATE TABLE IF NOT EXISTS \"{bank}\" (bankname TEXT, name TEXT, description TEXT, \
         num INTEGER, type TEXT, time TEXT, variation TEXT, PRIMARY KEY (bankname, name, variation));
         CREATE TABLE IF NOT EXISTS \"{materials}\" (name TEXT, description TEXT, density REAL, \
         ncomponents INTEGER, components TEXT, photonEnergy TEXT, indexOfRefraction TEXT, \
         absorptionLength TEXT, reflectivity TEXT, efficiency TEXT, time TEXT, variation TEXT, \
         id INTEGER, PRIMARY KEY (variation, id, name));"
    ))?;
    Ok(())
}
