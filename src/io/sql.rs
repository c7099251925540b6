// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! MySQL statements for the GEMC database tables

use crate::detector::Detector;
use crate::geometry::{Material, SensitiveDetector, Volume};

/// Variation and id keys of a GEMC 2 table row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableKey<'a> {
    pub variation: &'a str,
    pub id: i64,
}

/// Quote a string literal for MySQL
pub fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "''"))
}

pub fn create_geometry_table(table: &str, gemc_version: u32) -> String {
    let mut sql = format!(
        "CREATE TABLE IF NOT EXISTS `{}` (\n\
         `name` varchar(40) DEFAULT NULL,\n\
         `mother` varchar(100) DEFAULT NULL,\n\
         `description` varchar(200) DEFAULT NULL,\n\
         `pos` varchar(100) DEFAULT NULL,\n\
         `rot` varchar(100) DEFAULT NULL,\n\
         `col` varchar(10) DEFAULT NULL,\n\
         `type` varchar(100) DEFAULT NULL,\n\
         `dimensions` text,\n\
         `material` varchar(60) DEFAULT NULL,\n\
         `magfield` varchar(40) DEFAULT NULL,\n\
         `ncopy` int(11) DEFAULT NULL,\n\
         `pMany` int(11) DEFAULT NULL,\n\
         `exist` int(11) DEFAULT NULL,\n\
         `visible` int(11) DEFAULT NULL,\n\
         `style` int(11) DEFAULT NULL,\n\
         `sensitivity` varchar(40) DEFAULT NULL,\n\
         `hitType` varchar(100) DEFAULT NULL,\n\
         `identity` varchar(200) DEFAULT NULL,\n\
         `rmin` int(11) DEFAULT NULL,\n\
         `rmax` int(11) DEFAULT NULL,\n\
         `time` timestamp NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP,\n",
        table
    );
    if gemc_version >= 2 {
        sql.push_str(
            "`variation` varchar(200) DEFAULT 'original',\n\
             `id` int(11) DEFAULT 0,\n\
             UNIQUE KEY (`variation`,`id`,`name`)",
        );
    } else {
        sql.push_str("UNIQUE KEY (`name`)");
    }
    sql.push_str(") ENGINE=MyISAM DEFAULT CHARSET=latin1;");
    sql
}

pub fn create_parameters_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS `{}` (\n\
         name VARCHAR(250),\n\
         value FLOAT,\n\
         units VARCHAR(50),\n\
         description VARCHAR(250),\n\
         author VARCHAR(250),\n\
         author_email VARCHAR(250),\n\
         pdf_drawing_link VARCHAR(250),\n\
         drawing_varname VARCHAR(250),\n\
         drawing_authors VARCHAR(250),\n\
         drawing_date VARCHAR(250),\n\
         upload_date TIMESTAMP,\n\
         variation VARCHAR(250),\n\
         rmin INT,\n\
         rmax INT,\n\
         id INT,\n\
         PRIMARY KEY (variation, id, name));",
        table
    )
}

pub fn create_hit_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS `{}` (\n\
         name VARCHAR(100),\n\
         description VARCHAR(200),\n\
         identifiers TEXT,\n\
         signalThreshold VARCHAR(30),\n\
         timeWindow VARCHAR(30),\n\
         prodThreshold VARCHAR(30),\n\
         maxStep VARCHAR(30),\n\
         riseTime VARCHAR(30),\n\
         fallTime VARCHAR(30),\n\
         mvToMeV FLOAT,\n\
         pedestal FLOAT,\n\
         delay VARCHAR(30),\n\
         time TIMESTAMP,\n\
         variation VARCHAR(200),\n\
         PRIMARY KEY (variation, name));",
        table
    )
}

pub fn create_bank_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS `{}` (\n\
         bankname VARCHAR(100),\n\
         name VARCHAR(100),\n\
         description VARCHAR(200),\n\
         num INT,\n\
         type VARCHAR(10),\n\
         time TIMESTAMP,\n\
         variation VARCHAR(200),\n\
         PRIMARY KEY (bankname, name, variation));",
        table
    )
}

pub fn create_materials_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS `{}` (\n\
         name VARCHAR(100),\n\
         description VARCHAR(200),\n\
         density FLOAT,\n\
         ncomponents INT,\n\
         components TEXT,\n\
         photonEnergy TEXT,\n\
         indexOfRefraction TEXT,\n\
         absorptionLength TEXT,\n\
         reflectivity TEXT,\n\
         efficiency TEXT,\n\
         time TIMESTAMP,\n\
         variation VARCHAR(200),\n\
         id INT,\n\
         PRIMARY KEY (variation, id, name));",
        table
    )
}

/// Insert one volume. `key` is `None` for GEMC 1 tables.
pub fn insert_volume(volume: &Volume, table: &str, key: Option<TableKey>) -> String {
    let mut sql = format!(
        "INSERT INTO `{}` VALUES ({},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},0,100000,now()",
        table,
        quote(&volume.name),
        quote(&volume.mother),
        quote(&volume.description),
        quote(&volume.position.to_string()),
        quote(&volume.rotation_text()),
        quote(&volume.color),
        quote(&volume.shape.to_string()),
        quote(&volume.dimensions.to_string()),
        quote(&volume.material),
        quote(&volume.magfield),
        volume.ncopy,
        volume.pmany,
        volume.exist,
        volume.visible,
        volume.style,
        quote(&volume.sensitivity),
        quote(&volume.hit_type),
        quote(&volume.identity),
    );
    if let Some(key) = key {
        sql.push_str(&format!(",{},{}", quote(key.variation), key.id));
    }
    sql.push_str(");");
    sql
}

pub fn insert_hit(sd: &SensitiveDetector, table: &str, variation: &str) -> String {
    format!(
        "INSERT INTO `{}` VALUES ({},{},{},{},{},{},{},{},{},{},{},{},now(),{});",
        table,
        quote(&sd.name),
        quote(&sd.description),
        quote(&sd.identifiers),
        quote(&sd.signal_threshold),
        quote(&sd.time_window),
        quote(&sd.prod_threshold),
        quote(&sd.max_step),
        quote(&sd.rise_time),
        quote(&sd.fall_time),
        numeric_or_zero(&sd.mv_to_mev),
        numeric_or_zero(&sd.pedestal),
        quote(&sd.delay),
        quote(variation),
    )
}

/// One multi-row insert for all bank rows, or `None` when there are none
pub fn insert_banks(sd: &SensitiveDetector, table: &str, variation: &str) -> Option<String> {
    if sd.bank_rows().is_empty() {
        return None;
    }
    let rows: Vec<String> = sd
        .bank_rows()
        .iter()
        .map(|row| {
            format!(
                "({},{},{},{},{},now(),{})",
                quote(&sd.name),
                quote(&row.name),
                quote(&row.comment),
                row.id,
                quote(&row.kind.to_string()),
                quote(variation)
            )
        })
        .collect();
    Some(format!("INSERT INTO `{}` VALUES {};", table, rows.join(",")))
}

pub fn insert_material(material: &Material, table: &str, key: TableKey) -> String {
    format!(
        "INSERT INTO `{}` VALUES ({},{},{},{},{},{},{},{},{},{},now(),{},{});",
        table,
        quote(&material.name),
        quote(&material.description),
        material.density,
        material.components.len(),
        quote(&material.component_text()),
        quote(&material.photon_energy),
        quote(&material.index_of_refraction),
        quote(&material.absorption_length),
        quote(&material.reflectivity),
        quote(&material.efficiency),
        quote(key.variation),
        key.id,
    )
}

fn numeric_or_zero(text: &str) -> String {
    match text.trim().parse::<f64>() {
        Ok(value) => value.to_string(),
        Err(_) => {
            log::warn!("'{}' is not numeric, writing 0", text);
            "0".to_string()
        }
    }
}

/// Complete SQL script that (re)creates the detector's rows for its
/// variation and table id.
pub fn detector_script(detector: &Detector) -> String {
    let mut lines = Vec::new();
    let geometry = detector.geometry_table();
    let variation = detector.variation.as_str();
    let gemc2 = detector.gemc_version >= 2;
    let key = TableKey {
        variation,
        id: detector.table_id,
    };

    lines.push(format!("-- {}", detector.description()));
    lines.push(create_geometry_table(&geometry, detector.gemc_version));
    if gemc2 {
        lines.push(format!(
            "DELETE FROM `{}` WHERE variation = {} AND id = {};",
            geometry,
            quote(variation),
            key.id
        ));
    } else {
        lines.push(format!("DELETE FROM `{}`;", geometry));
    }
    for volume in detector.iter() {
        lines.push(insert_volume(volume, &geometry, gemc2.then_some(key)));
    }

    if gemc2 {
        lines.push(create_parameters_table(&detector.parameters_table()));
        if !detector.sensitivities().is_empty() {
            let hit = detector.hit_table();
            let bank = detector.bank_table();
            lines.push(create_hit_table(&hit));
            lines.push(create_bank_table(&bank));
            for table in [&hit, &bank] {
                lines.push(format!(
                    "DELETE FROM `{}` WHERE variation = {};",
                    table,
                    quote(variation)
                ));
            }
            for sd in detector.sensitivities() {
                lines.push(insert_hit(sd, &hit, variation));
                lines.extend(insert_banks(sd, &bank, variation));
            }
        }
        if !detector.materials().is_empty() {
            let materials = detector.materials_table();
            lines.push(create_materials_table(&materials));
            lines.push(format!(
                "DELETE FROM `{}` WHERE variation = {} AND id = {};",
                materials,
                quote(variation),
                key.id
            ));
            for material in detector.materials() {
                lines.push(insert_material(material, &materials, key));
            }
        }
    }
    let mut script = lines.join("\n");
    script.push('\n');
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ShapeType, Unit};

    #[test]
    fn test_quote() {
        assert_eq!(quote("plain"), "'plain'");
        assert_eq!(quote("O'Brien"), "'O''Brien'");
        assert_eq!(quote("a\\b"), "'a\\\\b'");
    }

    #[test]
    fn test_insert_volume() {
        let v = Volume::new("box")
            .with_description("the 'best' box")
            .with_shape(ShapeType::Box)
            .with_dimensions([1.0, 2.0, 3.0], Unit::Centimeter);
        let gemc1 = insert_volume(&v, "det__geometry", None);
        assert!(gemc1.starts_with("INSERT INTO `det__geometry` VALUES ('box','root','the ''best'' box',"));
        assert!(gemc1.ends_with(",0,100000,now());"));

        let gemc2 = insert_volume(
            &v,
            "det__geometry",
            Some(TableKey {
                variation: "original",
                id: 3,
            }),
        );
        assert!(gemc2.ends_with(",0,100000,now(),'original',3);"));
        assert!(gemc2.contains("'1*cm 2*cm 3*cm'"));
    }

    #[test]
    fn test_bank_insert() {
        let mut sd = SensitiveDetector::new("hodo", "Hodoscope", "layer paddle", 700);
        sd.add_bank_row("adc", "ADC", 1, "Ri").unwrap();
        let sql = insert_banks(&sd, "hodo__bank", "original").unwrap();
        assert_eq!(sql.matches("now()").count(), 2);
        assert!(sql.contains("('hodo','adc','ADC',1,'Ri',now(),'original')"));
    }

    #[test]
    fn test_script() {
        let mut det = Detector::new("hodo");
        det.add(Volume::new("a")).unwrap();
        det.add_sensitivity(SensitiveDetector::new("hodo", "Hodoscope", "paddle", 700));
        let script = detector_script(&det);
        assert!(script.contains("CREATE TABLE IF NOT EXISTS `hodo__geometry`"));
        assert!(script.contains("`hodo__hit`"));
        assert!(script.contains("DELETE FROM `hodo__geometry` WHERE variation = 'original' AND id = 1;"));
        assert!(!script.contains("hodo__materials"));

        let gemc1 = detector_script(&Detector::new("old").with_gemc_version(1));
        assert!(!gemc1.contains("`variation`"));
        assert!(gemc1.contains("DELETE FROM `old__geometry`;"));
    }
}
