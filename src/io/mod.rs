// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - text tables, SQL, databases, gcards and simulation logs

pub mod database;
pub mod gcard;
mod importer;
mod overlap_log;
pub(crate) mod parser;
pub mod sql;
pub mod text;

pub use database::{DatabaseError, DbResult, GeometryDatabase, WriteSummary};
pub use gcard::{load_gcard, parse_gcard, GcardDetector};
pub use importer::{discover_geometry_files, import_geometry_file, split_geometry_file_name};
pub use overlap_log::{
    make_overlap_detector, parse_overlap_log, parse_overlap_log_file, Overlap, OverlapDetail,
};
pub use text::{
    parse_geometry, parse_materials, read_geometry, read_materials, write_all, write_geometry,
};
