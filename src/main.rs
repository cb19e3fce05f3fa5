// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::Parser;

use turnex::osm::FileFormat;
use turnex::Severity;

#[derive(Parser)]
struct Cli {
    /// The path to the OSM file (.osm, .osm.gz or .osm.bz2)
    osm_file: PathBuf,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    colog::init();
    let cli = Cli::parse();

    let mut index = turnex::RestrictionIndex::new();
    let diagnostics = turnex::osm::derive_restrictions_from_file(
        &mut index,
        guess_format(&cli.osm_file),
        &cli.osm_file,
    )?;

    for diagnostic in &diagnostics {
        match diagnostic.severity() {
            Severity::Info => log::info!("{diagnostic}"),
            Severity::Warning => log::warn!("{diagnostic}"),
            Severity::Error => log::error!("{diagnostic}"),
        }
    }

    for restriction in index.iter() {
        println!(
            "no {} -> {} -> {}",
            restriction.from.coord.to_degree_string(),
            restriction.via.coord.to_degree_string(),
            restriction.to.coord.to_degree_string(),
        );
    }

    Ok(())
}

fn guess_format(path: &Path) -> FileFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => FileFormat::XmlGz,
        Some("bz2") => FileFormat::XmlBz2,
        _ => FileFormat::Xml,
    }
}
