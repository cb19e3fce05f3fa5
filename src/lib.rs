// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

//! Turn restriction derivation from [OpenStreetMap](https://www.openstreetmap.org/) data.
//!
//! Turnex reads [turn restriction relations](https://wiki.openstreetmap.org/wiki/Turn_restriction)
//! and resolves their loosely-tagged members into unambiguous graph-level
//! restrictions: directed (from, via, to) triples forbidding traversal
//! through a junction, ready to feed into a router. Along the way every
//! decision - recovered via points, rejected relations, legacy spellings -
//! is reported as a structured [Diagnostic] instead of being logged, so
//! embedders pick the sink themselves.
//!
//! # Example
//!
//! ```no_run
//! let mut index = turnex::RestrictionIndex::new();
//! let diagnostics = turnex::osm::derive_restrictions_from_file(
//!     &mut index,
//!     turnex::osm::FileFormat::Xml,
//!     "path/to/monaco.osm",
//! ).expect("failed to read monaco.osm");
//!
//! for diagnostic in &diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! println!("derived {} turn restrictions", index.len());
//! ```

mod coord;
mod diagnostics;
mod element;
mod network;
pub mod osm;
mod restriction;

pub use coord::{Coord, CoordNode};
pub use diagnostics::{Diagnostic, DiagnosticKind, Severity};
pub use element::{Member, Relation, Way};
pub use network::{Restriction, RestrictionIndex, RoadNetwork};
pub use restriction::RestrictionRecord;
