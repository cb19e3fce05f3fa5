// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::fs::File;
use std::io;
use std::path::Path;

use builder::RestrictionBuilder;

use crate::diagnostics::Diagnostic;
use crate::network::RoadNetwork;

mod builder;
mod model;
mod xml;

/// Format of the input OSM file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Uncompressed [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    Xml,

    /// [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [gzip](https://en.wikipedia.org/wiki/Gzip) compression
    XmlGz,

    /// [OSM XML](https://wiki.openstreetmap.org/wiki/OSM_XML)
    /// with [bzip2](https://en.wikipedia.org/wiki/Bzip2) compression
    XmlBz2,
}

/// Error which can occur while deriving restrictions from an OSM extract.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("xml: {0}")]
    Xml(#[from] quick_xml::Error),
}

/// Internal trait for objects which can stream [osm features](model::Feature)
/// from an underlying source.
trait FeatureReader {
    type Error;
    fn next(&mut self) -> Result<Option<model::Feature>, Self::Error>;
}

/// Derives turn restrictions from OSM data in a reader, appending them to
/// the provided [RoadNetwork]. Returns the diagnostics describing every
/// decision made along the way.
///
/// The provided stream will be automatically wrapped in a buffered reader
/// when needed.
pub fn derive_restrictions_from_io<N: RoadNetwork, R: io::Read>(
    network: &mut N,
    format: FileFormat,
    reader: R,
) -> Result<Vec<Diagnostic>, Error> {
    match format {
        FileFormat::Xml => {
            let b = io::BufReader::new(reader);
            derive(network, xml::Reader::from_io(b))
        }

        FileFormat::XmlGz => {
            let d = flate2::read::MultiGzDecoder::new(reader);
            let b = io::BufReader::new(d);
            derive(network, xml::Reader::from_io(b))
        }

        FileFormat::XmlBz2 => {
            let d = bzip2::read::MultiBzDecoder::new(reader);
            let b = io::BufReader::new(d);
            derive(network, xml::Reader::from_io(b))
        }
    }
}

/// Derives turn restrictions from an OSM file at the provided path,
/// appending them to the provided [RoadNetwork].
pub fn derive_restrictions_from_file<N: RoadNetwork, P: AsRef<Path>>(
    network: &mut N,
    format: FileFormat,
    path: P,
) -> Result<Vec<Diagnostic>, Error> {
    let f = File::open(path)?;
    derive_restrictions_from_io(network, format, f)
}

/// Derives turn restrictions from an OSM extract held in memory,
/// appending them to the provided [RoadNetwork].
pub fn derive_restrictions_from_buffer<N: RoadNetwork>(
    network: &mut N,
    format: FileFormat,
    data: &[u8],
) -> Result<Vec<Diagnostic>, Error> {
    if format == FileFormat::Xml {
        // Fast path is available for in-memory XML data
        derive(network, xml::Reader::from_buffer(data))
    } else {
        // Wrap the buffer in a cursor and use the IO path
        derive_restrictions_from_io(network, format, io::Cursor::new(data))
    }
}

fn derive<N: RoadNetwork, F: FeatureReader>(
    network: &mut N,
    features: F,
) -> Result<Vec<Diagnostic>, Error>
where
    Error: From<F::Error>,
{
    let mut builder = RestrictionBuilder::new(network);
    builder.add_features(features)?;
    Ok(builder.finish())
}
