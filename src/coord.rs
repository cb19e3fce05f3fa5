// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

/// A geographic position, stored as fixed-point microdegrees.
///
/// The fixed-point representation makes equality exact, which matters when
/// matching coordinates shared between ways. One microdegree is around 11 cm
/// at the equator, finer than OSM sources carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    lat: i32,
    lon: i32,
}

impl Coord {
    /// Creates a Coord from a position expressed in degrees.
    pub fn from_degrees(lat: f64, lon: f64) -> Self {
        Self {
            lat: (lat * 1e6).round() as i32,
            lon: (lon * 1e6).round() as i32,
        }
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat as f64 * 1e-6
    }

    /// Longitude in degrees.
    pub fn lon(&self) -> f64 {
        self.lon as f64 * 1e-6
    }

    /// Human-readable label of this position, used in diagnostics.
    pub fn to_degree_string(&self) -> String {
        format!("({:.6}, {:.6})", self.lat(), self.lon())
    }
}

/// A [Coord] promoted to a routing-graph vertex.
///
/// Not every dataset coordinate becomes one - only junctions and other
/// routing-relevant points are assigned a graph identity. Ids are non-zero
/// and unique within one derivation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordNode {
    pub id: i64,
    pub coord: Coord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_degrees_is_exact() {
        let a = Coord::from_degrees(52.237049, 21.017532);
        let b = Coord::from_degrees(52.237049, 21.017532);
        assert_eq!(a, b);
        // degrees round-trip back onto the same fixed-point value
        assert_eq!(Coord::from_degrees(a.lat(), a.lon()), a);
    }

    #[test]
    fn from_degrees_rounds_excess_precision() {
        let a = Coord::from_degrees(52.2370491, 21.0175329);
        let b = Coord::from_degrees(52.2370490, 21.0175330);
        assert_eq!(a, b);
    }

    #[test]
    fn to_degree_string() {
        let c = Coord::from_degrees(-2.73495, 2.839236);
        assert_eq!(c.to_degree_string(), "(-2.734950, 2.839236)");
    }
}
