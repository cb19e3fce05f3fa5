// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::rc::Rc;

use crate::Coord;

/// A line element: an identity plus an ordered sequence of positions.
///
/// Ways are shared behind [Rc], so a [RestrictionRecord](crate::RestrictionRecord)
/// references the dataset's way instead of copying its geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Way {
    pub id: i64,
    pub points: Vec<Coord>,
}

impl Way {
    /// First position of the way, if it has any.
    pub fn first_point(&self) -> Option<Coord> {
        self.points.first().copied()
    }

    /// Last position of the way, if it has any.
    pub fn last_point(&self) -> Option<Coord> {
        self.points.last().copied()
    }

    /// Checks whether the way starts or ends at the given position.
    pub fn meets_at_endpoint(&self, at: Coord) -> bool {
        self.first_point() == Some(at) || self.last_point() == Some(at)
    }
}

/// A member element of a relation.
///
/// The restriction domain only ever distinguishes two shapes, hence
/// a closed union rather than anything more open-ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    /// A point with its position.
    Node { id: i64, coord: Coord },

    /// A line, shared with the dataset it came from.
    Way(Rc<Way>),
}

/// A tagged grouping of dataset elements with named roles,
/// with all member references already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub id: i64,
    pub tags: HashMap<String, String>,

    /// (role, member) pairs in source order.
    pub members: Vec<(String, Member)>,
}

impl Relation {
    /// Value of the given tag, if present.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}
