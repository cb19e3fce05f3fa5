// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::io;
use std::str::from_utf8;

use super::{model, FeatureReader};
use crate::Coord;

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
pub(super) trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<quick_xml::events::Event<'a>>;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
pub(super) struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> IoParser<R> {
    #[inline]
    fn new(reader: R) -> Self {
        Self(quick_xml::Reader::from_reader(reader), Vec::default())
    }
}

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<quick_xml::events::Event<'a>> {
        self.0.read_event_into(&mut self.1)
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
pub(super) struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl<'a> BufParser<'a> {
    #[inline]
    fn new(data: &'a [u8]) -> Self {
        Self(quick_xml::Reader::from_reader(data))
    }
}

impl<'a> Parser for BufParser<'a> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<quick_xml::events::Event<'b>> {
        self.0.read_event()
    }
}

/// Reader streams osm [Features](model::Feature) from an XML source.
pub(super) struct Reader<P: Parser> {
    parser: P,
    eof: bool,
}

impl<P: Parser> Reader<P> {
    #[inline]
    fn new(parser: P) -> Self {
        Self { parser, eof: false }
    }
}

impl<P: Parser> FeatureReader for Reader<P> {
    type Error = quick_xml::Error;

    fn next(&mut self) -> Result<Option<model::Feature>, quick_xml::Error> {
        let mut f: Option<model::Feature> = None;

        while !self.eof {
            match self.parser.read_event()? {
                quick_xml::events::Event::Empty(start) => match start.local_name().as_ref() {
                    b"node" => {
                        if let Some(n) = parse_node(start) {
                            return Ok(Some(model::Feature::Node(n)));
                        }
                    }
                    // "way" or "relation" can't be self-closing
                    b"tag" => {
                        if let Some(tags) = feature_tags(&mut f) {
                            if let Some((k, v)) = parse_tag(start) {
                                tags.insert(k, v);
                            }
                        }
                    }
                    b"nd" => {
                        if let Some(nodes) = feature_nodes(&mut f) {
                            if let Some(ref_) = parse_nd(start) {
                                nodes.push(ref_);
                            }
                        }
                    }
                    b"member" => {
                        if let Some(members) = feature_members(&mut f) {
                            if let Some(member) = parse_member(start) {
                                members.push(member);
                            }
                        }
                    }
                    _ => {}
                },

                quick_xml::events::Event::Start(start) => match start.local_name().as_ref() {
                    b"node" => f = parse_node(start).map(model::Feature::Node),
                    b"way" => f = parse_way(start).map(model::Feature::Way),
                    b"relation" => f = parse_relation(start).map(model::Feature::Relation),
                    // "tag", "nd" and "member" must be self-closing
                    _ => {}
                },

                quick_xml::events::Event::End(end) => match end.local_name().as_ref() {
                    b"node" | b"way" | b"relation" => {
                        if let Some(f) = f.take() {
                            return Ok(Some(f));
                        }
                    }
                    _ => {}
                },

                quick_xml::events::Event::Eof => {
                    self.eof = true;
                }

                _ => {}
            }
        }

        Ok(f)
    }
}

impl<'a> Reader<BufParser<'a>> {
    #[inline]
    pub(super) fn from_buffer(data: &'a [u8]) -> Self {
        Self::new(BufParser::new(data))
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    #[inline]
    pub(super) fn from_io(reader: R) -> Self {
        Self::new(IoParser::new(reader))
    }
}

fn parse_node(start: quick_xml::events::BytesStart<'_>) -> Option<model::Node> {
    // TODO: Log errors instead of silencing them

    let mut id: i64 = 0;
    let mut lat = f64::NAN;
    let mut lon = f64::NAN;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"id" => id = from_utf8(&attr.value).ok()?.parse().ok()?,
            b"lat" => lat = from_utf8(&attr.value).ok()?.parse().ok()?,
            b"lon" => lon = from_utf8(&attr.value).ok()?.parse().ok()?,
            _ => {}
        }
    }

    if id != 0 && lat.is_finite() && lon.is_finite() {
        Some(model::Node {
            id,
            coord: Coord::from_degrees(lat, lon),
        })
    } else {
        None
    }
}

fn parse_way(start: quick_xml::events::BytesStart<'_>) -> Option<model::Way> {
    // TODO: Log errors instead of silencing them

    let mut id: i64 = 0;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"id" => id = from_utf8(&attr.value).ok()?.parse().ok()?,
            _ => {}
        }
    }

    if id != 0 {
        Some(model::Way {
            id,
            nodes: Vec::default(),
        })
    } else {
        None
    }
}

fn parse_relation(start: quick_xml::events::BytesStart<'_>) -> Option<model::Relation> {
    // TODO: Log errors instead of silencing them

    let mut id: i64 = 0;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"id" => id = from_utf8(&attr.value).ok()?.parse().ok()?,
            _ => {}
        }
    }

    if id != 0 {
        Some(model::Relation {
            id,
            members: Vec::default(),
            tags: HashMap::default(),
        })
    } else {
        None
    }
}

fn parse_tag(start: quick_xml::events::BytesStart<'_>) -> Option<(String, String)> {
    // TODO: Log errors instead of silencing them

    let mut k = None;
    let mut v = None;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"k" => k = from_utf8(&attr.value).ok().map(|s| s.to_string()),
            b"v" => v = from_utf8(&attr.value).ok().map(|s| s.to_string()),
            _ => {}
        }
    }

    k.map(|k| (k, v.unwrap_or_default()))
}

fn parse_nd(start: quick_xml::events::BytesStart<'_>) -> Option<i64> {
    // TODO: Log errors instead of silencing them

    let mut ref_: i64 = 0;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"ref" => ref_ = from_utf8(&attr.value).ok()?.parse().ok()?,
            _ => {}
        }
    }

    if ref_ != 0 {
        Some(ref_)
    } else {
        None
    }
}

fn parse_member(start: quick_xml::events::BytesStart<'_>) -> Option<model::RelationMember> {
    // TODO: Log errors instead of silencing them

    let mut ref_: i64 = 0;
    let mut type_ = None;
    let mut role = None;

    for attr in start.attributes() {
        let attr = attr.ok()?;
        match attr.key.as_ref() {
            b"ref" => ref_ = from_utf8(&attr.value).ok()?.parse().ok()?,
            b"type" => type_ = Some(parse_feature_type(&attr.value)?),
            b"role" => role = Some(from_utf8(&attr.value).ok()?.to_string()),
            _ => {}
        }
    }

    match (ref_, type_, role) {
        (0, _, _) => None,
        (ref_, Some(type_), Some(role)) => Some(model::RelationMember { type_, ref_, role }),
        _ => None,
    }
}

fn parse_feature_type(s: &[u8]) -> Option<model::FeatureType> {
    match s {
        b"node" => Some(model::FeatureType::Node),
        b"way" => Some(model::FeatureType::Way),
        b"relation" => Some(model::FeatureType::Relation),
        _ => None,
    }
}

fn feature_tags<'a>(f: &'a mut Option<model::Feature>) -> Option<&'a mut HashMap<String, String>> {
    match f {
        // way tags play no part in restriction derivation
        Some(model::Feature::Relation(ref mut r)) => Some(&mut r.tags),
        _ => None,
    }
}

fn feature_nodes<'a>(f: &'a mut Option<model::Feature>) -> Option<&'a mut Vec<i64>> {
    match f {
        Some(model::Feature::Way(ref mut w)) => Some(&mut w.nodes),
        _ => None,
    }
}

fn feature_members<'a>(
    f: &'a mut Option<model::Feature>,
) -> Option<&'a mut Vec<model::RelationMember>> {
    match f {
        Some(model::Feature::Relation(ref mut r)) => Some(&mut r.members),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::model::{Feature, FeatureType, Node, Relation, RelationMember, Way};
    use super::*;

    macro_rules! tags {
        {} => { HashMap::default() };
        {$( $k:literal : $v:literal ),+} => {
            HashMap::from_iter([ $( ($k.to_string(), $v.to_string()) ),+ ])
        };
    }

    const RESTRICTIONS_XML: &[u8] = include_bytes!("test_fixtures/restrictions.osm");

    fn expected_nodes() -> Vec<Node> {
        [
            (1, 0.0, 0.0),
            (2, 0.0005, 0.0005),
            (5, 0.001, 0.001),
            (3, 0.002, 0.001),
            (4, 0.001, 0.002),
            (6, 0.0, 0.002),
        ]
        .into_iter()
        .map(|(id, lat, lon)| Node {
            id,
            coord: Coord::from_degrees(lat, lon),
        })
        .collect()
    }

    fn expected_ways() -> Vec<Way> {
        vec![
            Way {
                id: 101,
                nodes: vec![1, 2, 5],
            },
            Way {
                id: 102,
                nodes: vec![5, 3],
            },
            Way {
                id: 103,
                nodes: vec![5, 4],
            },
            Way {
                id: 104,
                nodes: vec![6, 5],
            },
        ]
    }

    fn member(type_: FeatureType, ref_: i64, role: &str) -> RelationMember {
        RelationMember {
            type_,
            ref_,
            role: role.to_string(),
        }
    }

    fn expected_relations() -> Vec<Relation> {
        vec![
            Relation {
                id: 201,
                members: vec![
                    member(FeatureType::Way, 101, "from"),
                    member(FeatureType::Node, 5, "via"),
                    member(FeatureType::Way, 102, "to"),
                ],
                tags: tags! {"type": "restriction", "restriction": "no_left_turn"},
            },
            Relation {
                id: 202,
                members: vec![
                    member(FeatureType::Way, 101, "from"),
                    member(FeatureType::Way, 102, "to"),
                ],
                tags: tags! {"type": "restriction", "restriction": "only_straight_on"},
            },
            Relation {
                id: 203,
                members: vec![
                    member(FeatureType::Way, 103, "from"),
                    member(FeatureType::Node, 5, "via"),
                    member(FeatureType::Way, 104, "to"),
                ],
                tags: tags! {"type": "restriction", "restriction": "no_bicycle_turn"},
            },
            Relation {
                id: 204,
                members: vec![
                    member(FeatureType::Node, 5, "via"),
                    member(FeatureType::Way, 102, "to"),
                ],
                tags: tags! {"type": "restriction", "restriction": "no_right_turn"},
            },
            Relation {
                id: 205,
                members: vec![
                    member(FeatureType::Way, 104, "from"),
                    member(FeatureType::Node, 5, "via"),
                    member(FeatureType::Way, 103, "to"),
                ],
                tags: tags! {"type": "restriction", "restriction": "no_turn_left"},
            },
            Relation {
                id: 206,
                members: vec![
                    member(FeatureType::Way, 101, "outer"),
                    member(FeatureType::Way, 102, "outer"),
                ],
                tags: tags! {"type": "multipolygon"},
            },
        ]
    }

    fn collect_all<F: FeatureReader>(
        mut features: F,
    ) -> Result<(Vec<Node>, Vec<Way>, Vec<Relation>), F::Error> {
        let mut nodes = Vec::default();
        let mut ways = Vec::default();
        let mut relations = Vec::default();

        while let Some(f) = features.next()? {
            match f {
                Feature::Node(n) => nodes.push(n),
                Feature::Way(w) => ways.push(w),
                Feature::Relation(r) => relations.push(r),
            }
        }

        Ok((nodes, ways, relations))
    }

    fn check_against_expected<F: FeatureReader>(features: F) -> Result<(), F::Error> {
        let (nodes, ways, relations) = collect_all(features)?;
        assert_eq!(nodes, expected_nodes());
        assert_eq!(ways, expected_ways());
        assert_eq!(relations, expected_relations());
        Ok(())
    }

    #[test]
    fn parse_from_buf() -> Result<(), quick_xml::Error> {
        check_against_expected(Reader::from_buffer(RESTRICTIONS_XML))
    }

    #[test]
    fn parse_from_io() -> Result<(), quick_xml::Error> {
        check_against_expected(Reader::from_io(io::Cursor::new(RESTRICTIONS_XML)))
    }
}
