// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::element::{Member, Relation, Way};
use crate::network::RoadNetwork;
use crate::restriction::RestrictionRecord;
use crate::{Coord, CoordNode};

use super::{model, FeatureReader};

/// Helper object used for storing state related to converting
/// [OSM features](super::model::Feature) into graph-level turn restrictions.
///
/// Features are ingested in stream order; records are classified and
/// validated as their relation arrives. Node binding and emission only
/// happen in [finish](Self::finish), once the whole dataset is known and
/// coordinates can be promoted to graph vertices.
pub(super) struct RestrictionBuilder<'a, N: RoadNetwork> {
    network: &'a mut N,
    nodes: HashMap<i64, Coord>,
    ways: BTreeMap<i64, Rc<Way>>,
    records: Vec<RestrictionRecord>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, N: RoadNetwork> RestrictionBuilder<'a, N> {
    pub(super) fn new(network: &'a mut N) -> Self {
        Self {
            network,
            nodes: HashMap::default(),
            ways: BTreeMap::default(),
            records: Vec::default(),
            diagnostics: Vec::default(),
        }
    }

    /// Ingests all features from the provided [FeatureReader].
    pub(super) fn add_features<F: FeatureReader>(
        &mut self,
        mut features: F,
    ) -> Result<(), F::Error> {
        while let Some(f) = features.next()? {
            self.add_feature(f);
        }
        Ok(())
    }

    /// Promotes coordinates to graph nodes, binds every retained record and
    /// emits its restrictions into the road network. Returns all
    /// diagnostics accumulated over the run.
    pub(super) fn finish(mut self) -> Vec<Diagnostic> {
        let promoted = self.promote_graph_nodes();

        let mut records = std::mem::take(&mut self.records);
        for record in &mut records {
            self.bind(record, &promoted);
        }
        for record in &records {
            record.add_restrictions(&mut *self.network, &mut self.diagnostics);
        }
        // emitted (or dropped) records have no further role

        self.diagnostics
    }

    fn add_feature(&mut self, f: model::Feature) {
        match f {
            model::Feature::Node(n) => self.add_node(n),
            model::Feature::Way(w) => self.add_way(w),
            model::Feature::Relation(r) => self.add_relation(r),
        }
    }

    fn add_node(&mut self, n: model::Node) {
        self.nodes.insert(n.id, n.coord);
    }

    fn add_way(&mut self, w: model::Way) {
        // Remove references to unknown nodes
        let points: Vec<Coord> = w
            .nodes
            .iter()
            .filter_map(|id| self.nodes.get(id).copied())
            .collect();

        if points.len() < w.nodes.len() {
            log::debug!(
                "way {}: ignoring {} reference(s) to unknown nodes",
                w.id,
                w.nodes.len() - points.len(),
            );
        }
        if points.len() < 2 {
            log::debug!("way {} has fewer than 2 known nodes", w.id);
            return;
        }

        self.ways.insert(w.id, Rc::new(Way { id: w.id, points }));
    }

    fn add_relation(&mut self, r: model::Relation) {
        if r.tags.get("type").map(String::as_str) != Some("restriction") {
            return;
        }

        let relation = self.resolve_relation(r);
        let mut record = RestrictionRecord::from_relation(&relation, &mut self.diagnostics);
        if record.validate(&mut self.diagnostics) {
            self.records.push(record);
        }
        // invalid records are dropped here; the diagnostics explain why
    }

    /// Resolves a relation's member references into elements. Members which
    /// cannot be resolved are reported and left out; whether their absence
    /// is fatal is for validation to decide.
    fn resolve_relation(&mut self, r: model::Relation) -> Relation {
        let mut members = Vec::with_capacity(r.members.len());

        for m in r.members {
            match m.type_ {
                model::FeatureType::Node => match self.nodes.get(&m.ref_) {
                    Some(&coord) => members.push((m.role, Member::Node { id: m.ref_, coord })),
                    None => self.diagnostics.push(Diagnostic {
                        relation: r.id,
                        kind: DiagnosticKind::UnknownNodeRef { id: m.ref_ },
                    }),
                },

                model::FeatureType::Way => match self.ways.get(&m.ref_) {
                    Some(way) => members.push((m.role, Member::Way(Rc::clone(way)))),
                    None => self.diagnostics.push(Diagnostic {
                        relation: r.id,
                        kind: DiagnosticKind::UnknownWayRef { id: m.ref_ },
                    }),
                },

                model::FeatureType::Relation => self.diagnostics.push(Diagnostic {
                    relation: r.id,
                    kind: DiagnosticKind::NestedRelation { id: m.ref_ },
                }),
            }
        }

        Relation {
            id: r.id,
            tags: r.tags,
            members,
        }
    }

    /// Promotes routing-relevant coordinates to graph vertices: a
    /// coordinate becomes one when it is a way endpoint or is used more
    /// than once. Ids are assigned in way scan order, keeping runs
    /// reproducible.
    fn promote_graph_nodes(&self) -> HashMap<Coord, CoordNode> {
        let mut uses: HashMap<Coord, u32> = HashMap::default();
        for way in self.ways.values() {
            for p in &way.points {
                *uses.entry(*p).or_default() += 1;
            }
        }

        let mut promoted: HashMap<Coord, CoordNode> = HashMap::default();
        let mut next_id: i64 = 1;
        for way in self.ways.values() {
            let last = way.points.len() - 1;
            for (i, p) in way.points.iter().enumerate() {
                let relevant = i == 0 || i == last || uses.get(p).copied().unwrap_or(0) > 1;
                if relevant && !promoted.contains_key(p) {
                    promoted.insert(
                        *p,
                        CoordNode {
                            id: next_id,
                            coord: *p,
                        },
                    );
                    next_id += 1;
                }
            }
        }

        promoted
    }

    /// Hands each endpoint's graph identity to the record's binder.
    fn bind(&mut self, record: &mut RestrictionRecord, nodes: &HashMap<Coord, CoordNode>) {
        let Some(via) = record.via_point() else { return };
        let Some(&via_node) = nodes.get(&via) else { return };

        record.set_via_node(via_node, &mut self.diagnostics);
        log::debug!(
            "turn restriction {} 'via' node is {}",
            record.id(),
            via_node.coord.to_degree_string(),
        );

        let from_node = record
            .from_way()
            .and_then(|w| next_node_along(w, via, nodes));
        if let Some(n) = from_node {
            record.set_from_node(n);
            log::debug!(
                "turn restriction {} 'from' node is {}",
                record.id(),
                n.coord.to_degree_string(),
            );
        }

        let to_node = record.to_way().and_then(|w| next_node_along(w, via, nodes));
        if let Some(n) = to_node {
            record.set_to_node(n);
            log::debug!(
                "turn restriction {} 'to' node is {}",
                record.id(),
                n.coord.to_degree_string(),
            );
        }

        self.collect_other_nodes(record, via, via_node, nodes);
    }

    /// Collects every other exit from the via junction: for each way
    /// through it, the nearest promoted node in each direction, skipping
    /// the from, to and via nodes themselves.
    fn collect_other_nodes(
        &self,
        record: &mut RestrictionRecord,
        via: Coord,
        via_node: CoordNode,
        nodes: &HashMap<Coord, CoordNode>,
    ) {
        let from_id = record.from_node().map(|n| n.id);
        let to_id = record.to_node().map(|n| n.id);

        for way in self.ways.values() {
            for (i, p) in way.points.iter().enumerate() {
                if *p != via {
                    continue;
                }

                let before = way.points[..i]
                    .iter()
                    .rev()
                    .find_map(|q| nodes.get(q).copied());
                let after = way.points[i + 1..]
                    .iter()
                    .find_map(|q| nodes.get(q).copied());

                for exit in [before, after].into_iter().flatten() {
                    if Some(exit.id) == from_id
                        || Some(exit.id) == to_id
                        || exit.id == via_node.id
                    {
                        continue;
                    }
                    record.add_other_node(exit);
                    log::debug!(
                        "turn restriction {} adding 'other' node {}",
                        record.id(),
                        exit.coord.to_degree_string(),
                    );
                }
            }
        }
    }
}

/// Walks along the way away from the given endpoint and returns the first
/// coordinate with a graph identity.
fn next_node_along(
    way: &Way,
    from: Coord,
    nodes: &HashMap<Coord, CoordNode>,
) -> Option<CoordNode> {
    let points = &way.points;
    if points.first() == Some(&from) {
        points[1..].iter().find_map(|p| nodes.get(p).copied())
    } else if points.last() == Some(&from) {
        points[..points.len() - 1]
            .iter()
            .rev()
            .find_map(|p| nodes.get(p).copied())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::RestrictionIndex;

    /// FeatureReader over a pre-built list of features.
    struct VecReader(std::vec::IntoIter<model::Feature>);

    impl FeatureReader for VecReader {
        type Error = std::convert::Infallible;

        fn next(&mut self) -> Result<Option<model::Feature>, Self::Error> {
            Ok(self.0.next())
        }
    }

    fn node(id: i64, lat: f64, lon: f64) -> model::Feature {
        model::Feature::Node(model::Node {
            id,
            coord: Coord::from_degrees(lat, lon),
        })
    }

    fn way(id: i64, nodes: &[i64]) -> model::Feature {
        model::Feature::Way(model::Way {
            id,
            nodes: nodes.to_vec(),
        })
    }

    /// A four-armed junction at node 5:
    ///
    /// ```text
    ///        4
    ///        |
    /// 1--2---5---3
    ///        |
    ///        6
    /// ```
    fn crossing() -> Vec<model::Feature> {
        vec![
            node(1, 0.0, 0.0),
            node(2, 0.0, 0.0005),
            node(5, 0.0, 0.001),
            node(3, 0.0, 0.002),
            node(4, 0.001, 0.001),
            node(6, -0.001, 0.001),
            way(101, &[1, 2, 5]),
            way(102, &[5, 3]),
            way(103, &[5, 4]),
            way(104, &[6, 5]),
        ]
    }

    fn restriction(
        id: i64,
        kind: &str,
        members: Vec<model::RelationMember>,
    ) -> model::Feature {
        model::Feature::Relation(model::Relation {
            id,
            members,
            tags: HashMap::from_iter([
                ("type".to_string(), "restriction".to_string()),
                ("restriction".to_string(), kind.to_string()),
            ]),
        })
    }

    fn member(type_: model::FeatureType, ref_: i64, role: &str) -> model::RelationMember {
        model::RelationMember {
            type_,
            ref_,
            role: role.to_string(),
        }
    }

    fn run(features: Vec<model::Feature>) -> (RestrictionIndex, Vec<Diagnostic>) {
        let mut index = RestrictionIndex::new();
        let mut builder = RestrictionBuilder::new(&mut index);
        builder
            .add_features(VecReader(features.into_iter()))
            .unwrap();
        let diagnostics = builder.finish();
        (index, diagnostics)
    }

    #[test]
    fn promotes_endpoints_and_junctions_only() {
        let mut index = RestrictionIndex::new();
        let mut builder = RestrictionBuilder::new(&mut index);
        builder
            .add_features(VecReader(crossing().into_iter()))
            .unwrap();

        let promoted = builder.promote_graph_nodes();
        // node 2 is an interior point of a single way
        assert!(!promoted.contains_key(&Coord::from_degrees(0.0, 0.0005)));
        assert_eq!(promoted.len(), 5);

        // scan order makes the assignment reproducible
        assert_eq!(promoted[&Coord::from_degrees(0.0, 0.0)].id, 1);
        assert_eq!(promoted[&Coord::from_degrees(0.0, 0.001)].id, 2);
    }

    #[test]
    fn binds_across_interior_points() {
        let mut features = crossing();
        features.push(restriction(
            201,
            "no_left_turn",
            vec![
                member(model::FeatureType::Way, 101, "from"),
                member(model::FeatureType::Node, 5, "via"),
                member(model::FeatureType::Way, 102, "to"),
            ],
        ));

        let (index, _) = run(features);

        assert_eq!(index.len(), 1);
        let r = index.iter().next().unwrap();
        // the from node is the way's far endpoint, not the unpromoted
        // interior point right next to the junction
        assert_eq!(r.from.coord, Coord::from_degrees(0.0, 0.0));
        assert_eq!(r.via.coord, Coord::from_degrees(0.0, 0.001));
        assert_eq!(r.to.coord, Coord::from_degrees(0.0, 0.002));
    }

    #[test]
    fn other_exits_skip_the_allowed_turn() {
        let mut features = crossing();
        features.push(restriction(
            202,
            "only_straight_on",
            vec![
                member(model::FeatureType::Way, 101, "from"),
                member(model::FeatureType::Way, 102, "to"),
            ],
        ));

        let (index, diagnostics) = run(features);

        let blocked: Vec<Coord> = index.iter().map(|r| r.to.coord).collect();
        assert_eq!(
            blocked,
            vec![
                Coord::from_degrees(0.001, 0.001),
                Coord::from_degrees(-0.001, 0.001),
            ],
        );
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::ViaInferred { .. })));
    }

    #[test]
    fn unresolvable_members_are_reported() {
        let mut features = crossing();
        features.push(restriction(
            203,
            "no_left_turn",
            vec![
                member(model::FeatureType::Way, 999, "from"),
                member(model::FeatureType::Node, 5, "via"),
                member(model::FeatureType::Way, 102, "to"),
                member(model::FeatureType::Relation, 77, "via"),
            ],
        ));

        let (index, diagnostics) = run(features);

        assert!(index.is_empty());
        assert!(diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::UnknownWayRef { id: 999 }));
        assert!(diagnostics
            .iter()
            .any(|d| d.kind == DiagnosticKind::NestedRelation { id: 77 }));
        // the missing member surfaces as a validation failure too
        assert!(diagnostics
            .iter()
            .any(|d| matches!(d.kind, DiagnosticKind::MissingFromWay { .. })));
    }

    #[test]
    fn non_restriction_relations_are_ignored() {
        let mut features = crossing();
        features.push(model::Feature::Relation(model::Relation {
            id: 204,
            members: vec![member(model::FeatureType::Way, 101, "outer")],
            tags: HashMap::from_iter([("type".to_string(), "multipolygon".to_string())]),
        }));

        let (index, diagnostics) = run(features);
        assert!(index.is_empty());
        assert!(diagnostics.is_empty());
    }
}
