// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::rc::Rc;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::element::{Member, Relation, Way};
use crate::network::RoadNetwork;
use crate::{Coord, CoordNode};

/// Modifier tags this crate does not honor. Their presence is reported,
/// the restriction itself is still processed.
const UNSUPPORTED_MODIFIERS: [&str; 5] = ["except", "day_on", "day_off", "hour_on", "hour_off"];

/// A turn restriction in the middle of its derivation pipeline.
///
/// A record is created once per `type=restriction` relation
/// ([RestrictionRecord::from_relation]), checked against the way geometry
/// ([RestrictionRecord::validate]), bound to graph nodes as the graph
/// construction stage resolves coordinates (in any order, possibly never),
/// and finally turned into graph-level restrictions
/// ([RestrictionRecord::add_restrictions]). After emission it has no
/// further role.
///
/// The via point and the restriction kind are immutable once set; the node
/// slots are populated incrementally and independently of validation.
#[derive(Debug)]
pub struct RestrictionRecord {
    id: i64,
    kind: Option<String>,
    tags: HashMap<String, String>,
    from_way: Option<Rc<Way>>,
    to_way: Option<Rc<Way>>,
    via_point: Option<Coord>,
    from_node: Option<CoordNode>,
    to_node: Option<CoordNode>,
    via_node: Option<CoordNode>,
    via_conflict: bool,
    other_nodes: Vec<CoordNode>,
}

impl RestrictionRecord {
    /// Classifies a relation's members into the from/to/via slots.
    ///
    /// Members are visited in source order and dispatched on their role.
    /// Single-member slots follow first-wins semantics: a second assignment
    /// is reported and discarded, never overwriting the first. Members of
    /// the wrong shape for their role leave the slot empty. All of this is
    /// non-fatal; the resulting record still goes through [validate](Self::validate).
    pub fn from_relation(relation: &Relation, diagnostics: &mut Vec<Diagnostic>) -> Self {
        let mut record = Self {
            id: relation.id,
            kind: None,
            tags: HashMap::default(),
            from_way: None,
            to_way: None,
            via_point: None,
            from_node: None,
            to_node: None,
            via_node: None,
            via_conflict: false,
            other_nodes: Vec::default(),
        };

        for (role, member) in &relation.members {
            record.classify_member(role, member, diagnostics);
        }

        record.tags = relation.tags.clone();
        record.kind = relation.tag("restriction").map(str::to_string);

        for tag in UNSUPPORTED_MODIFIERS {
            if relation.tag(tag).is_some() {
                diagnostics.push(record.diagnostic(DiagnosticKind::UnsupportedModifier { tag }));
            }
        }

        record
    }

    fn classify_member(&mut self, role: &str, member: &Member, diagnostics: &mut Vec<Diagnostic>) {
        match role {
            "from" => classify_way_slot(self.id, "from", &mut self.from_way, member, diagnostics),
            "to" => classify_way_slot(self.id, "to", &mut self.to_way, member, diagnostics),

            "via" => {
                if self.via_point.is_some() {
                    diagnostics.push(self.diagnostic(DiagnosticKind::DuplicateMember {
                        role: "via",
                        first_at: None,
                    }));
                } else {
                    match member {
                        Member::Node { coord, .. } => self.via_point = Some(*coord),
                        Member::Way(way) => {
                            diagnostics.push(self.diagnostic(DiagnosticKind::ViaIsNotANode {
                                way_start: way.first_point(),
                            }));
                        }
                    }
                }
            }

            // relax - we don't care about this one
            "location_hint" => {}

            other => {
                diagnostics.push(self.diagnostic(DiagnosticKind::UnknownRole {
                    role: other.to_string(),
                }));
            }
        }
    }

    /// Identifier of the source relation.
    pub fn id(&self) -> i64 {
        self.id
    }

    /// Raw value of the `restriction` tag.
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    /// Value of a tag copied from the source relation.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn from_way(&self) -> Option<&Rc<Way>> {
        self.from_way.as_ref()
    }

    pub fn to_way(&self) -> Option<&Rc<Way>> {
        self.to_way.as_ref()
    }

    /// The junction coordinate, explicit or inferred. Immutable once set.
    pub fn via_point(&self) -> Option<Coord> {
        self.via_point
    }

    pub fn from_node(&self) -> Option<CoordNode> {
        self.from_node
    }

    pub fn to_node(&self) -> Option<CoordNode> {
        self.to_node
    }

    pub fn via_node(&self) -> Option<CoordNode> {
        self.via_node
    }

    /// All other exits from the via junction seen so far, in arrival order.
    pub fn other_nodes(&self) -> &[CoordNode] {
        &self.other_nodes
    }

    /// Checks the classified record against the road geometry.
    ///
    /// When no explicit via point was given, the single coordinate shared by
    /// the from and to ways is adopted as the via point (with an advisory);
    /// zero or multiple shared coordinates invalidate the record. A set via
    /// point must then be an endpoint of both ways - both endpoint checks
    /// are attempted even if the first fails, so one pass surfaces both
    /// ways' errors.
    ///
    /// Returns whether the record may still produce restrictions. On
    /// success, [via_point](Self::via_point) is guaranteed to be set.
    pub fn validate(&mut self, diagnostics: &mut Vec<Diagnostic>) -> bool {
        let mut result = true;

        if self.kind.is_none() {
            diagnostics.push(self.diagnostic(DiagnosticKind::MissingKind));
            result = false;
        }

        if self.from_way.is_none() {
            diagnostics.push(self.diagnostic(DiagnosticKind::MissingFromWay {
                to_start: self.to_way.as_ref().and_then(|w| w.first_point()),
            }));
        }
        if self.to_way.is_none() {
            diagnostics.push(self.diagnostic(DiagnosticKind::MissingToWay {
                from_end: self.from_way.as_ref().and_then(|w| w.last_point()),
            }));
        }
        let (from_way, to_way) = match (self.from_way.clone(), self.to_way.clone()) {
            (Some(f), Some(t)) => (f, t),
            _ => return false,
        };

        let via = match self.via_point {
            Some(via) => via,
            None => match self.infer_via_point(&from_way, &to_way, diagnostics) {
                Some(via) => {
                    self.via_point = Some(via);
                    via
                }
                None => return false,
            },
        };

        if !from_way.meets_at_endpoint(via) {
            diagnostics.push(self.diagnostic(DiagnosticKind::FromWayNotAtVia { via }));
            result = false;
        }
        if !to_way.meets_at_endpoint(via) {
            diagnostics.push(self.diagnostic(DiagnosticKind::ToWayNotAtVia { via }));
            result = false;
        }

        result
    }

    /// Finds the via point as the sole coordinate shared by both ways,
    /// comparing all points pairwise, not just endpoints.
    fn infer_via_point(
        &self,
        from_way: &Way,
        to_way: &Way,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<Coord> {
        let mut via: Option<Coord> = None;

        for fp in &from_way.points {
            for tp in &to_way.points {
                if fp == tp {
                    if let Some(first) = via {
                        diagnostics
                            .push(self.diagnostic(DiagnosticKind::AmbiguousVia { first }));
                        return None;
                    }
                    via = Some(*fp);
                }
            }
        }

        match via {
            Some(at) => {
                diagnostics.push(self.diagnostic(DiagnosticKind::ViaInferred { at }));
                Some(at)
            }
            None => {
                diagnostics.push(self.diagnostic(DiagnosticKind::WaysDoNotConnect));
                None
            }
        }
    }

    /// Records the graph identity of the from endpoint.
    pub fn set_from_node(&mut self, node: CoordNode) {
        self.from_node = Some(node);
    }

    /// Records the graph identity of the to endpoint.
    pub fn set_to_node(&mut self, node: CoordNode) {
        self.to_node = Some(node);
    }

    /// Records the graph identity of the via junction.
    ///
    /// The first binding wins. Upstream node splitting can resolve the same
    /// coordinate more than once; a second, different node is a
    /// contradiction that is reported and makes the record unusable, while
    /// re-binding the same node is a no-op.
    pub fn set_via_node(&mut self, node: CoordNode, diagnostics: &mut Vec<Diagnostic>) {
        match self.via_node {
            None => self.via_node = Some(node),
            Some(existing) if existing != node => {
                diagnostics.push(self.diagnostic(DiagnosticKind::ViaRedefined {
                    kept: existing.coord,
                    rejected: node.coord,
                }));
                self.via_conflict = true;
            }
            Some(_) => {}
        }
    }

    /// Records another exit from the via junction. Arrival order is kept
    /// and duplicates are permitted - the router treats duplicate exits as
    /// harmless redundancy.
    pub fn add_other_node(&mut self, node: CoordNode) {
        self.other_nodes.push(node);
    }

    /// Emits the graph-level restrictions encoded by this record into the
    /// road network.
    ///
    /// A no-op unless the kind and all three of from/via/to nodes are set
    /// (whatever is missing was already reported by an earlier stage), or if
    /// the via binding was contradicted. Emission reads but never mutates
    /// the record, so repeating it yields the same restrictions.
    ///
    /// `no_*` kinds produce a single (from, via, to) restriction; the legacy
    /// `no_turn*` spelling does too, with a deprecation warning. `only_*`
    /// kinds forbid every known alternative exit instead, producing one
    /// (from, via, other) restriction per entry in
    /// [other_nodes](Self::other_nodes) - together with the implicit
    /// allowance of the to node this encodes "only this turn is permitted".
    pub fn add_restrictions<N: RoadNetwork + ?Sized>(
        &self,
        network: &mut N,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let (kind, from, via, to) = match (&self.kind, self.from_node, self.via_node, self.to_node)
        {
            (Some(kind), Some(from), Some(via), Some(to)) => (kind.as_str(), from, via, to),
            _ => return,
        };
        if self.via_conflict {
            return;
        }

        match kind {
            "no_left_turn" | "no_right_turn" | "no_straight_on" | "no_u_turn" => {
                network.add_restriction(from, via, to);
                diagnostics.push(self.emitted(kind, via, to));
            }

            _ if kind.starts_with("no_turn") => {
                network.add_restriction(from, via, to);
                diagnostics.push(self.diagnostic(DiagnosticKind::DeprecatedKind {
                    kind: kind.to_string(),
                }));
                diagnostics.push(self.emitted(kind, via, to));
            }

            "only_left_turn" | "only_right_turn" | "only_straight_on" => {
                for &other in &self.other_nodes {
                    network.add_restriction(from, via, other);
                    diagnostics.push(self.emitted(kind, via, other));
                }
            }

            _ => {
                diagnostics.push(self.diagnostic(DiagnosticKind::UnsupportedKind {
                    kind: kind.to_string(),
                }));
            }
        }
    }

    fn diagnostic(&self, kind: DiagnosticKind) -> Diagnostic {
        Diagnostic {
            relation: self.id,
            kind,
        }
    }

    fn emitted(&self, kind: &str, via: CoordNode, blocked: CoordNode) -> Diagnostic {
        self.diagnostic(DiagnosticKind::Emitted {
            kind: kind.to_string(),
            via: via.coord,
            blocked: blocked.coord,
        })
    }
}

/// Assigns a way member to a single-member slot, with first-wins semantics.
fn classify_way_slot(
    relation: i64,
    role: &'static str,
    slot: &mut Option<Rc<Way>>,
    member: &Member,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some(first) = slot {
        diagnostics.push(Diagnostic {
            relation,
            kind: DiagnosticKind::DuplicateMember {
                role,
                first_at: first.first_point(),
            },
        });
    } else if let Member::Way(way) = member {
        *slot = Some(Rc::clone(way));
    } else {
        diagnostics.push(Diagnostic {
            relation,
            kind: DiagnosticKind::MemberNotAWay { role },
        });
    }
}
