// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Coord;

/// How severe a [Diagnostic] is.
///
/// [Severity::Error] marks the restriction as unusable, [Severity::Warning]
/// is advisory and [Severity::Info] is audit trail only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// A single decision made while deriving one turn restriction.
///
/// Stages hand these back to the caller instead of talking to a logger,
/// so embedders pick the sink (console, file, metrics) themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Identifier of the source relation.
    pub relation: i64,
    pub kind: DiagnosticKind,
}

/// The stable set of decisions reported during restriction derivation.
///
/// Coordinates carried by the variants point the operator at the relevant
/// spot in the source data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// A second member was assigned to a single-member role; the first won.
    DuplicateMember {
        role: &'static str,
        first_at: Option<Coord>,
    },

    /// A 'from' or 'to' member is not a way.
    MemberNotAWay { role: &'static str },

    /// A 'via' member is a way, which is not supported.
    ViaIsNotANode { way_start: Option<Coord> },

    /// A member carries a role this crate does not know.
    UnknownRole { role: String },

    /// A modifier tag (e.g. `except`) is present but not honored.
    UnsupportedModifier { tag: &'static str },

    /// A member references a node absent from the dataset.
    UnknownNodeRef { id: i64 },

    /// A member references a way absent from the dataset (or one too
    /// degenerate to keep).
    UnknownWayRef { id: i64 },

    /// A member is itself a relation, which is not supported.
    NestedRelation { id: i64 },

    /// The relation lacks a `restriction` tag.
    MissingKind,

    /// The relation lacks a 'from' way.
    MissingFromWay { to_start: Option<Coord> },

    /// The relation lacks a 'to' way.
    MissingToWay { from_end: Option<Coord> },

    /// No 'via' member was given and the 'from' and 'to' ways share no point.
    WaysDoNotConnect,

    /// No 'via' member was given and the 'from' and 'to' ways share more
    /// than one point.
    AmbiguousVia { first: Coord },

    /// No 'via' member was given; the single shared point was adopted.
    ViaInferred { at: Coord },

    /// The 'from' way neither starts nor ends at the via point.
    FromWayNotAtVia { via: Coord },

    /// The 'to' way neither starts nor ends at the via point.
    ToWayNotAtVia { via: Coord },

    /// The via coordinate resolved to two different graph nodes;
    /// the first binding was kept.
    ViaRedefined { kept: Coord, rejected: Coord },

    /// A `no_turn_*` spelling was accepted in place of the canonical
    /// `no_X_turn` form.
    DeprecatedKind { kind: String },

    /// The `restriction` tag value is not part of the handled vocabulary.
    UnsupportedKind { kind: String },

    /// A graph restriction was handed to the road network.
    Emitted {
        kind: String,
        via: Coord,
        blocked: Coord,
    },
}

impl Diagnostic {
    pub fn severity(&self) -> Severity {
        match self.kind {
            DiagnosticKind::Emitted { .. } => Severity::Info,

            DiagnosticKind::UnknownRole { .. }
            | DiagnosticKind::UnsupportedModifier { .. }
            | DiagnosticKind::UnknownNodeRef { .. }
            | DiagnosticKind::UnknownWayRef { .. }
            | DiagnosticKind::NestedRelation { .. }
            | DiagnosticKind::ViaInferred { .. }
            | DiagnosticKind::DeprecatedKind { .. } => Severity::Warning,

            _ => Severity::Error,
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "turn restriction {} ", self.relation)?;
        match &self.kind {
            DiagnosticKind::DuplicateMember { role, first_at } => {
                write!(f, "has multiple '{role}' members")?;
                if let Some(at) = first_at {
                    write!(
                        f,
                        " - first '{role}' member starts at {}",
                        at.to_degree_string()
                    )?;
                }
                Ok(())
            }
            DiagnosticKind::MemberNotAWay { role } => {
                write!(f, "'{role}' member should be a way but is a node")
            }
            DiagnosticKind::ViaIsNotANode { way_start } => {
                write!(f, "'via' member is not a node")?;
                if let Some(at) = way_start {
                    write!(f, " ('via' way starts at {})", at.to_degree_string())?;
                }
                Ok(())
            }
            DiagnosticKind::UnknownRole { role } => {
                write!(f, "has unknown member role '{role}'")
            }
            DiagnosticKind::UnsupportedModifier { tag } => {
                write!(f, "ignoring unsupported '{tag}' tag")
            }
            DiagnosticKind::UnknownNodeRef { id } => {
                write!(f, "references unknown node {id}")
            }
            DiagnosticKind::UnknownWayRef { id } => {
                write!(f, "references unknown way {id}")
            }
            DiagnosticKind::NestedRelation { id } => {
                write!(f, "has a relation member ({id}), which is not supported")
            }
            DiagnosticKind::MissingKind => {
                write!(f, "lacks 'restriction' tag (e.g. no_left_turn)")
            }
            DiagnosticKind::MissingFromWay { to_start } => {
                write!(f, "lacks 'from' way")?;
                if let Some(at) = to_start {
                    write!(f, " ('to' way starts at {})", at.to_degree_string())?;
                }
                Ok(())
            }
            DiagnosticKind::MissingToWay { from_end } => {
                write!(f, "lacks 'to' way")?;
                if let Some(at) = from_end {
                    write!(f, " ('from' way ends at {})", at.to_degree_string())?;
                }
                Ok(())
            }
            DiagnosticKind::WaysDoNotConnect => {
                write!(f, "lacks 'via' node and the 'from' and 'to' ways don't connect")
            }
            DiagnosticKind::AmbiguousVia { first } => {
                write!(
                    f,
                    "lacks 'via' node and the 'from' and 'to' ways connect in more \
                     than one place - first connection is at {}",
                    first.to_degree_string()
                )
            }
            DiagnosticKind::ViaInferred { at } => {
                write!(
                    f,
                    "lacks 'via' node (guessing it should be at {}, why don't you \
                     add it to the OSM data?)",
                    at.to_degree_string()
                )
            }
            DiagnosticKind::FromWayNotAtVia { via } => {
                write!(
                    f,
                    "'from' way doesn't start or end at 'via' node ({})",
                    via.to_degree_string()
                )
            }
            DiagnosticKind::ToWayNotAtVia { via } => {
                write!(
                    f,
                    "'to' way doesn't start or end at 'via' node ({})",
                    via.to_degree_string()
                )
            }
            DiagnosticKind::ViaRedefined { kept, rejected } => {
                write!(
                    f,
                    "'via' node redefined from {} to {}",
                    kept.to_degree_string(),
                    rejected.to_degree_string()
                )
            }
            DiagnosticKind::DeprecatedKind { kind } => {
                write!(
                    f,
                    "has bad type '{kind}' - it should be of the form no_X_turn \
                     rather than no_turn_X"
                )
            }
            DiagnosticKind::UnsupportedKind { kind } => {
                write!(f, "has unsupported type '{kind}'")
            }
            DiagnosticKind::Emitted { kind, via, blocked } => {
                write!(
                    f,
                    "({kind}) added at {} (blocked routing to {})",
                    via.to_degree_string(),
                    blocked.to_degree_string()
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities() {
        let d = |kind| Diagnostic { relation: 1, kind };
        assert_eq!(
            d(DiagnosticKind::Emitted {
                kind: "no_left_turn".to_string(),
                via: Coord::from_degrees(0.0, 0.0),
                blocked: Coord::from_degrees(0.0, 0.0),
            })
            .severity(),
            Severity::Info,
        );
        assert_eq!(
            d(DiagnosticKind::ViaInferred {
                at: Coord::from_degrees(0.0, 0.0)
            })
            .severity(),
            Severity::Warning,
        );
        assert_eq!(d(DiagnosticKind::MissingKind).severity(), Severity::Error);
        assert_eq!(
            d(DiagnosticKind::DuplicateMember {
                role: "to",
                first_at: None
            })
            .severity(),
            Severity::Error,
        );
    }

    #[test]
    fn display_includes_relation_and_coordinates() {
        let d = Diagnostic {
            relation: -200,
            kind: DiagnosticKind::ViaInferred {
                at: Coord::from_degrees(1.5, -2.25),
            },
        };
        assert_eq!(
            d.to_string(),
            "turn restriction -200 lacks 'via' node (guessing it should be at \
             (1.500000, -2.250000), why don't you add it to the OSM data?)"
        );

        let d = Diagnostic {
            relation: 7,
            kind: DiagnosticKind::MissingKind,
        };
        assert_eq!(
            d.to_string(),
            "turn restriction 7 lacks 'restriction' tag (e.g. no_left_turn)"
        );
    }
}
