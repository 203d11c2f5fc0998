//! Static edge-shape schema.
//!
//! One table maps each edge label to its permitted (outV kind, inV kind)
//! pairs; a single generic [`validate`] consults it. Any violation is fatal
//! for the dump.

use super::{Edge, Id};
use crate::error::{IndexError, IndexResult};

/// Permitted (outV label, inV label) pairs for one edge label.
struct EdgeRule {
    label: &'static str,
    pairs: &'static [(&'static str, &'static str)],
}

static RULES: &[EdgeRule] = &[
    EdgeRule {
        label: "contains",
        pairs: &[("project", "document"), ("document", "range")],
    },
    EdgeRule {
        label: "next",
        pairs: &[("range", "resultSet"), ("resultSet", "resultSet")],
    },
    // Item edges target ranges, a result of the same kind (cascades), or
    // monikers (reference/implementation links).
    EdgeRule {
        label: "item",
        pairs: &[
            ("declarationResult", "range"),
            ("declarationResult", "declarationResult"),
            ("declarationResult", "moniker"),
            ("definitionResult", "range"),
            ("definitionResult", "definitionResult"),
            ("definitionResult", "moniker"),
            ("typeDefinitionResult", "range"),
            ("typeDefinitionResult", "typeDefinitionResult"),
            ("typeDefinitionResult", "moniker"),
            ("referenceResult", "range"),
            ("referenceResult", "referenceResult"),
            ("referenceResult", "moniker"),
            ("implementationResult", "range"),
            ("implementationResult", "implementationResult"),
            ("implementationResult", "moniker"),
        ],
    },
    EdgeRule {
        label: "moniker",
        pairs: &[
            ("range", "moniker"),
            ("resultSet", "moniker"),
            ("declarationResult", "moniker"),
            ("definitionResult", "moniker"),
            ("typeDefinitionResult", "moniker"),
            ("referenceResult", "moniker"),
            ("implementationResult", "moniker"),
        ],
    },
    EdgeRule {
        label: "attach",
        pairs: &[("moniker", "moniker")],
    },
    EdgeRule {
        label: "packageInformation",
        pairs: &[("moniker", "packageInformation")],
    },
    EdgeRule {
        label: "textDocument/definition",
        pairs: &[
            ("range", "definitionResult"),
            ("resultSet", "definitionResult"),
        ],
    },
    EdgeRule {
        label: "textDocument/declaration",
        pairs: &[
            ("range", "declarationResult"),
            ("resultSet", "declarationResult"),
        ],
    },
    EdgeRule {
        label: "textDocument/typeDefinition",
        pairs: &[
            ("range", "typeDefinitionResult"),
            ("resultSet", "typeDefinitionResult"),
        ],
    },
    EdgeRule {
        label: "textDocument/hover",
        pairs: &[("range", "hoverResult"), ("resultSet", "hoverResult")],
    },
    EdgeRule {
        label: "textDocument/references",
        pairs: &[
            ("range", "referenceResult"),
            ("resultSet", "referenceResult"),
        ],
    },
    EdgeRule {
        label: "textDocument/implementation",
        pairs: &[
            ("range", "implementationResult"),
            ("resultSet", "implementationResult"),
        ],
    },
    EdgeRule {
        label: "textDocument/documentSymbol",
        pairs: &[("document", "documentSymbolResult")],
    },
    EdgeRule {
        label: "textDocument/foldingRange",
        pairs: &[("document", "foldingRangeResult")],
    },
    EdgeRule {
        label: "textDocument/documentLink",
        pairs: &[("document", "documentLinkResult")],
    },
    EdgeRule {
        label: "textDocument/diagnostic",
        pairs: &[
            ("document", "diagnosticResult"),
            ("project", "diagnosticResult"),
        ],
    },
];

fn rule_for(label: &str) -> &'static EdgeRule {
    RULES
        .iter()
        .find(|rule| rule.label == label)
        .expect("every edge label has a schema rule")
}

/// Check one edge against the schema. `label_of` resolves an id to the label
/// of the already-emitted vertex, or `None` when the vertex was never seen.
pub fn validate(
    edge: &Edge,
    label_of: impl Fn(&Id) -> Option<&'static str>,
) -> IndexResult<()> {
    let rule = rule_for(edge.label());

    let out_label = label_of(edge.out_v()).ok_or_else(|| IndexError::DanglingEdge {
        id: edge.out_v().to_string(),
    })?;
    if !rule.pairs.iter().any(|(out, _)| *out == out_label) {
        return Err(IndexError::IllegalEdge {
            label: rule.label,
            out_label,
            in_label: "-",
        });
    }

    for in_id in edge.in_ids() {
        let in_label = label_of(in_id).ok_or_else(|| IndexError::DanglingEdge {
            id: in_id.to_string(),
        })?;
        let permitted = rule
            .pairs
            .iter()
            .any(|(out, inbound)| *out == out_label && *inbound == in_label);
        if !permitted {
            return Err(IndexError::IllegalEdge {
                label: rule.label,
                out_label,
                in_label,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ItemEdge, ItemProperty, MultiEdge, SingleEdge};
    use std::collections::HashMap;

    fn lookup<'a>(map: &'a HashMap<u32, &'static str>) -> impl Fn(&Id) -> Option<&'static str> + 'a {
        move |id| match id {
            Id::Number(n) => map.get(n).copied(),
            Id::Uuid(_) => None,
        }
    }

    #[test]
    fn test_contains_accepts_document_to_range() {
        let mut labels = HashMap::new();
        labels.insert(1, "document");
        labels.insert(2, "range");
        let edge = Edge::Contains(MultiEdge {
            out_v: Id::Number(1),
            in_vs: vec![Id::Number(2)],
        });
        assert!(validate(&edge, lookup(&labels)).is_ok());
    }

    #[test]
    fn test_contains_rejects_range_to_document() {
        let mut labels = HashMap::new();
        labels.insert(1, "range");
        labels.insert(2, "document");
        let edge = Edge::Contains(MultiEdge {
            out_v: Id::Number(1),
            in_vs: vec![Id::Number(2)],
        });
        assert!(matches!(
            validate(&edge, lookup(&labels)),
            Err(IndexError::IllegalEdge { .. })
        ));
    }

    #[test]
    fn test_contains_rejects_cross_product_pairs() {
        // Both ends are legal for *some* contains edge, but not paired with
        // each other: project→range and document→document must fail.
        let mut labels = HashMap::new();
        labels.insert(1, "project");
        labels.insert(2, "range");
        let edge = Edge::Contains(MultiEdge {
            out_v: Id::Number(1),
            in_vs: vec![Id::Number(2)],
        });
        assert!(matches!(
            validate(&edge, lookup(&labels)),
            Err(IndexError::IllegalEdge { .. })
        ));

        let mut labels = HashMap::new();
        labels.insert(1, "document");
        labels.insert(2, "document");
        let edge = Edge::Contains(MultiEdge {
            out_v: Id::Number(1),
            in_vs: vec![Id::Number(2)],
        });
        assert!(matches!(
            validate(&edge, lookup(&labels)),
            Err(IndexError::IllegalEdge { .. })
        ));
    }

    #[test]
    fn test_dangling_out_vertex_is_reported() {
        let labels = HashMap::new();
        let edge = Edge::Next(SingleEdge {
            out_v: Id::Number(1),
            in_v: Id::Number(2),
        });
        assert!(matches!(
            validate(&edge, lookup(&labels)),
            Err(IndexError::DanglingEdge { .. })
        ));
    }

    #[test]
    fn test_item_cascade_must_match_result_kind() {
        let mut labels = HashMap::new();
        labels.insert(1, "referenceResult");
        labels.insert(2, "definitionResult");
        let edge = Edge::Item(ItemEdge {
            out_v: Id::Number(1),
            in_vs: vec![Id::Number(2)],
            shard: Id::Number(9),
            property: Some(ItemProperty::ReferenceResults),
        });
        assert!(validate(&edge, lookup(&labels)).is_err());

        labels.insert(2, "referenceResult");
        let edge = Edge::Item(ItemEdge {
            out_v: Id::Number(1),
            in_vs: vec![Id::Number(2)],
            shard: Id::Number(9),
            property: Some(ItemProperty::ReferenceResults),
        });
        assert!(validate(&edge, lookup(&labels)).is_ok());
    }

    #[test]
    fn test_item_accepts_moniker_targets() {
        let mut labels = HashMap::new();
        labels.insert(1, "referenceResult");
        labels.insert(2, "moniker");
        let edge = Edge::Item(ItemEdge {
            out_v: Id::Number(1),
            in_vs: vec![Id::Number(2)],
            shard: Id::Number(9),
            property: Some(ItemProperty::ReferenceLinks),
        });
        assert!(validate(&edge, lookup(&labels)).is_ok());
    }

    #[test]
    fn test_every_edge_label_has_a_rule() {
        for label in [
            "contains",
            "next",
            "item",
            "moniker",
            "attach",
            "packageInformation",
            "textDocument/definition",
            "textDocument/declaration",
            "textDocument/typeDefinition",
            "textDocument/hover",
            "textDocument/references",
            "textDocument/implementation",
            "textDocument/documentSymbol",
            "textDocument/foldingRange",
            "textDocument/documentLink",
            "textDocument/diagnostic",
        ] {
            assert!(!rule_for(label).pairs.is_empty());
        }
    }
}
