//! Per-(project, shard) symbol data buffers.
//!
//! A partition accumulates the ranges, cascaded results, and moniker links
//! recorded for one symbol inside one shard. When the shard closes, the
//! partition flushes as item edges carrying the shard id, in recording order.

use crate::emitter::Emitter;
use crate::error::IndexResult;
use crate::graph::{Builder, Id, ItemProperty};
use crate::types::ProjectId;
use indexmap::IndexMap;

/// Result vertex handles of the owning symbol, needed at flush time.
#[derive(Debug, Clone, Default)]
pub struct ResultIds {
    pub definition_result: Option<Id>,
    pub type_definition_result: Option<Id>,
    pub reference_result: Option<Id>,
}

#[derive(Debug)]
pub struct Partition {
    pub project: ProjectId,
    pub shard: Id,
    definition_ranges: Vec<Id>,
    type_definition_ranges: Vec<Id>,
    reference_ranges: IndexMap<ItemProperty, Vec<Id>>,
    reference_results: Vec<Id>,
    reference_cascades: Vec<Id>,
}

impl Partition {
    pub fn new(project: ProjectId, shard: Id) -> Self {
        Self {
            project,
            shard,
            definition_ranges: Vec::new(),
            type_definition_ranges: Vec::new(),
            reference_ranges: IndexMap::new(),
            reference_results: Vec::new(),
            reference_cascades: Vec::new(),
        }
    }

    pub fn add_definition(&mut self, range: Id) {
        self.definition_ranges.push(range);
    }

    pub fn add_type_definition(&mut self, range: Id) {
        self.type_definition_ranges.push(range);
    }

    pub fn add_reference_range(&mut self, range: Id, property: ItemProperty) {
        self.reference_ranges.entry(property).or_default().push(range);
    }

    pub fn add_reference_result(&mut self, result: Id) {
        self.reference_results.push(result);
    }

    pub fn add_reference_cascade(&mut self, moniker: Id) {
        self.reference_cascades.push(moniker);
    }

    pub fn is_empty(&self) -> bool {
        self.definition_ranges.is_empty()
            && self.type_definition_ranges.is_empty()
            && self.reference_ranges.is_empty()
            && self.reference_results.is_empty()
            && self.reference_cascades.is_empty()
    }

    /// Flush as item edges. The caller guarantees the result vertices were
    /// created for every non-empty bucket.
    pub fn end(
        self,
        results: &ResultIds,
        builder: &mut Builder,
        emitter: &mut dyn Emitter,
    ) -> IndexResult<()> {
        if !self.definition_ranges.is_empty() {
            let out = results
                .definition_result
                .clone()
                .expect("definition ranges imply a definition result");
            let edge = builder.item(out, self.definition_ranges, self.shard.clone(), None);
            emitter.emit(&edge)?;
        }
        if !self.type_definition_ranges.is_empty() {
            let out = results
                .type_definition_result
                .clone()
                .expect("type definition ranges imply a type definition result");
            let edge = builder.item(out, self.type_definition_ranges, self.shard.clone(), None);
            emitter.emit(&edge)?;
        }

        let reference_result = results.reference_result.clone();
        for (property, ranges) in self.reference_ranges {
            let out = reference_result
                .clone()
                .expect("reference ranges imply a reference result");
            let edge = builder.item(out, ranges, self.shard.clone(), Some(property));
            emitter.emit(&edge)?;
        }
        if !self.reference_results.is_empty() {
            let out = reference_result
                .clone()
                .expect("cascaded results imply a reference result");
            let edge = builder.item(
                out,
                self.reference_results,
                self.shard.clone(),
                Some(ItemProperty::ReferenceResults),
            );
            emitter.emit(&edge)?;
        }
        if !self.reference_cascades.is_empty() {
            let out = reference_result
                .clone()
                .expect("moniker cascades imply a reference result");
            let edge = builder.item(
                out,
                self.reference_cascades,
                self.shard.clone(),
                Some(ItemProperty::ReferenceLinks),
            );
            emitter.emit(&edge)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::MemoryEmitter;
    use crate::graph::{Counter, Edge};

    fn project(n: u32) -> ProjectId {
        ProjectId::new(n).unwrap()
    }

    #[test]
    fn test_empty_partition_emits_nothing() {
        let partition = Partition::new(project(1), Id::Number(5));
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();
        partition
            .end(&ResultIds::default(), &mut builder, &mut emitter)
            .unwrap();
        assert!(emitter.elements.is_empty());
    }

    #[test]
    fn test_partition_flushes_in_recording_order() {
        let mut partition = Partition::new(project(1), Id::Number(50));
        partition.add_definition(Id::Number(10));
        partition.add_reference_range(Id::Number(11), ItemProperty::Definitions);
        partition.add_reference_range(Id::Number(12), ItemProperty::References);
        partition.add_reference_result(Id::Number(13));
        partition.add_reference_cascade(Id::Number(14));

        let results = ResultIds {
            definition_result: Some(Id::Number(20)),
            type_definition_result: None,
            reference_result: Some(Id::Number(21)),
        };
        let mut builder = Builder::new(Box::new(Counter::new()));
        let mut emitter = MemoryEmitter::new();
        partition.end(&results, &mut builder, &mut emitter).unwrap();

        let edges: Vec<&Edge> = emitter
            .elements
            .iter()
            .map(|e| e.as_edge().unwrap())
            .collect();
        assert_eq!(edges.len(), 5);

        // Every edge carries the shard id.
        for edge in &edges {
            match edge {
                Edge::Item(item) => assert_eq!(item.shard, Id::Number(50)),
                other => panic!("unexpected edge {other:?}"),
            }
        }

        let properties: Vec<Option<ItemProperty>> = edges
            .iter()
            .map(|edge| match edge {
                Edge::Item(item) => item.property,
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(
            properties,
            vec![
                None,
                Some(ItemProperty::Definitions),
                Some(ItemProperty::References),
                Some(ItemProperty::ReferenceResults),
                Some(ItemProperty::ReferenceLinks),
            ]
        );
    }
}
