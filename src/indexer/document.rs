//! Per-file visitor state.
//!
//! Tracks the ranges already emitted for a document (ranges are shared, not
//! duplicated), the document-symbol stack, and the file's top-level export
//! set.

use crate::graph::{Id, RangeBasedDocumentSymbol};
use crate::types::{FileIdx, Span, SymId};
use std::collections::{HashMap, HashSet};

/// One entry of the document-symbol stack. Entries are pushed for every
/// container so the stack stays balanced; only tracked entries (those with a
/// recorded definition range) surface in the result.
#[derive(Debug)]
pub struct SymbolStackEntry {
    pub range: Option<Id>,
    pub children: Vec<RangeBasedDocumentSymbol>,
}

/// Visitor state for the file currently being indexed.
#[derive(Debug)]
pub struct FileState {
    pub file: FileIdx,
    /// Document vertex id; the shard for every partition in this file.
    pub shard: Id,
    ranges: HashMap<Span, Id>,
    stack: Vec<SymbolStackEntry>,
    roots: Vec<RangeBasedDocumentSymbol>,
    pub current_exports: HashSet<SymId>,
}

impl FileState {
    pub fn new(file: FileIdx, shard: Id) -> Self {
        Self {
            file,
            shard,
            ranges: HashMap::new(),
            stack: Vec::new(),
            roots: Vec::new(),
            current_exports: HashSet::new(),
        }
    }

    pub fn range_at(&self, span: Span) -> Option<Id> {
        self.ranges.get(&span).cloned()
    }

    pub fn record_range(&mut self, span: Span, id: Id) {
        self.ranges.insert(span, id);
    }

    pub fn push_symbol(&mut self, range: Option<Id>) {
        self.stack.push(SymbolStackEntry {
            range,
            children: Vec::new(),
        });
    }

    /// Pop the innermost container; tracked entries bubble into their parent
    /// (or the file's root list).
    pub fn pop_symbol(&mut self) {
        let Some(entry) = self.stack.pop() else {
            return;
        };
        match entry.range {
            Some(range) => {
                let symbol = RangeBasedDocumentSymbol {
                    id: range,
                    children: entry.children,
                };
                match self.stack.last_mut() {
                    Some(parent) => parent.children.push(symbol),
                    None => self.roots.push(symbol),
                }
            }
            None => {
                // Untracked container: hoist its children to the parent so
                // nesting survives anonymous wrappers.
                let mut children = entry.children;
                match self.stack.last_mut() {
                    Some(parent) => parent.children.append(&mut children),
                    None => self.roots.append(&mut children),
                }
            }
        }
    }

    /// Drain the completed document-symbol tree at end of file.
    pub fn take_document_symbols(&mut self) -> Vec<RangeBasedDocumentSymbol> {
        while !self.stack.is_empty() {
            self.pop_symbol();
        }
        std::mem::take(&mut self.roots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> FileState {
        FileState::new(FileIdx::from_index(0), Id::Number(2))
    }

    #[test]
    fn test_range_dedupe_by_span() {
        let mut state = state();
        let span = Span::new(3, 7);
        assert!(state.range_at(span).is_none());
        state.record_range(span, Id::Number(9));
        assert_eq!(state.range_at(span), Some(Id::Number(9)));
    }

    #[test]
    fn test_symbol_stack_nests_children() {
        let mut state = state();
        state.push_symbol(Some(Id::Number(1)));
        state.push_symbol(Some(Id::Number(2)));
        state.pop_symbol();
        state.pop_symbol();

        let roots = state.take_document_symbols();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].id, Id::Number(1));
        assert_eq!(roots[0].children.len(), 1);
        assert_eq!(roots[0].children[0].id, Id::Number(2));
    }

    #[test]
    fn test_untracked_entry_hoists_children() {
        let mut state = state();
        state.push_symbol(Some(Id::Number(1)));
        state.push_symbol(None);
        state.push_symbol(Some(Id::Number(3)));
        state.pop_symbol();
        state.pop_symbol();
        state.pop_symbol();

        let roots = state.take_document_symbols();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].children.len(), 1);
        assert_eq!(roots[0].children[0].id, Id::Number(3));
    }

    #[test]
    fn test_unbalanced_stack_is_drained_at_end() {
        let mut state = state();
        state.push_symbol(Some(Id::Number(1)));
        state.push_symbol(Some(Id::Number(2)));
        let roots = state.take_document_symbols();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].children.len(), 1);
    }
}
