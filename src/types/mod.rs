//! Core identifier newtypes and source positions shared across the crate.
//!
//! Arena handles (`NodeId`, `SymId`, `TypeId`, `FileIdx`) index into the
//! checked-program snapshot; `ProjectId` identifies one indexer project
//! generation. All are NonZeroU32 so `Option<Id>` stays pointer-sized.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(NonZeroU32);

        impl $name {
            pub fn new(value: u32) -> Option<Self> {
                NonZeroU32::new(value).map(Self)
            }

            /// Index into the owning arena (ids start at 1).
            pub fn index(self) -> usize {
                (self.0.get() - 1) as usize
            }

            pub fn value(self) -> u32 {
                self.0.get()
            }

            pub fn from_index(index: usize) -> Self {
                Self(NonZeroU32::new(index as u32 + 1).expect("index + 1 overflows u32"))
            }
        }
    };
}

id_newtype!(
    /// Handle of a syntax node in the program snapshot.
    NodeId
);
id_newtype!(
    /// Handle of a checker symbol in the program snapshot.
    SymId
);
id_newtype!(
    /// Handle of a checker type in the program snapshot.
    TypeId
);
id_newtype!(
    /// Handle of a source file in the program snapshot.
    FileIdx
);
id_newtype!(
    /// One project generation inside a multi-project run.
    ProjectId
);

/// Half-open byte span inside one source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.start && offset < self.end
    }
}

/// Zero-based line/character position, LSP style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LsPosition {
    pub line: u32,
    pub character: u32,
}

impl LsPosition {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Position pair used by range vertices and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LsRange {
    pub start: LsPosition,
    pub end: LsPosition,
}

impl LsRange {
    pub fn new(start: LsPosition, end: LsPosition) -> Self {
        Self { start, end }
    }

    /// True when `other` starts and ends inside `self`.
    pub fn encloses(&self, other: &LsRange) -> bool {
        let starts_before = self.start.line < other.start.line
            || (self.start.line == other.start.line
                && self.start.character <= other.start.character);
        let ends_after = self.end.line > other.end.line
            || (self.end.line == other.end.line && self.end.character >= other.end.character);
        starts_before && ends_after
    }
}
