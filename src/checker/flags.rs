//! Symbol and type flag sets reported by the external semantic analyser.
//!
//! The values mirror the analyser's own flag space so snapshots can be
//! produced by a thin serializer on the front-end side.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct SymbolFlags: u32 {
        const FUNCTION_SCOPED_VARIABLE = 1 << 0;
        const BLOCK_SCOPED_VARIABLE = 1 << 1;
        const PROPERTY = 1 << 2;
        const ENUM_MEMBER = 1 << 3;
        const FUNCTION = 1 << 4;
        const CLASS = 1 << 5;
        const INTERFACE = 1 << 6;
        const CONST_ENUM = 1 << 7;
        const REGULAR_ENUM = 1 << 8;
        const VALUE_MODULE = 1 << 9;
        const NAMESPACE_MODULE = 1 << 10;
        const TYPE_LITERAL = 1 << 11;
        const OBJECT_LITERAL = 1 << 12;
        const METHOD = 1 << 13;
        const CONSTRUCTOR = 1 << 14;
        const GET_ACCESSOR = 1 << 15;
        const SET_ACCESSOR = 1 << 16;
        const SIGNATURE = 1 << 17;
        const TYPE_PARAMETER = 1 << 18;
        const TYPE_ALIAS = 1 << 19;
        const EXPORT_VALUE = 1 << 20;
        const ALIAS = 1 << 21;
        const PROTOTYPE = 1 << 22;
        const EXPORT_STAR = 1 << 23;
        const OPTIONAL = 1 << 24;
        const TRANSIENT = 1 << 25;

        const VARIABLE = Self::FUNCTION_SCOPED_VARIABLE.bits() | Self::BLOCK_SCOPED_VARIABLE.bits();
        const MODULE = Self::VALUE_MODULE.bits() | Self::NAMESPACE_MODULE.bits();
        const ENUM = Self::CONST_ENUM.bits() | Self::REGULAR_ENUM.bits();
        const ACCESSOR = Self::GET_ACCESSOR.bits() | Self::SET_ACCESSOR.bits();
    }
}

impl Default for SymbolFlags {
    fn default() -> Self {
        SymbolFlags::empty()
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TypeFlags: u32 {
        const ANY = 1 << 0;
        const UNKNOWN = 1 << 1;
        const STRING = 1 << 2;
        const NUMBER = 1 << 3;
        const BOOLEAN = 1 << 4;
        const VOID = 1 << 5;
        const UNDEFINED = 1 << 6;
        const NULL = 1 << 7;
        const NEVER = 1 << 8;
        const LITERAL = 1 << 9;
        const TYPE_PARAMETER = 1 << 10;
        const OBJECT = 1 << 11;
        const UNION = 1 << 12;
        const INTERSECTION = 1 << 13;
        const CONDITIONAL = 1 << 14;
        const INDEX = 1 << 15;
        const INDEXED_ACCESS = 1 << 16;

        const PRIMITIVE = Self::STRING.bits()
            | Self::NUMBER.bits()
            | Self::BOOLEAN.bits()
            | Self::VOID.bits()
            | Self::UNDEFINED.bits()
            | Self::NULL.bits()
            | Self::NEVER.bits()
            | Self::LITERAL.bits();
        const UNION_OR_INTERSECTION = Self::UNION.bits() | Self::INTERSECTION.bits();
    }
}

impl Default for TypeFlags {
    fn default() -> Self {
        TypeFlags::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_flags() {
        assert!(SymbolFlags::MODULE.contains(SymbolFlags::VALUE_MODULE));
        assert!(SymbolFlags::MODULE.contains(SymbolFlags::NAMESPACE_MODULE));
        assert!(TypeFlags::UNION_OR_INTERSECTION.contains(TypeFlags::UNION));
        assert!(TypeFlags::PRIMITIVE.contains(TypeFlags::VOID));
        assert!(!TypeFlags::PRIMITIVE.contains(TypeFlags::OBJECT));
    }

    #[test]
    fn test_flags_round_trip_serde() {
        let flags = SymbolFlags::CLASS | SymbolFlags::TRANSIENT;
        let json = serde_json::to_string(&flags).unwrap();
        let back: SymbolFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(flags, back);
    }
}
