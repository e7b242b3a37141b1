//! The WPL primitive type domain.

use std::fmt;

use wplc_tree::TypeSpec;

/// A WPL type. The domain is closed: three concrete primitives plus
/// `Undefined`, which serves both as "not yet inferred" and as the
/// poisoned result of an expression that failed to check. `Undefined`
/// suppresses follow-on diagnostics against concrete types but is never
/// silently promoted to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WplType {
    Bool,
    Int,
    Str,
    Undefined,
}

impl WplType {
    /// True for the three concrete primitives.
    pub fn is_concrete(self) -> bool {
        !matches!(self, WplType::Undefined)
    }
}

impl From<TypeSpec> for WplType {
    fn from(spec: TypeSpec) -> Self {
        match spec {
            TypeSpec::Bool => WplType::Bool,
            TypeSpec::Int => WplType::Int,
            TypeSpec::Str => WplType::Str,
        }
    }
}

impl fmt::Display for WplType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WplType::Bool => write!(f, "BOOL"),
            WplType::Int => write!(f, "INT"),
            WplType::Str => write!(f, "STR"),
            WplType::Undefined => write!(f, "UNDEFINED"),
        }
    }
}
