use thiserror::Error;

use crate::frontend::types::Type;

/// Semantic faults reported by the analyzer. Each carries the 1-based
/// source line it was detected on; collection is append-only and the
/// driver sorts by line before printing.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error("duplicate struct `{name}`")]
    DuplicateStruct { name: String, line: u32 },

    #[error("duplicate function `{name}`")]
    DuplicateFunction { name: String, line: u32 },

    #[error("redeclaration of `{name}`")]
    DuplicateInScope { name: String, line: u32 },

    #[error("unknown struct `{name}`")]
    UnknownStruct { name: String, line: u32 },

    #[error("unknown function `{name}`")]
    UnknownFunction { name: String, line: u32 },

    #[error("unknown name `{name}`")]
    UnknownName { name: String, line: u32 },

    #[error("struct `{strukt}` has no field `{field}`")]
    UnknownField {
        strukt: String,
        field: String,
        line: u32,
    },

    #[error("`{name}` expects {expected} argument(s), got {found}")]
    ArityMismatch {
        name: String,
        expected: usize,
        found: usize,
        line: u32,
    },

    #[error("type mismatch: {message}")]
    TypeMismatch { message: String, line: u32 },

    #[error("condition must be bool, found {found}")]
    InvalidCondition { found: Type, line: u32 },

    #[error("invalid return: {message}")]
    InvalidReturn { message: String, line: u32 },

    #[error("missing return in non-void function `{function}`")]
    MissingReturn { function: String, line: u32 },

    #[error("delete requires a struct value, found {found}")]
    InvalidDelete { found: Type, line: u32 },

    #[error("print requires an int value, found {found}")]
    InvalidPrintOperand { found: Type, line: u32 },

    #[error("read target must be int, found {found}")]
    InvalidReadTarget { found: Type, line: u32 },
}

impl Diagnostic {
    pub fn line(&self) -> u32 {
        match self {
            Diagnostic::DuplicateStruct { line, .. }
            | Diagnostic::DuplicateFunction { line, .. }
            | Diagnostic::DuplicateInScope { line, .. }
            | Diagnostic::UnknownStruct { line, .. }
            | Diagnostic::UnknownFunction { line, .. }
            | Diagnostic::UnknownName { line, .. }
            | Diagnostic::UnknownField { line, .. }
            | Diagnostic::ArityMismatch { line, .. }
            | Diagnostic::TypeMismatch { line, .. }
            | Diagnostic::InvalidCondition { line, .. }
            | Diagnostic::InvalidReturn { line, .. }
            | Diagnostic::MissingReturn { line, .. }
            | Diagnostic::InvalidDelete { line, .. }
            | Diagnostic::InvalidPrintOperand { line, .. }
            | Diagnostic::InvalidReadTarget { line, .. } => *line,
        }
    }
}

/// Byte-offset to 1-based line conversion for the current source file.
/// The parser threads this through its actions so every AST node records
/// the line it started on.
pub struct LineMap {
    line_starts: Vec<usize>,
}

impl LineMap {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        LineMap { line_starts }
    }

    pub fn line_of(&self, offset: usize) -> u32 {
        self.line_starts.partition_point(|&start| start <= offset) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_of_maps_offsets_to_lines() {
        let map = LineMap::new("ab\ncd\n\nef");
        assert_eq!(map.line_of(0), 1);
        assert_eq!(map.line_of(2), 1);
        assert_eq!(map.line_of(3), 2);
        assert_eq!(map.line_of(6), 3);
        assert_eq!(map.line_of(7), 4);
    }

    #[test]
    fn single_line_source() {
        let map = LineMap::new("abc");
        assert_eq!(map.line_of(0), 1);
        assert_eq!(map.line_of(2), 1);
    }

    #[test]
    fn diagnostic_messages_name_the_fault() {
        let d = Diagnostic::UnknownField {
            strukt: "N".into(),
            field: "prev".into(),
            line: 7,
        };
        assert_eq!(d.to_string(), "struct `N` has no field `prev`");
        assert_eq!(d.line(), 7);
    }
}
