use std::collections::HashMap;

use crate::ast::Function;

pub const WORD_SIZE: i32 = 4;

/// Arguments beyond the eighth travel on the stack, not in `a` registers.
pub const MAX_REG_ARGS: usize = 8;

/// Per-function frame layout. Parameters and locals get word slots below
/// the saved frame pointer in declaration order:
///
/// ```text
///   caller's frame ...
///   9th+ argument      @ fp+8, fp+12, ...
///   ra                 @ fp+4
///   old fp             @ fp+0   <- fp
///   param 1            @ fp-4
///   param 2            @ fp-8
///   ...
///   local 1            @ fp-4*(P+1)
///   ...                          <- sp after the prologue
/// ```
///
/// Parameters nine and later keep their caller-pushed homes above the
/// saved `ra`, so only `min(P, 8)` parameter slots count toward the
/// frame size.
#[derive(Debug, Default)]
pub struct StackFrame {
    offsets: HashMap<String, i32>,
    size: i32,
}

impl StackFrame {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(func: &Function) -> Self {
        let mut offsets = HashMap::new();
        let mut below: i32 = 0;
        for (i, param) in func.params.iter().enumerate() {
            if i < MAX_REG_ARGS {
                below += 1;
                offsets.insert(param.name.clone(), -(below * WORD_SIZE));
            } else {
                let above = 2 * WORD_SIZE + (i - MAX_REG_ARGS) as i32 * WORD_SIZE;
                offsets.insert(param.name.clone(), above);
            }
        }
        for local in &func.locals {
            below += 1;
            offsets.insert(local.name.clone(), -(below * WORD_SIZE));
        }
        StackFrame {
            offsets,
            size: below * WORD_SIZE,
        }
    }

    /// fp-relative offset of a parameter or local, `None` for globals.
    pub fn offset_of(&self, name: &str) -> Option<i32> {
        self.offsets.get(name).copied()
    }

    /// Bytes the prologue subtracts from `sp` for parameter and local
    /// slots (the `ra`/`fp` pair is accounted separately).
    pub fn size(&self) -> i32 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::VarDecl;
    use crate::frontend::types::Type;

    fn func_with(params: &[&str], locals: &[&str]) -> Function {
        let decl = |name: &&str| VarDecl {
            name: name.to_string(),
            ty: Type::Int,
            line: 1,
        };
        Function {
            name: "f".into(),
            params: params.iter().map(decl).collect(),
            ret: Type::Void,
            locals: locals.iter().map(decl).collect(),
            body: Vec::new(),
            line: 1,
        }
    }

    #[test]
    fn params_then_locals_in_declaration_order() {
        let frame = StackFrame::new(&func_with(&["a", "b"], &["x", "y"]));
        assert_eq!(frame.offset_of("a"), Some(-4));
        assert_eq!(frame.offset_of("b"), Some(-8));
        assert_eq!(frame.offset_of("x"), Some(-12));
        assert_eq!(frame.offset_of("y"), Some(-16));
        assert_eq!(frame.size(), 16);
    }

    #[test]
    fn zero_params_zero_locals() {
        let frame = StackFrame::new(&func_with(&[], &[]));
        assert_eq!(frame.size(), 0);
        assert_eq!(frame.offset_of("anything"), None);
    }

    #[test]
    fn ninth_parameter_lives_above_the_frame() {
        let names: Vec<String> = (0..10).map(|i| format!("p{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let frame = StackFrame::new(&func_with(&refs, &["x"]));
        assert_eq!(frame.offset_of("p0"), Some(-4));
        assert_eq!(frame.offset_of("p7"), Some(-32));
        assert_eq!(frame.offset_of("p8"), Some(8));
        assert_eq!(frame.offset_of("p9"), Some(12));
        // 8 register params + 1 local
        assert_eq!(frame.offset_of("x"), Some(-36));
        assert_eq!(frame.size(), 36);
    }

    #[test]
    fn globals_do_not_resolve() {
        let frame = StackFrame::new(&func_with(&["a"], &[]));
        assert_eq!(frame.offset_of("g"), None);
    }
}
