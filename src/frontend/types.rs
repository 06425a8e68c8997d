use std::fmt;

/// Mini types. Ints and bools occupy one 4-byte word; struct values are
/// pointers to heap cells, so every declared variable and field is
/// word-sized. `Null` is the type of the null literal only and `Void`
/// appears only as a function return annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Bool,
    Struct(String),
    Null,
    Void,
}

impl Type {
    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct(_))
    }

    /// Whether a value of type `source` may be stored into a location of
    /// type `self`: identical types, or null into any struct slot.
    pub fn accepts(&self, source: &Type) -> bool {
        self == source || (self.is_struct() && *source == Type::Null)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Bool => write!(f, "bool"),
            Type::Struct(name) => write!(f, "struct {}", name),
            Type::Null => write!(f, "null"),
            Type::Void => write!(f, "void"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_equality_is_by_name() {
        assert_eq!(
            Type::Struct("Node".into()),
            Type::Struct("Node".into())
        );
        assert_ne!(
            Type::Struct("Node".into()),
            Type::Struct("List".into())
        );
    }

    #[test]
    fn null_assignable_to_structs_only() {
        let node = Type::Struct("Node".into());
        assert!(node.accepts(&Type::Null));
        assert!(!Type::Int.accepts(&Type::Null));
        assert!(!Type::Bool.accepts(&Type::Null));
        assert!(!Type::Null.accepts(&node));
    }

    #[test]
    fn no_cross_type_coercions() {
        assert!(!Type::Int.accepts(&Type::Bool));
        assert!(!Type::Bool.accepts(&Type::Int));
        assert!(Type::Int.accepts(&Type::Int));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Type::Struct("N".into()).to_string(), "struct N");
        assert_eq!(Type::Int.to_string(), "int");
        assert_eq!(Type::Void.to_string(), "void");
    }
}
