use std::collections::HashMap;

use crate::frontend::types::Type;

/// Ordered field list of a declared struct.
#[derive(Debug, Clone)]
pub struct StructInfo {
    pub fields: Vec<(String, Type)>,
}

impl StructInfo {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|(f, _)| f == name)
    }

    pub fn field_type(&self, name: &str) -> Option<&Type> {
        self.fields
            .iter()
            .find(|(f, _)| f == name)
            .map(|(_, t)| t)
    }
}

/// Struct declarations by name. Populated in the collection pass and
/// read-only afterwards.
#[derive(Debug, Default)]
pub struct StructTable {
    table: HashMap<String, StructInfo>,
}

impl StructTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a struct. Returns false if the name is already taken.
    pub fn insert(&mut self, name: &str, info: StructInfo) -> bool {
        if self.table.contains_key(name) {
            return false;
        }
        self.table.insert(name.to_string(), info);
        true
    }

    pub fn get(&self, name: &str) -> Option<&StructInfo> {
        self.table.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }
}

/// Parameter and return types of a declared function.
#[derive(Debug, Clone)]
pub struct Signature {
    pub params: Vec<Type>,
    pub ret: Type,
}

/// Function signatures by name. Populated in the collection pass and
/// read-only afterwards.
#[derive(Debug, Default)]
pub struct FunctionTable {
    table: HashMap<String, Signature>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a signature. Returns false if the name is already taken.
    pub fn insert(&mut self, name: &str, sig: Signature) -> bool {
        if self.table.contains_key(name) {
            return false;
        }
        self.table.insert(name.to_string(), sig);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Signature> {
        self.table.get(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Global,
    Parameter,
    Local,
}

#[derive(Debug, Clone)]
pub struct ValueEntry {
    pub ty: Type,
    pub class: StorageClass,
}

/// Lexically nested value scopes. Lookup walks from the innermost scope
/// outwards; the first hit wins, so inner declarations shadow outer ones.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<HashMap<String, ValueEntry>>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop().expect("scope stack underflow");
    }

    /// Declares a name in the innermost scope. Returns false on a
    /// same-scope redeclaration; shadowing an outer scope is fine.
    pub fn declare(&mut self, name: &str, ty: Type, class: StorageClass) -> bool {
        let scope = self.scopes.last_mut().expect("no open scope");
        if scope.contains_key(name) {
            return false;
        }
        scope.insert(name.to_string(), ValueEntry { ty, class });
        true
    }

    pub fn resolve(&self, name: &str) -> Option<&ValueEntry> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_table_rejects_duplicates() {
        let mut table = StructTable::new();
        let info = StructInfo {
            fields: vec![("v".into(), Type::Int)],
        };
        assert!(table.insert("N", info.clone()));
        assert!(!table.insert("N", info));
        assert!(table.contains("N"));
    }

    #[test]
    fn field_queries_follow_declaration_order() {
        let info = StructInfo {
            fields: vec![
                ("v".into(), Type::Int),
                ("next".into(), Type::Struct("N".into())),
            ],
        };
        assert_eq!(info.field_index("v"), Some(0));
        assert_eq!(info.field_index("next"), Some(1));
        assert_eq!(info.field_type("next"), Some(&Type::Struct("N".into())));
        assert_eq!(info.field_index("missing"), None);
    }

    #[test]
    fn function_table_rejects_duplicates() {
        let mut table = FunctionTable::new();
        let sig = Signature {
            params: vec![Type::Int],
            ret: Type::Void,
        };
        assert!(table.insert("f", sig.clone()));
        assert!(!table.insert("f", sig));
        assert_eq!(table.get("f").unwrap().params.len(), 1);
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        assert!(scopes.declare("x", Type::Int, StorageClass::Global));
        scopes.push();
        assert!(scopes.declare("x", Type::Bool, StorageClass::Local));
        assert_eq!(scopes.resolve("x").unwrap().ty, Type::Bool);
        scopes.pop();
        assert_eq!(scopes.resolve("x").unwrap().ty, Type::Int);
    }

    #[test]
    fn same_scope_redeclaration_fails() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        assert!(scopes.declare("x", Type::Int, StorageClass::Local));
        assert!(!scopes.declare("x", Type::Int, StorageClass::Local));
    }

    #[test]
    fn resolve_misses_popped_scopes() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.push();
        scopes.declare("tmp", Type::Int, StorageClass::Local);
        scopes.pop();
        assert!(scopes.resolve("tmp").is_none());
    }
}
