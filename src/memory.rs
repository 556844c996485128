use crate::ast::{Ast, NodeId};
use crate::value::Value;

/// A named cell. `anchor` is the AST node whose subtree can see it;
/// `None` makes it global.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: Value,
    /// Parameter list when the value is callable.
    pub params: Option<NodeId>,
    pub anchor: Option<NodeId>,
}

/// Flat table of bindings. Newer entries shadow older ones; removed entries
/// leave a tombstone so indices stay stable.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    slots: Vec<Option<Binding>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a global binding without checking for an existing one.
    pub fn seed(&mut self, name: &str, value: Value) {
        self.slots.push(Some(Binding {
            name: name.to_string(),
            value,
            params: None,
            anchor: None,
        }));
    }

    /// Index of the newest binding named `name` whose anchor encloses `access`.
    pub fn lookup(&self, ast: &Ast, name: &str, access: NodeId) -> Option<usize> {
        self.slots.iter().enumerate().rev().find_map(|(index, slot)| {
            slot.as_ref()
                .filter(|binding| binding.name == name)
                .filter(|binding| ast.is_ancestor_or_self(access, binding.anchor))
                .map(|_| index)
        })
    }

    pub fn get(&self, index: usize) -> Option<&Binding> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn resolve(&self, ast: &Ast, name: &str, access: NodeId) -> Option<&Binding> {
        self.lookup(ast, name, access).and_then(|index| self.get(index))
    }

    /// Updates the visible binding in place, or creates one anchored at `access`.
    pub fn store(
        &mut self,
        ast: &Ast,
        name: &str,
        value: Value,
        params: Option<NodeId>,
        access: NodeId,
    ) -> usize {
        if let Some(index) = self.lookup(ast, name, access) {
            if let Some(binding) = self.slots[index].as_mut() {
                tracing::trace!(name, index, %value, "update binding");
                binding.value = value;
                binding.params = params;
            }
            return index;
        }

        tracing::trace!(name, anchor = access.index(), %value, "new binding");
        self.slots.push(Some(Binding {
            name: name.to_string(),
            value,
            params,
            anchor: Some(access),
        }));
        self.slots.len() - 1
    }

    /// Tombstones the visible binding named `name`. Returns whether one existed.
    pub fn remove(&mut self, ast: &Ast, name: &str, access: NodeId) -> bool {
        match self.lookup(ast, name, access) {
            Some(index) => {
                tracing::trace!(name, index, "remove binding");
                self.slots[index] = None;
                true
            }
            None => false,
        }
    }

    /// Live bindings, newest first.
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.slots.iter().rev().flatten()
    }

    /// Slot count including tombstones.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeTag;
    use pretty_assertions::assert_eq;

    struct Tree {
        ast: Ast,
        root: NodeId,
        body: NodeId,
        inner: NodeId,
        sibling: NodeId,
    }

    /// root -> f -> body -> if -> inner, and root -> sibling
    fn tree() -> Tree {
        let mut ast = Ast::new();
        let root = ast.add(NodeTag::Root, "root", 0);
        let function = ast.add(NodeTag::Function, "f", 0);
        let body = ast.add(NodeTag::Body, "body", 0);
        let branch = ast.add(NodeTag::If, "if", 0);
        let inner = ast.add(NodeTag::Body, "body", 0);
        let sibling = ast.add(NodeTag::Body, "body", 0);
        ast.push_child(root, function);
        ast.push_child(function, body);
        ast.push_child(body, branch);
        ast.push_child(branch, inner);
        ast.push_child(root, sibling);
        Tree {
            ast,
            root,
            body,
            inner,
            sibling,
        }
    }

    #[test]
    fn store_is_visible_in_its_subtree_only() {
        let t = tree();
        let mut memory = Memory::new();
        memory.store(&t.ast, "x", Value::Number(1.0), None, t.body);

        assert!(memory.lookup(&t.ast, "x", t.body).is_some());
        assert!(memory.lookup(&t.ast, "x", t.inner).is_some());
        assert!(memory.lookup(&t.ast, "x", t.root).is_none());
        assert!(memory.lookup(&t.ast, "x", t.sibling).is_none());
    }

    #[test]
    fn global_binding_is_visible_everywhere() {
        let t = tree();
        let mut memory = Memory::new();
        memory.seed("G", Value::Number(1.0));
        assert!(memory.lookup(&t.ast, "G", t.inner).is_some());
        assert!(memory.lookup(&t.ast, "G", t.sibling).is_some());
    }

    #[test]
    fn store_updates_visible_binding_in_place() {
        let t = tree();
        let mut memory = Memory::new();
        let outer = memory.store(&t.ast, "x", Value::Number(1.0), None, t.root);
        let again = memory.store(&t.ast, "x", Value::Number(2.0), None, t.inner);

        assert_eq!(outer, again);
        assert_eq!(memory.len(), 1);
        let binding = memory.get(outer).unwrap();
        assert_eq!(binding.value, Value::Number(2.0));
        // The anchor never moves
        assert_eq!(binding.anchor, Some(t.root));
    }

    #[test]
    fn newer_bindings_shadow_older_ones() {
        let t = tree();
        let mut memory = Memory::new();
        memory.store(&t.ast, "x", Value::Number(1.0), None, t.inner);
        memory.seed("x", Value::Number(9.0));

        let found = memory.resolve(&t.ast, "x", t.inner).unwrap();
        assert_eq!(found.value, Value::Number(9.0));
    }

    #[test]
    fn remove_leaves_a_tombstone() {
        let t = tree();
        let mut memory = Memory::new();
        memory.store(&t.ast, "a", Value::Number(1.0), None, t.root);
        memory.store(&t.ast, "b", Value::Number(2.0), None, t.root);

        assert!(memory.remove(&t.ast, "a", t.body));
        assert!(!memory.remove(&t.ast, "a", t.body));
        assert_eq!(memory.len(), 2);
        assert!(memory.lookup(&t.ast, "a", t.root).is_none());
        assert_eq!(memory.lookup(&t.ast, "b", t.root), Some(1));
        assert_eq!(memory.bindings().count(), 1);
    }

    #[test]
    fn remove_outside_scope_is_a_no_op() {
        let t = tree();
        let mut memory = Memory::new();
        memory.store(&t.ast, "x", Value::Number(1.0), None, t.body);
        assert!(!memory.remove(&t.ast, "x", t.sibling));
        assert!(memory.lookup(&t.ast, "x", t.body).is_some());
    }
}
