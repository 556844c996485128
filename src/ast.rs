/// AST nodes live in a single arena and refer to each other by index.
/// Children are owned by exactly one parent; the parent link is a plain
/// index used for ancestry tests and sibling traversal.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTag {
    Root,
    Body,
    Call,
    If,
    Get,
    While,
    Store,
    ArgList,
    StringLit,
    NumberLit,
    Return,
    Output,
    Input,
    Remove,
    Function,
    Operator,
    Pass,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub text: String,
    pub tag: NodeTag,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    /// Character offset of the token the node was built from.
    pub position: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a detached node and returns its id.
    pub fn add(&mut self, tag: NodeTag, text: impl Into<String>, position: usize) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            text: text.into(),
            tag,
            children: Vec::new(),
            parent: None,
            position,
        });
        id
    }

    /// Appends `child` to `parent`'s children. The parent link is set here and never again.
    pub fn push_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.nodes[child.0].parent.is_none(),
            "node {:?} already has a parent",
            child
        );
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    pub fn retag(&mut self, id: NodeId, tag: NodeTag) {
        self.nodes[id.0].tag = tag;
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn tag(&self, id: NodeId) -> NodeTag {
        self.nodes[id.0].tag
    }

    pub fn text(&self, id: NodeId) -> &str {
        &self.nodes[id.0].text
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.nodes[id.0].children.get(index).copied()
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].children.last().copied()
    }

    /// True when `candidate` is absent, is `node`, or is one of `node`'s ancestors.
    pub fn is_ancestor_or_self(&self, node: NodeId, candidate: Option<NodeId>) -> bool {
        let Some(candidate) = candidate else {
            return true;
        };
        let mut current = Some(node);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Drops every node created after the arena had `len` nodes, along with
    /// any links older nodes gained to them.
    pub fn truncate(&mut self, len: usize) {
        self.nodes.truncate(len);
        for node in &mut self.nodes {
            node.children.retain(|child| child.0 < len);
        }
    }

    /// Indented outline of the subtree under `id`, one node per line.
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.dump_into(id, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{:?} {:?}\n", node.tag, node.text));
        for &child in &node.children {
            self.dump_into(child, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestry_follows_parent_links() {
        let mut ast = Ast::new();
        let root = ast.add(NodeTag::Root, "root", 0);
        let function = ast.add(NodeTag::Function, "f", 0);
        let body = ast.add(NodeTag::Body, "body", 0);
        let get = ast.add(NodeTag::Get, "x", 0);
        let other = ast.add(NodeTag::Body, "body", 0);
        ast.push_child(root, function);
        ast.push_child(function, body);
        ast.push_child(body, get);
        ast.push_child(root, other);

        assert!(ast.is_ancestor_or_self(get, Some(body)));
        assert!(ast.is_ancestor_or_self(get, Some(root)));
        assert!(ast.is_ancestor_or_self(get, Some(get)));
        assert!(ast.is_ancestor_or_self(get, None));
        assert!(!ast.is_ancestor_or_self(get, Some(other)));
        assert!(!ast.is_ancestor_or_self(body, Some(get)));
    }

    #[test]
    fn truncate_rolls_back_root_children() {
        let mut ast = Ast::new();
        let root = ast.add(NodeTag::Root, "root", 0);
        let kept = ast.add(NodeTag::Pass, ";", 0);
        ast.push_child(root, kept);
        let len = ast.len();

        let dropped = ast.add(NodeTag::Pass, ";", 1);
        ast.push_child(root, dropped);
        ast.truncate(len);

        assert_eq!(ast.len(), 2);
        assert_eq!(ast.children(root), &[kept]);
    }
}
