use std::fmt;

use crate::expression::{Condition, Expression, TEXT_PATH, TextQuery};

/// Stable handle of a node inside a [`MatchTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arena form of [`Expression`]. Children are referenced by [`NodeId`].
#[derive(Debug, Clone)]
pub enum Node {
    And(Vec<NodeId>),
    Or(Vec<NodeId>),
    Nor(Vec<NodeId>),
    Not(NodeId),
    ElemMatchObject { path: String, child: NodeId },
    ElemMatchValue { path: String, children: Vec<NodeId> },
    Leaf { path: String, condition: Condition },
    Text(TextQuery),
    Where(String),
    AlwaysTrue,
    AlwaysFalse,
}

impl Node {
    pub fn children(&self) -> &[NodeId] {
        match self {
            Node::And(c) | Node::Or(c) | Node::Nor(c) => c,
            Node::ElemMatchValue { children, .. } => children,
            Node::Not(child) | Node::ElemMatchObject { child, .. } => std::slice::from_ref(child),
            Node::Leaf { .. }
            | Node::Text(_)
            | Node::Where(_)
            | Node::AlwaysTrue
            | Node::AlwaysFalse => &[],
        }
    }

    /// The path this node is about. Logical nodes have none.
    pub fn path(&self) -> Option<&str> {
        match self {
            Node::Leaf { path, .. }
            | Node::ElemMatchObject { path, .. }
            | Node::ElemMatchValue { path, .. } => Some(path),
            Node::Text(_) => Some(TEXT_PATH),
            _ => None,
        }
    }

    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Node::Leaf { condition, .. } => Some(condition),
            _ => None,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn is_geo(&self) -> bool {
        self.condition().is_some_and(Condition::is_geo)
    }
}

/// An immutable predicate tree stored in an arena.
///
/// Nodes are appended children-first, so a parent always has a larger id
/// than any of its descendants and the root is the last node.
#[derive(Debug, Clone)]
pub struct MatchTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl MatchTree {
    pub fn new(expr: Expression) -> Self {
        let mut nodes = Vec::new();
        let root = lower(&mut nodes, expr);
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).children()
    }

    pub fn path(&self, id: NodeId) -> Option<&str> {
        self.node(id).path()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All ids in the subtree rooted at `id`, parents before children.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev());
        }
        out
    }

    /// Whether any node in the tree is a `$text` search.
    pub fn has_text(&self) -> bool {
        self.nodes.iter().any(Node::is_text)
    }
}

impl From<Expression> for MatchTree {
    fn from(expr: Expression) -> Self {
        MatchTree::new(expr)
    }
}

fn push(nodes: &mut Vec<Node>, node: Node) -> NodeId {
    let id = NodeId(nodes.len() as u32);
    nodes.push(node);
    id
}

fn lower_all(nodes: &mut Vec<Node>, children: Vec<Expression>) -> Vec<NodeId> {
    children.into_iter().map(|c| lower(nodes, c)).collect()
}

fn lower(nodes: &mut Vec<Node>, expr: Expression) -> NodeId {
    let node = match expr {
        Expression::And(children) => Node::And(lower_all(nodes, children)),
        Expression::Or(children) => Node::Or(lower_all(nodes, children)),
        Expression::Nor(children) => Node::Nor(lower_all(nodes, children)),
        Expression::Not(child) => Node::Not(lower(nodes, *child)),
        Expression::ElemMatchObject(path, child) => {
            let child = lower(nodes, *child);
            Node::ElemMatchObject { path, child }
        }
        Expression::ElemMatchValue(path, children) => {
            let children = lower_all(nodes, children);
            Node::ElemMatchValue { path, children }
        }
        Expression::Leaf(path, condition) => Node::Leaf { path, condition },
        Expression::Text(query) => Node::Text(query),
        Expression::Where(code) => Node::Where(code),
        Expression::AlwaysTrue => Node::AlwaysTrue,
        Expression::AlwaysFalse => Node::AlwaysFalse,
    };
    push(nodes, node)
}
