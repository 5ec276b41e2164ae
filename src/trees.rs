use std::slice::Iter;

/// A Tree that carries a value of type `K` at internal nodes and a value of
/// type `L` at leaves.
pub trait Tree<K, L>: Sized {
    /// Create a new leaf node.
    fn new_leaf(val: L) -> Self;
    /// Create a new internal node.
    fn new_node(val: K, children: Vec<Self>) -> Self;
    /// Iterate through the children of this node. Empty for a leaf.
    fn iter_children(&self) -> Iter<'_, Self>;
    /// Retrieve the node value if this is an internal node, None otherwise.
    fn node_val(&self) -> Option<&K>;
    /// Retrieve the leaf value if this is a leaf, None otherwise.
    fn leaf_val(&self) -> Option<&L>;
}

/// A parse tree returned to callers. Internal nodes carry the `Production`
/// that derived them; leaves carry the input range they matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyntaxTree<K, L> {
    /// An internal node, tagged with the production that produced it.
    Node {
        /// The value (e.g. a Production) associated with this node
        val: K,
        /// The children of this node, aligned with the production's body
        children: Vec<SyntaxTree<K, L>>
    },
    /// A leaf, tagged with the input range it matched.
    Leaf {
        /// The value (e.g. an input range) associated with this leaf
        val: L
    }
}

impl<K, L> Tree<K, L> for SyntaxTree<K, L> {
    fn new_leaf(val: L) -> Self {
        SyntaxTree::Leaf { val }
    }

    fn new_node(val: K, children: Vec<Self>) -> Self {
        SyntaxTree::Node { val, children }
    }

    fn iter_children(&self) -> Iter<'_, SyntaxTree<K, L>> {
        match self {
            SyntaxTree::Node { children, .. } => children.iter(),
            SyntaxTree::Leaf { .. } => [].iter()
        }
    }

    fn node_val(&self) -> Option<&K> {
        match self {
            SyntaxTree::Node { val, .. } => Some(val),
            SyntaxTree::Leaf { .. } => None
        }
    }

    fn leaf_val(&self) -> Option<&L> {
        match self {
            SyntaxTree::Node { .. } => None,
            SyntaxTree::Leaf { val } => Some(val)
        }
    }
}

impl<K, L> SyntaxTree<K, L> {
    /// Walk the tree and collect every leaf value, left to right.
    pub fn yield_leaves(&self) -> Vec<&L> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a L>) {
        match self {
            SyntaxTree::Leaf { val } => out.push(val),
            SyntaxTree::Node { children, .. } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }
}

use std::rc::Rc;

/// A reference-counted tree used internally while constructing a parse forest,
/// so that shared sub-derivations (common in Earley/CYK charts) aren't
/// redundantly cloned until the final tree is extracted and handed back to
/// the caller as an owned `SyntaxTree`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SharedTree<K, L> {
    Node {
        /// The value (e.g. a Production) associated with this node
        val: K,
        /// The children of this node
        children: Rc<Vec<SharedTree<K, L>>>
    },
    Leaf {
        /// The value (e.g. an input range) associated with this leaf
        val: L
    }
}

impl<K, L> Tree<K, L> for SharedTree<K, L> {
    fn new_leaf(val: L) -> Self {
        SharedTree::Leaf { val }
    }

    fn new_node(val: K, children: Vec<Self>) -> Self {
        SharedTree::Node { val, children: Rc::new(children) }
    }

    fn iter_children(&self) -> Iter<'_, SharedTree<K, L>> {
        match self {
            SharedTree::Node { children, .. } => {
                let borrowed: &Vec<Self> = children.borrow();
                borrowed.iter()
            },
            SharedTree::Leaf { .. } => [].iter()
        }
    }

    fn node_val(&self) -> Option<&K> {
        match self {
            SharedTree::Node { val, .. } => Some(val),
            SharedTree::Leaf { .. } => None
        }
    }

    fn leaf_val(&self) -> Option<&L> {
        match self {
            SharedTree::Node { .. } => None,
            SharedTree::Leaf { val } => Some(val)
        }
    }
}

use std::borrow::Borrow;

impl<K, L> From<SharedTree<K, L>> for SyntaxTree<K, L>
    where
        K: Clone,
        L: Clone {

    fn from(shared: SharedTree<K, L>) -> Self {
        match shared {
            SharedTree::Node { val, children } => {
                let children: &Vec<SharedTree<K, L>> = children.borrow();
                let children: Vec<SyntaxTree<K, L>> = children.clone().into_iter()
                    .map(SyntaxTree::from).collect();

                SyntaxTree::Node { val, children }
            },
            SharedTree::Leaf { val } => SyntaxTree::Leaf { val }
        }
    }
}

impl<K, L> From<SyntaxTree<K, L>> for SharedTree<K, L> {
    fn from(tree: SyntaxTree<K, L>) -> Self {
        match tree {
            SyntaxTree::Node { val, children } => {
                let children: Vec<SharedTree<K, L>> = children
                    .into_iter().map(SharedTree::from).collect();
                let children = Rc::new(children);

                SharedTree::Node { val, children }
            },
            SyntaxTree::Leaf { val } => SharedTree::Leaf { val }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yield_leaves_preserves_order() {
        let tree: SyntaxTree<&str, i32> = SyntaxTree::new_node("root", vec![
            SyntaxTree::new_leaf(1),
            SyntaxTree::new_node("mid", vec![
                SyntaxTree::new_leaf(2),
                SyntaxTree::new_leaf(3),
            ]),
        ]);

        assert_eq!(vec![&1, &2, &3], tree.yield_leaves());
    }

    #[test]
    fn shared_tree_round_trips_through_syntax_tree() {
        let tree: SyntaxTree<&str, i32> = SyntaxTree::new_node("root", vec![
            SyntaxTree::new_leaf(1),
            SyntaxTree::new_leaf(2),
        ]);

        let shared: SharedTree<&str, i32> = tree.clone().into();
        let back: SyntaxTree<&str, i32> = shared.into();

        assert_eq!(tree, back);
    }
}
