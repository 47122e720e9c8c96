use crate::red_black_tree::arena::{NodeArena, NIL};
use crate::red_black_tree::node::{Color, Node};
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::mem;

/// An ordered container implemented using a red-black tree.
///
/// A red-black tree is a self-balancing binary search tree that tags each node with a color
/// bit and keeps every root-to-leaf path within twice the length of any other, so lookups,
/// insertions, and removals are all O(log n) in the worst case. Nodes live in an arena and
/// reference each other by index; the reserved nil index stands in for every absent child.
///
/// Duplicate keys are permitted and kept as separate nodes: equal keys descend into the
/// left subtree on insertion, and `remove` discards one occurrence per call.
///
/// # Examples
///
/// ```
/// use ordered_collections::red_black_tree::RedBlackTree;
///
/// let mut tree = RedBlackTree::new();
/// tree.insert(0);
/// tree.insert(3);
///
/// assert_eq!(tree.len(), 2);
/// assert!(tree.contains(&3));
///
/// assert_eq!(tree.remove(&0), Some(0));
/// assert_eq!(tree.remove(&1), None);
/// ```
#[derive(Serialize, Deserialize)]
pub struct RedBlackTree<T> {
    arena: NodeArena<T>,
    root: usize,
}

impl<T> RedBlackTree<T> {
    /// Constructs a new, empty `RedBlackTree<T>`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_collections::red_black_tree::RedBlackTree;
    ///
    /// let tree: RedBlackTree<u32> = RedBlackTree::new();
    /// ```
    pub fn new() -> Self {
        RedBlackTree {
            arena: NodeArena::new(),
            root: NIL,
        }
    }

    /// Constructs a `RedBlackTree<T>` seeded with the keys of a collection, inserted in
    /// iteration order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_collections::red_black_tree::RedBlackTree;
    ///
    /// let tree = RedBlackTree::from_collection(vec![3, 1, 2]);
    /// assert_eq!(tree.len(), 3);
    /// assert!(tree.contains(&2));
    /// ```
    pub fn from_collection<I>(collection: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Ord,
    {
        let mut tree = RedBlackTree::new();
        for key in collection {
            tree.insert(key);
        }
        tree
    }

    /// Inserts a key into the tree. Insertion always succeeds: a key equal to one already
    /// present is kept as a separate occurrence and descends into the left subtree.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_collections::red_black_tree::RedBlackTree;
    ///
    /// let mut tree = RedBlackTree::new();
    /// tree.insert(1);
    /// tree.insert(1);
    /// assert_eq!(tree.len(), 2);
    /// ```
    pub fn insert(&mut self, key: T)
    where
        T: Ord,
    {
        let mut parent = NIL;
        let mut current = self.root;
        let mut went_right = false;
        while current != NIL {
            parent = current;
            let node = &self.arena[current];
            went_right = key.cmp(&node.key) == Ordering::Greater;
            current = if went_right { node.right } else { node.left };
        }

        let index = self.arena.allocate(Node::new(key, parent));
        if parent == NIL {
            self.root = index;
        } else if went_right {
            self.arena[parent].right = index;
        } else {
            self.arena[parent].left = index;
        }

        self.insert_fix(index);
    }

    /// Returns an immutable reference to the stored key equal to `key`, or `None` if no
    /// such key exists. If duplicates are present, one of them is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_collections::red_black_tree::RedBlackTree;
    ///
    /// let mut tree = RedBlackTree::new();
    /// tree.insert(1);
    /// assert_eq!(tree.get(&0), None);
    /// assert_eq!(tree.get(&1), Some(&1));
    /// ```
    pub fn get<V>(&self, key: &V) -> Option<&T>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        match self.find_index(key) {
            NIL => None,
            index => Some(&self.arena[index].key),
        }
    }

    /// Checks if a key exists in the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_collections::red_black_tree::RedBlackTree;
    ///
    /// let mut tree = RedBlackTree::new();
    /// tree.insert(1);
    /// assert!(!tree.contains(&0));
    /// assert!(tree.contains(&1));
    /// ```
    pub fn contains<V>(&self, key: &V) -> bool
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        self.get(key).is_some()
    }

    /// Removes one occurrence of a key from the tree and returns it, or returns `None` if
    /// the key is absent.
    ///
    /// Removal splices out either the located node or its in-order successor; in the latter
    /// case the successor's key is moved into the located node, so any previously observed
    /// position of a key within the tree is invalidated by a removal.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_collections::red_black_tree::RedBlackTree;
    ///
    /// let mut tree = RedBlackTree::new();
    /// tree.insert(1);
    /// assert_eq!(tree.remove(&1), Some(1));
    /// assert_eq!(tree.remove(&1), None);
    /// ```
    pub fn remove<V>(&mut self, key: &V) -> Option<T>
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        let z = self.find_index(key);
        if z == NIL {
            return None;
        }

        // Splice target: `z` itself when it has at most one real child, otherwise the
        // in-order successor, which has no left child by construction.
        let y = if self.arena[z].left == NIL || self.arena[z].right == NIL {
            z
        } else {
            let mut successor = self.arena[z].right;
            while self.arena[successor].left != NIL {
                successor = self.arena[successor].left;
            }
            successor
        };

        let y_color = self.arena[y].color;
        let x = if self.arena[y].left != NIL {
            self.arena[y].left
        } else {
            self.arena[y].right
        };
        let parent = self.arena[y].parent;

        if x != NIL {
            self.arena[x].parent = parent;
        }
        if parent == NIL {
            self.root = x;
        } else if y == self.arena[parent].left {
            self.arena[parent].left = x;
        } else {
            self.arena[parent].right = x;
        }

        let spliced = self.arena.free(y);
        let removed = if y != z {
            mem::replace(&mut self.arena[z].key, spliced.key)
        } else {
            spliced.key
        };

        if y_color == Color::Black {
            self.remove_fix(x, parent);
        }

        Some(removed)
    }

    /// Returns the number of keys in the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_collections::red_black_tree::RedBlackTree;
    ///
    /// let mut tree = RedBlackTree::new();
    /// tree.insert(1);
    /// assert_eq!(tree.len(), 1);
    /// ```
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Returns `true` if the tree is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_collections::red_black_tree::RedBlackTree;
    ///
    /// let tree: RedBlackTree<u32> = RedBlackTree::new();
    /// assert!(tree.is_empty());
    /// ```
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the height of the tree: the number of edges on the longest path from the
    /// root to a leaf. Both the empty tree and a tree holding a single key have height 0.
    /// The height is recomputed by a full traversal on every call.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_collections::red_black_tree::RedBlackTree;
    ///
    /// let mut tree = RedBlackTree::new();
    /// assert_eq!(tree.height(), 0);
    /// tree.insert(1);
    /// assert_eq!(tree.height(), 0);
    /// tree.insert(2);
    /// assert_eq!(tree.height(), 1);
    /// ```
    pub fn height(&self) -> usize {
        if self.root == NIL {
            0
        } else {
            self.height_from(self.root) as usize
        }
    }

    /// Clears the tree, removing all keys.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordered_collections::red_black_tree::RedBlackTree;
    ///
    /// let mut tree = RedBlackTree::new();
    /// tree.insert(1);
    /// tree.insert(2);
    /// tree.clear();
    /// assert_eq!(tree.is_empty(), true);
    /// ```
    pub fn clear(&mut self) {
        self.arena.clear();
        self.root = NIL;
    }

    fn find_index<V>(&self, key: &V) -> usize
    where
        T: Borrow<V>,
        V: Ord + ?Sized,
    {
        let mut current = self.root;
        while current != NIL {
            let node = &self.arena[current];
            match key.cmp(node.key.borrow()) {
                Ordering::Less => current = node.left,
                Ordering::Greater => current = node.right,
                Ordering::Equal => return current,
            }
        }
        NIL
    }

    fn is_red(&self, index: usize) -> bool {
        index != NIL && self.arena[index].color == Color::Red
    }

    // -1 for the nil sentinel so a lone leaf sits at height zero
    fn height_from(&self, index: usize) -> isize {
        if index == NIL {
            return -1;
        }
        let left = self.height_from(self.arena[index].left);
        let right = self.height_from(self.arena[index].right);
        left.max(right) + 1
    }

    fn insert_fix(&mut self, mut index: usize) {
        while index != self.root && self.is_red(self.arena[index].parent) {
            let parent = self.arena[index].parent;
            // the parent is red, so it cannot be the root and the grandparent is real
            let grandparent = self.arena[parent].parent;
            if parent == self.arena[grandparent].left {
                let uncle = self.arena[grandparent].right;
                if self.is_red(uncle) {
                    self.arena[parent].color = Color::Black;
                    self.arena[uncle].color = Color::Black;
                    self.arena[grandparent].color = Color::Red;
                    index = grandparent;
                } else {
                    if index == self.arena[parent].right {
                        index = parent;
                        self.rotate_left(index);
                    }
                    let parent = self.arena[index].parent;
                    let grandparent = self.arena[parent].parent;
                    self.arena[parent].color = Color::Black;
                    self.arena[grandparent].color = Color::Red;
                    self.rotate_right(grandparent);
                }
            } else {
                let uncle = self.arena[grandparent].left;
                if self.is_red(uncle) {
                    self.arena[parent].color = Color::Black;
                    self.arena[uncle].color = Color::Black;
                    self.arena[grandparent].color = Color::Red;
                    index = grandparent;
                } else {
                    if index == self.arena[parent].left {
                        index = parent;
                        self.rotate_right(index);
                    }
                    let parent = self.arena[index].parent;
                    let grandparent = self.arena[parent].parent;
                    self.arena[parent].color = Color::Black;
                    self.arena[grandparent].color = Color::Red;
                    self.rotate_left(grandparent);
                }
            }
        }

        let root = self.root;
        self.arena[root].color = Color::Black;
    }

    // `parent` is threaded through explicitly so the deficiency can sit on a nil child
    // without the sentinel ever carrying a parent link.
    fn remove_fix(&mut self, mut index: usize, mut parent: usize) {
        while index != self.root && !self.is_red(index) {
            if index == self.arena[parent].left {
                let mut sibling = self.arena[parent].right;
                if self.is_red(sibling) {
                    self.arena[sibling].color = Color::Black;
                    self.arena[parent].color = Color::Red;
                    self.rotate_left(parent);
                    sibling = self.arena[parent].right;
                }

                if !self.is_red(self.arena[sibling].left) && !self.is_red(self.arena[sibling].right)
                {
                    self.arena[sibling].color = Color::Red;
                    index = parent;
                    parent = self.arena[index].parent;
                } else {
                    if !self.is_red(self.arena[sibling].right) {
                        let close_nephew = self.arena[sibling].left;
                        self.arena[close_nephew].color = Color::Black;
                        self.arena[sibling].color = Color::Red;
                        self.rotate_right(sibling);
                        sibling = self.arena[parent].right;
                    }
                    self.arena[sibling].color = self.arena[parent].color;
                    self.arena[parent].color = Color::Black;
                    let distant_nephew = self.arena[sibling].right;
                    self.arena[distant_nephew].color = Color::Black;
                    self.rotate_left(parent);
                    index = self.root;
                }
            } else {
                let mut sibling = self.arena[parent].left;
                if self.is_red(sibling) {
                    self.arena[sibling].color = Color::Black;
                    self.arena[parent].color = Color::Red;
                    self.rotate_right(parent);
                    sibling = self.arena[parent].left;
                }

                if !self.is_red(self.arena[sibling].left) && !self.is_red(self.arena[sibling].right)
                {
                    self.arena[sibling].color = Color::Red;
                    index = parent;
                    parent = self.arena[index].parent;
                } else {
                    if !self.is_red(self.arena[sibling].left) {
                        let close_nephew = self.arena[sibling].right;
                        self.arena[close_nephew].color = Color::Black;
                        self.arena[sibling].color = Color::Red;
                        self.rotate_left(sibling);
                        sibling = self.arena[parent].left;
                    }
                    self.arena[sibling].color = self.arena[parent].color;
                    self.arena[parent].color = Color::Black;
                    let distant_nephew = self.arena[sibling].left;
                    self.arena[distant_nephew].color = Color::Black;
                    self.rotate_right(parent);
                    index = self.root;
                }
            }
        }

        if index != NIL {
            self.arena[index].color = Color::Black;
        }
    }

    fn rotate_left(&mut self, index: usize) {
        let pivot = self.arena[index].right;
        let pivot_left = self.arena[pivot].left;

        self.arena[index].right = pivot_left;
        if pivot_left != NIL {
            self.arena[pivot_left].parent = index;
        }

        let parent = self.arena[index].parent;
        self.arena[pivot].parent = parent;
        if parent == NIL {
            self.root = pivot;
        } else if index == self.arena[parent].left {
            self.arena[parent].left = pivot;
        } else {
            self.arena[parent].right = pivot;
        }

        self.arena[pivot].left = index;
        self.arena[index].parent = pivot;
    }

    fn rotate_right(&mut self, index: usize) {
        let pivot = self.arena[index].left;
        let pivot_right = self.arena[pivot].right;

        self.arena[index].left = pivot_right;
        if pivot_right != NIL {
            self.arena[pivot_right].parent = index;
        }

        let parent = self.arena[index].parent;
        self.arena[pivot].parent = parent;
        if parent == NIL {
            self.root = pivot;
        } else if index == self.arena[parent].right {
            self.arena[parent].right = pivot;
        } else {
            self.arena[parent].left = pivot;
        }

        self.arena[pivot].right = index;
        self.arena[index].parent = pivot;
    }
}

impl<T> Default for RedBlackTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::RedBlackTree;
    use crate::red_black_tree::arena::NIL;
    use crate::red_black_tree::node::Color;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    // Walks the whole tree: checks parent links, the no-red-red rule, and that every path
    // to a nil sentinel crosses the same number of black nodes. Returns that black count.
    fn assert_subtree<T: Ord>(tree: &RedBlackTree<T>, index: usize) -> usize {
        if index == NIL {
            return 1;
        }
        let node = &tree.arena[index];
        if node.color == Color::Red {
            assert!(
                !tree.is_red(node.left) && !tree.is_red(node.right),
                "red node has a red child",
            );
        }
        if node.left != NIL {
            assert!(tree.arena[node.left].key <= node.key, "left child out of order");
            assert_eq!(tree.arena[node.left].parent, index);
        }
        if node.right != NIL {
            // equal keys descend left on insertion but rotations may carry one to the right
            assert!(tree.arena[node.right].key >= node.key, "right child out of order");
            assert_eq!(tree.arena[node.right].parent, index);
        }

        let left_height = assert_subtree(tree, node.left);
        let right_height = assert_subtree(tree, node.right);
        assert_eq!(left_height, right_height, "black-heights differ");

        match node.color {
            Color::Black => left_height + 1,
            Color::Red => left_height,
        }
    }

    fn assert_valid<T: Ord>(tree: &RedBlackTree<T>) {
        assert!(tree.arena.get(NIL).is_none(), "sentinel slot must stay vacant");
        if tree.root == NIL {
            assert_eq!(tree.len(), 0);
            return;
        }
        assert_eq!(tree.arena[tree.root].color, Color::Black, "root must be black");
        assert_eq!(tree.arena[tree.root].parent, NIL);
        assert_subtree(tree, tree.root);
    }

    fn in_order_keys<T: Clone>(tree: &RedBlackTree<T>) -> Vec<T> {
        fn walk<T: Clone>(tree: &RedBlackTree<T>, index: usize, keys: &mut Vec<T>) {
            if index == NIL {
                return;
            }
            let node = &tree.arena[index];
            walk(tree, node.left, keys);
            keys.push(node.key.clone());
            walk(tree, node.right, keys);
        }

        let mut keys = Vec::new();
        walk(tree, tree.root, &mut keys);
        keys
    }

    #[test]
    fn test_len_empty() {
        let tree: RedBlackTree<u32> = RedBlackTree::new();
        assert_eq!(tree.len(), 0);
    }

    #[test]
    fn test_is_empty() {
        let tree: RedBlackTree<u32> = RedBlackTree::new();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_get_empty() {
        let tree: RedBlackTree<u32> = RedBlackTree::new();
        assert_eq!(tree.get(&0), None);
    }

    #[test]
    fn test_insert() {
        let mut tree = RedBlackTree::new();
        tree.insert(1);
        assert!(tree.contains(&1));
        assert_eq!(tree.get(&1), Some(&1));
        assert_valid(&tree);
    }

    #[test]
    fn test_insert_duplicate_keys() {
        let mut tree = RedBlackTree::new();
        tree.insert(1);
        tree.insert(1);
        assert_eq!(tree.len(), 2);
        assert_valid(&tree);

        assert_eq!(tree.remove(&1), Some(1));
        assert_eq!(tree.len(), 1);
        assert!(tree.contains(&1));

        assert_eq!(tree.remove(&1), Some(1));
        assert!(tree.is_empty());
        assert_eq!(tree.remove(&1), None);
    }

    #[test]
    fn test_remove_absent() {
        let mut tree = RedBlackTree::new();
        tree.insert(1);
        assert_eq!(tree.remove(&0), None);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_remove_root() {
        let mut tree = RedBlackTree::new();
        tree.insert(1);
        assert_eq!(tree.remove(&1), Some(1));
        assert!(tree.is_empty());
        assert_valid(&tree);
    }

    #[test]
    fn test_remove_node_with_two_children() {
        let mut tree = RedBlackTree::from_collection(1..=7);
        assert_eq!(tree.remove(&4), Some(4));
        assert_eq!(in_order_keys(&tree), vec![1, 2, 3, 5, 6, 7]);
        assert_valid(&tree);
    }

    #[test]
    fn test_in_order_after_inserts() {
        let tree = RedBlackTree::from_collection(vec![10, 20, 30, 15, 25]);
        assert_eq!(in_order_keys(&tree), vec![10, 15, 20, 25, 30]);
        assert!(tree.height() <= 2);
        assert_valid(&tree);
    }

    #[test]
    fn test_height() {
        let mut tree = RedBlackTree::new();
        assert_eq!(tree.height(), 0);
        tree.insert(1);
        assert_eq!(tree.height(), 0);
        tree.insert(2);
        assert_eq!(tree.height(), 1);
        tree.insert(3);
        assert_eq!(tree.height(), 1);
    }

    #[test]
    fn test_clear() {
        let mut tree = RedBlackTree::from_collection(vec![1, 2, 3]);
        tree.clear();
        assert!(tree.is_empty());
        assert_eq!(tree.get(&1), None);
        assert_eq!(tree.height(), 0);

        tree.insert(4);
        assert_eq!(tree.len(), 1);
        assert_valid(&tree);
    }

    #[test]
    fn test_invariants_after_ascending_inserts() {
        let mut tree = RedBlackTree::new();
        for key in 0..256 {
            tree.insert(key);
            assert_valid(&tree);
        }
        assert_eq!(tree.len(), 256);
    }

    #[test]
    fn test_invariants_after_random_operations() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut tree = RedBlackTree::new();
        let mut expected = Vec::new();

        for _ in 0..1_000 {
            let key = rng.gen_range(0..u16::MAX);
            tree.insert(key);
            expected.push(key);
            assert_valid(&tree);
        }

        expected.sort_unstable();
        assert_eq!(in_order_keys(&tree), expected);

        expected.shuffle(&mut rng);
        for key in expected {
            assert_eq!(tree.remove(&key), Some(key));
            assert_valid(&tree);
        }

        assert!(tree.is_empty());
    }

    #[test]
    fn test_height_bound() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut tree = RedBlackTree::new();
        for _ in 0..1_024 {
            tree.insert(rng.gen::<u32>());
        }

        let bound = 2.0 * ((tree.len() + 1) as f64).log2();
        assert!((tree.height() as f64) <= bound);
    }
}
