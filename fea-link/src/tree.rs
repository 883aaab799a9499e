//! Order-preserving, path-addressable data trees used by construction requests

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Address of a branch, e.g. `{0;2}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreePath(Vec<usize>);

impl TreePath {
    pub fn new(indices: impl Into<Vec<usize>>) -> Self {
        Self(indices.into())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    /// This path with `index` appended
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }
}

impl From<&[usize]> for TreePath {
    fn from(indices: &[usize]) -> Self {
        Self(indices.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for TreePath {
    fn from(indices: [usize; N]) -> Self {
        Self(indices.to_vec())
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, index) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{index}")?;
        }
        f.write_str("}")
    }
}

/// Branches of items keyed by [`TreePath`], kept in insertion order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<(TreePath, Vec<T>)>", into = "Vec<(TreePath, Vec<T>)>")]
#[serde(bound(serialize = "T: Serialize + Clone", deserialize = "T: Deserialize<'de>"))]
pub struct DataTree<T> {
    branches: Vec<(TreePath, Vec<T>)>,
    lookup: FxHashMap<TreePath, usize>,
}

impl<T> Default for DataTree<T> {
    fn default() -> Self {
        Self {
            branches: Vec::new(),
            lookup: FxHashMap::default(),
        }
    }
}

impl<T> DataTree<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single-branch tree at `{0}`
    pub fn from_list(items: impl IntoIterator<Item = T>) -> Self {
        let mut tree = Self::new();
        tree.extend_branch(TreePath::from([0]), items);
        tree
    }

    /// Append `item` to the branch at `path`, creating it if needed
    pub fn push(&mut self, path: impl Into<TreePath>, item: T) {
        self.branch_mut(path.into()).push(item);
    }

    pub fn extend_branch(&mut self, path: impl Into<TreePath>, items: impl IntoIterator<Item = T>) {
        self.branch_mut(path.into()).extend(items);
    }

    fn branch_mut(&mut self, path: TreePath) -> &mut Vec<T> {
        let slot = match self.lookup.get(&path) {
            Some(&slot) => slot,
            None => {
                self.lookup.insert(path.clone(), self.branches.len());
                self.branches.push((path, Vec::new()));
                self.branches.len() - 1
            }
        };
        &mut self.branches[slot].1
    }

    pub fn branch(&self, path: &TreePath) -> Option<&[T]> {
        self.lookup.get(path).map(|&slot| self.branches[slot].1.as_slice())
    }

    pub fn paths(&self) -> impl Iterator<Item = &TreePath> {
        self.branches.iter().map(|(path, _)| path)
    }

    pub fn branches(&self) -> impl Iterator<Item = (&TreePath, &[T])> {
        self.branches.iter().map(|(path, items)| (path, items.as_slice()))
    }

    pub fn branch_count(&self) -> usize {
        self.branches.len()
    }

    /// Total number of items over all branches
    pub fn data_count(&self) -> usize {
        self.branches.iter().map(|(_, items)| items.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.data_count() == 0
    }

    /// Path-major iteration: `(path, index within branch, item)`
    pub fn iter(&self) -> impl Iterator<Item = (&TreePath, usize, &T)> {
        self.branches.iter().flat_map(|(path, items)| {
            items.iter().enumerate().map(move |(j, item)| (path, j, item))
        })
    }

    pub fn flatten(&self) -> Vec<&T> {
        self.iter().map(|(_, _, item)| item).collect()
    }

    pub fn into_flat(self) -> Vec<T> {
        self.branches.into_iter().flat_map(|(_, items)| items).collect()
    }

    /// Same items, each moved into its own branch `path + [j]`
    pub fn graft(self) -> Self {
        let mut out = Self::new();
        for (path, items) in self.branches {
            for (j, item) in items.into_iter().enumerate() {
                out.push(path.child(j), item);
            }
        }
        out
    }

    /// Same shape with every item transformed
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> DataTree<U> {
        DataTree {
            branches: self
                .branches
                .iter()
                .map(|(path, items)| (path.clone(), items.iter().map(&mut f).collect()))
                .collect(),
            lookup: self.lookup.clone(),
        }
    }

    /// True if both trees have the same paths with the same branch lengths
    pub fn same_shape<U>(&self, other: &DataTree<U>) -> bool {
        self.branches.len() == other.branches.len()
            && self
                .branches
                .iter()
                .zip(&other.branches)
                .all(|((p, a), (q, b))| p == q && a.len() == b.len())
    }
}

impl<T> From<Vec<(TreePath, Vec<T>)>> for DataTree<T> {
    fn from(branches: Vec<(TreePath, Vec<T>)>) -> Self {
        let mut tree = Self::new();
        for (path, items) in branches {
            tree.extend_branch(path, items);
        }
        tree
    }
}

impl<T> From<DataTree<T>> for Vec<(TreePath, Vec<T>)> {
    fn from(tree: DataTree<T>) -> Self {
        tree.branches
    }
}

impl<T> FromIterator<T> for DataTree<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_list(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_display() {
        assert_eq!(TreePath::from([0, 2]).to_string(), "{0;2}");
        assert_eq!(TreePath::default().to_string(), "{}");
    }

    #[test]
    fn test_insertion_order_kept() {
        let mut tree = DataTree::new();
        tree.push([1], "b");
        tree.push([0], "a");
        tree.push([1], "c");
        let paths: Vec<String> = tree.paths().map(|p| p.to_string()).collect();
        assert_eq!(paths, vec!["{1}", "{0}"]);
        assert_eq!(tree.flatten(), vec![&"b", &"c", &"a"]);
        assert_eq!(tree.branch(&TreePath::from([1])), Some(&["b", "c"][..]));
        assert_eq!(tree.data_count(), 3);
    }

    #[test]
    fn test_graft() {
        let tree = DataTree::from_list([10, 20]);
        let grafted = tree.graft();
        assert_eq!(grafted.branch_count(), 2);
        assert_eq!(grafted.branch(&TreePath::from([0, 1])), Some(&[20][..]));
    }

    #[test]
    fn test_map_keeps_shape() {
        let mut tree = DataTree::new();
        tree.extend_branch([0, 0], [1, 2]);
        tree.extend_branch([0, 1], [3]);
        let doubled = tree.map(|v| v * 2);
        assert!(tree.same_shape(&doubled));
        assert_eq!(doubled.into_flat(), vec![2, 4, 6]);
    }

    #[test]
    fn test_serde_round_trip_keeps_order() {
        let mut tree = DataTree::new();
        tree.push([3], 1.5);
        tree.push([1], 2.5);
        let json = serde_json::to_string(&tree).unwrap();
        let back: DataTree<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
