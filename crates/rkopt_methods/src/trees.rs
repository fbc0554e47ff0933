//! Rooted trees up to a given order.
//!
//! Trees are generated order by order: a tree of order `q` is a root
//! with a forest of total order `q - 1`, and forests are stored as
//! nonincreasing sequences of tree identifiers so that every tree has
//! exactly one representation. Identifiers are therefore grouped by
//! order and stable across catalogues of different depth.

/// One rooted tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootedTree {
    /// Number of vertices `|t|`.
    pub order: usize,
    /// Identifiers of the root's subtrees, nonincreasing.
    pub children: Vec<usize>,
    /// Density `γ(t) = |t| Π γ(t_i)`.
    pub density: u64,
    /// Symmetry `σ(t)`.
    pub symmetry: u64,
}

/// All rooted trees up to `max_order`.
///
/// # Examples
///
/// ```
/// use rkopt_methods::trees::TreeCatalogue;
///
/// let trees = TreeCatalogue::new(5);
/// let counts: Vec<usize> = (1..=5).map(|q| trees.of_order(q).len()).collect();
/// assert_eq!(counts, vec![1, 1, 2, 4, 9]);
/// ```
#[derive(Debug, Clone)]
pub struct TreeCatalogue {
    max_order: usize,
    trees: Vec<RootedTree>,
    /// `ranges[q]` is the identifier range of trees of order `q`.
    ranges: Vec<std::ops::Range<usize>>,
    /// Identifier of the tall tree (a path) of each order.
    tall: Vec<usize>,
}

impl TreeCatalogue {
    /// Generate every tree of order `1..=max_order`.
    pub fn new(max_order: usize) -> Self {
        let mut catalogue = Self {
            max_order,
            trees: Vec::new(),
            ranges: vec![0..0],
            tall: vec![0],
        };
        for order in 1..=max_order {
            let start = catalogue.trees.len();
            let mut forests = Vec::new();
            catalogue.forests(order - 1, usize::MAX, &mut Vec::new(), &mut forests);
            for children in forests {
                let tree = catalogue.make_tree(order, children);
                catalogue.trees.push(tree);
            }
            catalogue.ranges.push(start..catalogue.trees.len());
            let tall = if order == 1 {
                start
            } else {
                catalogue.find(&[catalogue.tall[order - 1]]).unwrap_or(start)
            };
            catalogue.tall.push(tall);
        }
        catalogue
    }

    /// Enumerate nonincreasing forests of total order `remaining` using
    /// identifiers no larger than `bound`.
    fn forests(
        &self,
        remaining: usize,
        bound: usize,
        current: &mut Vec<usize>,
        out: &mut Vec<Vec<usize>>,
    ) {
        if remaining == 0 {
            out.push(current.clone());
            return;
        }
        // Largest identifiers first, so forests list in a fixed order.
        let upper = self.trees.len().min(bound.saturating_add(1));
        for id in (0..upper).rev() {
            let order = self.trees[id].order;
            if order <= remaining {
                current.push(id);
                self.forests(remaining - order, id, current, out);
                current.pop();
            }
        }
    }

    fn make_tree(&self, order: usize, children: Vec<usize>) -> RootedTree {
        let mut density = order as u64;
        let mut symmetry = 1u64;
        let mut i = 0;
        while i < children.len() {
            let id = children[i];
            let mut multiplicity = 0u64;
            while i < children.len() && children[i] == id {
                multiplicity += 1;
                i += 1;
            }
            let child = &self.trees[id];
            density *= child.density.pow(multiplicity as u32);
            symmetry *= child.symmetry.pow(multiplicity as u32) * factorial(multiplicity);
        }
        RootedTree {
            order,
            children,
            density,
            symmetry,
        }
    }

    fn find(&self, children: &[usize]) -> Option<usize> {
        self.trees.iter().position(|t| t.children == children)
    }

    /// Highest order generated.
    pub fn max_order(&self) -> usize {
        self.max_order
    }

    /// Total number of trees.
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    /// Whether the catalogue holds no trees (`max_order == 0`).
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    /// Tree by identifier.
    pub fn tree(&self, id: usize) -> &RootedTree {
        &self.trees[id]
    }

    /// All trees in identifier order.
    pub fn trees(&self) -> &[RootedTree] {
        &self.trees
    }

    /// Trees of exactly order `q`, empty outside `1..=max_order`.
    pub fn of_order(&self, q: usize) -> &[RootedTree] {
        match self.ranges.get(q) {
            Some(range) => &self.trees[range.clone()],
            None => &[],
        }
    }

    /// Identifier range of trees of order `q`.
    pub fn ids_of_order(&self, q: usize) -> std::ops::Range<usize> {
        self.ranges.get(q).cloned().unwrap_or(0..0)
    }

    /// Identifier of the tall tree of order `q`.
    pub fn tall(&self, q: usize) -> Option<usize> {
        if q == 0 {
            None
        } else {
            self.tall.get(q).copied()
        }
    }
}

fn factorial(n: u64) -> u64 {
    (1..=n).product()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_counts() {
        let trees = TreeCatalogue::new(8);
        let counts: Vec<usize> = (1..=8).map(|q| trees.of_order(q).len()).collect();
        assert_eq!(counts, vec![1, 1, 2, 4, 9, 20, 48, 115]);
        assert_eq!(trees.len(), 200);
    }

    #[test]
    fn test_order_three_trees() {
        let trees = TreeCatalogue::new(3);
        let third = trees.of_order(3);
        // bushy tree [τ, τ] and tall tree [[τ]]
        let bushy = third.iter().find(|t| t.children.len() == 2).unwrap();
        assert_eq!(bushy.density, 3);
        assert_eq!(bushy.symmetry, 2);
        let tall = trees.tree(trees.tall(3).unwrap());
        assert_eq!(tall.density, 6);
        assert_eq!(tall.symmetry, 1);
    }

    #[test]
    fn test_symmetry_counts_labelled_trees() {
        // q!/σ(t) labellings per tree; q^{q-1} labelled rooted trees.
        let trees = TreeCatalogue::new(7);
        for q in 1..=7u64 {
            let total: u64 = trees
                .of_order(q as usize)
                .iter()
                .map(|t| factorial(q) / t.symmetry)
                .sum();
            assert_eq!(total, q.pow(q as u32 - 1), "order {}", q);
        }
    }

    #[test]
    fn test_tall_trees_have_factorial_density() {
        let trees = TreeCatalogue::new(6);
        for q in 1..=6 {
            let t = trees.tree(trees.tall(q).unwrap());
            assert_eq!(t.order, q);
            assert_eq!(t.density, factorial(q as u64));
        }
    }

    #[test]
    fn test_children_nonincreasing() {
        let trees = TreeCatalogue::new(6);
        for t in trees.trees() {
            assert!(t.children.windows(2).all(|w| w[0] >= w[1]));
            let sum: usize = t.children.iter().map(|&c| trees.tree(c).order).sum();
            assert_eq!(sum + 1, t.order);
        }
    }
}
