#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

use cloudreg_geometry::{AaBox, GeometryError, Point};

/// One node of the tree, stored in the arena and linked by index.
///
/// The box constrains every point reachable at or below the node; it is the
/// parent's box narrowed at the parent's split axis.
#[derive(Debug, Clone)]
struct Node {
    point: Point,
    key: f64,
    bounds: AaBox,
    left: Option<usize>,
    right: Option<usize>,
}

/// A nearest-neighbor query result.
#[derive(Debug, Clone, Copy)]
pub struct Nearest<'a> {
    /// The stored point closest to the query.
    pub point: &'a Point,
    /// Insertion index of that point.
    pub index: usize,
    /// Squared distance from the query to the point.
    pub dist_sqd: f64,
}

/// A k-d tree over points of fixed dimension `k`.
///
/// The split axis cycles through `0..k` by depth. The tree is append-only:
/// there is no deletion or rebalancing, and queries never mutate it, so a
/// built tree can be shared freely across reader threads.
#[derive(Debug, Clone)]
pub struct KdTree {
    k: usize,
    nodes: Vec<Node>,
    root: Option<usize>,
}

impl KdTree {
    /// Create an empty tree over `k`-dimensional points.
    pub fn new(k: usize) -> Result<Self, GeometryError> {
        if k == 0 {
            return Err(GeometryError::ZeroDimension);
        }
        Ok(Self {
            k,
            nodes: Vec::new(),
            root: None,
        })
    }

    /// Build a tree from a point set, inserting in iteration order.
    pub fn from_points<I>(k: usize, points: I) -> Result<Self, GeometryError>
    where
        I: IntoIterator<Item = Point>,
    {
        let mut tree = Self::new(k)?;
        for p in points {
            tree.insert(p)?;
        }
        Ok(tree)
    }

    /// Dimensionality of the tree.
    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    /// Number of stored points.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree holds no points.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Insert a point into the tree.
    ///
    /// Descends comparing the point's coordinate on the current split axis
    /// against each node's key: strictly less goes left (the child box's
    /// maximum on that axis narrows to the key), otherwise right (the
    /// minimum narrows). Duplicate points are inserted again, not merged.
    pub fn insert(&mut self, point: Point) -> Result<(), GeometryError> {
        if point.dim() != self.k {
            return Err(GeometryError::DimensionMismatch {
                expected: self.k,
                actual: point.dim(),
            });
        }

        let mut bounds = AaBox::unbounded(self.k)?;
        let mut axis = 0;

        let Some(mut idx) = self.root else {
            let new = self.push_node(point, axis, bounds);
            self.root = Some(new);
            return Ok(());
        };

        loop {
            let (key, left, right) = {
                let node = &self.nodes[idx];
                (node.key, node.left, node.right)
            };

            // the key lies inside the box handed down, so narrowing cannot
            // cross the opposite bound
            let go_left = point.position()[axis] < key;
            if go_left {
                bounds.update_max(axis, key)?;
            } else {
                bounds.update_min(axis, key)?;
            }
            axis = (axis + 1) % self.k;

            match if go_left { left } else { right } {
                Some(child) => idx = child,
                None => {
                    let new = self.push_node(point, axis, bounds);
                    if go_left {
                        self.nodes[idx].left = Some(new);
                    } else {
                        self.nodes[idx].right = Some(new);
                    }
                    return Ok(());
                }
            }
        }
    }

    fn push_node(&mut self, point: Point, axis: usize, bounds: AaBox) -> usize {
        let key = point.position()[axis];
        self.nodes.push(Node {
            point,
            key,
            bounds,
            left: None,
            right: None,
        });
        self.nodes.len() - 1
    }

    /// Find the stored point nearest to `query`, or `None` on an empty tree.
    ///
    /// A subtree is skipped whenever the best distance found so far is
    /// already smaller than the distance from the query to the subtree's
    /// bounding box: no point inside the box can beat the current best.
    /// The child on the query's side of the split is searched first so the
    /// bound tightens before the far child is considered. The traversal
    /// keeps its own stack, so a degenerate (sorted) insertion order that
    /// makes the tree height linear in its size cannot overflow the call
    /// stack.
    pub fn nearest(&self, query: &Point) -> Result<Option<Nearest<'_>>, GeometryError> {
        if query.dim() != self.k {
            return Err(GeometryError::DimensionMismatch {
                expected: self.k,
                actual: query.dim(),
            });
        }
        let Some(root) = self.root else {
            return Ok(None);
        };

        let mut best = root;
        let mut best_dist = query.dist_sqd_to(&self.nodes[root].point)?;

        let mut stack = vec![(root, 0usize)];
        while let Some((idx, axis)) = stack.pop() {
            let n = &self.nodes[idx];

            // prune: nothing inside this box can beat the current best
            if best_dist < n.bounds.dist_sqd_to(query)? {
                continue;
            }

            let dist = query.dist_sqd_to(&n.point)?;
            if dist < best_dist {
                best = idx;
                best_dist = dist;
            }

            let next_axis = (axis + 1) % self.k;
            let (near, far) = if query.position()[axis] < n.key {
                (n.left, n.right)
            } else {
                (n.right, n.left)
            };
            // far below near so the near child is popped first
            if let Some(far) = far {
                stack.push((far, next_axis));
            }
            if let Some(near) = near {
                stack.push((near, next_axis));
            }
        }

        Ok(Some(Nearest {
            point: &self.nodes[best].point,
            index: best,
            dist_sqd: best_dist,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn brute_force_nearest(points: &[Point], query: &Point) -> f64 {
        points
            .iter()
            .map(|p| query.dist_sqd_to(p).unwrap())
            .fold(f64::INFINITY, f64::min)
    }

    #[test]
    fn test_empty_tree() -> Result<(), GeometryError> {
        let tree = KdTree::new(3)?;
        assert!(tree.is_empty());
        assert!(tree.nearest(&Point::new(vec![0.0, 0.0, 0.0]))?.is_none());
        Ok(())
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(KdTree::new(0).is_err());
    }

    #[test]
    fn test_insert_dimension_mismatch() -> Result<(), GeometryError> {
        let mut tree = KdTree::new(3)?;
        assert!(tree.insert(Point::new(vec![1.0, 2.0])).is_err());
        assert!(tree.is_empty());
        Ok(())
    }

    #[test]
    fn test_nearest_dimension_mismatch() -> Result<(), GeometryError> {
        let mut tree = KdTree::new(2)?;
        tree.insert(Point::new(vec![0.0, 0.0]))?;
        assert!(tree.nearest(&Point::new(vec![0.0, 0.0, 0.0])).is_err());
        Ok(())
    }

    #[test]
    fn test_single_point() -> Result<(), GeometryError> {
        let mut tree = KdTree::new(3)?;
        tree.insert(Point::new(vec![1.0, 2.0, 3.0]))?;
        let nn = tree.nearest(&Point::new(vec![0.0, 0.0, 0.0]))?.unwrap();
        assert_relative_eq!(nn.dist_sqd, 14.0);
        Ok(())
    }

    #[test]
    fn test_duplicates_are_kept() -> Result<(), GeometryError> {
        let mut tree = KdTree::new(2)?;
        tree.insert(Point::new(vec![1.0, 1.0]))?;
        tree.insert(Point::new(vec![1.0, 1.0]))?;
        tree.insert(Point::new(vec![1.0, 1.0]))?;
        assert_eq!(tree.len(), 3);
        let nn = tree.nearest(&Point::new(vec![1.0, 1.0]))?.unwrap();
        assert_relative_eq!(nn.dist_sqd, 0.0);
        Ok(())
    }

    #[test]
    fn test_exact_hit() -> Result<(), GeometryError> {
        let points = [
            vec![2.0, 3.0],
            vec![5.0, 4.0],
            vec![9.0, 6.0],
            vec![4.0, 7.0],
            vec![8.0, 1.0],
            vec![7.0, 2.0],
        ];
        let tree = KdTree::from_points(2, points.iter().cloned().map(Point::new))?;
        for p in &points {
            let nn = tree.nearest(&Point::new(p.clone()))?.unwrap();
            assert_relative_eq!(nn.dist_sqd, 0.0);
            assert_eq!(nn.point.position(), p.as_slice());
        }
        Ok(())
    }

    #[test]
    fn test_matches_brute_force_random() -> Result<(), GeometryError> {
        let mut rng = StdRng::seed_from_u64(17);
        let points: Vec<Point> = (0..500)
            .map(|_| {
                Point::new(vec![
                    rng.random_range(-10.0..10.0),
                    rng.random_range(-10.0..10.0),
                    rng.random_range(-10.0..10.0),
                ])
            })
            .collect();
        let tree = KdTree::from_points(3, points.iter().cloned())?;
        assert_eq!(tree.len(), points.len());

        for _ in 0..100 {
            let query = Point::new(vec![
                rng.random_range(-12.0..12.0),
                rng.random_range(-12.0..12.0),
                rng.random_range(-12.0..12.0),
            ]);
            let nn = tree.nearest(&query)?.unwrap();
            let expected = brute_force_nearest(&points, &query);
            assert_relative_eq!(nn.dist_sqd, expected, epsilon = 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_matches_brute_force_clustered() -> Result<(), GeometryError> {
        // degenerate insertion order: sorted along x
        let points: Vec<Point> = (0..200)
            .map(|i| Point::new(vec![i as f64 * 0.01, 0.0, 0.0]))
            .collect();
        let tree = KdTree::from_points(3, points.iter().cloned())?;

        let query = Point::new(vec![0.503, 0.1, -0.1]);
        let nn = tree.nearest(&query)?.unwrap();
        assert_relative_eq!(
            nn.dist_sqd,
            brute_force_nearest(&points, &query),
            epsilon = 1e-12
        );
        Ok(())
    }

    #[test]
    fn test_query_on_long_chain_with_small_thread_stack() -> Result<(), GeometryError> {
        // sorted insertion degenerates the tree into a 2000-deep chain; the
        // query must still run inside a 64 KiB stack
        let points: Vec<Point> = (0..2000)
            .map(|i| Point::new(vec![i as f64, 0.0, 0.0]))
            .collect();
        let tree = KdTree::from_points(3, points.iter().cloned())?;

        let query = Point::new(vec![1234.4, 0.2, -0.3]);
        let expected = brute_force_nearest(&points, &query);
        std::thread::scope(|s| {
            std::thread::Builder::new()
                .stack_size(64 * 1024)
                .spawn_scoped(s, || {
                    let nn = tree.nearest(&query).unwrap().unwrap();
                    assert_relative_eq!(nn.dist_sqd, expected, epsilon = 1e-12);
                })
                .unwrap();
        });
        Ok(())
    }
}
