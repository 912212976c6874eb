use tig_challenges::vector_search::VECTOR_DIMS;

pub struct KDNode<'a> {
    pub point: &'a [f32],
    pub index: usize,
    pub left: Option<Box<KDNode<'a>>>,
    pub right: Option<Box<KDNode<'a>>>,
}

/// Balanced KD-tree over borrowed vectors. Nodes at depth `d` split on axis
/// `d % VECTOR_DIMS`.
pub struct KDTree<'a> {
    root: Option<Box<KDNode<'a>>>,
}

impl<'a> KDTree<'a> {
    /// Builds the tree in place, reordering `points`.
    pub fn new(points: &mut [(&'a [f32], usize)]) -> Self {
        Self {
            root: build_kd_tree(points, 0),
        }
    }

    pub fn from_root(root: Option<Box<KDNode<'a>>>) -> Self {
        Self { root }
    }

    pub fn root(&self) -> Option<&KDNode<'a>> {
        self.root.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack: Vec<&KDNode> = self.root.as_deref().into_iter().collect();
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.left.as_deref());
            stack.extend(node.right.as_deref());
        }
        count
    }

    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut stack: Vec<(&KDNode, usize)> =
            self.root.as_deref().into_iter().map(|n| (n, 1)).collect();
        while let Some((node, depth)) = stack.pop() {
            height = height.max(depth);
            stack.extend(node.left.as_deref().map(|n| (n, depth + 1)));
            stack.extend(node.right.as_deref().map(|n| (n, depth + 1)));
        }
        height
    }

    /// Squared distance and database index of the closest point, or `None`
    /// for an empty tree.
    pub fn nearest_neighbor(&self, target: &[f32]) -> Option<(f32, usize)> {
        let mut best = (f32::MAX, None);
        nearest_neighbor_search(self.root.as_deref(), target, &mut best, 0);
        best.1.map(|index| (best.0, index))
    }
}

// Deep trees would overflow the stack with the default recursive drop.
impl Drop for KDTree<'_> {
    fn drop(&mut self) {
        let mut stack: Vec<Box<KDNode>> = self.root.take().into_iter().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(node.left.take());
            stack.extend(node.right.take());
        }
    }
}

fn build_kd_tree<'a>(points: &mut [(&'a [f32], usize)], depth: usize) -> Option<Box<KDNode<'a>>> {
    if points.is_empty() {
        return None;
    }

    let axis = depth % VECTOR_DIMS;
    let median = points.len() / 2;
    points.select_nth_unstable_by(median, |a, b| a.0[axis].total_cmp(&b.0[axis]));

    let (point, index) = points[median];
    let (left, rest) = points.split_at_mut(median);
    Some(Box::new(KDNode {
        point,
        index,
        left: build_kd_tree(left, depth + 1),
        right: build_kd_tree(&mut rest[1..], depth + 1),
    }))
}

/// Squared distance that gives up as soon as the partial sum exceeds
/// `current_min`, returning `f32::MAX` in that case.
#[inline(always)]
pub fn early_stopping_distance(a: &[f32], b: &[f32], current_min: f32) -> f32 {
    let mut sum = 0.0f32;
    let mut a_chunks = a.chunks_exact(4);
    let mut b_chunks = b.chunks_exact(4);
    for (x, y) in (&mut a_chunks).zip(&mut b_chunks) {
        let diff0 = x[0] - y[0];
        let diff1 = x[1] - y[1];
        let diff2 = x[2] - y[2];
        let diff3 = x[3] - y[3];
        sum += diff0 * diff0 + diff1 * diff1 + diff2 * diff2 + diff3 * diff3;
        if sum > current_min {
            return f32::MAX;
        }
    }
    for (x, y) in a_chunks.remainder().iter().zip(b_chunks.remainder()) {
        let diff = x - y;
        sum += diff * diff;
        if sum > current_min {
            return f32::MAX;
        }
    }
    sum
}

pub fn nearest_neighbor_search(
    node: Option<&KDNode>,
    target: &[f32],
    best: &mut (f32, Option<usize>),
    depth: usize,
) {
    let node = match node {
        Some(node) => node,
        None => return,
    };

    let dist = early_stopping_distance(node.point, target, best.0);
    if dist < best.0 {
        *best = (dist, Some(node.index));
    }

    let axis = depth % VECTOR_DIMS;
    let diff = target[axis] - node.point[axis];
    let (near_branch, far_branch) = if diff < 0.0 {
        (&node.left, &node.right)
    } else {
        (&node.right, &node.left)
    };

    nearest_neighbor_search(near_branch.as_deref(), target, best, depth + 1);
    if diff * diff < best.0 {
        nearest_neighbor_search(far_branch.as_deref(), target, best, depth + 1);
    }
}
