//! Shared math utilities for detection infrastructure.
//!
//! Provides union-find labelling and bounding-box IoU used by the tracker
//! and the colour-blob detector.

/// IoU between two bounding boxes represented as `[x1, y1, x2, y2]`.
pub fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }

    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}

/// Find root of element `i` with path halving for amortized near-O(1).
pub fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Merge the sets containing `a` and `b`.
pub fn union(parent: &mut [usize], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra != rb {
        parent[ra] = rb;
    }
}

/// Labels 4-connected runs of equal non-zero values in a row-major grid.
///
/// Returns, per cell, the union-find root of its component, or `None`
/// for zero cells.
pub fn label_components(grid: &[u8], width: usize, height: usize) -> Vec<Option<usize>> {
    let mut parent: Vec<usize> = (0..grid.len()).collect();
    for y in 0..height {
        for x in 0..width {
            let i = y * width + x;
            if grid[i] == 0 {
                continue;
            }
            if x > 0 && grid[i - 1] == grid[i] {
                union(&mut parent, i - 1, i);
            }
            if y > 0 && grid[i - width] == grid[i] {
                union(&mut parent, i - width, i);
            }
        }
    }
    (0..grid.len())
        .map(|i| (grid[i] != 0).then(|| find(&mut parent, i)))
        .collect()
}
