use crate::agents::Car;
use crate::grid::cell::Position;
use std::collections::VecDeque;

/// Per-cell record of currently jammed cells.
///
/// A cell is jammed when the car whose head occupies it did not move in the
/// last tick. The field is refreshed from the per-car step counts after every
/// tick: stationary heads are set, everything else is cleared.
///
/// At analysis time the jammed cells form an undirected graph under toroidal
/// 4-neighborhood; its connected components are the jam clusters whose size
/// distribution the percolation study is interested in.
#[derive(Debug, Clone)]
pub struct JamField {
    size: usize,
    jammed: Vec<bool>,
}

impl JamField {
    pub fn new(size: usize) -> Self {
        JamField {
            size,
            jammed: vec![false; size * size],
        }
    }

    fn idx(&self, pos: Position) -> usize {
        pos.row * self.size + pos.col
    }

    /// Refreshes the field from one finished tick.
    pub fn observe(&mut self, cars: &[Car], moves: &[usize]) {
        self.jammed.fill(false);
        for (car, &moved) in cars.iter().zip(moves) {
            if moved == 0 {
                let i = self.idx(car.head);
                self.jammed[i] = true;
            }
        }
    }

    /// Returns `true` iff `pos` held a stationary car last tick.
    pub fn is_jammed(&self, pos: Position) -> bool {
        self.jammed[self.idx(pos)]
    }

    /// Sizes of all jam clusters, sorted descending.
    ///
    /// Clusters are connected components of jammed cells under the toroidal
    /// 4-neighborhood.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let n = self.size;
        let mut visited = vec![false; n * n];
        let mut sizes = Vec::new();
        let mut queue = VecDeque::new();

        for start in 0..n * n {
            if !self.jammed[start] || visited[start] {
                continue;
            }
            let mut count = 0usize;
            visited[start] = true;
            queue.push_back(start);
            while let Some(i) = queue.pop_front() {
                count += 1;
                let row = i / n;
                let col = i % n;
                let neighbors = [
                    ((row + n - 1) % n) * n + col,
                    ((row + 1) % n) * n + col,
                    row * n + (col + n - 1) % n,
                    row * n + (col + 1) % n,
                ];
                for &j in &neighbors {
                    if self.jammed[j] && !visited[j] {
                        visited[j] = true;
                        queue.push_back(j);
                    }
                }
            }
            sizes.push(count);
        }

        sizes.sort_unstable_by(|a, b| b.cmp(a));
        sizes
    }

    /// Size of the largest jam cluster, 0 when nothing is jammed.
    pub fn largest_cluster(&self) -> usize {
        self.cluster_sizes().first().copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_with(size: usize, cells: &[(usize, usize)]) -> JamField {
        let mut field = JamField::new(size);
        for &(row, col) in cells {
            let i = row * size + col;
            field.jammed[i] = true;
        }
        field
    }

    #[test]
    fn test_empty_field_has_no_clusters() {
        let field = JamField::new(10);
        assert!(field.cluster_sizes().is_empty());
        assert_eq!(field.largest_cluster(), 0);
    }

    #[test]
    fn test_clusters_are_separated_by_gaps() {
        let field = field_with(10, &[(2, 2), (2, 3), (2, 4), (7, 7), (5, 0)]);
        assert_eq!(field.cluster_sizes(), vec![3, 1, 1]);
        assert_eq!(field.largest_cluster(), 3);
    }

    #[test]
    fn test_diagonal_cells_do_not_connect() {
        let field = field_with(10, &[(1, 1), (2, 2)]);
        assert_eq!(field.cluster_sizes(), vec![1, 1]);
    }

    #[test]
    fn test_clusters_wrap_across_the_seam() {
        // One run across the vertical seam, one across the horizontal seam.
        let field = field_with(8, &[(0, 3), (7, 3), (5, 0), (5, 7)]);
        assert_eq!(field.cluster_sizes(), vec![2, 2]);
    }
}
