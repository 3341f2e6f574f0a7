//! Optimal assignment on a square cost matrix (Kuhn-Munkres, O(n^3))
//!
//! Used to align cluster ids with class labels before scoring clustering
//! accuracy. Shortest augmenting paths with row/column potentials.

/// Minimum-cost assignment of rows to columns
///
/// Returns `assignment[row] = column`. The matrix must be square; an empty
/// matrix yields an empty assignment.
pub fn solve(cost: &[Vec<f64>]) -> Vec<usize> {
    let n = cost.len();
    if n == 0 {
        return Vec::new();
    }
    debug_assert!(cost.iter().all(|row| row.len() == n), "cost matrix must be square");

    // Potentials and matching use 1-based indices, column 0 is a virtual root.
    let mut u = vec![0.0_f64; n + 1];
    let mut v = vec![0.0_f64; n + 1];
    let mut matched_row = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for row in 1..=n {
        matched_row[0] = row;
        let mut col0 = 0usize;
        let mut min_to = vec![f64::INFINITY; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[col0] = true;
            let r = matched_row[col0];
            let mut delta = f64::INFINITY;
            let mut next_col = 0usize;

            for col in 1..=n {
                if used[col] {
                    continue;
                }
                let reduced = cost[r - 1][col - 1] - u[r] - v[col];
                if reduced < min_to[col] {
                    min_to[col] = reduced;
                    way[col] = col0;
                }
                if min_to[col] < delta {
                    delta = min_to[col];
                    next_col = col;
                }
            }

            for col in 0..=n {
                if used[col] {
                    u[matched_row[col]] += delta;
                    v[col] -= delta;
                } else {
                    min_to[col] -= delta;
                }
            }

            col0 = next_col;
            if matched_row[col0] == 0 {
                break;
            }
        }

        loop {
            let prev = way[col0];
            matched_row[col0] = matched_row[prev];
            col0 = prev;
            if col0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0usize; n];
    for col in 1..=n {
        if matched_row[col] != 0 {
            assignment[matched_row[col] - 1] = col - 1;
        }
    }
    assignment
}

/// Maximum-weight assignment, solved as min-cost on `max - weight`
pub fn solve_max(weights: &[Vec<f64>]) -> Vec<usize> {
    let max = weights
        .iter()
        .flat_map(|row| row.iter().copied())
        .fold(f64::NEG_INFINITY, f64::max);
    let cost: Vec<Vec<f64>> = weights
        .iter()
        .map(|row| row.iter().map(|&w| max - w).collect())
        .collect();
    solve(&cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total(cost: &[Vec<f64>], assignment: &[usize]) -> f64 {
        assignment
            .iter()
            .enumerate()
            .map(|(row, &col)| cost[row][col])
            .sum()
    }

    #[test]
    fn test_empty_matrix() {
        assert!(solve(&[]).is_empty());
    }

    #[test]
    fn test_known_minimum() {
        let cost = vec![
            vec![4.0, 1.0, 3.0],
            vec![2.0, 0.0, 5.0],
            vec![3.0, 2.0, 2.0],
        ];
        let assignment = solve(&cost);
        assert_eq!(total(&cost, &assignment), 5.0);
        let mut cols = assignment.clone();
        cols.sort_unstable();
        assert_eq!(cols, vec![0, 1, 2]);
    }

    #[test]
    fn test_max_weight_recovers_permutation() {
        let weights = vec![
            vec![0.0, 0.0, 5.0],
            vec![4.0, 0.0, 0.0],
            vec![0.0, 3.0, 0.0],
        ];
        assert_eq!(solve_max(&weights), vec![2, 0, 1]);
    }

    #[test]
    fn test_greedy_would_be_suboptimal() {
        // Greedy picks (0,0)=9 then (1,1)=1; optimum is 8 + 8.
        let weights = vec![vec![9.0, 8.0], vec![8.0, 1.0]];
        let assignment = solve_max(&weights);
        assert_eq!(total(&weights, &assignment), 16.0);
    }
}
