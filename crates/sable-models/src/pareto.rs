//! Non-dominated front extraction and hypercell decomposition for the
//! hypervolume acquisition family. All objectives are minimized.

use sable_types::{SableResult, SetupError};

use crate::acquisition::CellBounds;

/// True if `a` dominates `b`: no worse everywhere, strictly better somewhere.
fn dominates(a: &[f64], b: &[f64]) -> bool {
    let mut strictly_better = false;
    for (x, y) in a.iter().zip(b) {
        if x > y {
            return false;
        }
        if x < y {
            strictly_better = true;
        }
    }
    strictly_better
}

/// The non-dominated subset of the given objective rows, deduplicated.
pub fn pareto_front(rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut front: Vec<Vec<f64>> = Vec::new();
    for row in rows {
        if front.contains(row) {
            continue;
        }
        if front.iter().any(|kept| dominates(kept, row)) {
            continue;
        }
        front.retain(|kept| !dominates(row, kept));
        front.push(row.clone());
    }
    front
}

/// Hypercell bounds of the region that would improve the current front,
/// clipped at the reference point.
///
/// Two objectives get the exact staircase decomposition. For three or more,
/// the cells are the per-front-point boxes against the reference point — an
/// overlapping cover that overweights crowded regions but keeps every
/// improving point inside some cell.
pub fn hypercell_bounds(rows: &[Vec<f64>], ref_point: &[f64]) -> SableResult<CellBounds> {
    let num_objectives = ref_point.len();
    if rows.iter().any(|row| row.len() != num_objectives) {
        return Err(SetupError::ReferencePointDimension {
            got: num_objectives,
            expected: rows.first().map(|r| r.len()).unwrap_or(0),
        }
        .into());
    }

    let front = pareto_front(rows);
    if front.is_empty() {
        // No observations dominate anything yet: one cell, everything up to
        // the reference point improves.
        return Ok(CellBounds {
            lower: vec![vec![f64::NEG_INFINITY; num_objectives]],
            upper: vec![ref_point.to_vec()],
        });
    }

    if num_objectives == 2 {
        return Ok(staircase_cells_2d(front, ref_point));
    }

    let lower = front
        .iter()
        .map(|_| vec![f64::NEG_INFINITY; num_objectives])
        .collect();
    let upper = front
        .iter()
        .map(|point| {
            point
                .iter()
                .zip(ref_point)
                .map(|(&p, &r)| p.min(r))
                .collect()
        })
        .collect();
    Ok(CellBounds { lower, upper })
}

/// Exact staircase for two objectives: front sorted ascending in the first
/// objective partitions the improving region into len(front)+1 cells.
fn staircase_cells_2d(mut front: Vec<Vec<f64>>, ref_point: &[f64]) -> CellBounds {
    front.sort_by(|a, b| a[0].total_cmp(&b[0]));

    let mut lower = Vec::with_capacity(front.len() + 1);
    let mut upper = Vec::with_capacity(front.len() + 1);

    // Leftmost cell: better than every front point in objective 0.
    lower.push(vec![f64::NEG_INFINITY, f64::NEG_INFINITY]);
    upper.push(vec![front[0][0], ref_point[1]]);

    for i in 0..front.len() {
        let right = if i + 1 < front.len() {
            front[i + 1][0]
        } else {
            ref_point[0]
        };
        lower.push(vec![front[i][0], f64::NEG_INFINITY]);
        upper.push(vec![right, front[i][1]]);
    }

    CellBounds { lower, upper }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_drops_dominated_rows() {
        let rows = vec![
            vec![1.0, 4.0],
            vec![2.0, 2.0],
            vec![3.0, 3.0], // dominated by [2, 2]
            vec![4.0, 1.0],
            vec![2.0, 2.0], // duplicate
        ];
        let front = pareto_front(&rows);
        assert_eq!(front.len(), 3);
        assert!(!front.contains(&vec![3.0, 3.0]));
    }

    #[test]
    fn staircase_has_front_plus_one_cells() {
        let rows = vec![vec![1.0, 4.0], vec![2.0, 2.0], vec![4.0, 1.0]];
        let cells = hypercell_bounds(&rows, &[10.0, 10.0]).unwrap();
        assert_eq!(cells.lower.len(), 4);
        assert_eq!(cells.upper.len(), 4);

        // First cell is everything left of the best objective-0 value.
        assert_eq!(cells.upper[0], vec![1.0, 10.0]);
        // Last cell runs to the reference point in objective 0.
        assert_eq!(cells.upper[3], vec![10.0, 1.0]);
        // Uppers never exceed the reference point.
        for upper in &cells.upper {
            assert!(upper[0] <= 10.0 && upper[1] <= 10.0);
        }
    }

    #[test]
    fn empty_history_gives_one_cell_to_ref_point() {
        let cells = hypercell_bounds(&[], &[5.0, 5.0, 5.0]).unwrap();
        assert_eq!(cells.lower.len(), 1);
        assert_eq!(cells.upper[0], vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn three_objectives_use_per_point_boxes() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![3.0, 2.0, 1.0]];
        let cells = hypercell_bounds(&rows, &[4.0, 4.0, 4.0]).unwrap();
        assert_eq!(cells.upper.len(), 2);
        assert!(cells.upper.contains(&vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn mismatched_reference_point_is_rejected() {
        let rows = vec![vec![1.0, 2.0]];
        assert!(hypercell_bounds(&rows, &[1.0, 2.0, 3.0]).is_err());
    }
}
