//! Optimal 1-to-1 assignment (Kuhn-Munkres, shortest augmenting path form)
//! used to match extracted array-of-object elements to baseline elements by
//! a similarity matrix (§4.7, `HUNGARIAN`). No pack dependency covers this;
//! it is the one piece of comparator logic implemented from scratch.

/// Given an `n x m` cost matrix (lower is better) with `n <= m`, return the
/// minimum total cost and, for each row, the assigned column index.
fn min_cost_assignment(cost: &[Vec<f64>]) -> (f64, Vec<usize>) {
    let n = cost.len();
    let m = cost[0].len();
    debug_assert!(n <= m);

    let inf = f64::INFINITY;
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; m + 1];
    let mut p = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![inf; m + 1];
        let mut used = vec![false; m + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = inf;
            let mut j1 = 0usize;
            for j in 1..=m {
                if !used[j] {
                    let cur = cost[i0 - 1][j - 1] - u[i0] - v[j];
                    if cur < minv[j] {
                        minv[j] = cur;
                        way[j] = j0;
                    }
                    if minv[j] < delta {
                        delta = minv[j];
                        j1 = j;
                    }
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![usize::MAX; n];
    let mut total = 0.0;
    for j in 1..=m {
        if p[j] != 0 {
            assignment[p[j] - 1] = j - 1;
            total += cost[p[j] - 1][j - 1];
        }
    }
    (total, assignment)
}

/// Match `extracted` against `baseline` by `similarity` (higher is better,
/// `[0, 1]`), returning the matched pairs with their similarity score. Rows
/// are the smaller of the two sides internally; the returned indices always
/// refer back to `(extracted_index, baseline_index)`.
pub fn match_by_similarity(
    extracted_len: usize,
    baseline_len: usize,
    similarity: impl Fn(usize, usize) -> f64,
) -> Vec<(usize, usize, f64)> {
    if extracted_len == 0 || baseline_len == 0 {
        return Vec::new();
    }

    let (rows, cols, transposed) = if extracted_len <= baseline_len {
        (extracted_len, baseline_len, false)
    } else {
        (baseline_len, extracted_len, true)
    };

    let cost: Vec<Vec<f64>> = (0..rows)
        .map(|r| {
            (0..cols)
                .map(|c| {
                    let (e, b) = if transposed { (c, r) } else { (r, c) };
                    1.0 - similarity(e, b)
                })
                .collect()
        })
        .collect();

    let (_, assignment) = min_cost_assignment(&cost);

    assignment
        .into_iter()
        .enumerate()
        .filter(|(_, col)| *col != usize::MAX)
        .map(|(row, col)| {
            let (e, b) = if transposed { (col, row) } else { (row, col) };
            (e, b, 1.0 - cost[row][col])
        })
        .collect()
}
