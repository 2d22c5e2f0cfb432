//! Quasi-random sequence generators for low-discrepancy initial designs.
//!
//! Both samplers produce points in the unit cube; the design module decodes
//! them into configurations.

use rand::{Rng, RngCore};

/// Latin hypercube sample: each dimension is split into `n` strata and every
/// stratum is hit exactly once. Several candidate designs are drawn and the
/// one maximizing the minimum pairwise distance is kept (maximin criterion).
pub fn latin_hypercube(n: usize, dim: usize, rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
    const MAXIMIN_CANDIDATES: usize = 10;

    if n == 0 || dim == 0 {
        return Vec::new();
    }

    let mut best: Option<(f64, Vec<Vec<f64>>)> = None;
    for _ in 0..MAXIMIN_CANDIDATES {
        let candidate = one_latin_hypercube(n, dim, rng);
        let separation = min_pairwise_distance(&candidate);
        if best.as_ref().map(|(s, _)| separation > *s).unwrap_or(true) {
            best = Some((separation, candidate));
        }
    }
    best.map(|(_, points)| points).unwrap_or_default()
}

fn one_latin_hypercube(n: usize, dim: usize, rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
    let mut points = vec![vec![0.0; dim]; n];
    for d in 0..dim {
        let mut strata: Vec<usize> = (0..n).collect();
        // Fisher-Yates shuffle of the stratum assignment.
        for i in (1..n).rev() {
            let j = rng.random_range(0..=i);
            strata.swap(i, j);
        }
        for (point, &stratum) in points.iter_mut().zip(&strata) {
            point[d] = (stratum as f64 + rng.random::<f64>()) / n as f64;
        }
    }
    points
}

fn min_pairwise_distance(points: &[Vec<f64>]) -> f64 {
    let mut min = f64::INFINITY;
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let d: f64 = points[i]
                .iter()
                .zip(&points[j])
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            min = min.min(d);
        }
    }
    min
}

/// Halton sequence: the radical-inverse of the sample index in a distinct
/// prime base per dimension. The first few elements are skipped to avoid the
/// strongly correlated start of the sequence.
pub fn halton(n: usize, dim: usize) -> Vec<Vec<f64>> {
    const BURN_IN: usize = 20;

    let bases = primes(dim);
    (0..n)
        .map(|i| {
            bases
                .iter()
                .map(|&base| radical_inverse(i + BURN_IN + 1, base))
                .collect()
        })
        .collect()
}

fn radical_inverse(mut index: usize, base: usize) -> f64 {
    let mut result = 0.0;
    let mut fraction = 1.0 / base as f64;
    while index > 0 {
        result += (index % base) as f64 * fraction;
        index /= base;
        fraction /= base as f64;
    }
    result
}

/// The first `count` primes.
fn primes(count: usize) -> Vec<usize> {
    let mut found: Vec<usize> = Vec::with_capacity(count);
    let mut candidate = 2;
    while found.len() < count {
        if found.iter().all(|&p| candidate % p != 0) {
            found.push(candidate);
        }
        candidate += 1;
    }
    found
}
