use std::cmp::Ordering;

/// Marker trait for anything usable as a user or item identifier.
pub trait Id: Clone + Eq + std::hash::Hash + Ord + std::fmt::Debug {}

impl<T: Clone + Eq + std::hash::Hash + Ord + std::fmt::Debug> Id for T {}

// ── 8-wide dot product (lets the compiler vectorise on NEON / AVX2) ──────
#[inline(always)]
pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    let mut acc = [0.0f32; 8];
    let ca = a.chunks_exact(8);
    let cb = b.chunks_exact(8);
    let tail: f32 = ca
        .remainder()
        .iter()
        .zip(cb.remainder())
        .map(|(x, y)| x * y)
        .sum();
    for (xa, xb) in ca.zip(cb) {
        for l in 0..8 {
            acc[l] += xa[l] * xb[l];
        }
    }
    (acc[0] + acc[1] + acc[2] + acc[3]) + (acc[4] + acc[5] + acc[6] + acc[7]) + tail
}

pub(crate) struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub(crate) fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0xbad5eed } else { seed },
        }
    }

    #[inline(always)]
    pub(crate) fn next(&mut self) -> u64 {
        self.state ^= self.state << 13;
        self.state ^= self.state >> 7;
        self.state ^= self.state << 17;
        self.state
    }

    #[inline(always)]
    pub(crate) fn next_below(&mut self, n: usize) -> usize {
        (self.next() % n as u64) as usize
    }

    #[inline(always)]
    pub(crate) fn next_float(&mut self) -> f32 {
        let v = self.next() & 0xFFFFFF;
        v as f32 / 0xFFFFFF as f32
    }
}

/// Uniform init in `[-1/sqrt(k), 1/sqrt(k)]`, row-major `n × k`.
pub(crate) fn random_factors(n: usize, k: usize, seed: u64) -> Vec<f32> {
    let mut rng = XorShift64::new(seed);
    let scale = 1.0 / (k as f32).sqrt();
    let mut out = vec![0.0f32; n * k];
    for v in out.iter_mut() {
        *v = (rng.next_float() * 2.0 - 1.0) * scale;
    }
    out
}

#[inline(always)]
pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Descending order on scores. NaN sorts last.
#[inline]
pub(crate) fn by_score_desc(a: f32, b: f32) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    }
}

/// Positions of `scores` ordered by descending score. The sort is stable, so
/// equal scores keep their original (column) order.
pub(crate) fn rank_desc(scores: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| by_score_desc(scores[a], scores[b]));
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_matches_naive_sum_across_remainder() {
        let a: Vec<f32> = (0..13).map(|x| x as f32).collect();
        let b: Vec<f32> = (0..13).map(|x| (x % 3) as f32).collect();
        let naive: f32 = a.iter().zip(&b).map(|(x, y)| x * y).sum();
        assert_eq!(dot(&a, &b), naive);
    }

    #[test]
    fn rank_desc_is_stable_on_ties() {
        let order = rank_desc(&[0.5, 0.9, 0.5, f32::NAN, 0.9]);
        assert_eq!(order, vec![1, 4, 0, 2, 3]);
    }

    #[test]
    fn xorshift_never_sticks_at_zero() {
        let mut rng = XorShift64::new(0);
        assert_ne!(rng.next(), 0);
        assert!(rng.next_below(7) < 7);
    }
}
