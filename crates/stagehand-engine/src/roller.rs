//! Randomness seam. Every draw the engine makes goes through [`Roller`]
//! so tests can substitute scripted sequences and assert exact outcomes.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

pub trait Roller: Send {
    /// Uniform draw in `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Uniform integer draw in `[lo, hi]`, inclusive on both ends.
    fn int_in(&mut self, lo: i64, hi: i64) -> i64;

    /// Weighted coin flip: true with probability `p`.
    fn chance(&mut self, p: f64) -> bool {
        self.unit() < p
    }
}

/// Production roller backed by `rand`.
pub struct StdRoller {
    rng: StdRng,
}

impl Default for StdRoller {
    fn default() -> Self {
        Self::new()
    }
}

impl StdRoller {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Roller for StdRoller {
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn int_in(&mut self, lo: i64, hi: i64) -> i64 {
        if lo >= hi {
            return lo;
        }
        self.rng.gen_range(lo..=hi)
    }
}

/// Scripted roller for tests. Queued values are consumed in order; an
/// exhausted queue falls back to `0.0` for units (every chance passes)
/// and the range minimum for integers.
pub struct ScriptRoller {
    units: VecDeque<f64>,
    ints: VecDeque<i64>,
}

impl Default for ScriptRoller {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRoller {
    pub fn new() -> Self {
        Self {
            units: VecDeque::new(),
            ints: VecDeque::new(),
        }
    }

    pub fn with_units(mut self, units: &[f64]) -> Self {
        self.units.extend(units);
        self
    }

    pub fn with_ints(mut self, ints: &[i64]) -> Self {
        self.ints.extend(ints);
        self
    }
}

impl Roller for ScriptRoller {
    fn unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(0.0)
    }

    fn int_in(&mut self, lo: i64, hi: i64) -> i64 {
        match self.ints.pop_front() {
            Some(v) => v.clamp(lo, hi),
            None => lo,
        }
    }
}

/// Uniform pick from a slice.
pub fn pick<'a, T, R: Roller + ?Sized>(roller: &mut R, items: &'a [T]) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    let idx = roller.int_in(0, items.len() as i64 - 1) as usize;
    items.get(idx)
}

/// Weighted pick: probability of each item is its weight over the total.
pub fn weighted_pick<'a, T, R, W>(roller: &mut R, items: &'a [T], weight: W) -> Option<&'a T>
where
    R: Roller + ?Sized,
    W: Fn(&T) -> u32,
{
    let total: u64 = items.iter().map(|i| weight(i) as u64).sum();
    if total == 0 {
        return items.first();
    }
    let mut remaining = roller.unit() * total as f64;
    for item in items {
        remaining -= weight(item) as f64;
        if remaining <= 0.0 {
            return Some(item);
        }
    }
    items.first()
}

/// In-place Fisher-Yates shuffle.
pub fn shuffle<T, R: Roller + ?Sized>(roller: &mut R, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = roller.int_in(0, i as i64) as usize;
        items.swap(i, j);
    }
}

/// Opaque EVM-style transaction hash: `0x` plus 32 random bytes.
pub fn tx_hash<R: Roller + ?Sized>(roller: &mut R) -> String {
    let bytes: Vec<u8> = (0..32).map(|_| roller.int_in(0, 255) as u8).collect();
    format!("0x{}", hex::encode(bytes))
}

const BASE58_ALPHABET: &[u8] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Plausible-looking base58 wallet address for synthetic users.
pub fn wallet_address<R: Roller + ?Sized>(roller: &mut R) -> String {
    (0..44)
        .map(|_| {
            let idx = roller.int_in(0, BASE58_ALPHABET.len() as i64 - 1) as usize;
            BASE58_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_std_roller_bounds() {
        let mut roller = StdRoller::seeded(7);
        for _ in 0..200 {
            let v = roller.int_in(3, 9);
            assert!((3..=9).contains(&v));
            let u = roller.unit();
            assert!((0.0..1.0).contains(&u));
        }
        // Degenerate range collapses to its single value.
        assert_eq!(roller.int_in(5, 5), 5);
    }

    #[test]
    fn test_script_roller_replays_then_falls_back() {
        let mut roller = ScriptRoller::new().with_units(&[0.9]).with_ints(&[4, 99]);
        assert!(!roller.chance(0.5));
        assert!(roller.chance(0.5)); // fallback 0.0
        assert_eq!(roller.int_in(0, 10), 4);
        assert_eq!(roller.int_in(0, 10), 10); // 99 clamped
        assert_eq!(roller.int_in(2, 10), 2); // fallback lo
    }

    #[test]
    fn test_weighted_pick_walks_cumulative_weights() {
        let items = vec![("CLAW", 70u32), ("USDC", 20), ("ETH", 10)];
        // 0.75 of total 100 lands past the first two buckets.
        let mut roller = ScriptRoller::new().with_units(&[0.95]);
        let picked = weighted_pick(&mut roller, &items, |i| i.1).unwrap();
        assert_eq!(picked.0, "ETH");

        let mut roller = ScriptRoller::new().with_units(&[0.1]);
        let picked = weighted_pick(&mut roller, &items, |i| i.1).unwrap();
        assert_eq!(picked.0, "CLAW");
    }

    #[test]
    fn test_weighted_pick_zero_total() {
        let items = vec![("A", 0u32), ("B", 0)];
        let mut roller = ScriptRoller::new();
        assert_eq!(weighted_pick(&mut roller, &items, |i| i.1).unwrap().0, "A");
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut roller = StdRoller::seeded(11);
        let mut items: Vec<u32> = (0..50).collect();
        shuffle(&mut roller, &mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_tx_hash_shape() {
        let mut roller = StdRoller::seeded(3);
        let hash = tx_hash(&mut roller);
        assert!(hash.starts_with("0x"));
        assert_eq!(hash.len(), 66);
    }

    #[test]
    fn test_wallet_address_alphabet() {
        let mut roller = StdRoller::seeded(5);
        let addr = wallet_address(&mut roller);
        assert_eq!(addr.len(), 44);
        assert!(addr.bytes().all(|b| BASE58_ALPHABET.contains(&b)));
    }
}
