// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles documents with a seeded RNG and splits them into a
// training set and a held-out set. The same seed always gives
// the same split, so a held-out score can be reproduced.
//
// Split ratio: `train_fraction` of the documents (rounded) go to
// training, the rest are held out.
//
// Reference: rand crate documentation (StdRng, SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, held_out).
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction.clamp(0.0, 1.0)).round() as usize;
    let split_at = split_at.min(total);

    let held_out = samples.split_off(split_at);

    tracing::debug!(
        "Corpus split: {} training, {} held out (seed {})",
        samples.len(),
        held_out.len(),
        seed,
    );

    (samples, held_out)
}
