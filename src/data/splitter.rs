// ============================================================
// Layer 4 - Train/Validation Splitter
// ============================================================
// Shuffles samples and splits them into two sets:
//   - Training set:   used to update model weights
//   - Validation set: used to measure fit on unseen points,
//                     and to drive the plateau scheduler
//
// The shuffle is seeded, so a config seed reproduces the split.
// Transition samples from one trajectory are strongly
// correlated in time; shuffling before the split spreads every
// input regime across both sets.
//
// Split ratio: 80% training, 20% validation (configurable)
//
// Reference: rand crate documentation (SliceRandom)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// # Example
/// ```
/// use robustnn::data::splitter::split_train_val;
/// let (train, val) = split_train_val((0..10).collect::<Vec<_>>(), 0.8, 7);
/// assert_eq!((train.len(), val.len()), (8, 2));
/// ```
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total = samples.len();
    let split_at = ((total as f64) * train_fraction.clamp(0.0, 1.0)).round() as usize;
    let val = samples.split_off(split_at.min(total));

    tracing::debug!(
        train = samples.len(),
        val = val.len(),
        fraction = train_fraction,
        "split samples"
    );

    (samples, val)
}
