//! Seeded generators of test data.

/// Generates `count` non-decreasing integers starting at `start`, with runs of
/// duplicates. The same seed always produces the same values.
pub fn sorted_i64_with_duplicates(seed: u64, count: usize, start: i64) -> Vec<i64> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut value = start;
    (0..count)
        .map(|_| {
            // A zero step repeats the previous value.
            value += rng.i64(0..3);
            value
        })
        .collect()
}

/// Generates `count` sorted strings of up to `max_len` lowercase letters, possibly with
/// duplicates.
pub fn sorted_strings(seed: u64, count: usize, max_len: usize) -> Vec<String> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut values = (0..count)
        .map(|_| {
            let len = rng.usize(0..=max_len);
            (0..len).map(|_| rng.lowercase()).collect::<String>()
        })
        .collect::<Vec<_>>();
    values.sort();
    values
}

/// Generates `count` random values in `range`, in no particular order.
pub fn random_i32(seed: u64, count: usize, range: std::ops::Range<i32>) -> Vec<i32> {
    let mut rng = fastrand::Rng::with_seed(seed);
    (0..count).map(|_| rng.i32(range.clone())).collect()
}
