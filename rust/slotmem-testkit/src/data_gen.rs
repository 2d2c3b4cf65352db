//! Random element data for randomized tests.

/// Generates `count` random ASCII alphanumeric strings of up to `max_len`
/// characters each.
pub fn random_strings(count: usize, max_len: usize) -> Vec<String> {
    (0..count)
        .map(|_| {
            let len = fastrand::usize(0..=max_len);
            std::iter::repeat_with(fastrand::alphanumeric)
                .take(len)
                .collect()
        })
        .collect()
}

/// Generates `count` random `u64` values.
pub fn random_u64s(count: usize) -> Vec<u64> {
    std::iter::repeat_with(|| fastrand::u64(..))
        .take(count)
        .collect()
}
