/// Asserts that a destination region has room for `count` slots.
///
/// Writing past the end of a region is undefined behavior at the raw-pointer
/// level, so the bulk algorithms turn it into a panic before any slot is
/// touched.
#[macro_export]
macro_rules! assert_region_fits {
    ($region:expr, $count:expr) => {{
        let available = $region.len();
        let count = $count;
        assert!(
            count <= available,
            "destination region too small: {count} slots requested, {available} available"
        );
    }};
}
