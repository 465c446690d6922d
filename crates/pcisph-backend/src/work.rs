//! Work-size rounding.

use pcisph_core::WORK_GROUP_SIZE;

/// Round `n` up to the next multiple of `group`.
///
/// `0` stays `0`, so empty domains produce empty dispatches. A `group` of
/// zero returns `n` unchanged.
#[inline]
pub fn round_up(n: usize, group: usize) -> usize {
    if group == 0 {
        return n;
    }
    n.div_ceil(group) * group
}

/// Global work size for a domain of `n` items at the default group size.
#[inline]
pub fn global_work_size(n: usize) -> usize {
    round_up(n, WORK_GROUP_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_values() {
        assert_eq!(round_up(0, 256), 0);
        assert_eq!(round_up(1, 256), 256);
        assert_eq!(round_up(256, 256), 256);
        assert_eq!(round_up(257, 256), 512);
        assert_eq!(global_work_size(1000), 1024);
    }

    proptest! {
        #[test]
        fn smallest_covering_multiple(n in 0usize..1_000_000, group in 1usize..1024) {
            let r = round_up(n, group);
            prop_assert!(r >= n);
            prop_assert_eq!(r % group, 0);
            prop_assert!(r < n + group);
        }
    }
}
