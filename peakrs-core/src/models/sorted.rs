//! In-place operations on sorted sequences shared by the read and fragment
//! tracks.

use rand::Rng;
use rand::seq::index;

/// Keep at most `max_dup` copies of every value of a sorted sequence. Dropped
/// values are pushed to `removed` when given. Returns how many were dropped.
pub(crate) fn cap_duplicates<T: PartialEq + Copy>(
    values: &mut Vec<T>,
    max_dup: u64,
    mut removed: Option<&mut Vec<T>>,
) -> u64 {
    let mut previous: Option<T> = None;
    let mut copies: u64 = 0;
    let mut dropped: u64 = 0;

    values.retain(|&value| {
        if previous == Some(value) {
            copies += 1;
        } else {
            previous = Some(value);
            copies = 1;
        }
        if copies <= max_dup {
            return true;
        }
        dropped += 1;
        if let Some(side) = removed.as_deref_mut() {
            side.push(value);
        }
        false
    });

    dropped
}

/// Keep exactly `k` elements chosen uniformly across all groups, in their
/// original order. The caller guarantees `k` does not exceed the total.
pub(crate) fn sample_in_place<T, R: Rng + ?Sized>(
    groups: &mut [&mut Vec<T>],
    k: usize,
    rng: &mut R,
) {
    let total: usize = groups.iter().map(|g| g.len()).sum();
    let mut selected = index::sample(rng, total, k).into_vec();
    selected.sort_unstable();
    let mut selected = selected.into_iter().peekable();

    let mut offset = 0usize;
    for group in groups.iter_mut() {
        let len = group.len();
        let mut i = 0usize;
        group.retain(|_| {
            let global = offset + i;
            i += 1;
            if selected.peek() == Some(&global) {
                selected.next();
                true
            } else {
                false
            }
        });
        offset += len;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rstest::*;

    #[rstest]
    fn test_cap_duplicates() {
        let mut values = vec![1, 1, 1, 2, 3, 3, 3, 3];
        let mut side = Vec::new();
        let dropped = cap_duplicates(&mut values, 2, Some(&mut side));
        assert_eq!(dropped, 3);
        assert_eq!(values, vec![1, 1, 2, 3, 3]);
        assert_eq!(side, vec![1, 3, 3]);
    }

    #[rstest]
    fn test_sample_in_place_keeps_order_and_count() {
        let mut a: Vec<u32> = (0..50).collect();
        let mut b: Vec<u32> = (100..130).collect();
        let mut rng = StdRng::seed_from_u64(3);
        sample_in_place(&mut [&mut a, &mut b], 20, &mut rng);
        assert_eq!(a.len() + b.len(), 20);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
        assert!(b.windows(2).all(|w| w[0] < w[1]));
    }
}
