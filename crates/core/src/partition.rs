//! The partition algorithm: split a total length into ordered part sizes.

use crate::error::{Error, Result};

/// Compute the ordered part sizes for a file of `total` bytes.
///
/// While bytes remain, each step takes `ceil(remaining / slots)` where
/// `slots` starts at `split_count` and shrinks by one per part. When that
/// share drops to `min_chunk_size` or below, the step takes
/// `min(remaining, min_chunk_size)` instead, so the tail of a file is cut
/// into minimum-sized parts with the residual absorbed by the final one.
///
/// Large files therefore yield `split_count` roughly equal parts; small
/// files yield fewer. The returned sizes always sum to `total`, and a
/// `total` of zero yields no parts at all.
pub fn part_sizes(total: u64, split_count: u32, min_chunk_size: u64) -> Result<Vec<u64>> {
    if split_count == 0 {
        return Err(Error::InvalidSplitCount(split_count));
    }
    if min_chunk_size == 0 {
        return Err(Error::InvalidMinChunkSize(min_chunk_size));
    }

    let mut sizes = Vec::with_capacity(split_count as usize);
    let mut remain = total;
    let mut slots = u64::from(split_count);

    while remain > 0 {
        let mut share = remain.div_ceil(slots);
        if share <= min_chunk_size {
            share = remain.min(min_chunk_size);
        }

        sizes.push(share);
        remain -= share;
        // At slots == 1 the whole remainder is always consumed above, so
        // slots never reaches zero while bytes remain.
        slots = slots.saturating_sub(1);
    }

    Ok(sizes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partition(total: u64, split_count: u32, min_chunk_size: u64, expected: &[u64]) {
        let sizes = part_sizes(total, split_count, min_chunk_size).unwrap();
        assert_eq!(sizes, expected, "total={total} split={split_count} min={min_chunk_size}");
        assert_eq!(sizes.iter().sum::<u64>(), total);
    }

    #[test]
    fn splits_evenly_divisible_total() {
        assert_partition(12, 3, 1, &[4, 4, 4]);
    }

    #[test]
    fn ceil_share_front_loads_the_remainder() {
        // 10/3 -> ceil 4, then 6/2 -> 3, then 3/1 -> 3.
        assert_partition(10, 3, 2, &[4, 3, 3]);
    }

    #[test]
    fn clamps_to_min_chunk_size_near_the_tail() {
        // ceil(7/3)=3 <= 3 so every step clamps; the last part takes the
        // residual byte.
        assert_partition(7, 3, 3, &[3, 3, 1]);
    }

    #[test]
    fn small_file_yields_fewer_parts_than_split_count() {
        // 100 bytes over 3 slots with a 50-byte minimum: two parts only.
        assert_partition(100, 3, 50, &[50, 50]);
    }

    #[test]
    fn total_smaller_than_min_chunk_is_one_part() {
        assert_partition(3, 4, 16, &[3]);
    }

    #[test]
    fn zero_total_yields_no_parts() {
        assert_partition(0, 3, 8, &[]);
    }

    #[test]
    fn single_slot_takes_everything() {
        assert_partition(1000, 1, 1, &[1000]);
    }

    #[test]
    fn never_produces_more_parts_than_split_count() {
        for total in [1u64, 7, 64, 999, 4096] {
            for split in [1u32, 2, 3, 7] {
                for min in [1u64, 4, 100] {
                    let sizes = part_sizes(total, split, min).unwrap();
                    assert!(sizes.len() <= split as usize);
                    assert_eq!(sizes.iter().sum::<u64>(), total);
                    assert!(sizes.iter().all(|&s| s > 0));
                }
            }
        }
    }

    #[test]
    fn rejects_zero_preconditions() {
        assert!(matches!(
            part_sizes(10, 0, 1),
            Err(Error::InvalidSplitCount(0))
        ));
        assert!(matches!(
            part_sizes(10, 1, 0),
            Err(Error::InvalidMinChunkSize(0))
        ));
    }
}
