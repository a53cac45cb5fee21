//! Fletcher32 checksum over entry payloads.

/// Computes the fletcher32 checksum of `data`.
///
/// The input is treated as a sequence of little-endian 16-bit words with
/// an odd trailing byte zero-extended. Sums are folded every 360 words to
/// keep them from overflowing 32 bits.
#[must_use]
pub fn fletcher32(data: &[u8]) -> u32 {
    const MAX_WORDS_PER_ROUND: usize = 360;

    let mut sum1: u32 = 0xffff;
    let mut sum2: u32 = 0xffff;

    let mut words = data.chunks_exact(2);
    let mut pending = data.len() / 2;

    while pending > 0 {
        let round = pending.min(MAX_WORDS_PER_ROUND);
        for _ in 0..round {
            let chunk = words.next().unwrap_or(&[0, 0]);
            sum1 += u32::from(u16::from_le_bytes([chunk[0], chunk[1]]));
            sum2 += sum1;
        }
        pending -= round;
        sum1 = (sum1 & 0xffff) + (sum1 >> 16);
        sum2 = (sum2 & 0xffff) + (sum2 >> 16);
    }

    if let [last] = words.remainder() {
        sum1 += u32::from(*last);
        sum2 += sum1;
        sum1 = (sum1 & 0xffff) + (sum1 >> 16);
        sum2 = (sum2 & 0xffff) + (sum2 >> 16);
    }

    sum1 = (sum1 & 0xffff) + (sum1 >> 16);
    sum2 = (sum2 & 0xffff) + (sum2 >> 16);

    (sum2 << 16) | sum1
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_input() {
        assert_eq!(fletcher32(b""), 0xffff_ffff);
    }

    #[test]
    fn differs_for_different_inputs() {
        assert_ne!(fletcher32(b"abcde"), fletcher32(b"abcdf"));
        assert_ne!(fletcher32(b"abcde"), fletcher32(b"abcd"));
    }

    #[test]
    fn stable_across_calls() {
        let data = b"the quick brown fox jumps over the lazy dog";
        assert_eq!(fletcher32(data), fletcher32(data));
    }

    #[test]
    fn long_input_does_not_overflow() {
        let data = vec![0xffu8; 1 << 20];
        let sum = fletcher32(&data);
        assert_eq!(sum, fletcher32(&data));
    }

    proptest! {
        // Flipping any single bit of a payload must change the checksum.
        #[test]
        fn single_bit_flip_changes_checksum(
            mut data in proptest::collection::vec(any::<u8>(), 1..256),
            bit in 0usize..8,
            index in any::<prop::sample::Index>(),
        ) {
            let original = fletcher32(&data);
            let i = index.index(data.len());
            data[i] ^= 1 << bit;
            prop_assert_ne!(original, fletcher32(&data));
        }
    }
}
