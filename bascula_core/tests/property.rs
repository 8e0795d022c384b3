use bascula_core::{CalibrationState, CommandLineBuffer, MedianWindow, Smoother};
use proptest::prelude::*;

/// Median of the last `min(len, N)` inserted samples, computed the slow way.
fn reference_median<const N: usize>(inserted: &[i32]) -> i32 {
    let start = inserted.len().saturating_sub(N);
    let mut tail = inserted[start..].to_vec();
    tail.sort_unstable();
    tail[tail.len() / 2]
}

fn check_against_reference<const N: usize>(samples: &[i32]) -> Result<(), TestCaseError> {
    let mut w = MedianWindow::<N>::new();
    for (i, &s) in samples.iter().enumerate() {
        w.add(s);
        if i + 1 >= 3 {
            prop_assert_eq!(w.median(), reference_median::<N>(&samples[..=i]));
        }
    }
    prop_assert_eq!(w.len(), samples.len().min(N));
    Ok(())
}

proptest! {
    #[test]
    fn median_matches_sorted_reference_n3(samples in prop::collection::vec(any::<i32>(), 3..60)) {
        check_against_reference::<3>(&samples)?;
    }

    #[test]
    fn median_matches_sorted_reference_n5(samples in prop::collection::vec(any::<i32>(), 3..60)) {
        check_against_reference::<5>(&samples)?;
    }

    #[test]
    fn median_matches_sorted_reference_n15(
        samples in prop::collection::vec(-(1i32 << 23)..(1i32 << 23), 3..120)
    ) {
        check_against_reference::<15>(&samples)?;
    }

    #[test]
    fn raw_to_grams_is_idempotent(
        raw in -(1i32 << 23)..(1i32 << 23),
        tare in -(1i32 << 23)..(1i32 << 23),
        factor in -10.0f32..10.0,
    ) {
        let s = CalibrationState { scale_factor: factor, tare_offset: tare };
        let a = s.raw_to_grams(raw);
        prop_assert_eq!(a.to_bits(), s.raw_to_grams(raw).to_bits());
        prop_assert_eq!(s.raw_to_grams(tare), 0.0);
    }

    #[test]
    fn line_buffer_never_exceeds_bound(
        bytes in prop::collection::vec(any::<u8>(), 0..400),
        max_len in 1usize..100,
    ) {
        let mut b = CommandLineBuffer::new(max_len);
        for byte in bytes {
            let _ = b.push_byte(byte);
            prop_assert!(b.len() <= max_len);
        }
    }

    #[test]
    fn smoother_stays_within_input_range(
        xs in prop::collection::vec(-5_000.0f32..5_000.0, 1..200),
        alpha in 0.01f32..1.0,
    ) {
        let mut s = Smoother::new(alpha);
        let lo = xs.iter().copied().fold(f32::INFINITY, f32::min);
        let hi = xs.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        for x in xs {
            let y = s.update(x);
            prop_assert!(y >= lo - 1e-2 && y <= hi + 1e-2, "y={} not in [{}, {}]", y, lo, hi);
        }
    }
}
