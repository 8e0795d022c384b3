//! Fixed-capacity median window over raw counts.
//!
//! The window owns an `[i32; N]` ring plus a write cursor and fill count; no
//! allocation happens after construction. `median()` sorts a stack copy of the
//! filled slots, so the ring itself stays in insertion order.

/// Window size used by the firmware loop (odd, so the median is a sample).
pub const MEDIAN_WINDOW: usize = 15;

/// Fewest samples for which the median output is used; below this the loop
/// falls back to the instantaneous reading.
pub const MIN_MEDIAN_SAMPLES: usize = 3;

#[derive(Debug, Clone)]
pub struct MedianWindow<const N: usize> {
    buf: [i32; N],
    cursor: usize,
    count: usize,
}

impl<const N: usize> Default for MedianWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MedianWindow<N> {
    pub const fn new() -> Self {
        assert!(N > 0, "median window capacity must be > 0");
        Self {
            buf: [0; N],
            cursor: 0,
            count: 0,
        }
    }

    /// Insert a sample, overwriting the oldest once full.
    #[inline]
    pub fn add(&mut self, sample: i32) {
        self.buf[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % N;
        if self.count < N {
            self.count += 1;
        }
    }

    /// Number of samples currently held (≤ N).
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// True once enough samples are held for `median()` to be meaningful.
    #[inline]
    pub fn is_warm(&self) -> bool {
        self.count >= MIN_MEDIAN_SAMPLES.min(N)
    }

    /// Forget all samples.
    pub fn clear(&mut self) {
        self.cursor = 0;
        self.count = 0;
    }

    /// Middle element of the sorted filled samples; 0 when empty.
    ///
    /// For an even fill count this is the upper of the two middle values.
    pub fn median(&self) -> i32 {
        if self.count == 0 {
            return 0;
        }
        // Until the ring wraps, slots 0..count are exactly the filled ones.
        let mut sorted = self.buf;
        let filled = &mut sorted[..self.count];
        filled.sort_unstable();
        filled[self.count / 2]
    }
}
