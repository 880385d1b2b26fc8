//! Fixed-capacity trailing window with an O(1) running mean.

/// Trailing window over the last `N` stock levels.
///
/// Grows from one value up to `N`; once full, each push evicts the oldest
/// value. The mean is always over the values actually held, never padded.
#[derive(Debug, Clone)]
pub struct TrailingWindow<const N: usize> {
    values: [u32; N],
    head: usize,
    len: usize,
    sum: u64,
}

impl<const N: usize> TrailingWindow<N> {
    pub fn new() -> Self {
        assert!(N >= 1, "window size must be >= 1");
        Self {
            values: [0; N],
            head: 0,
            len: 0,
            sum: 0,
        }
    }

    pub fn push(&mut self, value: u32) {
        if self.len == N {
            self.sum -= u64::from(self.values[self.head]);
        } else {
            self.len += 1;
        }
        self.values[self.head] = value;
        self.sum += u64::from(value);
        self.head = (self.head + 1) % N;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mean of the held values; `None` before the first push.
    pub fn mean(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        Some(self.sum as f64 / self.len as f64)
    }
}

impl<const N: usize> Default for TrailingWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}
