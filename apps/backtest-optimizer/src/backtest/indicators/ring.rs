//! Fixed-capacity ring buffer with a running sum.

/// Fixed-capacity ring buffer of `f64` samples.
///
/// Pushing into a full buffer evicts the oldest sample. The running sum is
/// maintained incrementally so window means are O(1).
#[derive(Debug, Clone)]
pub struct RingBuffer {
    values: Vec<f64>,
    capacity: usize,
    head: usize,
    sum: f64,
}

impl RingBuffer {
    /// Create an empty buffer. `capacity` must be non-zero; callers validate.
    ///
    /// Storage grows with the samples pushed, never past `capacity`.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            values: Vec::new(),
            capacity,
            head: 0,
            sum: 0.0,
        }
    }

    /// Push a sample, returning the evicted one when the buffer was full.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        if self.values.len() < self.capacity {
            self.values.push(value);
            self.sum += value;
            return None;
        }

        let evicted = std::mem::replace(&mut self.values[self.head], value);
        self.head = (self.head + 1) % self.capacity;
        self.sum += value - evicted;
        Some(evicted)
    }

    /// Number of samples held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no samples have been pushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True once `capacity` samples have been pushed.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.values.len() == self.capacity
    }

    /// Sum of the held samples.
    #[must_use]
    pub const fn sum(&self) -> f64 {
        self.sum
    }

    /// Mean of the window, once full.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        self.is_full().then(|| self.sum / self.capacity as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_evicts_oldest() {
        let mut ring = RingBuffer::new(3);
        assert_eq!(ring.push(1.0), None);
        assert_eq!(ring.push(2.0), None);
        assert!(ring.mean().is_none());
        assert_eq!(ring.push(3.0), None);
        assert!(ring.is_full());
        assert_eq!(ring.mean(), Some(2.0));

        assert_eq!(ring.push(4.0), Some(1.0));
        assert_eq!(ring.push(5.0), Some(2.0));
        assert_eq!(ring.sum(), 12.0);
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let mut ring = RingBuffer::new(usize::MAX / 2);
        assert_eq!(ring.push(1.0), None);
        assert_eq!(ring.push(2.0), None);
        assert_eq!(ring.len(), 2);
        assert!(!ring.is_full());
        assert!(ring.mean().is_none());
    }
}
