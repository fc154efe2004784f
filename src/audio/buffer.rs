//! Fixed-capacity circular (ring) buffer between the cpal callback and the
//! blocking reader.
//!
//! When the buffer is full, new samples **overwrite** the oldest data and
//! [`push_slice`](RingBuffer::push_slice) reports how many were lost. For a
//! live feed the newest audio matters; the count lets the reader surface the
//! loss as an overrun.
//!
//! # Example
//!
//! ```rust
//! use mic_to_serial::audio::RingBuffer;
//!
//! let mut buf = RingBuffer::new(4);
//! let lost = buf.push_slice(&[1, 2, 3, 4, 5]); // capacity 4 → oldest dropped
//! assert_eq!(lost, 1);
//! assert_eq!(buf.pop_front(3), vec![2, 3, 4]);
//! assert_eq!(buf.len(), 1);
//! ```

// ---------------------------------------------------------------------------
// RingBuffer
// ---------------------------------------------------------------------------

/// A fixed-capacity circular FIFO.
///
/// Generic over `T: Copy + Default`; the capture path uses `RingBuffer<i16>`.
/// The buffer never allocates beyond its initial capacity.
pub struct RingBuffer<T> {
    buf: Vec<T>,
    capacity: usize,
    /// Index of the oldest stored sample.
    head: usize,
    /// Number of valid samples currently stored (≤ `capacity`).
    len: usize,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Create a new ring buffer with the given `capacity`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "RingBuffer capacity must be > 0");
        Self {
            buf: vec![T::default(); capacity],
            capacity,
            head: 0,
            len: 0,
        }
    }

    /// Append `data`, overwriting the oldest samples once full.
    ///
    /// Returns the number of samples that were overwritten.
    pub fn push_slice(&mut self, data: &[T]) -> usize {
        let mut overwritten = 0;
        for &item in data {
            let tail = (self.head + self.len) % self.capacity;
            self.buf[tail] = item;
            if self.len < self.capacity {
                self.len += 1;
            } else {
                self.head = (self.head + 1) % self.capacity;
                overwritten += 1;
            }
        }
        overwritten
    }

    /// Remove and return up to `n` of the oldest samples, in order.
    pub fn pop_front(&mut self, n: usize) -> Vec<T> {
        let n = n.min(self.len);
        let mut result = Vec::with_capacity(n);
        for i in 0..n {
            result.push(self.buf[(self.head + i) % self.capacity]);
        }
        self.head = (self.head + n) % self.capacity;
        self.len -= n;
        result
    }

    /// Number of valid samples currently stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when the buffer contains no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Maximum number of samples the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
