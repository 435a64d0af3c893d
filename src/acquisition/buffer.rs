use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use super::parser::Sample;

/// Rolling store of the most recent samples
///
/// Keeps the sequence, red and infrared channels in three separate queues
/// that are always pushed and evicted together, so index `i` refers to the
/// same sample in every channel.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    sequence: VecDeque<i64>,
    red: VecDeque<i64>,
    infrared: VecDeque<i64>,
    capacity: usize,
}

/// Independent copy of a [`SampleBuffer`]'s contents, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub sequence: Vec<i64>,
    pub red: Vec<i64>,
    pub infrared: Vec<i64>,
}

impl SampleBuffer {
    /// Create an empty buffer; a capacity of zero is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            sequence: VecDeque::with_capacity(capacity),
            red: VecDeque::with_capacity(capacity),
            infrared: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest one when full
    pub fn push(&mut self, sample: Sample) {
        if self.sequence.len() == self.capacity {
            self.sequence.pop_front();
            self.red.pop_front();
            self.infrared.pop_front();
        }
        self.sequence.push_back(sample.sequence);
        self.red.push_back(sample.red);
        self.infrared.push_back(sample.infrared);
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            sequence: self.sequence.iter().copied().collect(),
            red: self.red.iter().copied().collect(),
            infrared: self.infrared.iter().copied().collect(),
        }
    }

    /// Sample at position `index` (0 is the oldest)
    pub fn get(&self, index: usize) -> Option<Sample> {
        Some(Sample {
            sequence: *self.sequence.get(index)?,
            red: *self.red.get(index)?,
            infrared: *self.infrared.get(index)?,
        })
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.sequence.clear();
        self.red.clear();
        self.infrared.clear();
    }
}

impl Default for SampleBuffer {
    fn default() -> Self {
        Self::new(500)
    }
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn last(&self) -> Option<Sample> {
        let i = self.len().checked_sub(1)?;
        Some(Sample {
            sequence: self.sequence[i],
            red: self.red[i],
            infrared: self.infrared[i],
        })
    }

    pub fn red_f64(&self) -> Vec<f64> {
        self.red.iter().map(|&v| v as f64).collect()
    }

    pub fn infrared_f64(&self) -> Vec<f64> {
        self.infrared.iter().map(|&v| v as f64).collect()
    }
}

/// Sample buffer shared between the acquisition thread and the render tick
///
/// The lock is held only for the duration of a single push or copy.
#[derive(Debug, Clone)]
pub struct SharedSampleBuffer {
    inner: Arc<Mutex<SampleBuffer>>,
}

impl SharedSampleBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SampleBuffer::new(capacity))),
        }
    }

    pub fn append(&self, sample: Sample) {
        self.lock().push(sample);
    }

    pub fn snapshot(&self) -> Snapshot {
        self.lock().snapshot()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    // A panic while holding the lock cannot leave the queues misaligned
    // (push and pop never unwind midway), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, SampleBuffer> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for SharedSampleBuffer {
    fn default() -> Self {
        Self::new(500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(n: i64) -> Sample {
        Sample {
            sequence: n,
            red: 1000 + n,
            infrared: 2000 + n,
        }
    }

    #[test]
    fn test_fills_up_to_capacity() {
        let mut buffer = SampleBuffer::new(4);
        for n in 0..3 {
            buffer.push(sample(n));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.snapshot().sequence, vec![0, 1, 2]);
    }

    #[test]
    fn test_fifo_eviction_keeps_last_n() {
        let mut buffer = SampleBuffer::new(5);
        for n in 0..23 {
            buffer.push(sample(n));
        }
        let snap = buffer.snapshot();
        assert_eq!(snap.sequence, vec![18, 19, 20, 21, 22]);
        assert_eq!(snap.red, vec![1018, 1019, 1020, 1021, 1022]);
        assert_eq!(snap.infrared, vec![2018, 2019, 2020, 2021, 2022]);
    }

    #[test]
    fn test_one_past_capacity() {
        let mut buffer = SampleBuffer::new(500);
        for n in 0..500 {
            buffer.push(sample(n));
        }
        assert_eq!(buffer.get(0), Some(sample(0)));

        buffer.push(sample(500));

        assert_eq!(buffer.len(), 500);
        let snap = buffer.snapshot();
        assert!(!snap.sequence.contains(&0));
        assert_eq!(snap.sequence[0], 1);
        assert_eq!(snap.last(), Some(sample(500)));
    }

    #[test]
    fn test_channels_stay_aligned() {
        let mut buffer = SampleBuffer::new(3);
        for n in 0..10 {
            buffer.push(sample(n));
            for i in 0..buffer.len() {
                let s = buffer.get(i).unwrap();
                assert_eq!(s.red - 1000, s.sequence);
                assert_eq!(s.infrared - 2000, s.sequence);
            }
        }
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut buffer = SampleBuffer::new(3);
        buffer.push(sample(1));
        let snap = buffer.snapshot();
        buffer.push(sample(2));
        assert_eq!(snap.len(), 1);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_zero_capacity_is_raised() {
        let mut buffer = SampleBuffer::new(0);
        buffer.push(sample(1));
        buffer.push(sample(2));
        assert_eq!(buffer.capacity(), 1);
        assert_eq!(buffer.snapshot().sequence, vec![2]);
    }

    #[test]
    fn test_shared_buffer_across_threads() {
        let shared = SharedSampleBuffer::new(100);
        let writer = shared.clone();

        let handle = std::thread::spawn(move || {
            for n in 0..1000 {
                writer.append(sample(n));
            }
        });

        while !handle.is_finished() {
            let snap = shared.snapshot();
            assert!(snap.len() <= 100);
            assert_eq!(snap.red.len(), snap.sequence.len());
            assert_eq!(snap.infrared.len(), snap.sequence.len());
        }
        handle.join().unwrap();

        let snap = shared.snapshot();
        assert_eq!(snap.len(), 100);
        assert_eq!(snap.sequence.first(), Some(&900));
        assert_eq!(snap.sequence.last(), Some(&999));
    }

    #[test]
    fn test_empty_snapshot() {
        let buffer = SampleBuffer::default();
        let snap = buffer.snapshot();
        assert!(snap.is_empty());
        assert_eq!(snap.last(), None);
    }
}
