//! Lock-free ring buffer between the stream callback and the capture thread
//!
//! The cpal callback runs on a real-time thread and MUST NOT allocate or
//! block, so all storage is pre-allocated and handoff to the capture thread
//! uses atomic indices only. Single producer (the callback), single
//! consumer (the capture loop).

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Default capacity in samples: a few seconds of 48 kHz stereo float audio,
/// enough to ride out capture-thread scheduling hiccups.
const DEFAULT_CAPACITY: usize = 1 << 18;

/// A lock-free single-producer single-consumer ring buffer for f32 samples
pub struct AudioRingBuffer {
    buffer: UnsafeCell<Box<[f32]>>,
    capacity: usize,
    write_pos: AtomicUsize,
    read_pos: AtomicUsize,
}

// Safety: SPSC discipline. The atomic write_pos/read_pos with acquire/release
// ordering guarantee producer and consumer never touch the same indices at
// the same time.
unsafe impl Send for AudioRingBuffer {}
unsafe impl Sync for AudioRingBuffer {}

impl Default for AudioRingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioRingBuffer {
    /// Create a ring buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a ring buffer holding up to `capacity - 1` samples.
    ///
    /// One slot is kept empty to distinguish a full buffer from an empty one.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 1, "ring buffer capacity must exceed 1");
        Self {
            buffer: UnsafeCell::new(vec![0.0; capacity].into_boxed_slice()),
            capacity,
            write_pos: AtomicUsize::new(0),
            read_pos: AtomicUsize::new(0),
        }
    }

    /// Total slot count of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples currently readable.
    pub fn available(&self) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);

        if write >= read {
            write - read
        } else {
            self.capacity - read + write
        }
    }

    /// Write samples (producer side, called from the stream callback).
    ///
    /// Lock-free and allocation-free. Returns how many samples were
    /// actually written; anything beyond the free space is dropped by the
    /// caller.
    pub fn write(&self, samples: &[f32]) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);

        let free = if write >= read {
            self.capacity - (write - read) - 1
        } else {
            read - write - 1
        };

        let to_write = samples.len().min(free);
        if to_write == 0 {
            return 0;
        }

        // Safety: SPSC guarantees the reader never holds these indices
        let buffer_ptr = self.buffer.get();
        for (i, &sample) in samples.iter().enumerate().take(to_write) {
            unsafe {
                let idx = (write + i) % self.capacity;
                (*buffer_ptr)[idx] = sample;
            }
        }

        self.write_pos
            .store((write + to_write) % self.capacity, Ordering::Release);
        to_write
    }

    /// Read samples (consumer side).
    ///
    /// Returns how many samples were copied into `output`.
    pub fn read(&self, output: &mut [f32]) -> usize {
        let write = self.write_pos.load(Ordering::Acquire);
        let read = self.read_pos.load(Ordering::Acquire);

        let available = if write >= read {
            write - read
        } else {
            self.capacity - read + write
        };

        let to_read = output.len().min(available);
        if to_read == 0 {
            return 0;
        }

        // Safety: SPSC guarantees the writer never holds these indices
        let buffer_ptr = self.buffer.get();
        for (i, sample) in output.iter_mut().enumerate().take(to_read) {
            let idx = (read + i) % self.capacity;
            *sample = unsafe { (*buffer_ptr)[idx] };
        }

        self.read_pos
            .store((read + to_read) % self.capacity, Ordering::Release);
        to_read
    }

    /// Drop everything currently buffered.
    pub fn clear(&self) {
        self.read_pos
            .store(self.write_pos.load(Ordering::Acquire), Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_new_buffer_is_empty() {
        let buffer = AudioRingBuffer::new();
        assert_eq!(buffer.capacity(), DEFAULT_CAPACITY);
        assert_eq!(buffer.available(), 0);
    }

    #[test]
    fn test_write_then_read() {
        let buffer = AudioRingBuffer::with_capacity(64);

        let samples = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(buffer.write(&samples), 5);
        assert_eq!(buffer.available(), 5);

        let mut output = [0.0; 5];
        assert_eq!(buffer.read(&mut output), 5);
        assert_eq!(output, samples);
        assert_eq!(buffer.available(), 0);
    }

    #[test]
    fn test_partial_read() {
        let buffer = AudioRingBuffer::with_capacity(64);
        buffer.write(&[1.0, 2.0, 3.0, 4.0, 5.0]);

        let mut output = [0.0; 3];
        assert_eq!(buffer.read(&mut output), 3);
        assert_eq!(output, [1.0, 2.0, 3.0]);

        let mut rest = [0.0; 5];
        assert_eq!(buffer.read(&mut rest), 2);
        assert_eq!(rest[..2], [4.0, 5.0]);
    }

    #[test]
    fn test_wraparound() {
        let buffer = AudioRingBuffer::with_capacity(16);

        // Walk the indices past the end a few times
        for round in 0..5 {
            let chunk: Vec<f32> = (0..10).map(|i| (round * 10 + i) as f32).collect();
            assert_eq!(buffer.write(&chunk), 10);
            let mut out = [0.0; 10];
            assert_eq!(buffer.read(&mut out), 10);
            assert_eq!(out[0], (round * 10) as f32);
            assert_eq!(out[9], (round * 10 + 9) as f32);
        }
    }

    #[test]
    fn test_overflow_drops_excess() {
        let buffer = AudioRingBuffer::with_capacity(8);
        let big = [0.5f32; 32];
        let written = buffer.write(&big);
        // capacity - 1 usable slots
        assert_eq!(written, 7);
    }

    #[test]
    fn test_clear() {
        let buffer = AudioRingBuffer::with_capacity(64);
        buffer.write(&[1.0, 2.0, 3.0]);
        buffer.clear();
        assert_eq!(buffer.available(), 0);
    }

    #[test]
    fn test_concurrent_producer_consumer() {
        let buffer = Arc::new(AudioRingBuffer::with_capacity(1024));
        let producer = buffer.clone();
        let consumer = buffer.clone();

        const NUM_SAMPLES: usize = 100_000;

        let producer_handle = thread::spawn(move || {
            let mut total_written = 0;
            let mut value = 0.0f32;

            while total_written < NUM_SAMPLES {
                let chunk: Vec<f32> = (0..100).map(|i| value + i as f32).collect();
                let written = producer.write(&chunk);
                total_written += written;
                value += written as f32;

                if written < 100 {
                    thread::yield_now();
                }
            }
            total_written
        });

        let consumer_handle = thread::spawn(move || {
            let mut total_read = 0;
            let mut output = vec![0.0; 100];

            while total_read < NUM_SAMPLES {
                let read = consumer.read(&mut output);
                total_read += read;
                if read == 0 {
                    thread::yield_now();
                }
            }
            total_read
        });

        assert!(producer_handle.join().unwrap() >= NUM_SAMPLES);
        assert!(consumer_handle.join().unwrap() >= NUM_SAMPLES);
    }
}
