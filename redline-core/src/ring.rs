//! Ingest ring buffers
//!
//! Single-producer single-consumer queues between a receive interrupt and
//! the polling loop that feeds a decoder. The producer never blocks: when
//! the queue is full the newest item is dropped and counted, and everything
//! already queued stays in order.
//!
//! ```text
//!   ISR ──push──▶ [ IngestRing<T, N> ] ──pop/drain──▶ decoder
//!                       │
//!                       └── dropped counter (readable from both halves)
//! ```

use heapless::spsc::{Consumer, Producer, Queue};
use portable_atomic::{AtomicU32, Ordering};

/// Fixed-capacity ring holding at most `N - 1` items
///
/// `N` must be a power of two.
pub struct IngestRing<T, const N: usize> {
    queue: Queue<T, N>,
    dropped: AtomicU32,
}

impl<T, const N: usize> Default for IngestRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize> IngestRing<T, N> {
    pub const fn new() -> Self {
        assert!(N >= 2 && N.is_power_of_two(), "ring size must be a power of two");
        Self {
            queue: Queue::new(),
            dropped: AtomicU32::new(0),
        }
    }

    /// Usable slots
    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Split into the interrupt-side and polling-side halves
    pub fn split(&mut self) -> (IngestProducer<'_, T, N>, IngestConsumer<'_, T, N>) {
        let (producer, consumer) = self.queue.split();
        let dropped = &self.dropped;
        (
            IngestProducer {
                inner: producer,
                dropped,
            },
            IngestConsumer {
                inner: consumer,
                dropped,
            },
        )
    }
}

/// Writing half, owned by the receive interrupt
pub struct IngestProducer<'a, T, const N: usize> {
    inner: Producer<'a, T, N>,
    dropped: &'a AtomicU32,
}

impl<'a, T, const N: usize> IngestProducer<'a, T, N> {
    /// Queue one item; returns `false` if it was dropped because the ring
    /// is full
    pub fn push(&mut self, item: T) -> bool {
        match self.inner.enqueue(item) {
            Ok(()) => true,
            Err(_) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    pub fn is_full(&self) -> bool {
        !self.inner.ready()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len() == 0
    }

    /// Items dropped since start-up
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Reading half, owned by the polling loop
pub struct IngestConsumer<'a, T, const N: usize> {
    inner: Consumer<'a, T, N>,
    dropped: &'a AtomicU32,
}

impl<'a, T, const N: usize> IngestConsumer<'a, T, N> {
    /// Oldest queued item
    pub fn pop(&mut self) -> Option<T> {
        self.inner.dequeue()
    }

    /// Hand at most `budget` items to `sink`, oldest first
    ///
    /// Returns the number of items drained.
    pub fn drain(&mut self, budget: usize, mut sink: impl FnMut(T)) -> usize {
        let mut drained = 0;
        while drained < budget {
            let Some(item) = self.inner.dequeue() else {
                break;
            };
            sink(item);
            drained += 1;
        }
        drained
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        !self.inner.ready()
    }

    /// Items the producer dropped since start-up
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}
