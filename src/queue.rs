//! Bounded single-producer/single-consumer command queue
//!
//! Carries device commands from the bus-facing context (producer) to the
//! rendering context (consumer) without locks. The queue is split into a
//! [`CommandProducer`] and a [`CommandConsumer`]; neither half is `Clone`, so
//! the single-writer invariant on each index is enforced by ownership.
//!
//! Memory is fixed at creation (capacity rounded up to a power of two).
//!
//! # Overflow policy
//!
//! When the queue is full the **newest** command is dropped and the drop
//! counter is incremented. The producer never touches the consumer's index, so
//! dropping is the only policy that keeps both indices single-writer and never
//! stalls the bus.

use crate::{PicoGusError, Result};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;

/// Largest queue the firmware will allocate
pub const MAX_QUEUE_CAPACITY: usize = 1 << 16;

struct Shared<T> {
    slots: Box<[UnsafeCell<T>]>,
    mask: usize,
    /// Next slot to read; written only by the consumer
    head: AtomicUsize,
    /// Next slot to write; written only by the producer
    tail: AtomicUsize,
    /// Commands discarded because the queue was full; written only by the producer
    dropped: AtomicU32,
}

// Slots are only accessed through the split halves: the producer writes a slot
// strictly before publishing it with a Release store to `tail`, and the
// consumer reads it strictly after observing that store with Acquire.
unsafe impl<T: Send> Sync for Shared<T> {}

impl<T> Shared<T> {
    fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn len(&self) -> usize {
        let tail = self.tail.load(Ordering::Acquire);
        let head = self.head.load(Ordering::Acquire);
        tail.wrapping_sub(head)
    }
}

/// Producer half, owned by the bus-facing context
pub struct CommandProducer<T> {
    shared: Arc<Shared<T>>,
}

/// Consumer half, owned by the rendering context
pub struct CommandConsumer<T> {
    shared: Arc<Shared<T>>,
}

/// Create a queue holding at least `capacity` commands
///
/// # Errors
///
/// Returns an error if:
/// - Requested capacity is 0
/// - Requested capacity exceeds [`MAX_QUEUE_CAPACITY`]
pub fn command_queue<T: Copy + Default + Send>(
    capacity: usize,
) -> Result<(CommandProducer<T>, CommandConsumer<T>)> {
    if capacity == 0 {
        return Err(PicoGusError::QueueError(
            "Command queue capacity must be greater than 0".into(),
        ));
    }
    if capacity > MAX_QUEUE_CAPACITY {
        return Err(PicoGusError::QueueError(format!(
            "Command queue capacity {capacity} exceeds maximum {MAX_QUEUE_CAPACITY}"
        )));
    }

    let capacity = capacity.next_power_of_two();
    let slots = (0..capacity)
        .map(|_| UnsafeCell::new(T::default()))
        .collect::<Vec<_>>()
        .into_boxed_slice();

    let shared = Arc::new(Shared {
        slots,
        mask: capacity - 1,
        head: AtomicUsize::new(0),
        tail: AtomicUsize::new(0),
        dropped: AtomicU32::new(0),
    });

    Ok((
        CommandProducer {
            shared: Arc::clone(&shared),
        },
        CommandConsumer { shared },
    ))
}

impl<T: Copy> CommandProducer<T> {
    /// Enqueue a command without blocking
    ///
    /// Returns `false` if the queue was full and the command was dropped.
    #[inline]
    pub fn push(&mut self, command: T) -> bool {
        let tail = self.shared.tail.load(Ordering::Relaxed);
        let head = self.shared.head.load(Ordering::Acquire);

        if tail.wrapping_sub(head) >= self.shared.capacity() {
            let dropped = self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            if dropped % 256 == 0 {
                tracing::warn!(dropped = dropped + 1, "command queue full, dropping newest");
            }
            return false;
        }

        // SAFETY: the slot at `tail` is not visible to the consumer until the
        // Release store below, and only this producer writes slots.
        unsafe {
            *self.shared.slots[tail & self.shared.mask].get() = command;
        }
        self.shared
            .tail
            .store(tail.wrapping_add(1), Ordering::Release);
        true
    }

    /// Commands waiting to be consumed
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Whether the consumer has caught up
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the next push would be dropped
    pub fn is_full(&self) -> bool {
        self.len() >= self.shared.capacity()
    }

    /// Total commands dropped since creation
    pub fn dropped(&self) -> u32 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Slot count (a power of two)
    pub fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

impl<T: Copy> CommandConsumer<T> {
    /// Dequeue the oldest command
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        let head = self.shared.head.load(Ordering::Relaxed);
        let tail = self.shared.tail.load(Ordering::Acquire);
        if head == tail {
            return None;
        }

        // SAFETY: the Acquire load of `tail` makes the producer's write of
        // this slot visible, and the producer will not reuse it until `head`
        // moves past it.
        let command = unsafe { *self.shared.slots[head & self.shared.mask].get() };
        self.shared
            .head
            .store(head.wrapping_add(1), Ordering::Release);
        Some(command)
    }

    /// Apply `f` to every queued command, returning how many were consumed
    pub fn drain<F: FnMut(T)>(&mut self, mut f: F) -> usize {
        let mut count = 0;
        while let Some(command) = self.pop() {
            f(command);
            count += 1;
        }
        count
    }

    /// Commands waiting to be consumed
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Whether nothing is waiting
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total commands the producer has dropped
    pub fn dropped(&self) -> u32 {
        self.shared.dropped.load(Ordering::Relaxed)
    }
}

impl<T> std::fmt::Debug for CommandProducer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandProducer")
            .field("len", &self.shared.len())
            .field("capacity", &self.shared.capacity())
            .field("dropped", &self.shared.dropped.load(Ordering::Relaxed))
            .finish()
    }
}

impl<T> std::fmt::Debug for CommandConsumer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandConsumer")
            .field("len", &self.shared.len())
            .field("capacity", &self.shared.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_rounds_to_power_of_two() {
        let (tx, _rx) = command_queue::<u8>(100).unwrap();
        assert_eq!(tx.capacity(), 128);
    }

    #[test]
    fn test_zero_capacity_error() {
        let result = command_queue::<u8>(0);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("greater than 0"));
    }

    #[test]
    fn test_max_capacity_exceeded() {
        let result = command_queue::<u8>(MAX_QUEUE_CAPACITY + 1);
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_push_pop_in_order() {
        let (mut tx, mut rx) = command_queue::<u8>(4).unwrap();
        assert!(tx.push(1));
        assert!(tx.push(2));
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.pop(), Some(1));
        assert_eq!(rx.pop(), Some(2));
        assert_eq!(rx.pop(), None);
    }

    #[test]
    fn test_full_queue_drops_newest() {
        let (mut tx, mut rx) = command_queue::<u8>(4).unwrap();
        for v in 0..4 {
            assert!(tx.push(v));
        }
        assert!(tx.is_full());
        assert!(!tx.push(99), "push into a full queue must be rejected");
        assert!(!tx.push(100));
        assert_eq!(tx.dropped(), 2);

        let mut seen = Vec::new();
        rx.drain(|v| seen.push(v));
        // Oldest commands survive, the overflowing ones are gone
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert_eq!(rx.dropped(), 2);
    }

    #[test]
    fn test_indices_wrap() {
        let (mut tx, mut rx) = command_queue::<u16>(2).unwrap();
        for v in 0..1000u16 {
            assert!(tx.push(v));
            assert_eq!(rx.pop(), Some(v));
        }
        assert!(rx.is_empty());
    }

    #[test]
    fn test_cross_thread_transfer() {
        let (mut tx, mut rx) = command_queue::<u32>(64).unwrap();
        let consumer = std::thread::spawn(move || {
            let mut received = Vec::new();
            while received.len() < 10_000 {
                if let Some(v) = rx.pop() {
                    received.push(v);
                } else {
                    std::thread::yield_now();
                }
            }
            received
        });

        let mut v = 0u32;
        while v < 10_000 {
            if tx.push(v) {
                v += 1;
            } else {
                std::thread::yield_now();
            }
        }

        let received = consumer.join().unwrap();
        assert!(received.iter().copied().eq(0..10_000));
    }
}
