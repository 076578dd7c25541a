// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! Hand-off of register writes from a control thread to the audio thread.

use std::sync::atomic::{AtomicUsize, Ordering};

use log::warn;
use parking_lot::Mutex;

use super::sid::Sid;

/// Single producer, single consumer queue of `(address, value)` writes.
///
/// The producer calls [`push`](Self::push), the thread that owns the [`Sid`]
/// drains the queue through [`render`](Self::render), applying at most one
/// write per emulated cycle so that bursts of writes are spread out the way
/// a CPU would issue them.
pub struct RegisterQueue {
    slots: Mutex<Box<[(u8, u8)]>>,
    mask: usize,
    read: AtomicUsize,
    write: AtomicUsize,
}

impl RegisterQueue {
    /// Create a queue holding `capacity` writes, rounded up to a power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        RegisterQueue {
            slots: Mutex::new(vec![(0, 0); capacity].into_boxed_slice()),
            mask: capacity - 1,
            read: AtomicUsize::new(0),
            write: AtomicUsize::new(0),
        }
    }

    /// Number of writes the queue can hold.
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Number of pending writes.
    pub fn len(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        write.wrapping_sub(read)
    }

    /// Whether no write is pending.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Queue a register write. Returns `false` and drops the write when the
    /// queue is full.
    pub fn push(&self, reg: u8, value: u8) -> bool {
        let write = self.write.load(Ordering::Relaxed);
        let read = self.read.load(Ordering::Acquire);
        if write.wrapping_sub(read) > self.mask {
            warn!("Register queue full, dropped write {:02x} <- {:02x}", reg, value);
            return false;
        }
        self.slots.lock()[write & self.mask] = (reg, value);
        self.write.store(write.wrapping_add(1), Ordering::Release);
        true
    }

    /// Take the oldest pending write.
    pub fn pop(&self) -> Option<(u8, u8)> {
        let read = self.read.load(Ordering::Relaxed);
        let write = self.write.load(Ordering::Acquire);
        if read == write {
            return None;
        }
        let entry = self.slots.lock()[read & self.mask];
        self.read.store(read.wrapping_add(1), Ordering::Release);
        Some(entry)
    }

    /// Fill `buffer` with samples, clocking `sid` one cycle at a time and
    /// applying one pending write before each cycle.
    ///
    /// Returns the number of samples written, which is every slot selected by
    /// `interleave`.
    pub fn render(&self, sid: &mut Sid, buffer: &mut [i16], interleave: usize) -> usize {
        let interleave = interleave.max(1);
        let frames = buffer.len().div_ceil(interleave);
        let mut written = 0;
        while written < frames {
            if let Some((reg, value)) = self.pop() {
                sid.write(reg, value);
            }
            let (samples, _) = sid.sample(1, &mut buffer[written * interleave..], interleave);
            written += samples;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChipModel;

    #[test]
    fn capacity_rounds_up() {
        assert_eq!(RegisterQueue::with_capacity(0).capacity(), 2);
        assert_eq!(RegisterQueue::with_capacity(100).capacity(), 128);
        assert_eq!(RegisterQueue::with_capacity(256).capacity(), 256);
    }

    #[test]
    fn full_queue_drops_writes() {
        let queue = RegisterQueue::with_capacity(4);
        for i in 0..4 {
            assert!(queue.push(i, i));
        }
        assert!(!queue.push(9, 9));
        assert_eq!(queue.len(), 4);
        assert_eq!(queue.pop(), Some((0, 0)));
        assert!(queue.push(5, 5));
        let drained: Vec<_> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(drained, vec![(1, 1), (2, 2), (3, 3), (5, 5)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn render_applies_one_write_per_cycle() {
        let queue = RegisterQueue::with_capacity(16);
        let mut sid = Sid::new(ChipModel::Mos8580);
        for reg in 0..8 {
            queue.push(reg, 0x10 + reg);
        }
        let mut buffer = [0i16; 1];
        let written = queue.render(&mut sid, &mut buffer, 1);
        assert_eq!(written, 1);
        // The first sample lands after 22 cycles.
        assert!(queue.is_empty());
        assert_eq!(sid.read_state().sid_register[7], 0x17);
    }

    #[test]
    fn writes_cross_threads_in_order() {
        let queue = RegisterQueue::with_capacity(64);
        let total = 10_000usize;
        std::thread::scope(|scope| {
            scope.spawn(|| {
                let mut i = 0;
                while i < total {
                    if queue.push((i & 0x1f) as u8, (i & 0xff) as u8) {
                        i += 1;
                    } else {
                        std::thread::yield_now();
                    }
                }
            });
            let mut expected = 0;
            while expected < total {
                match queue.pop() {
                    Some(entry) => {
                        assert_eq!(entry, ((expected & 0x1f) as u8, (expected & 0xff) as u8));
                        expected += 1;
                    }
                    None => std::thread::yield_now(),
                }
            }
        });
        assert!(queue.is_empty());
    }
}
