// This file is part of resid-rs.
// Copyright (c) 2017-2019 Sebastian Jastrzebski <sebby2k@gmail.com>. All rights reserved.
// Portions (c) 2004 Dag Lem <resid@nimrod.no>
// Licensed under the GPLv3. See LICENSE file in the project root for full license text.

//! Error types for rejected configuration.
//!
//! A rejected call never touches the current configuration, so the engine
//! stays usable with whatever was installed before.

/// Error returned when sampling parameters are invalid.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum SamplingError {
    /// Clock frequency must be non-zero.
    #[error("clock frequency must be non-zero")]
    ZeroClockFreq,
    /// Sample frequency must be non-zero.
    #[error("sample frequency must be non-zero")]
    ZeroSampleFreq,
    /// The FIR history would not fit in the resampling ring buffer.
    #[error("FIR length {fir_n} does not fit in a ring buffer of {ring_size} samples")]
    RingBufferOverflow {
        /// Required history length in cycles.
        fir_n: u64,
        /// Capacity of the ring buffer.
        ring_size: usize,
    },
    /// The pass band must stay below 0.9 * sample_freq / 2.
    #[error("pass frequency {pass_freq} Hz exceeds limit of {limit} Hz")]
    PassFreqTooHigh {
        /// Requested pass frequency in Hz.
        pass_freq: f64,
        /// Highest accepted pass frequency in Hz.
        limit: f64,
    },
    /// Filter scale must be within [0.9, 1.0].
    #[error("filter scale {0} outside [0.9, 1.0]")]
    FilterScaleOutOfRange(f64),
}

/// Error returned when a custom filter cutoff table is rejected.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CutoffTableError {
    /// Tables need between 2 and 2048 points.
    #[error("cutoff table needs 2..=2048 points, got {0}")]
    PointCount(usize),
    /// FC values must be strictly increasing.
    #[error("cutoff point {index} is not above its predecessor")]
    NotIncreasing {
        /// Index of the offending point.
        index: usize,
    },
    /// FC must lie in 0..=2047 and frequency must be non-negative.
    #[error("cutoff point {index} is out of range")]
    OutOfRange {
        /// Index of the offending point.
        index: usize,
    },
}
