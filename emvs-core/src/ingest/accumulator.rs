//! Per-pixel event counting between pose updates

use crate::error::{EmvsError, Result};
use crate::image::EvidenceImage;
use emvs_data::Event;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Overflow behavior of the 8-bit per-pixel counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterPolicy {
    /// Clamp at 255.
    #[default]
    Saturating,
    /// Wrap modulo 256.
    Wrapping,
}

impl CounterPolicy {
    fn increment(self, count: u8) -> u8 {
        match self {
            CounterPolicy::Saturating => count.saturating_add(1),
            CounterPolicy::Wrapping => count.wrapping_add(1),
        }
    }
}

/// Event counts for one time window, one cell per sensor pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventImage {
    rows: usize,
    cols: usize,
    counts: Vec<u8>,
}

impl EventImage {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            counts: vec![0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        (row < self.rows && col < self.cols).then(|| self.counts[row * self.cols + col])
    }

    pub fn count_nonzero(&self) -> usize {
        self.counts.iter().filter(|&&c| c != 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&c| c == 0)
    }

    /// Convert counts to real-valued evidence.
    pub fn to_evidence(&self) -> EvidenceImage {
        EvidenceImage::from_fn(self.rows, self.cols, |r, c| {
            self.counts[r * self.cols + c] as f32
        })
    }
}

/// Accumulates events into the current window's [`EventImage`].
#[derive(Debug, Clone)]
pub struct EventAccumulator {
    image: EventImage,
    policy: CounterPolicy,
}

impl EventAccumulator {
    pub fn new(rows: usize, cols: usize, policy: CounterPolicy) -> Self {
        Self {
            image: EventImage::new(rows, cols),
            policy,
        }
    }

    /// Count one event at `(row, col)`. Out-of-range pixels are rejected and
    /// leave the image untouched.
    pub fn add_event(&mut self, row: usize, col: usize) -> Result<()> {
        let (rows, cols) = (self.image.rows, self.image.cols);
        if row >= rows || col >= cols {
            return Err(EmvsError::PixelOutOfRange {
                row,
                col,
                rows,
                cols,
            });
        }
        let cell = &mut self.image.counts[row * cols + col];
        *cell = self.policy.increment(*cell);
        Ok(())
    }

    /// Count a batch of events, dropping any outside the sensor.
    ///
    /// Returns the number of events dropped.
    pub fn add_events(&mut self, events: &[Event]) -> usize {
        let mut dropped = 0;
        for event in events {
            if self.add_event(event.row(), event.col()).is_err() {
                dropped += 1;
            }
        }
        if dropped > 0 {
            warn!(
                "Dropped {} of {} events outside the {}x{} sensor",
                dropped,
                events.len(),
                self.image.rows,
                self.image.cols
            );
        }
        dropped
    }

    /// True when the current window holds at least one event.
    pub fn has_events(&self) -> bool {
        !self.image.is_empty()
    }

    pub fn image(&self) -> &EventImage {
        &self.image
    }

    /// Take the current window's image and start a fresh zeroed one.
    pub fn drain_and_reset(&mut self) -> EventImage {
        let fresh = EventImage::new(self.image.rows, self.image.cols);
        std::mem::replace(&mut self.image, fresh)
    }
}
