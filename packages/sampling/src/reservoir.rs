//! Fixed-capacity online sampling of heat map points.
//!
//! [`Reservoir`] keeps at most `capacity` points from a stream of unknown
//! length. With [`SamplingMethod::Reservoir`] every point seen so far has
//! the same `capacity / seen` chance of being held; with
//! [`SamplingMethod::First`] the first `capacity` points are kept and the
//! caller is told to stop scanning.

use heat_map_sampling_models::{SampledPoint, SamplingMethod};
use rand::Rng;

/// What happened to a point offered to the reservoir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Appended while the buffer had room.
    Appended,
    /// Overwrote the slot at this index.
    Replaced(usize),
    /// Not selected.
    Discarded,
    /// The buffer is full under [`SamplingMethod::First`]; stop scanning.
    Exhausted,
}

/// A request-scoped sample buffer and the generator that drives it.
#[derive(Debug)]
pub struct Reservoir<R> {
    capacity: usize,
    method: SamplingMethod,
    points: Vec<SampledPoint>,
    total_seen: u64,
    rng: R,
}

impl<R: Rng> Reservoir<R> {
    /// Creates an empty reservoir holding up to `capacity` points.
    #[must_use]
    pub fn new(capacity: usize, method: SamplingMethod, rng: R) -> Self {
        Self {
            capacity,
            method,
            points: Vec::with_capacity(capacity.min(1 << 16)),
            total_seen: 0,
            rng,
        }
    }

    /// Observes one point.
    ///
    /// The point is counted in [`Self::total_seen`] whatever the outcome.
    pub fn offer(&mut self, point: SampledPoint) -> Offer {
        self.total_seen += 1;

        if self.points.len() < self.capacity {
            self.points.push(point);
            return Offer::Appended;
        }

        match self.method {
            SamplingMethod::First => Offer::Exhausted,
            SamplingMethod::Reservoir => {
                let j = self.rng.gen_range(0..self.total_seen);
                match usize::try_from(j) {
                    Ok(slot) if slot < self.capacity => {
                        self.points[slot] = point;
                        Offer::Replaced(slot)
                    }
                    _ => Offer::Discarded,
                }
            }
        }
    }

    /// Whether scanning can stop because no further point will be kept.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.method == SamplingMethod::First && self.points.len() >= self.capacity
    }

    /// Number of points offered so far.
    #[must_use]
    pub const fn total_seen(&self) -> u64 {
        self.total_seen
    }

    /// Points currently held, in slot order.
    #[cfg(test)]
    fn points(&self) -> &[SampledPoint] {
        &self.points
    }

    /// Consumes the reservoir, returning the held points.
    #[must_use]
    pub fn into_points(self) -> Vec<SampledPoint> {
        self.points
    }
}
