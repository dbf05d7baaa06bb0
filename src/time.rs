// src/time.rs
//! Fixed-timestep accumulator for the simulation driver.
//!
//! Frame time goes in with [`FixedTimestep::accumulate`]; whole ticks come out
//! of [`FixedTimestep::ticks`]. At most `max_steps` ticks run per frame. Time
//! left over beyond that is dropped so a long stall can't spiral.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedTimestep {
    fixed_dt: f32,
    accumulator: f32,
    max_steps: u32,
    frame: u64,
}

impl FixedTimestep {
    pub fn new(fixed_dt: f32, max_steps: u32) -> Self {
        Self {
            fixed_dt,
            accumulator: 0.0,
            max_steps: max_steps.max(1),
            frame: 0,
        }
    }

    #[inline(always)]
    pub fn accumulate(&mut self, frame_dt: f32) {
        if frame_dt.is_finite() && frame_dt > 0.0 {
            self.accumulator += frame_dt;
        }
    }

    /// Fixed ticks owed for the time accumulated so far.
    /// Usage: `for _ in clock.ticks() { physics_step(); }`
    #[inline(always)]
    pub fn ticks(&mut self) -> FixedTimestepIter<'_> {
        self.frame += 1;
        let remaining = self.max_steps;
        FixedTimestepIter {
            clock: self,
            remaining,
        }
    }

    #[inline(always)]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Unconsumed time, always `< fixed_dt` after a full `ticks()` pass.
    #[inline(always)]
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    #[inline(always)]
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Fixed timestep iterator (zero-allocation, safe catch-up).
pub struct FixedTimestepIter<'a> {
    clock: &'a mut FixedTimestep,
    remaining: u32,
}

impl Iterator for FixedTimestepIter<'_> {
    type Item = f32;

    #[inline(always)]
    fn next(&mut self) -> Option<Self::Item> {
        let clock = &mut *self.clock;
        if clock.accumulator >= clock.fixed_dt && self.remaining > 0 {
            clock.accumulator -= clock.fixed_dt;
            self.remaining -= 1;
            Some(clock.fixed_dt)
        } else {
            if self.remaining == 0 && clock.accumulator >= clock.fixed_dt {
                // Catch-up limit hit: drop the backlog.
                clock.accumulator %= clock.fixed_dt;
            }
            None
        }
    }
}
