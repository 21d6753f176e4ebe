//! Encoding context: the explicit source of randomness and time
//!
//! Every routine that needs random field values or timestamps takes an
//! `&mut EncodeContext`. Seeding the context fixes the whole capture.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::ops::Range;

/// Default capture start: 2023-11-14T22:13:20Z
pub const DEFAULT_START_US: u64 = 1_700_000_000 * 1_000_000;

/// Deterministic generator plus a microsecond clock
pub struct EncodeContext {
    rng: ChaCha20Rng,
    start_us: u64,
    clock_us: u64,
}

impl EncodeContext {
    /// Create a context from a seed, starting the clock at `start_us`
    pub fn seeded(seed: u64, start_us: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            start_us,
            clock_us: start_us,
        }
    }

    /// Mutable access to the generator
    pub fn rng(&mut self) -> &mut ChaCha20Rng {
        &mut self.rng
    }

    /// Current clock value
    pub fn now(&self) -> u64 {
        self.clock_us
    }

    /// Capture start time this context was created with
    pub fn start(&self) -> u64 {
        self.start_us
    }

    /// Move the clock forward and return the new value
    pub fn advance(&mut self, us: u64) -> u64 {
        self.clock_us += us;
        self.clock_us
    }

    /// Move the clock forward by a random amount within `range`
    pub fn advance_random(&mut self, range: Range<u64>) -> u64 {
        let step = self.rng.gen_range(range);
        self.advance(step)
    }

    /// Reset the clock to an absolute value
    pub fn set_clock(&mut self, us: u64) {
        self.clock_us = us;
    }

    /// Reset the clock to the capture start
    pub fn rewind(&mut self) {
        self.clock_us = self.start_us;
    }

    /// Random timestamp within `window` microseconds of the capture start
    pub fn timestamp_in_window(&mut self, window: u64) -> u64 {
        self.start_us + self.rng.gen_range(0..window.max(1))
    }

    /// Random value in `range`
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.rng.gen_range(range)
    }

    /// Random `u16`
    pub fn gen_u16(&mut self) -> u16 {
        self.rng.gen()
    }

    /// Random `u32`
    pub fn gen_u32(&mut self) -> u32 {
        self.rng.gen()
    }

    /// True with probability `p`
    pub fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Pick one element of a non-empty slice
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.rng.gen_range(0..items.len())]
    }

    /// Random string of `len` characters drawn from `alphabet`
    pub fn random_string(&mut self, alphabet: &[u8], len: usize) -> String {
        (0..len)
            .map(|_| alphabet[self.rng.gen_range(0..alphabet.len())] as char)
            .collect()
    }

    /// Random bytes
    pub fn random_bytes(&mut self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.rng.fill(buf.as_mut_slice());
        buf
    }
}

impl Default for EncodeContext {
    fn default() -> Self {
        Self::seeded(1337, DEFAULT_START_US)
    }
}
