//! Quadrature decoding for two-channel rotary encoders.
//!
//! The two debounced channels form a 2-bit Gray code. Written as (A,B) on
//! normalized levels, one clockwise detent walks
//!
//! ```text
//!   00 -> 10 -> 11 -> 01 -> 00
//! ```
//!
//! and counter-clockwise walks the same cycle backwards. Every valid step
//! adds +1 (cw) or -1 (ccw) to a progress counter; a tick is emitted when
//! progress reaches ±4 and progress resets. Because progress is relative,
//! a detent may start at any of the four phases and either channel may move
//! first. Steps where both bits change at once cannot be ordered and are
//! dropped as noise without touching state or progress.
//!
//! # Transition Table
//!
//! | from \ to | 00 | 01 | 10 | 11 |
//! |-----------|----|----|----|----|
//! | 00        | .  | -1 | +1 | x  |
//! | 01        | +1 | .  | x  | -1 |
//! | 10        | -1 | x  | .  | +1 |
//! | 11        | x  | +1 | -1 | .  |

use embedded_hal::digital::InputPin;
use tracing::trace;

use crate::debounce::DebouncedInput;
use crate::traits::PinError;

/// Steps per detent.
pub const STEPS_PER_TICK: i8 = 4;

/// Direction of one encoder detent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rotation {
    /// Clockwise.
    Clockwise,
    /// Counter-clockwise.
    CounterClockwise,
}

impl Rotation {
    /// Returns a short label for logging.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Rotation::Clockwise => "cw",
            Rotation::CounterClockwise => "ccw",
        }
    }
}

// ============================================================================
// Decoder
// ============================================================================

/// Pure quadrature state machine.
///
/// ```
/// use rs_gpio_mpdc::quadrature::{QuadratureDecoder, Rotation};
///
/// let mut dec = QuadratureDecoder::new(false, false);
/// assert_eq!(dec.update(true, false), None);
/// assert_eq!(dec.update(true, true), None);
/// assert_eq!(dec.update(false, true), None);
/// assert_eq!(dec.update(false, false), Some(Rotation::Clockwise));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuadratureDecoder {
    state: u8,
    progress: i8,
}

const fn encode(a: bool, b: bool) -> u8 {
    ((a as u8) << 1) | (b as u8)
}

/// Next state going clockwise, indexed by current state (A<<1 | B).
const CW_NEXT: [u8; 4] = [0b10, 0b00, 0b11, 0b01];

impl QuadratureDecoder {
    /// Start from the given channel levels.
    pub fn new(a: bool, b: bool) -> Self {
        Self {
            state: encode(a, b),
            progress: 0,
        }
    }

    /// Last stable (A, B) pair.
    pub fn levels(&self) -> (bool, bool) {
        (self.state & 0b10 != 0, self.state & 0b01 != 0)
    }

    /// Accumulated steps toward the next tick.
    pub fn progress(&self) -> i8 {
        self.progress
    }

    /// Feed the current channel levels. Returns a tick on a completed detent.
    pub fn update(&mut self, a: bool, b: bool) -> Option<Rotation> {
        let next = encode(a, b);
        if next == self.state {
            return None;
        }

        let step = if CW_NEXT[self.state as usize] == next {
            1
        } else if CW_NEXT[next as usize] == self.state {
            -1
        } else {
            trace!(from = self.state, to = next, "invalid quadrature transition");
            return None;
        };

        self.state = next;
        self.progress += step;

        if self.progress >= STEPS_PER_TICK {
            self.progress = 0;
            Some(Rotation::Clockwise)
        } else if self.progress <= -STEPS_PER_TICK {
            self.progress = 0;
            Some(Rotation::CounterClockwise)
        } else {
            None
        }
    }
}

// ============================================================================
// Rotary Encoder
// ============================================================================

/// Two debounced channels feeding a [`QuadratureDecoder`].
///
/// Each channel is debounced independently. Only accepted transitions reach
/// the decoder, at most one update per poll.
pub struct RotaryEncoder<A, B> {
    a: DebouncedInput<A>,
    b: DebouncedInput<B>,
    decoder: QuadratureDecoder,
}

impl<A: InputPin, B: InputPin> RotaryEncoder<A, B> {
    /// Combine two debounced channels, starting from their current levels.
    pub fn new(a: DebouncedInput<A>, b: DebouncedInput<B>) -> Self {
        let decoder = QuadratureDecoder::new(a.is_active(), b.is_active());
        Self { a, b, decoder }
    }

    /// Sample both channels and return a tick if a detent completed.
    ///
    /// Both channels are sampled before the decoder sees anything. If both
    /// accepted an edge in the same poll their order is unknown, so the
    /// decoder gets the combined levels once and drops the two-bit jump.
    pub fn poll(&mut self, now_ms: u64) -> Result<Option<Rotation>, PinError> {
        let a_moved = self.a.poll(now_ms)?.is_some();
        let b_moved = self.b.poll(now_ms)?.is_some();
        if !a_moved && !b_moved {
            return Ok(None);
        }
        Ok(self.decoder.update(self.a.is_active(), self.b.is_active()))
    }

    /// The decoder, for inspection.
    pub fn decoder(&self) -> &QuadratureDecoder {
        &self.decoder
    }

    /// Give back both pins.
    pub fn into_inner(self) -> (A, B) {
        (self.a.into_inner(), self.b.into_inner())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PinSpec, PullMode};
    use crate::hal::MockPin;

    const CW: [(bool, bool); 4] = [(true, false), (true, true), (false, true), (false, false)];

    fn run(dec: &mut QuadratureDecoder, seq: &[(bool, bool)]) -> Vec<Rotation> {
        seq.iter().filter_map(|&(a, b)| dec.update(a, b)).collect()
    }

    // =========================================================================
    // Decoder
    // =========================================================================

    #[test]
    fn full_clockwise_cycle_one_tick() {
        let mut dec = QuadratureDecoder::new(false, false);
        assert_eq!(run(&mut dec, &CW), vec![Rotation::Clockwise]);
        assert_eq!(dec.progress(), 0);
    }

    #[test]
    fn full_counter_clockwise_cycle_one_tick() {
        let mut dec = QuadratureDecoder::new(false, false);
        let ccw = [(false, true), (true, true), (true, false), (false, false)];
        assert_eq!(run(&mut dec, &ccw), vec![Rotation::CounterClockwise]);
    }

    #[test]
    fn cycle_starting_at_any_phase() {
        let cycle = [(false, false), (true, false), (true, true), (false, true)];
        for start in 0..4 {
            let (a, b) = cycle[start];
            let mut dec = QuadratureDecoder::new(a, b);
            let seq: Vec<_> = (1..=4).map(|i| cycle[(start + i) % 4]).collect();
            assert_eq!(
                run(&mut dec, &seq),
                vec![Rotation::Clockwise],
                "start phase {}",
                start
            );
        }
    }

    #[test]
    fn partial_cycle_no_tick() {
        let mut dec = QuadratureDecoder::new(false, false);
        assert!(run(&mut dec, &CW[..3]).is_empty());
        assert_eq!(dec.progress(), 3);
    }

    #[test]
    fn reversal_cancels_progress() {
        let mut dec = QuadratureDecoder::new(false, false);
        // three steps forward, three back
        let seq = [
            (true, false),
            (true, true),
            (false, true),
            (true, true),
            (true, false),
            (false, false),
        ];
        assert!(run(&mut dec, &seq).is_empty());
        assert_eq!(dec.progress(), 0);
    }

    #[test]
    fn invalid_transition_ignored() {
        let mut dec = QuadratureDecoder::new(false, false);
        assert_eq!(dec.update(true, true), None);
        assert_eq!(dec.levels(), (false, false));
        assert_eq!(dec.progress(), 0);

        // the cycle still completes normally afterwards
        assert_eq!(run(&mut dec, &CW), vec![Rotation::Clockwise]);
    }

    #[test]
    fn jitter_on_one_channel_no_tick() {
        let mut dec = QuadratureDecoder::new(false, false);
        let seq = [(true, false), (false, false), (true, false), (false, false)];
        assert!(run(&mut dec, &seq).is_empty());
    }

    #[test]
    fn two_detents_two_ticks() {
        let mut dec = QuadratureDecoder::new(false, false);
        let mut seq = CW.to_vec();
        seq.extend_from_slice(&CW);
        assert_eq!(
            run(&mut dec, &seq),
            vec![Rotation::Clockwise, Rotation::Clockwise]
        );
    }

    // =========================================================================
    // Rotary Encoder
    // =========================================================================

    fn encoder(interval: u32) -> (MockPin, MockPin, RotaryEncoder<MockPin, MockPin>) {
        // external pull-up, idle high = inactive
        let pa = MockPin::new(true);
        let pb = MockPin::new(true);
        let a = DebouncedInput::new(pa.clone(), PinSpec::new(17, PullMode::ExternalUp).unwrap(), interval)
            .unwrap();
        let b = DebouncedInput::new(pb.clone(), PinSpec::new(27, PullMode::ExternalUp).unwrap(), interval)
            .unwrap();
        (pa, pb, RotaryEncoder::new(a, b))
    }

    #[test]
    fn encoder_clockwise_detent() {
        let (pa, pb, mut enc) = encoder(20);
        let mut ticks = Vec::new();
        let mut t = 0;
        for (a, b) in CW {
            // active-low: active level drives the pin low
            pa.set_high(!a);
            pb.set_high(!b);
            t += 25;
            if let Some(r) = enc.poll(t).unwrap() {
                ticks.push(r);
            }
        }
        assert_eq!(ticks, vec![Rotation::Clockwise]);
    }

    #[test]
    fn both_channels_in_one_poll_never_tick() {
        // external pull-down, idle low = inactive
        let pa = MockPin::new(false);
        let pb = MockPin::new(false);
        let a = DebouncedInput::new(pa.clone(), PinSpec::new(17, PullMode::ExternalDown).unwrap(), 20)
            .unwrap();
        let b = DebouncedInput::new(pb.clone(), PinSpec::new(27, PullMode::ExternalDown).unwrap(), 20)
            .unwrap();
        let mut enc = RotaryEncoder::new(a, b);

        // ccw detent with B leading, each pair of edges landing in one poll
        pb.set_high(true);
        pa.set_high(true);
        assert_eq!(enc.poll(100).unwrap(), None);
        pb.set_high(false);
        pa.set_high(false);
        assert_eq!(enc.poll(200).unwrap(), None);
        assert_eq!(enc.decoder().progress(), 0);

        // single-channel steps still decode afterwards
        let mut ticks = Vec::new();
        let mut t = 200;
        for (a, b) in [(false, true), (true, true), (true, false), (false, false)] {
            pa.set_high(a);
            pb.set_high(b);
            t += 25;
            ticks.extend(enc.poll(t).unwrap());
        }
        assert_eq!(ticks, vec![Rotation::CounterClockwise]);
    }

    #[test]
    fn encoder_channel_bounce_filtered() {
        let (pa, _pb, mut enc) = encoder(20);
        pa.set_high(false);
        assert_eq!(enc.poll(0).unwrap(), None);
        assert_eq!(enc.decoder().levels(), (true, false));

        // bounce back within the interval is discarded
        pa.set_high(true);
        assert_eq!(enc.poll(5).unwrap(), None);
        assert_eq!(enc.decoder().levels(), (true, false));
        assert_eq!(enc.decoder().progress(), 1);
    }
}
