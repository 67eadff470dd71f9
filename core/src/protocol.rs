use std::f64::consts::PI;

use crate::symbol::{byte_symbols, Symbol};
use crate::{
    ENTRY_TONE_CENTISECONDS, ENTRY_TONE_PERIOD_US, ONE_PERIOD_US, SAMPLE_RATE, TAPE_IN_PERIOD_US,
    ZERO_PERIOD_US,
};

/// Number of samples in one period of a tone lasting `micros` microseconds,
/// rounded to the nearest sample.
pub const fn period_samples(sample_rate: usize, micros: usize) -> usize {
    (sample_rate * micros + 500_000) / 1_000_000
}

/// Number of samples in `centis` hundredths of a second, rounded.
pub const fn duration_samples(sample_rate: usize, centis: usize) -> usize {
    (sample_rate * centis + 50) / 100
}

/// One sine segment: how long a cycle is, how many samples to emit, and
/// the angle the first sample starts at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSpec {
    pub period: usize,
    pub duration: usize,
    pub phase: f64,
}

impl ToneSpec {
    /// A tone lasting exactly one full cycle
    pub const fn cycle(period: usize) -> Self {
        Self {
            period,
            duration: period,
            phase: 0.0,
        }
    }

    /// Angle advanced per sample so that `period` samples make one cycle
    pub fn delta_theta(&self) -> f64 {
        PI * 2.0 / self.period as f64
    }
}

/// Tone table for a cassette format.
///
/// The stream assembler only ever looks tones up here, so a different
/// loader format is a different `Protocol` value.
#[derive(Debug, Clone, PartialEq)]
pub struct Protocol {
    pub sample_rate: usize,
    pub entry: ToneSpec,
    /// Half a 400 µs cycle followed by half a 500 µs cycle starting at π
    pub tape_in: [ToneSpec; 2],
    pub zero: ToneSpec,
    pub one: ToneSpec,
}

impl Protocol {
    /// The Apple ][ ROM cassette loader format at `SAMPLE_RATE`
    pub fn apple2() -> Self {
        let rate = SAMPLE_RATE;
        let tape_in_period = period_samples(rate, TAPE_IN_PERIOD_US);
        let zero_period = period_samples(rate, ZERO_PERIOD_US);

        Self {
            sample_rate: rate,
            entry: ToneSpec {
                period: period_samples(rate, ENTRY_TONE_PERIOD_US),
                duration: duration_samples(rate, ENTRY_TONE_CENTISECONDS),
                phase: 0.0,
            },
            tape_in: [
                ToneSpec {
                    period: tape_in_period,
                    duration: tape_in_period / 2,
                    phase: 0.0,
                },
                ToneSpec {
                    period: zero_period,
                    duration: zero_period / 2,
                    phase: PI,
                },
            ],
            zero: ToneSpec::cycle(zero_period),
            one: ToneSpec::cycle(period_samples(rate, ONE_PERIOD_US)),
        }
    }

    /// Tone segments making up a symbol, in emission order
    pub fn tones(&self, symbol: Symbol) -> &[ToneSpec] {
        match symbol {
            Symbol::EntryTone => std::slice::from_ref(&self.entry),
            Symbol::TapeIn => &self.tape_in,
            Symbol::Zero => std::slice::from_ref(&self.zero),
            Symbol::One => std::slice::from_ref(&self.one),
        }
    }

    pub fn symbol_samples(&self, symbol: Symbol) -> usize {
        self.tones(symbol).iter().map(|t| t.duration).sum()
    }

    pub fn byte_samples(&self, byte: u8) -> usize {
        byte_symbols(byte).map(|s| self.symbol_samples(s)).sum()
    }

    /// Exact length of the sample stream produced for `payload`,
    /// trailer included.
    pub fn stream_samples(&self, payload: &[u8]) -> usize {
        let checksum = crate::Checksum::of(payload);
        self.symbol_samples(Symbol::EntryTone)
            + self.symbol_samples(Symbol::TapeIn)
            + payload.iter().map(|&b| self.byte_samples(b)).sum::<usize>()
            + self.byte_samples(checksum.value())
    }

    /// Seconds of audio for a given number of samples
    pub fn duration_secs(&self, samples: usize) -> f64 {
        samples as f64 / self.sample_rate as f64
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::apple2()
    }
}
