use std::io::{self, Write};

use crate::protocol::ToneSpec;

/// Quantize a sine angle to an unsigned 8-bit sample.
///
/// The value is truncated, not rounded, so samples stay within [0, 254].
/// Cassette decoders are tuned against this exact curve.
#[inline]
pub fn sample_at(theta: f64) -> u8 {
    (127.0 * theta.sin() + 127.0) as u8
}

/// Lazy sine segment generator.
///
/// Sample `i` is `sample_at(theta0 + i * delta_theta)`; the angle is
/// recomputed from the index rather than accumulated, so long tones do not
/// drift.
#[derive(Debug, Clone)]
pub struct Wave {
    index: usize,
    samples: usize,
    delta_theta: f64,
    theta0: f64,
}

impl Wave {
    pub fn new(samples: usize, delta_theta: f64, theta0: f64) -> Self {
        Self {
            index: 0,
            samples,
            delta_theta,
            theta0,
        }
    }

    pub fn from_tone(tone: &ToneSpec) -> Self {
        Self::new(tone.duration, tone.delta_theta(), tone.phase)
    }
}

impl Iterator for Wave {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        if self.index >= self.samples {
            return None;
        }
        let theta = self.theta0 + self.index as f64 * self.delta_theta;
        self.index += 1;
        Some(sample_at(theta))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.samples - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Wave {}

/// Write `samples` sine samples straight to `out`
pub fn write_wave<W: Write>(out: &mut W, samples: usize, delta_theta: f64, theta0: f64) -> io::Result<()> {
    let buf: Vec<u8> = Wave::new(samples, delta_theta, theta0).collect();
    out.write_all(&buf)
}
