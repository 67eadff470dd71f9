//! Apple ][ cassette tone encoder
//!
//! Turns an arbitrary byte stream into mono 8-bit unsigned PCM that the
//! cassette input of an Apple ][+ can load: a long entry tone, a tape-in
//! marker, one sine cycle per data bit (MSB first) and a trailing XOR checksum.

pub mod error;
pub mod protocol;
pub mod waveform;
pub mod symbol;
pub mod checksum;
pub mod encoder;

pub use checksum::Checksum;
pub use encoder::{EncodeStats, Samples, SymbolStream, TapeEncoder};
pub use error::{Result, TapeError};
pub use protocol::{Protocol, ToneSpec};
pub use symbol::{byte_symbols, Symbol, SymbolWave};
pub use waveform::{sample_at, write_wave, Wave};

// Output format
pub const SAMPLE_RATE: usize = 44100;
pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 8;

// Tone timings
pub const ENTRY_TONE_CENTISECONDS: usize = 106; // 1.06 s
pub const ENTRY_TONE_PERIOD_US: usize = 1300;
pub const TAPE_IN_PERIOD_US: usize = 400;
pub const ZERO_PERIOD_US: usize = 500;
pub const ONE_PERIOD_US: usize = 1000;

// Derived sample counts at SAMPLE_RATE
pub const ENTRY_TONE_PERIOD: usize = protocol::period_samples(SAMPLE_RATE, ENTRY_TONE_PERIOD_US); // 57
pub const ENTRY_TONE_DURATION: usize = protocol::duration_samples(SAMPLE_RATE, ENTRY_TONE_CENTISECONDS); // 46746
pub const TAPE_IN_PERIOD: usize = protocol::period_samples(SAMPLE_RATE, TAPE_IN_PERIOD_US); // 18
pub const ZERO_PERIOD: usize = protocol::period_samples(SAMPLE_RATE, ZERO_PERIOD_US); // 22
pub const ONE_PERIOD: usize = protocol::period_samples(SAMPLE_RATE, ONE_PERIOD_US); // 44

/// Initial value of the trailing XOR checksum
pub const CHECKSUM_SEED: u8 = 0xFF;
