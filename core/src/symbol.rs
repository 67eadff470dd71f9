use crate::protocol::Protocol;
use crate::waveform::Wave;

/// Protocol symbols the cassette loader understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// Long synchronization tone at the start of the recording
    EntryTone,
    /// Two half-cycles marking the start of data
    TapeIn,
    Zero,
    One,
}

impl Symbol {
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            Symbol::One
        } else {
            Symbol::Zero
        }
    }
}

/// Bit symbols of a byte, most significant bit first
pub fn byte_symbols(byte: u8) -> impl Iterator<Item = Symbol> {
    (0..8).rev().map(move |i| Symbol::from_bit((byte >> i) & 1 == 1))
}

/// Samples of one symbol: its tone segments played back to back
#[derive(Debug, Clone)]
pub struct SymbolWave {
    first: Wave,
    second: Option<Wave>,
}

impl Iterator for SymbolWave {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        match self.first.next() {
            Some(sample) => Some(sample),
            None => self.second.as_mut()?.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.first.len() + self.second.as_ref().map_or(0, |w| w.len());
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SymbolWave {}

impl Protocol {
    /// Sine samples for a symbol
    pub fn wave(&self, symbol: Symbol) -> SymbolWave {
        let mut segments = self.tones(symbol).iter().map(Wave::from_tone);
        let first = segments.next().unwrap_or_else(|| Wave::new(0, 0.0, 0.0));
        SymbolWave {
            first,
            second: segments.next(),
        }
    }
}
