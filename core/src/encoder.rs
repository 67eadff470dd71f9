use std::io::{self, BufReader, Read, Write};

use crate::checksum::Checksum;
use crate::error::{Result, TapeError};
use crate::protocol::Protocol;
use crate::symbol::{Symbol, SymbolWave};

/// Samples buffered before each write to the sink
const WRITE_BLOCK_SAMPLES: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Preamble,
    Payload,
    Trailer,
    Finished,
}

/// Pending bit symbols of the byte currently being sent
#[derive(Debug, Clone, Copy)]
struct BitSymbols {
    byte: u8,
    remaining: u8,
}

impl BitSymbols {
    fn new(byte: u8) -> Self {
        Self { byte, remaining: 8 }
    }
}

impl Iterator for BitSymbols {
    type Item = Symbol;

    fn next(&mut self) -> Option<Symbol> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(Symbol::from_bit((self.byte >> self.remaining) & 1 == 1))
    }
}

/// Framing state machine: entry tone and tape-in marker, the bits of every
/// input byte, then the checksum byte once the source is exhausted.
///
/// A read error is yielded once and ends the stream; no trailer follows it.
pub struct SymbolStream<I> {
    source: I,
    stage: Stage,
    preamble: std::array::IntoIter<Symbol, 2>,
    bits: Option<BitSymbols>,
    checksum: Checksum,
    payload_bytes: usize,
}

impl<I> SymbolStream<I>
where
    I: Iterator<Item = io::Result<u8>>,
{
    pub fn new(source: I) -> Self {
        Self {
            source,
            stage: Stage::Preamble,
            preamble: [Symbol::EntryTone, Symbol::TapeIn].into_iter(),
            bits: None,
            checksum: Checksum::new(),
            payload_bytes: 0,
        }
    }

    /// Checksum over the bytes consumed so far
    pub fn checksum(&self) -> Checksum {
        self.checksum
    }

    pub fn payload_bytes(&self) -> usize {
        self.payload_bytes
    }
}

impl<I> Iterator for SymbolStream<I>
where
    I: Iterator<Item = io::Result<u8>>,
{
    type Item = Result<Symbol>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(symbol) = self.bits.as_mut().and_then(Iterator::next) {
                return Some(Ok(symbol));
            }
            self.bits = None;

            match self.stage {
                Stage::Preamble => match self.preamble.next() {
                    Some(symbol) => return Some(Ok(symbol)),
                    None => {
                        log::debug!("Preamble sent, streaming payload");
                        self.stage = Stage::Payload;
                    }
                },
                Stage::Payload => match self.source.next() {
                    Some(Ok(byte)) => {
                        self.checksum.update(byte);
                        self.payload_bytes += 1;
                        self.bits = Some(BitSymbols::new(byte));
                    }
                    Some(Err(err)) => {
                        self.stage = Stage::Finished;
                        return Some(Err(TapeError::Read(err)));
                    }
                    None => {
                        log::debug!(
                            "End of input after {} bytes, checksum {:#04x}",
                            self.payload_bytes,
                            self.checksum.value()
                        );
                        self.stage = Stage::Trailer;
                    }
                },
                Stage::Trailer => {
                    self.bits = Some(BitSymbols::new(self.checksum.value()));
                    self.stage = Stage::Finished;
                }
                Stage::Finished => return None,
            }
        }
    }
}

impl<I> std::iter::FusedIterator for SymbolStream<I> where I: Iterator<Item = io::Result<u8>> {}

/// Pull-based sample stream over a byte source
pub struct Samples<I> {
    protocol: Protocol,
    symbols: SymbolStream<I>,
    current: Option<SymbolWave>,
}

impl<I> Samples<I>
where
    I: Iterator<Item = io::Result<u8>>,
{
    pub fn new(protocol: Protocol, source: I) -> Self {
        Self {
            protocol,
            symbols: SymbolStream::new(source),
            current: None,
        }
    }

    pub fn checksum(&self) -> Checksum {
        self.symbols.checksum()
    }

    pub fn payload_bytes(&self) -> usize {
        self.symbols.payload_bytes()
    }
}

impl<I> Iterator for Samples<I>
where
    I: Iterator<Item = io::Result<u8>>,
{
    type Item = Result<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(sample) = self.current.as_mut().and_then(Iterator::next) {
                return Some(Ok(sample));
            }
            match self.symbols.next()? {
                Ok(symbol) => self.current = Some(self.protocol.wave(symbol)),
                Err(err) => {
                    self.current = None;
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Summary of a finished encode
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeStats {
    pub payload_bytes: usize,
    pub samples: usize,
    pub checksum: u8,
    pub sample_rate: usize,
}

impl EncodeStats {
    pub fn duration_secs(&self) -> f64 {
        self.samples as f64 / self.sample_rate as f64
    }
}

/// Encoder producing cassette-loadable audio from bytes
///
/// Output: entry tone + tape-in marker + 8 bit tones per byte + checksum byte
pub struct TapeEncoder {
    protocol: Protocol,
}

impl TapeEncoder {
    pub fn new() -> Self {
        Self::with_protocol(Protocol::apple2())
    }

    pub fn with_protocol(protocol: Protocol) -> Self {
        Self { protocol }
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Lazily encode a fallible byte source
    pub fn samples<I>(&self, source: I) -> Samples<I::IntoIter>
    where
        I: IntoIterator<Item = io::Result<u8>>,
    {
        Samples::new(self.protocol.clone(), source.into_iter())
    }

    /// Encode an in-memory payload into a sample buffer
    pub fn encode(&self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.protocol.stream_samples(data));
        for sample in self.samples(data.iter().map(|&b| Ok(b))) {
            // An infallible source cannot produce a read error
            if let Ok(sample) = sample {
                out.push(sample);
            }
        }
        out
    }

    /// Stream bytes from `reader` to samples on `writer`.
    ///
    /// Samples already written stay written if reading or writing fails.
    pub fn encode_stream<R: Read, W: Write>(&self, reader: R, mut writer: W) -> Result<EncodeStats> {
        let mut samples = self.samples(BufReader::new(reader).bytes());
        let mut block = Vec::with_capacity(WRITE_BLOCK_SAMPLES);
        let mut total = 0usize;

        for sample in samples.by_ref() {
            let sample = match sample {
                Ok(sample) => sample,
                Err(err) => {
                    // Keep what was produced before the failure
                    writer.write_all(&block).map_err(TapeError::Write)?;
                    let _ = writer.flush();
                    return Err(err);
                }
            };
            block.push(sample);
            if block.len() == WRITE_BLOCK_SAMPLES {
                writer.write_all(&block).map_err(TapeError::Write)?;
                total += block.len();
                block.clear();
            }
        }
        writer.write_all(&block).map_err(TapeError::Write)?;
        total += block.len();
        writer.flush().map_err(TapeError::Write)?;

        let stats = EncodeStats {
            payload_bytes: samples.payload_bytes(),
            samples: total,
            checksum: samples.checksum().value(),
            sample_rate: self.protocol.sample_rate,
        };
        log::info!(
            "Encoded {} bytes into {} samples ({:.2}s), checksum {:#04x}",
            stats.payload_bytes,
            stats.samples,
            stats.duration_secs(),
            stats.checksum
        );
        Ok(stats)
    }
}

impl Default for TapeEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols_for(data: &[u8]) -> Vec<Symbol> {
        SymbolStream::new(data.iter().map(|&b| Ok(b)))
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    /// Reader that hands out some bytes and then fails
    struct FailingReader {
        data: Vec<u8>,
        pos: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.pos < self.data.len() {
                let n = (self.data.len() - self.pos).min(buf.len());
                buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
                self.pos += n;
                Ok(n)
            } else {
                Err(io::Error::new(io::ErrorKind::Other, "disk on fire"))
            }
        }
    }

    /// Writer that accepts a fixed number of bytes
    struct LimitedWriter {
        written: Vec<u8>,
        limit: usize,
    }

    impl Write for LimitedWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written.len() >= self.limit {
                return Err(io::Error::new(io::ErrorKind::WriteZero, "sink full"));
            }
            let n = (self.limit - self.written.len()).min(buf.len());
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_empty_input_framing() {
        let symbols = symbols_for(&[]);
        assert_eq!(symbols.len(), 2 + 8);
        assert_eq!(symbols[0], Symbol::EntryTone);
        assert_eq!(symbols[1], Symbol::TapeIn);
        assert!(symbols[2..].iter().all(|&s| s == Symbol::One));
    }

    #[test]
    fn test_single_zero_byte() {
        let symbols = symbols_for(&[0x00]);
        assert_eq!(symbols.len(), 2 + 16);
        assert!(symbols[2..10].iter().all(|&s| s == Symbol::Zero));
        assert!(symbols[10..].iter().all(|&s| s == Symbol::One));
    }

    #[test]
    fn test_single_ff_byte() {
        let symbols = symbols_for(&[0xFF]);
        assert!(symbols[2..10].iter().all(|&s| s == Symbol::One));
        assert!(symbols[10..].iter().all(|&s| s == Symbol::Zero));
    }

    #[test]
    fn test_preamble_emitted_once() {
        let symbols = symbols_for(b"hello world");
        let entry = symbols.iter().filter(|&&s| s == Symbol::EntryTone).count();
        let tape_in = symbols.iter().filter(|&&s| s == Symbol::TapeIn).count();
        assert_eq!(entry, 1);
        assert_eq!(tape_in, 1);
        assert_eq!(symbols.len(), 2 + 8 * 12);
    }

    #[test]
    fn test_stream_tracks_checksum() {
        let mut stream = SymbolStream::new([0x12u8, 0x34].into_iter().map(Ok));
        let count = stream.by_ref().count();
        assert_eq!(count, 2 + 24);
        assert_eq!(stream.payload_bytes(), 2);
        assert_eq!(stream.checksum().value(), 0xFF ^ 0x12 ^ 0x34);
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_read_error_ends_stream_without_trailer() {
        let source = vec![Ok(0xAA), Err(io::Error::new(io::ErrorKind::Other, "boom")), Ok(0x55)];
        let items: Vec<Result<Symbol>> = SymbolStream::new(source.into_iter()).collect();
        assert_eq!(items.len(), 2 + 8 + 1);
        assert!(matches!(items.last(), Some(Err(TapeError::Read(_)))));
    }

    #[test]
    fn test_encode_length() {
        let encoder = TapeEncoder::new();
        assert_eq!(encoder.encode(&[0x00]).len(), 47294);
        assert_eq!(encoder.encode(&[]).len(), 46746 + 20 + 8 * 44);
    }

    #[test]
    fn test_encode_stream_matches_encode() {
        let encoder = TapeEncoder::new();
        let data: Vec<u8> = (0..=255u8).collect();
        let mut out = Vec::new();
        let stats = encoder.encode_stream(&data[..], &mut out).unwrap();

        assert_eq!(out, encoder.encode(&data));
        assert_eq!(stats.payload_bytes, 256);
        assert_eq!(stats.samples, out.len());
        assert_eq!(stats.checksum, Checksum::of(&data).value());
    }

    #[test]
    fn test_encode_stream_read_failure_keeps_partial_output() {
        let encoder = TapeEncoder::new();
        let reader = FailingReader { data: vec![0x01, 0x02], pos: 0 };
        let mut out = Vec::new();
        let result = encoder.encode_stream(reader, &mut out);

        assert!(matches!(result, Err(TapeError::Read(_))));
        let expected = 46746 + 20 + encoder.protocol().byte_samples(0x01) + encoder.protocol().byte_samples(0x02);
        assert_eq!(out.len(), expected);
    }

    #[test]
    fn test_encode_stream_write_failure() {
        let encoder = TapeEncoder::new();
        let mut writer = LimitedWriter { written: Vec::new(), limit: 1000 };
        let result = encoder.encode_stream(&b"data"[..], &mut writer);

        assert!(matches!(result, Err(TapeError::Write(_))));
        assert_eq!(writer.written.len(), 1000);
    }

    #[test]
    fn test_stats_duration() {
        let encoder = TapeEncoder::new();
        let stats = encoder.encode_stream(&[][..], io::sink()).unwrap();
        assert_eq!(stats.samples, 47118);
        assert!((stats.duration_secs() - 47118.0 / 44100.0).abs() < 1e-9);
    }
}
