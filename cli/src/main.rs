use appletape_core::{EncodeStats, TapeEncoder, TapeError, BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE};
use clap::Parser;
use hound::WavSpec;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "appletape")]
#[command(about = "Convert a file into audio for the Apple ][ cassette input")]
#[command(long_about = "Convert a file into audio for the Apple ][ cassette input.\n\n\
    Output is headerless mono unsigned 8-bit PCM at 44100 Hz unless --wav is given.")]
struct Cli {
    /// Input file (stdin when omitted or "-")
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Output file (stdout when omitted or "-")
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Wrap the samples in a WAV container (needs a file output)
    #[arg(long, requires = "output")]
    wav: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("Failed to open input file {}: {source}", .path.display())]
    OpenInput { path: PathBuf, source: io::Error },

    #[error("Failed to open output file {}: {source}", .path.display())]
    OpenOutput { path: PathBuf, source: io::Error },

    #[error("WAV output needs a file path, not stdout")]
    WavToStdout,

    #[error(transparent)]
    Encode(#[from] TapeError),

    #[error("Failed to write WAV file {}: {source}", .path.display())]
    Wav { path: PathBuf, source: hound::Error },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// "-" is an explicit request for the standard stream
fn file_path(path: &Option<PathBuf>) -> Option<&Path> {
    path.as_deref().filter(|p| p.as_os_str() != "-")
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let input: Box<dyn Read> = match file_path(&cli.input) {
        Some(path) => {
            let file = File::open(path).map_err(|source| CliError::OpenInput {
                path: path.to_path_buf(),
                source,
            })?;
            log::info!("Reading {}", path.display());
            Box::new(file)
        }
        None => Box::new(io::stdin().lock()),
    };

    let encoder = TapeEncoder::new();
    let output = file_path(&cli.output);

    let stats = match (output, cli.wav) {
        (Some(path), true) => encode_wav_command(&encoder, input, path)?,
        (None, true) => return Err(CliError::WavToStdout),
        (Some(path), false) => {
            let file = File::create(path).map_err(|source| CliError::OpenOutput {
                path: path.to_path_buf(),
                source,
            })?;
            log::info!("Writing raw samples to {}", path.display());
            encoder.encode_stream(input, BufWriter::new(file))?
        }
        (None, false) => encoder.encode_stream(input, io::stdout().lock())?,
    };

    log::info!(
        "Wrote {} samples ({:.2}s) for {} bytes, checksum {:#04x}",
        stats.samples,
        stats.duration_secs(),
        stats.payload_bytes,
        stats.checksum
    );
    Ok(())
}

fn encode_wav_command(encoder: &TapeEncoder, input: Box<dyn Read>, output_path: &Path) -> Result<EncodeStats, CliError> {
    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE as u32,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let wav_error = |source: hound::Error| CliError::Wav {
        path: output_path.to_path_buf(),
        source,
    };

    let file = File::create(output_path).map_err(|source| CliError::OpenOutput {
        path: output_path.to_path_buf(),
        source,
    })?;
    let mut writer = hound::WavWriter::new(BufWriter::new(file), spec).map_err(wav_error)?;

    let stats = encoder.encode_stream(input, WavSampleWriter { inner: &mut writer });
    // Finalize even after a failure so the header matches what was written
    writer.finalize().map_err(wav_error)?;
    log::info!("Wrote WAV {}", output_path.display());

    Ok(stats?)
}

/// Adapts the raw unsigned sample stream to hound's 8-bit sample API
struct WavSampleWriter<'a, W: Write + io::Seek> {
    inner: &'a mut hound::WavWriter<W>,
}

impl<W: Write + io::Seek> Write for WavSampleWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &sample in buf {
            // hound stores 8-bit WAV samples offset by 128
            let signed = (sample as i16 - 128) as i8;
            self.inner.write_sample(signed).map_err(hound_to_io)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().map_err(hound_to_io)
    }
}

fn hound_to_io(err: hound::Error) -> io::Error {
    match err {
        hound::Error::IoError(err) => err,
        other => io::Error::new(io::ErrorKind::Other, other),
    }
}
