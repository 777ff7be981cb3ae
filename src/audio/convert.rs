//! Batch conversion of WAV files across a [`BatchPool`].

use crate::audio::wav::{PcmBlock, WavError, WavHeader, WavReader};
use crate::core::PoolError;
use crate::pool::BatchPool;
use log::{debug, info};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Frames pulled from a reader per encode iteration.
pub const FRAMES_PER_READ: usize = 4096;

/// Errors from the conversion pipeline
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AudioError {
    /// WAV reading failed
    #[error(transparent)]
    Wav(#[from] WavError),

    /// Output I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The encoder rejected the stream
    #[error("Encoder error: {0}")]
    Encode(String),
}

/// Result type for conversion operations
pub type AudioResult<T> = std::result::Result<T, AudioError>;

/// A pluggable PCM encoder
///
/// The codec itself lives outside this crate; anything that can turn PCM
/// blocks into output bytes plugs in here. `begin` sees the source header
/// and may emit a stream preamble, `encode` is called once per block, and
/// `finish` may emit trailing bytes.
pub trait PcmEncoder: Send {
    /// Start a stream for the given source format
    fn begin(&mut self, header: &WavHeader) -> AudioResult<Vec<u8>>;

    /// Encode one block of samples
    fn encode(&mut self, block: &PcmBlock) -> AudioResult<Vec<u8>>;

    /// Flush any buffered output
    fn finish(&mut self) -> AudioResult<Vec<u8>>;

    /// File extension for this encoder's output
    fn extension(&self) -> &str;
}

/// Encoder that emits interleaved 16-bit little-endian PCM with no framing
///
/// Useful as a codec-free default and as the reference encoder in tests.
/// Samples wider than 16 bits are truncated to their low 16 bits.
#[derive(Debug, Default)]
pub struct RawPcmEncoder;

impl RawPcmEncoder {
    /// Create a new raw PCM encoder
    pub fn new() -> Self {
        Self
    }
}

impl PcmEncoder for RawPcmEncoder {
    fn begin(&mut self, _header: &WavHeader) -> AudioResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn encode(&mut self, block: &PcmBlock) -> AudioResult<Vec<u8>> {
        let mut out = Vec::with_capacity(block.frames() * block.num_channels() * 2);
        for frame in 0..block.frames() {
            for channel in 0..block.num_channels() {
                let sample = block.channel(channel)[frame] as i16;
                out.extend_from_slice(&sample.to_le_bytes());
            }
        }
        Ok(out)
    }

    fn finish(&mut self) -> AudioResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn extension(&self) -> &str {
        "pcm"
    }
}

/// Per-file conversion statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileStats {
    /// Frames read and encoded
    pub frames: u64,
    /// Bytes written to the output file
    pub bytes_written: u64,
}

/// Convert one WAV file, streaming block by block through `encoder`
pub fn convert_file(
    input: &Path,
    output: &Path,
    encoder: &mut dyn PcmEncoder,
) -> AudioResult<FileStats> {
    let mut reader = WavReader::open(input)?;
    reader.header().validate()?;

    let mut out = BufWriter::new(File::create(output)?);
    let mut bytes_written = 0u64;
    let mut frames = 0u64;

    let preamble = encoder.begin(reader.header())?;
    out.write_all(&preamble)?;
    bytes_written += preamble.len() as u64;

    loop {
        let block = reader.read_samples(FRAMES_PER_READ)?;
        if block.is_empty() {
            break;
        }
        frames += block.frames() as u64;
        let encoded = encoder.encode(&block)?;
        out.write_all(&encoded)?;
        bytes_written += encoded.len() as u64;
    }

    let trailer = encoder.finish()?;
    out.write_all(&trailer)?;
    bytes_written += trailer.len() as u64;
    out.flush()?;

    debug!(
        "converted {} -> {} ({} frames, {} bytes)",
        input.display(),
        output.display(),
        frames,
        bytes_written
    );
    Ok(FileStats {
        frames,
        bytes_written,
    })
}

/// List the `.wav` files directly inside `dir`, sorted by name
pub fn wav_files_in(dir: &Path) -> AudioResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_wav = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("wav"));
        if is_wav {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Outcome of converting one input file
#[derive(Debug)]
pub struct FileOutcome {
    /// Source WAV path
    pub input: PathBuf,
    /// Output path the encoder wrote (or would have written)
    pub output: PathBuf,
    /// Conversion result
    pub result: AudioResult<FileStats>,
}

/// Outcome of a whole conversion run
#[derive(Debug, Default)]
pub struct BatchReport {
    /// One entry per input file, in completion order
    pub outcomes: Vec<FileOutcome>,
}

impl BatchReport {
    /// Number of files converted successfully
    pub fn converted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    /// Number of files that failed to convert
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.converted()
    }
}

/// Convert a set of WAV files across the pool's workers
///
/// One job per input file; each job builds its own encoder from
/// `make_encoder`, converts the file next to its input (same name, the
/// encoder's extension), and records the outcome. The pool's batch
/// discipline applies: when `inputs` exceeds the pool's job capacity,
/// submission blocks at each batch boundary until the previous batch
/// drains - the same pacing the pool gives any other caller.
pub fn convert_batch<F>(
    pool: &mut BatchPool,
    inputs: &[PathBuf],
    make_encoder: F,
) -> crate::core::Result<BatchReport>
where
    F: Fn() -> Box<dyn PcmEncoder> + Send + Sync + 'static,
{
    let make_encoder = Arc::new(make_encoder);
    let outcomes: Arc<Mutex<Vec<FileOutcome>>> =
        Arc::new(Mutex::new(Vec::with_capacity(inputs.len())));

    info!("converting {} file(s)", inputs.len());
    for input in inputs {
        let input = input.clone();
        let make_encoder = Arc::clone(&make_encoder);
        let outcomes = Arc::clone(&outcomes);
        pool.execute(move |worker_id| {
            let mut encoder = make_encoder();
            let output = input.with_extension(encoder.extension());
            debug!("worker {} converting {}", worker_id, input.display());

            let result = convert_file(&input, &output, encoder.as_mut());
            let failure = result.as_ref().err().map(ToString::to_string);
            outcomes.lock().push(FileOutcome {
                input,
                output,
                result,
            });
            match failure {
                Some(message) => Err(PoolError::other(message)),
                None => Ok(()),
            }
        })?;
    }
    pool.wait_for_batch();

    let outcomes = std::mem::take(&mut *outcomes.lock());
    Ok(BatchReport { outcomes })
}
