//! RIFF/WAVE PCM file reading.

use log::debug;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::time::Duration;

/// Length of the canonical RIFF/WAVE header this reader understands: RIFF
/// chunk, one `fmt ` chunk, one `data` chunk.
pub const WAV_HEADER_LEN: usize = 44;

/// Errors that can occur while reading a WAV file
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WavError {
    /// Underlying I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File ended before a complete header was read
    #[error("Header truncated: read {read} of 44 bytes")]
    TruncatedHeader {
        /// Bytes actually read
        read: usize,
    },

    /// RIFF chunk id not found at the start of the file
    #[error("RIFF chunk id not detected")]
    NotRiff,

    /// WAVE form type not found
    #[error("WAVE form type not detected")]
    NotWave,

    /// `fmt ` chunk id not found where expected
    #[error("fmt chunk not detected")]
    MissingFmt,

    /// `data` chunk id not found where expected
    #[error("data chunk not detected")]
    MissingData,

    /// fmt chunk has an unexpected size
    #[error("Unexpected fmt chunk size {size} (PCM expects 16)")]
    BadFmtSize {
        /// Declared fmt chunk size
        size: u32,
    },

    /// Stream is not integer PCM
    #[error("Not an integer PCM stream (format tag {format})")]
    NotPcm {
        /// Declared format tag
        format: u16,
    },

    /// Declared byte rate disagrees with channels * sample rate * sample size
    #[error("Declared byte rate {declared} does not match computed {computed}")]
    ByteRateMismatch {
        /// Byte rate from the header
        declared: u32,
        /// Byte rate computed from the other fields
        computed: u32,
    },

    /// Declared block align disagrees with channels * sample size
    #[error("Declared block align {declared} does not match computed {computed}")]
    BlockAlignMismatch {
        /// Block align from the header
        declared: u16,
        /// Block align computed from the other fields
        computed: u16,
    },

    /// Mono and stereo only
    #[error("Unsupported channel count {channels}: expected 1 or 2")]
    UnsupportedChannels {
        /// Declared channel count
        channels: u16,
    },

    /// Sample sizes other than 8, 16, 24 or 32 bits
    #[error("Unsupported bit depth {bits}")]
    UnsupportedBitDepth {
        /// Declared bits per sample
        bits: u16,
    },
}

fn read_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([bytes[at], bytes[at + 1]])
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Parsed canonical WAV header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavHeader {
    /// RIFF chunk size (file size minus 8)
    pub file_size: u32,
    /// fmt chunk size; 16 for plain PCM
    pub fmt_size: u32,
    /// Format tag; 1 for integer PCM
    pub audio_format: u16,
    /// Channel count
    pub num_channels: u16,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Declared bytes per second of audio
    pub byte_rate: u32,
    /// Declared bytes per frame
    pub block_align: u16,
    /// Bits per single-channel sample
    pub bits_per_sample: u16,
    /// Size of the data chunk in bytes
    pub data_size: u32,
}

impl WavHeader {
    /// Parse the canonical 44-byte header
    ///
    /// Structural chunk ids (RIFF, WAVE, `fmt `, `data`) must be present;
    /// format-level consistency is checked separately by
    /// [`validate()`](Self::validate).
    pub fn parse(bytes: &[u8]) -> Result<Self, WavError> {
        if bytes.len() < WAV_HEADER_LEN {
            return Err(WavError::TruncatedHeader { read: bytes.len() });
        }
        if &bytes[0..4] != b"RIFF" {
            return Err(WavError::NotRiff);
        }
        if &bytes[8..12] != b"WAVE" {
            return Err(WavError::NotWave);
        }
        if &bytes[12..16] != b"fmt " {
            return Err(WavError::MissingFmt);
        }
        if &bytes[36..40] != b"data" {
            return Err(WavError::MissingData);
        }

        Ok(Self {
            file_size: read_u32(bytes, 4),
            fmt_size: read_u32(bytes, 16),
            audio_format: read_u16(bytes, 20),
            num_channels: read_u16(bytes, 22),
            sample_rate: read_u32(bytes, 24),
            byte_rate: read_u32(bytes, 28),
            block_align: read_u16(bytes, 32),
            bits_per_sample: read_u16(bytes, 34),
            data_size: read_u32(bytes, 40),
        })
    }

    /// Sanity-check the header for a stream this module can decode
    pub fn validate(&self) -> Result<(), WavError> {
        if self.fmt_size != 16 {
            return Err(WavError::BadFmtSize { size: self.fmt_size });
        }
        if self.audio_format != 1 {
            return Err(WavError::NotPcm {
                format: self.audio_format,
            });
        }
        if self.num_channels == 0 || self.num_channels > 2 {
            return Err(WavError::UnsupportedChannels {
                channels: self.num_channels,
            });
        }
        if !matches!(self.bits_per_sample, 8 | 16 | 24 | 32) {
            return Err(WavError::UnsupportedBitDepth {
                bits: self.bits_per_sample,
            });
        }
        let computed_byte_rate =
            self.sample_rate * u32::from(self.num_channels) * u32::from(self.bits_per_sample) / 8;
        if self.byte_rate != computed_byte_rate {
            return Err(WavError::ByteRateMismatch {
                declared: self.byte_rate,
                computed: computed_byte_rate,
            });
        }
        let computed_block_align = self.num_channels * self.bits_per_sample / 8;
        if self.block_align != computed_block_align {
            return Err(WavError::BlockAlignMismatch {
                declared: self.block_align,
                computed: computed_block_align,
            });
        }
        Ok(())
    }

    /// Bytes per single-channel sample
    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample) / 8
    }

    /// Bytes per frame (one sample of every channel)
    pub fn frame_size(&self) -> usize {
        usize::from(self.num_channels) * self.bytes_per_sample()
    }

    /// Total number of frames in the data chunk
    pub fn total_frames(&self) -> u64 {
        let frame_size = self.frame_size();
        if frame_size == 0 {
            return 0;
        }
        u64::from(self.data_size) / frame_size as u64
    }

    /// Play time of the data chunk
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.total_frames() as f64 / f64::from(self.sample_rate))
    }
}

impl fmt::Display for WavHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-bit PCM, {} channel(s), {} Hz, {} frames",
            self.bits_per_sample,
            self.num_channels,
            self.sample_rate,
            self.total_frames()
        )
    }
}

/// A block of decoded PCM samples, one `Vec` per channel
///
/// Samples are sign-extended to `i32` regardless of the source bit depth;
/// 8-bit streams (stored unsigned in WAV) are re-centered around zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcmBlock {
    channels: Vec<Vec<i32>>,
}

impl PcmBlock {
    /// Build a block from per-channel sample vectors
    ///
    /// All channels must hold the same number of frames.
    pub fn from_channels(channels: Vec<Vec<i32>>) -> Self {
        debug_assert!(
            channels.windows(2).all(|w| w[0].len() == w[1].len()),
            "channels must be equally long"
        );
        Self { channels }
    }

    /// Number of channels in this block
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames in this block
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// `true` when the block holds no frames
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Samples of one channel
    ///
    /// # Panics
    ///
    /// Panics if `channel` is out of range.
    pub fn channel(&self, channel: usize) -> &[i32] {
        &self.channels[channel]
    }
}

/// Streaming reader for canonical PCM WAV files
///
/// # Example
///
/// ```rust,no_run
/// use jobring::audio::WavReader;
///
/// # fn main() -> Result<(), jobring::audio::WavError> {
/// let mut reader = WavReader::open("take1.wav")?;
/// reader.header().validate()?;
///
/// loop {
///     let block = reader.read_samples(4096)?;
///     if block.is_empty() {
///         break;
///     }
///     // feed block to an encoder
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct WavReader {
    reader: BufReader<File>,
    header: WavHeader,
    frames_remaining: u64,
}

impl WavReader {
    /// Open a WAV file and parse its header
    pub fn open(path: impl AsRef<Path>) -> Result<Self, WavError> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut header_bytes = [0u8; WAV_HEADER_LEN];
        let mut read = 0;
        while read < WAV_HEADER_LEN {
            let n = reader.read(&mut header_bytes[read..])?;
            if n == 0 {
                return Err(WavError::TruncatedHeader { read });
            }
            read += n;
        }

        let header = WavHeader::parse(&header_bytes)?;
        debug!("opened {}: {}", path.display(), header);

        let frames_remaining = header.total_frames();
        Ok(Self {
            reader,
            header,
            frames_remaining,
        })
    }

    /// Parsed header of the open file
    pub fn header(&self) -> &WavHeader {
        &self.header
    }

    /// Frames of the data chunk not yet read
    pub fn frames_remaining(&self) -> u64 {
        self.frames_remaining
    }

    /// Read up to `frames` frames of sample data
    ///
    /// Returns fewer frames near the end of the data chunk and an empty
    /// block once it is exhausted.
    pub fn read_samples(&mut self, frames: usize) -> Result<PcmBlock, WavError> {
        let frame_size = self.header.frame_size();
        let channels = usize::from(self.header.num_channels);
        let bytes_per_sample = self.header.bytes_per_sample();

        let want = frames.min(usize::try_from(self.frames_remaining).unwrap_or(usize::MAX));
        if want == 0 || frame_size == 0 {
            return Ok(PcmBlock::default());
        }

        let mut raw = vec![0u8; want * frame_size];
        let mut filled = 0;
        while filled < raw.len() {
            let n = self.reader.read(&mut raw[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        let whole_frames = filled / frame_size;

        let mut decoded: Vec<Vec<i32>> = (0..channels)
            .map(|_| Vec::with_capacity(whole_frames))
            .collect();
        for frame in 0..whole_frames {
            for (channel, samples) in decoded.iter_mut().enumerate() {
                let at = frame * frame_size + channel * bytes_per_sample;
                samples.push(decode_sample(&raw[at..at + bytes_per_sample]));
            }
        }

        self.frames_remaining -= whole_frames as u64;
        Ok(PcmBlock::from_channels(decoded))
    }
}

/// Sign-extend one little-endian sample to `i32`
///
/// 8-bit WAV samples are stored unsigned and biased by 128.
fn decode_sample(bytes: &[u8]) -> i32 {
    match bytes.len() {
        1 => i32::from(bytes[0]) - 128,
        2 => i32::from(i16::from_le_bytes([bytes[0], bytes[1]])),
        3 => {
            let unsigned =
                i32::from(bytes[0]) | (i32::from(bytes[1]) << 8) | (i32::from(bytes[2]) << 16);
            (unsigned << 8) >> 8
        }
        4 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        _ => 0,
    }
}
