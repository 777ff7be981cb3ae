//! WAV reading and batch conversion - the pool's reference workload.
//!
//! This layer sits outside the concurrency core and talks to it only
//! through job submission: [`WavReader`] exposes `open`/`read_samples`,
//! [`PcmEncoder`] abstracts the codec, and [`convert_batch`] fans one
//! conversion job per file out over a [`BatchPool`], batch by batch.
//!
//! Only canonical integer-PCM WAV files (a single `fmt ` and `data` chunk)
//! are understood; anything else is rejected up front by
//! [`WavHeader::validate`].
//!
//! [`BatchPool`]: crate::pool::BatchPool

mod convert;
mod wav;

pub use convert::{
    convert_batch, convert_file, wav_files_in, AudioError, AudioResult, BatchReport, FileOutcome,
    FileStats, PcmEncoder, RawPcmEncoder, FRAMES_PER_READ,
};
pub use wav::{PcmBlock, WavError, WavHeader, WavReader, WAV_HEADER_LEN};
