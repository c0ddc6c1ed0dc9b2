//! # MRR-series library
//!
//! This crate reads series of phase-contrast MR slices stored as one DICOM
//! file per slice and assembles them into volumes.
//!
//! Files of a series are found from a single example path. Their names
//! follow `<prefix>_<YY-MM-DD>_<series-id>_<index>`, where the prefix is
//! optional and the index orders the slices. Each slice is normalized to
//! the full-scale value of 4096 and can be phase unwrapped on the fly with
//! one of the registered algorithms, which then requires a mask.
//!
//! Diffusion sequences (sequence name containing `ep2d_diff`) acquire runs
//! of slices with different PTFT values. Every run becomes its own volume
//! and the volumes are returned sorted by PTFT. Runs repeating an earlier
//! PTFT are kept as separate volumes.
//!
//! Slices are read one after another by default. With
//! [`SeriesAssembler::with_parallel`] they are decoded using rayon and
//! grouped in file order afterwards.
//!
//! # Examples
//!
//! ## Reading an unwrapped series
//!
//! ```no_run
//! # use mrr_series::{Mask, ReadOptions, SeriesAssembler, UnwrapSettings};
//! let mask = Mask::from_image_file("55_mask.bmp", true)
//!     .expect("should have read the mask");
//! let options = ReadOptions::new().with_unwrap(UnwrapSettings::new("primary-gold"));
//! let series = SeriesAssembler::new()
//!     .assemble("data/188_13-12-10_56_1", &options, Some(&mask))
//!     .expect("should have assembled the series");
//! for volume in series.into_vec() {
//!     println!("PTFT {}: {:?}", volume.ptft(), volume.dim());
//! }
//! ```

pub mod decoder;
pub mod enums;
pub mod error;
pub mod filename;
pub mod grouping;
pub mod mask;
pub mod series;
pub mod series_assembler;
pub mod slice;
pub mod slice_reader;
pub mod unwrap;

pub use decoder::{AcquisitionParameters, DecodeError, DicomDecoder, RawSlice, SliceDecoder};
pub use enums::{Axis, SequenceKind};
pub use error::SeriesError;
pub use filename::{FileSet, resolve};
pub use mask::Mask;
pub use series::Series;
pub use series_assembler::{AssembledSeries, SeriesAssembler, assemble_series};
pub use slice::{FULL_SCALE, Slice, SliceMetadata};
pub use slice_reader::{ReadOptions, SliceReader};
pub use unwrap::{
    Diagnostics, UnwrapError, UnwrapParams, UnwrapRegistry, UnwrapSettings, Unwrapper,
};
