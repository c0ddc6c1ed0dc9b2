use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use rayon::prelude::*;

use crate::{
    decoder::{DicomDecoder, SliceDecoder},
    enums::SequenceKind,
    error::SeriesError,
    filename::{self, FileSet},
    grouping::{ClosedGroup, RunGrouper},
    mask::Mask,
    series::Series,
    slice::Slice,
    slice_reader::{ReadOptions, SliceReader},
};

/// Result of assembling a series.
#[derive(Debug, Clone)]
pub enum AssembledSeries {
    Single(Series),
    /// Several PTFT groups, sorted by PTFT
    Grouped(Vec<Series>),
}

impl AssembledSeries {
    pub fn into_vec(self) -> Vec<Series> {
        match self {
            AssembledSeries::Single(series) => vec![series],
            AssembledSeries::Grouped(series) => series,
        }
    }

    pub fn as_single(&self) -> Option<&Series> {
        match self {
            AssembledSeries::Single(series) => Some(series),
            AssembledSeries::Grouped(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AssembledSeries::Single(_) => 1,
            AssembledSeries::Grouped(series) => series.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Grouping key of a slice; single-PTFT series collapse into one group.
#[derive(Debug, Clone, Copy, PartialEq)]
enum GroupKey {
    Ptft(f64),
    Whole,
}

impl GroupKey {
    fn ptft(self) -> Option<f64> {
        match self {
            GroupKey::Ptft(ptft) => Some(ptft),
            GroupKey::Whole => None,
        }
    }
}

pub struct SeriesAssembler<D = DicomDecoder> {
    reader: SliceReader<D>,
    parallel: bool,
}

impl Default for SeriesAssembler<DicomDecoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl SeriesAssembler<DicomDecoder> {
    pub fn new() -> Self {
        Self::with_reader(SliceReader::new())
    }
}

impl<D: SliceDecoder> SeriesAssembler<D> {
    pub fn with_reader(reader: SliceReader<D>) -> Self {
        Self {
            reader,
            parallel: false,
        }
    }

    /// Decode files on the rayon pool; grouping still follows file order
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn reader(&self) -> &SliceReader<D> {
        &self.reader
    }

    /// Assemble the whole series `example` belongs to
    ///
    /// # Arguments
    ///
    /// * `example` - Path of any file of the series, it need not exist
    /// * `options` - Unwrapping applied to every slice
    /// * `mask` - Valid pixels, required when unwrapping
    ///
    /// # Errors
    ///
    /// Fails on the first error of any file, no partial series is returned.
    pub fn assemble(
        &self,
        example: impl AsRef<Path>,
        options: &ReadOptions,
        mask: Option<&Mask>,
    ) -> Result<AssembledSeries, SeriesError> {
        let example = example.as_ref();
        self.reader.validate(example, options, mask)?;

        let files = filename::resolve(example)?;
        let first = files.first().ok_or_else(|| SeriesError::DiscoveryFailure {
            directory: files.directory.clone(),
            pattern: files.pattern.clone(),
        })?;
        info!("Found {} file(s) in total", files.len());

        let kind = self
            .reader
            .decoder()
            .classify(first)
            .map_err(|source| SeriesError::Decode {
                path: first.to_path_buf(),
                source,
            })?;

        let groups = if self.parallel {
            self.group_parallel(&files, kind, options, mask)?
        } else {
            self.group_sequential(&files, kind, options, mask)?
        };

        let shared_mask = mask.cloned().map(Arc::new);
        let mut series = groups
            .into_iter()
            .map(|group| Ok(Series::stack(group.members)?.with_mask(shared_mask.clone())))
            .collect::<Result<Vec<_>, SeriesError>>()?;

        if series.len() == 1 {
            return Ok(AssembledSeries::Single(series.remove(0)));
        }
        series.sort_by(|a, b| a.ptft().total_cmp(&b.ptft()));
        Ok(AssembledSeries::Grouped(series))
    }

    fn group_sequential(
        &self,
        files: &FileSet,
        kind: SequenceKind,
        options: &ReadOptions,
        mask: Option<&Mask>,
    ) -> Result<Vec<ClosedGroup<GroupKey, Slice>>, SeriesError> {
        let mut grouper = RunGrouper::new();
        let mut groups = Vec::new();

        for path in files.iter() {
            let slice = self.reader.read(path, options, mask)?;
            groups.extend(Self::push(&mut grouper, kind, slice));
        }
        groups.extend(grouper.finish());

        Ok(groups)
    }

    fn group_parallel(
        &self,
        files: &FileSet,
        kind: SequenceKind,
        options: &ReadOptions,
        mask: Option<&Mask>,
    ) -> Result<Vec<ClosedGroup<GroupKey, Slice>>, SeriesError> {
        let slices = files
            .paths
            .par_iter()
            .map(|path| self.reader.read(path, options, mask))
            .collect::<Result<Vec<_>, _>>()?;

        let mut grouper = RunGrouper::new();
        let mut groups: Vec<_> = slices
            .into_iter()
            .filter_map(|slice| Self::push(&mut grouper, kind, slice))
            .collect();
        groups.extend(grouper.finish());

        Ok(groups)
    }

    fn push(
        grouper: &mut RunGrouper<GroupKey, Slice>,
        kind: SequenceKind,
        slice: Slice,
    ) -> Option<ClosedGroup<GroupKey, Slice>> {
        let key = match kind {
            SequenceKind::MultiPtft => GroupKey::Ptft(slice.ptft()),
            SequenceKind::SinglePtft => GroupKey::Whole,
        };
        let closed = grouper.push(key, slice);
        if let (Some(_), Some(ptft)) = (&closed, key.ptft()) {
            debug!("New PTFT: {ptft}");
        }
        closed
    }
}

/// Assemble a DICOM series with the default decoder and algorithms
pub fn assemble_series(
    example: impl AsRef<Path>,
    options: &ReadOptions,
    mask: Option<&Mask>,
) -> Result<AssembledSeries, SeriesError> {
    SeriesAssembler::new().assemble(example, options, mask)
}
