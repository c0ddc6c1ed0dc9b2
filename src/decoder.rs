use std::collections::BTreeMap;
use std::path::Path;

use dicom::{
    core::Tag,
    object::{FileDicomObject, InMemDicomObject, OpenFileOptions, open_file},
    pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder},
};
use dicom_dictionary_std::tags;
use ndarray::{Array2, s};
use thiserror::Error;

use crate::enums::SequenceKind;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("DICOM error: {0}")]
    Dicom(#[from] dicom::object::ReadError),

    #[error("Pixel data error: {0}")]
    PixelData(#[from] dicom::pixeldata::Error),

    /// Failure of a decoder outside the DICOM stack
    #[error("{0}")]
    Other(String),
}

/// Acquisition parameters parsed from the header of one file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AcquisitionParameters {
    /// Grouping key of diffusion series
    pub ptft: f64,
    pub sequence: SequenceKind,
    /// Remaining header values, keyed by attribute keyword
    pub values: BTreeMap<String, String>,
}

impl AcquisitionParameters {
    pub fn new(ptft: f64, sequence: SequenceKind) -> Self {
        Self {
            ptft,
            sequence,
            values: BTreeMap::new(),
        }
    }

    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

/// Stored pixel values and header parameters of one raw file.
#[derive(Debug, Clone)]
pub struct RawSlice {
    pub pixels: Array2<u16>,
    pub parameters: AcquisitionParameters,
}

/// Boundary to raw-format decoding.
pub trait SliceDecoder: Sync {
    fn decode(&self, path: &Path) -> Result<RawSlice, DecodeError>;

    /// Sequence classification of a file without needing its pixel data.
    fn classify(&self, path: &Path) -> Result<SequenceKind, DecodeError> {
        self.decode(path).map(|raw| raw.parameters.sequence)
    }
}

/// Decodes single-frame DICOM files with the dicom-rs stack.
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomDecoder;

impl DicomDecoder {
    const TEXT_ATTRIBUTES: [(&'static str, Tag); 7] = [
        ("SeriesNumber", tags::SERIES_NUMBER),
        ("InstanceNumber", tags::INSTANCE_NUMBER),
        ("SequenceName", tags::SEQUENCE_NAME),
        ("ProtocolName", tags::PROTOCOL_NAME),
        ("SeriesDescription", tags::SERIES_DESCRIPTION),
        ("EchoTime", tags::ECHO_TIME),
        ("RepetitionTime", tags::REPETITION_TIME),
    ];

    fn decode_pixels(
        dicom_object: &FileDicomObject<InMemDicomObject>,
    ) -> Result<Array2<u16>, DecodeError> {
        let pixel_data = dicom_object.decode_pixel_data()?;
        // stored values, phase images must not be rescaled
        let options = ConvertOptions::new().with_modality_lut(ModalityLutOption::None);
        let frames = pixel_data.to_ndarray_with_options::<u16>(&options)?;
        Ok(frames.slice_move(s![0, .., .., 0]))
    }

    fn sequence_kind(dicom_object: &FileDicomObject<InMemDicomObject>) -> SequenceKind {
        Self::text(dicom_object, tags::SEQUENCE_NAME)
            .map(|name| SequenceKind::from_sequence_name(&name))
            .unwrap_or_default()
    }

    fn text(dicom_object: &FileDicomObject<InMemDicomObject>, tag: Tag) -> Option<String> {
        let value = dicom_object.element(tag).ok()?.to_str().ok()?;
        Some(value.trim().to_owned())
    }

    fn parse_parameters(dicom_object: &FileDicomObject<InMemDicomObject>) -> AcquisitionParameters {
        let ptft = dicom_object
            .element(tags::TRIGGER_TIME)
            .ok()
            .and_then(|element| element.to_float64().ok())
            .unwrap_or(0.0);

        let mut parameters = AcquisitionParameters::new(ptft, Self::sequence_kind(dicom_object));
        for (keyword, tag) in Self::TEXT_ATTRIBUTES {
            if let Some(value) = Self::text(dicom_object, tag) {
                parameters.values.insert(keyword.to_owned(), value);
            }
        }
        parameters
    }
}

impl SliceDecoder for DicomDecoder {
    fn decode(&self, path: &Path) -> Result<RawSlice, DecodeError> {
        let dicom_object = open_file(path)?;
        let pixels = Self::decode_pixels(&dicom_object)?;
        let parameters = Self::parse_parameters(&dicom_object);
        Ok(RawSlice { pixels, parameters })
    }

    fn classify(&self, path: &Path) -> Result<SequenceKind, DecodeError> {
        let dicom_object = OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(path)?;
        Ok(Self::sequence_kind(&dicom_object))
    }
}
