use std::path::Path;

use log::{debug, warn};

use crate::{
    decoder::{DicomDecoder, SliceDecoder},
    error::SeriesError,
    mask::{Mask, validate_for_unwrap},
    slice::{Slice, SliceMetadata, normalize},
    unwrap::{Diagnostics, UnwrapRegistry, UnwrapSettings},
};

/// Options applied to every slice of a read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReadOptions {
    pub unwrap: bool,
    pub unwrap_settings: UnwrapSettings,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables unwrapping with the given algorithm settings
    pub fn with_unwrap(mut self, settings: UnwrapSettings) -> Self {
        self.unwrap = true;
        self.unwrap_settings = settings;
        self
    }
}

pub struct SliceReader<D = DicomDecoder> {
    decoder: D,
    registry: UnwrapRegistry,
}

impl Default for SliceReader<DicomDecoder> {
    fn default() -> Self {
        Self::new()
    }
}

impl SliceReader<DicomDecoder> {
    pub fn new() -> Self {
        Self::with_decoder(DicomDecoder)
    }
}

impl<D: SliceDecoder> SliceReader<D> {
    pub fn with_decoder(decoder: D) -> Self {
        Self {
            decoder,
            registry: UnwrapRegistry::default(),
        }
    }

    pub fn with_registry(mut self, registry: UnwrapRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn registry(&self) -> &UnwrapRegistry {
        &self.registry
    }

    /// Checks everything that can fail before a file is touched.
    ///
    /// # Errors
    ///
    /// `ConfigurationFailure` for an unknown algorithm or invalid parameters,
    /// then `UnwrapPrecondition` for a missing or empty mask. Nothing is
    /// checked when unwrapping is disabled.
    pub fn validate(
        &self,
        path: &Path,
        options: &ReadOptions,
        mask: Option<&Mask>,
    ) -> Result<(), SeriesError> {
        if options.unwrap {
            self.registry.validate(&options.unwrap_settings)?;
            validate_for_unwrap(mask, path)?;
        }
        Ok(())
    }

    /// Read one file into a normalized slice, unwrapping it if requested
    pub fn read(
        &self,
        path: &Path,
        options: &ReadOptions,
        mask: Option<&Mask>,
    ) -> Result<Slice, SeriesError> {
        self.read_with_diagnostics(path, options, mask)
            .map(|(slice, _)| slice)
    }

    /// Like [`read`](Self::read), also returning the unwrapper's diagnostics
    pub fn read_with_diagnostics(
        &self,
        path: &Path,
        options: &ReadOptions,
        mask: Option<&Mask>,
    ) -> Result<(Slice, Option<Diagnostics>), SeriesError> {
        self.validate(path, options, mask)?;

        let raw = self
            .decoder
            .decode(path)
            .map_err(|source| SeriesError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Read in file {}", path.display());

        let mut data = normalize(&raw.pixels);
        let mut disconnected = None;
        let mut diagnostics = None;

        if options.unwrap {
            let mask = validate_for_unwrap(mask, path)?;
            let settings = &options.unwrap_settings;
            let unwrapped = self.registry.unwrap(data.view(), mask, settings)?;

            if settings.reports_connectivity() {
                let is_disconnected = !unwrapped.diagnostics.is_fully_connected();
                if is_disconnected {
                    warn!(
                        "Found disconnected pieces while unwrapping {}",
                        path.display()
                    );
                }
                disconnected = Some(is_disconnected);
            }

            data = unwrapped.grid;
            diagnostics = Some(unwrapped.diagnostics);
        }

        let metadata = SliceMetadata {
            parameters: raw.parameters,
            orig_file: file_name(path),
            unwrapped: options.unwrap,
        };

        Ok((
            Slice {
                data,
                metadata,
                disconnected,
            },
            diagnostics,
        ))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
