/// Sequence classification taken from the first file of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceKind {
    /// Diffusion EPI sequence acquiring several PTFT values per series
    MultiPtft,
    #[default]
    SinglePtft,
}

impl SequenceKind {
    const MULTI_PTFT_MARKER: &'static str = "ep2d_diff";

    pub fn from_sequence_name(name: &str) -> Self {
        if name.contains(Self::MULTI_PTFT_MARKER) {
            SequenceKind::MultiPtft
        } else {
            SequenceKind::SinglePtft
        }
    }

    pub fn is_multi_ptft(self) -> bool {
        matches!(self, SequenceKind::MultiPtft)
    }
}

/// Direction along which the Itoh unwrapper integrates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Axis {
    #[default]
    Rows,
    Columns,
}
