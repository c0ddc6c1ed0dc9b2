use std::{
    cmp::Ordering,
    fs,
    path::{Path, PathBuf},
};

use regex::Regex;

use crate::error::SeriesError;

/// Files of one series, ordered by the index captured from their names.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSet {
    pub directory: PathBuf,
    /// Expression every file name of the set matches
    pub pattern: String,
    pub paths: Vec<PathBuf>,
}

impl FileSet {
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn first(&self) -> Option<&Path> {
        self.paths.first().map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

/// Infers the pattern of a file name such as `188_13-12-10_82_1`.
///
/// The token after the series id, two positions behind the date token, is
/// the slice index and becomes a capture group. It is appended when the
/// name has no such token. A dotted suffix of the last token is an
/// extension only when that token sits at or behind the index position,
/// so dots inside the prefix or the series id stay part of the name.
pub fn series_pattern(path: &Path) -> Result<Regex, SeriesError> {
    let mismatch = |reason| SeriesError::PatternMismatch {
        path: path.to_path_buf(),
        reason,
    };

    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| mismatch("no file name"))?;

    let mut raw_tokens: Vec<&str> = name.split('_').collect();
    if raw_tokens.len() < 2 {
        return Err(mismatch("fewer than two '_' separated tokens"));
    }

    let date = Regex::new(r"^\d\d-\d\d-\d\d$").map_err(|_| mismatch("invalid date expression"))?;
    let date_index = (0..2)
        .find(|&i| date.is_match(raw_tokens[i]))
        .ok_or_else(|| mismatch("no date-like token in the first two positions"))?;

    let last = raw_tokens.len() - 1;
    let mut extension = None;
    if last >= date_index + 2 {
        if let Some((stem, suffix)) = raw_tokens[last].rsplit_once('.') {
            if !stem.is_empty() {
                raw_tokens[last] = stem;
                extension = Some(suffix);
            }
        }
    }

    let mut tokens: Vec<String> = raw_tokens.into_iter().map(regex::escape).collect();

    let index_token = r"(\d+)".to_owned();
    match tokens.get_mut(date_index + 2) {
        Some(token) => *token = index_token,
        None => tokens.push(index_token),
    }

    let mut expression = format!("^{}", tokens.join("_"));
    if let Some(extension) = extension {
        expression.push_str(r"\.");
        expression.push_str(&regex::escape(extension));
    }
    expression.push('$');

    Regex::new(&expression).map_err(|_| mismatch("could not compile series pattern"))
}

/// Orders captured indices numerically without a width limit.
fn compare_indices(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.trim_start_matches('0'), b.trim_start_matches('0'));
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

/// Finds every file of the series `example` belongs to
///
/// # Errors
///
/// `PatternMismatch` if the name does not follow the naming convention,
/// `Io` if the directory cannot be listed. An empty set is not an error.
pub fn resolve(example: impl AsRef<Path>) -> Result<FileSet, SeriesError> {
    let path = std::path::absolute(example.as_ref())?;
    let pattern = series_pattern(&path)?;
    let directory = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    let mut indexed: Vec<(String, String)> = fs::read_dir(&directory)?
        .filter_map(Result::ok)
        .filter(|entry| entry.path().is_file())
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter_map(|name| {
            let index = pattern.captures(&name)?.get(1)?.as_str().to_owned();
            Some((index, name))
        })
        .collect();

    indexed.sort_by(|(a, a_name), (b, b_name)| {
        compare_indices(a, b).then_with(|| a_name.cmp(b_name))
    });

    let paths = indexed
        .into_iter()
        .map(|(_, name)| directory.join(name))
        .collect();

    Ok(FileSet {
        directory,
        pattern: pattern.as_str().to_owned(),
        paths,
    })
}
