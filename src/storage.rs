use std::fs;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Characters the target filesystem rejects in a path component. The path
/// separators and the drive-letter colon are listed explicitly so the same
/// folder name works on every platform.
const ILLEGAL_CHARS: &[char] = &['\\', '/', ':', '<', '>', '"', '|', '?', '*'];

/// Errors raised while resolving a URL to a storage path or writing the
/// document to disk. Path-construction failures and storage I/O failures
/// are distinct so the caller can decide per kind whether to abort the
/// crawl or keep going.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("`{url}` cannot be made relative to the crawl root")]
    OutOfDomain { url: Url },

    #[error("failed to create directory `{path}`: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write document `{path}`: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Removes every character that is illegal in a filesystem path component.
///
/// This is a total filtering function: it never fails, and applying it twice
/// yields the same string as applying it once.
pub fn sanitize_component(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_control() && !ILLEGAL_CHARS.contains(c))
        .collect()
}

/// Persists crawled documents under a folder derived from the site root.
///
/// The folder name is the root URL's string form with all filesystem-illegal
/// characters removed; it is computed once at construction and also serves
/// as the base name for the report files (see [`crate::report::ReportWriter`]).
#[derive(Debug)]
pub struct Disc {
    domain: Url,
    output_root: PathBuf,
    domain_folder: String,
}

impl Disc {
    pub fn new(domain: Url, output_root: PathBuf) -> Self {
        let domain_folder = sanitize_component(domain.as_str());
        Self {
            domain,
            output_root,
            domain_folder,
        }
    }

    pub fn domain_folder(&self) -> &str {
        &self.domain_folder
    }

    /// Base path for the report files: the domain folder location itself,
    /// without a trailing separator. `ReportWriter` appends `-report.txt`
    /// and friends to it, so the reports end up as siblings of the folder.
    pub fn report_base(&self) -> PathBuf {
        self.output_root.join(&self.domain_folder)
    }

    /// Resolves a URL to its path relative to the domain folder.
    ///
    /// The URL's path is made relative to the crawl root, then a
    /// directory/index-file convention is applied: when the last path
    /// segment carries no `.` (no file extension), the target is treated as
    /// a directory and `index.html` is appended. The root URL itself
    /// resolves to exactly `index.html`.
    ///
    /// No percent-decoding and no case normalization happens here; two URLs
    /// differing only by encoding or case map to different files. Distinct
    /// URLs that still resolve to the same path silently share a file, the
    /// last write winning.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::OutOfDomain`] when the URL lives on another
    /// scheme/host or the relative form would climb out of the domain
    /// folder.
    pub fn resolve_relative(&self, url: &Url) -> Result<String, StorageError> {
        let mut relative =
            self.domain
                .make_relative(url)
                .ok_or_else(|| StorageError::OutOfDomain {
                    url: url.clone(),
                })?;

        if relative.starts_with("..") {
            return Err(StorageError::OutOfDomain { url: url.clone() });
        }

        let last_segment = relative
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(relative.as_str());

        if !last_segment.contains('.') {
            if !relative.is_empty() && !relative.ends_with('/') {
                relative.push('/');
            }
            relative.push_str("index.html");
        }

        Ok(relative)
    }

    /// Absolute-within-output path for a document: output root, domain
    /// folder, then the resolved relative path.
    pub fn document_path(&self, url: &Url) -> Result<PathBuf, StorageError> {
        let relative = self.resolve_relative(url)?;
        Ok(self.output_root.join(&self.domain_folder).join(relative))
    }

    /// Writes `content` to the file the URL resolves to, creating missing
    /// intermediate directories first. An existing file is overwritten
    /// unconditionally.
    ///
    /// There is no locking here: two concurrent stores racing on a
    /// colliding path finish in either order and the last completed write
    /// wins. Callers that need stronger guarantees must serialize per
    /// resolved path themselves.
    ///
    /// # Returns
    ///
    /// The path the document was written to.
    pub async fn store(&self, url: &Url, content: &str) -> Result<PathBuf, StorageError> {
        let target_path = self.document_path(url)?;

        if let Some(parent) = target_path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(&target_path, content).map_err(|source| StorageError::Write {
            path: target_path.clone(),
            source,
        })?;

        Ok(target_path)
    }
}
