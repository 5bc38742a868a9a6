//! Gzip extraction with corruption recovery
//!
//! A truncated or damaged archive is deleted and fetched again from its
//! origin, up to a bounded number of attempts. The decompressed sibling is
//! only left on disk once it has been written completely.

use flate2::read::MultiGzDecoder;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{IngestError, Result};
use crate::fetch::{partial_path, remove_if_exists, Fetcher};

/// Path of the decompressed sibling: the archive path minus `.gz`
pub fn decompressed_path(archive: &Path) -> PathBuf {
    match archive.to_str().and_then(|s| s.strip_suffix(".gz")) {
        Some(stripped) => PathBuf::from(stripped),
        None => archive.with_extension(""),
    }
}

/// Whether a decode failure means the archive itself is damaged
pub fn is_corruption(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::UnexpectedEof | ErrorKind::InvalidInput | ErrorKind::InvalidData
    )
}

/// Decompresses archives, re-fetching them when they turn out corrupt
#[derive(Debug, Clone)]
pub struct Extractor {
    fetcher: Fetcher,
    max_attempts: u32,
}

impl Extractor {
    pub fn new(fetcher: Fetcher, max_attempts: u32) -> Self {
        Self {
            fetcher,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Decompress `archive` next to itself and return the sibling's path.
    ///
    /// Returns immediately when the sibling already exists. On corruption the
    /// archive is deleted and downloaded again from `origin_url`; after
    /// `max_attempts` failed decodes the result is
    /// [`IngestError::RetriesExhausted`]. Other failures propagate unchanged.
    pub async fn extract(&self, archive: &Path, origin_url: &str) -> Result<PathBuf> {
        let target = decompressed_path(archive);
        if tokio::fs::try_exists(&target).await? {
            debug!(path = %target.display(), "Already extracted, skipping");
            return Ok(target);
        }

        for attempt in 1..=self.max_attempts {
            debug!("Extraction attempt {}/{} for: {}", attempt, self.max_attempts, archive.display());

            let partial = partial_path(&target);
            let result = tokio::task::spawn_blocking({
                let src = archive.to_path_buf();
                let dst = partial.clone();
                move || decompress_file(&src, &dst)
            })
            .await?;

            let err = match result {
                Ok(bytes) => {
                    tokio::fs::rename(&partial, &target).await?;
                    info!(path = %target.display(), bytes = bytes, "Extracted archive");
                    return Ok(target);
                },
                Err(e) => e,
            };

            remove_if_exists(&partial).await;

            if !is_corruption(&err) {
                return Err(err.into());
            }

            warn!(
                "Archive {} is corrupt ({}), attempt {}/{}",
                archive.display(),
                err,
                attempt,
                self.max_attempts
            );
            remove_if_exists(archive).await;

            if attempt < self.max_attempts {
                self.fetcher.download(origin_url, archive).await?;
            }
        }

        Err(IngestError::RetriesExhausted {
            path: archive.to_path_buf(),
            attempts: self.max_attempts,
        })
    }
}

/// Stream `archive` through the gzip decoder into `target`
fn decompress_file(archive: &Path, target: &Path) -> io::Result<u64> {
    let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(archive)?));
    let mut out = BufWriter::new(File::create(target)?);
    let bytes = io::copy(&mut decoder, &mut out)?;
    out.flush()?;
    Ok(bytes)
}
