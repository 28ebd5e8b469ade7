//! Durable, fingerprint-keyed cache of generated response streams.
//!
//! Layout: `{root}/{fingerprint}.json`, holding byte-for-byte the stream
//! that was sent to the client. A later identical request is served by
//! replaying the file. Generation writes through a tee: bytes go to the
//! live sink and to a .tmp file that is renamed into place only on commit,
//! so a partially written stream is never served. An aborted or dropped
//! tee removes its partial file.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use barcast_core::fingerprint::Fingerprint;

use crate::error::EngineError;

/// On-disk response stream cache.
pub struct StreamCache {
    root: PathBuf,
}

impl StreamCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the cache.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Final path for a fingerprint's cached stream.
    pub fn cache_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(format!("{fingerprint}.json"))
    }

    /// Whether a completed stream is cached for this fingerprint.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.cache_path(fingerprint).is_file()
    }

    /// Replay a cached stream into the sink. Returns false when no
    /// completed file exists for this fingerprint.
    pub fn replay(
        &self,
        fingerprint: &Fingerprint,
        sink: &mut dyn Write,
    ) -> Result<bool, EngineError> {
        let path = self.cache_path(fingerprint);
        if !path.is_file() {
            return Ok(false);
        }

        let mut file = File::open(&path).map_err(|source| EngineError::CacheIo {
            path: path.clone(),
            source,
        })?;
        let mut buf = [0u8; 8192];
        loop {
            let n = file.read(&mut buf).map_err(|source| EngineError::CacheIo {
                path: path.clone(),
                source,
            })?;
            if n == 0 {
                break;
            }
            sink.write_all(&buf[..n])?;
        }
        sink.flush()?;
        Ok(true)
    }

    /// Start a tee'd generation: everything written goes to `sink` and to
    /// a temp file that `commit` renames into place.
    pub fn begin<'a>(
        &self,
        fingerprint: &Fingerprint,
        sink: &'a mut dyn Write,
    ) -> Result<TeeWriter<'a>, EngineError> {
        fs::create_dir_all(&self.root).map_err(|source| EngineError::CacheIo {
            path: self.root.clone(),
            source,
        })?;

        let final_path = self.cache_path(fingerprint);
        let tmp_path = final_path.with_extension("json.tmp");
        let file = File::create(&tmp_path).map_err(|source| EngineError::CacheIo {
            path: tmp_path.clone(),
            source,
        })?;

        Ok(TeeWriter {
            sink,
            file: Some(file),
            tmp_path,
            final_path,
        })
    }

    /// Remove every cached stream file. Returns the number removed.
    pub fn clear(&self) -> Result<usize, EngineError> {
        let mut removed = 0;
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(source) => {
                return Err(EngineError::CacheIo {
                    path: self.root.clone(),
                    source,
                })
            }
        };
        for entry in entries {
            let entry = entry.map_err(|source| EngineError::CacheIo {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                fs::remove_file(&path).map_err(|source| EngineError::CacheIo {
                    path: path.clone(),
                    source,
                })?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Writer that duplicates the stream to the live sink and a temp cache
/// file. Dropping it without `commit` removes the temp file.
pub struct TeeWriter<'a> {
    sink: &'a mut dyn Write,
    file: Option<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
}

impl TeeWriter<'_> {
    /// Finish the generation: flush and rename the temp file into place.
    pub fn commit(mut self) -> Result<(), EngineError> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(|source| EngineError::CacheIo {
                path: self.tmp_path.clone(),
                source,
            })?;
            drop(file);
            fs::rename(&self.tmp_path, &self.final_path).map_err(|source| {
                let _ = fs::remove_file(&self.tmp_path);
                EngineError::CacheIo {
                    path: self.final_path.clone(),
                    source,
                }
            })?;
        }
        Ok(())
    }

    /// Discard the generation and remove the temp file.
    pub fn abort(mut self) {
        self.discard();
    }

    fn discard(&mut self) {
        if self.file.take().is_some() {
            let _ = fs::remove_file(&self.tmp_path);
        }
    }
}

impl Drop for TeeWriter<'_> {
    fn drop(&mut self) {
        self.discard();
    }
}

impl Write for TeeWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.sink.write_all(buf)?;
        if let Some(file) = &mut self.file {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()?;
        if let Some(file) = &mut self.file {
            file.flush()?;
        }
        Ok(())
    }
}
