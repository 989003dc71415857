// src/phar/writer.rs
//! PHAR archive writer
//!
//! Owns one artifact under construction. Entries are buffered in memory,
//! compressed as they arrive, and written in a single pass on commit. The
//! bytes go to a temporary file next to the target which is renamed into
//! place only after it has been fully written and synced, so the target path
//! never holds a partial archive.

use crate::compression::{self, Codec, CompressionMode};
use crate::error::{BuildPhase, Error, Result};
use crate::path::archive_name;
use crate::phar::format::{self, EntryHeader};
use crate::progress::{BuildReporter, SilentReporter};
use crate::stub::bootstrap_stub;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Permissions stored for regular entries
pub const DEFAULT_PERMISSIONS: u32 = 0o644;
/// Permissions stored for entries whose source file is executable
pub const EXECUTABLE_PERMISSIONS: u32 = 0o755;

/// Lifecycle of an archive writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Accepting entries
    Buffering,
    /// Archive written to its final path
    Committed,
    /// An error aborted the archive; nothing was written to the final path
    Failed,
}

impl fmt::Display for WriterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Buffering => "buffering",
            Self::Committed => "committed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// An entry stored in the archive
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Archive-relative name, `/`-separated
    pub name: String,
    /// Stored bytes (compressed when `codec` is set)
    pub data: Vec<u8>,
    pub codec: Option<Codec>,
    pub uncompressed_size: u32,
    /// CRC32 of the uncompressed bytes
    pub crc32: u32,
    pub permissions: u32,
    pub timestamp: u32,
}

impl ArchiveEntry {
    fn header(&self) -> EntryHeader {
        EntryHeader {
            name: self.name.clone(),
            uncompressed_size: self.uncompressed_size,
            timestamp: self.timestamp,
            stored_size: self.data.len() as u32,
            crc32: self.crc32,
            flags: format::entry_flags(self.permissions, self.codec),
        }
    }
}

/// Result of a successful commit
#[derive(Debug, Clone)]
pub struct CommitInfo {
    pub path: PathBuf,
    /// Artifact size in bytes
    pub size: u64,
    pub entries: usize,
    /// Number of entries stored compressed
    pub compressed: usize,
}

/// PHAR archive writer
pub struct ArchiveWriter {
    path: PathBuf,
    alias: String,
    compression: CompressionMode,
    /// Fixed timestamp for every entry (reproducible builds)
    timestamp: Option<u32>,
    stub: Option<String>,
    entries: BTreeMap<String, ArchiveEntry>,
    temp: Option<NamedTempFile>,
    state: WriterState,
    reporter: Arc<dyn BuildReporter>,
}

impl ArchiveWriter {
    /// Start a new archive at `path`
    ///
    /// Any file already at `path` is removed. The temporary file the commit
    /// will write is created right away in the same directory, which also
    /// proves the directory is writable.
    pub fn open(path: &Path, alias: &str) -> Result<Self> {
        validate_alias(alias)?;

        match fs::symlink_metadata(path) {
            Ok(meta) if meta.is_dir() => {
                return Err(Error::ArtifactCreate {
                    path: path.to_path_buf(),
                    source: io::Error::other("a directory exists at the artifact path"),
                });
            }
            Ok(_) => {
                debug!("Removing previous artifact at {}", path.display());
                fs::remove_file(path).map_err(|e| Error::ArtifactCreate {
                    path: path.to_path_buf(),
                    source: e,
                })?;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(Error::ArtifactCreate {
                    path: path.to_path_buf(),
                    source: e,
                });
            }
        }

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };

        let temp = tempfile::Builder::new()
            .prefix(".pharpack-")
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(|e| Error::ArtifactCreate {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self {
            path: path.to_path_buf(),
            alias: alias.to_string(),
            compression: CompressionMode::None,
            timestamp: None,
            stub: None,
            entries: BTreeMap::new(),
            temp: Some(temp),
            state: WriterState::Buffering,
            reporter: Arc::new(SilentReporter),
        })
    }

    /// Set the compression mode applied to entries added from now on
    pub fn with_compression(mut self, mode: CompressionMode) -> Self {
        self.compression = mode;
        self
    }

    /// Use one fixed timestamp for every entry
    pub fn with_timestamp(mut self, timestamp: Option<u32>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the reporter notified for every added and compressed entry
    pub fn with_reporter(mut self, reporter: Arc<dyn BuildReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the buffered entries, sorted
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entry(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries.get(name)
    }

    /// Render the bootstrap stub pointing at `entry_path`
    ///
    /// `entry_path` must already be archive-relative.
    pub fn set_bootstrap(&mut self, entry_path: &Path) -> Result<()> {
        self.ensure_buffering()?;
        let entry = archive_name(entry_path)?;
        debug!("Bootstrap entry point: {}", entry);
        self.stub = Some(bootstrap_stub(&self.alias, &entry));
        Ok(())
    }

    /// Current bootstrap stub, if set
    pub fn bootstrap(&self) -> Option<&str> {
        self.stub.as_deref()
    }

    /// Add a file from disk under `archive_path`
    pub fn add_file(&mut self, disk_path: &Path, archive_path: &Path) -> Result<()> {
        self.ensure_buffering()?;
        let result = self.add_file_inner(disk_path, archive_path);
        self.fail_on_error(result)
    }

    /// Add in-memory content under `archive_path`
    pub fn add_bytes(&mut self, archive_path: impl AsRef<Path>, content: &[u8]) -> Result<()> {
        self.ensure_buffering()?;
        let result = archive_name(archive_path.as_ref()).and_then(|name| {
            let timestamp = self.timestamp.unwrap_or_else(now_timestamp);
            self.store(name, content.to_vec(), DEFAULT_PERMISSIONS, timestamp)
        });
        self.fail_on_error(result)
    }

    /// Add `content` under `archive_path`, keeping the permissions and
    /// modification time of `disk_path`
    ///
    /// Used for files rewritten in memory before packaging.
    pub fn add_file_with_content(
        &mut self,
        disk_path: &Path,
        archive_path: &Path,
        content: Vec<u8>,
    ) -> Result<()> {
        self.ensure_buffering()?;
        let result = self.add_with_metadata(disk_path, archive_path, content);
        self.fail_on_error(result)
    }

    fn add_file_inner(&mut self, disk_path: &Path, archive_path: &Path) -> Result<()> {
        let content =
            fs::read(disk_path).map_err(|e| Error::ingestion(BuildPhase::Ingestion, disk_path, e))?;
        self.add_with_metadata(disk_path, archive_path, content)
    }

    fn add_with_metadata(&mut self, disk_path: &Path, archive_path: &Path, content: Vec<u8>) -> Result<()> {
        let name = archive_name(archive_path)?;

        let metadata = fs::metadata(disk_path)
            .map_err(|e| Error::ingestion(BuildPhase::Ingestion, disk_path, e))?;

        let timestamp = match self.timestamp {
            Some(ts) => ts,
            None => metadata
                .modified()
                .ok()
                .map(system_time_to_timestamp)
                .unwrap_or_else(now_timestamp),
        };

        self.store(name, content, permissions_of(&metadata), timestamp)
    }

    /// Compress if eligible and store, replacing any entry with the same name
    fn store(&mut self, name: String, content: Vec<u8>, permissions: u32, timestamp: u32) -> Result<()> {
        let uncompressed_size = u32::try_from(content.len()).map_err(|_| {
            Error::ingestion(
                BuildPhase::Ingestion,
                &name,
                io::Error::other("file exceeds the 4 GiB PHAR entry limit"),
            )
        })?;
        let crc32 = crc32fast::hash(&content);

        let codec = if compression::should_compress(self.compression, &name) {
            self.compression.codec()
        } else {
            None
        };

        let data = match codec {
            Some(codec) => compression::compress(codec, &content)
                .map_err(|e| Error::ingestion(BuildPhase::Compression, &name, e))?,
            None => content,
        };

        if u32::try_from(data.len()).is_err() {
            return Err(Error::ingestion(
                BuildPhase::Compression,
                &name,
                io::Error::other("compressed entry exceeds the 4 GiB PHAR entry limit"),
            ));
        }

        self.reporter.on_file_added(&name);
        if codec.is_some() {
            self.reporter.on_compressed(&name);
        }

        let entry = ArchiveEntry {
            name: name.clone(),
            data,
            codec,
            uncompressed_size,
            crc32,
            permissions,
            timestamp,
        };

        if self.entries.insert(name.clone(), entry).is_some() {
            debug!("Replaced archive entry {}", name);
        }

        Ok(())
    }

    /// Write the archive and move it into place
    pub fn commit(&mut self) -> Result<CommitInfo> {
        self.ensure_buffering()?;

        let stub = self.stub.clone().ok_or_else(|| {
            Error::invalid_input(BuildPhase::Commit, "bootstrap stub must be set before commit")
        })?;

        let result = self.write_and_persist(&stub);
        let info = self.fail_on_error(result)?;
        self.state = WriterState::Committed;

        info!(
            "Committed {} ({} entries, {} bytes)",
            info.path.display(),
            info.entries,
            info.size
        );
        Ok(info)
    }

    fn write_and_persist(&mut self, stub: &str) -> Result<CommitInfo> {
        let temp = self.temp.take().ok_or(Error::InvalidState(self.state))?;
        let commit_err = |source: io::Error| Error::Commit {
            path: self.path.clone(),
            source,
        };

        let headers: Vec<EntryHeader> = self.entries.values().map(ArchiveEntry::header).collect();
        let manifest = format::encode_manifest(&self.alias, &headers);

        let size = {
            let mut out = HashingWriter::new(BufWriter::new(temp.as_file()));
            out.write_all(stub.as_bytes()).map_err(commit_err)?;
            out.write_all(&manifest).map_err(commit_err)?;
            for entry in self.entries.values() {
                out.write_all(&entry.data).map_err(commit_err)?;
            }

            let (mut inner, digest, written) = out.finish();
            let trailer = format::encode_signature(&digest);
            inner.write_all(&trailer).map_err(commit_err)?;
            inner.flush().map_err(commit_err)?;
            written + trailer.len() as u64
        };

        temp.as_file().sync_all().map_err(commit_err)?;
        set_executable(temp.as_file()).map_err(commit_err)?;

        temp.persist(&self.path).map_err(|e| commit_err(e.error))?;

        Ok(CommitInfo {
            path: self.path.clone(),
            size,
            entries: self.entries.len(),
            compressed: self.entries.values().filter(|e| e.codec.is_some()).count(),
        })
    }

    fn ensure_buffering(&self) -> Result<()> {
        if self.state == WriterState::Buffering {
            Ok(())
        } else {
            Err(Error::InvalidState(self.state))
        }
    }

    fn fail_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.state = WriterState::Failed;
            // Dropping the temp file deletes it
            self.temp = None;
        }
        result
    }
}

fn validate_alias(alias: &str) -> Result<()> {
    if alias.is_empty() || alias.contains(['/', '\\', '"']) {
        return Err(Error::invalid_input(
            BuildPhase::ArchiveCreation,
            format!("invalid archive alias '{}': must be a plain file name", alias),
        ));
    }
    Ok(())
}

#[cfg(unix)]
fn permissions_of(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    if metadata.permissions().mode() & 0o111 != 0 {
        EXECUTABLE_PERMISSIONS
    } else {
        DEFAULT_PERMISSIONS
    }
}

#[cfg(not(unix))]
fn permissions_of(_metadata: &fs::Metadata) -> u32 {
    DEFAULT_PERMISSIONS
}

#[cfg(unix)]
fn set_executable(file: &fs::File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn set_executable(_file: &fs::File) -> io::Result<()> {
    Ok(())
}

fn system_time_to_timestamp(time: SystemTime) -> u32 {
    let secs = time
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    u32::try_from(secs).unwrap_or(u32::MAX)
}

fn now_timestamp() -> u32 {
    system_time_to_timestamp(SystemTime::now())
}

/// Writer computing the SHA-256 of everything passed through it
struct HashingWriter<W: Write> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    fn finish(self) -> (W, Vec<u8>, u64) {
        (self.inner, self.hasher.finalize().to_vec(), self.written)
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
