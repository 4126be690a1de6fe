//! JSON and GZIP-compressed JSON persistence
//!
//! Writes go to a sibling `<name>.tmp` file that is renamed over the target
//! once fully flushed, so an interrupted run never leaves a truncated artifact.
//! [`ArtifactBatch`] extends this to a group of files: every file is staged
//! first and renamed only once all of them were written.

use crate::{Error, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Whether a path names a GZIP-compressed file
pub fn is_gzip_path(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext.eq_ignore_ascii_case("gz"))
}

/// Read plain JSON
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Read GZIP-compressed JSON
pub fn load_gz_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(GzDecoder::new(File::open(path)?));
    Ok(serde_json::from_reader(reader)?)
}

/// Read JSON, decompressing when the path ends in `.gz`
pub fn load_json_auto<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if is_gzip_path(path) {
        load_gz_json(path)
    } else {
        load_json(path)
    }
}

/// Write plain JSON atomically
///
/// `pretty` selects two-space indentation for human-edited files such as
/// split manifests.
pub fn store_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    write_temp(path, |writer| encode_json(writer, value, pretty))?.commit()
}

/// Write GZIP-compressed JSON atomically
pub fn store_gz_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    write_temp(path, |writer| encode_gz_json(writer, value))?.commit()
}

fn encode_json<T: Serialize + ?Sized>(writer: &mut BufWriter<File>, value: &T, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, value)?;
    } else {
        serde_json::to_writer(&mut *writer, value)?;
    }
    Ok(())
}

fn encode_gz_json<T: Serialize + ?Sized>(writer: &mut BufWriter<File>, value: &T) -> Result<()> {
    let mut encoder = GzEncoder::new(&mut *writer, Compression::default());
    serde_json::to_writer(&mut encoder, value)?;
    encoder.finish()?;
    Ok(())
}

/// A fully written `.tmp` sibling waiting to be renamed over its target
#[derive(Debug)]
struct StagedFile {
    tmp: PathBuf,
    target: PathBuf,
}

impl StagedFile {
    fn commit(self) -> Result<()> {
        if let Err(e) = std::fs::rename(&self.tmp, &self.target) {
            let _ = std::fs::remove_file(&self.tmp);
            return Err(e.into());
        }
        debug!("Wrote {}", self.target.display());
        Ok(())
    }
}

/// Group of output files written all together or not at all
///
/// Each `json`/`gz_json` call writes its `.tmp` sibling immediately;
/// [`ArtifactBatch::commit`] renames them into place. Dropping a batch
/// without committing (including after a failed write) removes every staged
/// file, leaving the targets untouched.
#[derive(Debug, Default)]
pub struct ArtifactBatch {
    staged: Vec<StagedFile>,
}

impl ArtifactBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage plain JSON for `path`
    pub fn json<T: Serialize + ?Sized>(&mut self, path: &Path, value: &T, pretty: bool) -> Result<()> {
        let staged = write_temp(path, |writer| encode_json(writer, value, pretty))?;
        self.staged.push(staged);
        Ok(())
    }

    /// Stage GZIP-compressed JSON for `path`
    pub fn gz_json<T: Serialize + ?Sized>(&mut self, path: &Path, value: &T) -> Result<()> {
        let staged = write_temp(path, |writer| encode_gz_json(writer, value))?;
        self.staged.push(staged);
        Ok(())
    }

    /// Rename every staged file over its target
    ///
    /// # Errors
    ///
    /// [`Error::Io`] naming the first target that is a directory, before any
    /// file is renamed. A rename failing midway (e.g. a vanished directory)
    /// is reported the same way; files renamed before it stay in place.
    pub fn commit(mut self) -> Result<()> {
        if let Some(blocked) = self.staged.iter().find(|f| f.target.is_dir()) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("cannot replace directory {}", blocked.target.display()),
            )));
        }
        let mut pending = std::mem::take(&mut self.staged).into_iter();
        while let Some(staged) = pending.next() {
            if let Err(e) = staged.commit() {
                for rest in pending.by_ref() {
                    let _ = std::fs::remove_file(&rest.tmp);
                }
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Drop for ArtifactBatch {
    fn drop(&mut self) {
        for staged in self.staged.drain(..) {
            let _ = std::fs::remove_file(&staged.tmp);
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Write `<path>.tmp` in full; on failure nothing is left behind
fn write_temp<F>(path: &Path, write: F) -> Result<StagedFile>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let tmp = temp_path(path);
    let result: Result<()> = (|| {
        let mut writer = BufWriter::new(File::create(&tmp)?);
        write(&mut writer)?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
        Ok(())
    })();

    match result {
        Ok(()) => Ok(StagedFile {
            tmp,
            target: path.to_path_buf(),
        }),
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    #[test]
    fn test_json_written_and_temp_file_removed() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("events.json");

        store_json(&target, &json!([{"video": "v"}]), false).unwrap();

        assert!(target.exists());
        assert!(!dir.path().join("events.json.tmp").exists());
        let loaded: Value = load_json(&target).unwrap();
        assert_eq!(loaded, json!([{"video": "v"}]));
    }

    #[test]
    fn test_pretty_json_is_indented() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("split.json");

        store_json(&target, &json!([{"video": "v"}]), true).unwrap();

        let text = std::fs::read_to_string(&target).unwrap();
        assert!(text.contains("\n  {"));
    }

    #[test]
    fn test_gz_json_is_compressed() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("scores.json.gz");
        let value = json!({"game1": [[0.1, 0.9], [0.5, 0.5]]});

        store_gz_json(&target, &value).unwrap();

        let raw = std::fs::read(&target).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        let loaded: Value = load_json_auto(&target).unwrap();
        assert_eq!(loaded, value);
    }

    #[test]
    fn test_failed_write_leaves_no_artifact() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("bad.json");
        let mut map = std::collections::HashMap::new();
        // Non-string map keys cannot be encoded as JSON
        map.insert(vec![1u8], 1u8);

        assert!(store_json(&target, &map, false).is_err());
        assert!(!target.exists());
        assert!(!dir.path().join("bad.json.tmp").exists());
    }

    #[test]
    fn test_batch_commits_every_file() {
        let dir = TempDir::new().unwrap();
        let events = dir.path().join("p.json");
        let scores = dir.path().join("p.score.json.gz");

        let mut batch = ArtifactBatch::new();
        batch.json(&events, &json!([1]), false).unwrap();
        batch.gz_json(&scores, &json!({"v": [[0.5]]})).unwrap();
        assert!(!events.exists());
        batch.commit().unwrap();

        assert_eq!(load_json::<Value>(&events).unwrap(), json!([1]));
        assert_eq!(load_gz_json::<Value>(&scores).unwrap(), json!({"v": [[0.5]]}));
        assert!(!dir.path().join("p.json.tmp").exists());
    }

    #[test]
    fn test_batch_blocked_target_keeps_previous_files() {
        let dir = TempDir::new().unwrap();
        let events = dir.path().join("p.json");
        let recall = dir.path().join("p.recall.json.gz");
        std::fs::write(&events, "old").unwrap();
        std::fs::create_dir(&recall).unwrap();

        let mut batch = ArtifactBatch::new();
        batch.json(&events, &json!([1]), false).unwrap();
        batch.gz_json(&recall, &json!([2])).unwrap();
        assert!(batch.commit().is_err());

        assert_eq!(std::fs::read_to_string(&events).unwrap(), "old");
        assert!(!dir.path().join("p.json.tmp").exists());
        assert!(!dir.path().join("p.recall.json.gz.tmp").exists());
    }

    #[test]
    fn test_dropped_batch_removes_staged_files() {
        let dir = TempDir::new().unwrap();
        let events = dir.path().join("p.json");

        let mut batch = ArtifactBatch::new();
        batch.json(&events, &json!([1]), false).unwrap();
        assert!(dir.path().join("p.json.tmp").exists());
        drop(batch);

        assert!(!events.exists());
        assert!(!dir.path().join("p.json.tmp").exists());
    }

    #[test]
    fn test_is_gzip_path() {
        assert!(is_gzip_path(Path::new("a/pred.recall.json.gz")));
        assert!(!is_gzip_path(Path::new("a/pred.json")));
    }
}
