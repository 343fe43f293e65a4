use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use super::KeyValueStore;

/// Key-value store backed by one JSON object file.
///
/// Every operation re-reads the file, and writes only touch their own key,
/// so several stores pointed at the same file do not drop each other's keys.
/// Writes replace the file atomically. A file that no longer parses reads as
/// an error, and the next write starts over from an empty object.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&self, apply: impl FnOnce(&mut Map<String, Value>) -> bool) -> anyhow::Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("json store lock poisoned"))?;
        let mut on_disk = match read_json_object(&self.path) {
            Ok(payload) => payload.unwrap_or_default(),
            Err(err) => {
                log::warn!(
                    "discarding unreadable store {}: {err:#}",
                    self.path.display()
                );
                Map::new()
            }
        };
        if !apply(&mut on_disk) {
            return Ok(());
        }
        write_json_object(&self.path, &on_disk)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("json store lock poisoned"))?;
        let payload = read_json_object(&self.path)?;
        Ok(payload.and_then(|mut payload| payload.remove(key)))
    }

    fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        self.update(|payload| {
            if payload.get(key) == Some(&value) {
                return false;
            }
            payload.insert(key.to_string(), value);
            true
        })
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.update(|payload| payload.remove(key).is_some())
    }
}

fn read_json_object(path: &Path) -> anyhow::Result<Option<Map<String, Value>>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err.into()),
    };
    if raw.trim().is_empty() {
        return Ok(None);
    }
    match serde_json::from_str::<Value>(&raw)? {
        Value::Object(map) => Ok(Some(map)),
        _ => anyhow::bail!("{} does not hold a JSON object", path.display()),
    }
}

fn write_json_object(path: &Path, payload: &Map<String, Value>) -> anyhow::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;
    let mut staged = NamedTempFile::new_in(parent)?;
    staged.write_all(serde_json::to_string_pretty(&Value::Object(payload.clone()))?.as_bytes())?;
    staged.as_file().sync_all()?;
    staged.persist(path)?;
    Ok(())
}
