//! `Storage` implementations: an in-memory map and a TOML file.
//!
//! Both keep the persisted values under the `bascula` namespace. `FileStore`
//! rewrites the whole file on every put (write and fsync a sibling temp
//! file, rename it over the old one, then fsync the directory), so once a put
//! returns `Ok` the value survives a power loss and a crash mid-write leaves
//! the previous file intact.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bascula_traits::{BoxError, Storage};
use eyre::WrapErr;

use crate::error::{FirmwareError, Result};

/// Namespace (TOML table) holding the calibration values.
pub const NAMESPACE: &str = "bascula";

#[derive(Debug, Clone, Copy, PartialEq)]
enum Value {
    F32(f32),
    I32(i32),
}

/// Volatile store; everything is lost on drop.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent put fail, as a worn or full flash would.
    pub fn with_failing_writes(mut self, fail: bool) -> Self {
        self.fail_writes = fail;
        self
    }

    pub fn set_failing_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    fn put(&mut self, key: &str, value: Value) -> std::result::Result<(), BoxError> {
        if self.fail_writes {
            return Err(Box::new(FirmwareError::Storage(format!(
                "write of {key} rejected"
            ))));
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

impl Storage for MemoryStore {
    fn get_f32(&self, key: &str) -> std::result::Result<Option<f32>, BoxError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(Value::F32(v)) => Ok(Some(*v)),
            Some(Value::I32(_)) => Err(type_mismatch(key, "float")),
        }
    }

    fn get_i32(&self, key: &str) -> std::result::Result<Option<i32>, BoxError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(Value::I32(v)) => Ok(Some(*v)),
            Some(Value::F32(_)) => Err(type_mismatch(key, "integer")),
        }
    }

    fn put_f32(&mut self, key: &str, value: f32) -> std::result::Result<(), BoxError> {
        self.put(key, Value::F32(value))
    }

    fn put_i32(&mut self, key: &str, value: i32) -> std::result::Result<(), BoxError> {
        self.put(key, Value::I32(value))
    }
}

fn type_mismatch(key: &str, expected: &str) -> BoxError {
    Box::new(FirmwareError::Storage(format!(
        "{NAMESPACE}.{key} is not {expected}"
    )))
}

/// Store persisted as a small TOML document:
///
/// ```toml
/// [bascula]
/// cal_f = 0.0023809525
/// tare = 84213
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    doc: toml::Table,
}

impl FileStore {
    /// Open `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let doc = match fs::read_to_string(&path) {
            Ok(s) => s
                .parse::<toml::Table>()
                .wrap_err_with(|| format!("parse store {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => toml::Table::new(),
            Err(e) => {
                return Err(e).wrap_err_with(|| format!("read store {}", path.display()));
            }
        };
        Ok(Self { path, doc })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn section(&self) -> Option<&toml::Table> {
        self.doc.get(NAMESPACE).and_then(toml::Value::as_table)
    }

    fn put(&mut self, key: &str, value: toml::Value) -> std::result::Result<(), BoxError> {
        let mut next = self.doc.clone();
        let section = next
            .entry(NAMESPACE)
            .or_insert(toml::Value::Table(toml::Table::new()));
        match section {
            toml::Value::Table(t) => {
                t.insert(key.to_string(), value);
            }
            _ => {
                return Err(Box::new(FirmwareError::Storage(format!(
                    "{NAMESPACE} is not a table in {}",
                    self.path.display()
                ))));
            }
        }
        let text = toml::to_string(&next)?;
        write_durable(&self.path, text.as_bytes())?;
        self.doc = next;
        tracing::trace!(key, path = %self.path.display(), "store written");
        Ok(())
    }
}

/// Replace `path` with `bytes`: temp file, `sync_all`, rename, then sync the
/// parent directory so the rename itself is on disk.
fn write_durable(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp = tmp_path(path);
    {
        let mut f = fs::File::create(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    sync_parent_dir(path)
}

#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> std::io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::File::open(dir)?.sync_all()
}

// directories cannot be opened for syncing here
#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl Storage for FileStore {
    fn get_f32(&self, key: &str) -> std::result::Result<Option<f32>, BoxError> {
        match self.section().and_then(|t| t.get(key)) {
            None => Ok(None),
            Some(toml::Value::Float(v)) => Ok(Some(*v as f32)),
            Some(toml::Value::Integer(v)) => Ok(Some(*v as f32)),
            Some(_) => Err(type_mismatch(key, "float")),
        }
    }

    fn get_i32(&self, key: &str) -> std::result::Result<Option<i32>, BoxError> {
        match self.section().and_then(|t| t.get(key)) {
            None => Ok(None),
            Some(toml::Value::Integer(v)) => Ok(Some(i32::try_from(*v)?)),
            Some(_) => Err(type_mismatch(key, "integer")),
        }
    }

    fn put_f32(&mut self, key: &str, value: f32) -> std::result::Result<(), BoxError> {
        self.put(key, toml::Value::Float(f64::from(value)))
    }

    fn put_i32(&mut self, key: &str, value: i32) -> std::result::Result<(), BoxError> {
        self.put(key, toml::Value::Integer(i64::from(value)))
    }
}
