//! Read-only view of the project for a single validation run.
//!
//! Everything a check may observe goes through [`Snapshot`]: environment
//! variables are captured once up front, file contents and parsed manifests
//! are read lazily and cached per path. Checks only ever get `&Snapshot`,
//! so nothing they do is visible to the checks that run after them.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::SnapshotConfig;
use crate::error::SnapshotError;

/// Directory names never descended into when expanding a directory target.
const IGNORED_DIRS: [&str; 5] = ["node_modules", ".git", "target", "dist", "build"];

#[derive(Debug)]
enum Source {
    Disk,
    Memory(BTreeMap<PathBuf, String>),
}

#[derive(Debug)]
pub struct Snapshot {
    root: PathBuf,
    env: BTreeMap<String, String>,
    source: Source,
    max_file_bytes: u64,
    texts: RefCell<HashMap<PathBuf, Rc<str>>>,
    manifests: RefCell<HashMap<PathBuf, Rc<Value>>>,
    listings: RefCell<HashMap<PathBuf, Rc<[PathBuf]>>>,
    reads: Cell<usize>,
}

impl Snapshot {
    /// Captures the process environment (overlaid on the configured dotenv
    /// files) and binds file access to `root`.
    pub fn capture(root: &Path, config: &SnapshotConfig) -> Result<Self, SnapshotError> {
        fs::read_dir(root).map_err(|source| SnapshotError::Root {
            path: root.to_path_buf(),
            source,
        })?;

        let mut env = BTreeMap::new();
        for env_file in &config.env_files {
            let path = root.join(env_file);
            match fs::read_to_string(&path) {
                Ok(contents) => {
                    let parsed = parse_dotenv(&contents);
                    debug!(path = %path.display(), vars = parsed.len(), "loaded env file");
                    env.extend(parsed);
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => warn!(path = %path.display(), error = %err, "skipping unreadable env file"),
            }
        }
        env.extend(std::env::vars());

        Ok(Self::new(root.to_path_buf(), env, Source::Disk, config.max_file_bytes))
    }

    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::default()
    }

    fn new(root: PathBuf, env: BTreeMap<String, String>, source: Source, max_file_bytes: u64) -> Self {
        Self {
            root,
            env,
            source,
            max_file_bytes,
            texts: RefCell::default(),
            manifests: RefCell::default(),
            listings: RefCell::default(),
            reads: Cell::new(0),
        }
    }

    pub fn env_var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(String::as_str)
    }

    pub fn exists(&self, path: &Path) -> bool {
        match &self.source {
            Source::Disk => self.root.join(path).exists(),
            Source::Memory(files) => {
                let path = normalize(path);
                path.as_os_str().is_empty() || files.keys().any(|key| key.starts_with(&path))
            }
        }
    }

    pub fn is_dir(&self, path: &Path) -> bool {
        match &self.source {
            Source::Disk => self.root.join(path).is_dir(),
            Source::Memory(files) => {
                let path = normalize(path);
                !files.contains_key(&path) && files.keys().any(|key| key.starts_with(&path))
            }
        }
    }

    /// Reads a file as text. Missing, unreadable and oversized files are
    /// errors here; callers wanting soft absence check [`Snapshot::exists`].
    pub fn read_text(&self, path: &Path) -> Result<Rc<str>, SnapshotError> {
        let key = normalize(path);
        if let Some(text) = self.texts.borrow().get(&key) {
            return Ok(Rc::clone(text));
        }

        let text: Rc<str> = match &self.source {
            Source::Disk => self.read_disk(&key)?.into(),
            Source::Memory(files) => {
                let text = files.get(&key).ok_or_else(|| SnapshotError::Io {
                    path: key.clone(),
                    source: std::io::Error::from(std::io::ErrorKind::NotFound),
                })?;
                self.ensure_within_budget(&key, text.len() as u64)?;
                text.as_str().into()
            }
        };
        self.reads.set(self.reads.get() + 1);
        self.texts.borrow_mut().insert(key, Rc::clone(&text));
        Ok(text)
    }

    fn read_disk(&self, key: &Path) -> Result<String, SnapshotError> {
        let full = self.root.join(key);
        let io_err = |source| SnapshotError::Io {
            path: key.to_path_buf(),
            source,
        };
        let meta = fs::metadata(&full).map_err(io_err)?;
        self.ensure_within_budget(key, meta.len())?;
        let bytes = fs::read(&full).map_err(io_err)?;
        debug!(path = %key.display(), bytes = bytes.len(), "read file");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn ensure_within_budget(&self, path: &Path, size: u64) -> Result<(), SnapshotError> {
        if size > self.max_file_bytes {
            return Err(SnapshotError::TooLarge {
                path: path.to_path_buf(),
                size,
                limit: self.max_file_bytes,
            });
        }
        Ok(())
    }

    /// Parses a JSON manifest, sharing the cached text read.
    pub fn read_manifest(&self, path: &Path) -> Result<Rc<Value>, SnapshotError> {
        let key = normalize(path);
        if let Some(doc) = self.manifests.borrow().get(&key) {
            return Ok(Rc::clone(doc));
        }
        let text = self.read_text(&key)?;
        let doc: Value = serde_json::from_str(&text).map_err(|source| SnapshotError::Parse {
            path: key.clone(),
            source,
        })?;
        let doc = Rc::new(doc);
        self.manifests.borrow_mut().insert(key, Rc::clone(&doc));
        Ok(doc)
    }

    /// Lists the files below `dir` (relative to the root, sorted), keeping
    /// only the given extensions. An empty extension list keeps every file.
    pub fn files_under(&self, dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, SnapshotError> {
        let key = normalize(dir);
        let cached = self.listings.borrow().get(&key).cloned();
        let listing = match cached {
            Some(listing) => listing,
            None => {
                let listing: Rc<[PathBuf]> = self.walk(&key)?.into();
                self.listings.borrow_mut().insert(key, Rc::clone(&listing));
                listing
            }
        };
        Ok(listing
            .iter()
            .filter(|path| {
                extensions.is_empty()
                    || path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| extensions.iter().any(|want| want == ext))
            })
            .cloned()
            .collect())
    }

    fn walk(&self, dir: &Path) -> Result<Vec<PathBuf>, SnapshotError> {
        let mut files = match &self.source {
            Source::Disk => {
                let base = self.root.join(dir);
                let mut files = Vec::new();
                for entry in WalkDir::new(&base)
                    .into_iter()
                    .filter_entry(|e| !is_ignored(e.path().strip_prefix(&base).unwrap_or(e.path())))
                {
                    let entry = entry.map_err(|source| SnapshotError::Walk {
                        path: dir.to_path_buf(),
                        source,
                    })?;
                    if entry.file_type().is_file() {
                        if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                            files.push(rel.to_path_buf());
                        }
                    }
                }
                files
            }
            Source::Memory(files) => files
                .keys()
                .filter(|path| path.starts_with(dir) && path.as_path() != dir)
                .filter(|path| !is_ignored(path.strip_prefix(dir).unwrap_or(path.as_path())))
                .cloned()
                .collect(),
        };
        files.sort();
        Ok(files)
    }

    /// Number of distinct file reads performed so far.
    pub fn read_count(&self) -> usize {
        self.reads.get()
    }
}

fn is_ignored(path: &Path) -> bool {
    path.components().any(|part| match part {
        Component::Normal(name) => name.to_str().is_some_and(|name| IGNORED_DIRS.contains(&name)),
        _ => false,
    })
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|part| !matches!(part, Component::CurDir))
        .collect()
}

/// Parses `KEY=VALUE` lines as written by the setup wizard. Blank lines,
/// comments and lines without `=` are skipped; matching surrounding quotes
/// are stripped.
pub fn parse_dotenv(contents: &str) -> BTreeMap<String, String> {
    let mut vars = BTreeMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value.trim();
        let value = ['"', '\'']
            .iter()
            .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    vars
}

/// Builds in-memory snapshots for tests and embedding callers.
#[derive(Debug)]
pub struct SnapshotBuilder {
    env: BTreeMap<String, String>,
    files: BTreeMap<PathBuf, String>,
    max_file_bytes: u64,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self {
            env: BTreeMap::new(),
            files: BTreeMap::new(),
            max_file_bytes: SnapshotConfig::default().max_file_bytes,
        }
    }
}

impl SnapshotBuilder {
    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(name.into(), value.into());
        self
    }

    pub fn file(mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.files.insert(normalize(path.as_ref()), contents.into());
        self
    }

    pub fn max_file_bytes(mut self, limit: u64) -> Self {
        self.max_file_bytes = limit;
        self
    }

    pub fn build(self) -> Snapshot {
        Snapshot::new(PathBuf::from("."), self.env, Source::Memory(self.files), self.max_file_bytes)
    }
}
