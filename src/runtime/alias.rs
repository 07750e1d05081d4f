//! Alias table and sample path resolution.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A resolved import: alias bound to a sample file that existed at import time.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRecord {
    pub module: String,
    pub alias: String,
    path: PathBuf,
}

impl ImportRecord {
    pub fn new(module: impl Into<String>, alias: impl Into<String>, path: PathBuf) -> Self {
        Self {
            module: module.into(),
            alias: alias.into(),
            path,
        }
    }

    /// Path of the backing sample file. Fixed once the record exists.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Alias → import record. Re-importing an alias replaces the old record.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    records: HashMap<String, ImportRecord>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record, returning the one it replaced.
    pub fn insert(&mut self, record: ImportRecord) -> Option<ImportRecord> {
        self.records.insert(record.alias.clone(), record)
    }

    pub fn get(&self, alias: &str) -> Option<&ImportRecord> {
        self.records.get(alias)
    }

    pub fn contains(&self, alias: &str) -> bool {
        self.records.contains_key(alias)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// No file at the conventional location.
    NotFound(PathBuf),
    /// Module name would escape the vendor directory.
    InvalidName(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound(path) => write!(f, "file not found: {}", path.display()),
            ResolveError::InvalidName(name) => write!(f, "invalid module name '{name}'"),
        }
    }
}

impl std::error::Error for ResolveError {}

/// Maps a module name to `<vendor_dir>/<module>.<extension>`.
#[derive(Debug, Clone)]
pub struct SampleResolver {
    vendor_dir: PathBuf,
    extension: String,
}

impl SampleResolver {
    pub fn new(vendor_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            vendor_dir: vendor_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn path_for(&self, module: &str) -> PathBuf {
        self.vendor_dir
            .join(format!("{module}.{}", self.extension))
    }

    /// Resolve `module`, checking that the file exists.
    pub fn resolve(&self, module: &str) -> Result<PathBuf, ResolveError> {
        if module.is_empty() || module.contains(|c: char| c == '/' || c == '\\') || module == ".." {
            return Err(ResolveError::InvalidName(module.to_string()));
        }
        let path = self.path_for(module);
        if path.is_file() {
            Ok(path)
        } else {
            Err(ResolveError::NotFound(path))
        }
    }
}
