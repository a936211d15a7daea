//! Flat CSV tables with a fixed header row.
//!
//! A table is read once when opened and kept in memory. Every mutation
//! rewrites the whole file: header first, then every row in insertion order.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// A row type that can live in a [`CsvTable`].
pub trait Record: Serialize + DeserializeOwned {
    /// Column names, in the order the fields serialize.
    const HEADERS: &'static [&'static str];
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("unexpected header in {}: expected `{expected}`, found `{found}`", path.display())]
    Header {
        path: PathBuf,
        expected: String,
        found: String,
    },
}

#[derive(Debug)]
pub struct CsvTable<T: Record> {
    path: PathBuf,
    rows: Vec<T>,
}

impl<T: Record> CsvTable<T> {
    /// Opens the table at `path`, creating a header-only file when it is
    /// missing or empty. An existing file that fails to parse is an error
    /// and is left untouched.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let blank = match fs::metadata(&path) {
            Ok(meta) => meta.len() == 0,
            Err(err) if err.kind() == io::ErrorKind::NotFound => true,
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        if !blank {
            let rows = read_rows(&path)?;
            tracing::debug!(path = %path.display(), rows = rows.len(), "loaded table");
            return Ok(Self { path, rows });
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let table = Self { path, rows: Vec::new() };
        table.flush()?;
        tracing::info!(path = %table.path.display(), "initialised empty table");
        Ok(table)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends `row` and rewrites the file. If the write fails the row is
    /// dropped again, so memory and disk stay in step.
    pub fn append(&mut self, row: T) -> Result<(), StoreError> {
        self.rows.push(row);
        if let Err(err) = self.flush() {
            self.rows.pop();
            return Err(err);
        }
        Ok(())
    }

    fn flush(&self) -> Result<(), StoreError> {
        let tmp = temp_path(&self.path);
        let csv_err = |source| StoreError::Csv {
            path: tmp.clone(),
            source,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp)
            .map_err(csv_err)?;
        writer.write_record(T::HEADERS).map_err(csv_err)?;
        for row in &self.rows {
            writer.serialize(row).map_err(csv_err)?;
        }
        writer.flush().map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        drop(writer);

        fs::rename(&tmp, &self.path).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

/// The sibling file a rewrite goes through: the full file name plus `.tmp`,
/// so tables differing only in extension never share one.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn read_rows<T: Record>(path: &Path) -> Result<Vec<T>, StoreError> {
    let csv_err = |source| StoreError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;
    let headers = reader.headers().map_err(csv_err)?;
    if !headers.iter().eq(T::HEADERS.iter().copied()) {
        return Err(StoreError::Header {
            path: path.to_path_buf(),
            expected: T::HEADERS.join(","),
            found: headers.iter().collect::<Vec<_>>().join(","),
        });
    }

    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(csv_err)
}
