//! Local filesystem cell store.
//!
//! Cells are little-endian `f64`, band-sequential (layer, then row, then
//! column). Geometry lives in a JSON sidecar next to the data file
//! (`<path>.json`). Any row window of one layer is a single contiguous range.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};

use emraster_core::geometry::Geometry;
use emraster_core::CELL_BYTES;

use crate::error::{StoreError, StoreResult};
use crate::store::{CellStore, StoreDims};

pub const HEADER_VERSION: u16 = 1;

/// Sidecar contents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    pub version: u16,
    pub geometry: Geometry,
    pub nlyr: usize,
}

impl FileHeader {
    pub fn new(geometry: Geometry, nlyr: usize) -> Self {
        Self {
            version: HEADER_VERSION,
            geometry,
            nlyr,
        }
    }

    pub fn dims(&self) -> StoreDims {
        StoreDims::new(self.geometry.nrow, self.geometry.ncol, self.nlyr)
    }
}

/// Path of the JSON sidecar for a data file.
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(".json");
    PathBuf::from(s)
}

#[derive(Debug, Default)]
struct Handles {
    reader: Option<File>,
    readers: usize,
    writer: Option<File>,
}

#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    dims: StoreDims,
    handles: Mutex<Handles>,
}

impl FileStore {
    /// Create a data file (NA-filled) and its sidecar.
    pub fn create(path: impl AsRef<Path>, header: &FileHeader, overwrite: bool) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !overwrite && (path.exists() || sidecar_path(&path).exists()) {
            return Err(StoreError::Exists(path.display().to_string()));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let dims = header.dims();
        let mut f = File::create(&path)?;
        let row = encode(&vec![f64::NAN; dims.ncol]);
        for _ in 0..dims.nrow * dims.nlyr {
            f.write_all(&row)?;
        }
        f.flush()?;

        fs::write(sidecar_path(&path), serde_json::to_vec_pretty(header)?)?;

        Ok(Self {
            path,
            dims,
            handles: Mutex::new(Handles::default()),
        })
    }

    /// Open an existing data file through its sidecar.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<(Self, FileHeader)> {
        let path = path.as_ref().to_path_buf();
        let header: FileHeader = serde_json::from_slice(&fs::read(sidecar_path(&path))?)?;
        if header.version != HEADER_VERSION {
            return Err(StoreError::Header(format!(
                "unsupported version {}",
                header.version
            )));
        }
        let dims = header.dims();
        let expected = (dims.total_cells() * CELL_BYTES) as u64;
        let actual = fs::metadata(&path)?.len();
        if actual != expected {
            return Err(StoreError::Header(format!(
                "{} holds {actual} bytes, expected {expected}",
                path.display()
            )));
        }
        Ok((
            Self {
                path,
                dims,
                handles: Mutex::new(Handles::default()),
            },
            header,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Handles>> {
        self.handles.lock().map_err(|_| StoreError::Poisoned)
    }

    fn offset(&self, layer: usize, row: usize, col: usize) -> u64 {
        (((layer * self.dims.nrow + row) * self.dims.ncol + col) * CELL_BYTES) as u64
    }
}

fn encode(values: &[f64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * CELL_BYTES);
    for v in values {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

impl CellStore for FileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn dims(&self) -> StoreDims {
        self.dims
    }

    fn open_read(&self) -> StoreResult<()> {
        let mut h = self.lock()?;
        if h.reader.is_none() {
            h.reader = Some(File::open(&self.path)?);
        }
        h.readers += 1;
        Ok(())
    }

    fn close_read(&self) -> StoreResult<()> {
        let mut h = self.lock()?;
        if h.readers == 0 {
            return Err(StoreError::NotOpen("reading"));
        }
        h.readers -= 1;
        if h.readers == 0 {
            h.reader = None;
        }
        Ok(())
    }

    fn open_write(&self) -> StoreResult<()> {
        let mut h = self.lock()?;
        if h.writer.is_some() {
            return Err(StoreError::AlreadyWriting);
        }
        h.writer = Some(OpenOptions::new().write(true).open(&self.path)?);
        Ok(())
    }

    fn close_write(&self) -> StoreResult<()> {
        let mut h = self.lock()?;
        let mut f = h.writer.take().ok_or(StoreError::NotOpen("writing"))?;
        f.flush()?;
        f.sync_data()?;
        Ok(())
    }

    fn read_rows(
        &self,
        layer: usize,
        start_row: usize,
        nrows: usize,
        out: &mut Vec<f64>,
    ) -> StoreResult<()> {
        self.dims
            .check_window(layer, start_row, nrows, 0, self.dims.ncol)?;
        let offset = self.offset(layer, start_row, 0);
        let mut h = self.lock()?;
        let f = h.reader.as_mut().ok_or(StoreError::NotOpen("reading"))?;
        f.seek(SeekFrom::Start(offset))?;
        let mut bytes = vec![0u8; nrows * self.dims.ncol * CELL_BYTES];
        f.read_exact(&mut bytes)?;
        out.reserve(bytes.len() / CELL_BYTES);
        for chunk in bytes.chunks_exact(CELL_BYTES) {
            let mut b = [0u8; CELL_BYTES];
            b.copy_from_slice(chunk);
            out.push(f64::from_le_bytes(b));
        }
        Ok(())
    }

    fn write_rows(
        &self,
        layer: usize,
        start_row: usize,
        nrows: usize,
        col_offset: usize,
        ncols: usize,
        values: &[f64],
    ) -> StoreResult<()> {
        self.dims
            .check_window(layer, start_row, nrows, col_offset, ncols)?;
        if values.len() != nrows * ncols {
            return Err(StoreError::Shape(format!(
                "{} values for a {nrows}x{ncols} window",
                values.len()
            )));
        }
        let full_rows = col_offset == 0 && ncols == self.dims.ncol;
        let mut h = self.lock()?;
        let f = h.writer.as_mut().ok_or(StoreError::NotOpen("writing"))?;
        if full_rows {
            f.seek(SeekFrom::Start(self.offset(layer, start_row, 0)))?;
            f.write_all(&encode(values))?;
        } else {
            for (r, row) in values.chunks_exact(ncols.max(1)).enumerate().take(nrows) {
                f.seek(SeekFrom::Start(self.offset(layer, start_row + r, col_offset)))?;
                f.write_all(&encode(row))?;
            }
        }
        Ok(())
    }
}
