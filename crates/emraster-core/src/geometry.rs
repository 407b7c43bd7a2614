//! Raster geometry: grid dimensions, spatial extent and reference system.
//!
//! The engine only ever compares geometries for equality. Reprojection and
//! resampling are out of scope, so the reference system is an opaque string.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box of a grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
}

impl Extent {
    pub const fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::new(0.0, 1.0, 0.0, 1.0)
    }
}

/// Shape and placement shared by every layer of a raster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub nrow: usize,
    pub ncol: usize,
    pub extent: Extent,
    /// Reference system description (WKT, PROJ string, EPSG code...).
    pub crs: String,
}

impl Geometry {
    pub fn new(nrow: usize, ncol: usize, extent: Extent, crs: impl Into<String>) -> Self {
        Self {
            nrow,
            ncol,
            extent,
            crs: crs.into(),
        }
    }

    /// Grid with a unit-cell extent (`ncol` wide, `nrow` high) and no CRS.
    pub fn grid(nrow: usize, ncol: usize) -> Self {
        Self::new(
            nrow,
            ncol,
            Extent::new(0.0, ncol as f64, 0.0, nrow as f64),
            "",
        )
    }

    /// Cells per layer.
    pub fn ncell(&self) -> usize {
        self.nrow * self.ncol
    }

    pub fn xres(&self) -> f64 {
        if self.ncol == 0 {
            0.0
        } else {
            self.extent.width() / self.ncol as f64
        }
    }

    pub fn yres(&self) -> f64 {
        if self.nrow == 0 {
            0.0
        } else {
            self.extent.height() / self.nrow as f64
        }
    }

    /// Rows and columns match.
    pub fn same_dims(&self, other: &Geometry) -> bool {
        self.nrow == other.nrow && self.ncol == other.ncol
    }

    /// Rows, columns and extent match exactly; the CRS is not compared.
    pub fn is_compatible(&self, other: &Geometry) -> bool {
        self.same_dims(other) && self.extent == other.extent
    }
}
