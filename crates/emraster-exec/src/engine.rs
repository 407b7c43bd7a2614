//! `Engine`: owns the memory budget and the peak tracker, hands out drivers.
//!
//! Nothing else survives between calls. Results are fresh rasters; inputs are
//! only read.

use emraster_core::config::EngineConfig;
use emraster_core::error::Result;
use emraster_io::{Raster, WriteOptions};
use emraster_mem::{MemoryBudgetImpl, PeakTracker};

use crate::driver::Driver;
use crate::operand::Operand;

pub struct Engine {
    cfg: EngineConfig,
    budget: MemoryBudgetImpl,
    peak: PeakTracker,
}

impl Engine {
    pub fn new(cfg: EngineConfig) -> Self {
        let cap = cfg.mem_cap_bytes;
        Self {
            cfg,
            budget: MemoryBudgetImpl::new(cap),
            peak: PeakTracker::new(),
        }
    }

    /// Like `new`, rejecting configurations the scheduler cannot honour.
    pub fn try_new(cfg: EngineConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self::new(cfg))
    }

    /// Engine configured from `EMRASTER_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::try_new(EngineConfig::from_env())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    pub fn budget(&self) -> &MemoryBudgetImpl {
        &self.budget
    }

    /// Highest budget usage seen by any call so far.
    pub fn peak_bytes(&self) -> usize {
        self.peak.peak()
    }

    pub fn reset_peak(&self) {
        self.peak.reset();
    }

    /// Write options derived from the engine config.
    pub fn write_options(&self) -> WriteOptions {
        WriteOptions::from_config(&self.cfg)
    }

    /// `lhs op rhs` with the engine's default write options.
    pub fn arith(&self, lhs: &Raster, rhs: Operand<'_>, op: &str, reverse: bool) -> Raster {
        self.arith_with(lhs, rhs, op, reverse, &self.write_options())
    }

    /// `lhs op rhs` written per `opts`. `reverse` puts a scalar or vector
    /// operand on the left; it has no effect for raster operands.
    pub fn arith_with(
        &self,
        lhs: &Raster,
        rhs: Operand<'_>,
        op: &str,
        reverse: bool,
        opts: &WriteOptions,
    ) -> Raster {
        Driver::new(lhs, rhs, op, reverse, &self.budget, &self.peak).run(opts)
    }

    pub fn arith_raster(&self, lhs: &Raster, rhs: &Raster, op: &str) -> Raster {
        self.arith(lhs, Operand::Raster(rhs), op, false)
    }

    pub fn arith_scalar(&self, lhs: &Raster, x: f64, op: &str, reverse: bool) -> Raster {
        self.arith(lhs, Operand::Scalar(x), op, reverse)
    }

    /// One value per layer; a single value acts as a scalar.
    pub fn arith_vector(&self, lhs: &Raster, xs: &[f64], op: &str, reverse: bool) -> Raster {
        self.arith(lhs, Operand::PerLayer(xs.to_vec()), op, reverse)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
