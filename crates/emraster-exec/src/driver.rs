//! Arithmetic driver: one call from validation to the last written block.
//!
//! States run `Init -> GeometryCheck -> ValuesCheck -> Streaming -> Done`;
//! `GeometryCheck` only applies to raster operands and any state may fall into
//! `Error`. Validation never opens a stream. Once streaming starts, every
//! session lives on this function's stack, so an early `?` closes them all.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use emraster_core::error::{Error, Result};
use emraster_core::hash::{hash_serde, CellDigest};
use emraster_core::manifest::RunManifest;
use emraster_io::{CellStore, Raster, StoreError, WriteOptions};
use emraster_mem::{CellBuf, MemoryBudgetImpl, PeakTracker};
use emraster_operators::{
    apply_cells, apply_per_layer, apply_scalar, recycle, recycle_pair, ArithOp,
};

use crate::metrics::{emit_event, emit_summary};
use crate::operand::Operand;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DriverState {
    Init,
    GeometryCheck,
    ValuesCheck,
    Streaming,
    Done,
    Error,
}

impl DriverState {
    pub fn name(self) -> &'static str {
        match self {
            DriverState::Init => "init",
            DriverState::GeometryCheck => "geometry_check",
            DriverState::ValuesCheck => "values_check",
            DriverState::Streaming => "streaming",
            DriverState::Done => "done",
            DriverState::Error => "error",
        }
    }
}

pub struct Driver<'a> {
    lhs: &'a Raster,
    rhs: Operand<'a>,
    symbol: String,
    reverse: bool,
    budget: &'a MemoryBudgetImpl,
    peak: &'a PeakTracker,
    state: DriverState,
    history: Vec<DriverState>,
}

impl<'a> Driver<'a> {
    pub fn new(
        lhs: &'a Raster,
        rhs: Operand<'a>,
        symbol: &str,
        reverse: bool,
        budget: &'a MemoryBudgetImpl,
        peak: &'a PeakTracker,
    ) -> Self {
        Self {
            lhs,
            rhs: rhs.normalized(),
            symbol: symbol.to_string(),
            reverse,
            budget,
            peak,
            state: DriverState::Init,
            history: vec![DriverState::Init],
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Every state visited, in order.
    pub fn history(&self) -> &[DriverState] {
        &self.history
    }

    /// Layer count of the result.
    pub fn output_layers(&self) -> usize {
        match &self.rhs {
            Operand::Raster(r) => self.lhs.nlyr().max(r.nlyr()),
            _ => self.lhs.nlyr(),
        }
    }

    /// Run the call. The result always comes back; check `Raster::error()`.
    pub fn run(&mut self, opts: &WriteOptions) -> Raster {
        let mut out = self.lhs.shell(Some(self.output_layers()));
        match self.execute(&mut out, opts) {
            Ok(manifest) => {
                emit_summary(&manifest);
                out.set_manifest(manifest);
                self.transition(DriverState::Done);
            }
            Err(e) => {
                emit_event(
                    "failed",
                    &[
                        ("state", self.state.name().to_string()),
                        ("validation", e.is_validation().to_string()),
                        ("error", e.to_string()),
                    ],
                );
                out.set_error(e);
                self.transition(DriverState::Error);
            }
        }
        out
    }

    fn transition(&mut self, next: DriverState) {
        emit_event(
            "transition",
            &[
                ("from", self.state.name().to_string()),
                ("to", next.name().to_string()),
            ],
        );
        self.state = next;
        self.history.push(next);
    }

    fn execute(&mut self, out: &mut Raster, opts: &WriteOptions) -> Result<RunManifest> {
        let op = ArithOp::from_symbol(&self.symbol)?;

        // A failed input poisons the call; nothing gets opened.
        let rhs_raster = self.rhs.as_raster();
        if let Some(e) = self
            .lhs
            .error()
            .or_else(|| rhs_raster.and_then(|r| r.error()))
        {
            return Err(e.clone());
        }

        if let Some(r) = rhs_raster {
            self.transition(DriverState::GeometryCheck);
            if !self.lhs.compare_geometry(r, false, true) {
                return Err(Error::GeometryMismatch);
            }
        }

        self.transition(DriverState::ValuesCheck);
        if !self.lhs.has_values() || rhs_raster.is_some_and(|r| !r.has_values()) {
            return Err(Error::NoValues);
        }
        if matches!(&self.rhs, Operand::PerLayer(v) if v.is_empty()) {
            return Err(Error::EmptyOperand);
        }
        // The output store is truncated on open; it must not be one we read.
        for store in std::iter::once(self.lhs)
            .chain(rhs_raster)
            .filter_map(Raster::store)
        {
            if opts.destination.overlaps(store) {
                return Err(Error::StreamWrite(format!(
                    "destination {} is also an input",
                    store.location()
                )));
            }
        }

        self.transition(DriverState::Streaming);
        self.stream(op, out, opts)
    }

    fn stream(&self, op: ArithOp, out: &mut Raster, opts: &WriteOptions) -> Result<RunManifest> {
        let started_ms = now_millis();
        let nlyr = out.nlyr();
        let ncol = out.ncol();
        let rhs_raster = self.rhs.as_raster();

        // Raster operands recycle both blocks up to the output layer count.
        let stream_layers = match rhs_raster {
            Some(_) => vec![nlyr, nlyr],
            None => vec![nlyr],
        };
        let opts = opts.clone().with_stream_layers(stream_layers);

        let mut writer = out.write_start(&opts).map_err(write_err)?;
        let plan = writer.plan().clone();
        let plan_hash = hash_serde(&plan)?;

        let lhs_reader = self.lhs.read_start().map_err(read_err)?;
        let rhs_reader = match rhs_raster {
            Some(r) => Some(r.read_start().map_err(read_err)?),
            None => None,
        };

        let block_cells = plan.max_rows() * ncol * nlyr;
        let mut lhs_buf = CellBuf::with_capacity(self.budget, block_cells, "lhs block")?;
        let mut rhs_buf = match rhs_reader {
            Some(_) => Some(CellBuf::with_capacity(self.budget, block_cells, "rhs block")?),
            None => None,
        };

        let per_layer = match &self.rhs {
            Operand::PerLayer(v) => recycle(v, nlyr),
            _ => Vec::new(),
        };

        let mut digest = CellDigest::new();
        let mut call_peak = self.budget.used_bytes();
        self.peak.record_used(call_peak);

        emit_event(
            "plan",
            &[
                ("blocks", plan.len().to_string()),
                ("max_rows", plan.max_rows().to_string()),
                ("operand", self.rhs.shape().to_string()),
            ],
        );

        for (i, block) in plan.iter().enumerate() {
            lhs_buf.clear();
            lhs_reader
                .read_block_into(&plan, i, lhs_buf.as_mut_vec())
                .map_err(read_err)?;

            match &self.rhs {
                Operand::Raster(_) => {
                    let (Some(reader), Some(buf)) = (rhs_reader.as_ref(), rhs_buf.as_mut()) else {
                        return Err(Error::Invariant("raster operand without a stream".into()));
                    };
                    buf.clear();
                    reader
                        .read_block_into(&plan, i, buf.as_mut_vec())
                        .map_err(read_err)?;
                    // Broadcasting grows the shorter block; account for it first.
                    let cells = lhs_buf.len().max(buf.len());
                    lhs_buf.try_reserve_total(cells)?;
                    buf.try_reserve_total(cells)?;
                    recycle_pair(lhs_buf.as_mut_vec(), buf.as_mut_vec());
                    apply_cells(op, &mut lhs_buf[..], &buf[..])?;
                }
                Operand::Scalar(x) => apply_scalar(op, &mut lhs_buf[..], *x, self.reverse),
                Operand::PerLayer(_) => apply_per_layer(
                    op,
                    &mut lhs_buf[..],
                    &per_layer,
                    block.nrows * ncol,
                    self.reverse,
                )?,
            }

            digest.update(&lhs_buf);
            writer.write_block(i, &lhs_buf).map_err(write_err)?;

            let used = self.budget.used_bytes();
            call_peak = call_peak.max(used);
            self.peak.record_used(used);
            emit_event(
                "block",
                &[
                    ("index", i.to_string()),
                    ("start_row", block.start_row.to_string()),
                    ("rows", block.nrows.to_string()),
                ],
            );
        }

        let blocks_written = writer.next_block();
        writer.finish().map_err(write_err)?;
        lhs_reader.close().map_err(read_err)?;
        if let Some(reader) = rhs_reader {
            reader.close().map_err(read_err)?;
        }

        let mut manifest = RunManifest::new(
            op.symbol(),
            self.rhs.shape(),
            self.reverse && rhs_raster.is_none(),
            plan_hash,
            started_ms,
        );
        manifest.blocks_written = blocks_written;
        manifest.cells_written = digest.cells();
        manifest.peak_bytes = call_peak;
        Ok(manifest.finish(now_millis(), Some(digest.finish())))
    }
}

fn read_err(e: StoreError) -> Error {
    Error::StreamRead(e.to_string())
}

fn write_err(e: StoreError) -> Error {
    Error::StreamWrite(e.to_string())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use emraster_core::geometry::Geometry;
    use DriverState::{Done, GeometryCheck, Init, Streaming, ValuesCheck};

    fn raster(nrow: usize, ncol: usize, layers: Vec<Vec<f64>>) -> Raster {
        Raster::from_layers(Geometry::grid(nrow, ncol), layers).unwrap()
    }

    fn run(lhs: &Raster, rhs: Operand<'_>, op: &str) -> (Raster, Vec<DriverState>) {
        let budget = MemoryBudgetImpl::new(1 << 20);
        let peak = PeakTracker::new();
        let mut d = Driver::new(lhs, rhs, op, false, &budget, &peak);
        let out = d.run(&WriteOptions::default().with_rows_per_block(1));
        assert_eq!(budget.used_bytes(), 0);
        (out, d.history().to_vec())
    }

    #[test]
    fn scalar_path_skips_geometry_check() {
        let a = raster(2, 2, vec![vec![1.0, 2.0, 3.0, 4.0]]);
        let (out, states) = run(&a, Operand::Scalar(1.0), "+");
        assert_eq!(states, vec![Init, ValuesCheck, Streaming, Done]);
        assert_eq!(out.values().unwrap(), vec![2.0, 3.0, 4.0, 5.0]);
        let m = out.manifest().unwrap();
        assert_eq!(m.blocks_written, 2);
        assert_eq!(m.cells_written, 4);
        assert_eq!(m.operand, "scalar");
    }

    #[test]
    fn raster_path_checks_geometry() {
        let a = raster(2, 2, vec![vec![1.0; 4]]);
        let b = raster(2, 2, vec![vec![2.0; 4]]);
        let (out, states) = run(&a, Operand::Raster(&b), "*");
        assert_eq!(states, vec![Init, GeometryCheck, ValuesCheck, Streaming, Done]);
        assert_eq!(out.values().unwrap(), vec![2.0; 4]);
    }

    #[test]
    fn bad_operator_stops_in_init() {
        let a = raster(1, 1, vec![vec![1.0]]);
        let (out, states) = run(&a, Operand::Scalar(1.0), "**");
        assert_eq!(states, vec![Init, DriverState::Error]);
        assert_eq!(
            out.error(),
            Some(&emraster_core::error::Error::UnsupportedOperator("**".into()))
        );
    }

    #[test]
    fn geometry_mismatch_stops_before_values() {
        let a = raster(2, 2, vec![vec![1.0; 4]]);
        let b = raster(2, 1, vec![vec![1.0; 2]]);
        let (out, states) = run(&a, Operand::Raster(&b), "+");
        assert_eq!(states, vec![Init, GeometryCheck, DriverState::Error]);
        assert_eq!(
            out.error(),
            Some(&emraster_core::error::Error::GeometryMismatch)
        );
        assert!(!out.has_values());
    }

    #[test]
    fn empty_vector_is_refused() {
        let a = raster(1, 2, vec![vec![1.0, 2.0]]);
        let (out, states) = run(&a, Operand::PerLayer(vec![]), "+");
        assert_eq!(states, vec![Init, ValuesCheck, DriverState::Error]);
        assert_eq!(out.error(), Some(&emraster_core::error::Error::EmptyOperand));
    }

    #[test]
    fn zero_layer_operand_has_no_values() {
        let none = raster(1, 2, vec![]);
        let two = raster(1, 2, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        for (lhs, rhs) in [(&none, &two), (&two, &none)] {
            let (out, states) = run(lhs, Operand::Raster(rhs), "+");
            assert_eq!(states, vec![Init, GeometryCheck, ValuesCheck, DriverState::Error]);
            assert_eq!(out.error(), Some(&emraster_core::error::Error::NoValues));
            assert!(!out.has_values());
        }
        let (out, _) = run(&none, Operand::Scalar(1.0), "*");
        assert_eq!(out.error(), Some(&emraster_core::error::Error::NoValues));
    }

    #[test]
    fn input_store_is_not_a_destination() {
        let a = raster(2, 1, vec![vec![1.0, 2.0]]);
        let b = raster(2, 1, vec![vec![3.0, 4.0]]);
        let budget = MemoryBudgetImpl::new(1 << 20);
        let peak = PeakTracker::new();
        for target in [&a, &b] {
            let store = target.store().unwrap().clone();
            let opts = WriteOptions::default()
                .with_destination(emraster_io::Destination::Store(store));
            let mut d = Driver::new(&a, Operand::Raster(&b), "-", false, &budget, &peak);
            let out = d.run(&opts);
            assert!(matches!(
                out.error(),
                Some(emraster_core::error::Error::StreamWrite(_))
            ));
            assert_eq!(d.history().last(), Some(&DriverState::Error));
            assert!(!d.history().contains(&Streaming));
        }
        assert_eq!(a.values().unwrap(), vec![1.0, 2.0]);
        assert_eq!(b.values().unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn failed_input_is_inert() {
        let mut a = raster(1, 1, vec![vec![1.0]]);
        a.set_error(emraster_core::error::Error::StreamRead("disk".into()));
        let (out, states) = run(&a, Operand::Scalar(1.0), "+");
        assert_eq!(states, vec![Init, DriverState::Error]);
        assert_eq!(out.error(), a.error());
    }

    #[test]
    fn output_takes_the_larger_layer_count() {
        let a = raster(1, 2, vec![vec![1.0, 2.0]]);
        let b = raster(1, 2, vec![vec![10.0, 20.0], vec![30.0, 40.0], vec![50.0, 60.0]]);
        let (out, _) = run(&a, Operand::Raster(&b), "+");
        assert_eq!(out.nlyr(), 3);
        assert_eq!(
            out.values().unwrap(),
            vec![11.0, 22.0, 31.0, 42.0, 51.0, 62.0]
        );
    }
}
