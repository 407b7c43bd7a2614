//! Every stream a call opens is closed again, whatever way the call ends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use emraster_core::error::Error;
use emraster_core::geometry::Geometry;
use emraster_exec::{Engine, Operand};
use emraster_io::{
    CellStore, Destination, MemoryStore, Raster, StoreDims, StoreError, StoreResult, WriteOptions,
};

/// Wraps a `MemoryStore`, counts every open/close and fails on request.
#[derive(Debug)]
struct TrackedStore {
    inner: MemoryStore,
    opens: AtomicUsize,
    closes: AtomicUsize,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_read_at: Option<usize>,
    fail_write_at: Option<usize>,
}

impl TrackedStore {
    fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            opens: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_read_at: None,
            fail_write_at: None,
        }
    }

    fn failing_read(mut self, nth: usize) -> Self {
        self.fail_read_at = Some(nth);
        self
    }

    fn failing_write(mut self, nth: usize) -> Self {
        self.fail_write_at = Some(nth);
        self
    }

    fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    fn balanced(&self) -> bool {
        self.opens() == self.closes.load(Ordering::SeqCst)
            && self.inner.open_readers() == 0
            && self.inner.open_writers() == 0
    }
}

impl CellStore for TrackedStore {
    fn location(&self) -> String {
        "tracked://".into()
    }

    fn dims(&self) -> StoreDims {
        self.inner.dims()
    }

    fn open_read(&self) -> StoreResult<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open_read()
    }

    fn close_read(&self) -> StoreResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close_read()
    }

    fn open_write(&self) -> StoreResult<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.inner.open_write()
    }

    fn close_write(&self) -> StoreResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close_write()
    }

    fn read_rows(
        &self,
        layer: usize,
        start_row: usize,
        nrows: usize,
        out: &mut Vec<f64>,
    ) -> StoreResult<()> {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_read_at == Some(n) {
            return Err(StoreError::Backend("injected read failure".into()));
        }
        self.inner.read_rows(layer, start_row, nrows, out)
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
        let n = self.writes.fetch_add(1, Ordering::SeqCst);
        if self.fail_write_at == Some(n) {
            return Err(StoreError::Backend("injected write failure".into()));
        }
        self.inner
            .write_rows(layer, start_row, nrows, col_offset, ncols, values)
    }
}

const NROW: usize = 4;
const NCOL: usize = 3;

fn grid() -> Geometry {
    Geometry::grid(NROW, NCOL)
}

fn cells(seed: f64) -> Vec<f64> {
    (0..NROW * NCOL).map(|i| seed + i as f64).collect()
}

fn tracked_input(seed: f64) -> Arc<TrackedStore> {
    Arc::new(TrackedStore::new(
        MemoryStore::from_layers(NROW, NCOL, vec![cells(seed)]).unwrap(),
    ))
}

fn tracked_output() -> Arc<TrackedStore> {
    Arc::new(TrackedStore::new(MemoryStore::new(NROW, NCOL, 1)))
}

fn raster_over(store: &Arc<TrackedStore>) -> Raster {
    Raster::with_store(grid(), 1, store.clone()).unwrap()
}

fn opts_into(out: &Arc<TrackedStore>) -> WriteOptions {
    WriteOptions::default()
        .with_rows_per_block(1)
        .with_destination(Destination::Store(out.clone()))
}

#[test]
fn success_closes_everything() {
    let engine = Engine::default();
    let (a, b, out) = (tracked_input(0.0), tracked_input(100.0), tracked_output());
    let result = engine.arith_with(
        &raster_over(&a),
        Operand::Raster(&raster_over(&b)),
        "+",
        false,
        &opts_into(&out),
    );
    assert!(result.error().is_none());
    assert_eq!(result.manifest().unwrap().blocks_written, NROW);
    for s in [&a, &b, &out] {
        assert_eq!(s.opens(), 1);
        assert!(s.balanced());
    }
    assert_eq!(out.inner.cells_written(), NROW * NCOL);
}

#[test]
fn unsupported_operator_opens_nothing() {
    let engine = Engine::default();
    let (a, out) = (tracked_input(0.0), tracked_output());
    let result = engine.arith_with(
        &raster_over(&a),
        Operand::Scalar(1.0),
        "?",
        false,
        &opts_into(&out),
    );
    assert_eq!(result.error(), Some(&Error::UnsupportedOperator("?".into())));
    assert_eq!(a.opens(), 0);
    assert_eq!(out.opens(), 0);
}

#[test]
fn geometry_mismatch_opens_nothing() {
    let engine = Engine::default();
    let (a, out) = (tracked_input(0.0), tracked_output());
    let narrow = Raster::from_layers(Geometry::grid(NROW, 1), vec![vec![1.0; NROW]]).unwrap();
    let result = engine.arith_with(
        &raster_over(&a),
        Operand::Raster(&narrow),
        "*",
        false,
        &opts_into(&out),
    );
    assert_eq!(result.error(), Some(&Error::GeometryMismatch));
    assert_eq!(a.opens(), 0);
    assert_eq!(out.opens(), 0);
    assert_eq!(out.inner.cells_written(), 0);
}

#[test]
fn read_failure_aborts_and_closes() {
    let engine = Engine::default();
    // first read of block 2 fails
    let a = Arc::new(
        TrackedStore::new(MemoryStore::from_layers(NROW, NCOL, vec![cells(0.0)]).unwrap())
            .failing_read(2),
    );
    let b = tracked_input(5.0);
    let out = tracked_output();
    let result = engine.arith_with(
        &raster_over(&a),
        Operand::Raster(&raster_over(&b)),
        "-",
        false,
        &opts_into(&out),
    );
    assert!(matches!(result.error(), Some(Error::StreamRead(_))));
    assert!(!result.has_values());
    // blocks 0 and 1 made it out, nothing after
    assert_eq!(out.inner.cells_written(), 2 * NCOL);
    for s in [&a, &b, &out] {
        assert!(s.balanced(), "{s:?}");
    }
    assert_eq!(engine.budget().used_bytes(), 0);
}

#[test]
fn write_failure_aborts_and_closes() {
    let engine = Engine::default();
    let a = tracked_input(0.0);
    let out = Arc::new(TrackedStore::new(MemoryStore::new(NROW, NCOL, 1)).failing_write(1));
    let result = engine.arith_with(
        &raster_over(&a),
        Operand::PerLayer(vec![2.0, 3.0]),
        "*",
        false,
        &opts_into(&out),
    );
    assert!(matches!(result.error(), Some(Error::StreamWrite(_))));
    assert!(!result.has_values());
    assert_eq!(out.inner.cells_written(), NCOL);
    assert!(a.balanced());
    assert!(out.balanced());
    // stopped at the failing block: block 2 was never read
    assert_eq!(a.reads.load(Ordering::SeqCst), 2);
}

#[test]
fn output_already_open_is_a_write_error() {
    let engine = Engine::default();
    let a = tracked_input(0.0);
    let out = tracked_output();
    out.inner.open_write().unwrap();

    let result = engine.arith_with(
        &raster_over(&a),
        Operand::Scalar(1.0),
        "+",
        false,
        &opts_into(&out),
    );
    assert!(matches!(result.error(), Some(Error::StreamWrite(_))));
    assert_eq!(a.opens(), 0);
    out.inner.close_write().unwrap();
}

#[test]
fn mismatched_destination_is_rejected() {
    let engine = Engine::default();
    let a = tracked_input(0.0);
    let wrong = Arc::new(MemoryStore::new(NROW, NCOL, 2));
    let opts = WriteOptions::default().with_destination(Destination::Store(wrong.clone()));
    let result = engine.arith_with(&raster_over(&a), Operand::Scalar(1.0), "+", false, &opts);
    assert!(matches!(result.error(), Some(Error::StreamWrite(_))));
    assert_eq!(wrong.open_writers(), 0);
    assert!(a.balanced());
}

#[test]
fn budget_failure_closes_streams() {
    // One row of lhs + rhs buffers needs 2 * 3 * 8 = 48 bytes.
    let engine = Engine::new(emraster_core::config::EngineConfig {
        mem_cap_bytes: 40,
        ..Default::default()
    });
    let (a, b, out) = (tracked_input(0.0), tracked_input(1.0), tracked_output());
    let result = engine.arith_with(
        &raster_over(&a),
        Operand::Raster(&raster_over(&b)),
        "+",
        false,
        &opts_into(&out),
    );
    assert!(matches!(result.error(), Some(Error::Budget(_))));
    assert_eq!(out.inner.cells_written(), 0);
    for s in [&a, &b, &out] {
        assert!(s.balanced());
    }
    assert_eq!(engine.budget().used_bytes(), 0);
}
