//! Run manifest attached to a successful arithmetic result.
//!
//! Records what was computed (operator, operand shape, block plan hash) and a
//! digest of the written cells so two runs can be compared without re-reading.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::hash::Hash256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ManifestId(pub Uuid);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub id: ManifestId,

    /// Operator symbol (`+`, `>=`, ...).
    pub operator: String,

    /// `raster`, `scalar` or `vector`.
    pub operand: String,

    pub reverse: bool,

    /// Stable hash of the block plan that every stream walked.
    pub plan_hash: Hash256,

    /// Engine version string for provenance.
    pub engine_version: String,

    pub blocks_written: usize,
    pub cells_written: u64,

    /// Digest of the output cells in write order.
    pub outputs_digest: Option<Hash256>,

    /// Highest budget usage observed while streaming.
    pub peak_bytes: usize,

    /// Milliseconds since Unix epoch (UTC).
    pub started_ms: u64,
    pub finished_ms: u64,
}

impl RunManifest {
    pub fn new(
        operator: impl Into<String>,
        operand: impl Into<String>,
        reverse: bool,
        plan_hash: Hash256,
        started_ms: u64,
    ) -> Self {
        Self {
            id: ManifestId(Uuid::new_v4()),
            operator: operator.into(),
            operand: operand.into(),
            reverse,
            plan_hash,
            engine_version: crate::VERSION.to_string(),
            blocks_written: 0,
            cells_written: 0,
            outputs_digest: None,
            peak_bytes: 0,
            started_ms,
            finished_ms: started_ms,
        }
    }

    pub fn finish(mut self, finished_ms: u64, outputs_digest: Option<Hash256>) -> Self {
        self.finished_ms = finished_ms;
        self.outputs_digest = outputs_digest;
        self
    }

    pub fn duration_ms(&self) -> u64 {
        self.finished_ms.saturating_sub(self.started_ms)
    }
}
