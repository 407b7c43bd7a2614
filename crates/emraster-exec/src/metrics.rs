//! Tracing hooks.
//!
//! Compiled out without the `tracing` feature; the binary installs a subscriber.

#[cfg(feature = "tracing")]
pub fn emit_event(event: &str, key_values: &[(&str, String)]) {
    let fields = key_values
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!(target: "emraster", %event, %fields);
}

#[cfg(not(feature = "tracing"))]
pub fn emit_event(_event: &str, _key_values: &[(&str, String)]) { /* no-op */
}

/// One line per finished call, at info level.
#[cfg(feature = "tracing")]
pub fn emit_summary(manifest: &emraster_core::manifest::RunManifest) {
    tracing::info!(
        target: "emraster",
        op = %manifest.operator,
        operand = %manifest.operand,
        blocks = manifest.blocks_written,
        cells = manifest.cells_written,
        peak_bytes = manifest.peak_bytes,
        ms = manifest.duration_ms(),
        "arith done"
    );
}

#[cfg(not(feature = "tracing"))]
pub fn emit_summary(_manifest: &emraster_core::manifest::RunManifest) {}
