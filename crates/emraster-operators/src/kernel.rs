//! Block kernels. Each overwrites the left-hand block in place so the driver
//! never holds a separate result buffer.

use crate::error::OpError;
use crate::op::ArithOp;

/// `lhs[i] = lhs[i] op rhs[i]`. Both blocks must already be the same length
/// (see `recycle_pair`).
pub fn apply_cells(op: ArithOp, lhs: &mut [f64], rhs: &[f64]) -> Result<(), OpError> {
    if lhs.len() != rhs.len() {
        return Err(OpError::Shape(format!(
            "blocks of {} and {} cells",
            lhs.len(),
            rhs.len()
        )));
    }
    for (a, b) in lhs.iter_mut().zip(rhs) {
        *a = op.eval(*a, *b);
    }
    Ok(())
}

/// `cell op x`, or `x op cell` when `reverse`.
pub fn apply_scalar(op: ArithOp, cells: &mut [f64], x: f64, reverse: bool) {
    if x.is_nan() {
        cells.fill(f64::NAN);
        return;
    }
    if reverse {
        for c in cells.iter_mut() {
            *c = op.eval(x, *c);
        }
    } else {
        for c in cells.iter_mut() {
            *c = op.eval(*c, x);
        }
    }
}

/// Layer-major block: the `k`-th run of `layer_len` cells uses `values[k]`.
///
/// `values` must hold at least one entry per layer in the block; the driver
/// recycles the caller's vector to the layer count once per call.
pub fn apply_per_layer(
    op: ArithOp,
    cells: &mut [f64],
    values: &[f64],
    layer_len: usize,
    reverse: bool,
) -> Result<(), OpError> {
    if layer_len == 0 {
        return Ok(());
    }
    if cells.len() % layer_len != 0 {
        return Err(OpError::Shape(format!(
            "{} cells is not a whole number of {layer_len}-cell layers",
            cells.len()
        )));
    }
    let layers = cells.len() / layer_len;
    if values.len() < layers {
        return Err(OpError::Shape(format!(
            "{} values for {layers} layers",
            values.len()
        )));
    }
    for (chunk, &x) in cells.chunks_mut(layer_len).zip(values) {
        apply_scalar(op, chunk, x, reverse);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_elementwise() {
        let mut a = vec![1.0, 2.0, f64::NAN];
        apply_cells(ArithOp::Add, &mut a, &[10.0, 20.0, 30.0]).unwrap();
        assert_eq!(&a[..2], &[11.0, 22.0]);
        assert!(a[2].is_nan());
    }

    #[test]
    fn cells_length_mismatch() {
        let mut a = vec![1.0; 3];
        assert!(matches!(
            apply_cells(ArithOp::Mul, &mut a, &[1.0; 2]),
            Err(OpError::Shape(_))
        ));
    }

    #[test]
    fn scalar_reverse_swaps_sides() {
        let mut a = vec![1.0, 4.0];
        apply_scalar(ArithOp::Sub, &mut a, 10.0, false);
        assert_eq!(a, vec![-9.0, -6.0]);

        let mut b = vec![1.0, 4.0];
        apply_scalar(ArithOp::Sub, &mut b, 10.0, true);
        assert_eq!(b, vec![9.0, 6.0]);
    }

    #[test]
    fn scalar_remainder_is_applied() {
        let mut a = vec![7.0, 8.0, 9.0];
        apply_scalar(ArithOp::Rem, &mut a, 4.0, false);
        assert_eq!(a, vec![3.0, 0.0, 1.0]);
    }

    #[test]
    fn na_scalar_blanks_block() {
        let mut a = vec![1.0, 2.0];
        apply_scalar(ArithOp::Eq, &mut a, f64::NAN, true);
        assert!(a.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn per_layer_slices() {
        // two layers of two cells
        let mut a = vec![1.0, 2.0, 3.0, 4.0];
        apply_per_layer(ArithOp::Mul, &mut a, &[10.0, 100.0], 2, false).unwrap();
        assert_eq!(a, vec![10.0, 20.0, 300.0, 400.0]);
    }

    #[test]
    fn per_layer_ne_is_not_eq() {
        let mut ne = vec![1.0, 2.0];
        apply_per_layer(ArithOp::Ne, &mut ne, &[1.0], 2, false).unwrap();
        assert_eq!(ne, vec![0.0, 1.0]);
    }

    #[test]
    fn per_layer_short_vector() {
        let mut a = vec![0.0; 6];
        assert!(apply_per_layer(ArithOp::Add, &mut a, &[1.0], 2, false).is_err());
    }
}
