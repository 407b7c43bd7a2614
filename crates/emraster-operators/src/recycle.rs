//! Cyclic extension of operands: `result[i] = source[i % source.len()]`.
//!
//! Used to stretch a per-layer vector to the layer count and to broadcast a
//! raster block with fewer layers across a block with more.
//!
//! An empty source has nothing to repeat; all three functions panic on it.
//! Callers validate operand lengths before streaming.

/// New vector of length `n` repeating `source`.
///
/// # Panics
/// If `source` is empty and `n > 0`.
pub fn recycle<T: Clone>(source: &[T], n: usize) -> Vec<T> {
    if n == 0 {
        return Vec::new();
    }
    assert!(!source.is_empty(), "cannot recycle an empty sequence");
    source.iter().cycle().take(n).cloned().collect()
}

/// Bring `v` to length `n` in place (repeat when growing, truncate when shrinking).
///
/// # Panics
/// If `v` is empty and `n > 0`.
pub fn recycle_in_place<T: Clone>(v: &mut Vec<T>, n: usize) {
    let len = v.len();
    if n <= len {
        v.truncate(n);
        return;
    }
    assert!(len > 0, "cannot recycle an empty sequence");
    v.reserve(n - len);
    for i in len..n {
        let x = v[i % len].clone();
        v.push(x);
    }
}

/// Recycle the shorter of `a` and `b` to the length of the longer.
pub fn recycle_pair<T: Clone>(a: &mut Vec<T>, b: &mut Vec<T>) {
    match a.len().cmp(&b.len()) {
        std::cmp::Ordering::Less => recycle_in_place(a, b.len()),
        std::cmp::Ordering::Greater => recycle_in_place(b, a.len()),
        std::cmp::Ordering::Equal => {}
    }
}
