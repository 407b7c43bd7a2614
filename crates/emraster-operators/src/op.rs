//! The arithmetic/comparison catalog.
//!
//! Every operator is a plain `fn(f64, f64) -> f64` looked up in `CATALOG`.
//! Missing values are handled once, in `ArithOp::eval`, so individual cell
//! functions never see a NaN operand.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::OpError;

pub type CellFn = fn(f64, f64) -> f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArithOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Rem,
    #[serde(rename = "^")]
    Pow,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "<=")]
    Le,
}

fn add(a: f64, b: f64) -> f64 {
    a + b
}
fn sub(a: f64, b: f64) -> f64 {
    a - b
}
fn mul(a: f64, b: f64) -> f64 {
    a * b
}
fn div(a: f64, b: f64) -> f64 {
    a / b
}
fn rem(a: f64, b: f64) -> f64 {
    a % b
}
fn pow(a: f64, b: f64) -> f64 {
    a.powf(b)
}

fn truth(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn eq(a: f64, b: f64) -> f64 {
    truth(a == b)
}
fn ne(a: f64, b: f64) -> f64 {
    truth(a != b)
}
fn gt(a: f64, b: f64) -> f64 {
    truth(a > b)
}
fn lt(a: f64, b: f64) -> f64 {
    truth(a < b)
}
fn ge(a: f64, b: f64) -> f64 {
    truth(a >= b)
}
fn le(a: f64, b: f64) -> f64 {
    truth(a <= b)
}

/// Symbol table: symbol, operator, cell function. Order is catalog order.
pub const CATALOG: [(&str, ArithOp, CellFn); 12] = [
    ("+", ArithOp::Add, add),
    ("-", ArithOp::Sub, sub),
    ("*", ArithOp::Mul, mul),
    ("/", ArithOp::Div, div),
    ("%", ArithOp::Rem, rem),
    ("^", ArithOp::Pow, pow),
    ("==", ArithOp::Eq, eq),
    ("!=", ArithOp::Ne, ne),
    (">", ArithOp::Gt, gt),
    ("<", ArithOp::Lt, lt),
    (">=", ArithOp::Ge, ge),
    ("<=", ArithOp::Le, le),
];

impl ArithOp {
    pub const ALL: [ArithOp; 12] = [
        ArithOp::Add,
        ArithOp::Sub,
        ArithOp::Mul,
        ArithOp::Div,
        ArithOp::Rem,
        ArithOp::Pow,
        ArithOp::Eq,
        ArithOp::Ne,
        ArithOp::Gt,
        ArithOp::Lt,
        ArithOp::Ge,
        ArithOp::Le,
    ];

    /// Look up a symbol exactly as written (`"+"`, `">="`...).
    pub fn from_symbol(symbol: &str) -> Result<Self, OpError> {
        CATALOG
            .iter()
            .find(|(s, _, _)| *s == symbol)
            .map(|(_, op, _)| *op)
            .ok_or_else(|| OpError::Unsupported(symbol.to_string()))
    }

    fn entry(self) -> &'static (&'static str, ArithOp, CellFn) {
        // CATALOG is indexed in the same order as the enum.
        &CATALOG[self as usize]
    }

    pub fn symbol(self) -> &'static str {
        self.entry().0
    }

    /// Raw cell function, without the NA rule.
    pub fn cell_fn(self) -> CellFn {
        self.entry().2
    }

    /// `a op b`, NA if either side is NA.
    #[inline]
    pub fn eval(self, a: f64, b: f64) -> f64 {
        if a.is_nan() || b.is_nan() {
            f64::NAN
        } else {
            (self.cell_fn())(a, b)
        }
    }

    /// Result is a 1/0 truth value.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            ArithOp::Eq | ArithOp::Ne | ArithOp::Gt | ArithOp::Lt | ArithOp::Ge | ArithOp::Le
        )
    }

    /// `a op b == b op a` for all non-NA inputs.
    pub fn is_commutative(self) -> bool {
        matches!(self, ArithOp::Add | ArithOp::Mul | ArithOp::Eq | ArithOp::Ne)
    }
}

impl FromStr for ArithOp {
    type Err = OpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ArithOp::from_symbol(s)
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
