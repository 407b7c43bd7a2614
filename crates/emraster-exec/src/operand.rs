//! Right-hand operand of an arithmetic call.

use emraster_io::Raster;

#[derive(Debug, Clone)]
pub enum Operand<'a> {
    Scalar(f64),
    /// One value per layer, recycled to the layer count.
    PerLayer(Vec<f64>),
    Raster(&'a Raster),
}

impl<'a> Operand<'a> {
    /// Short shape name recorded in manifests and logs.
    pub fn shape(&self) -> &'static str {
        match self {
            Operand::Scalar(_) => "scalar",
            Operand::PerLayer(_) => "vector",
            Operand::Raster(_) => "raster",
        }
    }

    /// A one-element vector behaves exactly like a scalar.
    pub fn normalized(self) -> Self {
        match self {
            Operand::PerLayer(v) if v.len() == 1 => Operand::Scalar(v[0]),
            other => other,
        }
    }

    pub fn as_raster(&self) -> Option<&'a Raster> {
        match self {
            Operand::Raster(r) => Some(*r),
            _ => None,
        }
    }
}

impl From<f64> for Operand<'_> {
    fn from(x: f64) -> Self {
        Operand::Scalar(x)
    }
}

impl From<Vec<f64>> for Operand<'_> {
    fn from(v: Vec<f64>) -> Self {
        Operand::PerLayer(v)
    }
}

impl<'a> From<&'a Raster> for Operand<'a> {
    fn from(r: &'a Raster) -> Self {
        Operand::Raster(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_vector_is_scalar() {
        assert!(matches!(
            Operand::from(vec![2.5]).normalized(),
            Operand::Scalar(x) if x == 2.5
        ));
        assert_eq!(Operand::from(vec![1.0, 2.0]).normalized().shape(), "vector");
        assert_eq!(Operand::PerLayer(vec![]).normalized().shape(), "vector");
    }
}
