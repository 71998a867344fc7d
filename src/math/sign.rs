//! Three-valued sign.
//!
//! Maps real values onto {-1, 0, +1} stored as `i8`. `NaN` maps to 0 so a
//! corrupted coordinate abstains from the vote instead of picking a side.

use ndarray::{ArrayBase, ArrayD, Data, Dimension};

/// Sign of a single value: -1, 0 or +1.
///
/// Unlike [`f32::signum`], zero (including `-0.0`) maps to 0.
pub fn sign(x: f32) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Element-wise [`sign`] of a tensor of any dimensionality.
pub fn sign_tensor<S, D>(x: &ArrayBase<S, D>) -> ArrayD<i8>
where
    S: Data<Elem = f32>,
    D: Dimension,
{
    x.mapv(sign).into_dyn()
}

/// Whether every element is in {-1, 0, +1}. Returns the first offender otherwise.
pub fn is_ternary<S, D>(x: &ArrayBase<S, D>) -> Result<(), i8>
where
    S: Data<Elem = i8>,
    D: Dimension,
{
    match x.iter().find(|&&v| !(-1..=1).contains(&v)) {
        Some(&bad) => Err(bad),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_sign_scalar() {
        assert_eq!(sign(3.5), 1);
        assert_eq!(sign(-0.001), -1);
        assert_eq!(sign(0.0), 0);
        assert_eq!(sign(-0.0), 0);
    }

    #[test]
    fn test_sign_nan_abstains() {
        assert_eq!(sign(f32::NAN), 0);
    }

    #[test]
    fn test_sign_infinities() {
        assert_eq!(sign(f32::INFINITY), 1);
        assert_eq!(sign(f32::NEG_INFINITY), -1);
    }

    #[test]
    fn test_sign_tensor_keeps_shape() {
        let x = array![[1.0f32, -2.0], [0.0, 4.0], [-0.5, 0.0]];
        let s = sign_tensor(&x);
        assert_eq!(s.shape(), &[3, 2]);
        assert_eq!(s, array![[1i8, -1], [0, 1], [-1, 0]].into_dyn());
    }

    #[test]
    fn test_sign_tensor_subnormal() {
        let x = array![f32::MIN_POSITIVE / 2.0, -f32::MIN_POSITIVE / 2.0];
        assert_eq!(sign_tensor(&x), array![1i8, -1].into_dyn());
    }

    #[test]
    fn test_is_ternary() {
        assert!(is_ternary(&array![[1i8, 0, -1]]).is_ok());
        assert_eq!(is_ternary(&array![[1i8, 2, -3]]), Err(2));
    }
}
