// dip_core/src/utils/safety.rs

//! Guarded arithmetic used on every numeric hot path so that a single bad
//! operand degrades to a bounded value instead of spreading NaN/Inf.

use num_traits::Float;

/// Smallest denominator magnitude `safe_divide` will divide by.
pub const EPSILON_DIV: f64 = 1e-12;

fn constant<T: Float>(value: f64) -> T {
    T::from(value).unwrap_or_else(T::epsilon)
}

/// Division that keeps the denominator's sign but never lets its magnitude
/// fall below `EPSILON_DIV`. A zero denominator is treated as `+EPSILON_DIV`.
pub fn safe_divide<T: Float>(numerator: T, denominator: T) -> T {
    let eps = constant::<T>(EPSILON_DIV);
    let guarded = if denominator.abs() < eps {
        if denominator < T::zero() {
            -eps
        } else {
            eps
        }
    } else {
        denominator
    };
    numerator / guarded
}

/// Square root of `max(x, 0)`. Continuous at zero, so `safe_sqrt(0) == 0`.
pub fn safe_sqrt<T: Float>(x: T) -> T {
    if x.is_nan() {
        return T::zero();
    }
    x.max(T::zero()).sqrt()
}

/// Clamp into `[lo, hi]`. NaN maps to `lo`.
pub fn clamp<T: Float>(x: T, lo: T, hi: T) -> T {
    if x.is_nan() {
        return lo;
    }
    x.max(lo).min(hi)
}

/// Symmetric saturation into `[-limit, limit]`.
pub fn saturate<T: Float>(x: T, limit: T) -> T {
    clamp(x, -limit, limit)
}

/// `sign(x)` with `sign(0) == 0` (unlike `f64::signum`, which returns 1 for +0).
pub fn sign<T: Float>(x: T) -> T {
    if x > T::zero() {
        T::one()
    } else if x < T::zero() {
        -T::one()
    } else {
        T::zero()
    }
}

/// True when every element is finite.
pub fn all_finite<'a, T, I>(values: I) -> bool
where
    T: Float + 'a,
    I: IntoIterator<Item = &'a T>,
{
    values.into_iter().all(|v| v.is_finite())
}

/// Returns `value` if it is finite, otherwise `fallback`.
pub fn finite_or<T: Float>(value: T, fallback: T) -> T {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::State;
    use approx::assert_relative_eq;

    #[test]
    fn divide_guards_tiny_denominators_and_keeps_sign() {
        assert_relative_eq!(safe_divide(1.0, 2.0), 0.5);
        assert_relative_eq!(safe_divide(1.0, 0.0), 1.0 / EPSILON_DIV);
        assert_relative_eq!(safe_divide(1.0, -1e-15), -1.0 / EPSILON_DIV);
        assert!(safe_divide(3.0_f64, 0.0).is_finite());
    }

    #[test]
    fn sqrt_never_produces_nan() {
        assert_eq!(safe_sqrt(-4.0_f64), 0.0);
        assert_eq!(safe_sqrt(f64::NAN), 0.0);
        assert_relative_eq!(safe_sqrt(9.0_f64), 3.0);
    }

    #[test]
    fn clamp_and_sign_behave_at_the_edges() {
        assert_eq!(clamp(5.0, -1.0, 1.0), 1.0);
        assert_eq!(clamp(f64::NAN, -1.0, 1.0), -1.0);
        assert_eq!(saturate(-7.0, 2.0), -2.0);
        assert_eq!(sign(0.0_f64), 0.0);
        assert_eq!(sign(-0.3_f64), -1.0);
        assert!(all_finite(&[1.0, 2.0, 3.0]));
        assert!(!all_finite(&[1.0, f64::INFINITY]));
        assert!(!all_finite(State::new(0.0, 0.0, f64::NAN, 0.0, 0.0, 0.0).iter()));
        assert_eq!(finite_or(f64::NAN, 4.0), 4.0);
    }
}
