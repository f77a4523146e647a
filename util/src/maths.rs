//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float
{
    target_range.0
        + ((value - source_range.0)
        * (target_range.1 - target_range.0)
        / (source_range.1 - source_range.0))
}

/// Return the euclidian norm (distance between) of two points.
///
/// If the points do not have the same number of dimentions then `None` is
/// returned.
pub fn norm<T>(point_0: &[T], point_1: &[T]) -> Option<T>
where
    T: Float + std::ops::AddAssign
{
    // Check that the dimentions match
    if point_0.len() != point_1.len() {
        return None;
    }

    // Sum all elements of the points
    let mut sum = T::from(0).unwrap();

    for i in 0..point_0.len() {
        sum += (point_0[i] - point_1[i]).powi(2);
    }

    // Return the squareroot of the sum
    Some(sum.sqrt())
}

/// Clamp a value between a minimum and maximum.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float + std::ops::Rem
{
    let r = lhs % rhs;
    if r < T::from(0.0).unwrap() { r + rhs.abs() } else { r }
}

/// Wrap an angle into the canonical range (-pi, pi].
///
/// All reported joint angles use this range so that consecutive solves of the
/// same orientation cannot differ by a whole turn.
pub fn wrap_to_pi<T>(angle: T) -> T
where
    T: Float + std::ops::Rem
{
    let pi_t: T = T::from(std::f64::consts::PI).unwrap();
    let tau_t: T = T::from(std::f64::consts::TAU).unwrap();

    let wrapped = rem_euclid(angle + pi_t, tau_t) - pi_t;

    // rem_euclid gives [0, tau), mapping -pi onto itself, so flip the open
    // end of the range
    if wrapped == -pi_t {
        pi_t
    }
    else {
        wrapped
    }
}

/// Unwrap an angle to the 2pi-representative closest to a reference angle.
///
/// Used to keep extracted joint angles continuous between control ticks: the
/// returned value is equal to `angle` modulo 2pi but within pi of
/// `reference`.
pub fn unwrap_near<T>(angle: T, reference: T) -> T
where
    T: Float + std::ops::Rem
{
    reference + wrap_to_pi(angle - reference)
}

#[cfg(test)]
mod test {
    use super::*;

    const PI: f64 = std::f64::consts::PI;
    const TAU: f64 = std::f64::consts::TAU;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (0f64, 10f64), 0.5f64), 5f64);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 1f64), 0f64), 0.5f64);

        // Values outside the source range extrapolate, callers clamp
        assert_eq!(lin_map((0f64, 1f64), (0f64, 2f64), 2f64), 4f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&0.5f64, &0f64, &1f64), 0.5f64);
        assert_eq!(clamp(&-0.5f64, &0f64, &1f64), 0f64);
        assert_eq!(clamp(&1.5f64, &0f64, &1f64), 1f64);
    }

    #[test]
    fn test_wrap_to_pi() {
        assert!((wrap_to_pi(0f64)).abs() < 1e-12);
        assert!((wrap_to_pi(TAU) - 0f64).abs() < 1e-12);
        assert!((wrap_to_pi(PI + 0.1) - (-PI + 0.1)).abs() < 1e-12);
        assert!((wrap_to_pi(-PI - 0.1) - (PI - 0.1)).abs() < 1e-12);
        assert_eq!(wrap_to_pi(PI), PI);
        assert_eq!(wrap_to_pi(-PI), PI);
    }

    #[test]
    fn test_unwrap_near() {
        // 350 deg reported as -10 deg must unwrap back next to 350 deg
        let a = unwrap_near(-10f64.to_radians(), 350f64.to_radians());
        assert!((a - 350f64.to_radians()).abs() < 1e-12);

        // Already-close angles are unchanged
        let b = unwrap_near(0.5f64, 0.4f64);
        assert!((b - 0.5f64).abs() < 1e-12);

        // Multiple turns away
        let c = unwrap_near(0.1f64, 3.0 * TAU);
        assert!((c - (3.0 * TAU + 0.1)).abs() < 1e-9);
    }
}
