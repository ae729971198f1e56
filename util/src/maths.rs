//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Limit a value to the closed interval `[min, max]`.
///
/// Returns the limited value and `true` if the value had to be limited.
pub fn clamp<T>(value: T, min: T, max: T) -> (T, bool)
where
    T: Float
{
    if value > max {
        (max, true)
    }
    else if value < min {
        (min, true)
    }
    else {
        (value, false)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(5f64, -1f64, 1f64), (1f64, true));
        assert_eq!(clamp(-5f64, -1f64, 1f64), (-1f64, true));
        assert_eq!(clamp(0.5f64, -1f64, 1f64), (0.5f64, false));
        assert_eq!(clamp(1f64, -1f64, 1f64), (1f64, false));
        assert_eq!(clamp(-90f64, -53f64, 90f64), (-53f64, true));
    }
}
