//! Temperature unit conversion.

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Convert a Fahrenheit *difference* to the equivalent Celsius difference.
pub fn fahrenheit_delta_to_celsius(delta: f64) -> f64 {
    delta * 5.0 / 9.0
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_known_points() {
        assert!((celsius_to_fahrenheit(0.0) - 32.0).abs() < EPSILON);
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < EPSILON);
        assert!((celsius_to_fahrenheit(-40.0) + 40.0).abs() < EPSILON);
        assert!((celsius_to_fahrenheit(18.0) - 64.4).abs() < EPSILON);
        assert!((fahrenheit_to_celsius(68.0) - 20.0).abs() < EPSILON);
    }

    #[test]
    fn test_round_trip() {
        let mut c = -80.0;
        while c <= 60.0 {
            let back = fahrenheit_to_celsius(celsius_to_fahrenheit(c));
            assert!((back - c).abs() < EPSILON, "round trip drifted for {c}: {back}");
            c += 0.37;
        }
    }

    #[test]
    fn test_delta_conversion() {
        // 9°F of change is 5°C of change regardless of the base point
        assert!((fahrenheit_delta_to_celsius(9.0) - 5.0).abs() < EPSILON);
        assert!((fahrenheit_delta_to_celsius(-1.8) + 1.0).abs() < EPSILON);
    }
}
