// Display precision and value formatting for axes and live readouts

/// Number of buckets a value range must be distinguishable into.
pub const DEFAULT_PRECISION_DIVISOR: f64 = 2048.0;

/// Precision used when the range carries no scale information (zero, negative, NaN).
const DEFAULT_PRECISION: u32 = 2;
const MAX_PRECISION: u32 = 6;

/// Pixel extents above which an axis gets twice as many ticks.
const WIDE_X_AXIS_PIXELS: f64 = 600.0;
const WIDE_Y_AXIS_PIXELS: f64 = 400.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Decimal digits needed to resolve steps of `resolution`.
fn precision_for_resolution(resolution: f64) -> u32 {
    if !resolution.is_finite() || resolution <= 0.0 {
        return DEFAULT_PRECISION;
    }
    let digits = (-resolution.log10()).ceil();
    if digits <= 0.0 {
        0
    } else {
        (digits as u32).min(MAX_PRECISION)
    }
}

/// Display precision for values spanning `range`, resolved into `divisor` steps.
pub fn get_fix_value(range: f64, divisor: f64) -> u32 {
    precision_for_resolution(range / divisor)
}

/// Tick-label precision for an axis spanning `range` over `pixel_extent` pixels.
pub fn get_axis_fix(axis: Axis, range: f64, pixel_extent: f64) -> u32 {
    let wide = match axis {
        Axis::X => pixel_extent > WIDE_X_AXIS_PIXELS,
        Axis::Y => pixel_extent > WIDE_Y_AXIS_PIXELS,
    };
    let ticks = if wide { 20.0 } else { 10.0 };
    precision_for_resolution(range / ticks)
}

/// Format `value` with `precision` digits and an optional unit suffix.
/// In shorthand mode magnitudes of 10,000 and above render as `Nk`.
pub fn format_fixed_value(value: Option<f64>, precision: u32, unit: &str, shorthand: bool) -> String {
    let Some(value) = value.filter(|v| !v.is_nan()) else {
        return String::new();
    };

    let number = if shorthand && value.abs() >= 10_000.0 {
        format!("{}k", (value / 1000.0).round())
    } else {
        format!("{:.*}", precision as usize, value)
    };

    if unit.is_empty() {
        number
    } else {
        format!("{} {}", number, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_fix_value() {
        assert_eq!(get_fix_value(100.0, DEFAULT_PRECISION_DIVISOR), 2);
        assert_eq!(get_fix_value(10.0, DEFAULT_PRECISION_DIVISOR), 3);
        assert_eq!(get_fix_value(10_000.0, DEFAULT_PRECISION_DIVISOR), 0);
        assert_eq!(get_fix_value(2048.0, DEFAULT_PRECISION_DIVISOR), 0);
        // Deterministic for identical inputs.
        assert_eq!(
            get_fix_value(165.0, DEFAULT_PRECISION_DIVISOR),
            get_fix_value(165.0, DEFAULT_PRECISION_DIVISOR)
        );
        // A coarser divisor needs fewer digits.
        assert_eq!(get_fix_value(5.0, 10.0), 1);
    }

    #[test]
    fn test_get_fix_value_degenerate_ranges() {
        assert_eq!(get_fix_value(0.0, DEFAULT_PRECISION_DIVISOR), DEFAULT_PRECISION);
        assert_eq!(get_fix_value(-5.0, DEFAULT_PRECISION_DIVISOR), DEFAULT_PRECISION);
        assert_eq!(get_fix_value(f64::NAN, DEFAULT_PRECISION_DIVISOR), DEFAULT_PRECISION);
        assert_eq!(get_fix_value(1e-12, DEFAULT_PRECISION_DIVISOR), MAX_PRECISION);
    }

    #[test]
    fn test_get_axis_fix_wider_is_finer() {
        assert_eq!(get_axis_fix(Axis::X, 10.0, 300.0), 0);
        assert_eq!(get_axis_fix(Axis::X, 10.0, 800.0), 1);
        assert_eq!(get_axis_fix(Axis::Y, 1.5, 300.0), 1);
        assert_eq!(get_axis_fix(Axis::Y, 1.5, 500.0), 2);
    }

    #[test]
    fn test_format_fixed_value() {
        assert_eq!(format_fixed_value(None, 2, "N", false), "");
        assert_eq!(format_fixed_value(Some(f64::NAN), 2, "N", false), "");
        assert_eq!(format_fixed_value(Some(1.23456), 2, "N", false), "1.23 N");
        assert_eq!(format_fixed_value(Some(1.23456), 0, "", false), "1");
        assert_eq!(format_fixed_value(Some(12_345.0), 1, "lux", true), "12k lux");
        assert_eq!(format_fixed_value(Some(-25_600.0), 1, "", true), "-26k");
        assert_eq!(format_fixed_value(Some(12_345.0), 1, "lux", false), "12345.0 lux");
    }
}
