use crate::{CoreError, CoreResult};

/// Floating point type used throughout the system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> CoreResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Half-open arithmetic range `[start, stop)` with the given step.
///
/// Values are computed as `start + i * step` so rounding does not accumulate.
/// The step must carry the sign of `stop - start`; an empty range is an error.
pub fn arange(start: Real, stop: Real, step: Real) -> CoreResult<Vec<Real>> {
    ensure_finite(start, "range start")?;
    ensure_finite(stop, "range stop")?;
    ensure_finite(step, "range step")?;

    if step == 0.0 {
        return Err(CoreError::InvalidRange {
            what: "step must be non-zero".to_string(),
        });
    }

    let span = stop - start;
    if span == 0.0 || span.signum() != step.signum() {
        return Err(CoreError::InvalidRange {
            what: format!("range {start}..{stop} with step {step} is empty"),
        });
    }

    // Relative slack keeps 0.1-style steps from producing an extra point at `stop`.
    let raw = span / step;
    let count = (raw - raw.abs() * 1e-9).ceil().max(0.0) as usize;

    Ok((0..count).map(|i| start + i as Real * step).collect())
}

/// Format a coordinate the way persisted artifact names expect it.
///
/// Shortest round-trip decimal; whole numbers keep a single trailing `.0`.
pub fn format_coordinate(value: Real) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

/// Format a sweep value for use in directory and file names.
///
/// Whole numbers print without a fractional part (`5`, not `5.0`).
pub fn format_step_value(value: Real) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}
