// Down-sampling of long recordings to a bounded point budget
use crate::domain::telemetry::Sample;
use std::borrow::Cow;

/// Point budget tuned near the number of points a chart renders well.
pub const DEFAULT_DOWN_SAMPLE_BUDGET: usize = 600;

/// Reduce `samples` to exactly `budget` points by piecewise-linear
/// interpolation. Inputs already within budget are returned as-is.
pub fn down_sample(samples: &[Sample], budget: usize) -> Cow<'_, [Sample]> {
    if budget == 0 || samples.len() <= budget {
        return Cow::Borrowed(samples);
    }

    let last = samples.len() - 1;
    let step = samples.len() as f64 / budget as f64;

    let reduced = (0..budget)
        .map(|i| {
            let index = i as f64 * step;
            let lower = (index.floor() as usize).min(last);
            let upper = (index.ceil() as usize).min(last);
            let t = index - lower as f64;

            let a = samples[lower];
            let b = samples[upper];
            Sample::new(a.time + (b.time - a.time) * t, a.value + (b.value - a.value) * t)
        })
        .collect();

    Cow::Owned(reduced)
}
