use ndarray::{Array2, ArrayView2, Axis};

use super::model::{CoreError, FRAME_RATE};

/// Longest single phoneme the regulator expands, in seconds.
pub const MAX_PHONEME_SECS: f32 = 60.0;

/// Feature frames covered by a phoneme lasting `duration` seconds.
///
/// Negative and NaN durations cover no frames.
pub fn frame_count(duration: f32) -> usize {
    (duration * FRAME_RATE).round().max(0.0) as usize
}

/// Expand per-phoneme feature rows into per-frame rows.
///
/// Row `i` of `features` is repeated `frame_count(durations[i])` times; a
/// phoneme whose duration rounds to zero frames disappears. NaN durations and
/// durations above [`MAX_PHONEME_SECS`] are rejected.
pub fn length_regulate(
    features: ArrayView2<'_, f32>,
    durations: &[f32],
) -> Result<Array2<f32>, CoreError> {
    let (phonemes, hidden) = features.dim();
    if phonemes != durations.len() {
        return Err(CoreError::Shape(ndarray::ShapeError::from_kind(
            ndarray::ErrorKind::IncompatibleShape,
        )));
    }

    let mut counts = Vec::with_capacity(durations.len());
    let mut total: usize = 0;
    for &duration in durations {
        if duration.is_nan() || duration > MAX_PHONEME_SECS {
            return Err(CoreError::OutOfRange {
                what: "phoneme duration",
                value: duration,
            });
        }
        let count = frame_count(duration);
        total = total.checked_add(count).ok_or(CoreError::OutOfRange {
            what: "phoneme duration",
            value: duration,
        })?;
        counts.push(count);
    }
    if total.checked_mul(hidden).is_none() {
        return Err(CoreError::Shape(ndarray::ShapeError::from_kind(
            ndarray::ErrorKind::Overflow,
        )));
    }

    let mut regulated = Array2::<f32>::zeros((total, hidden));
    let mut frame = 0;
    for (row, &count) in features.axis_iter(Axis(0)).zip(&counts) {
        for _ in 0..count {
            regulated.row_mut(frame).assign(&row);
            frame += 1;
        }
    }
    Ok(regulated)
}
