use crate::error::AnalysisError;

/// Copies the `window_size` samples that end at `frame_number * frame_offset`.
///
/// Frames that reach back before the start of the buffer are zero-padded on
/// the left. Frame 0 has no history and is all zeros.
pub fn extract_frame<T>(
    buffer: &[T],
    frame_number: usize,
    frame_offset: usize,
    window_size: usize,
) -> Result<Vec<f64>, AnalysisError>
where
    T: Copy + Into<f64>,
{
    let end = frame_number
        .checked_mul(frame_offset)
        .ok_or_else(|| AnalysisError::malformed(frame_number, "frame end overflows"))?;

    if end == 0 {
        return Ok(vec![0.0; window_size]);
    }

    if end > buffer.len() {
        return Err(AnalysisError::malformed(
            frame_number,
            format!("ends at sample {end} but buffer holds {}", buffer.len()),
        ));
    }

    let mut frame = Vec::with_capacity(window_size);
    let begin = match end.checked_sub(window_size) {
        Some(begin) => begin,
        None => {
            frame.resize(window_size - end, 0.0);
            0
        }
    };
    frame.extend(buffer[begin..end].iter().map(|&s| s.into()));

    Ok(frame)
}
