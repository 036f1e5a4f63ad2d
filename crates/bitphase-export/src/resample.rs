//! Linear-interpolation resampling of interleaved audio.

/// Resamples interleaved `input` from `from_rate` to `to_rate`.
///
/// Returns the input unchanged when the rates match.
pub fn resample_linear(input: &[f32], channels: usize, from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || channels == 0 || input.is_empty() {
        return input.to_vec();
    }
    let frames_in = input.len() / channels;
    let frames_out = (frames_in as u64 * u64::from(to_rate) / u64::from(from_rate)) as usize;
    let step = f64::from(from_rate) / f64::from(to_rate);

    let mut output = Vec::with_capacity(frames_out * channels);
    for frame in 0..frames_out {
        let position = frame as f64 * step;
        let index = (position.floor() as usize).min(frames_in - 1);
        let next = (index + 1).min(frames_in - 1);
        let frac = (position - index as f64) as f32;
        for channel in 0..channels {
            let a = input[index * channels + channel];
            let b = input[next * channels + channel];
            output.push(a + (b - a) * frac);
        }
    }
    output
}
