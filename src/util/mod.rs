mod stats;

pub use stats::Stats;

pub type Rgb = rgb::RGB<f32>;

/// Converts a linear color channel to an 8 bit sRGB value.
pub fn linear_to_srgb8(value: f32) -> u8 {
    let value = value.clamp(0.0, 1.0);
    let encoded = if value <= 0.003_130_8 {
        value * 12.92
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    };
    (encoded * 255.0).round() as u8
}
