//! Data Augmentation Module
//!
//! The fixed augmentation policy applied to the training split only:
//! random rotation, width/height shift, shear, zoom and horizontal flip,
//! with edge-clamp fill. Implemented as a single random inverse-affine
//! resample with nearest-neighbor sampling.

use image::RgbImage;
use rand::Rng;

/// Ranges for the augmentation policy
#[derive(Debug, Clone)]
pub struct AugmentConfig {
    /// Maximum rotation in degrees (sampled from [-r, r])
    pub rotation_degrees: f32,
    /// Maximum shift as a fraction of width/height
    pub shift_fraction: f32,
    /// Maximum shear intensity in radians
    pub shear: f32,
    /// Maximum zoom deviation (zoom sampled from [1-z, 1+z])
    pub zoom: f32,
    /// Whether to apply random horizontal flips
    pub horizontal_flip: bool,
}

impl Default for AugmentConfig {
    fn default() -> Self {
        Self {
            rotation_degrees: 20.0,
            shift_fraction: 0.1,
            shear: 0.1,
            zoom: 0.1,
            horizontal_flip: true,
        }
    }
}

/// Applies the augmentation policy to training images
#[derive(Debug, Clone, Default)]
pub struct Augmenter {
    config: AugmentConfig,
}

impl Augmenter {
    pub fn new(config: AugmentConfig) -> Self {
        Self { config }
    }

    /// Apply one random augmentation draw to an image
    pub fn apply<R: Rng>(&self, img: &RgbImage, rng: &mut R) -> RgbImage {
        let c = &self.config;

        let theta = sample_range(rng, c.rotation_degrees).to_radians();
        let shear = sample_range(rng, c.shear);
        let zoom = 1.0 + sample_range(rng, c.zoom);
        let tx = sample_range(rng, c.shift_fraction) * img.width() as f32;
        let ty = sample_range(rng, c.shift_fraction) * img.height() as f32;

        let mut out = affine_resample(img, theta, shear, zoom, tx, ty);

        if c.horizontal_flip && rng.gen_bool(0.5) {
            image::imageops::flip_horizontal_in_place(&mut out);
        }

        out
    }
}

fn sample_range<R: Rng>(rng: &mut R, max: f32) -> f32 {
    if max > 0.0 {
        rng.gen_range(-max..=max)
    } else {
        0.0
    }
}

/// Resample `img` through the affine transform rotate(theta) * shear(s) *
/// zoom(z) about the image center, followed by a (tx, ty) translation.
///
/// Out-of-bounds source coordinates are clamped to the nearest edge pixel,
/// matching a nearest fill mode.
fn affine_resample(img: &RgbImage, theta: f32, shear: f32, zoom: f32, tx: f32, ty: f32) -> RgbImage {
    let (w, h) = img.dimensions();
    let cx = (w as f32 - 1.0) / 2.0;
    let cy = (h as f32 - 1.0) / 2.0;

    // Forward 2x2 matrix: rotation * shear * zoom
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_s, cos_s) = shear.sin_cos();
    let a = zoom * cos_t;
    let b = zoom * (-cos_t * sin_s - sin_t * cos_s);
    let c = zoom * sin_t;
    let d = zoom * (-sin_t * sin_s + cos_t * cos_s);

    // Inverse for destination-to-source mapping
    let det = a * d - b * c;
    let det = if det.abs() < 1e-6 { 1e-6 } else { det };
    let ia = d / det;
    let ib = -b / det;
    let ic = -c / det;
    let id = a / det;

    let mut out = RgbImage::new(w, h);
    for yo in 0..h {
        for xo in 0..w {
            let dx = xo as f32 - cx - tx;
            let dy = yo as f32 - cy - ty;

            let xs = ia * dx + ib * dy + cx;
            let ys = ic * dx + id * dy + cy;

            let xs = (xs.round().max(0.0) as u32).min(w - 1);
            let ys = (ys.round().max(0.0) as u32).min(h - 1);

            out.put_pixel(xo, yo, *img.get_pixel(xs, ys));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn gradient_image(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 8) as u8, (y * 8) as u8, ((x + y) * 4) as u8])
        })
    }

    #[test]
    fn test_dimensions_preserved() {
        let img = gradient_image(24, 24);
        let augmenter = Augmenter::default();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let out = augmenter.apply(&img, &mut rng);
        assert_eq!(out.dimensions(), (24, 24));
    }

    #[test]
    fn test_deterministic_for_same_seed() {
        let img = gradient_image(16, 16);
        let augmenter = Augmenter::default();

        let mut rng_a = ChaCha8Rng::seed_from_u64(42);
        let mut rng_b = ChaCha8Rng::seed_from_u64(42);

        let out_a = augmenter.apply(&img, &mut rng_a);
        let out_b = augmenter.apply(&img, &mut rng_b);
        assert_eq!(out_a.as_raw(), out_b.as_raw());
    }

    #[test]
    fn test_zero_config_without_flip_is_identity() {
        let img = gradient_image(16, 16);
        let augmenter = Augmenter::new(AugmentConfig {
            rotation_degrees: 0.0,
            shift_fraction: 0.0,
            shear: 0.0,
            zoom: 0.0,
            horizontal_flip: false,
        });
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let out = augmenter.apply(&img, &mut rng);
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn test_affine_identity_resample() {
        let img = gradient_image(12, 12);
        let out = affine_resample(&img, 0.0, 0.0, 1.0, 0.0, 0.0);
        assert_eq!(out.as_raw(), img.as_raw());
    }

    #[test]
    fn test_shift_moves_pixels() {
        let img = gradient_image(12, 12);
        // Shift right by 3 pixels: output pixel (3+x, y) samples source (x, y)
        let out = affine_resample(&img, 0.0, 0.0, 1.0, 3.0, 0.0);
        assert_eq!(out.get_pixel(5, 4), img.get_pixel(2, 4));
    }
}
