//! Background colour estimation around a text box

use crate::config::BackgroundConfig;
use crate::document::backend::PageHandle;
use crate::domain::geometry::{Point, Rect, Rgb};
use image::RgbImage;

/// Estimates the paper colour behind a rectangle
///
/// Samples a ring just outside the rectangle, discards dark (ink) pixels and
/// takes the per-channel median of what is left.
#[derive(Debug, Clone)]
pub struct BackgroundSampler {
    config: BackgroundConfig,
}

impl BackgroundSampler {
    pub fn new(config: BackgroundConfig) -> Self {
        Self { config }
    }

    /// Colour used when sampling is inconclusive
    pub fn fallback(&self) -> Rgb {
        let [r, g, b] = self.config.fallback_color;
        Rgb::new(r, g, b)
    }

    /// Fill colour for `rect`; never fails
    pub fn sample(&self, page: &dyn PageHandle, rect: &Rect) -> Rgb {
        let outer = rect.inflate(self.config.margin + self.config.ring);
        let inner = rect.inflate(self.config.margin);

        let image = match page.render_region(&outer) {
            Ok(image) => image,
            Err(e) => {
                tracing::debug!(page = page.index(), error = %e, "Background render failed");
                return self.fallback();
            }
        };

        self.median_of_ring(&image, &outer, &inner)
            .unwrap_or_else(|| self.fallback())
    }

    fn median_of_ring(&self, image: &RgbImage, outer: &Rect, inner: &Rect) -> Option<Rgb> {
        let (w, h) = image.dimensions();
        if w == 0 || h == 0 {
            return None;
        }
        let scale_x = outer.width() / w as f64;
        let scale_y = outer.height() / h as f64;

        let mut channels: [Vec<u8>; 3] = Default::default();
        for (px, py, pixel) in image.enumerate_pixels() {
            let at = Point::new(
                outer.x0 + (px as f64 + 0.5) * scale_x,
                outer.y0 + (py as f64 + 0.5) * scale_y,
            );
            if inner.contains(&at) {
                continue;
            }
            let [r, g, b] = pixel.0;
            if Rgb::luminance_u8(r, g, b) <= self.config.min_luminance {
                continue;
            }
            for (channel, value) in channels.iter_mut().zip([r, g, b]) {
                channel.push(value);
            }
        }

        if channels[0].is_empty() || channels[0].len() < self.config.min_samples {
            tracing::trace!(samples = channels[0].len(), "Too few background samples");
            return None;
        }

        let [r, g, b] = channels.map(|mut c| median(&mut c) / 255.0);
        Some(Rgb::new(r, g, b))
    }
}

fn median(values: &mut [u8]) -> f32 {
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] as f32 + values[mid] as f32) / 2.0
    } else {
        values[mid] as f32
    }
}
