//! Pure image composition: decode, fit, outline, shadow.

use std::io::Cursor;

use image::imageops::{self, FilterType};
use image::{GrayImage, ImageFormat, Luma, RgbaImage};

use super::options::{Color, RenderingOptions};
use crate::error::{Error, Result};

/// Decodes any supported still-image format into RGBA pixels.
pub fn decode(bytes: &[u8]) -> Result<RgbaImage> {
	let image = image::load_from_memory(bytes).map_err(|err| Error::InvalidImage(format!("failed to decode image: {err}")))?;
	let image = image.to_rgba8();
	if image.width() == 0 || image.height() == 0 {
		return Err(Error::InvalidImage("image has no pixels".to_string()));
	}
	Ok(image)
}

/// Encodes `image` as PNG.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
	let mut bytes = Vec::new();
	image
		.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
		.map_err(|err| Error::InvalidImage(format!("failed to encode image: {err}")))?;
	Ok(bytes)
}

/// Applies `options` to `source` and returns the finished bitmap.
///
/// The sticker is scaled to fit the target size (aspect preserved, decoration
/// included), then outlined and shadowed. Layers are drawn shadow first,
/// border second, sticker on top.
///
/// # Errors
///
/// [`Error::InvalidArgument`] if `options` fail [`RenderingOptions::validate`],
/// [`Error::InvalidImage`] if the source is empty or does not fit.
pub fn compose(source: &RgbaImage, options: &RenderingOptions) -> Result<RgbaImage> {
	options.validate()?;
	if source.width() == 0 || source.height() == 0 {
		return Err(Error::InvalidImage("image has no pixels".to_string()));
	}

	let pad = options.decoration_padding();
	let content = fit(source, options, pad)?;
	if !options.is_decorated() {
		return Ok(content);
	}

	let padded = |side: u32| {
		pad.checked_mul(2)
			.and_then(|margin| side.checked_add(margin))
			.ok_or_else(|| Error::InvalidImage(format!("{pad}px of decoration overflows the canvas")))
	};
	let width = padded(content.width())?;
	let height = padded(content.height())?;
	let mut sticker = RgbaImage::new(width, height);
	imageops::overlay(&mut sticker, &content, i64::from(pad), i64::from(pad));

	let mut silhouette = GrayImage::from_fn(width, height, |x, y| Luma([sticker.get_pixel(x, y).0[3]]));
	let mut border_layer = None;
	if let Some(border) = options.border.filter(|border| border.width > 0) {
		silhouette = dilate(&silhouette, border.width);
		border_layer = Some(tint(&silhouette, border.color));
	}

	let mut canvas = RgbaImage::new(width, height);
	if let Some(shadow) = options.shadow {
		let mask = if shadow.blur > 0 {
			imageops::blur(&silhouette, shadow.blur as f32)
		} else {
			silhouette.clone()
		};
		imageops::overlay(&mut canvas, &tint(&mask, shadow.color), i64::from(shadow.offset_x), i64::from(shadow.offset_y));
	}
	if let Some(layer) = border_layer {
		imageops::overlay(&mut canvas, &layer, 0, 0);
	}
	imageops::overlay(&mut canvas, &sticker, 0, 0);

	Ok(canvas)
}

fn fit(source: &RgbaImage, options: &RenderingOptions, pad: u32) -> Result<RgbaImage> {
	let Some(target) = options.target_size else {
		return Ok(source.clone());
	};

	let margin = pad.saturating_mul(2);
	let available_width = target.width.saturating_sub(margin);
	let available_height = target.height.saturating_sub(margin);
	if available_width == 0 || available_height == 0 {
		return Err(Error::InvalidImage(format!(
			"target size {}x{} leaves no room after {pad}px of decoration",
			target.width, target.height
		)));
	}

	let scale = f64::min(
		f64::from(available_width) / f64::from(source.width()),
		f64::from(available_height) / f64::from(source.height()),
	);
	let width = ((f64::from(source.width()) * scale).round() as u32).clamp(1, available_width);
	let height = ((f64::from(source.height()) * scale).round() as u32).clamp(1, available_height);

	if (width, height) == source.dimensions() {
		return Ok(source.clone());
	}
	Ok(imageops::resize(source, width, height, FilterType::Lanczos3))
}

/// Grows the mask by `radius` pixels using a disc-shaped structuring element.
fn dilate(mask: &GrayImage, radius: u32) -> GrayImage {
	let r = radius as i64;
	let offsets: Vec<(i64, i64)> = (-r..=r)
		.flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
		.filter(|(dx, dy)| dx * dx + dy * dy <= r * r)
		.collect();

	let (width, height) = (i64::from(mask.width()), i64::from(mask.height()));
	GrayImage::from_fn(mask.width(), mask.height(), |x, y| {
		let mut coverage = 0u8;
		for (dx, dy) in &offsets {
			let (sx, sy) = (i64::from(x) + dx, i64::from(y) + dy);
			if sx < 0 || sy < 0 || sx >= width || sy >= height {
				continue;
			}
			coverage = coverage.max(mask.get_pixel(sx as u32, sy as u32).0[0]);
			if coverage == u8::MAX {
				break;
			}
		}
		Luma([coverage])
	})
}

fn tint(mask: &GrayImage, color: Color) -> RgbaImage {
	RgbaImage::from_fn(mask.width(), mask.height(), |x, y| color.with_coverage(mask.get_pixel(x, y).0[0]))
}
