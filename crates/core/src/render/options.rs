//! Rendering options: a closed description of how a sticker is drawn.
//!
//! Options carry no drawing behaviour. Every field is an integer so options
//! can be hashed into cache keys; unspecified fields mean "no border", "no
//! shadow" and "source-native size". [`RenderingOptions::validate`] bounds
//! every dimension so the composed canvas stays small.

use std::fmt;

use image::Rgba;

use crate::error::{Error, Result};

/// Largest accepted side of a target size.
pub const MAX_TARGET_SIDE: u32 = 4096;
/// Largest accepted border width.
pub const MAX_BORDER_WIDTH: u32 = 128;
/// Largest accepted shadow blur radius.
pub const MAX_SHADOW_BLUR: u32 = 128;
/// Largest accepted shadow offset on either axis.
pub const MAX_SHADOW_OFFSET: u32 = 256;

/// Target bounding box in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Size {
	pub width: u32,
	pub height: u32,
}

impl Size {
	pub const fn new(width: u32, height: u32) -> Self {
		Self { width, height }
	}

	pub const fn square(side: u32) -> Self {
		Self::new(side, side)
	}

	pub fn longest_side(&self) -> u32 {
		self.width.max(self.height)
	}
}

/// Straight (non-premultiplied) RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
	pub r: u8,
	pub g: u8,
	pub b: u8,
	pub a: u8,
}

impl Color {
	pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
	pub const BLACK: Color = Color::rgba(0, 0, 0, 255);

	pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
		Self { r, g, b, a }
	}

	/// Parses `#RRGGBB` or `#RRGGBBAA` (the `#` is optional).
	pub fn parse_hex(input: &str) -> Option<Self> {
		let hex = input.strip_prefix('#').unwrap_or(input);
		if !(hex.len() == 6 || hex.len() == 8) || !hex.is_ascii() {
			return None;
		}
		let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
		let alpha = if hex.len() == 8 { channel(6)? } else { 255 };
		Some(Self::rgba(channel(0)?, channel(2)?, channel(4)?, alpha))
	}

	pub(crate) fn with_coverage(self, coverage: u8) -> Rgba<u8> {
		let alpha = (u16::from(self.a) * u16::from(coverage) / 255) as u8;
		Rgba([self.r, self.g, self.b, alpha])
	}
}

impl fmt::Display for Color {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
	}
}

/// Outline drawn around the sticker silhouette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BorderStyle {
	/// Outline thickness in pixels.
	pub width: u32,
	pub color: Color,
}

impl Default for BorderStyle {
	fn default() -> Self {
		Self {
			width: 6,
			color: Color::WHITE,
		}
	}
}

/// Drop shadow cast by the (bordered) silhouette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShadowStyle {
	pub offset_x: i32,
	pub offset_y: i32,
	/// Blur radius in pixels; zero gives a hard shadow.
	pub blur: u32,
	pub color: Color,
}

impl Default for ShadowStyle {
	fn default() -> Self {
		Self {
			offset_x: 0,
			offset_y: 2,
			blur: 3,
			color: Color::rgba(0, 0, 0, 96),
		}
	}
}

/// How to render a sticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RenderingOptions {
	/// Bounding box the final image must fit; `None` keeps the source size.
	pub target_size: Option<Size>,
	pub border: Option<BorderStyle>,
	pub shadow: Option<ShadowStyle>,
}

impl RenderingOptions {
	/// Default border and shadow, fitted to `size`.
	pub fn bordered(size: Size) -> Self {
		Self {
			target_size: Some(size),
			border: Some(BorderStyle::default()),
			shadow: Some(ShadowStyle::default()),
		}
	}

	/// No decoration, fitted to `size`.
	pub fn borderless(size: Size) -> Self {
		Self {
			target_size: Some(size),
			..Self::default()
		}
	}

	pub fn with_target_size(mut self, size: Option<Size>) -> Self {
		self.target_size = size;
		self
	}

	pub fn with_border(mut self, border: Option<BorderStyle>) -> Self {
		self.border = border;
		self
	}

	pub fn with_shadow(mut self, shadow: Option<ShadowStyle>) -> Self {
		self.shadow = shadow;
		self
	}

	/// Transparent margin added on every side to make room for decoration.
	pub fn decoration_padding(&self) -> u32 {
		let border = self.border.map_or(0, |border| border.width);
		let shadow = self.shadow.map_or(0, |shadow| {
			let offset = shadow.offset_x.unsigned_abs().max(shadow.offset_y.unsigned_abs());
			shadow.blur.saturating_mul(2).saturating_add(offset)
		});
		border.saturating_add(shadow)
	}

	pub fn is_decorated(&self) -> bool {
		self.border.is_some() || self.shadow.is_some()
	}

	/// Checks every dimension against the `MAX_*` limits.
	///
	/// # Errors
	///
	/// [`Error::InvalidArgument`] naming the first field out of range.
	pub fn validate(&self) -> Result<()> {
		if let Some(size) = self.target_size {
			if size.width == 0 || size.height == 0 || size.longest_side() > MAX_TARGET_SIDE {
				return Err(Error::InvalidArgument(format!(
					"target size {}x{} must be between 1 and {MAX_TARGET_SIDE} on each side",
					size.width, size.height
				)));
			}
		}
		if let Some(border) = self.border {
			if border.width > MAX_BORDER_WIDTH {
				return Err(Error::InvalidArgument(format!(
					"border width {} exceeds {MAX_BORDER_WIDTH}",
					border.width
				)));
			}
		}
		if let Some(shadow) = self.shadow {
			if shadow.blur > MAX_SHADOW_BLUR {
				return Err(Error::InvalidArgument(format!("shadow blur {} exceeds {MAX_SHADOW_BLUR}", shadow.blur)));
			}
			let offset = shadow.offset_x.unsigned_abs().max(shadow.offset_y.unsigned_abs());
			if offset > MAX_SHADOW_OFFSET {
				return Err(Error::InvalidArgument(format!("shadow offset {offset} exceeds {MAX_SHADOW_OFFSET}")));
			}
		}
		Ok(())
	}
}
