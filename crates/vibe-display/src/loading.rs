//! Loading indicator shown while a purchase is in flight.
//!
//! The indicator is stateless: callers keep their own tick counter and ask
//! for the frame to draw. Frames are plain text so they render the same in a
//! terminal and in a log line.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const ACTIVE: char = '◆';
const INACTIVE: char = '◇';

/// Suggested delay between two frames.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(120);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadingSize {
	Small,
	#[default]
	Medium,
	Large,
}

impl LoadingSize {
	/// Number of glyphs in one frame.
	pub fn width(self) -> usize {
		match self {
			LoadingSize::Small => 3,
			LoadingSize::Medium => 5,
			LoadingSize::Large => 7,
		}
	}
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown loading indicator size '{0}', expected small, medium or large")]
pub struct ParseSizeError(String);

impl FromStr for LoadingSize {
	type Err = ParseSizeError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"small" | "sm" => Ok(LoadingSize::Small),
			"medium" | "md" => Ok(LoadingSize::Medium),
			"large" | "lg" => Ok(LoadingSize::Large),
			_ => Err(ParseSizeError(s.to_string())),
		}
	}
}

impl fmt::Display for LoadingSize {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			LoadingSize::Small => write!(f, "small"),
			LoadingSize::Medium => write!(f, "medium"),
			LoadingSize::Large => write!(f, "large"),
		}
	}
}

/// Something that can draw itself one frame at a time.
pub trait LoadingIndicator {
	fn frame(&self, tick: usize) -> String;
}

/// Geometric spinner: a row of diamonds with one filled diamond sweeping back
/// and forth, optionally followed by a caption.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoLoading {
	pub size: LoadingSize,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub text: Option<String>,
}

impl GeoLoading {
	pub fn new(size: LoadingSize) -> Self {
		Self { size, text: None }
	}

	pub fn with_text(mut self, text: impl Into<String>) -> Self {
		self.text = Some(text.into());
		self
	}

	/// Index of the filled glyph for `tick`. Sweeps right then left without
	/// repeating the end glyphs.
	fn position(&self, tick: usize) -> usize {
		let width = self.size.width();
		let period = 2 * (width - 1);
		let phase = tick % period;
		if phase < width {
			phase
		} else {
			period - phase
		}
	}
}

impl LoadingIndicator for GeoLoading {
	fn frame(&self, tick: usize) -> String {
		let active = self.position(tick);
		let mut frame: String = (0..self.size.width())
			.map(|i| if i == active { ACTIVE } else { INACTIVE })
			.collect();

		if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
			frame.push(' ');
			frame.push_str(text);
		}
		frame
	}
}
