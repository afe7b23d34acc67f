//! Presentational helpers shared by the market front ends.
//!
//! Nothing here touches the chain or the purchase lifecycle; every function
//! is a pure mapping from inputs to something a terminal or page can render.

pub mod color;
pub mod loading;

pub use color::generate_color_from_address;
pub use loading::{GeoLoading, LoadingIndicator, LoadingSize, ParseSizeError};
