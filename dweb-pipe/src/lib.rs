//! Page loading for dweb.
//!
//! - [`links`]: the fixed-size table of numbered links scraped from a page
//! - [`pipe`]: the `browser | scanner | pager` pipeline behind the [`Renderer`] trait
pub mod links;
pub mod pipe;

pub use links::{LINK_CAPACITY, LinkLookupError, LinkTable};
pub use pipe::{PipeRenderer, RenderReport, Renderer};
