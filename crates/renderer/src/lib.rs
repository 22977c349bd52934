//! Drawing backends for snapshot views.
//!
//! - [`CommandDrawer`] hands each view to an external plotting program.
//! - [`PreviewDrawer`] rasterizes a built-in colormap preview.

pub mod colormap;
pub mod command;
pub mod png;
pub mod preview;

pub use colormap::{Color, Colormap, COLORMAP_NAMES};
pub use command::CommandDrawer;
pub use png::{create_png, create_png_auto, PngError};
pub use preview::{PreviewDrawer, SHORT_SIDE_INCHES};
