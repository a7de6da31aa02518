mod blur;
pub mod draw;
mod mask;

pub use blur::{blur_support, box_radii_for_gaussian, gaussian_blur, gaussian_blurred};
pub use draw::Ellipse;
pub use mask::{masked_copy, subtract_alpha, union_alpha, AlphaMask, RasterError};
