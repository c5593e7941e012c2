//! Audio glue over FFmpeg: chapter concatenation and M4B packaging.

mod ffmpeg;
mod metadata;
pub mod packager;

pub use ffmpeg::Ffmpeg;
pub use packager::{package_m4b, write_cover_image};
