mod backend;
mod bitmap;
mod pipeline;
mod recording;
mod wgpu_backend;

pub use backend::{RasterBackend, TextFormat};
pub use bitmap::{AtlasHandle, Bitmap, RENDER_LAYER_COUNT, RENDER_LAYER_MAX};
pub use pipeline::{draw_bitmap, draw_layers, stroke_colliders};
pub use recording::{last_frame, DrawCommand, DrawLog, RecordingBackend};
pub use wgpu_backend::WgpuBackend;
