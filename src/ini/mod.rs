//! Upscaler INI codec
//!
//! Reads and rewrites `OptiScaler.ini` in place: a line-preserving document,
//! label/code tables per option family, and the typed option record that
//! ties them together.

mod document;
pub mod mapping;
mod options;

pub use document::IniDocument;
pub use mapping::{FrameGenMode, GpuSpoof, GraphicsApi, OptionTable, QualityMode, UpscalerBackend};
pub use options::{
    apply_options, load_options, read_options, read_upscaler_codes, write_options, ScalerOptions,
    UpscalerCodes,
};
