//! Input data: the country preset catalog and the snapshot synthesizer.

pub mod presets;
pub mod synth;

pub use presets::{COUNTRIES, PRESETS, Preset, lookup};
pub use synth::{synthesize, synthesize_with};
