//! Frame-to-time conversion, confidence scoring, interpolation of unreliable
//! words and LRC rendering.

pub mod confidence;
pub mod interpolate;
pub mod lrc;
pub mod timestamps;

pub use confidence::ConfidenceCalculator;
pub use interpolate::LowConfidenceInterpolator;
pub use lrc::{LrcGenerator, LrcParser};
pub use timestamps::{TimestampConverter, TimestampedPhoneme};
