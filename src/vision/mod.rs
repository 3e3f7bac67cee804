//! Screenshot analysis: flash classification, blob expansion and region detection

pub mod annotate;
pub mod classifier;
pub mod detector;
pub mod flood_fill;

pub use annotate::AnnotationStyle;
pub use classifier::{ChannelRange, ColorBand, FlashPolicy};
pub use detector::{
    decode_rgba, encode_png, Detection, DetectorOptions, Rectangle, Region, RegionDetector,
};
pub use flood_fill::{flood_fill, Blob, VisitedMask};
