//! Frame decoding and feature extractor implementations

mod frame;
mod landmark;

pub use frame::decode_frame;
pub use landmark::LandmarkPayloadExtractor;
