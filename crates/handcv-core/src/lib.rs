//! handcv core
//!
//! Pixel containers and the bridge that moves pixels between platform bitmaps and the
//! vision library's matrices. Nothing in here knows about vision operations.

pub mod bitmap;
pub mod bridge;
pub mod error;
pub mod layout;
pub mod legacy;
pub mod matrix;

pub use bitmap::{Bitmap, Rotation};
pub use bridge::{Bridge, PlatformProfile};
pub use error::BridgeError;
pub use layout::{ChannelOrder, Depth, LayoutPlan, Origin, PixelLayout, reconcile, transcode};
pub use legacy::LegacyImage;
pub use matrix::Matrix;
