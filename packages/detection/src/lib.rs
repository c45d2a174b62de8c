//! Purple/lavender blob detection for listing photos.
//!
//! This is a coarse color+shape heuristic, not object recognition: it
//! flags images containing a connected purple/lavender region of
//! plausible object shape. It cannot tell a purple duck from any other
//! purple object of similar size and solidity - that is an accepted
//! limitation of the approach.
//!
//! The pipeline is: downscale, HSV conversion, multi-range color mask,
//! morphological cleanup, connected-component analysis, then an
//! area/solidity/aspect decision on the largest blob.
//!
//! # Example
//!
//! ```rust,ignore
//! use detection::{detect_purple_blob, DetectConfig};
//!
//! let config = DetectConfig::default().with_min_area(1000);
//! if detect_purple_blob("photo.jpg", &config)? {
//!     println!("possible purple duck!");
//! }
//! ```

mod blob;
mod config;
mod detect;
mod error;
mod hsv;
mod mask;

pub use config::DetectConfig;
pub use detect::{detect_in_image, detect_purple_blob};
pub use error::{DetectError, Result};
