//! Labeeb Vision crate - the phone-use watch.
//!
//! Object detection is an external collaborator reached through
//! [`ObjectDetector`]. The watch only ever speaks; it never touches the task
//! store or the dialog session.

pub mod detector;
pub mod watch;

pub use detector::{BoundingBox, Detections, HttpDetector, ObjectDetector};
pub use watch::{run_phone_watch, PhoneWatch};
