pub mod bounding_box;
pub mod detection;
pub mod detector_initializer;
pub mod detector_options;
pub mod object_detector;
pub mod timestamp_guard;
