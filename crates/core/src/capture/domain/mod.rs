pub mod capture_error;
pub mod facing_mode;
pub mod media_devices;
pub mod media_stream;
pub mod video_sink;
