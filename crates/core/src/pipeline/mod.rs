pub mod detection_session;
pub mod frame_driver;
pub mod frame_report;
pub mod infrastructure;
pub mod session_error;
pub mod session_logger;
pub mod session_options;
pub mod session_state;
pub mod video_clock;
