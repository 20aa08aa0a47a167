pub mod background_initializer;
pub mod ticker_frame_driver;
