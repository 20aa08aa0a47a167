pub mod canvas;
pub mod detection_renderer;
