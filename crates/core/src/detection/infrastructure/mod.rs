pub mod coco_labels;
pub mod execution_provider;
pub mod model_resolver;
pub mod onnx_detector_initializer;
pub mod onnx_object_detector;
