use ort::execution_providers::ExecutionProviderDispatch;

use crate::detection::domain::detector_initializer::DetectorInitError;
use crate::detection::domain::detector_options::Delegate;

/// Map a delegate to the ONNX execution providers that back it.
///
/// GPU maps to the platform's accelerated provider; platforms without one
/// reject the GPU delegate instead of silently running on CPU.
pub fn execution_providers_for(
    delegate: Delegate,
) -> Result<Vec<ExecutionProviderDispatch>, DetectorInitError> {
    match delegate {
        Delegate::Cpu => Ok(vec![
            ort::execution_providers::CPUExecutionProvider::default().build(),
        ]),
        Delegate::Gpu => gpu_execution_providers(),
    }
}

fn gpu_execution_providers() -> Result<Vec<ExecutionProviderDispatch>, DetectorInitError> {
    #[cfg(target_os = "macos")]
    {
        Ok(vec![
            ort::execution_providers::CoreMLExecutionProvider::default().build(),
        ])
    }
    #[cfg(target_os = "windows")]
    {
        Ok(vec![
            ort::execution_providers::DirectMLExecutionProvider::default().build(),
        ])
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        Err(DetectorInitError::UnsupportedDelegate(Delegate::Gpu))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_delegate_always_available() {
        let providers = execution_providers_for(Delegate::Cpu).unwrap();
        assert_eq!(providers.len(), 1);
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    #[test]
    fn test_gpu_delegate_rejected_without_accelerator() {
        assert!(matches!(
            execution_providers_for(Delegate::Gpu),
            Err(DetectorInitError::UnsupportedDelegate(Delegate::Gpu))
        ));
    }
}
