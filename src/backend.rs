use candle_core::{Device, Tensor};
use candle_nn::Module;

use crate::{error::DetectorError, tensor::RawTensor};

/// Runs the detection network on a preprocessed frame.
pub trait InferenceBackend {
    /// Device the input tensor has to live on.
    fn device(&self) -> &Device;

    /// Run the network on a `[1, 3, H, W]` input in `[0, 1]`.
    ///
    /// Implementations return [`DetectorError::BackendUnavailable`] when the
    /// backend can no longer run at all; any other error only affects the
    /// current frame.
    fn infer(&mut self, input: &Tensor) -> Result<RawTensor, DetectorError>;
}

/// Backend running any candle module on the CPU or a CUDA device.
pub struct CandleBackend<M> {
    model: M,
    device: Device,
}

impl<M: Module> CandleBackend<M> {
    /// Wrap `model`, whose weights already live on `device`.
    pub fn new(model: M, device: Device) -> Self {
        Self { model, device }
    }

    /// Pick the device a model should be loaded on.
    pub fn select_device(use_cpu: bool) -> Result<Device, DetectorError> {
        if use_cpu {
            Ok(Device::Cpu)
        } else {
            Device::cuda_if_available(0)
                .map_err(|e| DetectorError::BackendUnavailable(format!("cuda:0 error: {e}")))
        }
    }
}

impl<M: Module> InferenceBackend for CandleBackend<M> {
    fn device(&self) -> &Device {
        &self.device
    }

    fn infer(&mut self, input: &Tensor) -> Result<RawTensor, DetectorError> {
        let pred = self.model.forward(input)?;
        RawTensor::from_tensor(&pred)
    }
}
