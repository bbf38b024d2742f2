use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
use serde::{Deserialize, Serialize};

/// Host backend used for evaluation and as the inner backend of training.
pub type CpuBackend = NdArray<f32>;

/// Autodiff backend used by the training loop on the host.
pub type CpuTrainBackend = Autodiff<CpuBackend>;

#[cfg(feature = "gpu")]
pub type WgpuBackend = burn::backend::Wgpu;

#[cfg(feature = "gpu")]
pub type WgpuTrainBackend = Autodiff<WgpuBackend>;

/// Where tensors live for the whole pipeline. Mixed placement is not supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Cpu,
    /// WGPU adapter chosen by burn (Metal on macOS). Requires the `gpu` feature.
    Gpu,
}

impl DeviceKind {
    /// Whether this build can actually place tensors on the requested device.
    pub const fn is_available(self) -> bool {
        match self {
            DeviceKind::Cpu => true,
            DeviceKind::Gpu => cfg!(feature = "gpu"),
        }
    }
}

impl std::fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceKind::Cpu => write!(f, "cpu"),
            DeviceKind::Gpu => write!(f, "gpu"),
        }
    }
}

pub fn init_cpu_device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}

#[cfg(feature = "gpu")]
pub fn init_gpu_device() -> burn::backend::wgpu::WgpuDevice {
    // burn picks the best adapter; Metal on Apple hardware.
    burn::backend::wgpu::WgpuDevice::default()
}
