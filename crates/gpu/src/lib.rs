//! wgpu compute backend for `fdm-sim`.
//!
//! [`GpuDevice`] keeps the five fields in storage buffers and runs the stencil
//! kernels from `shaders/fdm.wgsl`, one 8x8 workgroup per grid tile. It
//! implements [`fdm_sim::FieldDevice`], so a [`fdm_sim::Session`] drives it
//! exactly like the CPU device.

pub mod device;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fdm_sim::DeviceError;
use thiserror::Error;

pub use device::GpuDevice;

#[derive(Debug, Error)]
pub enum GpuError {
    #[error("no GPU adapter available")]
    NoAdapter,
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("GPU device lost")]
    DeviceLost,
    #[error("buffer map failed: {0:?}")]
    BufferMapFailed(wgpu::BufferAsyncError),
    #[error("buffer map channel disconnected")]
    ChannelDisconnected,
}

impl From<GpuError> for DeviceError {
    fn from(err: GpuError) -> Self {
        DeviceError::Backend(err.to_string())
    }
}

/// Wait for a buffer map operation to complete, returning Result instead of panicking.
pub fn await_buffer_map(
    rx: std::sync::mpsc::Receiver<Result<(), wgpu::BufferAsyncError>>,
    device_lost: &AtomicBool,
) -> Result<(), GpuError> {
    if device_lost.load(Ordering::SeqCst) {
        return Err(GpuError::DeviceLost);
    }
    match rx.recv() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            log::error!("Buffer map failed: {:?}", e);
            Err(GpuError::BufferMapFailed(e))
        }
        Err(_) => {
            log::error!("Buffer map channel disconnected - possible device lost");
            device_lost.store(true, Ordering::SeqCst);
            Err(GpuError::ChannelDisconnected)
        }
    }
}

/// Headless GPU context: device and queue, no surface.
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_info: wgpu::AdapterInfo,
    device_lost: Arc<AtomicBool>,
}

impl GpuContext {
    pub async fn new() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        log::info!("Using GPU: {:?}", adapter_info);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("FDM Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await?;

        let device_lost = Arc::new(AtomicBool::new(false));
        let lost = device_lost.clone();
        device.on_uncaptured_error(Box::new(move |error| {
            log::error!("GPU uncaptured error: {:?}", error);
            lost.store(true, Ordering::SeqCst);
        }));

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
            device_lost,
        })
    }

    /// Blocking wrapper around [`GpuContext::new`].
    pub fn new_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::new())
    }

    pub fn is_device_lost(&self) -> bool {
        self.device_lost.load(Ordering::SeqCst)
    }

    pub(crate) fn device_lost_flag(&self) -> Arc<AtomicBool> {
        self.device_lost.clone()
    }
}
