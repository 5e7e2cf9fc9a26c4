// SPDX-License-Identifier: CEPL-1.0
//! Vulkan bring-up and frame presentation for a single static triangle.
//!
//! Bring-up runs instance + surface -> device selection -> logical device ->
//! [`Renderer`] (chain, render target, pipeline, framebuffers, frame
//! executor). Everything is torn down in the exact reverse order once the
//! window asks to close.
#![deny(unsafe_op_in_unsafe_fn)]

pub mod api;
pub mod chain;
pub mod device;
pub mod error;
pub mod frame;
pub mod instance;
pub mod lifecycle;
pub mod pipeline;
pub mod probe;
pub mod select;

use ember_render::{RenderSize, WindowEvents};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, info};

pub use api::{DeviceOps, PhysicalQuery, PipelineRequest, Sharing, SwapchainRequest};
pub use chain::{ChainPlan, PresentChain};
pub use device::LogicalDevice;
pub use error::{ErrorKind, Result, VkError};
pub use frame::{FrameExecutor, FrameState, FrameSyncPair};
pub use instance::VkContext;
pub use lifecycle::Renderer;
pub use pipeline::{Framebuffers, RenderTarget, ShaderPaths, TrianglePipeline};
pub use probe::{probe_surface, SurfaceSupport};
pub use select::{select_device, DeviceRequirements, QueueRoles, SelectedDevice};

/// Everything the core needs from the outside, resolved once by the caller.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub app_name: String,
    pub validation: bool,
    pub shaders: ShaderPaths,
    /// Size the window was opened with.
    pub size: RenderSize,
}

/// The size the chain should aim for: what the window really has, or the
/// requested size while the window reports nothing usable (e.g. minimised).
pub fn desired_size<W: WindowEvents + ?Sized>(window: &W, requested: RenderSize) -> RenderSize {
    let actual = window.inner_size();
    if actual.width == 0 || actual.height == 0 {
        debug!("window reports {}x{}, using the requested size", actual.width, actual.height);
        requested
    } else {
        actual
    }
}

/// Brings Vulkan up against `window`, draws until it asks to close, then tears
/// everything down. Returns the number of frames presented.
pub fn run<W>(window: &mut W, cfg: &EngineConfig) -> Result<u64>
where
    W: WindowEvents + HasWindowHandle + HasDisplayHandle,
{
    let context = VkContext::new(&*window, &cfg.app_name, cfg.validation)?;
    let required = DeviceRequirements::default();
    let selected = select_device(&context, context.surface(), &required)?;
    let device = LogicalDevice::new(&context, &selected, &required)?;

    let size = desired_size(&*window, cfg.size);
    let frames = {
        let mut renderer = Renderer::new(&device, context.surface(), &selected, size, &cfg.shaders)?;
        renderer.run(window)?
    };

    info!("shutting down after {} frame(s)", frames);
    Ok(frames)
}
