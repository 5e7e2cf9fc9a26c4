// SPDX-License-Identifier: CEPL-1.0
//! Owns every device-level resource and the order they come and go in.

use ash::vk;
use ember_render::{RenderSize, WindowEvents};
use tracing::{info, warn};

use crate::api::DeviceOps;
use crate::chain::{ChainPlan, PresentChain};
use crate::error::Result;
use crate::frame::{FrameExecutor, FrameState};
use crate::pipeline::{Framebuffers, RenderTarget, ShaderPaths, TrianglePipeline};
use crate::select::SelectedDevice;

/// Chain, render target, pipeline, framebuffers and the frame executor for one
/// surface, built against a borrowed device.
///
/// Fields are `Option` so that both a failed `new` and `Drop` can release
/// exactly what exists, newest first.
pub struct Renderer<'d, D: DeviceOps + ?Sized> {
    device: &'d D,
    chain: Option<PresentChain>,
    target: Option<RenderTarget>,
    pipeline: Option<TrianglePipeline>,
    framebuffers: Option<Framebuffers>,
    frames: Option<FrameExecutor>,
}

impl<'d, D: DeviceOps + ?Sized> Renderer<'d, D> {
    /// Chain + views -> render target -> pipeline -> framebuffers -> command
    /// pool + recording -> sync pair. Any failure tears down what was built.
    pub fn new(
        device: &'d D,
        surface: vk::SurfaceKHR,
        selected: &SelectedDevice,
        want: RenderSize,
        shaders: &ShaderPaths,
    ) -> Result<Self> {
        let mut this = Self {
            device,
            chain: None,
            target: None,
            pipeline: None,
            framebuffers: None,
            frames: None,
        };

        let plan = ChainPlan::negotiate(&selected.support, selected.roles, want)?;
        let chain = this.chain.insert(PresentChain::create(device, surface, &plan)?);
        let extent = chain.extent();
        let format = chain.format().format;

        let target = this.target.insert(RenderTarget::create(device, format)?);
        let pipeline = this
            .pipeline
            .insert(TrianglePipeline::create(device, target, extent, shaders)?);

        let framebuffers = this
            .framebuffers
            .insert(Framebuffers::create(device, target, chain.views(), extent)?);

        this.frames = Some(FrameExecutor::new(
            device,
            selected.roles.graphics,
            target,
            pipeline,
            framebuffers,
            extent,
        )?);

        info!("renderer ready on \"{}\"", selected.name);
        Ok(this)
    }

    pub fn chain(&self) -> Option<&PresentChain> {
        self.chain.as_ref()
    }

    pub fn frame_state(&self) -> FrameState {
        self.frames
            .as_ref()
            .map_or(FrameState::Terminated, FrameExecutor::state)
    }

    /// Runs the frame loop until `window` asks to close. Returns frames presented.
    pub fn run<W: WindowEvents + ?Sized>(&mut self, window: &mut W) -> Result<u64> {
        match (self.frames.as_mut(), self.chain.as_ref()) {
            (Some(frames), Some(chain)) => frames.run(self.device, chain, window),
            _ => Ok(0),
        }
    }

    fn teardown(&mut self) {
        let d = self.device;
        if let Some(frames) = self.frames.take() {
            frames.destroy(d);
        }
        if let Some(fbs) = self.framebuffers.take() {
            fbs.destroy(d);
        }
        if let Some(pipeline) = self.pipeline.take() {
            pipeline.destroy(d);
        }
        if let Some(target) = self.target.take() {
            target.destroy(d);
        }
        if let Some(chain) = self.chain.take() {
            chain.destroy(d);
        }
    }
}

impl<D: DeviceOps + ?Sized> Drop for Renderer<'_, D> {
    fn drop(&mut self) {
        // Nothing may be destroyed while the GPU can still reference it.
        if let Err(e) = self.device.device_wait_idle() {
            warn!("device_wait_idle before teardown failed: {e}");
        }
        // STRICT TEARDOWN ORDER: exact reverse of construction.
        self.teardown();
    }
}
