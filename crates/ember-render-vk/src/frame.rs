// SPDX-License-Identifier: CEPL-1.0
//! Command recording and the acquire -> submit -> present loop.
//!
//! One pair of binary semaphores is shared by every frame, and present waits
//! for the present queue to go idle, so at most one frame is ever in flight.

use ash::vk;
use ember_render::WindowEvents;
use tracing::{debug, info};

use crate::api::DeviceOps;
use crate::chain::PresentChain;
use crate::error::{Result, VkError};
use crate::pipeline::{Framebuffers, RenderTarget, TrianglePipeline};

pub const CLEAR_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
/// The triangle lives in the vertex shader; no buffers are bound.
pub const TRIANGLE_VERTICES: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameState {
    Idle,
    Recorded,
    Running,
    Draining,
    Terminated,
}

/// "image acquired" gates the color writes, "render finished" gates presentation.
#[derive(Debug)]
pub struct FrameSyncPair {
    pub image_acquired: vk::Semaphore,
    pub render_finished: vk::Semaphore,
}

impl FrameSyncPair {
    pub fn create<D: DeviceOps + ?Sized>(device: &D) -> Result<Self> {
        let image_acquired = device
            .create_semaphore()
            .map_err(VkError::create("create_semaphore(image_acquired)"))?;
        let render_finished = match device.create_semaphore() {
            Ok(s) => s,
            Err(e) => {
                device.destroy_semaphore(image_acquired);
                return Err(VkError::create("create_semaphore(render_finished)")(e));
            }
        };
        Ok(Self {
            image_acquired,
            render_finished,
        })
    }

    pub fn destroy<D: DeviceOps + ?Sized>(self, device: &D) {
        device.destroy_semaphore(self.render_finished);
        device.destroy_semaphore(self.image_acquired);
    }
}

/// Per-image command buffers, the semaphore pair and the loop state.
#[derive(Debug)]
pub struct FrameExecutor {
    pool: vk::CommandPool,
    commands: Vec<vk::CommandBuffer>,
    sync: FrameSyncPair,
    state: FrameState,
    presented: u64,
}

impl FrameExecutor {
    /// Records one command buffer per framebuffer, then creates the semaphore pair.
    pub fn new<D: DeviceOps + ?Sized>(
        device: &D,
        queue_family: u32,
        target: &RenderTarget,
        pipeline: &TrianglePipeline,
        framebuffers: &Framebuffers,
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let pool = device
            .create_command_pool(queue_family)
            .map_err(VkError::create("create_command_pool"))?;

        let commands = match device.allocate_command_buffers(pool, framebuffers.len() as u32) {
            Ok(c) => c,
            Err(e) => {
                device.destroy_command_pool(pool);
                return Err(VkError::create("allocate_command_buffers")(e));
            }
        };

        let release = |device: &D| {
            device.free_command_buffers(pool, &commands);
            device.destroy_command_pool(pool);
        };

        if let Err(e) = record_all(device, &commands, target, pipeline, framebuffers, extent) {
            release(device);
            return Err(e);
        }
        debug!("frame state: Idle -> Recorded ({} command buffers)", commands.len());

        let sync = match FrameSyncPair::create(device) {
            Ok(s) => s,
            Err(e) => {
                release(device);
                return Err(e);
            }
        };

        Ok(Self {
            pool,
            commands,
            sync,
            state: FrameState::Recorded,
            presented: 0,
        })
    }

    pub fn state(&self) -> FrameState {
        self.state
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    pub fn commands(&self) -> &[vk::CommandBuffer] {
        &self.commands
    }

    pub fn sync(&self) -> &FrameSyncPair {
        &self.sync
    }

    fn transition(&mut self, next: FrameState) {
        debug!("frame state: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Runs frames until the window asks to close, then drains the graphics queue.
    ///
    /// The close request is checked at the top of every iteration, right after
    /// the event pump. Returns the number of frames presented by this call.
    pub fn run<D: DeviceOps + ?Sized, W: WindowEvents + ?Sized>(
        &mut self,
        device: &D,
        chain: &PresentChain,
        window: &mut W,
    ) -> Result<u64> {
        self.transition(FrameState::Running);
        let start = self.presented;

        let looped = loop {
            window.pump_events();
            if window.should_close() {
                break Ok(());
            }
            if let Err(e) = self.draw_frame(device, chain) {
                break Err(e);
            }
        };

        let drained = self.drain(device);
        looped?;
        drained?;

        let frames = self.presented - start;
        info!("frame loop finished after {} frame(s)", frames);
        Ok(frames)
    }

    /// One acquire -> submit -> present cycle, blocking until present completes.
    pub fn draw_frame<D: DeviceOps + ?Sized>(&mut self, device: &D, chain: &PresentChain) -> Result<u32> {
        let (image_index, suboptimal) = device
            .acquire_next_image(chain.swapchain(), self.sync.image_acquired)
            .map_err(VkError::frame("acquire_next_image"))?;
        if suboptimal {
            debug!("acquire: chain is suboptimal for the surface");
        }

        let cmd = *self
            .commands
            .get(image_index as usize)
            .ok_or(VkError::Frame {
                op: "acquire_next_image",
                result: vk::Result::ERROR_UNKNOWN,
            })?;

        device
            .submit(
                cmd,
                self.sync.image_acquired,
                vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                self.sync.render_finished,
            )
            .map_err(VkError::frame("queue_submit"))?;

        let suboptimal = device
            .present(chain.swapchain(), image_index, self.sync.render_finished)
            .map_err(VkError::frame("queue_present"))?;
        if suboptimal {
            debug!("present: chain is suboptimal for the surface");
        }

        device
            .present_queue_wait_idle()
            .map_err(VkError::frame("queue_wait_idle(present)"))?;

        self.presented += 1;
        Ok(image_index)
    }

    /// Blocks until the graphics queue has no work referencing our resources.
    pub fn drain<D: DeviceOps + ?Sized>(&mut self, device: &D) -> Result<()> {
        self.transition(FrameState::Draining);
        device
            .graphics_queue_wait_idle()
            .map_err(VkError::frame("queue_wait_idle(graphics)"))
    }

    /// Semaphores, then command buffers, then their pool.
    pub fn destroy<D: DeviceOps + ?Sized>(mut self, device: &D) {
        self.transition(FrameState::Terminated);
        let Self {
            pool,
            commands,
            sync,
            ..
        } = self;
        sync.destroy(device);
        if !commands.is_empty() {
            device.free_command_buffers(pool, &commands);
        }
        device.destroy_command_pool(pool);
    }
}

fn record_all<D: DeviceOps + ?Sized>(
    device: &D,
    commands: &[vk::CommandBuffer],
    target: &RenderTarget,
    pipeline: &TrianglePipeline,
    framebuffers: &Framebuffers,
    extent: vk::Extent2D,
) -> Result<()> {
    for (&cmd, &framebuffer) in commands.iter().zip(framebuffers.handles()) {
        device
            .begin_commands(cmd)
            .map_err(VkError::create("begin_command_buffer"))?;
        device.cmd_begin_render_pass(cmd, target.render_pass(), framebuffer, extent, CLEAR_COLOR);
        device.cmd_bind_pipeline(cmd, pipeline.pipeline());
        device.cmd_draw(cmd, TRIANGLE_VERTICES, 1);
        device.cmd_end_render_pass(cmd);
        device
            .end_commands(cmd)
            .map_err(VkError::create("end_command_buffer"))?;
    }
    Ok(())
}
