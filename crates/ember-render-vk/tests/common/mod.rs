// SPDX-License-Identifier: CEPL-1.0
//! Recording stand-ins for the driver seams and the window.
//!
//! `MockDevice` hands out synthetic handles, logs every call in order, keeps a
//! live count per resource kind and can be told to fail the n-th call of a
//! given operation. `MockGpus` answers instance-level queries from a table.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::ffi::CString;
use std::path::PathBuf;

use ash::prelude::VkResult;
use ash::vk::{self, Handle};
use ember_render::{RenderSize, WindowEvents};
use ember_render_vk::{DeviceOps, PhysicalQuery, PipelineRequest, ShaderPaths, SwapchainRequest};

// ============================================================================
// Instance level
// ============================================================================

#[derive(Clone, Debug)]
pub struct MockGpu {
    pub name: &'static str,
    /// (capabilities, can present to the test surface)
    pub families: Vec<(vk::QueueFlags, bool)>,
    pub extensions: Vec<CString>,
    pub caps: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub modes: Vec<vk::PresentModeKHR>,
}

impl MockGpu {
    /// One family doing graphics and present, swapchain listed, BGRA8/sRGB + FIFO.
    pub fn capable(name: &'static str) -> Self {
        Self {
            name,
            families: vec![(vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER, true)],
            extensions: vec![ash::khr::swapchain::NAME.to_owned()],
            caps: caps(2, 0, vk::Extent2D { width: 800, height: 600 }),
            formats: vec![vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            }],
            modes: vec![vk::PresentModeKHR::FIFO],
        }
    }

    pub fn without_swapchain(mut self) -> Self {
        self.extensions.clear();
        self
    }

    pub fn without_present(mut self) -> Self {
        for family in &mut self.families {
            family.1 = false;
        }
        self
    }

    pub fn without_formats(mut self) -> Self {
        self.formats.clear();
        self
    }

    pub fn without_modes(mut self) -> Self {
        self.modes.clear();
        self
    }
}

pub fn caps(min: u32, max: u32, current: vk::Extent2D) -> vk::SurfaceCapabilitiesKHR {
    vk::SurfaceCapabilitiesKHR {
        min_image_count: min,
        max_image_count: max,
        current_extent: current,
        min_image_extent: vk::Extent2D { width: 1, height: 1 },
        max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
        max_image_array_layers: 1,
        current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
        ..Default::default()
    }
}

pub fn surface() -> vk::SurfaceKHR {
    vk::SurfaceKHR::from_raw(0x5u64)
}

pub struct MockGpus {
    pub gpus: Vec<MockGpu>,
    /// Physical devices whose surface queries were issued, in order.
    pub probed: RefCell<Vec<vk::PhysicalDevice>>,
}

impl MockGpus {
    pub fn new(gpus: Vec<MockGpu>) -> Self {
        Self {
            gpus,
            probed: RefCell::new(Vec::new()),
        }
    }

    pub fn handle(index: usize) -> vk::PhysicalDevice {
        vk::PhysicalDevice::from_raw(index as u64 + 1)
    }

    fn gpu(&self, phys: vk::PhysicalDevice) -> &MockGpu {
        &self.gpus[phys.as_raw() as usize - 1]
    }
}

impl PhysicalQuery for MockGpus {
    fn enumerate_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        Ok((0..self.gpus.len()).map(Self::handle).collect())
    }

    fn device_name(&self, phys: vk::PhysicalDevice) -> String {
        self.gpu(phys).name.to_string()
    }

    fn queue_families(&self, phys: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        self.gpu(phys)
            .families
            .iter()
            .map(|&(queue_flags, _)| vk::QueueFamilyProperties {
                queue_flags,
                queue_count: 1,
                ..Default::default()
            })
            .collect()
    }

    fn supports_present(
        &self,
        phys: vk::PhysicalDevice,
        queue_family: u32,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        Ok(self.gpu(phys).families[queue_family as usize].1)
    }

    fn device_extensions(&self, phys: vk::PhysicalDevice) -> VkResult<Vec<CString>> {
        Ok(self.gpu(phys).extensions.clone())
    }

    fn surface_capabilities(
        &self,
        phys: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        self.probed.borrow_mut().push(phys);
        Ok(self.gpu(phys).caps)
    }

    fn surface_formats(
        &self,
        phys: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.gpu(phys).formats.clone())
    }

    fn present_modes(
        &self,
        phys: vk::PhysicalDevice,
        _surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        Ok(self.gpu(phys).modes.clone())
    }
}

// ============================================================================
// Device level
// ============================================================================

#[derive(Default)]
pub struct MockDevice {
    next_handle: Cell<u64>,
    calls: RefCell<Vec<&'static str>>,
    per_op: RefCell<BTreeMap<&'static str, usize>>,
    live: RefCell<BTreeMap<&'static str, i64>>,
    created: RefCell<BTreeMap<&'static str, usize>>,
    fail: Cell<Option<(&'static str, usize)>>,
    /// Overrides how many images the swapchain really has.
    pub actual_images: Cell<Option<u32>>,
    /// Reported by every acquire and present.
    pub suboptimal: Cell<bool>,
    images: Cell<u32>,
    acquired: Cell<u32>,
    pub swapchain_requests: RefCell<Vec<SwapchainRequest>>,
    pub draws: RefCell<Vec<(u32, u32)>>,
    pub clears: RefCell<Vec<[f32; 4]>>,
    pub submits: RefCell<Vec<(vk::Semaphore, vk::PipelineStageFlags, vk::Semaphore)>>,
    pub presents: RefCell<Vec<(u32, vk::Semaphore)>>,
    pub entry_points: RefCell<Vec<String>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the `nth` (1-based) call to `op` return `ERROR_OUT_OF_DEVICE_MEMORY`.
    pub fn fail_on(&self, op: &'static str, nth: usize) {
        self.fail.set(Some((op, nth)));
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, op: &'static str) -> usize {
        self.per_op.borrow().get(op).copied().unwrap_or(0)
    }

    pub fn created(&self, kind: &'static str) -> usize {
        self.created.borrow().get(kind).copied().unwrap_or(0)
    }

    /// Resource kinds with a non-zero create/destroy balance.
    pub fn leaks(&self) -> Vec<(&'static str, i64)> {
        self.live
            .borrow()
            .iter()
            .filter(|(_, n)| **n != 0)
            .map(|(&k, &n)| (k, n))
            .collect()
    }

    pub fn position(&self, op: &'static str) -> Option<usize> {
        self.calls.borrow().iter().position(|&c| c == op)
    }

    pub fn last_position(&self, op: &'static str) -> Option<usize> {
        self.calls.borrow().iter().rposition(|&c| c == op)
    }

    fn record(&self, op: &'static str) -> VkResult<()> {
        self.calls.borrow_mut().push(op);
        let n = {
            let mut per_op = self.per_op.borrow_mut();
            let n = per_op.entry(op).or_insert(0);
            *n += 1;
            *n
        };
        match self.fail.get() {
            Some((f, nth)) if f == op && nth == n => Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY),
            _ => Ok(()),
        }
    }

    fn fresh<H: Handle>(&self, op: &'static str, kind: &'static str) -> VkResult<H> {
        self.record(op)?;
        let id = self.next_handle.get() + 1;
        self.next_handle.set(id);
        *self.live.borrow_mut().entry(kind).or_insert(0) += 1;
        *self.created.borrow_mut().entry(kind).or_insert(0) += 1;
        Ok(H::from_raw(0x1000 + id))
    }

    fn release(&self, op: &'static str, kind: &'static str, n: i64) {
        self.calls.borrow_mut().push(op);
        *self.per_op.borrow_mut().entry(op).or_insert(0) += 1;
        *self.live.borrow_mut().entry(kind).or_insert(0) -= n;
    }
}

impl DeviceOps for MockDevice {
    fn create_swapchain(&self, req: &SwapchainRequest) -> VkResult<vk::SwapchainKHR> {
        self.swapchain_requests.borrow_mut().push(*req);
        let handle = self.fresh("create_swapchain", "swapchain")?;
        self.images
            .set(self.actual_images.get().unwrap_or(req.min_image_count));
        Ok(handle)
    }

    fn swapchain_images(&self, _swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>> {
        self.record("swapchain_images")?;
        Ok((0..self.images.get())
            .map(|i| vk::Image::from_raw(0x9000 + i as u64))
            .collect())
    }

    fn destroy_swapchain(&self, _swapchain: vk::SwapchainKHR) {
        self.release("destroy_swapchain", "swapchain", 1);
    }

    fn create_image_view(&self, _image: vk::Image, _format: vk::Format) -> VkResult<vk::ImageView> {
        self.fresh("create_image_view", "image_view")
    }

    fn destroy_image_view(&self, _view: vk::ImageView) {
        self.release("destroy_image_view", "image_view", 1);
    }

    fn create_render_pass(&self, _format: vk::Format) -> VkResult<vk::RenderPass> {
        self.fresh("create_render_pass", "render_pass")
    }

    fn destroy_render_pass(&self, _render_pass: vk::RenderPass) {
        self.release("destroy_render_pass", "render_pass", 1);
    }

    fn create_shader_module(&self, _code: &[u32]) -> VkResult<vk::ShaderModule> {
        self.fresh("create_shader_module", "shader_module")
    }

    fn destroy_shader_module(&self, _module: vk::ShaderModule) {
        self.release("destroy_shader_module", "shader_module", 1);
    }

    fn create_pipeline_layout(&self) -> VkResult<vk::PipelineLayout> {
        self.fresh("create_pipeline_layout", "pipeline_layout")
    }

    fn destroy_pipeline_layout(&self, _layout: vk::PipelineLayout) {
        self.release("destroy_pipeline_layout", "pipeline_layout", 1);
    }

    fn create_graphics_pipeline(&self, req: &PipelineRequest<'_>) -> VkResult<vk::Pipeline> {
        self.entry_points
            .borrow_mut()
            .push(req.entry_point.to_string_lossy().into_owned());
        self.fresh("create_graphics_pipeline", "pipeline")
    }

    fn destroy_pipeline(&self, _pipeline: vk::Pipeline) {
        self.release("destroy_pipeline", "pipeline", 1);
    }

    fn create_framebuffer(
        &self,
        _render_pass: vk::RenderPass,
        _view: vk::ImageView,
        _extent: vk::Extent2D,
    ) -> VkResult<vk::Framebuffer> {
        self.fresh("create_framebuffer", "framebuffer")
    }

    fn destroy_framebuffer(&self, _framebuffer: vk::Framebuffer) {
        self.release("destroy_framebuffer", "framebuffer", 1);
    }

    fn create_command_pool(&self, _queue_family: u32) -> VkResult<vk::CommandPool> {
        self.fresh("create_command_pool", "command_pool")
    }

    fn destroy_command_pool(&self, _pool: vk::CommandPool) {
        self.release("destroy_command_pool", "command_pool", 1);
    }

    fn allocate_command_buffers(
        &self,
        _pool: vk::CommandPool,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>> {
        self.record("allocate_command_buffers")?;
        *self.live.borrow_mut().entry("command_buffer").or_insert(0) += count as i64;
        *self.created.borrow_mut().entry("command_buffer").or_insert(0) += count as usize;
        Ok((0..count)
            .map(|i| vk::CommandBuffer::from_raw(0x7000 + i as u64))
            .collect())
    }

    fn free_command_buffers(&self, _pool: vk::CommandPool, buffers: &[vk::CommandBuffer]) {
        self.release("free_command_buffers", "command_buffer", buffers.len() as i64);
    }

    fn begin_commands(&self, _cmd: vk::CommandBuffer) -> VkResult<()> {
        self.record("begin_commands")
    }

    fn cmd_begin_render_pass(
        &self,
        _cmd: vk::CommandBuffer,
        _render_pass: vk::RenderPass,
        _framebuffer: vk::Framebuffer,
        _extent: vk::Extent2D,
        clear: [f32; 4],
    ) {
        let _ = self.record("cmd_begin_render_pass");
        self.clears.borrow_mut().push(clear);
    }

    fn cmd_bind_pipeline(&self, _cmd: vk::CommandBuffer, _pipeline: vk::Pipeline) {
        let _ = self.record("cmd_bind_pipeline");
    }

    fn cmd_draw(&self, _cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32) {
        let _ = self.record("cmd_draw");
        self.draws.borrow_mut().push((vertex_count, instance_count));
    }

    fn cmd_end_render_pass(&self, _cmd: vk::CommandBuffer) {
        let _ = self.record("cmd_end_render_pass");
    }

    fn end_commands(&self, _cmd: vk::CommandBuffer) -> VkResult<()> {
        self.record("end_commands")
    }

    fn create_semaphore(&self) -> VkResult<vk::Semaphore> {
        self.fresh("create_semaphore", "semaphore")
    }

    fn destroy_semaphore(&self, _semaphore: vk::Semaphore) {
        self.release("destroy_semaphore", "semaphore", 1);
    }

    fn acquire_next_image(
        &self,
        _swapchain: vk::SwapchainKHR,
        _signal: vk::Semaphore,
    ) -> VkResult<(u32, bool)> {
        self.record("acquire_next_image")?;
        let n = self.acquired.get();
        self.acquired.set(n + 1);
        Ok((n % self.images.get().max(1), self.suboptimal.get()))
    }

    fn submit(
        &self,
        _cmd: vk::CommandBuffer,
        wait: vk::Semaphore,
        wait_stage: vk::PipelineStageFlags,
        signal: vk::Semaphore,
    ) -> VkResult<()> {
        self.record("submit")?;
        self.submits.borrow_mut().push((wait, wait_stage, signal));
        Ok(())
    }

    fn present(
        &self,
        _swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool> {
        self.record("present")?;
        self.presents.borrow_mut().push((image_index, wait));
        Ok(self.suboptimal.get())
    }

    fn present_queue_wait_idle(&self) -> VkResult<()> {
        self.record("present_queue_wait_idle")
    }

    fn graphics_queue_wait_idle(&self) -> VkResult<()> {
        self.record("graphics_queue_wait_idle")
    }

    fn device_wait_idle(&self) -> VkResult<()> {
        self.record("device_wait_idle")
    }
}

// ============================================================================
// Window + shaders
// ============================================================================

/// Reports close once it has been pumped more than `open_for` times.
pub struct ScriptedWindow {
    pub open_for: u64,
    pub pumps: u64,
    pub size: RenderSize,
}

impl ScriptedWindow {
    pub fn new(open_for: u64) -> Self {
        Self {
            open_for,
            pumps: 0,
            size: RenderSize::new(800, 600),
        }
    }
}

impl WindowEvents for ScriptedWindow {
    fn pump_events(&mut self) {
        self.pumps += 1;
    }

    fn should_close(&self) -> bool {
        self.pumps > self.open_for
    }

    fn inner_size(&self) -> RenderSize {
        self.size
    }
}

/// Writes a minimal pair of SPIR-V blobs into a per-test scratch directory.
pub fn shader_dir(tag: &str) -> ShaderPaths {
    let dir = std::env::temp_dir().join(format!("ember-vk-{}-{}", std::process::id(), tag));
    std::fs::create_dir_all(&dir).unwrap();
    let blob: [u8; 8] = [0x03, 0x02, 0x23, 0x07, 0x00, 0x00, 0x01, 0x00];
    let paths = ShaderPaths::in_dir(&dir);
    std::fs::write(&paths.vertex, blob).unwrap();
    std::fs::write(&paths.fragment, blob).unwrap();
    paths
}

pub fn missing_shaders() -> ShaderPaths {
    ShaderPaths::in_dir(PathBuf::from("/nonexistent/ember/shaders"))
}
