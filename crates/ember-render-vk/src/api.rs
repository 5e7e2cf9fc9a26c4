// SPDX-License-Identifier: CEPL-1.0
//! The two driver seams the renderer is written against.
//!
//! [`PhysicalQuery`] covers the instance-level questions asked while choosing
//! a device; [`DeviceOps`] covers everything done with the logical device once
//! it exists. `VkContext` and `LogicalDevice` implement them on top of ash;
//! tests implement them with synthetic handles.

use std::ffi::{CStr, CString};

use ash::prelude::VkResult;
use ash::vk;

pub trait PhysicalQuery {
    fn enumerate_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>>;
    fn device_name(&self, phys: vk::PhysicalDevice) -> String;
    fn queue_families(&self, phys: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties>;
    fn supports_present(
        &self,
        phys: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool>;
    fn device_extensions(&self, phys: vk::PhysicalDevice) -> VkResult<Vec<CString>>;
    fn surface_capabilities(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR>;
    fn surface_formats(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>>;
    fn present_modes(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>>;
}

/// How swapchain images are shared between the graphics and present families.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sharing {
    Exclusive,
    Concurrent { graphics: u32, present: u32 },
}

#[derive(Clone, Copy, Debug)]
pub struct SwapchainRequest {
    pub surface: vk::SurfaceKHR,
    pub min_image_count: u32,
    pub format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,
    pub present_mode: vk::PresentModeKHR,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub sharing: Sharing,
}

#[derive(Clone, Copy, Debug)]
pub struct PipelineRequest<'a> {
    pub render_pass: vk::RenderPass,
    pub layout: vk::PipelineLayout,
    pub vertex: vk::ShaderModule,
    pub fragment: vk::ShaderModule,
    pub entry_point: &'a CStr,
    pub extent: vk::Extent2D,
}

pub trait DeviceOps {
    // --- presentable chain ---
    fn create_swapchain(&self, req: &SwapchainRequest) -> VkResult<vk::SwapchainKHR>;
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> VkResult<Vec<vk::Image>>;
    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);
    fn create_image_view(&self, image: vk::Image, format: vk::Format) -> VkResult<vk::ImageView>;
    fn destroy_image_view(&self, view: vk::ImageView);

    // --- render target + pipeline ---
    fn create_render_pass(&self, format: vk::Format) -> VkResult<vk::RenderPass>;
    fn destroy_render_pass(&self, render_pass: vk::RenderPass);
    fn create_shader_module(&self, code: &[u32]) -> VkResult<vk::ShaderModule>;
    fn destroy_shader_module(&self, module: vk::ShaderModule);
    fn create_pipeline_layout(&self) -> VkResult<vk::PipelineLayout>;
    fn destroy_pipeline_layout(&self, layout: vk::PipelineLayout);
    fn create_graphics_pipeline(&self, req: &PipelineRequest<'_>) -> VkResult<vk::Pipeline>;
    fn destroy_pipeline(&self, pipeline: vk::Pipeline);
    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
    ) -> VkResult<vk::Framebuffer>;
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    // --- commands ---
    fn create_command_pool(&self, queue_family: u32) -> VkResult<vk::CommandPool>;
    fn destroy_command_pool(&self, pool: vk::CommandPool);
    fn allocate_command_buffers(
        &self,
        pool: vk::CommandPool,
        count: u32,
    ) -> VkResult<Vec<vk::CommandBuffer>>;
    fn free_command_buffers(&self, pool: vk::CommandPool, buffers: &[vk::CommandBuffer]);
    fn begin_commands(&self, cmd: vk::CommandBuffer) -> VkResult<()>;
    fn cmd_begin_render_pass(
        &self,
        cmd: vk::CommandBuffer,
        render_pass: vk::RenderPass,
        framebuffer: vk::Framebuffer,
        extent: vk::Extent2D,
        clear: [f32; 4],
    );
    fn cmd_bind_pipeline(&self, cmd: vk::CommandBuffer, pipeline: vk::Pipeline);
    fn cmd_draw(&self, cmd: vk::CommandBuffer, vertex_count: u32, instance_count: u32);
    fn cmd_end_render_pass(&self, cmd: vk::CommandBuffer);
    fn end_commands(&self, cmd: vk::CommandBuffer) -> VkResult<()>;

    // --- synchronization + frame ---
    fn create_semaphore(&self) -> VkResult<vk::Semaphore>;
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);
    /// Blocks until an image is available; there is no timeout.
    fn acquire_next_image(
        &self,
        swapchain: vk::SwapchainKHR,
        signal: vk::Semaphore,
    ) -> VkResult<(u32, bool)>;
    fn submit(
        &self,
        cmd: vk::CommandBuffer,
        wait: vk::Semaphore,
        wait_stage: vk::PipelineStageFlags,
        signal: vk::Semaphore,
    ) -> VkResult<()>;
    fn present(
        &self,
        swapchain: vk::SwapchainKHR,
        image_index: u32,
        wait: vk::Semaphore,
    ) -> VkResult<bool>;
    fn present_queue_wait_idle(&self) -> VkResult<()>;
    fn graphics_queue_wait_idle(&self) -> VkResult<()>;
    fn device_wait_idle(&self) -> VkResult<()>;
}
