// SPDX-License-Identifier: CEPL-1.0
//! Presentable chain: negotiation against the surface, then the swapchain and
//! one 2D color view per image.

use ash::vk;
use ember_render::RenderSize;
use tracing::info;

use crate::api::{DeviceOps, Sharing, SwapchainRequest};
use crate::error::{Result, VkError};
use crate::probe::SurfaceSupport;
use crate::select::QueueRoles;

pub const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// Sentinel in `current_extent` meaning "the swapchain decides, within min/max".
const EXTENT_FROM_SWAPCHAIN: u32 = u32::MAX;

/// The preferred BGRA8/sRGB pair if listed, otherwise the first pair verbatim.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> Option<vk::SurfaceFormatKHR> {
    formats
        .iter()
        .copied()
        .find(|f| {
            f.format == PREFERRED_FORMAT.format && f.color_space == PREFERRED_FORMAT.color_space
        })
        .or_else(|| formats.first().copied())
}

/// MAILBOX when available, FIFO otherwise (FIFO support is mandatory).
pub fn choose_present_mode(modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

pub fn choose_extent(caps: &vk::SurfaceCapabilitiesKHR, want: RenderSize) -> vk::Extent2D {
    if caps.current_extent.width != EXTENT_FROM_SWAPCHAIN {
        caps.current_extent
    } else {
        vk::Extent2D {
            width: want
                .width
                .clamp(caps.min_image_extent.width, caps.max_image_extent.width),
            height: want
                .height
                .clamp(caps.min_image_extent.height, caps.max_image_extent.height),
        }
    }
}

/// One more than the minimum, capped by the maximum (0 == "no max").
pub fn choose_image_count(caps: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let wanted = caps.min_image_count.saturating_add(1);
    if caps.max_image_count == 0 {
        wanted
    } else {
        wanted.min(caps.max_image_count)
    }
}

/// Everything decided before the swapchain is created.
#[derive(Clone, Copy, Debug)]
pub struct ChainPlan {
    pub format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    pub sharing: Sharing,
}

impl ChainPlan {
    pub fn negotiate(support: &SurfaceSupport, roles: QueueRoles, want: RenderSize) -> Result<Self> {
        let format = choose_surface_format(&support.formats).ok_or(VkError::UnsupportedSurface)?;
        if support.present_modes.is_empty() {
            return Err(VkError::UnsupportedSurface);
        }
        let caps = &support.capabilities;

        Ok(Self {
            format,
            present_mode: choose_present_mode(&support.present_modes),
            extent: choose_extent(caps, want),
            image_count: choose_image_count(caps),
            pre_transform: caps.current_transform,
            sharing: roles.sharing(),
        })
    }

    pub fn request(&self, surface: vk::SurfaceKHR) -> SwapchainRequest {
        SwapchainRequest {
            surface,
            min_image_count: self.image_count,
            format: self.format,
            extent: self.extent,
            present_mode: self.present_mode,
            pre_transform: self.pre_transform,
            sharing: self.sharing,
        }
    }
}

/// The swapchain, its images and their views. Immutable once built.
#[derive(Debug)]
pub struct PresentChain {
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    views: Vec<vk::ImageView>,
    format: vk::SurfaceFormatKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

impl PresentChain {
    /// Creates the swapchain and one view per image the presentation layer
    /// actually allocated. On any failure everything created here is released
    /// before the error is returned.
    pub fn create<D: DeviceOps + ?Sized>(
        device: &D,
        surface: vk::SurfaceKHR,
        plan: &ChainPlan,
    ) -> Result<Self> {
        let swapchain = device
            .create_swapchain(&plan.request(surface))
            .map_err(VkError::create("create_swapchain"))?;

        let images = match device.swapchain_images(swapchain) {
            Ok(images) => images,
            Err(e) => {
                device.destroy_swapchain(swapchain);
                return Err(VkError::create("get_swapchain_images")(e));
            }
        };

        let mut views = Vec::with_capacity(images.len());
        for &image in &images {
            match device.create_image_view(image, plan.format.format) {
                Ok(view) => views.push(view),
                Err(e) => {
                    for &view in &views {
                        device.destroy_image_view(view);
                    }
                    device.destroy_swapchain(swapchain);
                    return Err(VkError::create("create_image_view")(e));
                }
            }
        }

        info!(
            "chain ready: {:?} / {:?}, {:?}, {}x{}, images requested={} allocated={}, {:?}",
            plan.format.format,
            plan.format.color_space,
            plan.present_mode,
            plan.extent.width,
            plan.extent.height,
            plan.image_count,
            images.len(),
            plan.sharing,
        );

        Ok(Self {
            swapchain,
            images,
            views,
            format: plan.format,
            extent: plan.extent,
            present_mode: plan.present_mode,
        })
    }

    pub fn swapchain(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    pub fn views(&self) -> &[vk::ImageView] {
        &self.views
    }

    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Views first, then the swapchain that owns the images.
    pub fn destroy<D: DeviceOps + ?Sized>(self, device: &D) {
        for &view in &self.views {
            device.destroy_image_view(view);
        }
        device.destroy_swapchain(self.swapchain);
    }
}
