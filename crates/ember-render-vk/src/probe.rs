// SPDX-License-Identifier: CEPL-1.0
use ash::vk;

use crate::api::PhysicalQuery;
use crate::error::{Result, VkError};

/// What a device can do with one particular surface.
#[derive(Clone, Debug, Default)]
pub struct SurfaceSupport {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceSupport {
    /// At least one format and one present mode. Empty sets mean "unsupported", never an error.
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Queries capabilities, formats and present modes of `phys` for `surface`.
///
/// A device that lists zero formats or zero present modes comes back with
/// empty vectors; only an outright query failure is an error.
pub fn probe_surface<Q: PhysicalQuery + ?Sized>(
    query: &Q,
    phys: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<SurfaceSupport> {
    let capabilities = query
        .surface_capabilities(phys, surface)
        .map_err(VkError::query("get_physical_device_surface_capabilities"))?;
    let formats = query
        .surface_formats(phys, surface)
        .map_err(VkError::query("get_physical_device_surface_formats"))?;
    let present_modes = query
        .present_modes(phys, surface)
        .map_err(VkError::query("get_physical_device_surface_present_modes"))?;

    Ok(SurfaceSupport {
        capabilities,
        formats,
        present_modes,
    })
}
