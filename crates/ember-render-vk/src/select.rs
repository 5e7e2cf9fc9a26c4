// SPDX-License-Identifier: CEPL-1.0
//! First-fit device selection.
//!
//! Devices are tried in enumeration order and the first one that passes every
//! check wins. There is no scoring: two runs on the same machine
//! must pick the same device the loader listed first.

use std::ffi::{CStr, CString};

use ash::khr::swapchain;
use ash::vk;
use tracing::{debug, info};

use crate::api::{PhysicalQuery, Sharing};
use crate::error::{Result, VkError};
use crate::probe::{probe_surface, SurfaceSupport};

/// Queue family indices for the two roles the renderer needs. They may coincide.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueRoles {
    pub graphics: u32,
    pub present: u32,
}

impl QueueRoles {
    pub fn is_shared(&self) -> bool {
        self.graphics == self.present
    }

    /// Exclusive ownership when one family does both jobs, concurrent otherwise.
    pub fn sharing(&self) -> Sharing {
        if self.is_shared() {
            Sharing::Exclusive
        } else {
            Sharing::Concurrent {
                graphics: self.graphics,
                present: self.present,
            }
        }
    }

    /// Distinct family indices, graphics first.
    pub fn unique_families(&self) -> Vec<u32> {
        if self.is_shared() {
            vec![self.graphics]
        } else {
            vec![self.graphics, self.present]
        }
    }
}

/// Device extensions a candidate must expose. Built once per bring-up and
/// passed down explicitly.
#[derive(Clone, Debug)]
pub struct DeviceRequirements {
    pub extensions: Vec<CString>,
}

impl Default for DeviceRequirements {
    fn default() -> Self {
        Self {
            extensions: vec![swapchain::NAME.to_owned()],
        }
    }
}

impl DeviceRequirements {
    pub fn extension_ptrs(&self) -> Vec<*const std::ffi::c_char> {
        self.extensions.iter().map(|e| e.as_ptr()).collect()
    }
}

/// Why a candidate was passed over; logged, never surfaced as an error on its own.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    NoGraphicsQueue,
    NoPresentQueue,
    MissingExtensions(Vec<CString>),
    NoSurfaceFormats,
    NoPresentModes,
    QueryFailed(vk::Result),
}

#[derive(Clone, Debug)]
pub struct SelectedDevice {
    pub physical: vk::PhysicalDevice,
    pub name: String,
    pub roles: QueueRoles,
    pub support: SurfaceSupport,
}

/// Walks families in index order, keeping the first graphics-capable and the
/// first present-capable index independently. Stops once both are known.
///
/// A failing present-support query counts as "cannot present" for that family.
pub fn find_queue_roles<Q: PhysicalQuery + ?Sized>(
    query: &Q,
    phys: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> (Option<u32>, Option<u32>) {
    let mut graphics = None;
    let mut present = None;

    for (i, family) in query.queue_families(phys).iter().enumerate() {
        let index = i as u32;
        if graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
            graphics = Some(index);
        }
        if present.is_none() && query.supports_present(phys, index, surface).unwrap_or(false) {
            present = Some(index);
        }
        if graphics.is_some() && present.is_some() {
            break;
        }
    }
    (graphics, present)
}

/// Extensions from `required` that `phys` does not list.
pub fn missing_extensions<Q: PhysicalQuery + ?Sized>(
    query: &Q,
    phys: vk::PhysicalDevice,
    required: &DeviceRequirements,
) -> Result<Vec<CString>> {
    let available = query
        .device_extensions(phys)
        .map_err(VkError::query("enumerate_device_extension_properties"))?;
    Ok(required
        .extensions
        .iter()
        .filter(|want| !available.iter().any(|have| have.as_c_str() == want.as_c_str()))
        .cloned()
        .collect())
}

/// Runs all four suitability checks on one candidate.
pub fn evaluate_device<Q: PhysicalQuery + ?Sized>(
    query: &Q,
    phys: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    required: &DeviceRequirements,
) -> std::result::Result<(QueueRoles, SurfaceSupport), Rejection> {
    let (graphics, present) = find_queue_roles(query, phys, surface);
    let graphics = graphics.ok_or(Rejection::NoGraphicsQueue)?;
    let present = present.ok_or(Rejection::NoPresentQueue)?;

    let missing = missing_extensions(query, phys, required).map_err(query_rejection)?;
    if !missing.is_empty() {
        return Err(Rejection::MissingExtensions(missing));
    }

    // Surface queries are only meaningful once the swapchain extension is known to exist.
    let support = probe_surface(query, phys, surface).map_err(query_rejection)?;
    if support.formats.is_empty() {
        return Err(Rejection::NoSurfaceFormats);
    }
    if support.present_modes.is_empty() {
        return Err(Rejection::NoPresentModes);
    }

    Ok((QueueRoles { graphics, present }, support))
}

fn query_rejection(e: VkError) -> Rejection {
    match e {
        VkError::Query { result, .. } => Rejection::QueryFailed(result),
        _ => Rejection::QueryFailed(vk::Result::ERROR_UNKNOWN),
    }
}

/// Returns the first suitable device in enumeration order.
pub fn select_device<Q: PhysicalQuery + ?Sized>(
    query: &Q,
    surface: vk::SurfaceKHR,
    required: &DeviceRequirements,
) -> Result<SelectedDevice> {
    let devices = query
        .enumerate_devices()
        .map_err(VkError::query("enumerate_physical_devices"))?;
    if devices.is_empty() {
        return Err(VkError::NoDevice);
    }

    for &phys in &devices {
        let name = query.device_name(phys);
        match evaluate_device(query, phys, surface, required) {
            Ok((roles, support)) => {
                info!(
                    "selected device \"{}\" (graphics family {}, present family {})",
                    name, roles.graphics, roles.present
                );
                return Ok(SelectedDevice {
                    physical: phys,
                    name,
                    roles,
                    support,
                });
            }
            Err(Rejection::MissingExtensions(missing)) => {
                debug!(
                    "skipping \"{}\": missing extensions {:?}",
                    name,
                    missing.iter().map(|e| e.as_c_str()).collect::<Vec<&CStr>>()
                );
            }
            Err(reason) => debug!("skipping \"{}\": {:?}", name, reason),
        }
    }

    Err(VkError::NoSuitableDevice {
        candidates: devices.len(),
    })
}
