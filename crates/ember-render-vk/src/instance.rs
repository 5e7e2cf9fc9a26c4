// SPDX-License-Identifier: CEPL-1.0
//! Loader, instance, optional validation messenger and the window surface.

use std::ffi::{c_void, CStr, CString};

use ash::ext::debug_utils;
use ash::khr::surface;
use ash::prelude::VkResult;
use ash::{vk, Entry, Instance};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, error, info, trace, warn};

use crate::api::PhysicalQuery;
use crate::error::{Result, VkError};

pub const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";
pub const ENGINE_NAME: &CStr = c"ember";

unsafe extern "system" fn debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    types: vk::DebugUtilsMessageTypeFlagsEXT,
    data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user: *mut c_void,
) -> vk::Bool32 {
    if data.is_null() {
        return vk::FALSE;
    }
    // SAFETY: the loader passes a valid callback struct for the duration of the call.
    let p_message = unsafe { (*data).p_message };
    if p_message.is_null() {
        return vk::FALSE;
    }
    let msg = unsafe { CStr::from_ptr(p_message) }.to_string_lossy();

    match severity {
        vk::DebugUtilsMessageSeverityFlagsEXT::ERROR => error!(target: "vulkan", "[{:?}] {}", types, msg),
        vk::DebugUtilsMessageSeverityFlagsEXT::WARNING => warn!(target: "vulkan", "[{:?}] {}", types, msg),
        vk::DebugUtilsMessageSeverityFlagsEXT::INFO => debug!(target: "vulkan", "[{:?}] {}", types, msg),
        _ => trace!(target: "vulkan", "[{:?}] {}", types, msg),
    }
    vk::FALSE
}

fn messenger_info() -> vk::DebugUtilsMessengerCreateInfoEXT<'static> {
    vk::DebugUtilsMessengerCreateInfoEXT {
        s_type: vk::StructureType::DEBUG_UTILS_MESSENGER_CREATE_INFO_EXT,
        message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
            | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
            | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
            | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
            | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
            | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        pfn_user_callback: Some(debug_callback),
        ..Default::default()
    }
}

/// Names in `required` that `available` does not contain, as printable strings.
pub fn first_missing<'a>(required: &'a [&'a CStr], available: &[CString]) -> Option<&'a CStr> {
    required
        .iter()
        .copied()
        .find(|want| !available.iter().any(|have| have.as_c_str() == *want))
}

struct Messenger {
    loader: debug_utils::Instance,
    handle: vk::DebugUtilsMessengerEXT,
}

/// Instance-level state: everything that outlives the logical device.
///
/// Dropping it destroys the debug messenger, then the surface, then the
/// instance; the logical device must already be gone.
pub struct VkContext {
    _entry: Entry,
    instance: Instance,
    messenger: Option<Messenger>,
    surface_loader: surface::Instance,
    surface: vk::SurfaceKHR,
}

impl VkContext {
    pub fn new<W>(window: &W, app_name: &str, validation: bool) -> Result<Self>
    where
        W: HasWindowHandle + HasDisplayHandle + ?Sized,
    {
        // SAFETY: the loaded library is kept alive in `_entry` for as long as any handle exists.
        let entry = unsafe { Entry::load() }.map_err(|e| VkError::Loader(e.to_string()))?;

        let display = window.display_handle()?.as_raw();
        let raw_window = window.window_handle()?.as_raw();

        let mut extensions: Vec<&CStr> = ash_window::enumerate_required_extensions(display)
            .map_err(VkError::query("enumerate_required_extensions"))?
            .iter()
            // SAFETY: ash-window returns pointers to static NUL-terminated names.
            .map(|&p| unsafe { CStr::from_ptr(p) })
            .collect();
        if validation {
            extensions.push(debug_utils::NAME);
        }

        let available = unsafe { entry.enumerate_instance_extension_properties(None) }
            .map_err(VkError::query("enumerate_instance_extension_properties"))?
            .iter()
            .filter_map(|p| p.extension_name_as_c_str().ok().map(CStr::to_owned))
            .collect::<Vec<_>>();
        if let Some(missing) = first_missing(&extensions, &available) {
            return Err(VkError::MissingInstanceExtension(missing.to_string_lossy().into_owned()));
        }

        let layers: Vec<&CStr> = if validation {
            let installed = unsafe { entry.enumerate_instance_layer_properties() }
                .map_err(VkError::query("enumerate_instance_layer_properties"))?
                .iter()
                .filter_map(|p| p.layer_name_as_c_str().ok().map(CStr::to_owned))
                .collect::<Vec<_>>();
            if first_missing(&[VALIDATION_LAYER], &installed).is_some() {
                return Err(VkError::MissingLayer(VALIDATION_LAYER.to_string_lossy().into_owned()));
            }
            vec![VALIDATION_LAYER]
        } else {
            Vec::new()
        };

        let app_name = CString::new(app_name).unwrap_or_else(|_| ENGINE_NAME.to_owned());
        let app_info = vk::ApplicationInfo {
            s_type: vk::StructureType::APPLICATION_INFO,
            p_application_name: app_name.as_ptr(),
            application_version: 0,
            p_engine_name: ENGINE_NAME.as_ptr(),
            engine_version: 0,
            api_version: vk::API_VERSION_1_0,
            ..Default::default()
        };

        let ext_ptrs: Vec<_> = extensions.iter().map(|e| e.as_ptr()).collect();
        let layer_ptrs: Vec<_> = layers.iter().map(|l| l.as_ptr()).collect();

        // Chained so instance creation and destruction are covered by validation too.
        let instance_messenger = messenger_info();
        let create_info = vk::InstanceCreateInfo {
            s_type: vk::StructureType::INSTANCE_CREATE_INFO,
            p_next: if validation {
                &instance_messenger as *const _ as *const c_void
            } else {
                std::ptr::null()
            },
            p_application_info: &app_info,
            enabled_layer_count: layer_ptrs.len() as u32,
            pp_enabled_layer_names: layer_ptrs.as_ptr(),
            enabled_extension_count: ext_ptrs.len() as u32,
            pp_enabled_extension_names: ext_ptrs.as_ptr(),
            ..Default::default()
        };

        let instance = unsafe { entry.create_instance(&create_info, None) }
            .map_err(VkError::create("create_instance"))?;
        info!(
            "instance created (validation: {}, extensions: {:?})",
            if validation { "on" } else { "off" },
            extensions
        );

        let messenger = if validation {
            let loader = debug_utils::Instance::new(&entry, &instance);
            match unsafe { loader.create_debug_utils_messenger(&messenger_info(), None) } {
                Ok(handle) => Some(Messenger { loader, handle }),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(VkError::create("create_debug_utils_messenger")(e));
                }
            }
        } else {
            None
        };

        let surface_loader = surface::Instance::new(&entry, &instance);
        let surface = match unsafe {
            ash_window::create_surface(&entry, &instance, display, raw_window, None)
        } {
            Ok(s) => s,
            Err(e) => {
                unsafe {
                    if let Some(m) = &messenger {
                        m.loader.destroy_debug_utils_messenger(m.handle, None);
                    }
                    instance.destroy_instance(None);
                }
                return Err(VkError::create("create_surface")(e));
            }
        };

        Ok(Self {
            _entry: entry,
            instance,
            messenger,
            surface_loader,
            surface,
        })
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }
}

impl PhysicalQuery for VkContext {
    fn enumerate_devices(&self) -> VkResult<Vec<vk::PhysicalDevice>> {
        unsafe { self.instance.enumerate_physical_devices() }
    }

    fn device_name(&self, phys: vk::PhysicalDevice) -> String {
        let props = unsafe { self.instance.get_physical_device_properties(phys) };
        props
            .device_name_as_c_str()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|_| format!("{phys:?}"))
    }

    fn queue_families(&self, phys: vk::PhysicalDevice) -> Vec<vk::QueueFamilyProperties> {
        unsafe { self.instance.get_physical_device_queue_family_properties(phys) }
    }

    fn supports_present(
        &self,
        phys: vk::PhysicalDevice,
        queue_family: u32,
        surface: vk::SurfaceKHR,
    ) -> VkResult<bool> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_support(phys, queue_family, surface)
        }
    }

    fn device_extensions(&self, phys: vk::PhysicalDevice) -> VkResult<Vec<CString>> {
        let props = unsafe { self.instance.enumerate_device_extension_properties(phys) }?;
        Ok(props
            .iter()
            .filter_map(|p| p.extension_name_as_c_str().ok().map(CStr::to_owned))
            .collect())
    }

    fn surface_capabilities(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<vk::SurfaceCapabilitiesKHR> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_capabilities(phys, surface)
        }
    }

    fn surface_formats(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::SurfaceFormatKHR>> {
        unsafe { self.surface_loader.get_physical_device_surface_formats(phys, surface) }
    }

    fn present_modes(
        &self,
        phys: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
    ) -> VkResult<Vec<vk::PresentModeKHR>> {
        unsafe {
            self.surface_loader
                .get_physical_device_surface_present_modes(phys, surface)
        }
    }
}

impl Drop for VkContext {
    fn drop(&mut self) {
        unsafe {
            if let Some(m) = self.messenger.take() {
                m.loader.destroy_debug_utils_messenger(m.handle, None);
            }
            self.surface_loader.destroy_surface(self.surface, None);
            self.instance.destroy_instance(None);
        }
        debug!("instance destroyed");
    }
}
