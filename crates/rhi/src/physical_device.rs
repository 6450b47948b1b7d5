//! Physical device (GPU) selection.
//!
//! A device qualifies when it has a graphics queue family, a family that can
//! present to the window surface, the swapchain extension, and at least one
//! surface format and present mode. Among qualifying devices discrete GPUs
//! win, then the larger maximum image dimension.

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::error::{RhiError, RhiResult};
use crate::swapchain::SwapchainSupportDetails;

/// Queue family indices used by the renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    /// Both graphics and present families were found.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Distinct family indices, graphics first.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);

        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }

        families
    }

    /// Pick the families from raw queue properties.
    ///
    /// A family that does both graphics and present is preferred so the
    /// swap chain images can stay in exclusive sharing mode.
    pub fn from_properties(
        families: &[vk::QueueFamilyProperties],
        supports_present: impl Fn(u32) -> bool,
    ) -> Self {
        let mut indices = Self::default();

        for (i, family) in families.iter().enumerate() {
            let i = i as u32;
            if family.queue_count == 0 {
                continue;
            }

            let graphics = family.queue_flags.contains(vk::QueueFlags::GRAPHICS);
            let present = supports_present(i);

            if graphics && present {
                return Self {
                    graphics_family: Some(i),
                    present_family: Some(i),
                };
            }
            if graphics && indices.graphics_family.is_none() {
                indices.graphics_family = Some(i);
            }
            if present && indices.present_family.is_none() {
                indices.present_family = Some(i);
            }
        }

        indices
    }
}

/// Information about the selected GPU.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    pub device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub queue_families: QueueFamilyIndices,
}

impl PhysicalDeviceInfo {
    pub fn device_name(&self) -> &str {
        self.properties
            .device_name_as_c_str()
            .ok()
            .and_then(|name| name.to_str().ok())
            .unwrap_or("Unknown Device")
    }

    pub fn device_type_name(&self) -> &'static str {
        device_type_name(self.properties.device_type)
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let version = self.properties.api_version;
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field(
                "api_version",
                &format!(
                    "{}.{}.{}",
                    vk::api_version_major(version),
                    vk::api_version_minor(version),
                    vk::api_version_patch(version)
                ),
            )
            .field("queue_families", &self.queue_families)
            .finish()
    }
}

fn device_type_name(device_type: vk::PhysicalDeviceType) -> &'static str {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
        vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
        vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
        vk::PhysicalDeviceType::CPU => "CPU",
        _ => "Other",
    }
}

/// Device extensions every candidate must expose.
pub fn required_device_extensions() -> [&'static CStr; 1] {
    [ash::khr::swapchain::NAME]
}

/// Selects the most suitable GPU for presenting to `surface`.
///
/// # Errors
///
/// [`RhiError::NoSuitableGpu`] when no device qualifies.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> RhiResult<PhysicalDeviceInfo> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoSuitableGpu);
    }

    info!("Found {} GPU(s)", devices.len());

    let selected = devices
        .into_iter()
        .filter_map(|device| check_device_suitability(instance, device, surface, surface_loader))
        .map(|info| {
            let score = rate_device(
                info.properties.device_type,
                info.properties.limits.max_image_dimension2_d,
            );
            debug!(
                "GPU '{}' ({}) - Score: {}",
                info.device_name(),
                info.device_type_name(),
                score
            );
            (info, score)
        })
        .max_by_key(|(_, score)| *score)
        .map(|(info, _)| info)
        .ok_or(RhiError::NoSuitableGpu)?;

    info!(
        "Selected GPU: '{}' ({})",
        selected.device_name(),
        selected.device_type_name()
    );

    Ok(selected)
}

fn check_device_suitability(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> Option<PhysicalDeviceInfo> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let features = unsafe { instance.get_physical_device_features(device) };
    let name = properties
        .device_name_as_c_str()
        .ok()
        .and_then(|n| n.to_str().ok())
        .unwrap_or("Unknown")
        .to_string();

    let family_properties = unsafe { instance.get_physical_device_queue_family_properties(device) };
    let queue_families = QueueFamilyIndices::from_properties(&family_properties, |i| unsafe {
        surface_loader
            .get_physical_device_surface_support(device, i, surface)
            .unwrap_or(false)
    });

    if !queue_families.is_complete() {
        debug!("GPU '{}' skipped: missing graphics or present queue", name);
        return None;
    }

    let extensions = unsafe { instance.enumerate_device_extension_properties(device).ok()? };
    let has_extensions = required_device_extensions().iter().all(|required| {
        extensions
            .iter()
            .any(|ext| ext.extension_name_as_c_str().is_ok_and(|n| n == *required))
    });
    if !has_extensions {
        debug!("GPU '{}' skipped: swapchain extension not supported", name);
        return None;
    }

    let support = SwapchainSupportDetails::query(device, surface, surface_loader).ok()?;
    if !support.is_adequate() {
        debug!("GPU '{}' skipped: no surface formats or present modes", name);
        return None;
    }

    Some(PhysicalDeviceInfo {
        device,
        properties,
        features,
        queue_families,
    })
}

/// Higher is better. Device type dominates, image size breaks ties.
fn rate_device(device_type: vk::PhysicalDeviceType, max_image_dimension: u32) -> u32 {
    let base = match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 100_000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 10_000,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 1_000,
        vk::PhysicalDeviceType::CPU => 100,
        _ => 1,
    };
    base + max_image_dimension.min(65_536)
}
