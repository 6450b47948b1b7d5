//! Shader module loading.
//!
//! SPIR-V binaries are read from disk and handed to the driver untouched
//! apart from the 4-byte word check. A path that does not exist yields
//! [`RhiError::ShaderNotFound`]; a path that exists but cannot be read or is
//! not whole words yields [`RhiError::ShaderError`].

use std::ffi::{CStr, CString};
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Pipeline stage a shader module is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Read a SPIR-V file into 32-bit words.
pub fn read_spirv_file(path: &Path) -> RhiResult<Vec<u32>> {
    let bytes = std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => RhiError::ShaderNotFound(path.to_path_buf()),
        _ => RhiError::ShaderError(format!("Failed to open file {}: {}", path.display(), e)),
    })?;
    spirv_words(&bytes)
}

/// Reinterpret little-endian SPIR-V bytes as words.
pub fn spirv_words(bytes: &[u8]) -> RhiResult<Vec<u32>> {
    if bytes.is_empty() || !bytes.len().is_multiple_of(4) {
        return Err(RhiError::ShaderError(format!(
            "SPIR-V code must be a non-empty multiple of 4 bytes, got {} bytes",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// An owned `VkShaderModule` plus its stage and entry point.
pub struct Shader {
    device: Arc<Device>,
    module: vk::ShaderModule,
    stage: ShaderStage,
    entry_point: CString,
}

impl Shader {
    /// Load a shader module from a `.spv` file, entry point `main`.
    pub fn from_spirv_file(device: Arc<Device>, path: &Path, stage: ShaderStage) -> RhiResult<Self> {
        debug!("Loading {} shader from {}", stage, path.display());
        let code = read_spirv_file(path)?;
        Self::from_words(device, &code, stage)
    }

    fn from_words(device: Arc<Device>, code: &[u32], stage: ShaderStage) -> RhiResult<Self> {
        let create_info = vk::ShaderModuleCreateInfo::default().code(code);

        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        debug!("Created {} shader module ({} words)", stage, code.len());

        Ok(Self {
            device,
            module,
            stage,
            entry_point: c"main".to_owned(),
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[inline]
    pub fn entry_point(&self) -> &CStr {
        &self.entry_point
    }

    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
        debug!("Destroyed {} shader module", self.stage);
    }
}
