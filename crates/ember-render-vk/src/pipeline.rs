// SPDX-License-Identifier: CEPL-1.0
//! Render target description, the fixed triangle pipeline and its framebuffers.

use std::ffi::CStr;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use ash::util::read_spv;
use ash::vk;
use tracing::{debug, info};

use crate::api::{DeviceOps, PipelineRequest};
use crate::error::{Result, VkError};

/// Both stages are compiled with this entry point.
pub const ENTRY_POINT: &CStr = c"main";

pub const VERTEX_SHADER_FILE: &str = "triangle.vert.spv";
pub const FRAGMENT_SHADER_FILE: &str = "triangle.frag.spv";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderPaths {
    pub vertex: PathBuf,
    pub fragment: PathBuf,
}

impl ShaderPaths {
    /// `triangle.vert.spv` and `triangle.frag.spv` inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            vertex: dir.join(VERTEX_SHADER_FILE),
            fragment: dir.join(FRAGMENT_SHADER_FILE),
        }
    }
}

/// Reads a compiled SPIR-V blob. The byte length must be a positive multiple of 4.
pub fn load_shader(path: &Path) -> Result<Vec<u32>> {
    let bytes = std::fs::read(path).map_err(|source| VkError::ShaderRead {
        path: path.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() || bytes.len() % 4 != 0 {
        return Err(VkError::ShaderSize {
            path: path.to_path_buf(),
            len: bytes.len(),
        });
    }
    let words = read_spv(&mut Cursor::new(&bytes[..])).map_err(|source| VkError::ShaderRead {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("loaded shader {} ({} bytes)", path.display(), bytes.len());
    Ok(words)
}

/// Single color attachment: clear on load, store on end, UNDEFINED -> PRESENT_SRC.
#[derive(Debug)]
pub struct RenderTarget {
    render_pass: vk::RenderPass,
    format: vk::Format,
}

impl RenderTarget {
    pub fn create<D: DeviceOps + ?Sized>(device: &D, format: vk::Format) -> Result<Self> {
        let render_pass = device
            .create_render_pass(format)
            .map_err(VkError::create("create_render_pass"))?;
        Ok(Self {
            render_pass,
            format,
        })
    }

    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn destroy<D: DeviceOps + ?Sized>(self, device: &D) {
        device.destroy_render_pass(self.render_pass);
    }
}

/// Layout (no descriptors) plus the graphics pipeline. Built once, never changed.
#[derive(Debug)]
pub struct TrianglePipeline {
    layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
}

impl TrianglePipeline {
    /// Loads both blobs, wraps them as shader modules, builds the pipeline and
    /// drops the modules again whether or not assembly succeeded.
    pub fn create<D: DeviceOps + ?Sized>(
        device: &D,
        target: &RenderTarget,
        extent: vk::Extent2D,
        shaders: &ShaderPaths,
    ) -> Result<Self> {
        let vs_code = load_shader(&shaders.vertex)?;
        let fs_code = load_shader(&shaders.fragment)?;

        let vs = device
            .create_shader_module(&vs_code)
            .map_err(VkError::create("create_shader_module(vertex)"))?;
        let fs = match device.create_shader_module(&fs_code) {
            Ok(m) => m,
            Err(e) => {
                device.destroy_shader_module(vs);
                return Err(VkError::create("create_shader_module(fragment)")(e));
            }
        };

        let built = Self::assemble(device, target, extent, vs, fs);

        device.destroy_shader_module(vs);
        device.destroy_shader_module(fs);

        let pipeline = built?;
        info!("pipeline ready ({}x{})", extent.width, extent.height);
        Ok(pipeline)
    }

    fn assemble<D: DeviceOps + ?Sized>(
        device: &D,
        target: &RenderTarget,
        extent: vk::Extent2D,
        vertex: vk::ShaderModule,
        fragment: vk::ShaderModule,
    ) -> Result<Self> {
        let layout = device
            .create_pipeline_layout()
            .map_err(VkError::create("create_pipeline_layout"))?;

        let req = PipelineRequest {
            render_pass: target.render_pass(),
            layout,
            vertex,
            fragment,
            entry_point: ENTRY_POINT,
            extent,
        };
        match device.create_graphics_pipeline(&req) {
            Ok(pipeline) => Ok(Self { layout, pipeline }),
            Err(e) => {
                device.destroy_pipeline_layout(layout);
                Err(VkError::create("create_graphics_pipelines")(e))
            }
        }
    }

    pub fn pipeline(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }

    pub fn destroy<D: DeviceOps + ?Sized>(self, device: &D) {
        device.destroy_pipeline(self.pipeline);
        device.destroy_pipeline_layout(self.layout);
    }
}

/// One framebuffer per chain image view, sized to the chain extent.
#[derive(Debug)]
pub struct Framebuffers {
    handles: Vec<vk::Framebuffer>,
}

impl Framebuffers {
    pub fn create<D: DeviceOps + ?Sized>(
        device: &D,
        target: &RenderTarget,
        views: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let mut handles = Vec::with_capacity(views.len());
        for &view in views {
            match device.create_framebuffer(target.render_pass(), view, extent) {
                Ok(fb) => handles.push(fb),
                Err(e) => {
                    for &fb in &handles {
                        device.destroy_framebuffer(fb);
                    }
                    return Err(VkError::create("create_framebuffer")(e));
                }
            }
        }
        Ok(Self { handles })
    }

    pub fn handles(&self) -> &[vk::Framebuffer] {
        &self.handles
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn destroy<D: DeviceOps + ?Sized>(self, device: &D) {
        for &fb in &self.handles {
            device.destroy_framebuffer(fb);
        }
    }
}
