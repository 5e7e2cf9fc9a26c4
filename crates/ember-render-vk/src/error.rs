// SPDX-License-Identifier: CEPL-1.0
use std::path::PathBuf;

use ash::vk;
use raw_window_handle::HandleError;
use thiserror::Error;

/// Coarse classification of every failure the renderer can report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The machine cannot run us: no loader, no device, no usable surface.
    UnsupportedEnvironment,
    /// Building a chain, pipeline, command or sync object failed.
    ResourceCreation,
    /// Acquire, submit, present or a queue wait failed mid-run.
    Frame,
}

#[derive(Debug, Error)]
pub enum VkError {
    #[error("failed to load the Vulkan loader: {0}")]
    Loader(String),

    #[error("required instance extension {0} is not available")]
    MissingInstanceExtension(String),

    #[error("validation layer {0} was requested but is not installed")]
    MissingLayer(String),

    #[error("window handle unavailable: {0}")]
    WindowHandle(#[from] HandleError),

    #[error("no Vulkan-capable device found")]
    NoDevice,

    #[error("no suitable device among {candidates} candidate(s)")]
    NoSuitableDevice { candidates: usize },

    #[error("surface reports no formats or no present modes")]
    UnsupportedSurface,

    #[error("{op} failed: {result}")]
    Query {
        op: &'static str,
        result: vk::Result,
    },

    #[error("{op} failed: {result}")]
    Create {
        op: &'static str,
        result: vk::Result,
    },

    #[error("cannot read shader {}", .path.display())]
    ShaderRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("shader {} is {len} bytes; SPIR-V must be a non-empty multiple of 4", .path.display())]
    ShaderSize { path: PathBuf, len: usize },

    #[error("{op} failed during frame: {result}")]
    Frame {
        op: &'static str,
        result: vk::Result,
    },
}

impl VkError {
    pub(crate) fn create(op: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Create { op, result }
    }

    pub(crate) fn query(op: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Query { op, result }
    }

    pub(crate) fn frame(op: &'static str) -> impl FnOnce(vk::Result) -> Self {
        move |result| Self::Frame { op, result }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Loader(_)
            | Self::MissingInstanceExtension(_)
            | Self::MissingLayer(_)
            | Self::WindowHandle(_)
            | Self::NoDevice
            | Self::NoSuitableDevice { .. }
            | Self::UnsupportedSurface
            | Self::Query { .. } => ErrorKind::UnsupportedEnvironment,
            Self::Create { .. } | Self::ShaderRead { .. } | Self::ShaderSize { .. } => {
                ErrorKind::ResourceCreation
            }
            Self::Frame { .. } => ErrorKind::Frame,
        }
    }

    /// True when the presentation layer reported the chain no longer matches the surface.
    ///
    /// A suboptimal chain is not an error: acquire and present report it as a
    /// flag next to a successful result.
    ///
    /// Recreating the chain is not implemented; callers can use this to tell a
    /// resize-induced stop apart from a device failure.
    pub fn is_stale_chain(&self) -> bool {
        matches!(
            self,
            Self::Frame {
                result: vk::Result::ERROR_OUT_OF_DATE_KHR,
                ..
            }
        )
    }
}

pub type Result<T, E = VkError> = std::result::Result<T, E>;
