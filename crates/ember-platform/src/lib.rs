// SPDX-License-Identifier: CEPL-1.0
//! Desktop window for the renderer, driven by explicit event pumping.
//!
//! The renderer owns the frame loop, so instead of handing control to
//! `EventLoop::run_app` we pump winit once per frame with a zero timeout and
//! remember whether a close was requested.

use std::time::Duration;

use anyhow::{anyhow, Result};
use ember_render::{RenderSize, WindowEvents};
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};
use tracing::{error, info};

pub use winit;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    platform::pump_events::{EventLoopExtPumpEvents, PumpStatus},
    window::{Window, WindowAttributes, WindowId},
};

/// How many pumps we give the platform to deliver `resumed` and map the window.
const OPEN_ATTEMPTS: u32 = 200;
const OPEN_PUMP_TIMEOUT: Duration = Duration::from_millis(5);

struct WindowState {
    attrs: WindowAttributes,
    window: Option<Window>,
    close_requested: bool,
    create_failed: bool,
}

impl ApplicationHandler for WindowState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        match event_loop.create_window(self.attrs.clone()) {
            Ok(window) => {
                let size = window.inner_size();
                info!("window created ({}x{})", size.width, size.height);
                self.window = Some(window);
            }
            Err(e) => {
                error!("create_window failed: {e}");
                self.create_failed = true;
                self.close_requested = true;
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if let Some(window) = &self.window {
            if window_id != window.id() {
                return;
            }
        }

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                info!("CloseRequested");
                self.close_requested = true;
            }
            _ => {}
        }
    }
}

/// A fixed-size window plus the event loop that feeds it.
pub struct PlatformWindow {
    // Field order is drop order: window before its event loop.
    state: WindowState,
    event_loop: EventLoop<()>,
}

impl PlatformWindow {
    /// Creates the event loop and pumps it until the window exists.
    pub fn open(title: &str, size: RenderSize) -> Result<Self> {
        let event_loop: EventLoop<()> = EventLoop::new()?;
        let attrs = Window::default_attributes()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(size.width.max(1), size.height.max(1)))
            .with_resizable(false);

        let mut this = Self {
            state: WindowState {
                attrs,
                window: None,
                close_requested: false,
                create_failed: false,
            },
            event_loop,
        };

        for _ in 0..OPEN_ATTEMPTS {
            if let PumpStatus::Exit(code) = this
                .event_loop
                .pump_app_events(Some(OPEN_PUMP_TIMEOUT), &mut this.state)
            {
                return Err(anyhow!("event loop exited with code {code} before the window opened"));
            }
            if this.state.create_failed {
                return Err(anyhow!("window creation failed"));
            }
            if this.state.window.is_some() {
                return Ok(this);
            }
        }
        Err(anyhow!("window did not open after {OPEN_ATTEMPTS} event pumps"))
    }

    pub fn window(&self) -> Option<&Window> {
        self.state.window.as_ref()
    }
}

impl WindowEvents for PlatformWindow {
    fn pump_events(&mut self) {
        if let PumpStatus::Exit(_) = self
            .event_loop
            .pump_app_events(Some(Duration::ZERO), &mut self.state)
        {
            self.state.close_requested = true;
        }
    }

    fn should_close(&self) -> bool {
        self.state.close_requested
    }

    fn inner_size(&self) -> RenderSize {
        match &self.state.window {
            Some(w) => {
                let s = w.inner_size();
                RenderSize::new(s.width, s.height)
            }
            None => RenderSize::new(0, 0),
        }
    }
}

impl HasWindowHandle for PlatformWindow {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.state
            .window
            .as_ref()
            .ok_or(HandleError::Unavailable)?
            .window_handle()
    }
}

impl HasDisplayHandle for PlatformWindow {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.event_loop.display_handle()
    }
}
