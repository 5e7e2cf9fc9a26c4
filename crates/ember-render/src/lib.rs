// SPDX-License-Identifier: CEPL-1.0
use raw_window_handle::{
    DisplayHandle, HandleError, HasDisplayHandle, HasWindowHandle, WindowHandle,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderSize {
    pub width: u32,
    pub height: u32,
}

impl RenderSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// The windowing side of the frame loop.
///
/// The renderer calls [`pump_events`](WindowEvents::pump_events) once per loop
/// iteration and stops as soon as [`should_close`](WindowEvents::should_close)
/// reports true. [`inner_size`](WindowEvents::inner_size) is read once, to
/// size the chain.
pub trait WindowEvents {
    fn pump_events(&mut self);
    fn should_close(&self) -> bool;
    fn inner_size(&self) -> RenderSize;
}

impl<W: WindowEvents + ?Sized> WindowEvents for &mut W {
    fn pump_events(&mut self) {
        (**self).pump_events()
    }
    fn should_close(&self) -> bool {
        (**self).should_close()
    }
    fn inner_size(&self) -> RenderSize {
        (**self).inner_size()
    }
}

/// Wraps a window and additionally requests close after `limit` pumps.
///
/// Used for `--frames N` runs: the close request becomes visible at the top of
/// iteration `limit + 1`, so exactly `limit` frames are presented.
pub struct StopAfter<W> {
    inner: W,
    limit: u64,
    pumped: u64,
}

impl<W> StopAfter<W> {
    pub fn new(inner: W, limit: u64) -> Self {
        Self {
            inner,
            limit,
            pumped: 0,
        }
    }

    pub fn pumped(&self) -> u64 {
        self.pumped
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: WindowEvents> WindowEvents for StopAfter<W> {
    fn pump_events(&mut self) {
        self.pumped = self.pumped.saturating_add(1);
        self.inner.pump_events();
    }

    fn should_close(&self) -> bool {
        self.pumped > self.limit || self.inner.should_close()
    }

    fn inner_size(&self) -> RenderSize {
        self.inner.inner_size()
    }
}

impl<W: HasWindowHandle> HasWindowHandle for StopAfter<W> {
    fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
        self.inner.window_handle()
    }
}

impl<W: HasDisplayHandle> HasDisplayHandle for StopAfter<W> {
    fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
        self.inner.display_handle()
    }
}
