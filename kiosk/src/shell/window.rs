use serde::{Deserialize, Serialize};

use super::commands::WindowHandle;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const WIDESCREEN: Self = Self {
        width: 16,
        height: 9,
    };

    pub fn ratio(self) -> f64 {
        self.width as f64 / self.height.max(1) as f64
    }

    /// Height that matches `width` under this ratio.
    pub fn height_for(self, width: u32) -> u32 {
        (width as f64 / self.ratio()).round() as u32
    }

    /// Returns the corrected size when `(width, height)` is off-ratio by more
    /// than a pixel. Width wins.
    pub fn correct(self, width: u32, height: u32) -> Option<(u32, u32)> {
        let expected = self.height_for(width);
        (expected.abs_diff(height) > 1).then_some((width, expected))
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::WIDESCREEN
    }
}

/// What to do when the last window closes.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ExitPolicy {
    QuitWhenLastWindowCloses,
    /// Keep the process alive without windows until reactivated.
    StayResident,
}

impl ExitPolicy {
    pub fn platform_default() -> Self {
        if cfg!(target_os = "macos") {
            ExitPolicy::StayResident
        } else {
            ExitPolicy::QuitWhenLastWindowCloses
        }
    }
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self::platform_default()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrimaryWindow {
    handle: WindowHandle,
    fullscreen: bool,
    devtools_open: bool,
    zoom_factor: f64,
    visible: bool,
}

impl PrimaryWindow {
    pub fn new(handle: WindowHandle, fullscreen: bool) -> Self {
        Self {
            handle,
            fullscreen,
            devtools_open: false,
            zoom_factor: 1.0,
            visible: false,
        }
    }

    pub fn handle(&self) -> WindowHandle {
        self.handle
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        self.fullscreen
    }

    pub fn is_devtools_open(&self) -> bool {
        self.devtools_open
    }

    pub fn toggle_devtools(&mut self) -> bool {
        self.devtools_open = !self.devtools_open;
        self.devtools_open
    }

    pub fn zoom_factor(&self) -> f64 {
        self.zoom_factor
    }

    pub fn pin_zoom(&mut self, factor: f64) {
        self.zoom_factor = factor;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Returns false when the window was already visible.
    pub fn mark_visible(&mut self) -> bool {
        !std::mem::replace(&mut self.visible, true)
    }
}
