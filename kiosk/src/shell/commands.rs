use std::fmt;

use super::messages::UpdaterMessage;
use super::window::AspectRatio;
use crate::input::Key;

/// Shell-allocated window identity. Never reused within a process.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct WindowHandle(u64);

impl WindowHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct HandleAllocator {
    next: u64,
}

impl HandleAllocator {
    pub fn allocate(&mut self) -> WindowHandle {
        self.next += 1;
        WindowHandle(self.next)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum WindowRole {
    Primary,
    QuitDialog,
    Updater,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum WindowContent {
    /// Remote page, framed as-is.
    Remote(String),
    /// A page bundled with the binary, by asset path.
    Local(&'static str),
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindowSpec {
    pub role: WindowRole,
    pub title: String,
    pub content: WindowContent,
    pub parent: Option<WindowHandle>,
    pub size: Option<(u32, u32)>,
    pub aspect_ratio: Option<AspectRatio>,
    pub fullscreen: bool,
    pub modal: bool,
    pub decorations: bool,
    pub transparent: bool,
    pub resizable: bool,
    pub closable: bool,
    pub always_on_top: bool,
}

impl WindowSpec {
    pub fn primary(title: &str, url: &str, aspect_ratio: AspectRatio) -> Self {
        Self {
            role: WindowRole::Primary,
            title: title.to_string(),
            content: WindowContent::Remote(url.to_string()),
            parent: None,
            size: None,
            aspect_ratio: Some(aspect_ratio),
            fullscreen: false,
            modal: false,
            decorations: true,
            transparent: false,
            resizable: true,
            closable: true,
            always_on_top: false,
        }
    }

    pub fn quit_dialog(parent: WindowHandle) -> Self {
        Self {
            role: WindowRole::QuitDialog,
            title: "Quit".to_string(),
            content: WindowContent::Local("exit.html"),
            parent: Some(parent),
            size: Some((320, 180)),
            aspect_ratio: None,
            fullscreen: false,
            modal: true,
            decorations: false,
            transparent: true,
            resizable: false,
            closable: true,
            always_on_top: true,
        }
    }

    pub fn updater(parent: Option<WindowHandle>) -> Self {
        Self {
            role: WindowRole::Updater,
            title: "Update available".to_string(),
            content: WindowContent::Local("update.html"),
            parent,
            size: Some((360, 200)),
            aspect_ratio: None,
            fullscreen: false,
            modal: false,
            decorations: false,
            transparent: true,
            resizable: false,
            closable: false,
            always_on_top: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Accelerator {
    ToggleFullscreen,
}

/// Where the update collaborator should look for releases.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UpdateFeed {
    pub owner: String,
    pub repo: String,
    pub current_version: String,
}

/// Effects requested by the shell. The host applies them in order and reports
/// back through the shell's `on_*` methods.
#[derive(Clone, Debug, PartialEq)]
pub enum HostCommand {
    OpenWindow {
        handle: WindowHandle,
        spec: WindowSpec,
    },
    ShowWindow(WindowHandle),
    CloseWindow(WindowHandle),
    SetFullscreen(WindowHandle, bool),
    SetDevtools(WindowHandle, bool),
    SetZoom(WindowHandle, f64),
    InjectCss(WindowHandle, String),
    /// Swallow the next release of `Key` in the page.
    SuppressKeyUp(WindowHandle, Key),
    /// Drop any pending key-up suppression in the page.
    ClearKeyUpSuppression(WindowHandle),
    PopupContextMenu(WindowHandle),
    PostMessage(WindowHandle, UpdaterMessage),
    RegisterAccelerator(Accelerator),
    UnregisterAccelerator(Accelerator),
    CheckForUpdates(UpdateFeed),
    /// Install the downloaded update and restart; ends the process.
    InstallUpdate,
    Exit,
}

pub type Outbox = Vec<HostCommand>;
