use std::error::Error;

use log::trace;
use muda::{ContextMenu, Menu, MenuEvent, MenuId, MenuItem};
use tao::event_loop::EventLoopProxy;
use tao::window::Window;

use super::app::ShellEvent;

/// Right-click menu over the primary window. Its only entry routes through
/// the quit dialog rather than exiting directly.
pub struct QuitMenu {
    menu: Menu,
    quit_id: MenuId,
}

impl QuitMenu {
    pub fn new(
        proxy: EventLoopProxy<ShellEvent>,
    ) -> Result<Self, Box<dyn Error>> {
        let menu = Menu::new();
        let quit = MenuItem::new("Quit", true, None);
        menu.append(&quit)?;

        let quit_id = quit.id().clone();
        let handler_id = quit_id.clone();
        MenuEvent::set_event_handler(Some(move |event: MenuEvent| {
            if event.id == handler_id {
                let _ = proxy.send_event(ShellEvent::MenuQuit);
            }
        }));

        Ok(Self { menu, quit_id })
    }

    /// Shows the menu at the cursor.
    pub fn popup(&self, window: &Window) {
        trace!("Showing context menu {:?}", self.quit_id);

        #[cfg(target_os = "windows")]
        {
            use tao::platform::windows::WindowExtWindows;
            let _ = unsafe {
                self.menu.show_context_menu_for_hwnd(window.hwnd() as _, None)
            };
        }

        #[cfg(target_os = "macos")]
        {
            use tao::platform::macos::WindowExtMacOS;
            let _ = unsafe {
                self.menu
                    .show_context_menu_for_nsview(window.ns_view() as _, None)
            };
        }

        #[cfg(any(
            target_os = "linux",
            target_os = "dragonfly",
            target_os = "freebsd",
            target_os = "netbsd",
            target_os = "openbsd"
        ))]
        {
            use tao::platform::unix::WindowExtUnix;
            let _ = self.menu.show_context_menu_for_gtk_window(
                window.gtk_window().as_ref(),
                None,
            );
        }
    }
}
