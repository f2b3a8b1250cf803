use std::error::Error;
use std::time::Instant;

use log::{debug, error, info, trace, warn};
use tao::event::{Event, WindowEvent};
use tao::event_loop::{
    ControlFlow, EventLoopBuilder, EventLoopProxy, EventLoopWindowTarget,
};
use tao::window::WindowId;

use super::assets;
use super::hotkeys::Accelerators;
use super::menu::QuitMenu;
use super::updater::{GithubUpdater, install_or_log};
use super::windows::{WebViewContext, WindowTable};
use crate::config::ShellConfig;
use crate::core::logging::init_logger;
use crate::filter::BlockFilterList;
use crate::shell::{HostCommand, Shell, UpdateSignal, WindowHandle};

/// Everything that reaches the event loop from outside tao: webview
/// callbacks, global hotkeys, the context menu and the update worker.
#[derive(Debug)]
pub enum ShellEvent {
    PageLoaded(WindowHandle),
    Ipc(WindowHandle, String),
    HotKey(u32),
    MenuQuit,
    Update(UpdateSignal),
}

#[cfg(docsrs)]
pub fn run(_config: ShellConfig) -> Result<(), Box<dyn Error>> {
    Ok(())
}

/// Loads the user's config over `config`, opens the primary window and runs
/// the event loop. Only returns on a setup error.
#[cfg(not(docsrs))]
pub fn run(config: ShellConfig) -> Result<(), Box<dyn Error>> {
    init_logger();
    let config = config.load()?;
    info!("Starting {} -> {}", config.title, config.content_url);

    let filter = match config.block_list_path() {
        Some(path) => BlockFilterList::load(&path),
        None => {
            warn!("No config directory; request filtering disabled");
            BlockFilterList::empty()
        }
    };
    info!("Loaded {} block rules", filter.len());

    let event_loop = EventLoopBuilder::<ShellEvent>::with_user_event().build();
    let proxy = event_loop.create_proxy();

    let accelerators = match Accelerators::new(proxy.clone()) {
        Ok(accelerators) => Some(accelerators),
        Err(err) => {
            warn!("Global shortcuts unavailable: {}", err);
            None
        }
    };

    let mut host = Host {
        windows: WindowTable::default(),
        accelerators,
        menu: QuitMenu::new(proxy.clone())?,
        updater: GithubUpdater::new(config.cache_dir()),
        bridge_script: assets::text(assets::BRIDGE_SCRIPT)?,
        proxy,
        exiting: false,
    };

    let mut shell = Shell::new(config, filter);
    shell.start();

    trace!("Starting event loop");
    event_loop.run(move |event, target, control_flow| {
        match event {
            Event::UserEvent(event) => host.on_shell_event(&mut shell, event),
            Event::WindowEvent {
                window_id, event, ..
            } => host.on_window_event(&mut shell, window_id, event),
            Event::Reopen { .. } => shell.on_reactivate(),
            _ => {}
        }

        shell.poll(Instant::now());
        host.pump(&mut shell, target);

        *control_flow = if host.exiting {
            ControlFlow::Exit
        } else {
            match shell.next_deadline() {
                Some(deadline) => ControlFlow::WaitUntil(deadline),
                None => ControlFlow::Wait,
            }
        };
    });
}

struct Host {
    windows: WindowTable,
    accelerators: Option<Accelerators>,
    menu: QuitMenu,
    updater: GithubUpdater,
    bridge_script: String,
    proxy: EventLoopProxy<ShellEvent>,
    exiting: bool,
}

impl Host {
    fn on_shell_event(&mut self, shell: &mut Shell, event: ShellEvent) {
        match event {
            ShellEvent::PageLoaded(handle) => {
                shell.on_window_ready(handle);
                shell.on_page_loaded(handle);
            }
            ShellEvent::Ipc(handle, body) => {
                shell.on_ipc(handle, &body, Instant::now());
            }
            ShellEvent::HotKey(id) => {
                let accelerator = self
                    .accelerators
                    .as_ref()
                    .and_then(|accelerators| accelerators.lookup(id));
                if let Some(accelerator) = accelerator {
                    shell.on_accelerator(accelerator);
                }
            }
            ShellEvent::MenuQuit => shell.on_menu_quit(),
            ShellEvent::Update(signal) => shell.on_update_signal(signal),
        }
    }

    fn on_window_event(
        &mut self,
        shell: &mut Shell,
        window_id: WindowId,
        event: WindowEvent<'_>,
    ) {
        let Some(handle) = self.windows.handle_of(window_id) else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                if !self.windows.is_closable(handle) {
                    debug!("Ignoring close request for {}", handle);
                    return;
                }
                if self.windows.close(handle) {
                    shell.on_window_closed(handle);
                }
            }
            WindowEvent::Destroyed => {
                if self.windows.close(handle) {
                    shell.on_window_closed(handle);
                }
            }
            WindowEvent::Resized(size) => {
                self.windows.keep_aspect(handle, size)
            }
            _ => {}
        }
    }

    /// Applies queued commands until the shell stops producing them. Close
    /// events are reported after each batch so the shell sees them in order.
    fn pump(
        &mut self,
        shell: &mut Shell,
        target: &EventLoopWindowTarget<ShellEvent>,
    ) {
        while !self.exiting {
            let commands = shell.drain_commands();
            if commands.is_empty() {
                break;
            }

            let mut closed = Vec::new();
            for command in commands {
                self.apply(shell, target, command, &mut closed);
            }
            for handle in closed {
                shell.on_window_closed(handle);
            }
        }
    }

    fn apply(
        &mut self,
        shell: &Shell,
        target: &EventLoopWindowTarget<ShellEvent>,
        command: HostCommand,
        closed: &mut Vec<WindowHandle>,
    ) {
        trace!("{:?}", command);

        match command {
            HostCommand::OpenWindow { handle, spec } => {
                let context = WebViewContext {
                    config: shell.config(),
                    filter: shell.filter(),
                    proxy: &self.proxy,
                    bridge_script: &self.bridge_script,
                };
                if let Err(err) =
                    self.windows.open(target, handle, &spec, &context)
                {
                    error!(
                        "Unable to open {} ({:?}): {}",
                        handle, spec.role, err
                    );
                    closed.push(handle);
                }
            }
            HostCommand::ShowWindow(handle) => self.windows.show(handle),
            HostCommand::CloseWindow(handle) => {
                if self.windows.close(handle) {
                    closed.push(handle);
                }
            }
            HostCommand::SetFullscreen(handle, fullscreen) => {
                self.windows.set_fullscreen(handle, fullscreen);
            }
            HostCommand::SetDevtools(handle, open) => {
                self.windows.set_devtools(handle, open);
            }
            HostCommand::SetZoom(handle, factor) => {
                self.windows.set_zoom(handle, factor);
            }
            HostCommand::InjectCss(handle, css) => {
                self.windows.inject_css(handle, &css);
            }
            HostCommand::SuppressKeyUp(handle, key) => {
                self.windows.suppress_key_up(handle, &key);
            }
            HostCommand::ClearKeyUpSuppression(handle) => {
                self.windows.clear_key_up_suppression(handle);
            }
            HostCommand::PopupContextMenu(handle) => {
                if let Some(window) = self.windows.window(handle) {
                    self.menu.popup(window);
                }
            }
            HostCommand::PostMessage(handle, message) => {
                self.windows.post_message(handle, &message);
            }
            HostCommand::RegisterAccelerator(accelerator) => {
                if let Some(accelerators) = self.accelerators.as_mut() {
                    accelerators.register(accelerator);
                }
            }
            HostCommand::UnregisterAccelerator(accelerator) => {
                if let Some(accelerators) = self.accelerators.as_mut() {
                    accelerators.unregister(accelerator);
                }
            }
            HostCommand::CheckForUpdates(feed) => {
                info!("Checking {}/{} for updates", feed.owner, feed.repo);
                let proxy = self.proxy.clone();
                self.updater.check(feed, move |signal| {
                    let _ = proxy.send_event(ShellEvent::Update(signal));
                });
            }
            HostCommand::InstallUpdate => {
                if install_or_log(&self.updater) {
                    self.exiting = true;
                }
            }
            HostCommand::Exit => {
                info!("Exiting");
                self.exiting = true;
            }
        }
    }
}
