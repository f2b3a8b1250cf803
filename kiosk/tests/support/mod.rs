#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use kiosk::ShellConfig;
use kiosk::filter::BlockFilterList;
use kiosk::input::Key;
use kiosk::shell::messages::UpdaterMessage;
use kiosk::shell::{
    Accelerator, ExitPolicy, HostCommand, Shell, UpdateFeed, UpdateSignal,
    WindowHandle, WindowRole, WindowSpec,
};

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

pub fn test_config() -> ShellConfig {
    let mut config = ShellConfig::default();
    config.exit_policy = Some(ExitPolicy::QuitWhenLastWindowCloses);
    config
}

pub fn update_config() -> ShellConfig {
    let mut config = test_config();
    config.update.enabled = true;
    config.update.owner = "owner".into();
    config.update.repo = "game".into();
    config.update.current_version = "1.0.0".into();
    config
}

#[derive(Debug)]
pub struct FakeWindow {
    pub spec: WindowSpec,
    pub visible: bool,
    pub fullscreen: bool,
    pub devtools: bool,
    pub zoom: Option<f64>,
    pub css: Vec<String>,
    pub posted: Vec<UpdaterMessage>,
    pub suppressed_key_ups: Vec<Key>,
    /// Mirrors the bridge's set of key-ups it will still swallow.
    pub pending_key_ups: Vec<Key>,
    pub swallowed_key_ups: Vec<Key>,
}

/// Applies shell commands to in-memory windows the way the tao host applies
/// them to real ones. Windows report ready (page loaded) as soon as they open
/// unless `auto_ready` is turned off.
pub struct FakeHost {
    pub shell: Shell,
    pub windows: BTreeMap<WindowHandle, FakeWindow>,
    pub accelerators: Vec<Accelerator>,
    pub update_checks: Vec<UpdateFeed>,
    pub context_menus: usize,
    pub installs: usize,
    pub exited: bool,
    pub auto_ready: bool,
    pub start: Instant,
}

impl FakeHost {
    pub fn new(config: ShellConfig) -> Self {
        Self::with_filter(config, BlockFilterList::empty())
    }

    pub fn with_filter(config: ShellConfig, filter: BlockFilterList) -> Self {
        Self {
            shell: Shell::new(config, filter),
            windows: BTreeMap::new(),
            accelerators: vec![],
            update_checks: vec![],
            context_menus: 0,
            installs: 0,
            exited: false,
            auto_ready: true,
            start: Instant::now(),
        }
    }

    pub fn started(config: ShellConfig) -> Self {
        let mut host = Self::new(config);
        host.shell.start();
        host.pump();
        host
    }

    pub fn at(&self, offset_ms: u64) -> Instant {
        self.start + ms(offset_ms)
    }

    pub fn primary(&self) -> WindowHandle {
        self.shell
            .primary()
            .map(|primary| primary.handle())
            .expect("primary window")
    }

    pub fn windows_with_role(&self, role: WindowRole) -> Vec<WindowHandle> {
        self.windows
            .iter()
            .filter(|(_, window)| window.spec.role == role)
            .map(|(handle, _)| *handle)
            .collect()
    }

    pub fn window(&self, handle: WindowHandle) -> &FakeWindow {
        self.windows.get(&handle).expect("open window")
    }

    pub fn pump(&mut self) {
        loop {
            let commands = self.shell.drain_commands();
            if commands.is_empty() {
                break;
            }

            let mut opened = vec![];
            let mut closed = vec![];
            for command in commands {
                self.apply(command, &mut opened, &mut closed);
            }
            for handle in closed {
                self.shell.on_window_closed(handle);
            }
            if self.auto_ready {
                for handle in opened {
                    self.shell.on_window_ready(handle);
                    self.shell.on_page_loaded(handle);
                }
            }
        }
    }

    fn apply(
        &mut self,
        command: HostCommand,
        opened: &mut Vec<WindowHandle>,
        closed: &mut Vec<WindowHandle>,
    ) {
        match command {
            HostCommand::OpenWindow { handle, spec } => {
                let fullscreen = spec.fullscreen;
                self.windows.insert(
                    handle,
                    FakeWindow {
                        spec,
                        visible: false,
                        fullscreen,
                        devtools: false,
                        zoom: None,
                        css: vec![],
                        posted: vec![],
                        suppressed_key_ups: vec![],
                        pending_key_ups: vec![],
                        swallowed_key_ups: vec![],
                    },
                );
                opened.push(handle);
            }
            HostCommand::ShowWindow(handle) => {
                if let Some(window) = self.windows.get_mut(&handle) {
                    window.visible = true;
                }
            }
            HostCommand::CloseWindow(handle) => {
                if self.windows.remove(&handle).is_some() {
                    closed.push(handle);
                }
            }
            HostCommand::SetFullscreen(handle, on) => {
                if let Some(window) = self.windows.get_mut(&handle) {
                    window.fullscreen = on;
                }
            }
            HostCommand::SetDevtools(handle, open) => {
                if let Some(window) = self.windows.get_mut(&handle) {
                    window.devtools = open;
                }
            }
            HostCommand::SetZoom(handle, factor) => {
                if let Some(window) = self.windows.get_mut(&handle) {
                    window.zoom = Some(factor);
                }
            }
            HostCommand::InjectCss(handle, css) => {
                if let Some(window) = self.windows.get_mut(&handle) {
                    window.css.push(css);
                }
            }
            HostCommand::SuppressKeyUp(handle, key) => {
                if let Some(window) = self.windows.get_mut(&handle) {
                    if !window.pending_key_ups.contains(&key) {
                        window.pending_key_ups.push(key.clone());
                    }
                    window.suppressed_key_ups.push(key);
                }
            }
            HostCommand::ClearKeyUpSuppression(handle) => {
                if let Some(window) = self.windows.get_mut(&handle) {
                    window.pending_key_ups.clear();
                }
            }
            HostCommand::PopupContextMenu(_) => self.context_menus += 1,
            HostCommand::PostMessage(handle, message) => {
                if let Some(window) = self.windows.get_mut(&handle) {
                    window.posted.push(message);
                }
            }
            HostCommand::RegisterAccelerator(accelerator) => {
                if !self.accelerators.contains(&accelerator) {
                    self.accelerators.push(accelerator);
                }
            }
            HostCommand::UnregisterAccelerator(accelerator) => {
                self.accelerators.retain(|a| *a != accelerator);
            }
            HostCommand::CheckForUpdates(feed) => self.update_checks.push(feed),
            HostCommand::InstallUpdate => {
                self.installs += 1;
                self.exited = true;
            }
            HostCommand::Exit => self.exited = true,
        }
    }

    /// Sends a key event through the primary window's page bridge.
    pub fn key(&mut self, key: &str, phase: &str, repeat: bool, at: u64) {
        let body = format!(
            r#"{{"kind":"key","key":"{}","phase":"{}","isRepeat":{}}}"#,
            key, phase, repeat
        );
        let primary = self.primary();
        let now = self.at(at);
        self.shell.on_ipc(primary, &body, now);
        if phase == "up" {
            self.swallow_pending_key_up(primary, Key::from_dom_key(key));
        }
        self.pump();
    }

    fn swallow_pending_key_up(&mut self, handle: WindowHandle, key: Key) {
        let Some(window) = self.windows.get_mut(&handle) else {
            return;
        };
        if let Some(index) = window.pending_key_ups.iter().position(|k| *k == key)
        {
            window.pending_key_ups.remove(index);
            window.swallowed_key_ups.push(key);
        }
    }

    /// Presses ESC in the game and holds it until the dialog takes focus.
    /// The release lands in the dialog, so the game page never sees it.
    pub fn hold_escape_into_dialog(&mut self, from: u64) {
        self.key("Escape", "down", false, from);
        if let Some(deadline) = self.shell.next_deadline() {
            self.shell.poll(deadline);
            self.pump();
        }
    }

    pub fn tick(&mut self, at: u64) {
        let now = self.at(at);
        self.shell.poll(now);
        self.pump();
    }

    /// Presses ESC at `from`, lets the event loop wake at its deadline (if
    /// the hold outlasts it), and releases at `until`.
    pub fn hold_escape(&mut self, from: u64, until: u64) {
        self.key("Escape", "down", false, from);
        if let Some(deadline) = self.shell.next_deadline() {
            if deadline <= self.at(until) {
                self.shell.poll(deadline);
                self.pump();
            }
        }
        self.key("Escape", "up", false, until);
    }

    pub fn press_f11(&mut self) {
        if self.accelerators.contains(&Accelerator::ToggleFullscreen) {
            self.shell.on_accelerator(Accelerator::ToggleFullscreen);
            self.pump();
        }
    }

    pub fn press_f12(&mut self, at: u64) {
        self.key("F12", "down", false, at);
        self.key("F12", "up", false, at + 50);
    }

    pub fn right_click(&mut self) {
        let primary = self.primary();
        self.shell
            .on_ipc(primary, r#"{"kind":"context-menu"}"#, self.start);
        self.pump();
    }

    pub fn menu_quit(&mut self) {
        self.shell.on_menu_quit();
        self.pump();
    }

    /// A page button click in `handle`.
    pub fn send(&mut self, handle: WindowHandle, body: &str) {
        self.shell.on_ipc(handle, body, self.start);
        self.pump();
    }

    pub fn signal(&mut self, signal: UpdateSignal) {
        self.shell.on_update_signal(signal);
        self.pump();
    }

    /// The user clicked the window's close button.
    pub fn user_close(&mut self, handle: WindowHandle) {
        let closable = self
            .windows
            .get(&handle)
            .is_some_and(|window| window.spec.closable);
        if closable {
            self.windows.remove(&handle);
            self.shell.on_window_closed(handle);
            self.pump();
        }
    }

    pub fn reactivate(&mut self) {
        self.shell.on_reactivate();
        self.pump();
    }
}
