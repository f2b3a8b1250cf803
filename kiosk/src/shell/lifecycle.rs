use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, trace, warn};

use super::commands::{
    Accelerator, HandleAllocator, HostCommand, Outbox, UpdateFeed,
    WindowHandle, WindowRole, WindowSpec,
};
use super::messages::{
    BridgeMessage, QuitDecision, UpdateDecision, parse_message,
};
use super::quit::{QuitCoordinator, QuitDialog};
use super::update::{UpdateCoordinator, UpdatePhase, UpdateSignal};
use super::window::{ExitPolicy, PrimaryWindow};
use crate::config::ShellConfig;
use crate::filter::{BlockFilterList, RequestVerdict};
use crate::input::{GateAction, InputGate, Key, KeyInput};

pub const PIXELATED_CSS: &str = "html, body, canvas, img { \
    image-rendering: pixelated !important; }";

/// Owns every window the process has open and the state machines that
/// decide when windows open and close.
///
/// Operations never block and never call into the GUI toolkit: they queue
/// [`HostCommand`]s which the host drains with [`Shell::drain_commands`].
pub struct Shell {
    config: ShellConfig,
    filter: Arc<BlockFilterList>,
    exit_policy: ExitPolicy,
    handles: HandleAllocator,
    live: BTreeMap<WindowHandle, WindowRole>,
    primary: Option<PrimaryWindow>,
    accelerator_owner: Option<WindowHandle>,
    input: InputGate,
    quit: QuitCoordinator,
    update: UpdateCoordinator,
    outbox: Outbox,
}

impl Shell {
    pub fn new(config: ShellConfig, filter: BlockFilterList) -> Self {
        let feed = config.update.enabled.then(|| UpdateFeed {
            owner: config.update.owner.clone(),
            repo: config.update.repo.clone(),
            current_version: config.update.current_version.clone(),
        });
        let exit_policy =
            config.exit_policy.unwrap_or_else(ExitPolicy::platform_default);
        let input =
            InputGate::new(Duration::from_millis(config.hold_to_quit_ms));

        Self {
            config,
            filter: Arc::new(filter),
            exit_policy,
            handles: HandleAllocator::default(),
            live: BTreeMap::new(),
            primary: None,
            accelerator_owner: None,
            input,
            quit: QuitCoordinator::new(),
            update: UpdateCoordinator::new(feed),
            outbox: Outbox::new(),
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Opens the primary window and kicks off the one update check.
    pub fn start(&mut self) {
        self.create_primary_window();
        self.update.start(&mut self.outbox);
    }

    pub fn create_primary_window(&mut self) -> WindowHandle {
        if let Some(primary) = self.primary.as_ref() {
            return primary.handle();
        }

        let handle = self.handles.allocate();
        let mut spec = WindowSpec::primary(
            &self.config.title,
            &self.config.content_url,
            self.config.aspect_ratio,
        );
        spec.fullscreen = self.config.start_fullscreen;

        info!("Creating primary window {}", handle);
        self.outbox.push(HostCommand::OpenWindow { handle, spec });
        self.live.insert(handle, WindowRole::Primary);
        self.primary =
            Some(PrimaryWindow::new(handle, self.config.start_fullscreen));

        // Accelerators are process-global and do not follow a recreated
        // window, so every primary window arms its own.
        self.accelerator_owner = Some(handle);
        self.outbox.push(HostCommand::RegisterAccelerator(
            Accelerator::ToggleFullscreen,
        ));

        handle
    }

    pub fn drain_commands(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.outbox)
    }

    pub fn filter(&self) -> Arc<BlockFilterList> {
        Arc::clone(&self.filter)
    }

    pub fn check_request(&self, url: &str) -> RequestVerdict {
        self.filter.check(url)
    }

    pub fn primary(&self) -> Option<&PrimaryWindow> {
        self.primary.as_ref()
    }

    pub fn window_count(&self) -> usize {
        self.live.len()
    }

    pub fn role_of(&self, handle: WindowHandle) -> Option<WindowRole> {
        self.live.get(&handle).copied()
    }

    pub fn quit_dialog(&self) -> QuitDialog {
        self.quit.dialog()
    }

    pub fn update_phase(&self) -> UpdatePhase {
        self.update.phase()
    }

    pub fn updater_window(&self) -> Option<WindowHandle> {
        self.update.window()
    }

    pub fn hold_fired(&self) -> bool {
        self.input.hold_fired()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.input.next_deadline()
    }

    /// Fires the hold-to-quit timer when its deadline has passed.
    pub fn poll(&mut self, now: Instant) {
        if let Some(action) = self.input.poll(now) {
            trace!("Hold gesture fired");
            if let Some(primary) = self.primary.as_ref() {
                self.outbox.push(HostCommand::SuppressKeyUp(
                    primary.handle(),
                    Key::Escape,
                ));
            }
            self.apply_gate_action(action);
        }
    }

    /// The content view can paint; show it.
    pub fn on_window_ready(&mut self, handle: WindowHandle) {
        match self.live.get(&handle) {
            Some(WindowRole::Primary) => {
                let Some(primary) = self.primary.as_mut() else {
                    return;
                };
                if primary.mark_visible() {
                    self.outbox.push(HostCommand::ShowWindow(handle));
                }
            }
            Some(WindowRole::QuitDialog) => {
                self.quit.on_window_ready(handle, &mut self.outbox);
            }
            Some(WindowRole::Updater) => {
                self.update.on_window_ready(handle, &mut self.outbox);
            }
            None => trace!("Ready event for stale {}", handle),
        }
    }

    pub fn on_page_loaded(&mut self, handle: WindowHandle) {
        let Some(primary) = self.primary.as_mut() else {
            return;
        };
        if primary.handle() != handle {
            return;
        }

        primary.pin_zoom(self.config.zoom_factor);
        self.outbox
            .push(HostCommand::SetZoom(handle, primary.zoom_factor()));
        if self.config.pixelated {
            self.outbox
                .push(HostCommand::InjectCss(handle, PIXELATED_CSS.to_string()));
        }
    }

    /// Returns true when the event must not reach the page.
    pub fn on_key(
        &mut self,
        handle: WindowHandle,
        input: &KeyInput,
        now: Instant,
    ) -> bool {
        if self.primary.as_ref().map(PrimaryWindow::handle) != Some(handle) {
            return false;
        }

        let outcome = self.input.on_key(input, now);
        if let Some(action) = outcome.action {
            self.apply_gate_action(action);
        }
        outcome.suppress
    }

    pub fn on_accelerator(&mut self, accelerator: Accelerator) {
        match accelerator {
            Accelerator::ToggleFullscreen => {
                let Some(primary) = self.primary.as_mut() else {
                    return;
                };
                let fullscreen = primary.toggle_fullscreen();
                debug!("Fullscreen -> {}", fullscreen);
                self.outbox.push(HostCommand::SetFullscreen(
                    primary.handle(),
                    fullscreen,
                ));
            }
        }
    }

    pub fn on_context_menu(&mut self, handle: WindowHandle) {
        if self.primary.as_ref().map(PrimaryWindow::handle) == Some(handle) {
            self.outbox.push(HostCommand::PopupContextMenu(handle));
        }
    }

    /// The context menu's "Quit" item.
    pub fn on_menu_quit(&mut self) {
        self.confirm_quit();
    }

    pub fn confirm_quit(&mut self) {
        let Some(parent) = self.primary.as_ref().map(PrimaryWindow::handle)
        else {
            warn!("Quit requested with no primary window");
            return;
        };

        if let Some(handle) =
            self.quit
                .confirm_quit(parent, &mut self.handles, &mut self.outbox)
        {
            self.live.insert(handle, WindowRole::QuitDialog);
        }
    }

    /// Routes a page message by the role of the window that sent it. Each
    /// role accepts exactly one message schema.
    pub fn on_ipc(&mut self, handle: WindowHandle, body: &str, now: Instant) {
        let Some(role) = self.live.get(&handle).copied() else {
            trace!("Message from stale {}", handle);
            return;
        };

        let result = match role {
            WindowRole::Primary => parse_message::<BridgeMessage>(body).map(
                |message| match message.key_input() {
                    Some(input) => {
                        self.on_key(handle, &input, now);
                    }
                    None => self.on_context_menu(handle),
                },
            ),
            WindowRole::QuitDialog => parse_message::<QuitDecision>(body)
                .map(|decision| {
                    self.quit.on_decision(decision, &mut self.outbox)
                }),
            WindowRole::Updater => parse_message::<UpdateDecision>(body)
                .map(|decision| {
                    self.update.on_decision(decision, &mut self.outbox)
                }),
        };

        if let Err(err) = result {
            warn!("Dropped message from {} ({:?}): {}", handle, role, err);
        }
    }

    pub fn on_update_signal(&mut self, signal: UpdateSignal) {
        let parent = self.primary.as_ref().map(PrimaryWindow::handle);
        self.update.on_signal(
            signal,
            parent,
            &mut self.handles,
            &mut self.outbox,
        );
        if let Some(handle) = self.update.window() {
            self.live.entry(handle).or_insert(WindowRole::Updater);
        }
    }

    /// The platform resumed the app; recreate the primary window if every
    /// window is gone.
    pub fn on_reactivate(&mut self) {
        if self.live.is_empty() {
            info!("Reactivated with no windows");
            self.create_primary_window();
        }
    }

    /// All derived state is reset here, on the close event, rather than on
    /// whatever decision led to it.
    pub fn on_window_closed(&mut self, handle: WindowHandle) {
        let Some(role) = self.live.remove(&handle) else {
            trace!("Close event for untracked {}", handle);
            return;
        };
        debug!("{} ({:?}) closed", handle, role);

        match role {
            WindowRole::Primary => {
                self.primary = None;
                self.input.reset_hold();
                if self.accelerator_owner.take().is_some() {
                    self.outbox.push(HostCommand::UnregisterAccelerator(
                        Accelerator::ToggleFullscreen,
                    ));
                }
                self.quit.close(&mut self.outbox);
                self.update.close(&mut self.outbox);
            }
            WindowRole::QuitDialog => {
                self.quit.on_window_closed(handle);
                self.input.reset_hold();
                // The held release usually lands in the focused dialog, so
                // the page may still be waiting to swallow it.
                if let Some(primary) = self.primary.as_ref() {
                    self.outbox.push(HostCommand::ClearKeyUpSuppression(
                        primary.handle(),
                    ));
                }
            }
            WindowRole::Updater => {
                self.update.on_window_closed(handle);
            }
        }

        if self.live.is_empty() {
            match self.exit_policy {
                ExitPolicy::QuitWhenLastWindowCloses => {
                    info!("All windows closed; exiting");
                    self.outbox.push(HostCommand::Exit);
                }
                ExitPolicy::StayResident => {
                    info!("All windows closed; staying resident");
                }
            }
        }
    }

    fn apply_gate_action(&mut self, action: GateAction) {
        match action {
            GateAction::ConfirmQuit => self.confirm_quit(),
            GateAction::ToggleDevtools => {
                if !self.config.devtools {
                    return;
                }
                let Some(primary) = self.primary.as_mut() else {
                    return;
                };
                let open = primary.toggle_devtools();
                self.outbox
                    .push(HostCommand::SetDevtools(primary.handle(), open));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shell::window::AspectRatio;

    fn config() -> ShellConfig {
        let mut config = ShellConfig::default();
        config.update.enabled = false;
        config.exit_policy = Some(ExitPolicy::QuitWhenLastWindowCloses);
        config
    }

    fn started() -> (Shell, WindowHandle) {
        let mut shell = Shell::new(config(), BlockFilterList::empty());
        shell.start();
        let handle = shell.primary().unwrap().handle();
        (shell, handle)
    }

    #[test]
    fn start_opens_hidden_primary_and_arms_f11() {
        let (mut shell, handle) = started();
        let commands = shell.drain_commands();

        match &commands[0] {
            HostCommand::OpenWindow { handle: h, spec } => {
                assert_eq!(*h, handle);
                assert_eq!(spec.role, WindowRole::Primary);
                assert_eq!(spec.aspect_ratio, Some(AspectRatio::WIDESCREEN));
                assert!(spec.fullscreen);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(
            commands[1],
            HostCommand::RegisterAccelerator(Accelerator::ToggleFullscreen)
        );
        assert!(!commands.contains(&HostCommand::ShowWindow(handle)));
    }

    #[test]
    fn primary_shows_once_when_ready() {
        let (mut shell, handle) = started();
        shell.drain_commands();

        shell.on_window_ready(handle);
        shell.on_window_ready(handle);
        assert_eq!(shell.drain_commands(), vec![HostCommand::ShowWindow(handle)]);
    }

    #[test]
    fn page_load_pins_zoom_and_pixelates() {
        let (mut shell, handle) = started();
        shell.drain_commands();

        shell.on_page_loaded(handle);
        assert_eq!(
            shell.drain_commands(),
            vec![
                HostCommand::SetZoom(handle, 1.0),
                HostCommand::InjectCss(handle, PIXELATED_CSS.to_string()),
            ]
        );
    }

    #[test]
    fn held_escape_arms_key_up_suppression_and_opens_dialog() {
        let (mut shell, handle) = started();
        shell.drain_commands();
        let start = Instant::now();

        shell.on_key(handle, &KeyInput::down(Key::Escape), start);
        assert_eq!(shell.next_deadline(), Some(start + Duration::from_millis(500)));
        shell.poll(start + Duration::from_millis(500));

        let commands = shell.drain_commands();
        assert_eq!(
            commands[0],
            HostCommand::SuppressKeyUp(handle, Key::Escape)
        );
        assert!(matches!(commands[1], HostCommand::OpenWindow { .. }));
        assert!(matches!(shell.quit_dialog(), QuitDialog::Opening(_)));
    }

    #[test]
    fn closing_the_dialog_clears_key_up_suppression() {
        let (mut shell, handle) = started();
        shell.confirm_quit();
        let dialog = shell.quit_dialog().handle().unwrap();
        shell.drain_commands();

        shell.on_window_closed(dialog);
        assert_eq!(
            shell.drain_commands(),
            vec![HostCommand::ClearKeyUpSuppression(handle)]
        );
    }

    #[test]
    fn keys_from_other_windows_are_ignored() {
        let (mut shell, _) = started();
        shell.confirm_quit();
        let dialog = shell.quit_dialog().handle().unwrap();
        shell.drain_commands();

        assert!(!shell.on_key(dialog, &KeyInput::down(Key::F12), Instant::now()));
        assert!(shell.drain_commands().is_empty());
    }

    #[test]
    fn devtools_can_be_disabled() {
        let mut config = config();
        config.devtools = false;
        let mut shell = Shell::new(config, BlockFilterList::empty());
        shell.start();
        let handle = shell.primary().unwrap().handle();
        shell.drain_commands();

        assert!(shell.on_key(handle, &KeyInput::down(Key::F12), Instant::now()));
        assert!(!shell.primary().unwrap().is_devtools_open());
        assert!(shell.drain_commands().is_empty());
    }

    #[test]
    fn context_menu_quit_shares_the_single_dialog() {
        let (mut shell, handle) = started();
        shell.on_context_menu(handle);
        shell.on_menu_quit();
        shell.on_menu_quit();

        assert_eq!(shell.window_count(), 2);
        let commands = shell.drain_commands();
        assert!(commands.contains(&HostCommand::PopupContextMenu(handle)));
    }

    #[test]
    fn malformed_messages_are_dropped() {
        let (mut shell, handle) = started();
        shell.confirm_quit();
        let dialog = shell.quit_dialog().handle().unwrap();
        shell.drain_commands();

        let now = Instant::now();
        shell.on_ipc(dialog, r#"{"action":"update-now"}"#, now);
        shell.on_ipc(handle, r#"{"action":"quit"}"#, now);
        shell.on_ipc(dialog, "not json", now);
        assert!(shell.drain_commands().is_empty());
        assert!(shell.quit_dialog().handle().is_some());
    }

    #[test]
    fn closing_primary_releases_accelerator_and_children() {
        let (mut shell, handle) = started();
        shell.confirm_quit();
        let dialog = shell.quit_dialog().handle().unwrap();
        shell.drain_commands();

        shell.on_window_closed(handle);
        assert_eq!(
            shell.drain_commands(),
            vec![
                HostCommand::UnregisterAccelerator(
                    Accelerator::ToggleFullscreen
                ),
                HostCommand::CloseWindow(dialog),
            ]
        );

        shell.on_window_closed(dialog);
        assert_eq!(shell.drain_commands(), vec![HostCommand::Exit]);
    }

    #[test]
    fn resident_policy_keeps_process_and_reactivation_recreates() {
        let mut config = config();
        config.exit_policy = Some(ExitPolicy::StayResident);
        let mut shell = Shell::new(config, BlockFilterList::empty());
        shell.start();
        let first = shell.primary().unwrap().handle();
        shell.drain_commands();

        shell.on_window_closed(first);
        let commands = shell.drain_commands();
        assert!(!commands.contains(&HostCommand::Exit));
        assert_eq!(shell.window_count(), 0);

        shell.on_reactivate();
        let second = shell.primary().unwrap().handle();
        assert_ne!(first, second);
        assert!(shell.drain_commands().contains(
            &HostCommand::RegisterAccelerator(Accelerator::ToggleFullscreen)
        ));

        shell.on_reactivate();
        assert_eq!(shell.window_count(), 1);
    }

    #[test]
    fn stale_events_are_ignored() {
        let (mut shell, handle) = started();
        shell.on_window_closed(handle);
        shell.drain_commands();

        shell.on_window_ready(handle);
        shell.on_page_loaded(handle);
        shell.on_ipc(handle, r#"{"kind":"context-menu"}"#, Instant::now());
        shell.on_window_closed(handle);
        assert!(shell.drain_commands().is_empty());
    }
}
