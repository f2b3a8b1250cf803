use log::{debug, info};

use super::commands::{
    HandleAllocator, HostCommand, Outbox, WindowHandle, WindowSpec,
};
use super::messages::QuitDecision;

/// Liveness of the quit confirmation dialog. The handle is the single source
/// of truth: there is no separate "is open" flag to fall out of sync.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum QuitDialog {
    #[default]
    NoDialog,
    Opening(WindowHandle),
    Open(WindowHandle),
}

impl QuitDialog {
    pub fn handle(self) -> Option<WindowHandle> {
        match self {
            QuitDialog::NoDialog => None,
            QuitDialog::Opening(handle) | QuitDialog::Open(handle) => {
                Some(handle)
            }
        }
    }
}

/// Guards process termination behind a single modal confirmation dialog.
#[derive(Debug, Default)]
pub struct QuitCoordinator {
    dialog: QuitDialog,
}

impl QuitCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dialog(&self) -> QuitDialog {
        self.dialog
    }

    pub fn is_live(&self) -> bool {
        self.dialog != QuitDialog::NoDialog
    }

    pub fn owns(&self, handle: WindowHandle) -> bool {
        self.dialog.handle() == Some(handle)
    }

    /// Opens the dialog over `parent` unless one is already opening or open.
    /// Returns the new dialog's handle.
    pub fn confirm_quit(
        &mut self,
        parent: WindowHandle,
        handles: &mut HandleAllocator,
        outbox: &mut Outbox,
    ) -> Option<WindowHandle> {
        if let Some(existing) = self.dialog.handle() {
            debug!("Quit dialog already live ({}); ignoring", existing);
            return None;
        }

        let handle = handles.allocate();
        self.dialog = QuitDialog::Opening(handle);
        outbox.push(HostCommand::OpenWindow {
            handle,
            spec: WindowSpec::quit_dialog(parent),
        });
        debug!("Opening quit dialog {}", handle);
        Some(handle)
    }

    pub fn on_window_ready(
        &mut self,
        handle: WindowHandle,
        outbox: &mut Outbox,
    ) -> bool {
        if self.dialog != QuitDialog::Opening(handle) {
            return false;
        }

        self.dialog = QuitDialog::Open(handle);
        outbox.push(HostCommand::ShowWindow(handle));
        true
    }

    /// The dialog stays tracked until its close event arrives, whatever the
    /// decision.
    pub fn on_decision(&self, decision: QuitDecision, outbox: &mut Outbox) {
        match decision {
            QuitDecision::Cancel => {
                if let Some(handle) = self.dialog.handle() {
                    outbox.push(HostCommand::CloseWindow(handle));
                }
            }
            QuitDecision::Quit => {
                info!("Quit confirmed");
                outbox.push(HostCommand::Exit);
            }
        }
    }

    /// Returns true when `handle` was the dialog, which is now gone.
    pub fn on_window_closed(&mut self, handle: WindowHandle) -> bool {
        if !self.owns(handle) {
            return false;
        }

        self.dialog = QuitDialog::NoDialog;
        true
    }

    pub fn close(&self, outbox: &mut Outbox) {
        if let Some(handle) = self.dialog.handle() {
            outbox.push(HostCommand::CloseWindow(handle));
        }
    }
}
