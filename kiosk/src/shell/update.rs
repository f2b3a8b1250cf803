use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::commands::{
    HandleAllocator, HostCommand, Outbox, UpdateFeed, WindowHandle,
    WindowSpec,
};
use super::messages::{UpdateDecision, UpdaterMessage};

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum UpdatePhase {
    #[default]
    Idle,
    Checking,
    Available,
    Downloading,
    Downloaded,
}

/// Lifecycle signals raised by the update collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum UpdateSignal {
    Available {
        version: String,
    },
    Progress {
        percent: f64,
        transferred: u64,
        total: u64,
    },
    Downloaded,
    NotAvailable,
    Failed(String),
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, Eq, PartialEq)]
pub struct DownloadProgress {
    pub percent: u8,
    pub transferred: u64,
    pub total: u64,
}

impl DownloadProgress {
    /// Percent is floored so the displayed value never runs ahead of the
    /// download.
    pub fn normalize(percent: f64, transferred: u64, total: u64) -> Self {
        let percent = if percent.is_finite() {
            percent.floor().clamp(0.0, 100.0) as u8
        } else {
            0
        };

        Self {
            percent,
            transferred,
            total,
        }
    }
}

#[derive(Debug)]
struct UpdateSession {
    handle: WindowHandle,
    ready: bool,
    pending: Vec<UpdaterMessage>,
}

impl UpdateSession {
    fn post(&mut self, message: UpdaterMessage, outbox: &mut Outbox) {
        if self.ready {
            outbox.push(HostCommand::PostMessage(self.handle, message));
            return;
        }

        // Only the latest progress matters to a page that hasn't loaded yet
        if matches!(message, UpdaterMessage::DownloadProgress(_)) {
            self.pending.retain(|pending| {
                !matches!(pending, UpdaterMessage::DownloadProgress(_))
            });
        }
        self.pending.push(message);
    }
}

/// Drives the updater window through notify -> progress -> install.
///
/// Failures are silent to the player. A failed check stays in `Checking`
/// with no window; a download that fails after the window opened closes
/// it, and the close event returns the coordinator to `Idle`.
#[derive(Debug, Default)]
pub struct UpdateCoordinator {
    feed: Option<UpdateFeed>,
    phase: UpdatePhase,
    session: Option<UpdateSession>,
}

impl UpdateCoordinator {
    pub fn new(feed: Option<UpdateFeed>) -> Self {
        Self {
            feed,
            phase: UpdatePhase::Idle,
            session: None,
        }
    }

    pub fn phase(&self) -> UpdatePhase {
        self.phase
    }

    pub fn window(&self) -> Option<WindowHandle> {
        self.session.as_ref().map(|session| session.handle)
    }

    pub fn owns(&self, handle: WindowHandle) -> bool {
        self.window() == Some(handle)
    }

    /// Issues the one startup check. Does nothing when updates are disabled.
    pub fn start(&mut self, outbox: &mut Outbox) {
        let Some(feed) = self.feed.as_ref() else {
            debug!("Updates disabled");
            return;
        };

        if self.phase != UpdatePhase::Idle {
            return;
        }

        info!("Checking {}/{} for updates", feed.owner, feed.repo);
        self.phase = UpdatePhase::Checking;
        outbox.push(HostCommand::CheckForUpdates(feed.clone()));
    }

    pub fn on_signal(
        &mut self,
        signal: UpdateSignal,
        parent: Option<WindowHandle>,
        handles: &mut HandleAllocator,
        outbox: &mut Outbox,
    ) {
        match signal {
            UpdateSignal::Available { version } => {
                if let Some(session) = self.session.as_ref() {
                    debug!(
                        "Update window {} already open; ignoring {}",
                        session.handle, version
                    );
                    return;
                }

                info!("Update {} available", version);
                let handle = handles.allocate();
                self.session = Some(UpdateSession {
                    handle,
                    ready: false,
                    pending: vec![],
                });
                self.phase = UpdatePhase::Available;
                outbox.push(HostCommand::OpenWindow {
                    handle,
                    spec: WindowSpec::updater(parent),
                });
            }
            UpdateSignal::Progress {
                percent,
                transferred,
                total,
            } => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };

                if self.phase == UpdatePhase::Available {
                    self.phase = UpdatePhase::Downloading;
                }

                let progress =
                    DownloadProgress::normalize(percent, transferred, total);
                session.post(UpdaterMessage::DownloadProgress(progress), outbox);
            }
            UpdateSignal::Downloaded => {
                let Some(session) = self.session.as_mut() else {
                    debug!("Update downloaded with no update window open");
                    return;
                };

                info!("Update downloaded");
                self.phase = UpdatePhase::Downloaded;
                session.post(UpdaterMessage::UpdateDownloaded, outbox);
            }
            UpdateSignal::NotAvailable => {
                info!("No update available");
            }
            UpdateSignal::Failed(reason) => {
                warn!("Update failed: {}", reason);
                // A download can fail after the window opened. The window
                // has no close button until the download completes.
                if let Some(session) = self.session.as_ref() {
                    outbox.push(HostCommand::CloseWindow(session.handle));
                }
            }
        }
    }

    pub fn on_window_ready(
        &mut self,
        handle: WindowHandle,
        outbox: &mut Outbox,
    ) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };

        if session.handle != handle || session.ready {
            return false;
        }

        session.ready = true;
        outbox.push(HostCommand::ShowWindow(handle));
        for message in session.pending.drain(..) {
            outbox.push(HostCommand::PostMessage(handle, message));
        }
        true
    }

    pub fn on_decision(&self, decision: UpdateDecision, outbox: &mut Outbox) {
        match decision {
            UpdateDecision::UpdateNow => {
                if self.phase != UpdatePhase::Downloaded {
                    warn!(
                        "Ignoring install request while update is {:?}",
                        self.phase
                    );
                    return;
                }
                info!("Installing update and restarting");
                outbox.push(HostCommand::InstallUpdate);
            }
            UpdateDecision::UpdateLater => {
                if let Some(handle) = self.window() {
                    outbox.push(HostCommand::CloseWindow(handle));
                }
            }
        }
    }

    /// Deferring leaves any downloaded update on disk for the collaborator
    /// to apply on its own terms.
    pub fn on_window_closed(&mut self, handle: WindowHandle) -> bool {
        if !self.owns(handle) {
            return false;
        }

        self.session = None;
        self.phase = UpdatePhase::Idle;
        true
    }

    pub fn close(&self, outbox: &mut Outbox) {
        if let Some(handle) = self.window() {
            outbox.push(HostCommand::CloseWindow(handle));
        }
    }
}
