//! The platform-independent half of the kiosk: window bookkeeping and the
//! quit and update state machines. Nothing in here touches a GUI toolkit.

pub mod commands;
pub mod lifecycle;
pub mod messages;
pub mod quit;
pub mod update;
pub mod window;

pub use commands::{
    Accelerator, HostCommand, UpdateFeed, WindowContent, WindowHandle,
    WindowRole, WindowSpec,
};
pub use lifecycle::Shell;
pub use quit::QuitDialog;
pub use update::{UpdatePhase, UpdateSignal};
pub use window::{AspectRatio, ExitPolicy};
