//! A kiosk shell that frames a remotely hosted web game in a native window.
//!
//! The [`shell`] module holds the window lifecycle and the input-gated
//! quit/update state machines. It never touches the GUI toolkit directly:
//! every operation appends [`shell::commands::HostCommand`]s to an outbox
//! which the tao/wry host in [`runtime`] applies.
pub mod config;
pub mod core;
pub mod filter;
pub mod input;
pub mod runtime;
pub mod shell;

pub use config::ShellConfig;
pub use runtime::app::run;
