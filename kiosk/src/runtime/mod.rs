//! tao/wry host for [`Shell`](crate::shell::Shell). Applies the shell's
//! commands to real windows and feeds platform events back in.

pub mod app;
pub mod assets;
mod hotkeys;
mod menu;
pub mod updater;
mod windows;

pub use app::ShellEvent;
