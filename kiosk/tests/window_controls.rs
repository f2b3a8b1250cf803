mod support;

use kiosk::shell::lifecycle::PIXELATED_CSS;
use kiosk::shell::{Accelerator, AspectRatio, ExitPolicy, WindowRole};
use support::{FakeHost, test_config};

#[test]
fn primary_stays_hidden_until_ready() {
    let mut host = FakeHost::new(test_config());
    host.auto_ready = false;
    host.shell.start();
    host.pump();

    let primary = host.primary();
    assert!(!host.window(primary).visible);

    host.shell.on_window_ready(primary);
    host.pump();
    assert!(host.window(primary).visible);
}

#[test]
fn primary_frame_is_widescreen_fullscreen_and_pixelated() {
    let host = FakeHost::started(test_config());
    let window = host.window(host.primary());

    assert_eq!(window.spec.aspect_ratio, Some(AspectRatio::WIDESCREEN));
    assert!(window.fullscreen);
    assert_eq!(window.zoom, Some(1.0));
    assert_eq!(window.css, vec![PIXELATED_CSS.to_string()]);
}

#[test]
fn f11_toggles_fullscreen_and_back() {
    let mut host = FakeHost::started(test_config());
    let primary = host.primary();
    assert!(host.window(primary).fullscreen);

    host.press_f11();
    assert!(!host.window(primary).fullscreen);
    assert!(!host.shell.primary().unwrap().is_fullscreen());

    host.press_f11();
    assert!(host.window(primary).fullscreen);
    assert!(host.shell.primary().unwrap().is_fullscreen());
}

#[test]
fn f12_toggles_devtools_and_back() {
    let mut host = FakeHost::started(test_config());
    let primary = host.primary();

    host.press_f12(0);
    assert!(host.window(primary).devtools);

    host.press_f12(200);
    assert!(!host.window(primary).devtools);
}

#[test]
fn held_f12_toggles_once() {
    let mut host = FakeHost::started(test_config());
    let primary = host.primary();

    host.key("F12", "down", false, 0);
    host.key("F12", "down", true, 100);
    host.key("F12", "down", true, 200);
    host.key("F12", "up", false, 300);

    assert!(host.window(primary).devtools);
}

#[test]
fn other_keys_pass_through() {
    let mut host = FakeHost::started(test_config());
    let primary = host.primary();

    host.key("a", "down", false, 0);
    host.key("F11", "down", false, 10);
    host.key("Enter", "up", false, 20);

    assert!(host.window(primary).fullscreen);
    assert!(!host.window(primary).devtools);
    assert_eq!(host.windows.len(), 1);
}

#[test]
fn accelerator_follows_the_primary_window() {
    let mut host = FakeHost::started(test_config());
    assert_eq!(host.accelerators, vec![Accelerator::ToggleFullscreen]);

    let primary = host.primary();
    host.user_close(primary);

    assert!(host.accelerators.is_empty());
    assert!(host.exited);
}

#[test]
fn closing_primary_closes_its_dialogs() {
    let mut host = FakeHost::started(test_config());
    host.hold_escape(0, 600);
    assert_eq!(host.windows.len(), 2);

    let primary = host.primary();
    host.user_close(primary);

    assert!(host.windows.is_empty());
    assert_eq!(host.shell.window_count(), 0);
    assert!(host.exited);
}

#[test]
fn resident_process_recreates_primary_on_reactivation() {
    let mut config = test_config();
    config.exit_policy = Some(ExitPolicy::StayResident);
    let mut host = FakeHost::started(config);
    let first = host.primary();

    host.user_close(first);
    assert!(!host.exited);
    assert!(host.windows.is_empty());
    assert!(host.shell.primary().is_none());

    host.reactivate();
    let second = host.primary();
    assert_ne!(first, second);
    assert!(host.window(second).visible);
    assert_eq!(host.accelerators, vec![Accelerator::ToggleFullscreen]);

    host.reactivate();
    assert_eq!(host.windows_with_role(WindowRole::Primary), vec![second]);
}

#[test]
fn reactivation_with_windows_open_is_a_no_op() {
    let mut host = FakeHost::started(test_config());
    let primary = host.primary();

    host.reactivate();

    assert_eq!(host.windows.len(), 1);
    assert_eq!(host.primary(), primary);
}
