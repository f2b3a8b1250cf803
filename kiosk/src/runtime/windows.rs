use std::collections::HashMap;
use std::error::Error;
use std::sync::Arc;

use log::{debug, error, trace, warn};
use tao::dpi::{LogicalSize, PhysicalPosition, PhysicalSize};
use tao::event_loop::{EventLoopProxy, EventLoopWindowTarget};
use tao::window::{Fullscreen, Window, WindowBuilder, WindowId};
use wry::{PageLoadEvent, WebView, WebViewBuilder};

use super::app::ShellEvent;
use super::assets;
use crate::config::ShellConfig;
use crate::filter::{BlockFilterList, RequestVerdict};
use crate::input::Key;
use crate::shell::messages::{UpdaterMessage, post_message_script};
use crate::shell::{AspectRatio, WindowContent, WindowHandle, WindowSpec};

/// Logical width of the primary window when it is not fullscreen and has no
/// remembered size.
const DEFAULT_WIDTH: u32 = 1280;

/// What a webview needs from outside its window.
pub struct WebViewContext<'a> {
    pub config: &'a ShellConfig,
    pub filter: Arc<BlockFilterList>,
    pub proxy: &'a EventLoopProxy<ShellEvent>,
    pub bridge_script: &'a str,
}

// Field order matters: the webview must drop before its window.
struct HostWindow {
    webview: WebView,
    window: Window,
    parent: Option<WindowHandle>,
    modal: bool,
    closable: bool,
    aspect_ratio: Option<AspectRatio>,
    windowed_size: Option<PhysicalSize<u32>>,
}

/// Native windows keyed by shell handle.
#[derive(Default)]
pub struct WindowTable {
    windows: HashMap<WindowHandle, HostWindow>,
    handles: HashMap<WindowId, WindowHandle>,
}

impl WindowTable {
    pub fn handle_of(&self, id: WindowId) -> Option<WindowHandle> {
        self.handles.get(&id).copied()
    }

    pub fn window(&self, handle: WindowHandle) -> Option<&Window> {
        self.windows.get(&handle).map(|host| &host.window)
    }

    pub fn is_closable(&self, handle: WindowHandle) -> bool {
        self.windows.get(&handle).is_some_and(|host| host.closable)
    }

    /// Builds the window hidden; it is shown once its page reports ready.
    pub fn open(
        &mut self,
        target: &EventLoopWindowTarget<ShellEvent>,
        handle: WindowHandle,
        spec: &WindowSpec,
        context: &WebViewContext,
    ) -> Result<(), Box<dyn Error>> {
        let window = window_builder(spec).build(target)?;

        let parent = spec.parent.and_then(|parent| self.windows.get(&parent));
        if spec.size.is_some() {
            match parent {
                Some(parent) => center_over(&window, &parent.window),
                None => center_on_monitor(&window),
            }
        }

        #[cfg(target_os = "windows")]
        {
            use tao::platform::windows::WindowExtWindows;
            if let (true, Some(parent)) = (spec.modal, parent) {
                parent.window.set_enable(false);
            }
        }

        let webview = build_webview(handle, spec, &window, context)?;
        debug!("Opened {} ({:?})", handle, spec.role);

        self.handles.insert(window.id(), handle);
        self.windows.insert(
            handle,
            HostWindow {
                webview,
                window,
                parent: spec.parent,
                modal: spec.modal,
                closable: spec.closable,
                aspect_ratio: spec.aspect_ratio,
                windowed_size: None,
            },
        );

        Ok(())
    }

    /// Returns false when `handle` was not open.
    pub fn close(&mut self, handle: WindowHandle) -> bool {
        let Some(host) = self.windows.remove(&handle) else {
            return false;
        };
        self.handles.remove(&host.window.id());

        if host.modal {
            if let Some(parent) =
                host.parent.and_then(|parent| self.windows.get(&parent))
            {
                #[cfg(target_os = "windows")]
                {
                    use tao::platform::windows::WindowExtWindows;
                    parent.window.set_enable(true);
                }
                parent.window.set_focus();
            }
        }

        trace!("Closed {}", handle);
        true
    }

    pub fn show(&self, handle: WindowHandle) {
        if let Some(host) = self.windows.get(&handle) {
            host.window.set_visible(true);
            host.window.set_focus();
        }
    }

    pub fn set_fullscreen(&mut self, handle: WindowHandle, fullscreen: bool) {
        let Some(host) = self.windows.get_mut(&handle) else {
            return;
        };

        if fullscreen {
            if host.window.fullscreen().is_none() {
                host.windowed_size = Some(host.window.inner_size());
            }
            let monitor = host.window.current_monitor();
            host.window
                .set_fullscreen(Some(Fullscreen::Borderless(monitor)));
        } else {
            host.window.set_fullscreen(None);
            match (host.windowed_size, host.aspect_ratio) {
                (Some(size), _) => host.window.set_inner_size(size),
                (None, Some(ratio)) => {
                    host.window.set_inner_size(LogicalSize::new(
                        DEFAULT_WIDTH,
                        ratio.height_for(DEFAULT_WIDTH),
                    ))
                }
                (None, None) => {}
            }
        }
    }

    /// Snaps a windowed resize back onto the window's aspect ratio.
    pub fn keep_aspect(&self, handle: WindowHandle, size: PhysicalSize<u32>) {
        let Some(host) = self.windows.get(&handle) else {
            return;
        };
        let Some(ratio) = host.aspect_ratio else {
            return;
        };
        if host.window.fullscreen().is_some() {
            return;
        }

        if let Some((width, height)) = ratio.correct(size.width, size.height) {
            trace!("{} off-ratio; snapping to {}x{}", handle, width, height);
            host.window.set_inner_size(PhysicalSize::new(width, height));
        }
    }

    pub fn set_devtools(&self, handle: WindowHandle, open: bool) {
        let Some(host) = self.windows.get(&handle) else {
            return;
        };
        if open {
            host.webview.open_devtools();
        } else {
            host.webview.close_devtools();
        }
    }

    pub fn set_zoom(&self, handle: WindowHandle, factor: f64) {
        if let Some(host) = self.windows.get(&handle) {
            if let Err(err) = host.webview.zoom(factor) {
                warn!("Unable to zoom {}: {}", handle, err);
            }
        }
    }

    pub fn inject_css(&self, handle: WindowHandle, css: &str) {
        match inject_css_script(css) {
            Ok(script) => self.evaluate(handle, &script),
            Err(err) => error!("Unable to encode CSS: {}", err),
        }
    }

    pub fn suppress_key_up(&self, handle: WindowHandle, key: &Key) {
        match suppress_key_up_script(key) {
            Ok(script) => self.evaluate(handle, &script),
            Err(err) => error!("Unable to encode key: {}", err),
        }
    }

    pub fn clear_key_up_suppression(&self, handle: WindowHandle) {
        self.evaluate(handle, CLEAR_KEY_UP_SUPPRESSION_SCRIPT);
    }

    pub fn post_message(&self, handle: WindowHandle, message: &UpdaterMessage) {
        match post_message_script(message) {
            Ok(script) => self.evaluate(handle, &script),
            Err(err) => error!("Unable to encode {:?}: {}", message, err),
        }
    }

    fn evaluate(&self, handle: WindowHandle, script: &str) {
        let Some(host) = self.windows.get(&handle) else {
            trace!("Script for closed {} dropped", handle);
            return;
        };
        if let Err(err) = host.webview.evaluate_script(script) {
            error!("Failed to run script in {}: {:?}", handle, err);
        }
    }
}

fn window_builder(spec: &WindowSpec) -> WindowBuilder {
    let mut builder = WindowBuilder::new()
        .with_title(&spec.title)
        .with_visible(false)
        .with_decorations(spec.decorations)
        .with_transparent(spec.transparent)
        .with_resizable(spec.resizable)
        .with_closable(spec.closable)
        .with_always_on_top(spec.always_on_top);

    builder = match (spec.size, spec.aspect_ratio) {
        (Some((width, height)), _) => {
            builder.with_inner_size(LogicalSize::new(width, height))
        }
        (None, Some(ratio)) => builder.with_inner_size(LogicalSize::new(
            DEFAULT_WIDTH,
            ratio.height_for(DEFAULT_WIDTH),
        )),
        (None, None) => builder,
    };

    if spec.fullscreen {
        builder = builder.with_fullscreen(Some(Fullscreen::Borderless(None)));
    }

    builder
}

fn build_webview(
    handle: WindowHandle,
    spec: &WindowSpec,
    window: &Window,
    context: &WebViewContext,
) -> Result<WebView, Box<dyn Error>> {
    let ipc_proxy = context.proxy.clone();
    let load_proxy = context.proxy.clone();

    let mut builder = WebViewBuilder::new()
        .with_devtools(context.config.devtools)
        .with_transparent(spec.transparent)
        .with_ipc_handler(move |request| {
            let body = request.body().to_string();
            let _ = ipc_proxy.send_event(ShellEvent::Ipc(handle, body));
        })
        .with_on_page_load_handler(move |event, url| {
            if let PageLoadEvent::Finished = event {
                trace!("{} loaded {}", handle, url);
                let _ = load_proxy.send_event(ShellEvent::PageLoaded(handle));
            }
        });

    #[cfg(target_os = "windows")]
    {
        use wry::WebViewBuilderExtWindows;
        builder = builder
            .with_additional_browser_args(context.config.browser_args_line());
    }

    builder = match &spec.content {
        WindowContent::Remote(url) => {
            let navigation = Arc::clone(&context.filter);
            let popups = Arc::clone(&context.filter);
            builder
                .with_url(url)
                .with_initialization_script(context.bridge_script)
                .with_navigation_handler(move |url| {
                    navigation.check(&url) == RequestVerdict::Allow
                })
                .with_new_window_req_handler(move |url| {
                    popups.check(&url) == RequestVerdict::Allow
                })
        }
        WindowContent::Local(path) => builder
            .with_url(assets::local_url(path))
            .with_custom_protocol(
                assets::PROTOCOL.into(),
                move |_webview_id, request| assets::respond(request),
            ),
    };

    #[cfg(any(
        target_os = "linux",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd"
    ))]
    let webview = {
        use tao::platform::unix::WindowExtUnix;
        use wry::WebViewBuilderExtUnix;
        let vbox = window.default_vbox().ok_or("Window has no content box")?;
        builder.build_gtk(vbox)?
    };

    #[cfg(not(any(
        target_os = "linux",
        target_os = "dragonfly",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd"
    )))]
    let webview = builder.build(window)?;

    Ok(webview)
}

fn center_over(window: &Window, parent: &Window) {
    match parent.outer_position() {
        Ok(origin) => center_in(window, origin, parent.outer_size()),
        Err(_) => center_on_monitor(window),
    }
}

fn center_on_monitor(window: &Window) {
    if let Some(monitor) = window.current_monitor() {
        center_in(window, monitor.position(), monitor.size());
    }
}

fn center_in(
    window: &Window,
    origin: PhysicalPosition<i32>,
    area: PhysicalSize<u32>,
) {
    let size = window.outer_size();
    let x = origin.x + (area.width as i32 - size.width as i32) / 2;
    let y = origin.y + (area.height as i32 - size.height as i32) / 2;
    window.set_outer_position(PhysicalPosition::new(x, y));
}

pub fn inject_css_script(css: &str) -> Result<String, serde_json::Error> {
    Ok(format!(
        "(() => {{ const style = document.createElement('style'); \
         style.textContent = {}; \
         (document.head || document.documentElement)\
         .appendChild(style); }})();",
        serde_json::to_string(css)?
    ))
}

pub const CLEAR_KEY_UP_SUPPRESSION_SCRIPT: &str =
    "window.__kiosk && window.__kiosk.clearSuppressedKeyUps();";

pub fn suppress_key_up_script(key: &Key) -> Result<String, serde_json::Error> {
    Ok(format!(
        "window.__kiosk && window.__kiosk.suppressNextKeyUp({});",
        serde_json::to_string(key.dom_key())?
    ))
}
