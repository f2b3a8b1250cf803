use std::collections::HashMap;
use std::error::Error;

use global_hotkey::hotkey::{Code, HotKey};
use global_hotkey::{GlobalHotKeyEvent, GlobalHotKeyManager, HotKeyState};
use log::{debug, warn};
use tao::event_loop::EventLoopProxy;

use super::app::ShellEvent;
use crate::shell::Accelerator;

/// Process-global shortcuts. Registered hotkeys fire whether or not any
/// kiosk window has focus.
pub struct Accelerators {
    manager: GlobalHotKeyManager,
    registered: HashMap<u32, (Accelerator, HotKey)>,
}

impl Accelerators {
    pub fn new(
        proxy: EventLoopProxy<ShellEvent>,
    ) -> Result<Self, Box<dyn Error>> {
        let manager = GlobalHotKeyManager::new()?;

        GlobalHotKeyEvent::set_event_handler(Some(
            move |event: GlobalHotKeyEvent| {
                if event.state == HotKeyState::Pressed {
                    let _ = proxy.send_event(ShellEvent::HotKey(event.id));
                }
            },
        ));

        Ok(Self {
            manager,
            registered: HashMap::new(),
        })
    }

    pub fn register(&mut self, accelerator: Accelerator) {
        let hotkey = hotkey_for(accelerator);
        let id = hotkey.id();
        if self.registered.contains_key(&id) {
            return;
        }

        match self.manager.register(hotkey) {
            Ok(()) => {
                debug!("Registered {:?}", accelerator);
                self.registered.insert(id, (accelerator, hotkey));
            }
            Err(err) => warn!("Unable to register {:?}: {}", accelerator, err),
        }
    }

    pub fn unregister(&mut self, accelerator: Accelerator) {
        let id = hotkey_for(accelerator).id();
        let Some((_, hotkey)) = self.registered.remove(&id) else {
            return;
        };

        match self.manager.unregister(hotkey) {
            Ok(()) => debug!("Unregistered {:?}", accelerator),
            Err(err) => {
                warn!("Unable to unregister {:?}: {}", accelerator, err)
            }
        }
    }

    pub fn lookup(&self, id: u32) -> Option<Accelerator> {
        self.registered.get(&id).map(|(accelerator, _)| *accelerator)
    }
}

fn hotkey_for(accelerator: Accelerator) -> HotKey {
    match accelerator {
        Accelerator::ToggleFullscreen => HotKey::new(None, Code::F11),
    }
}
