//! libinput backend
//!
//! Every connected node gets its own path-based libinput context, so a
//! device can be added and dropped without touching the others.
//! Key codes are translated with xkbcommon using the configured keymap.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::OwnedFd;
use std::path::Path;

use anyhow::{anyhow, Result};
use input::event::keyboard::{KeyState, KeyboardEventTrait};
use input::event::pointer::ButtonState;
use input::event::touch::{TouchEvent, TouchEventPosition, TouchEventSlot};
use input::event::{Event, KeyboardEvent, PointerEvent};
use input::{DeviceCapability, Libinput, LibinputInterface};
use log::{debug, info, trace, warn};
use xkbcommon::xkb;

use super::backend::{BackendBinding, InputBackend, InputSample};
use super::capability::Capability;
use crate::config::KeyboardConfig;
use crate::constants::{KEY_ENTER, KEY_KPENTER};

/// LibinputInterface implementation opening device files directly
struct InputInterface;

impl LibinputInterface for InputInterface {
    fn open_restricted(&mut self, path: &Path, flags: i32) -> std::result::Result<OwnedFd, i32> {
        let f = OpenOptions::new()
            .read(true)
            .write((flags & libc::O_WRONLY != 0) || (flags & libc::O_RDWR != 0))
            .custom_flags(flags & !libc::O_WRONLY & !libc::O_RDWR & !libc::O_RDONLY)
            .open(path)
            .map_err(|e| {
                warn!("Cannot open device: {:?}: {}", path, e);
                e.raw_os_error().unwrap_or(-libc::ENOENT)
            })?;
        Ok(OwnedFd::from(f))
    }

    fn close_restricted(&mut self, fd: OwnedFd) {
        drop(fd);
    }
}

/// Opens evdev nodes through libinput
pub struct LibinputBackend {
    /// Shared keymap (reference counted by xkbcommon)
    keymap: xkb::Keymap,
    /// Display size for absolute pointer / touch transforms
    width: u32,
    height: u32,
}

impl LibinputBackend {
    /// Compile the keymap and remember the display size
    pub fn new(width: u32, height: u32, kb_config: &KeyboardConfig) -> Result<Self> {
        let context = xkb::Context::new(xkb::CONTEXT_NO_FLAGS);

        // Empty strings select the system defaults
        let options = if kb_config.xkb_options.is_empty() {
            None
        } else {
            Some(kb_config.xkb_options.clone())
        };

        let keymap = xkb::Keymap::new_from_names(
            &context,
            "",
            &kb_config.xkb_model,
            &kb_config.xkb_layout,
            &kb_config.xkb_variant,
            options,
            xkb::COMPILE_NO_FLAGS,
        )
        .ok_or_else(|| {
            anyhow!(
                "Failed to create xkb keymap (model={}, layout={}, variant={}, options={})",
                kb_config.xkb_model,
                kb_config.xkb_layout,
                kb_config.xkb_variant,
                kb_config.xkb_options
            )
        })?;

        info!(
            "libinput backend initialized (layout={}, display={}x{})",
            if kb_config.xkb_layout.is_empty() { "default" } else { &kb_config.xkb_layout },
            width,
            height
        );

        Ok(Self {
            keymap,
            width: width.max(1),
            height: height.max(1),
        })
    }
}

impl InputBackend for LibinputBackend {
    type Binding = LibinputDevice;

    fn open(&mut self, node: &str) -> Option<LibinputDevice> {
        let mut context = Libinput::new_from_path(InputInterface);
        let device = context.path_add_device(node)?;

        debug!("libinput: opened {} ({})", node, device.name());

        Some(LibinputDevice {
            xkb_state: xkb::State::new(&self.keymap),
            touch_positions: HashMap::new(),
            width: self.width,
            height: self.height,
            device: Some(device),
            context,
        })
    }
}

/// Power buttons, lid switches and volume keys also report the keyboard
/// capability. Only devices that can submit a password (Enter or keypad
/// Enter) count as keyboards.
fn is_text_keyboard(has_capability: bool, has_key: impl Fn(u32) -> bool) -> bool {
    has_capability && (has_key(KEY_ENTER) || has_key(KEY_KPENTER))
}

/// libinput state for one device node
pub struct LibinputDevice {
    xkb_state: xkb::State,
    /// Last position per touch slot (up events carry none)
    touch_positions: HashMap<u32, (f64, f64)>,
    width: u32,
    height: u32,
    device: Option<input::Device>,
    context: Libinput,
}

impl BackendBinding for LibinputDevice {
    fn capability(&self) -> Capability {
        let Some(device) = self.device.as_ref() else {
            return Capability::empty();
        };
        Capability::from_flags(
            is_text_keyboard(device.has_capability(DeviceCapability::Keyboard), |key| {
                device.keyboard_has_key(key) == Ok(true)
            }),
            device.has_capability(DeviceCapability::Pointer),
            device.has_capability(DeviceCapability::Touch),
        )
    }

    fn name(&self) -> Option<String> {
        self.device.as_ref().map(|d| d.name().to_string())
    }

    fn read(&mut self, out: &mut Vec<InputSample>) {
        if let Err(e) = self.context.dispatch() {
            warn!("libinput dispatch error: {}", e);
            return;
        }

        while let Some(event) = self.context.next() {
            match event {
                Event::Keyboard(KeyboardEvent::Key(key_event)) => {
                    let evdev_code = key_event.key();
                    // evdev keycode -> xkb keycode (evdev + 8)
                    let xkb_keycode = xkb::Keycode::new(evdev_code + 8);
                    let key_state = key_event.key_state();

                    // Get keysym and UTF-8 (before state update)
                    let sym = self.xkb_state.key_get_one_sym(xkb_keycode);
                    let text = self.xkb_state.key_get_utf8(xkb_keycode);

                    let direction = match key_state {
                        KeyState::Pressed => xkb::KeyDirection::Down,
                        KeyState::Released => xkb::KeyDirection::Up,
                    };
                    self.xkb_state.update_key(xkb_keycode, direction);

                    out.push(InputSample::Key {
                        keycode: evdev_code,
                        keysym: sym.raw(),
                        text,
                        pressed: key_state == KeyState::Pressed,
                    });
                }
                Event::Pointer(PointerEvent::Motion(m)) => {
                    out.push(InputSample::Motion {
                        dx: m.dx(),
                        dy: m.dy(),
                    });
                }
                Event::Pointer(PointerEvent::MotionAbsolute(m)) => {
                    out.push(InputSample::Position {
                        x: m.absolute_x_transformed(self.width),
                        y: m.absolute_y_transformed(self.height),
                    });
                }
                Event::Pointer(PointerEvent::Button(b)) => {
                    out.push(InputSample::Button {
                        button: b.button(),
                        pressed: b.button_state() == ButtonState::Pressed,
                    });
                }
                Event::Touch(TouchEvent::Down(t)) => {
                    let slot = t.seat_slot();
                    let (x, y) = (t.x_transformed(self.width), t.y_transformed(self.height));
                    self.touch_positions.insert(slot, (x, y));
                    out.push(InputSample::Touch { slot, x, y, pressed: true });
                }
                Event::Touch(TouchEvent::Motion(t)) => {
                    let slot = t.seat_slot();
                    let (x, y) = (t.x_transformed(self.width), t.y_transformed(self.height));
                    self.touch_positions.insert(slot, (x, y));
                    out.push(InputSample::Touch { slot, x, y, pressed: true });
                }
                Event::Touch(TouchEvent::Up(t)) => {
                    let slot = t.seat_slot();
                    let (x, y) = self.touch_positions.remove(&slot).unwrap_or((0.0, 0.0));
                    out.push(InputSample::Touch { slot, x, y, pressed: false });
                }
                other => {
                    trace!("Unhandled libinput event: {:?}", other);
                }
            }
        }
    }
}

impl Drop for LibinputDevice {
    fn drop(&mut self) {
        if let Some(device) = self.device.take() {
            debug!("libinput: releasing {}", device.name());
            self.context.path_remove_device(device);
        }
    }
}
