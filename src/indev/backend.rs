//! Input backend interface
//!
//! The backend opens device nodes and reads their events. Each opened device
//! is represented by a binding that releases its backend state when dropped.

use super::capability::Capability;

/// Opens device nodes on behalf of the connector
pub trait InputBackend {
    type Binding: BackendBinding;

    /// Open and query a device node.
    ///
    /// Returns None if the backend cannot drive the node. Nothing stays
    /// acquired in that case.
    fn open(&mut self, node: &str) -> Option<Self::Binding>;
}

/// Per-device backend state, exclusively owned by its device record
pub trait BackendBinding {
    /// Capabilities reported by the backend
    fn capability(&self) -> Capability;

    /// Human-readable device name, if the backend knows one
    fn name(&self) -> Option<String> {
        None
    }

    /// Append pending input samples without blocking
    fn read(&mut self, out: &mut Vec<InputSample>);
}

/// Device input translated by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum InputSample {
    /// Key press/release
    Key {
        /// evdev keycode (no xkb offset)
        keycode: u32,
        keysym: u32,
        /// UTF-8 produced by the key (may be empty)
        text: String,
        pressed: bool,
    },
    /// Relative pointer motion
    Motion { dx: f64, dy: f64 },
    /// Absolute pointer position (display coordinates)
    Position { x: f64, y: f64 },
    /// Pointer button press/release
    Button { button: u32, pressed: bool },
    /// Touch contact (display coordinates)
    Touch { slot: u32, x: f64, y: f64, pressed: bool },
}
