//! Capability classification
//!
//! Maps a backend device binding to the input roles it can fulfill.

use std::fmt;

use bitflags::bitflags;

use super::backend::BackendBinding;

bitflags! {
    /// Input roles a device fulfills
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Capability: u8 {
        const KEYBOARD = 0b001;
        const POINTER = 0b010;
        const TOUCH = 0b100;
    }
}

impl Capability {
    /// Build a mask from individual role switches (config / CLI)
    pub fn from_flags(keyboard: bool, pointer: bool, touch: bool) -> Self {
        let mut mask = Self::empty();
        mask.set(Self::KEYBOARD, keyboard);
        mask.set(Self::POINTER, pointer);
        mask.set(Self::TOUCH, touch);
        mask
    }

    pub fn is_keyboard(self) -> bool {
        self.contains(Self::KEYBOARD)
    }

    pub fn is_pointer(self) -> bool {
        self.contains(Self::POINTER)
    }

    pub fn is_touch(self) -> bool {
        self.contains(Self::TOUCH)
    }

    /// Role used for UI binding when a device reports several.
    ///
    /// Keyboard wins over pointer, pointer over touch.
    pub fn primary(self) -> Option<Self> {
        [Self::KEYBOARD, Self::POINTER, Self::TOUCH]
            .into_iter()
            .find(|role| self.contains(*role))
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(describe).collect();
        f.write_str(&names.join("+"))
    }
}

/// Query the capability mask of an opened device.
///
/// Unsupported devices yield the empty mask; bits outside the known roles
/// are dropped. The keyboard role requires an Enter or keypad Enter key, so
/// power buttons and volume keys do not count as keyboards; the backend
/// applies that rule when reporting.
pub fn classify<B: BackendBinding + ?Sized>(binding: &B) -> Capability {
    binding.capability() & Capability::all()
}

/// Short diagnostic label for a single-role mask
pub fn describe(mask: Capability) -> &'static str {
    if mask == Capability::KEYBOARD {
        "keyboard"
    } else if mask == Capability::POINTER {
        "pointer"
    } else if mask == Capability::TOUCH {
        "touch"
    } else if mask.is_empty() {
        "none"
    } else {
        "mixed"
    }
}
