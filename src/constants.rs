//! Global constants for unlockboard
//!
//! Device paths, bus names and loop timings used across the input subsystem
//! and the host loop.

// ============================================================================
// Device Bus
// ============================================================================

/// Only evdev character devices are driven; other input nodes (js*, mouse*)
/// and device-less syspaths are ignored.
pub const INPUT_DEVICE_NODE_PREFIX: &str = "/dev/input/event";

/// udev subsystem used for enumeration and the hotplug filter
pub const INPUT_SUBSYSTEM: &str = "input";

/// udev action strings
pub const ACTION_ADD: &str = "add";
pub const ACTION_REMOVE: &str = "remove";

/// Upper bound on notifications consumed by a single monitor poll
pub const MAX_EVENTS_PER_POLL: usize = 64;

/// evdev codes a device must have to count as a text keyboard
pub const KEY_ENTER: u32 = 28;
pub const KEY_KPENTER: u32 = 96;

// ============================================================================
// UI Endpoints
// ============================================================================

/// Long-press repeat time for pointer endpoints.
/// Maximum value so touch hardware never triggers long-press gestures.
pub const LONG_PRESS_REPEAT_DISABLED: u16 = u16::MAX;

// ============================================================================
// Timing Constants
// ============================================================================

/// Host loop tick for reading device input (milliseconds)
pub const INPUT_READ_INTERVAL_MS: u64 = 10;

/// Default hotplug poll interval (milliseconds)
pub const DEFAULT_MONITOR_POLL_INTERVAL_MS: u64 = 1000;

/// Lower bound for the configured hotplug poll interval (milliseconds)
pub const MIN_MONITOR_POLL_INTERVAL_MS: u64 = 50;
