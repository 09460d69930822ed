//! Input device management
//!
//! Discovers physical keyboards, pointers and touchscreens, registers them
//! with the UI endpoint table and follows udev hotplug events.
//!
//! ```text
//! InputDevices (facade)
//!   ├─ HotplugMonitor ── DeviceBus (udev)
//!   ├─ connect    ── InputBackend (libinput) → classify → Registry
//!   └─ disconnect ── Registry
//! ```
//!
//! Everything runs on the host loop's thread; there is no locking.

pub mod backend;
pub mod capability;
mod connector;
mod disconnector;
pub mod error;
pub mod libinput;
pub mod monitor;
pub mod registry;
#[cfg(target_os = "linux")]
pub mod udev_bus;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{BackendBinding, InputBackend, InputSample};
pub use capability::{classify, describe, Capability};
pub use error::IndevError;
pub use libinput::LibinputBackend;
pub use monitor::{BusChannel, BusDevice, DeviceBus, HotplugAction, HotplugEvent, HotplugMonitor};
pub use registry::{DeviceRecord, Registry};
#[cfg(target_os = "linux")]
pub use udev_bus::UdevBus;

use log::{debug, info, warn};

use crate::ui::{Cursor, FocusGroup, InputHub};

/// Input subsystem context.
///
/// Owns the registry, the hotplug monitor and the per-session settings
/// (allowed capabilities, keyboard focus group, shared cursor).
pub struct InputDevices<B: InputBackend, Bus: DeviceBus> {
    backend: B,
    monitor: HotplugMonitor<Bus>,
    registry: Registry<B::Binding>,
    hub: InputHub,
    /// Roles a device must have at least one of to be connected
    allowed: Capability,
    keyboard_group: Option<FocusGroup>,
    /// Created on first pointer connect, shared by all pointer endpoints
    cursor: Option<Cursor>,
    samples: Vec<InputSample>,
}

impl<B: InputBackend, Bus: DeviceBus> InputDevices<B, Bus> {
    /// Nothing is allowed until `configure_allowed_capabilities` is called
    pub fn new(backend: B, bus: Bus, hub: InputHub) -> Self {
        Self {
            backend,
            monitor: HotplugMonitor::new(bus),
            registry: Registry::new(),
            hub,
            allowed: Capability::empty(),
            keyboard_group: None,
            cursor: None,
            samples: Vec::new(),
        }
    }

    /// Set the allowed capability set.
    ///
    /// Only affects future connects; registered devices stay.
    pub fn configure_allowed_capabilities(&mut self, keyboard: bool, pointer: bool, touch: bool) {
        self.allowed = Capability::from_flags(keyboard, pointer, touch);
        info!("Allowed input capabilities: {}", self.allowed);
    }

    pub fn allowed_capabilities(&self) -> Capability {
        self.allowed
    }

    /// Connect every input device currently present.
    ///
    /// Returns the number of devices connected.
    pub fn enumerate_and_connect_all(&mut self) -> usize {
        info!("Auto-connecting supported input devices");

        let devices = match self.monitor.enumerate() {
            Ok(devices) => devices,
            Err(e) => {
                warn!("Could not enumerate input devices: {}", e);
                return 0;
            }
        };

        devices
            .iter()
            .filter(|device| self.connect_bus_device(device))
            .count()
    }

    /// Start hotplug monitoring (no-op if already running)
    pub fn start_monitor(&mut self) -> Result<(), IndevError> {
        self.monitor.start()
    }

    /// Stop hotplug monitoring (no-op if not running)
    pub fn stop_monitor(&mut self) {
        self.monitor.stop();
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_running()
    }

    /// Apply pending hotplug events.
    ///
    /// Returns the number of add/remove events seen.
    pub fn poll_and_apply(&mut self) -> usize {
        let events: Vec<HotplugEvent> = self.monitor.poll().collect();
        for event in &events {
            debug!("Hotplug {:?}: {}", event.action, event.device.syspath);
            match event.action {
                HotplugAction::Added => {
                    self.connect_bus_device(&event.device);
                }
                HotplugAction::Removed => self.disconnect_bus_device(&event.device),
            }
        }
        events.len()
    }

    /// Store the keyboard focus group and apply it to every connected keyboard
    pub fn set_keyboard_group(&mut self, group: FocusGroup) {
        for record in self.registry.iter().filter(|r| r.is_keyboard()) {
            record.endpoint().set_group(Some(&group));
        }
        self.keyboard_group = Some(group);
    }

    /// True if any connected device has the keyboard capability
    pub fn is_keyboard_connected(&self) -> bool {
        self.registry.iter().any(|r| r.is_keyboard())
    }

    /// Read pending input from every device and deliver it to its endpoint
    pub fn read_input(&mut self) {
        for record in self.registry.iter_mut() {
            let (binding, endpoint) = record.binding_and_endpoint();
            binding.read(&mut self.samples);
            for sample in self.samples.drain(..) {
                endpoint.deliver(sample);
            }
        }
    }

    /// Read-only view of the connected devices
    pub fn registry(&self) -> &Registry<B::Binding> {
        &self.registry
    }

    /// Stop monitoring and release every device in connection order
    pub fn shutdown(&mut self) {
        self.monitor.stop();
        while !self.registry.is_empty() {
            let node = self
                .registry
                .get(0)
                .map(|r| r.node().to_string())
                .unwrap_or_default();
            if let Err(e) = self.registry.remove(0) {
                warn!("Could not release input device {}: {}", node, e);
                break;
            }
            info!("Disconnected input device {}", node);
        }
    }
}

impl<B: InputBackend, Bus: DeviceBus> Drop for InputDevices<B, Bus> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indev::testing::{FakeBackend, FakeBus};

    type Devices = InputDevices<FakeBackend, FakeBus>;

    fn node(n: u32) -> String {
        format!("/dev/input/event{}", n)
    }

    fn setup() -> (Devices, FakeBackend, FakeBus, InputHub) {
        let backend = FakeBackend::new();
        let bus = FakeBus::new();
        let hub = InputHub::new();
        let devices = InputDevices::new(backend.clone(), bus.clone(), hub.clone());
        (devices, backend, bus, hub)
    }

    #[test]
    fn test_enumerate_mixed_devices() {
        let (mut devices, backend, bus, hub) = setup();
        backend.add_device(&node(0), Capability::KEYBOARD);
        backend.add_device(&node(1), Capability::POINTER);
        backend.add_device(&node(2), Capability::KEYBOARD | Capability::POINTER);
        for n in 0..3 {
            bus.add_present(&node(n));
        }
        // Device without a node and a legacy mouse node are skipped
        bus.add_present_without_node("/sys/devices/virtual/input/input9");
        bus.add_present("/dev/input/mouse0");

        devices.configure_allowed_capabilities(true, true, true);
        assert_eq!(devices.enumerate_and_connect_all(), 3);
        assert_eq!(devices.registry().count(), 3);
        assert!(devices.is_keyboard_connected());
        assert_eq!(hub.endpoint_count(), 3);
    }

    #[test]
    fn test_nothing_allowed_by_default() {
        let (mut devices, backend, bus, hub) = setup();
        backend.add_device(&node(0), Capability::KEYBOARD);
        bus.add_present(&node(0));

        assert_eq!(devices.enumerate_and_connect_all(), 0);
        assert_eq!(devices.registry().count(), 0);
        assert_eq!(hub.endpoint_count(), 0);
        assert_eq!(backend.live_bindings(), 0);
    }

    #[test]
    fn test_enumerate_without_bus() {
        let (mut devices, _backend, bus, _hub) = setup();
        bus.fail_scan(true);
        devices.configure_allowed_capabilities(true, true, true);
        assert_eq!(devices.enumerate_and_connect_all(), 0);
    }

    #[test]
    fn test_poll_applies_add_and_remove() {
        let (mut devices, backend, bus, _hub) = setup();
        backend.add_device(&node(3), Capability::KEYBOARD);
        backend.add_device(&node(4), Capability::POINTER);
        devices.configure_allowed_capabilities(true, true, true);
        devices.start_monitor().unwrap();
        devices.connect_node(&node(4)).unwrap();

        bus.push("add", &node(3));
        bus.push("remove", &node(4));
        assert_eq!(devices.poll_and_apply(), 2);

        assert!(devices.registry().contains(&node(3)));
        assert!(!devices.registry().contains(&node(4)));
        assert_eq!(devices.registry().count(), 1);
        assert_eq!(backend.live_bindings(), 1);
    }

    #[test]
    fn test_poll_without_monitor_does_nothing() {
        let (mut devices, backend, bus, _hub) = setup();
        backend.add_device(&node(3), Capability::KEYBOARD);
        devices.configure_allowed_capabilities(true, true, true);
        bus.push("add", &node(3));
        assert_eq!(devices.poll_and_apply(), 0);
        assert_eq!(devices.registry().count(), 0);
    }

    #[test]
    fn test_monitor_start_stop_idempotent() {
        let (mut devices, _backend, bus, _hub) = setup();
        let stats = bus.stats();
        devices.start_monitor().unwrap();
        devices.start_monitor().unwrap();
        assert_eq!(stats.live_channels.get(), 1);
        devices.stop_monitor();
        devices.stop_monitor();
        assert_eq!(stats.live_channels.get(), 0);
        assert_eq!(stats.subscriptions.get(), 1);
    }

    #[test]
    fn test_enumeration_works_without_monitor() {
        let (mut devices, backend, bus, _hub) = setup();
        bus.fail_subscribe(true);
        backend.add_device(&node(0), Capability::TOUCH);
        bus.add_present(&node(0));
        devices.configure_allowed_capabilities(true, true, true);

        assert!(devices.start_monitor().is_err());
        assert!(!devices.is_monitoring());
        assert_eq!(devices.enumerate_and_connect_all(), 1);
    }

    #[test]
    fn test_keyboard_group_applied_retroactively() {
        let (mut devices, backend, _bus, hub) = setup();
        backend.add_device(&node(0), Capability::KEYBOARD);
        backend.add_device(&node(1), Capability::POINTER);
        devices.configure_allowed_capabilities(true, true, true);
        devices.connect_node(&node(0)).unwrap();
        devices.connect_node(&node(1)).unwrap();

        let keyboard = devices.registry().get(0).unwrap().endpoint().id();
        let pointer = devices.registry().get(1).unwrap().endpoint().id();
        assert_eq!(hub.endpoint(keyboard).unwrap().group, None);

        let group = hub.create_group("password");
        devices.set_keyboard_group(group.clone());
        assert_eq!(hub.endpoint(keyboard).unwrap().group, Some(group.clone()));
        assert_eq!(hub.endpoint(pointer).unwrap().group, None);

        // Future keyboards get it on connect
        backend.add_device(&node(2), Capability::KEYBOARD);
        devices.connect_node(&node(2)).unwrap();
        let later = devices.registry().get(2).unwrap().endpoint().id();
        assert_eq!(hub.endpoint(later).unwrap().group, Some(group));
    }

    #[test]
    fn test_read_input_delivers_to_endpoints() {
        let (mut devices, backend, _bus, hub) = setup();
        backend.add_device(&node(0), Capability::KEYBOARD);
        backend.add_device(&node(1), Capability::TOUCH);
        devices.configure_allowed_capabilities(true, true, true);
        devices.set_keyboard_group(hub.create_group("password"));
        devices.connect_node(&node(0)).unwrap();
        devices.connect_node(&node(1)).unwrap();

        backend.queue_sample(
            &node(0),
            InputSample::Key {
                keycode: 30,
                keysym: 0x61,
                text: "a".into(),
                pressed: true,
            },
        );
        backend.queue_sample(
            &node(1),
            InputSample::Touch {
                slot: 0,
                x: 10.0,
                y: 20.0,
                pressed: true,
            },
        );
        devices.read_input();

        let events = hub.drain_events();
        assert_eq!(events.len(), 2);
        assert!(events[0].group.is_some());
        assert!(matches!(events[1].sample, InputSample::Touch { slot: 0, .. }));
    }

    #[test]
    fn test_shutdown_releases_everything() {
        let (mut devices, backend, bus, hub) = setup();
        let stats = bus.stats();
        for n in 0..4 {
            backend.add_device(&node(n), Capability::POINTER);
        }
        devices.configure_allowed_capabilities(true, true, true);
        devices.start_monitor().unwrap();
        for n in 0..4 {
            devices.connect_node(&node(n)).unwrap();
        }

        devices.shutdown();
        assert_eq!(devices.registry().count(), 0);
        assert_eq!(backend.live_bindings(), 0);
        assert_eq!(hub.endpoint_count(), 0);
        assert_eq!(stats.live_channels.get(), 0);

        // Drop after shutdown must not double-release
        drop(devices);
        assert_eq!(backend.live_bindings(), 0);
    }

    #[test]
    fn test_connect_disconnect_churn_keeps_count() {
        let (mut devices, backend, _bus, hub) = setup();
        for n in 0..8 {
            let capability = match n % 3 {
                0 => Capability::KEYBOARD,
                1 => Capability::POINTER,
                _ => Capability::TOUCH,
            };
            backend.add_device(&node(n), capability);
        }
        devices.configure_allowed_capabilities(true, true, true);

        // Deterministic LCG drives the sequence
        let mut seed: u32 = 0x2545_f491;
        let mut connects = 0usize;
        let mut disconnects = 0usize;
        for _ in 0..500 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let n = (seed >> 16) % 10;
            let target = node(n);
            if (seed >> 8) & 1 == 0 {
                if devices.connect_node(&target).is_ok() {
                    connects += 1;
                }
            } else {
                let present = devices.registry().contains(&target);
                devices.disconnect_node(&target);
                if present {
                    disconnects += 1;
                }
            }

            let registry = devices.registry();
            assert_eq!(registry.count(), connects - disconnects);
            let mut seen: Vec<&str> = registry.iter().map(|r| r.node()).collect();
            seen.sort_unstable();
            seen.dedup();
            assert_eq!(seen.len(), registry.count());
            assert_eq!(backend.live_bindings(), registry.count());
            assert_eq!(hub.endpoint_count(), registry.count());
        }
    }
}
