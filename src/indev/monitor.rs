//! Hotplug monitor
//!
//! Wraps a kernel device-notification channel filtered to the input
//! subsystem. Polling never blocks: each call consumes only what is pending
//! when readiness is checked.

use log::{debug, info, warn};

use super::error::IndevError;
use crate::constants::{ACTION_ADD, ACTION_REMOVE, INPUT_SUBSYSTEM, MAX_EVENTS_PER_POLL};

/// Device as reported by the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusDevice {
    /// sysfs path (always present)
    pub syspath: String,
    /// Device node, if the device has one
    pub devnode: Option<String>,
}

/// Notification as received from the bus (action string unparsed)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusEvent {
    pub action: Option<String>,
    pub device: BusDevice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotplugAction {
    Added,
    Removed,
}

impl HotplugAction {
    /// Map a bus action string; other actions (change, bind, ...) yield None
    pub fn parse(action: &str) -> Option<Self> {
        match action {
            ACTION_ADD => Some(Self::Added),
            ACTION_REMOVE => Some(Self::Removed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotplugEvent {
    pub action: HotplugAction,
    pub device: BusDevice,
}

/// Kernel device bus (udev in production)
pub trait DeviceBus {
    type Channel: BusChannel;

    /// Acquire a context, subscribe to `subsystem` and obtain a readiness
    /// descriptor. Partial state must not outlive a failed call.
    fn subscribe(&mut self, subsystem: &str) -> Result<Self::Channel, IndevError>;

    /// Devices of `subsystem` currently present
    fn scan(&mut self, subsystem: &str) -> Result<Vec<BusDevice>, IndevError>;
}

/// Live subscription; dropping it releases the subscription and its context
pub trait BusChannel {
    /// Zero-timeout readiness check
    fn is_ready(&mut self) -> bool;

    /// Receive one pending notification
    fn receive(&mut self) -> Option<BusEvent>;
}

/// Start/stop wrapper owning the subscription
pub struct HotplugMonitor<Bus: DeviceBus> {
    bus: Bus,
    channel: Option<Bus::Channel>,
}

impl<Bus: DeviceBus> HotplugMonitor<Bus> {
    pub fn new(bus: Bus) -> Self {
        Self { bus, channel: None }
    }

    pub fn is_running(&self) -> bool {
        self.channel.is_some()
    }

    /// Start monitoring. Starting a running monitor is a no-op.
    pub fn start(&mut self) -> Result<(), IndevError> {
        if self.channel.is_some() {
            warn!("Not starting udev monitor because it is already running");
            return Ok(());
        }

        match self.bus.subscribe(INPUT_SUBSYSTEM) {
            Ok(channel) => {
                self.channel = Some(channel);
                info!("Input hotplug monitor started");
                Ok(())
            }
            Err(e) => {
                warn!("Could not start udev monitor: {}", e);
                self.stop();
                Err(e)
            }
        }
    }

    /// Stop monitoring. Safe to call when not started.
    pub fn stop(&mut self) {
        if let Some(channel) = self.channel.take() {
            drop(channel);
            info!("Input hotplug monitor stopped");
        }
    }

    /// Pending add/remove notifications.
    ///
    /// Yields nothing if the monitor is not running or nothing is pending.
    pub fn poll(&mut self) -> Poll<'_, Bus::Channel> {
        if self.channel.is_none() {
            debug!("Cannot query udev monitor because it is not running");
        }
        Poll {
            channel: self.channel.as_mut(),
            budget: MAX_EVENTS_PER_POLL,
        }
    }

    /// Devices currently present on the bus (independent of monitoring)
    pub fn enumerate(&mut self) -> Result<Vec<BusDevice>, IndevError> {
        self.bus.scan(INPUT_SUBSYSTEM)
    }
}

/// Lazy sequence returned by [`HotplugMonitor::poll`]
pub struct Poll<'a, C: BusChannel> {
    channel: Option<&'a mut C>,
    budget: usize,
}

impl<C: BusChannel> Iterator for Poll<'_, C> {
    type Item = HotplugEvent;

    fn next(&mut self) -> Option<HotplugEvent> {
        let channel = self.channel.as_mut()?;
        while self.budget > 0 && channel.is_ready() {
            self.budget -= 1;
            let Some(event) = channel.receive() else {
                continue;
            };
            let Some(action) = event.action.as_deref().and_then(HotplugAction::parse) else {
                debug!(
                    "Skipping udev event {:?} for {}",
                    event.action, event.device.syspath
                );
                continue;
            };
            return Some(HotplugEvent {
                action,
                device: event.device,
            });
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indev::testing::FakeBus;

    #[test]
    fn test_start_twice_keeps_single_channel() {
        let bus = FakeBus::new();
        let stats = bus.stats();
        let mut monitor = HotplugMonitor::new(bus);

        monitor.start().unwrap();
        monitor.start().unwrap();
        assert!(monitor.is_running());
        assert_eq!(stats.subscriptions.get(), 1);
        assert_eq!(stats.live_channels.get(), 1);

        monitor.stop();
        assert!(!monitor.is_running());
        assert_eq!(stats.live_channels.get(), 0);

        // Second stop is a no-op
        monitor.stop();
        assert_eq!(stats.live_channels.get(), 0);
    }

    #[test]
    fn test_stop_without_start() {
        let mut monitor = HotplugMonitor::new(FakeBus::new());
        monitor.stop();
        assert!(!monitor.is_running());
    }

    #[test]
    fn test_failed_start_leaves_nothing() {
        let bus = FakeBus::new();
        let stats = bus.stats();
        bus.fail_subscribe(true);
        let mut monitor = HotplugMonitor::new(bus);

        let err = monitor.start().unwrap_err();
        assert!(matches!(err, IndevError::MonitorUnavailable { .. }));
        assert!(!monitor.is_running());
        assert_eq!(stats.live_channels.get(), 0);
        assert_eq!(monitor.poll().count(), 0);
    }

    #[test]
    fn test_poll_yields_in_arrival_order() {
        let bus = FakeBus::new();
        let mut monitor = HotplugMonitor::new(bus.clone());
        monitor.start().unwrap();

        bus.push("add", "/dev/input/event5");
        bus.push("change", "/dev/input/event5");
        bus.push("remove", "/dev/input/event2");

        let events: Vec<_> = monitor.poll().collect();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, HotplugAction::Added);
        assert_eq!(events[0].device.devnode.as_deref(), Some("/dev/input/event5"));
        assert_eq!(events[1].action, HotplugAction::Removed);
        assert_eq!(events[1].device.devnode.as_deref(), Some("/dev/input/event2"));

        // Nothing pending: returns immediately
        assert_eq!(monitor.poll().count(), 0);
    }

    #[test]
    fn test_poll_not_running_is_empty() {
        let bus = FakeBus::new();
        let mut monitor = HotplugMonitor::new(bus.clone());
        bus.push("add", "/dev/input/event1");
        assert_eq!(monitor.poll().count(), 0);
    }

    #[test]
    fn test_poll_is_bounded() {
        let bus = FakeBus::new();
        let mut monitor = HotplugMonitor::new(bus.clone());
        monitor.start().unwrap();
        for i in 0..(MAX_EVENTS_PER_POLL + 3) {
            bus.push("add", &format!("/dev/input/event{}", i));
        }
        assert_eq!(monitor.poll().count(), MAX_EVENTS_PER_POLL);
        assert_eq!(monitor.poll().count(), 3);
    }

    #[test]
    fn test_parse_action() {
        assert_eq!(HotplugAction::parse("add"), Some(HotplugAction::Added));
        assert_eq!(HotplugAction::parse("remove"), Some(HotplugAction::Removed));
        assert_eq!(HotplugAction::parse("change"), None);
    }
}
