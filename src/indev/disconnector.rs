//! Device disconnection
//!
//! The registry owns every binding, so removing the record is the single
//! release point for a device.

use log::{debug, info, warn};

use super::backend::InputBackend;
use super::connector::is_input_node;
use super::monitor::{BusDevice, DeviceBus};
use super::InputDevices;

impl<B: InputBackend, Bus: DeviceBus> InputDevices<B, Bus> {
    pub(crate) fn disconnect_bus_device(&mut self, device: &BusDevice) {
        match device.devnode.as_deref().filter(|n| is_input_node(n)) {
            Some(node) => self.disconnect_node(node),
            None => debug!("Ignoring unsupported input device {}", device.syspath),
        }
    }

    /// Disconnect a device by node path.
    ///
    /// Unknown nodes are a no-op: hotplug removals and explicit calls may
    /// both arrive for the same device.
    pub fn disconnect_node(&mut self, node: &str) {
        let Some(index) = self.registry.find(node) else {
            warn!("Ignoring already disconnected input device {}", node);
            return;
        };

        match self.registry.remove(index) {
            Ok(()) => info!("Disconnected input device {}", node),
            Err(e) => warn!("Could not disconnect input device {}: {}", node, e),
        }
    }
}
