//! Device connection
//!
//! A connect attempt either ends with a fully registered record or releases
//! everything it acquired. The record only becomes visible to the rest of
//! the subsystem on the final registry insert.

use log::{debug, error, info, warn};

use super::backend::InputBackend;
use super::capability::{classify, describe, Capability};
use super::error::IndevError;
use super::monitor::{BusDevice, DeviceBus};
use super::registry::DeviceRecord;
use super::InputDevices;
use crate::constants::{INPUT_DEVICE_NODE_PREFIX, LONG_PRESS_REPEAT_DISABLED};
use crate::ui::EndpointKind;

/// Endpoint flavour for a connected role
pub(crate) fn endpoint_kind(primary: Capability) -> EndpointKind {
    if primary == Capability::KEYBOARD {
        EndpointKind::Keypad
    } else {
        EndpointKind::Pointer {
            long_press_repeat_ms: LONG_PRESS_REPEAT_DISABLED,
        }
    }
}

pub(crate) fn is_input_node(node: &str) -> bool {
    node.starts_with(INPUT_DEVICE_NODE_PREFIX)
}

impl<B: InputBackend, Bus: DeviceBus> InputDevices<B, Bus> {
    /// Connect a bus device. Returns true if it was registered.
    pub(crate) fn connect_bus_device(&mut self, device: &BusDevice) -> bool {
        let Some(node) = device.devnode.as_deref().filter(|n| is_input_node(n)) else {
            debug!("Ignoring unsupported input device {}", device.syspath);
            return false;
        };
        self.connect_node(node).is_ok()
    }

    /// Connect a device by node path.
    ///
    /// Returns the registry index of the new record.
    pub fn connect_node(&mut self, node: &str) -> Result<usize, IndevError> {
        if !is_input_node(node) {
            debug!("Ignoring unsupported input device {}", node);
            return Err(IndevError::UnsupportedNode(node.to_string()));
        }

        if self.registry.contains(node) {
            warn!("Ignoring already connected input device {}", node);
            return Err(IndevError::DuplicateDevice(node.to_string()));
        }

        let Some(binding) = self.backend.open(node) else {
            warn!(
                "Aborting connection of input device {} because libinput failed to connect it",
                node
            );
            return Err(IndevError::BackendOpenFailed(node.to_string()));
        };

        let reported = classify(&binding);
        let capability = reported & self.allowed;
        let Some(primary) = capability.primary() else {
            warn!(
                "Aborting connection of input device {} because it has no allowed capabilities ({})",
                node, reported
            );
            drop(binding);
            return Err(IndevError::NoAllowedCapability {
                node: node.to_string(),
                capability: reported,
            });
        };

        let kind = endpoint_kind(primary);
        let endpoint = self.hub.register(kind);

        if capability.is_keyboard() {
            // No group yet: applied later by set_keyboard_group
            endpoint.set_group(self.keyboard_group.as_ref());
        }

        if capability.is_pointer() {
            let cursor = *self.cursor.get_or_insert_with(|| self.hub.create_cursor());
            endpoint.set_cursor(&cursor);
        }

        let record = DeviceRecord::new(node.to_string(), capability, binding, endpoint);
        let index = self.registry.insert(record).map_err(|e| {
            error!("Aborting connection of input device {}: {}", node, e);
            e
        })?;

        info!(
            "Connected input device {} ({}, {:?})",
            node,
            describe(primary),
            kind
        );
        Ok(index)
    }
}
