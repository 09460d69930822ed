//! Device registry
//!
//! Owns the records of all connected devices. Live records form a contiguous
//! prefix of the storage; removal shifts later records forward so iteration
//! order is connection order. Storage grows geometrically (2n + 1) and never
//! shrinks.

use log::error;

use super::capability::Capability;
use super::error::IndevError;
use crate::ui::Endpoint;

/// One connected physical device.
///
/// Only constructed fully (backend opened, endpoint registered), so a record
/// in the registry always has both bindings live. Dropping the record
/// releases them: fields drop in declaration order, endpoint first.
pub struct DeviceRecord<B> {
    endpoint: Endpoint,
    binding: B,
    node: String,
    capability: Capability,
}

impl<B> DeviceRecord<B> {
    pub fn new(node: String, capability: Capability, binding: B, endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            binding,
            node,
            capability,
        }
    }

    /// Device node path (registry key)
    pub fn node(&self) -> &str {
        &self.node
    }

    /// Capabilities the device was connected with
    pub fn capability(&self) -> Capability {
        self.capability
    }

    pub fn is_keyboard(&self) -> bool {
        self.capability.is_keyboard()
    }

    pub fn is_pointer(&self) -> bool {
        self.capability.is_pointer()
    }

    pub fn binding(&self) -> &B {
        &self.binding
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Split borrow for the read path
    pub fn binding_and_endpoint(&mut self) -> (&mut B, &Endpoint) {
        (&mut self.binding, &self.endpoint)
    }
}

/// Ordered collection of connected devices
pub struct Registry<B> {
    records: Vec<DeviceRecord<B>>,
}

impl<B> Default for Registry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> Registry<B> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Index of the record for `node`.
    ///
    /// Linear scan; device counts stay in the tens.
    pub fn find(&self, node: &str) -> Option<usize> {
        self.records.iter().position(|r| r.node == node)
    }

    pub fn contains(&self, node: &str) -> bool {
        self.find(node).is_some()
    }

    /// Append a fully constructed record.
    ///
    /// On error the record is dropped, which releases its bindings; the
    /// registry is left unchanged.
    pub fn insert(&mut self, record: DeviceRecord<B>) -> Result<usize, IndevError> {
        if self.contains(&record.node) {
            return Err(IndevError::DuplicateDevice(record.node.clone()));
        }

        if self.records.len() == self.records.capacity() {
            let requested = 2 * self.records.capacity() + 1;
            reserve_slots(&mut self.records, requested)?;
        }

        self.records.push(record);
        Ok(self.records.len() - 1)
    }

    /// Remove the record at `index`, releasing its bindings exactly once and
    /// shifting every later record one slot forward.
    pub fn remove(&mut self, index: usize) -> Result<(), IndevError> {
        if index >= self.records.len() {
            return Err(IndevError::InvalidIndex {
                index,
                count: self.records.len(),
            });
        }
        drop(self.records.remove(index));
        Ok(())
    }

    /// Number of live records
    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Allocated slots (live + spare)
    pub fn capacity(&self) -> usize {
        self.records.capacity()
    }

    pub fn get(&self, index: usize) -> Option<&DeviceRecord<B>> {
        self.records.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeviceRecord<B>> {
        self.records.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut DeviceRecord<B>> {
        self.records.iter_mut()
    }
}

/// Grow `records` to hold `requested` slots, leaving it untouched on failure
fn reserve_slots<T>(records: &mut Vec<T>, requested: usize) -> Result<(), IndevError> {
    let additional = requested.saturating_sub(records.len());
    records.try_reserve_exact(additional).map_err(|source| {
        error!("Could not grow input device registry to {} slots", requested);
        IndevError::AllocationFailed { requested, source }
    })
}
