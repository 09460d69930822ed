//! In-memory backend and bus for unit tests
//!
//! Live bindings and channels are counted so tests can check that every
//! acquired resource is released exactly once.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::io;
use std::rc::Rc;

use super::backend::{BackendBinding, InputBackend, InputSample};
use super::capability::Capability;
use super::error::IndevError;
use super::monitor::{BusChannel, BusDevice, BusEvent, DeviceBus};

type SampleQueues = Rc<RefCell<HashMap<String, VecDeque<InputSample>>>>;

pub struct FakeBinding {
    capability: Capability,
    node: String,
    live: Rc<Cell<usize>>,
    samples: SampleQueues,
}

impl FakeBinding {
    pub fn new(capability: Capability, live: Rc<Cell<usize>>) -> Self {
        live.set(live.get() + 1);
        Self {
            capability,
            node: String::new(),
            live,
            samples: SampleQueues::default(),
        }
    }

    /// Binding with its own live counter
    pub fn standalone(capability: Capability) -> (Self, Rc<Cell<usize>>) {
        let live = Rc::new(Cell::new(0));
        (Self::new(capability, live.clone()), live)
    }
}

impl BackendBinding for FakeBinding {
    fn capability(&self) -> Capability {
        self.capability
    }

    fn name(&self) -> Option<String> {
        Some(format!("fake {}", self.node))
    }

    fn read(&mut self, out: &mut Vec<InputSample>) {
        if let Some(queue) = self.samples.borrow_mut().get_mut(&self.node) {
            out.extend(queue.drain(..));
        }
    }
}

impl Drop for FakeBinding {
    fn drop(&mut self) {
        assert!(self.live.get() > 0, "binding released twice");
        self.live.set(self.live.get() - 1);
    }
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    devices: Rc<RefCell<HashMap<String, Capability>>>,
    samples: SampleQueues,
    live: Rc<Cell<usize>>,
    opened: Rc<Cell<usize>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `node` openable with the given capabilities
    pub fn add_device(&self, node: &str, capability: Capability) {
        self.devices.borrow_mut().insert(node.to_string(), capability);
    }

    pub fn queue_sample(&self, node: &str, sample: InputSample) {
        self.samples
            .borrow_mut()
            .entry(node.to_string())
            .or_default()
            .push_back(sample);
    }

    /// Bindings currently alive
    pub fn live_bindings(&self) -> usize {
        self.live.get()
    }

    /// Successful opens so far
    pub fn opened(&self) -> usize {
        self.opened.get()
    }
}

impl InputBackend for FakeBackend {
    type Binding = FakeBinding;

    fn open(&mut self, node: &str) -> Option<FakeBinding> {
        let capability = *self.devices.borrow().get(node)?;
        self.opened.set(self.opened.get() + 1);
        let mut binding = FakeBinding::new(capability, self.live.clone());
        binding.node = node.to_string();
        binding.samples = self.samples.clone();
        Some(binding)
    }
}

#[derive(Clone, Default)]
pub struct BusStats {
    pub subscriptions: Rc<Cell<usize>>,
    pub live_channels: Rc<Cell<usize>>,
}

#[derive(Clone, Default)]
pub struct FakeBus {
    pending: Rc<RefCell<VecDeque<BusEvent>>>,
    present: Rc<RefCell<Vec<BusDevice>>>,
    fail_subscribe: Rc<Cell<bool>>,
    fail_scan: Rc<Cell<bool>>,
    stats: BusStats,
}

fn device_for(node: &str) -> BusDevice {
    let name = node.rsplit('/').next().unwrap_or(node);
    BusDevice {
        syspath: format!("/sys/class/input/{}", name),
        devnode: Some(node.to_string()),
    }
}

impl FakeBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> BusStats {
        self.stats.clone()
    }

    pub fn fail_subscribe(&self, fail: bool) {
        self.fail_subscribe.set(fail);
    }

    pub fn fail_scan(&self, fail: bool) {
        self.fail_scan.set(fail);
    }

    /// Queue a notification
    pub fn push(&self, action: &str, node: &str) {
        self.pending.borrow_mut().push_back(BusEvent {
            action: Some(action.to_string()),
            device: device_for(node),
        });
    }

    /// Device reported by enumeration
    pub fn add_present(&self, node: &str) {
        self.present.borrow_mut().push(device_for(node));
    }

    pub fn add_present_without_node(&self, syspath: &str) {
        self.present.borrow_mut().push(BusDevice {
            syspath: syspath.to_string(),
            devnode: None,
        });
    }
}

impl DeviceBus for FakeBus {
    type Channel = FakeChannel;

    fn subscribe(&mut self, _subsystem: &str) -> Result<FakeChannel, IndevError> {
        if self.fail_subscribe.get() {
            return Err(IndevError::monitor(
                "monitor",
                io::Error::new(io::ErrorKind::Other, "netlink unavailable"),
            ));
        }
        self.stats.subscriptions.set(self.stats.subscriptions.get() + 1);
        self.stats.live_channels.set(self.stats.live_channels.get() + 1);
        Ok(FakeChannel {
            pending: self.pending.clone(),
            live: self.stats.live_channels.clone(),
        })
    }

    fn scan(&mut self, _subsystem: &str) -> Result<Vec<BusDevice>, IndevError> {
        if self.fail_scan.get() {
            return Err(IndevError::monitor(
                "context",
                io::Error::new(io::ErrorKind::Other, "udev unavailable"),
            ));
        }
        Ok(self.present.borrow().clone())
    }
}

pub struct FakeChannel {
    pending: Rc<RefCell<VecDeque<BusEvent>>>,
    live: Rc<Cell<usize>>,
}

impl BusChannel for FakeChannel {
    fn is_ready(&mut self) -> bool {
        !self.pending.borrow().is_empty()
    }

    fn receive(&mut self) -> Option<BusEvent> {
        self.pending.borrow_mut().pop_front()
    }
}

impl Drop for FakeChannel {
    fn drop(&mut self) {
        assert!(self.live.get() > 0, "channel released twice");
        self.live.set(self.live.get() - 1);
    }
}
