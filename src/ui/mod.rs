//! UI input endpoints
//!
//! The toolkit side of device input: every connected device registers one
//! endpoint here and input samples are delivered through it. Keypad
//! endpoints route keys to their focus group, pointer endpoints may carry a
//! cursor. The widget tree drains the resulting `UiEvent`s.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use log::{debug, trace};

use crate::indev::InputSample;

/// Endpoint identifier (unique for the lifetime of a hub)
pub type EndpointId = u32;

/// How the toolkit interprets an endpoint's input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    /// Key events routed to the focused group
    Keypad,
    /// Pointer/touch input; repeat time in ms before a held press repeats
    Pointer { long_press_repeat_ms: u16 },
}

/// Keyboard focus group (routes physical keys to a text widget)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusGroup {
    id: u32,
    name: Rc<str>,
}

impl FocusGroup {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Cursor visual shared by pointer endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    id: u32,
}

impl Cursor {
    pub fn id(&self) -> u32 {
        self.id
    }
}

/// Input as seen by the widget tree
#[derive(Debug, Clone, PartialEq)]
pub struct UiEvent {
    pub endpoint: EndpointId,
    /// Focus group for keypad input (None = nowhere to route)
    pub group: Option<u32>,
    pub sample: InputSample,
}

/// Registration state of one endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointInfo {
    pub id: EndpointId,
    pub kind: EndpointKind,
    pub group: Option<FocusGroup>,
    pub cursor: Option<Cursor>,
}

#[derive(Default)]
struct HubState {
    next_endpoint: EndpointId,
    next_object: u32,
    endpoints: Vec<EndpointInfo>,
    cursors: usize,
    events: VecDeque<UiEvent>,
}

impl HubState {
    fn endpoint_mut(&mut self, id: EndpointId) -> Option<&mut EndpointInfo> {
        self.endpoints.iter_mut().find(|e| e.id == id)
    }
}

/// Shared handle to the toolkit's endpoint table
#[derive(Clone, Default)]
pub struct InputHub {
    state: Rc<RefCell<HubState>>,
}

impl InputHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an endpoint; it deregisters itself when dropped
    pub fn register(&self, kind: EndpointKind) -> Endpoint {
        let mut state = self.state.borrow_mut();
        let id = state.next_endpoint;
        state.next_endpoint += 1;
        state.endpoints.push(EndpointInfo {
            id,
            kind,
            group: None,
            cursor: None,
        });
        debug!("UI endpoint {} registered ({:?})", id, kind);
        Endpoint {
            id,
            hub: Rc::downgrade(&self.state),
        }
    }

    pub fn create_group(&self, name: &str) -> FocusGroup {
        let mut state = self.state.borrow_mut();
        state.next_object += 1;
        FocusGroup {
            id: state.next_object,
            name: Rc::from(name),
        }
    }

    pub fn create_cursor(&self) -> Cursor {
        let mut state = self.state.borrow_mut();
        state.next_object += 1;
        state.cursors += 1;
        debug!("Cursor {} created", state.next_object);
        Cursor {
            id: state.next_object,
        }
    }

    pub fn endpoint_count(&self) -> usize {
        self.state.borrow().endpoints.len()
    }

    /// Number of cursors ever created
    pub fn cursor_count(&self) -> usize {
        self.state.borrow().cursors
    }

    pub fn endpoint(&self, id: EndpointId) -> Option<EndpointInfo> {
        self.state.borrow().endpoints.iter().find(|e| e.id == id).cloned()
    }

    /// Take all queued input events
    pub fn drain_events(&self) -> Vec<UiEvent> {
        self.state.borrow_mut().events.drain(..).collect()
    }
}

/// Registered endpoint, exclusively owned by a device record
#[derive(Debug)]
pub struct Endpoint {
    id: EndpointId,
    hub: Weak<RefCell<HubState>>,
}

impl Endpoint {
    pub fn id(&self) -> EndpointId {
        self.id
    }

    fn with_info(&self, f: impl FnOnce(&mut EndpointInfo)) {
        if let Some(hub) = self.hub.upgrade() {
            if let Some(info) = hub.borrow_mut().endpoint_mut(self.id) {
                f(info);
            }
        }
    }

    pub fn set_group(&self, group: Option<&FocusGroup>) {
        self.with_info(|info| info.group = group.cloned());
    }

    pub fn set_cursor(&self, cursor: &Cursor) {
        self.with_info(|info| info.cursor = Some(*cursor));
    }

    /// Queue a sample for the widget tree
    pub fn deliver(&self, sample: InputSample) {
        let Some(hub) = self.hub.upgrade() else {
            return;
        };
        let mut state = hub.borrow_mut();
        let Some(info) = state.endpoints.iter().find(|e| e.id == self.id) else {
            return;
        };
        let is_key = matches!(sample, InputSample::Key { .. });
        let group = match info.kind {
            EndpointKind::Keypad if is_key => match info.group.as_ref() {
                Some(group) => Some(group.id),
                None => {
                    trace!("Endpoint {} has no focus group, dropping key", self.id);
                    return;
                }
            },
            // Pointer input of a combined device goes to its cursor, never
            // to the focus group
            EndpointKind::Keypad if info.cursor.is_none() => {
                trace!("Endpoint {} has no cursor, dropping pointer input", self.id);
                return;
            }
            EndpointKind::Pointer { .. } if is_key => {
                trace!("Endpoint {} is not a keypad, dropping key", self.id);
                return;
            }
            _ => None,
        };
        state.events.push_back(UiEvent {
            endpoint: self.id,
            group,
            sample,
        });
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            let mut state = hub.borrow_mut();
            state.endpoints.retain(|e| e.id != self.id);
            // Undelivered input from a vanished device is meaningless
            state.events.retain(|e| e.endpoint != self.id);
            debug!("UI endpoint {} deleted", self.id);
        }
    }
}
