//! World events
//!
//! Events are queued while a step runs and delivered once it returns:
//! - Registered handlers see them first, per event type, in registration order
//! - A handler returning true consumes the event and stops forwarding
//! - Whatever is left is handed back to the caller of `World::step`

use crate::foundation::collections::BodyHandle;
use std::collections::HashMap;
use std::fmt;

/// Event type identification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// First contact of a body pair
    Collide,
    /// Body pair started touching
    BeginContact,
    /// Body pair stopped touching
    EndContact,
    /// Shape pair started touching
    BeginShapeContact,
    /// Shape pair stopped touching
    EndShapeContact,
    /// Body woke up
    WakeUp,
    /// Body became slow
    Sleepy,
    /// Body fell asleep
    Sleep,
}

/// Something that happened during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldEvent {
    /// Bodies that were not colliding last step produced contacts
    Collide {
        /// First body of the pair
        body: BodyHandle,
        /// Second body of the pair
        other: BodyHandle,
        /// Contact rows generated for the pair this step
        contact_count: usize,
    },
    /// Body pair started touching
    BeginContact {
        /// First body
        body_a: BodyHandle,
        /// Second body
        body_b: BodyHandle,
    },
    /// Body pair stopped touching
    EndContact {
        /// First body
        body_a: BodyHandle,
        /// Second body
        body_b: BodyHandle,
    },
    /// Shape pair started touching
    BeginShapeContact {
        /// First body
        body_a: BodyHandle,
        /// Second body
        body_b: BodyHandle,
        /// Shape index in the first body
        shape_a: usize,
        /// Shape index in the second body
        shape_b: usize,
    },
    /// Shape pair stopped touching
    EndShapeContact {
        /// First body
        body_a: BodyHandle,
        /// Second body
        body_b: BodyHandle,
        /// Shape index in the first body
        shape_a: usize,
        /// Shape index in the second body
        shape_b: usize,
    },
    /// Body woke up
    WakeUp {
        /// The body
        body: BodyHandle,
    },
    /// Body became slow enough to start its sleep countdown
    Sleepy {
        /// The body
        body: BodyHandle,
    },
    /// Body fell asleep
    Sleep {
        /// The body
        body: BodyHandle,
    },
}

impl WorldEvent {
    /// Type of this event
    pub const fn event_type(&self) -> EventType {
        match self {
            Self::Collide { .. } => EventType::Collide,
            Self::BeginContact { .. } => EventType::BeginContact,
            Self::EndContact { .. } => EventType::EndContact,
            Self::BeginShapeContact { .. } => EventType::BeginShapeContact,
            Self::EndShapeContact { .. } => EventType::EndShapeContact,
            Self::WakeUp { .. } => EventType::WakeUp,
            Self::Sleepy { .. } => EventType::Sleepy,
            Self::Sleep { .. } => EventType::Sleep,
        }
    }

    /// Whether the event concerns `body`
    pub fn involves(&self, handle: BodyHandle) -> bool {
        match *self {
            Self::Collide { body, other, .. } => body == handle || other == handle,
            Self::BeginContact { body_a, body_b }
            | Self::EndContact { body_a, body_b }
            | Self::BeginShapeContact { body_a, body_b, .. }
            | Self::EndShapeContact { body_a, body_b, .. } => body_a == handle || body_b == handle,
            Self::WakeUp { body } | Self::Sleepy { body } | Self::Sleep { body } => body == handle,
        }
    }
}

/// Event handler
/// Returns true if the event was consumed (stops forwarding)
pub trait EventHandler {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &WorldEvent) -> bool;
}

/// Queue of step events with registered handlers
#[derive(Default)]
pub struct EventQueue {
    queue: Vec<WorldEvent>,
    handlers: HashMap<EventType, Vec<Box<dyn EventHandler>>>,
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("queued", &self.queue.len())
            .field("handler_types", &self.handlers.len())
            .finish()
    }
}

impl EventQueue {
    /// Empty queue without handlers
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event type
    pub fn register_handler(&mut self, event_type: EventType, handler: Box<dyn EventHandler>) {
        self.handlers.entry(event_type).or_default().push(handler);
    }

    /// Queue an event for the end of the step
    pub fn push(&mut self, event: WorldEvent) {
        self.queue.push(event);
    }

    /// Queued events
    pub fn events(&self) -> &[WorldEvent] {
        &self.queue
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Deliver queued events to the handlers and return the ones nobody consumed
    pub fn dispatch(&mut self) -> Vec<WorldEvent> {
        let mut queued = std::mem::take(&mut self.queue);
        queued.retain(|event| !self.dispatch_event(event));
        queued
    }

    fn dispatch_event(&mut self, event: &WorldEvent) -> bool {
        self.handlers
            .get_mut(&event.event_type())
            .is_some_and(|handlers| handlers.iter_mut().any(|handler| handler.on_event(event)))
    }

    /// Drop queued events, keeping the handlers
    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
