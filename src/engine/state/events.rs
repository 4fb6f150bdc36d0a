// ABOUTME: Bounded ring-buffer event log — the engine's structured logging surface
// ABOUTME: Subsystems never fail outward; anomalies and notable transitions are pushed here instead

use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    WaterDrawn,
    EdgeRunoff,
    BiomeChange,
    StructureBuilt,
    StructureDemolished,
    ErosionEvent,
    WellspringDry,
    InvariantClamped,
    GenerationContradiction,
}

#[derive(Debug, Clone)]
pub struct Event {
    pub tick: u64,
    pub kind: EventKind,
    pub cell: Option<(u32, u32)>,
    pub amount: Option<f32>,
    pub message: String,
}

/// Fixed-capacity ring buffer of structured events, the concrete backing
/// for the engine specification's `event_log`. Pushing past capacity drops
/// the oldest entry; the log never grows unbounded and never blocks a tick.
#[derive(Debug, Clone)]
pub struct EventLog {
    buffer: VecDeque<Event>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&mut self, event: Event) {
        if self.buffer.len() >= self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Event> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
