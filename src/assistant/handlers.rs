//! Handler Chain
//!
//! Ordered list of command handlers. Dispatch is a linear scan in priority
//! order; the assistant's dispatch policy decides how many accepting
//! handlers get a turn.

use std::fmt;

use crate::plugin::priority_queue::PriorityQueue;
use crate::plugin::traits::{CommandHandler, HandlerInfo};

#[derive(Default)]
pub struct HandlerChain {
    queue: PriorityQueue<Box<dyn CommandHandler>>,
}

impl HandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler behind every handler of greater or equal priority.
    /// Returns its position.
    pub fn add(&mut self, handler: Box<dyn CommandHandler>, priority: i32) -> usize {
        self.queue.push(priority, handler)
    }

    /// Insert a handler at a fixed position
    pub fn insert(&mut self, index: usize, handler: Box<dyn CommandHandler>) -> usize {
        self.queue.insert_at(index, handler)
    }

    /// Remove the first handler with the given name
    pub fn remove(&mut self, name: &str) -> bool {
        self.queue.remove_by(|h| h.name() == name).is_some()
    }

    /// Position of the first handler accepting `input`
    pub fn find(&self, input: &str) -> Option<usize> {
        self.queue.find_index(|h| h.can_handle(input))
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Box<dyn CommandHandler>> {
        self.queue.get_mut_at(index)
    }

    pub fn infos(&self) -> Vec<HandlerInfo> {
        self.queue
            .iter()
            .map(|(priority, handler)| HandlerInfo {
                name: handler.name().to_string(),
                priority: *priority,
                hints: handler.command_hints(),
            })
            .collect()
    }

    /// Positions of every handler accepting `input`, in dispatch order
    pub fn find_all(&self, input: &str) -> Vec<usize> {
        self.queue
            .iter()
            .enumerate()
            .filter(|(_, (_, handler))| handler.can_handle(input))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.queue.iter().map(|(p, h)| format!("{}@{}", h.name(), p)))
            .finish()
    }
}
