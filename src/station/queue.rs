use super::Entity;
use std::collections::VecDeque;
use thiserror::Error;

/// Errors returned by a [`BoundedQueue`].
#[derive(Debug, Error)]
pub enum QueueError {
    /// The queue is at capacity. The rejected entity is handed back
    /// to the caller.
    #[error("queue is full (capacity {capacity})")]
    Full {
        /// The capacity of the rejecting queue.
        capacity: usize,
        /// The entity that was not admitted.
        entity: Box<super::Entity>,
    },
    /// Dequeue on an empty queue.
    #[error("queue is empty")]
    Empty,
    /// The owning station was stopped and admits nothing anymore.
    #[error("station is stopped")]
    Closed {
        /// The entity that was not admitted.
        entity: Box<super::Entity>,
    },
}

impl QueueError {
    /// Returns the rejected entity, if any.
    #[must_use]
    pub fn into_entity(self) -> Option<Entity> {
        match self {
            Self::Full { entity, .. } | Self::Closed { entity } => Some(*entity),
            Self::Empty => None,
        }
    }
}

///
/// A FIFO holding store with an explicit capacity limit.
///
#[derive(Debug, Clone)]
pub struct BoundedQueue {
    items: VecDeque<Entity>,
    capacity: usize,
}

impl BoundedQueue {
    /// Creates an empty queue. A capacity of zero yields a queue that
    /// admits nothing.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Appends an entity at the back.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Full`] if the queue is at capacity. The queue is
    /// not modified in this case.
    pub fn enqueue(&mut self, entity: Entity) -> Result<(), QueueError> {
        if self.is_full() {
            return Err(QueueError::Full {
                capacity: self.capacity,
                entity: Box::new(entity),
            });
        }
        self.items.push_back(entity);
        Ok(())
    }

    /// Removes the entity at the front.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Empty`] if there is nothing to dequeue.
    pub fn dequeue(&mut self) -> Result<Entity, QueueError> {
        self.items.pop_front().ok_or(QueueError::Empty)
    }

    /// The entity that would be dequeued next.
    #[must_use]
    pub fn front(&self) -> Option<&Entity> {
        self.items.front()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterates the queued entities from front to back.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.items.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.items.iter_mut()
    }
}
