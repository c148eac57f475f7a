use super::StationId;

///
/// A proof of one occupied server.
///
/// Slots are handed out by [`ServerPool::try_acquire`] and must be given
/// back through [`ServerPool::release`] exactly once. They cannot be
/// cloned, so a slot can never be released twice.
///
#[must_use = "a server slot must be released, or the server stays busy forever"]
#[derive(Debug, PartialEq, Eq)]
pub struct ServerSlot {
    owner: StationId,
}

impl ServerSlot {
    /// The station that issued this slot.
    pub fn owner(&self) -> StationId {
        self.owner
    }
}

///
/// A counted pool of identical servers.
///
/// Invariant: `0 <= in_use <= capacity`.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerPool {
    owner: StationId,
    capacity: usize,
    in_use: usize,
}

impl ServerPool {
    /// Creates a pool with all servers available.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(owner: StationId, capacity: usize) -> Self {
        assert!(capacity > 0, "a server pool requires at least one server");
        Self {
            owner,
            capacity,
            in_use: 0,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of busy servers.
    #[must_use]
    pub fn in_use(&self) -> usize {
        self.in_use
    }

    /// The number of free servers.
    #[must_use]
    pub fn available(&self) -> usize {
        self.capacity - self.in_use
    }

    /// Whether at least one server is free.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.in_use < self.capacity
    }

    /// Whether at least one server is busy.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.in_use > 0
    }

    /// Occupies a server if one is free.
    pub fn try_acquire(&mut self) -> Option<ServerSlot> {
        if self.is_available() {
            self.in_use += 1;
            Some(ServerSlot { owner: self.owner })
        } else {
            None
        }
    }

    /// Frees the server held by `slot`.
    ///
    /// # Panics
    ///
    /// Panics if the slot was issued by a different pool.
    pub fn release(&mut self, slot: ServerSlot) {
        assert_eq!(
            slot.owner, self.owner,
            "server slot released at a foreign station"
        );
        assert!(self.in_use > 0, "server released that was never acquired");
        self.in_use -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_until_exhausted() {
        let mut pool = ServerPool::new(StationId(0), 2);
        let a = pool.try_acquire().unwrap();
        assert!(pool.is_active());
        let b = pool.try_acquire().unwrap();
        assert_eq!(pool.in_use(), 2);
        assert_eq!(pool.available(), 0);
        assert!(pool.try_acquire().is_none());

        pool.release(a);
        assert_eq!(pool.in_use(), 1);
        assert!(pool.is_available());
        pool.release(b);
        assert!(!pool.is_active());
    }

    #[test]
    #[should_panic(expected = "foreign station")]
    fn foreign_slots_are_rejected() {
        let mut a = ServerPool::new(StationId(0), 1);
        let mut b = ServerPool::new(StationId(1), 1);
        let slot = a.try_acquire().unwrap();
        b.release(slot);
    }

    #[test]
    #[should_panic(expected = "at least one server")]
    fn empty_pools_are_rejected() {
        let _ = ServerPool::new(StationId(0), 0);
    }
}
