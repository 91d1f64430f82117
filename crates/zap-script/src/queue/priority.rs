//! Pending-event store: two bounded FIFO class stores, FirstStart drained
//! ahead of Continued/Suspended.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::debug;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::api::types::{EventTarget, ItemId, LocalId};
use crate::error::QueueError;
use crate::events::params::EventParams;

/// Default bound of each class store.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10_000;

/// Delivery class of a pending event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPriority {
    /// First run of a script after compile or rez. Always drains first.
    FirstStart,
    /// Steady-state events.
    Continued,
    /// Events of a script resumed after a pause. Shares the Continued store.
    Suspended,
}

impl fmt::Display for EventPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventPriority::FirstStart => "first_start",
            EventPriority::Continued => "continued",
            EventPriority::Suspended => "suspended",
        })
    }
}

/// A pending event and where it goes.
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedEvent {
    pub target: EventTarget,
    pub event: EventParams,
    pub priority: EventPriority,
}

/// Pending events split into two FIFO stores: FirstStart, and
/// Continued + Suspended merged.
///
/// Producers and consumers only hold a store's lock for one push, pop or
/// scan. Ordering is global per class; one busy object can delay every other.
pub struct EventQueue {
    first_start: Mutex<VecDeque<QueuedEvent>>,
    continued: Mutex<VecDeque<QueuedEvent>>,
    capacity: usize,
    /// Scripts removed while events for them may still be pending.
    removed: Mutex<HashSet<(LocalId, ItemId)>>,
    /// Bumped on every enqueue so idle workers can wait without missing one.
    generation: Mutex<u64>,
    wake: Condvar,
    closed: AtomicBool,
}

impl EventQueue {
    /// Create a queue whose class stores each hold at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            first_start: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            continued: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            removed: Mutex::new(HashSet::new()),
            generation: Mutex::new(0),
            wake: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn store(&self, priority: EventPriority) -> &Mutex<VecDeque<QueuedEvent>> {
        match priority {
            EventPriority::FirstStart => &self.first_start,
            EventPriority::Continued | EventPriority::Suspended => &self.continued,
        }
    }

    /// Append an event to the tail of its class store.
    ///
    /// A full store rejects the event with [`QueueError::Full`]; nothing is
    /// dropped silently and the producer is never blocked.
    pub fn enqueue(
        &self,
        target: EventTarget,
        event: EventParams,
        priority: EventPriority,
    ) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::Closed);
        }
        {
            let mut store = self.store(priority).lock();
            if store.len() >= self.capacity {
                return Err(QueueError::Full {
                    class: priority,
                    capacity: self.capacity,
                });
            }
            store.push_back(QueuedEvent { target, event, priority });
        }
        self.bump(false);
        Ok(())
    }

    /// Queue a steady-state event for every script in `object`.
    pub fn post_event(&self, object: LocalId, event: EventParams) -> Result<(), QueueError> {
        self.enqueue(EventTarget::Object(object), event, EventPriority::Continued)
    }

    /// Queue a steady-state event for a single script.
    pub fn post_script_event(
        &self,
        object: LocalId,
        item: ItemId,
        event: EventParams,
    ) -> Result<(), QueueError> {
        self.enqueue(EventTarget::Script { object, item }, event, EventPriority::Continued)
    }

    /// Pop the next event: the FirstStart head if any, else the Continued head.
    /// Never blocks beyond the store locks.
    pub fn dequeue_next(&self) -> Option<QueuedEvent> {
        self.dequeue_eligible(|_| true)
    }

    /// Pop the oldest event accepted by `eligible`, looking through the whole
    /// FirstStart store before the Continued store. Skipped events keep their
    /// place.
    ///
    /// The FirstStart lock is held across both scans, so a Continued event is
    /// only taken when no eligible FirstStart event exists at that instant.
    pub fn dequeue_eligible(
        &self,
        mut eligible: impl FnMut(&QueuedEvent) -> bool,
    ) -> Option<QueuedEvent> {
        let mut first_start = self.first_start.lock();
        if let Some(pos) = first_start.iter().position(&mut eligible) {
            return first_start.remove(pos);
        }
        let mut continued = self.continued.lock();
        let pos = continued.iter().position(&mut eligible)?;
        continued.remove(pos)
    }

    /// Drop every pending event addressed to the given script and remember the
    /// removal so a copy already taken by a worker is not delivered.
    /// Returns the number of purged events.
    pub fn remove_script(&self, object: LocalId, item: ItemId) -> usize {
        self.removed.lock().insert((object, item));
        let target = EventTarget::Script { object, item };
        let mut purged = 0;
        for store in [&self.first_start, &self.continued] {
            let mut store = store.lock();
            let before = store.len();
            store.retain(|entry| entry.target != target);
            purged += before - store.len();
        }
        if purged > 0 {
            debug!("purged {} pending events for {}", purged, target);
        }
        purged
    }

    /// Forget an earlier removal, e.g. when the same item is rezzed again.
    pub fn restore_script(&self, object: LocalId, item: ItemId) {
        self.removed.lock().remove(&(object, item));
    }

    /// Whether events for this target must no longer be delivered.
    pub fn is_removed(&self, target: &EventTarget) -> bool {
        match *target {
            EventTarget::Object(_) => false,
            EventTarget::Script { object, item } => self.removed.lock().contains(&(object, item)),
        }
    }

    /// Number of pending events in the store that holds `priority`.
    pub fn len_of(&self, priority: EventPriority) -> usize {
        self.store(priority).lock().len()
    }

    /// Pending events across both stores.
    pub fn len(&self) -> usize {
        self.len_of(EventPriority::FirstStart) + self.len_of(EventPriority::Continued)
    }

    /// Whether both stores are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bound of each class store.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current enqueue generation. Read it before dequeuing and pass it to
    /// [`wait_for_work`](Self::wait_for_work) to avoid a lost wakeup.
    pub fn generation(&self) -> u64 {
        *self.generation.lock()
    }

    /// Block until the generation moves past `seen`, the queue closes, or
    /// `timeout` passes.
    pub fn wait_for_work(&self, seen: u64, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        let mut generation = self.generation.lock();
        while *generation == seen && !self.is_closed() {
            if self.wake.wait_until(&mut generation, deadline).timed_out() {
                return;
            }
        }
    }

    /// Wake every waiting worker, e.g. because pending events they skipped
    /// may have become deliverable.
    pub fn wake_all(&self) {
        self.bump(true);
    }

    /// Refuse further enqueues and wake every waiting worker.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.bump(true);
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn bump(&self, all: bool) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        if all {
            self.wake.notify_all();
        } else {
            self.wake.notify_one();
        }
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventQueue")
            .field("first_start", &self.len_of(EventPriority::FirstStart))
            .field("continued", &self.len_of(EventPriority::Continued))
            .field("capacity", &self.capacity)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::args::EventArg;
    use crate::events::name::EventName;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn changed(n: i32) -> EventParams {
        EventParams::build(EventName::Changed, vec![EventArg::Integer(n)], Vec::new())
    }

    fn tag(entry: &QueuedEvent) -> i32 {
        entry.event.args()[0].as_integer().unwrap()
    }

    fn obj(id: u32) -> EventTarget {
        EventTarget::Object(LocalId(id))
    }

    #[test]
    fn empty_queue_dequeues_nothing() {
        let q = EventQueue::default();
        assert!(q.dequeue_next().is_none());
        assert!(q.is_empty());
        assert_eq!(q.capacity(), DEFAULT_QUEUE_CAPACITY);
    }

    #[test]
    fn first_start_drains_before_continued() {
        let q = EventQueue::new(16);
        q.enqueue(obj(1), changed(1), EventPriority::Continued).unwrap();
        q.enqueue(obj(1), changed(2), EventPriority::FirstStart).unwrap();
        q.enqueue(obj(1), changed(3), EventPriority::Continued).unwrap();
        q.enqueue(obj(2), changed(4), EventPriority::FirstStart).unwrap();

        let order: Vec<i32> = std::iter::from_fn(|| q.dequeue_next()).map(|e| tag(&e)).collect();
        assert_eq!(order, vec![2, 4, 1, 3]);
    }

    #[test]
    fn suspended_shares_continued_store() {
        let q = EventQueue::new(16);
        q.enqueue(obj(1), changed(1), EventPriority::Suspended).unwrap();
        q.enqueue(obj(1), changed(2), EventPriority::Continued).unwrap();
        q.enqueue(obj(1), changed(3), EventPriority::Suspended).unwrap();
        assert_eq!(q.len_of(EventPriority::Continued), 3);
        assert_eq!(q.len_of(EventPriority::Suspended), 3);

        let order: Vec<i32> = std::iter::from_fn(|| q.dequeue_next()).map(|e| tag(&e)).collect();
        assert_eq!(order, vec![1, 2, 3]);
    }

    #[test]
    fn full_store_rejects_without_touching_other_class() {
        let q = EventQueue::new(2);
        q.post_event(LocalId(1), changed(1)).unwrap();
        q.post_event(LocalId(1), changed(2)).unwrap();
        assert_eq!(
            q.post_event(LocalId(1), changed(3)),
            Err(QueueError::Full {
                class: EventPriority::Continued,
                capacity: 2
            })
        );
        // FirstStart has its own bound.
        q.enqueue(obj(1), changed(4), EventPriority::FirstStart).unwrap();
        assert_eq!(q.len(), 3);

        // Room again after a pop.
        q.dequeue_next();
        q.dequeue_next();
        q.post_event(LocalId(1), changed(5)).unwrap();
    }

    #[test]
    fn eligible_dequeue_skips_without_reordering() {
        let q = EventQueue::new(16);
        q.post_event(LocalId(1), changed(1)).unwrap();
        q.post_event(LocalId(2), changed(2)).unwrap();
        q.post_event(LocalId(1), changed(3)).unwrap();

        let not_one = |e: &QueuedEvent| e.target.object() != LocalId(1);
        assert_eq!(q.dequeue_eligible(not_one).map(|e| tag(&e)), Some(2));
        assert!(q.dequeue_eligible(not_one).is_none());
        assert_eq!(q.len(), 2);

        let order: Vec<i32> = std::iter::from_fn(|| q.dequeue_next()).map(|e| tag(&e)).collect();
        assert_eq!(order, vec![1, 3]);
    }

    #[test]
    fn eligible_first_start_beats_older_continued() {
        let q = EventQueue::new(16);
        q.post_event(LocalId(1), changed(1)).unwrap();
        q.enqueue(obj(2), changed(2), EventPriority::FirstStart).unwrap();
        q.enqueue(obj(1), changed(3), EventPriority::FirstStart).unwrap();

        let not_two = |e: &QueuedEvent| e.target.object() != LocalId(2);
        assert_eq!(q.dequeue_eligible(not_two).map(|e| tag(&e)), Some(3));
        assert_eq!(q.dequeue_eligible(not_two).map(|e| tag(&e)), Some(1));
        assert_eq!(q.len_of(EventPriority::FirstStart), 1);
    }

    #[test]
    fn wake_all_releases_a_waiter() {
        let q = EventQueue::new(4);
        let seen = q.generation();
        q.wake_all();
        let start = Instant::now();
        q.wait_for_work(seen, Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn closed_queue_rejects() {
        let q = EventQueue::new(4);
        q.close();
        assert_eq!(q.post_event(LocalId(1), changed(1)), Err(QueueError::Closed));
    }

    #[test]
    fn remove_script_purges_only_that_script() {
        let q = EventQueue::new(8);
        let item = ItemId::new_v4();
        let other = ItemId::new_v4();
        q.post_script_event(LocalId(1), item, changed(1)).unwrap();
        q.post_script_event(LocalId(1), other, changed(2)).unwrap();
        q.enqueue(
            EventTarget::Script { object: LocalId(1), item },
            changed(3),
            EventPriority::FirstStart,
        )
        .unwrap();
        q.post_event(LocalId(1), changed(4)).unwrap();

        assert_eq!(q.remove_script(LocalId(1), item), 2);
        assert!(q.is_removed(&EventTarget::Script { object: LocalId(1), item }));
        assert!(!q.is_removed(&obj(1)));

        let order: Vec<i32> = std::iter::from_fn(|| q.dequeue_next()).map(|e| tag(&e)).collect();
        assert_eq!(order, vec![2, 4]);

        q.restore_script(LocalId(1), item);
        assert!(!q.is_removed(&EventTarget::Script { object: LocalId(1), item }));
    }

    #[test]
    fn wait_returns_immediately_after_missed_enqueue() {
        let q = EventQueue::new(8);
        let seen = q.generation();
        q.post_event(LocalId(1), changed(1)).unwrap();

        let start = Instant::now();
        q.wait_for_work(seen, Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn wait_wakes_on_enqueue_from_another_thread() {
        let q = Arc::new(EventQueue::new(8));
        let seen = q.generation();
        let producer = {
            let q = q.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                q.post_event(LocalId(1), changed(1)).unwrap();
            })
        };
        let start = Instant::now();
        q.wait_for_work(seen, Duration::from_secs(5));
        assert!(start.elapsed() < Duration::from_secs(4));
        producer.join().unwrap();
        assert!(q.dequeue_next().is_some());
    }

    #[test]
    fn concurrent_producers_keep_per_producer_order() {
        let q = Arc::new(EventQueue::new(10_000));
        let producers: Vec<_> = (0..4u32)
            .map(|p| {
                let q = q.clone();
                thread::spawn(move || {
                    for n in 0..500 {
                        q.post_event(LocalId(p + 1), changed(n)).unwrap();
                    }
                })
            })
            .collect();
        for p in producers {
            p.join().unwrap();
        }

        let mut last = [-1i32; 4];
        let mut total = 0;
        while let Some(entry) = q.dequeue_next() {
            let p = (entry.target.object().0 - 1) as usize;
            let n = tag(&entry);
            assert!(n > last[p], "producer {p} out of order: {n} after {}", last[p]);
            last[p] = n;
            total += 1;
        }
        assert_eq!(total, 2000);
    }

    fn priority_strategy() -> impl Strategy<Value = EventPriority> {
        prop_oneof![
            Just(EventPriority::FirstStart),
            Just(EventPriority::Continued),
            Just(EventPriority::Suspended),
        ]
    }

    proptest! {
        #[test]
        fn dequeue_is_first_start_fifo_then_continued_fifo(
            classes in proptest::collection::vec(priority_strategy(), 0..64)
        ) {
            let q = EventQueue::new(128);
            for (n, class) in classes.iter().enumerate() {
                q.enqueue(obj(1), changed(n as i32), *class).unwrap();
            }

            let expected: Vec<i32> = classes
                .iter()
                .enumerate()
                .filter(|(_, c)| **c == EventPriority::FirstStart)
                .chain(
                    classes
                        .iter()
                        .enumerate()
                        .filter(|(_, c)| **c != EventPriority::FirstStart),
                )
                .map(|(n, _)| n as i32)
                .collect();
            let actual: Vec<i32> = std::iter::from_fn(|| q.dequeue_next()).map(|e| tag(&e)).collect();
            prop_assert_eq!(actual, expected);
        }

        #[test]
        fn interleaved_pops_never_skip_a_pending_first_start(
            ops in proptest::collection::vec((priority_strategy(), any::<bool>()), 0..64)
        ) {
            let q = EventQueue::new(128);
            let mut pending_first = 0usize;
            for (n, (class, pop)) in ops.iter().enumerate() {
                q.enqueue(obj(1), changed(n as i32), *class).unwrap();
                if *class == EventPriority::FirstStart {
                    pending_first += 1;
                }
                if *pop {
                    let entry = q.dequeue_next().unwrap();
                    if entry.priority == EventPriority::FirstStart {
                        pending_first -= 1;
                    } else {
                        prop_assert_eq!(pending_first, 0);
                    }
                }
            }
        }
    }
}
