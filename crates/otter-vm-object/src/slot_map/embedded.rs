//! Open hash table for ordinary objects
//!
//! Buckets hold singly linked chains of immutable links. Readers walk a
//! chain without locking; writers serialize on the ordered-list mutex and
//! publish edits by swapping bucket heads (`arc-swap`):
//!
//! - inserting a new slot pushes a fresh link at the bucket head;
//! - replacing or removing a slot copies the chain prefix up to the edited
//!   link and swaps in the new head;
//! - growing builds a complete new table of fresh links, preserving each
//!   chain's relative order, and swaps the whole table.
//!
//! A reader that loaded the old table or an old chain keeps a consistent
//! snapshot until it drops it.
//!
//! Creation order lives in a separate forward-linked list stored in an arena
//! and addressed by generation-checked handles.

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Resolution, SlotAccess, SlotIter, SlotMap, SlotReadGuard, resolve};
use crate::config::INITIAL_SLOT_CAPACITY;
use crate::context::ExecutionContext;
use crate::error::{VmError, VmResult};
use crate::key::PropertyKey;
use crate::slot::Slot;

/// Position of a slot in the creation-order list
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct OrderHandle {
    index: u32,
    generation: u32,
}

struct OrderNode {
    slot: Option<Arc<Slot>>,
    next: Option<OrderHandle>,
    generation: u32,
}

/// Creation-ordered chain with first/last sentinels
#[derive(Default)]
struct OrderedList {
    nodes: Vec<OrderNode>,
    free: Vec<u32>,
    first: Option<OrderHandle>,
    last: Option<OrderHandle>,
}

impl OrderedList {
    fn node_mut(&mut self, handle: OrderHandle) -> Option<&mut OrderNode> {
        self.nodes
            .get_mut(handle.index as usize)
            .filter(|node| node.generation == handle.generation && node.slot.is_some())
    }

    fn push_back(&mut self, slot: Arc<Slot>) -> OrderHandle {
        let handle = match self.free.pop() {
            Some(index) => {
                let node = &mut self.nodes[index as usize];
                node.generation = node.generation.wrapping_add(1);
                node.slot = Some(slot);
                node.next = None;
                OrderHandle {
                    index,
                    generation: node.generation,
                }
            }
            None => {
                let index = self.nodes.len() as u32;
                self.nodes.push(OrderNode {
                    slot: Some(slot),
                    next: None,
                    generation: 0,
                });
                OrderHandle { index, generation: 0 }
            }
        };
        if let Some(last) = self.last
            && let Some(node) = self.node_mut(last)
        {
            node.next = Some(handle);
        }
        if self.first.is_none() {
            self.first = Some(handle);
        }
        self.last = Some(handle);
        handle
    }

    fn replace(&mut self, handle: OrderHandle, slot: Arc<Slot>) {
        let node = self.node_mut(handle);
        debug_assert!(node.is_some(), "replaced slot missing from ordered chain");
        if let Some(node) = node {
            node.slot = Some(slot);
        }
    }

    /// Unlink by scanning forward from the head
    fn remove(&mut self, handle: OrderHandle) {
        let mut prev = None;
        let mut cursor = self.first;
        while let Some(current) = cursor {
            if current == handle {
                break;
            }
            prev = cursor;
            cursor = self.nodes[current.index as usize].next;
        }
        debug_assert!(cursor.is_some(), "removed slot missing from ordered chain");
        if cursor.is_none() {
            return;
        }

        let node = &mut self.nodes[handle.index as usize];
        let next = node.next.take();
        node.slot = None;
        self.free.push(handle.index);

        match prev {
            None => self.first = next,
            Some(prev) => self.nodes[prev.index as usize].next = next,
        }
        if self.last == Some(handle) {
            self.last = prev;
        }
    }

    fn slots(&self) -> Vec<Arc<Slot>> {
        let mut slots = Vec::with_capacity(self.nodes.len() - self.free.len());
        let mut cursor = self.first;
        while let Some(current) = cursor {
            let node = &self.nodes[current.index as usize];
            if let Some(slot) = &node.slot {
                slots.push(slot.clone());
            }
            cursor = node.next;
        }
        slots
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.first = None;
        self.last = None;
    }
}

/// Immutable bucket chain link
struct Link {
    slot: Arc<Slot>,
    order: OrderHandle,
    next: Option<Arc<Link>>,
}

struct BucketTable {
    buckets: Box<[ArcSwapOption<Link>]>,
}

impl BucketTable {
    fn new(capacity: usize) -> Self {
        Self {
            buckets: (0..capacity).map(|_| ArcSwapOption::empty()).collect(),
        }
    }

    #[inline]
    fn len(&self) -> usize {
        self.buckets.len()
    }

    #[inline]
    fn bucket(&self, index_or_hash: u32) -> &ArcSwapOption<Link> {
        &self.buckets[index_or_hash as usize & (self.buckets.len() - 1)]
    }

    fn find(&self, key: &PropertyKey, index_or_hash: u32) -> Option<Arc<Link>> {
        let mut cursor = self.bucket(index_or_hash).load_full();
        while let Some(link) = cursor {
            if link.slot.matches(index_or_hash, key) {
                return Some(link);
            }
            cursor = link.next.clone();
        }
        None
    }

    /// Rebuild into a table of `capacity` buckets, keeping chain order
    fn rehash(&self, capacity: usize) -> Self {
        let mut chains: Vec<Vec<(Arc<Slot>, OrderHandle)>> = vec![Vec::new(); capacity];
        for bucket in self.buckets.iter() {
            let mut cursor = bucket.load_full();
            while let Some(link) = cursor {
                chains[link.slot.index_or_hash() as usize & (capacity - 1)]
                    .push((link.slot.clone(), link.order));
                cursor = link.next.clone();
            }
        }
        let buckets = chains
            .into_iter()
            .map(|chain| {
                let mut head = None;
                for (slot, order) in chain.into_iter().rev() {
                    head = Some(Arc::new(Link {
                        slot,
                        order,
                        next: head,
                    }));
                }
                ArcSwapOption::new(head)
            })
            .collect();
        Self { buckets }
    }
}

/// Swap `target` out of `bucket`, splicing in `replacement` (or nothing).
///
/// Links ahead of `target` are copied; links behind it are shared.
fn relink(bucket: &ArcSwapOption<Link>, target: &Arc<Link>, replacement: Option<Link>) {
    let mut prefix = Vec::new();
    let mut cursor = bucket.load_full();
    loop {
        match cursor {
            Some(link) if !Arc::ptr_eq(&link, target) => {
                cursor = link.next.clone();
                prefix.push(link);
            }
            _ => break,
        }
    }
    debug_assert!(cursor.is_some(), "slot missing from its bucket chain");

    let mut head = match replacement {
        Some(link) => Some(Arc::new(link)),
        None => target.next.clone(),
    };
    for link in prefix.iter().rev() {
        head = Some(Arc::new(Link {
            slot: link.slot.clone(),
            order: link.order,
            next: head,
        }));
    }
    bucket.store(head);
}

/// Slot map for objects with a moderate number of properties
pub struct EmbeddedSlotMap {
    table: ArcSwapOption<BucketTable>,
    count: AtomicUsize,
    order: Mutex<OrderedList>,
    initial_capacity: usize,
}

impl EmbeddedSlotMap {
    /// Empty map; the table is allocated on first insert
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_SLOT_CAPACITY)
    }

    /// Empty map whose first table has `capacity` buckets (rounded up to a power of two)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: ArcSwapOption::empty(),
            count: AtomicUsize::new(0),
            order: Mutex::new(OrderedList::default()),
            initial_capacity: capacity.max(1).next_power_of_two(),
        }
    }

    /// Number of buckets (0 before the first insert)
    pub fn capacity(&self) -> usize {
        self.table.load().as_ref().map_or(0, |table| table.len())
    }

    /// Insert a slot known to be absent. The ordered list doubles as the writer lock.
    fn insert_new(&self, order: &mut OrderedList, slot: Arc<Slot>) {
        let count = self.count.load(Ordering::Relaxed);
        let mut table = match self.table.load_full() {
            Some(table) if count != 0 => table,
            _ => {
                order.clear();
                let table = Arc::new(BucketTable::new(self.initial_capacity));
                self.table.store(Some(table.clone()));
                table
            }
        };

        if 4 * (count + 1) > 3 * table.len() {
            let grown = Arc::new(table.rehash(table.len() * 2));
            tracing::trace!(
                target: "otter::slots",
                from = table.len(),
                to = grown.len(),
                count,
                "grew slot table"
            );
            self.table.store(Some(grown.clone()));
            table = grown;
        }

        let handle = order.push_back(slot.clone());
        let bucket = table.bucket(slot.index_or_hash());
        let head = bucket.load_full();
        bucket.store(Some(Arc::new(Link {
            slot,
            order: handle,
            next: head,
        })));
        self.count.fetch_add(1, Ordering::Release);
    }

    fn replace(&self, order: &mut OrderedList, table: &BucketTable, old: &Arc<Link>, slot: Arc<Slot>) {
        order.replace(old.order, slot.clone());
        relink(
            table.bucket(slot.index_or_hash()),
            old,
            Some(Link {
                slot,
                order: old.order,
                next: old.next.clone(),
            }),
        );
        old.slot.mark_deleted();
    }
}

impl SlotMap for EmbeddedSlotMap {
    fn size(&self) -> usize {
        self.count.load(Ordering::Acquire)
    }

    fn query(&self, key: &PropertyKey) -> Option<Arc<Slot>> {
        let table = self.table.load_full()?;
        table
            .find(key, key.index_or_hash())
            .map(|link| link.slot.clone())
    }

    fn get(&self, key: &PropertyKey, access: SlotAccess) -> Option<Arc<Slot>> {
        if access == SlotAccess::Query {
            return self.query(key);
        }
        let index_or_hash = key.index_or_hash();

        // Existing slot that needs no replacement: no lock
        if let Some(table) = self.table.load_full()
            && let Some(link) = table.find(key, index_or_hash)
        {
            match resolve(key, Some(&link.slot), access) {
                Resolution::Found(slot) => return Some(slot),
                Resolution::Nothing => return None,
                Resolution::Replace(_) | Resolution::Create(_) => {}
            }
        }

        let mut order = self.order.lock();
        let table = self.table.load_full();
        let existing = table
            .as_ref()
            .and_then(|table| table.find(key, index_or_hash));
        match resolve(key, existing.as_ref().map(|link| &link.slot), access) {
            Resolution::Found(slot) => Some(slot),
            Resolution::Nothing => None,
            Resolution::Replace(slot) => {
                if let (Some(table), Some(old)) = (table.as_deref(), existing.as_ref()) {
                    self.replace(&mut order, table, old, slot.clone());
                }
                Some(slot)
            }
            Resolution::Create(slot) => {
                self.insert_new(&mut order, slot.clone());
                Some(slot)
            }
        }
    }

    fn add(&self, slot: Arc<Slot>) {
        let mut order = self.order.lock();
        debug_assert!(
            self.query(slot.key()).is_none(),
            "added slot already present"
        );
        self.insert_new(&mut order, slot);
    }

    fn remove(&self, cx: &ExecutionContext, key: &PropertyKey) -> VmResult<bool> {
        let mut order = self.order.lock();
        let Some(table) = self.table.load_full() else {
            return Ok(true);
        };
        let index_or_hash = key.index_or_hash();
        let Some(link) = table.find(key, index_or_hash) else {
            return Ok(true);
        };

        if !link.slot.attributes().is_configurable() {
            if cx.is_strict() {
                return Err(VmError::type_error(format!(
                    "Cannot delete property '{}'",
                    key
                )));
            }
            tracing::trace!(target: "otter::slots", %key, "refused delete of non-configurable property");
            return Ok(false);
        }

        relink(table.bucket(index_or_hash), &link, None);
        order.remove(link.order);
        self.count.fetch_sub(1, Ordering::Release);
        link.slot.mark_deleted();
        Ok(true)
    }

    fn read_lock(&self) -> SlotReadGuard<'_> {
        SlotReadGuard::unlocked()
    }

    fn iter(&self, _guard: &SlotReadGuard<'_>) -> SlotIter {
        SlotIter::new(self.order.lock().slots())
    }
}

impl Default for EmbeddedSlotMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EmbeddedSlotMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedSlotMap")
            .field("size", &self.size())
            .field("capacity", &self.capacity())
            .finish()
    }
}
