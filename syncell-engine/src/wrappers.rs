//! Mutation-tracking proxy types: one per node variant in the value graph
//! (spec §4.3). Every mutating method routes through `EngineState::mark_dirty`
//! before touching the node's data, and detaches any child it evicts.
//!
//! These are hand-written forwarding types rather than one dynamically
//! dispatched "container" type, per spec §9's design note on mutation
//! interception without runtime-dispatch magic.

use crate::arena::{Arena, Elem, Handle, NodeKind, NodeState};
use crate::link;
use crate::manager::Manager;
use std::collections::HashSet;
use std::ops::Range;
use std::sync::Arc;
use syncell_codec::NodeData;
use syncell_core::{Error, Result, Value};

/// A child read that may be a leaf scalar or a further wrapper.
#[derive(Clone)]
pub enum Item {
    Leaf(Value),
    Node(Node),
}

/// Any of the five wrapper types, returned from reads of a child position.
#[derive(Clone)]
pub enum Node {
    Sequence(Sequence),
    Mapping(Mapping),
    Set(SetView),
    Bytes(ByteBuffer),
    Record(Record),
}

impl Node {
    pub fn handle(&self) -> Handle {
        match self {
            Node::Sequence(s) => s.handle,
            Node::Mapping(m) => m.handle,
            Node::Set(s) => s.handle,
            Node::Bytes(b) => b.handle,
            Node::Record(r) => r.handle,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Node::Sequence(_) => "sequence",
            Node::Mapping(_) => "mapping",
            Node::Set(_) => "set",
            Node::Bytes(_) => "bytes",
            Node::Record(_) => "record",
        }
    }
}

/// A value to place into a container position. `Existing` always fails with
/// [`Error::Aliasing`] — once a node has a handle in this Manager's arena,
/// relinking it elsewhere would violate "a wrapper is linked in at most one
/// position" without also violating "detached never clears" (spec §3
/// invariant 5), so the only legal way to adopt a container is to build it
/// fresh from a plain [`NodeData`] graph.
pub enum Assignable {
    Leaf(Value),
    Graph(NodeData),
    Existing(Node),
}

impl From<Value> for Assignable {
    fn from(v: Value) -> Self {
        Assignable::Leaf(v)
    }
}

impl From<NodeData> for Assignable {
    fn from(v: NodeData) -> Self {
        Assignable::Graph(v)
    }
}

impl From<Node> for Assignable {
    fn from(v: Node) -> Self {
        Assignable::Existing(v)
    }
}

fn assignable_to_elem(arena: &mut Arena<NodeState>, value: Assignable) -> Result<Elem> {
    match value {
        Assignable::Leaf(v) => Ok(Elem::Leaf(v)),
        Assignable::Graph(NodeData::Leaf(v)) => Ok(Elem::Leaf(v)),
        Assignable::Graph(data) => Ok(Elem::Child(link::build_node(arena, data)?)),
        Assignable::Existing(_) => Err(Error::Aliasing),
    }
}

fn elem_to_item(manager: &Arc<Manager>, arena: &Arena<NodeState>, elem: &Elem) -> Item {
    match elem {
        Elem::Leaf(v) => Item::Leaf(v.clone()),
        Elem::Child(h) => Item::Node(make_node(manager, arena, *h)),
    }
}

/// Build the right wrapper type for `handle`, given an already-locked view
/// of the arena. Never locks internally, so it is safe to call from code
/// that is already holding the engine mutex.
pub(crate) fn make_node(manager: &Arc<Manager>, arena: &Arena<NodeState>, handle: Handle) -> Node {
    let node = arena.get(handle).expect("make_node: dangling handle");
    match &node.kind {
        NodeKind::Seq(_) => Node::Sequence(Sequence {
            manager: Arc::clone(manager),
            handle,
        }),
        NodeKind::Map(_) => Node::Mapping(Mapping {
            manager: Arc::clone(manager),
            handle,
        }),
        NodeKind::Set(_) => Node::Set(SetView {
            manager: Arc::clone(manager),
            handle,
        }),
        NodeKind::Bytes(_) => Node::Bytes(ByteBuffer {
            manager: Arc::clone(manager),
            handle,
        }),
        NodeKind::Record { .. } => Node::Record(Record {
            manager: Arc::clone(manager),
            handle,
        }),
    }
}

/// An ordered list of child nodes or leaf scalars.
#[derive(Clone)]
pub struct Sequence {
    manager: Arc<Manager>,
    handle: Handle,
}

impl Sequence {
    pub fn is_linked(&self) -> bool {
        self.manager.is_linked(self.handle)
    }

    pub fn is_dirty(&self) -> bool {
        self.manager.is_dirty(self.handle)
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn len(&self) -> usize {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => elems.len(),
            _ => unreachable!("Sequence handle does not point at a Seq node"),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<Item> {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle)?.kind {
            NodeKind::Seq(elems) => elems
                .get(index)
                .map(|e| elem_to_item(&self.manager, &state.arena, e)),
            _ => unreachable!(),
        }
    }

    pub fn set(&self, index: usize, value: impl Into<Assignable>) -> Result<()> {
        let mut state = self.manager.state.lock();
        let elem = assignable_to_elem(&mut state.arena, value.into())?;
        let len = match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => elems.len(),
            _ => unreachable!(),
        };
        if index >= len {
            return Err(Error::Other(format!("sequence index {index} out of bounds")));
        }
        state.mark_dirty(self.handle)?;
        let old = match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => std::mem::replace(&mut elems[index], elem),
            _ => unreachable!(),
        };
        link::fix_children_links(&mut state.arena, self.handle);
        if let Elem::Child(h) = old {
            state.detach(h);
        }
        Ok(())
    }

    pub fn append(&self, value: impl Into<Assignable>) -> Result<()> {
        let mut state = self.manager.state.lock();
        let elem = assignable_to_elem(&mut state.arena, value.into())?;
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => elems.push(elem),
            _ => unreachable!(),
        }
        link::fix_children_links(&mut state.arena, self.handle);
        Ok(())
    }

    pub fn insert(&self, index: usize, value: impl Into<Assignable>) -> Result<()> {
        let mut state = self.manager.state.lock();
        let elem = assignable_to_elem(&mut state.arena, value.into())?;
        let len = match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => elems.len(),
            _ => unreachable!(),
        };
        if index > len {
            return Err(Error::Other(format!("sequence index {index} out of bounds")));
        }
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => elems.insert(index, elem),
            _ => unreachable!(),
        }
        link::fix_children_links(&mut state.arena, self.handle);
        Ok(())
    }

    /// Remove and return the element at `index`, detaching it if it was a
    /// child container.
    pub fn remove_at(&self, index: usize) -> Result<Item> {
        let mut state = self.manager.state.lock();
        let len = match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => elems.len(),
            _ => unreachable!(),
        };
        if index >= len {
            return Err(Error::Other(format!("sequence index {index} out of bounds")));
        }
        state.mark_dirty(self.handle)?;
        let removed = match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => elems.remove(index),
            _ => unreachable!(),
        };
        link::fix_children_links(&mut state.arena, self.handle);
        let item = match &removed {
            Elem::Leaf(v) => Item::Leaf(v.clone()),
            Elem::Child(h) => Item::Node(make_node(&self.manager, &state.arena, *h)),
        };
        if let Elem::Child(h) = removed {
            state.detach(h);
        }
        Ok(item)
    }

    /// Remove the first leaf element equal to `value`. Returns `true` if an
    /// element was removed.
    pub fn remove_value(&self, value: &Value) -> Result<bool> {
        let mut state = self.manager.state.lock();
        let position = match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => elems.iter().position(|e| matches!(e, Elem::Leaf(v) if v == value)),
            _ => unreachable!(),
        };
        let Some(index) = position else {
            return Ok(false);
        };
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => {
                elems.remove(index);
            }
            _ => unreachable!(),
        }
        link::fix_children_links(&mut state.arena, self.handle);
        Ok(true)
    }

    pub fn clear(&self) -> Result<()> {
        let mut state = self.manager.state.lock();
        state.mark_dirty(self.handle)?;
        let children: Vec<Handle> = match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => elems
                .iter()
                .filter_map(|e| match e {
                    Elem::Child(h) => Some(*h),
                    Elem::Leaf(_) => None,
                })
                .collect(),
            _ => unreachable!(),
        };
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => elems.clear(),
            _ => unreachable!(),
        }
        for child in children {
            state.detach(child);
        }
        Ok(())
    }

    /// Replace `range` with `values`, returning the elements evicted.
    pub fn splice(&self, range: Range<usize>, values: Vec<Assignable>) -> Result<Vec<Item>> {
        let mut state = self.manager.state.lock();
        let mut new_elems = Vec::with_capacity(values.len());
        for v in values {
            new_elems.push(assignable_to_elem(&mut state.arena, v)?);
        }
        let len = match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => elems.len(),
            _ => unreachable!(),
        };
        if range.end > len || range.start > range.end {
            return Err(Error::Other("sequence splice range out of bounds".into()));
        }
        state.mark_dirty(self.handle)?;
        let removed: Vec<Elem> = match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => elems.splice(range, new_elems).collect(),
            _ => unreachable!(),
        };
        link::fix_children_links(&mut state.arena, self.handle);
        let items = removed
            .iter()
            .map(|e| elem_to_item(&self.manager, &state.arena, e))
            .collect();
        for e in removed {
            if let Elem::Child(h) = e {
                state.detach(h);
            }
        }
        Ok(items)
    }

    pub fn extend(&self, values: Vec<Assignable>) -> Result<()> {
        let len = self.len();
        self.splice(len..len, values).map(|_| ())
    }

    pub fn pop(&self) -> Result<Option<Item>> {
        let len = self.len();
        if len == 0 {
            return Ok(None);
        }
        self.remove_at(len - 1).map(Some)
    }

    pub fn reverse(&self) -> Result<()> {
        let mut state = self.manager.state.lock();
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => elems.reverse(),
            _ => unreachable!(),
        }
        link::fix_children_links(&mut state.arena, self.handle);
        Ok(())
    }

    /// Sort in place. Defined only for sequences of leaf scalars — sorting a
    /// sequence containing child containers has no well-defined order and
    /// returns an error instead of guessing one.
    pub fn sort(&self) -> Result<()> {
        let mut state = self.manager.state.lock();
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Seq(elems) => {
                if elems.iter().any(|e| matches!(e, Elem::Child(_))) {
                    return Err(Error::Other(
                        "sort is only defined for sequences of leaf scalars".into(),
                    ));
                }
                elems.sort_by(|a, b| match (a, b) {
                    (Elem::Leaf(x), Elem::Leaf(y)) => x.cmp(y),
                    _ => std::cmp::Ordering::Equal,
                });
            }
            _ => unreachable!(),
        }
        Ok(())
    }
}

/// An unordered key → child-node mapping.
#[derive(Clone)]
pub struct Mapping {
    manager: Arc<Manager>,
    handle: Handle,
}

impl Mapping {
    pub fn is_linked(&self) -> bool {
        self.manager.is_linked(self.handle)
    }

    pub fn is_dirty(&self) -> bool {
        self.manager.is_dirty(self.handle)
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn len(&self) -> usize {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Map(pairs) => pairs.len(),
            _ => unreachable!(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Map(pairs) => pairs.iter().any(|(k, _)| k == key),
            _ => unreachable!(),
        }
    }

    pub fn get(&self, key: &Value) -> Option<Item> {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle)?.kind {
            NodeKind::Map(pairs) => pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, e)| elem_to_item(&self.manager, &state.arena, e)),
            _ => unreachable!(),
        }
    }

    pub fn keys(&self) -> Vec<Value> {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Map(pairs) => pairs.iter().map(|(k, _)| k.clone()).collect(),
            _ => unreachable!(),
        }
    }

    /// Insert or overwrite `key`. Returns the displaced value, if any.
    pub fn set(&self, key: Value, value: impl Into<Assignable>) -> Result<Option<Item>> {
        let mut state = self.manager.state.lock();
        let elem = assignable_to_elem(&mut state.arena, value.into())?;
        state.mark_dirty(self.handle)?;
        let old = match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Map(pairs) => {
                if let Some(slot) = pairs.iter_mut().find(|(k, _)| *k == key) {
                    Some(std::mem::replace(&mut slot.1, elem))
                } else {
                    pairs.push((key, elem));
                    None
                }
            }
            _ => unreachable!(),
        };
        link::fix_children_links(&mut state.arena, self.handle);
        let item = old
            .as_ref()
            .map(|e| elem_to_item(&self.manager, &state.arena, e));
        if let Some(Elem::Child(h)) = old {
            state.detach(h);
        }
        Ok(item)
    }

    pub fn delete(&self, key: &Value) -> Result<Option<Item>> {
        let mut state = self.manager.state.lock();
        let position = match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Map(pairs) => pairs.iter().position(|(k, _)| k == key),
            _ => unreachable!(),
        };
        let Some(index) = position else {
            return Ok(None);
        };
        state.mark_dirty(self.handle)?;
        let (_, removed) = match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Map(pairs) => pairs.remove(index),
            _ => unreachable!(),
        };
        link::fix_children_links(&mut state.arena, self.handle);
        let item = elem_to_item(&self.manager, &state.arena, &removed);
        if let Elem::Child(h) = removed {
            state.detach(h);
        }
        Ok(Some(item))
    }

    pub fn clear(&self) -> Result<()> {
        let mut state = self.manager.state.lock();
        state.mark_dirty(self.handle)?;
        let children: Vec<Handle> = match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Map(pairs) => pairs
                .iter()
                .filter_map(|(_, e)| match e {
                    Elem::Child(h) => Some(*h),
                    Elem::Leaf(_) => None,
                })
                .collect(),
            _ => unreachable!(),
        };
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Map(pairs) => pairs.clear(),
            _ => unreachable!(),
        }
        for child in children {
            state.detach(child);
        }
        Ok(())
    }

    /// Insert or overwrite every pair in `entries`, like `dict.update`.
    pub fn update(&self, entries: Vec<(Value, Assignable)>) -> Result<()> {
        for (key, value) in entries {
            self.set(key, value)?;
        }
        Ok(())
    }
}

/// An unordered collection of hashable leaf values. Elements carry no child
/// wrapper bookkeeping (spec §4.3): a set can never hold a container.
#[derive(Clone)]
pub struct SetView {
    manager: Arc<Manager>,
    handle: Handle,
}

impl SetView {
    pub fn is_linked(&self) -> bool {
        self.manager.is_linked(self.handle)
    }

    pub fn is_dirty(&self) -> bool {
        self.manager.is_dirty(self.handle)
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn len(&self) -> usize {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Set(values) => values.len(),
            _ => unreachable!(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, value: &Value) -> bool {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Set(values) => values.contains(value),
            _ => unreachable!(),
        }
    }

    pub fn values(&self) -> Vec<Value> {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Set(values) => values.iter().cloned().collect(),
            _ => unreachable!(),
        }
    }

    /// Returns `true` if `value` was newly inserted.
    pub fn add(&self, value: Value) -> Result<bool> {
        let mut state = self.manager.state.lock();
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Set(values) => Ok(values.insert(value)),
            _ => unreachable!(),
        }
    }

    /// Removes `value` if present; never errors on absence.
    pub fn discard(&self, value: &Value) -> Result<bool> {
        let mut state = self.manager.state.lock();
        let present = match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Set(values) => values.contains(value),
            _ => unreachable!(),
        };
        if !present {
            return Ok(false);
        }
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Set(values) => values.remove(value),
            _ => unreachable!(),
        };
        Ok(true)
    }

    /// Removes `value`, erroring if it was not a member.
    pub fn remove(&self, value: &Value) -> Result<()> {
        if self.discard(value)? {
            Ok(())
        } else {
            Err(Error::Other(format!("{value} is not a member of the set")))
        }
    }

    pub fn clear(&self) -> Result<()> {
        let mut state = self.manager.state.lock();
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Set(values) => values.clear(),
            _ => unreachable!(),
        }
        Ok(())
    }

    pub fn union_with(&self, other: &HashSet<Value>) -> Result<()> {
        let mut state = self.manager.state.lock();
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Set(values) => values.extend(other.iter().cloned()),
            _ => unreachable!(),
        }
        Ok(())
    }

    pub fn intersect_with(&self, other: &HashSet<Value>) -> Result<()> {
        let mut state = self.manager.state.lock();
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Set(values) => values.retain(|v| other.contains(v)),
            _ => unreachable!(),
        }
        Ok(())
    }

    pub fn difference_with(&self, other: &HashSet<Value>) -> Result<()> {
        let mut state = self.manager.state.lock();
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Set(values) => values.retain(|v| !other.contains(v)),
            _ => unreachable!(),
        }
        Ok(())
    }
}

/// A mutable byte buffer.
#[derive(Clone)]
pub struct ByteBuffer {
    manager: Arc<Manager>,
    handle: Handle,
}

impl ByteBuffer {
    pub fn is_linked(&self) -> bool {
        self.manager.is_linked(self.handle)
    }

    pub fn is_dirty(&self) -> bool {
        self.manager.is_dirty(self.handle)
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn len(&self) -> usize {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Bytes(b) => b.len(),
            _ => unreachable!(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<u8> {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle)?.kind {
            NodeKind::Bytes(b) => b.get(index).copied(),
            _ => unreachable!(),
        }
    }

    pub fn to_vec(&self) -> Vec<u8> {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Bytes(b) => b.clone(),
            _ => unreachable!(),
        }
    }

    pub fn set(&self, index: usize, byte: u8) -> Result<()> {
        let mut state = self.manager.state.lock();
        let len = match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Bytes(b) => b.len(),
            _ => unreachable!(),
        };
        if index >= len {
            return Err(Error::Other(format!("byte index {index} out of bounds")));
        }
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Bytes(b) => b[index] = byte,
            _ => unreachable!(),
        }
        Ok(())
    }

    pub fn push(&self, byte: u8) -> Result<()> {
        let mut state = self.manager.state.lock();
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Bytes(b) => b.push(byte),
            _ => unreachable!(),
        }
        Ok(())
    }

    pub fn extend(&self, bytes: &[u8]) -> Result<()> {
        let mut state = self.manager.state.lock();
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Bytes(b) => b.extend_from_slice(bytes),
            _ => unreachable!(),
        }
        Ok(())
    }

    /// Replace `range` with `bytes`, returning the bytes evicted.
    pub fn splice(&self, range: Range<usize>, bytes: &[u8]) -> Result<Vec<u8>> {
        let mut state = self.manager.state.lock();
        let len = match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Bytes(b) => b.len(),
            _ => unreachable!(),
        };
        if range.end > len || range.start > range.end {
            return Err(Error::Other("byte splice range out of bounds".into()));
        }
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Bytes(b) => Ok(b.splice(range, bytes.iter().copied()).collect()),
            _ => unreachable!(),
        }
    }

    pub fn truncate(&self, len: usize) -> Result<()> {
        let mut state = self.manager.state.lock();
        state.mark_dirty(self.handle)?;
        match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Bytes(b) => b.truncate(len),
            _ => unreachable!(),
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        self.truncate(0)
    }
}

/// A named-field container wrapping a user-defined "record" value.
#[derive(Clone)]
pub struct Record {
    manager: Arc<Manager>,
    handle: Handle,
}

impl Record {
    pub fn is_linked(&self) -> bool {
        self.manager.is_linked(self.handle)
    }

    pub fn is_dirty(&self) -> bool {
        self.manager.is_dirty(self.handle)
    }

    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn type_tag(&self) -> String {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Record { type_tag, .. } => type_tag.clone(),
            _ => unreachable!(),
        }
    }

    pub fn field_names(&self) -> Vec<String> {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Record { fields, .. } => fields.iter().map(|(n, _)| n.clone()).collect(),
            _ => unreachable!(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Item> {
        let state = self.manager.state.lock();
        match &state.arena.get(self.handle)?.kind {
            NodeKind::Record { fields, .. } => fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, e)| elem_to_item(&self.manager, &state.arena, e)),
            _ => unreachable!(),
        }
    }

    /// Insert or overwrite a field (spec §4.3: "attribute replacement with a
    /// container value causes the new value to be wrapped and linked").
    pub fn set(&self, name: impl Into<String>, value: impl Into<Assignable>) -> Result<Option<Item>> {
        let name = name.into();
        let mut state = self.manager.state.lock();
        let elem = assignable_to_elem(&mut state.arena, value.into())?;
        state.mark_dirty(self.handle)?;
        let old = match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Record { fields, .. } => {
                if let Some(slot) = fields.iter_mut().find(|(n, _)| *n == name) {
                    Some(std::mem::replace(&mut slot.1, elem))
                } else {
                    fields.push((name, elem));
                    None
                }
            }
            _ => unreachable!(),
        };
        link::fix_children_links(&mut state.arena, self.handle);
        let item = old
            .as_ref()
            .map(|e| elem_to_item(&self.manager, &state.arena, e));
        if let Some(Elem::Child(h)) = old {
            state.detach(h);
        }
        Ok(item)
    }

    pub fn delete(&self, name: &str) -> Result<Option<Item>> {
        let mut state = self.manager.state.lock();
        let position = match &state.arena.get(self.handle).unwrap().kind {
            NodeKind::Record { fields, .. } => fields.iter().position(|(n, _)| n == name),
            _ => unreachable!(),
        };
        let Some(index) = position else {
            return Ok(None);
        };
        state.mark_dirty(self.handle)?;
        let (_, removed) = match &mut state.arena.get_mut(self.handle).unwrap().kind {
            NodeKind::Record { fields, .. } => fields.remove(index),
            _ => unreachable!(),
        };
        link::fix_children_links(&mut state.arena, self.handle);
        let item = elem_to_item(&self.manager, &state.arena, &removed);
        if let Elem::Child(h) = removed {
            state.detach(h);
        }
        Ok(Some(item))
    }
}
