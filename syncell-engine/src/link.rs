//! Parent-link bookkeeping: building the arena from a decoded graph, walking
//! it back out for snapshots, re-indexing after sequence mutation, and
//! propagating detachment (spec §4.4).

use crate::arena::{Arena, Elem, Handle, NodeKind, NodeState};
use syncell_codec::NodeData;
use syncell_core::{Error, Result, Value};

/// The position a node occupies in its parent: a sequence index, a mapping
/// key, or a record field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(usize),
    MapKey(Value),
    Field(String),
}

/// A node's parent pointer: `None` for the root or a detached subtree's top.
pub struct Link {
    pub parent: Option<(Handle, Key)>,
}

/// Build an arena subtree from a decoded [`NodeData`] graph, returning the
/// handle of its root. `data` must not be [`NodeData::Leaf`] — leaves only
/// ever appear as [`Elem::Leaf`] inside a parent container, never as a
/// standalone arena node (spec §3).
pub fn build_node(arena: &mut Arena<NodeState>, data: NodeData) -> Result<Handle> {
    let kind = match data {
        NodeData::Leaf(_) => {
            return Err(Error::Codec(
                "root value must be a container, not a leaf scalar".into(),
            ))
        }
        NodeData::Seq(items) => {
            let mut elems = Vec::with_capacity(items.len());
            for item in items {
                elems.push(to_elem(arena, item)?);
            }
            NodeKind::Seq(elems)
        }
        NodeData::Map(pairs) => {
            let mut elems = Vec::with_capacity(pairs.len());
            for (k, v) in pairs {
                elems.push((k, to_elem(arena, v)?));
            }
            NodeKind::Map(elems)
        }
        NodeData::Set(vals) => NodeKind::Set(vals.into_iter().collect()),
        NodeData::Bytes(b) => NodeKind::Bytes(b),
        NodeData::Record { type_tag, fields } => {
            let mut elems = Vec::with_capacity(fields.len());
            for (name, v) in fields {
                elems.push((name, to_elem(arena, v)?));
            }
            NodeKind::Record {
                type_tag,
                fields: elems,
            }
        }
    };
    let handle = arena.insert(NodeState::new(kind));
    fix_children_links(arena, handle);
    Ok(handle)
}

fn to_elem(arena: &mut Arena<NodeState>, data: NodeData) -> Result<Elem> {
    match data {
        NodeData::Leaf(v) => Ok(Elem::Leaf(v)),
        other => Ok(Elem::Child(build_node(arena, other)?)),
    }
}

/// Point every direct child of `handle` back at `handle`, using whatever key
/// each child currently occupies in `handle`'s own data.
pub fn fix_children_links(arena: &mut Arena<NodeState>, handle: Handle) {
    let children = arena
        .get(handle)
        .expect("fix_children_links: handle not in arena")
        .kind
        .child_handles();
    for (key, child) in children {
        if let Some(node) = arena.get_mut(child) {
            node.link.parent = Some((handle, key));
        }
    }
}

/// Recursively materialize the arena subtree rooted at `handle` back into a
/// plain [`NodeData`] graph, for `snapshot()` and for commit-time encoding.
pub fn snapshot_node(arena: &Arena<NodeState>, handle: Handle) -> NodeData {
    let node = arena
        .get(handle)
        .expect("snapshot_node: handle not in arena");
    match &node.kind {
        NodeKind::Seq(elems) => {
            NodeData::Seq(elems.iter().map(|e| snapshot_elem(arena, e)).collect())
        }
        NodeKind::Map(pairs) => NodeData::Map(
            pairs
                .iter()
                .map(|(k, e)| (k.clone(), snapshot_elem(arena, e)))
                .collect(),
        ),
        NodeKind::Set(vals) => NodeData::Set(vals.iter().cloned().collect()),
        NodeKind::Bytes(b) => NodeData::Bytes(b.clone()),
        NodeKind::Record { type_tag, fields } => NodeData::Record {
            type_tag: type_tag.clone(),
            fields: fields
                .iter()
                .map(|(n, e)| (n.clone(), snapshot_elem(arena, e)))
                .collect(),
        },
    }
}

fn snapshot_elem(arena: &Arena<NodeState>, elem: &Elem) -> NodeData {
    match elem {
        Elem::Leaf(v) => NodeData::Leaf(v.clone()),
        Elem::Child(h) => snapshot_node(arena, *h),
    }
}

/// Mark `handle` dirty, then walk its parent chain marking ancestors dirty
/// up to the root or the first already-dirty ancestor (spec §4.3's
/// `mark_dirty` hook). Returns the handles freshly flipped from clean to
/// dirty, so a transaction frame can undo exactly those on nested rollback.
/// Returns `DetachedMutation` if `handle` is no longer reachable from the
/// root.
pub fn mark_dirty(arena: &mut Arena<NodeState>, handle: Handle) -> Result<Vec<Handle>> {
    {
        let node = arena
            .get(handle)
            .ok_or(Error::Other("mark_dirty: handle not in arena".into()))?;
        if node.detached {
            return Err(Error::DetachedMutation);
        }
    }
    let mut touched = Vec::new();
    let mut current = handle;
    loop {
        let node = arena
            .get_mut(current)
            .expect("mark_dirty: handle vanished mid-walk");
        if node.dirty {
            break;
        }
        node.dirty = true;
        touched.push(current);
        match &node.link.parent {
            Some((parent, _)) => current = *parent,
            None => break,
        }
    }
    Ok(touched)
}

/// Recursively set `detached` on `handle` and every descendant reachable
/// through child handles, and clear `handle`'s own parent link (spec §4.4).
/// Once set, `detached` never clears (spec §3 invariant 5).
pub fn detach_subtree(arena: &mut Arena<NodeState>, handle: Handle) {
    let mut stack = vec![handle];
    let mut is_subtree_root = true;
    while let Some(h) = stack.pop() {
        let children = if let Some(node) = arena.get_mut(h) {
            node.detached = true;
            if is_subtree_root {
                node.link.parent = None;
                is_subtree_root = false;
            }
            node.kind.child_handles()
        } else {
            continue;
        };
        stack.extend(children.into_iter().map(|(_, child)| child));
    }
}
