//! Document tree with child-list mutation observation.
//!
//! Nodes live in an arena and are addressed by `NodeId`. Every child-list
//! change is turned into a `MutationRecord` and queued for each interested
//! registration; `Document::deliver` plays the role of the event-loop
//! checkpoint and hands queued batches to their callbacks.

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// One detected change to a node's child list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added_nodes: Vec<NodeId>,
    pub removed_nodes: Vec<NodeId>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObserveOptions {
    pub child_list: bool,
    pub subtree: bool,
}

impl ObserveOptions {
    /// `{ childList: true, subtree: true }`
    pub fn child_list_subtree() -> Self {
        Self {
            child_list: true,
            subtree: true,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomError {
    #[error("observe options must request child list changes")]
    NothingToObserve,
    #[error("node {0:?} does not belong to this document")]
    UnknownNode(NodeId),
    #[error("node {child:?} cannot be inserted under its own descendant {parent:?}")]
    Hierarchy { parent: NodeId, child: NodeId },
}

/// Receives batches of mutation records.
pub trait MutationCallback {
    fn on_mutations(&mut self, records: &[MutationRecord], doc: &mut Document);
}

impl<F> MutationCallback for F
where
    F: FnMut(&[MutationRecord], &mut Document),
{
    fn on_mutations(&mut self, records: &[MutationRecord], doc: &mut Document) {
        self(records, doc)
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element {
        tag_name: String,
        attributes: BTreeMap<String, String>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

struct Registration {
    target: NodeId,
    options: ObserveOptions,
    queue: Vec<MutationRecord>,
}

pub struct Document {
    nodes: Vec<NodeData>,
    registrations: Vec<Registration>,
    // Parallel to `registrations`; a slot is `None` while its callback runs.
    callbacks: Vec<Option<Box<dyn MutationCallback>>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            registrations: Vec::new(),
            callbacks: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Create a detached element. Tag names are reported upper-case.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        self.push(NodeKind::Element {
            tag_name: tag.to_ascii_uppercase(),
            attributes: BTreeMap::new(),
        })
    }

    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id.0).map(|n| &n.kind) {
            Some(NodeKind::Element { tag_name, .. }) => Some(tag_name.as_str()),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id.0).map(|n| &n.kind) {
            Some(NodeKind::Text(t)) => Some(t.as_str()),
            _ => None,
        }
    }

    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.nodes.get(id.0).map(|n| &n.kind) {
            Some(NodeKind::Element { attributes, .. }) => attributes.get(name).map(String::as_str),
            _ => None,
        }
    }

    /// Set an attribute on an element; ignored for other node kinds.
    /// Attribute changes are not child-list mutations and queue nothing.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(NodeData {
            kind: NodeKind::Element { attributes, .. },
            ..
        }) = self.nodes.get_mut(id.0)
        {
            attributes.insert(name.to_string(), value.into());
        }
    }

    /// Append `child` to `parent`, detaching it from its current parent first.
    ///
    /// A move produces two records: a removal on the old parent, then an
    /// addition on the new one.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.check(parent)?;
        self.check(child)?;
        if child == self.root() || self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::Hierarchy { parent, child });
        }
        if let Some(old) = self.nodes[child.0].parent {
            self.detach(old, child);
        }
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        self.queue_record(MutationRecord {
            target: parent,
            added_nodes: vec![child],
            removed_nodes: Vec::new(),
        });
        Ok(())
    }

    /// Remove `child` from `parent`. Returns false if it was not a child.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool, DomError> {
        self.check(parent)?;
        self.check(child)?;
        if self.nodes[child.0].parent != Some(parent) {
            return Ok(false);
        }
        self.detach(parent, child);
        Ok(true)
    }

    fn detach(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.retain(|c| *c != child);
        self.nodes[child.0].parent = None;
        self.queue_record(MutationRecord {
            target: parent,
            added_nodes: Vec::new(),
            removed_nodes: vec![child],
        });
    }

    fn check(&self, id: NodeId) -> Result<(), DomError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(DomError::UnknownNode(id))
        }
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, mut node: NodeId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node.0].parent {
                Some(p) => node = p,
                None => return false,
            }
        }
    }

    fn queue_record(&mut self, record: MutationRecord) {
        let target = record.target;
        let interested: Vec<usize> = self
            .registrations
            .iter()
            .enumerate()
            .filter(|(_, reg)| {
                reg.options.child_list
                    && (reg.target == target
                        || (reg.options.subtree && self.is_inclusive_ancestor(reg.target, target)))
            })
            .map(|(i, _)| i)
            .collect();

        for i in interested {
            self.registrations[i].queue.push(record.clone());
        }
    }

    /// Register `callback` for child-list changes at `target` (and below it
    /// when `options.subtree` is set).
    pub fn observe(
        &mut self,
        target: NodeId,
        options: ObserveOptions,
        callback: impl MutationCallback + 'static,
    ) -> Result<(), DomError> {
        if !options.child_list {
            return Err(DomError::NothingToObserve);
        }
        self.check(target)?;
        self.registrations.push(Registration {
            target,
            options,
            queue: Vec::new(),
        });
        self.callbacks.push(Some(Box::new(callback)));
        Ok(())
    }

    pub fn pending_records(&self) -> usize {
        self.registrations.iter().map(|r| r.queue.len()).sum()
    }

    /// Deliver every queued batch, in registration order, until no records remain.
    /// Returns the number of batches delivered.
    pub fn deliver(&mut self) -> usize {
        let mut batches = 0;
        loop {
            let mut delivered_any = false;
            for i in 0..self.registrations.len() {
                let records = std::mem::take(&mut self.registrations[i].queue);
                if records.is_empty() {
                    continue;
                }
                let Some(mut callback) = self.callbacks[i].take() else {
                    // Re-entrant delivery for a running callback; keep the records.
                    self.registrations[i].queue = records;
                    continue;
                };
                callback.on_mutations(&records, self);
                self.callbacks[i] = Some(callback);
                batches += 1;
                delivered_any = true;
            }
            if !delivered_any {
                return batches;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Seen = Rc<RefCell<Vec<Vec<MutationRecord>>>>;

    fn recorder(seen: &Seen) -> impl FnMut(&[MutationRecord], &mut Document) + 'static {
        let seen = seen.clone();
        move |records: &[MutationRecord], _: &mut Document| {
            seen.borrow_mut().push(records.to_vec())
        }
    }

    #[test]
    fn subtree_observer_sees_deep_insertions_in_order() {
        let mut doc = Document::new();
        let seen: Seen = Rc::default();
        let root = doc.root();
        doc.observe(root, ObserveOptions::child_list_subtree(), recorder(&seen))
            .unwrap();

        let body = doc.create_element("body");
        let p = doc.create_element("p");
        let text = doc.create_text("hello");
        doc.append_child(root, body).unwrap();
        doc.append_child(body, p).unwrap();
        doc.append_child(p, text).unwrap();

        assert_eq!(doc.pending_records(), 3);
        assert_eq!(doc.deliver(), 1);

        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        let targets: Vec<NodeId> = seen[0].iter().map(|r| r.target).collect();
        assert_eq!(targets, vec![root, body, p]);
        assert_eq!(seen[0][2].added_nodes, vec![text]);
        assert_eq!(doc.text(text), Some("hello"));
    }

    #[test]
    fn non_subtree_observer_only_sees_its_target() {
        let mut doc = Document::new();
        let seen: Seen = Rc::default();
        let root = doc.root();
        let body = doc.create_element("body");
        doc.append_child(root, body).unwrap();
        doc.observe(
            root,
            ObserveOptions {
                child_list: true,
                subtree: false,
            },
            recorder(&seen),
        )
        .unwrap();

        let div = doc.create_element("div");
        doc.append_child(body, div).unwrap();
        assert_eq!(doc.deliver(), 0);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn move_records_removal_then_addition() {
        let mut doc = Document::new();
        let seen: Seen = Rc::default();
        let root = doc.root();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        let img = doc.create_element("img");
        doc.append_child(root, a).unwrap();
        doc.append_child(root, b).unwrap();
        doc.append_child(a, img).unwrap();
        doc.observe(root, ObserveOptions::child_list_subtree(), recorder(&seen))
            .unwrap();

        doc.append_child(b, img).unwrap();
        doc.deliver();

        let seen = seen.borrow();
        assert_eq!(
            seen[0],
            vec![
                MutationRecord {
                    target: a,
                    added_nodes: vec![],
                    removed_nodes: vec![img],
                },
                MutationRecord {
                    target: b,
                    added_nodes: vec![img],
                    removed_nodes: vec![],
                },
            ]
        );
        assert_eq!(doc.parent(img), Some(b));
        assert!(doc.children(a).is_empty());
    }

    #[test]
    fn observe_requires_child_list() {
        let mut doc = Document::new();
        let root = doc.root();
        let err = doc
            .observe(root, ObserveOptions::default(), |_: &[MutationRecord], _: &mut Document| {})
            .unwrap_err();
        assert_eq!(err, DomError::NothingToObserve);
    }

    #[test]
    fn records_produced_by_callbacks_are_delivered_next_round() {
        let mut doc = Document::new();
        let root = doc.root();
        let seen: Seen = Rc::default();
        doc.observe(root, ObserveOptions::child_list_subtree(), recorder(&seen))
            .unwrap();

        let mut inserted = false;
        doc.observe(
            root,
            ObserveOptions::child_list_subtree(),
            move |_: &[MutationRecord], doc: &mut Document| {
                if !inserted {
                    inserted = true;
                    let span = doc.create_element("span");
                    let root = doc.root();
                    doc.append_child(root, span).unwrap();
                }
            },
        )
        .unwrap();

        let div = doc.create_element("div");
        doc.append_child(root, div).unwrap();

        // first round: both observers; second round: both see the span
        assert_eq!(doc.deliver(), 4);
        assert_eq!(seen.borrow().len(), 2);
        assert_eq!(doc.pending_records(), 0);
    }

    #[test]
    fn cannot_append_ancestor_under_descendant() {
        let mut doc = Document::new();
        let root = doc.root();
        let outer = doc.create_element("div");
        let inner = doc.create_element("div");
        doc.append_child(root, outer).unwrap();
        doc.append_child(outer, inner).unwrap();
        assert_eq!(
            doc.append_child(inner, outer),
            Err(DomError::Hierarchy {
                parent: inner,
                child: outer,
            })
        );
        assert!(doc.append_child(outer, root).is_err());
    }

    #[test]
    fn remove_child_of_other_parent_is_noop() {
        let mut doc = Document::new();
        let root = doc.root();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        doc.append_child(root, a).unwrap();
        assert_eq!(doc.remove_child(b, a), Ok(false));
        assert_eq!(doc.remove_child(root, a), Ok(true));
        assert_eq!(doc.parent(a), None);
    }
}
