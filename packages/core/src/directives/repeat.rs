//! The keyed-list directive.
//!
//! Renders an iterable of keyed entries as child content, one nested slot
//! per entry, and drives keyed reconciliation when the keys change:
//! surviving entries update in place, reordered entries move their content
//! region (content nodes plus marker), everything else inserts or removes.

use std::cell::RefCell;
use std::rc::Rc;

use weft_dom::{Namespace, Node};

use crate::bindable::{Bindable, Key};
use crate::binding::{Binding, BindingHandle, Directive};
use crate::error::RenderError;
use crate::part::Part;
use crate::reconcile::{reconcile, MutationHandler};
use crate::scheduler::RenderSession;
use crate::slot::{Slot, SlotHandle};

thread_local! {
    static REPEAT: Rc<RepeatDirective> = Rc::new(RepeatDirective);
}

/// Build a keyed-list value.
pub fn repeat<K: Into<Key>>(entries: impl IntoIterator<Item = (K, Bindable)>) -> Bindable {
    let entries = entries
        .into_iter()
        .map(|(key, content)| Bindable::keyed(key, content));
    Bindable::directive(REPEAT.with(|d| d.clone()), Bindable::list(entries))
}

struct RepeatDirective;

impl Directive for RepeatDirective {
    fn name(&self) -> &str {
        "repeat"
    }

    fn ensure_value(&self, value: &Bindable, _part: &Part) -> Result<(), RenderError> {
        match value {
            Bindable::List(entries) => {
                for entry in entries.iter() {
                    if !matches!(entry, Bindable::Keyed(_)) {
                        return Err(RenderError::precondition(
                            "repeat",
                            format!("every entry must be keyed, got {}", entry.type_name()),
                        ));
                    }
                }
                Ok(())
            }
            other => Err(RenderError::precondition(
                "repeat",
                format!("expected a keyed list, got {}", other.type_name()),
            )),
        }
    }

    fn resolve_binding(
        self: Rc<Self>,
        value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError> {
        Ok(Rc::new(RefCell::new(RepeatBinding {
            directive: self,
            part,
            value,
            keys: Vec::new(),
            items: Vec::new(),
            retired: Vec::new(),
            structural: false,
        })))
    }
}

struct RepeatItem {
    slot: SlotHandle,
    marker: Node,
    /// Detached container holding not-yet-mounted content.
    staging: Option<Node>,
    /// False while the item's region needs (re)placement at commit.
    placed: bool,
}

struct RepeatBinding {
    directive: Rc<RepeatDirective>,
    part: Part,
    value: Bindable,
    keys: Vec<Key>,
    items: Vec<RepeatItem>,
    /// Markers of removed items, detached at the next commit.
    retired: Vec<Node>,
    structural: bool,
}

fn split_entries(value: &Bindable) -> (Vec<Key>, Vec<Bindable>) {
    let mut keys = Vec::new();
    let mut sources = Vec::new();
    if let Bindable::List(entries) = value {
        for entry in entries.iter() {
            if let Bindable::Keyed(keyed) = entry {
                keys.push(keyed.key.clone());
                sources.push(keyed.content.clone());
            }
        }
    }
    (keys, sources)
}

impl RepeatBinding {
    fn namespace(&self) -> Namespace {
        match &self.part {
            Part::ChildNode { namespace, .. } => *namespace,
            _ => Namespace::Html,
        }
    }
}

/// Applies the reconciliation script to the item list; DOM placement is
/// deferred to the binding's commit. Entry failures are remembered and
/// re-raised once the walk finishes, since the script itself cannot stop
/// halfway.
struct RepeatReconciler<'a, 'b, 'f> {
    session: &'a mut RenderSession<'f>,
    namespace: Namespace,
    retired: &'b mut Vec<Node>,
    structural: bool,
    moves: usize,
    error: Option<RenderError>,
}

impl<'a, 'b, 'f> RepeatReconciler<'a, 'b, 'f> {
    fn record_error(&mut self, error: RenderError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

impl<'a, 'b, 'f> MutationHandler<Key, Bindable, RepeatItem> for RepeatReconciler<'a, 'b, 'f> {
    fn insert(&mut self, _index: usize, _key: &Key, source: &Bindable) -> RepeatItem {
        self.structural = true;
        match create_item(source.clone(), self.namespace, self.session) {
            Ok(item) => item,
            Err(error) => {
                self.record_error(error);
                empty_item(self.namespace, self.session)
            }
        }
    }

    fn update(&mut self, target: &mut RepeatItem, source: &Bindable, _index: usize) {
        if let Err(error) = Slot::reconcile(&target.slot, source.clone(), self.session) {
            self.record_error(error);
        }
    }

    fn relocate(&mut self, target: &mut RepeatItem, _index: usize) {
        self.structural = true;
        self.moves += 1;
        target.placed = false;
    }

    fn remove(&mut self, _key: &Key, target: RepeatItem) {
        self.structural = true;
        Slot::disconnect(&target.slot, self.session);
        if target.placed || target.staging.is_none() {
            self.retired.push(target.marker);
        }
    }
}

fn create_item(
    source: Bindable,
    namespace: Namespace,
    session: &mut RenderSession,
) -> Result<RepeatItem, RenderError> {
    let staging = Node::element("staging", namespace);
    let marker = Node::comment("");
    staging.append_child(&marker);
    let item_part = Part::ChildNode {
        node: marker.clone(),
        anchor: None,
        namespace,
    };
    let slot = Slot::resolve(source, item_part, session)?;
    Slot::connect(&slot, session)?;
    Ok(RepeatItem {
        slot,
        marker,
        staging: Some(staging),
        placed: false,
    })
}

/// A placeholder entry with no content; stands in for an entry whose value
/// failed to resolve.
fn empty_item(namespace: Namespace, session: &mut RenderSession) -> RepeatItem {
    let staging = Node::element("staging", namespace);
    let marker = Node::comment("");
    staging.append_child(&marker);
    let item_part = Part::ChildNode {
        node: marker.clone(),
        anchor: None,
        namespace,
    };
    let slot = Slot::resolve(Bindable::Null, item_part, session)
        .expect("null child content always resolves");
    RepeatItem {
        slot,
        marker,
        staging: Some(staging),
        placed: false,
    }
}

impl Binding for RepeatBinding {
    fn directive(&self) -> Rc<dyn Directive> {
        self.directive.clone()
    }

    fn part(&self) -> &Part {
        &self.part
    }

    fn value(&self) -> &Bindable {
        &self.value
    }

    fn should_bind(&self, new: &Bindable) -> bool {
        !self.value.same(new)
    }

    fn bind(&mut self, value: Bindable, session: &mut RenderSession) -> Result<bool, RenderError> {
        let (new_keys, new_sources) = split_entries(&value);
        let old_keys = std::mem::take(&mut self.keys);
        let old_items = std::mem::take(&mut self.items);
        let mut handler = RepeatReconciler {
            session,
            namespace: self.namespace(),
            retired: &mut self.retired,
            structural: false,
            moves: 0,
            error: None,
        };
        self.items = reconcile(&old_keys, old_items, &new_keys, &new_sources, &mut handler);
        let structural = handler.structural;
        let failure = handler.error.take();
        tracing::trace!(moves = handler.moves, "keyed list reconciled");
        self.keys = new_keys;
        self.value = value;
        self.structural |= structural;
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(structural)
    }

    fn connect(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        let (keys, sources) = split_entries(&self.value);
        let namespace = self.namespace();
        for source in sources {
            self.items.push(create_item(source, namespace, session)?);
        }
        self.keys = keys;
        self.structural = true;
        Ok(true)
    }

    fn hydrate(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        let (keys, sources) = split_entries(&self.value);
        let namespace = self.namespace();
        for source in sources {
            let marker = Node::comment("");
            let item_part = Part::ChildNode {
                node: marker.clone(),
                anchor: None,
                namespace,
            };
            let slot = Slot::resolve(source, item_part, session)?;
            Slot::hydrate(&slot, session)?;
            self.items.push(RepeatItem {
                slot,
                marker,
                staging: None,
                placed: true,
            });
        }
        self.keys = keys;
        if let Part::ChildNode {
            node, anchor: None, ..
        } = &self.part
        {
            let marker = node.clone();
            session.walker()?.adopt_marker(&marker)?;
        }
        Ok(false)
    }

    fn disconnect(&mut self, session: &mut RenderSession) {
        for item in &self.items {
            Slot::disconnect(&item.slot, session);
        }
    }

    fn commit(&mut self) {
        for marker in self.retired.drain(..) {
            marker.detach();
        }
        if !self.structural {
            return;
        }
        self.structural = false;
        // walk backwards so every unplaced region lands right before the
        // region that follows it
        let mut next_anchor: Option<Node> = None;
        for item in self.items.iter_mut().rev() {
            if !item.placed {
                let region: Vec<Node> = match item.staging.take() {
                    Some(staging) => staging.children(),
                    None => {
                        let mut nodes = item.slot.borrow().content_nodes();
                        nodes.push(item.marker.clone());
                        nodes
                    }
                };
                for node in &region {
                    self.part.insert_content(node, next_anchor.as_ref());
                }
                item.placed = true;
            }
            let region_start = item
                .slot
                .borrow()
                .content_nodes()
                .into_iter()
                .next()
                .unwrap_or_else(|| item.marker.clone());
            next_anchor = Some(region_start);
        }
    }

    fn rollback(&mut self) {
        for item in self.items.drain(..) {
            item.slot.borrow_mut().rollback();
            item.marker.detach();
        }
        for marker in self.retired.drain(..) {
            marker.detach();
        }
        self.keys.clear();
    }

    fn content_nodes(&self) -> Vec<Node> {
        let mut nodes = Vec::new();
        for item in &self.items {
            nodes.extend(item.slot.borrow().content_nodes());
            nodes.push(item.marker.clone());
        }
        nodes
    }
}
