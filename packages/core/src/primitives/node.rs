//! The child-node primitive.
//!
//! Owns the content region before a marker comment. Scalar values render a
//! single text node, an adopted node is inserted as-is, and a list renders
//! one nested slot per item, index-keyed, each with its own marker.
//!
//! New content is assembled in a detached staging container during the
//! render phase; commit moves it into place, so the live tree only ever
//! changes during the commit phase.

use std::cell::RefCell;
use std::rc::Rc;

use weft_dom::{Namespace, Node};

use crate::bindable::Bindable;
use crate::binding::{Binding, BindingHandle, Directive};
use crate::error::RenderError;
use crate::part::Part;
use crate::scheduler::RenderSession;
use crate::slot::{Slot, SlotHandle};

pub(crate) struct NodeDirective;

impl Directive for NodeDirective {
    fn name(&self) -> &str {
        "node"
    }

    fn ensure_value(&self, value: &Bindable, _part: &Part) -> Result<(), RenderError> {
        match value {
            Bindable::Null
            | Bindable::Text(_)
            | Bindable::Int(_)
            | Bindable::Float(_)
            | Bindable::Bool(_)
            | Bindable::Node(_)
            | Bindable::List(_) => Ok(()),
            other => Err(RenderError::precondition(
                "child-node",
                format!("{} cannot be rendered as child content", other.type_name()),
            )),
        }
    }

    fn resolve_binding(
        self: Rc<Self>,
        value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError> {
        Ok(Rc::new(RefCell::new(NodeBinding {
            directive: self,
            part,
            value,
            content: Content::Empty,
            retired: Vec::new(),
        })))
    }
}

enum Content {
    Empty,
    Text {
        node: Node,
        committed: Option<String>,
        mounted: bool,
    },
    Adopted {
        node: Node,
        mounted: bool,
    },
    Items(Vec<ItemSlot>),
}

struct ItemSlot {
    slot: SlotHandle,
    marker: Node,
    /// Detached container holding not-yet-mounted content.
    staging: Option<Node>,
    mounted: bool,
}

pub(crate) struct NodeBinding {
    directive: Rc<NodeDirective>,
    part: Part,
    value: Bindable,
    content: Content,
    /// Nodes to detach at the next commit.
    retired: Vec<Node>,
}

impl NodeBinding {
    fn namespace(&self) -> Namespace {
        match &self.part {
            Part::ChildNode { namespace, .. } => *namespace,
            _ => Namespace::Html,
        }
    }

    fn is_root_layout(&self) -> bool {
        matches!(&self.part, Part::ChildNode { anchor: Some(_), .. })
    }

    fn create_item(
        &self,
        value: Bindable,
        session: &mut RenderSession,
    ) -> Result<ItemSlot, RenderError> {
        let staging = Node::element("staging", self.namespace());
        let marker = Node::comment("");
        staging.append_child(&marker);
        let item_part = Part::ChildNode {
            node: marker.clone(),
            anchor: None,
            namespace: self.namespace(),
        };
        let slot = Slot::resolve(value, item_part, session)?;
        Slot::connect(&slot, session)?;
        Ok(ItemSlot {
            slot,
            marker,
            staging: Some(staging),
            mounted: false,
        })
    }

    fn teardown(&mut self, session: &mut RenderSession) {
        match std::mem::replace(&mut self.content, Content::Empty) {
            Content::Empty => {}
            Content::Text { node, mounted, .. } | Content::Adopted { node, mounted } => {
                if mounted {
                    self.retired.push(node);
                }
            }
            Content::Items(items) => {
                for item in items {
                    Slot::disconnect(&item.slot, session);
                    if item.mounted {
                        self.retired.push(item.marker);
                    }
                }
            }
        }
    }

    /// Build content for the current value. Returns whether a structural
    /// commit is needed.
    fn build(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        match &self.value {
            Bindable::Null => Ok(!self.retired.is_empty()),
            Bindable::Node(node) => {
                self.content = Content::Adopted {
                    node: node.clone(),
                    mounted: false,
                };
                Ok(true)
            }
            Bindable::List(values) => {
                let mut items = Vec::with_capacity(values.len());
                for value in values.iter() {
                    items.push(self.create_item(value.clone(), session)?);
                }
                self.content = Content::Items(items);
                Ok(true)
            }
            scalar => {
                self.content = Content::Text {
                    node: Node::text(""),
                    committed: None,
                    mounted: false,
                };
                Ok(scalar.to_text().map(|t| !t.is_empty()).unwrap_or(false)
                    || !self.retired.is_empty())
            }
        }
    }
}

impl Binding for NodeBinding {
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
        enum Plan {
            TextInPlace,
            List,
            Rebuild,
        }
        let plan = match (&self.content, &value) {
            (Content::Text { .. }, scalar) if scalar.to_text().is_some() && !scalar.is_null() => {
                Plan::TextInPlace
            }
            (Content::Items(_), Bindable::List(_)) => Plan::List,
            _ => Plan::Rebuild,
        };
        match plan {
            Plan::TextInPlace => {
                // text node stays; the data write happens at commit
                self.value = value;
                Ok(true)
            }
            Plan::List => {
                let Bindable::List(new_values) = &value else {
                    unreachable!("plan chosen from the value shape");
                };
                let new_values = new_values.clone();
                self.value = value;

                let mut structural = false;
                let shared = match &mut self.content {
                    Content::Items(items) => {
                        let shared = items.len().min(new_values.len());
                        for (item, entry) in items.iter().zip(new_values.iter()).take(shared) {
                            Slot::reconcile(&item.slot, entry.clone(), session)?;
                        }
                        if items.len() > new_values.len() {
                            for item in items.split_off(new_values.len()) {
                                Slot::disconnect(&item.slot, session);
                                if item.mounted {
                                    self.retired.push(item.marker);
                                }
                                structural = true;
                            }
                        }
                        shared
                    }
                    _ => unreachable!("plan chosen from the content shape"),
                };
                for entry in new_values[shared..].iter() {
                    let item = self.create_item(entry.clone(), session)?;
                    if let Content::Items(items) = &mut self.content {
                        items.push(item);
                    }
                    structural = true;
                }
                Ok(structural)
            }
            Plan::Rebuild => {
                self.teardown(session);
                self.value = value;
                self.build(session)
            }
        }
    }

    fn connect(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        self.build(session)
    }

    fn hydrate(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        match &self.value {
            Bindable::Null => {
                self.content = Content::Empty;
            }
            Bindable::Node(node) => {
                let live = session.walker()?.peek_node();
                if live.as_ref() != Some(node) {
                    return Err(RenderError::HydrationMismatch {
                        path: session.walker()?.path(),
                        expected: "the adopted node".to_string(),
                        found: live.map(|n| n.describe()).unwrap_or_default(),
                    });
                }
                session.walker()?.pop_node(node.node_type(), None)?;
                if node.is_element() {
                    session.walker()?.exit_element()?;
                }
                self.content = Content::Adopted {
                    node: node.clone(),
                    mounted: true,
                };
            }
            Bindable::List(values) => {
                let mut items = Vec::with_capacity(values.len());
                for value in values.iter() {
                    let marker = Node::comment("");
                    let item_part = Part::ChildNode {
                        node: marker.clone(),
                        anchor: None,
                        namespace: self.namespace(),
                    };
                    let slot = Slot::resolve(value.clone(), item_part, session)?;
                    Slot::hydrate(&slot, session)?;
                    items.push(ItemSlot {
                        slot,
                        marker,
                        staging: None,
                        mounted: true,
                    });
                }
                self.content = Content::Items(items);
            }
            scalar => {
                let text = scalar.to_text().unwrap_or_default();
                if text.is_empty() {
                    self.content = Content::Text {
                        node: Node::text(""),
                        committed: None,
                        mounted: false,
                    };
                } else {
                    let live = session.walker()?.pop_node(weft_dom::NodeType::Text, None)?;
                    let data = live.data().unwrap_or_default();
                    if data != text {
                        return Err(RenderError::HydrationMismatch {
                            path: session.walker()?.path(),
                            expected: format!("text {text:?}"),
                            found: format!("text {data:?}"),
                        });
                    }
                    self.content = Content::Text {
                        node: live,
                        committed: Some(text),
                        mounted: true,
                    };
                }
            }
        }
        if !self.is_root_layout() {
            if let Part::ChildNode { node, .. } = &self.part {
                let marker = node.clone();
                session.walker()?.adopt_marker(&marker)?;
            }
        }
        Ok(false)
    }

    fn disconnect(&mut self, session: &mut RenderSession) {
        if let Content::Items(items) = &self.content {
            for item in items {
                Slot::disconnect(&item.slot, session);
            }
        }
    }

    fn commit(&mut self) {
        for node in self.retired.drain(..) {
            node.detach();
        }
        match &mut self.content {
            Content::Empty => {}
            Content::Text {
                node,
                committed,
                mounted,
            } => {
                if !*mounted {
                    self.part.insert_content(node, None);
                    *mounted = true;
                }
                let text = self.value.to_text().unwrap_or_default();
                if committed.as_deref() != Some(text.as_str()) {
                    node.set_data(&text);
                    *committed = Some(text);
                }
            }
            Content::Adopted { node, mounted } => {
                if !*mounted {
                    self.part.insert_content(node, None);
                    *mounted = true;
                }
            }
            Content::Items(items) => {
                for item in items {
                    if !item.mounted {
                        if let Some(staging) = item.staging.take() {
                            for child in staging.children() {
                                self.part.insert_content(&child, None);
                            }
                        }
                        item.mounted = true;
                    }
                }
            }
        }
    }

    fn rollback(&mut self) {
        match std::mem::replace(&mut self.content, Content::Empty) {
            Content::Empty => {}
            Content::Text { node, mounted, .. } | Content::Adopted { node, mounted } => {
                if mounted {
                    node.detach();
                }
            }
            Content::Items(items) => {
                for item in items {
                    item.slot.borrow_mut().rollback();
                    if item.mounted {
                        item.marker.detach();
                    }
                }
            }
        }
        for node in self.retired.drain(..) {
            node.detach();
        }
    }

    fn content_nodes(&self) -> Vec<Node> {
        match &self.content {
            Content::Empty => Vec::new(),
            Content::Text { node, mounted, .. } | Content::Adopted { node, mounted } => {
                if *mounted {
                    vec![node.clone()]
                } else {
                    Vec::new()
                }
            }
            Content::Items(items) => {
                let mut nodes = Vec::new();
                for item in items {
                    nodes.extend(item.slot.borrow().content_nodes());
                    if item.mounted {
                        nodes.push(item.marker.clone());
                    }
                }
                nodes
            }
        }
    }
}
