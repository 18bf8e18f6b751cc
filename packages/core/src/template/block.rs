//! Template instantiation and the template binding.
//!
//! A rendered template produces a block: the cloned content plus one slot
//! per hole, in hole order. Blocks own no binding state themselves - all of
//! it lives in the slots. The template binding mounts the block's nodes at
//! commit time and forwards rebinds to the slots.

use std::cell::RefCell;
use std::rc::Rc;

use weft_dom::{Node, NodeType, PropertyValue};

use crate::bindable::Bindable;
use crate::binding::{Binding, BindingHandle, Directive};
use crate::error::RenderError;
use crate::part::Part;
use crate::scheduler::RenderSession;
use crate::slot::{Slot, SlotHandle};
use crate::template::{
    node_at_path, Hole, HoleKind, HolePath, Template, TemplateKind, TreeTemplate,
};

pub(crate) struct TemplateBlock {
    pub(crate) nodes: Vec<Node>,
    pub(crate) slots: Vec<SlotHandle>,
    /// Detached container keeping not-yet-mounted content rooted, so
    /// child-node holes at the top level have a parent to insert into
    /// before the block itself mounts. Dropped at mount.
    staging: Option<Node>,
}

impl TemplateBlock {
    fn empty() -> TemplateBlock {
        TemplateBlock {
            nodes: Vec::new(),
            slots: Vec::new(),
            staging: None,
        }
    }

    /// Forward each bind to its slot, in hole order.
    fn reconcile(
        &mut self,
        binds: &[Bindable],
        session: &mut RenderSession,
    ) -> Result<(), RenderError> {
        debug_assert_eq!(binds.len(), self.slots.len());
        for (slot, bind) in self.slots.iter().zip(binds.iter()) {
            Slot::reconcile(slot, bind.clone(), session)?;
        }
        Ok(())
    }
}

impl Template {
    /// Build a fresh, detached block: cloned content plus unresolved
    /// slots. The caller connects the slots and mounts the nodes.
    fn instantiate(
        self: &Rc<Self>,
        binds: &[Bindable],
        part: &Part,
        session: &mut RenderSession,
    ) -> Result<TemplateBlock, RenderError> {
        let namespace = match part {
            Part::ChildNode { namespace, .. } => *namespace,
            _ => self.mode.namespace(),
        };
        match &self.kind {
            TemplateKind::Empty => Ok(TemplateBlock::empty()),
            TemplateKind::ChildValue => {
                let staging = Node::element("template", namespace);
                let marker = Node::comment("");
                staging.append_child(&marker);
                let child_part = Part::ChildNode {
                    node: marker.clone(),
                    anchor: None,
                    namespace,
                };
                let slot = Slot::resolve(binds[0].clone(), child_part, session)?;
                Ok(TemplateBlock {
                    nodes: vec![marker],
                    slots: vec![slot],
                    staging: Some(staging),
                })
            }
            TemplateKind::TextValue {
                preceding,
                following,
            } => {
                let node = Node::text("");
                let text_part = Part::Text {
                    node: node.clone(),
                    preceding: preceding.clone(),
                    following: following.clone(),
                };
                let slot = Slot::resolve(binds[0].clone(), text_part, session)?;
                Ok(TemplateBlock {
                    nodes: vec![node],
                    slots: vec![slot],
                    staging: None,
                })
            }
            TemplateKind::Tree(tree) => {
                let clone = tree.fragment.deep_clone();
                let mut slots = Vec::with_capacity(tree.holes.len());
                for hole in &tree.holes {
                    let node = node_at_path(&clone, &hole.path).ok_or_else(|| {
                        RenderError::parse(Some(hole.index), "hole path points outside content")
                    })?;
                    let hole_part = build_part(hole, node, namespace);
                    slots.push(Slot::resolve(
                        binds[hole.index].clone(),
                        hole_part,
                        session,
                    )?);
                }
                Ok(TemplateBlock {
                    nodes: clone.children(),
                    slots,
                    staging: Some(clone),
                })
            }
        }
    }

    /// Re-associate this template with live nodes: walk the pre-rendered
    /// tree in template order, adopting nodes and hydrating slots as they
    /// are reached.
    fn hydrate_block(
        self: &Rc<Self>,
        binds: &[Bindable],
        part: &Part,
        session: &mut RenderSession,
    ) -> Result<TemplateBlock, RenderError> {
        let namespace = match part {
            Part::ChildNode { namespace, .. } => *namespace,
            _ => self.mode.namespace(),
        };
        match &self.kind {
            TemplateKind::Empty => Ok(TemplateBlock::empty()),
            TemplateKind::ChildValue => {
                let marker = Node::comment("");
                let child_part = Part::ChildNode {
                    node: marker.clone(),
                    anchor: None,
                    namespace,
                };
                let slot = Slot::resolve(binds[0].clone(), child_part, session)?;
                Slot::hydrate(&slot, session)?;
                Ok(TemplateBlock {
                    nodes: vec![marker],
                    slots: vec![slot],
                    staging: None,
                })
            }
            TemplateKind::TextValue {
                preceding,
                following,
            } => {
                let live = session.walker()?.pop_node(NodeType::Text, None)?;
                let text_part = Part::Text {
                    node: live.clone(),
                    preceding: preceding.clone(),
                    following: following.clone(),
                };
                let slot = Slot::resolve(binds[0].clone(), text_part, session)?;
                Slot::hydrate(&slot, session)?;
                Ok(TemplateBlock {
                    nodes: vec![live],
                    slots: vec![slot],
                    staging: None,
                })
            }
            TemplateKind::Tree(tree) => {
                let mut hydrator = TreeHydrator {
                    holes: &tree.holes,
                    binds,
                    namespace,
                    slots: vec![None; tree.holes.len()],
                };
                let mut nodes = Vec::new();
                let mut path = HolePath::new();
                hydrator.children(&tree.fragment, &mut path, session, Some(&mut nodes))?;
                let slots = hydrator
                    .slots
                    .into_iter()
                    .map(|slot| slot.expect("every hole hydrated"))
                    .collect();
                Ok(TemplateBlock {
                    nodes,
                    slots,
                    staging: None,
                })
            }
        }
    }
}

struct TreeHydrator<'a> {
    holes: &'a [Hole],
    binds: &'a [Bindable],
    namespace: weft_dom::Namespace,
    slots: Vec<Option<SlotHandle>>,
}

impl<'a> TreeHydrator<'a> {
    fn pending_hole(&self, path: &HolePath) -> Option<&'a Hole> {
        let holes = self.holes;
        holes
            .iter()
            .find(|hole| self.slots[hole.index].is_none() && hole.path == *path)
    }

    fn hydrate_hole(
        &mut self,
        hole_index: usize,
        hole_part: Part,
        session: &mut RenderSession,
    ) -> Result<SlotHandle, RenderError> {
        let slot = Slot::resolve(self.binds[hole_index].clone(), hole_part, session)?;
        Slot::hydrate(&slot, session)?;
        self.slots[hole_index] = Some(slot.clone());
        Ok(slot)
    }

    fn children(
        &mut self,
        template_parent: &Node,
        path: &mut HolePath,
        session: &mut RenderSession,
        mut top_nodes: Option<&mut Vec<Node>>,
    ) -> Result<(), RenderError> {
        for (index, template_child) in template_parent.children().iter().enumerate() {
            let mut child_path = path.clone();
            child_path.push(index as u32);
            match template_child.node_type() {
                NodeType::Element => {
                    let tag = template_child.tag_name().unwrap_or_default();
                    let live = session
                        .walker()?
                        .pop_node(NodeType::Element, Some(&tag))?;
                    // attribute-level holes sit on the element's own path
                    while let Some(hole) = self.pending_hole(&child_path) {
                        if matches!(hole.kind, HoleKind::ChildNode | HoleKind::Text { .. }) {
                            break;
                        }
                        let hole_index = hole.index;
                        let hole_part = build_part(hole, live.clone(), self.namespace);
                        self.hydrate_hole(hole_index, hole_part, session)?;
                    }
                    path.push(index as u32);
                    self.children(template_child, path, session, None)?;
                    path.pop();
                    session.walker()?.exit_element()?;
                    if let Some(top) = top_nodes.as_deref_mut() {
                        top.push(live);
                    }
                }
                NodeType::Text => {
                    if let Some(hole) = self.pending_hole(&child_path) {
                        debug_assert!(matches!(hole.kind, HoleKind::Text { .. }));
                        let live = session.walker()?.pop_node(NodeType::Text, None)?;
                        let hole_index = hole.index;
                        let hole_part = build_part(hole, live.clone(), self.namespace);
                        self.hydrate_hole(hole_index, hole_part, session)?;
                        if let Some(top) = top_nodes.as_deref_mut() {
                            top.push(live);
                        }
                    } else {
                        let template_text = template_child.data().unwrap_or_default();
                        if template_text.trim().is_empty() {
                            // whitespace between tags is not significant
                            continue;
                        }
                        let live = session.walker()?.pop_node(NodeType::Text, None)?;
                        let live_text = live.data().unwrap_or_default();
                        if live_text.trim() != template_text.trim() {
                            return Err(RenderError::HydrationMismatch {
                                path: session.walker()?.path(),
                                expected: format!("text {:?}", template_text.trim()),
                                found: format!("text {:?}", live_text.trim()),
                            });
                        }
                        if let Some(top) = top_nodes.as_deref_mut() {
                            top.push(live);
                        }
                    }
                }
                NodeType::Comment => {
                    if let Some(hole) = self.pending_hole(&child_path) {
                        debug_assert!(matches!(hole.kind, HoleKind::ChildNode));
                        let marker = Node::comment("");
                        let hole_index = hole.index;
                        let hole_part = Part::ChildNode {
                            node: marker.clone(),
                            anchor: None,
                            namespace: self.namespace,
                        };
                        // the slot's binding walks its own content, then
                        // adopts or inserts the marker at the cursor
                        let slot = self.hydrate_hole(hole_index, hole_part, session)?;
                        if let Some(top) = top_nodes.as_deref_mut() {
                            top.extend(slot.borrow().content_nodes());
                            top.push(marker);
                        }
                    } else {
                        let live = session.walker()?.pop_node(NodeType::Comment, None)?;
                        if let Some(top) = top_nodes.as_deref_mut() {
                            top.push(live);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn build_part(hole: &Hole, node: Node, namespace: weft_dom::Namespace) -> Part {
    match &hole.kind {
        HoleKind::Attribute { name } => Part::Attribute {
            node,
            name: name.clone(),
        },
        HoleKind::Property { name } => {
            let default = node.property(name).unwrap_or(PropertyValue::Null);
            Part::Property {
                node,
                name: name.clone(),
                default,
            }
        }
        HoleKind::Live { name } => {
            let default = node.property(name).unwrap_or(PropertyValue::Null);
            Part::Live {
                node,
                name: name.clone(),
                default,
            }
        }
        HoleKind::Event { name } => Part::Event {
            node,
            name: name.clone(),
        },
        HoleKind::Element => Part::Element { node },
        HoleKind::ChildNode => Part::ChildNode {
            node,
            anchor: None,
            namespace,
        },
        HoleKind::Text {
            preceding,
            following,
        } => Part::Text {
            node,
            preceding: preceding.clone(),
            following: following.clone(),
        },
    }
}

/// The binding a template directive resolves: owns the block, mounts its
/// nodes before the part's marker at commit, and removes them on rollback.
pub(crate) struct TemplateBinding {
    template: Rc<Template>,
    value: Bindable,
    part: Part,
    block: Option<TemplateBlock>,
    mounted: bool,
}

impl TemplateBinding {
    pub(crate) fn new(template: Rc<Template>, value: Bindable, part: Part) -> BindingHandle {
        Rc::new(RefCell::new(TemplateBinding {
            template,
            value,
            part,
            block: None,
            mounted: false,
        }))
    }

    fn binds(&self) -> &[Bindable] {
        match &self.value {
            Bindable::List(binds) => binds,
            _ => &[],
        }
    }
}

impl Binding for TemplateBinding {
    fn directive(&self) -> Rc<dyn Directive> {
        self.template.clone()
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
        self.value = value;
        let binds: Vec<Bindable> = self.binds().to_vec();
        if let Some(block) = self.block.as_mut() {
            block.reconcile(&binds, session)?;
        }
        // child slots commit their own changes; the block itself only
        // needs a commit while unmounted, which connect already queued
        Ok(false)
    }

    fn connect(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        let block = self.template.instantiate(self.binds(), &self.part, session)?;
        for slot in &block.slots {
            Slot::connect(slot, session)?;
        }
        self.block = Some(block);
        Ok(true)
    }

    fn hydrate(&mut self, session: &mut RenderSession) -> Result<bool, RenderError> {
        let block = self
            .template
            .hydrate_block(self.binds(), &self.part, session)?;
        self.block = Some(block);
        self.mounted = true;
        // content walked; now take over the marker that bounds it
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
        if let Some(block) = &self.block {
            for slot in &block.slots {
                Slot::disconnect(slot, session);
            }
        }
    }

    fn commit(&mut self) {
        if !self.mounted {
            if let Some(block) = self.block.as_mut() {
                // staging may have grown content in front of top-level
                // markers; move everything it holds, in order
                let nodes = match block.staging.take() {
                    Some(staging) => staging.children(),
                    None => block.nodes.clone(),
                };
                for node in &nodes {
                    self.part.insert_content(node, None);
                }
                block.nodes = nodes;
            }
            self.mounted = true;
        }
    }

    fn rollback(&mut self) {
        if self.mounted {
            if let Some(block) = &self.block {
                for node in &block.nodes {
                    node.detach();
                }
            }
            self.mounted = false;
        }
    }

    fn content_nodes(&self) -> Vec<Node> {
        match &self.block {
            Some(block) => block.nodes.clone(),
            None => Vec::new(),
        }
    }
}
