//! The built-in primitives: one directive per part kind.
//!
//! Primitives are the default directives the render host picks from the
//! part type and, for `:`-prefixed attribute names, the keyword behind the
//! sigil. Each is a stateless singleton so directive identity stays stable
//! across renders - a strict slot re-resolving the same part kind always
//! sees the same directive.

mod attribute;
mod class;
mod event;
mod node;
mod property;
mod reference;
mod spread;
mod style;
mod text;

use std::rc::Rc;

use crate::bindable::Bindable;
use crate::binding::Directive;
use crate::error::RenderError;
use crate::part::Part;

use attribute::AttributeDirective;
use class::ClassDirective;
use event::EventDirective;
use node::NodeDirective;
use property::PropertyDirective;
use reference::RefDirective;
use spread::SpreadDirective;
use style::StyleDirective;
use text::TextDirective;

thread_local! {
    static ATTRIBUTE: Rc<AttributeDirective> = Rc::new(AttributeDirective);
    static PROPERTY: Rc<PropertyDirective> = Rc::new(PropertyDirective { live: false });
    static LIVE: Rc<PropertyDirective> = Rc::new(PropertyDirective { live: true });
    static EVENT: Rc<EventDirective> = Rc::new(EventDirective);
    static NODE: Rc<NodeDirective> = Rc::new(NodeDirective);
    static TEXT: Rc<TextDirective> = Rc::new(TextDirective);
    static SPREAD: Rc<SpreadDirective> = Rc::new(SpreadDirective);
    static CLASS: Rc<ClassDirective> = Rc::new(ClassDirective);
    static STYLE: Rc<StyleDirective> = Rc::new(StyleDirective);
    static REF: Rc<RefDirective> = Rc::new(RefDirective);
}

/// Pick the default directive for `part`. The `:` keyword space on
/// attribute parts maps to the class/style/ref primitives; anything else
/// under `:` is reserved and rejected.
pub(crate) fn resolve(_value: &Bindable, part: &Part) -> Result<Rc<dyn Directive>, RenderError> {
    Ok(match part {
        Part::Attribute { name, .. } => match name.strip_prefix(':') {
            Some("class") => CLASS.with(|d| d.clone()),
            Some("style") => STYLE.with(|d| d.clone()),
            Some("ref") => REF.with(|d| d.clone()),
            Some(keyword) => {
                return Err(RenderError::precondition(
                    "attribute",
                    format!("`:{keyword}` is not a recognized keyword attribute"),
                ))
            }
            None => ATTRIBUTE.with(|d| d.clone()),
        },
        Part::Property { .. } => PROPERTY.with(|d| d.clone()),
        Part::Live { .. } => LIVE.with(|d| d.clone()),
        Part::Event { .. } => EVENT.with(|d| d.clone()),
        Part::Element { .. } => SPREAD.with(|d| d.clone()),
        Part::ChildNode { .. } => NODE.with(|d| d.clone()),
        Part::Text { .. } => TEXT.with(|d| d.clone()),
    })
}
