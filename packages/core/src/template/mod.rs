//! Template compilation and caching.
//!
//! A template is compiled once per source identity: the literal strings are
//! joined with indexed placeholder tokens, parsed as markup, and the
//! resulting tree is walked to extract *holes* - typed positions (by part
//! kind and child path) where bind values attach. Instantiation deep-clones
//! the compiled content and resolves one slot per hole, in hole order.
//!
//! Two degenerate shapes skip tree construction entirely: a lone bind
//! wrapped in nothing (or a comment) becomes a child-value template, and a
//! lone bind wrapped in tag-free text becomes a text-value template.

mod block;
mod literal;

pub(crate) use block::TemplateBinding;
pub use literal::LiteralTable;

use std::rc::Rc;

use smallvec::SmallVec;
use weft_dom::{Namespace, Node, NodeType};

use crate::bindable::Bindable;
use crate::binding::{BindingHandle, Directive};
use crate::error::RenderError;
use crate::part::Part;

/// Template mode: the namespace markup is interpreted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateMode {
    Html,
    Svg,
    MathMl,
}

impl TemplateMode {
    pub(crate) fn namespace(self) -> Namespace {
        match self {
            TemplateMode::Html => Namespace::Html,
            TemplateMode::Svg => Namespace::Svg,
            TemplateMode::MathMl => Namespace::MathMl,
        }
    }
}

/// The literal strings of a tagged template. Identity (address + length)
/// keys the template cache: `Static` slices come from promoted literals
/// with a stable address, `Owned` arrays come out of the literal
/// preprocessor which memoises them for the same reason.
#[derive(Clone)]
pub enum TemplateStrings {
    Static(&'static [&'static str]),
    Owned(Rc<[String]>),
}

/// Cache key for a compiled template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateIdentity {
    addr: usize,
    len: usize,
    mode: TemplateMode,
}

impl TemplateStrings {
    pub fn len(&self) -> usize {
        match self {
            TemplateStrings::Static(s) => s.len(),
            TemplateStrings::Owned(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> &str {
        match self {
            TemplateStrings::Static(s) => s[index],
            TemplateStrings::Owned(s) => &s[index],
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        (0..self.len()).map(move |i| self.get(i))
    }

    pub fn identity(&self, mode: TemplateMode) -> TemplateIdentity {
        match self {
            TemplateStrings::Static(s) => TemplateIdentity {
                addr: s.as_ptr() as usize,
                len: s.len(),
                mode,
            },
            TemplateStrings::Owned(s) => TemplateIdentity {
                addr: s.as_ptr() as usize,
                len: s.len(),
                mode,
            },
        }
    }
}

impl From<&'static [&'static str]> for TemplateStrings {
    fn from(strings: &'static [&'static str]) -> Self {
        TemplateStrings::Static(strings)
    }
}

impl<const N: usize> From<&'static [&'static str; N]> for TemplateStrings {
    fn from(strings: &'static [&'static str; N]) -> Self {
        TemplateStrings::Static(strings)
    }
}

/// Build an HTML template value against `host`'s cache; the usual entry is
/// [`crate::RenderContext::html`], this free form serves root values.
pub fn html(
    host: &dyn crate::host::RenderHost,
    strings: impl Into<TemplateStrings>,
    binds: Vec<Bindable>,
) -> Result<Bindable, RenderError> {
    build(host, TemplateMode::Html, strings.into(), binds)
}

/// Build an SVG template value against `host`'s cache.
pub fn svg(
    host: &dyn crate::host::RenderHost,
    strings: impl Into<TemplateStrings>,
    binds: Vec<Bindable>,
) -> Result<Bindable, RenderError> {
    build(host, TemplateMode::Svg, strings.into(), binds)
}

/// Build a MathML template value against `host`'s cache.
pub fn mathml(
    host: &dyn crate::host::RenderHost,
    strings: impl Into<TemplateStrings>,
    binds: Vec<Bindable>,
) -> Result<Bindable, RenderError> {
    build(host, TemplateMode::MathMl, strings.into(), binds)
}

pub(crate) fn build(
    host: &dyn crate::host::RenderHost,
    mode: TemplateMode,
    strings: TemplateStrings,
    binds: Vec<Bindable>,
) -> Result<Bindable, RenderError> {
    let (strings, binds) = host.literals().expand(strings, binds);
    let template = host.parse_template(&strings, mode)?;
    if template.arity() != binds.len() {
        return Err(RenderError::parse(
            Some(binds.len().min(template.arity())),
            format!(
                "template has {} holes but received {} binds",
                template.arity(),
                binds.len()
            ),
        ));
    }
    Ok(Bindable::directive(template, Bindable::list(binds)))
}

pub(crate) type HolePath = SmallVec<[u32; 4]>;

/// Where and how one bind value attaches inside the compiled content.
pub(crate) struct Hole {
    pub(crate) index: usize,
    pub(crate) path: HolePath,
    pub(crate) kind: HoleKind,
}

pub(crate) enum HoleKind {
    Attribute { name: Rc<str> },
    Property { name: Rc<str> },
    Live { name: Rc<str> },
    Event { name: Rc<str> },
    Element,
    ChildNode,
    Text { preceding: Rc<str>, following: Rc<str> },
}

pub(crate) struct TreeTemplate {
    /// Container element whose children are the cloneable content.
    pub(crate) fragment: Node,
    pub(crate) holes: Vec<Hole>,
}

pub(crate) enum TemplateKind {
    /// Whitespace only, no binds.
    Empty,
    /// A single bind wrapped in trivial markup: rendered as child content.
    ChildValue,
    /// A single bind wrapped in plain text: rendered as one text node.
    TextValue { preceding: Rc<str>, following: Rc<str> },
    Tree(TreeTemplate),
}

/// A compiled, cached template. Implements [`Directive`]: the value it
/// resolves is the bind vector.
pub struct Template {
    pub(crate) mode: TemplateMode,
    pub(crate) kind: TemplateKind,
}

impl Template {
    /// Number of bind values this template expects.
    pub fn arity(&self) -> usize {
        match &self.kind {
            TemplateKind::Empty => 0,
            TemplateKind::ChildValue | TemplateKind::TextValue { .. } => 1,
            TemplateKind::Tree(tree) => tree.holes.len(),
        }
    }

    /// Compile `strings` under `mode`. Callers cache the result by
    /// [`TemplateStrings::identity`].
    pub fn parse(strings: &TemplateStrings, mode: TemplateMode) -> Result<Template, RenderError> {
        let binds = strings.len().saturating_sub(1);

        if let Some(kind) = recognize_degenerate(strings, binds) {
            return Ok(Template { mode, kind });
        }

        let placeholder = Placeholder::choose(strings);
        let markup = assemble_markup(strings, binds, &placeholder);

        let roots = weft_dom::parse_fragment(&markup, mode.namespace())
            .map_err(|e| RenderError::parse(None, e.to_string()))?;

        // compilation restructures the detached tree; none of it is an
        // observable mutation
        let (fragment, mut holes) = weft_dom::record::suspended(|| {
            let fragment = Node::element("template", mode.namespace());
            for root in &roots {
                fragment.append_child(root);
            }
            let mut holes = Vec::new();
            extract_holes(&fragment, &mut HolePath::new(), &placeholder, &mut holes)
                .map(|_| (fragment, holes))
        })?;
        holes.sort_by_key(|hole| hole.index);

        // every bind must have landed in exactly one usable position
        for (expected, hole) in holes.iter().enumerate() {
            if hole.index != expected {
                return Err(RenderError::parse(
                    Some(expected),
                    "bind is not in a bindable position",
                ));
            }
        }
        if holes.len() != binds {
            return Err(RenderError::parse(
                Some(holes.len().min(binds)),
                "bind is not in a bindable position",
            ));
        }

        Ok(Template {
            mode,
            kind: TemplateKind::Tree(TreeTemplate { fragment, holes }),
        })
    }
}

impl Directive for Template {
    fn name(&self) -> &str {
        "template"
    }

    fn ensure_value(&self, value: &Bindable, _part: &Part) -> Result<(), RenderError> {
        match value {
            Bindable::List(binds) if binds.len() == self.arity() => Ok(()),
            Bindable::List(binds) => Err(RenderError::precondition(
                "template",
                format!("expected {} binds, got {}", self.arity(), binds.len()),
            )),
            other => Err(RenderError::precondition(
                "template",
                format!("expected a bind list, got {}", other.type_name()),
            )),
        }
    }

    fn resolve_binding(
        self: Rc<Self>,
        value: Bindable,
        part: Part,
    ) -> Result<BindingHandle, RenderError> {
        Ok(TemplateBinding::new(self, value, part))
    }
}

/// Check the pre-parse shapes: no binds and whitespace-only strings, or a
/// single bind wrapped in trivial markup or plain text.
fn recognize_degenerate(strings: &TemplateStrings, binds: usize) -> Option<TemplateKind> {
    if binds == 0 && strings.iter().all(|s| s.trim().is_empty()) {
        return Some(TemplateKind::Empty);
    }
    if binds == 1 {
        let before = strings.get(0).trim();
        let after = strings.get(1).trim();
        if (before.is_empty() && after.is_empty()) || (before == "<!--" && after == "-->") {
            return Some(TemplateKind::ChildValue);
        }
        let tag_free = |s: &str| !s.contains('<') && !s.contains('>');
        if tag_free(before) && tag_free(after) && !(before.is_empty() && after.is_empty()) {
            return Some(TemplateKind::TextValue {
                preceding: before.into(),
                following: after.into(),
            });
        }
    }
    None
}

/// Indexed placeholder tokens: `{{w0:3}}` is bind 3 under salt 0. The salt
/// grows until the prefix collides with nothing in the source.
struct Placeholder {
    prefix: String,
}

impl Placeholder {
    fn choose(strings: &TemplateStrings) -> Placeholder {
        let mut salt = 0usize;
        loop {
            let prefix = format!("{{{{w{salt}:");
            if strings.iter().all(|s| !s.contains(&prefix)) {
                return Placeholder { prefix };
            }
            salt += 1;
        }
    }

    fn token(&self, index: usize) -> String {
        format!("{}{}}}}}", self.prefix, index)
    }

    fn contains(&self, text: &str) -> bool {
        text.contains(&self.prefix)
    }

    /// `Some(index)` when `text` (modulo surrounding whitespace) is exactly
    /// one placeholder token.
    fn exact(&self, text: &str) -> Option<usize> {
        let trimmed = text.trim();
        let inner = trimmed.strip_prefix(&self.prefix)?.strip_suffix("}}")?;
        inner.parse().ok()
    }

    /// Split text into literal and bind segments.
    fn split(&self, text: &str) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut rest = text;
        while let Some(start) = rest.find(&self.prefix) {
            let (literal, tail) = rest.split_at(start);
            segments.push(Segment::Literal(literal.to_string()));
            let after_prefix = &tail[self.prefix.len()..];
            match after_prefix.find("}}") {
                Some(end) => {
                    let index: usize = match after_prefix[..end].parse() {
                        Ok(index) => index,
                        Err(_) => {
                            // not one of ours; treat as literal text
                            segments.push(Segment::Literal(tail[..self.prefix.len()].to_string()));
                            rest = after_prefix;
                            continue;
                        }
                    };
                    segments.push(Segment::Bind(index));
                    rest = &after_prefix[end + 2..];
                }
                None => {
                    segments.push(Segment::Literal(tail.to_string()));
                    rest = "";
                }
            }
        }
        if !rest.is_empty() {
            segments.push(Segment::Literal(rest.to_string()));
        }
        segments
    }
}

enum Segment {
    Literal(String),
    Bind(usize),
}

const SPREAD_PREFIX: &str = "w-spread-";
const EVENT_PREFIX: &str = "w-on-";
const PROPERTY_PREFIX: &str = "w-prop-";
const LIVE_PREFIX: &str = "w-live-";
const KEYWORD_PREFIX: &str = "w-key-";

/// Markup-cursor state: whether we sit inside an open tag, and inside
/// which kind of quote if any.
#[derive(Clone, Copy, Default)]
struct TagState {
    inside: bool,
    quote: Option<char>,
}

impl TagState {
    fn advance(&mut self, c: char) {
        match (self.inside, self.quote) {
            (false, _) => {
                if c == '<' {
                    self.inside = true;
                }
            }
            (true, Some(quote)) => {
                if c == quote {
                    self.quote = None;
                }
            }
            (true, None) => match c {
                '"' | '\'' => self.quote = Some(c),
                '>' => self.inside = false,
                _ => {}
            },
        }
    }
}

fn scan_state(markup: &str) -> TagState {
    let mut state = TagState::default();
    for c in markup.chars() {
        state.advance(c);
    }
    state
}

/// Join the strings with placeholders, normalizing positions the markup
/// parser cannot represent: a placeholder in unquoted attribute-value
/// position is quoted, a placeholder in attribute-name position becomes a
/// spread marker attribute, and sigil-led attribute names (`@`, `.`, `$`,
/// `:`) are rewritten to parser-safe `w-…-` prefixes that hole
/// classification decodes again.
fn assemble_markup(strings: &TemplateStrings, binds: usize, placeholder: &Placeholder) -> String {
    let mut markup = String::new();
    for (i, chunk) in strings.iter().enumerate() {
        let encoded = encode_sigils(chunk, scan_state(&markup));
        markup.push_str(&encoded);
        if i >= binds {
            continue;
        }
        let state = scan_state(&markup);
        if !state.inside {
            markup.push_str(&placeholder.token(i));
        } else if state.quote.is_some() {
            // inside an author-quoted value
            markup.push_str(&placeholder.token(i));
        } else {
            let tail = markup.trim_end_matches(char::is_whitespace);
            if tail.ends_with('=') {
                // unquoted value position: quote the token ourselves
                markup.push('"');
                markup.push_str(&placeholder.token(i));
                markup.push('"');
            } else {
                // name position: the whole attribute list binds here
                markup.push_str(SPREAD_PREFIX);
                markup.push_str(&i.to_string());
            }
        }
    }
    markup
}

/// Rewrite sigil-led attribute names in `chunk` into parser-safe names.
/// Only name positions inside a tag are touched, so sigil-looking text
/// content and quoted values pass through untouched.
fn encode_sigils(chunk: &str, mut state: TagState) -> String {
    let mut out = String::with_capacity(chunk.len());
    let mut at_name_start = false;
    for c in chunk.chars() {
        let name_position = state.inside && state.quote.is_none() && at_name_start;
        match c {
            '@' | '.' | '$' | ':' if name_position => {
                out.push_str(match c {
                    '@' => EVENT_PREFIX,
                    '.' => PROPERTY_PREFIX,
                    '$' => LIVE_PREFIX,
                    _ => KEYWORD_PREFIX,
                });
                at_name_start = false;
                // the sigil is consumed; the state machine never sees it
                continue;
            }
            c if c.is_whitespace() => {
                at_name_start = state.inside && state.quote.is_none();
            }
            _ => {
                at_name_start = false;
            }
        }
        state.advance(c);
        out.push(c);
    }
    out
}

/// Walk the parsed tree, replacing placeholder positions with hole records
/// and marker nodes. Children are processed by index because text splits
/// mutate the child list in place.
fn extract_holes(
    parent: &Node,
    path: &mut HolePath,
    placeholder: &Placeholder,
    holes: &mut Vec<Hole>,
) -> Result<(), RenderError> {
    let mut index = 0usize;
    while let Some(child) = parent.child(index) {
        match child.node_type() {
            NodeType::Element => {
                let tag = child.tag_name().unwrap_or_default();
                if placeholder.contains(&tag) {
                    return Err(RenderError::parse(
                        placeholder.exact(&tag),
                        "a bind cannot appear in a tag name",
                    ));
                }
                extract_attribute_holes(&child, path, index as u32, placeholder, holes)?;
                path.push(index as u32);
                extract_holes(&child, path, placeholder, holes)?;
                path.pop();
                index += 1;
            }
            NodeType::Comment => {
                let data = child.data().unwrap_or_default();
                if let Some(bind) = placeholder.exact(&data) {
                    // the comment itself becomes the marker
                    child.set_data("");
                    holes.push(Hole {
                        index: bind,
                        path: child_path(path, index as u32),
                        kind: HoleKind::ChildNode,
                    });
                } else if placeholder.contains(&data) {
                    return Err(RenderError::parse(
                        None,
                        "a bind inside a comment must be the entire comment",
                    ));
                }
                index += 1;
            }
            NodeType::Text => {
                let data = child.data().unwrap_or_default();
                if !placeholder.contains(&data) {
                    index += 1;
                    continue;
                }
                let segments = placeholder.split(&data);
                let binds: Vec<usize> = segments
                    .iter()
                    .filter_map(|s| match s {
                        Segment::Bind(i) => Some(*i),
                        Segment::Literal(_) => None,
                    })
                    .collect();
                let literals_blank = segments.iter().all(|s| match s {
                    Segment::Literal(text) => text.trim().is_empty(),
                    Segment::Bind(_) => true,
                });

                if binds.len() == 1 && literals_blank {
                    // sole child-value: swap the text node for a marker
                    let marker = Node::comment("");
                    parent.replace_child(&child, &marker);
                    holes.push(Hole {
                        index: binds[0],
                        path: child_path(path, index as u32),
                        kind: HoleKind::ChildNode,
                    });
                    index += 1;
                } else {
                    // one empty text node per bind; literal between bind j
                    // and j+1 becomes bind j+1's preceding text
                    let mut pending_literal = String::new();
                    let mut emitted = 0u32;
                    let mut pending_hole: Option<(usize, String)> = None;
                    for segment in segments {
                        match segment {
                            Segment::Literal(text) => pending_literal.push_str(&text),
                            Segment::Bind(bind) => {
                                if let Some((prev_bind, preceding)) = pending_hole.take() {
                                    holes.push(Hole {
                                        index: prev_bind,
                                        path: child_path(path, index as u32 + emitted),
                                        kind: HoleKind::Text {
                                            preceding: preceding.into(),
                                            following: "".into(),
                                        },
                                    });
                                    let text_node = Node::text("");
                                    parent.insert_before(&text_node, Some(&child));
                                    emitted += 1;
                                }
                                pending_hole = Some((bind, std::mem::take(&mut pending_literal)));
                            }
                        }
                    }
                    if let Some((bind, preceding)) = pending_hole {
                        holes.push(Hole {
                            index: bind,
                            path: child_path(path, index as u32 + emitted),
                            kind: HoleKind::Text {
                                preceding: preceding.into(),
                                following: pending_literal.into(),
                            },
                        });
                        let text_node = Node::text("");
                        parent.insert_before(&text_node, Some(&child));
                        emitted += 1;
                    }
                    parent.remove_child(&child);
                    index += emitted as usize;
                }
            }
        }
    }
    Ok(())
}

fn extract_attribute_holes(
    element: &Node,
    path: &HolePath,
    element_index: u32,
    placeholder: &Placeholder,
    holes: &mut Vec<Hole>,
) -> Result<(), RenderError> {
    let element_path = child_path(path, element_index);
    for name in element.attribute_names() {
        if let Some(bind) = name
            .strip_prefix(SPREAD_PREFIX)
            .and_then(|index| index.parse().ok())
        {
            element.remove_attribute(&name);
            holes.push(Hole {
                index: bind,
                path: element_path.clone(),
                kind: HoleKind::Element,
            });
            continue;
        }
        let value = element.attribute(&name).unwrap_or_default();
        if let Some(bind) = placeholder.exact(&value) {
            element.remove_attribute(&name);
            holes.push(Hole {
                index: bind,
                path: element_path.clone(),
                kind: classify_attribute(&name),
            });
        } else if placeholder.contains(&value) {
            let bind = placeholder
                .split(&value)
                .iter()
                .find_map(|s| match s {
                    Segment::Bind(i) => Some(*i),
                    Segment::Literal(_) => None,
                });
            return Err(RenderError::parse(
                bind,
                format!("a bind must be the entire value of attribute `{name}`"),
            ));
        }
    }
    Ok(())
}

/// The attribute name's sigil (encoded by [`encode_sigils`]) reclassifies
/// the hole: `@` events, `.` properties, `$` live properties; `:` keywords
/// stay attribute holes and are mapped to class/style/ref primitives at
/// resolution time.
fn classify_attribute(name: &str) -> HoleKind {
    if let Some(rest) = name.strip_prefix(EVENT_PREFIX) {
        HoleKind::Event { name: rest.into() }
    } else if let Some(rest) = name.strip_prefix(PROPERTY_PREFIX) {
        HoleKind::Property { name: rest.into() }
    } else if let Some(rest) = name.strip_prefix(LIVE_PREFIX) {
        HoleKind::Live { name: rest.into() }
    } else if let Some(rest) = name.strip_prefix(KEYWORD_PREFIX) {
        HoleKind::Attribute {
            name: format!(":{rest}").into(),
        }
    } else {
        HoleKind::Attribute { name: name.into() }
    }
}

fn child_path(path: &HolePath, index: u32) -> HolePath {
    let mut child = path.clone();
    child.push(index);
    child
}

/// Locate the node a hole path points at inside a cloned fragment.
pub(crate) fn node_at_path(fragment: &Node, path: &HolePath) -> Option<Node> {
    let mut node = fragment.clone();
    for &index in path.iter() {
        node = node.child(index as usize)?;
    }
    Some(node)
}
