//! The literal preprocessor.
//!
//! A [`Bindable::Literal`] is spliced into the template source before cache
//! lookup, re-forming a new strings array. The expansion is memoised by
//! (source identity, literal positions, literal values) so repeated calls
//! with the same shape return the *same* owned strings array - which is
//! what keeps the template cache hitting.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::bindable::Bindable;
use crate::template::TemplateStrings;

#[derive(PartialEq, Eq, Hash)]
struct LiteralKey {
    source: (usize, usize),
    positions: Vec<usize>,
    values: Vec<Rc<str>>,
}

/// Memoisation table for literal expansion, owned by the render host.
#[derive(Default)]
pub struct LiteralTable {
    cache: RefCell<FxHashMap<LiteralKey, Rc<[String]>>>,
}

impl LiteralTable {
    pub fn new() -> LiteralTable {
        LiteralTable::default()
    }

    /// Splice literal binds into `strings`, returning the expanded strings
    /// and the surviving binds. Without literals this is a pass-through.
    pub fn expand(
        &self,
        strings: TemplateStrings,
        binds: Vec<Bindable>,
    ) -> (TemplateStrings, Vec<Bindable>) {
        let has_literals = binds.iter().any(|b| matches!(b, Bindable::Literal(_)));
        if !has_literals {
            return (strings, binds);
        }

        let mut positions = Vec::new();
        let mut values = Vec::new();
        let mut remaining = Vec::new();
        for (index, bind) in binds.into_iter().enumerate() {
            match bind {
                Bindable::Literal(text) => {
                    positions.push(index);
                    values.push(text);
                }
                other => remaining.push(other),
            }
        }

        let key = LiteralKey {
            source: address_of(&strings),
            positions,
            values,
        };

        let expanded = {
            let mut cache = self.cache.borrow_mut();
            match cache.get(&key) {
                Some(hit) => hit.clone(),
                None => {
                    let expanded: Rc<[String]> =
                        splice(&strings, &key.positions, &key.values).into();
                    cache.insert(key, expanded.clone());
                    expanded
                }
            }
        };
        (TemplateStrings::Owned(expanded), remaining)
    }
}

fn address_of(strings: &TemplateStrings) -> (usize, usize) {
    match strings {
        TemplateStrings::Static(s) => (s.as_ptr() as usize, s.len()),
        TemplateStrings::Owned(s) => (s.as_ptr() as usize, s.len()),
    }
}

fn splice(strings: &TemplateStrings, positions: &[usize], values: &[Rc<str>]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(strings.len() - positions.len());
    let mut current = strings.get(0).to_string();
    let mut literal_cursor = 0usize;
    for bind in 0..strings.len() - 1 {
        if positions.get(literal_cursor) == Some(&bind) {
            current.push_str(&values[literal_cursor]);
            current.push_str(strings.get(bind + 1));
            literal_cursor += 1;
        } else {
            out.push(std::mem::take(&mut current));
            current = strings.get(bind + 1).to_string();
        }
    }
    out.push(current);
    out
}
