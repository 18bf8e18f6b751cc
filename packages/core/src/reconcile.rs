//! Keyed two-pointer reconciliation.
//!
//! Compares an old and a new key sequence and drives a [`MutationHandler`]
//! through the minimal edit script: matching ends update in place, a
//! symmetric swap of the two ends costs exactly two moves, and the
//! unmatched middle is resolved through a key→index map where an item only
//! moves when it falls behind the highest old position already placed.
//! Unchanged prefixes and suffixes therefore never move, and the script
//! stays within one operation per position.

use std::hash::Hash;

use rustc_hash::FxHashMap;

/// Receives the edit script. `T` is the per-item state the caller threads
/// through (slots, nodes); `S` is the new item source.
pub trait MutationHandler<K, S, T> {
    /// A key seen for the first time; produce its item state.
    fn insert(&mut self, index: usize, key: &K, source: &S) -> T;

    /// A surviving key; refresh the item in place.
    fn update(&mut self, target: &mut T, source: &S, index: usize);

    /// A surviving key whose position changed; `index` is the final
    /// position in the new list.
    fn relocate(&mut self, target: &mut T, index: usize);

    /// A key absent from the new list.
    fn remove(&mut self, key: &K, target: T);
}

/// Reconcile `old_keys`/`old_targets` against `new_keys`/`new_sources`,
/// returning the new target states in new-list order.
pub fn reconcile<K, S, T, H>(
    old_keys: &[K],
    old_targets: Vec<T>,
    new_keys: &[K],
    new_sources: &[S],
    handler: &mut H,
) -> Vec<T>
where
    K: Eq + Hash + Clone,
    H: MutationHandler<K, S, T>,
{
    debug_assert_eq!(old_keys.len(), old_targets.len());
    debug_assert_eq!(new_keys.len(), new_sources.len());
    debug_assert_unique(old_keys);
    debug_assert_unique(new_keys);

    let mut old_slots: Vec<Option<T>> = old_targets.into_iter().map(Some).collect();
    let mut new_targets: Vec<Option<T>> = new_keys.iter().map(|_| None).collect();

    let mut old_head = 0;
    let mut old_end = old_keys.len();
    let mut new_head = 0;
    let mut new_end = new_keys.len();

    while old_head < old_end && new_head < new_end {
        if old_keys[old_head] == new_keys[new_head] {
            let mut target = old_slots[old_head].take().expect("head already taken");
            handler.update(&mut target, &new_sources[new_head], new_head);
            new_targets[new_head] = Some(target);
            old_head += 1;
            new_head += 1;
        } else if old_keys[old_end - 1] == new_keys[new_end - 1] {
            let mut target = old_slots[old_end - 1].take().expect("tail already taken");
            handler.update(&mut target, &new_sources[new_end - 1], new_end - 1);
            new_targets[new_end - 1] = Some(target);
            old_end -= 1;
            new_end -= 1;
        } else if old_keys[old_head] == new_keys[new_end - 1]
            && old_keys[old_end - 1] == new_keys[new_head]
        {
            // both ends traded places: two moves, no map needed
            let mut head_target = old_slots[old_head].take().expect("head already taken");
            handler.update(&mut head_target, &new_sources[new_end - 1], new_end - 1);
            handler.relocate(&mut head_target, new_end - 1);
            new_targets[new_end - 1] = Some(head_target);

            let mut tail_target = old_slots[old_end - 1].take().expect("tail already taken");
            handler.update(&mut tail_target, &new_sources[new_head], new_head);
            handler.relocate(&mut tail_target, new_head);
            new_targets[new_head] = Some(tail_target);

            old_head += 1;
            old_end -= 1;
            new_head += 1;
            new_end -= 1;
        } else {
            break;
        }
    }

    if new_head < new_end || old_head < old_end {
        let mut key_to_old_index: FxHashMap<&K, usize> = FxHashMap::default();
        for index in old_head..old_end {
            if old_slots[index].is_some() {
                key_to_old_index.insert(&old_keys[index], index);
            }
        }

        let mut last_placed: Option<usize> = None;
        for index in new_head..new_end {
            match key_to_old_index
                .get(&new_keys[index])
                .copied()
                .filter(|old_index| old_slots[*old_index].is_some())
            {
                Some(old_index) => {
                    let mut target = old_slots[old_index].take().expect("middle already taken");
                    handler.update(&mut target, &new_sources[index], index);
                    if last_placed.is_some_and(|placed| old_index < placed) {
                        handler.relocate(&mut target, index);
                    } else {
                        last_placed = Some(old_index);
                    }
                    new_targets[index] = Some(target);
                }
                None => {
                    new_targets[index] =
                        Some(handler.insert(index, &new_keys[index], &new_sources[index]));
                }
            }
        }

        for index in old_head..old_end {
            if let Some(target) = old_slots[index].take() {
                handler.remove(&old_keys[index], target);
            }
        }
    }

    new_targets
        .into_iter()
        .map(|t| t.expect("every new position filled"))
        .collect()
}

fn debug_assert_unique<K: Eq + Hash>(keys: &[K]) {
    if cfg!(debug_assertions) {
        let mut seen = rustc_hash::FxHashSet::default();
        for key in keys {
            debug_assert!(seen.insert(key), "keyed siblings must have unique keys");
        }
    }
}
