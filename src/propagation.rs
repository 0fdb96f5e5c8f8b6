//! Template propagation across a batch of filters
//!
//! Each primary template (`{(M3TAP key) ...}`) is copied over every follower
//! (`{(M3TA key) ...}`) with the same key in the other filters of the batch.
//!
//! # Algorithm:
//! 1. Discovery: find the primary each filter defines; two filters defining the
//!    same key is a collision
//! 2. Resolution: substitute primaries into each other so that a primary which
//!    contains followers carries their current content
//! 3. Rewrite: replace the followers in copies of every filter
//! 4. Validation: every key referenced anywhere must have a primary
//!
//! The caller's trees are only replaced once all four steps succeed, so an
//! error never leaves a batch half rewritten.

use std::collections::BTreeMap;
use std::fmt::Display;

use tracing::{debug, info};

use crate::element::{Delimiters, ElementContent, FilterElement};
use crate::error::{TemplateError, UpdateError};
use crate::meta_key::{MetaKey, MetaKeySet};
use crate::template::{
    find_all_meta_group_keys, find_template_group_key, locate_primary_template, META_LABEL,
    META_PRIMARY_LABEL,
};

/// Replace followers of `primary_group` inside `tree` with a copy of it
///
/// Matching followers take the copy's content with their own surrounding
/// whitespace, and the copy's marker is rewritten to `M3TA`. Returns whether
/// anything changed.
///
/// # Panics
/// Panics if `primary_group` is not a valid primary template group.
pub fn replace_meta_groups(
    tree: &mut FilterElement,
    primary_group: &FilterElement,
) -> Result<bool, TemplateError> {
    let key = match find_template_group_key(primary_group, true) {
        Ok(Some(key)) => key,
        other => panic!(
            "replace_meta_groups called with non-primary group '{}': {:?}",
            primary_group, other
        ),
    };
    let replacement = normalized_primary(primary_group);
    replace_followers(tree, &key, &replacement)
}

/// Copy of a primary group usable as follower content: markers demoted to
/// `M3TA`, surrounding whitespace cleared
fn normalized_primary(primary_group: &FilterElement) -> FilterElement {
    let mut copy = primary_group.clone();
    demote_markers(&mut copy);
    copy.leading_ws.clear();
    copy.trailing_ws.clear();
    copy
}

fn demote_markers(elem: &mut FilterElement) {
    let delimiters = elem.delimiters;
    match &mut elem.content {
        ElementContent::Text(text) => match delimiters {
            Delimiters::None if text == META_PRIMARY_LABEL => {
                *text = META_LABEL.to_string();
            }
            Delimiters::Quotes => {
                let demoted: String = text
                    .split_inclusive(|c: char| c.is_ascii_whitespace())
                    .map(|word| {
                        let bare = word.trim_end_matches(|c: char| c.is_ascii_whitespace());
                        if bare == META_PRIMARY_LABEL {
                            format!("{}{}", META_LABEL, &word[bare.len()..])
                        } else {
                            word.to_string()
                        }
                    })
                    .collect();
                *text = demoted;
            }
            _ => {}
        },
        ElementContent::Group(children) => {
            for child in children {
                demote_markers(child);
            }
        }
    }
}

fn replace_followers(
    tree: &mut FilterElement,
    key: &MetaKey,
    replacement: &FilterElement,
) -> Result<bool, TemplateError> {
    let children = match tree.children_mut() {
        Some(children) => children,
        None => return Ok(false),
    };

    let mut changed = false;
    for child in children.iter_mut() {
        if find_template_group_key(child, false)?.as_ref() == Some(key) {
            let mut copy = replacement.clone();
            copy.leading_ws = std::mem::take(&mut child.leading_ws);
            copy.trailing_ws = std::mem::take(&mut child.trailing_ws);
            if copy != *child {
                changed = true;
            }
            *child = copy;
        } else if replace_followers(child, key, replacement)? {
            changed = true;
        }
    }
    Ok(changed)
}

/// A primary template and the filter that defines it
struct PrimaryDefinition<'a, I> {
    owner: &'a I,
    group: &'a FilterElement,
}

/// Substitutes primaries into each other, memoized per key
struct PrimaryResolver<'p, 'a, I> {
    primaries: &'p BTreeMap<MetaKey, PrimaryDefinition<'a, I>>,
    resolved: BTreeMap<MetaKey, FilterElement>,
    visiting: Vec<MetaKey>,
}

impl<'p, 'a, I> PrimaryResolver<'p, 'a, I> {
    fn new(primaries: &'p BTreeMap<MetaKey, PrimaryDefinition<'a, I>>) -> Self {
        Self {
            primaries,
            resolved: BTreeMap::new(),
            visiting: Vec::new(),
        }
    }

    /// Follower-ready content of the primary for `key`
    fn resolve(&mut self, key: &MetaKey) -> Result<FilterElement, TemplateError> {
        if let Some(done) = self.resolved.get(key) {
            return Ok(done.clone());
        }
        if let Some(pos) = self.visiting.iter().position(|k| k == key) {
            return Err(TemplateError::CyclicTemplates {
                keys: self.visiting[pos..].to_vec(),
            });
        }
        let primaries = self.primaries;
        let definition = match primaries.get(key) {
            Some(definition) => definition,
            None => panic!("resolving key {} with no primary definition", key),
        };

        self.visiting.push(key.clone());
        let mut group = definition.group.clone();
        let mut nested = MetaKeySet::new();
        outermost_follower_keys(&group, &mut nested)?;
        for nested_key in &nested {
            if nested_key == key {
                // Kept verbatim as part of the primary's own content
                continue;
            }
            if !primaries.contains_key(nested_key) {
                // Reported as undefined during validation
                continue;
            }
            let replacement = self.resolve(nested_key)?;
            replace_followers(&mut group, nested_key, &replacement)?;
        }
        self.visiting.pop();

        let normalized = normalized_primary(&group);
        self.resolved.insert(key.clone(), normalized.clone());
        Ok(normalized)
    }
}

/// Keys of follower templates below `elem` that are not inside another follower
fn outermost_follower_keys(elem: &FilterElement, keys: &mut MetaKeySet) -> Result<(), TemplateError> {
    if let Some(children) = elem.children() {
        for child in children {
            match find_template_group_key(child, false)? {
                Some(key) => keys.add(key),
                None => outermost_follower_keys(child, keys)?,
            }
        }
    }
    Ok(())
}

/// Compute the rewritten trees for a batch without touching it
///
/// Returns the id and new tree of every filter whose criteria changes, in id
/// order. Filters that need no change are left out.
pub fn plan_meta_group_updates<I>(
    trees: &BTreeMap<I, FilterElement>,
) -> Result<Vec<(I, FilterElement)>, UpdateError>
where
    I: Ord + Clone + Display,
{
    // Discovery
    let mut primaries: BTreeMap<MetaKey, PrimaryDefinition<'_, I>> = BTreeMap::new();
    for (id, tree) in trees {
        let (key, group) = match locate_primary_template(tree)? {
            Some(found) => found,
            None => continue,
        };
        if let Some(existing) = primaries.get(&key) {
            return Err(TemplateError::PrimaryKeyCollision {
                key,
                first_id: existing.owner.to_string(),
                second_id: id.to_string(),
            });
        }
        debug!("Filter {} defines primary template {}", id, key);
        primaries.insert(key, PrimaryDefinition { owner: id, group });
    }

    // Resolution
    let mut resolver = PrimaryResolver::new(&primaries);
    let mut replacements: Vec<(&MetaKey, &I, FilterElement)> = Vec::new();
    for (key, definition) in &primaries {
        let replacement = resolver.resolve(key)?;
        replacements.push((key, definition.owner, replacement));
    }

    // Rewrite, on copies
    let mut rewritten: BTreeMap<&I, FilterElement> = BTreeMap::new();
    for (id, tree) in trees {
        let mut copy = tree.clone();
        for (key, owner, replacement) in &replacements {
            // A filter never receives its own primary
            if *owner == id {
                continue;
            }
            if replace_followers(&mut copy, key, replacement)? {
                debug!("Filter {}: replaced followers of {}", id, key);
            }
        }
        rewritten.insert(id, copy);
    }

    // Validation
    let mut referenced = MetaKeySet::new();
    for tree in rewritten.values() {
        referenced.update(&find_all_meta_group_keys(tree)?);
    }
    let defined: MetaKeySet = primaries.keys().cloned().collect();
    let undefined = referenced.difference(&defined);
    if !undefined.is_empty() {
        return Err(TemplateError::UndefinedKeys {
            keys: undefined.to_vec(),
        });
    }

    let changes: Vec<(I, FilterElement)> = rewritten
        .into_iter()
        .filter(|(id, tree)| trees.get(*id) != Some(tree))
        .map(|(id, tree)| (id.clone(), tree))
        .collect();

    info!(
        "Template update planned: {} primaries, {} of {} filters changed",
        primaries.len(),
        changes.len(),
        trees.len()
    );
    Ok(changes)
}

/// Propagate every primary template in the batch to its followers
///
/// On error no tree in `trees` is modified.
pub fn update_meta_groups<I>(trees: &mut BTreeMap<I, FilterElement>) -> Result<(), UpdateError>
where
    I: Ord + Clone + Display,
{
    let changes = plan_meta_group_updates(trees)?;
    for (id, tree) in changes {
        trees.insert(id, tree);
    }
    Ok(())
}
