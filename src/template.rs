//! Template and meta group locators
//!
//! A *meta group* is a parenthesized group or quoted string carrying a marker
//! word and one or more labels, e.g. `(M3TA work urgent)` or `"M3TAP news"`.
//! A *template group* is a brace group whose direct children include exactly
//! one meta group, e.g. `{(M3TA news) from:a@b.com from:c@d.com}`.
//!
//! Templates marked `M3TAP` are primaries: the canonical definition of the
//! criteria for their key. Templates marked `M3TA` are followers and receive
//! the primary's content during propagation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::element::{Delimiters, FilterElement};
use crate::error::TemplateError;
use crate::meta_key::{MetaKey, MetaKeySet};

/// Marker of a follower template
pub const META_LABEL: &str = "M3TA";
/// Marker of a primary template
pub const META_PRIMARY_LABEL: &str = "M3TAP";

static META_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^{}P?$", META_LABEL)).expect("meta marker pattern is valid")
});

fn is_marker(token: &str, primary_only: bool) -> bool {
    if primary_only {
        token == META_PRIMARY_LABEL
    } else {
        META_MARKER.is_match(token)
    }
}

/// Key of a meta group such as `(M3TA x y)` or `"M3TA x y"`
///
/// Returns `Ok(None)` when `elem` is not a meta group. With `primary_only`,
/// only the `M3TAP` marker counts.
pub fn find_meta_group_key(
    elem: &FilterElement,
    primary_only: bool,
) -> Result<Option<MetaKey>, TemplateError> {
    let tokens: Vec<String> = match (elem.children(), elem.delimiters) {
        (Some(children), Delimiters::Parens) => children
            .iter()
            .map(|child| child.render().trim().to_string())
            .collect(),
        (None, Delimiters::Quotes) => elem
            .text_content()
            .unwrap_or_default()
            .split_ascii_whitespace()
            .map(str::to_string)
            .collect(),
        // Not a group that can hold a marker
        _ => return Ok(None),
    };

    let token_count = tokens.len();
    let labels: Vec<String> = tokens
        .into_iter()
        .filter(|token| !is_marker(token, primary_only))
        .collect();

    if labels.len() == token_count {
        return Ok(None);
    }
    if labels.is_empty() {
        return Err(TemplateError::EmptyMetaGroup {
            group: elem.render().trim().to_string(),
        });
    }
    Ok(Some(MetaKey::new(labels)))
}

/// Key of a template group `{(M3TA ...) ...}`
///
/// Returns `Ok(None)` when `elem` is not a brace group or holds no meta group.
pub fn find_template_group_key(
    elem: &FilterElement,
    primary_only: bool,
) -> Result<Option<MetaKey>, TemplateError> {
    let children = match elem.children() {
        Some(children) if elem.delimiters == Delimiters::Braces => children,
        _ => return Ok(None),
    };

    let mut found: Option<MetaKey> = None;
    for child in children {
        if let Some(key) = find_meta_group_key(child, primary_only)? {
            if found.is_some() {
                return Err(TemplateError::MultipleSiblingKeys {
                    group: elem.render().trim().to_string(),
                });
            }
            found = Some(key);
        }
    }
    Ok(found)
}

/// The primary template a filter defines, along with its key
///
/// Descends through single-child wrapper groups until a brace group is found.
/// A filter whose criteria does not reduce to one brace group this way defines
/// no primary.
pub(crate) fn locate_primary_template(
    elem: &FilterElement,
) -> Result<Option<(MetaKey, &FilterElement)>, TemplateError> {
    let mut current = elem;
    loop {
        let children = match current.children() {
            Some(children) => children,
            None => return Ok(None),
        };
        if current.delimiters == Delimiters::Braces {
            break;
        }
        if children.len() > 1 {
            return Ok(None);
        }
        current = &children[0];
    }

    Ok(find_template_group_key(current, true)?.map(|key| (key, current)))
}

/// The primary template group (`{(M3TAP ...) ...}`) a filter defines, if any
pub fn find_primary_template_group(
    elem: &FilterElement,
) -> Result<Option<&FilterElement>, TemplateError> {
    Ok(locate_primary_template(elem)?.map(|(_, group)| group))
}

/// Every meta group key referenced anywhere in `elem`, primaries included
pub fn find_all_meta_group_keys(elem: &FilterElement) -> Result<MetaKeySet, TemplateError> {
    let mut keys = MetaKeySet::new();
    collect_meta_group_keys(elem, &mut keys)?;
    Ok(keys)
}

fn collect_meta_group_keys(elem: &FilterElement, keys: &mut MetaKeySet) -> Result<(), TemplateError> {
    // Labels are leaf data, so a meta group is never searched further
    if let Some(key) = find_meta_group_key(elem, false)? {
        keys.add(key);
        return Ok(());
    }
    if let Some(children) = elem.children() {
        for child in children {
            collect_meta_group_keys(child, keys)?;
        }
    }
    Ok(())
}
