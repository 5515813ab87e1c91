//! One diff routine for both replay directions and both levels (bug and
//! attachment).
//!
//! Backward deletes the post-change view and inserts the pre-change view;
//! forward does the opposite. Deletion always runs before insertion so a
//! value that appears on both sides of a diff survives.

use crate::fields::{FLAGS, UNCERTAIN_DEPENDENCY_FIELDS, is_multi_field, membership_view};
use crate::model::{FieldHost, FieldValue, Flag, Timestamp};

use super::changeset::ChangeEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Direction {
    Backward,
    Forward,
}

/// Prefix some dependency values carry in the activity log.
const UNCERTAIN_PREFIX: &str = "? ";

/// Version boundary an inserted flag is stamped with during forward replay.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Stamp<'a> {
    pub ts: Timestamp,
    pub actor: &'a str,
}

/// Apply `event` to `host` in `direction`.
///
/// Returns the values that were to be deleted but were not present.
pub(crate) fn apply_change<H: FieldHost>(
    host: &mut H,
    event: &ChangeEvent,
    direction: Direction,
    stamp: Option<Stamp<'_>>,
    trim_uncertain: bool,
) -> Vec<String> {
    let (delete, insert) = match direction {
        Direction::Backward => (&event.new_value, &event.old_value),
        Direction::Forward => (&event.old_value, &event.new_value),
    };
    let field = event.field.as_str();

    if field == FLAGS {
        return apply_flags(host.flags_mut(), delete, insert, direction, stamp);
    }

    let holds_set = matches!(host.fields().get(field), Some(FieldValue::Set(_)));
    if !holds_set && !is_multi_field(field) {
        host.fields_mut()
            .insert(field.to_string(), FieldValue::Scalar(insert.clone()));
        return Vec::new();
    }

    let mut values = match host.fields_mut().remove(field) {
        Some(FieldValue::Set(values)) => values,
        Some(FieldValue::Scalar(raw)) => membership_view(field, &raw)
            .into_iter()
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    };

    let lenient = trim_uncertain && UNCERTAIN_DEPENDENCY_FIELDS.contains(&field);
    let mut missing = Vec::new();
    for value in set_members(field, delete) {
        if !remove_value(&mut values, value, lenient) {
            missing.push(value.to_string());
        }
    }
    values.extend(set_members(field, insert).map(str::to_string));

    host.fields_mut()
        .insert(field.to_string(), FieldValue::Set(values));
    missing
}

/// Membership view of one side of a diff against a set-valued host. An empty
/// side contributes no members, even for fields split as a single value.
fn set_members<'a>(field: &str, raw: &'a str) -> impl Iterator<Item = &'a str> {
    membership_view(field, raw)
        .into_iter()
        .filter(|value| !value.is_empty())
}

fn apply_flags(
    flags: &mut Vec<Flag>,
    delete: &str,
    insert: &str,
    direction: Direction,
    stamp: Option<Stamp<'_>>,
) -> Vec<String> {
    let mut missing = Vec::new();
    for rep in membership_view(FLAGS, delete) {
        match flags.iter().position(|flag| flag.matches(rep)) {
            Some(idx) => {
                flags.remove(idx);
            }
            None => missing.push(rep.to_string()),
        }
    }
    for rep in membership_view(FLAGS, insert) {
        let flag = match (direction, stamp) {
            (Direction::Forward, Some(stamp)) => Flag::set(rep, stamp.ts, stamp.actor),
            _ => Flag::inherited(rep),
        };
        flags.push(flag);
    }
    missing
}

/// Remove the first occurrence of `value`. With `lenient`, a value written
/// as `"? 123"` also matches a stored `"123"`.
fn remove_value(values: &mut Vec<String>, value: &str, lenient: bool) -> bool {
    if let Some(idx) = values.iter().position(|v| v == value) {
        values.remove(idx);
        return true;
    }
    if !lenient {
        return false;
    }
    let Some(trimmed) = value.strip_prefix(UNCERTAIN_PREFIX) else {
        return false;
    };
    let trimmed = trimmed.trim();
    match values.iter().position(|v| v == trimmed) {
        Some(idx) => {
            values.remove(idx);
            true
        }
        None => false,
    }
}
