//! Field catalog shared by assembly, backward replay, and forward rebuild.
//!
//! Bugzilla keeps a closed set of multi-valued fields. Everything else is a
//! scalar that is replaced wholesale on every change.

/// Bug-level flags. Stored as [`crate::model::Flag`] values, not strings.
pub const FLAGS: &str = "flags";

/// The CC list. The only field whose element order is normalized on output.
pub const PARTICIPANTS: &str = "cc";

/// Pseudo field name the activity table uses for flag changes.
pub const DEFAULT_FLAG_ALIAS: &str = "flagtypes.name";

/// Every field holding an unordered collection of values.
pub const MULTI_VALUE_FIELDS: [&str; 8] = [
    FLAGS,
    PARTICIPANTS,
    "keywords",
    "dependson",
    "blocked",
    "dupe_by",
    "dupe_of",
    "bug_group",
];

/// Dependency fields whose values sometimes carry a leading `"? "` marker.
pub const UNCERTAIN_DEPENDENCY_FIELDS: [&str; 2] = ["dependson", "blocked"];

/// Keys the snapshot document owns. Row fields with these names would
/// collide with snapshot metadata and are rejected by the assembler.
pub const RESERVED_KEYS: [&str; 8] = [
    "bug_id",
    "_id",
    "modified_ts",
    "modified_by",
    "expires_on",
    "attachments",
    "measurements",
    FLAGS,
];

/// Keys an attachment document owns.
pub const ATTACHMENT_RESERVED_KEYS: [&str; 3] = ["_id", "attach_id", FLAGS];

/// Attachment column holding its creation time. Overrides the time of the
/// first row seen for the attachment.
pub const ATTACHMENT_CREATED_TS: &str = "created_ts";

/// Attachment column naming its creator.
pub const ATTACHMENT_CREATED_BY: &str = "created_by";

/// Returns `true` for members of the closed multi-value field list.
#[must_use]
pub fn is_multi_field(name: &str) -> bool {
    MULTI_VALUE_FIELDS.contains(&name)
}

/// Returns `true` when `name` is owned by the snapshot document itself.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    RESERVED_KEYS.contains(&name)
}

/// Returns `true` when `name` is owned by the attachment document itself.
#[must_use]
pub fn is_attachment_reserved(name: &str) -> bool {
    ATTACHMENT_RESERVED_KEYS.contains(&name)
}

/// Map the activity-log pseudo field for flags onto the canonical `flags`.
#[must_use]
pub fn normalize_field_name<'a>(name: &'a str, flag_alias: &str) -> &'a str {
    if name == flag_alias { FLAGS } else { name }
}

/// Membership view of a raw column value.
///
/// Multi-value fields are split on commas with surrounding whitespace
/// trimmed; empty parts are dropped, so an empty column yields no values.
/// Scalars always yield exactly one element, even when empty.
#[must_use]
pub fn membership_view<'a>(field: &str, raw: &'a str) -> Vec<&'a str> {
    if is_multi_field(field) {
        raw.split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect()
    } else {
        vec![raw]
    }
}
