use crate::fields::PARTICIPANTS;
use crate::model::{FieldValue, Record};

/// Fields whose element order carries no meaning and is sorted on output.
pub const STABILIZED_FIELDS: [&str; 1] = [PARTICIPANTS];

/// Normalize a snapshot before emission. Other collections keep
/// insertion order.
pub fn stabilize(record: &mut Record) {
    for field in STABILIZED_FIELDS {
        if let Some(FieldValue::Set(values)) = record.fields.get_mut(field) {
            values.sort();
        }
    }
}
