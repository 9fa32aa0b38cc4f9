//! Column selection and renaming
//!
//! Turns the column list reported by the service plus the user's selection
//! into the rename mapping and the ordered export column list sent with the
//! parameters call.

use crate::config::CustomFieldOverride;
use crate::types::FieldDescriptor;
use std::collections::BTreeMap;

/// Rename mapping and export column order
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldMappings {
    /// Column index (as string) to display name, one entry per selected column
    pub mapping: BTreeMap<String, String>,
    /// Selected column indexes in export order
    pub export_field_indexes: Vec<usize>,
}

/// Build the rename mapping and export order for one sheet
///
/// An empty `export_indexes` selects every column in order. Otherwise the
/// requested indexes are kept in caller order, dropping any that fall
/// outside `0..original_fields.len()`. Each selected column is named by its
/// first override with a non-empty name, or else by the descriptor's display
/// name.
///
/// # Examples
///
/// ```
/// use sheet_relay::mapping::create_field_mappings;
/// use sheet_relay::types::FieldDescriptor;
///
/// let fields: Vec<FieldDescriptor> = vec!["name".into(), "email".into()];
/// let result = create_field_mappings(&fields, &[0, 5], &[]);
///
/// assert_eq!(result.export_field_indexes, vec![0]);
/// assert_eq!(result.mapping["0"], "name");
/// ```
pub fn create_field_mappings(
    original_fields: &[FieldDescriptor],
    export_indexes: &[i64],
    custom_overrides: &[CustomFieldOverride],
) -> FieldMappings {
    let export_field_indexes: Vec<usize> = if export_indexes.is_empty() {
        (0..original_fields.len()).collect()
    } else {
        export_indexes
            .iter()
            .filter_map(|&index| usize::try_from(index).ok())
            .filter(|&index| index < original_fields.len())
            .collect()
    };

    let mapping = export_field_indexes
        .iter()
        .map(|&index| {
            let name = override_for(custom_overrides, index)
                .unwrap_or_else(|| original_fields[index].display_name());
            (index.to_string(), name)
        })
        .collect();

    FieldMappings {
        mapping,
        export_field_indexes,
    }
}

fn override_for(overrides: &[CustomFieldOverride], index: usize) -> Option<String> {
    overrides
        .iter()
        .find(|o| usize::try_from(o.index).ok() == Some(index) && !o.name.trim().is_empty())
        .map(|o| o.name.clone())
}
