//! Pagination policy resolution
//!
//! Decides, per collection, whether an ordering field is configured.

use crate::config::PaginationField;
use crate::error::{Error, Result};

/// Ordering field configured for `collection`, if any
///
/// Two or more entries for the same collection are a configuration error;
/// callers must not query the collection in that case.
pub fn resolve_pagination_field<'a>(
    collection: &str,
    fields: &'a [PaginationField],
) -> Result<Option<&'a str>> {
    let mut matches = fields.iter().filter(|f| f.collection == collection);

    match (matches.next(), matches.next()) {
        (None, _) => Ok(None),
        (Some(entry), None) => Ok(Some(entry.field_name.as_str())),
        (Some(_), Some(_)) => Err(Error::configuration(
            collection,
            "multiple pagination fields found; ensure `pagination_fields` has only one entry per collection",
        )),
    }
}
