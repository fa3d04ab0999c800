//! Permission-gated navigation menu.
//!
//! A menu entry is visible when its `requiredPermission` is empty or is one
//! of the session's permission keys. The same rule is sent to the backend as
//! a filter and re-applied to the response.

use crate::api::{ApiError, Backend, ListOptions, MenuItem, decode};
use crate::filter::{Filter, Sort};

pub const MENU_COLLECTION: &str = "menu_items";
pub const REQUIRED_PERMISSION_FIELD: &str = "requiredPermission";
pub const ORDER_FIELD: &str = "order";

/// Disjunction over `{""} ∪ keys`, empty clause first.
#[must_use]
pub fn nav_filter(keys: &[String]) -> Filter {
    let mut values: Vec<&str> = keys.iter().map(String::as_str).filter(|k| !k.is_empty()).collect();
    values.sort_unstable();
    values.dedup();
    Filter::any_of(REQUIRED_PERMISSION_FIELD, std::iter::once("").chain(values))
}

#[must_use]
pub fn nav_query(keys: &[String]) -> ListOptions {
    ListOptions::filtered(nav_filter(keys)).sorted(Sort::asc(ORDER_FIELD))
}

#[must_use]
pub fn is_visible(item: &MenuItem, keys: &[String]) -> bool {
    item.required_permission.is_empty() || keys.iter().any(|k| *k == item.required_permission)
}

/// Fetch the menu entries visible to `keys`, ordered by `order`.
///
/// # Errors
///
/// Returns the backend error or a parse error for a malformed entry.
pub async fn fetch_nav_items(backend: &dyn Backend, keys: &[String]) -> Result<Vec<MenuItem>, ApiError> {
    let raw = backend.get_full_list(MENU_COLLECTION, &nav_query(keys)).await?;
    let mut items = raw.into_iter().map(decode::<MenuItem>).collect::<Result<Vec<_>, _>>()?;
    items.retain(|item| is_visible(item, keys));
    items.sort_by(|a, b| a.order.total_cmp(&b.order));
    Ok(items)
}
