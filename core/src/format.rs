//! Action formatting
//!
//! Renders a [`Describe`] value into the compact path string used by every
//! signpost: `.Failure(.Timeout)`, `.Select(id: 3)`, `id: 1, name: x`.
//!
//! Formatting is total. Shapes that carry no structural information render as
//! the empty string instead of failing.

use crate::describe::{Describe, Field, Payload, Shape};

/// Format an action from its structural description
///
/// # Rules
///
/// - Variant without payload: `""` when its label is just the type's bare
///   name, otherwise `".label"`
/// - Variant with payload: `".label(child)"`, or `".label"` when the payload
///   formats to nothing
/// - Tuple: each element as `label: child`, `label:` or `child`, joined with `", "`
/// - Scalar: its display text
/// - Opaque: `""`
///
/// # Example
///
/// ```
/// use composable_signpost_core::format::format_action;
///
/// assert_eq!(format_action(&Some(42)), ".Some(42)");
/// assert_eq!(format_action(&(1, "x")), "1, x");
/// assert_eq!(format_action(&vec![1, 2]), "");
/// ```
#[must_use]
pub fn format_action<T: Describe + ?Sized>(value: &T) -> String {
    format_shape(value.describe())
}

fn format_shape(shape: Shape<'_>) -> String {
    match shape {
        Shape::Variant {
            type_name,
            label,
            payload: None,
        } => {
            if label == bare_type_name(type_name) {
                String::new()
            } else {
                format!(".{label}")
            }
        },
        Shape::Variant {
            label,
            payload: Some(payload),
            ..
        } => {
            let child = match payload {
                Payload::Value(value) => format_action(value),
                Payload::Fields(fields) => format_fields(&fields),
            };
            if child.is_empty() {
                format!(".{label}")
            } else {
                format!(".{label}({child})")
            }
        },
        Shape::Tuple(fields) => format_fields(&fields),
        Shape::Scalar(text) => text,
        Shape::Opaque => String::new(),
    }
}

fn format_fields(fields: &[Field<'_>]) -> String {
    fields
        .iter()
        .map(|field| {
            let child = format_action(field.value);
            match (field.label, child.is_empty()) {
                (Some(label), true) => format!("{label}:"),
                (Some(label), false) => format!("{label}: {child}"),
                (None, _) => child,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Strip module path and generic arguments from a type name
///
/// Accepts both `stringify!`-style idents and `std::any::type_name` output.
fn bare_type_name(type_name: &str) -> &str {
    let without_generics = type_name
        .find('<')
        .map_or(type_name, |idx| &type_name[..idx]);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}
