//! Structural description of values
//!
//! Diagnostics never print actions through `Debug`. Instead, every action type
//! describes its own shape through [`Describe`]: which variant it is and what
//! it carries, which fields a tuple holds, or that it is a scalar or an opaque
//! leaf. [`format_action`](crate::format::format_action) walks that
//! description recursively.
//!
//! Most types get their implementation from `#[derive(Describe)]`. Hand-written
//! implementations use the constructors on [`Shape`] and [`Field`]:
//!
//! ```
//! use composable_signpost_core::describe::{Describe, Field, Shape};
//!
//! struct Page {
//!     number: u32,
//!     cursor: String,
//! }
//!
//! impl Describe for Page {
//!     fn describe(&self) -> Shape<'_> {
//!         Shape::tuple([
//!             Field::labeled("number", &self.number),
//!             Field::labeled("cursor", &self.cursor),
//!         ])
//!     }
//! }
//! ```

use smallvec::SmallVec;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt::Display;
use std::rc::Rc;
use std::sync::Arc;

/// Fields of a tuple or of a multi-field variant payload
pub type Fields<'a> = SmallVec<[Field<'a>; 4]>;

/// A value that can describe its own structure
pub trait Describe {
    /// Describe the structural shape of this value
    fn describe(&self) -> Shape<'_>;
}

/// The structural shape of a described value
pub enum Shape<'a> {
    /// A tagged variant, optionally carrying a payload
    Variant {
        /// Bare name of the enum type
        type_name: &'static str,
        /// Label of the variant
        label: &'static str,
        /// Associated payload, if the variant has one
        payload: Option<Payload<'a>>,
    },

    /// A tuple of optionally labeled values
    Tuple(Fields<'a>),

    /// A primitive value rendered through its `Display` text
    Scalar(String),

    /// A value whose contents are never rendered
    Opaque,
}

/// The payload carried by a variant
pub enum Payload<'a> {
    /// A single associated value
    Value(&'a dyn Describe),
    /// Several (or named) associated values
    Fields(Fields<'a>),
}

/// One element of a tuple
#[derive(Clone, Copy)]
pub struct Field<'a> {
    /// Label of the element, if it has one
    pub label: Option<&'static str>,
    /// The element itself
    pub value: &'a dyn Describe,
}

impl<'a> Field<'a> {
    /// A labeled element
    #[must_use]
    pub const fn labeled(label: &'static str, value: &'a dyn Describe) -> Self {
        Self {
            label: Some(label),
            value,
        }
    }

    /// An element without a label
    #[must_use]
    pub const fn unlabeled(value: &'a dyn Describe) -> Self {
        Self { label: None, value }
    }
}

impl<'a> Shape<'a> {
    /// A variant without a payload
    #[must_use]
    pub const fn unit(type_name: &'static str, label: &'static str) -> Self {
        Self::Variant {
            type_name,
            label,
            payload: None,
        }
    }

    /// A variant carrying a single value
    ///
    /// The type name is only consulted for payload-free variants, so it is
    /// left empty here.
    #[must_use]
    pub const fn case(label: &'static str, value: &'a dyn Describe) -> Self {
        Self::Variant {
            type_name: "",
            label,
            payload: Some(Payload::Value(value)),
        }
    }

    /// A variant carrying several values
    #[must_use]
    pub fn case_fields(label: &'static str, fields: impl IntoIterator<Item = Field<'a>>) -> Self {
        Self::Variant {
            type_name: "",
            label,
            payload: Some(Payload::Fields(fields.into_iter().collect())),
        }
    }

    /// A tuple of fields
    #[must_use]
    pub fn tuple(fields: impl IntoIterator<Item = Field<'a>>) -> Self {
        Self::Tuple(fields.into_iter().collect())
    }

    /// A scalar rendered through `Display`
    #[must_use]
    pub fn scalar(value: impl Display) -> Self {
        Self::Scalar(value.to_string())
    }
}

/// Stand-in for values that must never be rendered
///
/// `#[describe(skip)]` fields are described through this.
#[derive(Debug, Clone, Copy, Default)]
pub struct Opaque;

impl Describe for Opaque {
    fn describe(&self) -> Shape<'_> {
        Shape::Opaque
    }
}

macro_rules! impl_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Describe for $ty {
                fn describe(&self) -> Shape<'_> {
                    Shape::scalar(self)
                }
            }
        )*
    };
}

impl_scalar!(
    i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char, str,
    String,
);

impl Describe for () {
    fn describe(&self) -> Shape<'_> {
        Shape::Tuple(Fields::new())
    }
}

macro_rules! impl_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: Describe),+> Describe for ($($name,)+) {
            fn describe(&self) -> Shape<'_> {
                Shape::tuple([$(Field::unlabeled(&self.$idx)),+])
            }
        }
    };
}

impl_tuple!(A: 0);
impl_tuple!(A: 0, B: 1);
impl_tuple!(A: 0, B: 1, C: 2);
impl_tuple!(A: 0, B: 1, C: 2, D: 3);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4);
impl_tuple!(A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

impl<T: Describe> Describe for Option<T> {
    fn describe(&self) -> Shape<'_> {
        match self {
            Some(value) => Shape::case("Some", value),
            None => Shape::unit("Option", "None"),
        }
    }
}

impl<T: Describe, E: Describe> Describe for Result<T, E> {
    fn describe(&self) -> Shape<'_> {
        match self {
            Ok(value) => Shape::case("Ok", value),
            Err(error) => Shape::case("Err", error),
        }
    }
}

impl<T: Describe + ?Sized> Describe for &T {
    fn describe(&self) -> Shape<'_> {
        (**self).describe()
    }
}

impl<T: Describe + ?Sized> Describe for Box<T> {
    fn describe(&self) -> Shape<'_> {
        (**self).describe()
    }
}

impl<T: Describe + ?Sized> Describe for Arc<T> {
    fn describe(&self) -> Shape<'_> {
        (**self).describe()
    }
}

impl<T: Describe + ?Sized> Describe for Rc<T> {
    fn describe(&self) -> Shape<'_> {
        (**self).describe()
    }
}

macro_rules! impl_opaque {
    ($($ty:ident < $($param:ident),+ >),* $(,)?) => {
        $(
            impl<$($param),+> Describe for $ty<$($param),+> {
                fn describe(&self) -> Shape<'_> {
                    Shape::Opaque
                }
            }
        )*
    };
}

// Collections are leaves: their contents are data, not structure.
impl_opaque!(
    Vec<T>,
    VecDeque<T>,
    HashMap<K, V, S>,
    BTreeMap<K, V>,
    HashSet<T, S>,
    BTreeSet<T>,
);

impl<T> Describe for [T] {
    fn describe(&self) -> Shape<'_> {
        Shape::Opaque
    }
}

impl Describe for std::time::Duration {
    fn describe(&self) -> Shape<'_> {
        Shape::Opaque
    }
}
