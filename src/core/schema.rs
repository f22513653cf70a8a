//! Schema declarations
//!
//! A record type lists its fields once, in declaration order, as a static
//! [`FieldDecl`] table. The table is parsed into a
//! [`TypeDescriptor`](crate::core::descriptor::TypeDescriptor) on first use.
//!
//! Most types use the [`xml_schema!`](crate::xml_schema) macro:
//!
//! ```
//! use xmlbind::xml_schema;
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Period {
//!     id: String,
//!     base_url: Vec<String>,
//! }
//!
//! xml_schema!(Period {
//!     id: "id,attr,omitempty",
//!     base_url: "BaseURL,omitempty",
//! });
//!
//! let period = Period { id: "p0".into(), base_url: vec!["a/".into()] };
//! assert_eq!(
//!     xmlbind::to_string(&period).unwrap(),
//!     r#"<Period id="p0"><BaseURL>a/</BaseURL></Period>"#
//! );
//! ```

/// Declaration of one field of a record type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDecl {
    /// Field identifier
    pub ident: &'static str,
    /// Tag string, see [`crate::core::descriptor::parse_tag`]
    pub tag: &'static str,
    /// Field table of an embedded record whose fields are spliced in
    pub embedded: Option<&'static [FieldDecl]>,
}

impl FieldDecl {
    /// A field described by a tag string
    pub const fn tagged(ident: &'static str, tag: &'static str) -> Self {
        Self {
            ident,
            tag,
            embedded: None,
        }
    }

    /// An embedded record whose fields behave as if declared on the outer type
    pub const fn embedded(ident: &'static str, fields: &'static [FieldDecl]) -> Self {
        Self {
            ident,
            tag: "",
            embedded: Some(fields),
        }
    }
}

/// Static field metadata of a record type
pub trait XmlSchema {
    /// Bare type name
    const TYPE_NAME: &'static str;

    /// Field declarations in declaration order
    const FIELDS: &'static [FieldDecl];
}

impl<T: XmlSchema> XmlSchema for Option<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;
    const FIELDS: &'static [FieldDecl] = T::FIELDS;
}

impl<T: XmlSchema> XmlSchema for Box<T> {
    const TYPE_NAME: &'static str = T::TYPE_NAME;
    const FIELDS: &'static [FieldDecl] = T::FIELDS;
}

/// Declare the XML schema of a struct
///
/// Each entry maps a struct field to its tag string, or to `embed Type` for
/// an embedded record. Fields left out are never encoded or decoded.
///
/// The plain form also implements [`XmlValue`](crate::XmlValue). Types that
/// need hooks use the `@record` form and implement `XmlValue` by hand,
/// returning `ValueRef::Record(self)` from `as_value_ref`.
#[macro_export]
macro_rules! xml_schema {
    (@record $name:ident { $($body:tt)* }) => {
        $crate::__xml_schema_munch!(@parse $name [] [] $($body)*);
    };
    ($name:ident { $($body:tt)* }) => {
        $crate::__xml_schema_munch!(@parse $name [] [] $($body)*);

        impl $crate::XmlValue for $name {
            fn type_name(&self) -> &'static str {
                <Self as $crate::XmlSchema>::TYPE_NAME
            }

            fn as_value_ref(&self) -> $crate::ValueRef<'_> {
                $crate::ValueRef::Record(self)
            }

            fn as_value_mut(&mut self) -> $crate::ValueMut<'_> {
                $crate::ValueMut::Record(self)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __xml_schema_munch {
    (@parse $name:ident [$($decl:expr,)*] [$($field:ident,)*]
        $f:ident : embed $ty:ty $(, $($rest:tt)*)?) => {
        $crate::__xml_schema_munch!(@parse $name
            [$($decl,)* $crate::FieldDecl::embedded(
                stringify!($f),
                <$ty as $crate::XmlSchema>::FIELDS,
            ),]
            [$($field,)* $f,]
            $($($rest)*)?);
    };
    (@parse $name:ident [$($decl:expr,)*] [$($field:ident,)*]
        $f:ident : $tag:literal $(, $($rest:tt)*)?) => {
        $crate::__xml_schema_munch!(@parse $name
            [$($decl,)* $crate::FieldDecl::tagged(stringify!($f), $tag),]
            [$($field,)* $f,]
            $($($rest)*)?);
    };
    (@parse $name:ident [$($decl:expr,)*] [$($field:ident,)*]) => {
        impl $crate::XmlSchema for $name {
            const TYPE_NAME: &'static str = stringify!($name);
            const FIELDS: &'static [$crate::FieldDecl] = &[$($decl,)*];
        }

        impl $crate::XmlRecord for $name {
            fn schema_id(&self) -> ::std::any::TypeId {
                ::std::any::TypeId::of::<Self>()
            }

            fn schema_name(&self) -> &'static str {
                <Self as $crate::XmlSchema>::TYPE_NAME
            }

            fn schema_fields(&self) -> &'static [$crate::FieldDecl] {
                <Self as $crate::XmlSchema>::FIELDS
            }

            #[allow(unused_mut, unused_assignments, unused_variables)]
            fn field(&self, index: usize) -> Option<&dyn $crate::XmlValue> {
                let mut remaining = index;
                $(
                    if remaining == 0 {
                        return Some(&self.$field);
                    }
                    remaining -= 1;
                )*
                None
            }

            #[allow(unused_mut, unused_assignments, unused_variables)]
            fn field_mut(&mut self, index: usize) -> Option<&mut dyn $crate::XmlValue> {
                let mut remaining = index;
                $(
                    if remaining == 0 {
                        return Some(&mut self.$field);
                    }
                    remaining -= 1;
                )*
                None
            }
        }
    };
}
