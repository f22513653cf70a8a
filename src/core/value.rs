//! Value model
//!
//! Every value the engine can encode or decode implements [`XmlValue`]. The
//! trait exposes two views of the value:
//!
//! - [`ValueRef`], the read view used by the encoder. Optional layers are
//!   visible so that an absent value can write nothing.
//! - [`ValueMut`], the decode view. Optional and boxed layers are
//!   materialized with `Default` on access, so the decoder only ever sees the
//!   concrete target.
//!
//! Records (structs with field metadata) implement [`XmlRecord`], usually
//! through the [`xml_schema!`](crate::xml_schema) macro.

use crate::core::error::{XmlError, XmlResult};
use crate::core::hooks::{DecodeHook, EncodeHook};
use crate::core::schema::FieldDecl;
use crate::core::token::{Attr, Name};
use std::any::TypeId;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc::{Receiver, Sender};

/// A value that can be encoded to and decoded from XML
pub trait XmlValue {
    /// Bare type name, used as the element name of last resort
    fn type_name(&self) -> &'static str;

    /// Read view of the value
    fn as_value_ref(&self) -> ValueRef<'_>;

    /// Decode view of the value
    fn as_value_mut(&mut self) -> ValueMut<'_>;

    /// Custom encoding, checked before generic handling
    fn encode_hook(&self) -> Option<EncodeHook<'_>> {
        None
    }

    /// Custom decoding, checked before generic handling
    fn decode_hook(&mut self) -> Option<DecodeHook<'_>> {
        None
    }
}

/// Read view of a value
pub enum ValueRef<'a> {
    /// Text-like leaf value
    Scalar(&'a dyn XmlScalar),
    /// Struct with field metadata
    Record(&'a dyn XmlRecord),
    /// Ordered sequence; items repeat the enclosing field's tag
    Seq(&'a dyn XmlSeq),
    /// Optional layer, `None` when absent
    Optional(Option<&'a dyn XmlValue>),
    /// A qualified name, used by name fields
    Name(&'a Name),
    /// A complete attribute, used by catch-all attribute fields
    Attr(&'a Attr),
    /// A value that can only be handled through its hooks
    Opaque,
    /// A value that cannot be represented in XML
    Unsupported(&'static str),
}

/// Decode view of a value
pub enum ValueMut<'a> {
    /// Text-like leaf value
    Scalar(&'a mut dyn XmlScalar),
    /// Struct with field metadata
    Record(&'a mut dyn XmlRecord),
    /// Growable sequence
    Seq(&'a mut dyn XmlSeq),
    /// A qualified name, used by name fields
    Name(&'a mut Name),
    /// A complete attribute, used by catch-all attribute fields
    Attr(&'a mut Attr),
    /// A value that can only be handled through its hooks
    Opaque,
    /// A value that cannot be represented in XML
    Unsupported(&'static str),
}

/// A leaf value with a canonical text form
pub trait XmlScalar {
    /// Canonical text form
    fn to_text(&self) -> Cow<'_, str>;

    /// Replace the value from its text form
    fn set_text(&mut self, text: &str) -> XmlResult<()>;

    /// Whether the value is the zero value of its type
    fn is_zero(&self) -> bool;

    /// Whether the value is string-like (accepted by comment and inner-XML fields)
    fn is_string(&self) -> bool {
        false
    }
}

/// A sequence of values
pub trait XmlSeq {
    /// Number of items
    fn len(&self) -> usize;

    /// Item at `index`
    fn item(&self, index: usize) -> Option<&dyn XmlValue>;

    /// Append a default item and return it
    fn push_default(&mut self) -> &mut dyn XmlValue;

    /// Drop items past `len`
    fn truncate(&mut self, len: usize);
}

/// A struct whose fields are described by static [`FieldDecl`] tables
pub trait XmlRecord {
    /// Stable identity of the concrete type, the descriptor cache key
    fn schema_id(&self) -> TypeId;

    /// Bare type name
    fn schema_name(&self) -> &'static str;

    /// Field declarations in declaration order
    fn schema_fields(&self) -> &'static [FieldDecl];

    /// Field at declaration `index`
    fn field(&self, index: usize) -> Option<&dyn XmlValue>;

    /// Mutable field at declaration `index`
    fn field_mut(&mut self, index: usize) -> Option<&mut dyn XmlValue>;
}

/// Whether a value counts as empty for `omitempty`
pub fn is_empty_value(value: &dyn XmlValue) -> bool {
    match value.as_value_ref() {
        ValueRef::Scalar(s) => s.is_zero(),
        ValueRef::Seq(seq) => seq.len() == 0,
        ValueRef::Optional(inner) => inner.is_none(),
        ValueRef::Record(_)
        | ValueRef::Name(_)
        | ValueRef::Attr(_)
        | ValueRef::Opaque
        | ValueRef::Unsupported(_) => false,
    }
}

/// Strip optional layers; `None` when a layer is absent
pub fn settle(value: &dyn XmlValue) -> Option<&dyn XmlValue> {
    let mut value = value;
    loop {
        match value.as_value_ref() {
            ValueRef::Optional(Some(inner)) => value = inner,
            ValueRef::Optional(None) => return None,
            _ => return Some(value),
        }
    }
}

/// Follow an access path of field indices through embedded records
///
/// Returns `None` when an optional embedded record on the way is absent.
pub fn field_at<'v>(record: &'v dyn XmlRecord, path: &[usize]) -> Option<&'v dyn XmlValue> {
    let (first, rest) = path.split_first()?;
    let value = record.field(*first)?;
    if rest.is_empty() {
        return Some(value);
    }
    match settle(value)?.as_value_ref() {
        ValueRef::Record(inner) => field_at(inner, rest),
        _ => None,
    }
}

/// Follow an access path for decoding, materializing embedded records
pub fn field_at_mut<'v>(
    record: &'v mut dyn XmlRecord,
    path: &[usize],
) -> XmlResult<&'v mut dyn XmlValue> {
    let name = record.schema_name();
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| XmlError::InternalError(format!("empty field path in {}", name)))?;
    let value = record
        .field_mut(*first)
        .ok_or_else(|| XmlError::InternalError(format!("no field #{} in {}", first, name)))?;
    if rest.is_empty() {
        return Ok(value);
    }
    match value.as_value_mut() {
        ValueMut::Record(inner) => field_at_mut(inner, rest),
        _ => Err(XmlError::InternalError(format!(
            "embedded field #{} of {} is not a record",
            first, name
        ))),
    }
}

fn bad_value(text: &str, ty: &str, err: impl std::fmt::Display) -> XmlError {
    XmlError::BadValue(format!("cannot parse {:?} as {}: {}", text, ty, err))
}

// Integers render in decimal and parse with surrounding whitespace trimmed.
macro_rules! impl_scalar_int {
    ($($ty:ty),* $(,)?) => {
        $(
            impl XmlScalar for $ty {
                fn to_text(&self) -> Cow<'_, str> {
                    Cow::Owned(self.to_string())
                }

                fn set_text(&mut self, text: &str) -> XmlResult<()> {
                    let trimmed = text.trim();
                    *self = if trimmed.is_empty() {
                        0
                    } else {
                        trimmed
                            .parse()
                            .map_err(|e| bad_value(text, stringify!($ty), e))?
                    };
                    Ok(())
                }

                fn is_zero(&self) -> bool {
                    *self == 0
                }
            }

            impl_scalar_value!($ty);
        )*
    };
}

// `Display` for floats is the shortest text that parses back to the same value.
macro_rules! impl_scalar_float {
    ($($ty:ty),* $(,)?) => {
        $(
            impl XmlScalar for $ty {
                fn to_text(&self) -> Cow<'_, str> {
                    Cow::Owned(self.to_string())
                }

                fn set_text(&mut self, text: &str) -> XmlResult<()> {
                    let trimmed = text.trim();
                    *self = if trimmed.is_empty() {
                        0.0
                    } else {
                        trimmed
                            .parse()
                            .map_err(|e| bad_value(text, stringify!($ty), e))?
                    };
                    Ok(())
                }

                fn is_zero(&self) -> bool {
                    *self == 0.0
                }
            }

            impl_scalar_value!($ty);
        )*
    };
}

/// Implement [`XmlValue`] for a type that already implements [`XmlScalar`]
#[macro_export]
macro_rules! impl_scalar_value {
    ($ty:ty) => {
        impl $crate::XmlValue for $ty {
            fn type_name(&self) -> &'static str {
                stringify!($ty)
            }

            fn as_value_ref(&self) -> $crate::ValueRef<'_> {
                $crate::ValueRef::Scalar(self)
            }

            fn as_value_mut(&mut self) -> $crate::ValueMut<'_> {
                $crate::ValueMut::Scalar(self)
            }
        }
    };
}

impl_scalar_int!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
impl_scalar_float!(f32, f64);

impl XmlScalar for bool {
    fn to_text(&self) -> Cow<'_, str> {
        Cow::Borrowed(if *self { "true" } else { "false" })
    }

    fn set_text(&mut self, text: &str) -> XmlResult<()> {
        *self = match text.trim() {
            "" => false,
            "true" | "1" => true,
            "false" | "0" => false,
            other => return Err(bad_value(other, "bool", "expected true, false, 1 or 0")),
        };
        Ok(())
    }

    fn is_zero(&self) -> bool {
        !*self
    }
}

impl_scalar_value!(bool);

impl XmlScalar for String {
    fn to_text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }

    fn set_text(&mut self, text: &str) -> XmlResult<()> {
        self.clear();
        self.push_str(text);
        Ok(())
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn is_string(&self) -> bool {
        true
    }
}

impl_scalar_value!(String);

impl XmlScalar for char {
    fn to_text(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn set_text(&mut self, text: &str) -> XmlResult<()> {
        let mut chars = text.chars();
        *self = match (chars.next(), chars.next()) {
            (None, _) => '\0',
            (Some(c), None) => c,
            _ => return Err(bad_value(text, "char", "expected a single character")),
        };
        Ok(())
    }

    fn is_zero(&self) -> bool {
        *self == '\0'
    }
}

impl_scalar_value!(char);

impl XmlValue for Name {
    fn type_name(&self) -> &'static str {
        "Name"
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Name(self)
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Name(self)
    }
}

impl XmlValue for Attr {
    fn type_name(&self) -> &'static str {
        "Attr"
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Attr(self)
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Attr(self)
    }
}

impl<T: XmlValue + Default> XmlSeq for Vec<T> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn item(&self, index: usize) -> Option<&dyn XmlValue> {
        self.get(index).map(|v| v as &dyn XmlValue)
    }

    fn push_default(&mut self) -> &mut dyn XmlValue {
        self.push(T::default());
        let last = Vec::len(self) - 1;
        &mut self[last]
    }

    fn truncate(&mut self, len: usize) {
        Vec::truncate(self, len);
    }
}

impl<T: XmlValue + Default> XmlValue for Vec<T> {
    fn type_name(&self) -> &'static str {
        "Vec"
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Seq(self)
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Seq(self)
    }
}

impl<T: XmlValue + Default> XmlValue for Option<T> {
    fn type_name(&self) -> &'static str {
        match self {
            Some(inner) => inner.type_name(),
            None => "Option",
        }
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Optional(self.as_ref().map(|v| v as &dyn XmlValue))
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        self.get_or_insert_with(T::default).as_value_mut()
    }

    fn encode_hook(&self) -> Option<EncodeHook<'_>> {
        self.as_ref().and_then(|inner| inner.encode_hook())
    }

    fn decode_hook(&mut self) -> Option<DecodeHook<'_>> {
        self.get_or_insert_with(T::default).decode_hook()
    }
}

impl<T: XmlValue + ?Sized> XmlValue for Box<T> {
    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        (**self).as_value_ref()
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        (**self).as_value_mut()
    }

    fn encode_hook(&self) -> Option<EncodeHook<'_>> {
        (**self).encode_hook()
    }

    fn decode_hook(&mut self) -> Option<DecodeHook<'_>> {
        (**self).decode_hook()
    }
}

// Values with no XML form. They still implement the trait so that reaching
// one is a runtime error instead of a silently missing field.
macro_rules! impl_unsupported {
    ($kind:literal => $($ty:ty),* $(,)?) => {
        $(
            impl<K: 'static, V: 'static> XmlValue for $ty {
                fn type_name(&self) -> &'static str {
                    std::any::type_name::<Self>()
                }

                fn as_value_ref(&self) -> ValueRef<'_> {
                    ValueRef::Unsupported($kind)
                }

                fn as_value_mut(&mut self) -> ValueMut<'_> {
                    ValueMut::Unsupported($kind)
                }
            }
        )*
    };
}

impl_unsupported!("map" => HashMap<K, V>, BTreeMap<K, V>);

impl<T: 'static> XmlValue for Sender<T> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Unsupported("channel")
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Unsupported("channel")
    }
}

impl<T: 'static> XmlValue for Receiver<T> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Unsupported("channel")
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Unsupported("channel")
    }
}

impl<R: 'static> XmlValue for fn() -> R {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Unsupported("function")
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Unsupported("function")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_text() {
        assert_eq!(42u32.to_text(), "42");
        assert_eq!((-7i64).to_text(), "-7");
        assert_eq!(2.5f64.to_text(), "2.5");
        assert_eq!(0.1f32.to_text(), "0.1");
        assert_eq!(true.to_text(), "true");
        assert_eq!("a<b".to_string().to_text(), "a<b");
    }

    #[test]
    fn test_scalar_set_text() {
        let mut n = 0u64;
        n.set_text(" 100 ").unwrap();
        assert_eq!(n, 100);
        assert!(n.set_text("ten").is_err());

        let mut f = 0f64;
        f.set_text("1.97").unwrap();
        assert_eq!(f, 1.97);

        let mut b = false;
        b.set_text("1").unwrap();
        assert!(b);
        assert!(matches!(b.set_text("yes"), Err(XmlError::BadValue(_))));

        let mut s = String::from("old");
        s.set_text(" kept as is ").unwrap();
        assert_eq!(s, " kept as is ");
    }

    #[test]
    fn test_is_empty_value() {
        assert!(is_empty_value(&String::new()));
        assert!(is_empty_value(&0u8));
        assert!(is_empty_value(&false));
        assert!(is_empty_value(&Vec::<u32>::new()));
        assert!(is_empty_value(&None::<String>));
        assert!(!is_empty_value(&Some(String::new())));
        assert!(!is_empty_value(&vec![0u32]));
        assert!(!is_empty_value(&Name::default()));
    }

    #[test]
    fn test_settle() {
        let nested: Option<Box<Option<u32>>> = Some(Box::new(Some(5)));
        let inner = settle(&nested).unwrap();
        assert!(matches!(inner.as_value_ref(), ValueRef::Scalar(s) if s.to_text() == "5"));

        let absent: Option<Box<Option<u32>>> = Some(Box::new(None));
        assert!(settle(&absent).is_none());
    }

    #[test]
    fn test_option_materializes_on_decode() {
        let mut value: Option<u32> = None;
        match value.as_value_mut() {
            ValueMut::Scalar(s) => s.set_text("9").unwrap(),
            _ => panic!("expected scalar"),
        }
        assert_eq!(value, Some(9));
    }

    #[test]
    fn test_seq_push_and_truncate() {
        let mut items: Vec<String> = Vec::new();
        if let ValueMut::Scalar(s) = items.push_default().as_value_mut() {
            s.set_text("a").unwrap();
        }
        items.push_default();
        assert_eq!(XmlSeq::len(&items), 2);
        XmlSeq::truncate(&mut items, 1);
        assert_eq!(items, vec!["a".to_string()]);
    }

    #[test]
    fn test_unsupported_kinds() {
        let map: HashMap<String, String> = HashMap::new();
        assert!(matches!(map.as_value_ref(), ValueRef::Unsupported("map")));
        let (tx, _rx) = std::sync::mpsc::channel::<u8>();
        assert!(matches!(tx.as_value_ref(), ValueRef::Unsupported("channel")));
    }
}
