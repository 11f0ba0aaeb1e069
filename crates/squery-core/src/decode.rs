//! Typed decoding of field maps
//!
//! Replies arrive as lists of string field maps. A target type describes how
//! its wire fields map onto struct fields with a [`Record`] implementation,
//! normally generated by the [`record!`](crate::record) macro, and how each
//! raw string is converted with [`FromField`].
//!
//! Conversion is weakly typed, matching what the server actually sends:
//! numbers and booleans arrive as text, booleans as `0`/`1`, and an empty
//! value decodes to the zero value of the field.
//!
//! The shape of the target decides how many objects are consumed (see
//! [`Unmarshal`]):
//!
//! | target      | behavior                                              |
//! |-------------|-------------------------------------------------------|
//! | record      | decodes `objects[0]`, fails on an empty reply          |
//! | `Vec<T>`    | appends one element per object, keeps existing content |
//! | `[T; N]`    | fills slots in order, extra objects are ignored        |
//! | `Option<T>` | `None` on an empty reply, otherwise like a record      |
//! | `()`        | ignores the payload                                   |

use crate::error::{DecodeError, FieldError};
use crate::response::FieldMap;

/// Conversion from one raw (already unescaped) field value
///
/// Domain types with a custom text representation implement this to parse
/// their own values, usually by delegating to `FromStr`.
pub trait FromField: Sized {
    /// Name of the expected kind, used in error messages
    const KIND: &'static str;

    fn from_field(raw: &str) -> std::result::Result<Self, String>;
}

/// A struct decodable from a single wire object
pub trait Record: Default {
    /// Apply one wire field. Unknown field names are ignored.
    fn set_field(&mut self, name: &str, value: &str) -> std::result::Result<(), FieldError>;
}

/// A decode target for a whole reply
pub trait Unmarshal {
    fn unmarshal(&mut self, objects: &[FieldMap]) -> std::result::Result<(), DecodeError>;
}

/// Decode one object into `target`
///
/// Every field is attempted; all failures are reported together, sorted by
/// field name.
pub fn decode<T: Record + ?Sized>(
    fields: &FieldMap,
    target: &mut T,
) -> std::result::Result<(), DecodeError> {
    let mut errors = Vec::new();
    for (name, value) in fields {
        if let Err(e) = target.set_field(name, value) {
            errors.push(e);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        Err(DecodeError::Fields(errors))
    }
}

/// Decode a split reply into `target`, dispatching on the target's shape
pub fn unmarshal_response<T: Unmarshal + ?Sized>(
    objects: &[FieldMap],
    target: &mut T,
) -> std::result::Result<(), DecodeError> {
    target.unmarshal(objects)
}

/// Single record: decode only the first object
pub fn unmarshal_one<T: Record>(
    target: &mut T,
    objects: &[FieldMap],
) -> std::result::Result<(), DecodeError> {
    let first = objects.first().ok_or(DecodeError::EmptyResponse)?;
    let mut value = T::default();
    decode(first, &mut value)?;
    *target = value;
    Ok(())
}

fn decode_all<T: Record>(objects: &[FieldMap]) -> std::result::Result<Vec<T>, DecodeError> {
    objects
        .iter()
        .map(|fields| {
            let mut value = T::default();
            decode(fields, &mut value).map(|_| value)
        })
        .collect()
}

impl<T: Record> Unmarshal for Vec<T> {
    fn unmarshal(&mut self, objects: &[FieldMap]) -> std::result::Result<(), DecodeError> {
        let decoded = decode_all::<T>(objects)?;
        self.extend(decoded);
        Ok(())
    }
}

impl<T: Record, const N: usize> Unmarshal for [T; N] {
    fn unmarshal(&mut self, objects: &[FieldMap]) -> std::result::Result<(), DecodeError> {
        let take = objects.len().min(N);
        let decoded = decode_all::<T>(&objects[..take])?;
        for (slot, value) in self.iter_mut().zip(decoded) {
            *slot = value;
        }
        Ok(())
    }
}

impl<T: Record> Unmarshal for Option<T> {
    fn unmarshal(&mut self, objects: &[FieldMap]) -> std::result::Result<(), DecodeError> {
        if objects.is_empty() {
            *self = None;
            return Ok(());
        }
        let mut value = T::default();
        unmarshal_one(&mut value, objects)?;
        *self = Some(value);
        Ok(())
    }
}

impl Unmarshal for () {
    fn unmarshal(&mut self, _objects: &[FieldMap]) -> std::result::Result<(), DecodeError> {
        Ok(())
    }
}

// ============================================================================
// Weakly typed primitives
// ============================================================================

impl FromField for String {
    const KIND: &'static str = "string";

    fn from_field(raw: &str) -> std::result::Result<Self, String> {
        Ok(raw.to_string())
    }
}

impl FromField for bool {
    const KIND: &'static str = "bool";

    fn from_field(raw: &str) -> std::result::Result<Self, String> {
        match raw {
            "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" | "" => Ok(false),
            _ => Err("invalid syntax".to_string()),
        }
    }
}

/// Split an integer literal into sign, radix and digits
///
/// Accepts `0x`, `0o`, `0b` prefixes and a bare leading `0` for octal.
fn split_radix(raw: &str) -> (bool, u32, &str) {
    let (negative, rest) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };

    let lower = rest.get(..2).map(|p| p.to_ascii_lowercase());
    match lower.as_deref() {
        Some("0x") => (negative, 16, &rest[2..]),
        Some("0o") => (negative, 8, &rest[2..]),
        Some("0b") => (negative, 2, &rest[2..]),
        _ if rest.len() > 1 && rest.starts_with('0') => (negative, 8, &rest[1..]),
        _ => (negative, 10, rest),
    }
}

macro_rules! impl_from_field_signed {
    ($($t:ty),*) => {$(
        impl FromField for $t {
            const KIND: &'static str = "int";

            fn from_field(raw: &str) -> std::result::Result<Self, String> {
                if raw.is_empty() {
                    return Ok(0);
                }
                let (negative, radix, digits) = split_radix(raw);
                if digits.is_empty() || digits.starts_with(['+', '-']) {
                    return Err("invalid syntax".to_string());
                }
                let magnitude = i128::from_str_radix(digits, radix).map_err(|e| e.to_string())?;
                let value = if negative { -magnitude } else { magnitude };
                <$t>::try_from(value).map_err(|_| "value out of range".to_string())
            }
        }
    )*};
}

macro_rules! impl_from_field_unsigned {
    ($($t:ty),*) => {$(
        impl FromField for $t {
            const KIND: &'static str = "uint";

            fn from_field(raw: &str) -> std::result::Result<Self, String> {
                if raw.is_empty() {
                    return Ok(0);
                }
                let (negative, radix, digits) = split_radix(raw);
                if negative || digits.is_empty() || digits.starts_with(['+', '-']) {
                    return Err("invalid syntax".to_string());
                }
                <$t>::from_str_radix(digits, radix).map_err(|e| e.to_string())
            }
        }
    )*};
}

impl_from_field_signed!(i8, i16, i32, i64);
impl_from_field_unsigned!(u8, u16, u32, u64, usize);

macro_rules! impl_from_field_float {
    ($($t:ty),*) => {$(
        impl FromField for $t {
            const KIND: &'static str = "float";

            fn from_field(raw: &str) -> std::result::Result<Self, String> {
                if raw.is_empty() {
                    return Ok(0.0);
                }
                raw.parse::<$t>().map_err(|e| e.to_string())
            }
        }
    )*};
}

impl_from_field_float!(f32, f64);

impl<T: FromField> FromField for Option<T> {
    const KIND: &'static str = T::KIND;

    fn from_field(raw: &str) -> std::result::Result<Self, String> {
        if raw.is_empty() {
            Ok(None)
        } else {
            T::from_field(raw).map(Some)
        }
    }
}

/// Declare a struct decodable from wire objects
///
/// Each field names the wire key it is read from. The generated type derives
/// `Debug`, `Clone`, `Default` and `PartialEq` and implements [`Record`] and
/// [`Unmarshal`] (single record).
///
/// ```
/// squery_core::record! {
///     pub struct Version {
///         pub version: String => "version",
///         pub build: u64 => "build",
///         pub platform: String => "platform",
///     }
/// }
///
/// let objects = squery_core::split_response("version=3.13.7 build=1655727713 platform=Linux");
/// let mut v = Version::default();
/// squery_core::unmarshal_response(&objects, &mut v).unwrap();
/// assert_eq!(v.build, 1655727713);
/// ```
#[macro_export]
macro_rules! record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty => $wire:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::decode::Record for $name {
            fn set_field(
                &mut self,
                name: &str,
                value: &str,
            ) -> ::std::result::Result<(), $crate::error::FieldError> {
                match name {
                    $(
                        $wire => {
                            self.$field = <$ty as $crate::decode::FromField>::from_field(value)
                                .map_err(|reason| {
                                    $crate::error::FieldError::new(
                                        name,
                                        <$ty as $crate::decode::FromField>::KIND,
                                        value,
                                        reason,
                                    )
                                })?;
                        }
                    )*
                    _ => {}
                }
                Ok(())
            }
        }

        impl $crate::decode::Unmarshal for $name {
            fn unmarshal(
                &mut self,
                objects: &[$crate::response::FieldMap],
            ) -> ::std::result::Result<(), $crate::error::DecodeError> {
                $crate::decode::unmarshal_one(self, objects)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split_response;

    crate::record! {
        struct Tags {
            tag1: String => "Tag1",
            tag2: String => "Tag2",
        }
    }

    crate::record! {
        struct Typed {
            count: i32 => "count",
            big: u64 => "big",
            ratio: f32 => "ratio",
            flag: bool => "flag",
            name: String => "name",
        }
    }

    fn objects(pairs: &[&[(&str, &str)]]) -> Vec<FieldMap> {
        pairs
            .iter()
            .map(|obj| {
                obj.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_record_single() {
        let m = objects(&[&[("Tag1", "test1"), ("Tag2", "test2")]]);
        let mut have = Tags::default();
        unmarshal_response(&m, &mut have).unwrap();
        assert_eq!(have.tag1, "test1");
        assert_eq!(have.tag2, "test2");
    }

    #[test]
    fn test_record_uses_first_object_only() {
        let m = objects(&[&[("Tag1", "first")], &[("Tag1", "second")]]);
        let mut have = Tags::default();
        unmarshal_response(&m, &mut have).unwrap();
        assert_eq!(have.tag1, "first");
    }

    #[test]
    fn test_record_empty_response() {
        let mut have = Tags::default();
        let err = unmarshal_response(&[], &mut have).unwrap_err();
        assert_eq!(err, DecodeError::EmptyResponse);
    }

    #[test]
    fn test_weak_typing() {
        let m = split_response("count=-42 big=18446744073709551615 ratio=0.5 flag=1 name=a\\sb");
        let mut have = Typed::default();
        unmarshal_response(&m, &mut have).unwrap();
        assert_eq!(have.count, -42);
        assert_eq!(have.big, u64::MAX);
        assert_eq!(have.ratio, 0.5);
        assert!(have.flag);
        assert_eq!(have.name, "a b");
    }

    #[test]
    fn test_empty_values_are_zero() {
        let m = split_response("count= big= ratio= flag= name=");
        let mut have = Typed {
            count: 7,
            flag: true,
            ..Default::default()
        };
        unmarshal_response(&m, &mut have).unwrap();
        assert_eq!(have, Typed::default());
    }

    #[test]
    fn test_integer_prefixes() {
        assert_eq!(i32::from_field("0x10"), Ok(16));
        assert_eq!(i32::from_field("0b101"), Ok(5));
        assert_eq!(i32::from_field("0o17"), Ok(15));
        assert_eq!(i32::from_field("010"), Ok(8));
        assert_eq!(i32::from_field("0"), Ok(0));
        assert_eq!(i64::from_field("-0x10"), Ok(-16));
        assert!(u32::from_field("-1").is_err());
        assert!(i8::from_field("300").is_err());
        assert!(i32::from_field("--1").is_err());
    }

    #[test]
    fn test_bool_forms() {
        for t in ["1", "t", "T", "true", "TRUE", "True"] {
            assert_eq!(bool::from_field(t), Ok(true), "{}", t);
        }
        for f in ["0", "f", "F", "false", "FALSE", "False", ""] {
            assert_eq!(bool::from_field(f), Ok(false), "{}", f);
        }
        assert!(bool::from_field("yes").is_err());
    }

    #[test]
    fn test_all_field_errors_reported() {
        let m = split_response("count=abc flag=maybe name=ok");
        let mut have = Typed::default();
        let err = unmarshal_response(&m, &mut have).unwrap_err();
        match err {
            DecodeError::Fields(errors) => {
                assert_eq!(errors.len(), 2);
                assert_eq!(errors[0].field, "count");
                assert_eq!(errors[0].expected, "int");
                assert_eq!(errors[1].field, "flag");
                assert_eq!(errors[1].expected, "bool");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        // target untouched on failure
        assert_eq!(have, Typed::default());
    }

    #[test]
    fn test_array_of_two() {
        let m = objects(&[
            &[("Tag1", "test1_1"), ("Tag2", "test1_2")],
            &[("Tag1", "test2_1"), ("Tag2", "test2_2")],
        ]);
        let mut have: [Tags; 2] = Default::default();
        unmarshal_response(&m, &mut have).unwrap();
        assert_eq!(have[0].tag1, "test1_1");
        assert_eq!(have[1].tag2, "test2_2");
    }

    #[test]
    fn test_shorter_array_ignores_extra_objects() {
        let m = objects(&[
            &[("Tag1", "test1_1"), ("Tag2", "test1_2")],
            &[("Tag1", "test2_1"), ("Tag2", "test2_2")],
        ]);
        let mut have: [Tags; 1] = Default::default();
        unmarshal_response(&m, &mut have).unwrap();
        assert_eq!(have[0].tag1, "test1_1");
        assert_eq!(have[0].tag2, "test1_2");
    }

    #[test]
    fn test_longer_array_leaves_trailing_slots() {
        let m = objects(&[&[("Tag1", "only")]]);
        let mut have: [Tags; 2] = [
            Tags::default(),
            Tags {
                tag1: "keep".to_string(),
                tag2: "me".to_string(),
            },
        ];
        unmarshal_response(&m, &mut have).unwrap();
        assert_eq!(have[0].tag1, "only");
        assert_eq!(have[1].tag1, "keep");
    }

    #[test]
    fn test_vec_appends() {
        let m = objects(&[
            &[("Tag1", "test1_1"), ("Tag2", "test1_2")],
            &[("Tag1", "test2_1"), ("Tag2", "test2_2")],
        ]);
        let mut have = vec![Tags {
            tag1: "do not".to_string(),
            tag2: "override".to_string(),
        }];
        unmarshal_response(&m, &mut have).unwrap();
        assert_eq!(have.len(), 3);
        assert_eq!(have[0].tag1, "do not");
        assert_eq!(have[1].tag1, "test1_1");
        assert_eq!(have[2].tag2, "test2_2");
    }

    #[test]
    fn test_vec_error_leaves_content() {
        let m = split_response("count=1|count=x");
        let mut have: Vec<Typed> = Vec::new();
        assert!(unmarshal_response(&m, &mut have).is_err());
        assert!(have.is_empty());
    }

    #[test]
    fn test_option_target() {
        let mut have: Option<Tags> = Some(Tags::default());
        unmarshal_response(&[], &mut have).unwrap();
        assert!(have.is_none());

        let m = objects(&[&[("Tag1", "x")]]);
        unmarshal_response(&m, &mut have).unwrap();
        assert_eq!(have.unwrap().tag1, "x");
    }
}
