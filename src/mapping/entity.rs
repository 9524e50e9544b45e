//! Mapping targets
//!
//! `Entity` describes what the row mapper may do with a target type: which
//! members it can write, which constructors it can call, and how nested
//! result sets attach to it. Implementations are normally generated with
//! [`impl_entity!`](crate::impl_entity).

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::nested::NestedRows;
use crate::core::{MapperError, ParamBag, Result, Value, ValueKind};

/// Conversion out of a column value
pub trait FromValue: Sized {
    const KIND: ValueKind;

    /// Err carries the name of the offending value type
    fn from_value(value: Value) -> std::result::Result<Self, &'static str>;
}

macro_rules! from_value {
    ($($ty:ty => $kind:ident : $pat:pat => $out:expr),* $(,)?) => {
        $(
            impl FromValue for $ty {
                const KIND: ValueKind = ValueKind::$kind;

                fn from_value(value: Value) -> std::result::Result<Self, &'static str> {
                    let found = value.type_name();
                    let converted = match value.coerce(ValueKind::$kind)? {
                        $pat => $out,
                        _ => None,
                    };
                    converted.ok_or(found)
                }
            }
        )*
    };
}

from_value! {
    i64 => Integer: Value::Integer(v) => Some(v),
    i32 => Integer: Value::Integer(v) => i32::try_from(v).ok(),
    i16 => Integer: Value::Integer(v) => i16::try_from(v).ok(),
    u32 => Integer: Value::Integer(v) => u32::try_from(v).ok(),
    u64 => Integer: Value::Integer(v) => u64::try_from(v).ok(),
    f64 => Real: Value::Real(v) => Some(v),
    f32 => Real: Value::Real(v) => Some(v as f32),
    bool => Boolean: Value::Boolean(v) => Some(v),
    String => Text: Value::Text(v) => Some(v),
    Decimal => Numeric: Value::Numeric(v) => Some(v),
    NaiveDate => Date: Value::Date(v) => Some(v),
    NaiveDateTime => Timestamp: Value::Timestamp(v) => Some(v),
    DateTime<Utc> => TimestampTz: Value::TimestampTz(v) => Some(v),
    Uuid => Uuid: Value::Uuid(v) => Some(v),
    Vec<u8> => Bytea: Value::Bytea(v) => Some(v),
    Vec<Value> => List: Value::List(v) => Some(v),
    ParamBag => Object: Value::Object(v) => Some(v),
}

impl FromValue for Value {
    const KIND: ValueKind = ValueKind::Any;

    fn from_value(value: Value) -> std::result::Result<Self, &'static str> {
        Ok(value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn from_value(value: Value) -> std::result::Result<Self, &'static str> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

/// Writable member of an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    pub name: &'static str,
    pub kind: ValueKind,
}

pub trait Entity: Sized + Send + 'static {
    const TYPE_NAME: &'static str;

    /// A parameterless constructor exists
    const HAS_DEFAULT: bool;

    /// Single-column targets read the first column as a whole
    const SCALAR: Option<ValueKind> = None;

    /// Every column becomes a member, named by its result-map property or
    /// its column name
    const DYNAMIC: bool = false;

    fn members() -> &'static [Member] {
        &[]
    }

    /// Argument kinds of every non-default constructor
    fn constructors() -> &'static [&'static [ValueKind]] {
        &[]
    }

    fn new_default() -> Option<Self>;

    fn construct(signature: &[ValueKind], args: Vec<Value>) -> Result<Self> {
        let _ = args;
        Err(no_constructor(Self::TYPE_NAME, signature))
    }

    fn set_member(&mut self, member: &str, value: Value) -> Result<()> {
        let _ = (member, value);
        Ok(())
    }

    fn from_scalar(value: Value) -> Result<Self> {
        Err(MapperError::Conversion {
            target: Self::TYPE_NAME.to_string(),
            expected: "entity".to_string(),
            found: value.type_name().to_string(),
        })
    }

    /// Attach the result set bound to `property` of a multiple-result map
    fn fill_nested(&mut self, property: &str, rows: &mut NestedRows<'_>) -> Result<()> {
        let _ = (property, rows);
        Ok(())
    }
}

/// Convert `value` for `type_name.member`
pub fn convert<T: FromValue>(type_name: &str, member: &str, value: Value) -> Result<T> {
    T::from_value(value).map_err(|found| MapperError::Conversion {
        target: format!("{type_name}.{member}"),
        expected: T::KIND.to_string(),
        found: found.to_string(),
    })
}

/// Next positional constructor argument
pub fn take_arg<T: FromValue>(
    args: &mut std::vec::IntoIter<Value>,
    type_name: &str,
    name: &str,
) -> Result<T> {
    convert(type_name, name, args.next().unwrap_or(Value::Null))
}

#[must_use]
pub fn no_constructor(type_name: &str, signature: &[ValueKind]) -> MapperError {
    MapperError::NoMatchingConstructor {
        type_name: type_name.to_string(),
        signature: signature.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
    }
}

macro_rules! scalar_entity {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Entity for $ty {
                const TYPE_NAME: &'static str = stringify!($ty);
                const HAS_DEFAULT: bool = false;
                const SCALAR: Option<ValueKind> = Some(<$ty as FromValue>::KIND);

                fn new_default() -> Option<Self> {
                    None
                }

                fn from_scalar(value: Value) -> Result<Self> {
                    convert(Self::TYPE_NAME, "0", value)
                }
            }
        )*
    };
}

scalar_entity!(i64, i32, i16, u32, u64, f64, f32, bool, String, Decimal, NaiveDate, NaiveDateTime, DateTime<Utc>, Uuid, Value);

/// Dynamic row: one entry per column, in column order
impl Entity for ParamBag {
    const TYPE_NAME: &'static str = "ParamBag";
    const HAS_DEFAULT: bool = true;
    const DYNAMIC: bool = true;

    fn new_default() -> Option<Self> {
        Some(Self::new())
    }

    fn set_member(&mut self, member: &str, value: Value) -> Result<()> {
        self.insert(member, value);
        Ok(())
    }

    /// Nested sets become a list of row bags under `property`
    fn fill_nested(&mut self, property: &str, rows: &mut NestedRows<'_>) -> Result<()> {
        let nested: Vec<Self> = rows.many()?;
        self.insert(property, Value::List(nested.into_iter().map(Value::Object).collect()));
        Ok(())
    }
}

/// Implement [`Entity`](crate::mapping::Entity) for a struct
///
/// ```ignore
/// impl_entity!(Person { id: i64, name: String, email: Option<String> });
///
/// impl_entity!(Order { id: i64, total: Decimal }
///     constructors { (id: i64, total: Decimal) => Order::new(id, total) }
///     nested { items });
/// ```
///
/// The first form requires `Default`; the second only exposes the listed
/// constructors. `nested` names members filled from further result sets
/// (`Vec<T>` for many rows, `Option<T>` for one).
#[macro_export]
macro_rules! impl_entity {
    ($ty:ident { $($field:ident : $fty:ty),* $(,)? } $(nested { $($nfield:ident),* $(,)? })?) => {
        $crate::impl_entity!(@entity $ty, true, [Some(<$ty as ::std::default::Default>::default())],
            { $($field : $fty),* }, [], [$($($nfield),*)?]);
    };
    ($ty:ident { $($field:ident : $fty:ty),* $(,)? }
        constructors { $( ( $($arg:ident : $aty:ty),* ) => $body:expr );+ $(;)? }
        $(nested { $($nfield:ident),* $(,)? })?) => {
        $crate::impl_entity!(@entity $ty, false, [None],
            { $($field : $fty),* }, [ $( ( $($arg : $aty),* ) => $body );+ ], [$($($nfield),*)?]);
    };
    (@entity $ty:ident, $has_default:expr, [$default:expr], { $($field:ident : $fty:ty),* },
        [ $( ( $($arg:ident : $aty:ty),* ) => $body:expr );* ], [$($nfield:ident),*]) => {
        impl $crate::mapping::Entity for $ty {
            const TYPE_NAME: &'static str = stringify!($ty);
            const HAS_DEFAULT: bool = $has_default;

            fn members() -> &'static [$crate::mapping::Member] {
                const MEMBERS: &[$crate::mapping::Member] = &[
                    $($crate::mapping::Member {
                        name: stringify!($field),
                        kind: <$fty as $crate::mapping::FromValue>::KIND,
                    },)*
                ];
                MEMBERS
            }

            fn constructors() -> &'static [&'static [$crate::core::ValueKind]] {
                const CONSTRUCTORS: &[&[$crate::core::ValueKind]] = &[
                    $(&[$(<$aty as $crate::mapping::FromValue>::KIND),*],)*
                ];
                CONSTRUCTORS
            }

            fn new_default() -> Option<Self> {
                $default
            }

            #[allow(unused_variables, unused_mut)]
            fn construct(
                signature: &[$crate::core::ValueKind],
                args: Vec<$crate::core::Value>,
            ) -> $crate::core::Result<Self> {
                $({
                    const SIGNATURE: &[$crate::core::ValueKind] =
                        &[$(<$aty as $crate::mapping::FromValue>::KIND),*];
                    if signature == SIGNATURE {
                        let mut args = args.into_iter();
                        $(let $arg: $aty = $crate::mapping::entity::take_arg(
                            &mut args, stringify!($ty), stringify!($arg))?;)*
                        return Ok($body);
                    }
                })*
                Err($crate::mapping::entity::no_constructor(stringify!($ty), signature))
            }

            fn set_member(&mut self, member: &str, value: $crate::core::Value) -> $crate::core::Result<()> {
                match member {
                    $(stringify!($field) => {
                        self.$field = $crate::mapping::entity::convert(stringify!($ty), member, value)?;
                    })*
                    _ => {}
                }
                Ok(())
            }

            #[allow(unused_variables)]
            fn fill_nested(
                &mut self,
                property: &str,
                rows: &mut $crate::mapping::NestedRows<'_>,
            ) -> $crate::core::Result<()> {
                match property {
                    $(stringify!($nfield) => {
                        self.$nfield = $crate::mapping::NestedField::read(rows)?;
                    })*
                    _ => {}
                }
                Ok(())
            }
        }
    };
}
