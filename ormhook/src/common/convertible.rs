use crate::common::Value;
use crate::errors::{ErrorKind, OrmError, OrmResult};
use chrono::{DateTime, Utc};

/// Conversion between a model field type and the [`Value`] stored in a row column.
///
/// Implemented here for the primitive field types; `#[derive(Model)]` uses it for every
/// column of a model.
pub trait Convertible {
    type Output;

    fn to_value(&self) -> OrmResult<Value>;
    fn from_value(value: &Value) -> OrmResult<Self::Output>;
}

fn mapping_error(value: &Value, expected: &str) -> OrmError {
    log::error!("Value {:?} is not {}", value, expected);
    OrmError::new(
        &format!("Value is not {}", expected),
        ErrorKind::ObjectMappingError,
    )
}

macro_rules! impl_convertible_for_signed {
    ($($t:ty => $name:literal),*) => {
        $(
            impl Convertible for $t {
                type Output = $t;

                fn to_value(&self) -> OrmResult<Value> {
                    Ok(Value::I64(*self as i64))
                }

                fn from_value(value: &Value) -> OrmResult<Self> {
                    value
                        .as_integer()
                        .and_then(|v| <$t>::try_from(v).ok())
                        .ok_or_else(|| mapping_error(value, $name))
                }
            }
        )*
    };
}

macro_rules! impl_convertible_for_unsigned {
    ($($t:ty => $name:literal),*) => {
        $(
            impl Convertible for $t {
                type Output = $t;

                fn to_value(&self) -> OrmResult<Value> {
                    Ok(Value::U64(*self as u64))
                }

                fn from_value(value: &Value) -> OrmResult<Self> {
                    value
                        .as_integer()
                        .and_then(|v| <$t>::try_from(v).ok())
                        .ok_or_else(|| mapping_error(value, $name))
                }
            }
        )*
    };
}

impl_convertible_for_signed!(i8 => "an i8", i16 => "an i16", i32 => "an i32", i64 => "an i64");
impl_convertible_for_unsigned!(u8 => "a u8", u16 => "a u16", u32 => "a u32", u64 => "a u64");

impl Convertible for f32 {
    type Output = f32;

    fn to_value(&self) -> OrmResult<Value> {
        Ok(Value::F64(*self as f64))
    }

    fn from_value(value: &Value) -> OrmResult<Self> {
        value
            .as_f64()
            .map(|v| v as f32)
            .ok_or_else(|| mapping_error(value, "an f32"))
    }
}

impl Convertible for f64 {
    type Output = f64;

    fn to_value(&self) -> OrmResult<Value> {
        Ok(Value::F64(*self))
    }

    fn from_value(value: &Value) -> OrmResult<Self> {
        value.as_f64().ok_or_else(|| mapping_error(value, "an f64"))
    }
}

impl Convertible for bool {
    type Output = bool;

    fn to_value(&self) -> OrmResult<Value> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: &Value) -> OrmResult<Self> {
        value.as_bool().ok_or_else(|| mapping_error(value, "a bool"))
    }
}

impl Convertible for String {
    type Output = String;

    fn to_value(&self) -> OrmResult<Value> {
        Ok(Value::String(self.clone()))
    }

    fn from_value(value: &Value) -> OrmResult<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mapping_error(value, "a string"))
    }
}

impl Convertible for DateTime<Utc> {
    type Output = DateTime<Utc>;

    fn to_value(&self) -> OrmResult<Value> {
        Ok(Value::DateTime(*self))
    }

    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::DateTime(v) => Ok(*v),
            Value::String(s) => DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|_| mapping_error(value, "an RFC 3339 timestamp")),
            _ => Err(mapping_error(value, "a timestamp")),
        }
    }
}

impl<T: Convertible> Convertible for Option<T> {
    type Output = Option<T::Output>;

    fn to_value(&self) -> OrmResult<Value> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: &Value) -> OrmResult<Self::Output> {
        match value {
            Value::Null => Ok(None),
            _ => Ok(Some(T::from_value(value)?)),
        }
    }
}

impl<T: Convertible> Convertible for Vec<T> {
    type Output = Vec<T::Output>;

    fn to_value(&self) -> OrmResult<Value> {
        let mut array = Vec::with_capacity(self.len());
        for item in self {
            array.push(item.to_value()?);
        }
        Ok(Value::Array(array))
    }

    fn from_value(value: &Value) -> OrmResult<Self::Output> {
        match value {
            Value::Array(items) => items.iter().map(T::from_value).collect(),
            _ => Err(mapping_error(value, "an array")),
        }
    }
}

impl Convertible for Value {
    type Output = Value;

    fn to_value(&self) -> OrmResult<Value> {
        Ok(self.clone())
    }

    fn from_value(value: &Value) -> OrmResult<Self> {
        Ok(value.clone())
    }
}

pub fn from_value<T>(value: &Value) -> OrmResult<T::Output>
where
    T: Convertible,
{
    T::from_value(value)
}

pub fn to_value<T>(data: &T) -> OrmResult<Value>
where
    T: Convertible,
{
    data.to_value()
}
