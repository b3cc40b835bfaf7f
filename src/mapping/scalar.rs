//! Scalar field conversions.
//!
//! Every scalar a shape can declare converts to a [`Value`] for storage and
//! back from the stored payload. Narrowing is checked: a stored 64-bit
//! integer only lands in an `i32` field when it fits.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::Value;

/// Scalar category recorded on value nodes as the type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    Bool,
    Int,
    Float,
    String,
    Date,
    DateTime,
}

impl ScalarType {
    /// Tag stored on a value node's type property.
    pub fn tag(self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int => "int",
            ScalarType::Float => "float",
            ScalarType::String => "string",
            ScalarType::Date => "date",
            ScalarType::DateTime => "datetime",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "bool" => ScalarType::Bool,
            "int" => ScalarType::Int,
            "float" => ScalarType::Float,
            "string" => ScalarType::String,
            "date" => ScalarType::Date,
            "datetime" => ScalarType::DateTime,
            _ => return None,
        })
    }

    /// Category of a runtime value; `None` for anything that cannot be a
    /// value-node payload.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(_) => Some(ScalarType::Bool),
            Value::Int(_) => Some(ScalarType::Int),
            Value::Float(_) => Some(ScalarType::Float),
            Value::String(_) => Some(ScalarType::String),
            Value::Date(_) => Some(ScalarType::Date),
            Value::DateTime(_) => Some(ScalarType::DateTime),
            _ => None,
        }
    }

    /// Convert a stored payload to this type when the store handed it back
    /// in another form: a date as text, an integer as a whole float.
    /// Returns `None` when the payload cannot be read as this type.
    pub fn coerce(self, value: &Value) -> Option<Value> {
        if ScalarType::of(value) == Some(self) {
            return Some(value.clone());
        }
        let coerced = match (self, value) {
            (ScalarType::Bool, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => return None,
            },
            (ScalarType::Int, Value::Float(f))
                if f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64 =>
            {
                Value::Int(*f as i64)
            }
            (ScalarType::Int, Value::String(s)) => Value::Int(s.trim().parse().ok()?),
            (ScalarType::Float, Value::Int(i)) => Value::Float(*i as f64),
            (ScalarType::Float, Value::String(s)) => Value::Float(s.trim().parse().ok()?),
            (ScalarType::String, Value::Bool(_) | Value::Int(_) | Value::Float(_)) => {
                Value::String(value.to_string())
            }
            (ScalarType::Date, Value::String(s)) => {
                Value::Date(NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()?)
            }
            (ScalarType::Date, Value::DateTime(dt)) => Value::Date(dt.date_naive()),
            (ScalarType::Date, Value::LocalDateTime(dt)) => Value::Date(dt.date()),
            (ScalarType::DateTime, Value::String(s)) => {
                Value::DateTime(DateTime::parse_from_rfc3339(s.trim()).ok()?.with_timezone(&Utc))
            }
            (ScalarType::DateTime, Value::Int(ms)) => Value::DateTime(DateTime::from_timestamp_millis(*ms)?),
            (ScalarType::DateTime, Value::LocalDateTime(dt)) => Value::DateTime(dt.and_utc()),
            _ => return None,
        };
        Some(coerced)
    }
}

/// A Rust type usable as a scalar property.
pub trait ScalarField: Sized + Send + Sync + 'static {
    const SCALAR_TYPE: ScalarType;

    /// Payload to store; `None` means the property is absent.
    fn to_value(&self) -> Option<Value>;

    /// Convert a stored payload, describing the mismatch on failure.
    fn from_value(value: &Value) -> Result<Self, String>;
}

fn mismatch(expected: &str, value: &Value) -> String {
    format!("expected {expected}, got {} {value}", value.type_name())
}

impl ScalarField for bool {
    const SCALAR_TYPE: ScalarType = ScalarType::Bool;

    fn to_value(&self) -> Option<Value> {
        Some(Value::Bool(*self))
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Bool(b) => Ok(*b),
            other => Err(mismatch("bool", other)),
        }
    }
}

impl ScalarField for i64 {
    const SCALAR_TYPE: ScalarType = ScalarType::Int;

    fn to_value(&self) -> Option<Value> {
        Some(Value::Int(*self))
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Int(i) => Ok(*i),
            other => Err(mismatch("integer", other)),
        }
    }
}

macro_rules! narrow_int {
    ($($ty:ty),*) => {$(
        impl ScalarField for $ty {
            const SCALAR_TYPE: ScalarType = ScalarType::Int;

            fn to_value(&self) -> Option<Value> {
                Some(Value::Int(i64::from(*self)))
            }

            fn from_value(value: &Value) -> Result<Self, String> {
                let wide = i64::from_value(value)?;
                <$ty>::try_from(wide)
                    .map_err(|_| format!("{wide} is out of range for {}", stringify!($ty)))
            }
        }
    )*};
}

narrow_int!(i8, i16, i32, u8, u16, u32);

impl ScalarField for f64 {
    const SCALAR_TYPE: ScalarType = ScalarType::Float;

    fn to_value(&self) -> Option<Value> {
        Some(Value::Float(*self))
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        value.as_float().ok_or_else(|| mismatch("float", value))
    }
}

impl ScalarField for f32 {
    const SCALAR_TYPE: ScalarType = ScalarType::Float;

    fn to_value(&self) -> Option<Value> {
        Some(Value::Float(f64::from(*self)))
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        let wide = f64::from_value(value)?;
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return Err(format!("{wide} is out of range for f32"));
        }
        Ok(wide as f32)
    }
}

impl ScalarField for String {
    const SCALAR_TYPE: ScalarType = ScalarType::String;

    fn to_value(&self) -> Option<Value> {
        Some(Value::String(self.clone()))
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::String(s) => Ok(s.clone()),
            other => Err(mismatch("string", other)),
        }
    }
}

impl ScalarField for NaiveDate {
    const SCALAR_TYPE: ScalarType = ScalarType::Date;

    fn to_value(&self) -> Option<Value> {
        Some(Value::Date(*self))
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Date(d) => Ok(*d),
            other => Err(mismatch("date", other)),
        }
    }
}

impl ScalarField for DateTime<Utc> {
    const SCALAR_TYPE: ScalarType = ScalarType::DateTime;

    fn to_value(&self) -> Option<Value> {
        Some(Value::DateTime(*self))
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::DateTime(d) => Ok(*d),
            other => Err(mismatch("datetime", other)),
        }
    }
}

impl<F: ScalarField> ScalarField for Option<F> {
    const SCALAR_TYPE: ScalarType = F::SCALAR_TYPE;

    fn to_value(&self) -> Option<Value> {
        self.as_ref().and_then(ScalarField::to_value)
    }

    fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(None),
            other => F::from_value(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_int_narrowing_is_checked() {
        assert_eq!(i32::from_value(&Value::Int(41)), Ok(41));
        assert!(i32::from_value(&Value::Int(i64::from(i32::MAX) + 1)).is_err());
        assert!(u8::from_value(&Value::Int(-1)).is_err());
        assert!(i32::from_value(&Value::from("41")).is_err());
    }

    #[test]
    fn test_float_widening() {
        assert_eq!(f64::from_value(&Value::Int(3)), Ok(3.0));
        assert_eq!(f32::from_value(&Value::Float(1.5)), Ok(1.5));
        assert!(f32::from_value(&Value::Float(1e300)).is_err());
    }

    #[test]
    fn test_option_maps_absent() {
        assert_eq!(None::<String>.to_value(), None);
        assert_eq!(Some(7i32).to_value(), Some(Value::Int(7)));
        assert_eq!(Option::<i32>::from_value(&Value::Null), Ok(None));
        assert_eq!(<Option<i32> as ScalarField>::SCALAR_TYPE, ScalarType::Int);
    }

    #[test]
    fn test_type_tags() {
        for ty in [ScalarType::Bool, ScalarType::Int, ScalarType::Float, ScalarType::String, ScalarType::Date, ScalarType::DateTime] {
            assert_eq!(ScalarType::from_tag(ty.tag()), Some(ty));
        }
        assert_eq!(ScalarType::of(&Value::from("x")), Some(ScalarType::String));
        assert_eq!(ScalarType::of(&Value::Null), None);
    }

    #[test]
    fn test_coerce_by_tag() {
        let day = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
        assert_eq!(ScalarType::Date.coerce(&Value::from("1990-01-01")), Some(Value::Date(day)));
        assert_eq!(ScalarType::Int.coerce(&Value::Float(42.0)), Some(Value::Int(42)));
        assert_eq!(ScalarType::Int.coerce(&Value::Float(42.5)), None);
        assert_eq!(ScalarType::Float.coerce(&Value::from("2.5")), Some(Value::Float(2.5)));
        assert_eq!(ScalarType::Bool.coerce(&Value::from("TRUE")), Some(Value::Bool(true)));
        assert_eq!(ScalarType::String.coerce(&Value::Int(7)), Some(Value::from("7")));
        assert_eq!(
            ScalarType::DateTime.coerce(&Value::from("2020-05-01T10:00:00Z")),
            Some(Value::DateTime(Utc.with_ymd_and_hms(2020, 5, 1, 10, 0, 0).unwrap()))
        );
        assert_eq!(ScalarType::DateTime.coerce(&Value::Int(0)), Some(Value::DateTime(DateTime::UNIX_EPOCH)));
        assert_eq!(ScalarType::Date.coerce(&Value::from("not a date")), None);
        assert_eq!(ScalarType::String.coerce(&Value::from("x")), Some(Value::from("x")));
    }
}
