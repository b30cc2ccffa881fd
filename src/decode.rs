//! Mapping a decoded row onto a caller-supplied destination.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, FixedOffset, Utc};
use serde::de::DeserializeOwned;

use crate::datum::Datum;
use crate::error::{CursorError, Result};

/// A destination a row can be decoded into.
///
/// Implementations overwrite `self` completely, so a value already holding
/// data from an earlier row can be reused as the target of the next one.
/// A null row resets scalar destinations to their default.
pub trait Decodable {
    fn decode_from(&mut self, datum: Datum) -> Result<()>;
}

fn mismatch(datum: &Datum, target: &str) -> CursorError {
    CursorError::decode(format!("cannot decode {} into {target}", datum.kind()))
}

impl Decodable for Datum {
    fn decode_from(&mut self, datum: Datum) -> Result<()> {
        *self = datum;
        Ok(())
    }
}

impl Decodable for serde_json::Value {
    fn decode_from(&mut self, datum: Datum) -> Result<()> {
        *self = datum.into_json();
        Ok(())
    }
}

impl<T: Decodable + Default> Decodable for Option<T> {
    fn decode_from(&mut self, datum: Datum) -> Result<()> {
        if datum.is_null() {
            *self = None;
            return Ok(());
        }
        let mut value = self.take().unwrap_or_default();
        value.decode_from(datum)?;
        *self = Some(value);
        Ok(())
    }
}

impl Decodable for bool {
    fn decode_from(&mut self, datum: Datum) -> Result<()> {
        match datum {
            Datum::Null => *self = false,
            Datum::Bool(b) => *self = b,
            other => return Err(mismatch(&other, "bool")),
        }
        Ok(())
    }
}

impl Decodable for String {
    fn decode_from(&mut self, datum: Datum) -> Result<()> {
        match datum {
            Datum::Null => self.clear(),
            Datum::String(s) => *self = s,
            other => return Err(mismatch(&other, "string")),
        }
        Ok(())
    }
}

impl Decodable for f64 {
    fn decode_from(&mut self, datum: Datum) -> Result<()> {
        match datum {
            Datum::Null => *self = 0.0,
            Datum::Number(n) => {
                *self = n
                    .as_f64()
                    .ok_or_else(|| CursorError::decode(format!("number {n} is not a float")))?;
            }
            other => return Err(mismatch(&other, "f64")),
        }
        Ok(())
    }
}

impl Decodable for f32 {
    fn decode_from(&mut self, datum: Datum) -> Result<()> {
        let mut wide = 0.0f64;
        wide.decode_from(datum)?;
        *self = wide as f32;
        Ok(())
    }
}

/// Integer from a JSON number. The server stores numbers as doubles, so an
/// integral float like `3.0` is accepted.
fn as_integer(n: &serde_json::Number) -> Option<i128> {
    if let Some(i) = n.as_i64() {
        return Some(i128::from(i));
    }
    if let Some(u) = n.as_u64() {
        return Some(i128::from(u));
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && f.is_finite())
        .map(|f| f as i128)
}

macro_rules! decodable_int {
    ($($t:ty),*) => {
        $(
            impl Decodable for $t {
                fn decode_from(&mut self, datum: Datum) -> Result<()> {
                    match datum {
                        Datum::Null => *self = 0,
                        Datum::Number(n) => {
                            *self = as_integer(&n)
                                .and_then(|i| <$t>::try_from(i).ok())
                                .ok_or_else(|| CursorError::decode(format!(
                                    "number {n} does not fit in {}",
                                    stringify!($t)
                                )))?;
                        }
                        other => return Err(mismatch(&other, stringify!($t))),
                    }
                    Ok(())
                }
            }
        )*
    };
}

decodable_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl Decodable for DateTime<FixedOffset> {
    fn decode_from(&mut self, datum: Datum) -> Result<()> {
        match datum {
            Datum::Time(t) => *self = t,
            other => return Err(mismatch(&other, "time")),
        }
        Ok(())
    }
}

impl Decodable for DateTime<Utc> {
    fn decode_from(&mut self, datum: Datum) -> Result<()> {
        match datum {
            Datum::Time(t) => *self = t.with_timezone(&Utc),
            other => return Err(mismatch(&other, "time")),
        }
        Ok(())
    }
}

impl<T: Decodable + Default> Decodable for Vec<T> {
    fn decode_from(&mut self, datum: Datum) -> Result<()> {
        match datum {
            Datum::Null => self.clear(),
            Datum::Array(items) => {
                self.clear();
                self.reserve(items.len());
                for item in items {
                    let mut value = T::default();
                    value.decode_from(item)?;
                    self.push(value);
                }
            }
            other => return Err(mismatch(&other, "sequence")),
        }
        Ok(())
    }
}

impl<T: Decodable + Default> Decodable for BTreeMap<String, T> {
    fn decode_from(&mut self, datum: Datum) -> Result<()> {
        match datum {
            Datum::Null => self.clear(),
            Datum::Object(map) => {
                self.clear();
                for (k, v) in map {
                    let mut value = T::default();
                    value.decode_from(v)?;
                    self.insert(k, value);
                }
            }
            other => return Err(mismatch(&other, "map")),
        }
        Ok(())
    }
}

impl<T: Decodable + Default> Decodable for HashMap<String, T> {
    fn decode_from(&mut self, datum: Datum) -> Result<()> {
        let mut ordered: BTreeMap<String, T> = BTreeMap::new();
        ordered.decode_from(datum)?;
        self.clear();
        self.extend(ordered);
        Ok(())
    }
}

/// Decode any serde type by going through JSON.
///
/// ```ignore
/// #[derive(Deserialize, Default)]
/// struct User { id: u64, name: String }
///
/// let mut user = Json(User::default());
/// cursor.next(&mut user);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Json<T>(pub T);

impl<T: DeserializeOwned> Decodable for Json<T> {
    fn decode_from(&mut self, datum: Datum) -> Result<()> {
        self.0 = serde_json::from_value(datum.into_json())?;
        Ok(())
    }
}

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[test]
    fn null_resets_scalars() {
        let mut n = 5i64;
        n.decode_from(Datum::Null).unwrap();
        assert_eq!(n, 0);

        let mut s = String::from("stale");
        s.decode_from(Datum::Null).unwrap();
        assert!(s.is_empty());
    }

    #[test]
    fn option_distinguishes_null() {
        let mut v: Option<i32> = Some(1);
        v.decode_from(Datum::Null).unwrap();
        assert_eq!(v, None);
        v.decode_from(Datum::from(json!(7))).unwrap();
        assert_eq!(v, Some(7));
    }

    #[test]
    fn integers_accept_integral_floats() {
        let mut n = 0u8;
        n.decode_from(Datum::from(json!(3.0))).unwrap();
        assert_eq!(n, 3);
        assert!(n.decode_from(Datum::from(json!(3.5))).is_err());
        assert!(n.decode_from(Datum::from(json!(300))).is_err());
    }

    #[test]
    fn type_mismatch_is_a_decode_error() {
        let mut b = false;
        let err = b.decode_from(Datum::from(json!("yes"))).unwrap_err();
        assert_eq!(err, CursorError::Decode("cannot decode string into bool".into()));
    }

    #[test]
    fn vec_and_maps() {
        let mut v: Vec<i64> = vec![9, 9, 9, 9];
        v.decode_from(Datum::from(json!([1, 2]))).unwrap();
        assert_eq!(v, vec![1, 2]);

        let mut m: HashMap<String, String> = HashMap::new();
        m.decode_from(Datum::from(json!({"a": "x"}))).unwrap();
        assert_eq!(m.get("a").map(String::as_str), Some("x"));
    }

    #[test]
    fn time_into_utc() {
        let t = DateTime::parse_from_rfc3339("2020-01-01T02:00:00+02:00").unwrap();
        let mut utc = DateTime::<Utc>::default();
        utc.decode_from(Datum::Time(t)).unwrap();
        assert_eq!(utc.to_rfc3339(), "2020-01-01T00:00:00+00:00");
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct User {
        id: u64,
        name: String,
        created: Option<DateTime<FixedOffset>>,
    }

    #[test]
    fn json_wrapper_uses_serde() {
        let t = DateTime::parse_from_rfc3339("2020-01-01T00:00:00+00:00").unwrap();
        let mut row = BTreeMap::new();
        row.insert("id".to_string(), Datum::from(json!(1)));
        row.insert("name".to_string(), Datum::from(json!("ada")));
        row.insert("created".to_string(), Datum::Time(t));

        let mut user = Json(User::default());
        user.decode_from(Datum::Object(row)).unwrap();
        assert_eq!(
            user.into_inner(),
            User {
                id: 1,
                name: "ada".into(),
                created: Some(t)
            }
        );
    }
}
