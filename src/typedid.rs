use std::fmt::{Debug, Display};
use std::marker::PhantomData;
use std::str::FromStr;

use mongodb::bson::Bson;
use serde::de::{self, Visitor};
use serde::{Deserialize, Serialize};

pub trait TypedIdMarker {
    fn tag() -> &'static str;
}

/// A store-assigned sequential id. Serializes as a bare number so the json
/// surface reads `"ID": 1`, but debug output carries the entity tag.
pub struct TypedId<T: TypedIdMarker>(u64, PhantomData<T>);

impl<T: TypedIdMarker> TypedId<T> {
    pub fn new(value: u64) -> TypedId<T> {
        TypedId(value, PhantomData)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl<T: TypedIdMarker> Copy for TypedId<T> {}

impl<T: TypedIdMarker> Clone for TypedId<T> {
    fn clone(&self) -> TypedId<T> {
        *self
    }
}

impl<T: TypedIdMarker> PartialEq for TypedId<T> {
    fn eq(&self, other: &TypedId<T>) -> bool {
        self.0 == other.0
    }
}

impl<T: TypedIdMarker> Eq for TypedId<T> {}

impl<T: TypedIdMarker> Display for TypedId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.0)
    }
}

impl<T: TypedIdMarker> Debug for TypedId<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}-{}", T::tag(), self.0)
    }
}

impl<T: TypedIdMarker> FromStr for TypedId<T> {
    type Err = TypedIdParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = match s.find('-') {
            Some(index) => {
                let (tag, id) = s.split_at(index);
                if tag != T::tag() {
                    return Err(TypedIdParseError::InvalidTag);
                }
                &id[1..]
            }
            None => s,
        };

        let value = u64::from_str(raw).map_err(|_| TypedIdParseError::InvalidNumber)?;
        if value == 0 {
            return Err(TypedIdParseError::InvalidNumber);
        }

        Ok(TypedId(value, PhantomData))
    }
}

impl<T: TypedIdMarker> Serialize for TypedId<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de, T: TypedIdMarker> Deserialize<'de> for TypedId<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_any(TypedIdVisitor(PhantomData))
    }
}

/// Accepts stored and json numbers as well as bare or tagged strings, so
/// path segments like `CPN-7` resolve the same as `7`.
struct TypedIdVisitor<T>(PhantomData<T>);

impl<'de, T: TypedIdMarker> Visitor<'de> for TypedIdVisitor<T> {
    type Value = TypedId<T>;

    fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "a positive id or a {}-tagged id", T::tag())
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<TypedId<T>, E> {
        if value == 0 {
            return Err(E::custom(TypedIdParseError::InvalidNumber));
        }
        Ok(TypedId(value, PhantomData))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<TypedId<T>, E> {
        let value =
            u64::try_from(value).map_err(|_| E::custom(TypedIdParseError::InvalidNumber))?;
        self.visit_u64(value)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<TypedId<T>, E> {
        TypedId::from_str(value).map_err(E::custom)
    }
}

impl<T: TypedIdMarker> From<TypedId<T>> for Bson {
    fn from(id: TypedId<T>) -> Bson {
        // ids are allocated from an i64 counter
        Bson::Int64(id.0 as i64)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypedIdParseError {
    InvalidTag,
    InvalidNumber,
}

impl Display for TypedIdParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        Debug::fmt(self, f)
    }
}
