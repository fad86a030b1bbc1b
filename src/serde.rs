//! # Serde module for RegisterArray
//!
//! A `RegisterArray` is serialized as the tuple `(precision, registers)`, which makes
//! the register array of each key the unit of persistence for `StoreSnapshot`.
//!
//! During deserialization the tuple goes through `RegisterArray::from_registers`, so a
//! register count that does not match the precision, or a register above the maximum
//! rank, is rejected instead of producing an estimator that disagrees with fresh adds.
//!
//! Refer to the serde documentation for more details on custom serialization and deserialization:
//! - [Serialization](https://serde.rs/impl-serialize.html)
//! - [Deserialization](https://serde.rs/impl-deserialize.html)
use serde::de::Error;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Serialize};

use crate::registers::RegisterArray;

impl Serialize for RegisterArray {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&self.precision())?;
        tup.serialize_element(self.registers())?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for RegisterArray {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let (precision, registers): (u8, Vec<u8>) = Deserialize::deserialize(deserializer)?;
        RegisterArray::from_registers(precision, registers).map_err(D::Error::custom)
    }
}
