//! Bincode value encoding.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::SerializationError;

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, SerializationError> {
    bincode::serialize(value).map_err(|e| SerializationError {
        message: e.to_string(),
    })
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, SerializationError> {
    bincode::deserialize(bytes).map_err(|e| SerializationError {
        message: e.to_string(),
    })
}
