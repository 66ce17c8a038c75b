//! UUID value generator.

use rand::Rng;
use sim_core::Value;
use uuid::Uuid;

/// Generate a random UUID v4 string using the provided RNG.
///
/// Drawing the bytes from the stream's RNG keeps seeded streams reproducible.
pub fn generate_uuid_v4<R: Rng>(rng: &mut R) -> Value {
    Value::String(random_uuid(rng).to_string())
}

pub(crate) fn random_uuid<R: Rng>(rng: &mut R) -> Uuid {
    let mut bytes = [0u8; 16];
    rng.fill(&mut bytes);

    bytes[6] = (bytes[6] & 0x0f) | 0x40; // Version 4
    bytes[8] = (bytes[8] & 0x3f) | 0x80; // Variant RFC 4122

    Uuid::from_bytes(bytes)
}
