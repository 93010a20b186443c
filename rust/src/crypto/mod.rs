//! Symmetric encryption of configuration secrets. `cipher` holds the AES
//! primitive and key material; `codec` is the operator-facing wrapper.

pub mod cipher;
pub mod codec;
