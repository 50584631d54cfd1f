//! Symmetric primitives for the payload layer.
//!
//! This module is intentionally free of RSA and HTTP dependencies. It provides
//! the session key type and the AEAD encrypt/decrypt used by the engine.

pub mod cipher;

pub use cipher::{CipherError, SessionKey, KEY_LEN, NONCE_LEN, TAG_LEN};
