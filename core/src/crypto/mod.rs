
pub mod types;
pub mod aead;
pub mod kdf;
pub mod nonce;
pub mod session;
pub mod keys;

pub use types::*;
pub use aead::*;
pub use kdf::*;
pub use nonce::*;
pub use session::*;
pub use keys::*;
