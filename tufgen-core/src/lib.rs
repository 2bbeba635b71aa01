//! tufgen-core library exports

pub mod clock;
pub mod fixture;
pub mod keys;
pub mod metadata;
pub mod repository;

pub use clock::Clock;
pub use keys::store::KeyStore;
pub use keys::{KeyStoreError, PrivateKey, PublicKey, TufKey};
pub use repository::{Repository, RepositoryError};
