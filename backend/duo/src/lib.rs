pub mod client;
pub mod signer;
pub mod transport;
pub mod wire;

pub use client::{DuoClient, DuoSettings, SecondFactor};
pub use signer::{sign, sign_at, SignedRequest};
pub use transport::{AuthTransport, DuoError};
pub use wire::Outcome;
