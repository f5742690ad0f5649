//! The Commit-Boost proxy-key generator and signing-root builder
//! (`spec.md` §4.4, §9 "Commit-Boost signing-root builder").

mod message;
mod proxy;

pub use message::{signing_root, ProxyKeyMessage};
pub use proxy::{generate_proxy, Error, ProxyKeyResult};
