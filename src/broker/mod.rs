//! URL State Broker: the single writer and reader of the
//! browser address bar.

mod broker;
mod navigation;

pub use broker::{SetParamsOptions, UrlStateBroker};
pub use navigation::NavigationBackend;
