//! Canonical feature model.

pub mod feature;

pub use feature::{
    Browser, BrowserImpl, BrowserStatus, BaselineStatus, BaselineStatusValue, Docs, Feature,
    MdnDoc,
};
