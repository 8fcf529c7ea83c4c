mod minijinja;

pub use self::minijinja::{Engine, Template};

/// Values made available to a template while it renders.
pub type Locals = rustc_hash::FxHashMap<String, serde_json::Value>;
