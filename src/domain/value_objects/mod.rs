pub mod client_identity;
pub mod language_range;
pub mod locale;

pub use client_identity::*;
pub use language_range::*;
pub use locale::*;
