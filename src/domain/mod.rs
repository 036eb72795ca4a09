pub mod entities;
pub mod providers;
pub mod value_objects;
