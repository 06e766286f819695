pub mod has_permission;

pub use has_permission::{Permission, UserRole};
