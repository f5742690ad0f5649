//! The delete/validator manager (`spec.md` §4.5, §4.8): coordinates the
//! registry, the slashing-protection store, and on-disk keystore files for
//! the key-manager API's add/delete operations.

mod add;
mod delete;

pub use add::{add_validator, AddValidatorRequest, Error as AddError};
pub use delete::{delete_validator, DeleteOutcome, DeleteStatus};
