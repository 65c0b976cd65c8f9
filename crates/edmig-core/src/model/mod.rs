pub mod document;
pub mod editable;
pub mod mapping;
pub mod user;

pub use document::{DocumentHandle, DocumentId, DocumentKind};
pub use editable::{BlockFrame, EditableName, EditablePosition};
pub use mapping::{NameMapping, Rename};
pub use user::User;
