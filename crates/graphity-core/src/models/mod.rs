pub mod form;
pub mod operation;
pub mod status_update;
pub mod template;

pub use form::{FormFile, FormItem, FormItemSet};
pub use operation::{Command, CreateType, Operation};
pub use status_update::StatusUpdate;
pub use template::{TemplateDefinition, TemplateField, TemplateFile};
