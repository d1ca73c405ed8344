//! Form field identifiers recognised by the create pipeline.

/// Acting user.
pub const USER_ID: &str = "user_id";

/// Create type: `follow`, `status_update` or a template name.
pub const TYPE: &str = "type";

/// User to follow, required when the create type is `follow`.
pub const FOLLOW_TARGET: &str = "followed";

/// Status update template name.
pub const STATUS_UPDATE_TYPE: &str = "status_update_type";
