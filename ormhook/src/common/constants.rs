// model constants
pub const DEFAULT_TABLE_NAME: &str = "model";
pub const DEFAULT_PRIMARY_KEY: &str = "id";

// signal names
pub const PRE_SAVE: &str = "pre_save";
pub const POST_SAVE: &str = "post_save";
pub const PRE_DELETE: &str = "pre_delete";
pub const POST_DELETE: &str = "post_delete";

// signal context keys
pub const CREATED: &str = "created";

// configuration
pub const ENV_DATABASE_URL: &str = "ORMHOOK_DATABASE_URL";
pub const ENV_READ_REPLICAS: &str = "ORMHOOK_READ_REPLICAS";
pub const MEMORY_SCHEME: &str = "memory";
pub const REPLICA_OF_PARAM: &str = "replica_of";
