/// Application name
pub const APP_NAME: &str = "tessera";

/// Prefix used when generating names for anonymous modules
pub const DEFAULT_ANONYMOUS_PREFIX: &str = "anonymous";

/// Manifest key selecting a module factory
pub const MANIFEST_KIND_KEY: &str = "kind";

/// Manifest key declaring dependencies
pub const MANIFEST_DEPENDENCIES_KEY: &str = "dependencies";

/// Manifest key holding a module's value
pub const MANIFEST_VALUE_KEY: &str = "value";
