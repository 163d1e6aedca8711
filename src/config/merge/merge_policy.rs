//! Merge rules: defaults first, each later source overrides earlier ones key by key.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("endpoint.connect_timeout_ms", 10_000)?
        .set_default("endpoint.request_timeout_ms", 30_000)?
        .set_default("auth.enabled", true)?
        .set_default("auth.token_path", "/api/auth/convex/token")?
        .set_default("auth.token_ttl_ms", 10_000)?
        .set_default("query.server", true)?
        .set_default("query.subscribe", true)
}
