//! Environment source: LIVEQUERY_<SECTION>__<KEY>, e.g. LIVEQUERY_ENDPOINT__URL.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("LIVEQUERY")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
