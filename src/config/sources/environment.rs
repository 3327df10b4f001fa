//! Environment source: `DRAFTLINE__SECTION__KEY=value`.

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::Environment;

const PREFIX: &str = "DRAFTLINE";
const SEPARATOR: &str = "__";

/// `DRAFTLINE__DISPATCH__BATCH_SIZE=10` sets `dispatch.batch_size`.
pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix(PREFIX)
            .prefix_separator(SEPARATOR)
            .separator(SEPARATOR)
            .try_parsing(true),
    )
}
