pub mod file;
pub mod provider;
pub mod provider_meta;

pub use file::{load_file, ConfigFile};
pub use provider::{check_provider_name_normalized, normalize_provider_name};
pub use provider_meta::{decode_provider_meta_block, ProviderMeta};
