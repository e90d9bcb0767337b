use std::collections::BTreeMap;

use dcl::diagnostic::{Diagnostic, Diagnostics};
use dcl::Document;

use crate::provider_meta::{decode_provider_meta_block, ProviderMeta};

/// Everything loaded from one configuration document.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    /// Decoded provider_meta blocks, keyed by provider name.
    pub provider_metas: BTreeMap<String, ProviderMeta>,
    pub source_id: usize,
}

/// Load a parsed document.
///
/// Every block is visited even after a failure, so the diagnostics cover
/// the whole file in one pass and the returned `ConfigFile` holds whatever
/// decoded cleanly.
pub fn load_file(doc: Document) -> (ConfigFile, Diagnostics) {
    let mut diags = Diagnostics::new();
    let mut provider_metas: BTreeMap<String, ProviderMeta> = BTreeMap::new();
    let file_id = doc.source_id;

    for attr in &doc.body.attributes {
        diags.push(Diagnostic::error(
            format!("unexpected top-level attribute \"{}\"", attr.name),
            attr.name_range.clone(),
            file_id,
        ));
    }

    for block in doc.body.blocks {
        match block.block_type.as_str() {
            "provider_meta" => match decode_provider_meta_block(block, file_id) {
                Ok((meta, warnings)) => {
                    diags.extend(warnings);
                    if let Some(first) = provider_metas.get(&meta.provider) {
                        let first_range = first.decl_range.clone();
                        diags.push(
                            Diagnostic::error(
                                format!(
                                    "duplicate provider_meta block for provider \"{}\"",
                                    meta.provider
                                ),
                                meta.decl_range.clone(),
                                file_id,
                            )
                            .with_related(
                                "the first block for this provider is kept",
                                first_range,
                                file_id,
                            ),
                        );
                    } else {
                        provider_metas.insert(meta.provider.clone(), meta);
                    }
                }
                Err(errors) => diags.extend(errors),
            },
            other => {
                diags.push(Diagnostic::error(
                    format!("blocks of type \"{}\" are not expected here", other),
                    block.def_range.clone(),
                    file_id,
                ));
            }
        }
    }

    (
        ConfigFile {
            provider_metas,
            source_id: file_id,
        },
        diags,
    )
}
