use tracing::{debug, warn};

use crate::input::catalog::GeneCatalog;
use crate::model::gene::{GeneMatch, GeneRecord};

/// Ensembl-style identifiers are looked up by ID, anything else by name.
pub fn is_id_token(token: &str) -> bool {
    token
        .get(..3)
        .is_some_and(|p| p.eq_ignore_ascii_case("ENS"))
}

/// One output slot per token, in token order. IDs match by prefix so a
/// token without its version suffix finds the versioned record; names match
/// exactly, ignoring case.
pub fn resolve_genes(catalog: &dyn GeneCatalog, tokens: &[String]) -> Vec<GeneMatch> {
    tokens
        .iter()
        .map(|raw| {
            let token = raw.trim();
            if token.is_empty() {
                return GeneMatch::NotFound {
                    token: raw.clone(),
                };
            }
            let hits = if is_id_token(token) {
                catalog.by_id_prefix(token)
            } else {
                catalog.by_name_exact(token)
            };
            if hits.len() > 1 {
                debug!(
                    "gene token {token} matched {} records; using {}",
                    hits.len(),
                    hits[0].gene_id
                );
            }
            match hits.into_iter().next() {
                Some(gene) => GeneMatch::Found(gene),
                None => {
                    warn!("gene token {token} matched nothing");
                    GeneMatch::NotFound {
                        token: token.to_string(),
                    }
                }
            }
        })
        .collect()
}

/// Autocomplete: every record whose name starts with `prefix`.
pub fn search_gene_names(catalog: &dyn GeneCatalog, prefix: &str) -> Vec<GeneRecord> {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return Vec::new();
    }
    catalog.by_name_prefix(prefix)
}

#[cfg(test)]
#[path = "../../tests/src_inline/pipeline/stage1_resolve.rs"]
mod tests;
