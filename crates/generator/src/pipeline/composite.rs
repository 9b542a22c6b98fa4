//! String-keyed map literals promoted to model literals

use super::syntax::call_path;
use super::{RewriteContext, Rewriter, SyntaxNode};
use hemmer_provider_migrator_analyzer::naming::make_ident;
use hemmer_provider_migrator_analyzer::string_literal;
use syn::{Expr, FieldValue};

const MAP_CONSTRUCTORS: &[&str] = &["HashMap::from", "BTreeMap::from"];

/// `HashMap::from([("name", v), ("capacity", c)])` → `SkuModel { name: v, capacity: c }`
///
/// Only literals whose string keys form exactly one model's tag set are
/// promoted; entries with non-literal keys are dropped.
pub struct CompositeLiteral;

impl Rewriter for CompositeLiteral {
    fn name(&self) -> &'static str {
        "composite_literal"
    }

    fn try_apply(&self, node: SyntaxNode<'_>, cx: &mut RewriteContext<'_>) -> bool {
        let SyntaxNode::Expr(expr) = node else {
            return false;
        };
        let entries = match call_path(expr) {
            Some((path, call)) if is_map_constructor(&path) && call.args.len() == 1 => {
                let Expr::Array(array) = &call.args[0] else {
                    return false;
                };
                literal_entries(array.elems.iter())
            }
            _ => return false,
        };

        let Some(model) = cx.models.find_model_by_keys(entries.iter().map(|(k, _)| k.as_str()))
        else {
            return false;
        };

        let mut fields: Vec<FieldValue> = Vec::with_capacity(entries.len());
        for (tag, value) in &entries {
            let Some(field) = model.field_by_tag(tag) else {
                return false;
            };
            let member = make_ident(&field.name);
            fields.push(syn::parse_quote!(#member: #value));
        }
        let name = make_ident(&model.name);
        *expr = syn::parse_quote!(#name { #(#fields),* });
        true
    }
}

fn is_map_constructor(path: &str) -> bool {
    MAP_CONSTRUCTORS
        .iter()
        .any(|c| path == *c || path.ends_with(&format!("::{c}")))
}

/// `(key, value)` pairs whose key is a string literal
fn literal_entries<'e>(elems: impl Iterator<Item = &'e Expr>) -> Vec<(String, Expr)> {
    elems
        .filter_map(|elem| match elem {
            Expr::Tuple(tuple) if tuple.elems.len() == 2 => {
                let key = string_literal(&tuple.elems[0])?;
                Some((key, tuple.elems[1].clone()))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::PipelineState;
    use super::*;
    use hemmer_provider_migrator_analyzer::FunctionRole;
    use hemmer_provider_migrator_common::MigrationConfig;
    use std::collections::BTreeMap;
    use syn::{parse_quote, Block};

    fn rewrite(mut block: Block) -> Block {
        let config = MigrationConfig::default();
        let mut state = PipelineState::default();
        rewrite_block(
            CompositeLiteral,
            &mut block,
            &config,
            &scope("flatten_sku", FunctionRole::Helper),
            &BTreeMap::new(),
            &mut state,
        );
        block
    }

    #[test]
    fn test_exact_key_set_promoted() {
        let block = rewrite(parse_quote!({
            let sku = HashMap::from([
                ("capacity", input.capacity),
                ("name", input.name.to_string()),
                (dynamic_key, input.extra),
            ]);
            vec![std::collections::BTreeMap::from([("name", a), ("capacity", b)])]
        }));
        let expected: Block = parse_quote!({
            let sku = SkuModel {
                capacity: input.capacity,
                name: input.name.to_string()
            };
            vec![SkuModel { name: a, capacity: b }]
        });
        assert_eq!(render(&block), render(&expected));
    }

    #[test]
    fn test_partial_key_sets_untouched() {
        let original: Block = parse_quote!({
            let subset = HashMap::from([("name", a)]);
            let superset = HashMap::from([("name", a), ("capacity", b), ("extra", c)]);
            let empty = HashMap::from([]);
        });
        assert_eq!(render(&rewrite(original.clone())), render(&original));
    }
}
