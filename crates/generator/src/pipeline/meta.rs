//! Client access through the synthetic `meta` variable

use super::syntax::strip_parens;
use super::{RewriteContext, Rewriter, SyntaxNode};
use hemmer_provider_migrator_analyzer::naming::make_ident;
use syn::{Expr, GenericArgument, Type};

/// `meta.downcast_ref::<Client>().unwrap().redis` → `meta.client.redis`
pub struct MetaAccess;

impl Rewriter for MetaAccess {
    fn name(&self) -> &'static str {
        "meta"
    }

    fn try_apply(&self, node: SyntaxNode<'_>, cx: &mut RewriteContext<'_>) -> bool {
        let SyntaxNode::Expr(Expr::Field(field)) = node else {
            return false;
        };
        if !is_client_downcast(&field.base, &cx.config.client_type) {
            return false;
        }
        let meta = make_ident(&cx.config.meta_var);
        *field.base = syn::parse_quote!(#meta.client);
        true
    }
}

/// `x.downcast_ref::<Client>()` followed by `.unwrap()`, `.expect(..)` or `?`
fn is_client_downcast(expr: &Expr, client: &str) -> bool {
    match strip_parens(expr) {
        Expr::Try(inner) => is_client_downcast(&inner.expr, client),
        Expr::MethodCall(call) if call.method == "unwrap" || call.method == "expect" => {
            is_client_downcast(&call.receiver, client)
        }
        Expr::MethodCall(call) if call.method == "downcast_ref" => {
            let Some(turbofish) = &call.turbofish else {
                return false;
            };
            matches!(
                turbofish.args.first(),
                Some(GenericArgument::Type(Type::Path(ty)))
                    if ty.path.segments.last().is_some_and(|s| s.ident == client)
            )
        }
        _ => false,
    }
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
            MetaAccess,
            &mut block,
            &config,
            &scope("resource_widget_create", FunctionRole::Create),
            &BTreeMap::new(),
            &mut state,
        );
        block
    }

    #[test]
    fn test_downcast_field_access() {
        let block = rewrite(parse_quote!({
            let client = meta.downcast_ref::<Client>().unwrap().redis.caches.clone();
            let subscription = (meta.downcast_ref::<clients::Client>()?).account.subscription_id;
            let other = meta.downcast_ref::<Client>().expect("client").storage;
        }));
        let expected: Block = parse_quote!({
            let client = meta.client.redis.caches.clone();
            let subscription = meta.client.account.subscription_id;
            let other = meta.client.storage;
        });
        assert_eq!(render(&block), render(&expected));
    }

    #[test]
    fn test_other_downcasts_untouched() {
        let original: Block = parse_quote!({
            let client = meta.downcast_ref::<Client>().unwrap();
            let other = meta.downcast_ref::<Settings>().unwrap().redis;
        });
        let block = rewrite(original.clone());
        assert_eq!(render(&block), render(&original));
    }
}
