//! "Already exists" errors become import requirements

use super::syntax::{call_path, strip_id_call};
use super::{RewriteContext, Rewriter, SyntaxNode};
use hemmer_provider_migrator_analyzer::naming::make_ident;
use syn::Expr;

/// `tf::import_as_exists_error("azurerm_x", id.id())` →
/// `meta.resource_requires_import(self.resource_type(), id)`
pub struct ImportGuard;

impl Rewriter for ImportGuard {
    fn name(&self) -> &'static str {
        "import_guard"
    }

    fn try_apply(&self, node: SyntaxNode<'_>, cx: &mut RewriteContext<'_>) -> bool {
        let SyntaxNode::Expr(expr) = node else {
            return false;
        };
        let id = match call_path(expr) {
            Some((path, call)) if path == cx.config.import_guard && call.args.len() == 2 => {
                strip_id_call(&call.args[1])
            }
            _ => return false,
        };
        let meta = make_ident(&cx.config.meta_var);
        *expr = syn::parse_quote!(#meta.resource_requires_import(self.resource_type(), #id));
        true
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

    #[test]
    fn test_import_guard() {
        let config = MigrationConfig::default();
        let mut state = PipelineState::default();
        let mut block: Block = parse_quote!({
            if existing.is_some() {
                return Err(tf::import_as_exists_error("azurerm_widget", id.id()));
            }
            let other = errors::import_as_exists_error("azurerm_widget", id.id());
        });
        rewrite_block(
            ImportGuard,
            &mut block,
            &config,
            &scope("resource_widget_create", FunctionRole::Create),
            &BTreeMap::new(),
            &mut state,
        );
        let expected: Block = parse_quote!({
            if existing.is_some() {
                return Err(meta.resource_requires_import(self.resource_type(), id));
            }
            let other = errors::import_as_exists_error("azurerm_widget", id.id());
        });
        assert_eq!(render(&block), render(&expected));
    }
}
