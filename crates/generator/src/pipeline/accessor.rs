//! Reads and writes through the untyped state accessor

use super::syntax::{
    model_access, path_expr, resource_data, root_ident, strip_deref, strip_parens,
};
use super::{RewriteContext, Rewriter, SyntaxNode};
use hemmer_provider_migrator_analyzer::string_literal;
use quote::ToTokens;
use syn::{Expr, ExprMethodCall, Pat, Stmt};

/// Accessor methods whose receiver moves to `meta.resource_data`
const STATE_METHODS: &[&str] = &[
    "get_ok",
    "id",
    "has_change",
    "has_changes",
    "get_change",
    "get_raw_config",
];

/// `d.get("sku.0.name")` → `model.sku[0].name`; `d.get_ok(..)` and
/// `d.id()` keep their call but read from `meta.resource_data`
pub struct AccessorGet;

impl Rewriter for AccessorGet {
    fn name(&self) -> &'static str {
        "accessor_get"
    }

    fn try_apply(&self, node: SyntaxNode<'_>, cx: &mut RewriteContext<'_>) -> bool {
        let SyntaxNode::Expr(expr) = node else {
            return false;
        };
        let Expr::MethodCall(call) = &mut *expr else {
            return false;
        };
        if !cx.is_accessor(&call.receiver) {
            return false;
        }

        let method = call.method.to_string();
        if STATE_METHODS.contains(&method.as_str()) {
            *call.receiver = resource_data(&cx.config.meta_var);
            return true;
        }
        if method != "get" || call.args.len() != 1 {
            return false;
        }

        let Some(tag) = string_literal(&call.args[0]) else {
            cx.unresolved(format!(
                "state key `{}` is not a string literal",
                call.args[0].to_token_stream()
            ));
            return false;
        };
        let models = cx.models;
        let Some(steps) = models.resolve_tag_path("", &tag) else {
            cx.unresolved(format!("tag `{tag}` not found on {}", models.top_name()));
            return false;
        };
        *expr = model_access(&cx.function.var_model, &steps);
        true
    }
}

/// `d.set("key", value)` statements → `model.field = value;`
///
/// Bare, `?`-propagated, `let _ =`-discarded and `if let Err(..) = ..`
/// guarded writes are all reduced to the plain assignment.
pub struct AccessorSet;

impl Rewriter for AccessorSet {
    fn name(&self) -> &'static str {
        "accessor_set"
    }

    fn try_apply(&self, node: SyntaxNode<'_>, cx: &mut RewriteContext<'_>) -> bool {
        let SyntaxNode::Stmt(stmt) = node else {
            return false;
        };
        let Some(call) = set_statement(stmt, cx) else {
            return false;
        };
        if call.args.len() != 2 {
            return false;
        }

        let Some(tag) = string_literal(&call.args[0]) else {
            cx.unresolved(format!(
                "state key `{}` is not a string literal",
                call.args[0].to_token_stream()
            ));
            return false;
        };
        let models = cx.models;
        let Some(steps) = models.resolve_tag_path("", &tag) else {
            cx.unresolved(format!("tag `{tag}` not found on {}", models.top_name()));
            return false;
        };

        let target = model_access(&cx.function.var_model, &steps);
        let value = owned_value(&call.args[1], cx);
        *stmt = syn::parse_quote!(#target = #value;);
        true
    }
}

/// The `set` call of a write statement, in any of its accepted forms
fn set_statement<'s>(stmt: &'s Stmt, cx: &RewriteContext<'_>) -> Option<&'s ExprMethodCall> {
    match stmt {
        Stmt::Expr(Expr::If(guard), _) if guard.else_branch.is_none() => {
            let Expr::Let(binding) = strip_parens(&guard.cond) else {
                return None;
            };
            let is_err_pattern = matches!(
                &*binding.pat,
                Pat::TupleStruct(p) if p.path.is_ident("Err")
            );
            if !is_err_pattern {
                return None;
            }
            set_call(&binding.expr, cx)
        }
        Stmt::Expr(expr, Some(_)) => set_call(expr, cx),
        Stmt::Local(local) if matches!(local.pat, Pat::Wild(_)) => {
            let init = local.init.as_ref()?;
            if init.diverge.is_some() {
                return None;
            }
            set_call(&init.expr, cx)
        }
        _ => None,
    }
}

/// `d.set(..)`, `d.set(..)?` or `d.set(..).map_err(..)?`
fn set_call<'e>(expr: &'e Expr, cx: &RewriteContext<'_>) -> Option<&'e ExprMethodCall> {
    match strip_parens(expr) {
        Expr::Try(inner) => set_call(&inner.expr, cx),
        Expr::MethodCall(call) if call.method == "map_err" => set_call(&call.receiver, cx),
        Expr::MethodCall(call) if call.method == "set" && cx.is_accessor(&call.receiver) => {
            Some(call)
        }
        _ => None,
    }
}

/// Field accesses on API values are optional; wrap them in `pointer::from`
fn owned_value(value: &Expr, cx: &RewriteContext<'_>) -> Expr {
    let stripped = strip_deref(value);
    let Expr::Field(_) = stripped else {
        return value.clone();
    };
    if root_ident(stripped).is_some_and(|root| cx.config.is_identity_var(&root.to_string())) {
        return value.clone();
    }
    match path_expr(&cx.config.pointer_from) {
        Some(pointer) => syn::parse_quote!(#pointer(#stripped)),
        None => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{FunctionScope, PipelineState};
    use super::*;
    use hemmer_provider_migrator_analyzer::FunctionRole;
    use hemmer_provider_migrator_common::MigrationConfig;
    use std::collections::BTreeMap;
    use syn::{parse_quote, Block};

    fn rewrite(
        rewriter: impl Rewriter + 'static,
        mut block: Block,
        scope: &FunctionScope,
    ) -> (Block, PipelineState) {
        let config = MigrationConfig::default();
        let mut state = PipelineState::default();
        rewrite_block(rewriter, &mut block, &config, scope, &BTreeMap::new(), &mut state);
        (block, state)
    }

    fn read_scope() -> FunctionScope {
        scope("resource_widget_read", FunctionRole::Read)
    }

    #[test]
    fn test_get_top_level_field() {
        let (block, state) = rewrite(
            AccessorGet,
            parse_quote!({
                let v = d.get::<String>("name");
                let other = compute(1);
            }),
            &read_scope(),
        );
        let expected: Block = parse_quote!({
            let v = model.name;
            let other = compute(1);
        });
        assert_eq!(render(&block), render(&expected));
        assert!(state.unresolved().is_empty());
    }

    #[test]
    fn test_get_nested_path_and_state_methods() {
        let (block, _) = rewrite(
            AccessorGet,
            parse_quote!({
                let capacity = d.get("sku.0.capacity");
                let id = WidgetId::parse(&d.id())?;
                if let Some(port) = d.get_ok("port") {
                    use_port(port);
                }
            }),
            &read_scope(),
        );
        let expected: Block = parse_quote!({
            let capacity = model.sku[0].capacity;
            let id = WidgetId::parse(&meta.resource_data.id())?;
            if let Some(port) = meta.resource_data.get_ok("port") {
                use_port(port);
            }
        });
        assert_eq!(render(&block), render(&expected));
    }

    #[test]
    fn test_get_unknown_tag_left_and_recorded() {
        let original: Block = parse_quote!({
            let v = d.get("missing");
        });
        let (block, state) = rewrite(AccessorGet, original.clone(), &read_scope());
        assert_eq!(render(&block), render(&original));
        assert_eq!(state.unresolved().len(), 1);
        assert!(state.unresolved()[0].contains("missing"));
    }

    #[test]
    fn test_get_in_helper_uses_accessor_name() {
        let helper = FunctionScope {
            name: "expand_sku".to_string(),
            role: FunctionRole::Helper,
            var_model: "input".to_string(),
            accessor: Some("input".to_string()),
        };
        let (block, _) = rewrite(
            AccessorGet,
            parse_quote!({
                let sku = input.get("sku");
            }),
            &helper,
        );
        let expected: Block = parse_quote!({
            let sku = input.sku;
        });
        assert_eq!(render(&block), render(&expected));
    }

    #[test]
    fn test_guarded_set_with_deref() {
        let (block, _) = rewrite(
            AccessorSet,
            parse_quote!({
                if let Err(e) = d.set("location", *props.location) {
                    return Err(e);
                }
            }),
            &read_scope(),
        );
        let expected: Block = parse_quote!({
            model.location = pointer::from(props.location);
        });
        assert_eq!(render(&block), render(&expected));
    }

    #[test]
    fn test_set_statement_forms() {
        let (block, state) = rewrite(
            AccessorSet,
            parse_quote!({
                d.set("name", id.name.clone());
                d.set("port", props.port.unwrap())?;
                let _ = d.set("zones", zones::flatten_untyped(resp.zones));
                d.set("sku", flatten_sku(&props.sku)).map_err(|e| Error::from(e))?;
                d.set("location", id.location);
            }),
            &read_scope(),
        );
        let expected: Block = parse_quote!({
            model.name = id.name.clone();
            model.port = pointer::from(props.port);
            model.zones = zones::flatten_untyped(resp.zones);
            model.sku = flatten_sku(&props.sku);
            model.location = id.location;
        });
        assert_eq!(render(&block), render(&expected));
        assert!(state.unresolved().is_empty());
    }

    #[test]
    fn test_set_on_other_receiver_untouched() {
        let original: Block = parse_quote!({
            cache.set("name", value);
            if let Err(e) = d.set("name", value) {
                log(e);
            } else {
                done();
            }
        });
        let (block, _) = rewrite(AccessorSet, original.clone(), &read_scope());
        assert_eq!(render(&block), render(&original));
    }
}
