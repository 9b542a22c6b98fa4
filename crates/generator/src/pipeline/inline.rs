//! Helper calls promoted to receiver methods

use super::syntax::{field_chain, ident_of, strip_parens, var_expr};
use super::{RewriteContext, Rewriter, SignatureEdit, SyntaxNode};
use hemmer_provider_migrator_analyzer::naming::{
    is_sequence_type, make_ident, parse_type, render_type, sequence_element,
};
use syn::{Expr, GenericArgument, PathArguments, Stmt, Type};
use tracing::debug;

/// `let x = helper(d, model.sku);` → `let x = self.helper(&mut model, model.sku);`
///
/// The helper's signature follows its call sites: accessor parameters become
/// `&mut <TopModel>`, parameters fed from model fields take the field type,
/// and assigning the result to a model field fixes the return type.
pub struct InlineFunction;

impl Rewriter for InlineFunction {
    fn name(&self) -> &'static str {
        "inline_function"
    }

    fn try_apply(&self, node: SyntaxNode<'_>, cx: &mut RewriteContext<'_>) -> bool {
        match node {
            SyntaxNode::Stmt(Stmt::Local(local)) => match &mut local.init {
                Some(init) if init.diverge.is_none() => promote_call(&mut init.expr, None, cx),
                _ => false,
            },
            SyntaxNode::Expr(Expr::Assign(assign)) => {
                let target = field_chain(&assign.left, &cx.function.var_model);
                promote_call(&mut assign.right, target, cx)
            }
            _ => false,
        }
    }
}

/// Rewrite `helper(..)` or `helper(..)?` held in `value`
fn promote_call(value: &mut Expr, target: Option<Vec<String>>, cx: &mut RewriteContext<'_>) -> bool {
    let propagated = matches!(value, Expr::Try(_));
    let call_slot: &Expr = match &*value {
        Expr::Try(inner) => &inner.expr,
        other => other,
    };
    let Expr::Call(call) = strip_parens(call_slot) else {
        return false;
    };
    let Some(name) = ident_of(&call.func).map(|ident| ident.to_string()) else {
        return false;
    };
    let helpers = cx.helpers;
    let Some(signature) = helpers.get(&name) else {
        return false;
    };

    let mut edit = SignatureEdit::default();
    let mut args: Vec<Expr> = call.args.iter().cloned().collect();
    for (index, arg) in args.iter_mut().enumerate() {
        if cx.is_accessor(arg) {
            let model = make_ident(cx.models.top_name());
            edit.params.insert(index, syn::parse_quote!(&mut #model));
            // Helpers already holding the model pass it straight through
            if cx.function.accessor.as_deref() != Some(cx.function.var_model.as_str()) {
                let var = var_expr(&cx.function.var_model);
                *arg = syn::parse_quote!(&mut #var);
            }
        } else if let Some(ty) = model_field_type(arg, cx) {
            edit.params.insert(index, ty);
        }
    }

    // Later call sites cannot change an already rewritten signature
    if let Some(names) = target.filter(|_| !cx.state.is_transformed(&name)) {
        let field_ty = cx.models.field_by_path(&names).map(|field| field.ty.clone());
        match field_ty.and_then(|ty| return_type(signature.output.as_ref(), &ty, propagated)) {
            Some(output) => edit.output = Some(output),
            None => cx.unresolved(format!(
                "cannot derive a return type for `{name}` from model field `{}`",
                names.join(".")
            )),
        }
    }

    let method = make_ident(&name);
    let promoted: Expr = syn::parse_quote!(self.#method(#(#args),*));
    match value {
        Expr::Try(inner) => *inner.expr = promoted,
        other => *other = promoted,
    }

    cx.state.promote(&name);
    if cx.state.record_signature_edit(&name, edit) {
        debug!(helper = %name, caller = %cx.function.name, "queued helper signature edit");
    }
    true
}

/// Declared type of a `model.a.b` argument, keeping any `&`/`&mut`
fn model_field_type(arg: &Expr, cx: &RewriteContext<'_>) -> Option<Type> {
    let (inner, reference) = match strip_parens(arg) {
        Expr::Reference(reference) => (&*reference.expr, Some(reference.mutability.is_some())),
        other => (other, None),
    };
    let names = field_chain(inner, &cx.function.var_model)?;
    let ty = parse_type(&cx.models.field_by_path(&names)?.ty)?;
    Some(match reference {
        Some(true) => syn::parse_quote!(&mut #ty),
        Some(false) => syn::parse_quote!(&#ty),
        None => ty,
    })
}

/// Return type of a helper whose result is stored in a field of type `field_ty`
///
/// A `?`-propagated call keeps its `Result` and only the success type
/// changes. When both types are sequences only the element type is replaced.
fn return_type(current: Option<&Type>, field_ty: &str, propagated: bool) -> Option<Type> {
    if !propagated {
        return replace_value_type(current, field_ty);
    }
    let mut wrapper = current?.clone();
    let success = first_generic_mut(&mut wrapper)?;
    *success = replace_value_type(Some(&*success), field_ty)?;
    Some(wrapper)
}

fn replace_value_type(current: Option<&Type>, field_ty: &str) -> Option<Type> {
    let field = parse_type(field_ty)?;
    let Some(current) = current else {
        return Some(field);
    };
    let element = sequence_element(field_ty);
    match element {
        Some(element) if is_sequence_type(&render_type(current)) => {
            let mut replaced = current.clone();
            *first_generic_mut(&mut replaced)? = parse_type(&element)?;
            Some(replaced)
        }
        _ => Some(field),
    }
}

fn first_generic_mut(ty: &mut Type) -> Option<&mut Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let PathArguments::AngleBracketed(args) = &mut path.path.segments.last_mut()?.arguments else {
        return None;
    };
    args.args.iter_mut().find_map(|arg| match arg {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    })
}
