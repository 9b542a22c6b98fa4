//! Identifier and type-string helpers shared by extraction and rewriting

use heck::ToUpperCamelCase;
use proc_macro2::Span;
use quote::ToTokens;
use syn::{GenericArgument, Ident, PathArguments, Type};

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use",
    "where", "while", "abstract", "become", "box", "do", "final", "macro", "override", "priv",
    "try", "typeof", "unsized", "virtual", "yield",
];

/// Convert a snake_case name to CamelCase (e.g., "redis_cache" → "RedisCache")
pub fn to_camel_case(name: &str) -> String {
    name.to_upper_camel_case()
}

/// Field identifier used for a schema tag (e.g., "sku-name" → "sku_name")
pub fn field_name_for_tag(tag: &str) -> String {
    let mut name: String = tag
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if name.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// Build an identifier, falling back to a raw identifier for keywords
///
/// Characters that cannot appear in an identifier are replaced with `_`.
pub fn make_ident(name: &str) -> Ident {
    let name = name.strip_prefix("r#").unwrap_or(name);
    let mut cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.chars().next().map_or(true, |c| c.is_ascii_digit()) {
        cleaned.insert(0, '_');
    }
    if KEYWORDS.contains(&cleaned.as_str())
        && !matches!(cleaned.as_str(), "crate" | "self" | "super" | "Self")
    {
        Ident::new_raw(&cleaned, Span::call_site())
    } else {
        Ident::new(&cleaned, Span::call_site())
    }
}

/// Render a type as compact source text (`Vec<String>`, `HashMap<String, i64>`)
pub fn render_type(ty: &Type) -> String {
    let raw = ty.to_token_stream().to_string();
    let glue = |c: Option<char>| {
        c.map_or(true, |c| matches!(c, '<' | '>' | ':' | '&' | ',' | '(' | ')' | '[' | ']' | ';'))
    };

    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    for (i, c) in chars.iter().enumerate() {
        if *c == ' ' && (glue(out.chars().last()) || glue(chars.get(i + 1).copied())) {
            continue;
        }
        out.push(*c);
    }
    out.replace(',', ", ")
}

/// Parse a type string, `None` if it is not valid Rust
pub fn parse_type(ty: &str) -> Option<Type> {
    syn::parse_str::<Type>(ty).ok()
}

/// The single generic argument of `ty` when its outer name is one of `wrappers`
fn unwrap_generic<'a>(ty: &'a Type, wrappers: &[&str]) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if !wrappers.iter().any(|w| segment.ident == *w) {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

/// Element type of a sequence type string (`Vec<SkuModel>` → `SkuModel`)
pub fn sequence_element(ty: &str) -> Option<String> {
    let parsed = parse_type(ty)?;
    unwrap_generic(&parsed, &["Vec", "HashSet", "BTreeSet"]).map(render_type)
}

/// Whether a type string names a sequence
pub fn is_sequence_type(ty: &str) -> bool {
    sequence_element(ty).is_some()
}

/// Model name a field type refers to, peeling `Vec`, `Option` and `Box`
pub fn element_model_name(ty: &str) -> Option<String> {
    let parsed = parse_type(ty)?;
    let mut current = &parsed;
    while let Some(inner) = unwrap_generic(current, &["Vec", "Option", "Box", "HashSet", "BTreeSet"]) {
        current = inner;
    }
    let Type::Path(path) = current else {
        return None;
    };
    let segment = path.path.segments.last()?;
    matches!(segment.arguments, PathArguments::None).then(|| segment.ident.to_string())
}

/// Join a path's segments with `::`, ignoring generics
pub fn path_to_string(path: &syn::Path) -> String {
    path.segments
        .iter()
        .map(|s| s.ident.to_string())
        .collect::<Vec<_>>()
        .join("::")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("redis_cache"), "RedisCache");
        assert_eq!(to_camel_case("sku"), "Sku");
        assert_eq!(to_camel_case("patch_schedule"), "PatchSchedule");
        assert_eq!(to_camel_case("sku-name.tier"), "SkuNameTier");
    }

    #[test]
    fn test_field_name_for_tag() {
        assert_eq!(field_name_for_tag("resource_group_name"), "resource_group_name");
        assert_eq!(field_name_for_tag("sku-name"), "sku_name");
        assert_eq!(field_name_for_tag("2fa"), "_2fa");
    }

    #[test]
    fn test_make_ident_keyword() {
        assert_eq!(make_ident("type").to_string(), "r#type");
        assert_eq!(make_ident("r#type").to_string(), "r#type");
        assert_eq!(make_ident("name").to_string(), "name");
        assert_eq!(make_ident("client-meta").to_string(), "client_meta");
        assert_eq!(make_ident("2fa").to_string(), "_2fa");
        assert_eq!(make_ident("").to_string(), "_");
    }

    #[test]
    fn test_render_type() {
        let ty: Type = syn::parse_quote!(HashMap<String, Vec<i64>>);
        assert_eq!(render_type(&ty), "HashMap<String, Vec<i64>>");
        let ty: Type = syn::parse_quote!(&'static str);
        assert_eq!(render_type(&ty), "&'static str");
    }

    #[test]
    fn test_sequence_helpers() {
        assert_eq!(sequence_element("Vec<SkuModel>"), Some("SkuModel".to_string()));
        assert_eq!(sequence_element("String"), None);
        assert!(is_sequence_type("Vec<String>"));
        assert_eq!(element_model_name("Option<Vec<SkuModel>>"), Some("SkuModel".to_string()));
        assert_eq!(element_model_name("HashMap<String, String>"), None);
    }
}
