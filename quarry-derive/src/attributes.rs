//! `#[quarry(...)]` attribute parsing

use syn::{Attribute, LitStr};

/// Kind of navigation a field declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKind {
    Reference,
    Collection,
}

/// Parsed `#[quarry(...)]` options of one field.
#[derive(Debug, Default)]
pub struct FieldAttributes {
    pub name: Option<String>,
    pub skip: bool,
    pub read_only: bool,
    pub navigation: Option<NavigationKind>,
}

/// Parsed `#[quarry(...)]` options of the struct.
#[derive(Debug, Default)]
pub struct EntityAttributes {
    pub name: Option<String>,
}

pub fn parse_entity_attributes(attrs: &[Attribute]) -> syn::Result<EntityAttributes> {
    let mut parsed = EntityAttributes::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("quarry")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                parsed.name = Some(non_empty(lit)?);
                Ok(())
            } else {
                Err(meta.error("unsupported quarry entity attribute; expected `name`"))
            }
        })?;
    }
    Ok(parsed)
}

pub fn parse_field_attributes(attrs: &[Attribute]) -> syn::Result<FieldAttributes> {
    let mut parsed = FieldAttributes::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("quarry")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                parsed.name = Some(non_empty(lit)?);
            } else if meta.path.is_ident("skip") {
                parsed.skip = true;
            } else if meta.path.is_ident("read_only") {
                parsed.read_only = true;
            } else if meta.path.is_ident("reference") {
                set_navigation(&mut parsed, NavigationKind::Reference, &meta)?;
            } else if meta.path.is_ident("collection") {
                set_navigation(&mut parsed, NavigationKind::Collection, &meta)?;
            } else {
                return Err(meta.error(
                    "unsupported quarry attribute; expected one of `name`, `skip`, `read_only`, `reference`, `collection`",
                ));
            }
            Ok(())
        })?;
    }
    if parsed.read_only && parsed.navigation.is_some() {
        let attr = attrs.iter().find(|a| a.path().is_ident("quarry"));
        return Err(syn::Error::new_spanned(
            attr,
            "`read_only` applies to properties, not navigations",
        ));
    }
    Ok(parsed)
}

fn set_navigation(
    parsed: &mut FieldAttributes,
    kind: NavigationKind,
    meta: &syn::meta::ParseNestedMeta<'_>,
) -> syn::Result<()> {
    if parsed.navigation.is_some_and(|existing| existing != kind) {
        return Err(meta.error("a field is either a `reference` or a `collection`"));
    }
    parsed.navigation = Some(kind);
    Ok(())
}

fn non_empty(lit: LitStr) -> syn::Result<String> {
    let value = lit.value();
    if value.trim().is_empty() {
        return Err(syn::Error::new_spanned(lit, "name must not be empty"));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_field_flags() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[quarry(read_only, name = "Label")])];
        let parsed = parse_field_attributes(&attrs).unwrap();
        assert!(parsed.read_only);
        assert!(!parsed.skip);
        assert_eq!(parsed.name.as_deref(), Some("Label"));
        assert_eq!(parsed.navigation, None);
    }

    #[test]
    fn test_navigation_kinds() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[quarry(reference)])];
        assert_eq!(
            parse_field_attributes(&attrs).unwrap().navigation,
            Some(NavigationKind::Reference)
        );

        let attrs: Vec<Attribute> = vec![parse_quote!(#[quarry(reference, collection)])];
        assert!(parse_field_attributes(&attrs).is_err());
    }

    #[test]
    fn test_rejects_unknown_and_empty() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[quarry(primary_key)])];
        assert!(parse_field_attributes(&attrs).is_err());

        let attrs: Vec<Attribute> = vec![parse_quote!(#[quarry(name = "")])];
        assert!(parse_field_attributes(&attrs).is_err());
    }

    #[test]
    fn test_other_attributes_ignored() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[serde(rename = "x")])];
        let parsed = parse_field_attributes(&attrs).unwrap();
        assert!(parsed.name.is_none());
    }

    #[test]
    fn test_entity_name() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[quarry(name = "BlogPost")])];
        assert_eq!(
            parse_entity_attributes(&attrs).unwrap().name.as_deref(),
            Some("BlogPost")
        );
    }
}
