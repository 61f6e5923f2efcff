//! `#[derive(Managed)]` 实现

use crate::utils::{extract_generic_type, field_has_attribute, is_injected_type};
use proc_macro2::TokenStream;
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;
use syn::{Attribute, Data, DeriveInput, Error, Fields, Ident, LitStr, Result, Type};

/// 组件作用域参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManagedScope {
    Singleton,
    #[default]
    Dependent,
}

/// `#[managed(...)]` 参数
#[derive(Debug, Default)]
pub struct ManagedArgs {
    pub scope: ManagedScope,
    pub name: Option<String>,
    pub qualifiers: Vec<String>,
    pub on_ready: Option<Ident>,
    pub on_destroy: Option<Ident>,
}

impl ManagedArgs {
    /// 从结构体属性解析参数
    pub fn from_attributes(attrs: &[Attribute]) -> Result<Self> {
        let mut args = Self::default();
        let mut scope_seen = false;

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("managed")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("singleton") || meta.path.is_ident("dependent") {
                    if scope_seen {
                        return Err(meta.error("作用域只能声明一次"));
                    }
                    scope_seen = true;
                    args.scope = if meta.path.is_ident("singleton") {
                        ManagedScope::Singleton
                    } else {
                        ManagedScope::Dependent
                    };
                } else if meta.path.is_ident("name") {
                    args.name = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("qualifier") {
                    args.qualifiers
                        .push(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("on_ready") {
                    args.on_ready = Some(parse_method(&meta)?);
                } else if meta.path.is_ident("on_destroy") {
                    args.on_destroy = Some(parse_method(&meta)?);
                } else {
                    return Err(meta.error("未知的 managed 参数"));
                }
                Ok(())
            })?;
        }

        Ok(args)
    }
}

fn parse_method(meta: &syn::meta::ParseNestedMeta<'_>) -> Result<Ident> {
    let lit = meta.value()?.parse::<LitStr>()?;
    lit.parse::<Ident>()
        .map_err(|_| Error::new(lit.span(), "回调必须是方法名"))
}

/// 一个 `#[inject]` 字段
struct InjectField<'a> {
    ident: &'a Ident,
    target: &'a Type,
    qualifier: Option<String>,
}

fn inject_qualifier(attrs: &[Attribute]) -> Result<Option<String>> {
    let mut qualifier = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("inject")) {
        // 无参数的 `#[inject]`
        if matches!(attr.meta, syn::Meta::Path(_)) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("qualifier") {
                qualifier = Some(meta.value()?.parse::<LitStr>()?.value());
                Ok(())
            } else {
                Err(meta.error("未知的 inject 参数"))
            }
        })?;
    }
    Ok(qualifier)
}

/// 展开 `#[derive(Managed)]`
pub fn expand(input: &DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;

    let fields: Vec<&syn::Field> = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields.named.iter().collect(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(Error::new(
                    input.span(),
                    "Managed 不支持元组结构体",
                ))
            }
        },
        _ => return Err(Error::new(input.span(), "Managed 只支持结构体")),
    };

    let args = ManagedArgs::from_attributes(&input.attrs)?;

    let mut initializers = Vec::new();
    let mut inject_fields = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        initializers.push(quote_spanned! {field.span()=>
            #ident: ::core::default::Default::default()
        });

        if !field_has_attribute(field, "inject") {
            continue;
        }
        let target = match (is_injected_type(&field.ty), extract_generic_type(&field.ty)) {
            (true, Some(target)) => target,
            _ => {
                return Err(Error::new(
                    field.ty.span(),
                    "#[inject] 只能用于 Injected<T> 字段",
                ))
            }
        };
        inject_fields.push(InjectField {
            ident,
            target,
            qualifier: inject_qualifier(&field.attrs)?,
        });
    }

    let scope = match args.scope {
        ManagedScope::Singleton => quote! { ::di_abstractions::Scope::Singleton },
        ManagedScope::Dependent => quote! { ::di_abstractions::Scope::Dependent },
    };
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| struct_name.to_string());
    let qualifiers = args.qualifiers.iter().map(|qualifier| {
        quote! { .qualifier(#qualifier) }
    });

    let injections = inject_fields.iter().map(|field| {
        let ident = field.ident;
        let target = field.target;
        let member = ident.to_string();
        match &field.qualifier {
            Some(qualifier) => quote! {
                .field_qualified::<#target, _>(#member, #qualifier, |component, value| {
                    component.#ident.inject(value)
                })
            },
            None => quote! {
                .field::<#target, _>(#member, |component, value| {
                    component.#ident.inject(value)
                })
            },
        }
    });

    let on_ready = args.on_ready.as_ref().map(|method| {
        quote! { .on_ready(|component: &Self| component.#method()) }
    });
    let on_destroy = args.on_destroy.as_ref().map(|method| {
        quote! { .on_destroy(|component: &Self| component.#method()) }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::di_abstractions::ManagedComponent for #struct_name #ty_generics #where_clause {
            fn declaration() -> ::di_abstractions::ManagedComponentDeclaration {
                ::di_abstractions::ManagedComponentDeclaration::constructed_with::<Self, _>(|_| {
                    ::core::result::Result::Ok(Self {
                        #(#initializers,)*
                    })
                })
                .name(#name)
                .scope(#scope)
                #(#qualifiers)*
                #(#injections)*
                #on_ready
                #on_destroy
                .build()
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn test_managed_args_defaults() {
        let args = ManagedArgs::default();
        assert_eq!(args.scope, ManagedScope::Dependent);
        assert!(args.name.is_none());
        assert!(args.qualifiers.is_empty());
    }

    #[test]
    fn test_parse_managed_args() {
        let input: DeriveInput = parse_quote! {
            #[managed(singleton, name = "orange", qualifier = "citrus", on_ready = "start")]
            struct Orange {}
        };
        let args = ManagedArgs::from_attributes(&input.attrs).unwrap();

        assert_eq!(args.scope, ManagedScope::Singleton);
        assert_eq!(args.name.as_deref(), Some("orange"));
        assert_eq!(args.qualifiers, vec!["citrus".to_string()]);
        assert_eq!(args.on_ready.map(|m| m.to_string()), Some("start".to_string()));
    }

    #[test]
    fn test_conflicting_scope_is_rejected() {
        let input: DeriveInput = parse_quote! {
            #[managed(singleton, dependent)]
            struct Orange {}
        };
        assert!(ManagedArgs::from_attributes(&input.attrs).is_err());
    }

    #[test]
    fn test_inject_requires_injected_field() {
        let input: DeriveInput = parse_quote! {
            struct Orange {
                #[inject]
                blue: std::sync::Arc<Blue>,
            }
        };
        assert!(expand(&input).is_err());
    }

    #[test]
    fn test_tuple_struct_is_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Orange(u8);
        };
        assert!(expand(&input).is_err());
    }

    #[test]
    fn test_unit_struct_is_accepted() {
        let input: DeriveInput = parse_quote! {
            struct Green;
        };
        assert!(expand(&input).is_ok());
    }

    #[test]
    fn test_expansion_contains_field_injection() {
        let input: DeriveInput = parse_quote! {
            #[managed(dependent)]
            struct Blue {
                #[inject(qualifier = "deep")]
                green: Injected<Green>,
                label: String,
            }
        };
        let tokens = expand(&input).unwrap().to_string();

        assert!(tokens.contains("field_qualified"));
        assert!(tokens.contains("\"green\""));
        assert!(tokens.contains("\"deep\""));
        assert!(tokens.contains("Scope :: Dependent"));
    }
}
