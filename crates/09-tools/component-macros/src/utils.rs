//! 宏工具函数

use syn::{Field, GenericArgument, PathArguments, Type};

/// 从类型中提取第一个泛型参数
pub fn extract_generic_type(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(GenericArgument::Type(inner_type)) => Some(inner_type),
            _ => None,
        },
        _ => None,
    }
}

/// 检查类型是否为 `Injected<T>`
pub fn is_injected_type(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Injected"),
        _ => false,
    }
}

/// 检查字段是否有特定属性
pub fn field_has_attribute(field: &Field, attr_name: &str) -> bool {
    field.attrs.iter().any(|attr| attr.path().is_ident(attr_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::ToTokens;
    use syn::parse_quote;

    #[test]
    fn test_extract_generic_type() {
        let ty: Type = parse_quote!(di_abstractions::Injected<dyn Color>);
        let inner = extract_generic_type(&ty).unwrap();
        assert_eq!(inner.to_token_stream().to_string(), "dyn Color");

        let plain: Type = parse_quote!(String);
        assert!(extract_generic_type(&plain).is_none());
    }

    #[test]
    fn test_is_injected_type() {
        assert!(is_injected_type(&parse_quote!(Injected<Blue>)));
        assert!(is_injected_type(&parse_quote!(di_abstractions::Injected<Blue>)));
        assert!(!is_injected_type(&parse_quote!(Option<Blue>)));
        assert!(!is_injected_type(&parse_quote!(&'static Blue)));
    }
}
