use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr, Type};

/// Derive macro for component configuration declarations.
///
/// Generates two methods on the annotated struct:
///
/// - `config_params() -> Vec<ConfigParam>`: parameter declarations.
/// - `from_config(&ConfigValues) -> Result<Self, CodecError>`: reads typed values.
///
/// The struct must implement `Default` (defaults are used for non-required params).
/// The key defaults to the field name; `name = "..."` overrides it for keys
/// that are not valid identifiers.
///
/// # Example
///
/// ```ignore
/// #[derive(ConfigParams, Default)]
/// pub struct DeserializerConfig {
///     #[param(required, description = "Comma-separated column names")]
///     pub columns: String,
///
///     #[param(name = "columns.types", required, description = "Comma-separated column types")]
///     pub column_types: String,
/// }
/// ```
///
/// Supported field types: `bool`, `i64`, `u64`, `usize`, `String`.
#[proc_macro_derive(ConfigParams, attributes(param))]
pub fn derive_config_params(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens,
        Err(e) => e.to_compile_error().into(),
    }
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream, syn::Error> {
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "ConfigParams only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "ConfigParams only supports structs",
            ))
        }
    };

    let mut config_param_tokens = Vec::new();
    let mut from_config_tokens = Vec::new();

    for field in fields {
        let field_name = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new_spanned(field, "expected named field")
        })?;
        let field_ty = &field.ty;

        // Parse #[param(...)] attribute.
        let mut key: Option<String> = None;
        let mut description_str: Option<String> = None;
        let mut required = false;

        for attr in &field.attrs {
            if !attr.path().is_ident("param") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    key = Some(value.value());
                } else if meta.path.is_ident("description") {
                    let value: LitStr = meta.value()?.parse()?;
                    description_str = Some(value.value());
                } else if meta.path.is_ident("required") {
                    required = true;
                } else {
                    return Err(meta.error("expected `name`, `description` or `required`"));
                }
                Ok(())
            })?;
        }

        let key = key.unwrap_or_else(|| field_name.to_string());
        let description_str = description_str.ok_or_else(|| {
            syn::Error::new_spanned(field_name, "missing #[param(description = \"...\")]")
        })?;

        let ty_name = type_ident_name(field_ty).ok_or_else(|| {
            syn::Error::new_spanned(field_ty, "unsupported type for ConfigParams")
        })?;

        let missing = quote! {
            tessera_api::error::CodecError::config(
                format!("missing required parameter '{}'", #key)
            )
        };

        let (param_type_expr, default_expr, read_expr, convert) = match ty_name.as_str() {
            "u64" => (
                quote! { tessera_api::config::ParamType::U64 },
                quote! { tessera_api::config::ParamValue::U64(__defaults.#field_name) },
                quote! { __config.get_u64(#key) },
                quote! { v },
            ),
            "usize" => (
                quote! { tessera_api::config::ParamType::U64 },
                quote! { tessera_api::config::ParamValue::U64(__defaults.#field_name as u64) },
                quote! { __config.get_u64(#key) },
                quote! { v as usize },
            ),
            "i64" => (
                quote! { tessera_api::config::ParamType::I64 },
                quote! { tessera_api::config::ParamValue::I64(__defaults.#field_name) },
                quote! { __config.get_i64(#key) },
                quote! { v },
            ),
            "bool" => (
                quote! { tessera_api::config::ParamType::Bool },
                quote! { tessera_api::config::ParamValue::Bool(__defaults.#field_name) },
                quote! { __config.get_bool(#key) },
                quote! { v },
            ),
            "String" => (
                quote! { tessera_api::config::ParamType::Str },
                quote! { tessera_api::config::ParamValue::Str(__defaults.#field_name.clone()) },
                quote! { __config.get_str(#key) },
                quote! { v.to_string() },
            ),
            _ => {
                return Err(syn::Error::new_spanned(
                    field_ty,
                    format!("unsupported type '{ty_name}' (expected u64, i64, bool, String, usize)"),
                ))
            }
        };

        let getter_expr = if required {
            quote! {
                let v = #read_expr.ok_or_else(|| #missing)?;
                result.#field_name = #convert;
            }
        } else {
            quote! {
                if let Some(v) = #read_expr {
                    result.#field_name = #convert;
                }
            }
        };

        let default_value = if required {
            quote! { None }
        } else {
            quote! { Some(#default_expr) }
        };

        config_param_tokens.push(quote! {
            tessera_api::config::ConfigParam {
                name: #key.to_string(),
                param_type: #param_type_expr,
                required: #required,
                default: #default_value,
                description: #description_str.to_string(),
            }
        });

        from_config_tokens.push(getter_expr);
    }

    let expanded = quote! {
        impl #name {
            pub fn config_params() -> Vec<tessera_api::config::ConfigParam> {
                let __defaults = Self::default();
                vec![
                    #(#config_param_tokens),*
                ]
            }

            pub fn from_config(
                __config: &tessera_api::config::ConfigValues,
            ) -> Result<Self, tessera_api::error::CodecError> {
                __config.validate(&Self::config_params())?;
                let mut result = Self::default();
                #(#from_config_tokens)*
                Ok(result)
            }
        }
    };

    Ok(TokenStream::from(expanded))
}

/// Extract the last path segment ident name from a type (e.g. `u64`, `String`).
fn type_ident_name(ty: &Type) -> Option<String> {
    if let Type::Path(type_path) = ty {
        type_path
            .path
            .segments
            .last()
            .map(|seg| seg.ident.to_string())
    } else {
        None
    }
}
