use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, parse_macro_input};

/// Per-field keys accepted inside `#[validator(...)]`, paired with the
/// `RawFieldConfig` member they fill.
const FIELD_KEYS: &[(&str, &str)] = &[
    ("validator", "validator"),
    ("required", "required"),
    ("required_message", "required_message"),
    ("invalid_message", "invalid_message"),
    ("append_to", "message_append_to"),
    ("group", "group"),
    ("group_elements", "group_elements"),
];

#[proc_macro_derive(FormSchema, attributes(validator))]
pub fn derive_form_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            input.ident,
            "FormSchema derive currently supports only non-generic structs",
        ));
    }

    let model_ident = input.ident;
    let fields_struct_ident = format_ident!("{model_ident}Fields");

    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return Err(syn::Error::new(
                    Span::call_site(),
                    "FormSchema derive requires a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                Span::call_site(),
                "FormSchema derive is only supported on structs",
            ));
        }
    };

    let calmform = calmform_path();
    let submit = parse_submit(&input.attrs)?;
    let mut fields_methods = Vec::new();
    let mut schema_fields = Vec::new();

    for field in named_fields {
        let Some(field_ident) = field.ident else {
            continue;
        };
        let attrs = parse_field(&field.attrs)?;
        let field_name = attrs
            .name
            .map(|name| name.value())
            .unwrap_or_else(|| field_ident.to_string().trim_start_matches("r#").to_string());

        fields_methods.push(quote! {
            pub const fn #field_ident(&self) -> #calmform::form::FieldKey {
                #calmform::form::FieldKey::new(#field_name)
            }
        });

        if attrs.entries.is_empty() {
            continue;
        }
        let members = attrs.entries.iter().map(|(member, value)| {
            let member = Ident::new(member, Span::call_site());
            quote!(#member: ::core::option::Option::Some(::std::string::String::from(#value)))
        });
        schema_fields.push(quote! {
            .with_field(
                #field_name,
                #calmform::form::RawFieldConfig {
                    #(#members,)*
                    ..::core::default::Default::default()
                },
            )
        });
    }

    let submit = submit.map(|expression| quote!(.with_submit(#expression)));

    Ok(quote! {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #fields_struct_ident;

        impl #fields_struct_ident {
            #(#fields_methods)*
        }

        impl #calmform::form::FormSchemaSource for #model_ident {
            type Fields = #fields_struct_ident;

            fn fields() -> Self::Fields {
                #fields_struct_ident
            }

            fn form_schema() -> #calmform::form::FormSchema {
                #calmform::form::FormSchema::new()
                    #submit
                    #(#schema_fields)*
            }
        }
    })
}

#[derive(Default)]
struct FieldAttrs {
    name: Option<LitStr>,
    entries: Vec<(&'static str, LitStr)>,
}

fn parse_field(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("validator")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                parsed.name = Some(meta.value()?.parse()?);
                return Ok(());
            }
            let Some((_, member)) = FIELD_KEYS
                .iter()
                .find(|(key, _)| meta.path.is_ident(key))
            else {
                return Err(meta.error("unsupported validator field attribute"));
            };
            let value: LitStr = meta.value()?.parse()?;
            parsed.entries.retain(|(existing, _)| existing != member);
            parsed.entries.push((*member, value));
            Ok(())
        })?;
    }
    Ok(parsed)
}

fn parse_submit(attrs: &[Attribute]) -> syn::Result<Option<LitStr>> {
    let mut submit = None;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("validator")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("submit") {
                submit = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported validator struct attribute"))
            }
        })?;
    }
    Ok(submit)
}

fn calmform_path() -> TokenStream2 {
    match crate_name("calmform") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::calmform),
    }
}
