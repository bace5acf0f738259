use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr};

pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let (tag, codec) = parse_struct_attrs(&input);
    let tag = tag.unwrap_or_else(|| name.to_string());

    let codec_const = match codec.as_deref() {
        None => quote! {},
        Some("json") => quote! { const CODEC: ::rorm::Codec = ::rorm::Codec::Json; },
        Some("bitcode") => quote! { const CODEC: ::rorm::Codec = ::rorm::Codec::Bitcode; },
        Some(other) => panic!("Model derive: unknown codec {other:?}, expected \"json\" or \"bitcode\""),
    };

    let unique_id = extract_id_field(&input).map(|id| {
        quote! {
            fn unique_id(&self) -> ::std::string::String {
                ::std::string::ToString::to_string(&self.#id)
            }
        }
    });

    let expanded = quote! {
        impl #impl_generics ::rorm::Model for #name #ty_generics #where_clause {
            const TYPE_TAG: &'static str = #tag;
            #codec_const
            #unique_id
        }
    };

    TokenStream::from(expanded)
}

fn parse_struct_attrs(input: &DeriveInput) -> (Option<String>, Option<String>) {
    let mut tag = None;
    let mut codec = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("model") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                let value: LitStr = meta.value()?.parse()?;
                tag = Some(value.value());
            } else if meta.path.is_ident("codec") {
                let value: LitStr = meta.value()?.parse()?;
                codec = Some(value.value());
            }
            Ok(())
        });
    }

    if let Some(tag) = &tag {
        if tag.is_empty() || tag.contains(':') {
            panic!("Model derive: tag {tag:?} must be non-empty and must not contain ':'");
        }
    }

    (tag, codec)
}

fn extract_id_field(input: &DeriveInput) -> Option<syn::Ident> {
    let Data::Struct(data_struct) = &input.data else {
        panic!("Model derive only supports structs");
    };
    let Fields::Named(fields) = &data_struct.fields else {
        return None;
    };

    for field in &fields.named {
        for attr in &field.attrs {
            if !attr.path().is_ident("model") {
                continue;
            }
            let mut is_id = false;
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    is_id = true;
                }
                Ok(())
            });
            if is_id {
                return field.ident.clone();
            }
        }
    }

    fields
        .named
        .iter()
        .filter_map(|field| field.ident.as_ref())
        .find(|ident| *ident == "id")
        .cloned()
}
