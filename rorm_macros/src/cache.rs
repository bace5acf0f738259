use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Field, Fields, LitStr, Type};

#[derive(Clone, Copy)]
enum Kind {
    Scalar,
    List,
    Map,
}

struct CacheField<'a> {
    field: &'a Field,
    name: String,
    kind: Option<Kind>,
}

pub fn derive_cache(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => &fields.named,
            _ => panic!("Cache derive only supports structs with named fields"),
        },
        _ => panic!("Cache derive only supports structs"),
    };

    let hash = extract_hash(&input.attrs).unwrap_or_else(|| name.to_string());

    let mut id_field = None;
    let mut cache_fields = Vec::new();
    for field in fields {
        match parse_field(field) {
            FieldAttr::Id => {
                if id_field.is_some() {
                    panic!("Cache derive: only one field may be marked #[cache(id)]");
                }
                id_field = field.ident.clone();
            }
            FieldAttr::Persisted(cache_field) => cache_fields.push(cache_field),
            FieldAttr::None => {}
        }
    }

    let mut seen = std::collections::HashSet::new();
    for cache_field in &cache_fields {
        if cache_field.name.is_empty() || cache_field.name.contains(':') {
            panic!(
                "Cache derive: field name {:?} must be non-empty and must not contain ':'",
                cache_field.name
            );
        }
        if !seen.insert(cache_field.name.clone()) {
            panic!("Cache derive: duplicate field name {:?}", cache_field.name);
        }
    }

    let unique_id = match &id_field {
        Some(id) => quote! { ::std::format!("{}:{}", #hash, self.#id) },
        None => quote! { ::std::string::ToString::to_string(#hash) },
    };

    let entries: Vec<TokenStream2> = cache_fields.iter().map(field_entry).collect();

    let expanded = quote! {
        impl #impl_generics ::rorm::CacheAggregate for #name #ty_generics #where_clause {
            fn unique_id(&self) -> ::std::string::String {
                #unique_id
            }

            fn fields_mut(&mut self) -> ::std::vec::Vec<(&'static str, ::rorm::FieldMut<'_>)> {
                ::std::vec![#(#entries),*]
            }
        }
    };

    TokenStream::from(expanded)
}

fn field_entry(cache_field: &CacheField<'_>) -> TokenStream2 {
    let ident = cache_field.field.ident.as_ref();
    let name = &cache_field.name;
    let ty = &cache_field.field.ty;

    match cache_field.kind.or_else(|| infer_kind(ty)) {
        Some(Kind::Scalar) => quote! { (#name, ::rorm::FieldMut::Scalar(&mut self.#ident)) },
        Some(Kind::List) => quote! { (#name, ::rorm::FieldMut::List(&mut self.#ident)) },
        Some(Kind::Map) => quote! { (#name, ::rorm::FieldMut::Map(&mut self.#ident)) },
        None => {
            let type_name = quote!(#ty).to_string().replace(' ', "");
            quote! { (#name, ::rorm::FieldMut::Unsupported(#type_name)) }
        }
    }
}

/// Classify by the outermost type path segment.
fn infer_kind(ty: &Type) -> Option<Kind> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    match segment.ident.to_string().as_str() {
        "Vec" | "VecDeque" => Some(Kind::List),
        "HashMap" | "BTreeMap" => Some(Kind::Map),
        "Tracked" | "DynamicRecord" | "Box" => Some(Kind::Scalar),
        _ => None,
    }
}

enum FieldAttr<'a> {
    None,
    Id,
    Persisted(CacheField<'a>),
}

fn parse_field(field: &Field) -> FieldAttr<'_> {
    let Some(ident) = &field.ident else {
        return FieldAttr::None;
    };

    let mut result = FieldAttr::None;
    for attr in &field.attrs {
        if !attr.path().is_ident("cache") {
            continue;
        }

        let mut cache_field = CacheField {
            field,
            name: ident.to_string(),
            kind: None,
        };

        // Bare `#[cache]`
        if matches!(attr.meta, syn::Meta::Path(_)) {
            result = FieldAttr::Persisted(cache_field);
            continue;
        }

        let mut is_id = false;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("id") {
                is_id = true;
            } else if meta.path.is_ident("scalar") {
                cache_field.kind = Some(Kind::Scalar);
            } else if meta.path.is_ident("list") {
                cache_field.kind = Some(Kind::List);
            } else if meta.path.is_ident("map") {
                cache_field.kind = Some(Kind::Map);
            } else if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                cache_field.name = value.value();
            } else {
                return Err(meta.error("unknown cache attribute"));
            }
            Ok(())
        })
        .unwrap_or_else(|err| panic!("Cache derive: {err}"));

        result = if is_id {
            FieldAttr::Id
        } else {
            FieldAttr::Persisted(cache_field)
        };
    }
    result
}

fn extract_hash(attrs: &[Attribute]) -> Option<String> {
    let mut hash = None;
    for attr in attrs {
        if !attr.path().is_ident("cache") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("hash") {
                let value: LitStr = meta.value()?.parse()?;
                hash = Some(value.value());
            }
            Ok(())
        });
    }
    hash
}
