use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use quote::quote;
use syn::{DataStruct, DeriveInput, Fields, LitStr, Path, Result};

struct ColumnSpec<'a> {
    ident: &'a syn::Ident,
    ty: &'a syn::Type,
    column: String,
    primary_key: bool,
    choices: Option<Path>,
    skip: bool,
}

fn parse_table_name(ast: &DeriveInput) -> Result<String> {
    let mut table = ast.ident.to_string().to_case(Case::Snake);
    for attr in &ast.attrs {
        if attr.path().is_ident("model") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let s: LitStr = meta.value()?.parse()?;
                    table = s.value();
                    Ok(())
                } else {
                    Err(meta.error("Unknown model attribute, expected `table`"))
                }
            })?;
        }
    }
    Ok(table)
}

fn parse_column(field: &syn::Field) -> Result<ColumnSpec<'_>> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "Model fields must be named"))?;

    let mut spec = ColumnSpec {
        ident,
        ty: &field.ty,
        column: ident.to_string(),
        primary_key: false,
        choices: None,
        skip: false,
    };

    for attr in &field.attrs {
        if attr.path().is_ident("model") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("primary_key") {
                    spec.primary_key = true;
                    Ok(())
                } else if meta.path.is_ident("skip") {
                    spec.skip = true;
                    Ok(())
                } else if meta.path.is_ident("column") {
                    let s: LitStr = meta.value()?.parse()?;
                    spec.column = s.value();
                    Ok(())
                } else if meta.path.is_ident("choices") {
                    let s: LitStr = meta.value()?.parse()?;
                    spec.choices = Some(s.parse()?);
                    Ok(())
                } else {
                    Err(meta.error(
                        "Unknown model field attribute, expected `primary_key`, `column`, `choices` or `skip`",
                    ))
                }
            })?;
        }
    }

    if spec.skip && (spec.primary_key || spec.choices.is_some()) {
        return Err(syn::Error::new_spanned(
            field,
            "A skipped field cannot be the primary key or declare choices",
        ));
    }
    Ok(spec)
}

pub(crate) fn generate_model_for_struct(
    ast: &DeriveInput,
    data: &DataStruct,
) -> Result<TokenStream> {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let named = match &data.fields {
        Fields::Named(named) => named,
        _ => {
            return Err(syn::Error::new_spanned(
                ast,
                format!(
                    "Failed to derive Model for struct '{}': only structs with named fields are supported.\n\
                     Example: #[derive(Model)] pub struct Post {{ id: Option<i64>, title: String }}",
                    name
                ),
            ))
        }
    };

    let table = parse_table_name(ast)?;
    let specs = named
        .named
        .iter()
        .map(parse_column)
        .collect::<Result<Vec<_>>>()?;

    let marked: Vec<&ColumnSpec> = specs.iter().filter(|s| s.primary_key).collect();
    let primary = match marked.as_slice() {
        [single] => *single,
        [] => specs
            .iter()
            .find(|s| s.ident == "id" && !s.skip)
            .ok_or_else(|| {
                syn::Error::new_spanned(
                    ast,
                    format!(
                        "Model '{}' has no primary key; add an `id` field or mark one with #[model(primary_key)]",
                        name
                    ),
                )
            })?,
        [_, second, ..] => {
            return Err(syn::Error::new_spanned(
                second.ident,
                "Multiple #[model(primary_key)] fields are not allowed",
            ))
        }
    };

    let columns: Vec<&ColumnSpec> = specs.iter().filter(|s| !s.skip).collect();

    let field_metas: Vec<proc_macro2::TokenStream> = columns.iter().map(|spec| {
        let column = &spec.column;
        match &spec.choices {
            Some(path) => quote! {
                ::ormhook::model::FieldMeta::new(#column).with_choices(#path())
            },
            None => quote! {
                ::ormhook::model::FieldMeta::new(#column)
            },
        }
    }).collect();

    let to_row_puts = columns.iter().map(|spec| {
        let ident = spec.ident;
        let column = &spec.column;
        quote! {
            row.put(#column, ::ormhook::common::Convertible::to_value(&self.#ident)?)?;
        }
    });

    let from_row_fields = specs.iter().map(|spec| {
        let ident = spec.ident;
        let ty = spec.ty;
        let column = &spec.column;
        if spec.skip {
            quote! { #ident: ::core::default::Default::default() }
        } else {
            quote! {
                #ident: <#ty as ::ormhook::common::Convertible>::from_value(&row.get_or_null(#column))?
            }
        }
    });

    let pk_ident = primary.ident;
    let pk_ty = primary.ty;
    let pk_column = &primary.column;

    let gen = quote! {
        impl #impl_generics ::ormhook::model::Model for #name #ty_generics #where_clause {
            fn table_name() -> String {
                #table.to_string()
            }

            fn primary_key() -> &'static str {
                #pk_column
            }

            fn fields() -> Vec<::ormhook::model::FieldMeta> {
                vec![#(#field_metas),*]
            }

            fn to_row(&self) -> ::ormhook::errors::OrmResult<::ormhook::model::Row> {
                let mut row = ::ormhook::model::Row::new();
                #(#to_row_puts)*
                Ok(row)
            }

            fn from_row(row: &::ormhook::model::Row) -> ::ormhook::errors::OrmResult<Self> {
                Ok(Self {
                    #(#from_row_fields),*
                })
            }

            fn pk(&self) -> Option<::ormhook::common::Value> {
                match ::ormhook::common::Convertible::to_value(&self.#pk_ident) {
                    Ok(::ormhook::common::Value::Null) | Err(_) => None,
                    Ok(value) => Some(value),
                }
            }

            fn set_pk(&mut self, value: ::ormhook::common::Value) -> ::ormhook::errors::OrmResult<()> {
                self.#pk_ident = <#pk_ty as ::ormhook::common::Convertible>::from_value(&value)?;
                Ok(())
            }
        }
    };

    Ok(TokenStream::from(gen))
}
