use proc_macro::TokenStream;
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{Attribute, LitStr};
use tagex_regular_expressions::{parse_regex, ParseError, PatternDfa};

#[cfg(feature = "dot")]
use std::fs::File;
#[cfg(feature = "dot")]
use syn::{Expr, ExprLit, Lit, Meta, MetaNameValue};

pub(crate) struct RegexInput {
    attrs: Vec<Attribute>,
    pattern: LitStr,
}

impl Parse for RegexInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let attrs = input.call(Attribute::parse_outer)?;
        let pattern = input.parse()?;
        Ok(Self { attrs, pattern })
    }
}

fn compile_pattern(pattern: &str) -> Result<PatternDfa, ParseError> {
    Ok(parse_regex(pattern)?.to_dfa()?)
}

impl RegexInput {
    pub fn compile(self) -> TokenStream {
        let mut errors = Vec::new();
        #[cfg(feature = "dot")]
        let mut graph = None;

        for attr in self.attrs {
            match attr.meta {
                #[cfg(feature = "dot")]
                Meta::NameValue(MetaNameValue {
                    path,
                    value:
                        Expr::Lit(ExprLit {
                            lit: Lit::Str(s), ..
                        }),
                    ..
                }) if path.is_ident("graph") => {
                    graph = Some(s);
                }
                meta => errors.push(syn::Error::new_spanned(meta, "unexpected attribute")),
            }
        }

        let pattern = self.pattern;
        match compile_pattern(&pattern.value()) {
            #[cfg(feature = "dot")]
            Ok(dfa) => {
                if let Some(path) = graph {
                    if let Err(e) = write_dot(&dfa, &path.value()) {
                        errors.push(syn::Error::new(
                            path.span(),
                            format!("failed while graphing at {}: {e}", path.value()),
                        ));
                    }
                }
            }
            #[cfg(not(feature = "dot"))]
            Ok(_) => {}
            Err(e) => errors.push(syn::Error::new(pattern.span(), e.to_string())),
        }

        if let Some(error) = errors.into_iter().reduce(|mut all, e| {
            all.combine(e);
            all
        }) {
            return error.to_compile_error().into();
        }

        quote!({
            match ::tagex::Regex::new(#pattern) {
                Ok(regex) => regex,
                Err(e) => unreachable!("pattern was checked while compiling: {}", e),
            }
        })
        .into()
    }
}

#[cfg(feature = "dot")]
fn write_dot(dfa: &PatternDfa, path: &str) -> std::io::Result<()> {
    let mut f = File::create(path)?;
    dfa.output_dot(&mut f)
}
