use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{FnArg, Ident, ItemFn, Pat};

/// Proc macro to denote a Scenario
///
/// Turns an `async fn` into a plain `fn` with the same arguments which returns a configurable
/// [`Scenario`](../volley/scenario/struct.Scenario.html). The scenario is named after the
/// function. Every argument must be `Clone + Send + Sync + 'static`; each iteration receives its
/// own clone.
///
/// See the `Scenario` struct for more information on the methods this macro provides on functions.
///
/// # Example
/// ```ignore
/// use volley::prelude::*;
///
/// #[scenario]
/// async fn my_scenario(client: http::Client) {
///     client.get("http://localhost:3000/").send().await;
/// }
/// ```
#[proc_macro_attribute]
pub fn scenario(attr: TokenStream, item: TokenStream) -> TokenStream {
    scenario_internal(attr.into(), item.into()).into()
}

fn scenario_internal(_attr: TokenStream2, item: TokenStream2) -> TokenStream2 {
    let input = match syn::parse2::<ItemFn>(item) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    if input.sig.asyncness.is_none() {
        return syn::Error::new_spanned(&input.sig, "#[scenario] requires an async fn")
            .to_compile_error();
    }

    let mut arg_names = vec![];
    for arg in &input.sig.inputs {
        match arg {
            FnArg::Typed(pat_type) => match &*pat_type.pat {
                Pat::Ident(pat) => arg_names.push(pat.ident.clone()),
                other => {
                    return syn::Error::new_spanned(
                        other,
                        "#[scenario] arguments must be plain identifiers",
                    )
                    .to_compile_error()
                }
            },
            FnArg::Receiver(recv) => {
                return syn::Error::new_spanned(recv, "#[scenario] cannot be used on methods")
                    .to_compile_error()
            }
        }
    }

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;

    let new_name = Ident::new(&format!("__volley_{}", sig.ident), Span::call_site());
    let mut new_sig = sig.clone();
    new_sig.ident = new_name.clone();

    let scen_name = sig.ident.clone();
    let mut scen_sig = sig.clone();
    scen_sig.asyncness = None;
    scen_sig.output = syn::parse_quote! {
        -> impl ::volley::scenario::ConfigurableScenario
    };

    quote! {
        #(#attrs)* #vis #scen_sig {
            ::volley::scenario::Scenario::new(
                stringify!(#scen_name),
                move || #new_name(#(::std::clone::Clone::clone(&#arg_names)),*),
            )
        }

        #[doc(hidden)]
        #(#attrs)* #vis #new_sig #block
    }
}
