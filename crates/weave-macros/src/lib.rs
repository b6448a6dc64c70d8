use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{parse_macro_input, Ident, ItemFn};

/// `TodoList` -> `TODO_LIST`, `counter` -> `COUNTER`.
fn component_const_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for ch in name.chars() {
        if ch.is_uppercase() && previous_lower {
            out.push('_');
        }
        previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
        out.extend(ch.to_uppercase());
    }
    out
}

fn check_signature(func: &ItemFn) -> syn::Result<()> {
    let sig = &func.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "components cannot be async",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "components cannot be generic",
        ));
    }
    if sig.inputs.len() != 1 {
        return Err(syn::Error::new_spanned(
            &sig.inputs,
            "components take exactly one `&Props` argument",
        ));
    }
    if let syn::FnArg::Receiver(receiver) = &sig.inputs[0] {
        return Err(syn::Error::new_spanned(
            receiver,
            "components cannot take `self`",
        ));
    }
    if matches!(sig.output, syn::ReturnType::Default) {
        return Err(syn::Error::new_spanned(
            &sig.ident,
            "components must return `Rendered`",
        ));
    }
    Ok(())
}

/// Declares a function component.
///
/// The function is kept as written and a `Component` constant named after it
/// in upper snake case is emitted next to it:
///
/// ```ignore
/// #[component]
/// fn TodoList(props: &Props) -> Rendered { /* ... */ }
///
/// let element = Element::component(TODO_LIST);
/// ```
#[proc_macro_attribute]
pub fn component(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr_tokens = TokenStream2::from(attr);
    if !attr_tokens.is_empty() {
        return syn::Error::new_spanned(attr_tokens, "#[component] takes no arguments")
            .to_compile_error()
            .into();
    }

    let func = parse_macro_input!(item as ItemFn);
    if let Err(err) = check_signature(&func) {
        return err.to_compile_error().into();
    }

    let vis = &func.vis;
    let fn_name = &func.sig.ident;
    let display_name = fn_name.to_string();
    let const_name = Ident::new(&component_const_name(&display_name), Span::call_site());
    let doc = format!("Component handle for [`{display_name}`].");

    let expanded = quote! {
        #[allow(non_snake_case)]
        #func

        #[doc = #doc]
        #vis const #const_name: ::weave_core::Component =
            ::weave_core::Component::new(#display_name, #fn_name);
    };
    expanded.into()
}
