use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::ToTokens;
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Expr, Ident, ImplItem, ItemImpl, MetaNameValue, Path, Token, Type, parse_macro_input};

/// Methods the attribute injects, in declaration order
pub const PUBLISHER_METHODS: [&str; 7] = [
    "add_event_listener",
    "add_event_listener_for",
    "remove_event_listener",
    "remove_event_listener_for",
    "publish_event",
    "publish_event_outside",
    "publish_event_async",
];

/// Arguments for the event_publisher attribute
/// Parses: #[event_publisher] or #[event_publisher(router = bus, path = trellis::events)]
pub struct PublisherArgs {
    pub router: Ident,
    pub path: Path,
}

impl Default for PublisherArgs {
    fn default() -> Self {
        Self {
            router: Ident::new("event_router", proc_macro2::Span::call_site()),
            path: syn::parse_quote!(::trellis_events),
        }
    }
}

impl Parse for PublisherArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut args = Self::default();
        let pairs = Punctuated::<MetaNameValue, Token![,]>::parse_terminated(input)?;

        for pair in pairs {
            let Expr::Path(value) = &pair.value else {
                return Err(syn::Error::new_spanned(&pair.value, "expected a path"));
            };

            if pair.path.is_ident("router") {
                args.router = value.path.require_ident()?.clone();
            } else if pair.path.is_ident("path") {
                args.path = value.path.clone();
            } else {
                return Err(syn::Error::new_spanned(
                    &pair.path,
                    "unknown argument, expected `router` or `path`",
                ));
            }
        }

        Ok(args)
    }
}

pub fn event_publisher_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as PublisherArgs);
    let input = parse_macro_input!(item as ItemImpl);

    match expand(&args, input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(e) => e.to_compile_error().into(),
    }
}

/// Names of the publisher methods the impl block already defines
fn defined_methods(input: &ItemImpl) -> Vec<&'static str> {
    PUBLISHER_METHODS
        .iter()
        .copied()
        .filter(|name| {
            input.items.iter().any(|item| match item {
                ImplItem::Fn(method) => method.sig.ident == name,
                _ => false,
            })
        })
        .collect()
}

fn type_name(ty: &Type) -> String {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
            .unwrap_or_default(),
        other => other.to_token_stream().to_string(),
    }
}

pub fn expand(args: &PublisherArgs, mut input: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some((_, trait_path, _)) = &input.trait_ {
        return Err(syn::Error::new_spanned(
            trait_path,
            "#[event_publisher] must be applied to an inherent impl block",
        ));
    }

    let defined = defined_methods(&input);
    if defined.len() == PUBLISHER_METHODS.len() {
        return Ok(input.into_token_stream());
    }
    if !defined.is_empty() {
        let missing: Vec<&str> = PUBLISHER_METHODS
            .iter()
            .copied()
            .filter(|name| !defined.contains(name))
            .collect();
        return Err(syn::Error::new_spanned(
            &input.self_ty,
            format!(
                "`{}` implements some event publisher methods but not all; missing: {}. \
                 Implement every one of them or none",
                type_name(&input.self_ty),
                missing.join(", ")
            ),
        ));
    }

    let router = &args.router;
    let events = &args.path;

    let methods: Vec<ImplItem> = vec![
        syn::parse_quote! {
            /// Register a catch-all listener on the owned router
            pub fn add_event_listener(
                &self,
                handler: ::std::sync::Arc<dyn #events::EventHandler>,
            ) {
                self.#router.add_listener(handler)
            }
        },
        syn::parse_quote! {
            /// Register a listener for one event on the owned router
            pub fn add_event_listener_for(
                &self,
                event: &str,
                handler: ::std::sync::Arc<dyn #events::EventHandler>,
            ) -> #events::Result<()> {
                self.#router.add_listener_for(event, handler)
            }
        },
        syn::parse_quote! {
            pub fn remove_event_listener<H: ?Sized>(&self, handler: &::std::sync::Arc<H>) {
                self.#router.remove_listener(handler)
            }
        },
        syn::parse_quote! {
            pub fn remove_event_listener_for<H: ?Sized>(
                &self,
                event: &str,
                handler: &::std::sync::Arc<H>,
            ) -> #events::Result<()> {
                self.#router.remove_listener_for(event, handler)
            }
        },
        syn::parse_quote! {
            /// Publish synchronously on the caller's thread
            pub fn publish_event(
                &self,
                event: &str,
                args: impl ::std::convert::Into<#events::EventArgs>,
            ) -> #events::Result<()> {
                self.#router.publish(event, args)
            }
        },
        syn::parse_quote! {
            /// Publish on the router's designated thread
            pub fn publish_event_outside(
                &self,
                event: &str,
                args: impl ::std::convert::Into<#events::EventArgs>,
            ) -> #events::Result<()> {
                self.#router.publish_outside(event, args)
            }
        },
        syn::parse_quote! {
            /// Publish on a worker thread without waiting
            pub fn publish_event_async(
                &self,
                event: &str,
                args: impl ::std::convert::Into<#events::EventArgs>,
            ) -> #events::Result<()> {
                self.#router.publish_async(event, args)
            }
        },
    ];
    input.items.extend(methods);

    Ok(input.into_token_stream())
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;
    use syn::parse_quote;

    fn method_names(tokens: TokenStream2) -> Vec<String> {
        let output: ItemImpl = syn::parse2(tokens).unwrap();
        output
            .items
            .iter()
            .filter_map(|item| match item {
                ImplItem::Fn(method) => Some(method.sig.ident.to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_injects_all_methods_into_empty_impl() {
        let input: ItemImpl = parse_quote! {
            impl Editor {
                fn title(&self) -> &str { "untitled" }
            }
        };

        let names = method_names(expand(&PublisherArgs::default(), input).unwrap());
        assert_eq!(names.len(), 1 + PUBLISHER_METHODS.len());
        assert_eq!(names[0], "title");
        for method in PUBLISHER_METHODS {
            assert!(names.iter().any(|n| n == method), "{} not injected", method);
        }
    }

    #[test]
    fn test_uses_default_router_field() {
        let input: ItemImpl = parse_quote! { impl Editor {} };
        let output = expand(&PublisherArgs::default(), input).unwrap().to_string();
        assert!(output.contains("self . event_router . publish_async"));
        assert!(output.contains(":: trellis_events :: EventArgs"));
    }

    #[test]
    fn test_custom_router_and_path() {
        let args: PublisherArgs = syn::parse2(quote!(router = bus, path = trellis::events)).unwrap();
        let input: ItemImpl = parse_quote! { impl Editor {} };
        let output = expand(&args, input).unwrap().to_string();
        assert!(output.contains("self . bus . add_listener_for"));
        assert!(output.contains("trellis :: events :: EventHandler"));
    }

    #[test]
    fn test_complete_manual_impl_is_left_alone() {
        let input: ItemImpl = parse_quote! {
            impl Editor {
                pub fn add_event_listener(&self) {}
                pub fn add_event_listener_for(&self) {}
                pub fn remove_event_listener(&self) {}
                pub fn remove_event_listener_for(&self) {}
                pub fn publish_event(&self) {}
                pub fn publish_event_outside(&self) {}
                pub fn publish_event_async(&self) {}
            }
        };

        let names = method_names(expand(&PublisherArgs::default(), input).unwrap());
        assert_eq!(names.len(), PUBLISHER_METHODS.len());
    }

    #[test]
    fn test_partial_impl_is_rejected() {
        let input: ItemImpl = parse_quote! {
            impl Editor {
                pub fn publish_event(&self) {}
                pub fn add_event_listener(&self) {}
            }
        };

        let err = expand(&PublisherArgs::default(), input).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("`Editor`"));
        assert!(message.contains("publish_event_async"));
        assert!(message.contains("remove_event_listener_for"));
        assert!(!message.contains("missing: add_event_listener,"));
    }

    #[test]
    fn test_trait_impl_is_rejected() {
        let input: ItemImpl = parse_quote! { impl Clone for Editor {} };
        assert!(expand(&PublisherArgs::default(), input).is_err());
    }

    #[test]
    fn test_unknown_argument() {
        assert!(syn::parse2::<PublisherArgs>(quote!(bus = router)).is_err());
        assert!(syn::parse2::<PublisherArgs>(quote!(router = "bus")).is_err());
    }
}
