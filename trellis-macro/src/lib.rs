// Procedural macros for the Trellis framework
// Generates router-delegating boilerplate for types that own an event router

use proc_macro::TokenStream;

mod event_publisher;

/// Injects event publisher methods into an inherent impl block.
///
/// The type must own an `EventRouter` field, named `event_router` unless
/// `router = field` says otherwise. The attribute only sees the impl block,
/// so it does not add that field; declaring it is left to the type, which
/// also decides how the router is built or shared. The generated methods
/// delegate to that router:
///
/// - `add_event_listener`, `add_event_listener_for`
/// - `remove_event_listener`, `remove_event_listener_for`
/// - `publish_event`, `publish_event_outside`, `publish_event_async`
///
/// An impl block that already defines all of them is left untouched. One
/// that defines only some of them is rejected.
///
/// ```ignore
/// use trellis_events::EventRouter;
/// use trellis_macro::event_publisher;
///
/// struct Editor {
///     bus: EventRouter,
/// }
///
/// #[event_publisher(router = bus)]
/// impl Editor {}
///
/// editor.publish_event("saved", ())?;
/// ```
///
/// The generated code refers to `::trellis_events`. Pass
/// `path = trellis::events` when the events crate is only reachable through
/// the framework crate.
#[proc_macro_attribute]
pub fn event_publisher(attr: TokenStream, item: TokenStream) -> TokenStream {
    event_publisher::event_publisher_impl(attr, item)
}
