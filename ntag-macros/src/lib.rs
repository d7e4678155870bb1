use proc_macro::TokenStream;

mod progress;

/// Attaches spinner messages to an instrumented function's span.
///
/// Arguments:
/// - `message = <expr>`: text shown while the span is active.
/// - `finished = <expr>`: text shown once the span closes.
///
/// When the function already carries `#[instrument(...)]`, `progress = true`
/// is added to its `fields(...)`; otherwise an `#[tracing::instrument]` is
/// added so the span exists.
#[proc_macro_attribute]
pub fn progress(attr: TokenStream, item: TokenStream) -> TokenStream {
    progress::expand(attr, item)
}
