//! Browser DOM layer for the markup composer.
//!
//! This crate implements the `composer-core` host traits over the DOM and
//! wires browser events to a [`Composer`]. It assumes a
//! `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `layout`: span and container measurement for caret placement
//! - `input`: the textarea holding the text and native selection
//! - `editing`: `execCommand`-based formatting of a contenteditable
//! - `pointer`: mousedown to caret offset, via `caretRangeFromPoint`
//! - `focus`: deferred refocusing of the textarea
//! - `keyboard`: formatter shortcuts from keydown events
//! - `view`: event listeners and repainting
//!
//! # Re-exports
//!
//! This crate re-exports `composer-core` for convenience, so consumers only
//! need to depend on `composer-browser`.

pub use composer_core;
pub use composer_core::*;

pub mod editing;
pub mod focus;
pub mod input;
pub mod keyboard;
pub mod layout;
pub mod pointer;
pub mod view;

pub use editing::DomEditing;
pub use input::TextareaInput;
pub use keyboard::handle_formatter_keydown;
pub use layout::DomLayout;
pub use view::ComposerView;

/// Install the panic hook and route `tracing` to the browser console.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_logging() {
    use tracing::Level;
    use tracing::subscriber::set_global_default;
    use tracing_subscriber::Registry;
    use tracing_subscriber::layer::SubscriberExt;

    console_error_panic_hook::set_once();

    let console_level = if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level)
            .build(),
    );

    let _ = set_global_default(Registry::default().with(wasm_layer));
}
