//! Procedural macros for reqpick.
//!
//! This crate provides `#[derive(Pick)]`, which turns `#[pick(...)]` field
//! attributes into a static binding descriptor. Use it through the `reqpick`
//! crate, which re-exports the derive next to the `Pick` trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use reqpick::Pick;
//!
//! #[derive(Default, serde::Serialize, serde::Deserialize, Pick)]
//! struct Person {
//!     #[pick(header = "age", minimum = 0, maximum = 130)]
//!     pub age: u8,
//!     #[pick(header = "token", setter = "set_token")]
//!     token: String,
//! }
//! ```
//!
//! # Generated Code
//!
//! The derive generates approximately:
//!
//! ```rust,ignore
//! impl reqpick::Pick for Person {
//!     fn descriptor() -> &'static reqpick::Descriptor<Self> {
//!         static DESCRIPTOR: OnceLock<reqpick::Descriptor<Person>> = OnceLock::new();
//!         DESCRIPTOR.get_or_init(|| {
//!             reqpick::Descriptor::<Person>::builder()
//!                 .name("Person")
//!                 .field(Field::<Person>::new::<u8>("age", |r| &mut r.age)
//!                     .source(Source::Header, "age")
//!                     .minimum("0")
//!                     .maximum("130"))
//!                 .field(Field::<Person>::new::<String>("token", |r| &mut r.token)
//!                     .source(Source::Header, "token")
//!                     .restricted()
//!                     .setter(|r, raw| SetterOutput::into_setter_result(Person::set_token(r, raw))))
//!                 .build()
//!                 .unwrap_or_else(|err| panic!("{}", err))
//!         })
//!     }
//! }
//! ```

mod derive;
mod parse;

use proc_macro::TokenStream;

/// Derives `reqpick::Pick` for a struct with named fields.
///
/// # Field attributes
///
/// - `path = "key"`, `query = "key"`, `header = "key"` or `form = "key"`:
///   where the value is read from. At most one per field; untagged fields
///   are never touched.
/// - `min_length = N`, `max_length = N`: character count bounds for
///   `String` fields.
/// - `minimum = X`, `maximum = X`: inclusive bounds for numeric fields.
/// - `setter = "method"`: a method `fn(&mut self, &str) -> R` that assigns
///   the field, where `R` is `()` or a `Result`. Fields that are not `pub`
///   need one when they carry a source tag.
///
/// # Struct attributes
///
/// - `name = "Name"`: record name used in error messages.
#[proc_macro_derive(Pick, attributes(pick))]
pub fn derive_pick(input: TokenStream) -> TokenStream {
    derive::expand_derive(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
