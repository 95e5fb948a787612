//! The binding orchestrator.

use std::any::Any;
use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::coerce::{self, CoerceError, Kind};
use crate::config::PickerConfig;
use crate::decode::{DecodeError, Decoder, DecoderRegistry, JsonDecoder, APPLICATION_JSON};
use crate::descriptor::{FieldDescriptor, Pick};
use crate::error::{BoxError, DescriptorError, PickError, PickErrorKind};
use crate::setter::SetterRegistry;
use crate::{Locator, RequestContext};

/// Binds request values into records.
///
/// A picker owns the body decoders, keyed by content type, and the setter
/// overrides, keyed by field type. Configure it once, then share it: `pick`
/// only needs `&self`.
///
/// # Example
///
/// ```rust
/// use reqpick::{Pick, Picker, RequestContextBuilder};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Default, Serialize, Deserialize, Pick)]
/// struct Person {
///     #[pick(header = "name", max_length = 20)]
///     pub name: String,
///     #[pick(header = "age", minimum = 0, maximum = 130)]
///     pub age: u8,
/// }
///
/// let req = RequestContextBuilder::new()
///     .header("name", "Ada")
///     .header("age", "36")
///     .build();
///
/// let mut person = Person::default();
/// Picker::new().pick(&mut person, &req).unwrap();
/// assert_eq!(person.name, "Ada");
/// assert_eq!(person.age, 36);
/// ```
pub struct Picker {
    config: PickerConfig,
    decoders: DecoderRegistry,
    setters: SetterRegistry,
}

impl Picker {
    /// Creates a picker with the default configuration and the JSON decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(PickerConfig::default())
    }

    /// Creates a picker with no decoders registered.
    #[must_use]
    pub fn bare() -> Self {
        Self::with_config(PickerConfig {
            json: false,
            ..PickerConfig::default()
        })
    }

    /// Creates a picker from a configuration.
    #[must_use]
    pub fn with_config(config: PickerConfig) -> Self {
        let mut decoders = DecoderRegistry::new();
        if config.json {
            decoders.register(APPLICATION_JSON, JsonDecoder::boxed);
        }
        Self {
            config,
            decoders,
            setters: SetterRegistry::default(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PickerConfig {
        &self.config
    }

    /// Returns the decoder registry.
    #[must_use]
    pub fn decoders(&self) -> &DecoderRegistry {
        &self.decoders
    }

    /// Registers a decoder factory for an exact content type, replacing any
    /// earlier registration.
    pub fn register<F>(&mut self, content_type: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(Bytes) -> Box<dyn Decoder> + Send + Sync + 'static,
    {
        let content_type = content_type.into();
        debug!(content_type = %content_type, "decoder registered");
        self.decoders.register(content_type, factory);
        self
    }

    /// Registers a setter for every field declared with type `V`.
    ///
    /// Companion setters declared on a field take precedence.
    ///
    /// # Panics
    ///
    /// Panics if a setter for `V` is already registered.
    pub fn use_setter<V, F>(&mut self, setter: F) -> &mut Self
    where
        V: Any,
        F: Fn(&mut V, &str) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        debug!(type_name = std::any::type_name::<V>(), "setter override registered");
        self.setters.insert::<V, F>(setter);
        self
    }

    /// Registers `V`'s [`FromStr`] implementation as its setter.
    ///
    /// # Panics
    ///
    /// Panics if a setter for `V` is already registered.
    pub fn use_from_str<V>(&mut self) -> &mut Self
    where
        V: FromStr + Any,
        V::Err: Into<BoxError>,
    {
        debug!(type_name = std::any::type_name::<V>(), "setter override registered");
        self.setters.insert_from_str::<V>();
        self
    }

    /// Builds `T`'s descriptor and checks that every tagged field can be
    /// assigned.
    ///
    /// Fields whose type has no coercion rule, no companion setter and no
    /// registered override would fail every request that carries them.
    pub fn prepare<T: Pick>(&self) -> Result<(), DescriptorError> {
        let descriptor = T::descriptor();
        for field in descriptor.fields() {
            if field.source().is_some()
                && field.setter().is_none()
                && field.kind() == Kind::Other
                && !self.setters.contains(field.type_name())
            {
                return Err(DescriptorError::Unsupported {
                    dest: field.dest().to_owned(),
                    type_name: field.type_name(),
                });
            }
        }
        debug!(dest = descriptor.name(), fields = descriptor.fields().len(), "descriptor prepared");
        Ok(())
    }

    /// Binds the request into `dest`.
    ///
    /// The body is decoded first, unless the method is GET, HEAD or DELETE,
    /// and merged into `dest`: keys missing from the body keep their current
    /// values. Tagged fields are then assigned in declaration order; fields whose
    /// value is absent or empty are left as they are. The first failure is
    /// returned and assignments made before it are kept.
    ///
    /// # Panics
    ///
    /// Panics if `T`'s descriptor is inconsistent, for example a restricted
    /// field with a source but no companion setter.
    pub fn pick<T>(&self, dest: &mut T, req: &RequestContext) -> Result<(), PickError>
    where
        T: Pick + Serialize + DeserializeOwned,
    {
        let descriptor = T::descriptor();
        self.decode_body(dest, descriptor.name(), req)?;

        for field in descriptor.fields() {
            let Some((source, key)) = field.source() else {
                continue;
            };
            let raw = source.read(req, key);
            if raw.is_empty() {
                trace!(field = field.dest(), %source, key, "no value, field skipped");
                continue;
            }
            if let Err(err) = self.assign(dest, field, &raw) {
                debug!(error = %err, "pick failed");
                return Err(err);
            }
            trace!(field = field.dest(), %source, key, "field assigned");
        }
        Ok(())
    }

    fn decode_body<T>(&self, dest: &mut T, name: &str, req: &RequestContext) -> Result<(), PickError>
    where
        T: Serialize + DeserializeOwned,
    {
        if [Method::GET, Method::HEAD, Method::DELETE].contains(req.method()) {
            trace!(method = %req.method(), "body decoding skipped");
            return Ok(());
        }

        let content_type = req.content_type().unwrap_or_default();
        if !self.decoders.contains(content_type) {
            trace!(content_type, "no decoder registered, body left undecoded");
            return Ok(());
        }

        let body = req.body();
        if body.len() > self.config.max_body_size {
            let err = PickError::new(
                name,
                Locator::Body,
                PickErrorKind::PayloadTooLarge,
                DecodeError::PayloadTooLarge {
                    limit: self.config.max_body_size,
                    actual: body.len(),
                },
            );
            debug!(error = %err, "pick failed");
            return Err(err);
        }

        debug!(content_type, size = body.len(), "decoding body");
        let mut decoder = self.decoders.resolve(content_type, body.clone());
        decoder.decode(dest).map_err(|cause| {
            let err = PickError::new(name, Locator::Body, PickErrorKind::Body, cause);
            debug!(error = %err, "pick failed");
            err
        })
    }

    fn assign<T>(&self, dest: &mut T, field: &FieldDescriptor<T>, raw: &str) -> Result<(), PickError> {
        let locator = || field.locator().unwrap_or(Locator::Body);
        let setter_failed =
            |cause: BoxError| PickError::new(field.dest(), locator(), PickErrorKind::Setter, cause);

        if let Some(setter) = field.setter() {
            setter(dest, raw).map_err(setter_failed)?;
        } else if let Some(setter) = self.setters.get(field.type_name()) {
            setter(field.slot(dest), raw).map_err(setter_failed)?;
        } else if let Some(entry) = coerce::lookup(field.type_id()) {
            entry
                .assign(field.slot(dest), raw)
                .map_err(|err| PickError::coerce(field.dest().to_owned(), locator(), err))?;
        } else {
            return Err(PickError::coerce(
                field.dest().to_owned(),
                locator(),
                CoerceError::Unsupported {
                    type_name: field.type_name(),
                },
            ));
        }

        field
            .check(dest, raw)
            .map_err(|err| PickError::validation(field.dest().to_owned(), locator(), err))
    }
}

impl Default for Picker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Picker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Picker")
            .field("config", &self.config)
            .field("decoders", &self.decoders)
            .field("setters", &self.setters)
            .finish()
    }
}
