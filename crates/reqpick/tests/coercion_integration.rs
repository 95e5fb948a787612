//! Integration tests for type coercion, setter overrides, validation bounds
//! and custom decoders.

use std::str::FromStr;

use bytes::Bytes;
use http::{Method, Uri};
use num_complex::{Complex32, Complex64};
use reqpick::{
    BoxError, DecodeTarget, Decoder, Pick, PickErrorKind, Picker, PickerConfig,
    RequestContextBuilder,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn header(name: &str, value: &str) -> reqpick::RequestContext {
    RequestContextBuilder::new().header(name, value).build()
}

#[derive(Debug, Default, Serialize, Deserialize, Pick)]
struct Numbers {
    #[pick(header = "i8")]
    pub i8: i8,
    #[pick(header = "i16")]
    pub i16: i16,
    #[pick(header = "i32")]
    pub i32: i32,
    #[pick(header = "i64")]
    pub i64: i64,
    #[pick(header = "isize")]
    pub isize: isize,
    #[pick(header = "u8")]
    pub u8: u8,
    #[pick(header = "u16")]
    pub u16: u16,
    #[pick(header = "u32")]
    pub u32: u32,
    #[pick(header = "u64")]
    pub u64: u64,
    #[pick(header = "usize")]
    pub usize: usize,
    #[pick(header = "f32")]
    pub f32: f32,
    #[pick(header = "f64")]
    pub f64: f64,
    #[pick(header = "c64")]
    pub c64: Complex32,
    #[pick(header = "c128")]
    pub c128: Complex64,
}

#[test]
fn test_width_limits_accepted() {
    let req = RequestContextBuilder::new()
        .header("i8", "-128")
        .header("i16", "32767")
        .header("i32", "-2147483648")
        .header("i64", "9223372036854775807")
        .header("u8", "255")
        .header("u16", "65535")
        .header("u32", "4294967295")
        .header("u64", "18446744073709551615")
        .header("f32", "1.5")
        .header("f64", "-123.99")
        .header("c64", "1+2i")
        .header("c128", "-1.175494351e-38")
        .build();
    let mut x = Numbers::default();
    Picker::new().pick(&mut x, &req).unwrap();

    assert_eq!(x.i8, i8::MIN);
    assert_eq!(x.i16, i16::MAX);
    assert_eq!(x.i32, i32::MIN);
    assert_eq!(x.i64, i64::MAX);
    assert_eq!(x.u8, u8::MAX);
    assert_eq!(x.u16, u16::MAX);
    assert_eq!(x.u32, u32::MAX);
    assert_eq!(x.u64, u64::MAX);
    assert_eq!(x.f32, 1.5);
    assert_eq!(x.f64, -123.99);
    assert_eq!(x.c64, Complex32::new(1.0, 2.0));
    assert_eq!(x.c128, Complex64::new(-1.175_494_351e-38, 0.0));
}

#[test]
fn test_width_overflow_rejected() {
    let cases = [
        ("i8", "128"),
        ("i16", "-32769"),
        ("i32", "2147483648"),
        ("i64", "9223372036854775808"),
        ("u8", "256"),
        ("u16", "65536"),
        ("u32", "4294967296"),
        ("u64", "18446744073709551616"),
        ("f32", "1e39"),
        ("f64", "2e308"),
        ("c64", "2e308+2e308i"),
        ("c128", "2e308+2e308i"),
    ];
    for (name, value) in cases {
        let err = Picker::new()
            .pick(&mut Numbers::default(), &header(name, value))
            .unwrap_err();
        assert_eq!(err.kind(), PickErrorKind::Syntax, "{name}={value}");
        assert!(err.to_string().ends_with("value out of range"), "{err}");
        assert_eq!(err.dest(), format!("Numbers.{name}"));
    }
}

#[test]
fn test_syntax_errors() {
    let cases = [
        ("i64", "hi"),
        ("u8", "-1"),
        ("usize", "1.0"),
        ("isize", ""),
        ("f64", "not a float64"),
        ("c128", "one"),
    ];
    for (name, value) in cases {
        let result = Picker::new().pick(&mut Numbers::default(), &header(name, value));
        if value.is_empty() {
            assert!(result.is_ok(), "empty values are skipped");
            continue;
        }
        let err = result.unwrap_err();
        assert!(err.to_string().ends_with("invalid syntax"), "{err}");
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Pick)]
struct Bounded {
    #[pick(header = "u8", minimum = 1, maximum = 5)]
    pub u8: u8,
    #[pick(header = "i32", minimum = -10, maximum = 10)]
    pub i32: i32,
    #[pick(header = "f64", minimum = 0.5, maximum = 1.5)]
    pub f64: f64,
    #[pick(header = "s", min_length = 2, max_length = 3)]
    pub s: String,
}

#[test]
fn test_bounds_inclusive() {
    let ok = [
        ("u8", "1"),
        ("u8", "5"),
        ("i32", "-10"),
        ("i32", "10"),
        ("f64", "0.5"),
        ("f64", "1.5"),
        ("s", "ab"),
        ("s", "abc"),
        ("s", "äöü"),
    ];
    for (name, value) in ok {
        Picker::new()
            .pick(&mut Bounded::default(), &header(name, value))
            .unwrap_or_else(|err| panic!("{name}={value}: {err}"));
    }

    let rejected = [
        ("u8", "0", "minimum exceeded"),
        ("u8", "6", "maximum exceeded"),
        ("i32", "-11", "minimum exceeded"),
        ("i32", "11", "maximum exceeded"),
        ("f64", "0.49", "minimum exceeded"),
        ("f64", "1.51", "maximum exceeded"),
        ("s", "a", "minLength exceeded"),
        ("s", "abcd", "maxLength exceeded"),
    ];
    for (name, value, cause) in rejected {
        let err = Picker::new()
            .pick(&mut Bounded::default(), &header(name, value))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("pick Bounded.{name} from header[{name}]: {cause}")
        );
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Color {
    #[default]
    Black,
    Red,
    Yellow,
}

impl FromStr for Color {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "black" => Ok(Self::Black),
            "red" => Ok(Self::Red),
            "yellow" => Ok(Self::Yellow),
            _ => Err(format!("unknown color: {s}")),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Pick)]
struct Paint {
    #[pick(header = "color")]
    pub color: Color,
    #[pick(query = "accent")]
    pub accent: Color,
}

#[test]
fn test_override_applies_to_every_field_of_type() {
    let mut picker = Picker::new();
    picker.use_setter::<Color, _>(|color, raw| {
        *color = raw.parse()?;
        Ok(())
    });
    picker.prepare::<Paint>().unwrap();

    let req = RequestContextBuilder::new()
        .uri(Uri::from_static("/?accent=red"))
        .header("color", "yellow")
        .build();
    let mut x = Paint::default();
    picker.pick(&mut x, &req).unwrap();
    assert_eq!(x.color, Color::Yellow);
    assert_eq!(x.accent, Color::Red);
}

#[test]
fn test_override_error() {
    let mut picker = Picker::new();
    picker.use_from_str::<Color>();
    let err = picker
        .pick(&mut Paint::default(), &header("color", "neon"))
        .unwrap_err();
    assert_eq!(err.kind(), PickErrorKind::Setter);
    assert_eq!(
        err.to_string(),
        "pick Paint.color from header[color]: unknown color: neon"
    );
}

#[test]
fn test_missing_override_is_unsupported() {
    let picker = Picker::new();
    assert!(picker.prepare::<Paint>().is_err());
    let err = picker
        .pick(&mut Paint::default(), &header("color", "red"))
        .unwrap_err();
    assert_eq!(err.kind(), PickErrorKind::Unsupported);
}

#[test]
#[should_panic(expected = "already exists")]
fn test_duplicate_override_panics() {
    let mut picker = Picker::new();
    picker.use_from_str::<Color>();
    picker.use_from_str::<Color>();
}

#[derive(Debug, Default, Serialize, Deserialize, Pick)]
struct Precedence {
    #[pick(header = "color", setter = "set_color")]
    pub color: Color,
}

impl Precedence {
    fn set_color(&mut self, _raw: &str) {
        self.color = Color::Black;
    }
}

#[test]
fn test_companion_setter_precedes_override() {
    let mut picker = Picker::new();
    picker.use_from_str::<Color>();
    let mut x = Precedence {
        color: Color::Red,
    };
    picker.pick(&mut x, &header("color", "yellow")).unwrap();
    assert_eq!(x.color, Color::Black);
}

#[derive(Debug, Default, Serialize, Deserialize, Pick)]
struct Overridden {
    #[pick(query = "n")]
    pub n: u32,
}

#[test]
fn test_override_precedes_coercion() {
    let mut picker = Picker::new();
    picker.use_setter::<u32, _>(|n, raw| {
        *n = u32::from_str_radix(raw, 16)?;
        Ok(())
    });
    let req = RequestContextBuilder::new()
        .uri(Uri::from_static("/?n=ff"))
        .build();
    let mut x = Overridden::default();
    picker.pick(&mut x, &req).unwrap();
    assert_eq!(x.n, 255);
}

/// Decodes `key: value` lines into a flat object.
struct LineDecoder(Bytes);

impl Decoder for LineDecoder {
    fn decode(&mut self, target: &mut dyn DecodeTarget) -> Result<(), BoxError> {
        let text = std::str::from_utf8(&self.0)?;
        let mut object = Map::new();
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| format!("expected `key: value`, got {line:?}"))?;
            object.insert(key.trim().to_owned(), Value::String(value.trim().to_owned()));
        }
        target.apply_document(Value::Object(object))
    }
}

#[derive(Debug, Default, Serialize, Deserialize, Pick)]
struct Person {
    pub name: String,
    #[pick(path = "id")]
    pub id: u64,
}

#[test]
fn test_custom_decoder() {
    let mut picker = Picker::new();
    picker.register("text/x-lines", |body| Box::new(LineDecoder(body)));

    let req = RequestContextBuilder::new()
        .method(Method::PUT)
        .header("content-type", "text/x-lines")
        .body("name: John Doe\n")
        .path_param("id", "123")
        .build();
    let mut x = Person::default();
    picker.pick(&mut x, &req).unwrap();
    assert_eq!(x.name, "John Doe");
    assert_eq!(x.id, 123);

    let req = RequestContextBuilder::new()
        .method(Method::PUT)
        .header("content-type", "text/x-lines")
        .body("garbage")
        .build();
    let err = picker.pick(&mut Person::default(), &req).unwrap_err();
    assert_eq!(err.kind(), PickErrorKind::Body);
    assert_eq!(
        err.to_string(),
        r#"pick Person from body: expected `key: value`, got "garbage""#
    );
}

#[test]
fn test_body_limit_from_config() {
    let config = PickerConfig::from_toml_str("max_body_size = 16").unwrap();
    let picker = Picker::with_config(config);
    let req = RequestContextBuilder::new()
        .method(Method::POST)
        .header("content-type", "application/json")
        .body(r#"{"name":"a name longer than sixteen bytes"}"#)
        .build();
    let err = picker.pick(&mut Person::default(), &req).unwrap_err();
    assert_eq!(err.kind(), PickErrorKind::PayloadTooLarge);
    assert_eq!(err.status_code(), http::StatusCode::PAYLOAD_TOO_LARGE);
}

#[test]
fn test_tracing_does_not_affect_binding() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("reqpick=trace"))
        .with_test_writer()
        .finish();
    tracing::subscriber::with_default(subscriber, || {
        let mut x = Bounded::default();
        Picker::new().pick(&mut x, &header("u8", "3")).unwrap();
        assert_eq!(x.u8, 3);
        assert!(Picker::new()
            .pick(&mut x, &header("u8", "9"))
            .is_err());
    });
}
