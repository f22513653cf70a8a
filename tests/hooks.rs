//! Custom encoding and decoding hooks

use pretty_assertions::assert_eq;
use xmlbind::{
    from_str, to_string, xml_schema, DecodeHook, EncodeHook, MarshalText, MarshalXml, Name,
    StartElement, Token, TokenDecoder, TokenEncoder, UnmarshalText, UnmarshalXml, ValueMut,
    ValueRef, XmlError, XmlResult, XmlValue,
};

/// Written as `<name>x,y</name>`
#[derive(Debug, Default, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

impl MarshalXml for Point {
    fn marshal_xml(&self, encoder: &mut dyn TokenEncoder, start: StartElement) -> XmlResult<()> {
        let end = start.end();
        encoder.encode_token(Token::Start(start))?;
        encoder.encode_token(Token::CharData(format!("{},{}", self.x, self.y)))?;
        encoder.encode_token(Token::End(end))
    }
}

impl UnmarshalXml for Point {
    fn unmarshal_xml(
        &mut self,
        decoder: &mut dyn TokenDecoder,
        _start: &StartElement,
    ) -> XmlResult<()> {
        let mut text = String::new();
        while let Some(token) = decoder.token()? {
            match token {
                Token::CharData(data) => text.push_str(&data),
                Token::Start(_) => decoder.skip()?,
                _ => {}
            }
        }
        let (x, y) = text
            .split_once(',')
            .ok_or_else(|| XmlError::BadValue(format!("not a point: {:?}", text)))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<i32>()
                .map_err(|e| XmlError::BadValue(e.to_string()))
        };
        self.x = parse(x)?;
        self.y = parse(y)?;
        Ok(())
    }
}

impl XmlValue for Point {
    fn type_name(&self) -> &'static str {
        "Point"
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Opaque
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Opaque
    }

    fn encode_hook(&self) -> Option<EncodeHook<'_>> {
        Some(EncodeHook::Element(self))
    }

    fn decode_hook(&mut self) -> Option<DecodeHook<'_>> {
        Some(DecodeHook::Element(self))
    }
}

/// Temperature written as text, e.g. `21.5C`
#[derive(Debug, Default, PartialEq)]
struct Celsius(f64);

impl MarshalText for Celsius {
    fn marshal_text(&self) -> XmlResult<String> {
        Ok(format!("{:.1}C", self.0))
    }
}

impl UnmarshalText for Celsius {
    fn unmarshal_text(&mut self, text: &str) -> XmlResult<()> {
        let degrees = text
            .trim()
            .strip_suffix('C')
            .ok_or_else(|| XmlError::BadValue(format!("missing unit in {:?}", text)))?;
        self.0 = degrees
            .parse()
            .map_err(|e: std::num::ParseFloatError| XmlError::BadValue(e.to_string()))?;
        Ok(())
    }
}

impl XmlValue for Celsius {
    fn type_name(&self) -> &'static str {
        "Celsius"
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Opaque
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Opaque
    }

    fn encode_hook(&self) -> Option<EncodeHook<'_>> {
        Some(EncodeHook::Text(self))
    }

    fn decode_hook(&mut self) -> Option<DecodeHook<'_>> {
        Some(DecodeHook::Text(self))
    }
}

#[derive(Debug, Default, PartialEq)]
struct Station {
    temp: Celsius,
    at: Point,
    readings: Vec<Celsius>,
}

xml_schema!(Station {
    temp: "temp,attr",
    at: "at",
    readings: "reading",
});

#[test]
fn test_hooks_round_trip() {
    let station = Station {
        temp: Celsius(21.5),
        at: Point { x: 1, y: -2 },
        readings: vec![Celsius(1.0), Celsius(-3.5)],
    };
    let xml = to_string(&station).unwrap();
    assert_eq!(
        xml,
        concat!(
            r#"<Station temp="21.5C"><at>1,-2</at>"#,
            "<reading>1.0C</reading><reading>-3.5C</reading></Station>"
        )
    );
    assert_eq!(from_str::<Station>(&xml).unwrap(), station);
}

#[test]
fn test_hook_on_root_uses_type_name() {
    assert_eq!(to_string(&Point { x: 3, y: 4 }).unwrap(), "<Point>3,4</Point>");
    assert_eq!(to_string(&Celsius(0.0)).unwrap(), "<Celsius>0.0C</Celsius>");
}

#[test]
fn test_hook_errors_propagate() {
    let err = from_str::<Station>(r#"<Station temp="hot"/>"#).unwrap_err();
    assert!(matches!(err, XmlError::BadValue(_)));

    let err = from_str::<Station>("<Station><at>1;2</at></Station>").unwrap_err();
    assert!(matches!(err, XmlError::BadValue(_)));
}

#[test]
fn test_element_hook_skips_children() {
    let station: Station = from_str("<Station><at>5,<ignored>x</ignored>6</at></Station>").unwrap();
    assert_eq!(station.at, Point { x: 5, y: 6 });
}

#[derive(Debug, Default, PartialEq)]
struct Envelope {
    body: Point,
}

impl MarshalXml for Envelope {
    fn marshal_xml(&self, encoder: &mut dyn TokenEncoder, start: StartElement) -> XmlResult<()> {
        let end = start.end();
        encoder.encode_token(Token::Start(start))?;
        encoder.encode_element(&self.body, StartElement::new(Name::local("Body")))?;
        encoder.encode_token(Token::End(end))
    }
}

impl UnmarshalXml for Envelope {
    fn unmarshal_xml(
        &mut self,
        decoder: &mut dyn TokenDecoder,
        _start: &StartElement,
    ) -> XmlResult<()> {
        while let Some(token) = decoder.token()? {
            if let Token::Start(child) = token {
                if child.name.local == "Body" {
                    decoder.decode_element(&mut self.body, &child)?;
                } else {
                    decoder.skip()?;
                }
            }
        }
        Ok(())
    }
}

impl XmlValue for Envelope {
    fn type_name(&self) -> &'static str {
        "Envelope"
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Opaque
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Opaque
    }

    fn encode_hook(&self) -> Option<EncodeHook<'_>> {
        Some(EncodeHook::Element(self))
    }

    fn decode_hook(&mut self) -> Option<DecodeHook<'_>> {
        Some(DecodeHook::Element(self))
    }
}

#[test]
fn test_nested_values_inside_hooks() {
    let envelope = Envelope {
        body: Point { x: 7, y: 8 },
    };
    let xml = to_string(&envelope).unwrap();
    assert_eq!(xml, "<Envelope><Body>7,8</Body></Envelope>");

    let back: Envelope = from_str("<Envelope><Header/><Body>7,8</Body></Envelope>").unwrap();
    assert_eq!(back, envelope);
}

/// Opens an element and never closes it
#[derive(Debug, Default)]
struct Leaky;

impl MarshalXml for Leaky {
    fn marshal_xml(&self, encoder: &mut dyn TokenEncoder, start: StartElement) -> XmlResult<()> {
        encoder.encode_token(Token::Start(start))
    }
}

impl XmlValue for Leaky {
    fn type_name(&self) -> &'static str {
        "Leaky"
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Opaque
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Opaque
    }

    fn encode_hook(&self) -> Option<EncodeHook<'_>> {
        Some(EncodeHook::Element(self))
    }
}

/// Tries to close the element around it
#[derive(Debug, Default)]
struct Closer;

impl MarshalXml for Closer {
    fn marshal_xml(&self, encoder: &mut dyn TokenEncoder, _start: StartElement) -> XmlResult<()> {
        encoder.encode_token(Token::End(StartElement::new(Name::local("Holder")).end()))
    }
}

impl XmlValue for Closer {
    fn type_name(&self) -> &'static str {
        "Closer"
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Opaque
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Opaque
    }

    fn encode_hook(&self) -> Option<EncodeHook<'_>> {
        Some(EncodeHook::Element(self))
    }
}

#[derive(Debug, Default)]
struct Holder {
    closer: Closer,
}

xml_schema!(Holder {
    closer: "closer",
});

#[test]
fn test_hook_must_balance_its_elements() {
    let err = to_string(&Leaky).unwrap_err();
    assert!(matches!(err, XmlError::Malformed(_)));
    assert!(err.to_string().contains("Leaky"));

    let err = to_string(&Holder::default()).unwrap_err();
    assert!(matches!(err, XmlError::Malformed(_)));
}

/// Reads the first child and returns, leaving the rest of the element
#[derive(Debug, Default)]
struct Partial;

impl UnmarshalXml for Partial {
    fn unmarshal_xml(
        &mut self,
        decoder: &mut dyn TokenDecoder,
        _start: &StartElement,
    ) -> XmlResult<()> {
        decoder.token()?;
        Ok(())
    }
}

impl XmlValue for Partial {
    fn type_name(&self) -> &'static str {
        "Partial"
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Opaque
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Opaque
    }

    fn decode_hook(&mut self) -> Option<DecodeHook<'_>> {
        Some(DecodeHook::Element(self))
    }
}

#[test]
fn test_decode_hook_must_consume_element() {
    let err = from_str::<Partial>("<p><a/><b/></p>").unwrap_err();
    assert!(matches!(err, XmlError::Malformed(_)));
}

/// Keeps its content as unparsed markup
#[derive(Debug, Default, PartialEq)]
struct Verbatim(String);

impl UnmarshalXml for Verbatim {
    fn unmarshal_xml(
        &mut self,
        decoder: &mut dyn TokenDecoder,
        _start: &StartElement,
    ) -> XmlResult<()> {
        self.0 = decoder.read_inner_xml()?;
        Ok(())
    }
}

impl XmlValue for Verbatim {
    fn type_name(&self) -> &'static str {
        "Verbatim"
    }

    fn as_value_ref(&self) -> ValueRef<'_> {
        ValueRef::Opaque
    }

    fn as_value_mut(&mut self) -> ValueMut<'_> {
        ValueMut::Opaque
    }

    fn decode_hook(&mut self) -> Option<DecodeHook<'_>> {
        Some(DecodeHook::Element(self))
    }
}

#[derive(Debug, Default, PartialEq)]
struct Snippet {
    markup: Verbatim,
    after: String,
}

xml_schema!(Snippet {
    markup: "markup",
    after: "after",
});

#[test]
fn test_hook_reads_inner_xml() {
    let input = "<Snippet><markup><b>bold</b> &amp; <i/></markup><after>x</after></Snippet>";
    let snippet: Snippet = from_str(input).unwrap();
    assert_eq!(snippet.markup, Verbatim("<b>bold</b> &amp; <i/>".to_string()));
    assert_eq!(snippet.after, "x");

    let empty: Snippet = from_str("<Snippet><markup></markup></Snippet>").unwrap();
    assert_eq!(empty.markup, Verbatim(String::new()));
}
