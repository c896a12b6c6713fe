use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use rust_decimal::Decimal;
use std::io::Cursor;

use super::XmlOptions;
use crate::core::FacturaError;

pub type XmlResult = Result<String, FacturaError>;

fn xml_io(e: std::io::Error) -> FacturaError {
    FacturaError::Xml(format!("XML write error: {e}"))
}

/// Thin wrapper over `quick_xml::Writer` that never emits self-closing tags:
/// every element is written as a start/end pair, even when empty.
pub struct XmlWriter {
    writer: Writer<Cursor<Vec<u8>>>,
}

impl XmlWriter {
    pub fn new(options: &XmlOptions) -> Result<Self, FacturaError> {
        let mut writer = if options.indent > 0 {
            Writer::new_with_indent(Cursor::new(Vec::new()), b' ', options.indent)
        } else {
            Writer::new(Cursor::new(Vec::new()))
        };
        if options.declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                .map_err(xml_io)?;
        }
        Ok(Self { writer })
    }

    pub fn into_string(self) -> Result<String, FacturaError> {
        let buf = self.writer.into_inner().into_inner();
        String::from_utf8(buf).map_err(|e| FacturaError::Xml(format!("XML UTF-8 error: {e}")))
    }

    pub fn start_element(&mut self, name: &str) -> Result<&mut Self, FacturaError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn start_element_with_attrs(
        &mut self,
        name: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, FacturaError> {
        let mut elem = BytesStart::new(name);
        for (k, v) in attrs {
            elem.push_attribute((*k, *v));
        }
        self.writer
            .write_event(Event::Start(elem))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn end_element(&mut self, name: &str) -> Result<&mut Self, FacturaError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_io)?;
        Ok(self)
    }

    pub fn text_element(&mut self, name: &str, text: &str) -> Result<&mut Self, FacturaError> {
        self.text_element_with_attrs(name, text, &[])
    }

    pub fn text_element_with_attrs(
        &mut self,
        name: &str,
        text: &str,
        attrs: &[(&str, &str)],
    ) -> Result<&mut Self, FacturaError> {
        self.start_element_with_attrs(name, attrs)?;
        // Written even when empty so the end tag stays on the same line.
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(xml_io)?;
        self.end_element(name)
    }

    /// Write the element only when a value is present.
    pub fn opt_text_element(
        &mut self,
        name: &str,
        text: Option<&str>,
    ) -> Result<&mut Self, FacturaError> {
        if let Some(text) = text {
            self.text_element(name, text)?;
        }
        Ok(self)
    }

    /// Write a decimal with the scale it carries (`15`, `20.00`, `0.125`).
    pub fn decimal_element(&mut self, name: &str, value: Decimal) -> Result<&mut Self, FacturaError> {
        self.text_element(name, &value.to_string())
    }
}
