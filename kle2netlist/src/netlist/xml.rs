//! KiCad XML netlist writer

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::{NetlistData, NetlistError, NETLIST_VERSION};

/// Thin wrapper mapping quick-xml errors into [`NetlistError`]
struct XmlWriter<W: Write> {
    inner: Writer<W>,
}

impl<W: Write> XmlWriter<W> {
    fn new(writer: W) -> Self {
        Self {
            inner: Writer::new_with_indent(writer, b' ', 2),
        }
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), NetlistError> {
        self.inner
            .write_event(event)
            .map_err(|e| NetlistError::Xml(e.to_string()))
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), NetlistError> {
        let mut elem = BytesStart::new(name);
        for attr in attrs {
            elem.push_attribute(*attr);
        }
        self.event(Event::Start(elem))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), NetlistError> {
        let mut elem = BytesStart::new(name);
        for attr in attrs {
            elem.push_attribute(*attr);
        }
        self.event(Event::Empty(elem))
    }

    fn end(&mut self, name: &str) -> Result<(), NetlistError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    /// `<name attrs...>text</name>`
    fn text(&mut self, name: &str, attrs: &[(&str, &str)], text: &str) -> Result<(), NetlistError> {
        self.start(name, attrs)?;
        self.event(Event::Text(BytesText::new(text)))?;
        self.end(name)
    }

    fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

pub fn write<W: Write>(data: &NetlistData, writer: W) -> Result<(), NetlistError> {
    let mut xml = XmlWriter::new(writer);

    xml.event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    xml.start("export", &[("version", NETLIST_VERSION)])?;

    xml.start("design", &[])?;
    xml.text("source", &[], &data.source)?;
    xml.text("date", &[], &data.date)?;
    xml.text("tool", &[], &data.tool)?;
    xml.end("design")?;

    xml.start("components", &[])?;
    for c in &data.components {
        xml.start("comp", &[("ref", c.reference.as_str())])?;
        xml.text("value", &[], &c.value)?;
        if let Some(footprint) = &c.footprint {
            xml.text("footprint", &[], footprint)?;
        }
        let mut libsource = vec![("lib", c.lib.as_str()), ("part", c.part.as_str())];
        if let Some(description) = &c.description {
            libsource.push(("description", description.as_str()));
        }
        xml.empty("libsource", &libsource)?;
        xml.empty("sheetpath", &[("names", "/"), ("tstamps", "/")])?;
        xml.text("tstamps", &[], &c.tstamp)?;
        xml.end("comp")?;
    }
    xml.end("components")?;

    xml.start("libparts", &[])?;
    for l in &data.libparts {
        xml.start("libpart", &[("lib", l.lib.as_str()), ("part", l.part.as_str())])?;
        if let Some(description) = &l.description {
            xml.text("description", &[], description)?;
        }
        xml.start("fields", &[])?;
        xml.text("field", &[("name", "Reference")], &l.reference_prefix)?;
        xml.text("field", &[("name", "Value")], &l.value)?;
        xml.end("fields")?;
        if !l.pins.is_empty() {
            xml.start("pins", &[])?;
            for p in &l.pins {
                xml.empty(
                    "pin",
                    &[
                        ("num", p.number.as_str()),
                        ("name", p.name.as_deref().unwrap_or("~")),
                        ("type", p.electrical_type.as_kicad()),
                    ],
                )?;
            }
            xml.end("pins")?;
        }
        xml.end("libpart")?;
    }
    xml.end("libparts")?;

    xml.start("nets", &[])?;
    for n in &data.nets {
        let code = n.code.to_string();
        xml.start("net", &[("code", code.as_str()), ("name", n.name.as_str())])?;
        for node in &n.nodes {
            let mut attrs = vec![("ref", node.reference.as_str()), ("pin", node.pin.as_str())];
            if let Some(function) = &node.pin_function {
                attrs.push(("pinfunction", function.as_str()));
            }
            attrs.push(("pintype", node.pin_type.as_str()));
            xml.empty("node", &attrs)?;
        }
        xml.end("net")?;
    }
    xml.end("nets")?;

    xml.end("export")?;

    let mut inner = xml.into_inner();
    inner.write_all(b"\n")?;
    inner.flush()?;
    Ok(())
}
