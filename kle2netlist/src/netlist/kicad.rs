//! KiCad s-expression netlist writer

use std::io::Write;

use super::{NetlistData, NetlistError, NETLIST_VERSION};
use crate::parser::sexp::SExp;

fn optional_pair(key: &str, value: Option<&str>) -> Option<SExp> {
    value.map(|v| SExp::pair(key, v))
}

/// `(field (name "Reference") "D")`
fn field(name: &str, value: &str) -> SExp {
    SExp::node("field", [SExp::pair("name", name), SExp::atom(value)])
}

/// Build the `(export ...)` tree.
pub fn to_sexp(data: &NetlistData) -> SExp {
    let design = SExp::node(
        "design",
        [
            SExp::pair("source", &data.source),
            SExp::pair("date", &data.date),
            SExp::pair("tool", &data.tool),
        ],
    );

    let components = SExp::node(
        "components",
        data.components.iter().map(|c| {
            let mut libsource = vec![SExp::pair("lib", &c.lib), SExp::pair("part", &c.part)];
            libsource.extend(optional_pair("description", c.description.as_deref()));

            let mut items = vec![SExp::pair("ref", &c.reference), SExp::pair("value", &c.value)];
            items.extend(optional_pair("footprint", c.footprint.as_deref()));
            items.push(SExp::node("libsource", libsource));
            items.push(SExp::node(
                "sheetpath",
                [SExp::pair("names", "/"), SExp::pair("tstamps", "/")],
            ));
            items.push(SExp::pair("tstamps", &c.tstamp));
            SExp::node("comp", items)
        }),
    );

    let libparts = SExp::node(
        "libparts",
        data.libparts.iter().map(|l| {
            let mut items = vec![SExp::pair("lib", &l.lib), SExp::pair("part", &l.part)];
            items.extend(optional_pair("description", l.description.as_deref()));
            items.push(SExp::node(
                "fields",
                [
                    field("Reference", &l.reference_prefix),
                    field("Value", &l.value),
                ],
            ));
            if !l.pins.is_empty() {
                items.push(SExp::node(
                    "pins",
                    l.pins.iter().map(|p| {
                        SExp::node(
                            "pin",
                            [
                                SExp::pair("num", &p.number),
                                SExp::pair("name", p.name.as_deref().unwrap_or("~")),
                                SExp::pair("type", p.electrical_type.as_kicad()),
                            ],
                        )
                    }),
                ));
            }
            SExp::node("libpart", items)
        }),
    );

    let nets = SExp::node(
        "nets",
        data.nets.iter().map(|n| {
            let mut items = vec![
                SExp::pair("code", n.code.to_string()),
                SExp::pair("name", &n.name),
            ];
            items.extend(n.nodes.iter().map(|node| {
                let mut attrs = vec![SExp::pair("ref", &node.reference), SExp::pair("pin", &node.pin)];
                attrs.extend(optional_pair("pinfunction", node.pin_function.as_deref()));
                attrs.push(SExp::pair("pintype", &node.pin_type));
                SExp::node("node", attrs)
            }));
            SExp::node("net", items)
        }),
    );

    SExp::node(
        "export",
        [
            SExp::pair("version", NETLIST_VERSION),
            design,
            components,
            libparts,
            nets,
        ],
    )
}

pub fn write<W: Write>(data: &NetlistData, mut writer: W) -> Result<(), NetlistError> {
    writer.write_all(to_sexp(data).to_pretty_string().as_bytes())?;
    Ok(())
}
