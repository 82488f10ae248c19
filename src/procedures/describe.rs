use crate::error::ProcedureError;
use crate::event::{Event, Property, PropertyType, PropertyValue, TIMESTAMP_PROPERTY_NAME};
use crate::procedure::{Lifecycle, Procedure};
use crate::text_output::{Sink, TextOutput, TextOutputProcedure};
use std::collections::HashSet;

const INDENT: &str = "  ";
const EMPTY_MAP: &str = "<empty>";

/// How an event signature is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureStyle {
    /// `Type[timestamp, a(String), m(Map){k1, k2}]`
    Inline,
    /// One element per line, nested elements indented two spaces per level
    Yaml,
}

/// Structural fingerprint of an event: its type name, `timestamp` for timed
/// events, then every other property in name order as `name(Type)`. Map
/// properties also list their keys in sorted order.
pub fn signature(event: &dyn Event, style: SignatureStyle) -> String {
    let mut properties: Vec<&Property> = event
        .properties()
        .iter()
        .filter(|p| !(event.is_timed() && p.name() == TIMESTAMP_PROPERTY_NAME))
        .collect();
    properties.sort_by(|a, b| a.name().cmp(b.name()));

    match style {
        SignatureStyle::Inline => inline_signature(event, &properties),
        SignatureStyle::Yaml => yaml_signature(event, &properties),
    }
}

fn map_keys(property: &Property) -> Option<Vec<&str>> {
    match property.value() {
        Some(PropertyValue::Map(map)) => {
            let mut keys: Vec<&str> = map.keys().map(String::as_str).collect();
            keys.sort_unstable();
            Some(keys)
        }
        None if property.property_type() == PropertyType::Map => Some(Vec::new()),
        _ => None,
    }
}

fn inline_signature(event: &dyn Event, properties: &[&Property]) -> String {
    let mut elements = Vec::with_capacity(properties.len() + 1);
    if event.is_timed() {
        elements.push(TIMESTAMP_PROPERTY_NAME.to_string());
    }
    for property in properties {
        let element = format!("{}({})", property.name(), property.property_type());
        let element = match map_keys(property) {
            Some(keys) if keys.is_empty() => format!("{}{{{}}}", element, EMPTY_MAP),
            Some(keys) => format!("{}{{{}}}", element, keys.join(", ")),
            None => element,
        };
        elements.push(element);
    }
    format!("{}[{}]", event.type_name(), elements.join(", "))
}

fn yaml_signature(event: &dyn Event, properties: &[&Property]) -> String {
    let mut s = String::from(event.type_name());
    s.push('\n');
    if event.is_timed() {
        s.push_str(&format!("{}{}\n", INDENT, TIMESTAMP_PROPERTY_NAME));
    }
    for property in properties {
        s.push_str(&format!(
            "{}{}({})\n",
            INDENT,
            property.name(),
            property.property_type()
        ));
        if let Some(keys) = map_keys(property) {
            let nested = INDENT.repeat(2);
            if keys.is_empty() {
                s.push_str(&format!("{}{}\n", nested, EMPTY_MAP));
            }
            for key in keys {
                s.push_str(&format!("{}{}\n", nested, key));
            }
        }
    }
    s
}

/// Writes the signature of every structurally new event, once
#[derive(Debug)]
pub struct Describe {
    lifecycle: Lifecycle,
    output: TextOutput,
    signatures: HashSet<String>,
}

impl Default for Describe {
    fn default() -> Self {
        Self::new()
    }
}

impl Describe {
    pub const COMMAND_LINE_LABELS: &'static [&'static str] = &["describe"];

    pub fn new() -> Self {
        Describe {
            lifecycle: Lifecycle::new(),
            output: TextOutput::new(format!("{} procedure", Self::COMMAND_LINE_LABELS[0])),
            signatures: HashSet::new(),
        }
    }

    pub fn with_sink(sink: Sink) -> Self {
        let mut describe = Describe::new();
        describe.set_output_stream(sink);
        describe
    }

    /// Inline signatures of the distinct shapes seen so far
    pub fn signatures(&self) -> &HashSet<String> {
        &self.signatures
    }
}

impl Procedure for Describe {
    fn command_line_labels(&self) -> &'static [&'static str] {
        Self::COMMAND_LINE_LABELS
    }

    fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    fn handle(&mut self, _invocation: u64, event: &dyn Event) -> Result<(), ProcedureError> {
        if event.is_end_of_stream() {
            return Ok(());
        }

        let key = signature(event, SignatureStyle::Inline);
        if self.signatures.contains(&key) {
            return Ok(());
        }

        self.output.println(signature(event, SignatureStyle::Yaml))?;
        self.signatures.insert(key);
        Ok(())
    }
}

impl TextOutputProcedure for Describe {
    fn text_output(&self) -> &TextOutput {
        &self.output
    }

    fn text_output_mut(&mut self) -> &mut TextOutput {
        &mut self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::procedure::ProcedureExt;
    use crate::event::{EndOfStreamEvent, GenericEvent, TimedEvent};
    use crate::text_output::MemorySink;
    use indexmap::IndexMap;

    fn map_event() -> GenericEvent {
        let mut map = IndexMap::new();
        map.insert("zeta".to_string(), PropertyValue::Integer(1));
        map.insert("alpha".to_string(), PropertyValue::Integer(2));
        GenericEvent::with_properties(vec![
            Property::string("name", "x"),
            Property::map("attributes", map),
            Property::absent("empty", PropertyType::Map),
        ])
    }

    #[test]
    fn test_inline_signature() {
        assert_eq!(
            signature(&map_event(), SignatureStyle::Inline),
            "GenericEvent[attributes(Map){alpha, zeta}, empty(Map){<empty>}, name(String)]"
        );
    }

    #[test]
    fn test_yaml_signature() {
        assert_eq!(
            signature(&map_event(), SignatureStyle::Yaml),
            "GenericEvent\n  attributes(Map)\n    alpha\n    zeta\n  empty(Map)\n    <empty>\n  name(String)\n"
        );
    }

    #[test]
    fn test_timed_signature_skips_timestamp_property() {
        let e = TimedEvent::with_properties(Some(5), vec![Property::integer("size", 3)]);
        assert_eq!(
            signature(&e, SignatureStyle::Inline),
            "TimedEvent[timestamp, size(Integer)]"
        );
        assert_eq!(
            signature(&TimedEvent::new(None), SignatureStyle::Inline),
            "TimedEvent[timestamp]"
        );
    }

    #[test]
    fn test_signature_ignores_values_and_order() {
        let a = GenericEvent::with_properties(vec![
            Property::string("b", "1"),
            Property::string("a", "2"),
        ]);
        let b = GenericEvent::with_properties(vec![
            Property::string("a", "3"),
            Property::string("b", "4"),
        ]);
        assert_eq!(
            signature(&a, SignatureStyle::Inline),
            signature(&b, SignatureStyle::Inline)
        );
    }

    #[test]
    fn test_identical_shapes_described_once() {
        let sink = MemorySink::new();
        let mut describe = Describe::with_sink(sink.boxed());

        describe
            .process(&GenericEvent::with_properties(vec![Property::string("color", "red")]))
            .unwrap();
        let first = sink.contents();
        assert!(first.contains("color(String)"));

        describe
            .process(&GenericEvent::with_properties(vec![Property::string("color", "blue")]))
            .unwrap();
        assert_eq!(sink.contents(), first);
        assert_eq!(describe.signatures().len(), 1);
    }

    #[test]
    fn test_different_shape_described_without_values() {
        let sink = MemorySink::new();
        let mut describe = Describe::with_sink(sink.boxed());

        describe
            .process(&GenericEvent::with_properties(vec![Property::string("color", "red")]))
            .unwrap();
        let before = sink.contents().len();

        describe
            .process(&GenericEvent::with_properties(vec![
                Property::string("color", "red"),
                Property::string("flavor", "vanilla-bean"),
            ]))
            .unwrap();
        describe.process(&EndOfStreamEvent).unwrap();

        let added = &sink.contents()[before..];
        assert!(added.contains("flavor"));
        assert!(!added.contains("vanilla-bean"));
        assert_eq!(describe.signatures().len(), 2);
    }
}
