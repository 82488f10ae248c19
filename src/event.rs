use indexmap::IndexMap;
use std::borrow::Cow;
use std::fmt;

/// Name of the property a timed event exposes its timestamp under. It always
/// sits at index 0 of a timed event's properties.
pub const TIMESTAMP_PROPERTY_NAME: &str = "timestamp";

/// Declared type of a property, independent of whether a value is present
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    String,
    Integer,
    Long,
    Double,
    Boolean,
    Map,
    List,
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyType::String => "String",
            PropertyType::Integer => "Integer",
            PropertyType::Long => "Long",
            PropertyType::Double => "Double",
            PropertyType::Boolean => "Boolean",
            PropertyType::Map => "Map",
            PropertyType::List => "List",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    String(String),
    Integer(i32),
    Long(i64),
    Double(f64),
    Boolean(bool),
    Map(IndexMap<String, PropertyValue>),
    List(Vec<PropertyValue>),
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Integer(_) => PropertyType::Integer,
            PropertyValue::Long(_) => PropertyType::Long,
            PropertyValue::Double(_) => PropertyType::Double,
            PropertyValue::Boolean(_) => PropertyType::Boolean,
            PropertyValue::Map(_) => PropertyType::Map,
            PropertyValue::List(_) => PropertyType::List,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(i) => Some(i64::from(*i)),
            PropertyValue::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Integer(i) => write!(f, "{}", i),
            PropertyValue::Long(l) => write!(f, "{}", l),
            PropertyValue::Double(d) => write!(f, "{}", d),
            PropertyValue::Boolean(b) => write!(f, "{}", b),
            PropertyValue::Map(map) => {
                f.write_str("{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", key, value)?;
                }
                f.write_str("}")
            }
            PropertyValue::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

/// A named, typed event property. The value may be absent.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    property_type: PropertyType,
    value: Option<PropertyValue>,
}

impl Property {
    pub fn new(name: impl Into<String>, value: PropertyValue) -> Self {
        Property {
            name: name.into(),
            property_type: value.property_type(),
            value: Some(value),
        }
    }

    /// A property that is declared but carries no value
    pub fn absent(name: impl Into<String>, property_type: PropertyType) -> Self {
        Property {
            name: name.into(),
            property_type,
            value: None,
        }
    }

    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        Property::new(name, PropertyValue::String(value.into()))
    }

    pub fn integer(name: impl Into<String>, value: i32) -> Self {
        Property::new(name, PropertyValue::Integer(value))
    }

    pub fn long(name: impl Into<String>, value: i64) -> Self {
        Property::new(name, PropertyValue::Long(value))
    }

    pub fn double(name: impl Into<String>, value: f64) -> Self {
        Property::new(name, PropertyValue::Double(value))
    }

    pub fn boolean(name: impl Into<String>, value: bool) -> Self {
        Property::new(name, PropertyValue::Boolean(value))
    }

    pub fn map(name: impl Into<String>, value: IndexMap<String, PropertyValue>) -> Self {
        Property::new(name, PropertyValue::Map(value))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property_type(&self) -> PropertyType {
        self.property_type
    }

    pub fn value(&self) -> Option<&PropertyValue> {
        self.value.as_ref()
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}={}", self.name, v),
            None => write!(f, "{}=null", self.name),
        }
    }
}

/// One unit of the processed stream, as seen by procedures.
///
/// Events are produced by an external parser and are read-only here. The
/// default method implementations describe a plain, untimed event with no
/// alternate representations.
pub trait Event: fmt::Display + fmt::Debug {
    /// Short structural type name, used by signatures and fallback rendering
    fn type_name(&self) -> &str;

    /// Properties in the order they were encountered
    fn properties(&self) -> &[Property];

    fn property(&self, name: &str) -> Option<&Property> {
        self.properties().iter().find(|p| p.name() == name)
    }

    fn property_by_index(&self, index: usize) -> Option<&Property> {
        self.properties().get(index)
    }

    /// The text the event was parsed from, if retained
    fn raw_representation(&self) -> Option<&str> {
        None
    }

    fn preferred_representation(&self) -> Option<&str> {
        None
    }

    fn preferred_representation_header(&self) -> Option<&str> {
        None
    }

    fn is_timed(&self) -> bool {
        false
    }

    /// Epoch milliseconds. Only timed events carry one, and even those may not.
    fn timestamp(&self) -> Option<i64> {
        None
    }

    fn line_number(&self) -> Option<u64> {
        None
    }

    fn is_end_of_stream(&self) -> bool {
        false
    }
}

fn write_event(
    f: &mut fmt::Formatter<'_>,
    type_name: &str,
    properties: &[Property],
) -> fmt::Result {
    write!(f, "{}[", type_name)?;
    for (i, p) in properties.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", p)?;
    }
    f.write_str("]")
}

/// A plain event: an ordered property list plus optional representations
#[derive(Debug, Clone, PartialEq)]
pub struct GenericEvent {
    type_name: Cow<'static, str>,
    properties: Vec<Property>,
    raw_representation: Option<String>,
    preferred_representation: Option<String>,
    preferred_representation_header: Option<String>,
    line_number: Option<u64>,
}

impl Default for GenericEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl GenericEvent {
    pub fn new() -> Self {
        GenericEvent {
            type_name: Cow::Borrowed("GenericEvent"),
            properties: Vec::new(),
            raw_representation: None,
            preferred_representation: None,
            preferred_representation_header: None,
            line_number: None,
        }
    }

    pub fn with_properties(properties: Vec<Property>) -> Self {
        let mut event = GenericEvent::new();
        for p in properties {
            event.set_property(p);
        }
        event
    }

    pub fn with_type_name(mut self, type_name: impl Into<Cow<'static, str>>) -> Self {
        self.type_name = type_name.into();
        self
    }

    /// Adds the property, or replaces in place a property with the same
    /// name. Returns the replaced property.
    pub fn set_property(&mut self, property: Property) -> Option<Property> {
        match self
            .properties
            .iter_mut()
            .find(|p| p.name() == property.name())
        {
            Some(existing) => Some(std::mem::replace(existing, property)),
            None => {
                self.properties.push(property);
                None
            }
        }
    }

    pub fn set_string_property(&mut self, name: &str, value: impl Into<String>) {
        self.set_property(Property::string(name, value));
    }

    pub fn set_raw_representation(&mut self, raw: impl Into<String>) {
        self.raw_representation = Some(raw.into());
    }

    pub fn set_preferred_representation(&mut self, s: impl Into<String>) {
        self.preferred_representation = Some(s.into());
    }

    pub fn set_preferred_representation_header(&mut self, s: impl Into<String>) {
        self.preferred_representation_header = Some(s.into());
    }

    pub fn set_line_number(&mut self, line_number: u64) {
        self.line_number = Some(line_number);
    }
}

impl Event for GenericEvent {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn properties(&self) -> &[Property] {
        &self.properties
    }

    fn raw_representation(&self) -> Option<&str> {
        self.raw_representation.as_deref()
    }

    fn preferred_representation(&self) -> Option<&str> {
        self.preferred_representation.as_deref()
    }

    fn preferred_representation_header(&self) -> Option<&str> {
        self.preferred_representation_header.as_deref()
    }

    fn line_number(&self) -> Option<u64> {
        self.line_number
    }
}

impl fmt::Display for GenericEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_event(f, &self.type_name, &self.properties)
    }
}

/// An event carrying an epoch-millisecond timestamp.
///
/// The timestamp is stored as the `timestamp` property at index 0, present
/// even when the timestamp itself is unknown, so positional indices mean the
/// same thing for every timed event.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedEvent {
    event: GenericEvent,
}

impl Default for TimedEvent {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TimedEvent {
    pub fn new(timestamp: Option<i64>) -> Self {
        let mut event = GenericEvent::new().with_type_name("TimedEvent");
        event.properties.push(timestamp_property(timestamp));
        TimedEvent { event }
    }

    pub fn with_properties(timestamp: Option<i64>, properties: Vec<Property>) -> Self {
        let mut event = TimedEvent::new(timestamp);
        for p in properties {
            event.set_property(p);
        }
        event
    }

    pub fn with_type_name(mut self, type_name: impl Into<Cow<'static, str>>) -> Self {
        self.event.type_name = type_name.into();
        self
    }

    pub fn set_timestamp(&mut self, timestamp: Option<i64>) {
        self.event.properties[0] = timestamp_property(timestamp);
    }

    /// Setting a property named `timestamp` updates the timestamp slot.
    pub fn set_property(&mut self, property: Property) -> Option<Property> {
        if property.name() == TIMESTAMP_PROPERTY_NAME {
            let previous = self.event.properties[0].clone();
            self.set_timestamp(property.value().and_then(PropertyValue::as_i64));
            return Some(previous);
        }
        self.event.set_property(property)
    }

    pub fn set_string_property(&mut self, name: &str, value: impl Into<String>) {
        self.set_property(Property::string(name, value));
    }

    pub fn set_raw_representation(&mut self, raw: impl Into<String>) {
        self.event.set_raw_representation(raw);
    }

    pub fn set_preferred_representation(&mut self, s: impl Into<String>) {
        self.event.set_preferred_representation(s);
    }

    pub fn set_preferred_representation_header(&mut self, s: impl Into<String>) {
        self.event.set_preferred_representation_header(s);
    }

    pub fn set_line_number(&mut self, line_number: u64) {
        self.event.set_line_number(line_number);
    }
}

fn timestamp_property(timestamp: Option<i64>) -> Property {
    match timestamp {
        Some(t) => Property::long(TIMESTAMP_PROPERTY_NAME, t),
        None => Property::absent(TIMESTAMP_PROPERTY_NAME, PropertyType::Long),
    }
}

impl Event for TimedEvent {
    fn type_name(&self) -> &str {
        self.event.type_name()
    }

    fn properties(&self) -> &[Property] {
        self.event.properties()
    }

    fn raw_representation(&self) -> Option<&str> {
        self.event.raw_representation()
    }

    fn preferred_representation(&self) -> Option<&str> {
        self.event.preferred_representation()
    }

    fn preferred_representation_header(&self) -> Option<&str> {
        self.event.preferred_representation_header()
    }

    fn is_timed(&self) -> bool {
        true
    }

    fn timestamp(&self) -> Option<i64> {
        self.event.properties[0].value().and_then(PropertyValue::as_i64)
    }

    fn line_number(&self) -> Option<u64> {
        self.event.line_number()
    }
}

impl fmt::Display for TimedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.event, f)
    }
}

/// Sentinel signalling that no more events will arrive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndOfStreamEvent;

impl Event for EndOfStreamEvent {
    fn type_name(&self) -> &str {
        "EndOfStreamEvent"
    }

    fn properties(&self) -> &[Property] {
        &[]
    }

    fn is_end_of_stream(&self) -> bool {
        true
    }
}

impl fmt::Display for EndOfStreamEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EndOfStreamEvent")
    }
}
