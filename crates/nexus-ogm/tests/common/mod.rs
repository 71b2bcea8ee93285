//! Shared fixtures for integration tests: the test domain, a small cineasts
//! graph in Nexus wire format, and log capture.
#![allow(dead_code)]

use nexus_ogm::testing::ScriptedExecutor;
use nexus_ogm::{
    domain_class, ClassInfo, DomainClass, Direction, MetaData, Parameters, SessionFactory,
};
use parking_lot::Mutex;
use serde_json::{json, Value as JsonValue};
use std::io::Write;
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

domain_class! {
    pub struct User => "cineasts::User";
    pub struct ExtendedUser => "cineasts::ExtendedUser";
    pub struct Movie => "cineasts::Movie";
    pub struct Rating => "cineasts::Rating";
    pub struct Actor => "cineasts::Actor";
    pub struct Pet => "cineasts::Pet";
    pub struct Item => "linkedlist::Item";
    pub struct Something => "nested::NestingClass$Something";
    /// Never registered with the metadata
    pub struct Restaurant => "restaurant::Restaurant";
}

pub mod package_a {
    nexus_ogm::domain_class! {
        pub struct SameClass => "package_a::SameClass";
    }
}

pub mod package_b {
    nexus_ogm::domain_class! {
        pub struct SameClass => "package_b::SameClass";
    }
}

fn name_of<T: DomainClass>(entity: &T) -> String {
    entity
        .property::<Option<String>>("name")
        .ok()
        .flatten()
        .unwrap_or_default()
}

impl User {
    pub fn name(&self) -> String {
        name_of(self)
    }

    pub fn friends(&self) -> Option<Vec<User>> {
        self.related("friends")
    }

    pub fn ratings(&self) -> Option<Vec<Rating>> {
        self.related("ratings")
    }

    pub fn extended_friends(&self) -> Option<Vec<ExtendedUser>> {
        self.related("extended_friends")
    }
}

impl ExtendedUser {
    pub fn name(&self) -> String {
        name_of(self)
    }
}

impl Movie {
    pub fn title(&self) -> String {
        self.property::<Option<String>>("title")
            .ok()
            .flatten()
            .unwrap_or_default()
    }

    pub fn ratings(&self) -> Option<Vec<Rating>> {
        self.related("ratings")
    }
}

impl Rating {
    pub fn stars(&self) -> i64 {
        self.property::<i64>("stars").unwrap_or_default()
    }

    pub fn user(&self) -> Option<User> {
        self.start()
    }

    pub fn movie(&self) -> Option<Movie> {
        self.end()
    }
}

impl Actor {
    pub fn name(&self) -> String {
        name_of(self)
    }
}

impl Item {
    pub fn name(&self) -> String {
        name_of(self)
    }
}

/// Metadata for the test domain. `Restaurant` is deliberately left out.
pub fn metadata() -> MetaData {
    MetaData::builder()
        .register(
            ClassInfo::node("cineasts::User")
                .relationship_field("friends", "FRIENDS", Direction::Outgoing, "cineasts::User")
                .relationship_field("ratings", "RATED", Direction::Outgoing, "cineasts::Rating")
                .relationship_field(
                    "extended_friends",
                    "EXTENDED_FRIEND",
                    Direction::Outgoing,
                    "cineasts::ExtendedUser",
                ),
        )
        .register(ClassInfo::node("cineasts::ExtendedUser").extends("cineasts::User"))
        .register(ClassInfo::node("cineasts::Movie").relationship_field(
            "ratings",
            "RATED",
            Direction::Incoming,
            "cineasts::Rating",
        ))
        .register(
            ClassInfo::relationship("cineasts::Rating", "RATED")
                .endpoints("cineasts::User", "cineasts::Movie"),
        )
        .register(ClassInfo::node("cineasts::Actor"))
        .register(ClassInfo::node("cineasts::Pet"))
        .register(
            ClassInfo::node("linkedlist::Item")
                .relationship_field("next", "NEXT", Direction::Outgoing, "linkedlist::Item")
                .relationship_field(
                    "belongs_to",
                    "BELONGS_TO",
                    Direction::Outgoing,
                    "linkedlist::Item",
                ),
        )
        .register(ClassInfo::node("nested::NestingClass$Something"))
        .register(ClassInfo::node("package_a::SameClass").label("SameClassA"))
        .register(ClassInfo::node("package_b::SameClass").label("SameClassB"))
        .build()
        .expect("test metadata is valid")
}

/// Scripted executor plus a factory over the test domain
pub fn setup() -> (Arc<ScriptedExecutor>, SessionFactory) {
    let executor = Arc::new(ScriptedExecutor::new());
    let factory = SessionFactory::new(metadata(), executor.clone());
    (executor, factory)
}

pub fn params(pairs: &[(&str, JsonValue)]) -> Parameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

// Store ids of the fixture graph
pub const VINCE: u64 = 1;
pub const MICHAL: u64 = 2;
pub const CHRISTOPHE: u64 = 3;
pub const EXTENDED: u64 = 4;
pub const TOP_GEAR: u64 = 10;
pub const PULP_FICTION: u64 = 11;
pub const PET: u64 = 20;
pub const ITEM_A: u64 = 30;

pub const VINCE_RATES_TOP_GEAR: u64 = 100;
pub const MICHAL_RATES_TOP_GEAR: u64 = 101;
pub const MICHAL_RATES_PULP_FICTION: u64 = 102;
pub const MICHAL_FRIENDS_VINCE: u64 = 110;
pub const VINCE_EXTENDED_FRIEND: u64 = 111;
pub const PULP_FICTION_UNKNOWN_PET: u64 = 112;

pub fn node(id: u64, labels: &[&str], properties: JsonValue) -> JsonValue {
    let mut object = properties.as_object().cloned().unwrap_or_default();
    object.insert("_nexus_id".to_string(), json!(id));
    object.insert("_nexus_labels".to_string(), json!(labels));
    JsonValue::Object(object)
}

pub fn relationship(
    id: u64,
    rel_type: &str,
    start: u64,
    end: u64,
    properties: JsonValue,
) -> JsonValue {
    let mut object = properties.as_object().cloned().unwrap_or_default();
    object.insert("_nexus_id".to_string(), json!(id));
    object.insert("_nexus_type".to_string(), json!(rel_type));
    object.insert("_nexus_start".to_string(), json!(start));
    object.insert("_nexus_end".to_string(), json!(end));
    JsonValue::Object(object)
}

pub fn path(nodes: Vec<JsonValue>, relationships: Vec<JsonValue>) -> JsonValue {
    json!({"_nexus_path": {"nodes": nodes, "relationships": relationships}})
}

pub fn vince() -> JsonValue {
    node(VINCE, &["User"], json!({"name": "Vince"}))
}

pub fn michal() -> JsonValue {
    node(MICHAL, &["User"], json!({"name": "Michal"}))
}

pub fn christophe() -> JsonValue {
    node(
        CHRISTOPHE,
        &["User"],
        json!({"name": "Christophe", "array": ["one", "two"]}),
    )
}

pub fn extended() -> JsonValue {
    node(EXTENDED, &["User", "ExtendedUser"], json!({"name": "extended"}))
}

pub fn top_gear() -> JsonValue {
    node(TOP_GEAR, &["Movie"], json!({"title": "Top Gear"}))
}

pub fn pulp_fiction() -> JsonValue {
    node(PULP_FICTION, &["Movie"], json!({"title": "Pulp Fiction"}))
}

pub fn pet() -> JsonValue {
    node(PET, &["Pet"], json!({"name": "Sparky"}))
}

pub fn item(offset: u64, name: &str) -> JsonValue {
    node(ITEM_A + offset, &["Item"], json!({"name": name}))
}

pub fn rated(id: u64, user: u64, movie: u64, stars: i64) -> JsonValue {
    relationship(id, "RATED", user, movie, json!({"stars": stars}))
}

pub fn vince_rates_top_gear() -> JsonValue {
    rated(VINCE_RATES_TOP_GEAR, VINCE, TOP_GEAR, 4)
}

pub fn michal_rates_top_gear() -> JsonValue {
    rated(MICHAL_RATES_TOP_GEAR, MICHAL, TOP_GEAR, 3)
}

pub fn michal_rates_pulp_fiction() -> JsonValue {
    rated(MICHAL_RATES_PULP_FICTION, MICHAL, PULP_FICTION, 5)
}

pub fn michal_friends_vince() -> JsonValue {
    relationship(MICHAL_FRIENDS_VINCE, "FRIENDS", MICHAL, VINCE, json!({}))
}

pub fn vince_extended_friend() -> JsonValue {
    relationship(VINCE_EXTENDED_FRIEND, "EXTENDED_FRIEND", VINCE, EXTENDED, json!({}))
}

pub fn pulp_fiction_unknown_pet() -> JsonValue {
    relationship(PULP_FICTION_UNKNOWN_PET, "UNKNOWN", PULP_FICTION, PET, json!({}))
}

/// In-memory sink for formatted log output
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Route log output of the current thread into a buffer until the guard drops
pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
    let buffer = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(buffer.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();
    let guard = tracing::subscriber::set_default(subscriber);
    (buffer, guard)
}
