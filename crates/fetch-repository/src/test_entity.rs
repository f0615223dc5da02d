//! Shared test fixture: an entity with scalar members, an owned child and a
//! tracked collection.

use fetch_change::{
    ChangeError, ChangeResult, ChangeTracker, ChangeTrackingCollection, Entity, Keys, Shape,
    Trackable,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Child {
    pub value: i64,
    pub label: String,
    #[serde(skip)]
    tracker: ChangeTracker,
}

impl Child {
    pub fn set_value(&mut self, value: i64) {
        self.tracker.set("value", &value);
        self.value = value;
    }
}

impl Trackable for Child {
    fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TestEntity {
    pub id: Option<i64>,
    pub int_value: i64,
    pub string_value: String,
    pub double_value: f64,
    pub child: Child,
    pub tags: ChangeTrackingCollection<String>,
    #[serde(skip)]
    tracker: ChangeTracker,
}

impl TestEntity {
    pub fn with_int(int_value: i64) -> Self {
        Self {
            int_value,
            ..Default::default()
        }
    }

    pub fn set_int_value(&mut self, value: i64) {
        self.tracker.set("int_value", &value);
        self.int_value = value;
    }

    pub fn set_string_value(&mut self, value: &str) {
        self.tracker.set("string_value", value);
        self.string_value = value.to_string();
    }

    pub fn set_double_value(&mut self, value: f64) {
        self.tracker.set("double_value", &value);
        self.double_value = value;
    }
}

impl Trackable for TestEntity {
    fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }

    fn tracked_members(&self) -> Vec<(&str, &dyn Trackable)> {
        vec![
            ("child", &self.child as &dyn Trackable),
            ("tags", &self.tags as &dyn Trackable),
        ]
    }

    fn tracked_members_mut(&mut self) -> Vec<&mut dyn Trackable> {
        vec![
            &mut self.child as &mut dyn Trackable,
            &mut self.tags as &mut dyn Trackable,
        ]
    }
}

impl Entity for TestEntity {
    fn entity_name() -> &'static str {
        "test_entities"
    }

    fn shape() -> Shape {
        Shape::object([
            ("id", Shape::Scalar),
            ("int_value", Shape::Scalar),
            ("string_value", Shape::Scalar),
            ("double_value", Shape::Scalar),
            (
                "child",
                Shape::object([("value", Shape::Scalar), ("label", Shape::Scalar)]),
            ),
            ("tags", Shape::list(Shape::Scalar)),
        ])
    }

    fn keys(&self) -> ChangeResult<Keys> {
        self.id
            .map(Keys::from)
            .ok_or_else(|| ChangeError::invalid_state("test entity id is not set"))
    }

    fn assign_keys(&mut self, keys: &Keys) -> ChangeResult<()> {
        self.id = Some(
            keys.first()
                .and_then(|part| part.as_int())
                .ok_or_else(|| ChangeError::invalid_state("expected an integer key"))?,
        );
        Ok(())
    }
}
