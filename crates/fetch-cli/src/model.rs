//! Sample entity used by the demos.

use fetch_change::{
    ChangeError, ChangeResult, ChangeTracker, ChangeTrackingCollection, Entity, Keys, Shape,
    Trackable,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    #[serde(skip)]
    tracker: ChangeTracker,
}

impl Address {
    pub fn new(street: &str, city: &str) -> Self {
        Self {
            street: street.into(),
            city: city.into(),
            tracker: ChangeTracker::new(),
        }
    }

    pub fn set_city(&mut self, city: &str) {
        self.tracker.set("city", city);
        self.city = city.into();
    }
}

impl Trackable for Address {
    fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Customer {
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub address: Address,
    pub tags: ChangeTrackingCollection<String>,
    #[serde(skip)]
    tracker: ChangeTracker,
}

impl Customer {
    pub fn new(name: &str, email: &str, address: Address) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            address,
            ..Default::default()
        }
    }

    pub fn set_email(&mut self, email: &str) {
        self.tracker.set("email", email);
        self.email = email.into();
    }

    pub fn is_tagged(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

impl Trackable for Customer {
    fn tracker(&self) -> &ChangeTracker {
        &self.tracker
    }

    fn tracker_mut(&mut self) -> &mut ChangeTracker {
        &mut self.tracker
    }

    fn tracked_members(&self) -> Vec<(&str, &dyn Trackable)> {
        vec![
            ("address", &self.address as &dyn Trackable),
            ("tags", &self.tags as &dyn Trackable),
        ]
    }

    fn tracked_members_mut(&mut self) -> Vec<&mut dyn Trackable> {
        vec![
            &mut self.address as &mut dyn Trackable,
            &mut self.tags as &mut dyn Trackable,
        ]
    }
}

impl Entity for Customer {
    fn entity_name() -> &'static str {
        "customers"
    }

    fn shape() -> Shape {
        Shape::object([
            ("id", Shape::Scalar),
            ("name", Shape::Scalar),
            ("email", Shape::Scalar),
            (
                "address",
                Shape::object([("street", Shape::Scalar), ("city", Shape::Scalar)]),
            ),
            ("tags", Shape::list(Shape::Scalar)),
        ])
    }

    fn keys(&self) -> ChangeResult<Keys> {
        self.id
            .map(Keys::from)
            .ok_or_else(|| ChangeError::invalid_state("customer id is not set"))
    }

    fn assign_keys(&mut self, keys: &Keys) -> ChangeResult<()> {
        self.id = keys.first().and_then(|part| part.as_int());
        Ok(())
    }
}
