use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const RIDER_ROLE: &str = "rider";
pub const DRIVER_ROLE: &str = "driver";
pub const OPERATOR_ROLE: &str = "operator";

/// An already-authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub roles: Vec<String>,
}

impl User {
    pub fn new(id: Uuid, roles: &[&str]) -> Self {
        Self {
            id,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    pub fn new_rider() -> Self {
        Self::new(Uuid::new_v4(), &[RIDER_ROLE])
    }

    pub fn new_driver() -> Self {
        Self::new(Uuid::new_v4(), &[DRIVER_ROLE])
    }

    pub fn new_operator() -> Self {
        Self::new(Uuid::new_v4(), &[OPERATOR_ROLE])
    }

    fn has_role(&self, role: String) -> bool {
        self.roles.iter().any(|x| x == &role)
    }
}

impl PolarClass for User {
    fn get_polar_class_builder() -> oso::ClassBuilder<User> {
        oso::Class::builder()
            .name("User")
            .add_attribute_getter("id", |recv: &User| recv.id.to_string())
            .add_attribute_getter("roles", |recv: &User| recv.roles.clone())
            .add_method("has_role", User::has_role)
    }

    fn get_polar_class() -> oso::Class {
        let builder = User::get_polar_class_builder();
        builder.build()
    }
}
