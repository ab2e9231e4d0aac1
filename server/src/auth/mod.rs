pub mod header;
pub mod password;
pub mod token;

use crate::model::enums::Rol;
use crate::model::user::User;

/// The authenticated user making a request.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: i64,
    pub username: String,
    pub rol: Rol,
}

impl Client {
    pub fn new(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            rol: user.rol,
        }
    }

    pub fn has_role(&self, roles: &[Rol]) -> bool {
        roles.contains(&self.rol)
    }

    pub fn is_admin(&self) -> bool {
        self.rol == Rol::Admin
    }
}
