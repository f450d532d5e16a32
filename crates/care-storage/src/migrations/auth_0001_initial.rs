//! auth.0001_initial: the user table that `AUTH_USER_MODEL` points at by default.

use super::Migration;
use crate::schema::{Field, FieldDefault, Operation};

pub fn migration() -> Migration {
    Migration::new("auth", "0001_initial").operation(Operation::create_model(
        "User",
        vec![
            Field::big_auto("id"),
            Field::char("password", 128),
            Field::datetime("last_login").nullable(),
            Field::char("username", 150).unique(),
            Field::char("email", 254),
            Field::boolean("is_active").with_default(FieldDefault::Bool(true)),
            Field::datetime("date_joined").with_default(FieldDefault::Now),
        ],
    ))
}
