//! emr.0019_device_metadata: baseline of the EMR schema before the consent
//! delta. Creates encounters, devices, and device service history.

use super::Migration;
use crate::schema::{Field, FieldDefault, ModelRef, OnDelete, Operation};

/// Columns shared by every EMR model, in declaration order.
fn base_fields() -> Vec<Field> {
    vec![
        Field::big_auto("id"),
        Field::uuid("external_id")
            .with_default(FieldDefault::Uuid4)
            .unique()
            .indexed(),
        Field::datetime("created_date").nullable().auto_now_add().indexed(),
        Field::datetime("modified_date").nullable().auto_now().indexed(),
        Field::boolean("deleted").with_default(FieldDefault::Bool(false)).indexed(),
        Field::json("history").with_default(FieldDefault::EmptyObject),
        Field::json("meta").with_default(FieldDefault::EmptyObject),
    ]
}

/// Nullable audit references to the user model.
fn audit_fields(user: &ModelRef) -> Vec<Field> {
    vec![
        Field::foreign_key("created_by", user.clone(), OnDelete::SetNull)
            .nullable()
            .with_default(FieldDefault::Null),
        Field::foreign_key("updated_by", user.clone(), OnDelete::SetNull)
            .nullable()
            .with_default(FieldDefault::Null),
    ]
}

fn model(fields: Vec<Field>, user: &ModelRef) -> Vec<Field> {
    let mut all = base_fields();
    all.extend(fields);
    all.extend(audit_fields(user));
    all
}

pub fn migration(user: &ModelRef) -> Migration {
    Migration::new("emr", "0019_device_metadata")
        .depends_on_swappable(user)
        .operation(Operation::create_model(
            "Encounter",
            model(
                vec![
                    Field::char("status", 100),
                    Field::char("encounter_class", 100),
                    Field::json("period").with_default(FieldDefault::EmptyObject),
                    Field::char("priority", 100),
                ],
                user,
            ),
        ))
        .operation(Operation::create_model(
            "Device",
            model(
                vec![
                    Field::char("registered_name", 255),
                    Field::char("status", 16),
                    Field::json("metadata").with_default(FieldDefault::EmptyObject),
                ],
                user,
            ),
        ))
        .operation(Operation::create_model(
            "DeviceServiceHistory",
            model(
                vec![
                    Field::datetime("serviced_on"),
                    Field::text("note"),
                    Field::json("edit_history").with_default(FieldDefault::EmptyArray),
                    Field::foreign_key(
                        "device",
                        ModelRef::new("emr", "Device"),
                        OnDelete::Cascade,
                    ),
                ],
                user,
            ),
        ))
}
