//! emr.0020: relax `DeviceServiceHistory.serviced_on` to nullable and create
//! `Consent`, a consent decision owned by an encounter.

use super::Migration;
use crate::schema::{Field, FieldDefault, ModelRef, OnDelete, Operation};

pub const NAME: &str = "0020_alter_deviceservicehistory_serviced_on_consent";

pub fn migration(user: &ModelRef) -> Migration {
    Migration::new("emr", NAME)
        .depends_on("emr", "0019_device_metadata")
        .depends_on_swappable(user)
        .operation(Operation::alter_field(
            "deviceservicehistory",
            "serviced_on",
            Field::datetime("serviced_on")
                .nullable()
                .with_default(FieldDefault::Null),
        ))
        .operation(Operation::create_model(
            "Consent",
            vec![
                Field::big_auto("id"),
                Field::uuid("external_id")
                    .with_default(FieldDefault::Uuid4)
                    .unique()
                    .indexed(),
                Field::datetime("created_date").nullable().auto_now_add().indexed(),
                Field::datetime("modified_date").nullable().auto_now().indexed(),
                Field::boolean("deleted")
                    .with_default(FieldDefault::Bool(false))
                    .indexed(),
                Field::json("history").with_default(FieldDefault::EmptyObject),
                Field::json("meta").with_default(FieldDefault::EmptyObject),
                Field::char("status", 50),
                Field::char("category", 50),
                Field::datetime("date"),
                Field::json("period").with_default(FieldDefault::EmptyObject),
                Field::char("decision", 10),
                Field::json("verification_details").with_default(FieldDefault::EmptyArray),
                Field::foreign_key("created_by", user.clone(), OnDelete::SetNull)
                    .nullable()
                    .with_default(FieldDefault::Null),
                Field::foreign_key("encounter", ModelRef::new("emr", "Encounter"), OnDelete::Cascade),
                Field::foreign_key("updated_by", user.clone(), OnDelete::SetNull)
                    .nullable()
                    .with_default(FieldDefault::Null),
            ],
        ))
}
