//! Field definitions for model states.

use std::fmt;

/// Reference to a model by `app_label` and model name.
///
/// Model names compare case-insensitively, so `emr.Encounter` and
/// `emr.encounter` name the same model.
#[derive(Debug, Clone)]
pub struct ModelRef {
    pub app_label: String,
    pub model_name: String,
}

impl ModelRef {
    pub fn new(app_label: &str, model_name: &str) -> Self {
        Self {
            app_label: app_label.to_string(),
            model_name: model_name.to_string(),
        }
    }

    /// Parse `"app_label.ModelName"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (app, model) = s.split_once('.')?;
        if app.is_empty() || model.is_empty() || model.contains('.') {
            return None;
        }
        Some(Self::new(app, model))
    }

    /// Table backing the referenced model.
    pub fn db_table(&self) -> String {
        format!("{}_{}", self.app_label, self.model_name.to_lowercase())
    }

    /// Lookup key used by `ProjectState`.
    pub fn key(&self) -> (String, String) {
        (self.app_label.clone(), self.model_name.to_lowercase())
    }
}

impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ModelRef {}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.app_label, self.model_name)
    }
}

/// Behaviour of a foreign key when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    Cascade,
    SetNull,
    Protect,
    Restrict,
    DoNothing,
}

impl OnDelete {
    /// The `ON DELETE` clause, if any.
    pub fn sql(self) -> Option<&'static str> {
        match self {
            Self::Cascade => Some("CASCADE"),
            Self::SetNull => Some("SET NULL"),
            Self::Protect | Self::Restrict => Some("RESTRICT"),
            Self::DoNothing => None,
        }
    }

    /// Name as reported by `PRAGMA foreign_key_list`.
    pub fn pragma_name(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::SetNull => "SET NULL",
            Self::Protect | Self::Restrict => "RESTRICT",
            Self::DoNothing => "NO ACTION",
        }
    }
}

/// Column storage kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    BigAutoField,
    UuidField,
    DateTimeField,
    BooleanField,
    JsonField,
    TextField,
    CharField { max_length: u32 },
    ForeignKey { to: ModelRef, on_delete: OnDelete },
}

/// Application-level default of a field.
///
/// Defaults are filled in by the code that inserts rows, never emitted as SQL
/// `DEFAULT`. They are also used to backfill `NULL`s when a column is
/// tightened to `NOT NULL` during a table rebuild.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldDefault {
    /// No default: the value must be supplied.
    #[default]
    None,
    /// Explicitly absent.
    Null,
    Bool(bool),
    EmptyObject,
    EmptyArray,
    Uuid4,
    Now,
}

/// A single field of a model state.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub null: bool,
    pub default: FieldDefault,
    pub primary_key: bool,
    pub unique: bool,
    pub db_index: bool,
    pub auto_now: bool,
    pub auto_now_add: bool,
}

impl Field {
    fn new(name: &str, field_type: FieldType) -> Self {
        // Foreign keys are indexed unless told otherwise.
        let db_index = matches!(field_type, FieldType::ForeignKey { .. });
        Self {
            name: name.to_string(),
            field_type,
            null: false,
            default: FieldDefault::None,
            primary_key: false,
            unique: false,
            db_index,
            auto_now: false,
            auto_now_add: false,
        }
    }

    /// Auto-incrementing 64-bit primary key.
    pub fn big_auto(name: &str) -> Self {
        let mut field = Self::new(name, FieldType::BigAutoField);
        field.primary_key = true;
        field
    }

    pub fn uuid(name: &str) -> Self {
        Self::new(name, FieldType::UuidField)
    }

    pub fn datetime(name: &str) -> Self {
        Self::new(name, FieldType::DateTimeField)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldType::BooleanField)
    }

    pub fn json(name: &str) -> Self {
        Self::new(name, FieldType::JsonField)
    }

    pub fn text(name: &str) -> Self {
        Self::new(name, FieldType::TextField)
    }

    pub fn char(name: &str, max_length: u32) -> Self {
        Self::new(name, FieldType::CharField { max_length })
    }

    pub fn foreign_key(name: &str, to: ModelRef, on_delete: OnDelete) -> Self {
        Self::new(name, FieldType::ForeignKey { to, on_delete })
    }

    pub fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    pub fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn indexed(mut self) -> Self {
        self.db_index = true;
        self
    }

    pub fn auto_now(mut self) -> Self {
        self.auto_now = true;
        self
    }

    pub fn auto_now_add(mut self) -> Self {
        self.auto_now_add = true;
        self
    }

    /// Database column name. Foreign keys store `<name>_id`.
    pub fn column(&self) -> String {
        match self.field_type {
            FieldType::ForeignKey { .. } => format!("{}_id", self.name),
            _ => self.name.clone(),
        }
    }

    /// Default used when a value is missing. Timestamps stamped on save
    /// fall back to the current time.
    pub fn effective_default(&self) -> FieldDefault {
        match self.default {
            FieldDefault::None if self.auto_now || self.auto_now_add => FieldDefault::Now,
            ref other => other.clone(),
        }
    }

    /// Whether this field needs a standalone index.
    pub fn needs_index(&self) -> bool {
        self.db_index && !self.unique && !self.primary_key
    }
}
