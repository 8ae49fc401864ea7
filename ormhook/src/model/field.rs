use crate::choices::Choices;

/// Column metadata a [`Model`](crate::model::Model) declares for one of its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMeta {
    name: String,
    choices: Option<Choices>,
}

impl FieldMeta {
    pub fn new(name: &str) -> Self {
        FieldMeta {
            name: name.to_string(),
            choices: None,
        }
    }

    /// Attaches a choice registry; the field counts as enumerated from then on.
    pub fn with_choices(mut self, choices: Choices) -> Self {
        self.choices = Some(choices);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn choices(&self) -> Option<&Choices> {
        self.choices.as_ref()
    }

    /// True whenever a registry is attached, including an empty one.
    pub fn has_choices(&self) -> bool {
        self.choices.is_some()
    }
}
