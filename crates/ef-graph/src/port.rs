//! Port descriptors.

use ef_core::{CompId, InputId, LoadType, OutputId, Tag, Unit};

/// Declaration of an input, handed to the builder during registration.
#[derive(Debug, Clone, PartialEq)]
pub struct InputSpec {
    pub name: String,
    pub load_type: LoadType,
    pub unit: Unit,
    pub mandatory: bool,
}

impl InputSpec {
    pub fn new(name: impl Into<String>, load_type: LoadType, unit: Unit, mandatory: bool) -> Self {
        Self {
            name: name.into(),
            load_type,
            unit,
            mandatory,
        }
    }

    pub fn mandatory(name: impl Into<String>, load_type: LoadType, unit: Unit) -> Self {
        Self::new(name, load_type, unit, true)
    }

    pub fn optional(name: impl Into<String>, load_type: LoadType, unit: Unit) -> Self {
        Self::new(name, load_type, unit, false)
    }
}

/// Declaration of an output, handed to the builder during registration.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSpec {
    pub name: String,
    pub load_type: LoadType,
    pub unit: Unit,
    pub tags: Vec<Tag>,
    pub weight: i32,
    pub description: Option<String>,
}

impl OutputSpec {
    pub fn new(name: impl Into<String>, load_type: LoadType, unit: Unit) -> Self {
        Self {
            name: name.into(),
            load_type,
            unit,
            tags: Vec::new(),
            weight: 0,
            description: None,
        }
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = Tag>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A registered input.
#[derive(Debug, Clone, PartialEq)]
pub struct Input {
    pub id: InputId,
    pub comp: CompId,
    pub name: String,
    pub load_type: LoadType,
    pub unit: Unit,
    pub mandatory: bool,
    /// The output this input consumes, once wired.
    pub source: Option<OutputId>,
    /// Tags declared when the input was added dynamically.
    pub tags: Vec<Tag>,
    pub weight: i32,
    pub dynamic: bool,
}

impl Input {
    pub fn is_connected(&self) -> bool {
        self.source.is_some()
    }
}

/// A registered output.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub id: OutputId,
    pub comp: CompId,
    pub name: String,
    pub load_type: LoadType,
    pub unit: Unit,
    pub tags: Vec<Tag>,
    pub weight: i32,
    pub description: Option<String>,
    /// Position in the value buffer. `None` until the graph is frozen.
    pub global_index: Option<usize>,
    pub dynamic: bool,
}
