//! Declarative chip field layout.
//!
//! A [`ChipSchema`] names the fields of a channel row and of the global row,
//! their text width and type, which of them are sticky for catch-up, and the
//! templates used to lay them out as tracker text.

use std::collections::BTreeMap;

use crate::error::{CommonError, Result};
use crate::pattern::FieldValue;

/// Text representation of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// Uppercase hex digits.
    Hex,
    /// Uppercase base-36 digits.
    Symbol,
    /// Three-character note (`C-4`, `C#4`, `---`, `OFF`).
    Note,
    /// Decimal digits.
    Decimal,
    /// Free text.
    Text,
    /// Four-character effect cell.
    Effect,
}

impl FieldType {
    pub(crate) fn name(self) -> &'static str {
        match self {
            FieldType::Hex => "a hex",
            FieldType::Symbol => "a symbol",
            FieldType::Note => "a note",
            FieldType::Decimal => "a decimal",
            FieldType::Text => "a text",
            FieldType::Effect => "an effect",
        }
    }
}

/// When a sticky field counts as explicitly set during catch-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BacktrackPolicy {
    /// Any non-null value.
    #[default]
    Any,
    /// Only non-zero numeric values (and a declared off marker).
    NonZero,
}

/// Row scope of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldScope {
    /// Field of a channel row.
    Channel,
    /// Field of the per-row global data.
    Global,
}

/// Metadata for one field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name used as row key and template placeholder.
    pub name: String,
    /// Text representation.
    pub kind: FieldType,
    /// Fixed text width, also used for column hit-testing.
    pub length: usize,
    /// Display color token.
    pub color: Option<String>,
    /// Value rendered as all dots.
    pub zero_marker: Option<i64>,
    /// Value rendered as all `0` characters ("switch off" marker).
    pub off_marker: Option<i64>,
    /// Whether catch-up must replay rows that set this field.
    pub used_for_backtracking: bool,
    /// Policy deciding when a value counts as set.
    pub backtrack_when: BacktrackPolicy,
}

impl FieldSpec {
    /// Creates a plain, non-sticky field.
    pub fn new(name: impl Into<String>, kind: FieldType, length: usize) -> Self {
        Self {
            name: name.into(),
            kind,
            length,
            color: None,
            zero_marker: None,
            off_marker: None,
            used_for_backtracking: false,
            backtrack_when: BacktrackPolicy::Any,
        }
    }

    /// Sets the display color token.
    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Renders `value` as dots.
    pub fn zero_marker(mut self, value: i64) -> Self {
        self.zero_marker = Some(value);
        self
    }

    /// Renders `value` as zeros and treats it as set for catch-up.
    pub fn off_marker(mut self, value: i64) -> Self {
        self.off_marker = Some(value);
        self
    }

    /// Marks the field sticky with the given policy.
    pub fn backtrack(mut self, policy: BacktrackPolicy) -> Self {
        self.used_for_backtracking = true;
        self.backtrack_when = policy;
        self
    }

    /// Whether `value` counts as explicitly set for catch-up purposes.
    pub fn counts_as_set(&self, value: &FieldValue) -> bool {
        if !self.used_for_backtracking {
            return false;
        }
        match (self.kind, value) {
            (_, FieldValue::Null) => false,
            (FieldType::Note, FieldValue::Text(t)) => {
                let t = t.trim();
                !t.is_empty() && t != "---"
            }
            (_, FieldValue::Int(v)) => {
                if self.off_marker == Some(*v) {
                    return true;
                }
                match self.backtrack_when {
                    BacktrackPolicy::Any => true,
                    BacktrackPolicy::NonZero => *v > 0,
                }
            }
            (_, FieldValue::Text(t)) => !t.trim().is_empty(),
            (_, FieldValue::Effect(e)) => match self.backtrack_when {
                BacktrackPolicy::Any => true,
                BacktrackPolicy::NonZero => !e.is_empty(),
            },
        }
    }
}

/// Selectable value of a chip setting.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingOption {
    /// Display label.
    pub label: String,
    /// Stored value.
    pub value: f64,
}

/// Chip configuration knob (clock, variant, interrupt rate).
#[derive(Debug, Clone, PartialEq)]
pub struct ChipSetting {
    /// Song property the setting is stored under.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Preset choices; empty means free numeric input.
    pub options: Vec<SettingOption>,
    /// Default value.
    pub default: f64,
}

/// Song parameters a tuning table depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningRequest {
    /// Chip master clock in Hz.
    pub chip_frequency: u32,
    /// Note table selector carried over from imported modules.
    pub note_table: u8,
}

/// Piece of a row template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    /// Literal text.
    Literal(String),
    /// `{field}` placeholder.
    Field(String),
}

/// Splits a template into literals and placeholders.
pub fn template_parts(template: &str) -> Vec<TemplatePart> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '{' {
            literal.push(c);
            continue;
        }
        let name: String = chars.by_ref().take_while(|&c| c != '}').collect();
        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
        }
        parts.push(TemplatePart::Field(name));
    }
    if !literal.is_empty() {
        parts.push(TemplatePart::Literal(literal));
    }
    parts
}

/// Declarative chip description.
#[derive(Debug, Clone)]
pub struct ChipSchema {
    /// Chip type key (`"ay"`).
    pub chip_type: String,
    /// Channel row template.
    pub template: String,
    /// Channel fields.
    pub fields: BTreeMap<String, FieldSpec>,
    /// Global row template.
    pub global_template: String,
    /// Global fields.
    pub global_fields: BTreeMap<String, FieldSpec>,
    /// Hardware channel labels.
    pub channel_labels: Vec<String>,
    /// Chip configuration knobs.
    pub settings: Vec<ChipSetting>,
    /// Tuning table used when a song does not carry one.
    pub default_tuning_table: Vec<u16>,
    /// Builds a tuning table from song settings.
    pub resolve_tuning_table: fn(&TuningRequest) -> Vec<u16>,
}

impl ChipSchema {
    /// Starts building a schema.
    pub fn builder(chip_type: impl Into<String>) -> ChipSchemaBuilder {
        ChipSchemaBuilder {
            schema: ChipSchema {
                chip_type: chip_type.into(),
                template: String::new(),
                fields: BTreeMap::new(),
                global_template: String::new(),
                global_fields: BTreeMap::new(),
                channel_labels: Vec::new(),
                settings: Vec::new(),
                default_tuning_table: Vec::new(),
                resolve_tuning_table: |_| Vec::new(),
            },
        }
    }

    /// Fields of the given scope.
    pub fn fields_for(&self, scope: FieldScope) -> &BTreeMap<String, FieldSpec> {
        match scope {
            FieldScope::Channel => &self.fields,
            FieldScope::Global => &self.global_fields,
        }
    }

    /// Template of the given scope.
    pub fn template_for(&self, scope: FieldScope) -> &str {
        match scope {
            FieldScope::Channel => &self.template,
            FieldScope::Global => &self.global_template,
        }
    }

    /// Checks that every template placeholder resolves to a declared field.
    pub fn validate(&self) -> Result<()> {
        for scope in [FieldScope::Channel, FieldScope::Global] {
            let fields = self.fields_for(scope);
            for part in template_parts(self.template_for(scope)) {
                if let TemplatePart::Field(name) = part
                    && !fields.contains_key(&name)
                {
                    return Err(CommonError::InvalidTemplate { placeholder: name });
                }
            }
        }
        Ok(())
    }

    /// Checks a single value against the field declared in `scope`.
    pub fn check_value(&self, scope: FieldScope, field: &str, value: &FieldValue) -> Result<()> {
        let spec = self
            .fields_for(scope)
            .get(field)
            .ok_or_else(|| CommonError::UnknownField {
                field: field.to_string(),
                chip: self.chip_type.clone(),
            })?;
        if !value.fits(spec.kind) {
            return Err(CommonError::TypeMismatch {
                field: field.to_string(),
                expected: spec.kind.name(),
            });
        }
        Ok(())
    }

    /// Text width of a formatted row in `scope`.
    pub fn row_width(&self, scope: FieldScope) -> usize {
        self.column_layout(scope).1
    }

    /// Start column and width of every placeholder, for hit-testing.
    pub fn columns(&self, scope: FieldScope) -> Vec<(String, usize, usize)> {
        self.column_layout(scope).0
    }

    fn column_layout(&self, scope: FieldScope) -> (Vec<(String, usize, usize)>, usize) {
        let fields = self.fields_for(scope);
        let mut columns = Vec::new();
        let mut offset = 0;
        for part in template_parts(self.template_for(scope)) {
            match part {
                TemplatePart::Literal(text) => offset += text.chars().count(),
                TemplatePart::Field(name) => {
                    let width = fields.get(&name).map_or(0, |f| f.length);
                    columns.push((name, offset, width));
                    offset += width;
                }
            }
        }
        (columns, offset)
    }

    /// Field under a text column of a formatted row, if any.
    pub fn field_at_column(&self, scope: FieldScope, column: usize) -> Option<String> {
        self.columns(scope)
            .into_iter()
            .find(|(_, start, width)| column >= *start && column < start + width)
            .map(|(name, _, _)| name)
    }
}

/// Builder for [`ChipSchema`].
#[derive(Debug)]
pub struct ChipSchemaBuilder {
    schema: ChipSchema,
}

impl ChipSchemaBuilder {
    /// Channel row template.
    pub fn template(mut self, template: impl Into<String>) -> Self {
        self.schema.template = template.into();
        self
    }

    /// Adds a channel field.
    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.schema.fields.insert(spec.name.clone(), spec);
        self
    }

    /// Global row template.
    pub fn global_template(mut self, template: impl Into<String>) -> Self {
        self.schema.global_template = template.into();
        self
    }

    /// Adds a global field.
    pub fn global_field(mut self, spec: FieldSpec) -> Self {
        self.schema.global_fields.insert(spec.name.clone(), spec);
        self
    }

    /// Hardware channel labels.
    pub fn channel_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.schema.channel_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a chip setting.
    pub fn setting(mut self, setting: ChipSetting) -> Self {
        self.schema.settings.push(setting);
        self
    }

    /// Tuning table fallback.
    pub fn default_tuning_table(mut self, table: Vec<u16>) -> Self {
        self.schema.default_tuning_table = table;
        self
    }

    /// Tuning table resolver.
    pub fn tuning_resolver(mut self, resolver: fn(&TuningRequest) -> Vec<u16>) -> Self {
        self.schema.resolve_tuning_table = resolver;
        self
    }

    /// Finishes the schema.
    pub fn build(self) -> ChipSchema {
        self.schema
    }
}
