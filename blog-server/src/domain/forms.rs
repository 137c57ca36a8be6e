use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

/// Field name -> human readable messages, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn single(field: &str, message: &str) -> Self {
        let mut map = BTreeMap::new();
        map.insert(field.to_string(), vec![message.to_string()]);
        Self(map)
    }

    #[cfg(test)]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    #[cfg(test)]
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut map = BTreeMap::new();
        for (field, errs) in errors.field_errors() {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            map.insert(field.to_string(), messages);
        }
        Self(map)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct CommentForm {
    #[validate(length(min = 1, max = 80, message = "name must be between 1 and 80 characters"))]
    pub name: String,
    #[validate(email(message = "enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "comment body must not be empty"))]
    pub body: String,
}

impl CommentForm {
    /// Trims every field, then validates. Nothing is persisted on error.
    pub fn clean(self) -> Result<Self, FieldErrors> {
        let form = Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            body: self.body.trim().to_string(),
        };
        form.validate()?;
        Ok(form)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ShareForm {
    #[validate(length(min = 1, max = 25, message = "name must be between 1 and 25 characters"))]
    pub name: String,
    #[validate(email(message = "enter a valid email address"))]
    pub email: String,
    #[validate(email(message = "enter a valid recipient address"))]
    pub to: String,
    pub comments: String,
}

impl ShareForm {
    pub fn clean(self) -> Result<Self, FieldErrors> {
        let form = Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            to: self.to.trim().to_string(),
            comments: self.comments.trim().to_string(),
        };
        form.validate()?;
        Ok(form)
    }
}
