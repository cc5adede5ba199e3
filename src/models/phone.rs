use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::{self, Display};

use diesel::sql_types::VarChar;
use regex::Regex;
use validator::{Validate, ValidationError, ValidationErrors};

/// Phone number of a wallet owner. Wallets are addressed by phone, so that funds
/// can be sent to a person who has no wallet yet.
#[derive(Deserialize, FromSqlRow, AsExpression, Clone, Default, PartialEq, Eq, Hash, Serialize, Debug)]
#[sql_type = "VarChar"]
pub struct Phone(String);
derive_newtype_sql!(phone, VarChar, Phone, Phone);

impl Phone {
    /// Drops formatting characters, `+7 (900) 123-45-67` -> `+79001234567`
    pub fn new(phone: String) -> Self {
        let normalized = phone
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-' && *c != '(' && *c != ')')
            .collect();
        Phone(normalized)
    }

    pub fn raw(&self) -> &str {
        &self.0
    }
}

impl Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Phone {
    pub fn validation_error(&self) -> Option<ValidationError> {
        let is_valid = Regex::new(r"^\+?[0-9]{6,15}$")
            .map(|re| re.is_match(&self.0))
            .unwrap_or(false);
        if is_valid {
            None
        } else {
            Some(ValidationError {
                code: Cow::from("phone"),
                message: Some(Cow::from("Phone should contain 6 to 15 digits with an optional leading +")),
                params: HashMap::new(),
            })
        }
    }
}

impl Validate for Phone {
    fn validate(&self) -> Result<(), ValidationErrors> {
        match self.validation_error() {
            None => Ok(()),
            Some(error) => {
                let mut errors = ValidationErrors::new();
                errors.add("user_phone", error);
                Err(errors)
            }
        }
    }
}
