use validator::{Validate, ValidationError};

pub fn validate<T: Validate>(val: &T) -> Result<(), validator::ValidationErrors> {
    val.validate()
}

/// At least 8 characters with an upper-case letter, a lower-case letter and a digit.
pub fn password_policy(password: &str) -> Result<(), ValidationError> {
    let long_enough = password.chars().count() >= 8;
    let upper = password.chars().any(|c| c.is_uppercase());
    let lower = password.chars().any(|c| c.is_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    if long_enough && upper && lower && digit {
        Ok(())
    } else {
        let mut err = ValidationError::new("password_policy");
        err.message = Some(
            "Password must be at least 8 characters and contain upper-case, lower-case and a digit"
                .into(),
        );
        Err(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy() {
        assert!(password_policy("Admin123!").is_ok());
        assert!(password_policy("short1A").is_err());
        assert!(password_policy("alllowercase1").is_err());
        assert!(password_policy("NoDigitsHere").is_err());
    }
}
