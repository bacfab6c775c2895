use std::sync::LazyLock;

use regex::Regex;

use crate::error::Invalid;

const SPECIAL_CHARS: &str = "!@#$%^&*()-_=+[]{}|;:'\",.<>?/`~\\";

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[^\s@<>()\[\],;:"]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$"#)
        .expect("email pattern")
});

pub fn required(values: &[&str]) -> Result<(), Invalid> {
    if values.iter().any(|v| v.trim().is_empty()) {
        return Err(Invalid::MissingField);
    }
    Ok(())
}

pub fn username(name: &str) -> Result<(), Invalid> {
    if !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Invalid::Username);
    }
    Ok(())
}

pub fn email(address: &str) -> Result<(), Invalid> {
    if !EMAIL.is_match(address) {
        return Err(Invalid::Email);
    }
    Ok(())
}

/// At least 8 characters with a letter, a digit and a special character.
pub fn password(password: &str) -> Result<(), Invalid> {
    let long_enough = password.chars().count() >= 8;
    let has_letter = password.chars().any(|c| c.is_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| SPECIAL_CHARS.contains(c));
    if long_enough && has_letter && has_digit && has_special {
        Ok(())
    } else {
        Err(Invalid::WeakPassword)
    }
}

pub fn registration(name: &str, address: &str, secret: &str) -> Result<(), Invalid> {
    required(&[name, address, secret])?;
    username(name)?;
    email(address)?;
    password(secret)
}

fn name_part(part: &str) -> bool {
    let mut chars = part.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_alphabetic())
}

/// `Firstname_Lastname`, both parts capitalized, letters only.
pub fn character_name(name: &str) -> Result<(), Invalid> {
    if name.trim().is_empty() {
        return Err(Invalid::MissingCharacterName);
    }
    let mut parts = name.split('_');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(last), None) if name_part(first) && name_part(last) => Ok(()),
        _ => Err(Invalid::CharacterName),
    }
}

pub fn origin(origin: &str) -> Result<(), Invalid> {
    if origin.trim().is_empty() {
        return Err(Invalid::MissingOrigin);
    }
    if !origin.chars().all(|c| c.is_alphabetic() || c == ' ') {
        return Err(Invalid::OriginCharacters);
    }
    if origin.trim().chars().count() < 4 {
        return Err(Invalid::OriginLength);
    }
    Ok(())
}

pub fn age(age: i32) -> Result<(), Invalid> {
    if (13..=79).contains(&age) {
        Ok(())
    } else {
        Err(Invalid::Age)
    }
}

pub fn character(name: &str, origin_text: &str, years: i32) -> Result<(), Invalid> {
    character_name(name)?;
    origin(origin_text)?;
    age(years)
}
