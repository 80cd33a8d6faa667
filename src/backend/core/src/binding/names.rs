//! Model name composition.

use std::fmt::Display;

/// `prefix.property`, or `property` when the prefix is empty.
pub fn create_property_model_name(prefix: &str, property: &str) -> String {
    if prefix.is_empty() {
        property.to_string()
    } else if property.is_empty() {
        prefix.to_string()
    } else {
        format!("{}.{}", prefix, property)
    }
}

/// `prefix[index]`.
pub fn create_index_model_name(prefix: &str, index: impl Display) -> String {
    format!("{}[{}]", prefix, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_names() {
        assert_eq!(create_property_model_name("", "name"), "name");
        assert_eq!(create_property_model_name("user", "name"), "user.name");
        assert_eq!(create_property_model_name("user", ""), "user");
    }

    #[test]
    fn test_index_names() {
        assert_eq!(create_index_model_name("tags", 0), "tags[0]");
        assert_eq!(create_index_model_name("scores", "math"), "scores[math]");
        assert_eq!(create_index_model_name("", 2), "[2]");
    }
}
