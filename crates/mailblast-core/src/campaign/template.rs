//! Template Rendering - mail-merge personalization of email content

use mailblast_common::types::Recipient;
use regex::{Captures, Regex};

/// Replace every `{{key}}` occurrence with the recipient's matching field.
///
/// Keys are trimmed; resolution checks standard fields first, then
/// `custom_fields`. Unresolved keys are left verbatim so a broken template
/// stays visible in the output instead of being silently blanked.
/// Substituted values are not re-scanned, so there is no double
/// substitution.
pub fn render(template: &str, recipient: &Recipient) -> String {
    if template.is_empty() {
        return String::new();
    }

    let re = Regex::new(r"\{\{([^{}]*)\}\}").unwrap();
    re.replace_all(template, |caps: &Captures<'_>| {
        let key = caps[1].trim();
        match recipient.field(key) {
            Some(value) => value.to_string(),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn recipient() -> Recipient {
        Recipient {
            email: "grace@example.com".to_string(),
            first_name: Some("Grace".to_string()),
            last_name: Some("Hopper".to_string()),
            company: Some("Navy".to_string()),
            custom_fields: HashMap::from([
                ("course".to_string(), "COBOL 101".to_string()),
                ("email".to_string(), "shadowed@example.com".to_string()),
            ]),
        }
    }

    #[test]
    fn test_render_standard_fields() {
        let out = render("Hello {{first_name}} {{last_name}} of {{company}}", &recipient());
        assert_eq!(out, "Hello Grace Hopper of Navy");
    }

    #[test]
    fn test_render_custom_fields() {
        let out = render("Your certificate for {{course}} is attached", &recipient());
        assert_eq!(out, "Your certificate for COBOL 101 is attached");
    }

    #[test]
    fn test_standard_fields_win_over_custom() {
        let out = render("To: {{email}}", &recipient());
        assert_eq!(out, "To: grace@example.com");
    }

    #[test]
    fn test_unresolved_keys_left_verbatim() {
        let out = render("Hello {{first_name}}, code {{promo_code}}", &recipient());
        assert_eq!(out, "Hello Grace, code {{promo_code}}");
    }

    #[test]
    fn test_keys_are_trimmed() {
        let out = render("Hi {{ first_name }}!", &recipient());
        assert_eq!(out, "Hi Grace!");
    }

    #[test]
    fn test_no_double_substitution() {
        let mut r = recipient();
        r.custom_fields
            .insert("sig".to_string(), "{{first_name}}".to_string());

        let out = render("-- {{sig}}", &r);
        assert_eq!(out, "-- {{first_name}}");
    }

    #[test]
    fn test_empty_and_plain_templates() {
        assert_eq!(render("", &recipient()), "");
        assert_eq!(render("no placeholders here", &recipient()), "no placeholders here");
    }
}
