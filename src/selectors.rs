//! Selector builders for browser steps.
//!
//! Steps name form fields with dots (`user.address.city`) and page regions by
//! CSS class. These helpers turn those names into the bracketed field names,
//! CSS selectors and XPath expressions a browser driver understands.

/// CSS selector for inline field error messages.
pub const FIELD_ERROR_CSS: &str = ".has-error .help-block";

/// CSS selector for page-wide error alerts.
pub const GLOBAL_ERROR_CSS: &str = ".alert.alert-danger";

/// Convert a dotted field path into a bracketed form field name.
///
/// # Examples
/// ```
/// use stepglue::selectors::form_field;
///
/// assert_eq!(form_field("user.address.city"), "user[address][city]");
/// assert_eq!(form_field("email"), "email");
/// ```
#[must_use]
pub fn form_field(path: &str) -> String {
    let mut segments = path.split('.');
    let mut name = segments.next().unwrap_or_default().to_owned();
    for segment in segments {
        name.push('[');
        name.push_str(segment);
        name.push(']');
    }
    name
}

/// Field name for `key` in row `index` of a form collection.
#[must_use]
pub fn collection_field(form: &str, index: usize, key: &str) -> String {
    format!("{form}[{index}][{key}]")
}

/// Quote `text` as an XPath string literal.
///
/// Double quotes are preferred. Text containing both quote kinds is split
/// into a `concat()` call.
#[must_use]
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    let parts = text
        .split('"')
        .map(|part| format!("\"{part}\""))
        .collect::<Vec<_>>()
        .join(", '\"', ");
    format!("concat({parts})")
}

/// XPath matching elements carrying `class` among their classes.
///
/// # Examples
/// ```
/// use stepglue::selectors::class_xpath;
///
/// assert_eq!(
///     class_xpath("user-row"),
///     r#"//*[contains(concat(" ", normalize-space(@class), " "), " user-row ")]"#
/// );
/// ```
#[must_use]
pub fn class_xpath(class: &str) -> String {
    format!(
        "//*[contains(concat(\" \", normalize-space(@class), \" \"), {})]",
        xpath_literal(&format!(" {class} "))
    )
}

/// XPath matching a link by `href` suffix, title or text.
#[must_use]
pub fn link_xpath(link: &str) -> String {
    let literal = xpath_literal(link);
    format!(
        "//a[({literal} = substring(@href, string-length(@href) - string-length({literal}) +1)) \
         or contains(@title, {literal}) or descendant::text()[contains(., {literal})]]"
    )
}

/// XPath matching a menu link whose `href` contains `menu`.
#[must_use]
pub fn menu_xpath(menu: &str) -> String {
    format!("//a[contains(@href, {})]", xpath_literal(menu))
}

/// CSS selector for the error list attached to `form`'s `field`.
#[must_use]
pub fn form_error_css(form: &str, field: &str) -> String {
    format!("div.has-error label[for=\"{form}_{field}\"] ~ ul")
}

/// XPath for the error list of a checkbox group containing input `field`.
#[must_use]
pub fn checkbox_error_xpath(field: &str) -> String {
    format!("//input[@id = '{field}']/../../ul")
}

/// CSS selector for `field` inside a details `section`.
#[must_use]
pub fn details_css(section: &str, field: &str) -> String {
    format!(".{section} .{field}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "")]
    #[case("user", "user")]
    #[case("user.0.name", "user[0][name]")]
    fn form_field_brackets_segments(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(form_field(path), expected);
    }

    #[rstest]
    #[case("plain", "\"plain\"")]
    #[case("say \"hi\"", "'say \"hi\"'")]
    #[case("it's \"x\"", "concat(\"it's \", '\"', \"x\", '\"', \"\")")]
    fn xpath_literal_quotes_safely(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(xpath_literal(text), expected);
    }

    #[rstest]
    fn link_xpath_matches_href_title_and_text() {
        assert_eq!(
            link_xpath("Edit"),
            "//a[(\"Edit\" = substring(@href, string-length(@href) - string-length(\"Edit\") +1)) \
             or contains(@title, \"Edit\") or descendant::text()[contains(., \"Edit\")]]"
        );
    }

    #[rstest]
    fn simple_selectors_interpolate_names() {
        assert_eq!(menu_xpath("/admin"), "//a[contains(@href, \"/admin\")]");
        assert_eq!(
            form_error_css("user", "email"),
            "div.has-error label[for=\"user_email\"] ~ ul"
        );
        assert_eq!(checkbox_error_xpath("roles_0"), "//input[@id = 'roles_0']/../../ul");
        assert_eq!(details_css("profile", "name"), ".profile .name");
        assert_eq!(collection_field("items", 2, "qty"), "items[2][qty]");
    }
}
