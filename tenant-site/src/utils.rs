// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

use std::borrow::Cow;
use std::collections::HashMap;

/// Escapes text for use inside a quoted HTML attribute or XML text node.
pub fn escape_html_attribute(s: &'_ str) -> Cow<'_, str> {
	let mut output = String::with_capacity(s.len());
	for c in s.chars() {
		match c {
			'&' => output.push_str("&amp;"),
			'<' => output.push_str("&lt;"),
			'>' => output.push_str("&gt;"),
			'"' => output.push_str("&quot;"),
			'\'' => output.push_str("&apos;"),
			_ => output.push(c),
		}
	}
	if output.len() == s.len() {
		Cow::from(s)
	} else {
		Cow::from(output)
	}
}

pub struct EscapeHtmlAttribute;
impl tera::Filter for EscapeHtmlAttribute {
	fn filter(&self, value: &tera::Value, _args: &HashMap<String, tera::Value>) -> tera::Result<tera::Value> {
		let s = tera::try_get_value!("escape_html_attribute", "value", String, value);
		Ok(tera::Value::String(escape_html_attribute(&s).to_string()))
	}

	fn is_safe(&self) -> bool {
		true
	}
}

/// Serializes JSON for an inline `<script type="application/ld+json">` block.
/// CMS strings may contain `</script>`, so `<` is escaped.
pub fn json_for_script(value: &serde_json::Value) -> String {
	value.to_string().replace('<', "\\u003c")
}
