// SPDX-FileCopyrightText: 2025 LunNova
//
// SPDX-License-Identifier: MIT

//! Pulls `<title>`, description/keywords `<meta>` and the icon `<link>` out of CMS markup.
//!
//! Runs on the html5ever tokenizer rather than a tree builder; only the first occurrence of
//! each field counts and anything inside `<script>`/`<style>` is ignored. Broken markup
//! yields empty fields, never an error.

use html5ever::Attribute;
use html5ever::tokenizer::{BufferQueue, EndTag, StartTag, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts};
use markup5ever::TokenizerResult;
use serde::Serialize;
use std::cell::RefCell;

#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedMeta {
	pub title: Option<String>,
	pub description: Option<String>,
	pub keywords: Option<String>,
	pub icon: Option<String>,
}

#[derive(Default)]
struct MetaState {
	meta: ExtractedMeta,
	title_buffer: Option<String>,
	in_raw_tag: bool,
}

/// html5ever's `TokenSink` takes `&self`, hence the RefCell.
#[derive(Default)]
struct MetaSink {
	state: RefCell<MetaState>,
}

fn attr<'a>(attrs: &'a [Attribute], name: &str) -> Option<&'a str> {
	attrs.iter().find(|a| &*a.name.local == name).map(|a| a.value.trim())
}

fn non_empty(value: &str) -> Option<String> {
	let value = value.trim();
	if value.is_empty() { None } else { Some(value.to_string()) }
}

impl MetaSink {
	fn start_tag(&self, name: &str, attrs: &[Attribute]) {
		let mut state = self.state.borrow_mut();
		if state.in_raw_tag {
			return;
		}
		match name {
			"script" | "style" => state.in_raw_tag = true,
			"title" if state.meta.title.is_none() && state.title_buffer.is_none() => state.title_buffer = Some(String::new()),
			"meta" => {
				let Some(meta_name) = attr(attrs, "name") else { return };
				let content = attr(attrs, "content").and_then(non_empty);
				if meta_name.eq_ignore_ascii_case("description") && state.meta.description.is_none() {
					state.meta.description = content;
				} else if meta_name.eq_ignore_ascii_case("keywords") && state.meta.keywords.is_none() {
					state.meta.keywords = content;
				}
			}
			"link" if state.meta.icon.is_none() => {
				let is_icon = attr(attrs, "rel").is_some_and(|rel| rel.split_ascii_whitespace().any(|r| r.eq_ignore_ascii_case("icon")));
				if is_icon {
					state.meta.icon = attr(attrs, "href").and_then(non_empty);
				}
			}
			_ => {}
		}
	}

	fn end_tag(&self, name: &str) {
		let mut state = self.state.borrow_mut();
		match name {
			"script" | "style" => state.in_raw_tag = false,
			"title" => {
				if let Some(buffer) = state.title_buffer.take() {
					state.meta.title = non_empty(&buffer);
				}
			}
			_ => {}
		}
	}
}

impl TokenSink for MetaSink {
	type Handle = ();

	fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<Self::Handle> {
		match token {
			Token::TagToken(tag) => match tag.kind {
				StartTag => self.start_tag(&tag.name, &tag.attrs),
				EndTag => self.end_tag(&tag.name),
			},
			Token::CharacterTokens(chars) => {
				if let Some(buffer) = self.state.borrow_mut().title_buffer.as_mut() {
					buffer.push_str(&chars);
				}
			}
			Token::ParseError(err) => tracing::trace!("Ignoring markup error in CMS html: {err}"),
			_ => {}
		}
		TokenSinkResult::Continue
	}
}

pub fn extract_meta(html: &str) -> ExtractedMeta {
	if html.trim().is_empty() {
		return ExtractedMeta::default();
	}

	let tokenizer = Tokenizer::new(MetaSink::default(), TokenizerOpts::default());
	let input = BufferQueue::default();
	input.push_back(html.into());

	loop {
		match tokenizer.feed(&input) {
			TokenizerResult::Done => break,
			TokenizerResult::Script(_) => continue,
		}
	}
	tokenizer.end();

	let mut state = tokenizer.sink.state.into_inner();
	// unterminated <title>
	if let Some(buffer) = state.title_buffer.take()
		&& state.meta.title.is_none()
	{
		state.meta.title = non_empty(&buffer);
	}
	state.meta
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_extracts_all_fields() {
		let html = r#"<!doctype html><html><head>
<title> Best AI SEO Tool </title>
<meta name="description" content="Rank higher">
<meta content="ai, seo" name="Keywords">
<link rel="icon" href="/icon.png">
</head><body><h1>Hi</h1></body></html>"#;
		let meta = extract_meta(html);
		assert_eq!(meta.title.as_deref(), Some("Best AI SEO Tool"));
		assert_eq!(meta.description.as_deref(), Some("Rank higher"));
		assert_eq!(meta.keywords.as_deref(), Some("ai, seo"));
		assert_eq!(meta.icon.as_deref(), Some("/icon.png"));
	}

	#[test]
	fn test_first_occurrence_wins() {
		let html = r#"<meta name=description content=first><meta name=description content=second>
<link rel="shortcut icon" href="a.ico"><link rel=icon href=b.ico>"#;
		let meta = extract_meta(html);
		assert_eq!(meta.description.as_deref(), Some("first"));
		assert_eq!(meta.icon.as_deref(), Some("a.ico"));
	}

	#[test]
	fn test_entities_decoded() {
		let meta = extract_meta(r#"<title>Fish &amp; Chips</title><meta name="description" content="&quot;quoted&quot;">"#);
		assert_eq!(meta.title.as_deref(), Some("Fish & Chips"));
		assert_eq!(meta.description.as_deref(), Some("\"quoted\""));
	}

	#[test]
	fn test_ignores_script_contents() {
		let html = r#"<script>var x = '<meta name="description" content="nope">';</script><p>body</p>"#;
		assert_eq!(extract_meta(html).description, None);
	}

	#[test]
	fn test_missing_and_malformed() {
		assert_eq!(extract_meta(""), ExtractedMeta::default());
		assert_eq!(extract_meta("<div>no head at all</div>"), ExtractedMeta::default());
		let meta = extract_meta(r#"<meta name="description" content=""><title>Unclosed"#);
		assert_eq!(meta.description, None);
		assert_eq!(meta.title.as_deref(), Some("Unclosed"));
	}
}
