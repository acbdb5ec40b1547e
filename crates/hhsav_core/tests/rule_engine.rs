use hhsav_core::diagnostics::{
    Diagnostic, Rule, RuleEngine, TextCheck, TextLines, apply_fix, auto_fix,
};
use hhsav_core::parser;
use hhsav_core::path::Path;

fn failure(text: &str) -> Diagnostic {
    match RuleEngine::new().check(text, &Path::root()) {
        TextCheck::Failed { diagnostic, .. } => diagnostic,
        TextCheck::Parsed { .. } => panic!("text unexpectedly parsed: {text:?}"),
    }
}

fn advisories(text: &str, selected: &Path) -> Vec<Diagnostic> {
    match RuleEngine::new().check(text, selected) {
        TextCheck::Parsed { advisories, .. } => advisories,
        TextCheck::Failed { error, .. } => panic!("text failed to parse: {error}"),
    }
}

/// Applying the repair must either make the text parse or move the failure
/// on to a different rule.
fn assert_fix_progresses(text: &str, diagnostic: &Diagnostic) {
    let fixed = apply_fix(text, diagnostic).expect("fix should apply");
    let check = RuleEngine::new().check(&fixed, &Path::root());
    if let TextCheck::Failed { diagnostic: next, .. } = check {
        assert_ne!(next.note(), diagnostic.note(), "repair did not help: {fixed:?}");
    }
}

#[test]
fn unclosed_list_before_object_end_is_closed_in_place() {
    let text = "{\n  \"likedPosts\": [\n}";
    let diagnostic = failure(text);

    assert_eq!(diagnostic.rule, Rule::MissingListCloseBeforeObjectEnd);
    assert_eq!(diagnostic.note(), "missing_list_close_before_object_end");
    assert_eq!(diagnostic.line, 2);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (16, 17));
    assert_eq!(diagnostic.before_text, "  \"likedPosts\": [");
    assert_eq!(diagnostic.after_text, "  \"likedPosts\": []");

    let fixed = apply_fix(text, &diagnostic).expect("fix should apply");
    assert!(parser::parse_document(&fixed).is_ok());
}

#[test]
fn transposed_boolean_is_corrected() {
    let diagnostic = failure("{\n  \"active\": flase,\n  \"n\": 1\n}");

    assert_eq!(diagnostic.rule, Rule::BooleanLiteralTypo);
    assert_eq!(diagnostic.line, 2);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (12, 17));
    assert_eq!(diagnostic.after_text, "  \"active\": false,");
}

#[test]
fn closer_that_does_not_match_its_opener_is_rewritten() {
    let diagnostic = failure("{\n  \"a\": 1\n]");

    assert_eq!(diagnostic.rule, Rule::SymbolWrongCloser);
    assert_eq!(diagnostic.line, 3);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (0, 1));
    assert_eq!(diagnostic.after_text, "}");
}

#[test]
fn list_closer_under_an_open_object_is_rewritten() {
    let text = "{\n  \"a\": {\n  ],\n  \"b\": 1\n}";
    let diagnostic = failure(text);

    assert_eq!(diagnostic.rule, Rule::SymbolWrongCloser);
    assert_eq!(diagnostic.line, 3);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (2, 4));
    assert_eq!(diagnostic.after_text, "  },");
    assert!(parser::parse_document(&apply_fix(text, &diagnostic).expect("fix")).is_ok());
}

#[test]
fn bareword_key_is_quoted() {
    let text = "{\n  name: \"x\"\n}";
    let diagnostic = failure(text);

    assert_eq!(diagnostic.rule, Rule::MissingKeyQuoteBeforeColon);
    assert_eq!(diagnostic.note(), "missing_key_quote_before_colon");
    assert_eq!(diagnostic.line, 2);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (2, 6));
    assert_eq!(diagnostic.after_text, "  \"name\": \"x\"");
    assert_fix_progresses(text, &diagnostic);
}

#[test]
fn equals_sign_in_place_of_colon_is_replaced() {
    let text = "{\n  \"name\" = \"x\"\n}";
    let diagnostic = failure(text);

    assert_eq!(diagnostic.rule, Rule::WrongSymbolBeforeColon);
    assert_eq!(diagnostic.line, 2);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (9, 10));
    assert_eq!(diagnostic.after_text, "  \"name\": \"x\"");
    assert_fix_progresses(text, &diagnostic);
}

#[test]
fn key_with_only_a_closing_quote_is_requoted() {
    let text = "{\n  name\": \"x\"\n}";
    let diagnostic = failure(text);

    assert_eq!(diagnostic.rule, Rule::MissingOpenQuote);
    assert_eq!(diagnostic.line, 2);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (2, 7));
    assert_eq!(diagnostic.after_text, "  \"name\": \"x\"");
    assert_fix_progresses(text, &diagnostic);
}

#[test]
fn single_quoted_key_gets_double_quotes() {
    let text = "{\n  'name': \"x\"\n}";
    let diagnostic = failure(text);

    assert_eq!(diagnostic.rule, Rule::WrongOpenQuoteChar);
    assert_eq!(diagnostic.line, 2);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (2, 8));
    assert_eq!(diagnostic.after_text, "  \"name\": \"x\"");
    assert_fix_progresses(text, &diagnostic);
}

#[test]
fn escaped_closing_quote_on_a_key_is_unescaped() {
    let text = "{\n  \"name\\\": 1,\n  \"b\": 2\n}";
    let diagnostic = failure(text);

    assert_eq!(diagnostic.rule, Rule::PropertyKeyInvalidEscape);
    assert_eq!(diagnostic.line, 2);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (7, 8));
    assert_eq!(diagnostic.after_text, "  \"name\": 1,");
    assert_fix_progresses(text, &diagnostic);
}

#[test]
fn junk_after_a_scalar_value_is_cut() {
    let text = "{\n  \"a\": 1 x,\n  \"b\": 2\n}";
    let diagnostic = failure(text);

    assert_eq!(diagnostic.rule, Rule::ScalarTailInvalid);
    assert_eq!(diagnostic.line, 2);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (9, 11));
    assert_eq!(diagnostic.after_text, "  \"a\": 1,");
    assert_fix_progresses(text, &diagnostic);
}

#[test]
fn comma_typed_before_a_closer_moves_after_it() {
    let text = "{\n  \"a\": {\n    \"b\": 1\n  ,}\n  \"c\": 2\n}";
    let diagnostic = failure(text);

    assert_eq!(diagnostic.rule, Rule::CommaBeforeCloser);
    assert_eq!(diagnostic.line, 4);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (2, 4));
    assert_eq!(diagnostic.after_text, "  },");
    assert_fix_progresses(text, &diagnostic);
}

#[test]
fn comma_led_line_with_junk_becomes_the_expected_closer() {
    let text = "{\n  \"a\": {\n    \"b\": 1\n  ,x\n  \"c\": 2\n}";
    let diagnostic = failure(text);

    assert_eq!(diagnostic.rule, Rule::CommaLineInvalidTail);
    assert_eq!(diagnostic.line, 4);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (2, 4));
    assert_eq!(diagnostic.after_text, "  },");
    assert_fix_progresses(text, &diagnostic);
}

#[test]
fn list_holding_members_is_reopened_as_an_object() {
    let text = "{\n  \"cfg\": [\n    \"a\": 1\n  ]\n}";
    let diagnostic = failure(text);

    assert_eq!(diagnostic.rule, Rule::WrongListOpenForObject);
    assert_eq!(diagnostic.line, 2);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (9, 10));
    assert_eq!(diagnostic.after_text, "  \"cfg\": {");
    assert_fix_progresses(text, &diagnostic);

    let report = auto_fix(text, &Path::root(), 8);
    assert!(report.parses);
    assert_eq!(report.text, "{\n  \"cfg\": {\n    \"a\": 1\n  }\n}");
}

#[test]
fn commas_between_key_and_colon_are_dropped() {
    let diagnostic = failure("{\n\"name\" ,,: \"x\"\n}");

    assert_eq!(diagnostic.rule, Rule::CommaBeforeColon);
    assert_eq!(diagnostic.line, 2);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (7, 9));
    assert_eq!(diagnostic.after_text, "\"name\": \"x\"");
}

#[test]
fn comma_between_colon_and_value_is_dropped() {
    let diagnostic = failure("{\n  \"a\": , 5\n}");

    assert_eq!(diagnostic.rule, Rule::CommaAfterColon);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (7, 9));
    assert_eq!(diagnostic.after_text, "  \"a\": 5");
}

#[test]
fn missing_separator_is_reported_on_the_previous_member() {
    let diagnostic = failure("{\n  \"a\": 1\n  \"b\": 2\n}");

    assert_eq!(diagnostic.rule, Rule::MissingCommaBetweenMembers);
    assert_eq!(diagnostic.line, 2);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (7, 8));
    assert_eq!(diagnostic.after_text, "  \"a\": 1,");
}

#[test]
fn parenthesis_opening_members_becomes_a_brace() {
    let diagnostic = failure("{\n  \"cfg\": (\n    \"a\": 1\n  }\n}");

    assert_eq!(diagnostic.rule, Rule::WrongObjectOpenSymbol);
    assert_eq!(diagnostic.line, 2);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (9, 10));
    assert_eq!(diagnostic.after_text, "  \"cfg\": {");
}

#[test]
fn unclaimed_failures_fall_back_to_overlay_parse() {
    let diagnostic = failure("{\n  \"a\": 1,\n}");

    assert_eq!(diagnostic.rule, Rule::OverlayParse);
    assert_eq!(diagnostic.line, 3);
    assert_eq!((diagnostic.start_column, diagnostic.end_column), (0, 1));
    assert!(!diagnostic.has_fix());
}

#[test]
fn diagnose_failure_works_from_any_line_source() {
    let text = "{\n  \"a\": 1\n]";
    let error = parser::parse_document(text).expect_err("text should not parse");
    let diagnostic =
        RuleEngine::new().diagnose_failure(&TextLines::new(text), &error, &Path::root());
    assert_eq!(diagnostic.rule, Rule::SymbolWrongCloser);
}

#[test]
fn lint_flags_missing_space_after_colon() {
    let found = advisories("{\n  \"a\":1\n}", &Path::root());

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].rule, Rule::SpacingMissingSpaceAfterColon);
    assert_eq!((found[0].start_column, found[0].end_column), (5, 6));
    assert_eq!(found[0].after_text, "  \"a\": 1");
    assert!(!found[0].rule.blocks_apply());
}

#[test]
fn lint_repairs_near_miss_email() {
    let found = advisories("{\n  \"email\": \"bob#example.com\"\n}", &Path::root());

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].rule, Rule::InvalidEmail);
    assert_eq!((found[0].start_column, found[0].end_column), (12, 27));
    assert_eq!(found[0].after_text, "  \"email\": \"bob@example.com\"");
    assert!(found[0].rule.blocks_apply());
}

#[test]
fn lone_phone_value_uses_the_selected_key() {
    let selected = Path::parse("Profile/phone");
    let found = advisories("\"5551234567\"", &selected);

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].rule, Rule::MissingPhoneDash);
    assert_eq!((found[0].start_column, found[0].end_column), (1, 11));
    assert_eq!(found[0].after_text, "\"555-123-4567\"");

    assert!(advisories("\"5551234567\"", &Path::parse("Profile/name")).is_empty());
}

#[test]
fn clean_text_has_no_advisories() {
    let text = "{\n  \"email\": \"bob@example.com\",\n  \"phone\": \"555-123-4567\"\n}";
    assert!(advisories(text, &Path::root()).is_empty());
}

#[test]
fn auto_fix_chains_repairs_until_text_parses() {
    let report = auto_fix("{\n  \"a\": 1\n  \"b\": flase\n}", &Path::root(), 8);

    assert!(report.parses);
    assert_eq!(report.text, "{\n  \"a\": 1,\n  \"b\": false\n}");
    let mut notes: Vec<&str> = report.applied.iter().map(Diagnostic::note).collect();
    notes.sort_unstable();
    assert_eq!(notes, vec!["boolean_literal_typo", "missing_comma_between_members"]);
}

#[test]
fn auto_fix_stops_when_no_repair_is_offered() {
    let text = "{\n  \"a\": 1,\n}";
    let report = auto_fix(text, &Path::root(), 8);

    assert!(!report.parses);
    assert!(report.applied.is_empty());
    assert_eq!(report.text, text);
}
