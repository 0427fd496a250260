use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use rstest::rstest;
use similar_asserts::assert_eq;
use tracing_test::traced_test;

use super::__fixtures::*;
use super::*;
use crate::tokens::LexerMode;
use crate::tokens::Token;

fn symbols(pairs: &[(&str, &str)]) -> HashMap<String, String> {
	pairs
		.iter()
		.map(|(name, value)| ((*name).to_string(), (*value).to_string()))
		.collect()
}

#[rstest]
#[case::precedence("1 + 2 * 3", 7)]
#[case::parentheses("(1 + 2) * 3", 9)]
#[case::integer_division("10 / 3", 3)]
#[case::remainder("7 % 4", 3)]
#[case::shift("1 << 4", 16)]
#[case::hex("0x10", 16)]
#[case::octal("010", 8)]
#[case::suffix("10UL", 10)]
#[case::char_literal("'A'", 65)]
#[case::unary_minus("-3 + 1", -2)]
#[case::complement("~0", -1)]
#[case::ternary("1 ? 2 : 3", 2)]
#[case::defined_call("defined(FOO)", 1)]
#[case::defined_bare("defined FOO && defined BAR", 0)]
#[case::symbol("FOO + 1", 42)]
#[case::undefined_symbol("MISSING + 1", 1)]
fn evaluate_integer_expressions(#[case] expression: &str, #[case] expected: i64) -> SipweaveResult<()> {
	let symbols = symbols(&[("FOO", "41")]);
	let value = evaluate(expression, &symbols)?;

	assert_eq!(value, Value::Int(expected));

	Ok(())
}

#[rstest]
#[case::float_comparison("1.5 > 1", true)]
#[case::float_equality("0.5 * 2 == 1.0", true)]
#[case::logical_not("!FOO", false)]
#[case::logical_or("0 || FOO", true)]
#[case::version_check("VERSION >= 0x050F00", true)]
fn evaluate_conditions(#[case] expression: &str, #[case] expected: bool) -> SipweaveResult<()> {
	let symbols = symbols(&[("FOO", "1"), ("VERSION", "0x060200")]);

	assert_eq!(evaluate(expression, &symbols)?.is_truthy(), expected);

	Ok(())
}

#[test]
fn evaluate_rejects_division_by_zero() {
	let symbols = symbols(&[]);
	let result = evaluate("1 / 0", &symbols);

	assert!(matches!(result, Err(SipweaveError::Expression { .. })));
}

#[test]
#[traced_test]
fn malformed_condition_is_false() {
	let symbols = symbols(&[]);

	assert!(!evaluate_condition("1 +", &symbols));
	assert!(logs_contain("treating the condition as false"));
}

#[test]
fn is_defined_checks_symbol_presence() {
	let symbols = symbols(&[("EMPTY", "")]);

	assert!(is_defined("EMPTY", &symbols));
	assert!(!is_defined("OTHER", &symbols));
}

#[rstest]
#[case::taken_branch(
	"#define FOO 1\n#if FOO\nint a;\n#else\nint b;\n#endif",
	"\n\nint a;\n\n\n"
)]
#[case::else_branch(
	"#define FOO 1\n#if !FOO\nint a;\n#else\nint b;\n#endif",
	"\n\n\n\nint b;\n"
)]
#[case::elif_branch(
	"#if 0\nint a;\n#elif 1\nint b;\n#else\nint c;\n#endif",
	"\n\n\nint b;\n\n\n"
)]
#[case::undef("#define X 1\n#undef X\n#ifdef X\nint a;\n#endif", "\n\n\n\n")]
#[case::nested_inactive("#if 0\n#if 1\nint a;\n#endif\n#endif\nint b;", "\n\n\n\n\nint b;")]
#[case::object_macro("#define EXPORT_API\nEXPORT_API int f();", "\n int f();")]
#[case::continuation("#define LONG \\\n  2\nint a[LONG];", "\n\nint a[2];")]
fn preprocess_filters_lines(#[case] input: &str, #[case] expected: &str) {
	let mut ctx = PreprocessorContext::default();
	let output = ctx.preprocess(input);

	assert_eq!(output, expected);
	assert_eq!(output.split('\n').count(), input.split('\n').count());
}

#[test]
fn preprocess_skips_include_guards() {
	let mut ctx = PreprocessorContext::default();
	let output = ctx.preprocess("#ifndef WIDGET_H\n#define WIDGET_H\nint a;\n#endif\n");

	assert_eq!(output, "\n\nint a;\n\n");
	assert!(!ctx.values().contains_key("WIDGET_H"));
}

#[test]
fn global_values_win_over_defines() {
	let mut ctx = PreprocessorContext::new(symbols(&[("FOO", "0")]), vec![]);
	let output = ctx.preprocess("#define FOO 1\n#if FOO\nint a;\n#endif");

	assert_eq!(output, "\n\n\n");
	assert_eq!(ctx.values().get("FOO").map(String::as_str), Some("1"));
}

#[test]
fn global_macros_apply_to_active_lines() -> SipweaveResult<()> {
	let rule = MacroSubstitution::global(r"WIDGETS_DEPRECATED_X\([^)]*\)", "")?;
	let mut ctx = PreprocessorContext::new(HashMap::new(), vec![rule]);
	let output = ctx.preprocess("void f() WIDGETS_DEPRECATED_X(\"use g\");");

	assert_eq!(output, "void f() ;");

	Ok(())
}

#[test]
fn invalid_global_macro_is_an_error() {
	let result = MacroSubstitution::global("(", "");

	assert!(result.is_err());
}

#[test]
#[traced_test]
fn unterminated_conditional_warns() {
	let mut ctx = PreprocessorContext::default();
	let output = ctx.preprocess("#if 1\nint a;");

	assert_eq!(output, "\nint a;");
	assert!(logs_contain("conditional block(s) not terminated"));
}

#[test]
fn tokenize_function_bodies_as_blocks() -> SipweaveResult<()> {
	let tokens = tokenize_source("int f() { return 1; }", None, &default_lexer_options())?;
	let kinds: Vec<&Token> = tokens.iter().map(|token| &token.token).collect();

	assert_eq!(kinds.len(), 5);
	assert!(matches!(kinds[4], Token::Block(_)));

	Ok(())
}

#[test]
fn tokenize_configured_macros() -> SipweaveResult<()> {
	let tokens = tokenize_source(
		"Q_OBJECT\nQ_PROPERTY(int width READ width)",
		None,
		&default_lexer_options(),
	)?;

	assert_eq!(tokens[0].token, Token::Macro("Q_OBJECT".to_string()));
	assert_eq!(tokens[1].token, Token::Macro("Q_PROPERTY".to_string()));
	assert!(matches!(&tokens[2].token, Token::MacroArguments(arguments) if arguments.len() == 1));

	Ok(())
}

#[test]
fn tokenize_keeps_doc_comments_only() -> SipweaveResult<()> {
	let tokens = tokenize_source("// plain\n/// Documented.\nint x;", None, &default_lexer_options())?;

	assert_eq!(tokens[0].token, Token::DocComment("/// Documented.".to_string()));
	assert_eq!(tokens.len(), 4);
	assert_eq!(tokens[1].line, 3);

	Ok(())
}

#[test]
fn tokenize_reports_unrecognized_characters() {
	let Err(error) = tokenize_source("int x @;", Some(Path::new("bad.h")), &default_lexer_options()) else {
		panic!("expected a lexer error");
	};

	assert_eq!(error.line, 1);
	assert_eq!(error.mode, LexerMode::Declaration);
	assert_eq!(error.token.as_str(), "@");
}

#[test]
fn tokenize_reports_unterminated_bodies() {
	let Err(error) = tokenize_source("void f() {\n", None, &default_lexer_options()) else {
		panic!("expected a lexer error");
	};

	assert_eq!(error.mode, LexerMode::FunctionBody);
}

#[test]
fn parse_class_with_bases_and_access() -> SipweaveResult<()> {
	let scope = parse_header_text(
		"class A : public B, protected C\n{\n    int x;\npublic:\n    A();\n    ~A();\n};",
	)?;
	let entity = scope.find("A").expect("class A");
	let class = entity.as_class().expect("a class");

	assert_eq!(class.bases, vec!["B".to_string(), "C".to_string()]);
	assert_eq!(class.keyword, ClassKeyword::Class);

	let members: Vec<&Entity> = class.scope.active().collect();
	assert_eq!(members.len(), 3);
	assert_eq!(members[0].access, Access::Private);
	assert_eq!(members[0].as_variable().map(|v| v.type_name.as_str()), Some("int"));
	assert_eq!(members[1].access, Access::Public);
	assert_eq!(members[1].as_function().map(|f| f.kind), Some(FunctionKind::Constructor));
	assert_eq!(members[2].name.as_deref(), Some("~A"));
	assert_eq!(members[2].as_function().map(|f| f.kind), Some(FunctionKind::Destructor));

	Ok(())
}

#[test]
fn parse_access_label_after_unknown_macro_call() -> SipweaveResult<()> {
	let scope = parse_header_text(
		"class A\n{\n    UNKNOWN_MACRO(x)\npublic:\n    A(int v) : value(v) {}\n    void f();\n};",
	)?;
	let class = scope.find("A").and_then(Entity::as_class).expect("class A");

	let members: Vec<&Entity> = class.scope.active().collect();
	assert_eq!(members.len(), 2);
	assert_eq!(members[0].access, Access::Public);
	assert_eq!(members[0].as_function().map(|f| f.kind), Some(FunctionKind::Constructor));
	assert_eq!(members[1].name.as_deref(), Some("f"));
	assert_eq!(members[1].access, Access::Public);

	Ok(())
}

#[test]
fn parse_struct_defaults_to_public() -> SipweaveResult<()> {
	let scope = parse_header_text("struct Point { int x; int y; };")?;
	let point = scope.find("Point").and_then(Entity::as_class).expect("struct");

	assert!(point.scope.active().all(|member| member.access == Access::Public));

	Ok(())
}

#[test]
fn parse_functions_and_qualifiers() -> SipweaveResult<()> {
	let scope = parse_header_text(
		"class Shape {\npublic:\n    virtual double area() const = 0;\n    static Shape *create(const QString &name, int sides = 3);\n    void \
		 reset(void);\n    Shape(const Shape &) = delete;\n};",
	)?;
	let shape = scope.find("Shape").and_then(Entity::as_class).expect("class");
	let members: Vec<&Entity> = shape.scope.active().collect();

	let area = members[0].as_function().expect("area");
	assert_eq!(area.return_type.as_deref(), Some("double"));
	assert!(area.has(Qualifier::Virtual));
	assert!(area.has(Qualifier::Const));
	assert!(area.has(Qualifier::Pure));

	let create = members[1].as_function().expect("create");
	assert!(create.has(Qualifier::Static));
	assert_eq!(create.return_type.as_deref(), Some("Shape *"));
	assert_eq!(create.arguments, vec![
		Argument::new("const QString &").named("name"),
		Argument::new("int").named("sides").with_default("3"),
	]);

	let reset = members[2].as_function().expect("reset");
	assert!(reset.arguments.is_empty());

	let copy = members[3].as_function().expect("copy");
	assert!(copy.deleted);

	Ok(())
}

#[rstest]
#[case::equality("bool operator==(const Point &other) const;", "operator==")]
#[case::call("int operator()(int value);", "operator()")]
#[case::cast("operator bool() const;", "operator bool")]
fn parse_operators(#[case] source: &str, #[case] expected: &str) -> SipweaveResult<()> {
	let scope = parse_header_text(source)?;
	let entity = scope.active().next().expect("an operator");

	assert_eq!(entity.name.as_deref(), Some(expected));
	assert!(entity.as_function().is_some());

	Ok(())
}

#[test]
fn parse_enums() -> SipweaveResult<()> {
	let scope = parse_header_text(
		"enum class Mode : int { Fast = 1, Slow };\nenum { Anonymous };\nenum Forward : int;",
	)?;
	let entities: Vec<&Entity> = scope.active().collect();

	assert_eq!(entities.len(), 2);
	let mode = entities[0].as_enum().expect("enum");
	assert!(mode.scoped);
	assert_eq!(mode.enumerators[0].name, "Fast");
	assert_eq!(mode.enumerators[0].value.as_deref(), Some("1"));
	assert_eq!(mode.enumerators[1].value, None);
	assert_eq!(entities[1].name, None);

	Ok(())
}

#[test]
fn parse_typedef_forms() -> SipweaveResult<()> {
	let scope = parse_header_text(
		"typedef QMap<QString, int> Counts;\ntypedef void (*Callback)(int, void *);\ntypedef struct { int x; } \
		 Point;",
	)?;

	let counts = scope.find("Counts").and_then(Entity::as_typedef).expect("typedef");
	assert_eq!(counts.form, TypedefForm::Plain {
		target: "QMap<QString, int>".to_string()
	});

	let callback = scope.find("Callback").and_then(Entity::as_typedef).expect("typedef");
	assert!(matches!(
		&callback.form,
		TypedefForm::FunctionPointer { return_type, arguments }
			if return_type == "void" && arguments.len() == 2
	));

	let point = scope.find("Point").and_then(Entity::as_typedef).expect("typedef");
	let inner = point.scope.as_ref().and_then(|scope| scope.first()).expect("struct");
	assert!(inner.as_class().is_some());

	Ok(())
}

#[test]
fn parse_variables_with_several_declarators() -> SipweaveResult<()> {
	let scope = parse_header_text("int a, *b, c[4];\nvoid (*handler)(int);")?;
	let types: Vec<(&str, &str)> = scope
		.active()
		.filter_map(|entity| {
			entity
				.as_variable()
				.map(|variable| (entity.name_or_empty(), variable.type_name.as_str()))
		})
		.collect();

	assert_eq!(types, vec![
		("a", "int"),
		("b", "int *"),
		("c", "int[4]"),
		("handler", "void (*)(int)"),
	]);

	Ok(())
}

#[test]
fn parse_namespaces_templates_and_macros() -> SipweaveResult<()> {
	let scope = parse_header_text(
		"namespace gfx {\ntemplate <typename T> class Box { };\nclass Item {\n    Q_OBJECT\n    Q_PROPERTY(int size \
		 READ size)\n};\n}\nextern \"C\" { void c_api(); }",
	)?;

	let gfx = scope.find("gfx").and_then(Entity::scope).expect("namespace");
	let boxed = gfx.find("Box").and_then(Entity::as_class).expect("template");
	assert_eq!(boxed.template.as_deref(), Some("typename T"));

	let item = gfx.find("Item").and_then(Entity::as_class).expect("class");
	let macros: Vec<&str> = item
		.scope
		.iter()
		.filter(|entity| matches!(entity.kind, EntityKind::MacroReference(_)))
		.map(Entity::name_or_empty)
		.collect();
	assert_eq!(macros, vec!["Q_OBJECT", "Q_PROPERTY"]);

	assert!(scope.find("c_api").and_then(Entity::as_function).is_some());

	Ok(())
}

#[test]
fn parse_keeps_doc_comments() -> SipweaveResult<()> {
	let scope = parse_header_text("/** Adds two numbers. */\nint add(int a, int b);")?;
	let add = scope.find("add").expect("function");

	assert!(add.doc.as_deref().is_some_and(|doc| doc.contains("Adds two numbers")));

	Ok(())
}

#[rstest]
#[case::stray_brace("int a;\n}")]
#[case::unclosed_class("class A {\n    int a;\n")]
fn parse_errors(#[case] source: &str) {
	let result = parse_source(source, Some(Path::new("broken.h")), &default_lexer_options());

	assert!(result.is_err());
}

#[test]
fn parse_error_reports_location() {
	let Err(error) = parse_source("int a;\n}", Some(Path::new("broken.h")), &default_lexer_options()) else {
		panic!("expected a parse error");
	};

	assert_eq!(error.line, 2);
	assert_eq!(error.file.as_deref(), Some(Path::new("broken.h")));
	assert!(error.to_string().contains("unmatched `}`"));
}

#[rstest]
#[case::declarations(CANONICAL_SIP)]
#[case::extras(CANONICAL_SIP_EXTRAS)]
#[case::hand_edits(HAND_EDITED_SIP)]
#[case::enum_comment_before_ignored(
	"enum Mode\n{\n    Fast,\n    // not in python\n//ig     Slow,\n};\n"
)]
#[case::namespace_closing_comment("namespace gfx\n{\nvoid draw();\n}; // gfx\n")]
#[case::exception_block(
	"%Exception std::exception(SIP_Exception) /PyName=StdException/\n{\n%RaiseCode\n    PyErr_SetString(sipException_std_exception, sipExceptionRef.what());\n%End\n};\n"
)]
fn sip_round_trip(#[case] text: &str) -> SipweaveResult<()> {
	let scope = parse_sip_text(text)?;

	assert_eq!(write_sip(&scope), text);

	Ok(())
}

#[test]
fn sip_parser_reads_flags_and_blocks() -> SipweaveResult<()> {
	let scope = parse_sip_text(CANONICAL_SIP)?;
	let widgets = scope.find("Widgets").expect("namespace");
	assert_eq!(widgets.blocks[0].name, "TypeHeaderCode");

	let widget = widgets
		.scope()
		.and_then(|scope| scope.find("Widget"))
		.expect("class");
	assert!(widget.annotations.contains_name("Abstract"));

	let members = widget.scope().expect("members");
	let hidden = members.find("hidden").expect("ignored function");
	assert!(hidden.ignore);
	assert_eq!(hidden.access, Access::Signal);

	let data = members.find("data").and_then(Entity::as_function).expect("function");
	assert!(data.arguments[0].annotations.contains_name("Out"));
	assert_eq!(
		data.c_signature.as_ref().and_then(|signature| signature.return_type.as_deref()),
		Some("int *")
	);

	let extras = parse_sip_text(CANONICAL_SIP_EXTRAS)?;
	assert!(extras.find("answer").is_some_and(|answer| answer.force));

	Ok(())
}

#[test]
fn sip_parser_reads_enum_hand_edits() -> SipweaveResult<()> {
	let scope = parse_sip_text(HAND_EDITED_SIP)?;

	let color = scope.find("Color").expect("enum");
	assert_eq!(color.trailing_comment.as_deref(), Some("// Color"));

	let EntityKind::Enum(value) = &color.kind else {
		panic!("expected an enum");
	};
	let names: Vec<&str> = value.enumerators.iter().map(|e| e.name.as_str()).collect();
	assert_eq!(names, vec!["Red", "Green", "Blue", "Legacy"]);
	assert_eq!(value.enumerators[0].comments, vec![Comment::Line("// primary colours".to_string())]);
	assert!(value.enumerators[1].ignore);
	assert_eq!(value.enumerators[2].trailing_comment.as_deref(), Some("// default"));
	assert!(value.enumerators[3].force);
	assert!(!value.enumerators[2].force);
	assert_eq!(
		value.closing_comments,
		vec![Comment::Blank, Comment::Line("// more to come".to_string())]
	);

	let directive = scope
		.iter()
		.find_map(|entity| {
			match &entity.kind {
				EntityKind::Directive(text) => Some(text.as_str()),
				_ => None,
			}
		})
		.expect("mapped type");
	assert!(directive.starts_with("%MappedType QList<int>\n{\n%TypeHeaderCode\n"));
	assert!(directive.ends_with("\n%End\n};"));

	let widget = scope.find("Widget").and_then(Entity::scope).expect("class");
	assert_eq!(
		widget.find("show").and_then(|show| show.trailing_comment.as_deref()),
		Some("// hand note")
	);

	Ok(())
}

#[test]
fn sip_comment_mid_statement_moves_before_it() -> SipweaveResult<()> {
	let scope = parse_sip_text("void f(int a, // first\n       int b);\n")?;

	assert_eq!(write_sip(&scope), "// first\nvoid f(int a, int b);\n");

	Ok(())
}

#[test]
fn sip_parser_rejects_unterminated_directive_body() {
	let result = parse_sip("%MappedType QList<int>\n{\n%TypeHeaderCode\n%End\n", None);

	assert!(result.is_err());
}

#[test]
fn sip_parser_rejects_preprocessor_lines() {
	let result = parse_sip("#include <widget.h>\n", None);

	assert!(result.is_err());
}

#[test]
fn sip_parser_rejects_stray_end() {
	let result = parse_sip("void f();\n%End\n", None);

	assert!(result.is_err());
}

#[test]
fn writer_marks_ignored_and_forced_entities() {
	let function = Function {
		kind: FunctionKind::Function,
		return_type: Some("void".to_string()),
		arguments: vec![],
		qualifiers: Default::default(),
		c_signature: None,
		template: None,
		deleted: false,
	};
	let scope = Scope::from(vec![
		Entity::new(EntityKind::Function(function.clone()))
			.named("hidden")
			.ignored(true),
		Entity::new(EntityKind::Function(function))
			.named("kept")
			.forced(true),
	]);

	assert_eq!(write_sip(&scope), "//ig void hidden();\n//force\nvoid kept();\n//end\n");
}

fn merged(previous: &str, candidate: &str) -> SipweaveResult<String> {
	let previous = parse_sip_text(previous)?;
	let candidate = parse_sip_text(candidate)?;

	Ok(write_sip(&merge(&previous, &candidate)))
}

#[rstest]
#[case::union_of_annotations(
	"void foo() /PyName=Foozor/;\n",
	"void foo() /Factory/;\n",
	"void foo() /PyName=Foozor,Factory/;\n"
)]
#[case::stale_entity_dropped("void baz();\nvoid keep();\n", "void keep();\n", "void keep();\n")]
#[case::forced_entity_kept(
	"//force\nvoid bar();\n//end\nvoid keep();\n",
	"void keep();\n",
	"//force\nvoid bar();\n//end\nvoid keep();\n"
)]
#[case::trailing_default_arguments(
	"void f(int x) /ReleaseGIL/;\n",
	"void f(int x, bool y = 1);\n",
	"void f(int x, bool y = 1) /ReleaseGIL/;\n"
)]
#[case::new_entities_appended(
	"void a();\n",
	"void a();\n// new api\nvoid b();\n",
	"void a();\n// new api\nvoid b();\n"
)]
#[case::ignore_flag_kept("//ig void old();\n", "void old();\n", "//ig void old();\n")]
#[case::conditional_kept(
	"%If (Qt_6_0_0 -)\nvoid modern() /ReleaseGIL/;\n%End\n",
	"void modern();\n",
	"%If (Qt_6_0_0 -)\nvoid modern() /ReleaseGIL/;\n%End\n"
)]
#[case::comments_kept(
	"// hand written\nvoid a();\n",
	"void a();\n",
	"// hand written\nvoid a();\n"
)]
#[case::empty_previous("", "void a();\n", "void a();\n")]
#[case::trailing_comment_kept("void f(); // hand note\n", "void f();\n", "void f(); // hand note\n")]
#[case::forced_enumerator_kept(
	"enum Mode\n{\n    Fast,\n//force\n    Legacy,\n//end\n};\n",
	"enum Mode\n{\n    Fast,\n    Turbo,\n};\n",
	"enum Mode\n{\n    Fast,\n//force\n    Legacy,\n//end\n    Turbo,\n};\n"
)]
#[case::stale_enumerator_comments_move_on(
	"enum Color\n{\n    Red,\n    // going away\n    Old,\n    Blue,\n};\n",
	"enum Color\n{\n    Red,\n    Blue,\n};\n",
	"enum Color\n{\n    Red,\n    // going away\n    Blue,\n};\n"
)]
#[case::last_stale_enumerator_comments_close_the_enum(
	"enum Color\n{\n    Red,\n    // going away\n    Old,\n};\n",
	"enum Color\n{\n    Red,\n};\n",
	"enum Color\n{\n    Red,\n    // going away\n};\n"
)]
#[case::ignored_enumerator_kept(
	"enum Color\n{\n    Red,\n//ig     Green,\n};\n",
	"enum Color\n{\n    Red,\n    Green,\n};\n",
	"enum Color\n{\n    Red,\n//ig     Green,\n};\n"
)]
fn merge_cases(#[case] previous: &str, #[case] candidate: &str, #[case] expected: &str) -> SipweaveResult<()> {
	assert_eq!(merged(previous, candidate)?, expected);

	Ok(())
}

#[test]
fn merge_keeps_code_blocks() -> SipweaveResult<()> {
	let previous = r"class Foo
{
%TypeHeaderCode
#include <foo.h>
%End
public:
    void run() /ReleaseGIL/;
%MethodCode
    sipRes = 1;
%End
};
";
	let candidate = r"class Foo
{
%TypeHeaderCode
#include <foo.h>
%End
public:
    void run();
    void stop();
};
";
	let expected = r"class Foo
{
%TypeHeaderCode
#include <foo.h>
%End
public:
    void run() /ReleaseGIL/;
%MethodCode
    sipRes = 1;
%End
    void stop();
};
";

	assert_eq!(merged(previous, candidate)?, expected);

	Ok(())
}

#[test]
fn merge_keeps_hand_edits() -> SipweaveResult<()> {
	let candidate = r"enum Color
{
    Red,
    Green,
    Blue,
};

class Widget
{
public:
    void show();
    int width;
};
";

	assert_eq!(merged(HAND_EDITED_SIP, candidate)?, HAND_EDITED_SIP);

	Ok(())
}

#[test]
fn merge_is_idempotent() -> SipweaveResult<()> {
	let scope = parse_sip_text(CANONICAL_SIP)?;

	assert_eq!(write_sip(&merge(&scope, &scope)), CANONICAL_SIP);

	Ok(())
}

#[rstest]
#[case::defaults_ignored("void f(int x, bool y = 1);", "function f(int)")]
#[case::const_suffix("int size() const;", "function size() const")]
#[case::whitespace_removed("void g(const QString &text);", "function g(constQString&)")]
fn merge_keys(#[case] source: &str, #[case] expected: &str) -> SipweaveResult<()> {
	let scope = parse_sip_text(source)?;
	let entity = scope.active().next().expect("an entity");

	assert_eq!(merge_key(entity).map(|key| key.to_string()).as_deref(), Some(expected));

	Ok(())
}

fn transform_widget(options: &TransformOptions) -> SipweaveResult<String> {
	let source = parse_widget_header()?;
	let index = SymbolIndex::build(&[&source]);
	let scope = transform(&source, options, &index, Path::new("widget.h"));

	Ok(write_sip(&scope))
}

#[test]
#[traced_test]
fn transform_widget_header() -> SipweaveResult<()> {
	let config = SipweaveConfig::from_toml(WIDGET_CONFIG)?;
	let output = transform_widget(&config.transform_options()?)?;

	assert!(output.starts_with("namespace gfx\n{\n%TypeHeaderCode\n#include <widget.h>\n%End\n"));
	assert!(output.contains("class Widget /Abstract/\n{\n%TypeHeaderCode\n#include <widget.h>\n%End\n"));
	assert!(output.contains("    Widget(gfx::Widget *parent = nullptr);\n"));
	assert!(output.contains("    void setColor(gfx::Color color = gfx::Red);\n"));
	assert!(output.contains("    void setVisible(bool visible = 1);\n"));
	assert!(output.contains("    virtual void draw() = 0;\n"));
	assert!(output.contains("    short size() const;\n"));
	assert!(output.contains("private:\n    Widget(const gfx::Widget &other);\n"));
	assert!(!output.contains("operator="));
	assert!(!output.contains("m_hidden"));
	assert!(!output.contains("Helper"));
	assert!(!output.contains("Base"));
	assert!(!logs_contain("unable to resolve type"));

	Ok(())
}

#[test]
fn transform_applies_annotation_rules() -> SipweaveResult<()> {
	let config = SipweaveConfig::from_toml(
		r#"
[transform]
export_macros = ["WIDGETS_EXPORT"]
ignore_bases = ["Base"]

[[transform.annotation_rules]]
kind = "constructor"
parameter_type = ".*\\*"
parameter_name = "parent"
annotations = ["TransferThis"]
"#,
	)?;
	let output = transform_widget(&config.transform_options()?)?;

	assert!(output.contains("    Widget(gfx::Widget *parent /TransferThis/ = nullptr);\n"));

	Ok(())
}

#[test]
#[traced_test]
fn transform_warns_once_per_unresolved_type() -> SipweaveResult<()> {
	let source = parse_header_text("void first(Missing *value);\nvoid second(Missing *value);")?;
	let index = SymbolIndex::build(&[&source]);
	let scope = transform(&source, &TransformOptions::default(), &index, Path::new("api.h"));
	let output = write_sip(&scope);

	assert_eq!(
		output,
		"%ModuleHeaderCode\n#include <api.h>\n%End\n\nvoid first(Missing *value);\n\nvoid second(Missing *value);\n"
	);
	logs_assert(|lines: &[&str]| {
		match lines
			.iter()
			.filter(|line| line.contains("unable to resolve type `Missing`"))
			.count()
		{
			1 => Ok(()),
			count => Err(format!("expected one warning, found {count}")),
		}
	});

	Ok(())
}

#[test]
fn transform_skips_known_types_quietly() -> SipweaveResult<()> {
	let source = parse_header_text("void show(QString text);")?;
	let index = SymbolIndex::build(&[&source]);
	let options = TransformOptions {
		known_types: ["QString".to_string()].into_iter().collect(),
		include_prefix: "widgets/".to_string(),
		..TransformOptions::default()
	};
	let output = write_sip(&transform(&source, &options, &index, Path::new("show.h")));

	assert!(output.starts_with("%ModuleHeaderCode\n#include <widgets/show.h>\n%End\n"));
	assert!(output.contains("void show(QString text);"));

	Ok(())
}

#[rstest]
#[case::short_int("short int", "short")]
#[case::unsigned_long_int("unsigned long int", "unsigned long")]
#[case::long_long_int("const long long int &", "const long long")]
#[case::untouched("QString", "QString")]
#[case::word_boundary("shortint", "shortint")]
fn normalize_types(#[case] input: &str, #[case] expected: &str) {
	let normalized = normalize_type(input);

	if input.ends_with('&') {
		assert!(normalized.starts_with(expected));
	} else {
		assert_eq!(normalized, expected);
	}
}

#[test]
fn symbol_index_resolves_through_bases() -> SipweaveResult<()> {
	let source = parse_header_text(
		"namespace ui {\nclass Base { public: enum Kind { Plain }; };\nclass Button : public Base { public: void \
		 set(Kind kind); };\n}",
	)?;
	let index = SymbolIndex::build(&[&source]);
	let context = vec!["ui".to_string(), "Button".to_string()];

	assert_eq!(index.resolve("Kind", &context).as_deref(), Some("ui::Base::Kind"));
	assert_eq!(index.resolve("Button", &context).as_deref(), Some("ui::Button"));
	assert_eq!(index.resolve_base("Base", &["ui".to_string()]).as_deref(), Some("ui::Base"));
	assert_eq!(index.resolve("Nothing", &context), None);

	Ok(())
}

#[test]
#[traced_test]
fn sanity_flags_unannotated_out_arguments() -> SipweaveResult<()> {
	let scope = parse_sip_text(
		"void fill(int *out, QString &text, const QString &label, char *name);\nvoid read(int *value \
		 /Out/);\n//ig void skipped(int &value);\n",
	)?;
	let warnings = sanity_check(&scope);

	assert_eq!(warnings.len(), 2);
	assert_eq!(warnings[0].argument, "out");
	assert_eq!(warnings[0].type_name, "int *");
	assert_eq!(warnings[1].argument, "text");
	assert_eq!(
		warnings[0].to_string(),
		"`fill` argument `out` of type `int *` has no /In/, /Out/ or /InOut/ annotation"
	);
	assert!(logs_contain("argument `text` of type `QString &`"));

	Ok(())
}

fn shapes_dispatch(options: &DispatchOptions) -> SipweaveResult<Vec<DispatchTree>> {
	let scope = parse_sip_text(SHAPES_SIP)?;

	Ok(build_dispatch(&[(Path::new("shapes.h"), &scope)], options))
}

#[test]
fn dispatch_nests_subclasses() -> SipweaveResult<()> {
	let trees = shapes_dispatch(&DispatchOptions::default())?;

	assert_eq!(trees.len(), 1);
	let tree = &trees[0];
	assert_eq!(tree.includes, vec!["shapes.h".to_string()]);
	assert_eq!(tree.classes(), vec!["Shape", "Polygon", "Square", "Circle"]);
	assert_eq!(
		tree.render(),
		r"sipType = nullptr;
if (dynamic_cast<Shape *>(sipCpp) != nullptr)
{
    sipType = sipType_Shape;
    if (dynamic_cast<Polygon *>(sipCpp) != nullptr)
    {
        sipType = sipType_Polygon;
        if (dynamic_cast<Square *>(sipCpp) != nullptr)
        {
            sipType = sipType_Square;
        }
    }
    if (dynamic_cast<Circle *>(sipCpp) != nullptr)
    {
        sipType = sipType_Circle;
    }
}
"
	);

	Ok(())
}

#[rstest]
#[case::square(&["Shape", "Polygon", "Square"], Some("Square"))]
#[case::polygon(&["Shape", "Polygon"], Some("Polygon"))]
#[case::circle(&["Shape", "Circle"], Some("Circle"))]
#[case::unrelated(&[], None)]
fn dispatch_picks_most_derived(#[case] instance_of: &[&str], #[case] expected: Option<&str>) -> SipweaveResult<()> {
	let trees = shapes_dispatch(&DispatchOptions::default())?;

	assert_eq!(trees[0].most_derived(|class| instance_of.contains(&class)), expected);

	Ok(())
}

#[test]
fn dispatch_excluded_classes_keep_their_subclasses() -> SipweaveResult<()> {
	let options = DispatchOptions {
		exclude: ["Polygon".to_string()].into_iter().collect(),
		..DispatchOptions::default()
	};
	let trees = shapes_dispatch(&options)?;
	let rendered = trees[0].render();

	assert!(!rendered.contains("Polygon"));
	assert!(rendered.contains("    if (dynamic_cast<Square *>(sipCpp) != nullptr)\n"));
	assert_eq!(
		trees[0].most_derived(|class| ["Shape", "Polygon"].contains(&class)),
		Some("Shape")
	);

	Ok(())
}

#[test]
fn dispatch_disabled_builds_nothing() -> SipweaveResult<()> {
	let options = DispatchOptions {
		enabled: false,
		..DispatchOptions::default()
	};

	assert!(shapes_dispatch(&options)?.is_empty());

	Ok(())
}

#[test]
#[traced_test]
fn dispatch_warns_about_unwrapped_bases() -> SipweaveResult<()> {
	let scope = parse_sip_text("class Leaf : QObject\n{\n};\n")?;
	let trees = build_dispatch(&[(Path::new("leaf.h"), &scope)], &DispatchOptions::default());

	assert!(trees.is_empty());
	assert!(logs_contain("base `QObject` of `Leaf` is not a wrapped class"));

	Ok(())
}

#[test]
fn attach_dispatch_to_root_class() -> SipweaveResult<()> {
	let trees = shapes_dispatch(&DispatchOptions::default())?;
	let mut scopes = vec![parse_sip_text(SHAPES_SIP)?];
	attach_dispatch(&mut scopes, &trees);

	let shape = scopes[0].find("Shape").expect("class");
	assert_eq!(shape.blocks[0].name, "TypeHeaderCode");
	assert_eq!(shape.blocks[0].body, "#include <shapes.h>\n");
	assert_eq!(shape.blocks[1].name, DISPATCH_BLOCK);
	assert_eq!(shape.blocks[1].body, trees[0].render());

	attach_dispatch(&mut scopes, &trees);
	let shape = scopes[0].find("Shape").expect("class");
	assert_eq!(shape.blocks.len(), 2);
	assert_eq!(shape.blocks[0].body, "#include <shapes.h>\n");

	Ok(())
}

#[test]
fn config_defaults() -> SipweaveResult<()> {
	let config = SipweaveConfig::from_toml("")?;

	assert_eq!(config.module.output_dir, PathBuf::from(DEFAULT_OUTPUT_DIR));
	assert!(config.dispatch.enabled);
	assert!(config.parser.bare_macros.contains(&"Q_OBJECT".to_string()));
	assert!(config.parser.macro_calls.contains(&"Q_PROPERTY".to_string()));
	assert!(config.exclude.patterns.is_empty());

	Ok(())
}

#[test]
fn config_values_reach_the_preprocessor() -> SipweaveResult<()> {
	let config = SipweaveConfig::from_toml(
		r#"
[preprocessor]
values = { ENABLED = true, LEVEL = 3, NAME = "gfx" }
"#,
	)?;
	let mut preprocessor = config.preprocessor()?;

	assert_eq!(evaluate("ENABLED + LEVEL", &preprocessor)?, Value::Int(4));
	assert_eq!(
		preprocessor.preprocess("#if LEVEL > 2\nint a;\n#endif"),
		"\nint a;\n"
	);

	Ok(())
}

#[test]
fn config_export_macros_are_bare_macros() -> SipweaveResult<()> {
	let config = SipweaveConfig::from_toml(WIDGET_CONFIG)?;

	assert!(config.lexer_options().bare_macros.contains("WIDGETS_EXPORT"));

	Ok(())
}

#[rstest]
#[case::invalid_toml("[module\nname = 1")]
#[case::wrong_type("[dispatch]\nenabled = \"yes\"")]
#[case::unknown_rule_kind("[[transform.annotation_rules]]\nkind = \"method\"\nannotations = []")]
fn config_parse_errors(#[case] content: &str) {
	let result = SipweaveConfig::from_toml(content);

	assert!(matches!(result, Err(SipweaveError::ConfigParse(_))));
}

#[test]
fn config_invalid_patterns() -> SipweaveResult<()> {
	let config = SipweaveConfig::from_toml("[exclude]\npatterns = [\"[\"]")?;
	assert!(matches!(
		config.exclude_matcher(Path::new(".")),
		Err(SipweaveError::InvalidPattern { .. })
	));

	let config = SipweaveConfig::from_toml("[[transform.annotation_rules]]\nparameter_type = \"(\"\nannotations = [\"Out\"]")?;
	assert!(matches!(config.transform_options(), Err(SipweaveError::InvalidPattern { .. })));

	Ok(())
}

const SHAPES_HEADER: &str = r"class Shape
{
public:
    virtual ~Shape();
    int area() const;
};

class Square : public Shape
{
public:
    Square(int side);
};
";

fn shapes_project() -> SipweaveResult<tempfile::TempDir> {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("shapes.h"), SHAPES_HEADER)?;
	std::fs::create_dir_all(tmp.path().join("private"))?;
	std::fs::write(tmp.path().join("private/shapes_p.h"), "class Hidden {};\n")?;
	std::fs::write(
		tmp.path().join("sipweave.toml"),
		"[module]\nname = \"shapes\"\n\n[exclude]\npatterns = [\"private/**\"]\n",
	)?;
	Ok(tmp)
}

#[rstest]
#[case::directory("private/", "private/shapes_p.h", true)]
#[case::directory_contents("private/**", "private/deep/shapes_p.h", true)]
#[case::basename_anywhere("*_p.h", "src/deep/shapes_p.h", true)]
#[case::anchored("/shapes.h", "src/shapes.h", false)]
#[case::negated("*.h\n!shapes.h", "shapes.h", false)]
fn config_exclude_patterns_follow_gitignore(
	#[case] patterns: &str,
	#[case] header: &str,
	#[case] excluded: bool,
) -> SipweaveResult<()> {
	let root = Path::new("/project");
	let config = SipweaveConfig {
		exclude: ExcludeConfig {
			patterns: patterns.lines().map(String::from).collect(),
		},
		..SipweaveConfig::default()
	};
	let matcher = config.exclude_matcher(root)?;

	assert_eq!(
		matcher
			.matched_path_or_any_parents(root.join(header), false)
			.is_ignore(),
		excluded
	);

	Ok(())
}

#[test]
fn generate_excludes_directories() -> SipweaveResult<()> {
	let tmp = shapes_project()?;
	std::fs::write(
		tmp.path().join("sipweave.toml"),
		"[module]\nname = \"shapes\"\n\n[exclude]\npatterns = [\"private/\"]\n",
	)?;

	let ctx = GenerationContext::load(tmp.path(), &[])?;
	assert_eq!(ctx.headers, vec![tmp.path().join("shapes.h")]);

	let ctx = GenerationContext::load(tmp.path(), &[PathBuf::from("private/shapes_p.h")])?;
	assert!(ctx.headers.is_empty());

	Ok(())
}

#[test]
fn generate_honors_gitignore() -> SipweaveResult<()> {
	let tmp = shapes_project()?;
	std::fs::create_dir_all(tmp.path().join("build"))?;
	std::fs::write(tmp.path().join("build/config.h"), "int generated;\n")?;
	std::fs::write(tmp.path().join("scratch.h"), "int scratch;\n")?;
	std::fs::write(tmp.path().join(".gitignore"), "build/\nscratch.h\n")?;

	let ctx = GenerationContext::load(tmp.path(), &[])?;

	assert_eq!(ctx.headers, vec![tmp.path().join("shapes.h")]);

	Ok(())
}

#[test]
fn generate_writes_bindings_and_index() -> SipweaveResult<()> {
	let tmp = shapes_project()?;
	let ctx = GenerationContext::load(tmp.path(), &[])?;

	assert_eq!(ctx.headers, vec![tmp.path().join("shapes.h")]);

	let result = generate(&ctx)?;
	assert_eq!(result.files.len(), 2);
	assert!(!result.is_up_to_date());

	let bindings = &result.files[0];
	assert_eq!(bindings.path, tmp.path().join("sip/shapes.sip"));
	assert!(bindings.content.starts_with("class Shape\n{\n%TypeHeaderCode\n#include <shapes.h>\n%End\n"));
	assert!(bindings.content.contains("%ConvertToSubClassCode\nsipType = nullptr;\n"));
	assert!(bindings.content.contains("public:\n    virtual ~Shape();\n    int area() const;\n"));
	assert!(bindings.content.contains("class Square : Shape\n"));

	let index = &result.files[1];
	assert_eq!(index.path, tmp.path().join("sip/shapesmod.sip"));
	assert_eq!(index.content, "%Module(name=shapes)\n\n%Include shapes.sip\n");

	assert_eq!(write_updates(&result)?, 2);
	assert!(generate(&ctx)?.is_up_to_date());

	Ok(())
}

#[test]
fn generate_preserves_hand_edits() -> SipweaveResult<()> {
	let tmp = shapes_project()?;
	let ctx = GenerationContext::load(tmp.path(), &[])?;
	write_updates(&generate(&ctx)?)?;

	let path = ctx.output_path(Path::new("shapes.h"));
	let edited = std::fs::read_to_string(&path)?.replace("int area() const;", "int area() const /ReleaseGIL/;");
	std::fs::write(&path, &edited)?;

	let result = generate(&ctx)?;
	assert!(result.files[0].content.contains("int area() const /ReleaseGIL/;"));
	assert!(result.is_up_to_date());

	Ok(())
}

#[test]
fn generate_with_explicit_headers() -> SipweaveResult<()> {
	let tmp = shapes_project()?;
	let ctx = GenerationContext::load(tmp.path(), &[PathBuf::from("private/shapes_p.h")])?;

	assert!(ctx.headers.is_empty());
	assert!(matches!(generate(&ctx), Err(SipweaveError::NoHeaders)));

	Ok(())
}

#[test]
fn generate_reports_header_parse_errors() -> SipweaveResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("broken.h"), "class Broken {\n")?;
	let ctx = GenerationContext::load(tmp.path(), &[])?;

	assert!(matches!(generate(&ctx), Err(SipweaveError::Parse(_))));

	Ok(())
}

#[test]
fn render_index_sorts_includes() {
	let index = render_index(
		"gfx",
		&["QtCore/QtCoremod.sip".to_string()],
		&["b.sip".to_string(), "a.sip".to_string(), "a.sip".to_string()],
	);

	assert_eq!(
		index,
		"%Module(name=gfx)\n\n%Import QtCore/QtCoremod.sip\n\n%Include a.sip\n%Include b.sip\n"
	);
}

#[test]
fn sanity_runs_on_merged_bindings() -> SipweaveResult<()> {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("io.h"), "void read(int *value);\nvoid write(int value);\n")?;
	let ctx = GenerationContext::load(tmp.path(), &[])?;

	let warnings = sanity(&ctx)?;
	assert_eq!(warnings.len(), 1);
	assert_eq!(warnings[0].function, "read");

	write_updates(&generate(&ctx)?)?;
	let path = ctx.output_path(Path::new("io.h"));
	let edited = std::fs::read_to_string(&path)?.replace("int *value", "int *value /Out/");
	std::fs::write(&path, edited)?;

	assert!(sanity(&ctx)?.is_empty());

	Ok(())
}
