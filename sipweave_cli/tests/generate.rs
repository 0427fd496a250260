mod common;

use clap::Parser;
use sipweave_cli::Commands;
use sipweave_cli::SipweaveCli;
use sipweave_core::AnyEmptyResult;

#[test]
fn generate_writes_bindings_and_index() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_shapes_project(tmp.path())?;

	common::sipweave_cmd()
		.arg("generate")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Wrote 2 file(s)."));

	let bindings = std::fs::read_to_string(tmp.path().join("sip/shapes.sip"))?;
	assert!(bindings.contains("class Square : Shape\n"));
	assert!(bindings.contains("%ConvertToSubClassCode\n"));

	let index = std::fs::read_to_string(tmp.path().join("sip/shapesmod.sip"))?;
	insta::assert_snapshot!(index, @r"
	%Module(name=shapes)

	%Include shapes.sip
	");

	Ok(())
}

#[test]
fn generate_dry_run_writes_nothing() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_shapes_project(tmp.path())?;

	common::sipweave_cmd()
		.arg("generate")
		.arg("--dry-run")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Dry run: would write 2 file(s):"))
		.stdout(predicates::str::contains("sip/shapes.sip (missing)"));

	assert!(!tmp.path().join("sip").exists());

	Ok(())
}

#[test]
fn generate_twice_is_a_no_op() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_shapes_project(tmp.path())?;

	common::sipweave_cmd()
		.arg("generate")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	common::sipweave_cmd()
		.arg("generate")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("already up to date"));

	Ok(())
}

#[test]
fn generate_keeps_hand_edits() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_shapes_project(tmp.path())?;

	common::sipweave_cmd()
		.arg("generate")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	let path = tmp.path().join("sip/shapes.sip");
	let edited = std::fs::read_to_string(&path)?.replace("Square(int side);", "Square(int side) /ReleaseGIL/;");
	std::fs::write(&path, &edited)?;
	std::fs::write(
		tmp.path().join("shapes.h"),
		common::SHAPES_HEADER.replace("Square(int side);", "Square(int side);\n    int side() const;"),
	)?;

	common::sipweave_cmd()
		.arg("generate")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	let content = std::fs::read_to_string(&path)?;
	assert!(content.contains("    Square(int side) /ReleaseGIL/;\n    int side() const;\n"));

	Ok(())
}

#[test]
fn generate_without_headers_fails() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;

	common::sipweave_cmd()
		.arg("generate")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("no header files to process"));

	Ok(())
}

#[test]
fn generate_reports_parse_errors() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("broken.h"), "class Broken {\n    int a;\n")?;

	common::sipweave_cmd()
		.arg("generate")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(2)
		.stderr(predicates::str::contains("unexpected end of input"));

	Ok(())
}

#[test]
fn preprocess_prints_filtered_header() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join("config.h"),
		"#define FEATURE 1\n#if FEATURE\nint enabled;\n#else\nint disabled;\n#endif\n",
	)?;

	common::sipweave_cmd()
		.arg("preprocess")
		.arg("config.h")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("\n\nint enabled;\n\n\n\n");

	Ok(())
}

#[test]
fn sanity_reports_missing_annotations() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("io.h"), "void read(int *value);\nvoid write(int value);\n")?;

	common::sipweave_cmd()
		.arg("sanity")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stdout(predicates::str::contains("`read` argument `value` of type `int *`"))
		.stdout(predicates::str::contains("1 argument(s) need a direction annotation."));

	Ok(())
}

#[test]
fn sanity_passes_when_annotated() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(tmp.path().join("io.h"), "void write(const int *value);\n")?;

	common::sipweave_cmd()
		.arg("sanity")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("No sanity problems found."));

	Ok(())
}

#[test]
fn generate_args_parse() {
	let cli = SipweaveCli::parse_from(["sipweave", "generate", "a.h", "b.h", "--dry-run"]);
	match cli.command {
		Some(Commands::Generate { headers, dry_run }) => {
			assert_eq!(headers.len(), 2);
			assert!(dry_run);
		}
		_ => panic!("expected Generate command"),
	}
}
