mod common;

use clap::Parser;
use serde_json::Value;
use sipweave_cli::Commands;
use sipweave_cli::OutputFormat;
use sipweave_cli::SipweaveCli;
use sipweave_core::AnyEmptyResult;

fn generate(root: &std::path::Path) {
	common::sipweave_cmd()
		.arg("generate")
		.arg("--path")
		.arg(root)
		.assert()
		.success();
}

#[test]
fn check_fails_before_generation() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_shapes_project(tmp.path())?;

	common::sipweave_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("Check failed."))
		.stderr(predicates::str::contains("sip/shapes.sip (missing)"))
		.stderr(predicates::str::contains("2 .sip file(s) are out of date"));

	Ok(())
}

#[test]
fn check_passes_when_up_to_date() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_shapes_project(tmp.path())?;
	generate(tmp.path());

	common::sipweave_cmd()
		.arg("check")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout(predicates::str::contains("Check passed"));

	Ok(())
}

#[test]
fn check_shows_diff_for_stale_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_shapes_project(tmp.path())?;
	generate(tmp.path());

	let path = tmp.path().join("sip/shapes.sip");
	let stale = std::fs::read_to_string(&path)?.replace("int area() const;", "int volume() const;");
	std::fs::write(&path, stale)?;

	common::sipweave_cmd()
		.arg("check")
		.arg("--diff")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("sip/shapes.sip (out of date)"))
		.stderr(predicates::str::contains("-    int volume() const;"))
		.stderr(predicates::str::contains("+    int area() const;"));

	Ok(())
}

#[test]
fn check_json_lists_stale_files() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_shapes_project(tmp.path())?;

	let output = common::sipweave_cmd()
		.arg("check")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.output()?;

	assert_eq!(output.status.code(), Some(1));
	let json: Value = serde_json::from_slice(&output.stdout)?;
	assert_eq!(json["ok"], Value::Bool(false));

	let stale = json["stale"].as_array().ok_or("expected a stale array")?;
	assert_eq!(stale.len(), 2);
	assert_eq!(stale[0]["file"], "sip/shapes.sip");
	assert_eq!(stale[0]["header"], "shapes.h");
	assert_eq!(stale[0]["status"], "missing");
	assert_eq!(stale[1]["header"], Value::Null);

	Ok(())
}

#[test]
fn check_json_when_up_to_date() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_shapes_project(tmp.path())?;
	generate(tmp.path());

	common::sipweave_cmd()
		.arg("check")
		.arg("--format")
		.arg("json")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success()
		.stdout("{\"ok\":true,\"stale\":[]}\n");

	Ok(())
}

#[test]
fn check_only_named_headers() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	common::write_shapes_project(tmp.path())?;
	std::fs::write(tmp.path().join("other.h"), "void other();\n")?;
	generate(tmp.path());

	common::sipweave_cmd()
		.arg("check")
		.arg("shapes.h")
		.arg("other.h")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.success();

	common::sipweave_cmd()
		.arg("check")
		.arg("shapes.h")
		.arg("--path")
		.arg(tmp.path())
		.assert()
		.code(1)
		.stderr(predicates::str::contains("sip/shapesmod.sip (out of date)"));

	Ok(())
}

#[test]
fn check_format_args() {
	let cli = SipweaveCli::parse_from(["sipweave", "check", "--diff", "--format", "json"]);
	match cli.command {
		Some(Commands::Check { diff, format, headers }) => {
			assert!(diff);
			assert!(matches!(format, OutputFormat::Json));
			assert!(headers.is_empty());
		}
		_ => panic!("expected Check command"),
	}

	let cli = SipweaveCli::parse_from(["sipweave", "check"]);
	match cli.command {
		Some(Commands::Check { format, .. }) => {
			assert!(matches!(format, OutputFormat::Text));
		}
		_ => panic!("expected Check command"),
	}
}
