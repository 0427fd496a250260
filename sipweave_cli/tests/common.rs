#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use insta_cmd::get_cargo_bin;
use sipweave_core::AnyEmptyResult;

pub const SHAPES_HEADER: &str = "class Shape\n{\npublic:\n    virtual ~Shape();\n    int area() \
                                 const;\n};\n\nclass Square : public Shape\n{\npublic:\n    \
                                 Square(int side);\n};\n";

pub fn sipweave_cmd() -> Command {
	let mut cmd = Command::new(get_cargo_bin("sipweave"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("SIPWEAVE_LOG");
	cmd
}

/// A project with one header and a config naming the module `shapes`.
pub fn write_shapes_project(root: &Path) -> AnyEmptyResult {
	std::fs::write(root.join("shapes.h"), SHAPES_HEADER)?;
	std::fs::write(root.join("sipweave.toml"), "[module]\nname = \"shapes\"\n")?;
	Ok(())
}
